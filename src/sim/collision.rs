//! Collision primitives
//!
//! Axis-aligned boxes for pipes, collectibles and obstacles, plus the
//! rotation-aware test used for the bird's forgiving hitbox.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box (top-left origin, screen coordinates)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Aabb {
    pub pos: Vec2,
    pub size: Vec2,
}

impl Aabb {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            pos: Vec2::new(x, y),
            size: Vec2::new(width, height),
        }
    }

    pub fn from_center(center: Vec2, half: Vec2) -> Self {
        Self {
            pos: center - half,
            size: half * 2.0,
        }
    }

    pub fn min(&self) -> Vec2 {
        self.pos
    }

    pub fn max(&self) -> Vec2 {
        self.pos + self.size
    }

    pub fn center(&self) -> Vec2 {
        self.pos + self.size * 0.5
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        let (a_min, a_max) = (self.min(), self.max());
        let (b_min, b_max) = (other.min(), other.max());
        a_min.x < b_max.x && a_max.x > b_min.x && a_min.y < b_max.y && a_max.y > b_min.y
    }

    pub fn corners(&self) -> [Vec2; 4] {
        let (min, max) = (self.min(), self.max());
        [
            min,
            Vec2::new(max.x, min.y),
            Vec2::new(min.x, max.y),
            max,
        ]
    }
}

/// Oriented box: center, half extents and rotation (radians)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedBox {
    pub center: Vec2,
    pub half: Vec2,
    pub rotation: f32,
}

impl OrientedBox {
    fn axes(&self) -> [Vec2; 2] {
        let (sin, cos) = self.rotation.sin_cos();
        [Vec2::new(cos, sin), Vec2::new(-sin, cos)]
    }

    /// Move a world point into the box's local (unrotated) frame
    pub fn to_local(&self, point: Vec2) -> Vec2 {
        let d = point - self.center;
        let (sin, cos) = (-self.rotation).sin_cos();
        Vec2::new(d.x * cos - d.y * sin, d.x * sin + d.y * cos)
    }

    pub fn contains(&self, point: Vec2) -> bool {
        let local = self.to_local(point);
        local.x.abs() < self.half.x && local.y.abs() < self.half.y
    }

    /// Smallest AABB enclosing the rotated box
    pub fn bounds(&self) -> Aabb {
        let [ax, ay] = self.axes();
        let extent = Vec2::new(
            (ax.x * self.half.x).abs() + (ay.x * self.half.y).abs(),
            (ax.y * self.half.x).abs() + (ay.y * self.half.y).abs(),
        );
        Aabb::from_center(self.center, extent)
    }

    /// Corner containment first (cheap, matches the common case), then a
    /// separating-axis test so boxes larger than the bird still register.
    pub fn hits(&self, other: &Aabb) -> bool {
        if self.half.x <= 0.0 || self.half.y <= 0.0 {
            return false;
        }
        if other.corners().iter().any(|&c| self.contains(c)) {
            return true;
        }
        self.separating_axis_overlap(other)
    }

    fn separating_axis_overlap(&self, other: &Aabb) -> bool {
        let [ax, ay] = self.axes();
        let other_center = other.center();
        let other_half = other.size * 0.5;
        let d = other_center - self.center;

        // World axes (the AABB's own)
        let self_extent_x = (ax.x * self.half.x).abs() + (ay.x * self.half.y).abs();
        let self_extent_y = (ax.y * self.half.x).abs() + (ay.y * self.half.y).abs();
        if d.x.abs() >= self_extent_x + other_half.x || d.y.abs() >= self_extent_y + other_half.y {
            return false;
        }

        // Box axes
        for (axis, half) in [(ax, self.half.x), (ay, self.half.y)] {
            let other_extent = axis.x.abs() * other_half.x + axis.y.abs() * other_half.y;
            if d.dot(axis).abs() >= half + other_extent {
                return false;
            }
        }
        true
    }
}
