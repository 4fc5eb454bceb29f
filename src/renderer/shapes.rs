//! Shape helpers for 2D primitives

use glam::Vec2;

use super::{Canvas, Color};

/// ETH diamond centered on the origin. `wing` shifts the side vertices
/// down and stretches the top/bottom apart (flap animation).
pub fn eth_diamond(half: Vec2, wing: f32) -> [Vec2; 4] {
    [
        Vec2::new(-half.x, wing),
        Vec2::new(0.0, -half.y - wing),
        Vec2::new(half.x, wing),
        Vec2::new(0.0, half.y + wing),
    ]
}

/// Lower facet of the ETH diamond (darker shading)
pub fn eth_facet(half: Vec2, wing: f32) -> [Vec2; 3] {
    [
        Vec2::new(-half.x, wing),
        Vec2::new(0.0, half.y * 0.5 + wing),
        Vec2::new(half.x, wing),
    ]
}

/// Sparkle cross: two thin rects
pub fn cross(canvas: &mut dyn Canvas, center: Vec2, size: f32, color: Color) {
    canvas.fill_rect(
        Vec2::new(center.x - size / 2.0, center.y - 0.5),
        Vec2::new(size, 1.0),
        color,
    );
    canvas.fill_rect(
        Vec2::new(center.x - 0.5, center.y - size / 2.0),
        Vec2::new(1.0, size),
        color,
    );
}

/// Horizontal progress bar, `fraction` clamped to [0, 1]
pub fn progress_bar(
    canvas: &mut dyn Canvas,
    pos: Vec2,
    size: Vec2,
    fraction: f32,
    fill: Color,
    track: Color,
) {
    canvas.fill_rect(pos, size, track);
    let width = size.x * fraction.clamp(0.0, 1.0);
    if width > 0.0 {
        canvas.fill_rect(pos, Vec2::new(width, size.y), fill);
    }
}

/// Fade factor for a trail point of `age` within `window`
pub fn trail_fade(age: f64, window: f64) -> f32 {
    (1.0 - (age / window) as f32).clamp(0.0, 1.0)
}
