//! Canvas 2D backend (web only)

use glam::Vec2;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use super::{Canvas, Color, CompositeMode, TextAlign};
use crate::error::EngineError;

pub struct Canvas2d {
    ctx: CanvasRenderingContext2d,
    logical: Vec2,
    pixel_ratio: f64,
}

impl Canvas2d {
    /// Wrap a canvas element, sizing its backing store for the device pixel
    /// ratio while keeping the logical `width` x `height` coordinate space.
    pub fn new(canvas: &HtmlCanvasElement, width: f32, height: f32) -> Result<Self, EngineError> {
        let pixel_ratio = web_sys::window()
            .map(|w| w.device_pixel_ratio())
            .unwrap_or(1.0);
        canvas.set_width((width as f64 * pixel_ratio) as u32);
        canvas.set_height((height as f64 * pixel_ratio) as u32);

        let ctx = canvas
            .get_context("2d")
            .ok()
            .flatten()
            .and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
            .ok_or_else(|| EngineError::MissingSurface("2d context".into()))?;

        let surface = Self {
            ctx,
            logical: Vec2::new(width, height),
            pixel_ratio,
        };
        surface.reset_transform();
        Ok(surface)
    }

    fn reset_transform(&self) {
        let r = self.pixel_ratio;
        let _ = self.ctx.set_transform(r, 0.0, 0.0, r, 0.0, 0.0);
    }

    fn trace_polygon(&self, points: &[Vec2]) -> bool {
        let Some((first, rest)) = points.split_first() else {
            return false;
        };
        self.ctx.begin_path();
        self.ctx.move_to(first.x as f64, first.y as f64);
        for p in rest {
            self.ctx.line_to(p.x as f64, p.y as f64);
        }
        self.ctx.close_path();
        true
    }

    fn trace_circle(&self, center: Vec2, radius: f32) {
        self.ctx.begin_path();
        let _ = self.ctx.arc(
            center.x as f64,
            center.y as f64,
            radius.max(0.0) as f64,
            0.0,
            std::f64::consts::TAU,
        );
    }
}

impl Canvas for Canvas2d {
    fn size(&self) -> Vec2 {
        self.logical
    }

    fn clear(&mut self) {
        self.reset_transform();
        self.ctx
            .clear_rect(0.0, 0.0, self.logical.x as f64, self.logical.y as f64);
    }

    fn save(&mut self) {
        self.ctx.save();
    }

    fn restore(&mut self) {
        self.ctx.restore();
    }

    fn translate(&mut self, offset: Vec2) {
        let _ = self.ctx.translate(offset.x as f64, offset.y as f64);
    }

    fn rotate(&mut self, radians: f32) {
        let _ = self.ctx.rotate(radians as f64);
    }

    fn scale(&mut self, factor: f32) {
        let _ = self.ctx.scale(factor as f64, factor as f64);
    }

    fn set_alpha(&mut self, alpha: f32) {
        self.ctx.set_global_alpha(alpha.clamp(0.0, 1.0) as f64);
    }

    fn set_composite(&mut self, mode: CompositeMode) {
        let _ = self.ctx.set_global_composite_operation(mode.as_str());
    }

    fn set_shadow(&mut self, color: Color, blur: f32) {
        self.ctx.set_shadow_color(&color.to_css());
        self.ctx.set_shadow_blur(blur.max(0.0) as f64);
    }

    fn fill_rect(&mut self, pos: Vec2, size: Vec2, color: Color) {
        self.ctx.set_fill_style_str(&color.to_css());
        self.ctx
            .fill_rect(pos.x as f64, pos.y as f64, size.x as f64, size.y as f64);
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        self.ctx.set_fill_style_str(&color.to_css());
        self.trace_circle(center, radius);
        self.ctx.fill();
    }

    fn stroke_circle(&mut self, center: Vec2, radius: f32, color: Color, width: f32) {
        self.ctx.set_stroke_style_str(&color.to_css());
        self.ctx.set_line_width(width as f64);
        self.trace_circle(center, radius);
        self.ctx.stroke();
    }

    fn fill_polygon(&mut self, points: &[Vec2], color: Color) {
        self.ctx.set_fill_style_str(&color.to_css());
        if self.trace_polygon(points) {
            self.ctx.fill();
        }
    }

    fn stroke_polygon(&mut self, points: &[Vec2], color: Color, width: f32) {
        self.ctx.set_stroke_style_str(&color.to_css());
        self.ctx.set_line_width(width as f64);
        if self.trace_polygon(points) {
            self.ctx.stroke();
        }
    }

    fn line(&mut self, from: Vec2, to: Vec2, color: Color, width: f32) {
        self.ctx.set_stroke_style_str(&color.to_css());
        self.ctx.set_line_width(width as f64);
        self.ctx.set_line_cap("round");
        self.ctx.begin_path();
        self.ctx.move_to(from.x as f64, from.y as f64);
        self.ctx.line_to(to.x as f64, to.y as f64);
        self.ctx.stroke();
    }

    fn text(&mut self, text: &str, pos: Vec2, px: f32, color: Color, align: TextAlign) {
        self.ctx.set_fill_style_str(&color.to_css());
        self.ctx.set_font(&format!("bold {}px Arial", px));
        self.ctx.set_text_align(match align {
            TextAlign::Left => "left",
            TextAlign::Center => "center",
        });
        self.ctx.set_text_baseline("middle");
        let _ = self.ctx.fill_text(text, pos.x as f64, pos.y as f64);
    }
}
