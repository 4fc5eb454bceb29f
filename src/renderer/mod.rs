//! 2D rendering module
//!
//! The game draws through the [`Canvas`] trait over a fixed 400x600 logical
//! field. On the web it is backed by a Canvas 2D context; tests and the
//! native demo record into a [`DrawList`].

#[cfg(target_arch = "wasm32")]
pub mod canvas2d;
pub mod shapes;

#[cfg(target_arch = "wasm32")]
pub use canvas2d::Canvas2d;

use glam::Vec2;

/// RGBA color, alpha in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::hex(0xffffff);
    pub const BLACK: Color = Color::hex(0x000000);

    /// Opaque color from `0xRRGGBB`
    pub const fn hex(rgb: u32) -> Self {
        Self {
            r: ((rgb >> 16) & 0xff) as u8,
            g: ((rgb >> 8) & 0xff) as u8,
            b: (rgb & 0xff) as u8,
            a: 1.0,
        }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self {
            a: a.clamp(0.0, 1.0),
            ..self
        }
    }

    /// CSS `rgba()` string
    pub fn to_css(&self) -> String {
        format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

/// Canvas composite operations in use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositeMode {
    #[default]
    SourceOver,
    /// Additive blending
    Lighter,
    Screen,
}

impl CompositeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompositeMode::SourceOver => "source-over",
            CompositeMode::Lighter => "lighter",
            CompositeMode::Screen => "screen",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    Left,
    #[default]
    Center,
}

/// Immediate-mode 2D drawing surface
///
/// Mirrors the subset of Canvas 2D the game uses. `save`/`restore` bracket
/// transform, alpha, composite and shadow state.
pub trait Canvas {
    fn size(&self) -> Vec2;
    fn clear(&mut self);
    fn save(&mut self);
    fn restore(&mut self);

    fn translate(&mut self, offset: Vec2);
    fn rotate(&mut self, radians: f32);
    fn scale(&mut self, factor: f32);

    fn set_alpha(&mut self, alpha: f32);
    fn set_composite(&mut self, mode: CompositeMode);
    /// Glow; a blur of 0 disables it
    fn set_shadow(&mut self, color: Color, blur: f32);

    fn fill_rect(&mut self, pos: Vec2, size: Vec2, color: Color);
    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color);
    fn stroke_circle(&mut self, center: Vec2, radius: f32, color: Color, width: f32);
    fn fill_polygon(&mut self, points: &[Vec2], color: Color);
    fn stroke_polygon(&mut self, points: &[Vec2], color: Color, width: f32);
    fn line(&mut self, from: Vec2, to: Vec2, color: Color, width: f32);
    fn text(&mut self, text: &str, pos: Vec2, px: f32, color: Color, align: TextAlign);
}

/// One recorded drawing call
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear,
    Save,
    Restore,
    Translate(Vec2),
    Rotate(f32),
    Scale(f32),
    Alpha(f32),
    Composite(CompositeMode),
    Shadow { color: Color, blur: f32 },
    Rect { pos: Vec2, size: Vec2, color: Color },
    Circle { center: Vec2, radius: f32, color: Color, stroke: Option<f32> },
    Polygon { points: Vec<Vec2>, color: Color, stroke: Option<f32> },
    Line { from: Vec2, to: Vec2, color: Color, width: f32 },
    Text { text: String, pos: Vec2, px: f32, color: Color },
}

/// Recording canvas: headless rendering for tests and the native demo
#[derive(Debug, Clone)]
pub struct DrawList {
    size: Vec2,
    pub commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            size: Vec2::new(width, height),
            commands: Vec::new(),
        }
    }

    /// Texts drawn since the last clear
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn count(&self, pred: impl Fn(&DrawCommand) -> bool) -> usize {
        self.commands.iter().filter(|c| pred(c)).count()
    }
}

impl Canvas for DrawList {
    fn size(&self) -> Vec2 {
        self.size
    }

    fn clear(&mut self) {
        self.commands.clear();
        self.commands.push(DrawCommand::Clear);
    }

    fn save(&mut self) {
        self.commands.push(DrawCommand::Save);
    }

    fn restore(&mut self) {
        self.commands.push(DrawCommand::Restore);
    }

    fn translate(&mut self, offset: Vec2) {
        self.commands.push(DrawCommand::Translate(offset));
    }

    fn rotate(&mut self, radians: f32) {
        self.commands.push(DrawCommand::Rotate(radians));
    }

    fn scale(&mut self, factor: f32) {
        self.commands.push(DrawCommand::Scale(factor));
    }

    fn set_alpha(&mut self, alpha: f32) {
        self.commands.push(DrawCommand::Alpha(alpha));
    }

    fn set_composite(&mut self, mode: CompositeMode) {
        self.commands.push(DrawCommand::Composite(mode));
    }

    fn set_shadow(&mut self, color: Color, blur: f32) {
        self.commands.push(DrawCommand::Shadow { color, blur });
    }

    fn fill_rect(&mut self, pos: Vec2, size: Vec2, color: Color) {
        self.commands.push(DrawCommand::Rect { pos, size, color });
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        self.commands.push(DrawCommand::Circle {
            center,
            radius,
            color,
            stroke: None,
        });
    }

    fn stroke_circle(&mut self, center: Vec2, radius: f32, color: Color, width: f32) {
        self.commands.push(DrawCommand::Circle {
            center,
            radius,
            color,
            stroke: Some(width),
        });
    }

    fn fill_polygon(&mut self, points: &[Vec2], color: Color) {
        self.commands.push(DrawCommand::Polygon {
            points: points.to_vec(),
            color,
            stroke: None,
        });
    }

    fn stroke_polygon(&mut self, points: &[Vec2], color: Color, width: f32) {
        self.commands.push(DrawCommand::Polygon {
            points: points.to_vec(),
            color,
            stroke: Some(width),
        });
    }

    fn line(&mut self, from: Vec2, to: Vec2, color: Color, width: f32) {
        self.commands.push(DrawCommand::Line {
            from,
            to,
            color,
            width,
        });
    }

    fn text(&mut self, text: &str, pos: Vec2, px: f32, color: Color, _align: TextAlign) {
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            pos,
            px,
            color,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_color() {
        let c = Color::hex(0x62c9ff);
        assert_eq!((c.r, c.g, c.b), (0x62, 0xc9, 0xff));
        assert_eq!(c.with_alpha(0.5).to_css(), "rgba(98, 201, 255, 0.5)");
        assert_eq!(c.with_alpha(3.0).a, 1.0);
    }

    #[test]
    fn test_draw_list_clear_resets() {
        let mut list = DrawList::new(400.0, 600.0);
        list.fill_rect(Vec2::ZERO, Vec2::ONE, Color::WHITE);
        list.text("hi", Vec2::ZERO, 12.0, Color::WHITE, TextAlign::Left);
        assert_eq!(list.texts().collect::<Vec<_>>(), vec!["hi"]);
        list.clear();
        assert_eq!(list.commands, vec![DrawCommand::Clear]);
    }
}
