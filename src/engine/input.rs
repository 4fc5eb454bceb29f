//! Input capture
//!
//! Hosts translate DOM events into [`InputEvent`]s; the engine buffers them
//! and drains the buffer at the start of the next fixed step.

use std::collections::HashSet;

use glam::Vec2;

/// Key codes follow `KeyboardEvent.code` ("Space", "KeyP", ...)
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    KeyDown(String),
    KeyUp(String),
    MouseDown { pos: Vec2, button: i16 },
    MouseUp { pos: Vec2, button: i16 },
    MouseMove { pos: Vec2 },
    TouchStart { pos: Vec2 },
    TouchMove { pos: Vec2 },
    TouchEnd,
}

impl InputEvent {
    pub fn key_down(code: &str) -> Self {
        InputEvent::KeyDown(code.to_string())
    }

    /// Space, left click or a new touch
    pub fn is_primary_action(&self) -> bool {
        match self {
            InputEvent::KeyDown(code) => code == "Space",
            InputEvent::MouseDown { button, .. } => *button == 0,
            InputEvent::TouchStart { .. } => true,
            _ => false,
        }
    }

    /// `KeyDown` matching `code`
    pub fn is_key(&self, code: &str) -> bool {
        matches!(self, InputEvent::KeyDown(c) if c == code)
    }
}

/// Held keys and pointer state
#[derive(Debug, Clone, Default)]
pub struct InputState {
    keys: HashSet<String>,
    pub mouse: Vec2,
    pub mouse_down: bool,
    pub touch: Option<Vec2>,
}

impl InputState {
    pub fn apply(&mut self, event: &InputEvent) {
        match event {
            InputEvent::KeyDown(code) => {
                self.keys.insert(code.clone());
            }
            InputEvent::KeyUp(code) => {
                self.keys.remove(code);
            }
            InputEvent::MouseDown { pos, .. } => {
                self.mouse = *pos;
                self.mouse_down = true;
            }
            InputEvent::MouseUp { pos, .. } => {
                self.mouse = *pos;
                self.mouse_down = false;
            }
            InputEvent::MouseMove { pos } => self.mouse = *pos,
            InputEvent::TouchStart { pos } | InputEvent::TouchMove { pos } => {
                self.touch = Some(*pos);
            }
            InputEvent::TouchEnd => self.touch = None,
        }
    }

    pub fn is_key_down(&self, code: &str) -> bool {
        self.keys.contains(code)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_actions() {
        assert!(InputEvent::key_down("Space").is_primary_action());
        assert!(!InputEvent::key_down("KeyP").is_primary_action());
        assert!(
            InputEvent::MouseDown {
                pos: Vec2::ZERO,
                button: 0
            }
            .is_primary_action()
        );
        assert!(
            !InputEvent::MouseDown {
                pos: Vec2::ZERO,
                button: 2
            }
            .is_primary_action()
        );
        assert!(InputEvent::TouchStart { pos: Vec2::ZERO }.is_primary_action());
        assert!(!InputEvent::TouchEnd.is_primary_action());
    }

    #[test]
    fn test_state_tracking() {
        let mut state = InputState::default();
        state.apply(&InputEvent::key_down("Space"));
        assert!(state.is_key_down("Space"));
        state.apply(&InputEvent::KeyUp("Space".into()));
        assert!(!state.is_key_down("Space"));

        state.apply(&InputEvent::TouchStart {
            pos: Vec2::new(3.0, 4.0),
        });
        assert_eq!(state.touch, Some(Vec2::new(3.0, 4.0)));
        state.apply(&InputEvent::TouchEnd);
        assert_eq!(state.touch, None);
    }
}
