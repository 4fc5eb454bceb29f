//! Tween system
//!
//! Animates named `f32` channels (HUD pulse scales, banner fades, ...) over
//! simulated time. Renderers read channel values; gameplay never does.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Easing curves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Easing {
    Linear,
    EaseInQuad,
    #[default]
    EaseOutQuad,
    EaseInOutQuad,
    EaseInCubic,
    EaseOutCubic,
    EaseInOutCubic,
}

impl Easing {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "linear" => Some(Easing::Linear),
            "easeInQuad" => Some(Easing::EaseInQuad),
            "easeOutQuad" => Some(Easing::EaseOutQuad),
            "easeInOutQuad" => Some(Easing::EaseInOutQuad),
            "easeInCubic" => Some(Easing::EaseInCubic),
            "easeOutCubic" => Some(Easing::EaseOutCubic),
            "easeInOutCubic" => Some(Easing::EaseInOutCubic),
            _ => None,
        }
    }

    /// Map progress `t` in [0, 1] through the curve
    pub fn apply(self, t: f32) -> f32 {
        match self {
            Easing::Linear => t,
            Easing::EaseInQuad => t * t,
            Easing::EaseOutQuad => t * (2.0 - t),
            Easing::EaseInOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
            Easing::EaseInCubic => t * t * t,
            Easing::EaseOutCubic => {
                let u = t - 1.0;
                u * u * u + 1.0
            }
            Easing::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    (t - 1.0) * (2.0 * t - 2.0) * (2.0 * t - 2.0) + 1.0
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TweenId(u32);

#[derive(Debug, Clone)]
struct Track {
    channel: String,
    start: f32,
    end: f32,
}

#[derive(Debug, Clone)]
struct Tween {
    id: TweenId,
    tracks: Vec<Track>,
    duration_ms: f32,
    elapsed_ms: f32,
    easing: Easing,
}

#[derive(Debug, Default)]
pub struct TweenSystem {
    values: HashMap<String, f32>,
    tweens: Vec<Tween>,
    completed: Vec<TweenId>,
    next_id: u32,
}

impl TweenSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a channel immediately
    pub fn set(&mut self, channel: &str, value: f32) {
        self.values.insert(channel.to_string(), value);
    }

    pub fn value(&self, channel: &str) -> Option<f32> {
        self.values.get(channel).copied()
    }

    pub fn value_or(&self, channel: &str, default: f32) -> f32 {
        self.value(channel).unwrap_or(default)
    }

    /// Animate each `(channel, end)` from its current value. Unset channels
    /// start at 0.0. A zero duration snaps on the next update.
    pub fn to(&mut self, targets: &[(&str, f32)], duration_ms: f32, easing: Easing) -> TweenId {
        let id = TweenId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);

        let tracks = targets
            .iter()
            .map(|&(channel, end)| Track {
                channel: channel.to_string(),
                start: self.value_or(channel, 0.0),
                end,
            })
            .collect();

        self.tweens.push(Tween {
            id,
            tracks,
            duration_ms: duration_ms.max(0.0),
            elapsed_ms: 0.0,
            easing,
        });
        id
    }

    pub fn is_running(&self, id: TweenId) -> bool {
        self.tweens.iter().any(|t| t.id == id)
    }

    pub fn active_count(&self) -> usize {
        self.tweens.len()
    }

    pub fn update(&mut self, dt_ms: f32) {
        let values = &mut self.values;
        let completed = &mut self.completed;
        self.tweens.retain_mut(|tween| {
            tween.elapsed_ms += dt_ms;
            let progress = if tween.duration_ms <= 0.0 {
                1.0
            } else {
                (tween.elapsed_ms / tween.duration_ms).min(1.0)
            };
            let eased = tween.easing.apply(progress);
            for track in &tween.tracks {
                values.insert(
                    track.channel.clone(),
                    track.start + (track.end - track.start) * eased,
                );
            }
            if progress >= 1.0 {
                completed.push(tween.id);
                false
            } else {
                true
            }
        });
    }

    /// Tweens finished since the last call
    pub fn take_completed(&mut self) -> Vec<TweenId> {
        std::mem::take(&mut self.completed)
    }

    /// Stop all animations, keep current channel values
    pub fn clear(&mut self) {
        self.tweens.clear();
        self.completed.clear();
    }
}

impl crate::engine::System for TweenSystem {
    fn update(&mut self, dt_ms: f32) {
        TweenSystem::update(self, dt_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_easing_endpoints() {
        for easing in [
            Easing::Linear,
            Easing::EaseInQuad,
            Easing::EaseOutQuad,
            Easing::EaseInOutQuad,
            Easing::EaseInCubic,
            Easing::EaseOutCubic,
            Easing::EaseInOutCubic,
        ] {
            assert!(easing.apply(0.0).abs() < 1e-6, "{:?}", easing);
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-6, "{:?}", easing);
        }
        assert_eq!(Easing::EaseOutQuad.apply(0.5), 0.75);
        assert_eq!(Easing::from_str("bogus"), None);
        assert_eq!(Easing::default(), Easing::EaseOutQuad);
    }

    #[test]
    fn test_tween_reaches_target() {
        let mut tweens = TweenSystem::new();
        tweens.set("scale", 1.4);
        let id = tweens.to(&[("scale", 1.0), ("alpha", 1.0)], 300.0, Easing::Linear);

        tweens.update(150.0);
        assert!((tweens.value("scale").unwrap() - 1.2).abs() < 1e-5);
        assert!((tweens.value("alpha").unwrap() - 0.5).abs() < 1e-5);
        assert!(tweens.is_running(id));

        tweens.update(200.0);
        assert_eq!(tweens.value("scale"), Some(1.0));
        assert!(!tweens.is_running(id));
        assert_eq!(tweens.take_completed(), vec![id]);
        assert!(tweens.take_completed().is_empty());
    }

    #[test]
    fn test_zero_duration_snaps() {
        let mut tweens = TweenSystem::new();
        tweens.to(&[("x", 5.0)], 0.0, Easing::EaseInCubic);
        tweens.update(16.0);
        assert_eq!(tweens.value("x"), Some(5.0));
        assert_eq!(tweens.active_count(), 0);
    }
}
