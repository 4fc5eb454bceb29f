//! Audio system using Web Audio API
//!
//! Procedurally generated sound effects - no external files needed!

use web_sys::{AudioContext, GainNode, OscillatorNode, OscillatorType};

use super::{Sfx, SfxOptions, SoundSink};
use crate::settings::Settings;

/// Audio manager for the game
pub struct AudioManager {
    ctx: Option<AudioContext>,
    master_volume: f32,
    sfx_volume: f32,
    muted: bool,
}

impl Default for AudioManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioManager {
    pub fn new() -> Self {
        // Try to create audio context (may fail if not in secure context)
        let ctx = AudioContext::new().ok();
        if ctx.is_none() {
            log::warn!("Failed to create AudioContext - audio disabled");
        }
        Self {
            ctx,
            master_volume: 0.8,
            sfx_volume: 1.0,
            muted: false,
        }
    }

    /// Pick up volume and mute preferences
    pub fn apply_settings(&mut self, settings: &Settings) {
        self.master_volume = settings.master_volume.clamp(0.0, 1.0);
        self.sfx_volume = settings.sfx_volume.clamp(0.0, 1.0);
        self.muted = settings.muted;
    }

    fn effective_volume(&self, options: SfxOptions) -> f32 {
        if self.muted {
            0.0
        } else {
            self.master_volume * self.sfx_volume * options.volume.clamp(0.0, 1.0)
        }
    }

    /// Create an oscillator with gain envelope
    fn create_osc(
        &self,
        ctx: &AudioContext,
        freq: f32,
        osc_type: OscillatorType,
    ) -> Option<(OscillatorNode, GainNode)> {
        let osc = ctx.create_oscillator().ok()?;
        let gain = ctx.create_gain().ok()?;

        osc.set_type(osc_type);
        osc.frequency().set_value(freq);
        osc.connect_with_audio_node(&gain).ok()?;
        gain.connect_with_audio_node(&ctx.destination()).ok()?;

        Some((osc, gain))
    }

    /// One swept tone: `from` -> `to` Hz over `length` seconds, starting at `delay`
    #[allow(clippy::too_many_arguments)]
    fn sweep(
        &self,
        ctx: &AudioContext,
        osc_type: OscillatorType,
        from: f32,
        to: f32,
        peak: f32,
        delay: f64,
        length: f64,
    ) {
        let Some((osc, gain)) = self.create_osc(ctx, from, osc_type) else {
            return;
        };
        let t = ctx.current_time() + delay;

        gain.gain().set_value_at_time(0.0001, t).ok();
        gain.gain().linear_ramp_to_value_at_time(peak, t + 0.01).ok();
        gain.gain()
            .exponential_ramp_to_value_at_time(0.001, t + length)
            .ok();
        osc.frequency().set_value_at_time(from, t).ok();
        osc.frequency()
            .exponential_ramp_to_value_at_time(to.max(1.0), t + length)
            .ok();

        osc.start_with_when(t).ok();
        osc.stop_with_when(t + length + 0.05).ok();
    }

    /// Flap - quick upward chirp
    fn play_flap(&self, ctx: &AudioContext, vol: f32, pitch: f32) {
        self.sweep(ctx, OscillatorType::Sine, 300.0 * pitch, 600.0 * pitch, vol * 0.3, 0.0, 0.08);
    }

    /// Coin - two-note arpeggio, pitch rises with the combo
    fn play_collect(&self, ctx: &AudioContext, vol: f32, pitch: f32) {
        self.sweep(ctx, OscillatorType::Triangle, 880.0 * pitch, 880.0 * pitch, vol * 0.35, 0.0, 0.08);
        self.sweep(ctx, OscillatorType::Triangle, 1320.0 * pitch, 1320.0 * pitch, vol * 0.35, 0.07, 0.12);
    }

    /// Power-up - rising major arpeggio
    fn play_powerup(&self, ctx: &AudioContext, vol: f32, pitch: f32) {
        for (i, freq) in [523.25f32, 659.25, 783.99].iter().enumerate() {
            self.sweep(
                ctx,
                OscillatorType::Square,
                freq * pitch,
                freq * pitch * 1.02,
                vol * 0.15,
                i as f64 * 0.06,
                0.15,
            );
        }
    }

    /// Collision - falling buzz
    fn play_collision(&self, ctx: &AudioContext, vol: f32, pitch: f32) {
        self.sweep(ctx, OscillatorType::Sawtooth, 220.0 * pitch, 40.0 * pitch, vol * 0.4, 0.0, 0.5);
    }

    /// Shield - shimmering sine pair
    fn play_shield(&self, ctx: &AudioContext, vol: f32, pitch: f32) {
        self.sweep(ctx, OscillatorType::Sine, 440.0 * pitch, 880.0 * pitch, vol * 0.3, 0.0, 0.3);
        self.sweep(ctx, OscillatorType::Sine, 660.0 * pitch, 1320.0 * pitch, vol * 0.2, 0.05, 0.3);
    }
}

impl SoundSink for AudioManager {
    fn play_sfx(&mut self, sfx: Sfx, options: SfxOptions) {
        let vol = self.effective_volume(options);
        if vol <= 0.0 {
            return;
        }

        let Some(ctx) = &self.ctx else { return };

        // Resume context if suspended (browsers require user gesture)
        if ctx.state() == web_sys::AudioContextState::Suspended {
            let _ = ctx.resume();
        }

        let pitch = options.pitch.max(0.1);
        match sfx {
            Sfx::Flap => self.play_flap(ctx, vol, pitch),
            Sfx::Collect => self.play_collect(ctx, vol, pitch),
            Sfx::PowerUp => self.play_powerup(ctx, vol, pitch),
            Sfx::Collision => self.play_collision(ctx, vol, pitch),
            Sfx::Shield => self.play_shield(ctx, vol, pitch),
        }
    }
}
