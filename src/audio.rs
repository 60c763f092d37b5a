//! Audio system using Web Audio API
//!
//! Procedurally generated engine hum and crash explosion, no sample files.

use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use web_sys::{AudioContext, GainNode, OscillatorNode, OscillatorType};

use crate::platform::AudioService;

/// Engine fundamental at idle and at top speed (Hz)
const ENGINE_IDLE_HZ: f32 = 55.0;
const ENGINE_TOP_HZ: f32 = 165.0;
/// Engine loudness relative to master volume
const ENGINE_LEVEL: f32 = 0.12;

/// Running engine voice: sawtooth body plus a sine sub an octave below
struct EngineVoice {
    body: OscillatorNode,
    sub: OscillatorNode,
    gain: GainNode,
}

/// Audio manager for the game
pub struct AudioManager {
    ctx: Option<AudioContext>,
    engine: Option<EngineVoice>,
    master_volume: f32,
    pitch: f32,
}

impl Default for AudioManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioManager {
    pub fn new() -> Self {
        // May fail outside a secure context
        let ctx = AudioContext::new().ok();
        if ctx.is_none() {
            log::warn!("Failed to create AudioContext - audio disabled");
        }
        Self {
            ctx,
            engine: None,
            master_volume: 0.8,
            pitch: 0.0,
        }
    }

    /// Resume audio context (required after user gesture). A rejected
    /// promise is logged and otherwise ignored.
    pub fn resume(&self) {
        let Some(ctx) = &self.ctx else { return };
        if ctx.state() != web_sys::AudioContextState::Suspended {
            return;
        }
        match ctx.resume() {
            Ok(promise) => wasm_bindgen_futures::spawn_local(async move {
                if let Err(e) = JsFuture::from(promise).await {
                    log::warn!("Audio resume rejected: {:?}", e);
                }
            }),
            Err(e) => log_rejection("resume", e),
        }
    }

    /// Set master volume (0.0 - 1.0)
    pub fn set_master_volume(&mut self, vol: f32) {
        self.master_volume = vol.clamp(0.0, 1.0);
        if let (Some(ctx), Some(engine)) = (&self.ctx, &self.engine) {
            engine
                .gain
                .gain()
                .set_target_at_time(self.master_volume * ENGINE_LEVEL, ctx.current_time(), 0.05)
                .ok();
        }
    }

    /// Create an oscillator routed through its own gain node
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

    fn engine_hz(&self) -> f32 {
        ENGINE_IDLE_HZ + (ENGINE_TOP_HZ - ENGINE_IDLE_HZ) * self.pitch
    }

    fn start_engine(&mut self) {
        if self.engine.is_some() {
            return;
        }
        let Some(ctx) = &self.ctx else { return };
        let hz = self.engine_hz();
        let Some((body, gain)) = self.create_osc(ctx, hz, OscillatorType::Sawtooth) else {
            return;
        };
        let Ok(sub) = ctx.create_oscillator() else {
            return;
        };
        sub.set_type(OscillatorType::Sine);
        sub.frequency().set_value(hz * 0.5);
        if sub.connect_with_audio_node(&gain).is_err() {
            return;
        }

        let t = ctx.current_time();
        gain.gain().set_value_at_time(0.0001, t).ok();
        gain.gain()
            .exponential_ramp_to_value_at_time(self.master_volume * ENGINE_LEVEL, t + 0.3)
            .ok();
        body.start().ok();
        sub.start().ok();
        self.engine = Some(EngineVoice { body, sub, gain });
        log::debug!("Engine started");
    }

    fn stop_engine(&mut self) {
        let Some(engine) = self.engine.take() else { return };
        let Some(ctx) = &self.ctx else { return };
        let t = ctx.current_time();
        engine.gain.gain().set_target_at_time(0.0, t, 0.08).ok();
        engine.body.stop_with_when(t + 0.4).ok();
        engine.sub.stop_with_when(t + 0.4).ok();
        log::debug!("Engine stopped");
    }

    /// Explosion - boom with a crack on top and a long rumble tail
    fn play_explosion(&self, ctx: &AudioContext, vol: f32) {
        let t = ctx.current_time();

        if let Some((osc, gain)) = self.create_osc(ctx, 100.0, OscillatorType::Sawtooth) {
            gain.gain().set_value_at_time(vol * 0.5, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 0.6)
                .ok();
            osc.frequency().set_value_at_time(100.0, t).ok();
            osc.frequency()
                .exponential_ramp_to_value_at_time(25.0, t + 0.6)
                .ok();
            osc.start().ok();
            osc.stop_with_when(t + 0.7).ok();
        }

        // Metal crunch
        if let Some((osc, gain)) = self.create_osc(ctx, 1500.0, OscillatorType::Square) {
            gain.gain().set_value_at_time(vol * 0.2, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 0.12)
                .ok();
            osc.frequency().set_value_at_time(1500.0, t).ok();
            osc.frequency().set_value_at_time(700.0, t + 0.03).ok();
            osc.frequency().set_value_at_time(1200.0, t + 0.06).ok();
            osc.start().ok();
            osc.stop_with_when(t + 0.15).ok();
        }

        // Burning rumble
        if let Some((osc, gain)) = self.create_osc(ctx, 40.0, OscillatorType::Triangle) {
            gain.gain().set_value_at_time(0.01, t).ok();
            gain.gain()
                .linear_ramp_to_value_at_time(vol * 0.3, t + 0.2)
                .ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 1.8)
                .ok();
            osc.frequency().set_value_at_time(40.0, t).ok();
            osc.frequency().set_value_at_time(46.0, t + 0.4).ok();
            osc.frequency().set_value_at_time(36.0, t + 0.8).ok();
            osc.start().ok();
            osc.stop_with_when(t + 2.0).ok();
        }
    }
}

impl AudioService for AudioManager {
    fn engine(&mut self, running: bool) {
        if running {
            self.resume();
            self.start_engine();
        } else {
            self.stop_engine();
        }
    }

    fn engine_pitch(&mut self, speed_ratio: f32) {
        self.pitch = speed_ratio.clamp(0.0, 1.0);
        let hz = self.engine_hz();
        let (Some(ctx), Some(engine)) = (&self.ctx, &self.engine) else {
            return;
        };
        let t = ctx.current_time();
        engine.body.frequency().set_target_at_time(hz, t, 0.1).ok();
        engine.sub.frequency().set_target_at_time(hz * 0.5, t, 0.1).ok();
    }

    fn crash(&mut self) {
        if self.master_volume <= 0.0 {
            return;
        }
        let Some(ctx) = &self.ctx else { return };
        self.resume();
        self.play_explosion(ctx, self.master_volume);
    }
}

fn log_rejection(what: &str, e: JsValue) {
    log::warn!("Audio {} failed: {:?}", what, e);
}
