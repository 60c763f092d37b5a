//! Game events to audio
//!
//! Playback itself is fire-and-forget; failures stay inside the
//! [`AudioService`] implementation.

use crate::sim::{DriveState, GameEvent, GamePhase};

/// External audio service
pub trait AudioService {
    /// Start or pause the engine loop
    fn engine(&mut self, running: bool);
    /// Engine pitch from normalized speed, 0 = idle, 1 = top speed
    fn engine_pitch(&mut self, speed_ratio: f32);
    /// One-shot crash sound
    fn crash(&mut self);
}

/// Smallest pitch change worth sending
const PITCH_STEP: f32 = 0.01;

#[derive(Debug, Clone, Default)]
pub struct SoundDirector {
    engine_running: bool,
    last_pitch: Option<f32>,
}

impl SoundDirector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn engine_running(&self) -> bool {
        self.engine_running
    }

    /// React to this frame's events and state; nothing plays unless
    /// `enabled`
    pub fn update(
        &mut self,
        state: &DriveState,
        events: &[GameEvent],
        enabled: bool,
        audio: &mut dyn AudioService,
    ) {
        let want_engine = enabled && state.phase == GamePhase::Driving;
        if want_engine != self.engine_running {
            audio.engine(want_engine);
            self.engine_running = want_engine;
            if !want_engine {
                self.last_pitch = None;
            }
        }

        if !enabled {
            return;
        }

        if events
            .iter()
            .any(|e| matches!(e, GameEvent::Crashed { .. }))
        {
            audio.crash();
        }

        if self.engine_running {
            let max = state.config.speed_policy.max_speed();
            let ratio = if max > 0.0 {
                (state.car.speed / max).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let changed = self
                .last_pitch
                .is_none_or(|last| (last - ratio).abs() >= PITCH_STEP);
            if changed {
                audio.engine_pitch(ratio);
                self.last_pitch = Some(ratio);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{CrashCause, TickInput, crash, start, stop, tick};
    use crate::tuning::DriveConfig;

    #[derive(Default)]
    struct RecordingAudio {
        engine: Vec<bool>,
        pitches: Vec<f32>,
        crashes: usize,
    }

    impl AudioService for RecordingAudio {
        fn engine(&mut self, running: bool) {
            self.engine.push(running);
        }

        fn engine_pitch(&mut self, speed_ratio: f32) {
            self.pitches.push(speed_ratio);
        }

        fn crash(&mut self) {
            self.crashes += 1;
        }
    }

    fn state() -> DriveState {
        let config = DriveConfig {
            obstacle_chance: 0.0,
            ..Default::default()
        };
        DriveState::new(config, 5)
    }

    #[test]
    fn test_engine_follows_phase() {
        let mut state = state();
        let mut director = SoundDirector::new();
        let mut audio = RecordingAudio::default();

        director.update(&state, &[], true, &mut audio);
        assert!(audio.engine.is_empty());

        start(&mut state);
        let events = state.drain_events();
        director.update(&state, &events, true, &mut audio);
        assert_eq!(audio.engine, vec![true]);
        assert_eq!(audio.pitches.len(), 1);

        // Unchanged speed, no repeat pitch
        director.update(&state, &[], true, &mut audio);
        assert_eq!(audio.pitches.len(), 1);

        stop(&mut state);
        let events = state.drain_events();
        director.update(&state, &events, true, &mut audio);
        assert_eq!(audio.engine, vec![true, false]);
        assert!(!director.engine_running());
    }

    #[test]
    fn test_crash_plays_once() {
        let mut state = state();
        let mut director = SoundDirector::new();
        let mut audio = RecordingAudio::default();
        start(&mut state);
        crash(&mut state, CrashCause::OffRoad);
        let events = state.drain_events();
        director.update(&state, &events, true, &mut audio);
        assert_eq!(audio.crashes, 1);
        assert!(!director.engine_running());

        tick(&mut state, &TickInput::default(), 0.016);
        let events = state.drain_events();
        director.update(&state, &events, true, &mut audio);
        assert_eq!(audio.crashes, 1);
    }

    #[test]
    fn test_disabled_is_silent() {
        let mut state = state();
        let mut director = SoundDirector::new();
        let mut audio = RecordingAudio::default();
        start(&mut state);
        crash(&mut state, CrashCause::OffRoad);
        let events = state.drain_events();
        director.update(&state, &events, false, &mut audio);
        assert!(audio.engine.is_empty());
        assert_eq!(audio.crashes, 0);
    }

    #[test]
    fn test_muting_stops_engine() {
        let mut state = state();
        let mut director = SoundDirector::new();
        let mut audio = RecordingAudio::default();
        start(&mut state);
        director.update(&state, &[], true, &mut audio);
        director.update(&state, &[], false, &mut audio);
        assert_eq!(audio.engine, vec![true, false]);
    }
}
