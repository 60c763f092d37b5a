//! HUD view model
//!
//! Plain strings and visibility flags; the DOM layer writes only the fields
//! that changed since the previous frame.

use crate::consts::MPS_TO_KMH;
use crate::settings::Settings;
use crate::sim::{DriveState, GamePhase};
use crate::tuning::RoadPolicy;

/// Which control buttons are shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Buttons {
    pub start: bool,
    pub stop: bool,
    pub restart: bool,
}

impl Buttons {
    pub fn for_phase(phase: GamePhase) -> Self {
        match phase {
            GamePhase::Ready | GamePhase::Paused => Self {
                start: true,
                ..Self::default()
            },
            GamePhase::Driving => Self {
                stop: true,
                ..Self::default()
            },
            GamePhase::Crashed { .. } => Self::default(),
            GamePhase::Restartable => Self {
                restart: true,
                ..Self::default()
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Hud {
    pub distance: String,
    pub speed: String,
    /// Lap counter on periodic roads
    pub laps: Option<String>,
    /// Debug telemetry, only when the overlay is on
    pub telemetry: Option<String>,
    /// Crash / game-over banner
    pub banner: Option<String>,
    pub buttons: Buttons,
}

impl Hud {
    pub fn from_state(state: &DriveState, settings: &Settings) -> Self {
        let laps = matches!(state.config.road_policy, RoadPolicy::Wrap)
            .then(|| format!("Lap {}", state.car.laps + 1));

        let telemetry = settings.debug_overlay.then(|| {
            format!(
                "{} | seg {} | lat {:+.2} | yaw {:+.2} | road {} | obstacles {} | particles {} | crashes {}",
                state.phase.as_str(),
                state.segment(),
                state.car.lateral,
                state.car.yaw,
                state.road.curve.len(),
                state.road.obstacles().len(),
                state.particles.len(),
                state.crashes
            )
        });

        let banner = match state.phase {
            GamePhase::Crashed { .. } | GamePhase::Restartable => {
                let cause = state
                    .last_crash
                    .map(|c| format!("You {}!", c))
                    .unwrap_or_else(|| "Crashed!".to_string());
                Some(format!("{} {:.0} m", cause, state.crash_distance))
            }
            GamePhase::Paused => Some("Paused".to_string()),
            _ => None,
        };

        Self {
            distance: format!("{:.0} m", state.car.distance),
            speed: format!("{:.0} km/h", state.car.speed * MPS_TO_KMH),
            laps,
            telemetry,
            banner,
            buttons: Buttons::for_phase(state.phase),
        }
    }
}
