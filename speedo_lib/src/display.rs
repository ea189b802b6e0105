//! Text formatting for speedometer front ends.

use crate::{
    reducer::TripCommand,
    trip_state::{Phase, TripState},
};

impl Phase {
    /// Status line shown under the controls
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Idle => "Tap to start",
            Phase::Running => "Running",
            Phase::Paused => "Paused",
            Phase::Stopped => "Tap to reset",
        }
    }

    /// The controls a front end should offer in this phase, in display order.
    pub fn available_commands(&self) -> &'static [TripCommand] {
        match self {
            Phase::Idle => &[TripCommand::Start],
            Phase::Running => &[TripCommand::Pause, TripCommand::Stop],
            Phase::Paused => &[TripCommand::Resume, TripCommand::Stop],
            Phase::Stopped => &[TripCommand::Reset],
        }
    }
}

impl TripCommand {
    pub fn name(&self) -> &'static str {
        match self {
            TripCommand::Start => "start",
            TripCommand::Resume => "resume",
            TripCommand::Pause => "pause",
            TripCommand::Stop => "stop",
            TripCommand::Reset => "reset",
        }
    }
}

pub fn format_speed(state: &TripState) -> String {
    state.speed_kmh().to_string()
}

/// Kilometers with two decimals
pub fn format_distance(state: &TripState) -> String {
    format!("{:.2}", state.distance_km())
}

/// HH:MM:SS. Hours keep counting past 99.
pub fn format_elapsed(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let seconds = seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}
