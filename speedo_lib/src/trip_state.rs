#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Coarse lifecycle position of a trip.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Paused,
    Stopped,
}

/// Snapshot of a trip. Cheap to copy, handed to observers after every change.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TripState {
    /// m/s
    pub speed: f32,
    /// Meters since the last start
    pub distance: f64,
    /// Seconds spent running
    pub elapsed_time: u64,
    pub is_running: bool,
    pub has_started: bool,
    pub has_stopped: bool,
}

impl TripState {
    pub fn phase(&self) -> Phase {
        match (self.has_started, self.is_running, self.has_stopped) {
            (true, true, _) => Phase::Running,
            (true, false, _) => Phase::Paused,
            (false, _, true) => Phase::Stopped,
            (false, _, false) => Phase::Idle,
        }
    }

    /// Whole km/h, truncated the way a speedometer needle would read it.
    pub fn speed_kmh(&self) -> u32 {
        (self.speed * 3.6) as u32
    }

    pub fn distance_km(&self) -> f64 {
        self.distance / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_idle() {
        let state = TripState::default();
        assert_eq!(state.phase(), Phase::Idle);
        assert_eq!(state.speed, 0.0);
        assert_eq!(state.distance, 0.0);
        assert_eq!(state.elapsed_time, 0);
    }

    #[test]
    fn phase_follows_flags() {
        let running = TripState { is_running: true, has_started: true, ..Default::default() };
        assert_eq!(running.phase(), Phase::Running);

        let paused = TripState { has_started: true, ..Default::default() };
        assert_eq!(paused.phase(), Phase::Paused);

        let stopped = TripState { has_stopped: true, distance: 12.0, ..Default::default() };
        assert_eq!(stopped.phase(), Phase::Stopped);
    }

    #[test]
    fn unit_conversions() {
        let state = TripState { speed: 33.33, distance: 12610.0, ..Default::default() };
        assert_eq!(state.speed_kmh(), 119);
        assert!((state.distance_km() - 12.61).abs() < 1e-9);
    }
}
