use speedo_lib::{
    TripState,
    display::{format_distance, format_elapsed, format_speed},
};
use speedo_tracker::TrackerNotice;

/// One status line, e.g. `  42 km/h |  12.61 km | 01:02:59 | Running [pause/stop]`
pub fn render(state: &TripState) -> String {
    let phase = state.phase();
    let controls: Vec<&str> = phase.available_commands().iter().map(|c| c.name()).collect();

    format!(
        "{:>4} km/h | {:>6} km | {} | {} [{}]",
        format_speed(state),
        format_distance(state),
        format_elapsed(state.elapsed_time),
        phase.label(),
        controls.join("/")
    )
}

pub fn render_json(state: &TripState) -> anyhow::Result<String> {
    Ok(serde_json::to_string(state)?)
}

pub fn render_notice(notice: &TrackerNotice) -> String {
    match notice {
        TrackerNotice::PermissionDenied(reason) => format!("! location permission denied ({reason}), still timing"),
        TrackerNotice::FixDropped(reason) => format!("! fix dropped: {reason}"),
        TrackerNotice::SourceEnded => "! location source ended, trip paused".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_a_running_trip() {
        let state = TripState {
            speed: 33.33,
            distance: 12610.0,
            elapsed_time: 3779,
            is_running: true,
            has_started: true,
            has_stopped: false,
        };

        assert_eq!(render(&state), " 119 km/h |  12.61 km | 01:02:59 | Running [pause/stop]");
    }

    #[test]
    fn renders_idle_and_paused() {
        assert_eq!(render(&TripState::default()), "   0 km/h |   0.00 km | 00:00:00 | Tap to start [start]");

        let paused = TripState { has_started: true, elapsed_time: 61, ..Default::default() };
        assert_eq!(render(&paused), "   0 km/h |   0.00 km | 00:01:01 | Paused [resume/stop]");
    }

    #[test]
    fn json_snapshot_has_every_field() {
        let json = render_json(&TripState::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        for key in ["speed", "distance", "elapsed_time", "is_running", "has_started", "has_stopped"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
    }
}
