use std::{str::FromStr, time::Duration};

use speedo_lib::DistanceModel;

use crate::TrackerError;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);
/// Update interval requested from the location provider
pub const DEFAULT_FIX_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_NOTICE_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    pub tick_interval: Duration,
    pub fix_interval: Duration,
    pub distance_model: DistanceModel,
    /// Notices kept for slow readers before the oldest are dropped
    pub notice_capacity: usize,

    /// GPX playback speed, 2.0 replays twice as fast as recorded
    pub replay_rate: f64,
    pub min_replay_interval: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            fix_interval: DEFAULT_FIX_INTERVAL,
            distance_model: DistanceModel::Geodesic,
            notice_capacity: DEFAULT_NOTICE_CAPACITY,
            replay_rate: 1.0,
            min_replay_interval: Duration::from_millis(50),
        }
    }
}

impl TrackerConfig {
    /// Parses `key = value` lines on top of the defaults. Blank lines and
    /// lines starting with `#` are skipped, unknown keys are logged and ignored.
    pub fn parse(text: &str) -> Result<Self, TrackerError> {
        let mut config = Self::default();

        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(TrackerError::Config(format!("line {}: expected `key = value`, got {:?}", number + 1, line)));
            };
            let (key, value) = (key.trim(), value.trim());

            match key {
                "tick_interval_ms" => config.tick_interval = Duration::from_millis(parse_value(key, value)?),
                "fix_interval_ms" => config.fix_interval = Duration::from_millis(parse_value(key, value)?),
                "min_replay_interval_ms" => config.min_replay_interval = Duration::from_millis(parse_value(key, value)?),
                "notice_capacity" => config.notice_capacity = parse_value(key, value)?,
                "replay_rate" => config.replay_rate = parse_value(key, value)?,
                "distance_model" => {
                    config.distance_model = match value.to_lowercase().as_str() {
                        "geodesic" => DistanceModel::Geodesic,
                        "haversine" => DistanceModel::Haversine,
                        other => return Err(TrackerError::Config(format!("unknown distance model {:?}", other))),
                    }
                }
                _ => tracing::warn!("Unknown config key: {}", key),
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), TrackerError> {
        if self.tick_interval.is_zero() {
            return Err(TrackerError::Config("tick interval must be positive".into()));
        }
        if self.fix_interval.is_zero() {
            return Err(TrackerError::Config("fix interval must be positive".into()));
        }
        if self.notice_capacity == 0 {
            return Err(TrackerError::Config("notice capacity must be at least 1".into()));
        }
        if !(self.replay_rate.is_finite() && self.replay_rate > 0.0) {
            return Err(TrackerError::Config(format!("replay rate must be a positive number, got {}", self.replay_rate)));
        }
        Ok(())
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, TrackerError> {
    value
        .parse()
        .map_err(|_| TrackerError::Config(format!("bad value for {}: {:?}", key, value)))
}
