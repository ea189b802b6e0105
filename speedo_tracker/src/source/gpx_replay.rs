use std::{
    io::Read,
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use futures::{StreamExt, stream};
use speedo_lib::{DistanceModel, LocationFix};

use super::{FixStream, LocationSource};
use crate::{TrackerConfig, TrackerError};

/// Replays a recorded GPX track as if it were a live location provider.
///
/// All subscriptions share one replay position: a new subscription continues
/// with the first point no earlier subscription emitted, so a resumed trip
/// picks up where the device was instead of jumping back to the start.
/// Fixes are spaced by the recorded time gaps divided by the replay rate; the
/// stream ends after the last point.
#[derive(Clone)]
pub struct GpxReplaySource {
    points: Arc<Vec<ReplayPoint>>,
    cursor: Arc<AtomicUsize>,
}

#[derive(Debug, Clone)]
struct ReplayPoint {
    fix: LocationFix,
    /// Pause before this point is emitted. The first point waits one provider interval.
    delay: Duration,
}

impl GpxReplaySource {
    pub fn open(path: impl AsRef<Path>, config: &TrackerConfig) -> Result<Self, TrackerError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| TrackerError::Source(format!("Failed to open {:?}: {}", path, e)))?;
        Self::from_reader(std::io::BufReader::new(file), config)
    }

    pub fn from_reader(reader: impl Read, config: &TrackerConfig) -> Result<Self, TrackerError> {
        let gpx = gpx::read(reader).map_err(|e| TrackerError::Source(format!("Failed to parse GPX: {}", e)))?;

        let waypoints: Vec<gpx::Waypoint> = gpx
            .tracks
            .into_iter()
            .flat_map(|track| track.segments)
            .flat_map(|segment| segment.points)
            .collect();

        if waypoints.is_empty() {
            return Err(TrackerError::Source("GPX file has no track points".into()));
        }

        let fixes = to_fixes(&waypoints, config.fix_interval, config.distance_model);
        let points = pace(fixes, config);
        tracing::debug!("Loaded {} replay points", points.len());

        Ok(Self { points: Arc::new(points), cursor: Arc::new(AtomicUsize::new(0)) })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Index of the next point to be emitted.
    pub fn position(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }

    /// Replays the track from the first point again.
    pub fn rewind(&self) {
        self.cursor.store(0, Ordering::SeqCst);
    }
}

impl LocationSource for GpxReplaySource {
    fn subscribe(&self) -> FixStream {
        let points = self.points.clone();
        let cursor = self.cursor.clone();

        stream::unfold((), move |()| {
            let points = points.clone();
            let cursor = cursor.clone();
            async move {
                let index = cursor.load(Ordering::SeqCst);
                let point = points.get(index)?;
                tokio::time::sleep(point.delay).await;
                cursor.store(index + 1, Ordering::SeqCst);
                Some((Ok(point.fix), ()))
            }
        })
        .boxed()
    }
}

fn to_fixes(waypoints: &[gpx::Waypoint], fix_interval: Duration, model: DistanceModel) -> Vec<LocationFix> {
    let step = chrono::Duration::from_std(fix_interval).unwrap_or(chrono::Duration::seconds(1));
    let mut fixes: Vec<LocationFix> = Vec::with_capacity(waypoints.len());

    for waypoint in waypoints {
        let point = waypoint.point();
        let previous = fixes.last();

        // Points without a time are assumed to follow the previous one at the provider rate
        let timestamp = waypoint
            .time
            .as_ref()
            .and_then(|t| t.format().ok())
            .and_then(|t| DateTime::parse_from_rfc3339(&t).ok())
            .map(|t| t.with_timezone(&Utc))
            .or_else(|| previous.map(|p| p.timestamp + step))
            .unwrap_or_else(Utc::now);

        let speed = match (waypoint.speed, previous) {
            (Some(speed), _) => speed as f32,
            (None, Some(previous)) => {
                let here = LocationFix::new(point.y(), point.x(), 0.0, timestamp);
                let seconds = (timestamp - previous.timestamp).num_milliseconds() as f64 / 1000.0;
                if seconds > 0.0 { (previous.distance_to(&here, model) / seconds) as f32 } else { previous.speed }
            }
            (None, None) => 0.0,
        };
        let fix = LocationFix::new(point.y(), point.x(), speed, timestamp);

        fixes.push(fix);
    }

    fixes
}

fn pace(fixes: Vec<LocationFix>, config: &TrackerConfig) -> Vec<ReplayPoint> {
    let mut points = Vec::with_capacity(fixes.len());
    let mut previous: Option<DateTime<Utc>> = None;

    for fix in fixes {
        let recorded = previous
            .and_then(|p| (fix.timestamp - p).to_std().ok())
            .unwrap_or(config.fix_interval);
        previous = Some(fix.timestamp);

        points.push(ReplayPoint {
            fix,
            delay: scale(recorded, config),
        });
    }

    points
}

fn scale(recorded: Duration, config: &TrackerConfig) -> Duration {
    recorded.div_f64(config.replay_rate).max(config.min_replay_interval)
}
