//! Producers feeding the tracker: location fixes and timer ticks.
//!
//! Both are modelled as subscriptions returning a boxed stream. Dropping the
//! stream is the unsubscribe; implementations must release whatever they hold
//! from the platform when that happens.

use std::fmt;

use futures::stream::BoxStream;
use speedo_lib::LocationFix;

mod channel;
mod gpx_replay;

pub use channel::{ChannelSource, FixSender};
pub use gpx_replay::GpxReplaySource;

pub type FixStream = BoxStream<'static, Result<LocationFix, SourceError>>;
pub type TickStream = BoxStream<'static, ()>;

#[derive(Debug, Clone, PartialEq)]
pub enum SourceError {
    /// Location authorization is missing or was revoked. Ends the subscription.
    PermissionDenied(String),
    /// A single fix could not be delivered. The stream keeps going.
    Transient(String),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::PermissionDenied(reason) => write!(f, "location permission denied: {reason}"),
            SourceError::Transient(reason) => write!(f, "fix dropped: {reason}"),
        }
    }
}

impl std::error::Error for SourceError {}

pub trait LocationSource: Send + Sync + 'static {
    /// Starts location updates. Lazy and possibly infinite; a
    /// `PermissionDenied` item means no further fixes will follow.
    ///
    /// Called outside the tracker's lock, so it may read the tracker.
    fn subscribe(&self) -> FixStream;
}

pub trait TickSource: Send + Sync + 'static {
    /// One item per elapsed period, the first one a full period after subscribing.
    fn subscribe(&self) -> TickStream;
}
