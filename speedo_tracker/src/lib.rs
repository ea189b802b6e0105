use std::fmt;

pub mod config;
pub mod source;
mod subscription;
pub mod ticker;
mod tracker;

pub use config::TrackerConfig;
pub use source::{LocationSource, SourceError, TickSource};
pub use tracker::*;

#[derive(Debug, Clone, PartialEq)]
pub enum TrackerError {
    Config(String),
    Source(String),
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerError::Config(msg) => write!(f, "invalid configuration: {msg}"),
            TrackerError::Source(msg) => write!(f, "location source unavailable: {msg}"),
        }
    }
}

impl std::error::Error for TrackerError {}
