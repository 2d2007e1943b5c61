//! Error types for the polling pipeline

use std::fmt;

/// Result type alias for pipeline operations
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors an actor can finish with
///
/// The first actor of a [`Group`](crate::actors::group::Group) to return decides
/// the group's result, so these double as the process exit reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The telemetry source could not be queried (fatal, never retried)
    Source(String),

    /// An OS shutdown signal was received
    Signal(String),

    /// A neighbouring pipeline stage went away
    ChannelClosed(&'static str),

    /// apply/collect was issued to a collector that has already stopped
    CollectorStopped,

    /// The gauge sink rejected an operation
    Metrics(String),

    /// The HTTP listener failed
    Server(String),

    /// An actor task panicked
    Panicked(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Source(msg) => write!(f, "failed to query telemetry source: {}", msg),
            Error::Signal(sig) => write!(f, "received signal {}", sig),
            Error::ChannelClosed(stage) => write!(f, "{} channel closed", stage),
            Error::CollectorStopped => write!(f, "gauge collector has stopped"),
            Error::Metrics(msg) => write!(f, "metrics error: {}", msg),
            Error::Server(msg) => write!(f, "HTTP server error: {}", msg),
            Error::Panicked(msg) => write!(f, "actor panicked: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<prometheus::Error> for Error {
    fn from(err: prometheus::Error) -> Self {
        Error::Metrics(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Server(err.to_string())
    }
}
