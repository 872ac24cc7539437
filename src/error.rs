//! Error values shared by the terminal link.

use std::io;
use thiserror::Error;

/// Failure kinds surfaced by the link layer.
///
/// Drawing calls never return these; they are logged at the call site and the
/// channel degrades to a disconnected no-op. Connection, option parsing and
/// launch helpers return them directly.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The helper binary could not be forked.
    #[error("failed to launch plotterm helper {path}: {source}")]
    SpawnFailure {
        path: String,
        #[source]
        source: io::Error,
    },

    /// No endpoint accepted a connection within the retry budget.
    #[error("could not connect to {endpoint} after {hops} fallback hop(s)")]
    ConnectTimeout { endpoint: String, hops: u8 },

    /// The readiness wait failed for a reason other than a signal.
    #[error("select() failed: {0}")]
    Readiness(#[source] io::Error),

    /// Duplicated or contradicting option tokens in one invocation.
    #[error("duplicated or contradicting arguments in terminal options: {0}")]
    OptionConflict(String),

    /// An option token or its argument could not be understood.
    #[error("{0}")]
    InvalidOption(String),

    /// Transport failure while writing or reading a frame.
    #[error("channel error: {0}")]
    Channel(#[source] io::Error),

    /// Malformed bytes on the wire.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl LinkError {
    /// True for errors that come from the user's option string.
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::OptionConflict(_) | Self::InvalidOption(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_errors_are_user_facing() {
        assert!(LinkError::OptionConflict("raise".into()).is_user_error());
        assert!(LinkError::InvalidOption("size".into()).is_user_error());
        let io_err = LinkError::Channel(io::Error::new(io::ErrorKind::BrokenPipe, "gone"));
        assert!(!io_err.is_user_error());
    }

    #[test]
    fn connect_timeout_message_names_endpoint() {
        let err = LinkError::ConnectTimeout {
            endpoint: "plotterm42".to_string(),
            hops: 2,
        };
        assert_eq!(
            err.to_string(),
            "could not connect to plotterm42 after 2 fallback hop(s)"
        );
    }
}
