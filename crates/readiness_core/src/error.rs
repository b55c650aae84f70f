use std::num::ParseIntError;

use shared::domain::NormalisedIndex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("websocket is not connected")]
    NotConnected,
    #[error("websocket writer has shut down")]
    Closed,
    #[error("invalid socket.io endpoint {host}:{port}: {reason}")]
    InvalidEndpoint {
        host: String,
        port: u16,
        reason: String,
    },
}

/// An operator action that cannot be turned into a remote command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("{action} needs {expected}")]
    MissingArgument {
        action: &'static str,
        expected: &'static str,
    },
    #[error("invalid position {raw:?}: {source}")]
    InvalidPosition {
        raw: String,
        #[source]
        source: ParseIntError,
    },
    #[error("position {position} outside {min}..={max}")]
    PositionOutOfRange {
        position: NormalisedIndex,
        min: NormalisedIndex,
        max: NormalisedIndex,
    },
}
