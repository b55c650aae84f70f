use thiserror::Error;

/// Failures decoding a socket.io / Engine.IO text frame.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("empty frame")]
    EmptyFrame,
    #[error("unknown engine.io packet type {0:?}")]
    UnknownPacket(char),
    #[error("unknown socket.io packet type {0:?}")]
    UnknownSocketPacket(char),
    #[error("invalid frame json: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("malformed event frame: {0}")]
    MalformedEvent(&'static str),
}
