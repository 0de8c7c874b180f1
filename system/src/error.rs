use thiserror::Error;

/// Problems with a single inbound message. The message is dropped; the engine carries on.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unknown destination: {0}")]
    UnknownDestination(String),
    #[error("malformed body on {destination}: {source}")]
    MalformedBody {
        destination: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid segment: {0}")]
    InvalidSegment(&'static str),
    #[error("frame codec: {0}")]
    Codec(#[from] bincode::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    #[error("not connected")]
    NotConnected,
}
