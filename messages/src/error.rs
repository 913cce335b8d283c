use thiserror::Error;

/// Failures decoding inbound or encoding outbound event-stream payloads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("unknown topic: {0}")]
    UnknownTopic(String),

    #[error("topic {0} does not carry read-model updates")]
    NotInbound(String),

    #[error("malformed payload on {topic}: {reason}")]
    Malformed { topic: String, reason: String },

    #[error("invalid {field} on {topic}: {reason}")]
    InvalidField {
        topic: String,
        field: &'static str,
        reason: String,
    },

    #[error("encoding failed: {0}")]
    Encode(String),
}

/// Failures handing an event to the broker boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("publisher is closed")]
    Closed,

    #[error("transport error: {0}")]
    Transport(String),
}
