//! Decoding of inbound read-model updates.
//!
//! The indexer's producer serializes its payload and then serializes the
//! resulting string again, so a message body is usually a JSON string
//! holding JSON. Plain JSON objects are accepted as well.

use serde::de::DeserializeOwned;
use serde_json::Value;
use votegate_sessions::ReadModelUpdate;

use crate::error::CodecError;
use crate::inbound::{AllSessionsResponse, HistoryResponse, SessionResponse};
use crate::topics::Topic;

/// Decode a raw message body received on `topic`.
pub fn decode_update(topic: &str, bytes: &[u8]) -> Result<ReadModelUpdate, CodecError> {
    let value: Value = serde_json::from_slice(bytes).map_err(|e| CodecError::Malformed {
        topic: topic.to_string(),
        reason: e.to_string(),
    })?;
    decode_update_value(topic, value)
}

/// Decode an already-parsed message body received on `topic`.
pub fn decode_update_value(topic: &str, value: Value) -> Result<ReadModelUpdate, CodecError> {
    let topic = Topic::parse(topic)?;
    if !topic.is_inbound() {
        return Err(CodecError::NotInbound(topic.to_string()));
    }

    let value = unwrap_string(topic, value)?;
    match topic {
        Topic::AllSessionsResponse => {
            let response: AllSessionsResponse = parse(topic, value)?;
            Ok(ReadModelUpdate::AllSessions(response.into_summaries()?))
        }
        Topic::SessionResponse => {
            let response: SessionResponse = parse(topic, value)?;
            Ok(ReadModelUpdate::SessionDetail(response.into_detail()?))
        }
        Topic::HistoryResponse => {
            let response: HistoryResponse = parse(topic, value)?;
            let (identity, entries) = response.into_parts()?;
            Ok(ReadModelUpdate::UserHistory { identity, entries })
        }
        other => Err(CodecError::NotInbound(other.to_string())),
    }
}

fn unwrap_string(topic: Topic, value: Value) -> Result<Value, CodecError> {
    match value {
        Value::String(inner) => serde_json::from_str(&inner).map_err(|e| CodecError::Malformed {
            topic: topic.to_string(),
            reason: format!("double-encoded payload: {e}"),
        }),
        other => Ok(other),
    }
}

fn parse<T: DeserializeOwned>(topic: Topic, value: Value) -> Result<T, CodecError> {
    serde_json::from_value(value).map_err(|e| CodecError::Malformed {
        topic: topic.to_string(),
        reason: e.to_string(),
    })
}
