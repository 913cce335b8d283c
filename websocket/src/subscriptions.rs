//! Client protocol and per-connection subscription state.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use votegate_messages::{Envelope, Topic};

/// Optional filter for subscriptions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SubscriptionFilter {
    /// Only receive events with one of these partition keys.
    pub keys: Option<Vec<String>>,
}

/// A message from a client.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe {
        topic: Topic,
        #[serde(default)]
        filter: Option<SubscriptionFilter>,
    },
    Unsubscribe {
        topic: Topic,
    },
    Ping,
    /// A read-model update pushed by the indexer.
    Update {
        topic: String,
        payload: serde_json::Value,
    },
}

/// A message to a client.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Ack { action: String, topic: String },
    Error { message: String },
    Pong,
}

impl ServerMessage {
    pub fn ack(action: &str, topic: impl Into<String>) -> Self {
        Self::Ack {
            action: action.to_string(),
            topic: topic.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> String {
        // A tagged enum of strings always serializes.
        serde_json::to_string(self).unwrap_or_else(|_| String::from(r#"{"type":"error"}"#))
    }
}

/// Topics one client is subscribed to.
#[derive(Debug, Default)]
pub struct ClientSubscriptions {
    topics: HashMap<Topic, Option<SubscriptionFilter>>,
}

impl ClientSubscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, topic: Topic, filter: Option<SubscriptionFilter>) {
        self.topics.insert(topic, filter);
    }

    /// Returns whether the client was subscribed.
    pub fn unsubscribe(&mut self, topic: &Topic) -> bool {
        self.topics.remove(topic).is_some()
    }

    /// Whether `envelope` passes the client's filter for `topic`.
    pub fn matches_filter(&self, topic: &Topic, envelope: &Envelope) -> bool {
        match self.topics.get(topic) {
            None => false,
            Some(None) => true,
            Some(Some(filter)) => match &filter.keys {
                None => true,
                Some(keys) => envelope
                    .key
                    .as_ref()
                    .is_some_and(|k| keys.iter().any(|wanted| wanted == k)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use votegate_messages::DomainEvent;
    use votegate_types::{SessionId, Timestamp};

    #[test]
    fn client_messages_parse() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"action":"subscribe","topic":"vote-cast"}"#).unwrap();
        assert!(matches!(
            msg,
            ClientMessage::Subscribe {
                topic: Topic::VoteCast,
                filter: None
            }
        ));

        let msg: ClientMessage = serde_json::from_str(
            r#"{"action":"update","topic":"voting-response","payload":"{}"}"#,
        )
        .unwrap();
        assert!(matches!(msg, ClientMessage::Update { .. }));

        assert!(serde_json::from_str::<ClientMessage>(r#"{"action":"subscribe","topic":"x"}"#).is_err());
    }

    #[test]
    fn key_filter_selects_events() {
        let mut subs = ClientSubscriptions::new();
        subs.subscribe(
            Topic::SessionRequest,
            Some(SubscriptionFilter {
                keys: Some(vec!["7".into()]),
            }),
        );
        let wanted = Envelope::wrap(&DomainEvent::detail_requested(&SessionId::new("7")), Timestamp::EPOCH).unwrap();
        let other = Envelope::wrap(&DomainEvent::detail_requested(&SessionId::new("8")), Timestamp::EPOCH).unwrap();
        assert!(subs.matches_filter(&Topic::SessionRequest, &wanted));
        assert!(!subs.matches_filter(&Topic::SessionRequest, &other));
        assert!(!subs.matches_filter(&Topic::VoteCast, &wanted));

        assert!(subs.unsubscribe(&Topic::SessionRequest));
        assert!(!subs.unsubscribe(&Topic::SessionRequest));
    }

    #[test]
    fn server_messages_are_tagged() {
        assert_eq!(ServerMessage::Pong.to_json(), r#"{"type":"pong"}"#);
        assert_eq!(
            ServerMessage::ack("subscribe", "vote-cast").to_json(),
            r#"{"type":"ack","action":"subscribe","topic":"vote-cast"}"#
        );
    }
}
