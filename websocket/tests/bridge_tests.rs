//! Drives the `/ws` endpoint over a real socket.

use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use votegate_messages::{DomainEvent, EventPublisher};
use votegate_nullables::NullClock;
use votegate_sessions::ReadModelUpdate;
use votegate_types::SessionId;
use votegate_websocket::{router, WsPublisher, WsState};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start() -> (Client, Arc<WsState>, tokio::sync::mpsc::Receiver<ReadModelUpdate>) {
    let (state, updates) = WsState::new(16);
    let state = Arc::new(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    let (client, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    (client, state, updates)
}

async fn next_json(client: &mut Client) -> serde_json::Value {
    let frame = tokio::time::timeout(Duration::from_secs(5), client.next())
        .await
        .expect("frame in time")
        .expect("stream open")
        .expect("valid frame");
    match frame {
        Message::Text(text) => serde_json::from_str(&text).unwrap(),
        other => panic!("unexpected frame {other:?}"),
    }
}

async fn send(client: &mut Client, value: serde_json::Value) {
    client.send(Message::Text(value.to_string())).await.unwrap();
}

#[tokio::test]
async fn subscriber_receives_published_events() {
    let (mut client, state, _updates) = start().await;

    send(&mut client, serde_json::json!({"action": "subscribe", "topic": "voting-request"})).await;
    let ack = next_json(&mut client).await;
    assert_eq!(ack["type"], "ack");
    assert_eq!(ack["topic"], "voting-request");

    let publisher = WsPublisher::new(state, Arc::new(NullClock::new(60)));
    publisher
        .publish(&DomainEvent::detail_requested(&SessionId::new("4")))
        .unwrap();

    let event = next_json(&mut client).await;
    assert_eq!(event["topic"], "voting-request");
    assert_eq!(event["key"], "4");
    assert_eq!(event["event_type"], "VotingDetailsRequested");
    assert_eq!(event["data"]["votingId"], "4");
    assert_eq!(event["timestamp"], "1970-01-01T00:01:00Z");
}

#[tokio::test]
async fn indexer_updates_are_decoded_and_queued() {
    let (mut client, _state, mut updates) = start().await;

    let payload = serde_json::json!({
        "votings": [{"id": "1", "title": "t", "description": "", "startDate": 0, "endDate": 10}]
    })
    .to_string();
    send(
        &mut client,
        serde_json::json!({"action": "update", "topic": "all-votings-response", "payload": payload}),
    )
    .await;

    let ack = next_json(&mut client).await;
    assert_eq!(ack["type"], "ack");
    assert_eq!(ack["action"], "update");

    let Some(ReadModelUpdate::AllSessions(summaries)) = updates.recv().await else {
        panic!("expected snapshot");
    };
    assert_eq!(summaries[0].id, SessionId::new("1"));
}

#[tokio::test]
async fn bad_messages_get_error_replies() {
    let (mut client, _state, _updates) = start().await;

    send(&mut client, serde_json::json!({"action": "subscribe", "topic": "voting-response"})).await;
    assert_eq!(next_json(&mut client).await["type"], "error");

    send(&mut client, serde_json::json!({"action": "update", "topic": "voting-response", "payload": 5})).await;
    assert_eq!(next_json(&mut client).await["type"], "error");

    send(&mut client, serde_json::json!({"action": "unsubscribe", "topic": "vote-cast"})).await;
    assert_eq!(next_json(&mut client).await["type"], "error");

    send(&mut client, serde_json::json!({"action": "ping"})).await;
    assert_eq!(next_json(&mut client).await["type"], "pong");
}
