//! Integration tests for the PUSH/PULL event and PUB/SUB telemetry channels.

use std::time::Duration;

use edgekb_bus::topics;
use edgekb_bus::transport::Transport;
use edgekb_bus::{
    EventPublisher, EventSubscriber, Message, StatusEvent, TelemetryReading, ZmqPublisher,
    ZmqPuller, ZmqPusher, ZmqSubscriber,
};
use serde_json::json;
use tokio::time::timeout;

const SETTLE: Duration = Duration::from_millis(200);
const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn status_event_roundtrip() {
    let transport = Transport::tcp("127.0.0.1", 16100);

    let pusher = ZmqPusher::bind(&transport).await.unwrap();
    let puller = ZmqPuller::connect(&transport).await.unwrap();
    tokio::time::sleep(SETTLE).await;

    let event = StatusEvent {
        goal_id: "g1".into(),
        status: "Stoppable".into(),
        plugin_name: "Cloud".into(),
    };
    pusher
        .publish(Message::new(topics::event_topic(&event.status), &event).unwrap())
        .await
        .unwrap();
    assert_eq!(pusher.pending().await, 0);

    let received: StatusEvent = timeout(TIMEOUT, puller.recv_json())
        .await
        .expect("timed out")
        .unwrap();
    assert_eq!(received, event);
}

#[tokio::test]
async fn telemetry_prefix_filtering() {
    let transport = Transport::tcp("127.0.0.1", 16110);

    let publisher = ZmqPublisher::bind(&transport).await.unwrap();
    let subscriber = ZmqSubscriber::connect(&transport).await.unwrap();
    subscriber.subscribe(topics::TELEMETRY_PREFIX).await.unwrap();
    tokio::time::sleep(SETTLE).await;

    // Not under `env.`: filtered out by the SUB socket.
    publisher
        .publish(Message::new("sys.cpu", &json!({"name": "sys.cpu", "value": 1})).unwrap())
        .await
        .unwrap();
    publisher
        .publish(
            Message::new(
                "env.system.time",
                &json!({"name": "env.system.time", "timestamp": 1, "value": "11"}),
            )
            .unwrap(),
        )
        .await
        .unwrap();

    let received = timeout(TIMEOUT, subscriber.recv())
        .await
        .expect("timed out")
        .unwrap();
    assert_eq!(received.topic, "env.system.time");
    let reading: TelemetryReading = received.decode().unwrap();
    assert_eq!(reading.name, "env.system.time");
    assert_eq!(reading.value, json!("11"));

    let nothing = timeout(Duration::from_millis(300), subscriber.recv()).await;
    assert!(nothing.is_err(), "should not receive filtered message");
}

#[tokio::test]
async fn publisher_can_connect_to_bound_subscriber() {
    // Telemetry producers sometimes connect rather than bind.
    let transport = Transport::tcp("127.0.0.1", 16120);

    use zeromq::prelude::*;
    let mut bound = zeromq::SubSocket::new();
    bound.bind(&transport.endpoint()).await.unwrap();
    bound.subscribe("").await.unwrap();

    let publisher = ZmqPublisher::connect(&transport).await.unwrap();
    tokio::time::sleep(SETTLE).await;

    publisher
        .publish(Message::new("env.temp", &json!({"name": "env.temp", "value": 3})).unwrap())
        .await
        .unwrap();

    let msg = timeout(TIMEOUT, bound.recv()).await.expect("timed out").unwrap();
    let frames: Vec<_> = msg.iter().collect();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].as_ref(), b"env.temp");
}
