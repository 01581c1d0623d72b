//! Event bus tests.
//!
//! Covers topic routing, subscription lifetime and teardown.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use raybot_core::{CmdAckEvent, Event, EventBus, ESP_CMD_ACK_TOPIC, PIC_CMD_ACK_TOPIC};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

async fn wait_for_subscribers(bus: &EventBus, topic: &str, expected: usize) {
    for _ in 0..100 {
        if bus.subscriber_count(topic) == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!(
        "expected {} subscribers on {}, found {}",
        expected,
        topic,
        bus.subscriber_count(topic)
    );
}

#[tokio::test]
async fn test_subscription_registered_before_return() {
    let bus = EventBus::new();
    let token = CancellationToken::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    bus.subscribe(&token, PIC_CMD_ACK_TOPIC, move |msg| {
        let _ = tx.send(msg.payload);
    });

    // Published immediately after subscribe: must not be missed.
    let delivered = bus.publish(PIC_CMD_ACK_TOPIC, Event::PicCmdAck(CmdAckEvent::success("id1")));
    assert_eq!(delivered, 1);

    let payload = rx.recv().await.unwrap();
    assert_eq!(payload, Event::PicCmdAck(CmdAckEvent::success("id1")));
    token.cancel();
}

#[tokio::test]
async fn test_each_subscriber_gets_each_event_once() {
    let bus = EventBus::new();
    let token = CancellationToken::new();
    let count = Arc::new(AtomicUsize::new(0));

    for _ in 0..3 {
        let count = count.clone();
        bus.subscribe(&token, ESP_CMD_ACK_TOPIC, move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        });
    }

    assert_eq!(bus.subscriber_count(ESP_CMD_ACK_TOPIC), 3);
    bus.publish(ESP_CMD_ACK_TOPIC, Event::EspCmdAck(CmdAckEvent::success("a")));
    bus.publish(ESP_CMD_ACK_TOPIC, Event::EspCmdAck(CmdAckEvent::failure("b")));

    for _ in 0..100 {
        if count.load(Ordering::SeqCst) == 6 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    assert_eq!(count.load(Ordering::SeqCst), 6);
    token.cancel();
}

#[tokio::test]
async fn test_cancel_tears_down_subscription() {
    let bus = EventBus::new();
    let token = CancellationToken::new();
    let count = Arc::new(AtomicUsize::new(0));

    let counter = count.clone();
    bus.subscribe(&token, PIC_CMD_ACK_TOPIC, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(bus.subscriber_count(PIC_CMD_ACK_TOPIC), 1);

    token.cancel();
    wait_for_subscribers(&bus, PIC_CMD_ACK_TOPIC, 0).await;

    let delivered = bus.publish(PIC_CMD_ACK_TOPIC, Event::PicCmdAck(CmdAckEvent::success("late")));
    assert_eq!(delivered, 0);
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_child_token_cancelled_by_parent() {
    let bus = EventBus::new();
    let parent = CancellationToken::new();
    let child = parent.child_token();

    bus.subscribe(&child, PIC_CMD_ACK_TOPIC, |_| {});
    assert_eq!(bus.subscriber_count(PIC_CMD_ACK_TOPIC), 1);

    parent.cancel();
    wait_for_subscribers(&bus, PIC_CMD_ACK_TOPIC, 0).await;
}

#[tokio::test]
async fn test_late_subscriber_misses_event() {
    let bus = EventBus::new();
    let token = CancellationToken::new();

    bus.publish(PIC_CMD_ACK_TOPIC, Event::PicCmdAck(CmdAckEvent::success("early")));

    let (tx, mut rx) = mpsc::unbounded_channel();
    bus.subscribe(&token, PIC_CMD_ACK_TOPIC, move |msg| {
        let _ = tx.send(msg);
    });

    let result = tokio::time::timeout(Duration::from_millis(20), rx.recv()).await;
    assert!(result.is_err());
    token.cancel();
}

#[tokio::test]
async fn test_owned_subscription_receives_and_unregisters_on_drop() {
    let bus = EventBus::new();
    let mut subscription = bus.subscription(ESP_CMD_ACK_TOPIC);

    bus.publish(PIC_CMD_ACK_TOPIC, Event::PicCmdAck(CmdAckEvent::success("pic")));
    let delivered = bus.publish(ESP_CMD_ACK_TOPIC, Event::EspCmdAck(CmdAckEvent::failure("esp")));
    assert_eq!(delivered, 1);

    let message = subscription.recv().await.unwrap();
    assert_eq!(message.topic, ESP_CMD_ACK_TOPIC);
    assert_eq!(message.payload, Event::EspCmdAck(CmdAckEvent::failure("esp")));

    drop(subscription);
    assert_eq!(bus.subscriber_count(ESP_CMD_ACK_TOPIC), 0);
    let delivered = bus.publish(ESP_CMD_ACK_TOPIC, Event::EspCmdAck(CmdAckEvent::success("late")));
    assert_eq!(delivered, 0);
}
