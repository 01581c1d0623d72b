//! Command acknowledgment tracking.
//!
//! An [`AckWaiter`] owns a subscription to a subsystem's ACK topic for a
//! single correlation id. It is registered before the envelope is written
//! and unregistered as soon as the waiter is consumed or dropped, so no
//! registration outlives the dispatch that created it.

use std::time::Duration;

use raybot_core::{CmdAckEvent, Event, EventBus, Subscription};
use tokio_util::sync::CancellationToken;

use crate::controller::Subsystem;
use crate::error::DispatchError;

/// Pending acknowledgment for one dispatched envelope.
pub struct AckWaiter {
    subsystem: Subsystem,
    id: String,
    subscription: Subscription,
}

impl AckWaiter {
    /// Subscribe to the subsystem's ACK topic for `id`.
    ///
    /// The subscription is live when this returns.
    pub fn register(bus: &EventBus, subsystem: Subsystem, id: impl Into<String>) -> Self {
        let id = id.into();
        let subscription = bus.subscription(subsystem.ack_topic());

        tracing::info!(subsystem = %subsystem, id = %id, "start tracking command ack");
        Self {
            subsystem,
            id,
            subscription,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wait for the acknowledgment, the timeout or cancellation of `scope`,
    /// whichever comes first.
    pub async fn wait(self, timeout: Duration, scope: &CancellationToken) -> Result<(), DispatchError> {
        let AckWaiter {
            subsystem,
            id,
            mut subscription,
        } = self;

        let outcome = tokio::select! {
            biased;
            success = next_ack(&mut subscription, subsystem, &id) => match success {
                Some(true) => {
                    tracing::info!(subsystem = %subsystem, id = %id, "command ack success");
                    Ok(())
                }
                Some(false) => {
                    tracing::error!(subsystem = %subsystem, id = %id, "command ack failed");
                    Err(DispatchError::AckRejected { subsystem, id: id.clone() })
                }
                // Topic closed before any matching ack.
                None => Err(DispatchError::Canceled { subsystem, id: id.clone() }),
            },
            _ = scope.cancelled() => Err(DispatchError::Canceled { subsystem, id: id.clone() }),
            _ = tokio::time::sleep(timeout) => {
                tracing::error!(subsystem = %subsystem, id = %id, ?timeout, "command ack timeout");
                Err(DispatchError::AckTimeout { subsystem, id: id.clone() })
            }
        };

        drop(subscription);
        tracing::info!(subsystem = %subsystem, id = %id, "stop tracking command ack");
        outcome
    }
}

/// Outcome of the first ACK for `id`. Malformed payloads and other ids are
/// skipped.
async fn next_ack(subscription: &mut Subscription, subsystem: Subsystem, id: &str) -> Option<bool> {
    while let Some(message) = subscription.recv().await {
        let Some(ack) = subsystem.ack_payload(&message.payload) else {
            tracing::error!(
                subsystem = %subsystem,
                id = %id,
                event = message.payload.type_name(),
                "invalid ack event"
            );
            continue;
        };
        if ack.id == id {
            return Some(ack.success);
        }
    }
    None
}

impl Subsystem {
    fn ack_payload<'a>(&self, event: &'a Event) -> Option<&'a CmdAckEvent> {
        match (self, event) {
            (Subsystem::Pic, Event::PicCmdAck(ack)) | (Subsystem::Esp, Event::EspCmdAck(ack)) => {
                Some(ack)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raybot_core::{ESP_CMD_ACK_TOPIC, PIC_CMD_ACK_TOPIC};

    #[tokio::test]
    async fn test_waiter_resolves_on_matching_ack() {
        let bus = EventBus::new();
        let scope = CancellationToken::new();
        let waiter = AckWaiter::register(&bus, Subsystem::Pic, "abc");

        bus.publish(PIC_CMD_ACK_TOPIC, Event::PicCmdAck(CmdAckEvent::success("other")));
        bus.publish(PIC_CMD_ACK_TOPIC, Event::PicCmdAck(CmdAckEvent::success("abc")));

        let result = waiter.wait(Duration::from_secs(1), &scope).await;
        assert!(result.is_ok());
        assert_eq!(bus.subscriber_count(PIC_CMD_ACK_TOPIC), 0);
    }

    #[tokio::test]
    async fn test_waiter_ignores_foreign_payload() {
        let bus = EventBus::new();
        let scope = CancellationToken::new();
        let waiter = AckWaiter::register(&bus, Subsystem::Pic, "abc");

        // ESP payload on the PIC topic is malformed for this waiter.
        bus.publish(PIC_CMD_ACK_TOPIC, Event::EspCmdAck(CmdAckEvent::success("abc")));
        bus.publish(PIC_CMD_ACK_TOPIC, Event::PicCmdAck(CmdAckEvent::failure("abc")));

        let err = waiter.wait(Duration::from_secs(1), &scope).await.unwrap_err();
        assert!(err.is_rejected());
    }

    #[tokio::test]
    async fn test_dropped_waiter_unregisters() {
        let bus = EventBus::new();
        let waiter = AckWaiter::register(&bus, Subsystem::Esp, "abc");
        assert_eq!(waiter.id(), "abc");
        assert_eq!(bus.subscriber_count(ESP_CMD_ACK_TOPIC), 1);

        drop(waiter);
        assert_eq!(bus.subscriber_count(ESP_CMD_ACK_TOPIC), 0);
    }
}
