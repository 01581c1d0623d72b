//! Events carried by the event bus.

use serde::{Deserialize, Serialize};

/// Topic on which the PIC reader publishes command acknowledgments.
pub const PIC_CMD_ACK_TOPIC: &str = "pic.cmd_ack";

/// Topic on which the ESP reader publishes command acknowledgments.
pub const ESP_CMD_ACK_TOPIC: &str = "esp.cmd_ack";

/// Acknowledgment reported by a microcontroller for one written command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CmdAckEvent {
    /// Correlation id of the acknowledged command.
    pub id: String,
    pub success: bool,
}

impl CmdAckEvent {
    pub fn success(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            success: true,
        }
    }

    pub fn failure(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            success: false,
        }
    }
}

/// Event payloads published on the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    PicCmdAck(CmdAckEvent),
    EspCmdAck(CmdAckEvent),
    /// Anything else, kept as raw JSON.
    Custom {
        kind: String,
        payload: serde_json::Value,
    },
}

impl Event {
    /// Get the event type name.
    pub fn type_name(&self) -> &str {
        match self {
            Event::PicCmdAck(_) => "PicCmdAck",
            Event::EspCmdAck(_) => "EspCmdAck",
            Event::Custom { kind, .. } => kind,
        }
    }

    /// The acknowledgment carried by this event, if any.
    pub fn as_cmd_ack(&self) -> Option<&CmdAckEvent> {
        match self {
            Event::PicCmdAck(ack) | Event::EspCmdAck(ack) => Some(ack),
            Event::Custom { .. } => None,
        }
    }
}
