//! Core traits and types for Raybot.
//!
//! This crate defines the foundational pieces shared by the hardware and
//! command crates: configuration, the topic event bus, bus events and the
//! cloud session domain.

pub mod config;
pub mod error;
pub mod event;
pub mod eventbus;
pub mod session;

pub use config::{AppConfig, CloudConfig, HardwareConfig, LogConfig, SerialConfig};
pub use error::{Error, Result};
pub use event::{CmdAckEvent, Event, ESP_CMD_ACK_TOPIC, PIC_CMD_ACK_TOPIC};
pub use eventbus::{EventBus, Message, Subscription, DEFAULT_CHANNEL_CAPACITY};
pub use session::{
    MemorySessionRepository, Session, SessionError, SessionId, SessionRepository, SessionService,
};

