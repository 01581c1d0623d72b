//! Dispatch error types.

use crate::controller::Subsystem;
use crate::serial::SerialError;

/// Outcome of a failed dispatch.
///
/// Every variant names the subsystem and the correlation id of the attempt.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("{subsystem} command {id}: encode failed: {source}")]
    Encode {
        subsystem: Subsystem,
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{subsystem} command {id}: write failed: {source}")]
    Transmission {
        subsystem: Subsystem,
        id: String,
        #[source]
        source: SerialError,
    },

    #[error("{subsystem} command {id}: command ACK timeout")]
    AckTimeout { subsystem: Subsystem, id: String },

    #[error("{subsystem} command {id}: rejected by controller")]
    AckRejected { subsystem: Subsystem, id: String },

    #[error("{subsystem} command {id}: canceled")]
    Canceled { subsystem: Subsystem, id: String },
}

impl DispatchError {
    /// No acknowledgment arrived in time.
    pub fn is_ack_timeout(&self) -> bool {
        matches!(self, DispatchError::AckTimeout { .. })
    }

    /// The caller's token was cancelled.
    pub fn is_canceled(&self) -> bool {
        matches!(self, DispatchError::Canceled { .. })
    }

    /// The microcontroller reported failure.
    pub fn is_rejected(&self) -> bool {
        matches!(self, DispatchError::AckRejected { .. })
    }

    pub fn subsystem(&self) -> Subsystem {
        match self {
            DispatchError::Encode { subsystem, .. }
            | DispatchError::Transmission { subsystem, .. }
            | DispatchError::AckTimeout { subsystem, .. }
            | DispatchError::AckRejected { subsystem, .. }
            | DispatchError::Canceled { subsystem, .. } => *subsystem,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            DispatchError::Encode { id, .. }
            | DispatchError::Transmission { id, .. }
            | DispatchError::AckTimeout { id, .. }
            | DispatchError::AckRejected { id, .. }
            | DispatchError::Canceled { id, .. } => id,
        }
    }
}
