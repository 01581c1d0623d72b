//! Typed command inputs and outputs.
//!
//! The payload shape depends on the command type. Both [`Inputs`] and
//! [`Outputs`] are sum types over the fixed set of command kinds; the stored
//! form is the bare payload object and decoding is keyed by the type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::command::CommandType;
use crate::error::CommandError;

/// Generates a payload sum type with one variant per command type, plus its
/// type accessor and codec.
macro_rules! command_payload {
    ($(#[$meta:meta])* $name:ident { $($variant:ident($ty:ty)),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Serialize)]
        #[serde(untagged)]
        pub enum $name {
            $($variant($ty)),+
        }

        impl $name {
            /// Command type this payload belongs to.
            pub fn command_type(&self) -> CommandType {
                match self {
                    $($name::$variant(_) => CommandType::$variant),+
                }
            }

            /// Encode the bare payload object.
            pub fn encode(&self) -> Result<Vec<u8>, CommandError> {
                let bytes = match self {
                    $($name::$variant(payload) => serde_json::to_vec(payload)?),+
                };
                Ok(bytes)
            }

            /// Decode a payload stored for `command_type`. Empty input yields
            /// the default payload.
            pub fn decode(command_type: CommandType, bytes: &[u8]) -> Result<Self, CommandError> {
                let bytes: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
                    b"{}"
                } else {
                    bytes
                };
                let payload = match command_type {
                    $(CommandType::$variant => $name::$variant(serde_json::from_slice(bytes)?)),+
                };
                Ok(payload)
            }
        }
    };
}

command_payload! {
    /// Inputs of a command.
    Inputs {
        StopMovement(StopMovementInputs),
        MoveForward(MoveForwardInputs),
        MoveBackward(MoveBackwardInputs),
        MoveTo(MoveToInputs),
        CargoOpen(CargoOpenInputs),
        CargoClose(CargoCloseInputs),
        CargoLift(CargoLiftInputs),
        CargoLower(CargoLowerInputs),
        CargoCheckQr(CargoCheckQrInputs),
        ScanLocation(ScanLocationInputs),
        Wait(WaitInputs),
    }
}

command_payload! {
    /// Outputs of a succeeded command.
    Outputs {
        StopMovement(EmptyOutputs),
        MoveForward(EmptyOutputs),
        MoveBackward(EmptyOutputs),
        MoveTo(EmptyOutputs),
        CargoOpen(EmptyOutputs),
        CargoClose(EmptyOutputs),
        CargoLift(EmptyOutputs),
        CargoLower(EmptyOutputs),
        CargoCheckQr(EmptyOutputs),
        ScanLocation(ScanLocationOutputs),
        Wait(EmptyOutputs),
    }
}

impl Outputs {
    /// Default outputs for `command_type`.
    pub fn empty(command_type: CommandType) -> Self {
        let empty = EmptyOutputs::default();
        match command_type {
            CommandType::StopMovement => Outputs::StopMovement(empty),
            CommandType::MoveForward => Outputs::MoveForward(empty),
            CommandType::MoveBackward => Outputs::MoveBackward(empty),
            CommandType::MoveTo => Outputs::MoveTo(empty),
            CommandType::CargoOpen => Outputs::CargoOpen(empty),
            CommandType::CargoClose => Outputs::CargoClose(empty),
            CommandType::CargoLift => Outputs::CargoLift(empty),
            CommandType::CargoLower => Outputs::CargoLower(empty),
            CommandType::CargoCheckQr => Outputs::CargoCheckQr(empty),
            CommandType::ScanLocation => Outputs::ScanLocation(ScanLocationOutputs::default()),
            CommandType::Wait => Outputs::Wait(empty),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopMovementInputs {}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoveForwardInputs {
    pub motor_speed: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoveBackwardInputs {
    pub motor_speed: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MoveDirection {
    #[default]
    Forward,
    Backward,
}

/// Move along the path until `location` is scanned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoveToInputs {
    pub location: String,
    pub direction: MoveDirection,
    pub motor_speed: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CargoOpenInputs {
    pub motor_speed: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CargoCloseInputs {
    pub motor_speed: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CargoLiftInputs {
    pub motor_speed: u8,
    pub position: u16,
}

/// Distances (cm) at which an obstacle under the cargo is considered
/// entered and cleared while lowering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BottomObstacleTracking {
    pub enter_distance: u16,
    pub exit_distance: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CargoLowerInputs {
    pub motor_speed: u8,
    pub position: u16,
    pub bottom_obstacle_tracking: BottomObstacleTracking,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CargoCheckQrInputs {
    pub qr_code: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanLocationInputs {}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitInputs {
    pub duration_ms: u64,
}

impl WaitInputs {
    pub fn new(duration: std::time::Duration) -> Self {
        Self {
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn duration(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.duration_ms)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmptyOutputs {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedLocation {
    pub location: String,
    pub scanned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanLocationOutputs {
    pub locations: Vec<ScannedLocation>,
}
