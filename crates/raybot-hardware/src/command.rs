//! Low-level command envelopes written to the serial links.
//!
//! On the wire every command is a JSON object `{"id": ..., "type": ...,
//! "data": {...}}`. The `id` is a correlation token generated per dispatch,
//! unrelated to any persisted command id.

use serde::{Deserialize, Serialize};

/// A subsystem command tagged with its correlation id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<C> {
    pub id: String,
    #[serde(flatten)]
    pub command: C,
}

impl<C> Envelope<C> {
    pub fn new(id: impl Into<String>, command: C) -> Self {
        Self {
            id: id.into(),
            command,
        }
    }
}

/// Commands understood by the PIC (motion, lift and battery).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum PicCommand {
    BatteryCharge(BatteryChargeData),
    BatteryDischarge(BatteryDischargeData),
    LiftMotor(LiftMotorData),
    DriveMotor(DriveMotorData),
}

impl PicCommand {
    /// Get the wire type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            PicCommand::BatteryCharge(_) => "battery_charge",
            PicCommand::BatteryDischarge(_) => "battery_discharge",
            PicCommand::LiftMotor(_) => "lift_motor",
            PicCommand::DriveMotor(_) => "drive_motor",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatteryChargeData {
    /// Charge current limit in mA.
    pub current_limit: u16,
    pub enable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatteryDischargeData {
    /// Discharge current limit in mA.
    pub current_limit: u16,
    pub enable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiftMotorData {
    /// Target cargo height in mm.
    pub target_position: u16,
    /// Percent, 0-100.
    pub motor_speed: u8,
    pub enable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveDirection {
    Forward,
    Backward,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveMotorData {
    pub direction: DriveDirection,
    /// Percent, 0-100.
    pub speed: u8,
    pub enable: bool,
}

/// Commands understood by the ESP (cargo door).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EspCommand {
    CargoDoorMotor(CargoDoorMotorData),
}

impl EspCommand {
    /// Get the wire type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            EspCommand::CargoDoorMotor(_) => "cargo_door_motor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CargoDoorDirection {
    Open,
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CargoDoorMotorData {
    pub direction: CargoDoorDirection,
    /// Percent, 0-100.
    pub speed: u8,
    pub enable: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pic_envelope_wire_shape() {
        let envelope = Envelope::new(
            "a1b2c3d4",
            PicCommand::DriveMotor(DriveMotorData {
                direction: DriveDirection::Forward,
                speed: 50,
                enable: true,
            }),
        );

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "a1b2c3d4",
                "type": "drive_motor",
                "data": {"direction": "forward", "speed": 50, "enable": true}
            })
        );
        assert_eq!(envelope.command.type_name(), "drive_motor");
    }

    #[test]
    fn test_esp_envelope_wire_shape() {
        let envelope = Envelope::new(
            "zz",
            EspCommand::CargoDoorMotor(CargoDoorMotorData {
                direction: CargoDoorDirection::Close,
                speed: 30,
                enable: true,
            }),
        );

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["type"], "cargo_door_motor");
        assert_eq!(value["data"]["direction"], "close");
    }
}
