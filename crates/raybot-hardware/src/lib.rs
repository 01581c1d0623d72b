//! Hardware control for the PIC and ESP microcontrollers.
//!
//! Provides:
//! - The serial client contract and a serial-port backed client
//! - PIC/ESP command envelopes
//! - Command dispatch with out-of-band acknowledgment tracking
//! - High-level motor, cargo door and battery controllers

pub mod ack;
pub mod command;
pub mod controller;
pub mod error;
pub mod serial;

pub use command::{
    BatteryChargeData, BatteryDischargeData, CargoDoorDirection, CargoDoorMotorData,
    DriveDirection, DriveMotorData, Envelope, EspCommand, LiftMotorData, PicCommand,
};
pub use controller::{
    BatteryController, CargoDoorController, Controller, DriveMotorController,
    HardwareController, IdGenerator, LiftMotorController, Subsystem,
};
pub use error::DispatchError;
pub use serial::{PortSerialClient, SerialClient, SerialError};
