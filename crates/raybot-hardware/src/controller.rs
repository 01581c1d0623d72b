//! Hardware controller.
//!
//! Dispatches command envelopes to the PIC and ESP serial links and, when a
//! link has ACK tracking enabled, waits for the correlated acknowledgment.
//!
//! Writes to one link are serialized by a per-link lock held only for the
//! write itself, so frames never interleave on the wire. ACK waits are not
//! under the lock and may overlap. Executing one robot command at a time is
//! the caller's responsibility.

use std::sync::Arc;

use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;
use raybot_core::{EventBus, HardwareConfig, SerialConfig, ESP_CMD_ACK_TOPIC, PIC_CMD_ACK_TOPIC};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::ack::AckWaiter;
use crate::command::{
    BatteryChargeData, BatteryDischargeData, CargoDoorDirection, CargoDoorMotorData,
    DriveDirection, DriveMotorData, Envelope, EspCommand, LiftMotorData, PicCommand,
};
use crate::error::DispatchError;
use crate::serial::SerialClient;

/// Length of generated correlation ids.
const CORRELATION_ID_LEN: usize = 8;

/// Generates correlation ids.
pub type IdGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// Microcontroller subsystems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subsystem {
    Pic,
    Esp,
}

impl Subsystem {
    pub fn name(&self) -> &'static str {
        match self {
            Subsystem::Pic => "PIC",
            Subsystem::Esp => "ESP",
        }
    }

    /// Bus topic carrying this subsystem's acknowledgments.
    pub fn ack_topic(&self) -> &'static str {
        match self {
            Subsystem::Pic => PIC_CMD_ACK_TOPIC,
            Subsystem::Esp => ESP_CMD_ACK_TOPIC,
        }
    }
}

impl std::fmt::Display for Subsystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

struct Link {
    subsystem: Subsystem,
    config: SerialConfig,
    client: Arc<dyn SerialClient>,
    write_lock: Mutex<()>,
}

impl Link {
    fn new(subsystem: Subsystem, config: SerialConfig, client: Arc<dyn SerialClient>) -> Self {
        Self {
            subsystem,
            config,
            client,
            write_lock: Mutex::new(()),
        }
    }
}

/// Dispatches commands to the PIC and ESP.
pub struct Controller {
    pic: Link,
    esp: Link,
    bus: EventBus,
    gen_id: IdGenerator,
}

impl Controller {
    pub fn new(
        config: &HardwareConfig,
        bus: EventBus,
        pic_client: Arc<dyn SerialClient>,
        esp_client: Arc<dyn SerialClient>,
    ) -> Self {
        Self {
            pic: Link::new(Subsystem::Pic, config.pic.clone(), pic_client),
            esp: Link::new(Subsystem::Esp, config.esp.clone(), esp_client),
            bus,
            gen_id: Arc::new(new_short_id),
        }
    }

    /// Replace the correlation id generator.
    pub fn with_id_generator<F>(mut self, gen_id: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.gen_id = Arc::new(gen_id);
        self
    }

    /// Dispatch one command to the PIC.
    pub async fn dispatch_pic(
        &self,
        token: &CancellationToken,
        command: PicCommand,
    ) -> Result<(), DispatchError> {
        tracing::debug!(command = command.type_name(), "dispatch PIC command");
        self.dispatch(&self.pic, token, command).await
    }

    /// Dispatch one command to the ESP.
    pub async fn dispatch_esp(
        &self,
        token: &CancellationToken,
        command: EspCommand,
    ) -> Result<(), DispatchError> {
        tracing::debug!(command = command.type_name(), "dispatch ESP command");
        self.dispatch(&self.esp, token, command).await
    }

    async fn dispatch<C: Serialize>(
        &self,
        link: &Link,
        token: &CancellationToken,
        command: C,
    ) -> Result<(), DispatchError> {
        let envelope = Envelope::new((self.gen_id)(), command);

        if !link.config.enable_ack {
            return self.write(link, token, &envelope).await;
        }

        self.write_with_ack(link, token, &envelope).await
    }

    async fn write<C: Serialize>(
        &self,
        link: &Link,
        token: &CancellationToken,
        envelope: &Envelope<C>,
    ) -> Result<(), DispatchError> {
        let subsystem = link.subsystem;
        let canceled = || DispatchError::Canceled {
            subsystem,
            id: envelope.id.clone(),
        };

        let frame = serde_json::to_vec(envelope).map_err(|source| DispatchError::Encode {
            subsystem,
            id: envelope.id.clone(),
            source,
        })?;

        let _guard = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(canceled()),
            guard = link.write_lock.lock() => guard,
        };

        tokio::select! {
            biased;
            _ = token.cancelled() => Err(canceled()),
            written = link.client.write(token, &frame) => {
                written.map_err(|source| DispatchError::Transmission {
                    subsystem,
                    id: envelope.id.clone(),
                    source,
                })
            }
        }
    }

    /// Write and wait for the acknowledgment under one derived scope.
    ///
    /// The subscription is in place before the write starts. Whichever branch
    /// fails first decides the result; dropping the guard cancels the scope,
    /// which ends the other branch. The waiter owns the subscription, so it
    /// is gone by the time this returns.
    async fn write_with_ack<C: Serialize>(
        &self,
        link: &Link,
        token: &CancellationToken,
        envelope: &Envelope<C>,
    ) -> Result<(), DispatchError> {
        let scope = token.child_token();
        let _guard = scope.clone().drop_guard();

        let waiter = AckWaiter::register(&self.bus, link.subsystem, envelope.id.clone());
        let timeout = link.config.command_ack_timeout();

        tokio::try_join!(
            self.write(link, &scope, envelope),
            waiter.wait(timeout, &scope),
        )?;

        Ok(())
    }
}

/// Random alphanumeric correlation id.
fn new_short_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CORRELATION_ID_LEN)
        .map(char::from)
        .collect()
}

/// Battery charge/discharge configuration (PIC).
#[async_trait]
pub trait BatteryController: Send + Sync {
    async fn config_battery_charge(
        &self,
        token: &CancellationToken,
        current_limit: u16,
        enable: bool,
    ) -> Result<(), DispatchError>;

    async fn config_battery_discharge(
        &self,
        token: &CancellationToken,
        current_limit: u16,
        enable: bool,
    ) -> Result<(), DispatchError>;
}

/// Cargo lift motor (PIC).
#[async_trait]
pub trait LiftMotorController: Send + Sync {
    async fn set_cargo_position(
        &self,
        token: &CancellationToken,
        motor_speed: u8,
        position: u16,
    ) -> Result<(), DispatchError>;

    async fn stop_lift_motor(&self, token: &CancellationToken) -> Result<(), DispatchError>;
}

/// Drive motors (PIC).
#[async_trait]
pub trait DriveMotorController: Send + Sync {
    async fn move_forward(&self, token: &CancellationToken, speed: u8) -> Result<(), DispatchError>;

    async fn move_backward(&self, token: &CancellationToken, speed: u8)
        -> Result<(), DispatchError>;

    async fn stop_drive_motor(&self, token: &CancellationToken) -> Result<(), DispatchError>;
}

/// Cargo door motor (ESP).
#[async_trait]
pub trait CargoDoorController: Send + Sync {
    async fn open_cargo_door(&self, token: &CancellationToken, speed: u8)
        -> Result<(), DispatchError>;

    async fn close_cargo_door(
        &self,
        token: &CancellationToken,
        speed: u8,
    ) -> Result<(), DispatchError>;
}

/// Everything the robot's hardware can be asked to do.
pub trait HardwareController:
    BatteryController + LiftMotorController + DriveMotorController + CargoDoorController
{
}

impl<T> HardwareController for T where
    T: BatteryController + LiftMotorController + DriveMotorController + CargoDoorController
{
}

#[async_trait]
impl BatteryController for Controller {
    async fn config_battery_charge(
        &self,
        token: &CancellationToken,
        current_limit: u16,
        enable: bool,
    ) -> Result<(), DispatchError> {
        let command = PicCommand::BatteryCharge(BatteryChargeData {
            current_limit,
            enable,
        });
        self.dispatch_pic(token, command).await
    }

    async fn config_battery_discharge(
        &self,
        token: &CancellationToken,
        current_limit: u16,
        enable: bool,
    ) -> Result<(), DispatchError> {
        let command = PicCommand::BatteryDischarge(BatteryDischargeData {
            current_limit,
            enable,
        });
        self.dispatch_pic(token, command).await
    }
}

#[async_trait]
impl LiftMotorController for Controller {
    async fn set_cargo_position(
        &self,
        token: &CancellationToken,
        motor_speed: u8,
        position: u16,
    ) -> Result<(), DispatchError> {
        let command = PicCommand::LiftMotor(LiftMotorData {
            target_position: position,
            motor_speed,
            enable: true,
        });
        self.dispatch_pic(token, command).await
    }

    async fn stop_lift_motor(&self, token: &CancellationToken) -> Result<(), DispatchError> {
        let command = PicCommand::LiftMotor(LiftMotorData {
            target_position: 0,
            motor_speed: 0,
            enable: false,
        });
        self.dispatch_pic(token, command).await
    }
}

#[async_trait]
impl DriveMotorController for Controller {
    async fn move_forward(&self, token: &CancellationToken, speed: u8) -> Result<(), DispatchError> {
        let command = PicCommand::DriveMotor(DriveMotorData {
            direction: DriveDirection::Forward,
            speed,
            enable: true,
        });
        self.dispatch_pic(token, command).await
    }

    async fn move_backward(
        &self,
        token: &CancellationToken,
        speed: u8,
    ) -> Result<(), DispatchError> {
        let command = PicCommand::DriveMotor(DriveMotorData {
            direction: DriveDirection::Backward,
            speed,
            enable: true,
        });
        self.dispatch_pic(token, command).await
    }

    async fn stop_drive_motor(&self, token: &CancellationToken) -> Result<(), DispatchError> {
        let command = PicCommand::DriveMotor(DriveMotorData {
            direction: DriveDirection::Forward,
            speed: 0,
            enable: false,
        });
        self.dispatch_pic(token, command).await
    }
}

#[async_trait]
impl CargoDoorController for Controller {
    async fn open_cargo_door(
        &self,
        token: &CancellationToken,
        speed: u8,
    ) -> Result<(), DispatchError> {
        let command = EspCommand::CargoDoorMotor(CargoDoorMotorData {
            direction: CargoDoorDirection::Open,
            speed,
            enable: true,
        });
        self.dispatch_esp(token, command).await
    }

    async fn close_cargo_door(
        &self,
        token: &CancellationToken,
        speed: u8,
    ) -> Result<(), DispatchError> {
        let command = EspCommand::CargoDoorMotor(CargoDoorMotorData {
            direction: CargoDoorDirection::Close,
            speed,
            enable: true,
        });
        self.dispatch_esp(token, command).await
    }
}
