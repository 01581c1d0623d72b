//! Serial links to the microcontrollers.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use raybot_core::SerialConfig;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tokio_util::sync::CancellationToken;

/// Serial error types.
#[derive(Debug, thiserror::Error)]
pub enum SerialError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serial port error: {0}")]
    Port(#[from] serialport::Error),

    #[error("Serial link closed")]
    Closed,

    #[error("Write canceled")]
    Canceled,
}

/// Write side of a serial link to one microcontroller.
///
/// There is no response channel: acknowledgments, if any, arrive later as
/// bus events correlated by the envelope id.
#[async_trait]
pub trait SerialClient: Send + Sync {
    /// Write one encoded command frame.
    ///
    /// Implementations should stop waiting once `token` is cancelled.
    async fn write(&self, token: &CancellationToken, data: &[u8]) -> Result<(), SerialError>;
}

/// Serial client backed by an OS serial port.
///
/// Frames are written newline-terminated on a blocking thread.
pub struct PortSerialClient {
    port: Arc<Mutex<Box<dyn SerialPort>>>,
    name: String,
}

impl PortSerialClient {
    /// Open the port described by `config` (8N1, no flow control).
    pub fn open(config: &SerialConfig) -> Result<Self, SerialError> {
        let port = serialport::new(&config.port, config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_millis(500))
            .open()?;

        tracing::info!(port = %config.port, baud_rate = config.baud_rate, "opened serial port");

        Ok(Self {
            port: Arc::new(Mutex::new(port)),
            name: config.port.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl SerialClient for PortSerialClient {
    async fn write(&self, token: &CancellationToken, data: &[u8]) -> Result<(), SerialError> {
        let mut frame = Vec::with_capacity(data.len() + 1);
        frame.extend_from_slice(data);
        frame.push(b'\n');

        let port = self.port.clone();
        let blocking = tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut port = port.lock();
            port.write_all(&frame)?;
            port.flush()
        });

        tokio::select! {
            biased;
            _ = token.cancelled() => Err(SerialError::Canceled),
            joined = blocking => match joined {
                Ok(result) => {
                    tracing::trace!(port = %self.name, bytes = data.len(), "frame written");
                    result.map_err(SerialError::from)
                }
                Err(_) => Err(SerialError::Closed),
            },
        }
    }
}
