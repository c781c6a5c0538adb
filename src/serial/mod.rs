//! # Serial Communication Module
//!
//! Handles the UART between this multiplexer and the flight controller.
//!
//! This module handles:
//! - Opening the serial port at 420,000 baud (CRSF standard)
//! - Splitting the stream into an inbound byte path and an outbound frame path
//! - Writing selected telemetry frames back out

pub mod port_trait;

use crate::error::{Result, TelemuxError};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

pub use self::port_trait::{SerialPortIO, TokioSerialPort};

/// CRSF baud rate (420,000 baud)
pub const CRSF_BAUD_RATE: u32 = 420_000;

/// Default device paths to try (in order of preference)
pub const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyACM0", // USB CDC devices
    "/dev/ttyUSB0", // USB-to-serial adapters
];

/// Receiver UART handler.
///
/// Manages the connection to the flight-controller-facing serial port.
pub struct ReceiverSerial {
    /// Serial port handle
    port: tokio_serial::SerialStream,
    /// Device path (e.g., /dev/ttyACM0)
    device_path: String,
}

impl std::fmt::Debug for ReceiverSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiverSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl ReceiverSerial {
    /// Open the receiver UART, auto-detecting the device from the default
    /// paths at the standard CRSF baud rate.
    ///
    /// # Errors
    ///
    /// Returns `SerialPortNotFound` if no device opens.
    pub fn open() -> Result<Self> {
        Self::open_with_paths(DEFAULT_DEVICE_PATHS, CRSF_BAUD_RATE)
    }

    /// Open the receiver UART trying the given device paths in order.
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Successfully opened receiver UART at {}", path);
                    return Ok(Self {
                        port,
                        device_path: path.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(TelemuxError::SerialPortNotFound(paths.join(", ")))
    }

    /// Open a specific serial port with CRSF settings (8N1, no flow control).
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| TelemuxError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    /// Get the device path of the opened serial port.
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Split the UART into a raw read half for the inbound byte stream and a
    /// write half for outbound frames. The two halves can be driven from the
    /// same `select!` loop without borrow conflicts.
    pub fn into_split(self) -> (tokio::io::ReadHalf<tokio_serial::SerialStream>, TokioSerialPort) {
        let (read, write) = tokio::io::split(self.port);
        (read, TokioSerialPort::new(write))
    }
}

/// Write one complete CRSF frame to the port and flush it.
///
/// The frame must already carry its sync byte, length, type, payload and CRC;
/// the scheduler hands frames out in exactly that form.
pub async fn send_frame<P: SerialPortIO>(port: &mut P, frame: &[u8]) -> Result<()> {
    port.write_all(frame)
        .await
        .map_err(|e| TelemuxError::Serial(format!("Failed to write frame: {}", e)))?;

    port.flush()
        .await
        .map_err(|e| TelemuxError::Serial(format!("Failed to flush serial port: {}", e)))?;

    debug!("Sent telemetry frame ({} bytes)", frame.len());
    Ok(())
}
