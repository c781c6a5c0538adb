//! # Telemux
//!
//! Telemetry multiplexer for the receiver side of a CRSF/ExpressLRS radio
//! link.
//!
//! The binary bridges the flight-controller UART and the radio uplink: every
//! inbound byte runs through the framing state machine, CRC-valid frames are
//! classified into the slot table, and one stored frame is handed to the
//! transport per transmission opportunity.

use anyhow::Result;
use bytes::BytesMut;
use tokio::io::AsyncReadExt;
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};

mod config;
mod error;
mod crsf;
mod mux;
mod serial;

use config::Config;
use mux::msp::NullMspSink;
use mux::TelemetryMux;
use serial::{send_frame, ReceiverSerial};

/// Configuration file used when no path is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Serial read buffer size; frames are at most 66 bytes on the wire
const RX_BUFFER_SIZE: usize = 256;

/// Main entry point for the Telemux application
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging with tracing subscriber
///    - Load configuration (argv\[1\] or `config.toml`, defaults when absent)
///    - Open the receiver UART and split it into read/write halves
///
/// 2. **Main Loop** (single task; the receive path and the transmit tick are
///    serialized here, which is the multiplexer's concurrency contract)
///    - Feed received bytes into the multiplexer, then act on any latched
///      control requests
///    - On every uplink tick, pull the next scheduled frame and transmit it
///    - Log link status periodically
///
/// 3. **Graceful Shutdown**
///    - Ctrl+C stops the loop and logs the final counters
///
/// # Errors
///
/// Returns error if no serial device can be opened or the configuration is
/// invalid.
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Telemux v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load_or_default(&config_path)?;

    let paths: Vec<&str> = config.serial.device_paths.iter().map(String::as_str).collect();
    let serial = ReceiverSerial::open_with_paths(&paths, config.serial.baud_rate)?;
    info!("Receiver UART opened at: {}", serial.device_path());
    let (mut reader, mut writer) = serial.into_split();

    let mut mux = TelemetryMux::new()?;
    // no MSP bridge is wired in this deployment; chunks are still scheduled
    mux.set_msp_sink(Box::new(NullMspSink));
    let mut rx_buf = BytesMut::with_capacity(RX_BUFFER_SIZE);

    let mut uplink_interval = interval(Duration::from_millis(config.uplink.interval_ms));
    let mut status_interval = interval(Duration::from_secs(config.uplink.status_log_interval_s));
    let mut sent_frames: u64 = 0;

    info!(
        "Multiplexing telemetry, one frame every {}ms",
        config.uplink.interval_ms
    );
    info!("Press Ctrl+C to exit");

    // Main loop
    loop {
        tokio::select! {
            // Inbound bytes from the flight controller
            read = reader.read_buf(&mut rx_buf) => {
                match read {
                    Ok(0) => {
                        warn!("Serial port closed, shutting down");
                        break;
                    }
                    Ok(_) => {
                        let chunk = rx_buf.split();
                        for &byte in chunk.iter() {
                            mux.feed_byte(byte);
                        }
                        handle_control_requests(&mut mux);
                    }
                    Err(e) => {
                        warn!("Serial read failed: {}", e);
                        break;
                    }
                }
            }

            // One transmission opportunity per tick
            _ = uplink_interval.tick() => {
                if let Some(frame) = mux.next_payload() {
                    match send_frame(&mut writer, frame).await {
                        Ok(()) => sent_frames += 1,
                        Err(e) => debug!("Failed to send frame: {}", e),
                    }
                }
            }

            // Periodic link status
            _ = status_interval.tick() => {
                info!(
                    received = mux.received_packages_count(),
                    pending = mux.updated_payload_count(),
                    sent = sent_frames,
                    "Link status"
                );
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    info!(
        "Total frames: {} received, {} sent",
        mux.received_packages_count(),
        sent_frames
    );

    Ok(())
}

/// Consume the latched control requests raised by the classifier.
///
/// Executing bootloader entry, bind mode and model match is the job of an
/// external command executor; this binary stands in for it by logging each
/// request once.
fn handle_control_requests(mux: &mut TelemetryMux) {
    if mux.take_bootloader_request() {
        info!("Bootloader entry requested over the link");
    }
    if mux.take_enter_bind_request() {
        info!("Bind mode requested over the link");
    }
    if let Some(id) = mux.take_model_match_update() {
        info!(model_match_id = id, "Model match update requested");
    }
    if mux.take_device_frame_request() {
        info!("Device info frame requested");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path() {
        assert_eq!(DEFAULT_CONFIG_PATH, "config.toml");
    }

    #[test]
    fn test_rx_buffer_fits_a_maximum_frame() {
        // worst case on the wire: 64-byte counted section + sync + length
        assert!(RX_BUFFER_SIZE >= 66);
    }

    #[test]
    fn test_handle_control_requests_clears_latches() {
        let mut mux = TelemetryMux::new().unwrap();

        // COMMAND frame with the bootloader sub-opcode
        for byte in [0xC8, 0x04, 0x32, b'b', b'l', 0x0A] {
            mux.feed_byte(byte);
        }

        handle_control_requests(&mut mux);
        assert!(!mux.take_bootloader_request(), "latch consumed by the handler");
    }
}
