//! # CRSF Protocol Module
//!
//! Wire-level definitions for the Crossfire (CRSF) protocol as spoken on an
//! ExpressLRS receiver's UART.
//!
//! This module handles:
//! - Frame layout constants (sync/address bytes, type values, field indices)
//! - A bounds-checked view over raw frame bytes (`FrameView`)
//! - CRC8-DVB-S2 checksum calculation

pub mod protocol;
pub mod crc;
