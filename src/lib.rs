//! # Telemux Library
//!
//! Telemetry multiplexer for the receiver side of a CRSF/ExpressLRS radio link.
//!
//! This library reassembles CRC-validated CRSF frames from a serial byte
//! stream, classifies them into a fixed set of prioritized slots, and
//! round-robins the stored frames out over the narrow uplink channel, one
//! frame per transmission opportunity.

pub mod config;
pub mod error;
pub mod crsf;
pub mod mux;
pub mod serial;
