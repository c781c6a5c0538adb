//! # CRSF Protocol Constants and Frame Layout
//!
//! Wire-level definitions for CRSF frames on the receiver UART.
//!
//! Frame structure: `[sync][length][type][payload...][crc]`
//! - `length` counts every byte from `type` through `crc` inclusive
//! - extended-header types (`type >= 0x28`) place `[dest_addr][orig_addr]`
//!   as the first two payload bytes
//! - `crc` is CRC8-DVB-S2 over `type` through the end of the payload

/// CRSF frame sync byte (always 0xC8)
pub const CRSF_SYNC_BYTE: u8 = 0xC8;

/// Device address of the flight controller
pub const CRSF_ADDRESS_FLIGHT_CONTROLLER: u8 = 0xC8;

/// Device address of the CRSF receiver (this device)
pub const CRSF_ADDRESS_CRSF_RECEIVER: u8 = 0xEC;

/// Device address of the radio transmitter (handset)
pub const CRSF_ADDRESS_RADIO_TRANSMITTER: u8 = 0xEA;

/// GPS telemetry frame
pub const CRSF_FRAMETYPE_GPS: u8 = 0x02;

/// Vario (vertical speed) telemetry frame
pub const CRSF_FRAMETYPE_VARIO: u8 = 0x07;

/// Battery sensor telemetry frame
pub const CRSF_FRAMETYPE_BATTERY_SENSOR: u8 = 0x08;

/// Link statistics frame
pub const CRSF_FRAMETYPE_LINK_STATISTICS: u8 = 0x14;

/// Attitude telemetry frame
pub const CRSF_FRAMETYPE_ATTITUDE: u8 = 0x1E;

/// Flight mode text frame
pub const CRSF_FRAMETYPE_FLIGHT_MODE: u8 = 0x21;

/// Device ping frame; also the first extended-header frame type
pub const CRSF_FRAMETYPE_DEVICE_PING: u8 = 0x28;

/// Device info frame (response to a ping)
pub const CRSF_FRAMETYPE_DEVICE_INFO: u8 = 0x29;

/// Command frame (bootloader / bind / model match sub-opcodes)
pub const CRSF_FRAMETYPE_COMMAND: u8 = 0x32;

/// MSP request carried over CRSF (chunked)
pub const CRSF_FRAMETYPE_MSP_REQ: u8 = 0x7A;

/// MSP response carried over CRSF (chunked)
pub const CRSF_FRAMETYPE_MSP_RESP: u8 = 0x7B;

/// MSP write carried over CRSF
pub const CRSF_FRAMETYPE_MSP_WRITE: u8 = 0x7C;

/// ArduPilot vendor-specific response frame
pub const CRSF_FRAMETYPE_ARDUPILOT_RESP: u8 = 0x80;

/// ArduPilot custom-telemetry sub-type for status-text messages
pub const CRSF_AP_CUSTOM_TELEM_STATUS_TEXT: u8 = 0xF1;

/// Maximum value the length byte may take
pub const CRSF_MAX_PACKET_LEN: usize = 64;

/// Index of the length byte within a frame
pub const CRSF_LENGTH_INDEX: usize = 1;

/// Index of the type byte within a frame
pub const CRSF_TYPE_INDEX: usize = 2;

/// Bytes not counted by the length field (sync + length)
pub const CRSF_FRAME_NOT_COUNTED_BYTES: usize = 2;

/// Trailing CRC bytes counted by the length field
pub const CRSF_CRC_LENGTH: usize = 1;

/// Smallest complete frame: sync + length + type + crc
pub const CRSF_FRAME_MIN_SIZE: usize = 4;

/// Total on-wire size of a frame given its length byte
pub const fn crsf_frame_size(length_byte: u8) -> usize {
    length_byte as usize + CRSF_FRAME_NOT_COUNTED_BYTES
}

/// Bounds-checked view over the raw bytes of a complete CRSF frame.
///
/// Header fields are read through accessors instead of bare indexing so a
/// short or malformed frame yields `None` rather than a panic.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    bytes: &'a [u8],
}

impl<'a> FrameView<'a> {
    /// Wrap a complete frame. The slice must hold at least the fixed header
    /// (sync + length + type + crc).
    pub fn new(bytes: &'a [u8]) -> Option<Self> {
        if bytes.len() < CRSF_FRAME_MIN_SIZE {
            return None;
        }
        Some(Self { bytes })
    }

    /// The frame type byte.
    pub fn frame_type(&self) -> u8 {
        self.bytes[CRSF_TYPE_INDEX]
    }

    /// The declared length byte (type through CRC, inclusive).
    pub fn declared_len(&self) -> u8 {
        self.bytes[CRSF_LENGTH_INDEX]
    }

    /// Total on-wire frame size derived from the length byte.
    pub fn frame_size(&self) -> usize {
        crsf_frame_size(self.declared_len())
    }

    /// Whether the type carries an extended header (dest + origin address).
    pub fn is_extended(&self) -> bool {
        self.frame_type() >= CRSF_FRAMETYPE_DEVICE_PING
    }

    /// Destination address of an extended-header frame.
    pub fn dest_addr(&self) -> Option<u8> {
        self.byte(CRSF_TYPE_INDEX + 1)
    }

    /// Origin address of an extended-header frame.
    pub fn orig_addr(&self) -> Option<u8> {
        self.byte(CRSF_TYPE_INDEX + 2)
    }

    /// The two command sub-opcode bytes at their fixed offsets.
    pub fn command_opcode(&self) -> Option<(u8, u8)> {
        Some((self.byte(3)?, self.byte(4)?))
    }

    /// An arbitrary frame byte, bounds-checked against the received slice.
    pub fn byte(&self, index: usize) -> Option<u8> {
        self.bytes.get(index).copied()
    }

    /// The raw frame bytes.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }
}
