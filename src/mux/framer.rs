//! # RX Framing State Machine
//!
//! Byte-at-a-time reassembly of CRSF frames from the receiver UART.
//!
//! The framer is a strict single-pass state machine: one call per received
//! byte, O(1) work per byte, no allocation. A frame becomes visible only
//! after its trailing CRC byte matches CRC8-DVB-S2 over the type and payload
//! bytes.

use crate::crsf::crc::crc8_dvb_s2;
use crate::crsf::protocol::{
    crsf_frame_size, CRSF_ADDRESS_CRSF_RECEIVER, CRSF_CRC_LENGTH, CRSF_FRAME_NOT_COUNTED_BYTES,
    CRSF_LENGTH_INDEX, CRSF_MAX_PACKET_LEN, CRSF_SYNC_BYTE,
};

/// Size of the working buffer: worst-case length byte plus the two
/// not-counted header bytes.
const WORKING_BUFFER_SIZE: usize = CRSF_MAX_PACKET_LEN + CRSF_FRAME_NOT_COUNTED_BYTES;

/// Reassembly states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FramerState {
    /// Waiting for a recognized sync/address byte
    Idle,
    /// Sync stored, waiting for the length byte
    Length,
    /// Accumulating payload bytes up to the declared length
    Data,
}

/// Outcome of feeding one byte into the framer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramerStep {
    /// Byte was not a valid start/length byte, or the frame overran
    Rejected,
    /// Byte accepted, frame still incomplete
    Pending,
    /// Frame complete and CRC-valid; readable via [`RxFramer::frame`]
    Complete,
    /// Frame complete but the trailing CRC byte did not match
    CrcError,
}

/// CRSF receive framer.
///
/// Owns the single inbound working buffer. The buffer is overwritten on
/// every new frame and is only meaningful right after a `Complete` step.
#[derive(Debug)]
pub struct RxFramer {
    state: FramerState,
    buffer: [u8; WORKING_BUFFER_SIZE],
    received: usize,
}

impl RxFramer {
    pub fn new() -> Self {
        Self {
            state: FramerState::Idle,
            buffer: [0u8; WORKING_BUFFER_SIZE],
            received: 0,
        }
    }

    /// Feed one byte from the UART.
    ///
    /// Returns what the byte did to the reassembly state. `Rejected` covers
    /// an unrecognized sync byte, a length byte at or above
    /// `CRSF_MAX_PACKET_LEN`, and a buffer overrun (a declared length too
    /// short to ever complete).
    pub fn push(&mut self, byte: u8) -> FramerStep {
        match self.state {
            FramerState::Idle => {
                if byte == CRSF_ADDRESS_CRSF_RECEIVER || byte == CRSF_SYNC_BYTE {
                    self.buffer[0] = byte;
                    self.received = 0;
                    self.state = FramerState::Length;
                    FramerStep::Pending
                } else {
                    FramerStep::Rejected
                }
            }
            FramerState::Length => {
                if byte as usize >= CRSF_MAX_PACKET_LEN {
                    self.state = FramerState::Idle;
                    FramerStep::Rejected
                } else {
                    self.buffer[CRSF_LENGTH_INDEX] = byte;
                    self.received = 0;
                    self.state = FramerState::Data;
                    FramerStep::Pending
                }
            }
            FramerState::Data => {
                let index = self.received + CRSF_FRAME_NOT_COUNTED_BYTES;
                if index >= self.buffer.len() {
                    // declared length can never be reached; abort the frame
                    self.state = FramerState::Idle;
                    return FramerStep::Rejected;
                }

                self.buffer[index] = byte;
                self.received += 1;

                if self.buffer[CRSF_LENGTH_INDEX] as usize != self.received {
                    return FramerStep::Pending;
                }

                // frame complete: CRC covers type..payload, excludes the
                // sync/length header and the submitted CRC byte itself
                let crc_end = self.frame_len() - CRSF_CRC_LENGTH;
                let crc = crc8_dvb_s2(&self.buffer[CRSF_FRAME_NOT_COUNTED_BYTES..crc_end]);
                self.state = FramerState::Idle;

                if byte == crc {
                    FramerStep::Complete
                } else {
                    FramerStep::CrcError
                }
            }
        }
    }

    /// The completed frame, valid immediately after a `Complete` step.
    pub fn frame(&self) -> &[u8] {
        &self.buffer[..self.frame_len()]
    }

    /// Abort any in-progress frame and return to idle.
    pub fn reset(&mut self) {
        self.state = FramerState::Idle;
        self.received = 0;
    }

    fn frame_len(&self) -> usize {
        crsf_frame_size(self.buffer[CRSF_LENGTH_INDEX])
    }
}

impl Default for RxFramer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crsf::protocol::CRSF_FRAMETYPE_BATTERY_SENSOR;

    /// Build a well-formed frame: sync + length + type + payload + crc.
    fn build_frame(sync: u8, frame_type: u8, payload: &[u8]) -> Vec<u8> {
        let mut frame = vec![sync, (payload.len() + 2) as u8, frame_type];
        frame.extend_from_slice(payload);
        frame.push(crc8_dvb_s2(&frame[2..]));
        frame
    }

    fn feed_all(framer: &mut RxFramer, bytes: &[u8]) -> FramerStep {
        let mut last = FramerStep::Rejected;
        for &b in bytes {
            last = framer.push(b);
        }
        last
    }

    #[test]
    fn test_idle_rejects_unknown_sync() {
        let mut framer = RxFramer::new();
        assert_eq!(framer.push(0x00), FramerStep::Rejected);
        assert_eq!(framer.push(0x55), FramerStep::Rejected);
        // both recognized start bytes are accepted
        assert_eq!(framer.push(CRSF_SYNC_BYTE), FramerStep::Pending);
        framer.reset();
        assert_eq!(framer.push(CRSF_ADDRESS_CRSF_RECEIVER), FramerStep::Pending);
    }

    #[test]
    fn test_length_guard() {
        let mut framer = RxFramer::new();
        assert_eq!(framer.push(CRSF_SYNC_BYTE), FramerStep::Pending);
        assert_eq!(framer.push(CRSF_MAX_PACKET_LEN as u8), FramerStep::Rejected);
        // state returned to idle: next unknown byte is rejected from idle
        assert_eq!(framer.push(0x01), FramerStep::Rejected);
    }

    #[test]
    fn test_complete_frame_with_valid_crc() {
        let frame = build_frame(CRSF_SYNC_BYTE, CRSF_FRAMETYPE_BATTERY_SENSOR, &[1, 2, 3, 4]);
        let mut framer = RxFramer::new();
        assert_eq!(feed_all(&mut framer, &frame), FramerStep::Complete);
        assert_eq!(framer.frame(), frame.as_slice());
    }

    #[test]
    fn test_crc_mismatch_discards_frame() {
        let mut frame = build_frame(CRSF_SYNC_BYTE, CRSF_FRAMETYPE_BATTERY_SENSOR, &[1, 2, 3, 4]);
        let last = frame.len() - 1;
        frame[last] ^= 0xFF;

        let mut framer = RxFramer::new();
        assert_eq!(feed_all(&mut framer, &frame), FramerStep::CrcError);

        // framer recovered: the same frame with a good CRC completes
        frame[last] ^= 0xFF;
        assert_eq!(feed_all(&mut framer, &frame), FramerStep::Complete);
    }

    #[test]
    fn test_never_complete_without_matching_crc() {
        let frame = build_frame(CRSF_SYNC_BYTE, CRSF_FRAMETYPE_BATTERY_SENSOR, &[9, 8, 7]);
        let good_crc = *frame.last().unwrap();
        let body = &frame[..frame.len() - 1];

        for crc in 0..=255u8 {
            let mut framer = RxFramer::new();
            for &b in body {
                framer.push(b);
            }
            let step = framer.push(crc);
            if crc == good_crc {
                assert_eq!(step, FramerStep::Complete);
            } else {
                assert_eq!(step, FramerStep::CrcError);
            }
        }
    }

    #[test]
    fn test_byte_sweep_never_completes() {
        // a plain 0..=255 sweep contains sync bytes but no valid frame
        let mut framer = RxFramer::new();
        for b in 0..=255u8 {
            assert_ne!(framer.push(b), FramerStep::Complete);
        }
    }

    #[test]
    fn test_zero_length_frame_aborts_instead_of_overrunning() {
        let mut framer = RxFramer::new();
        framer.push(CRSF_SYNC_BYTE);
        framer.push(0x00); // can never equal a running count >= 1

        let mut rejected = false;
        for _ in 0..WORKING_BUFFER_SIZE + 4 {
            if framer.push(0xAB) == FramerStep::Rejected {
                rejected = true;
                break;
            }
        }
        assert!(rejected, "overrun guard did not trip");
    }

    #[test]
    fn test_back_to_back_frames() {
        let first = build_frame(CRSF_SYNC_BYTE, CRSF_FRAMETYPE_BATTERY_SENSOR, &[0x10]);
        let second = build_frame(CRSF_ADDRESS_CRSF_RECEIVER, CRSF_FRAMETYPE_BATTERY_SENSOR, &[0x20]);

        let mut framer = RxFramer::new();
        assert_eq!(feed_all(&mut framer, &first), FramerStep::Complete);
        assert_eq!(feed_all(&mut framer, &second), FramerStep::Complete);
        assert_eq!(framer.frame(), second.as_slice());
    }
}
