//! # Slot Table and Outbound Scheduler
//!
//! Fixed-memory storage for telemetry frames awaiting uplink.
//!
//! A single arena buffer is partitioned at construction time into one
//! fixed-capacity sub-range per slot. Standard slots each accept one frame
//! type; the two trailing reserved slots take any extended-header traffic
//! under the classifier's priority rules. The scheduler round-robins over
//! the table so no ready slot is transmitted twice before every other ready
//! slot has had a turn.

use tracing::warn;

use crate::crsf::protocol::{
    crsf_frame_size, CRSF_FRAMETYPE_ATTITUDE, CRSF_FRAMETYPE_BATTERY_SENSOR,
    CRSF_FRAMETYPE_DEVICE_INFO, CRSF_FRAMETYPE_FLIGHT_MODE, CRSF_FRAMETYPE_GPS,
    CRSF_FRAMETYPE_VARIO, CRSF_FRAME_MIN_SIZE, CRSF_FRAME_NOT_COUNTED_BYTES, CRSF_LENGTH_INDEX,
    CRSF_MAX_PACKET_LEN,
};
use crate::error::{Result, TelemuxError};

/// Number of trailing reserved slots (extended-header priority lanes)
pub const RESERVED_SLOT_COUNT: usize = 2;

/// Ordered slot configuration: one `(frame_type, capacity)` pair per standard
/// slot, plus the capacity shared by the two trailing reserved slots.
///
/// Capacities are whole-frame sizes (sync through CRC). Changing the layout
/// changes the arena partition.
#[derive(Debug, Clone)]
pub struct SlotLayout {
    pub standard: Vec<(u8, usize)>,
    pub reserved_capacity: usize,
}

impl Default for SlotLayout {
    /// The stock receiver layout: GPS, battery, attitude, device info,
    /// flight mode and vario, plus two full-size reserved slots.
    fn default() -> Self {
        Self {
            standard: vec![
                (CRSF_FRAMETYPE_GPS, 19),
                (CRSF_FRAMETYPE_BATTERY_SENSOR, 12),
                (CRSF_FRAMETYPE_ATTITUDE, 10),
                (CRSF_FRAMETYPE_DEVICE_INFO, 52),
                (CRSF_FRAMETYPE_FLIGHT_MODE, 20),
                (CRSF_FRAMETYPE_VARIO, 6),
            ],
            reserved_capacity: CRSF_MAX_PACKET_LEN + CRSF_FRAME_NOT_COUNTED_BYTES,
        }
    }
}

/// One slot descriptor. The buffer itself is the arena sub-range
/// `offset..offset + capacity`.
#[derive(Debug)]
struct Slot {
    /// Frame type accepted by a standard slot; `None` for reserved slots
    filter: Option<u8>,
    capacity: usize,
    offset: usize,
    /// A validated frame is stored and not yet consumed
    updated: bool,
    /// The scheduler is presenting this slot to the transport
    locked: bool,
}

/// Arena-backed slot table with the round-robin outbound cursor.
#[derive(Debug)]
pub struct SlotTable {
    arena: Vec<u8>,
    slots: Vec<Slot>,
    cursor: usize,
}

impl SlotTable {
    /// Partition an arena according to `layout`.
    ///
    /// # Errors
    ///
    /// Returns `SlotConfig` if the layout has no standard slots, a standard
    /// capacity below the minimum frame size, or a reserved capacity too
    /// small to hold a maximum-length frame. These are build-time invariant
    /// violations, not runtime conditions.
    pub fn new(layout: SlotLayout) -> Result<Self> {
        if layout.standard.is_empty() {
            return Err(TelemuxError::SlotConfig(
                "at least one standard slot is required".to_string(),
            ));
        }

        for &(frame_type, capacity) in &layout.standard {
            if capacity < CRSF_FRAME_MIN_SIZE {
                return Err(TelemuxError::SlotConfig(format!(
                    "slot for type 0x{:02X} has capacity {} below the minimum frame size {}",
                    frame_type, capacity, CRSF_FRAME_MIN_SIZE
                )));
            }
        }

        let max_frame = CRSF_MAX_PACKET_LEN + CRSF_FRAME_NOT_COUNTED_BYTES;
        if layout.reserved_capacity < max_frame {
            return Err(TelemuxError::SlotConfig(format!(
                "reserved capacity {} cannot hold a maximum-length frame ({})",
                layout.reserved_capacity, max_frame
            )));
        }

        let mut slots = Vec::with_capacity(layout.standard.len() + RESERVED_SLOT_COUNT);
        let mut offset = 0;

        for &(frame_type, capacity) in &layout.standard {
            slots.push(Slot {
                filter: Some(frame_type),
                capacity,
                offset,
                updated: false,
                locked: false,
            });
            offset += capacity;
        }

        for _ in 0..RESERVED_SLOT_COUNT {
            slots.push(Slot {
                filter: None,
                capacity: layout.reserved_capacity,
                offset,
                updated: false,
                locked: false,
            });
            offset += layout.reserved_capacity;
        }

        Ok(Self {
            arena: vec![0u8; offset],
            slots,
            cursor: 0,
        })
    }

    /// Total number of slots, standard and reserved.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Index of the highest-priority reserved slot.
    pub fn last(&self) -> usize {
        self.slots.len() - 1
    }

    /// Index of the second reserved slot.
    pub fn second_to_last(&self) -> usize {
        self.slots.len() - 2
    }

    /// First standard slot whose type filter matches, if any.
    pub fn standard_slot_for(&self, frame_type: u8) -> Option<usize> {
        self.slots[..self.slots.len() - RESERVED_SLOT_COUNT]
            .iter()
            .position(|slot| slot.filter == Some(frame_type))
    }

    pub fn is_updated(&self, index: usize) -> bool {
        self.slots[index].updated
    }

    pub fn is_locked(&self, index: usize) -> bool {
        self.slots[index].locked
    }

    pub fn capacity(&self, index: usize) -> usize {
        self.slots[index].capacity
    }

    /// Copy a complete frame into a slot and mark it ready.
    ///
    /// Returns false without touching the slot if the frame does not fit;
    /// capacity is checked by the classifier for standard slots and
    /// guaranteed by construction for reserved slots, so a failure here
    /// indicates a misrouted frame.
    pub fn store(&mut self, index: usize, frame: &[u8]) -> bool {
        let slot = &mut self.slots[index];
        if frame.len() > slot.capacity {
            warn!(
                slot = index,
                frame_len = frame.len(),
                capacity = slot.capacity,
                "frame does not fit its routed slot"
            );
            return false;
        }

        self.arena[slot.offset..slot.offset + frame.len()].copy_from_slice(frame);
        slot.updated = true;
        true
    }

    /// Count of slots holding an unconsumed frame.
    pub fn updated_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.updated).count()
    }

    /// Pick the next frame to transmit, round-robin over the slots.
    ///
    /// The slot returned by the previous call is released first (one
    /// transmission opportunity per lock). The cursor then advances
    /// circularly, at most one full lap, to the next updated slot. That slot
    /// is locked and its frame returned with trailing zero bytes trimmed:
    /// slots are wider than many of their occupants and the unused tail must
    /// not reach the radio. The length field is rewritten to the trimmed
    /// size as a protocol-compliance step. A slot whose content trims to
    /// nothing is consumed as empty and the cursor rolls back.
    pub fn next_payload(&mut self) -> Option<&[u8]> {
        let origin = self.cursor;

        if self.slots[self.cursor].locked {
            self.slots[self.cursor].locked = false;
            self.slots[self.cursor].updated = false;
        }

        let mut checks = 0;
        loop {
            self.cursor = (self.cursor + 1) % self.slots.len();
            checks += 1;
            if self.slots[self.cursor].updated || checks >= self.slots.len() {
                break;
            }
        }

        if self.slots[self.cursor].updated {
            let slot = &mut self.slots[self.cursor];
            slot.locked = true;

            let declared = crsf_frame_size(self.arena[slot.offset + CRSF_LENGTH_INDEX]);
            let mut real_len = declared.min(slot.capacity);
            while real_len > 0 && self.arena[slot.offset + real_len - 1] == 0 {
                real_len -= 1;
            }

            if real_len > CRSF_FRAME_NOT_COUNTED_BYTES {
                self.arena[slot.offset + CRSF_LENGTH_INDEX] =
                    (real_len - CRSF_FRAME_NOT_COUNTED_BYTES) as u8;
                return Some(&self.arena[slot.offset..slot.offset + real_len]);
            }

            // stale zeroed content: consume it so it cannot stall the lap
            slot.locked = false;
            slot.updated = false;
        }

        self.cursor = origin;
        None
    }

    /// Clear all flags, zero the arena and rewind the cursor. Stored frames
    /// are discarded.
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            slot.updated = false;
            slot.locked = false;
        }
        self.arena.fill(0);
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crsf::crc::crc8_dvb_s2;

    fn build_frame(frame_type: u8, payload: &[u8]) -> Vec<u8> {
        let mut frame = vec![0xC8, (payload.len() + 2) as u8, frame_type];
        frame.extend_from_slice(payload);
        frame.push(crc8_dvb_s2(&frame[2..]));
        frame
    }

    #[test]
    fn test_arena_partition_is_non_overlapping() {
        let table = SlotTable::new(SlotLayout::default()).unwrap();

        let mut end = 0;
        for slot in &table.slots {
            assert_eq!(slot.offset, end, "slots must be contiguous in order");
            end += slot.capacity;
        }
        assert_eq!(end, table.arena.len());
    }

    #[test]
    fn test_layout_validation() {
        let empty = SlotLayout {
            standard: vec![],
            reserved_capacity: 66,
        };
        assert!(matches!(
            SlotTable::new(empty),
            Err(TelemuxError::SlotConfig(_))
        ));

        let tiny = SlotLayout {
            standard: vec![(CRSF_FRAMETYPE_GPS, 2)],
            reserved_capacity: 66,
        };
        assert!(matches!(
            SlotTable::new(tiny),
            Err(TelemuxError::SlotConfig(_))
        ));

        let narrow_reserved = SlotLayout {
            standard: vec![(CRSF_FRAMETYPE_GPS, 19)],
            reserved_capacity: 32,
        };
        assert!(matches!(
            SlotTable::new(narrow_reserved),
            Err(TelemuxError::SlotConfig(_))
        ));
    }

    #[test]
    fn test_standard_slot_lookup() {
        let table = SlotTable::new(SlotLayout::default()).unwrap();
        assert_eq!(table.standard_slot_for(CRSF_FRAMETYPE_GPS), Some(0));
        assert_eq!(table.standard_slot_for(CRSF_FRAMETYPE_VARIO), Some(5));
        // reserved slots never match a type filter
        assert_eq!(table.standard_slot_for(0xFF), None);
    }

    #[test]
    fn test_store_and_next_payload_round_trip() {
        let mut table = SlotTable::new(SlotLayout::default()).unwrap();
        let frame = build_frame(CRSF_FRAMETYPE_BATTERY_SENSOR, &[1, 2, 3, 4, 5, 6, 7, 8]);

        assert!(table.store(1, &frame));
        assert_eq!(table.updated_count(), 1);

        let payload = table.next_payload().expect("slot should be ready");
        assert_eq!(payload, frame.as_slice());
    }

    #[test]
    fn test_same_slot_never_returned_twice_in_a_row() {
        let mut table = SlotTable::new(SlotLayout::default()).unwrap();
        let frame = build_frame(CRSF_FRAMETYPE_VARIO, &[0x11, 0x22]);

        assert!(table.store(5, &frame));
        assert!(table.next_payload().is_some());
        // still locked, not superseded: nothing else to send
        assert!(table.next_payload().is_none());
        // the lock was released by the second call
        assert!(!table.is_locked(5));
        assert_eq!(table.updated_count(), 0);
    }

    #[test]
    fn test_round_robin_covers_all_ready_slots() {
        let mut table = SlotTable::new(SlotLayout::default()).unwrap();
        let gps = build_frame(CRSF_FRAMETYPE_GPS, &[0xAA; 15]);
        let battery = build_frame(CRSF_FRAMETYPE_BATTERY_SENSOR, &[0xBB; 8]);
        let flight_mode = build_frame(CRSF_FRAMETYPE_FLIGHT_MODE, b"ACRO\x01");

        assert!(table.store(0, &gps));
        assert!(table.store(1, &battery));
        assert!(table.store(4, &flight_mode));

        let mut seen = Vec::new();
        for _ in 0..3 {
            let payload = table.next_payload().expect("three slots are ready");
            seen.push(payload[2]); // frame type byte
        }

        seen.sort_unstable();
        let mut expected = vec![
            CRSF_FRAMETYPE_GPS,
            CRSF_FRAMETYPE_BATTERY_SENSOR,
            CRSF_FRAMETYPE_FLIGHT_MODE,
        ];
        expected.sort_unstable();
        assert_eq!(seen, expected, "each ready slot surfaces exactly once per sweep");
        assert!(table.next_payload().is_none());
    }

    #[test]
    fn test_trailing_zeros_are_trimmed_and_length_rewritten() {
        let mut table = SlotTable::new(SlotLayout::default()).unwrap();
        // handcrafted frame with a zero tail: declared length 6 (size 8),
        // but everything after the first payload byte is zero
        let padded = [0xC8, 0x06, CRSF_FRAMETYPE_FLIGHT_MODE, b'A', 0, 0, 0, 0];

        assert!(table.store(4, &padded));
        let payload = table.next_payload().expect("slot should be ready");

        assert_eq!(payload.len(), 4);
        assert_eq!(payload[0], 0xC8);
        assert_eq!(payload[1], 2, "length field rewritten to the trimmed size");
        assert_eq!(payload[2], CRSF_FRAMETYPE_FLIGHT_MODE);
        assert_eq!(payload[3], b'A');
    }

    #[test]
    fn test_all_zero_slot_is_skipped_without_stalling() {
        let mut table = SlotTable::new(SlotLayout::default()).unwrap();

        // zeroed content marked updated trims to nothing
        assert!(table.store(2, &[0, 0, 0, 0]));
        assert!(table.next_payload().is_none());

        // the cursor was restored: a real frame is still reachable
        let frame = build_frame(CRSF_FRAMETYPE_GPS, &[0x5A; 15]);
        assert!(table.store(0, &frame));
        let payload = table.next_payload().expect("real frame should surface");
        assert_eq!(payload[2], CRSF_FRAMETYPE_GPS);
    }

    #[test]
    fn test_store_rejects_oversize_frame() {
        let mut table = SlotTable::new(SlotLayout::default()).unwrap();
        // vario slot holds 6 bytes
        let oversize = build_frame(CRSF_FRAMETYPE_VARIO, &[0x42; 10]);
        assert!(!table.store(5, &oversize));
        assert!(!table.is_updated(5));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut table = SlotTable::new(SlotLayout::default()).unwrap();
        let frame = build_frame(CRSF_FRAMETYPE_GPS, &[0x77; 15]);

        assert!(table.store(0, &frame));
        assert!(table.next_payload().is_some());
        table.reset();

        assert_eq!(table.updated_count(), 0);
        assert_eq!(table.cursor, 0);
        assert!(table.arena.iter().all(|&b| b == 0));
        assert!(table.next_payload().is_none());
    }
}
