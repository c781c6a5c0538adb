//! # Telemetry Multiplexer
//!
//! Receiver-side multiplexing of inbound CRSF telemetry onto the narrow
//! uplink channel.
//!
//! This module handles:
//! - Frame reassembly from the UART byte stream ([`framer`])
//! - Classification of validated frames into latches or slots
//! - Fixed-memory slot storage and round-robin scheduling ([`slots`])
//! - Forwarding MSP-carrying frames to an external collaborator ([`msp`])
//!
//! The core is single-threaded and non-reentrant: the receive path
//! (`feed_byte`) and the transmit path (`next_payload`) must be serialized
//! by the caller. The binary does this with one `select!` loop.

pub mod framer;
pub mod msp;
pub mod slots;

use tracing::{debug, trace};

use crate::crsf::protocol::{
    FrameView, CRSF_ADDRESS_CRSF_RECEIVER, CRSF_ADDRESS_FLIGHT_CONTROLLER,
    CRSF_AP_CUSTOM_TELEM_STATUS_TEXT, CRSF_FRAMETYPE_ARDUPILOT_RESP, CRSF_FRAMETYPE_COMMAND,
    CRSF_FRAMETYPE_DEVICE_PING, CRSF_FRAMETYPE_MSP_REQ, CRSF_FRAMETYPE_MSP_RESP, CRSF_TYPE_INDEX,
};
use crate::error::Result;
use self::framer::{FramerStep, RxFramer};
use self::msp::MspSink;
use self::slots::{SlotLayout, SlotTable};

/// Latched control flags set by the classifier and consumed exactly once by
/// the external command executor (read clears them).
#[derive(Debug, Default)]
struct ControlLatches {
    bootloader: bool,
    enter_bind: bool,
    update_model_match: bool,
    model_match_id: u8,
    send_device_frame: bool,
}

/// The telemetry multiplexer: framer + classifier + slot table + latches.
///
/// Feed it the receiver UART one byte at a time and pull one frame per
/// transmission opportunity.
pub struct TelemetryMux {
    framer: RxFramer,
    slots: SlotTable,
    latches: ControlLatches,
    msp_sink: Option<Box<dyn MspSink>>,
    received_packages: u32,
}

impl TelemetryMux {
    /// Build a multiplexer with the stock slot layout.
    pub fn new() -> Result<Self> {
        Self::with_layout(SlotLayout::default())
    }

    /// Build a multiplexer with a custom slot layout.
    ///
    /// # Errors
    ///
    /// Returns `SlotConfig` when the layout violates the sizing invariants
    /// (see [`SlotTable::new`]).
    pub fn with_layout(layout: SlotLayout) -> Result<Self> {
        Ok(Self {
            framer: RxFramer::new(),
            slots: SlotTable::new(layout)?,
            latches: ControlLatches::default(),
            msp_sink: None,
            received_packages: 0,
        })
    }

    /// Attach the MSP chunk-reassembly collaborator.
    pub fn set_msp_sink(&mut self, sink: Box<dyn MspSink>) {
        self.msp_sink = Some(sink);
    }

    /// Feed one byte from the UART.
    ///
    /// Returns false for a rejected byte, a malformed length or a CRC
    /// mismatch; true otherwise, including "frame still incomplete". Whether
    /// a completed frame was stored, latched or dropped does not change the
    /// return value.
    pub fn feed_byte(&mut self, byte: u8) -> bool {
        match self.framer.push(byte) {
            FramerStep::Rejected | FramerStep::CrcError => false,
            FramerStep::Pending => true,
            FramerStep::Complete => {
                self.received_packages = self.received_packages.wrapping_add(1);
                let stored = Self::classify(
                    &mut self.slots,
                    &mut self.latches,
                    &mut self.msp_sink,
                    self.framer.frame(),
                );
                if !stored {
                    trace!("telemetry frame dropped by classifier");
                }
                true
            }
        }
    }

    /// Classify one validated frame: latch it, store it in exactly one slot,
    /// or drop it. Returns whether a latch/slot action occurred.
    ///
    /// Control and command frames are intercepted before any slot logic so
    /// they can never be starved by slot contention. Extended-header traffic
    /// collapses into the two trailing reserved slots; everything else goes
    /// through the per-type standard slots.
    fn classify(
        slots: &mut SlotTable,
        latches: &mut ControlLatches,
        msp_sink: &mut Option<Box<dyn MspSink>>,
        frame: &[u8],
    ) -> bool {
        let view = match FrameView::new(frame) {
            Some(view) => view,
            None => return false,
        };
        let frame_type = view.frame_type();

        if frame_type == CRSF_FRAMETYPE_COMMAND {
            match view.command_opcode() {
                Some((b'b', b'l')) => {
                    debug!("bootloader command latched");
                    latches.bootloader = true;
                    return true;
                }
                Some((b'b', b'd')) => {
                    debug!("enter-bind command latched");
                    latches.enter_bind = true;
                    return true;
                }
                Some((b'm', b'm')) => {
                    if let Some(id) = view.byte(5) {
                        debug!(model_match_id = id, "model-match command latched");
                        latches.update_model_match = true;
                        latches.model_match_id = id;
                        return true;
                    }
                    trace!("model-match command without id byte");
                    return false;
                }
                _ => {}
            }
        }

        if frame_type == CRSF_FRAMETYPE_DEVICE_PING
            && view.dest_addr() == Some(CRSF_ADDRESS_CRSF_RECEIVER)
        {
            debug!("device ping for this receiver latched");
            latches.send_device_frame = true;
            return true;
        }

        let is_msp = frame_type == CRSF_FRAMETYPE_MSP_REQ || frame_type == CRSF_FRAMETYPE_MSP_RESP;
        if is_msp {
            if let Some(sink) = msp_sink.as_mut() {
                sink.feed(frame);
            }
        }

        let target = if view.is_extended() {
            if frame_type == CRSF_FRAMETYPE_ARDUPILOT_RESP {
                // the last slot is kept for ArduPilot status text so the
                // important status messages are not lost
                if view.byte(CRSF_TYPE_INDEX + 1) == Some(CRSF_AP_CUSTOM_TELEM_STATUS_TEXT) {
                    Some(slots.last())
                } else {
                    Some(slots.second_to_last())
                }
            } else if view.orig_addr() == Some(CRSF_ADDRESS_FLIGHT_CONTROLLER) {
                let mut index = slots.second_to_last();
                if is_msp {
                    // larger MSP responses arrive in two chunks; both must
                    // survive until consumed
                    if slots.is_updated(index) {
                        index = slots.last();
                    }
                    if slots.is_updated(index) {
                        debug!("both reserved slots occupied, MSP chunk dropped");
                        None
                    } else {
                        Some(index)
                    }
                } else {
                    Some(index)
                }
            } else {
                Some(slots.last())
            }
        } else if let Some(index) = slots.standard_slot_for(frame_type) {
            if !slots.is_locked(index) && view.frame_size() <= slots.capacity(index) {
                Some(index)
            } else {
                trace!(
                    frame_type,
                    slot = index,
                    "standard slot busy or too small, frame dropped"
                );
                None
            }
        } else {
            None
        };

        match target {
            Some(index) => slots.store(index, frame),
            None => false,
        }
    }

    /// Next frame to transmit, if any slot is ready. See
    /// [`SlotTable::next_payload`] for the scheduling rules.
    pub fn next_payload(&mut self) -> Option<&[u8]> {
        self.slots.next_payload()
    }

    /// Bootloader request latch, read-and-clear.
    pub fn take_bootloader_request(&mut self) -> bool {
        std::mem::take(&mut self.latches.bootloader)
    }

    /// Enter-bind request latch, read-and-clear.
    pub fn take_enter_bind_request(&mut self) -> bool {
        std::mem::take(&mut self.latches.enter_bind)
    }

    /// Model-match update latch, read-and-clear; carries the new id.
    pub fn take_model_match_update(&mut self) -> Option<u8> {
        if std::mem::take(&mut self.latches.update_model_match) {
            Some(self.latches.model_match_id)
        } else {
            None
        }
    }

    /// Device-frame request latch, read-and-clear.
    pub fn take_device_frame_request(&mut self) -> bool {
        std::mem::take(&mut self.latches.send_device_frame)
    }

    /// Count of slots holding an unconsumed frame.
    pub fn updated_payload_count(&self) -> usize {
        self.slots.updated_count()
    }

    /// Monotonic count of CRC-valid frames received since the last reset.
    pub fn received_packages_count(&self) -> u32 {
        self.received_packages
    }

    /// Full state reset: framer, slots, latches and counters. Used on link
    /// reset.
    pub fn reset(&mut self) {
        self.framer.reset();
        self.slots.reset();
        self.latches = ControlLatches::default();
        self.received_packages = 0;
    }
}
