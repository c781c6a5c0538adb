//! # MSP Chunk-Reassembly Collaborator
//!
//! Larger MSP messages are carried over CRSF in two chunks. Reassembling
//! them is not this crate's job: the multiplexer only hands every raw
//! MSP-carrying frame to an external collaborator through this trait.

/// Receiver for raw MSP-carrying CRSF frames.
///
/// `feed` is called once per CRC-valid MSP request/response frame, before
/// any slot-routing decision. Implementations own whatever chunk state they
/// need; the multiplexer never inspects it.
pub trait MspSink: Send {
    fn feed(&mut self, frame: &[u8]);
}

/// Collaborator that ignores every frame. Used when no MSP bridge is wired.
#[derive(Debug, Default)]
pub struct NullMspSink;

impl MspSink for NullMspSink {
    fn feed(&mut self, _frame: &[u8]) {}
}
