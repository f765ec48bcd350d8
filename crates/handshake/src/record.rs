//! crates/handshake/src/record.rs
//!
//! Record-layer collaborator contract. The driver sequences these calls but
//! never touches wire bytes itself: header and body acquisition, the two
//! record write paths, alerting, buffer setup, the finished-MAC transcript,
//! and the datagram retransmission timer all live behind this trait.

use std::io;

use crate::alert::{AlertDescription, AlertLevel};
use crate::message::{MessageHeader, RecordKind};
use crate::session::SessionState;

/// The record layer and transport beneath the flow driver.
///
/// Read and write methods signal suspension with
/// [`io::ErrorKind::WouldBlock`]; the driver preserves all state and reports
/// [`DriveError::WouldBlock`](crate::DriveError::WouldBlock) to its caller,
/// which retries once the transport is ready. Every other error is treated
/// as a fatal transport failure.
pub trait RecordLayer {
    /// Acquires the next handshake message header.
    ///
    /// On success the driver stores the returned header into the session
    /// scratch before any hook can observe it. For datagram transports the
    /// message body must already be buffered when the header is returned.
    ///
    /// # Errors
    ///
    /// [`io::ErrorKind::WouldBlock`] to suspend; anything else is fatal.
    fn read_message_header(&mut self, state: &mut SessionState) -> io::Result<MessageHeader>;

    /// Acquires the message body on stream transports, returning its length.
    /// Never called for datagram transports.
    ///
    /// # Errors
    ///
    /// [`io::ErrorKind::WouldBlock`] to suspend; anything else is fatal.
    fn read_message_body(&mut self, state: &mut SessionState) -> io::Result<usize>;

    /// Writes the constructed message through the selected record path.
    ///
    /// # Errors
    ///
    /// [`io::ErrorKind::WouldBlock`] to suspend; anything else is fatal.
    fn write_record(&mut self, state: &mut SessionState, kind: RecordKind) -> io::Result<()>;

    /// Sends an alert record. Best effort: the driver raises its own error
    /// regardless of whether the alert could be delivered.
    fn send_alert(
        &mut self,
        state: &mut SessionState,
        level: AlertLevel,
        description: AlertDescription,
    );

    /// Prepares the record-layer buffers for a new handshake.
    ///
    /// # Errors
    ///
    /// Any error aborts initialization as an internal failure.
    fn init_buffers(&mut self, state: &mut SessionState) -> io::Result<()>;

    /// Installs the buffering layer on the write side. Not called for SCTP
    /// datagram transport, which supplies its own buffering.
    ///
    /// # Errors
    ///
    /// Any error aborts initialization as an internal failure.
    fn push_write_buffer(&mut self, state: &mut SessionState) -> io::Result<()>;

    /// Reinitializes the finished-MAC transcript accumulator for a fresh
    /// handshake.
    fn reset_transcript(&mut self, state: &mut SessionState);

    /// Arms the datagram retransmission timer around a send.
    fn timer_start(&mut self, state: &mut SessionState);

    /// Cancels the datagram retransmission timer at a read-phase boundary.
    fn timer_stop(&mut self, state: &mut SessionState);

    /// Whether the underlying datagram transport is SCTP.
    fn is_sctp(&self) -> bool {
        false
    }
}
