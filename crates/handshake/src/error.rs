//! crates/handshake/src/error.rs
//!
//! Error taxonomy for the flow driver. Suspension is not an error here:
//! transport hooks signal it with [`std::io::ErrorKind::WouldBlock`] and work
//! hooks signal it by returning a `More*` work state; both surface to the
//! caller as [`DriveError::WouldBlock`] with all session state preserved.

use std::collections::TryReserveError;
use std::io;

use thiserror::Error;

use crate::config::{ProtocolVersion, Transport};
use crate::message::MessageType;

/// Result alias for fallible hook and driver operations.
pub type Result<T> = std::result::Result<T, HandshakeError>;

/// Irrecoverable handshake failures.
///
/// Raising one of these latches the session's flow state to
/// [`FlowState::Error`](crate::state::FlowState::Error); every later drive
/// attempt fails with [`HandshakeError::Latched`] without touching any
/// collaborator.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// The peer sent a message type the current handshake state rejects.
    #[error("unexpected {0} message in the current handshake state")]
    UnexpectedMessage(MessageType),
    /// The declared message size exceeds the role- and state-dependent bound.
    #[error("handshake message of {size} bytes exceeds the {limit} byte limit")]
    OversizedMessage {
        /// Declared size from the message header.
        size: usize,
        /// Bound reported by the active hook bundle.
        limit: usize,
    },
    /// A server tried to renegotiate with a peer that never signalled
    /// secure-renegotiation support.
    #[error("unsafe legacy renegotiation disabled: peer lacks secure renegotiation support")]
    UnsafeRenegotiationDisabled,
    /// The pinned protocol version cannot run over the configured transport.
    #[error("protocol version {version} cannot run over {transport} transport")]
    VersionTransportMismatch {
        /// The configured version.
        version: ProtocolVersion,
        /// The configured transport family.
        transport: Transport,
    },
    /// The security policy refused the pinned protocol version.
    #[error("protocol version {0} rejected by the security policy")]
    VersionRejected(ProtocolVersion),
    /// The message-processing hook reported failure.
    #[error("handshake message processing failed")]
    ProcessFailed,
    /// The write-transition hook found no legal next message.
    #[error("no legal handshake transition from the current write state")]
    TransitionFailed,
    /// A collaborator hook failed irrecoverably.
    #[error("handshake collaborator failure: {0}")]
    Hook(String),
    /// Transport-level failure below the record layer.
    #[error("handshake transport error: {0}")]
    Io(#[from] io::Error),
    /// The handshake message buffer could not be reserved.
    #[error("failed to reserve the handshake message buffer: {0}")]
    BufferReserve(#[from] TryReserveError),
    /// The state machine reached an arm that no legal execution produces.
    #[error("internal handshake state machine error: {0}")]
    Internal(&'static str),
    /// The session already failed permanently in an earlier call.
    #[error("session is latched in a permanent error state")]
    Latched,
}

/// Non-success outcome of [`Session::drive`](crate::Session::drive).
#[derive(Debug, Error)]
pub enum DriveError {
    /// A collaborator needs more I/O before it can make progress. All state
    /// is preserved; call `drive` again once the transport is ready.
    #[error("handshake suspended: I/O would block")]
    WouldBlock,
    /// The handshake failed permanently. Close and discard the connection.
    #[error(transparent)]
    Fatal(#[from] HandshakeError),
}

impl DriveError {
    /// Returns `true` when the caller should retry after more I/O.
    #[must_use]
    pub const fn is_would_block(&self) -> bool {
        matches!(self, Self::WouldBlock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_convert_into_the_taxonomy() {
        let err: HandshakeError =
            io::Error::new(io::ErrorKind::ConnectionReset, "peer went away").into();
        assert!(matches!(err, HandshakeError::Io(_)));
        assert!(err.to_string().contains("transport error"));
    }

    #[test]
    fn fatal_wraps_transparently() {
        let err = DriveError::Fatal(HandshakeError::ProcessFailed);
        assert_eq!(err.to_string(), "handshake message processing failed");
        assert!(!err.is_would_block());
    }

    #[test]
    fn would_block_is_retryable() {
        assert!(DriveError::WouldBlock.is_would_block());
    }

    #[test]
    fn oversize_reports_both_sizes() {
        let err = HandshakeError::OversizedMessage {
            size: 70_000,
            limit: 16_384,
        };
        let rendered = err.to_string();
        assert!(rendered.contains("70000"));
        assert!(rendered.contains("16384"));
    }
}
