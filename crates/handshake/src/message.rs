//! crates/handshake/src/message.rs
//!
//! Handshake message vocabulary shared between the driver and its
//! collaborators: the message-type registry, the header produced by header
//! acquisition, and the record-path selector used when sending.

use std::fmt;

use thiserror::Error;

/// Largest plaintext record payload the message buffer must accommodate.
pub const MAX_PLAIN_LENGTH: usize = 16_384;

/// Handshake protocol message types with their wire codes.
///
/// The driver never inspects message bodies; it carries the type between
/// header acquisition and the read-transition hook and reports it in
/// diagnostics. The registry covers the TLS and DTLS handshake messages the
/// collaborators exchange.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum MessageType {
    /// Server-initiated request to renegotiate (code 0).
    HelloRequest,
    /// Client's opening hello (code 1).
    ClientHello,
    /// Server's hello response (code 2).
    ServerHello,
    /// DTLS cookie exchange (code 3).
    HelloVerifyRequest,
    /// Session ticket issuance (code 4).
    NewSessionTicket,
    /// Certificate chain (code 11).
    Certificate,
    /// Ephemeral key parameters from the server (code 12).
    ServerKeyExchange,
    /// Request for a client certificate (code 13).
    CertificateRequest,
    /// End of the server's first flight (code 14).
    ServerHelloDone,
    /// Proof of certificate possession (code 15).
    CertificateVerify,
    /// Client's key exchange contribution (code 16).
    ClientKeyExchange,
    /// Handshake transcript verification (code 20).
    Finished,
    /// Stapled OCSP response (code 22).
    CertificateStatus,
    /// Next-protocol announcement (code 67).
    NextProto,
}

impl MessageType {
    /// Returns the wire code for this message type.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        match self {
            Self::HelloRequest => 0,
            Self::ClientHello => 1,
            Self::ServerHello => 2,
            Self::HelloVerifyRequest => 3,
            Self::NewSessionTicket => 4,
            Self::Certificate => 11,
            Self::ServerKeyExchange => 12,
            Self::CertificateRequest => 13,
            Self::ServerHelloDone => 14,
            Self::CertificateVerify => 15,
            Self::ClientKeyExchange => 16,
            Self::Finished => 20,
            Self::CertificateStatus => 22,
            Self::NextProto => 67,
        }
    }

    /// Decodes a wire code into a message type.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownMessageType`] when the code is not in the registry.
    pub const fn from_byte(code: u8) -> Result<Self, UnknownMessageType> {
        Ok(match code {
            0 => Self::HelloRequest,
            1 => Self::ClientHello,
            2 => Self::ServerHello,
            3 => Self::HelloVerifyRequest,
            4 => Self::NewSessionTicket,
            11 => Self::Certificate,
            12 => Self::ServerKeyExchange,
            13 => Self::CertificateRequest,
            14 => Self::ServerHelloDone,
            15 => Self::CertificateVerify,
            16 => Self::ClientKeyExchange,
            20 => Self::Finished,
            22 => Self::CertificateStatus,
            67 => Self::NextProto,
            _ => return Err(UnknownMessageType(code)),
        })
    }

    /// Returns the canonical name of the message type.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::HelloRequest => "HelloRequest",
            Self::ClientHello => "ClientHello",
            Self::ServerHello => "ServerHello",
            Self::HelloVerifyRequest => "HelloVerifyRequest",
            Self::NewSessionTicket => "NewSessionTicket",
            Self::Certificate => "Certificate",
            Self::ServerKeyExchange => "ServerKeyExchange",
            Self::CertificateRequest => "CertificateRequest",
            Self::ServerHelloDone => "ServerHelloDone",
            Self::CertificateVerify => "CertificateVerify",
            Self::ClientKeyExchange => "ClientKeyExchange",
            Self::Finished => "Finished",
            Self::CertificateStatus => "CertificateStatus",
            Self::NextProto => "NextProto",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A handshake message code outside the registry.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
#[error("unknown handshake message type {0}")]
pub struct UnknownMessageType(pub u8);

/// Result of header acquisition for the next inbound handshake message.
///
/// For datagram transports the message body is already buffered by the time
/// the header is returned; for stream transports the body follows through
/// [`RecordLayer::read_message_body`](crate::record::RecordLayer::read_message_body).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MessageHeader {
    /// Declared type of the inbound message.
    pub message_type: MessageType,
    /// Declared body size in bytes.
    pub message_size: usize,
}

impl MessageHeader {
    /// Constructs a header from its parts.
    #[must_use]
    pub const fn new(message_type: MessageType, message_size: usize) -> Self {
        Self {
            message_type,
            message_size,
        }
    }
}

/// Record-layer write path selector.
///
/// The change-cipher-spec signal travels on its own record type, so the write
/// sub-machine routes it through a dedicated path.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum RecordKind {
    /// Standard handshake record write path.
    Handshake,
    /// Dedicated change-cipher-spec write path.
    ChangeCipherSpec,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_codes_match_the_wire_registry() {
        assert_eq!(MessageType::HelloRequest.to_byte(), 0);
        assert_eq!(MessageType::ClientHello.to_byte(), 1);
        assert_eq!(MessageType::ServerHelloDone.to_byte(), 14);
        assert_eq!(MessageType::Finished.to_byte(), 20);
        assert_eq!(MessageType::NextProto.to_byte(), 67);
    }

    #[test]
    fn from_byte_round_trips_known_codes() {
        assert_eq!(MessageType::from_byte(2), Ok(MessageType::ServerHello));
        assert_eq!(MessageType::from_byte(16), Ok(MessageType::ClientKeyExchange));
    }

    #[test]
    fn from_byte_rejects_unknown_codes() {
        assert_eq!(MessageType::from_byte(99), Err(UnknownMessageType(99)));
        assert!(
            UnknownMessageType(99)
                .to_string()
                .contains("unknown handshake message type")
        );
    }

    #[test]
    fn display_uses_canonical_names() {
        assert_eq!(MessageType::ClientHello.to_string(), "ClientHello");
        assert_eq!(MessageType::CertificateVerify.to_string(), "CertificateVerify");
    }

    #[test]
    fn header_carries_its_parts() {
        let header = MessageHeader::new(MessageType::ServerHello, 512);
        assert_eq!(header.message_type, MessageType::ServerHello);
        assert_eq!(header.message_size, 512);
    }
}
