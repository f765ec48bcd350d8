//! crates/handshake/src/alert.rs
//!
//! The slice of the TLS alert registry the driver emits on its own
//! authority. Collaborators send richer alert sets through their own
//! channels; the driver only ever raises the handful below.

use std::fmt;

/// Alert severity.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum AlertLevel {
    /// Recoverable warning (code 1).
    Warning,
    /// Connection-terminating failure (code 2).
    Fatal,
}

impl AlertLevel {
    /// Returns the wire code for this level.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        match self {
            Self::Warning => 1,
            Self::Fatal => 2,
        }
    }
}

/// Alert descriptions raised by the flow driver.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum AlertDescription {
    /// A message arrived that the handshake state does not accept (code 10).
    UnexpectedMessage,
    /// The handshake cannot proceed under the local policy (code 40).
    HandshakeFailure,
    /// A declared field violates protocol bounds (code 47).
    IllegalParameter,
    /// The configured protocol version was rejected (code 70).
    ProtocolVersion,
    /// An internal inconsistency unrelated to the peer (code 80).
    InternalError,
}

impl AlertDescription {
    /// Returns the wire code for this description.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        match self {
            Self::UnexpectedMessage => 10,
            Self::HandshakeFailure => 40,
            Self::IllegalParameter => 47,
            Self::ProtocolVersion => 70,
            Self::InternalError => 80,
        }
    }

    /// Returns the canonical registry name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::UnexpectedMessage => "unexpected_message",
            Self::HandshakeFailure => "handshake_failure",
            Self::IllegalParameter => "illegal_parameter",
            Self::ProtocolVersion => "protocol_version",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for AlertDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_match_the_registry() {
        assert_eq!(AlertLevel::Warning.to_byte(), 1);
        assert_eq!(AlertLevel::Fatal.to_byte(), 2);
    }

    #[test]
    fn descriptions_match_the_registry() {
        assert_eq!(AlertDescription::UnexpectedMessage.to_byte(), 10);
        assert_eq!(AlertDescription::HandshakeFailure.to_byte(), 40);
        assert_eq!(AlertDescription::IllegalParameter.to_byte(), 47);
        assert_eq!(AlertDescription::ProtocolVersion.to_byte(), 70);
        assert_eq!(AlertDescription::InternalError.to_byte(), 80);
    }

    #[test]
    fn display_uses_registry_names() {
        assert_eq!(AlertDescription::HandshakeFailure.to_string(), "handshake_failure");
    }
}
