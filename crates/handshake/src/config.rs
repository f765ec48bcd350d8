//! crates/handshake/src/config.rs
//!
//! Session configuration: protocol version, transport family, security
//! policy, and the option toggles the driver consults at initialization.
//! Validation runs when a handshake (re)initializes, not at construction,
//! so a session can be configured before its transport is known.

use std::fmt;

use crate::error::HandshakeError;
use crate::state::Role;

/// Protocol versions the endpoint can be pinned to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProtocolVersion {
    /// SSL 3.0 (wire 0x0300).
    Ssl3,
    /// TLS 1.0 (wire 0x0301).
    Tls10,
    /// TLS 1.1 (wire 0x0302).
    Tls11,
    /// TLS 1.2 (wire 0x0303).
    Tls12,
    /// DTLS 1.0 (wire 0xFEFF).
    Dtls1,
    /// DTLS 1.2 (wire 0xFEFD).
    Dtls12,
    /// The pre-standard DTLS variant some clients still offer (wire 0x0100).
    DtlsBadVer,
    /// No pin; the handshake negotiates the version.
    Any,
}

impl ProtocolVersion {
    /// Returns the wire encoding, or `None` for [`Any`](Self::Any).
    #[must_use]
    pub const fn wire_value(self) -> Option<u16> {
        match self {
            Self::Ssl3 => Some(0x0300),
            Self::Tls10 => Some(0x0301),
            Self::Tls11 => Some(0x0302),
            Self::Tls12 => Some(0x0303),
            Self::Dtls1 => Some(0xFEFF),
            Self::Dtls12 => Some(0xFEFD),
            Self::DtlsBadVer => Some(0x0100),
            Self::Any => None,
        }
    }

    /// Returns `true` for versions that run over datagram transport.
    #[must_use]
    pub const fn is_datagram_family(self) -> bool {
        matches!(self, Self::Dtls1 | Self::Dtls12 | Self::DtlsBadVer)
    }

    /// Cross-family strength rank used by the policy floor. DTLS versions
    /// rank with the TLS version they are built on.
    const fn rank(self) -> u8 {
        match self {
            Self::Ssl3 => 0,
            Self::Tls10 | Self::DtlsBadVer => 1,
            Self::Tls11 | Self::Dtls1 => 2,
            Self::Tls12 | Self::Dtls12 => 3,
            Self::Any => u8::MAX,
        }
    }

    /// Returns the display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ssl3 => "SSL 3.0",
            Self::Tls10 => "TLS 1.0",
            Self::Tls11 => "TLS 1.1",
            Self::Tls12 => "TLS 1.2",
            Self::Dtls1 => "DTLS 1.0",
            Self::Dtls12 => "DTLS 1.2",
            Self::DtlsBadVer => "DTLS (legacy pre-standard)",
            Self::Any => "any",
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Datagram transport flavor.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DatagramKind {
    /// Plain unreliable datagrams; retransmission timers apply.
    Udp,
    /// SCTP carries its own reliability, so no write buffering is pushed.
    Sctp,
}

/// Transport family beneath the record layer.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Transport {
    /// Reliable byte stream.
    Stream,
    /// Unreliable packets.
    Datagram(DatagramKind),
}

impl Transport {
    /// Returns `true` for packet-based transport.
    #[must_use]
    pub const fn is_datagram(self) -> bool {
        matches!(self, Self::Datagram(_))
    }

    /// Returns `true` for DTLS over SCTP.
    #[must_use]
    pub const fn is_sctp(self) -> bool {
        matches!(self, Self::Datagram(DatagramKind::Sctp))
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stream => f.write_str("stream"),
            Self::Datagram(_) => f.write_str("datagram"),
        }
    }
}

/// The version floor of the local security policy.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SecurityPolicy {
    minimum_version: Option<ProtocolVersion>,
}

impl SecurityPolicy {
    /// A policy that refuses versions weaker than `minimum`.
    #[must_use]
    pub const fn with_minimum(minimum: ProtocolVersion) -> Self {
        Self {
            minimum_version: Some(minimum),
        }
    }

    /// Returns `true` if `version` satisfies the policy floor.
    #[must_use]
    pub fn version_allowed(self, version: ProtocolVersion) -> bool {
        self.minimum_version
            .is_none_or(|minimum| version.rank() >= minimum.rank())
    }
}

/// Immutable per-session configuration.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    version: ProtocolVersion,
    transport: Transport,
    policy: SecurityPolicy,
    allow_unsafe_legacy_renegotiation: bool,
    heartbeat: bool,
}

impl Config {
    /// Starts building a configuration.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Configured protocol version.
    #[must_use]
    pub const fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Configured transport family.
    #[must_use]
    pub const fn transport(&self) -> Transport {
        self.transport
    }

    /// The local security policy.
    #[must_use]
    pub const fn policy(&self) -> SecurityPolicy {
        self.policy
    }

    /// Whether renegotiation with a peer lacking secure-renegotiation
    /// support is tolerated.
    #[must_use]
    pub const fn allow_unsafe_legacy_renegotiation(&self) -> bool {
        self.allow_unsafe_legacy_renegotiation
    }

    /// Whether the heartbeat extension is enabled for the session.
    #[must_use]
    pub const fn heartbeat_enabled(&self) -> bool {
        self.heartbeat
    }

    /// Checks the configured version against the transport family and the
    /// security policy. Called by the driver when a handshake initializes.
    ///
    /// # Errors
    ///
    /// [`HandshakeError::VersionTransportMismatch`] when the version cannot
    /// run over the configured transport (the legacy pre-standard DTLS
    /// version is additionally client-only), and
    /// [`HandshakeError::VersionRejected`] when a pinned version falls below
    /// the policy floor.
    pub fn validate_for(&self, role: Role) -> Result<(), HandshakeError> {
        let family_ok = match self.transport {
            Transport::Stream => {
                matches!(
                    self.version,
                    ProtocolVersion::Any
                        | ProtocolVersion::Ssl3
                        | ProtocolVersion::Tls10
                        | ProtocolVersion::Tls11
                        | ProtocolVersion::Tls12
                )
            }
            Transport::Datagram(_) => match self.version {
                ProtocolVersion::Any | ProtocolVersion::Dtls1 | ProtocolVersion::Dtls12 => true,
                ProtocolVersion::DtlsBadVer => role == Role::Client,
                _ => false,
            },
        };
        if !family_ok {
            return Err(HandshakeError::VersionTransportMismatch {
                version: self.version,
                transport: self.transport,
            });
        }
        if self.version != ProtocolVersion::Any && !self.policy.version_allowed(self.version) {
            return Err(HandshakeError::VersionRejected(self.version));
        }
        Ok(())
    }
}

/// Builder for [`Config`].
#[derive(Clone, Copy, Debug)]
pub struct ConfigBuilder {
    version: ProtocolVersion,
    transport: Transport,
    policy: SecurityPolicy,
    allow_unsafe_legacy_renegotiation: bool,
    heartbeat: bool,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self {
            version: ProtocolVersion::Any,
            transport: Transport::Stream,
            policy: SecurityPolicy::default(),
            allow_unsafe_legacy_renegotiation: false,
            heartbeat: false,
        }
    }
}

impl ConfigBuilder {
    /// Pins the protocol version.
    #[must_use]
    pub const fn version(mut self, version: ProtocolVersion) -> Self {
        self.version = version;
        self
    }

    /// Selects the transport family.
    #[must_use]
    pub const fn transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    /// Installs a security policy.
    #[must_use]
    pub const fn policy(mut self, policy: SecurityPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Tolerates renegotiation with peers that lack secure-renegotiation
    /// support.
    #[must_use]
    pub const fn allow_unsafe_legacy_renegotiation(mut self, allow: bool) -> Self {
        self.allow_unsafe_legacy_renegotiation = allow;
        self
    }

    /// Enables the heartbeat extension.
    #[must_use]
    pub const fn heartbeat(mut self, enabled: bool) -> Self {
        self.heartbeat = enabled;
        self
    }

    /// Finalizes the configuration.
    #[must_use]
    pub const fn build(self) -> Config {
        Config {
            version: self.version,
            transport: self.transport,
            policy: self.policy,
            allow_unsafe_legacy_renegotiation: self.allow_unsafe_legacy_renegotiation,
            heartbeat: self.heartbeat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datagram() -> Transport {
        Transport::Datagram(DatagramKind::Udp)
    }

    #[test]
    fn builder_defaults_negotiate_over_stream() {
        let config = Config::builder().build();
        assert_eq!(config.version(), ProtocolVersion::Any);
        assert_eq!(config.transport(), Transport::Stream);
        assert!(!config.allow_unsafe_legacy_renegotiation());
        assert!(!config.heartbeat_enabled());
    }

    #[test]
    fn stream_accepts_tls_versions() {
        let config = Config::builder().version(ProtocolVersion::Tls12).build();
        assert!(config.validate_for(Role::Client).is_ok());
        assert!(config.validate_for(Role::Server).is_ok());
    }

    #[test]
    fn stream_rejects_dtls_versions() {
        let config = Config::builder().version(ProtocolVersion::Dtls12).build();
        assert!(matches!(
            config.validate_for(Role::Client),
            Err(HandshakeError::VersionTransportMismatch { .. })
        ));
    }

    #[test]
    fn datagram_rejects_tls_versions() {
        let config = Config::builder()
            .version(ProtocolVersion::Tls12)
            .transport(datagram())
            .build();
        assert!(matches!(
            config.validate_for(Role::Server),
            Err(HandshakeError::VersionTransportMismatch { .. })
        ));
    }

    #[test]
    fn legacy_dtls_version_is_client_only() {
        let config = Config::builder()
            .version(ProtocolVersion::DtlsBadVer)
            .transport(datagram())
            .build();
        assert!(config.validate_for(Role::Client).is_ok());
        assert!(matches!(
            config.validate_for(Role::Server),
            Err(HandshakeError::VersionTransportMismatch { .. })
        ));
    }

    #[test]
    fn policy_floor_rejects_weak_versions() {
        let config = Config::builder()
            .version(ProtocolVersion::Tls10)
            .policy(SecurityPolicy::with_minimum(ProtocolVersion::Tls12))
            .build();
        assert!(matches!(
            config.validate_for(Role::Client),
            Err(HandshakeError::VersionRejected(ProtocolVersion::Tls10))
        ));
    }

    #[test]
    fn policy_floor_ranks_dtls_with_its_tls_base() {
        let policy = SecurityPolicy::with_minimum(ProtocolVersion::Tls12);
        assert!(policy.version_allowed(ProtocolVersion::Dtls12));
        assert!(!policy.version_allowed(ProtocolVersion::Dtls1));
    }

    #[test]
    fn negotiated_version_is_never_policy_checked() {
        let config = Config::builder()
            .policy(SecurityPolicy::with_minimum(ProtocolVersion::Tls12))
            .build();
        assert!(config.validate_for(Role::Client).is_ok());
    }

    #[test]
    fn sctp_is_a_datagram_transport() {
        let sctp = Transport::Datagram(DatagramKind::Sctp);
        assert!(sctp.is_datagram());
        assert!(sctp.is_sctp());
        assert!(!Transport::Stream.is_sctp());
        assert!(!datagram().is_sctp());
    }
}
