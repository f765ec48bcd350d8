//! crates/handshake/src/state.rs
//!
//! The tagged states of the two-level machine. Every dispatch over these
//! types is a closed match; hook return values that the original protocol
//! treated as "unrecognized, therefore fatal" are unrepresentable here.

/// Endpoint role, latched at the first initialization of a session.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Role {
    /// Initiating endpoint.
    Client,
    /// Accepting endpoint.
    Server,
}

impl Role {
    /// Returns `true` for the accepting endpoint.
    #[must_use]
    pub const fn is_server(self) -> bool {
        matches!(self, Self::Server)
    }
}

/// Coarse phase of the message-flow machine.
///
/// ```text
/// Uninited     Renegotiate
///     |             |
///     +------+------+
///            v
///       Writing <---> Reading
///            |
///            v
///        Finished ---> [success, reset to Uninited]
/// ```
///
/// `Error` is reachable from any phase and is terminal for the connection.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FlowState {
    /// No handshake in progress; the session is reusable.
    Uninited,
    /// A renegotiation has been requested but not yet started.
    Renegotiate,
    /// The read sub-machine is active.
    Reading,
    /// The write sub-machine is active.
    Writing,
    /// The handshake just completed; transient within one drive call.
    Finished,
    /// Permanent failure; latched for the remainder of the connection.
    Error,
}

/// Micro-state of the read sub-machine.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReadState {
    /// Acquiring the next message header.
    Header,
    /// Acquiring and processing the message body.
    Body,
    /// Running deferred post-processing that may suspend.
    PostProcess,
}

/// Micro-state of the write sub-machine.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WriteState {
    /// Deciding the next outgoing message.
    Transition,
    /// Preparing the message; may suspend.
    PreWork,
    /// Handing the constructed message to the record layer.
    Send,
    /// Finalizing after the send; may suspend.
    PostWork,
}

/// Resumable continuation marker for the work hooks.
///
/// The `More*` values are suspension points: the driver stores the marker,
/// returns to its caller, and re-invokes the same hook with the stored marker
/// on the next call.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum WorkState {
    /// First resumable continuation.
    MoreA,
    /// Second resumable continuation.
    MoreB,
    /// Third resumable continuation.
    MoreC,
    /// Work complete; continue the current sub-machine.
    FinishedContinue,
    /// Work complete; the handshake phase is over.
    FinishedStop,
}

impl WorkState {
    /// Returns `true` if this marker suspends the sub-machine.
    #[must_use]
    pub const fn is_more(self) -> bool {
        matches!(self, Self::MoreA | Self::MoreB | Self::MoreC)
    }
}

/// Verdict of the message-processing hook.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum MessageProcess {
    /// Processing failed; the handshake cannot continue.
    Error,
    /// Message consumed; read the next message.
    ContinueReading,
    /// Message consumed; deferred post-processing follows.
    ContinueProcessing,
    /// Message consumed and the read phase is over.
    FinishedReading,
}

/// Verdict of the write-transition hook.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum WriteTransition {
    /// A message is due; proceed to preparation.
    Continue,
    /// Nothing further to write; the peer speaks next.
    Finished,
    /// No legal transition exists from the current state.
    Error,
}

/// Result of one sub-machine activation.
pub(crate) enum SubState {
    /// Natural phase boundary; the flow machine switches direction.
    Finished,
    /// The handshake is completely done.
    EndHandshake,
    /// Suspension or fatal error; the outer driver unwinds.
    Error,
}

/// Protocol-level handshake position.
///
/// The enumeration is owned by the collaborators: transition hooks advance
/// it and construction hooks consult it. The driver itself branches only on
/// [`Before`](Self::Before), [`Ok`](Self::Ok),
/// [`CwClientHello`](Self::CwClientHello), and the two change-cipher-spec
/// write states.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum HandshakeState {
    /// No handshake message exchanged yet.
    Before,
    /// Handshake complete.
    Ok,
    /// Client writing ClientHello.
    CwClientHello,
    /// Client writing its certificate.
    CwCertificate,
    /// Client writing ClientKeyExchange.
    CwClientKeyExchange,
    /// Client writing CertificateVerify.
    CwCertificateVerify,
    /// Client writing the change-cipher-spec signal.
    CwChangeCipherSpec,
    /// Client writing NextProto.
    CwNextProto,
    /// Client writing Finished.
    CwFinished,
    /// Client reading ServerHello.
    CrServerHello,
    /// Client reading the server certificate.
    CrCertificate,
    /// Client reading CertificateStatus.
    CrCertificateStatus,
    /// Client reading ServerKeyExchange.
    CrServerKeyExchange,
    /// Client reading CertificateRequest.
    CrCertificateRequest,
    /// Client reading ServerHelloDone.
    CrServerHelloDone,
    /// Client reading NewSessionTicket.
    CrSessionTicket,
    /// Client reading the peer change-cipher-spec signal.
    CrChangeCipherSpec,
    /// Client reading Finished.
    CrFinished,
    /// Client reading HelloVerifyRequest (DTLS).
    CrHelloVerifyRequest,
    /// Server writing HelloRequest.
    SwHelloRequest,
    /// Server writing HelloVerifyRequest (DTLS).
    SwHelloVerifyRequest,
    /// Server writing ServerHello.
    SwServerHello,
    /// Server writing its certificate.
    SwCertificate,
    /// Server writing CertificateStatus.
    SwCertificateStatus,
    /// Server writing ServerKeyExchange.
    SwServerKeyExchange,
    /// Server writing CertificateRequest.
    SwCertificateRequest,
    /// Server writing ServerHelloDone.
    SwServerHelloDone,
    /// Server writing NewSessionTicket.
    SwSessionTicket,
    /// Server writing the change-cipher-spec signal.
    SwChangeCipherSpec,
    /// Server writing Finished.
    SwFinished,
    /// Server reading ClientHello.
    SrClientHello,
    /// Server reading the client certificate.
    SrCertificate,
    /// Server reading ClientKeyExchange.
    SrClientKeyExchange,
    /// Server reading CertificateVerify.
    SrCertificateVerify,
    /// Server reading NextProto.
    SrNextProto,
    /// Server reading the peer change-cipher-spec signal.
    SrChangeCipherSpec,
    /// Server reading Finished.
    SrFinished,
}

impl HandshakeState {
    /// Returns `true` when the next outgoing message is the
    /// change-cipher-spec signal, which travels on its own record type.
    #[must_use]
    pub const fn is_change_cipher_spec_write(self) -> bool {
        matches!(self, Self::CwChangeCipherSpec | Self::SwChangeCipherSpec)
    }
}
