//! Canned handshake fixtures: a scripted TLS 1.2-shaped exchange for each
//! role, assembled into a ready-to-drive [`Session`].

use std::sync::Arc;

use handshake::{
    Config, DriveError, EndpointContext, HandshakeState, MessageHeader, MessageType,
    ProtocolVersion, Role, RoleHooks, Session, Transport, WorkState,
};

use crate::recorder::{Observed, Recorder};
use crate::script::{ReadOp, ScriptedHooks, ScriptedRecord, WriteOp};

/// A session wired to scripted collaborators plus the shared log.
pub struct Fixture {
    /// The session under test.
    pub session: Session,
    /// Log shared by hooks, record layer, and the info callback.
    pub recorder: Recorder,
    /// The endpoint context, for statistics assertions.
    pub ctx: Arc<EndpointContext>,
}

impl Fixture {
    /// Wires a session from explicit plans.
    ///
    /// The same hook bundle is cloned into both role slots; only the driven
    /// role's copy is ever consulted. The context-level info callback logs
    /// into the shared recorder.
    #[must_use]
    pub fn assemble(
        config: Config,
        headers: Vec<MessageHeader>,
        write_plan: Vec<WriteOp>,
        read_plan: Vec<ReadOp>,
        blocks: &[usize],
    ) -> Self {
        let recorder = Recorder::new();
        let record = ScriptedRecord::new(recorder.clone(), headers).with_blocks(blocks);
        let hooks = ScriptedHooks::new(recorder.clone(), write_plan, read_plan);
        Self::with_parts(config, recorder, record, hooks)
    }

    /// Wires a session from pre-built collaborators sharing `recorder`.
    #[must_use]
    pub fn with_parts(
        config: Config,
        recorder: Recorder,
        record: ScriptedRecord,
        hooks: ScriptedHooks,
    ) -> Self {
        let callback_log = recorder.clone();
        let ctx = Arc::new(
            EndpointContext::builder()
                .info_callback(Box::new(move |_state, event, value| {
                    callback_log.log(Observed::Callback(event, value));
                }))
                .build(),
        );

        let session = Session::new(
            config,
            Box::new(record),
            RoleHooks::new(Box::new(hooks.clone()), Box::new(hooks)),
            Arc::clone(&ctx),
        );

        Self {
            session,
            recorder,
            ctx,
        }
    }

    /// Drives until success, retrying through would-block suspensions.
    /// Returns the number of drive calls made.
    ///
    /// # Errors
    ///
    /// Propagates a fatal drive outcome.
    ///
    /// # Panics
    ///
    /// Panics if the handshake does not complete within `max_calls`.
    pub fn drive_to_completion(
        &mut self,
        role: Role,
        max_calls: usize,
    ) -> Result<usize, DriveError> {
        for calls in 1..=max_calls {
            match self.session.drive(role) {
                Ok(()) => return Ok(calls),
                Err(DriveError::WouldBlock) => {}
                Err(fatal) => return Err(fatal),
            }
        }
        panic!("handshake did not complete within {max_calls} drive calls");
    }
}

/// The header script a client-side run consumes: the server's first flight
/// and its finished message.
#[must_use]
pub fn client_headers() -> Vec<MessageHeader> {
    vec![
        MessageHeader::new(MessageType::ServerHello, 90),
        MessageHeader::new(MessageType::Certificate, 1024),
        MessageHeader::new(MessageType::ServerHelloDone, 0),
        MessageHeader::new(MessageType::Finished, 12),
    ]
}

/// The canonical client plan: hello, key exchange, change-cipher-spec, and
/// finished, with the handshake ending from pre-work once the server's
/// finished message has been read.
#[must_use]
pub fn client_plan() -> (Vec<WriteOp>, Vec<ReadOp>) {
    let write_plan = vec![
        WriteOp::message(HandshakeState::CwClientHello),
        WriteOp::finish_phase(),
        WriteOp::message(HandshakeState::CwClientKeyExchange),
        WriteOp::message(HandshakeState::CwChangeCipherSpec),
        WriteOp::message(HandshakeState::CwFinished),
        WriteOp::finish_phase(),
        WriteOp::end_before_send(HandshakeState::Ok),
    ];
    let read_plan = vec![
        ReadOp::message(MessageType::ServerHello, HandshakeState::CrServerHello),
        ReadOp::message(MessageType::Certificate, HandshakeState::CrCertificate),
        ReadOp::finishing(MessageType::ServerHelloDone, HandshakeState::CrServerHelloDone),
        ReadOp::processed(
            MessageType::Finished,
            HandshakeState::CrFinished,
            &[WorkState::FinishedStop],
        ),
    ];
    (write_plan, read_plan)
}

/// A client session over the given transport, with optional one-shot blocks
/// at the listed transport operation indices.
#[must_use]
pub fn client_fresh(transport: Transport, blocks: &[usize]) -> Fixture {
    let version = if transport.is_datagram() {
        ProtocolVersion::Dtls12
    } else {
        ProtocolVersion::Tls12
    };
    let config = Config::builder()
        .version(version)
        .transport(transport)
        .build();
    let (write_plan, read_plan) = client_plan();
    Fixture::assemble(config, client_headers(), write_plan, read_plan, blocks)
}

/// The header script a server-side run consumes.
#[must_use]
pub fn server_headers() -> Vec<MessageHeader> {
    vec![
        MessageHeader::new(MessageType::ClientHello, 120),
        MessageHeader::new(MessageType::ClientKeyExchange, 66),
        MessageHeader::new(MessageType::Finished, 12),
    ]
}

/// The canonical server plan. The first write iteration has nothing to say
/// and immediately hands the turn to the peer.
#[must_use]
pub fn server_plan(peer_secure: bool) -> (Vec<WriteOp>, Vec<ReadOp>) {
    let write_plan = vec![
        WriteOp::finish_phase(),
        WriteOp::message(HandshakeState::SwServerHello),
        WriteOp::message(HandshakeState::SwCertificate),
        WriteOp::message(HandshakeState::SwServerHelloDone),
        WriteOp::finish_phase(),
        WriteOp::message(HandshakeState::SwChangeCipherSpec),
        WriteOp::message(HandshakeState::SwFinished),
        WriteOp::end_before_send(HandshakeState::Ok),
    ];
    let client_hello = ReadOp::processed(
        MessageType::ClientHello,
        HandshakeState::SrClientHello,
        &[WorkState::FinishedStop],
    );
    let client_hello = if peer_secure {
        client_hello.with_peer_secure()
    } else {
        client_hello
    };
    let read_plan = vec![
        client_hello,
        ReadOp::message(MessageType::ClientKeyExchange, HandshakeState::SrClientKeyExchange),
        ReadOp::finishing(MessageType::Finished, HandshakeState::SrFinished),
    ];
    (write_plan, read_plan)
}

/// The write plan a renegotiating server follows: a HelloRequest, then the
/// handshake ends from pre-work. Appended after [`server_plan`] when a test
/// drives a renegotiation after the fresh handshake.
#[must_use]
pub fn server_renegotiate_plan() -> Vec<WriteOp> {
    vec![
        WriteOp::message(HandshakeState::SwHelloRequest),
        WriteOp::end_before_send(HandshakeState::Ok),
    ]
}

/// A stream-transport server session running the canonical plan.
#[must_use]
pub fn server_fresh(peer_secure: bool) -> Fixture {
    let config = Config::builder().version(ProtocolVersion::Tls12).build();
    let (write_plan, read_plan) = server_plan(peer_secure);
    Fixture::assemble(config, server_headers(), write_plan, read_plan, &[])
}
