//! crates/handshake/src/flow.rs
//!
//! The outer message-flow machine. A session starts in
//! [`FlowState::Uninited`] (or [`FlowState::Renegotiate`] when a
//! renegotiation was requested) and oscillates between the writing and
//! reading sub-machines until one of them reports the end of the handshake:
//!
//! ```text
//! Uninited     Renegotiate
//!     |             |
//!     +------+------+
//!            v
//!       Writing <---> Reading
//!            |
//!            v
//!        Finished --> [success]
//! ```
//!
//! A drive call may return early because a collaborator cannot make progress
//! without more I/O; every state variable survives the return and the next
//! call resumes at the saved micro-state. An irrecoverable failure latches
//! [`FlowState::Error`] for the remainder of the connection.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::alert::{AlertDescription, AlertLevel};
use crate::config::Config;
use crate::error::{DriveError, HandshakeError};
use crate::events::{EndpointContext, InfoCallback, InfoEvent, notify};
use crate::hooks::RoleHooks;
use crate::read;
use crate::record::RecordLayer;
use crate::session::{HeartbeatState, SessionState};
use crate::state::{FlowState, HandshakeState, ReadState, Role, SubState, WorkState, WriteState};
use crate::write;

/// Driver-private machine state, persisted across suspensions.
#[derive(Debug)]
pub(crate) struct FlowCore {
    pub(crate) state: FlowState,
    pub(crate) read_state: ReadState,
    pub(crate) read_state_work: WorkState,
    pub(crate) read_state_first_init: bool,
    pub(crate) write_state: WriteState,
    pub(crate) write_state_work: WorkState,
    pub(crate) use_timer: bool,
}

impl Default for FlowCore {
    fn default() -> Self {
        Self {
            state: FlowState::Uninited,
            read_state: ReadState::Header,
            read_state_work: WorkState::MoreA,
            read_state_first_init: false,
            write_state: WriteState::Transition,
            write_state_work: WorkState::MoreA,
            use_timer: false,
        }
    }
}

/// A handshake session: the flow machine, the hook-visible state, and the
/// collaborators that do the actual protocol work.
pub struct Session {
    pub(crate) flow: FlowCore,
    pub(crate) state: SessionState,
    pub(crate) record: Box<dyn RecordLayer>,
    pub(crate) hooks: RoleHooks,
    pub(crate) ctx: Arc<EndpointContext>,
    pub(crate) info_callback: Option<InfoCallback>,
}

impl Session {
    /// Creates a session over the given collaborators.
    #[must_use]
    pub fn new(
        config: Config,
        record: Box<dyn RecordLayer>,
        hooks: RoleHooks,
        ctx: Arc<EndpointContext>,
    ) -> Self {
        Self {
            flow: FlowCore::default(),
            state: SessionState::new(config),
            record,
            hooks,
            ctx,
            info_callback: None,
        }
    }

    /// Installs a session-level info callback, shadowing the context-level
    /// one for this session.
    pub fn set_info_callback(&mut self, callback: InfoCallback) {
        self.info_callback = Some(callback);
    }

    /// The hook-visible session state.
    #[must_use]
    pub const fn session_state(&self) -> &SessionState {
        &self.state
    }

    /// Mutable session state for record-layer bookkeeping performed between
    /// drive calls, such as heartbeat accounting.
    pub fn session_state_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }

    /// Current coarse phase of the flow machine.
    #[must_use]
    pub const fn flow_state(&self) -> FlowState {
        self.flow.state
    }

    /// Current handshake position.
    #[must_use]
    pub const fn hand_state(&self) -> HandshakeState {
        self.state.hand_state()
    }

    /// Resets the flow machine so the session is reusable.
    pub fn clear(&mut self) {
        self.flow.state = FlowState::Uninited;
    }

    /// Requests a renegotiation: the next drive call re-enters
    /// initialization. The handshake position is deliberately preserved:
    /// a renegotiating server transitions from its completed position to
    /// HelloRequest.
    pub fn mark_renegotiate(&mut self) {
        self.flow.state = FlowState::Renegotiate;
    }

    /// Puts the session into the permanent error state.
    pub fn mark_error(&mut self) {
        self.flow.state = FlowState::Error;
    }

    /// Whether a handshake is in progress or pending.
    #[must_use]
    pub const fn in_init(&self) -> bool {
        !matches!(self.flow.state, FlowState::Uninited)
    }

    /// Whether no handshake message has been exchanged yet.
    #[must_use]
    pub const fn in_before(&self) -> bool {
        matches!(self.state.hand_state(), HandshakeState::Before)
    }

    /// Whether the last handshake completed and nothing new has started.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        !self.in_init() && matches!(self.state.hand_state(), HandshakeState::Ok)
    }

    /// Whether the record layer may carry client application data right now.
    ///
    /// True only outside a handshake or while the ClientHello is being
    /// written, which lets the record layer permit early and post-handshake
    /// writes without consulting the full driver.
    #[must_use]
    pub const fn client_app_data_allowed(&self) -> bool {
        matches!(
            self.state.hand_state(),
            HandshakeState::Before | HandshakeState::Ok | HandshakeState::CwClientHello
        )
    }

    /// Runs the handshake until it completes, fails, or suspends on I/O.
    ///
    /// The role is latched when a handshake initializes; resumed calls keep
    /// the latched role regardless of the argument. On success the flow
    /// state returns to [`FlowState::Uninited`], so the session is
    /// immediately reusable for a later renegotiation.
    ///
    /// # Errors
    ///
    /// [`DriveError::WouldBlock`] when a collaborator needs more I/O (all
    /// state is preserved and the call should be repeated);
    /// [`DriveError::Fatal`] on any irrecoverable failure, after which every
    /// further call fails with [`HandshakeError::Latched`] without invoking
    /// any collaborator.
    pub fn drive(&mut self, role: Role) -> Result<(), DriveError> {
        if matches!(self.flow.state, FlowState::Error) {
            // Latched; refuse without side effects.
            return Err(DriveError::Fatal(HandshakeError::Latched));
        }

        // Low-entropy clock stir; diagnostic only.
        let clock = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let mut seed = [0_u8; 12];
        seed[..8].copy_from_slice(&clock.as_secs().to_le_bytes());
        seed[8..].copy_from_slice(&clock.subsec_nanos().to_le_bytes());
        self.ctx.stir(&seed);

        self.state.clear_fatal();
        self.state.enter_handshake();
        let completed = self.drive_inner(role);
        self.state.leave_handshake();

        let result = if completed {
            #[cfg(feature = "tracing")]
            tracing::debug!("handshake complete");
            Ok(())
        } else if let Some(error) = self.state.take_fatal() {
            Err(DriveError::Fatal(error))
        } else {
            #[cfg(feature = "tracing")]
            tracing::trace!("handshake suspended: would block");
            Err(DriveError::WouldBlock)
        };

        let value = if result.is_ok() { 1 } else { -1 };
        self.emit(InfoEvent::exit_for(self.state.role()), value);
        result
    }

    fn drive_inner(&mut self, role: Role) -> bool {
        if !self.in_init() || self.in_before() {
            self.state.reset_transient();
        }

        // Heartbeats are not meaningful during a handshake; stop the
        // retransmission timer, then drop the pending response and advance
        // the sequence.
        let datagram = self.state.config().transport().is_datagram();
        if self.state.heartbeat().is_some_and(HeartbeatState::response_pending) {
            if datagram {
                self.record.timer_stop(&mut self.state);
            }
            self.state.cancel_pending_heartbeat();
        }

        let entry = self.flow.state;
        if matches!(entry, FlowState::Uninited | FlowState::Renegotiate)
            && !self.initialize(role, entry)
        {
            return false;
        }

        while self.flow.state != FlowState::Finished {
            match self.flow.state {
                FlowState::Reading => match read::run(self) {
                    SubState::Finished => {
                        self.flow.state = FlowState::Writing;
                        self.init_write();
                    }
                    SubState::EndHandshake | SubState::Error => return false,
                },
                FlowState::Writing => match write::run(self) {
                    SubState::Finished => {
                        self.flow.state = FlowState::Reading;
                        self.init_read();
                    }
                    SubState::EndHandshake => {
                        self.flow.state = FlowState::Finished;
                    }
                    SubState::Error => return false,
                },
                _ => {
                    self.state.register_fatal(HandshakeError::Internal(
                        "message flow reached an invalid state",
                    ));
                    self.flow.state = FlowState::Error;
                    return false;
                }
            }
        }

        self.flow.state = FlowState::Uninited;
        true
    }

    /// Initialization branch: runs when a drive call enters from
    /// [`FlowState::Uninited`] or [`FlowState::Renegotiate`].
    fn initialize(&mut self, role: Role, entry: FlowState) -> bool {
        let renegotiate = matches!(entry, FlowState::Renegotiate);
        self.state.latch_role(role);
        if renegotiate {
            self.state.set_renegotiating(true);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(role = ?role, renegotiate, "initializing handshake");

        if let Err(error) = self.state.config().validate_for(role) {
            let description = match &error {
                HandshakeError::VersionRejected(_) => AlertDescription::ProtocolVersion,
                _ => AlertDescription::InternalError,
            };
            return self.fail_init(error, description);
        }

        if let Err(error) = self.state.ensure_message_buf() {
            return self.fail_init(error, AlertDescription::InternalError);
        }
        if let Err(error) = self.record.init_buffers(&mut self.state) {
            return self.fail_init(error.into(), AlertDescription::InternalError);
        }

        self.state.reset_message_scratch();
        // Cleared by Finished processing as well; reset defensively here.
        self.state.set_change_cipher_spec_seen(false);

        let transport = self.state.config().transport();
        if !(role == Role::Server && renegotiate) {
            // A buffering layer goes onto the write side, except on SCTP
            // which buffers for itself.
            if !(transport.is_datagram() && self.record.is_sctp())
                && let Err(error) = self.record.push_write_buffer(&mut self.state)
            {
                return self.fail_init(error.into(), AlertDescription::InternalError);
            }
            self.record.reset_transcript(&mut self.state);
        }

        if role == Role::Server
            && renegotiate
            && !self.state.peer_secure_renegotiation()
            && !self.state.config().allow_unsafe_legacy_renegotiation()
        {
            // Server attempting to renegotiate with a client that cannot do
            // so securely.
            return self.fail_init(
                HandshakeError::UnsafeRenegotiationDisabled,
                AlertDescription::HandshakeFailure,
            );
        }
        self.ctx.stats().record_handshake(role, renegotiate);

        if role == Role::Client {
            // Mark the client random uninitialized for the new hello.
            self.state.wipe_client_random();
            self.state.set_session_hit(false);
            self.state.set_certificate_request(false);
            if transport.is_datagram() {
                self.flow.use_timer = true;
            }
        }

        self.emit(InfoEvent::HandshakeStart, 1);

        if matches!(entry, FlowState::Uninited) {
            self.state.set_hand_state(HandshakeState::Before);
        }

        self.flow.state = FlowState::Writing;
        self.init_write();
        self.flow.read_state_first_init = true;
        true
    }

    /// Shared failure path for the initialization branch: alert, register,
    /// latch.
    fn fail_init(&mut self, error: HandshakeError, description: AlertDescription) -> bool {
        self.record
            .send_alert(&mut self.state, AlertLevel::Fatal, description);
        self.state.register_fatal(error);
        self.flow.state = FlowState::Error;
        false
    }

    fn init_read(&mut self) {
        self.flow.read_state = ReadState::Header;
    }

    fn init_write(&mut self) {
        self.flow.write_state = WriteState::Transition;
    }

    fn emit(&self, event: InfoEvent, value: i32) {
        let callback = self
            .info_callback
            .as_ref()
            .or_else(|| self.ctx.info_callback());
        notify(callback, &self.state, event, value);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("flow", &self.flow)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
