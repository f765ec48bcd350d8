//! crates/handshake/src/session.rs
//!
//! The hook-visible slice of a session. Collaborators receive a mutable
//! reference to [`SessionState`] on every hook invocation: transition hooks
//! advance the handshake position through it, the record layer reads the
//! per-message scratch, and extension code maintains its bookkeeping here.
//! The flow machine's own micro-states live elsewhere and are never exposed
//! to collaborators.

use zeroize::Zeroize;

use crate::config::Config;
use crate::error::HandshakeError;
use crate::message::{MAX_PLAIN_LENGTH, MessageHeader, MessageType};
use crate::state::{HandshakeState, Role};

/// Heartbeat extension bookkeeping.
///
/// Present on a session only when the extension is configured. A pending
/// response is cancelled when a handshake starts, since heartbeats are not
/// meaningful mid-handshake.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct HeartbeatState {
    response_pending: bool,
    sequence: u64,
}

impl HeartbeatState {
    /// Whether a heartbeat response is outstanding.
    #[must_use]
    pub const fn response_pending(&self) -> bool {
        self.response_pending
    }

    /// Marks a heartbeat request as awaiting its response.
    pub const fn set_response_pending(&mut self, pending: bool) {
        self.response_pending = pending;
    }

    /// Current heartbeat sequence number.
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// Session state shared with collaborators.
#[derive(Debug)]
pub struct SessionState {
    config: Config,
    role: Role,
    hand_state: HandshakeState,
    message_type: Option<MessageType>,
    message_size: usize,
    message_bytes: usize,
    first_packet: bool,
    message_buf: Option<Vec<u8>>,
    peer_secure_renegotiation: bool,
    change_cipher_spec_seen: bool,
    session_hit: bool,
    certificate_request: bool,
    client_random: [u8; 32],
    renegotiating: bool,
    heartbeat: Option<HeartbeatState>,
    in_handshake: u32,
    pub(crate) fatal: Option<HandshakeError>,
}

impl SessionState {
    pub(crate) fn new(config: Config) -> Self {
        Self {
            config,
            role: Role::Client,
            hand_state: HandshakeState::Before,
            message_type: None,
            message_size: 0,
            message_bytes: 0,
            first_packet: false,
            message_buf: None,
            peer_secure_renegotiation: false,
            change_cipher_spec_seen: false,
            session_hit: false,
            certificate_request: false,
            client_random: [0; 32],
            renegotiating: false,
            heartbeat: config.heartbeat_enabled().then(HeartbeatState::default),
            in_handshake: 0,
            fatal: None,
        }
    }

    /// The session configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Endpoint role; meaningful once the first drive call has latched it.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Current handshake position.
    #[must_use]
    pub const fn hand_state(&self) -> HandshakeState {
        self.hand_state
    }

    /// Advances the handshake position. Only transition hooks should call
    /// this; the driver invokes them exactly once per message in each
    /// direction.
    pub fn set_hand_state(&mut self, state: HandshakeState) {
        self.hand_state = state;
    }

    /// Type of the message currently being read, if a header has arrived.
    #[must_use]
    pub const fn message_type(&self) -> Option<MessageType> {
        self.message_type
    }

    /// Declared size of the message currently being read.
    #[must_use]
    pub const fn message_size(&self) -> usize {
        self.message_size
    }

    /// Bytes of the current message consumed so far. Reset by the driver at
    /// each header acquisition; maintained by the record layer.
    #[must_use]
    pub const fn message_bytes(&self) -> usize {
        self.message_bytes
    }

    /// Records record-layer progress on the current message.
    pub fn set_message_bytes(&mut self, bytes: usize) {
        self.message_bytes = bytes;
    }

    /// Whether the next body read belongs to the first packet of the
    /// handshake.
    #[must_use]
    pub const fn first_packet(&self) -> bool {
        self.first_packet
    }

    /// The handshake message buffer, if allocated.
    #[must_use]
    pub fn message_buf(&self) -> Option<&Vec<u8>> {
        self.message_buf.as_ref()
    }

    /// Mutable access to the handshake message buffer for construction
    /// hooks.
    pub fn message_buf_mut(&mut self) -> Option<&mut Vec<u8>> {
        self.message_buf.as_mut()
    }

    /// Whether the peer advertised secure renegotiation. Set by the hook
    /// that processes the peer hello.
    #[must_use]
    pub const fn peer_secure_renegotiation(&self) -> bool {
        self.peer_secure_renegotiation
    }

    /// Records the peer's secure-renegotiation capability.
    pub fn set_peer_secure_renegotiation(&mut self, supported: bool) {
        self.peer_secure_renegotiation = supported;
    }

    /// Whether a change-cipher-spec signal has been observed this handshake.
    #[must_use]
    pub const fn change_cipher_spec_seen(&self) -> bool {
        self.change_cipher_spec_seen
    }

    /// Records observation of the change-cipher-spec signal.
    pub fn set_change_cipher_spec_seen(&mut self, seen: bool) {
        self.change_cipher_spec_seen = seen;
    }

    /// Whether the session was resumed from the cache.
    #[must_use]
    pub const fn session_hit(&self) -> bool {
        self.session_hit
    }

    /// Records a session-cache hit.
    pub fn set_session_hit(&mut self, hit: bool) {
        self.session_hit = hit;
    }

    /// Whether the server requested a client certificate.
    #[must_use]
    pub const fn certificate_request(&self) -> bool {
        self.certificate_request
    }

    /// Records a certificate request from the server.
    pub fn set_certificate_request(&mut self, requested: bool) {
        self.certificate_request = requested;
    }

    /// The client random. All zero until the client hello is constructed.
    #[must_use]
    pub const fn client_random(&self) -> &[u8; 32] {
        &self.client_random
    }

    /// Mutable access to the client random for the hello construction hook.
    pub fn client_random_mut(&mut self) -> &mut [u8; 32] {
        &mut self.client_random
    }

    /// Whether the current handshake entered through a renegotiation.
    #[must_use]
    pub const fn is_renegotiating(&self) -> bool {
        self.renegotiating
    }

    /// Heartbeat bookkeeping, present when the extension is enabled.
    #[must_use]
    pub const fn heartbeat(&self) -> Option<&HeartbeatState> {
        self.heartbeat.as_ref()
    }

    /// Mutable heartbeat bookkeeping for the extension's record handling.
    pub fn heartbeat_mut(&mut self) -> Option<&mut HeartbeatState> {
        self.heartbeat.as_mut()
    }

    /// Re-entrancy depth: non-zero for the duration of every drive call.
    /// Other parts of the library refuse reentrant operations while this is
    /// set.
    #[must_use]
    pub const fn in_handshake(&self) -> u32 {
        self.in_handshake
    }

    pub(crate) fn latch_role(&mut self, role: Role) {
        self.role = role;
    }

    pub(crate) fn set_renegotiating(&mut self, renegotiating: bool) {
        self.renegotiating = renegotiating;
    }

    pub(crate) fn set_first_packet(&mut self, first: bool) {
        self.first_packet = first;
    }

    pub(crate) fn enter_handshake(&mut self) {
        self.in_handshake += 1;
    }

    pub(crate) fn leave_handshake(&mut self) {
        self.in_handshake -= 1;
    }

    pub(crate) fn store_header(&mut self, header: MessageHeader) {
        self.message_type = Some(header.message_type);
        self.message_size = header.message_size;
    }

    pub(crate) fn reset_message_scratch(&mut self) {
        self.message_type = None;
        self.message_size = 0;
        self.message_bytes = 0;
    }

    /// Cancels an outstanding heartbeat response and advances the sequence.
    /// Returns `true` when a response was pending.
    pub(crate) fn cancel_pending_heartbeat(&mut self) -> bool {
        match &mut self.heartbeat {
            Some(heartbeat) if heartbeat.response_pending => {
                heartbeat.response_pending = false;
                heartbeat.sequence += 1;
                true
            }
            _ => false,
        }
    }

    /// Lazily allocates the message buffer sized for the largest plaintext
    /// record.
    pub(crate) fn ensure_message_buf(&mut self) -> Result<(), HandshakeError> {
        if self.message_buf.is_none() {
            let mut buf = Vec::new();
            buf.try_reserve_exact(MAX_PLAIN_LENGTH)?;
            self.message_buf = Some(buf);
        }
        Ok(())
    }

    pub(crate) fn wipe_client_random(&mut self) {
        self.client_random.zeroize();
    }

    /// One-time reset of transient handshake state, run when a drive call
    /// finds the session neither mid-handshake nor suspended. It clears the
    /// per-message scratch, the change-cipher-spec observation flag, and the
    /// renegotiation flag, and returns the handshake position to the start.
    /// The message buffer, the peer's secure-renegotiation capability, and
    /// the heartbeat sequence survive; the client-only fields (session hit,
    /// certificate request, client random) are cleared by client
    /// initialization instead.
    pub(crate) fn reset_transient(&mut self) {
        self.hand_state = HandshakeState::Before;
        self.message_type = None;
        self.message_size = 0;
        self.message_bytes = 0;
        self.first_packet = false;
        self.change_cipher_spec_seen = false;
        self.renegotiating = false;
    }

    pub(crate) fn register_fatal(&mut self, error: HandshakeError) {
        #[cfg(feature = "tracing")]
        tracing::warn!(error = %error, "handshake fatal error");
        if self.fatal.is_none() {
            self.fatal = Some(error);
        }
    }

    pub(crate) fn clear_fatal(&mut self) {
        self.fatal = None;
    }

    pub(crate) fn take_fatal(&mut self) -> Option<HandshakeError> {
        self.fatal.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatagramKind, Transport};

    fn state() -> SessionState {
        SessionState::new(Config::builder().build())
    }

    #[test]
    fn new_sessions_start_before_any_handshake() {
        let state = state();
        assert_eq!(state.hand_state(), HandshakeState::Before);
        assert_eq!(state.message_type(), None);
        assert_eq!(state.in_handshake(), 0);
        assert!(state.message_buf().is_none());
        assert!(state.heartbeat().is_none());
    }

    #[test]
    fn heartbeat_state_follows_the_config() {
        let config = Config::builder()
            .transport(Transport::Datagram(DatagramKind::Udp))
            .heartbeat(true)
            .build();
        let state = SessionState::new(config);
        assert!(state.heartbeat().is_some());
    }

    #[test]
    fn cancel_pending_heartbeat_advances_the_sequence() {
        let mut state = SessionState::new(Config::builder().heartbeat(true).build());
        assert!(!state.cancel_pending_heartbeat());

        state.heartbeat_mut().unwrap().set_response_pending(true);
        assert!(state.cancel_pending_heartbeat());

        let heartbeat = state.heartbeat().unwrap();
        assert!(!heartbeat.response_pending());
        assert_eq!(heartbeat.sequence(), 1);
    }

    #[test]
    fn store_header_populates_the_scratch() {
        let mut state = state();
        state.store_header(MessageHeader::new(MessageType::ServerHello, 99));
        assert_eq!(state.message_type(), Some(MessageType::ServerHello));
        assert_eq!(state.message_size(), 99);

        state.reset_message_scratch();
        assert_eq!(state.message_type(), None);
        assert_eq!(state.message_size(), 0);
    }

    #[test]
    fn ensure_message_buf_allocates_once() {
        let mut state = state();
        state.ensure_message_buf().unwrap();
        let capacity = state.message_buf().unwrap().capacity();
        assert!(capacity >= MAX_PLAIN_LENGTH);

        state.message_buf_mut().unwrap().push(0xAB);
        state.ensure_message_buf().unwrap();
        assert_eq!(state.message_buf().unwrap().len(), 1);
    }

    #[test]
    fn wipe_client_random_zeroes_the_bytes() {
        let mut state = state();
        state.client_random_mut().copy_from_slice(&[0xA5; 32]);
        state.wipe_client_random();
        assert_eq!(state.client_random(), &[0; 32]);
    }

    #[test]
    fn reset_transient_preserves_connection_facts() {
        let mut state = state();
        state.ensure_message_buf().unwrap();
        state.set_peer_secure_renegotiation(true);
        state.set_hand_state(HandshakeState::Ok);
        state.set_session_hit(true);
        state.set_change_cipher_spec_seen(true);

        state.reset_transient();

        assert_eq!(state.hand_state(), HandshakeState::Before);
        assert!(!state.change_cipher_spec_seen());
        assert!(state.peer_secure_renegotiation());
        assert!(state.message_buf().is_some());
        // Cleared by client initialization, not by the one-time reset.
        assert!(state.session_hit());
    }

    #[test]
    fn first_fatal_error_wins() {
        let mut state = state();
        state.register_fatal(HandshakeError::ProcessFailed);
        state.register_fatal(HandshakeError::TransitionFailed);
        assert!(matches!(
            state.take_fatal(),
            Some(HandshakeError::ProcessFailed)
        ));
        assert!(state.take_fatal().is_none());
    }
}
