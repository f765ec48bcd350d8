//! crates/handshake/src/hooks.rs
//!
//! The role-dispatched hook contract. Each role supplies one implementation
//! of [`HandshakeHooks`]; the pair is held in a [`RoleHooks`] table and the
//! sub-machines resolve the active bundle exactly once per entry, so no
//! per-iteration role branch survives into the inner loops.

use crate::error::Result;
use crate::message::MessageType;
use crate::session::SessionState;
use crate::state::{MessageProcess, Role, WorkState, WriteTransition};

/// Message parsing, construction, and handshake-state transitions for one
/// role.
///
/// The driver guarantees a strict call order. Reading:
/// `transition_read` (after the header arrives, at most once per message) →
/// `process_message` → optionally repeated `post_process_message`. Writing:
/// `transition_write` (once per iteration) → repeated `pre_work` →
/// `construct_message` → repeated `post_work`. The work hooks suspend by
/// returning a [`WorkState`] `More*` marker, which the driver hands back
/// verbatim on resumption.
pub trait HandshakeHooks {
    /// Validates the inbound message type against the current handshake
    /// state and advances the state on acceptance. Rejection makes the
    /// driver emit a fatal `unexpected_message` alert.
    fn transition_read(&mut self, state: &mut SessionState, message_type: MessageType) -> bool;

    /// Parses and acts on a complete message body of `len` bytes.
    fn process_message(&mut self, state: &mut SessionState, len: usize) -> MessageProcess;

    /// Deferred per-message work that may suspend.
    ///
    /// # Errors
    ///
    /// Any error is fatal for the connection.
    fn post_process_message(
        &mut self,
        state: &mut SessionState,
        work: WorkState,
    ) -> Result<WorkState>;

    /// Upper bound on the declared size of the next inbound message.
    fn max_message_size(&self, state: &SessionState) -> usize;

    /// Decides the next outgoing message and advances the handshake state.
    fn transition_write(&mut self, state: &mut SessionState) -> WriteTransition;

    /// Preparation before constructing the decided message; may suspend.
    ///
    /// # Errors
    ///
    /// Any error is fatal for the connection.
    fn pre_work(&mut self, state: &mut SessionState, work: WorkState) -> Result<WorkState>;

    /// Serializes the outgoing message into the session message buffer.
    ///
    /// # Errors
    ///
    /// Any error is fatal for the connection.
    fn construct_message(&mut self, state: &mut SessionState) -> Result<()>;

    /// Finalization after the message went to the record layer; may suspend.
    ///
    /// # Errors
    ///
    /// Any error is fatal for the connection.
    fn post_work(&mut self, state: &mut SessionState, work: WorkState) -> Result<WorkState>;
}

/// Role-keyed hook table.
pub struct RoleHooks {
    client: Box<dyn HandshakeHooks>,
    server: Box<dyn HandshakeHooks>,
}

impl RoleHooks {
    /// Builds the table from one bundle per role.
    #[must_use]
    pub fn new(client: Box<dyn HandshakeHooks>, server: Box<dyn HandshakeHooks>) -> Self {
        Self { client, server }
    }

    /// Resolves the bundle for `role`.
    pub(crate) fn for_role(&mut self, role: Role) -> &mut dyn HandshakeHooks {
        match role {
            Role::Client => self.client.as_mut(),
            Role::Server => self.server.as_mut(),
        }
    }
}

impl std::fmt::Debug for RoleHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleHooks").finish_non_exhaustive()
    }
}
