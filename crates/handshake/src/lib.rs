#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `handshake` implements the message-flow driver of a TLS/DTLS endpoint:
//! the state machinery that sequences reading, processing, constructing, and
//! sending handshake messages for both roles, over stream and datagram
//! transports, while tolerating non-blocking I/O. The crate is deliberately
//! free of wire parsing and cryptography; those live behind the
//! [`RecordLayer`] and [`HandshakeHooks`] collaborator contracts, so the
//! driver can be exercised and verified in isolation.
//!
//! # Design
//!
//! Two coupled machines do the work. The outer flow machine owned by
//! [`Session`] alternates the endpoint between a writing and a reading
//! phase; each phase runs an inner sub-machine over its own micro-states
//! (header/body/post-process when reading, transition/pre-work/send/
//! post-work when writing). Collaborator hooks are resolved from a
//! role-keyed table ([`RoleHooks`]) once per sub-machine entry.
//!
//! Suspension is cooperative and transparent: transport hooks return
//! [`std::io::ErrorKind::WouldBlock`] and work hooks return a
//! [`WorkState`] `More*` marker; either way [`Session::drive`] returns
//! [`DriveError::WouldBlock`] with every state variable preserved, and the
//! next call resumes at the saved micro-state. There are no internal tasks
//! or threads: the explicit micro-state is the contract.
//!
//! # Invariants
//!
//! - A latched [`FlowState::Error`] is permanent: every later drive attempt
//!   fails immediately without invoking any collaborator.
//! - Exactly one sub-machine is active while a handshake is in flight.
//! - The handshake position advances only inside transition hooks, which
//!   run at most once per inbound message and once per write iteration.
//! - Statistics counters increment exactly once per handshake entry, keyed
//!   by role and entry mode.
//! - Info-callback notifications follow a fixed order: handshake start,
//!   one loop event per message in either direction, one exit event per
//!   drive call.
//!
//! # Errors
//!
//! Fatal conditions are classified by [`HandshakeError`] and surface as
//! [`DriveError::Fatal`]; the driver emits the matching TLS alert through
//! the record layer before latching. Suspension is not an error in this
//! taxonomy; it is the [`DriveError::WouldBlock`] outcome, and the caller
//! retries when the transport is ready.
//!
//! # Examples
//!
//! Driving a client handshake to completion over a non-blocking transport:
//!
//! ```ignore
//! use handshake::{Config, DriveError, EndpointContext, Role, RoleHooks, Session};
//!
//! let config = Config::builder().build();
//! let ctx = std::sync::Arc::new(EndpointContext::builder().build());
//! let mut session = Session::new(config, record_layer, RoleHooks::new(client, server), ctx);
//!
//! loop {
//!     match session.drive(Role::Client) {
//!         Ok(()) => break,
//!         Err(DriveError::WouldBlock) => wait_for_socket()?,
//!         Err(DriveError::Fatal(err)) => return Err(err.into()),
//!     }
//! }
//! assert!(session.is_finished());
//! ```
//!
//! # See also
//!
//! - [`record::RecordLayer`] for the transport-side contract, including the
//!   datagram retransmission timer discipline.
//! - [`hooks::HandshakeHooks`] for the role-dispatched protocol hooks and
//!   their guaranteed call order.
//! - [`events::EndpointContext`] for statistics, info callbacks, and the
//!   entropy stir shared across sessions.

/// TLS alert vocabulary emitted by the driver.
pub mod alert;
/// Session configuration and its initialization-time validation.
pub mod config;
/// Error taxonomy for driver and hooks.
pub mod error;
/// Info callbacks, statistics, and the shared endpoint context.
pub mod events;
/// Role-dispatched protocol hook contracts.
pub mod hooks;
/// Handshake message vocabulary shared with collaborators.
pub mod message;
/// Record-layer collaborator contract.
pub mod record;
/// The hook-visible session state.
pub mod session;
/// Tagged states of the two-level machine.
pub mod state;

mod flow;
mod read;
mod write;

pub use crate::alert::{AlertDescription, AlertLevel};
pub use crate::config::{
    Config, ConfigBuilder, DatagramKind, ProtocolVersion, SecurityPolicy, Transport,
};
pub use crate::error::{DriveError, HandshakeError, Result};
pub use crate::events::{
    EndpointContext, EndpointContextBuilder, EntropyStir, HandshakeStats, InfoCallback, InfoEvent,
};
pub use crate::flow::Session;
pub use crate::hooks::{HandshakeHooks, RoleHooks};
pub use crate::message::{MAX_PLAIN_LENGTH, MessageHeader, MessageType, RecordKind};
pub use crate::record::RecordLayer;
pub use crate::session::{HeartbeatState, SessionState};
pub use crate::state::{
    FlowState, HandshakeState, MessageProcess, ReadState, Role, WorkState, WriteState,
    WriteTransition,
};
