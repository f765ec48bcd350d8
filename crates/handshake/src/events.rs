//! crates/handshake/src/events.rs
//!
//! Observability surface of the driver: the info-callback notifications, the
//! per-process handshake statistics, and the entropy-stir hook. The shared
//! [`EndpointContext`] bundles all three so many sessions can point at one
//! context behind an [`Arc`](std::sync::Arc).

use std::sync::atomic::{AtomicU64, Ordering};

use crate::session::SessionState;
use crate::state::Role;

/// Notification kinds delivered through the info callback.
///
/// For a given handshake the driver emits `HandshakeStart` once on entry,
/// one loop event per inbound message header and per write-transition
/// iteration, and exactly one exit event per drive call as it returns.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum InfoEvent {
    /// A fresh or renegotiated handshake began.
    HandshakeStart,
    /// Server-side progress tick.
    AcceptLoop,
    /// Client-side progress tick.
    ConnectLoop,
    /// Server-side drive call returning; the value is `1` on success and
    /// `-1` otherwise.
    AcceptExit,
    /// Client-side drive call returning; same value convention.
    ConnectExit,
}

impl InfoEvent {
    /// The loop event for `role`.
    #[must_use]
    pub const fn loop_for(role: Role) -> Self {
        match role {
            Role::Client => Self::ConnectLoop,
            Role::Server => Self::AcceptLoop,
        }
    }

    /// The exit event for `role`.
    #[must_use]
    pub const fn exit_for(role: Role) -> Self {
        match role {
            Role::Client => Self::ConnectExit,
            Role::Server => Self::AcceptExit,
        }
    }
}

/// Callback invoked for every [`InfoEvent`].
///
/// A session-level callback shadows the context-level one; the driver
/// resolves the pair once per drive call and uses the winner for every
/// notification in that call.
pub type InfoCallback = Box<dyn Fn(&SessionState, InfoEvent, i32) + Send + Sync>;

pub(crate) fn notify(
    callback: Option<&InfoCallback>,
    state: &SessionState,
    event: InfoEvent,
    value: i32,
) {
    if let Some(callback) = callback {
        callback(state, event, value);
    }
}

/// Handshake entry counters, incremented exactly once per initialization.
///
/// Counters are relaxed atomics: sessions on different threads may share one
/// context, and the counts carry no ordering obligations.
#[derive(Debug, Default)]
pub struct HandshakeStats {
    sess_accept: AtomicU64,
    sess_accept_renegotiate: AtomicU64,
    sess_connect: AtomicU64,
    sess_connect_renegotiate: AtomicU64,
}

impl HandshakeStats {
    /// Fresh server handshakes started.
    #[must_use]
    pub fn sess_accept(&self) -> u64 {
        self.sess_accept.load(Ordering::Relaxed)
    }

    /// Server renegotiations started.
    #[must_use]
    pub fn sess_accept_renegotiate(&self) -> u64 {
        self.sess_accept_renegotiate.load(Ordering::Relaxed)
    }

    /// Fresh client handshakes started.
    #[must_use]
    pub fn sess_connect(&self) -> u64 {
        self.sess_connect.load(Ordering::Relaxed)
    }

    /// Client renegotiations started.
    #[must_use]
    pub fn sess_connect_renegotiate(&self) -> u64 {
        self.sess_connect_renegotiate.load(Ordering::Relaxed)
    }

    pub(crate) fn record_handshake(&self, role: Role, renegotiate: bool) {
        let counter = match (role, renegotiate) {
            (Role::Server, false) => &self.sess_accept,
            (Role::Server, true) => &self.sess_accept_renegotiate,
            (Role::Client, false) => &self.sess_connect,
            (Role::Client, true) => &self.sess_connect_renegotiate,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Sink for the low-entropy clock stir performed at every drive entry.
///
/// The stir carries no security claim; it is a diagnostic mix into whatever
/// pool the process maintains. Implementations synchronize internally, since
/// every session sharing the context stirs through the same instance.
pub trait EntropyStir: Send + Sync {
    /// Mixes `bytes` into the pool.
    fn stir(&self, bytes: &[u8]);
}

/// Shared per-process context: statistics, the fallback info callback, and
/// the entropy pool.
#[derive(Default)]
pub struct EndpointContext {
    stats: HandshakeStats,
    info_callback: Option<InfoCallback>,
    entropy: Option<Box<dyn EntropyStir>>,
}

impl EndpointContext {
    /// Starts building a context.
    #[must_use]
    pub fn builder() -> EndpointContextBuilder {
        EndpointContextBuilder::default()
    }

    /// The handshake entry counters.
    #[must_use]
    pub fn stats(&self) -> &HandshakeStats {
        &self.stats
    }

    pub(crate) fn info_callback(&self) -> Option<&InfoCallback> {
        self.info_callback.as_ref()
    }

    pub(crate) fn stir(&self, bytes: &[u8]) {
        if let Some(entropy) = &self.entropy {
            entropy.stir(bytes);
        }
    }
}

impl std::fmt::Debug for EndpointContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointContext")
            .field("stats", &self.stats)
            .field("info_callback", &self.info_callback.is_some())
            .field("entropy", &self.entropy.is_some())
            .finish()
    }
}

/// Builder for [`EndpointContext`].
#[derive(Default)]
pub struct EndpointContextBuilder {
    info_callback: Option<InfoCallback>,
    entropy: Option<Box<dyn EntropyStir>>,
}

impl EndpointContextBuilder {
    /// Installs the context-level info callback.
    #[must_use]
    pub fn info_callback(mut self, callback: InfoCallback) -> Self {
        self.info_callback = Some(callback);
        self
    }

    /// Installs the entropy pool.
    #[must_use]
    pub fn entropy(mut self, entropy: Box<dyn EntropyStir>) -> Self {
        self.entropy = Some(entropy);
        self
    }

    /// Finalizes the context.
    #[must_use]
    pub fn build(self) -> EndpointContext {
        EndpointContext {
            stats: HandshakeStats::default(),
            info_callback: self.info_callback,
            entropy: self.entropy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn each_entry_mode_has_its_own_counter() {
        let stats = HandshakeStats::default();
        stats.record_handshake(Role::Server, false);
        stats.record_handshake(Role::Server, true);
        stats.record_handshake(Role::Client, false);
        stats.record_handshake(Role::Client, false);
        stats.record_handshake(Role::Client, true);

        assert_eq!(stats.sess_accept(), 1);
        assert_eq!(stats.sess_accept_renegotiate(), 1);
        assert_eq!(stats.sess_connect(), 2);
        assert_eq!(stats.sess_connect_renegotiate(), 1);
    }

    #[test]
    fn loop_and_exit_events_follow_the_role() {
        assert_eq!(InfoEvent::loop_for(Role::Client), InfoEvent::ConnectLoop);
        assert_eq!(InfoEvent::loop_for(Role::Server), InfoEvent::AcceptLoop);
        assert_eq!(InfoEvent::exit_for(Role::Client), InfoEvent::ConnectExit);
        assert_eq!(InfoEvent::exit_for(Role::Server), InfoEvent::AcceptExit);
    }

    #[test]
    fn context_stirs_through_the_installed_pool() {
        struct Pool(std::sync::Arc<Mutex<Vec<u8>>>);
        impl EntropyStir for Pool {
            fn stir(&self, bytes: &[u8]) {
                self.0.lock().unwrap().extend_from_slice(bytes);
            }
        }

        let seen = std::sync::Arc::new(Mutex::new(Vec::new()));
        let ctx = EndpointContext::builder()
            .entropy(Box::new(Pool(seen.clone())))
            .build();
        ctx.stir(&[1, 2, 3]);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn context_without_entropy_ignores_the_stir() {
        let ctx = EndpointContext::builder().build();
        ctx.stir(&[0xFF; 8]);
        assert_eq!(ctx.stats().sess_connect(), 0);
    }
}
