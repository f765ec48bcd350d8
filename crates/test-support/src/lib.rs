#![deny(unsafe_code)]

//! Shared scripted collaborators for exercising the handshake flow driver.
//!
//! The driver never parses wire bytes, so its tests script both collaborator
//! seams instead: [`ScriptedRecord`] plays the record layer from a queue of
//! message headers and can inject one-shot would-block suspensions at any
//! transport operation, while [`ScriptedHooks`] plays a role's hook bundle
//! from a per-message plan. Every externally observable call lands in a
//! shared [`Recorder`], which is what the resumability and callback-order
//! assertions compare.

mod fixture;
mod recorder;
mod script;

pub use fixture::{
    Fixture, client_fresh, client_headers, client_plan, server_fresh, server_headers,
    server_plan, server_renegotiate_plan,
};
pub use recorder::{Observed, Recorder};
pub use script::{PlanTransition, ReadOp, ScriptedHooks, ScriptedRecord, WriteOp};
