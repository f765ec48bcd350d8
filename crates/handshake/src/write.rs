//! crates/handshake/src/write.rs
//!
//! The writing sub-state machine. Valid micro-states and transitions:
//!
//! ```text
//! +-> Transition ------> [SubState::Finished]
//! |       |
//! |       v
//! |    PreWork --------> [SubState::EndHandshake]
//! |       |
//! |       v
//! |     Send
//! |       |
//! |       v
//! |    PostWork -------> [SubState::EndHandshake]
//! |       |
//! +-------+
//! ```
//!
//! `Transition` picks the next outgoing message. `PreWork` and `PostWork`
//! bracket the send with preparation and finalization that may block, in
//! which case the next activation resumes at the same micro-state with the
//! stored work marker. The change-cipher-spec signal is routed through its
//! dedicated record path.

use std::io;

use crate::error::HandshakeError;
use crate::events::{InfoEvent, notify};
use crate::flow::Session;
use crate::message::RecordKind;
use crate::state::{FlowState, SubState, WorkState, WriteState, WriteTransition};

pub(crate) fn run(session: &mut Session) -> SubState {
    let Session {
        flow,
        state,
        record,
        hooks,
        ctx,
        info_callback,
    } = session;
    let callback = info_callback.as_ref().or_else(|| ctx.info_callback());
    let hooks = hooks.for_role(state.role());
    let datagram = state.config().transport().is_datagram();

    loop {
        match flow.write_state {
            WriteState::Transition => {
                notify(callback, state, InfoEvent::loop_for(state.role()), 1);
                match hooks.transition_write(state) {
                    WriteTransition::Continue => {
                        flow.write_state = WriteState::PreWork;
                        flow.write_state_work = WorkState::MoreA;
                    }
                    WriteTransition::Finished => return SubState::Finished,
                    WriteTransition::Error => {
                        state.register_fatal(HandshakeError::TransitionFailed);
                        flow.state = FlowState::Error;
                        return SubState::Error;
                    }
                }
            }

            WriteState::PreWork => {
                let work = match hooks.pre_work(state, flow.write_state_work) {
                    Ok(work) => work,
                    Err(err) => {
                        state.register_fatal(err);
                        flow.state = FlowState::Error;
                        return SubState::Error;
                    }
                };
                flow.write_state_work = work;
                match work {
                    // Blocked mid-preparation; resume here with this marker.
                    WorkState::MoreA | WorkState::MoreB | WorkState::MoreC => {
                        return SubState::Error;
                    }
                    WorkState::FinishedStop => return SubState::EndHandshake,
                    WorkState::FinishedContinue => {
                        flow.write_state = WriteState::Send;
                        if let Err(err) = hooks.construct_message(state) {
                            state.register_fatal(err);
                            flow.state = FlowState::Error;
                            return SubState::Error;
                        }
                    }
                }
            }

            WriteState::Send => {
                if datagram && flow.use_timer {
                    record.timer_start(state);
                }
                let kind = if state.hand_state().is_change_cipher_spec_write() {
                    RecordKind::ChangeCipherSpec
                } else {
                    RecordKind::Handshake
                };
                match record.write_record(state, kind) {
                    Ok(()) => {}
                    Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                        return SubState::Error;
                    }
                    Err(err) => {
                        state.register_fatal(err.into());
                        flow.state = FlowState::Error;
                        return SubState::Error;
                    }
                }
                flow.write_state = WriteState::PostWork;
                flow.write_state_work = WorkState::MoreA;
            }

            WriteState::PostWork => {
                let work = match hooks.post_work(state, flow.write_state_work) {
                    Ok(work) => work,
                    Err(err) => {
                        state.register_fatal(err);
                        flow.state = FlowState::Error;
                        return SubState::Error;
                    }
                };
                flow.write_state_work = work;
                match work {
                    // Blocked mid-finalization; resume here with this marker.
                    WorkState::MoreA | WorkState::MoreB | WorkState::MoreC => {
                        return SubState::Error;
                    }
                    WorkState::FinishedContinue => {
                        flow.write_state = WriteState::Transition;
                    }
                    WorkState::FinishedStop => return SubState::EndHandshake,
                }
            }
        }
    }
}
