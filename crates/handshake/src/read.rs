//! crates/handshake/src/read.rs
//!
//! The reading sub-state machine. Valid micro-states and transitions:
//!
//! ```text
//! Header <--+<----------------+
//!    |      |                 |
//!    v      |                 |
//!  Body ----+--> PostProcess--+
//!    |                |
//!    +----------------+
//!    v
//! [SubState::Finished]
//! ```
//!
//! `Header` acquires the message header and drives the handshake-state
//! transition. `Body` acquires the rest of the message and processes it.
//! `PostProcess` is an optional step for per-message work that may block.
//! Any micro-state can suspend on I/O; the next activation resumes exactly
//! where this one left off.

use std::io;

use crate::alert::{AlertDescription, AlertLevel};
use crate::error::HandshakeError;
use crate::events::{InfoEvent, notify};
use crate::flow::Session;
use crate::state::{FlowState, MessageProcess, ReadState, SubState, WorkState};

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

    if flow.read_state_first_init {
        state.set_first_packet(true);
        flow.read_state_first_init = false;
    }

    loop {
        match flow.read_state {
            ReadState::Header => {
                state.reset_message_scratch();
                let header = match record.read_message_header(state) {
                    Ok(header) => header,
                    Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                        return SubState::Error;
                    }
                    Err(err) => {
                        state.register_fatal(err.into());
                        flow.state = FlowState::Error;
                        return SubState::Error;
                    }
                };
                state.store_header(header);
                notify(callback, state, InfoEvent::loop_for(state.role()), 1);

                // The peer asked to move to a new state; the transition hook
                // decides whether that is legal from here.
                if !hooks.transition_read(state, header.message_type) {
                    record.send_alert(
                        state,
                        AlertLevel::Fatal,
                        AlertDescription::UnexpectedMessage,
                    );
                    state.register_fatal(HandshakeError::UnexpectedMessage(header.message_type));
                    flow.state = FlowState::Error;
                    return SubState::Error;
                }

                let limit = hooks.max_message_size(state);
                if header.message_size > limit {
                    record.send_alert(
                        state,
                        AlertLevel::Fatal,
                        AlertDescription::IllegalParameter,
                    );
                    state.register_fatal(HandshakeError::OversizedMessage {
                        size: header.message_size,
                        limit,
                    });
                    flow.state = FlowState::Error;
                    return SubState::Error;
                }

                flow.read_state = ReadState::Body;
            }

            ReadState::Body => {
                let len = if datagram {
                    // The body arrived with the header.
                    state.message_size()
                } else {
                    match record.read_message_body(state) {
                        Ok(len) => len,
                        Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                            return SubState::Error;
                        }
                        Err(err) => {
                            state.register_fatal(err.into());
                            flow.state = FlowState::Error;
                            return SubState::Error;
                        }
                    }
                };

                state.set_first_packet(false);
                match hooks.process_message(state, len) {
                    MessageProcess::Error => {
                        state.register_fatal(HandshakeError::ProcessFailed);
                        flow.state = FlowState::Error;
                        return SubState::Error;
                    }
                    MessageProcess::FinishedReading => {
                        if datagram {
                            record.timer_stop(state);
                        }
                        return SubState::Finished;
                    }
                    MessageProcess::ContinueProcessing => {
                        flow.read_state = ReadState::PostProcess;
                        flow.read_state_work = WorkState::MoreA;
                    }
                    MessageProcess::ContinueReading => {
                        flow.read_state = ReadState::Header;
                    }
                }
            }

            ReadState::PostProcess => {
                match hooks.post_process_message(state, flow.read_state_work) {
                    Ok(work) => {
                        flow.read_state_work = work;
                        match work {
                            // Blocked mid-work; resume here with this marker.
                            WorkState::MoreA | WorkState::MoreB | WorkState::MoreC => {
                                return SubState::Error;
                            }
                            WorkState::FinishedContinue => {
                                flow.read_state = ReadState::Header;
                            }
                            WorkState::FinishedStop => {
                                if datagram {
                                    record.timer_stop(state);
                                }
                                return SubState::Finished;
                            }
                        }
                    }
                    Err(err) => {
                        state.register_fatal(err);
                        flow.state = FlowState::Error;
                        return SubState::Error;
                    }
                }
            }
        }
    }
}
