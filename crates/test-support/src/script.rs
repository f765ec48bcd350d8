//! Queue-driven stand-ins for the two collaborator seams.

use std::collections::{HashSet, VecDeque};
use std::io;

use handshake::{
    AlertDescription, AlertLevel, HandshakeError, HandshakeHooks, HandshakeState, MessageHeader,
    MessageProcess, MessageType, RecordKind, RecordLayer, Result, SessionState, WorkState,
    WriteTransition,
};

use crate::recorder::{Observed, Recorder};

/// Record layer scripted from a queue of inbound message headers.
///
/// Transport operations (header read, body read, record write) are counted
/// in completion order; an index listed in the block schedule makes that
/// operation fail once with [`io::ErrorKind::WouldBlock`] before succeeding
/// on retry. Successful operations and all alert/timer activity land in the
/// recorder; a blocked attempt is deliberately not logged, since the
/// transport delivered nothing.
#[derive(Clone, Debug)]
pub struct ScriptedRecord {
    headers: VecDeque<MessageHeader>,
    blocks: HashSet<usize>,
    ops_completed: usize,
    sctp: bool,
    recorder: Recorder,
}

impl ScriptedRecord {
    /// Creates a record layer that will deliver `headers` in order.
    #[must_use]
    pub fn new(recorder: Recorder, headers: Vec<MessageHeader>) -> Self {
        Self {
            headers: headers.into(),
            blocks: HashSet::new(),
            ops_completed: 0,
            sctp: false,
            recorder,
        }
    }

    /// Schedules one-shot would-block failures at the given transport
    /// operation indices.
    #[must_use]
    pub fn with_blocks(mut self, blocks: &[usize]) -> Self {
        self.blocks = blocks.iter().copied().collect();
        self
    }

    /// Reports the transport as DTLS over SCTP.
    #[must_use]
    pub const fn sctp(mut self) -> Self {
        self.sctp = true;
        self
    }

    fn blocked(&mut self) -> bool {
        self.blocks.remove(&self.ops_completed)
    }

    fn exhausted() -> io::Error {
        io::Error::new(io::ErrorKind::UnexpectedEof, "header script exhausted")
    }
}

impl RecordLayer for ScriptedRecord {
    fn read_message_header(&mut self, _state: &mut SessionState) -> io::Result<MessageHeader> {
        if self.blocked() {
            return Err(io::ErrorKind::WouldBlock.into());
        }
        let header = self.headers.pop_front().ok_or_else(Self::exhausted)?;
        self.ops_completed += 1;
        self.recorder.log(Observed::HeaderRead(header.message_type));
        Ok(header)
    }

    fn read_message_body(&mut self, state: &mut SessionState) -> io::Result<usize> {
        if self.blocked() {
            return Err(io::ErrorKind::WouldBlock.into());
        }
        self.ops_completed += 1;
        let len = state.message_size();
        state.set_message_bytes(len);
        self.recorder.log(Observed::BodyRead(len));
        Ok(len)
    }

    fn write_record(&mut self, _state: &mut SessionState, kind: RecordKind) -> io::Result<()> {
        if self.blocked() {
            return Err(io::ErrorKind::WouldBlock.into());
        }
        self.ops_completed += 1;
        self.recorder.log(Observed::RecordWrite(kind));
        Ok(())
    }

    fn send_alert(
        &mut self,
        _state: &mut SessionState,
        level: AlertLevel,
        description: AlertDescription,
    ) {
        self.recorder.log(Observed::Alert(level, description));
    }

    fn init_buffers(&mut self, _state: &mut SessionState) -> io::Result<()> {
        Ok(())
    }

    fn push_write_buffer(&mut self, _state: &mut SessionState) -> io::Result<()> {
        Ok(())
    }

    fn reset_transcript(&mut self, _state: &mut SessionState) {}

    fn timer_start(&mut self, _state: &mut SessionState) {
        self.recorder.log(Observed::TimerStart);
    }

    fn timer_stop(&mut self, _state: &mut SessionState) {
        self.recorder.log(Observed::TimerStop);
    }

    fn is_sctp(&self) -> bool {
        self.sctp
    }
}

/// Planned outcome of one write-transition decision.
#[derive(Clone, Debug)]
pub enum PlanTransition {
    /// Advance to this handshake state and send a message.
    Continue(HandshakeState),
    /// Nothing further to write in this phase.
    Finished,
    /// Refuse to pick a next state.
    Error,
}

/// Plan for one write-phase iteration.
#[derive(Clone, Debug)]
pub struct WriteOp {
    transition: PlanTransition,
    pre: VecDeque<std::result::Result<WorkState, String>>,
    post: VecDeque<std::result::Result<WorkState, String>>,
    construct_fails: bool,
}

impl WriteOp {
    /// A plain outgoing message: transition to `state`, construct, send.
    /// Pre- and post-work complete immediately unless steps are added.
    #[must_use]
    pub fn message(state: HandshakeState) -> Self {
        Self {
            transition: PlanTransition::Continue(state),
            pre: VecDeque::new(),
            post: VecDeque::new(),
            construct_fails: false,
        }
    }

    /// End the write phase: the peer speaks next.
    #[must_use]
    pub fn finish_phase() -> Self {
        Self {
            transition: PlanTransition::Finished,
            pre: VecDeque::new(),
            post: VecDeque::new(),
            construct_fails: false,
        }
    }

    /// A transition that refuses to continue.
    #[must_use]
    pub fn error() -> Self {
        Self {
            transition: PlanTransition::Error,
            pre: VecDeque::new(),
            post: VecDeque::new(),
            construct_fails: false,
        }
    }

    /// Transition to `state`, then end the whole handshake from pre-work
    /// without constructing anything.
    #[must_use]
    pub fn end_before_send(state: HandshakeState) -> Self {
        Self::message(state).pre_steps(&[WorkState::FinishedStop])
    }

    /// Transition to `state`, send the message, then end the whole
    /// handshake from post-work.
    #[must_use]
    pub fn end_after_send(state: HandshakeState) -> Self {
        Self::message(state).post_steps(&[WorkState::FinishedStop])
    }

    /// Scripts the pre-work results, one per invocation; an exhausted queue
    /// yields `FinishedContinue`.
    #[must_use]
    pub fn pre_steps(mut self, steps: &[WorkState]) -> Self {
        self.pre = steps.iter().copied().map(Ok).collect();
        self
    }

    /// Scripts the post-work results, one per invocation; an exhausted
    /// queue yields `FinishedContinue`.
    #[must_use]
    pub fn post_steps(mut self, steps: &[WorkState]) -> Self {
        self.post = steps.iter().copied().map(Ok).collect();
        self
    }

    /// Makes pre-work fail irrecoverably with `reason`.
    #[must_use]
    pub fn failing_pre(mut self, reason: &str) -> Self {
        self.pre = VecDeque::from([Err(reason.to_owned())]);
        self
    }

    /// Makes message construction fail.
    #[must_use]
    pub const fn failing_construct(mut self) -> Self {
        self.construct_fails = true;
        self
    }
}

/// Plan for one inbound message.
#[derive(Clone, Debug)]
pub struct ReadOp {
    expect: MessageType,
    accept: bool,
    next_state: HandshakeState,
    process: MessageProcess,
    post: VecDeque<std::result::Result<WorkState, String>>,
    set_peer_secure: bool,
}

impl ReadOp {
    /// Accept `expect`, advance to `state`, and keep reading.
    #[must_use]
    pub fn message(expect: MessageType, state: HandshakeState) -> Self {
        Self {
            expect,
            accept: true,
            next_state: state,
            process: MessageProcess::ContinueReading,
            post: VecDeque::new(),
            set_peer_secure: false,
        }
    }

    /// Accept `expect`, advance to `state`, and end the read phase.
    #[must_use]
    pub fn finishing(expect: MessageType, state: HandshakeState) -> Self {
        Self {
            process: MessageProcess::FinishedReading,
            ..Self::message(expect, state)
        }
    }

    /// Accept `expect` and run the scripted post-process steps afterwards;
    /// an exhausted queue yields `FinishedContinue`.
    #[must_use]
    pub fn processed(expect: MessageType, state: HandshakeState, post: &[WorkState]) -> Self {
        Self {
            process: MessageProcess::ContinueProcessing,
            post: post.iter().copied().map(Ok).collect(),
            ..Self::message(expect, state)
        }
    }

    /// Reject `expect` as out of place.
    #[must_use]
    pub fn rejecting(expect: MessageType) -> Self {
        Self {
            accept: false,
            ..Self::message(expect, HandshakeState::Before)
        }
    }

    /// Accept `expect` but fail while processing the body.
    #[must_use]
    pub fn failing(expect: MessageType, state: HandshakeState) -> Self {
        Self {
            process: MessageProcess::Error,
            ..Self::message(expect, state)
        }
    }

    /// Record that the peer advertised secure renegotiation while this
    /// message was processed.
    #[must_use]
    pub const fn with_peer_secure(mut self) -> Self {
        self.set_peer_secure = true;
        self
    }

    /// Makes the post-process hook fail irrecoverably with `reason`.
    #[must_use]
    pub fn failing_post(mut self, reason: &str) -> Self {
        self.process = MessageProcess::ContinueProcessing;
        self.post = VecDeque::from([Err(reason.to_owned())]);
        self
    }
}

/// Hook bundle scripted from per-message plans.
///
/// Both role slots of a session can hold clones of the same bundle; only the
/// driven role's copy is ever consulted.
#[derive(Clone, Debug)]
pub struct ScriptedHooks {
    write_plan: VecDeque<WriteOp>,
    read_plan: VecDeque<ReadOp>,
    current_write: Option<WriteOp>,
    current_read: Option<ReadOp>,
    max_message_size: usize,
    recorder: Recorder,
}

impl ScriptedHooks {
    /// Creates a bundle that will follow the given plans.
    #[must_use]
    pub fn new(recorder: Recorder, write_plan: Vec<WriteOp>, read_plan: Vec<ReadOp>) -> Self {
        Self {
            write_plan: write_plan.into(),
            read_plan: read_plan.into(),
            current_write: None,
            current_read: None,
            max_message_size: handshake::MAX_PLAIN_LENGTH,
            recorder,
        }
    }

    /// Caps the acceptable inbound message size.
    #[must_use]
    pub const fn with_max_message_size(mut self, limit: usize) -> Self {
        self.max_message_size = limit;
        self
    }

    fn hook_failure(reason: &str) -> HandshakeError {
        HandshakeError::Hook(reason.to_owned())
    }
}

impl HandshakeHooks for ScriptedHooks {
    fn transition_read(&mut self, state: &mut SessionState, message_type: MessageType) -> bool {
        self.recorder.log(Observed::TransitionRead(message_type));
        let Some(op) = self.read_plan.pop_front() else {
            return false;
        };
        if !op.accept || op.expect != message_type {
            return false;
        }
        state.set_hand_state(op.next_state);
        if op.set_peer_secure {
            state.set_peer_secure_renegotiation(true);
        }
        self.current_read = Some(op);
        true
    }

    fn process_message(&mut self, _state: &mut SessionState, len: usize) -> MessageProcess {
        self.recorder.log(Observed::ProcessMessage(len));
        let Some(op) = self.current_read.as_ref() else {
            return MessageProcess::Error;
        };
        let verdict = op.process;
        if verdict != MessageProcess::ContinueProcessing {
            self.current_read = None;
        }
        verdict
    }

    fn post_process_message(
        &mut self,
        _state: &mut SessionState,
        work: WorkState,
    ) -> Result<WorkState> {
        self.recorder.log(Observed::PostProcess(work));
        let Some(op) = self.current_read.as_mut() else {
            return Err(Self::hook_failure("no message under post-processing"));
        };
        match op.post.pop_front() {
            None => {
                self.current_read = None;
                Ok(WorkState::FinishedContinue)
            }
            Some(Ok(next)) => {
                if !next.is_more() {
                    self.current_read = None;
                }
                Ok(next)
            }
            Some(Err(reason)) => Err(Self::hook_failure(&reason)),
        }
    }

    fn max_message_size(&self, _state: &SessionState) -> usize {
        self.max_message_size
    }

    fn transition_write(&mut self, state: &mut SessionState) -> WriteTransition {
        self.recorder.log(Observed::TransitionWrite);
        let Some(op) = self.write_plan.pop_front() else {
            return WriteTransition::Error;
        };
        match op.transition {
            PlanTransition::Continue(next) => {
                state.set_hand_state(next);
                self.current_write = Some(op);
                WriteTransition::Continue
            }
            PlanTransition::Finished => WriteTransition::Finished,
            PlanTransition::Error => WriteTransition::Error,
        }
    }

    fn pre_work(&mut self, _state: &mut SessionState, work: WorkState) -> Result<WorkState> {
        self.recorder.log(Observed::PreWork(work));
        let Some(op) = self.current_write.as_mut() else {
            return Err(Self::hook_failure("no message under preparation"));
        };
        match op.pre.pop_front() {
            None => Ok(WorkState::FinishedContinue),
            Some(Ok(next)) => Ok(next),
            Some(Err(reason)) => Err(Self::hook_failure(&reason)),
        }
    }

    fn construct_message(&mut self, state: &mut SessionState) -> Result<()> {
        self.recorder.log(Observed::Construct);
        let Some(op) = self.current_write.as_ref() else {
            return Err(Self::hook_failure("no message under construction"));
        };
        if op.construct_fails {
            return Err(Self::hook_failure("construction failed"));
        }
        if let Some(buf) = state.message_buf_mut() {
            buf.clear();
            buf.extend_from_slice(b"scripted message body");
        }
        Ok(())
    }

    fn post_work(&mut self, _state: &mut SessionState, work: WorkState) -> Result<WorkState> {
        self.recorder.log(Observed::PostWork(work));
        let Some(op) = self.current_write.as_mut() else {
            return Err(Self::hook_failure("no message under finalization"));
        };
        match op.post.pop_front() {
            None => {
                self.current_write = None;
                Ok(WorkState::FinishedContinue)
            }
            Some(Ok(next)) => {
                if !next.is_more() {
                    self.current_write = None;
                }
                Ok(next)
            }
            Some(Err(reason)) => Err(Self::hook_failure(&reason)),
        }
    }
}
