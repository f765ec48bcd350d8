//! Shared observation log for scripted handshake runs.

use std::sync::{Arc, Mutex};

use handshake::{AlertDescription, AlertLevel, InfoEvent, MessageType, RecordKind, WorkState};

/// One externally observable effect of a drive call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Observed {
    /// Info-callback notification.
    Callback(InfoEvent, i32),
    /// A message header was delivered by the record layer.
    HeaderRead(MessageType),
    /// A message body was delivered by the record layer.
    BodyRead(usize),
    /// A constructed message went out through the record layer.
    RecordWrite(RecordKind),
    /// The driver emitted an alert.
    Alert(AlertLevel, AlertDescription),
    /// The datagram retransmission timer was armed.
    TimerStart,
    /// The datagram retransmission timer was cancelled.
    TimerStop,
    /// The read-transition hook ran for a message type.
    TransitionRead(MessageType),
    /// The message-processing hook ran over a body of this length.
    ProcessMessage(usize),
    /// The post-process hook ran with this work marker.
    PostProcess(WorkState),
    /// The write-transition hook ran.
    TransitionWrite,
    /// The pre-work hook ran with this work marker.
    PreWork(WorkState),
    /// The construction hook ran.
    Construct,
    /// The post-work hook ran with this work marker.
    PostWork(WorkState),
}

/// Append-only log shared by the scripted collaborators and the callback.
#[derive(Clone, Debug, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<Observed>>>,
}

impl Recorder {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event.
    pub fn log(&self, event: Observed) {
        self.events.lock().unwrap().push(event);
    }

    /// Returns a copy of everything observed so far.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Observed> {
        self.events.lock().unwrap().clone()
    }

    /// Drains the log.
    #[must_use]
    pub fn take(&self) -> Vec<Observed> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }

    /// Counts events matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&Observed) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| predicate(e)).count()
    }

    /// Everything observed except exit notifications, which legitimately
    /// differ between a suspended run and an uninterrupted one (each drive
    /// call emits its own exit).
    #[must_use]
    pub fn trace_without_exits(&self) -> Vec<Observed> {
        self.snapshot()
            .into_iter()
            .filter(|event| {
                !matches!(
                    event,
                    Observed::Callback(InfoEvent::AcceptExit | InfoEvent::ConnectExit, _)
                )
            })
            .collect()
    }
}
