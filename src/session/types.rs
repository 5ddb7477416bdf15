use std::sync::mpsc::Sender;

use crate::docker::ContainerHandle;

/// Progress reported by the session. The binary drains these to stderr;
/// tests collect them from the channel directly.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The image existence check came back positive; no build will run.
    ImageFound {
        image: String,
        id: Option<String>,
    },
    BuildStarted {
        image: String,
    },
    /// Captured output of an external command, forwarded as one block.
    Stdout(String),
    Stderr(String),
    BuildFinished {
        image: String,
    },
    CredentialsConfigured,
    Launched {
        handle: ContainerHandle,
        container_id: String,
    },
    Stopping {
        handle: ContainerHandle,
    },
    Stopped {
        handle: ContainerHandle,
    },
    /// `docker stop` failed during shutdown; shutdown continues regardless.
    StopFailed {
        handle: ContainerHandle,
        code: Option<i32>,
    },
    CleanupFailed {
        message: String,
    },
}

/// Explicitly injected logging sink. Every session operation reports through
/// one of these; there is no process-wide logger.
#[derive(Debug, Clone)]
pub struct EventSink(Sender<SessionEvent>);

impl EventSink {
    pub fn new(tx: Sender<SessionEvent>) -> Self {
        Self(tx)
    }

    /// Receiver may already be gone during teardown — drop the event then.
    pub fn emit(&self, event: SessionEvent) {
        let _ = self.0.send(event);
    }
}

/// What the shutdown sequence achieved. The process exits 0 either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownOutcome {
    pub stop_succeeded: bool,
}
