use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Cooperative cancellation token backed by an `AtomicBool`.
///
/// Set from the signal handler, checked by the session between phases.
#[derive(Debug, Clone)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// One external command: a program and its argument vector.
///
/// Arguments are never joined into a shell string; the vector goes straight
/// to `std::process::Command`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerInvocation {
    pub program: String,
    pub args: Vec<String>,
}

impl DockerInvocation {
    pub fn docker(args: Vec<String>) -> Self {
        Self {
            program: "docker".into(),
            args,
        }
    }
}

/// Captured outcome of an external command.
#[derive(Debug, Clone, Default)]
pub struct CmdOutput {
    /// Exit code; `None` when the child was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CmdOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Exit code with the signal-killed case collapsed to 1.
    pub fn code_or_one(&self) -> i32 {
        self.status.unwrap_or(1)
    }
}

/// Name of a launched container — the only state the shutdown path needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHandle(String);

impl ContainerHandle {
    /// Derive a per-run container name from the image name.
    ///
    /// Characters Docker rejects in container names are mapped to `-`; the
    /// unix timestamp keeps successive runs from colliding.
    pub fn derive(image: &str) -> Self {
        let safe: String = image
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                    c
                } else {
                    '-'
                }
            })
            .collect();
        Self(format!("{safe}-container-{}", unix_timestamp()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
