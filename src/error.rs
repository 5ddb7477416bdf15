use std::io;

use thiserror::Error;

/// Fatal session errors. Each external-command variant carries the exit code
/// of the command that failed so the process can propagate it.
///
/// A failed `docker stop` during shutdown is not represented here; it is
/// reported through the event sink and never aborts shutdown.
#[derive(Debug, Error)]
pub enum Error {
    #[error("docker build exited with code {code}: {detail}")]
    Build { code: i32, detail: String },

    #[error("credential setup exited with code {code}")]
    Config { code: i32 },

    #[error("docker run exited with code {code}: {detail}")]
    Launch { code: i32, detail: String },

    #[error("failed to invoke {program}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{context}")]
    Io {
        context: &'static str,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Exit code for the process: the failing external command's own code
    /// where there is one, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Build { code, .. } | Error::Config { code } | Error::Launch { code, .. } => {
                *code
            }
            Error::Spawn { .. } | Error::Io { .. } => 1,
        }
    }
}
