// Docker plumbing — invocation assembly, the runtime seam, cancellation.

pub mod commands;
pub mod engine;
pub mod types;

pub use engine::{Docker, SystemDocker, ensure_available};
pub use types::{CancelToken, CmdOutput, ContainerHandle, DockerInvocation};
