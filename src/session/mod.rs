// The session — resolve image, configure logging, launch, wait, stop.

pub mod orchestrator;
mod types;

pub use orchestrator::ContainerLogSession;
pub use types::{EventSink, SessionEvent, ShutdownOutcome};
