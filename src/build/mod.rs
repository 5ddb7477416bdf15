// Build artifacts — the on-disk context docker build consumes.

pub mod context;
pub mod template;

pub use context::{BuildContext, COMMAND_SCRIPT, SETUP_SCRIPT};
pub use template::render_dockerfile;
