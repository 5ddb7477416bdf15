pub mod loader;
pub mod types;

pub use loader::FileConfig;
pub use types::{Config, Overrides};
