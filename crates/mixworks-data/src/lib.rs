//! Session configuration on disk: format detection, loading and validation
//! into [`mixworks_core::settings::SessionSettings`].

pub mod loader;
pub mod schema;

pub use loader::{ConfigError, load_session_config};
