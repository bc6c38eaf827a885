use std::path::PathBuf;

/// Errors that can stop a demo run.
#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    /// Failed to load the session config.
    #[error("config error in {dir}: {source}")]
    Config {
        dir: PathBuf,
        source: mixworks_data::ConfigError,
    },

    /// The session could not be built or refused an action the script
    /// cannot work around.
    #[error(transparent)]
    Session(#[from] mixworks_core::session::SessionError),

    /// The configured halls do not include the requested one.
    #[error("hall {0} is not configured")]
    UnknownHall(u32),
}
