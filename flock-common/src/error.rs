use thiserror::Error;

/// Errors raised while validating a flock configuration.
///
/// Construction of a simulation is all-or-nothing: a configuration that
/// fails validation never produces a partially initialized engine.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl ConfigError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        ConfigError::InvalidConfiguration(msg.into())
    }
}
