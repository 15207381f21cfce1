//! Build errors for the state machine builder.

use crate::core::StateError;
use crate::machine::ConfigError;
use thiserror::Error;

/// Errors that can occur when building a state machine.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Default state not specified. Call .default_state(state) before .build()")]
    MissingDefaultState,

    #[error("Invalid configuration: {}", format_config_errors(.0))]
    InvalidConfig(Vec<ConfigError>),

    #[error("State type failed conversion check: {0}")]
    State(#[from] StateError),
}

fn format_config_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
