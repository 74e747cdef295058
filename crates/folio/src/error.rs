//! CLI error types.

use folio_config::ConfigError;
use folio_mover::MoveError;
use folio_site::BuildError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Build(#[from] BuildError),

    #[error("{0}")]
    Move(#[from] MoveError),

    #[error("{0}")]
    Validation(String),
}
