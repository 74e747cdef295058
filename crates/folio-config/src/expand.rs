//! Environment variable expansion for configuration strings.

use std::borrow::Cow;

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references in a configuration value.
///
/// # Arguments
///
/// * `value` - Raw string from the config file
/// * `field` - Dotted config field path, used in error messages
///
/// # Errors
///
/// Returns `ConfigError::EnvVar` if a referenced variable is unset and has no default.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    shellexpand::env(value)
        .map(Cow::into_owned)
        .map_err(|e| ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} not set", e.var_name),
        })
}
