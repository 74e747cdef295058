//! Configuration management for Folio.
//!
//! Parses `folio.toml` project files with serde and provides auto-discovery
//! of the config file in parent directories. The documentation set itself
//! (table of contents, exclusions) lives next to the sources in `docset.yml`
//! and is parsed by [`Docset`].
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `docs.source_dir`
//! - `docs.output_dir`
//! - `build.url_path_prefix`

mod docset;
mod expand;

pub use docset::{DOCSET_FILENAME, Docset, TocItem};

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override docs source directory.
    pub source_dir: Option<PathBuf>,
    /// Override generated site directory.
    pub output_dir: Option<PathBuf>,
    /// Override the uncaught failure limit.
    pub max_uncaught_errors: Option<usize>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "folio.toml";

/// Default number of per-file failures tolerated before a build aborts.
pub const DEFAULT_MAX_UNCAUGHT_ERRORS: usize = 25;

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Documentation configuration (paths are relative strings from TOML).
    #[serde(default)]
    docs: DocsConfigRaw,
    /// Build configuration.
    pub build: BuildConfig,
    /// Link resolution configuration.
    pub links: LinksConfig,

    /// Resolved docs configuration (set after loading).
    #[serde(skip)]
    pub docs_resolved: DocsConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Raw docs configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DocsConfigRaw {
    source_dir: Option<String>,
    output_dir: Option<String>,
    docset: Option<String>,
}

/// Resolved documentation configuration with absolute paths.
#[derive(Debug, Default)]
pub struct DocsConfig {
    /// Source directory for markdown files.
    pub source_dir: PathBuf,
    /// Output directory for the generated site.
    pub output_dir: PathBuf,
    /// Docset filename, relative to the source directory.
    pub docset: String,
}

impl DocsConfig {
    /// Path of the `docset.yml` file.
    #[must_use]
    pub fn docset_path(&self) -> PathBuf {
        self.source_dir.join(&self.docset)
    }
}

/// Build configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Per-file failures tolerated before the build aborts.
    pub max_uncaught_errors: usize,
    /// URL prefix recorded in the link reference (e.g. `/guide`).
    pub url_path_prefix: Option<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            max_uncaught_errors: DEFAULT_MAX_UNCAUGHT_ERRORS,
            url_path_prefix: None,
        }
    }
}

/// Link resolution configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LinksConfig {
    /// URI schemes treated as cross-links into other documentation sets.
    pub cross_link_schemes: Vec<String>,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            cross_link_schemes: vec!["kibana".to_owned()],
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// YAML parsing error in `docset.yml`.
    #[error("Docset parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`docs.source_dir`").
        field: String,
        /// Error message (e.g., "${`DOCS_DIR`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `folio.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(source_dir) = &settings.source_dir {
            self.docs_resolved.source_dir.clone_from(source_dir);
        }
        if let Some(output_dir) = &settings.output_dir {
            self.docs_resolved.output_dir.clone_from(output_dir);
        }
        if let Some(limit) = settings.max_uncaught_errors {
            self.build.max_uncaught_errors = limit;
        }
    }

    /// Check whether a URI scheme is configured as a cross-link scheme.
    #[must_use]
    pub fn is_cross_link_scheme(&self, scheme: &str) -> bool {
        self.links
            .cross_link_schemes
            .iter()
            .any(|s| s.eq_ignore_ascii_case(scheme))
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            docs: DocsConfigRaw::default(),
            build: BuildConfig::default(),
            links: LinksConfig::default(),
            docs_resolved: DocsConfig {
                source_dir: base.join("docs"),
                output_dir: base.join(".artifacts/docs/html"),
                docset: DOCSET_FILENAME.to_owned(),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.docs_resolved.docset, "docs.docset")?;
        if self.build.max_uncaught_errors == 0 {
            return Err(ConfigError::Validation(
                "build.max_uncaught_errors must be greater than 0".to_owned(),
            ));
        }
        for scheme in &self.links.cross_link_schemes {
            require_non_empty(scheme, "links.cross_link_schemes")?;
            if scheme.contains(':') {
                return Err(ConfigError::Validation(format!(
                    "links.cross_link_schemes entry '{scheme}' must be a bare scheme name"
                )));
            }
            if scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https") {
                return Err(ConfigError::Validation(format!(
                    "links.cross_link_schemes cannot contain '{scheme}'"
                )));
            }
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref dir) = self.docs.source_dir {
            self.docs.source_dir = Some(expand::expand_env(dir, "docs.source_dir")?);
        }
        if let Some(ref dir) = self.docs.output_dir {
            self.docs.output_dir = Some(expand::expand_env(dir, "docs.output_dir")?);
        }
        if let Some(ref prefix) = self.build.url_path_prefix {
            self.build.url_path_prefix = Some(expand::expand_env(prefix, "build.url_path_prefix")?);
        }
        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        self.docs_resolved = DocsConfig {
            source_dir: resolve(self.docs.source_dir.as_deref(), "docs"),
            output_dir: resolve(self.docs.output_dir.as_deref(), ".artifacts/docs/html"),
            docset: self
                .docs
                .docset
                .clone()
                .unwrap_or_else(|| DOCSET_FILENAME.to_owned()),
        };
    }
}
