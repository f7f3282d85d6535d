//! TOML-based configuration for depotview.
//!
//! Every section is optional. The merge tool command may come from the
//! environment; it is resolved at runtime via [`AppConfig::resolve_env_vars`]
//! and never written back to disk.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::{ConfigError, MapError};
use crate::mapping::{PathMapper, ViewFile};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Client view rules.
    #[serde(default)]
    pub view: ViewConfig,

    /// Resolve policy and merge tool settings.
    #[serde(default)]
    pub resolve: ResolveConfig,
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "warn".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

// ---------------------------------------------------------------------------
// View
// ---------------------------------------------------------------------------

/// Client view: inline rule lines and/or a view file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Rules in `[-|+]left right` form. Applied after the view file.
    #[serde(default)]
    pub lines: Vec<String>,

    /// Optional view file, one rule per line.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Resolve
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveConfig {
    /// Accept merged output even when it has conflicts.
    #[serde(default)]
    pub force: bool,

    /// Prompt when a file needs editing.
    #[serde(default = "default_true")]
    pub interactive: bool,

    /// Launch the merge tool after an edit decision.
    #[serde(default = "default_true")]
    pub tool_on_edit: bool,

    /// Explicit merge tool command. Takes precedence over the environment.
    #[serde(default)]
    pub merge_tool: Option<String>,

    /// Environment variable naming the merge tool.
    #[serde(default = "default_merge_tool_env")]
    pub merge_tool_env: String,

    /// Environment variable consulted when `merge_tool_env` is unset.
    #[serde(default = "default_fallback_merge_tool_env")]
    pub fallback_merge_tool_env: String,

    /// Diff flags passed to the diff oracle, e.g. `-db`.
    #[serde(default)]
    pub diff_flags: String,

    /// Merge tool resolved from the environment (not serialized).
    #[serde(skip)]
    pub resolved_merge_tool: Option<String>,
}

fn default_true() -> bool {
    true
}
fn default_merge_tool_env() -> String {
    "P4MERGE".into()
}
fn default_fallback_merge_tool_env() -> String {
    "MERGE".into()
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            force: false,
            interactive: default_true(),
            tool_on_edit: default_true(),
            merge_tool: None,
            merge_tool_env: default_merge_tool_env(),
            fallback_merge_tool_env: default_fallback_merge_tool_env(),
            diff_flags: String::new(),
            resolved_merge_tool: None,
        }
    }
}

impl ResolveConfig {
    /// The merge tool to run: explicit setting first, then the environment.
    pub fn effective_merge_tool(&self) -> Option<&str> {
        self.merge_tool
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .or(self.resolved_merge_tool.as_deref())
    }
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load an [`AppConfig`] from a TOML file at the given path.
    ///
    /// This does **not** resolve environment variables -- call
    /// [`resolve_env_vars`](Self::resolve_env_vars) afterwards.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Resolve the merge tool from the process environment.
    pub fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        self.resolve_env_with(|name| std::env::var(name).ok())
    }

    /// Resolve the merge tool using `lookup` for environment variables.
    ///
    /// Nothing is looked up when `merge_tool` is set explicitly. A missing
    /// tool is not an error here; it surfaces when a tool is needed.
    pub fn resolve_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        info!("resolving environment variable references in config");

        let resolve = &mut self.resolve;
        if resolve.merge_tool.is_some() {
            debug!("merge tool set explicitly; skipping environment");
            return Ok(());
        }

        resolve.resolved_merge_tool = resolve_optional_env(
            &lookup,
            &resolve.merge_tool_env,
            "resolve.merge_tool_env",
        )
        .or_else(|| {
            resolve_optional_env(
                &lookup,
                &resolve.fallback_merge_tool_env,
                "resolve.fallback_merge_tool_env",
            )
        });

        debug!("environment variable resolution complete");
        Ok(())
    }

    /// Validate that all fields are sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let level = self.logging.log_level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "logging.log_level".into(),
                detail: format!(
                    "'{}' is not one of {}",
                    self.logging.log_level,
                    LOG_LEVELS.join(", ")
                ),
            });
        }

        for (i, line) in self.view.lines.iter().enumerate() {
            let mut scratch = PathMapper::new();
            scratch.insert(line).map_err(|e| ConfigError::InvalidValue {
                field: format!("view.lines[{}]", i),
                detail: e.to_string(),
            })?;
        }

        if let Some(tool) = &self.resolve.merge_tool {
            if tool.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "resolve.merge_tool".into(),
                    detail: "merge tool must not be empty when set".into(),
                });
            }
        }

        if let Some(bad) = self
            .resolve
            .diff_flags
            .chars()
            .find(|c| !"-dbwl".contains(*c))
        {
            return Err(ConfigError::InvalidValue {
                field: "resolve.diff_flags".into(),
                detail: format!("unsupported diff flag '{}'", bad),
            });
        }

        Ok(())
    }

    /// Convenience: load, resolve, and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.resolve_env_vars()?;
        config.validate()?;
        Ok(config)
    }

    /// Build the configured client view: the view file's rules followed by
    /// the inline lines.
    pub fn build_mapper(&self) -> Result<PathMapper, MapError> {
        let mut mapper = match &self.view.file {
            Some(path) => ViewFile::load(path)?,
            None => PathMapper::new(),
        };
        for line in &self.view.lines {
            mapper.insert(line)?;
        }
        Ok(mapper)
    }
}

/// Look up an environment variable by name. Returns `Some(value)` when it
/// is set and non-empty; logs a warning otherwise.
fn resolve_optional_env<F>(lookup: &F, env_name: &str, field: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(env_name) {
        Some(val) if !val.trim().is_empty() => {
            debug!(field, env_name, "resolved env var");
            Some(val)
        }
        Some(_) => {
            warn!(field, env_name, "env var is set but empty");
            None
        }
        None => {
            debug!(field, env_name, "env var not set");
            None
        }
    }
}
