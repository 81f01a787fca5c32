//! Configuration file loading with precedence handling.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use super::{
    EngineConfig, DEFAULT_BLANK_CORRECTION_COUNT, DEFAULT_LOCK_TIMEOUT_MS,
    DEFAULT_MAX_ACTIVE_GROUPS, DEFAULT_MEASURE_RETRIES, DEFAULT_READY_TIMEOUT_MS,
    DEFAULT_RESIZE_DEBOUNCE_MS, DEFAULT_SENTINEL_GROUP_SIZE,
};
use crate::model::Flow;

/// Errors that can occur during config loading.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Config file path contains invalid UTF-8 or cannot be resolved.
    #[error("Invalid config path: {0}")]
    InvalidPath(String),

    /// Failed to read config file (file may not exist or have permission issues).
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError {
        /// Path that failed to read.
        path: PathBuf,
        /// Reason for failure.
        reason: String,
    },

    /// Config file contains invalid TOML syntax.
    #[error("Invalid TOML in {path}: {reason}")]
    ParseError {
        /// Path with invalid TOML.
        path: PathBuf,
        /// Parse error details.
        reason: String,
    },
}

/// TOML configuration file structure.
///
/// All fields are optional - if not specified, hardcoded defaults are used.
/// Corresponds to `~/.config/reflow-pager/config.toml`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Presentation flow ("paginated" or "scrolled").
    #[serde(default)]
    pub flow: Option<Flow>,

    /// Column gap.
    #[serde(default)]
    pub gap: Option<f64>,

    /// Columns per page in paginated flow.
    #[serde(default)]
    pub max_columns: Option<u8>,

    /// Sentinels per observation group.
    #[serde(default)]
    pub sentinel_group_size: Option<usize>,

    /// Observed sentinel groups kept alive at once.
    #[serde(default)]
    pub max_active_groups: Option<usize>,

    /// Navigation lock watchdog in milliseconds.
    #[serde(default)]
    pub lock_timeout_ms: Option<u64>,

    /// Re-attempts after an invalid extent measurement.
    #[serde(default)]
    pub measure_retries: Option<u8>,

    /// Bake readiness timeout in milliseconds.
    #[serde(default)]
    pub ready_timeout_ms: Option<u64>,

    /// Resize/scroll debounce in milliseconds.
    #[serde(default)]
    pub resize_debounce_ms: Option<u64>,

    /// Tracking sections forced visible when nothing is on screen.
    #[serde(default)]
    pub blank_correction_count: Option<usize>,

    /// Block-axis spacing between tracking sections.
    #[serde(default)]
    pub tracking_spacing: Option<f64>,

    /// Directory of the JSON geometry cache.
    #[serde(default)]
    pub geometry_cache_dir: Option<PathBuf>,

    /// Path to log file for tracing output.
    #[serde(default)]
    pub log_file_path: Option<PathBuf>,
}

/// Resolved configuration after applying precedence rules.
///
/// Created by merging defaults, config file, env vars, and CLI args.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    /// Presentation flow.
    pub flow: Flow,
    /// Column gap.
    pub gap: f64,
    /// Columns per page.
    pub max_columns: u8,
    /// Sentinels per observation group.
    pub sentinel_group_size: usize,
    /// Observed groups kept alive at once.
    pub max_active_groups: usize,
    /// Navigation lock watchdog in milliseconds.
    pub lock_timeout_ms: u64,
    /// Re-attempts after an invalid extent measurement.
    pub measure_retries: u8,
    /// Bake readiness timeout in milliseconds.
    pub ready_timeout_ms: u64,
    /// Resize/scroll debounce in milliseconds.
    pub resize_debounce_ms: u64,
    /// Tracking sections forced visible when nothing is on screen.
    pub blank_correction_count: usize,
    /// Block-axis spacing between tracking sections.
    pub tracking_spacing: f64,
    /// Directory of the JSON geometry cache.
    pub geometry_cache_dir: PathBuf,
    /// Path to log file for tracing output.
    pub log_file_path: PathBuf,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            flow: Flow::Paginated,
            gap: 0.0,
            max_columns: 1,
            sentinel_group_size: DEFAULT_SENTINEL_GROUP_SIZE,
            max_active_groups: DEFAULT_MAX_ACTIVE_GROUPS,
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
            measure_retries: DEFAULT_MEASURE_RETRIES,
            ready_timeout_ms: DEFAULT_READY_TIMEOUT_MS,
            resize_debounce_ms: DEFAULT_RESIZE_DEBOUNCE_MS,
            blank_correction_count: DEFAULT_BLANK_CORRECTION_COUNT,
            tracking_spacing: 0.0,
            geometry_cache_dir: default_cache_dir(),
            log_file_path: default_log_path(),
        }
    }
}

impl ResolvedConfig {
    /// Engine tunables, with degenerate values clamped to working minimums.
    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            flow: self.flow,
            gap: self.gap.max(0.0),
            max_columns: self.max_columns.max(1),
            sentinel_group_size: self.sentinel_group_size.max(1),
            max_active_groups: self.max_active_groups.max(2),
            lock_timeout: Duration::from_millis(self.lock_timeout_ms),
            measure_retries: self.measure_retries,
            ready_timeout: Duration::from_millis(self.ready_timeout_ms),
            resize_debounce: Duration::from_millis(self.resize_debounce_ms),
            blank_correction_count: self.blank_correction_count,
            tracking_spacing: self.tracking_spacing.max(0.0),
        }
    }
}

/// Resolve default log file path.
///
/// Returns `~/.local/state/reflow-pager/reflow-pager.log` on Unix-like systems,
/// or appropriate platform path on other systems.
///
/// If state directory cannot be determined, falls back to current directory.
pub fn default_log_path() -> PathBuf {
    if let Some(state_dir) = dirs::state_dir() {
        state_dir.join("reflow-pager").join("reflow-pager.log")
    } else {
        PathBuf::from("reflow-pager.log")
    }
}

/// Resolve default geometry cache directory.
///
/// Returns `~/.cache/reflow-pager/geometry` on Unix-like systems, falling back
/// to a relative directory.
pub fn default_cache_dir() -> PathBuf {
    if let Some(cache_dir) = dirs::cache_dir() {
        cache_dir.join("reflow-pager").join("geometry")
    } else {
        PathBuf::from("reflow-pager-geometry")
    }
}

/// Load configuration file from a specific path.
///
/// Returns `Ok(None)` if file doesn't exist (not an error - use defaults).
/// Returns `Err` if file exists but cannot be read or parsed.
///
/// # Errors
///
/// Returns error if file exists but has read or parse errors.
pub fn load_config_file(path: impl Into<PathBuf>) -> Result<Option<ConfigFile>, ConfigError> {
    let path = path.into();

    // Missing file is not an error - use defaults
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    let config: ConfigFile = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    Ok(Some(config))
}

/// Resolve default config file path.
///
/// Returns `~/.config/reflow-pager/config.toml` on Unix, appropriate path on other platforms.
/// Returns `None` if home directory cannot be determined.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("reflow-pager").join("config.toml"))
}

/// Load configuration with precedence handling.
///
/// Precedence (highest to lowest):
/// 1. Explicit `config_path` argument (CLI `--config`)
/// 2. `REFLOW_PAGER_CONFIG` environment variable
/// 3. Default path `~/.config/reflow-pager/config.toml`
///
/// Missing config files are NOT errors - defaults are used.
///
/// # Errors
///
/// Returns error only if a config file exists but cannot be read or parsed.
pub fn load_config_with_precedence(
    config_path: Option<PathBuf>,
) -> Result<Option<ConfigFile>, ConfigError> {
    if let Some(path) = config_path {
        return load_config_file(path);
    }

    if let Ok(env_path) = std::env::var("REFLOW_PAGER_CONFIG") {
        return load_config_file(PathBuf::from(env_path));
    }

    if let Some(default_path) = default_config_path() {
        return load_config_file(default_path);
    }

    Ok(None)
}

/// Apply environment variable overrides to resolved config.
///
/// Checks for:
/// - `REFLOW_PAGER_FLOW`: Override flow ("paginated" or "scrolled"); invalid values are ignored
pub fn apply_env_overrides(mut config: ResolvedConfig) -> ResolvedConfig {
    if let Ok(flow) = std::env::var("REFLOW_PAGER_FLOW") {
        match flow.parse::<Flow>() {
            Ok(flow) => config.flow = flow,
            Err(reason) => tracing::warn!(%reason, "Ignoring REFLOW_PAGER_FLOW"),
        }
    }

    config
}

/// Merge config file into defaults to create resolved config.
///
/// For each field in `ConfigFile`, if `Some(value)`, use it; otherwise use default.
pub fn merge_config(config_file: Option<ConfigFile>) -> ResolvedConfig {
    let defaults = ResolvedConfig::default();

    let Some(config) = config_file else {
        return defaults;
    };

    ResolvedConfig {
        flow: config.flow.unwrap_or(defaults.flow),
        gap: config.gap.unwrap_or(defaults.gap),
        max_columns: config.max_columns.unwrap_or(defaults.max_columns),
        sentinel_group_size: config
            .sentinel_group_size
            .unwrap_or(defaults.sentinel_group_size),
        max_active_groups: config
            .max_active_groups
            .unwrap_or(defaults.max_active_groups),
        lock_timeout_ms: config.lock_timeout_ms.unwrap_or(defaults.lock_timeout_ms),
        measure_retries: config.measure_retries.unwrap_or(defaults.measure_retries),
        ready_timeout_ms: config.ready_timeout_ms.unwrap_or(defaults.ready_timeout_ms),
        resize_debounce_ms: config
            .resize_debounce_ms
            .unwrap_or(defaults.resize_debounce_ms),
        blank_correction_count: config
            .blank_correction_count
            .unwrap_or(defaults.blank_correction_count),
        tracking_spacing: config.tracking_spacing.unwrap_or(defaults.tracking_spacing),
        geometry_cache_dir: config
            .geometry_cache_dir
            .unwrap_or(defaults.geometry_cache_dir),
        log_file_path: config.log_file_path.unwrap_or(defaults.log_file_path),
    }
}

/// CLI flags that override configuration when explicitly set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOverrides {
    /// `--flow`.
    pub flow: Option<Flow>,
    /// `--cache-dir`.
    pub geometry_cache_dir: Option<PathBuf>,
}

/// Apply CLI argument overrides to resolved config.
///
/// Precedence chain: Defaults → Config File → Env Vars → CLI Args (highest)
pub fn apply_cli_overrides(mut config: ResolvedConfig, overrides: CliOverrides) -> ResolvedConfig {
    if let Some(flow) = overrides.flow {
        config.flow = flow;
    }

    if let Some(dir) = overrides.geometry_cache_dir {
        config.geometry_cache_dir = dir;
    }

    config
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;

#[cfg(test)]
mod path_tests {
    use super::*;

    #[test]
    fn default_log_path_ends_with_reflow_pager_log() {
        let path = default_log_path();
        assert!(
            path.to_string_lossy().ends_with("reflow-pager.log"),
            "Default log path should end with 'reflow-pager.log', got: {:?}",
            path
        );
    }

    #[test]
    fn default_cache_dir_contains_geometry() {
        let path = default_cache_dir();
        assert!(
            path.to_string_lossy().contains("geometry"),
            "Default cache dir should contain 'geometry', got: {:?}",
            path
        );
    }

    #[test]
    fn config_file_log_path_overrides_default() {
        let custom_path = PathBuf::from("/custom/path/to/app.log");
        let config_file = ConfigFile {
            log_file_path: Some(custom_path.clone()),
            ..ConfigFile::default()
        };

        let resolved = merge_config(Some(config_file));
        assert_eq!(resolved.log_file_path, custom_path);
    }

    #[test]
    fn missing_config_file_log_path_uses_default() {
        let resolved = merge_config(Some(ConfigFile::default()));
        assert_eq!(resolved.log_file_path, default_log_path());
    }
}
