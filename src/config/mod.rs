//! Configuration module.

pub mod loader;

pub use loader::{
    apply_cli_overrides, apply_env_overrides, default_cache_dir, default_config_path,
    default_log_path, load_config_file, load_config_with_precedence, merge_config, CliOverrides,
    ConfigError, ConfigFile, ResolvedConfig,
};

use std::time::Duration;

use crate::model::Flow;

/// Sentinels per observation group.
pub const DEFAULT_SENTINEL_GROUP_SIZE: usize = 50;
/// Observed groups kept alive at once.
pub const DEFAULT_MAX_ACTIVE_GROUPS: usize = 4;
/// Navigation lock watchdog.
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 400;
/// Re-attempts after an invalid extent measurement.
pub const DEFAULT_MEASURE_RETRIES: u8 = 1;
/// Upper bound on waiting for a bake to open the readiness gate.
pub const DEFAULT_READY_TIMEOUT_MS: u64 = 2_000;
/// Trailing debounce for resize and scroll notifications.
pub const DEFAULT_RESIZE_DEBOUNCE_MS: u64 = 100;
/// Tracking sections forced visible when nothing is on screen.
pub const DEFAULT_BLANK_CORRECTION_COUNT: usize = 3;

/// Tunables consumed by the pagination engine.
///
/// Derived from [`ResolvedConfig::engine`]; file paths and CLI-only settings
/// stay behind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Default flow for new layouts.
    pub flow: Flow,
    /// Column gap.
    pub gap: f64,
    /// Columns per page.
    pub max_columns: u8,
    /// Sentinels per observation group.
    pub sentinel_group_size: usize,
    /// Observed groups kept alive at once.
    pub max_active_groups: usize,
    /// Navigation lock watchdog.
    pub lock_timeout: Duration,
    /// Re-attempts after an invalid extent measurement.
    pub measure_retries: u8,
    /// Upper bound on waiting for bake readiness.
    pub ready_timeout: Duration,
    /// Trailing debounce for resize and scroll notifications.
    pub resize_debounce: Duration,
    /// Tracking sections forced visible when nothing is on screen.
    pub blank_correction_count: usize,
    /// Block-axis spacing between consecutive tracking sections.
    pub tracking_spacing: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        ResolvedConfig::default().engine()
    }
}
