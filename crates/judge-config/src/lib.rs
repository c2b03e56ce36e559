// judge-config/src/lib.rs
// ============================================================================
// Module: Daemon Configuration
// Description: Loads and validates judge-daemon-wide settings: sandbox
//              root, per-language command table, default resource
//              ceilings, cache connection string, debug-cleanup flag.
// Purpose: The reference configuration layer (§3 / §6).
// Dependencies: serde, toml, thiserror
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with documented defaults; a
//! missing file section falls back to its default rather than failing the
//! load, but a malformed value still fails closed. The cache connection
//! string is the only setting an environment variable may override
//! (`JUDGE_CACHE_URL`, read by the caller at startup per §6) — every other
//! setting comes from this file alone, so test tooling can point at a
//! throwaway config without touching the process environment.

#![allow(clippy::missing_errors_doc, reason = "error docs live on ConfigError itself")]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "judge.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "JUDGE_CONFIG";
/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Judge daemon-wide configuration, loaded once at process start.
#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    /// Sandbox and scratch-workspace settings.
    #[serde(default)]
    pub sandbox: SandboxConfig,
    /// Per-language compile/run command table.
    #[serde(default)]
    pub languages: LanguageTableConfig,
    /// Default resource ceilings applied when a request omits them.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Progress cache connection settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// When true, scratch workspaces are retained after judging instead
    /// of being cleaned up — for post-mortem debugging only.
    #[serde(default)]
    pub keep_workspaces: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            sandbox: SandboxConfig::default(),
            languages: LanguageTableConfig::default(),
            limits: LimitsConfig::default(),
            cache: CacheConfig::default(),
            keep_workspaces: false,
        }
    }
}

impl DaemonConfig {
    /// Loads configuration from disk using the default resolution rules:
    /// an explicit `path`, else [`CONFIG_ENV_VAR`], else [`DEFAULT_CONFIG_NAME`]
    /// in the current directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, exceeds the
    /// size limit, is not valid UTF-8 TOML, or fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes).map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self = toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when any section is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sandbox.validate()?;
        self.languages.validate()?;
        self.limits.validate()?;
        self.cache.validate()?;
        Ok(())
    }

    /// Returns the cache connection string, honoring an environment
    /// override of `env_var` (typically [`judge_cache_redis::CACHE_URL_ENV`])
    /// over the configured value.
    #[must_use]
    pub fn cache_url(&self, env_var: &str) -> String {
        env::var(env_var).unwrap_or_else(|_| self.cache.url.clone())
    }
}

/// Sandbox and scratch-workspace settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SandboxConfig {
    /// Root directory beneath which per-fingerprint scratch workspaces
    /// and the fingerprint store are rooted.
    #[serde(default = "default_sandbox_root")]
    pub root: PathBuf,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self { root: default_sandbox_root() }
    }
}

impl SandboxConfig {
    /// Validates sandbox configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("sandbox.root", &self.root.to_string_lossy())
    }
}

/// Default sandbox root: a `judge-sandbox` directory under the current
/// working directory.
fn default_sandbox_root() -> PathBuf {
    PathBuf::from("judge-sandbox")
}

/// A single language's compile/run command templates, as read from TOML.
///
/// `{src}` and `{artifact}` placeholders are substituted by the
/// submission builder at compile/run time.
#[derive(Debug, Clone, Deserialize)]
pub struct LanguageEntryConfig {
    /// Shell-style compile command template, or absent for interpreted
    /// languages that have no compile step.
    #[serde(default)]
    pub compile_command: Option<String>,
    /// Shell-style run command template.
    pub run_command: String,
    /// Source file name written into the scratch workspace.
    pub source_file: String,
    /// Artifact file name produced by compilation, or executed directly
    /// for interpreted languages.
    pub artifact_file: String,
}

impl LanguageEntryConfig {
    /// Validates a single language entry.
    fn validate(&self, tag: &str) -> Result<(), ConfigError> {
        if self.run_command.trim().is_empty() {
            return Err(ConfigError::Invalid(format!("languages.{tag}.run_command must be non-empty")));
        }
        if self.source_file.trim().is_empty() {
            return Err(ConfigError::Invalid(format!("languages.{tag}.source_file must be non-empty")));
        }
        if self.artifact_file.trim().is_empty() {
            return Err(ConfigError::Invalid(format!("languages.{tag}.artifact_file must be non-empty")));
        }
        if let Some(compile_command) = &self.compile_command
            && compile_command.trim().is_empty()
        {
            return Err(ConfigError::Invalid(format!("languages.{tag}.compile_command must be non-empty when present")));
        }
        Ok(())
    }
}

/// Per-language command table, keyed by language tag (e.g. `cpp17`).
#[derive(Debug, Clone, Deserialize)]
pub struct LanguageTableConfig {
    /// Language entries, keyed by tag.
    #[serde(flatten)]
    pub entries: BTreeMap<String, LanguageEntryConfig>,
}

impl Default for LanguageTableConfig {
    fn default() -> Self {
        Self { entries: default_language_entries() }
    }
}

impl LanguageTableConfig {
    /// Validates every language entry.
    fn validate(&self) -> Result<(), ConfigError> {
        for (tag, entry) in &self.entries {
            if tag.trim().is_empty() {
                return Err(ConfigError::Invalid("language tag must be non-empty".to_string()));
            }
            entry.validate(tag)?;
        }
        Ok(())
    }
}

/// Built-in language entries used when a config file omits `[languages]`
/// entirely, mirroring `judge-providers`'s own `LanguageRegistry` defaults
/// so a daemon with no language configuration still judges the common
/// cases out of the box.
fn default_language_entries() -> BTreeMap<String, LanguageEntryConfig> {
    let mut entries = BTreeMap::new();
    entries.insert(
        "cpp17".to_string(),
        LanguageEntryConfig {
            compile_command: Some("g++ -O2 -std=c++17 -o {artifact} {src}".to_string()),
            run_command: "{artifact}".to_string(),
            source_file: "main.cpp".to_string(),
            artifact_file: "main".to_string(),
        },
    );
    entries.insert(
        "c11".to_string(),
        LanguageEntryConfig {
            compile_command: Some("gcc -O2 -std=c11 -o {artifact} {src}".to_string()),
            run_command: "{artifact}".to_string(),
            source_file: "main.c".to_string(),
            artifact_file: "main".to_string(),
        },
    );
    entries.insert(
        "python3".to_string(),
        LanguageEntryConfig {
            compile_command: None,
            run_command: "/usr/bin/env python3 {src}".to_string(),
            source_file: "main.py".to_string(),
            artifact_file: "main.py".to_string(),
        },
    );
    entries
}

/// Default resource ceilings applied when a request omits its own.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LimitsConfig {
    /// Default wall-time ceiling in milliseconds.
    #[serde(default = "default_max_time_ms")]
    pub max_time_ms: u64,
    /// Default memory ceiling in kilobytes.
    #[serde(default = "default_max_memory_kb")]
    pub max_memory_kb: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self { max_time_ms: default_max_time_ms(), max_memory_kb: default_max_memory_kb() }
    }
}

impl LimitsConfig {
    /// Validates default resource ceilings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_time_ms == 0 {
            return Err(ConfigError::Invalid("limits.max_time_ms must be greater than zero".to_string()));
        }
        if self.max_memory_kb == 0 {
            return Err(ConfigError::Invalid("limits.max_memory_kb must be greater than zero".to_string()));
        }
        Ok(())
    }
}

/// Default wall-time ceiling: 10 seconds.
const fn default_max_time_ms() -> u64 {
    10_000
}

/// Default memory ceiling: 256 MiB.
const fn default_max_memory_kb() -> u64 {
    262_144
}

/// Progress cache connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Cache connection string, overridable at startup by an environment
    /// variable per §6.
    #[serde(default = "default_cache_url")]
    pub url: String,
    /// Snapshot TTL in seconds applied to every cache publish.
    #[serde(default = "default_snapshot_ttl_secs")]
    pub snapshot_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { url: default_cache_url(), snapshot_ttl_secs: default_snapshot_ttl_secs() }
    }
}

impl CacheConfig {
    /// Validates cache configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::Invalid("cache.url must be non-empty".to_string()));
        }
        if self.snapshot_ttl_secs == 0 {
            return Err(ConfigError::Invalid("cache.snapshot_ttl_secs must be greater than zero".to_string()));
        }
        Ok(())
    }
}

/// Default cache connection string: loopback host, Redis's default port.
fn default_cache_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

/// Default snapshot TTL: five minutes, generous relative to typical
/// judging wall-clock time so a slow poller still observes the final
/// snapshot.
const fn default_snapshot_ttl_secs() -> u64 {
    300
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path-shaped string field against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    Ok(())
}

#[cfg(test)]
#[allow(
    unsafe_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::missing_docs_in_private_items,
    reason = "test assertions use panic-based helpers for clarity; env var mutation is test-only"
)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate_cleanly() {
        let config = DaemonConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.languages.entries.contains_key("cpp17"));
    }

    #[test]
    fn loads_minimal_toml_with_documented_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config_path = dir.path().join("judge.toml");
        std::fs::write(&config_path, "keep_workspaces = true\n").expect("write");
        let config = DaemonConfig::load(Some(&config_path)).expect("loads");
        assert!(config.keep_workspaces);
        assert_eq!(config.limits.max_time_ms, default_max_time_ms());
        assert_eq!(config.cache.url, default_cache_url());
    }

    #[test]
    fn rejects_empty_run_command() {
        let toml_text = "[languages.broken]\nrun_command = \"\"\nsource_file = \"main.x\"\nartifact_file = \"main\"\n";
        let dir = tempfile::tempdir().expect("tempdir");
        let config_path = dir.path().join("judge.toml");
        std::fs::write(&config_path, toml_text).expect("write");
        assert!(matches!(DaemonConfig::load(Some(&config_path)), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("absent.toml");
        assert!(matches!(DaemonConfig::load(Some(&missing)), Err(ConfigError::Io(_))));
    }

    #[test]
    fn cache_url_env_override_takes_precedence() {
        let config = DaemonConfig::default();
        // SAFETY: test-only; no other test in this process reads this key.
        unsafe {
            std::env::set_var("JUDGE_CONFIG_TEST_CACHE_URL", "redis://example.invalid:6379");
        }
        let resolved = config.cache_url("JUDGE_CONFIG_TEST_CACHE_URL");
        assert_eq!(resolved, "redis://example.invalid:6379");
        // SAFETY: test-only cleanup.
        unsafe {
            std::env::remove_var("JUDGE_CONFIG_TEST_CACHE_URL");
        }
    }
}
