//! Shared configuration for nutridash tools.
//!
//! TOML profiles layered with environment overrides, persisted token
//! stores (keyring or file), and translation to
//! `nutridash_core::DashboardConfig`.

mod tokens;

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use nutridash_api::TokenStore;
use nutridash_core::{CrawlSettings, DashboardConfig, TlsVerification};

pub use tokens::{FileTokenStore, KeyringTokenStore};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("unknown profile '{profile}'")]
    UnknownProfile { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("invalid stored session: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Profile name to use when none is given on the command line.
    pub fn active_profile_name(&self) -> &str {
        self.default_profile.as_deref().unwrap_or("default")
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }
}

/// Where a profile's session tokens are persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStoreKind {
    /// OS keychain / secret service.
    #[default]
    Keyring,
    /// JSON file under the platform data directory.
    File,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default)]
    pub insecure: bool,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_page_size")]
    pub page_size: usize,

    #[serde(default = "default_debounce_ms")]
    pub search_debounce_ms: u64,

    #[serde(default)]
    pub token_store: TokenStoreKind,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            insecure: false,
            timeout: default_timeout(),
            page_size: default_page_size(),
            search_debounce_ms: default_debounce_ms(),
            token_store: TokenStoreKind::default(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    15
}
fn default_page_size() -> usize {
    20
}
fn default_debounce_ms() -> u64 {
    300
}

/// A named backend profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Admin API base URL (e.g., "https://admin.example.com/api/v1").
    pub api_url: String,

    /// Account email used by `auth login` when none is given.
    pub email: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout (seconds).
    pub timeout: Option<u64>,

    /// Rows per visible page.
    pub page_size: Option<usize>,

    pub search_debounce_ms: Option<u64>,

    /// Crawl page size after the bulk size is refused.
    pub crawl_page_size: Option<u32>,

    /// Page size of the first crawl request.
    pub crawl_bulk_page_size: Option<u32>,

    /// Pages fetched before a crawl is declared incomplete.
    pub crawl_max_pages: Option<u32>,

    /// Listing `sort` parameter, e.g. "name,asc".
    pub sort: Option<String>,

    pub token_store: Option<TokenStoreKind>,
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "nutridash", "nutridash")
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("nutridash");
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Directory holding file-backed sessions.
pub fn data_dir() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("data"),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load defaults, then `path` (if it exists), then `NUTRIDASH_*` env vars.
///
/// Nested keys use a double underscore:
/// `NUTRIDASH_PROFILES__STAGING__API_URL`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("NUTRIDASH_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `DashboardConfig` from a profile, falling back to `defaults`.
pub fn profile_to_dashboard_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<DashboardConfig, ConfigError> {
    let api_url: url::Url = profile
        .api_url
        .parse()
        .map_err(|e| ConfigError::Validation {
            field: "api_url".into(),
            reason: format!("invalid URL '{}': {e}", profile.api_url),
        })?;

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let page_size = profile.page_size.unwrap_or(defaults.page_size);
    let page_size = NonZeroUsize::new(page_size).ok_or_else(|| ConfigError::Validation {
        field: "page_size".into(),
        reason: "must be at least 1".into(),
    })?;

    let fallback = CrawlSettings::default();
    let crawl = CrawlSettings {
        bulk_page_size: positive(
            "crawl_bulk_page_size",
            profile.crawl_bulk_page_size,
            fallback.bulk_page_size,
        )?,
        page_size: positive(
            "crawl_page_size",
            profile.crawl_page_size,
            fallback.page_size,
        )?,
        max_pages: positive(
            "crawl_max_pages",
            profile.crawl_max_pages,
            fallback.max_pages,
        )?,
    };

    let mut config = DashboardConfig::new(api_url);
    config.tls = tls;
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.page_size = page_size;
    config.search_debounce = Duration::from_millis(
        profile
            .search_debounce_ms
            .unwrap_or(defaults.search_debounce_ms),
    );
    config.crawl = crawl;
    config.sort.clone_from(&profile.sort);
    Ok(config)
}

fn positive(field: &str, value: Option<u32>, fallback: u32) -> Result<u32, ConfigError> {
    match value {
        Some(0) => Err(ConfigError::Validation {
            field: field.into(),
            reason: "must be at least 1".into(),
        }),
        Some(v) => Ok(v),
        None => Ok(fallback),
    }
}

/// The token store a profile is configured to use.
pub fn token_store_for(
    profile_name: &str,
    profile: Option<&Profile>,
    defaults: &Defaults,
) -> Arc<dyn TokenStore> {
    let kind = profile
        .and_then(|p| p.token_store)
        .unwrap_or(defaults.token_store);
    match kind {
        TokenStoreKind::Keyring => Arc::new(KeyringTokenStore::new(profile_name)),
        TokenStoreKind::File => Arc::new(FileTokenStore::for_profile(profile_name)),
    }
}
