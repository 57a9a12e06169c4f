//! CLI configuration: a thin wrapper around `nutridash_config`.
//!
//! Re-exports the shared types and adds resolution that respects
//! `GlobalOpts` flag overrides (--api-url, --insecure, --timeout).

use std::sync::Arc;

use nutridash_api::TokenStore;
use nutridash_core::{DashboardConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use nutridash_config::{Config, Profile, config_path, load_config_or_default, save_config};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .unwrap_or_else(|| config.active_profile_name().to_owned())
}

/// Everything a network command needs to build a `Dashboard`.
pub struct Resolved {
    pub profile_name: String,
    pub profile: Profile,
    pub dashboard: DashboardConfig,
    pub tokens: Arc<dyn TokenStore>,
}

/// Translate config file, profile, and global flags into a `DashboardConfig`.
///
/// Flag overrides take priority over profile values. Without a matching
/// profile, `--api-url` alone is enough; an explicitly requested profile
/// that doesn't exist is an error.
pub fn resolve(global: &GlobalOpts) -> Result<Resolved, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let mut profile = match (cfg.profiles.get(&profile_name), &global.api_url) {
        (Some(profile), _) => profile.clone(),
        (None, Some(url)) => Profile {
            api_url: url.clone(),
            ..Profile::default()
        },
        (None, None) if global.profile.is_some() => {
            let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
            available.sort();
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            });
        }
        (None, None) => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    if let Some(ref url) = global.api_url {
        profile.api_url.clone_from(url);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }

    let mut dashboard = nutridash_config::profile_to_dashboard_config(&profile, &cfg.defaults)?;
    if global.insecure {
        dashboard.tls = TlsVerification::DangerAcceptInvalid;
    }

    let tokens = nutridash_config::token_store_for(&profile_name, Some(&profile), &cfg.defaults);

    Ok(Resolved {
        profile_name,
        profile,
        dashboard,
        tokens,
    })
}

/// The token store for the active profile, without requiring an API URL.
pub fn token_store(global: &GlobalOpts) -> (String, Arc<dyn TokenStore>) {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);
    let store =
        nutridash_config::token_store_for(&profile_name, cfg.profiles.get(&profile_name), &cfg.defaults);
    (profile_name, store)
}
