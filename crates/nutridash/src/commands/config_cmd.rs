//! Config subcommand handlers.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::str::FromStr;

use dialoguer::{Input, Select};

use nutridash_config::{Defaults, TokenStoreKind};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

fn format_config(cfg: &Config) -> String {
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "insecure = {}", cfg.defaults.insecure);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);
    let _ = writeln!(out, "page_size = {}", cfg.defaults.page_size);
    let _ = writeln!(out, "search_debounce_ms = {}", cfg.defaults.search_debounce_ms);
    let _ = writeln!(out, "token_store = \"{}\"", store_name(cfg.defaults.token_store));

    let mut names: Vec<_> = cfg.profiles.iter().collect();
    names.sort_by_key(|(name, _)| *name);
    for (name, p) in names {
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "api_url = \"{}\"", p.api_url);
        if let Some(ref email) = p.email {
            let _ = writeln!(out, "email = \"{email}\"");
        }
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        if let Some(page_size) = p.page_size {
            let _ = writeln!(out, "page_size = {page_size}");
        }
        if let Some(ms) = p.search_debounce_ms {
            let _ = writeln!(out, "search_debounce_ms = {ms}");
        }
        if let Some(size) = p.crawl_page_size {
            let _ = writeln!(out, "crawl_page_size = {size}");
        }
        if let Some(size) = p.crawl_bulk_page_size {
            let _ = writeln!(out, "crawl_bulk_page_size = {size}");
        }
        if let Some(max) = p.crawl_max_pages {
            let _ = writeln!(out, "crawl_max_pages = {max}");
        }
        if let Some(ref sort) = p.sort {
            let _ = writeln!(out, "sort = \"{sort}\"");
        }
        if let Some(store) = p.token_store {
            let _ = writeln!(out, "token_store = \"{}\"", store_name(store));
        }
    }

    out
}

fn store_name(kind: TokenStoreKind) -> &'static str {
    match kind {
        TokenStoreKind::Keyring => "keyring",
        TokenStoreKind::File => "file",
    }
}

fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, CliError>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e| CliError::Validation {
        field: key.into(),
        reason: format!("{e}"),
    })
}

/// Apply `key = value` to a profile.
fn set_profile_value(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    match key.replace('-', "_").as_str() {
        "api_url" => {
            url::Url::parse(&value).map_err(|e| CliError::Validation {
                field: "api_url".into(),
                reason: e.to_string(),
            })?;
            profile.api_url = value;
        }
        "email" => profile.email = Some(value),
        "ca_cert" => profile.ca_cert = Some(PathBuf::from(value)),
        "insecure" => profile.insecure = Some(parse_value(key, &value)?),
        "timeout" => profile.timeout = Some(parse_value(key, &value)?),
        "page_size" => profile.page_size = Some(parse_value(key, &value)?),
        "search_debounce_ms" => profile.search_debounce_ms = Some(parse_value(key, &value)?),
        "crawl_page_size" => profile.crawl_page_size = Some(parse_value(key, &value)?),
        "crawl_bulk_page_size" => {
            profile.crawl_bulk_page_size = Some(parse_value(key, &value)?);
        }
        "crawl_max_pages" => profile.crawl_max_pages = Some(parse_value(key, &value)?),
        "sort" => profile.sort = Some(value),
        "token_store" => {
            profile.token_store = Some(match value.as_str() {
                "keyring" => TokenStoreKind::Keyring,
                "file" => TokenStoreKind::File,
                _ => {
                    return Err(CliError::Validation {
                        field: "token_store".into(),
                        reason: "must be 'keyring' or 'file'".into(),
                    });
                }
            });
        }
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: "unknown config key".into(),
            });
        }
    }
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(),

        ConfigCommand::Show => {
            let cfg = config::load_config_or_default();
            let out = output::render_single(&global.output, &cfg, format_config, |_| {
                config::config_path().display().to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            let profile = cfg.profiles.entry(profile_name.clone()).or_default();
            set_profile_value(profile, &key, value)?;
            let path = config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("Updated {key} on profile '{profile_name}' in {}", path.display());
            }
            Ok(())
        }

        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }
    }
}

fn init() -> Result<(), CliError> {
    let config_path = config::config_path();
    eprintln!("nutridash configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default("default".into())
        .interact_text()
        .map_err(prompt_err)?;

    let api_url: String = Input::new()
        .with_prompt("Admin API URL")
        .validate_with(|input: &String| {
            url::Url::parse(input)
                .map(|_| ())
                .map_err(|e| format!("invalid URL: {e}"))
        })
        .interact_text()
        .map_err(prompt_err)?;

    let email: String = Input::new()
        .with_prompt("Account email (optional)")
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_err)?;

    let store_choices = &[
        "System keyring (recommended)",
        "File in the data directory",
    ];
    let token_store = match Select::new()
        .with_prompt("Where should sessions be stored?")
        .items(store_choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?
    {
        0 => TokenStoreKind::Keyring,
        _ => TokenStoreKind::File,
    };

    let profile = Profile {
        api_url,
        email: (!email.trim().is_empty()).then(|| email.trim().to_owned()),
        token_store: Some(token_store),
        ..Profile::default()
    };

    let mut cfg = config::load_config_or_default();
    if cfg.profiles.is_empty() {
        cfg = Config {
            default_profile: Some(profile_name.clone()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        };
    }
    cfg.profiles.insert(profile_name.clone(), profile);
    config::save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", config_path.display());
    eprintln!("  Profile: {profile_name}");
    eprintln!("\n  Sign in: nutridash auth login --profile {profile_name}");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn set_known_keys() {
        let mut profile = Profile::default();
        set_profile_value(&mut profile, "api-url", "https://admin.test/api".into()).unwrap();
        set_profile_value(&mut profile, "page_size", "50".into()).unwrap();
        set_profile_value(&mut profile, "token_store", "file".into()).unwrap();
        assert_eq!(profile.api_url, "https://admin.test/api");
        assert_eq!(profile.page_size, Some(50));
        assert_eq!(profile.token_store, Some(TokenStoreKind::File));
    }

    #[test]
    fn set_rejects_bad_input() {
        let mut profile = Profile::default();
        assert!(set_profile_value(&mut profile, "api_url", "not a url".into()).is_err());
        assert!(set_profile_value(&mut profile, "timeout", "soon".into()).is_err());
        assert!(set_profile_value(&mut profile, "colour", "red".into()).is_err());
        assert!(profile.api_url.is_empty());
    }

    #[test]
    fn show_lists_profiles_in_order() {
        let mut cfg = Config::default();
        for name in ["zeta", "alpha"] {
            cfg.profiles.insert(
                name.into(),
                Profile {
                    api_url: format!("https://{name}.test"),
                    ..Profile::default()
                },
            );
        }
        let out = format_config(&cfg);
        let alpha = out.find("[profiles.alpha]").unwrap();
        let zeta = out.find("[profiles.zeta]").unwrap();
        assert!(alpha < zeta);
        assert!(out.contains("token_store = \"keyring\""));
    }
}
