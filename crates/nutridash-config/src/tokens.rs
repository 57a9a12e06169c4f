// Persisted session tokens
//
// Both stores keep the pair as a small JSON document. Lookup failures
// degrade to "signed out" with a warning; the API client then sends
// requests unauthenticated and the backend answers 401.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use nutridash_api::{Error as ApiError, TokenPair, TokenStore};

use crate::ConfigError;

const KEYRING_SERVICE: &str = "nutridash";

/// Serialized form of a token pair.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredTokens {
    access_token: String,
    #[serde(default)]
    access_expires_at: Option<DateTime<Utc>>,
    refresh_token: String,
    #[serde(default)]
    refresh_expires_at: Option<DateTime<Utc>>,
}

impl From<&TokenPair> for StoredTokens {
    fn from(pair: &TokenPair) -> Self {
        Self {
            access_token: pair.access_token.expose_secret().to_owned(),
            access_expires_at: pair.access_expires_at,
            refresh_token: pair.refresh_token.expose_secret().to_owned(),
            refresh_expires_at: pair.refresh_expires_at,
        }
    }
}

impl From<StoredTokens> for TokenPair {
    fn from(stored: StoredTokens) -> Self {
        Self {
            access_token: SecretString::from(stored.access_token),
            access_expires_at: stored.access_expires_at,
            refresh_token: SecretString::from(stored.refresh_token),
            refresh_expires_at: stored.refresh_expires_at,
        }
    }
}

fn store_error(err: impl Into<ConfigError>) -> ApiError {
    ApiError::TokenStore(err.into().to_string())
}

// ── Keyring ─────────────────────────────────────────────────────────

/// Tokens in the OS keyring under `nutridash` / `{profile}/tokens`.
#[derive(Debug, Clone)]
pub struct KeyringTokenStore {
    profile: String,
}

impl KeyringTokenStore {
    pub fn new(profile: &str) -> Self {
        Self {
            profile: profile.to_owned(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry, keyring::Error> {
        keyring::Entry::new(KEYRING_SERVICE, &format!("{}/tokens", self.profile))
    }
}

impl TokenStore for KeyringTokenStore {
    fn load(&self) -> Option<TokenPair> {
        let secret = match self.entry().and_then(|entry| entry.get_password()) {
            Ok(secret) => secret,
            Err(keyring::Error::NoEntry) => return None,
            Err(err) => {
                warn!(profile = %self.profile, error = %err, "keyring lookup failed");
                return None;
            }
        };
        match serde_json::from_str::<StoredTokens>(&secret) {
            Ok(stored) => Some(stored.into()),
            Err(err) => {
                warn!(profile = %self.profile, error = %err, "ignoring malformed keyring entry");
                None
            }
        }
    }

    fn save(&self, tokens: &TokenPair) -> Result<(), ApiError> {
        let json = serde_json::to_string(&StoredTokens::from(tokens)).map_err(store_error)?;
        self.entry()
            .and_then(|entry| entry.set_password(&json))
            .map_err(store_error)?;
        debug!(profile = %self.profile, "session saved to keyring");
        Ok(())
    }

    fn clear(&self) -> Result<(), ApiError> {
        match self.entry().and_then(|entry| entry.delete_credential()) {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(store_error(err)),
        }
    }
}

// ── File ────────────────────────────────────────────────────────────

/// Tokens in a JSON file, readable only by the owner on Unix.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `{data_dir}/sessions/{profile}.json`
    pub fn for_profile(profile: &str) -> Self {
        Self::new(crate::data_dir().join("sessions").join(format!("{profile}.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, contents: &str) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;
        std::io::Write::write_all(&mut file, contents.as_bytes())?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<TokenPair> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "cannot read session file");
                return None;
            }
        };
        match serde_json::from_str::<StoredTokens>(&raw) {
            Ok(stored) => Some(stored.into()),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "ignoring malformed session file");
                None
            }
        }
    }

    fn save(&self, tokens: &TokenPair) -> Result<(), ApiError> {
        let json =
            serde_json::to_string_pretty(&StoredTokens::from(tokens)).map_err(store_error)?;
        self.write(&json).map_err(store_error)?;
        debug!(path = %self.path.display(), "session saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), ApiError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(store_error(err)),
        }
    }
}
