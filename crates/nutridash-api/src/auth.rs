// Bearer-token session state
//
// The token pair lives outside this crate (keyring, file, memory); the
// client reads it before every request and writes it after a refresh.
// `RefreshGate` makes sure concurrent 401s share a single refresh call.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use tokio::sync::watch;

use crate::error::Error;

/// Access + refresh token pair issued by `/auths/login` or `/auths/refresh`.
#[derive(Clone)]
pub struct TokenPair {
    pub access_token: SecretString,
    pub access_expires_at: Option<DateTime<Utc>>,
    pub refresh_token: SecretString,
    pub refresh_expires_at: Option<DateTime<Utc>>,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            access_expires_at: None,
            refresh_token: SecretString::from(refresh_token.into()),
            refresh_expires_at: None,
        }
    }

    /// `true` once the access token's advertised expiry has passed.
    pub fn access_expired(&self, now: DateTime<Utc>) -> bool {
        self.access_expires_at.is_some_and(|at| at <= now)
    }

    /// `true` once the refresh token's advertised expiry has passed.
    pub fn refresh_expired(&self, now: DateTime<Utc>) -> bool {
        self.refresh_expires_at.is_some_and(|at| at <= now)
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"[REDACTED]")
            .field("access_expires_at", &self.access_expires_at)
            .field("refresh_token", &"[REDACTED]")
            .field("refresh_expires_at", &self.refresh_expires_at)
            .finish()
    }
}

/// Persisted storage for the session's token pair.
///
/// Implementations must be cheap to call; the client invokes `load`
/// before every request.
pub trait TokenStore: Send + Sync {
    /// Current token pair, or `None` when logged out.
    fn load(&self) -> Option<TokenPair>;

    /// Replace the stored pair.
    fn save(&self, tokens: &TokenPair) -> Result<(), Error>;

    /// Forget the stored pair.
    fn clear(&self) -> Result<(), Error>;
}

/// Process-local token store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<Option<TokenPair>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: TokenPair) -> Self {
        Self {
            tokens: Mutex::new(Some(tokens)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<TokenPair> {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn save(&self, tokens: &TokenPair) -> Result<(), Error> {
        *self.tokens.lock().unwrap_or_else(PoisonError::into_inner) = Some(tokens.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), Error> {
        *self.tokens.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

// ── Single-flight refresh ───────────────────────────────────────────

#[derive(Clone)]
pub(crate) enum RefreshOutcome {
    Pending,
    Refreshed(SecretString),
    Failed,
}

/// What a 401'd request should do about the token.
pub(crate) enum RefreshRole {
    /// Another request is refreshing; wait for its outcome.
    Waiter(watch::Receiver<RefreshOutcome>),
    /// This request performs the refresh and publishes the outcome.
    Refresher(watch::Sender<RefreshOutcome>),
}

#[derive(Default)]
pub(crate) struct RefreshGate {
    inflight: Mutex<Option<watch::Receiver<RefreshOutcome>>>,
}

impl RefreshGate {
    /// Join the in-flight refresh, or become the refresher.
    pub(crate) fn enter(&self) -> RefreshRole {
        let mut slot = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(rx) = slot.as_ref() {
            return RefreshRole::Waiter(rx.clone());
        }
        let (tx, rx) = watch::channel(RefreshOutcome::Pending);
        *slot = Some(rx);
        RefreshRole::Refresher(tx)
    }

    /// Release the slot so the next 401 starts a fresh refresh.
    pub(crate) fn leave(&self) {
        *self.inflight.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Clears the gate slot when the refresher finishes or is dropped.
///
/// If the refresher's future is cancelled mid-flight, its sender drops
/// and every waiter observes a closed channel, which counts as failure.
pub(crate) struct RefreshSlotGuard<'a>(pub(crate) &'a RefreshGate);

impl Drop for RefreshSlotGuard<'_> {
    fn drop(&mut self) {
        self.0.leave();
    }
}

/// Wait for the refresher to publish a terminal outcome.
pub(crate) async fn await_outcome(mut rx: watch::Receiver<RefreshOutcome>) -> Option<SecretString> {
    let outcome = rx
        .wait_for(|o| !matches!(o, RefreshOutcome::Pending))
        .await
        .map(|o| (*o).clone());
    match outcome {
        Ok(RefreshOutcome::Refreshed(token)) => Some(token),
        _ => None,
    }
}
