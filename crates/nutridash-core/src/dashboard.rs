// ── Dashboard ──
//
// Application-session owner: one API client, one collection cache, one
// root cancellation token. Everything else borrows from here.

use std::sync::Arc;

use secrecy::SecretString;
use strum::IntoEnumIterator;
use tokio_util::sync::CancellationToken;
use tracing::info;

use nutridash_api::transport::{TlsMode, TransportConfig};
use nutridash_api::{ApiClient, TokenPair, TokenStore};

use crate::config::{DashboardConfig, TlsVerification};
use crate::error::CoreError;
use crate::model::ResourceKind;
use crate::mutations::Mutator;
use crate::paging::PagedFetcher;
use crate::search::SearchController;
use crate::session::ListSession;
use crate::stats::StatsLoader;
use crate::store::CollectionCache;

/// Cheaply cloneable via `Arc<DashboardInner>`.
#[derive(Clone)]
pub struct Dashboard {
    inner: Arc<DashboardInner>,
}

struct DashboardInner {
    config: DashboardConfig,
    api: Arc<ApiClient>,
    cache: Arc<CollectionCache>,
    cancel: CancellationToken,
}

impl Dashboard {
    pub fn new(config: DashboardConfig, tokens: Arc<dyn TokenStore>) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            tls: tls_to_transport(&config.tls),
            timeout: config.timeout,
        };
        let api = ApiClient::new(config.api_url.as_str(), &transport, tokens)?;
        Ok(Self::with_api(config, Arc::new(api)))
    }

    /// Wrap an already-built API client.
    pub fn with_api(config: DashboardConfig, api: Arc<ApiClient>) -> Self {
        let cache = Arc::new(CollectionCache::new(
            Arc::clone(&api),
            config.crawl,
            config.sort.clone(),
        ));
        Self {
            inner: Arc::new(DashboardInner {
                config,
                api,
                cache,
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.inner.config
    }

    pub fn api(&self) -> &Arc<ApiClient> {
        &self.inner.api
    }

    pub fn cache(&self) -> &Arc<CollectionCache> {
        &self.inner.cache
    }

    pub fn fetcher(&self) -> PagedFetcher {
        PagedFetcher::new(Arc::clone(&self.inner.cache))
    }

    pub fn mutator(&self) -> Mutator {
        Mutator::new(Arc::clone(&self.inner.api), Arc::clone(&self.inner.cache))
    }

    pub fn stats(&self) -> StatsLoader {
        StatsLoader::new(Arc::clone(&self.inner.api))
    }

    /// Child of the dashboard's root token; cancelled by [`shutdown`](Self::shutdown).
    pub fn child_token(&self) -> CancellationToken {
        self.inner.cancel.child_token()
    }

    /// A list session for `kind`. Nothing is fetched until
    /// [`ListSession::load_first_page`] is called.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn session(&self, kind: ResourceKind) -> ListSession {
        let cancel = self.child_token();
        let search = SearchController::new(
            Arc::clone(&self.inner.api),
            self.inner.config.search_debounce,
            cancel.clone(),
        );
        ListSession::new(
            kind,
            self.fetcher(),
            self.mutator(),
            search,
            self.stats(),
            self.inner.config.page_size,
            cancel,
        )
    }

    // ── Auth ─────────────────────────────────────────────────────────

    pub async fn login(&self, email: &str, password: &SecretString) -> Result<TokenPair, CoreError> {
        let pair = self.inner.api.login(email, password).await?;
        info!(url = %self.inner.config.api_url, "signed in");
        Ok(pair)
    }

    /// Forget the stored session. Cached collections are dropped too.
    pub fn logout(&self) -> Result<(), CoreError> {
        self.inner.api.logout()?;
        for kind in ResourceKind::iter() {
            self.inner.cache.invalidate(kind);
        }
        Ok(())
    }

    /// Currently stored token pair, if signed in.
    pub fn tokens(&self) -> Option<TokenPair> {
        self.inner.api.token_store().load()
    }

    /// Cancel every session, search, and crawl started from this dashboard.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
