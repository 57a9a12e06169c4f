// ── Runtime dashboard configuration ──
//
// These types describe *how* to talk to the admin backend and how the
// list layer pages, crawls, and debounces. They never touch disk: the
// CLI (or any other front end) builds a `DashboardConfig` and hands it in.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Additional CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (local development backends).
    DangerAcceptInvalid,
}

/// Cache crawl tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlSettings {
    /// Page size of the first, optimistic request.
    pub bulk_page_size: u32,
    /// Page size used when the backend refuses the bulk size.
    pub page_size: u32,
    /// Maximum pages fetched before the crawl is declared incomplete.
    pub max_pages: u32,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            bulk_page_size: 1000,
            page_size: 100,
            max_pages: 100,
        }
    }
}

/// Configuration for one dashboard session.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Backend base URL, e.g. `https://admin.example.com/api/v1/`.
    pub api_url: Url,
    pub tls: TlsVerification,
    /// Per-request ceiling.
    pub timeout: Duration,
    /// Items per visible page.
    pub page_size: NonZeroUsize,
    /// Quiet period after the last keystroke before a search is sent.
    pub search_debounce: Duration,
    pub crawl: CrawlSettings,
    /// Optional `sort` parameter passed to listing endpoints.
    pub sort: Option<String>,
}

impl DashboardConfig {
    pub const DEFAULT_PAGE_SIZE: NonZeroUsize = NonZeroUsize::MIN.saturating_add(19);
    pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            tls: TlsVerification::default(),
            timeout: Self::DEFAULT_TIMEOUT,
            page_size: Self::DEFAULT_PAGE_SIZE,
            search_debounce: Self::DEFAULT_DEBOUNCE,
            crawl: CrawlSettings::default(),
            sort: None,
        }
    }
}
