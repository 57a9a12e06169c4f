// ── Summary statistics ──
//
// Best-effort `/overview/{resource}` loader. Failures never reach the
// caller; the panel just shows as unavailable.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};

use nutridash_api::ApiClient;

use crate::error::CoreError;
use crate::model::ResourceKind;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum StatsState {
    #[default]
    Loading,
    Loaded(Arc<Value>),
    Unavailable,
}

pub struct StatsLoader {
    api: Arc<ApiClient>,
    state: watch::Sender<StatsState>,
}

impl StatsLoader {
    pub fn new(api: Arc<ApiClient>) -> Self {
        let (state, _) = watch::channel(StatsState::Loading);
        Self { api, state }
    }

    /// Refetch the aggregate for `kind`. Returns the published state.
    pub async fn reload(&self, kind: ResourceKind) -> StatsState {
        self.state.send_replace(StatsState::Loading);
        let next = match self.api.overview(kind.path()).await {
            Ok(value) => {
                debug!(%kind, "stats loaded");
                StatsState::Loaded(Arc::new(value))
            }
            Err(err) => {
                let err = CoreError::from(err);
                warn!(%kind, error = %err, "stats unavailable");
                StatsState::Unavailable
            }
        };
        self.state.send_replace(next.clone());
        next
    }

    pub fn state(&self) -> StatsState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<StatsState> {
        self.state.subscribe()
    }
}
