use agrifield_cache::{KeyStore, keys};
use agrifield_config::ApiConfig;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::api::{ApiClient, HttpApiClient};
use crate::modules::attendance::SessionReconciler;
use crate::modules::authorization::{AuthorizationCache, AuthorizationContext};
use crate::services::{DeviceGuard, LocationProvider, PunchPrompt};

/// Host services handed to the attendance flow.
#[derive(Clone)]
pub struct Collaborators {
    pub location: Arc<dyn LocationProvider>,
    pub guard: Arc<dyn DeviceGuard>,
    pub prompt: Arc<dyn PunchPrompt>,
}

/// Handle passed to every consumer. Cloning is cheap; all clones share the
/// same authorization and attendance state.
#[derive(Clone)]
pub struct ClientState {
    pub store: Arc<dyn KeyStore>,
    pub api: Arc<dyn ApiClient>,
    pub authorization: Arc<AuthorizationContext>,
    pub attendance: Arc<SessionReconciler>,
}

impl ClientState {
    pub fn new(api: Arc<dyn ApiClient>, store: Arc<dyn KeyStore>, services: Collaborators) -> Self {
        let cache = Arc::new(AuthorizationCache::new(api.clone(), store.clone()));
        let authorization = Arc::new(AuthorizationContext::new(cache));
        let attendance = Arc::new(SessionReconciler::new(
            api.clone(),
            store.clone(),
            services.location,
            services.guard,
            services.prompt,
        ));

        Self {
            store,
            api,
            authorization,
            attendance,
        }
    }

    /// Wires the reqwest transport against `config`.
    pub fn with_http(
        config: ApiConfig,
        store: Arc<dyn KeyStore>,
        services: Collaborators,
    ) -> Result<Self, reqwest::Error> {
        let api = Arc::new(HttpApiClient::new(config, store.clone())?);
        Ok(Self::new(api, store, services))
    }

    /// Clears authorization state, forgets attendance state, then erases every
    /// session key from the store. Storage failures are logged and skipped.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        self.authorization.clear();
        self.attendance.reset();

        for key in keys::SESSION_KEYS {
            if let Err(e) = self.store.remove(key).await {
                warn!(store.key = %key, error = %e, "Failed to remove session key");
            }
        }
        info!("Session cleared");
    }
}
