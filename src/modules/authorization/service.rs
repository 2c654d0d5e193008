//! Authorization cache.
//!
//! Owns the current permission snapshot and is the only component that
//! performs permission network and storage I/O. Readers get an
//! `Arc<AuthorizationSnapshot>`; a refresh builds a new snapshot and swaps it
//! in through a `watch` channel, so a reader never sees a half-applied update.

use agrifield_cache::{KeyStore, codec, keys};
use agrifield_core::{Action, ErrorKind, Module};
use agrifield_models::{AuthorizationSnapshot, Grant, UserProfile};
use agrifield_observability::metrics;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, instrument, warn};

use crate::api::ApiClient;

use super::model::{AuthorizationError, FetchOutcome, SnapshotSource};

/// Snapshot and profile published together.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedAuthorization {
    pub snapshot: Arc<AuthorizationSnapshot>,
    pub profile: Option<UserProfile>,
}

/// Result of the most recent completed fetch, handed to callers that were
/// waiting on it.
#[derive(Default)]
struct Flight {
    generation: u64,
    last: Option<Result<FetchOutcome, AuthorizationError>>,
}

pub struct AuthorizationCache {
    api: Arc<dyn ApiClient>,
    store: Arc<dyn KeyStore>,
    current: watch::Sender<Option<CachedAuthorization>>,
    flight: Mutex<Flight>,
    /// Mirrors `Flight::generation`, readable without the lock.
    completed: AtomicU64,
    /// Bumped by `clear`; a fetch that started before a clear does not publish.
    epoch: AtomicU64,
}

impl AuthorizationCache {
    pub fn new(api: Arc<dyn ApiClient>, store: Arc<dyn KeyStore>) -> Self {
        Self {
            api,
            store,
            current: watch::Sender::new(None),
            flight: Mutex::new(Flight::default()),
            completed: AtomicU64::new(0),
            epoch: AtomicU64::new(0),
        }
    }

    /// Loads permissions from the server, falling back to the persisted
    /// snapshot and then to the all-denied default.
    ///
    /// Single-flight: callers that arrive while a fetch is running wait for it
    /// and receive its result without another request.
    ///
    /// # Errors
    ///
    /// Only [`AuthorizationError::Unauthorized`], after the in-memory state has
    /// been cleared.
    #[instrument(skip(self))]
    pub async fn fetch(&self) -> Result<FetchOutcome, AuthorizationError> {
        let observed = self.completed.load(Ordering::Acquire);
        let mut flight = self.flight.lock().await;

        if flight.generation != observed
            && let Some(result) = flight.last.clone()
        {
            debug!("Joined in-flight permission fetch");
            return result;
        }

        let result = self.fetch_uncoalesced().await;

        flight.generation += 1;
        flight.last = Some(result.clone());
        self.completed.store(flight.generation, Ordering::Release);
        result
    }

    async fn fetch_uncoalesced(&self) -> Result<FetchOutcome, AuthorizationError> {
        let epoch = self.epoch.load(Ordering::Acquire);

        let error = match self.api.fetch_permissions().await {
            Ok(response) => {
                let normalized = response.normalize();
                for module in &normalized.unknown_modules {
                    debug!(module = %module, "Ignoring unknown module");
                }
                for action in &normalized.unknown_actions {
                    debug!(action = %action, "Ignoring unknown action");
                }

                let snapshot = Arc::new(normalized.snapshot);
                let profile = normalized.profile;
                if self.publish(epoch, snapshot.clone(), profile.clone()) {
                    self.persist(epoch, &snapshot, profile.as_ref()).await;
                }

                info!(
                    modules = snapshot.enabled_modules().len(),
                    is_admin = profile.as_ref().is_some_and(|p| p.is_admin),
                    "Permissions loaded"
                );
                metrics::track_permission_fetch(SnapshotSource::Live.as_str());
                return Ok(FetchOutcome {
                    snapshot,
                    profile,
                    source: SnapshotSource::Live,
                    failure: None,
                });
            }
            Err(e) => e,
        };

        let kind = error.kind();
        if kind == ErrorKind::Unauthorized {
            warn!(error = %error, "Permission fetch unauthorized, clearing cache");
            self.clear();
            metrics::track_permission_fetch("unauthorized");
            return Err(AuthorizationError::Unauthorized);
        }

        warn!(error = %error, kind = %kind, "Permission fetch failed, using fallback");

        let (snapshot, profile, source) = match self.load_persisted().await {
            Some(persisted) => (
                Arc::new(persisted.snapshot),
                persisted.profile,
                SnapshotSource::Persisted,
            ),
            None => (
                Arc::new(AuthorizationSnapshot::all_denied()),
                None,
                SnapshotSource::Default,
            ),
        };
        self.publish(epoch, snapshot.clone(), profile.clone());

        debug!(source = source.as_str(), "Fallback permissions installed");
        metrics::track_permission_fetch(source.as_str());
        Ok(FetchOutcome {
            snapshot,
            profile,
            source,
            failure: Some(kind),
        })
    }

    /// Swaps in a new snapshot unless the cache was cleared since `epoch`.
    fn publish(
        &self,
        epoch: u64,
        snapshot: Arc<AuthorizationSnapshot>,
        profile: Option<UserProfile>,
    ) -> bool {
        if !self.is_current(epoch) {
            debug!("Cache cleared during fetch, discarding result");
            return false;
        }
        self.current
            .send_replace(Some(CachedAuthorization { snapshot, profile }));
        true
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::Acquire) == epoch
    }

    /// Writes the compressed snapshot. A write that lands after a `clear` is
    /// removed again.
    async fn persist(
        &self,
        epoch: u64,
        snapshot: &AuthorizationSnapshot,
        profile: Option<&UserProfile>,
    ) {
        let encoded = match codec::encode(snapshot, profile) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(error = %e, "Failed to encode permission snapshot");
                return;
            }
        };
        if !self.is_current(epoch) {
            return;
        }
        if let Err(e) = self.store.set(keys::PERMISSIONS_SNAPSHOT, &encoded).await {
            warn!(error = %e, kind = %e.kind(), "Failed to persist permission snapshot");
        }
        if !self.is_current(epoch) {
            debug!("Cache cleared during persist, removing snapshot");
            if let Err(e) = self.store.remove(keys::PERMISSIONS_SNAPSHOT).await {
                warn!(error = %e, "Failed to remove stale permission snapshot");
            }
        }
    }

    async fn load_persisted(&self) -> Option<codec::PersistedAuthorization> {
        let raw = match self.store.get(keys::PERMISSIONS_SNAPSHOT).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, kind = %e.kind(), "Failed to read persisted permissions");
                return None;
            }
        };
        match codec::decode(&raw) {
            Ok(persisted) => Some(persisted),
            Err(e) => {
                warn!(error = %e, "Discarding unreadable persisted permissions");
                None
            }
        }
    }

    /// Drops the in-memory snapshot and profile. Persisted storage is left
    /// alone. Idempotent.
    pub fn clear(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        if self.current.send_replace(None).is_some() {
            debug!("Authorization cache cleared");
        }
    }

    // ============ Queries ============

    pub fn current(&self) -> Option<CachedAuthorization> {
        self.current.borrow().clone()
    }

    pub fn snapshot(&self) -> Option<Arc<AuthorizationSnapshot>> {
        self.current.borrow().as_ref().map(|c| c.snapshot.clone())
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.current.borrow().as_ref().and_then(|c| c.profile.clone())
    }

    pub fn is_admin(&self) -> bool {
        self.current
            .borrow()
            .as_ref()
            .and_then(|c| c.profile.as_ref())
            .is_some_and(|p| p.is_admin)
    }

    /// Grant for the pair; `None` when nothing is loaded or the module is
    /// absent or disabled.
    pub fn query(&self, module: Module, action: Action) -> Option<Grant> {
        self.current
            .borrow()
            .as_ref()
            .and_then(|c| c.snapshot.query(module, action))
    }

    pub fn is_module_enabled(&self, module: Module) -> bool {
        self.current
            .borrow()
            .as_ref()
            .is_some_and(|c| c.snapshot.is_module_enabled(module))
    }

    pub fn enabled_modules(&self) -> BTreeSet<Module> {
        self.current
            .borrow()
            .as_ref()
            .map(|c| c.snapshot.enabled_modules())
            .unwrap_or_default()
    }

    pub fn allowed_actions(&self, module: Module) -> BTreeSet<Action> {
        self.current
            .borrow()
            .as_ref()
            .map(|c| c.snapshot.allowed_actions(module))
            .unwrap_or_default()
    }
}
