//! Session-wide authorization state.
//!
//! The context wraps the [`AuthorizationCache`] with a load lifecycle and the
//! derived queries screens use. Every query reads the current snapshot
//! synchronously and answers "denied" when nothing is loaded, so it is safe to
//! call at any point including during a load.

use agrifield_core::{Action, ErrorKind, Module, Scope};
use agrifield_models::UserProfile;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use super::model::{AuthorizationError, FetchOutcome, Feature, LoadState, SnapshotSource};
use super::service::AuthorizationCache;

pub struct AuthorizationContext {
    cache: Arc<AuthorizationCache>,
    state: watch::Sender<LoadState>,
    /// Bumped by `clear` so a load finishing afterwards does not overwrite
    /// `Uninitialized`.
    session: AtomicU64,
}

impl AuthorizationContext {
    pub fn new(cache: Arc<AuthorizationCache>) -> Self {
        Self {
            cache,
            state: watch::Sender::new(LoadState::Uninitialized),
            session: AtomicU64::new(0),
        }
    }

    pub fn cache(&self) -> &Arc<AuthorizationCache> {
        &self.cache
    }

    /// Moves to `Loading`, fetches, then settles on `Ready` or `Failed`.
    ///
    /// A live or persisted snapshot is `Ready`. When only the all-denied
    /// default could be produced the state is `Failed` with the cause, while
    /// the denied snapshot stays installed.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<FetchOutcome, AuthorizationError> {
        let session = self.session.load(Ordering::Acquire);
        self.state.send_replace(LoadState::Loading);

        let result = self.cache.fetch().await;

        let next = match &result {
            Ok(outcome) => match outcome.source {
                SnapshotSource::Live | SnapshotSource::Persisted => LoadState::Ready,
                SnapshotSource::Default => LoadState::Failed(
                    outcome.failure.unwrap_or(ErrorKind::NetworkUnreachable),
                ),
            },
            Err(e) => LoadState::Failed(e.kind()),
        };

        if self.session.load(Ordering::Acquire) != session {
            debug!("Context cleared during load, keeping uninitialized");
            return result;
        }

        if next.is_unauthorized() {
            warn!("Authorization rejected, host must sign out");
        }
        self.state.send_replace(next);
        result
    }

    /// Same as [`load`](Self::load); makes no assumption about the prior state.
    pub async fn refresh(&self) -> Result<FetchOutcome, AuthorizationError> {
        self.load().await
    }

    /// Back to `Uninitialized` with an empty cache. Called once on logout.
    pub fn clear(&self) {
        self.session.fetch_add(1, Ordering::AcqRel);
        self.state.send_replace(LoadState::Uninitialized);
        self.cache.clear();
    }

    // ============ Lifecycle observation ============

    pub fn state(&self) -> LoadState {
        *self.state.borrow()
    }

    /// Receiver that sees every lifecycle transition, including
    /// `Failed(Unauthorized)`.
    pub fn subscribe(&self) -> watch::Receiver<LoadState> {
        self.state.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.state().is_loading()
    }

    pub fn is_ready(&self) -> bool {
        self.state().is_ready()
    }

    // ============ Derived queries ============

    pub fn profile(&self) -> Option<UserProfile> {
        self.cache.profile()
    }

    pub fn is_admin(&self) -> bool {
        self.cache.is_admin()
    }

    /// Admins are allowed everything; otherwise the grant must exist, belong
    /// to an enabled module, and be allowed.
    pub fn has_permission(&self, module: Module, action: Action) -> bool {
        self.is_admin()
            || self
                .cache
                .query(module, action)
                .is_some_and(|grant| grant.allowed)
    }

    pub fn is_module_enabled(&self, module: Module) -> bool {
        self.is_admin() || self.cache.is_module_enabled(module)
    }

    pub fn enabled_modules(&self) -> BTreeSet<Module> {
        if self.is_admin() {
            return Module::ALL.iter().copied().collect();
        }
        self.cache.enabled_modules()
    }

    pub fn allowed_actions(&self, module: Module) -> BTreeSet<Action> {
        if self.is_admin() {
            return Action::ALL.iter().copied().collect();
        }
        self.cache.allowed_actions(module)
    }

    /// Data breadth for an allowed action. Admins get company scope; a denied
    /// action has none.
    pub fn scope_for(&self, module: Module, action: Action) -> Option<Scope> {
        if self.is_admin() {
            return Some(Scope::Company);
        }
        self.cache
            .query(module, action)
            .filter(|grant| grant.allowed)
            .and_then(|grant| grant.scope)
    }

    pub fn is_own_data_only(&self, module: Module, action: Action) -> bool {
        if self.is_admin() {
            return false;
        }
        self.cache
            .query(module, action)
            .is_some_and(|grant| grant.allowed && grant.own_data_only)
    }

    pub fn is_feature_visible(&self, feature: Feature) -> bool {
        let (module, action) = feature.requirement();
        self.has_permission(module, action)
    }

    pub fn visible_features(&self) -> Vec<Feature> {
        Feature::ALL
            .iter()
            .copied()
            .filter(|feature| self.is_feature_visible(*feature))
            .collect()
    }
}
