//! Attendance reconciliation.
//!
//! The server is the source of truth for today's punch. The reconciler keeps
//! one in-memory [`PunchPhase`] (readable synchronously through a `watch`
//! channel) and a minimal mirror in the key store under `punchId` so a punch
//! id survives a process restart.
//!
//! [`reset`](SessionReconciler::reset) starts a new session. A sync or punch
//! that began in an earlier session never writes state or storage after it.

use agrifield_cache::{KeyStore, keys};
use agrifield_core::{ApiError, ErrorKind};
use agrifield_models::{AttendanceState, PunchId, PunchPhase};
use agrifield_observability::metrics;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::api::ApiClient;
use crate::services::{DeviceGuard, LocationProvider, PunchKind, PunchPrompt};

use super::model::{PunchError, PunchOutcome, SyncReport};

/// Holds the busy flag for the duration of a punch request. The flag is
/// cleared on drop, which also covers a cancelled request.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SessionReconciler {
    api: Arc<dyn ApiClient>,
    store: Arc<dyn KeyStore>,
    location: Arc<dyn LocationProvider>,
    guard: Arc<dyn DeviceGuard>,
    prompt: Arc<dyn PunchPrompt>,
    phase: watch::Sender<PunchPhase>,
    display_name: watch::Sender<Option<String>>,
    busy: AtomicBool,
    /// Bumped by `reset`.
    session: AtomicU64,
}

impl SessionReconciler {
    pub fn new(
        api: Arc<dyn ApiClient>,
        store: Arc<dyn KeyStore>,
        location: Arc<dyn LocationProvider>,
        guard: Arc<dyn DeviceGuard>,
        prompt: Arc<dyn PunchPrompt>,
    ) -> Self {
        Self {
            api,
            store,
            location,
            guard,
            prompt,
            phase: watch::Sender::new(PunchPhase::NoActivePunch),
            display_name: watch::Sender::new(None),
            busy: AtomicBool::new(false),
            session: AtomicU64::new(0),
        }
    }

    // ============ State access ============

    pub fn phase(&self) -> PunchPhase {
        self.phase.borrow().clone()
    }

    pub fn attendance_state(&self) -> AttendanceState {
        self.phase.borrow().attendance_state()
    }

    pub fn display_name(&self) -> Option<String> {
        self.display_name.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PunchPhase> {
        self.phase.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Forgets in-memory attendance state and ends the current session.
    /// Storage is untouched.
    pub fn reset(&self) {
        self.session.fetch_add(1, Ordering::AcqRel);
        self.phase.send_replace(PunchPhase::NoActivePunch);
        self.display_name.send_replace(None);
    }

    fn session(&self) -> u64 {
        self.session.load(Ordering::Acquire)
    }

    fn is_current(&self, session: u64) -> bool {
        self.session() == session
    }

    /// Replaces the phase unless `session` has ended. The check runs under the
    /// channel lock, so it cannot interleave with `reset`.
    fn publish_phase(&self, session: u64, phase: PunchPhase) -> bool {
        self.phase.send_if_modified(|current| {
            if !self.is_current(session) {
                return false;
            }
            *current = phase;
            true
        })
    }

    fn publish_name(&self, session: u64, name: String) -> bool {
        self.display_name.send_if_modified(|current| {
            if !self.is_current(session) {
                return false;
            }
            *current = Some(name);
            true
        })
    }

    // ============ Reconciliation ============

    /// Loads the mirrored punch id and cached display name. Meant to run once
    /// at startup, before the first [`sync`](Self::sync).
    #[instrument(skip(self))]
    pub async fn restore(&self) -> PunchPhase {
        let session = self.session();
        if let Some(id) = self.read_mirror().await {
            debug!(punch.id = %id, "Restored mirrored punch");
            self.publish_phase(session, PunchPhase::PunchedIn(Some(id)));
        }
        if let Some(name) = self.read_key(keys::USER_NAME).await {
            self.publish_name(session, name);
        }
        self.phase()
    }

    /// Pulls today's status from the server and overwrites local state and the
    /// storage mirror with it. Never fails: when the server is unavailable the
    /// state is left as is and the cached display name is reported.
    #[instrument(skip(self))]
    pub async fn sync(&self) -> SyncReport {
        self.sync_in(self.session()).await
    }

    async fn sync_in(&self, session: u64) -> SyncReport {
        let status = match self.api.fetch_daily_status().await {
            Ok(status) => status,
            Err(e) => return self.degraded_report(&e).await,
        };
        if !self.is_current(session) {
            return self.discarded_report();
        }

        let mut phase = PunchPhase::from_status(&status.punch_status);
        if let PunchPhase::PunchedIn(None) = phase
            && let Some(id) = self.known_punch_id().await
        {
            debug!(punch.id = %id, "Server omitted punch id, keeping known id");
            phase = PunchPhase::PunchedIn(Some(id));
        }

        self.write_mirror(session, &phase).await;
        if !self.publish_phase(session, phase.clone()) {
            return self.discarded_report();
        }

        if let Some(name) = status.user_name.as_ref().filter(|n| !n.trim().is_empty()) {
            self.cache_name(session, name).await;
            self.publish_name(session, name.clone());
        }

        debug!(phase = %phase, "Attendance reconciled");
        metrics::track_attendance_sync("ok");

        SyncReport {
            state: phase.attendance_state(),
            phase,
            display_name: self.display_name(),
            status: Some(status),
            online: true,
        }
    }

    /// Report for a sync whose session ended while it ran. Nothing was
    /// written.
    fn discarded_report(&self) -> SyncReport {
        debug!("Session ended during sync, discarding server status");
        metrics::track_attendance_sync("discarded");
        let phase = self.phase();
        SyncReport {
            state: phase.attendance_state(),
            phase,
            display_name: self.display_name(),
            status: None,
            online: false,
        }
    }

    async fn degraded_report(&self, error: &ApiError) -> SyncReport {
        let outcome = match error.kind() {
            ErrorKind::NetworkUnreachable => {
                info!(error = %error, "Attendance sync offline, keeping local state");
                "offline"
            }
            ErrorKind::Unauthorized => {
                warn!(error = %error, "Attendance sync unauthorized");
                "unauthorized"
            }
            kind => {
                warn!(error = %error, kind = %kind, "Attendance sync failed");
                "failed"
            }
        };
        metrics::track_attendance_sync(outcome);

        let display_name = match self.display_name() {
            Some(name) => Some(name),
            None => self.read_key(keys::USER_NAME).await,
        };
        let phase = self.phase();

        SyncReport {
            state: phase.attendance_state(),
            phase,
            display_name,
            status: None,
            online: false,
        }
    }

    // ============ Punch transitions ============

    /// Punches in after the device check, the user's confirmation and a
    /// location fix, then re-syncs.
    ///
    /// A second call while one is running returns [`PunchOutcome::Busy`]
    /// without side effects.
    #[instrument(skip(self))]
    pub async fn request_punch_in(&self) -> Result<PunchOutcome, PunchError> {
        let result = self.punch_in_inner().await;
        track_punch(PunchKind::In, &result);
        result
    }

    async fn punch_in_inner(&self) -> Result<PunchOutcome, PunchError> {
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            debug!("Punch request already running");
            return Ok(PunchOutcome::Busy);
        };
        let session = self.session();

        let phase = self.phase();
        if !phase.accepts_punch_in() {
            debug!(phase = %phase, "Punch-in not allowed");
            return Ok(PunchOutcome::NotAllowed(phase));
        }

        if let Some(outcome) = self.confirm(PunchKind::In).await {
            return Ok(outcome);
        }

        let coords = self.location.current_location().await?.rounded();
        let response = match self.api.punch_in(coords).await {
            Ok(response) => response,
            Err(e) => return classify_failure(PunchKind::In, e),
        };

        let id = response.data.id;
        if !self.is_current(session) {
            info!(punch.id = %id, "Session ended during punch-in, not recording locally");
            return Ok(PunchOutcome::SessionEnded);
        }
        info!(punch.id = %id, "Punched in");
        let punched_in = PunchPhase::PunchedIn(Some(id));
        self.write_mirror(session, &punched_in).await;
        self.publish_phase(session, punched_in);

        Ok(PunchOutcome::Completed(self.sync_in(session).await))
    }

    /// Punches out of the active punch, then re-syncs.
    #[instrument(skip(self))]
    pub async fn request_punch_out(&self) -> Result<PunchOutcome, PunchError> {
        let result = self.punch_out_inner().await;
        track_punch(PunchKind::Out, &result);
        result
    }

    async fn punch_out_inner(&self) -> Result<PunchOutcome, PunchError> {
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            debug!("Punch request already running");
            return Ok(PunchOutcome::Busy);
        };
        let session = self.session();

        let phase = self.phase();
        if !phase.is_punched_in() {
            debug!(phase = %phase, "Punch-out not allowed");
            return Ok(PunchOutcome::NotAllowed(phase));
        }
        let Some(id) = self.known_punch_id().await else {
            warn!("Punched in but no punch id is known");
            return Err(PunchError::MissingPunchId);
        };

        if let Some(outcome) = self.confirm(PunchKind::Out).await {
            return Ok(outcome);
        }

        let coords = self.location.current_location().await?.rounded();
        if let Err(e) = self.api.punch_out(&id, coords).await {
            return classify_failure(PunchKind::Out, e);
        }

        if !self.is_current(session) {
            info!(punch.id = %id, "Session ended during punch-out, not recording locally");
            return Ok(PunchOutcome::SessionEnded);
        }
        info!(punch.id = %id, "Punched out");
        self.write_mirror(session, &PunchPhase::Complete).await;
        self.publish_phase(session, PunchPhase::Complete);

        Ok(PunchOutcome::Completed(self.sync_in(session).await))
    }

    /// Device check then prompt. `Some` means the request stops here.
    async fn confirm(&self, kind: PunchKind) -> Option<PunchOutcome> {
        if let Some(restriction) = self.guard.check().await {
            warn!(restriction = %restriction, punch.kind = %kind, "Punch blocked by device restriction");
            return Some(PunchOutcome::DeviceRestricted(restriction));
        }
        if !self.prompt.confirm(kind).await {
            debug!(punch.kind = %kind, "Punch dismissed");
            return Some(PunchOutcome::Declined);
        }
        None
    }

    // ============ Mirror ============

    /// Id from the in-memory phase, else from the storage mirror.
    async fn known_punch_id(&self) -> Option<PunchId> {
        let in_memory = self.phase.borrow().punch_id().cloned();
        if in_memory.is_some() {
            return in_memory;
        }
        self.read_mirror().await
    }

    async fn read_mirror(&self) -> Option<PunchId> {
        self.read_key(keys::PUNCH_ID).await.and_then(PunchId::new)
    }

    async fn read_key(&self, key: &str) -> Option<String> {
        match self.store.get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(store.key = %key, error = %e, "Store read failed, treating as missing");
                None
            }
        }
    }

    /// Stores the id of an active punch, removes the mirror otherwise.
    /// A write that lands after the session ended is taken back.
    async fn write_mirror(&self, session: u64, phase: &PunchPhase) {
        if !self.is_current(session) {
            return;
        }
        let result = match phase.punch_id() {
            Some(id) => self.store.set(keys::PUNCH_ID, id.as_str()).await,
            None => self.store.remove(keys::PUNCH_ID).await,
        };
        if let Err(e) = result {
            warn!(error = %e, "Failed to update punch mirror");
        }
        if phase.punch_id().is_some() && !self.is_current(session) {
            self.remove_stale(keys::PUNCH_ID).await;
        }
    }

    async fn cache_name(&self, session: u64, name: &str) {
        if !self.is_current(session) {
            return;
        }
        if let Err(e) = self.store.set(keys::USER_NAME, name).await {
            warn!(error = %e, "Failed to cache display name");
        }
        if !self.is_current(session) {
            self.remove_stale(keys::USER_NAME).await;
        }
    }

    async fn remove_stale(&self, key: &str) {
        debug!(store.key = %key, "Session ended during write, removing value");
        if let Err(e) = self.store.remove(key).await {
            warn!(store.key = %key, error = %e, "Failed to remove stale value");
        }
    }
}

/// Maps a submission failure onto an outcome or a user-visible error.
fn classify_failure(kind: PunchKind, error: ApiError) -> Result<PunchOutcome, PunchError> {
    match (kind, error.kind()) {
        (_, ErrorKind::NetworkUnreachable) => {
            info!(punch.kind = %kind, error = %error, "Punch deferred, server unreachable");
            Ok(PunchOutcome::Deferred)
        }
        // TODO: confirm with product whether a 401 here should force a logout
        (PunchKind::Out, ErrorKind::Unauthorized) => {
            warn!(error = %error, "Punch-out unauthorized, ignoring");
            Ok(PunchOutcome::Ignored)
        }
        (PunchKind::In, ErrorKind::Unauthorized) => Err(PunchError::Unauthorized),
        (_, ErrorKind::NotFound) => {
            warn!(punch.kind = %kind, error = %error, "Attendance endpoint not found");
            Err(PunchError::NotFound)
        }
        (PunchKind::In, ErrorKind::ServerRejected) => Err(PunchError::Restricted {
            message: error.message().unwrap_or("Punch-in was rejected").to_string(),
        }),
        _ => {
            warn!(punch.kind = %kind, error = %error, "Punch failed");
            Err(PunchError::Failed(error))
        }
    }
}

fn track_punch(kind: PunchKind, result: &Result<PunchOutcome, PunchError>) {
    let outcome = match result {
        Ok(outcome) => outcome.as_str(),
        Err(e) => e.as_str(),
    };
    metrics::track_punch(kind.as_str(), outcome);
}
