#![allow(dead_code)]

use agrifield::services::{
    DeviceGuard, DeviceRestriction, LocationError, LocationProvider, PunchKind, PunchPrompt,
};
use agrifield::{ClientState, Collaborators};
use agrifield::api::ApiClient;
use agrifield_cache::{KeyStore, MemoryKeyStore, StoreError};
use agrifield_core::ApiError;
use agrifield_models::{
    Coordinates, DailyStatus, PermissionsResponse, PunchId, PunchInResponse, PunchStatus,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const FIELD_OFFICER: &str = r#"{
    "modules": [
        {
            "module": "FARMER",
            "enabled": true,
            "permissions": {
                "create": true,
                "read": {"allowed": true, "scope": "team", "source": "role", "own_data_only": false},
                "update": {"allowed": true, "scope": "own", "source": "override", "own_data_only": true},
                "delete": false
            }
        },
        {
            "module": "ATTENDANCE",
            "enabled": true,
            "permissions": {"create": true, "read": true}
        },
        {
            "module": "INVENTORY",
            "enabled": false,
            "permissions": {"read": true, "update": true}
        }
    ],
    "user_profile": {"is_admin": false, "username": "field.officer", "full_name": "Ravi Kumar"}
}"#;

pub const ADMIN: &str = r#"{
    "modules": [],
    "user_profile": {"is_admin": true, "username": "admin"}
}"#;

pub fn permissions(json: &str) -> PermissionsResponse {
    serde_json::from_str(json).unwrap()
}

pub fn daily_status(punched_in: bool, punched_out: bool, punch_id: Option<&str>) -> DailyStatus {
    DailyStatus {
        user_name: Some("Ravi Kumar".to_string()),
        punch_status: PunchStatus {
            punched_in,
            punched_out,
            punch_id: punch_id.map(str::to_string),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn punch_in_response(id: &str) -> PunchInResponse {
    serde_json::from_value(serde_json::json!({"data": {"id": id}})).unwrap()
}

/// Scripted [`ApiClient`] that counts calls per endpoint.
pub struct FakeApi {
    permissions: Mutex<Result<PermissionsResponse, ApiError>>,
    daily_status: Mutex<Result<DailyStatus, ApiError>>,
    punch_in: Mutex<Result<PunchInResponse, ApiError>>,
    punch_out: Mutex<Result<(), ApiError>>,
    delay: Mutex<Duration>,
    pub permission_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub punch_in_calls: AtomicUsize,
    pub punch_out_calls: AtomicUsize,
    pub last_coordinates: Mutex<Option<Coordinates>>,
    pub last_punch_out_id: Mutex<Option<PunchId>>,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self {
            permissions: Mutex::new(Ok(permissions(FIELD_OFFICER))),
            daily_status: Mutex::new(Ok(daily_status(false, false, None))),
            punch_in: Mutex::new(Ok(punch_in_response("101"))),
            punch_out: Mutex::new(Ok(())),
            delay: Mutex::new(Duration::ZERO),
            permission_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            punch_in_calls: AtomicUsize::new(0),
            punch_out_calls: AtomicUsize::new(0),
            last_coordinates: Mutex::new(None),
            last_punch_out_id: Mutex::new(None),
        }
    }
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_permissions(&self, result: Result<PermissionsResponse, ApiError>) {
        *self.permissions.lock().unwrap() = result;
    }

    pub fn set_daily_status(&self, result: Result<DailyStatus, ApiError>) {
        *self.daily_status.lock().unwrap() = result;
    }

    pub fn set_punch_in(&self, result: Result<PunchInResponse, ApiError>) {
        *self.punch_in.lock().unwrap() = result;
    }

    pub fn set_punch_out(&self, result: Result<(), ApiError>) {
        *self.punch_out.lock().unwrap() = result;
    }

    /// Every call sleeps this long before answering.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    async fn pause(&self) {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ApiClient for FakeApi {
    async fn fetch_permissions(&self) -> Result<PermissionsResponse, ApiError> {
        self.permission_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.permissions.lock().unwrap().clone()
    }

    async fn fetch_daily_status(&self) -> Result<DailyStatus, ApiError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.daily_status.lock().unwrap().clone()
    }

    async fn punch_in(&self, coords: Coordinates) -> Result<PunchInResponse, ApiError> {
        self.punch_in_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_coordinates.lock().unwrap() = Some(coords);
        self.pause().await;
        self.punch_in.lock().unwrap().clone()
    }

    async fn punch_out(&self, punch_id: &PunchId, coords: Coordinates) -> Result<(), ApiError> {
        self.punch_out_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_coordinates.lock().unwrap() = Some(coords);
        *self.last_punch_out_id.lock().unwrap() = Some(punch_id.clone());
        self.pause().await;
        self.punch_out.lock().unwrap().clone()
    }
}

/// Memory store whose writes take `write_delay` to land.
pub struct SlowStore {
    pub inner: MemoryKeyStore,
    pub write_delay: Duration,
}

impl SlowStore {
    pub fn new(write_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryKeyStore::new(),
            write_delay,
        })
    }
}

#[async_trait]
impl KeyStore for SlowStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        tokio::time::sleep(self.write_delay).await;
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(key).await
    }

    async fn clear_all(&self) -> Result<(), StoreError> {
        self.inner.clear_all().await
    }
}

pub struct FakeLocation(pub Result<Coordinates, LocationError>);

#[async_trait]
impl LocationProvider for FakeLocation {
    async fn current_location(&self) -> Result<Coordinates, LocationError> {
        self.0.clone()
    }
}

#[derive(Default)]
pub struct FakeGuard(pub Mutex<Option<DeviceRestriction>>);

#[async_trait]
impl DeviceGuard for FakeGuard {
    async fn check(&self) -> Option<DeviceRestriction> {
        *self.0.lock().unwrap()
    }
}

/// Answers every prompt with a fixed value and counts how often it was asked.
pub struct FakePrompt {
    pub answer: AtomicBool,
    pub asked: AtomicUsize,
}

impl FakePrompt {
    pub fn answering(answer: bool) -> Arc<Self> {
        Arc::new(Self {
            answer: AtomicBool::new(answer),
            asked: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl PunchPrompt for FakePrompt {
    async fn confirm(&self, _kind: PunchKind) -> bool {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.answer.load(Ordering::SeqCst)
    }
}

/// Everything a test needs to drive and inspect a [`ClientState`].
pub struct Harness {
    pub api: Arc<FakeApi>,
    pub store: Arc<MemoryKeyStore>,
    pub guard: Arc<FakeGuard>,
    pub prompt: Arc<FakePrompt>,
    pub state: ClientState,
}

pub const HERE: Coordinates = Coordinates {
    latitude: 18.520430123,
    longitude: 73.856743999,
};

impl Harness {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryKeyStore::new()))
    }

    pub fn with_store(store: Arc<MemoryKeyStore>) -> Self {
        let api = FakeApi::new();
        let guard = Arc::new(FakeGuard::default());
        let prompt = FakePrompt::answering(true);
        let services = Collaborators {
            location: Arc::new(FakeLocation(Ok(HERE))),
            guard: guard.clone(),
            prompt: prompt.clone(),
        };
        let state = ClientState::new(api.clone(), store.clone(), services);
        Self {
            api,
            store,
            guard,
            prompt,
            state,
        }
    }

    pub fn with_location(location: Result<Coordinates, LocationError>) -> Self {
        let mut harness = Self::new();
        let services = Collaborators {
            location: Arc::new(FakeLocation(location)),
            guard: harness.guard.clone(),
            prompt: harness.prompt.clone(),
        };
        harness.state = ClientState::new(harness.api.clone(), harness.store.clone(), services);
        harness
    }

    pub async fn stored(&self, key: &str) -> Option<String> {
        self.store.get(key).await.unwrap()
    }
}
