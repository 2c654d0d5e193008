use agrifield_core::{Action, ErrorKind, Module};
use agrifield_models::{AuthorizationSnapshot, UserProfile};
use std::fmt;
use std::sync::Arc;

// ============ Cache results ============

/// Where the snapshot returned by a fetch came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource {
    /// Fresh from the permissions endpoint
    Live,
    /// Last persisted snapshot, used because the server was unavailable
    Persisted,
    /// All-denied fallback; nothing live or persisted was available
    Default,
}

impl SnapshotSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotSource::Live => "live",
            SnapshotSource::Persisted => "persisted",
            SnapshotSource::Default => "default",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub snapshot: Arc<AuthorizationSnapshot>,
    pub profile: Option<UserProfile>,
    pub source: SnapshotSource,
    /// Why the live fetch failed, for persisted and default snapshots.
    pub failure: Option<ErrorKind>,
}

/// The only error the authorization cache raises. Every other failure is
/// absorbed by falling back to persisted or default permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthorizationError {
    #[error("session is no longer authorized")]
    Unauthorized,
}

impl AuthorizationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthorizationError::Unauthorized => ErrorKind::Unauthorized,
        }
    }
}

// ============ Context lifecycle ============

/// Lifecycle of the authorization context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    Uninitialized,
    Loading,
    Ready,
    Failed(ErrorKind),
}

impl LoadState {
    pub fn is_ready(&self) -> bool {
        matches!(self, LoadState::Ready)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, LoadState::Failed(ErrorKind::Unauthorized))
    }
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadState::Uninitialized => f.write_str("uninitialized"),
            LoadState::Loading => f.write_str("loading"),
            LoadState::Ready => f.write_str("ready"),
            LoadState::Failed(kind) => write!(f, "error({})", kind),
        }
    }
}

// ============ Feature visibility ============

/// User-facing feature gated by a single module/action grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    Attendance,
    FarmerDirectory,
    DealerDirectory,
    FarmerOnboarding,
    DealerOnboarding,
    VisitLog,
    Inventory,
    SalesOrders,
    Reports,
}

impl Feature {
    pub const ALL: &'static [Feature] = &[
        Feature::Attendance,
        Feature::FarmerDirectory,
        Feature::DealerDirectory,
        Feature::FarmerOnboarding,
        Feature::DealerOnboarding,
        Feature::VisitLog,
        Feature::Inventory,
        Feature::SalesOrders,
        Feature::Reports,
    ];

    /// Grant that makes this feature visible.
    pub const fn requirement(&self) -> (Module, Action) {
        match self {
            Feature::Attendance => (Module::Attendance, Action::Create),
            Feature::FarmerDirectory => (Module::Farmer, Action::Read),
            Feature::DealerDirectory => (Module::Dealer, Action::Read),
            Feature::FarmerOnboarding => (Module::Farmer, Action::Create),
            Feature::DealerOnboarding => (Module::Dealer, Action::Create),
            Feature::VisitLog => (Module::Visit, Action::Create),
            Feature::Inventory => (Module::Inventory, Action::Read),
            Feature::SalesOrders => (Module::SalesOrder, Action::Read),
            Feature::Reports => (Module::Report, Action::Read),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Attendance => "attendance",
            Feature::FarmerDirectory => "farmer_directory",
            Feature::DealerDirectory => "dealer_directory",
            Feature::FarmerOnboarding => "farmer_onboarding",
            Feature::DealerOnboarding => "dealer_onboarding",
            Feature::VisitLog => "visit_log",
            Feature::Inventory => "inventory",
            Feature::SalesOrders => "sales_orders",
            Feature::Reports => "reports",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
