use agrifield_core::ApiError;
use agrifield_models::{Coordinates, DailyStatus, PermissionsResponse, PunchId, PunchInResponse};
use async_trait::async_trait;

/// The four endpoints the client core uses.
///
/// Implementations classify every failure as an [`ApiError`]; timeouts and
/// connection failures must surface as [`ApiError::Network`].
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Permission matrix of the signed-in user.
    async fn fetch_permissions(&self) -> Result<PermissionsResponse, ApiError>;

    /// Today's attendance dashboard.
    async fn fetch_daily_status(&self) -> Result<DailyStatus, ApiError>;

    async fn punch_in(&self, coords: Coordinates) -> Result<PunchInResponse, ApiError>;

    async fn punch_out(&self, punch_id: &PunchId, coords: Coordinates) -> Result<(), ApiError>;
}
