//! Terminal implementations of the host services.

use agrifield::services::{DeviceGuard, DeviceRestriction, PunchKind, PunchPrompt};
use async_trait::async_trait;
use dialoguer::Confirm;
use tracing::warn;

/// Asks on the terminal before each punch.
pub struct TerminalPrompt;

#[async_trait]
impl PunchPrompt for TerminalPrompt {
    async fn confirm(&self, kind: PunchKind) -> bool {
        let question = match kind {
            PunchKind::In => "Punch in now?",
            PunchKind::Out => "Punch out now?",
        };
        let answer = tokio::task::spawn_blocking(move || {
            Confirm::new()
                .with_prompt(question)
                .default(false)
                .interact()
        })
        .await;

        match answer {
            Ok(Ok(confirmed)) => confirmed,
            Ok(Err(e)) => {
                warn!(error = %e, "Confirmation prompt failed");
                false
            }
            Err(e) => {
                warn!(error = %e, "Confirmation prompt task failed");
                false
            }
        }
    }
}

/// A terminal has no location services; punching is blocked unless
/// coordinates were supplied.
pub struct CoordinatesGuard {
    pub has_coordinates: bool,
}

#[async_trait]
impl DeviceGuard for CoordinatesGuard {
    async fn check(&self) -> Option<DeviceRestriction> {
        (!self.has_coordinates).then_some(DeviceRestriction::LocationServicesDisabled)
    }
}
