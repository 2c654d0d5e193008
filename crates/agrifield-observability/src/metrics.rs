//! Client counters.
//!
//! | Counter | Labels |
//! |---|---|
//! | `agrifield_permission_fetch_total` | `outcome`: live, persisted, default, unauthorized |
//! | `agrifield_attendance_sync_total` | `outcome`: ok, offline, unauthorized, failed |
//! | `agrifield_punch_total` | `kind`: in, out; `outcome` |

use ::metrics::counter;

/// Track how a permission load ended
pub fn track_permission_fetch(outcome: &'static str) {
    counter!("agrifield_permission_fetch_total", "outcome" => outcome).increment(1);
}

/// Track an attendance reconciliation
pub fn track_attendance_sync(outcome: &'static str) {
    counter!("agrifield_attendance_sync_total", "outcome" => outcome).increment(1);
}

/// Track a punch request
pub fn track_punch(kind: &'static str, outcome: &'static str) {
    counter!("agrifield_punch_total", "kind" => kind, "outcome" => outcome).increment(1);
}
