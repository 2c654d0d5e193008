//! Attendance models: the daily status payload, punch requests and the
//! reconciled punch state.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::PunchId;
use crate::serde::{deserialize_lenient_bool, deserialize_optional_id};

// ============ Daily status ============

/// Punch portion of the daily status payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PunchStatus {
    #[serde(default, deserialize_with = "deserialize_lenient_bool")]
    pub punched_in: bool,
    #[serde(default, deserialize_with = "deserialize_lenient_bool")]
    pub punched_out: bool,
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub punch_id: Option<String>,
    #[serde(default)]
    pub punch_in_time: Option<String>,
    #[serde(default)]
    pub punch_out_time: Option<String>,
}

impl PunchStatus {
    pub fn punch_in_at(&self) -> Option<DateTime<Utc>> {
        self.punch_in_time.as_deref().and_then(parse_timestamp)
    }

    pub fn punch_out_at(&self) -> Option<DateTime<Utc>> {
        self.punch_out_time.as_deref().and_then(parse_timestamp)
    }
}

/// Accepts RFC 3339 and the naive `YYYY-MM-DD HH:MM:SS` form, read as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

/// Hours worked so far. The server sends either a number of hours or a
/// preformatted label such as `"04:35"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkingHours {
    Hours(f64),
    Label(String),
}

impl fmt::Display for WorkingHours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkingHours::Hours(h) => {
                let total_minutes = (h * 60.0).round() as i64;
                write!(f, "{:02}:{:02}", total_minutes / 60, total_minutes % 60)
            }
            WorkingHours::Label(label) => f.write_str(label),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitSummary {
    #[serde(default)]
    pub farmer_visits: u32,
    #[serde(default)]
    pub dealer_visits: u32,
    #[serde(default)]
    pub total_visits: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecentVisit {
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub id: Option<String>,
    #[serde(default, alias = "type")]
    pub visit_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub visited_at: Option<String>,
}

/// Body of the daily status (dashboard) endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyStatus {
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub punch_status: PunchStatus,
    #[serde(default)]
    pub working_hours: Option<WorkingHours>,
    #[serde(default)]
    pub visit_summary: VisitSummary,
    #[serde(default)]
    pub recent_visits: Vec<RecentVisit>,
}

// ============ Punch requests ============

/// Device position submitted with a punch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Both components rounded to six decimal places.
    pub fn rounded(self) -> Self {
        Self {
            latitude: round6(self.latitude),
            longitude: round6(self.longitude),
        }
    }
}

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PunchInData {
    pub id: PunchId,
}

/// Body returned by the punch-in endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PunchInResponse {
    pub data: PunchInData,
}

// ============ Reconciled state ============

/// Attendance phase for the current day, derived from server truth.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PunchPhase {
    #[default]
    NoActivePunch,
    /// Punched in and not yet out. The id may be missing when the server
    /// omitted it and nothing was mirrored locally.
    PunchedIn(Option<PunchId>),
    /// Punched in and out today.
    Complete,
}

impl PunchPhase {
    /// Maps a server status onto a phase. Only `punched_in && !punched_out`
    /// counts as an active punch.
    pub fn from_status(status: &PunchStatus) -> Self {
        match (status.punched_in, status.punched_out) {
            (true, false) => {
                PunchPhase::PunchedIn(status.punch_id.as_deref().and_then(PunchId::new))
            }
            (true, true) => PunchPhase::Complete,
            _ => PunchPhase::NoActivePunch,
        }
    }

    pub fn is_punched_in(&self) -> bool {
        matches!(self, PunchPhase::PunchedIn(_))
    }

    pub fn punch_id(&self) -> Option<&PunchId> {
        match self {
            PunchPhase::PunchedIn(id) => id.as_ref(),
            _ => None,
        }
    }

    /// Whether a punch-in may be attempted. `Complete` counts as no active
    /// punch; the server decides whether a second punch today is allowed.
    pub fn accepts_punch_in(&self) -> bool {
        !self.is_punched_in()
    }

    pub fn attendance_state(&self) -> AttendanceState {
        AttendanceState {
            punch_id: self.punch_id().map(|id| id.as_str().to_string()),
            is_punched_in: self.is_punched_in(),
        }
    }
}

impl fmt::Display for PunchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PunchPhase::NoActivePunch => f.write_str("no active punch"),
            PunchPhase::PunchedIn(Some(id)) => write!(f, "punched in ({})", id),
            PunchPhase::PunchedIn(None) => f.write_str("punched in"),
            PunchPhase::Complete => f.write_str("complete"),
        }
    }
}

/// Minimal attendance view handed to consumers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceState {
    pub punch_id: Option<String>,
    pub is_punched_in: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn status(punched_in: bool, punched_out: bool, punch_id: Option<&str>) -> PunchStatus {
        PunchStatus {
            punched_in,
            punched_out,
            punch_id: punch_id.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_phase_truth_table() {
        assert_eq!(
            PunchPhase::from_status(&status(true, false, Some("42"))),
            PunchPhase::PunchedIn(PunchId::new("42"))
        );
        assert_eq!(
            PunchPhase::from_status(&status(true, true, Some("42"))),
            PunchPhase::Complete
        );
        assert_eq!(
            PunchPhase::from_status(&status(false, false, None)),
            PunchPhase::NoActivePunch
        );
        assert_eq!(
            PunchPhase::from_status(&status(false, true, Some("9"))),
            PunchPhase::NoActivePunch
        );
    }

    #[test]
    fn test_attendance_state_clears_id_unless_punched_in() {
        let complete = PunchPhase::from_status(&status(true, true, Some("42")));
        assert_eq!(complete.attendance_state(), AttendanceState::default());

        let active = PunchPhase::from_status(&status(true, false, Some("42")));
        assert_eq!(
            active.attendance_state(),
            AttendanceState {
                punch_id: Some("42".into()),
                is_punched_in: true
            }
        );
    }

    #[test]
    fn test_accepts_punch_in() {
        assert!(PunchPhase::NoActivePunch.accepts_punch_in());
        assert!(PunchPhase::Complete.accepts_punch_in());
        assert!(!PunchPhase::PunchedIn(None).accepts_punch_in());
    }

    #[test]
    fn test_daily_status_with_numeric_punch_id() {
        let body = r#"{
            "user_name": "Ravi Kumar",
            "punch_status": {"punched_in": true, "punched_out": false, "punch_id": 42,
                             "punch_in_time": "2024-06-03T09:15:00+05:30", "punch_out_time": null},
            "working_hours": 2.5,
            "visit_summary": {"farmer_visits": 3, "dealer_visits": 1, "total_visits": 4},
            "recent_visits": [{"id": 7, "type": "farmer", "name": "S. Patil"}]
        }"#;
        let status: DailyStatus = serde_json::from_str(body).unwrap();
        assert_eq!(status.punch_status.punch_id.as_deref(), Some("42"));
        assert_eq!(status.visit_summary.total_visits, 4);
        assert_eq!(status.recent_visits[0].visit_type.as_deref(), Some("farmer"));
        assert_eq!(status.working_hours.unwrap().to_string(), "02:30");

        let punched_at = status.punch_status.punch_in_at().unwrap();
        assert_eq!(punched_at.hour(), 3);
        assert_eq!(punched_at.minute(), 45);
    }

    #[test]
    fn test_naive_timestamp_is_accepted() {
        let status = PunchStatus {
            punch_out_time: Some("2024-06-03 17:05:00".into()),
            ..Default::default()
        };
        assert_eq!(status.punch_out_at().unwrap().hour(), 17);
        assert_eq!(status.punch_in_at(), None);
    }

    #[test]
    fn test_working_hours_label_passthrough() {
        let hours: WorkingHours = serde_json::from_str(r#""07:10""#).unwrap();
        assert_eq!(hours.to_string(), "07:10");
    }

    #[test]
    fn test_coordinates_rounded_to_six_places() {
        let coords = Coordinates::new(18.520430123, 73.856743999).rounded();
        assert_eq!(coords.latitude, 18.52043);
        assert_eq!(coords.longitude, 73.856744);
    }

    #[test]
    fn test_punch_in_response_string_or_number_id() {
        let numeric: PunchInResponse = serde_json::from_str(r#"{"data": {"id": 101}}"#).unwrap();
        assert_eq!(numeric.data.id.as_str(), "101");
        let text: PunchInResponse = serde_json::from_str(r#"{"data": {"id": "101"}}"#).unwrap();
        assert_eq!(text.data.id, numeric.data.id);
    }

    #[test]
    fn test_empty_daily_status_defaults() {
        let status: DailyStatus = serde_json::from_str("{}").unwrap();
        assert!(!status.punch_status.punched_in);
        assert_eq!(status.user_name, None);
        assert!(status.recent_visits.is_empty());
    }
}
