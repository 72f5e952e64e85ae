//! crates/diet_tracker_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any storage backend or serialization format.

use chrono::{DateTime, NaiveDate, Utc};

/// The surface a credential record grants access to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Patient,
    Doctor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "patient" => Ok(Role::Patient),
            "doctor" => Ok(Role::Doctor),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct CredentialRecord {
    pub username: String,
    /// PHC-format salted password hash.
    pub password_hash: String,
    pub role: Role,
    /// Base32 one-time secret. Absent until first-login provisioning;
    /// once present it is never regenerated by this system.
    pub otp_secret: Option<String>,
}

/// One submitted daily record. The entry store is append-only: rows are
/// never updated or deleted, and a date may repeat across rows.
#[derive(Debug, Clone, PartialEq)]
pub struct DietEntry {
    pub date: NaiveDate,
    pub weight_kg: f64,
    pub sleep_hours: u32,
    pub sleep_minutes: u32,
    pub coffee_cups: u32,
    pub walking_km: f64,
    pub breakfast: String,
    pub snack: String,
    pub lunch: String,
    pub evening_snack: String,
    pub dinner: String,
    pub before_bed: String,
}

/// A row read back from the entry store did not match the fixed schema.
#[derive(Debug, thiserror::Error)]
pub enum EntryRowError {
    #[error("row has {0} cells, expected 12")]
    Width(usize),
    #[error("invalid value '{value}' in column '{column}'")]
    Value { column: &'static str, value: String },
}

impl DietEntry {
    /// The fixed column order of the shared sheet. The names are carried
    /// over from the historical rows; readers reject any sheet whose
    /// header no longer matches.
    pub const COLUMNS: [&'static str; 12] = [
        "Date",
        "Weight",
        "Hours",
        "Minutes",
        "coffee_cups",
        "walking_distance",
        "breakfast_food",
        "snack_food",
        "lunch_food",
        "evening_food",
        "dinner_food",
        "bedtime_food",
    ];

    /// The 12 cell values, in the fixed column order.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.date.format("%Y-%m-%d").to_string(),
            self.weight_kg.to_string(),
            self.sleep_hours.to_string(),
            self.sleep_minutes.to_string(),
            self.coffee_cups.to_string(),
            self.walking_km.to_string(),
            self.breakfast.clone(),
            self.snack.clone(),
            self.lunch.clone(),
            self.evening_snack.clone(),
            self.dinner.clone(),
            self.before_bed.clone(),
        ]
    }

    /// Parses a row in the fixed column order back into an entry.
    pub fn from_row(row: &[String]) -> Result<Self, EntryRowError> {
        if row.len() != Self::COLUMNS.len() {
            return Err(EntryRowError::Width(row.len()));
        }

        fn cell<T: std::str::FromStr>(
            row: &[String],
            index: usize,
        ) -> Result<T, EntryRowError> {
            row[index].trim().parse::<T>().map_err(|_| EntryRowError::Value {
                column: DietEntry::COLUMNS[index],
                value: row[index].clone(),
            })
        }

        Ok(Self {
            date: NaiveDate::parse_from_str(row[0].trim(), "%Y-%m-%d").map_err(|_| {
                EntryRowError::Value {
                    column: Self::COLUMNS[0],
                    value: row[0].clone(),
                }
            })?,
            weight_kg: cell(row, 1)?,
            sleep_hours: cell(row, 2)?,
            sleep_minutes: cell(row, 3)?,
            coffee_cups: cell(row, 4)?,
            walking_km: cell(row, 5)?,
            breakfast: row[6].clone(),
            snack: row[7].clone(),
            lunch: row[8].clone(),
            evening_snack: row[9].clone(),
            dinner: row[10].clone(),
            before_bed: row[11].clone(),
        })
    }
}

/// Where a session stands in the two-step login protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    Anonymous,
    AwaitingCode,
    Authenticated,
}

/// The one-shot payload shown when an account's one-time secret is first
/// provisioned: the otpauth:// URI and a scannable QR rendering of it.
#[derive(Debug, Clone)]
pub struct Enrollment {
    pub otpauth_url: String,
    pub qr_png_base64: String,
}

/// Ephemeral per-connection login state. Held only in memory, keyed by a
/// session cookie, and destroyed on logout, idle-timeout expiry, or
/// process restart. Phase transitions are driven exclusively by the gate.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub phase: AuthPhase,
    pub username: Option<String>,
    pub role: Option<Role>,
    pub otp_secret: Option<String>,
    pub authenticated_at: Option<DateTime<Utc>>,
    pub(crate) enrollment: Option<Enrollment>,
}

impl Default for AuthPhase {
    fn default() -> Self {
        AuthPhase::Anonymous
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears every attribute, returning the session to `Anonymous`.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Hands out the enrollment payload at most once per provisioning.
    pub fn take_enrollment(&mut self) -> Option<Enrollment> {
        self.enrollment.take()
    }

    pub fn is_authenticated(&self) -> bool {
        self.phase == AuthPhase::Authenticated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry() -> DietEntry {
        DietEntry {
            date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            weight_kg: 70.0,
            sleep_hours: 7,
            sleep_minutes: 30,
            coffee_cups: 2,
            walking_km: 3.0,
            breakfast: "eggs".to_string(),
            snack: String::new(),
            lunch: "rice".to_string(),
            evening_snack: String::new(),
            dinner: "soup".to_string(),
            before_bed: String::new(),
        }
    }

    #[test]
    fn row_preserves_fixed_column_order() {
        let row = sample_entry().to_row();
        assert_eq!(
            row,
            vec![
                "2024-01-05",
                "70",
                "7",
                "30",
                "2",
                "3",
                "eggs",
                "",
                "rice",
                "",
                "soup",
                "",
            ]
        );
    }

    #[test]
    fn from_row_rejects_wrong_width() {
        let mut row = sample_entry().to_row();
        row.pop();
        assert!(matches!(
            DietEntry::from_row(&row),
            Err(EntryRowError::Width(11))
        ));
    }

    #[test]
    fn from_row_reports_bad_cell_by_column() {
        let mut row = sample_entry().to_row();
        row[1] = "heavy".to_string();
        match DietEntry::from_row(&row) {
            Err(EntryRowError::Value { column, .. }) => assert_eq!(column, "Weight"),
            other => panic!("expected a value error, got {:?}", other),
        }
    }

    #[test]
    fn enrollment_is_handed_out_once() {
        let mut session = Session::new();
        session.enrollment = Some(Enrollment {
            otpauth_url: "otpauth://totp/x".to_string(),
            qr_png_base64: "aGk=".to_string(),
        });
        assert!(session.take_enrollment().is_some());
        assert!(session.take_enrollment().is_none());
    }
}
