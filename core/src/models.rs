use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{FitlogError, Result};

/// Display unit for every weight in the tracker (1 斤 = 0.5 kg).
pub const WEIGHT_UNIT: &str = "斤";

/// Domain suffix for the synthetic login address derived from a handle.
pub const LOGIN_DOMAIN: &str = "fitlogpro.app";

pub const MAX_HANDLE_LEN: usize = 10;
pub const MIN_SECRET_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    pub id: String,
    pub date: NaiveDate,
    pub morning_weight: f64,
    pub evening_weight: f64,
    pub has_bm: bool,
    pub bm_count: u32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub notes: Option<String>,
}

/// A record that has not been persisted yet; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewHealthRecord {
    pub date: NaiveDate,
    pub morning_weight: f64,
    pub evening_weight: f64,
    pub has_bm: bool,
    pub bm_count: u32,
    pub notes: Option<String>,
}

impl HealthRecord {
    #[must_use]
    pub fn to_new(&self) -> NewHealthRecord {
        NewHealthRecord {
            date: self.date,
            morning_weight: self.morning_weight,
            evening_weight: self.evening_weight,
            has_bm: self.has_bm,
            bm_count: self.bm_count,
            notes: self.notes.clone(),
        }
    }

    /// Evening minus morning weight for this day.
    #[must_use]
    pub fn daily_swing(&self) -> f64 {
        self.evening_weight - self.morning_weight
    }
}

impl NewHealthRecord {
    /// Build a record from raw form input.
    ///
    /// Weights arrive as text and must parse to positive finite numbers. The
    /// bowel-movement pair is normalized so the count is 0 without a movement
    /// and at least 1 with one. Blank notes become `None`.
    pub fn from_form(
        date: NaiveDate,
        morning_weight: &str,
        evening_weight: &str,
        has_bm: bool,
        bm_count: u32,
        notes: Option<String>,
    ) -> Result<Self> {
        let morning_weight = parse_weight(morning_weight, "morning")?;
        let evening_weight = parse_weight(evening_weight, "evening")?;
        let (has_bm, bm_count) = normalize_bowel_movements(has_bm, bm_count);
        Ok(Self {
            date,
            morning_weight,
            evening_weight,
            has_bm,
            bm_count,
            notes: normalize_notes(notes),
        })
    }

    #[must_use]
    pub fn with_id(self, id: String) -> HealthRecord {
        HealthRecord {
            id,
            date: self.date,
            morning_weight: self.morning_weight,
            evening_weight: self.evening_weight,
            has_bm: self.has_bm,
            bm_count: self.bm_count,
            notes: self.notes,
        }
    }
}

/// Parse a weight typed by the user.
pub fn parse_weight(input: &str, label: &str) -> Result<f64> {
    let trimmed = input.trim();
    let value: f64 = trimmed.parse().map_err(|_| {
        FitlogError::Validation(format!(
            "Invalid {label} weight '{trimmed}'. Enter a number like 130.5"
        ))
    })?;
    if !value.is_finite() || value <= 0.0 {
        return Err(FitlogError::Validation(format!(
            "{label} weight must be greater than 0"
        )));
    }
    Ok(value)
}

#[must_use]
pub fn normalize_bowel_movements(has_bm: bool, bm_count: u32) -> (bool, u32) {
    if has_bm {
        (true, bm_count.max(1))
    } else {
        (false, 0)
    }
}

fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes.filter(|n| !n.trim().is_empty())
}

/// Validate a record before it is sent to the store.
pub fn validate_new_record(record: &NewHealthRecord) -> Result<()> {
    for (label, value) in [
        ("morning", record.morning_weight),
        ("evening", record.evening_weight),
    ] {
        if !value.is_finite() || value <= 0.0 {
            return Err(FitlogError::Validation(format!(
                "{label} weight must be greater than 0"
            )));
        }
    }
    match (record.has_bm, record.bm_count) {
        (true, 0) => Err(FitlogError::Validation(
            "bm_count must be at least 1 when a bowel movement is recorded".to_string(),
        )),
        (false, n) if n > 0 => Err(FitlogError::Validation(
            "bm_count must be 0 when no bowel movement is recorded".to_string(),
        )),
        _ => Ok(()),
    }
}

// --- Authentication types ---

#[derive(Debug, Clone)]
pub struct Credentials {
    pub handle: String,
    pub secret: String,
}

impl Credentials {
    /// Validate both halves locally; nothing invalid is ever sent to the backend.
    pub fn new(handle: &str, secret: &str) -> Result<Self> {
        validate_handle(handle)?;
        validate_secret(secret)?;
        Ok(Self {
            handle: handle.to_lowercase(),
            secret: secret.to_string(),
        })
    }

    #[must_use]
    pub fn login_address(&self) -> String {
        handle_to_address(&self.handle)
    }
}

/// The authenticated identity every store operation is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: String,
    pub handle: String,
    pub access_token: String,
}

pub fn validate_handle(handle: &str) -> Result<()> {
    let valid = !handle.is_empty()
        && handle.len() <= MAX_HANDLE_LEN
        && handle.chars().all(|c| c.is_ascii_alphanumeric());
    if valid {
        Ok(())
    } else {
        Err(FitlogError::Validation(format!(
            "Handle must be 1-{MAX_HANDLE_LEN} ASCII letters or digits"
        )))
    }
}

pub fn validate_secret(secret: &str) -> Result<()> {
    if secret.chars().count() < MIN_SECRET_LEN {
        return Err(FitlogError::Validation(format!(
            "Password must be at least {MIN_SECRET_LEN} characters"
        )));
    }
    Ok(())
}

#[must_use]
pub fn handle_to_address(handle: &str) -> String {
    format!("{}@{LOGIN_DOMAIN}", handle.to_lowercase())
}
