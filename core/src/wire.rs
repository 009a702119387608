//! Row shape of the hosted `health_records` table.
//!
//! The backend speaks snake_case column names and owns `id`/`user_id`; the
//! application entity is [`HealthRecord`]. All translation between the two goes
//! through [`WireRecord::encode`] and [`WireRecord::decode`].

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{FitlogError, Result};
use crate::models::{HealthRecord, NewHealthRecord};

pub const TABLE: &str = "health_records";

/// Conflict key used for upserts.
pub const CONFLICT_COLUMNS: &str = "user_id,date";

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireRecord {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_id"
    )]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub date: String,
    pub morning_weight: f64,
    pub evening_weight: f64,
    pub bm_count: u32,
    pub has_bm: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Accept both text (uuid) and integer (bigserial) primary keys.
fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(Option::<RawId>::deserialize(deserializer)?.map(|raw| match raw {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    }))
}

impl WireRecord {
    /// Row body for an insert/upsert or a full-field update. `notes` is always
    /// written (as `null` when absent) so an update clears stale notes.
    #[must_use]
    pub fn encode(record: &NewHealthRecord, user_id: Option<&str>) -> Self {
        Self {
            id: None,
            user_id: user_id.map(str::to_string),
            date: record.date.format(DATE_FORMAT).to_string(),
            morning_weight: record.morning_weight,
            evening_weight: record.evening_weight,
            bm_count: record.bm_count,
            has_bm: record.has_bm,
            notes: record.notes.clone(),
        }
    }

    /// Full row for an already persisted record, id included.
    #[must_use]
    pub fn encode_stored(record: &HealthRecord, user_id: Option<&str>) -> Self {
        Self {
            id: Some(record.id.clone()),
            ..Self::encode(&record.to_new(), user_id)
        }
    }

    pub fn decode(self) -> Result<HealthRecord> {
        let id = self
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| FitlogError::Store("record returned without an id".to_string()))?;
        let date = NaiveDate::parse_from_str(&self.date, DATE_FORMAT).map_err(|_| {
            FitlogError::Store(format!("record {id} has malformed date '{}'", self.date))
        })?;
        Ok(HealthRecord {
            id,
            date,
            morning_weight: self.morning_weight,
            evening_weight: self.evening_weight,
            has_bm: self.has_bm,
            bm_count: self.bm_count,
            notes: self.notes,
        })
    }
}

/// Decode a batch of rows, failing on the first malformed one.
pub fn decode_all(rows: Vec<WireRecord>) -> Result<Vec<HealthRecord>> {
    rows.into_iter().map(WireRecord::decode).collect()
}
