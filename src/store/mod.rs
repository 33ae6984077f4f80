pub mod processed;
pub mod supabase;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One row of the pending-issue table. Columns other than these are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct IssueRecord {
    #[serde(default)]
    pub issue_link: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Accepts both `timestamptz` and zone-less `timestamp` columns, the latter read as UTC.
/// Anything else, including non-string values, is dropped rather than failing the row.
fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Value> = Option::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(Value::as_str).and_then(|s| {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            })
    }))
}

#[async_trait]
pub trait IssueStore: Send + Sync {
    /// Every row currently in the table, in the order the store returns them.
    async fn fetch_all(&self) -> Result<Vec<IssueRecord>>;
}
