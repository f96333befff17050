use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub const TEMPORARY_ID_PREFIX: &str = "temp_";
pub const BILL_ID_PREFIX: &str = "bill_";

/// Member owned by the store; never part of a caller's bill.
pub const OWNER_FIELD: &str = "userId";

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A bill as seen by the owning user.
///
/// Only `id` and `date` are interpreted by the store. Every other member
/// (amounts, participants, split results) is carried through untouched in
/// `details`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub date: String,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl Bill {
    /// A bill that has not been saved yet.
    pub fn draft(details: Map<String, Value>) -> Self {
        Self {
            id: format!("{}{}", TEMPORARY_ID_PREFIX, fastrand::u64(..)),
            date: String::new(),
            details,
        }
    }

    pub fn is_temporary(&self) -> bool {
        self.id.starts_with(TEMPORARY_ID_PREFIX)
    }

    /// Parsed `date`. Accepts RFC 3339 and plain `YYYY-MM-DD` (midnight UTC);
    /// `None` for anything else.
    pub fn timestamp(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.date).ok().or_else(|| {
            NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc().fixed_offset())
        })
    }

    /// Drops members the store manages itself.
    pub fn without_owner_tag(mut self) -> Self {
        self.details.remove(OWNER_FIELD);
        self
    }
}

/// Bill record as persisted under the bills key, tagged with its owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredBill {
    #[serde(flatten)]
    pub bill: Bill,
    #[serde(rename = "userId")]
    pub user_id: String,
}

impl StoredBill {
    pub fn new(bill: Bill, user_id: impl Into<String>) -> Self {
        Self {
            bill: bill.without_owner_tag(),
            user_id: user_id.into(),
        }
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

/// Newest first. Bills whose date [`Bill::timestamp`] cannot parse go last,
/// keeping their relative order.
pub fn sort_newest_first(bills: &mut [Bill]) {
    bills.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
}
