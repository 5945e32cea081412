//! Internal Rust models matching the database schema.

use chorelog_common::{ContributorId, RecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Points awarded to a record when the client does not send any.
pub const DEFAULT_POINTS: i64 = 3;

/// Longest contributor name accepted on write.
pub const MAX_NAME_LEN: usize = 100;

/// A person who can be credited with housework.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contributor {
    pub id: ContributorId,
    pub name: String,
}

/// A single logged chore event, with its contributor resolved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub id: RecordId,
    pub contributor: Contributor,
    /// Set once on insert; never updated.
    pub record_time: DateTime<Utc>,
    pub points: i64,
    pub note: String,
    /// Opaque object reference (`bucket/key`) of the attached photo.
    pub image: Option<String>,
}

/// Values for inserting a record.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub contributor_id: ContributorId,
    pub points: i64,
    pub note: String,
    pub image: Option<String>,
}

/// Partial update of a record. `None` leaves a column untouched.
///
/// `image` is doubly optional: `Some(None)` clears the reference.
#[derive(Debug, Clone, Default)]
pub struct RecordChanges {
    pub contributor_id: Option<ContributorId>,
    pub points: Option<i64>,
    pub note: Option<String>,
    pub image: Option<Option<String>>,
}

impl RecordChanges {
    pub fn is_empty(&self) -> bool {
        self.contributor_id.is_none()
            && self.points.is_none()
            && self.note.is_none()
            && self.image.is_none()
    }
}
