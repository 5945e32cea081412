//! Typed ID wrappers for type safety across chorelog.
//!
//! Rows are keyed by SQLite integer primary keys. These newtypes keep a
//! contributor id from being passed where a record id is expected.

use serde::{Deserialize, Serialize};

/// Unique identifier for a contributor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContributorId(i64);

impl ContributorId {
    /// The raw row id.
    #[must_use]
    pub fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for ContributorId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<ContributorId> for i64 {
    fn from(id: ContributorId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ContributorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ContributorId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>().map(Self)
    }
}

/// Unique identifier for a housework record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(i64);

impl RecordId {
    /// The raw row id.
    #[must_use]
    pub fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<RecordId> for i64 {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RecordId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>().map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contributor_id_round_trip() {
        let id = ContributorId::from(42);
        assert_eq!(i64::from(id), 42);
        assert_eq!(id.to_string(), "42");
        assert_eq!("42".parse::<ContributorId>().unwrap(), id);
    }

    #[test]
    fn test_record_id_parse_rejects_garbage() {
        assert!("abc".parse::<RecordId>().is_err());
        assert_eq!("7".parse::<RecordId>().unwrap().get(), 7);
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let json = serde_json::to_string(&RecordId::from(9)).unwrap();
        assert_eq!(json, "9");

        let id: ContributorId = serde_json::from_str("3").unwrap();
        assert_eq!(id, ContributorId::from(3));
    }
}
