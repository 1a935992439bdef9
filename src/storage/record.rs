//! Harvested record and target identifier types

use crate::HarvestError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of one harvest target (the entity owning the records)
///
/// Identifiers are single tokens of ASCII letters, digits, `-`, `_` or `.`,
/// which keeps them safe to splice into URLs and file names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Validates and wraps a raw identifier
    pub fn new(raw: &str) -> Result<Self, HarvestError> {
        let trimmed = raw.trim();
        let valid = !trimmed.is_empty()
            && trimmed
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

        if valid {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(HarvestError::InvalidTarget(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl FromStr for EntityId {
    type Err = HarvestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// Older stores wrote numeric identifiers
#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntityId {
    Text(String),
    Number(u64),
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = match RawEntityId::deserialize(deserializer)? {
            RawEntityId::Text(text) => text,
            RawEntityId::Number(number) => number.to_string(),
        };
        EntityId::new(&raw).map_err(serde::de::Error::custom)
    }
}

/// One harvested unit
///
/// The timestamp is mandatory here: candidates without one are discarded
/// during extraction because they can be neither deduplicated nor ordered,
/// and stored entries without one are dropped when a store is loaded.
/// Unknown fields in a loaded store are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    #[serde(default)]
    pub rating_value: Option<String>,
    pub timestamp: String,
    pub entity_id: EntityId,
}

/// The `(timestamp, entityId)` pair identifying a unique record
pub type DedupKey = (String, EntityId);

impl Record {
    pub fn new(entity_id: EntityId, timestamp: impl Into<String>, rating: Option<String>) -> Self {
        Self {
            rating_value: rating,
            timestamp: timestamp.into(),
            entity_id,
        }
    }

    pub fn dedup_key(&self) -> DedupKey {
        (self.timestamp.clone(), self.entity_id.clone())
    }

    /// Whether both records describe the same harvested unit
    pub fn same_key(&self, other: &Record) -> bool {
        self.timestamp == other.timestamp && self.entity_id == other.entity_id
    }
}
