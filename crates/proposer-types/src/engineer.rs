use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Field holding an engineer's display name. Names are unique in the registry.
pub const NAME_FIELD: &str = "name";

/// Unique identifier for an engineer, wrapping a UUID v7 (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EngineerId(pub Uuid);

impl EngineerId {
    /// Create a new EngineerId using UUID v7.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for EngineerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EngineerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EngineerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// An engineer record in the shared registry.
///
/// `fields` holds everything collected by the new-engineer catalog, keyed by
/// field id (name, position, experience, photo path...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Engineer {
    pub id: EngineerId,
    pub name: String,
    pub fields: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}

impl Engineer {
    /// Look up a single collected field by name. `name` is always available.
    pub fn field(&self, field: &str) -> Option<&str> {
        if field == NAME_FIELD {
            return Some(&self.name);
        }
        self.fields.get(field).map(String::as_str)
    }
}
