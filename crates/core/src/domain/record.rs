use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

/// Identifier of a CRM record. The CRM only hands out positive ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl RecordId {
    /// Parses a required record id field from raw request text.
    pub fn parse(field: &'static str, raw: Option<&str>) -> Result<Self, ValidationError> {
        let raw = raw.map(str::trim).filter(|value| !value.is_empty());
        let Some(raw) = raw else {
            return Err(ValidationError::MissingField(field));
        };

        match raw.parse::<i64>() {
            Ok(value) if value > 0 => Ok(Self(value)),
            _ => Err(ValidationError::InvalidRecordId { field, value: raw.to_string() }),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
