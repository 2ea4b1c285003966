use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::client::non_blank;

pub const DEFAULT_LEAD_TYPE: &str = "IQL";
pub const UNKNOWN_LEAD_NAME: &str = "Unknown";

/// Flat name → value view of a lead-capture submission.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LeadFields(BTreeMap<String, String>);

impl LeadFields {
    /// Keeps scalar values as trimmed text; nulls, blanks, arrays and objects are dropped.
    pub fn from_json_object(object: &Map<String, Value>) -> Self {
        let fields = object
            .iter()
            .filter_map(|(key, value)| scalar_text(value).map(|text| (key.clone(), text)))
            .collect();
        Self(fields)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LeadFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .filter_map(|(key, value)| {
                    let value: String = value.into();
                    non_blank(Some(value.as_str())).map(|text| (key.into(), text.to_string()))
                })
                .collect(),
        )
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(value) => non_blank(Some(value.as_str())).map(ToString::to_string),
        Value::Bool(value) => Some(value.to_string()),
        Value::Number(value) => Some(value.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Opportunity about to be created from a lead-capture submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LeadDraft {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub description: String,
    pub lead_type: String,
}

impl LeadDraft {
    pub fn from_fields(fields: &LeadFields, lead_type: Option<&str>) -> Self {
        let lead_type = non_blank(lead_type).unwrap_or(DEFAULT_LEAD_TYPE).to_string();
        let full_name = format!(
            "{} {}",
            fields.get("firstname").unwrap_or_default(),
            fields.get("lastname").unwrap_or_default()
        );
        let name = non_blank(Some(full_name.as_str())).unwrap_or(UNKNOWN_LEAD_NAME).to_string();

        Self {
            name,
            email: fields.get("email").map(ToString::to_string),
            phone: fields.get("phone").map(ToString::to_string),
            city: fields.get("city").map(ToString::to_string),
            description: format!("Lead from HubSpot ({lead_type})"),
            lead_type,
        }
    }
}
