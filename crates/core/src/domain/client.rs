use serde::{Deserialize, Serialize};

pub const PLACEHOLDER_NAME: &str = "Valued Customer";
pub const PLACEHOLDER_TEXT: &str = "N/A";

/// Client contact fields as supplied by one source (the request or the CRM record).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientDetails {
    pub name: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl ClientDetails {
    /// True when every field is present, so no fallback source is needed.
    pub fn is_complete(&self) -> bool {
        [&self.name, &self.address, &self.email, &self.phone]
            .into_iter()
            .all(|field| non_blank(field.as_deref()).is_some())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClientInfo {
    pub name: String,
    pub address: String,
    pub email: String,
    pub phone: String,
}

impl ClientInfo {
    /// Resolves each field independently: request value, then CRM value, then placeholder.
    pub fn resolve(requested: &ClientDetails, fallback: Option<&ClientDetails>) -> Self {
        let pick = |requested: &Option<String>,
                    fallback: Option<&Option<String>>,
                    placeholder: &str| {
            non_blank(requested.as_deref())
                .or_else(|| fallback.and_then(|value| non_blank(value.as_deref())))
                .unwrap_or(placeholder)
                .to_string()
        };

        Self {
            name: pick(&requested.name, fallback.map(|f| &f.name), PLACEHOLDER_NAME),
            address: pick(&requested.address, fallback.map(|f| &f.address), PLACEHOLDER_TEXT),
            email: pick(&requested.email, fallback.map(|f| &f.email), PLACEHOLDER_TEXT),
            phone: pick(&requested.phone, fallback.map(|f| &f.phone), PLACEHOLDER_TEXT),
        }
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
