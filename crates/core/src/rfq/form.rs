use crate::domain::client::{non_blank, ClientDetails};
use crate::domain::quotation::ProjectInfo;
use crate::domain::record::RecordId;
use crate::errors::ValidationError;
use crate::rfq::normalizer::RawLineItems;

const RECORD_ID_FIELD: &str = "lead_id";
const RECORD_ID_ALIAS: &str = "target_record_id";

/// Raw RFQ form as posted, before any validation.
///
/// Built from the ordered `(name, value)` pairs of an urlencoded body so that the
/// repeated `field_name[]` style keys keep their positions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RfqForm {
    pub lead_id: Option<String>,
    pub client_name: Option<String>,
    pub client_address: Option<String>,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub expiration_date: Option<String>,
    pub project_name: Option<String>,
    pub project_description: Option<String>,
    pub project_category: Option<String>,
    pub rows: RawLineItems,
}

/// A form that passed validation. Holding one means the record id is usable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RfqSubmission {
    pub target_record_id: RecordId,
    pub client: ClientDetails,
    pub project: ProjectInfo,
    pub expiration_date: Option<String>,
    pub rows: RawLineItems,
}

impl RfqForm {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut form = Self::default();
        for (key, value) in pairs {
            let key = key.as_ref();
            let value = value.into();
            match key.strip_suffix("[]").unwrap_or(key) {
                "field_name" => form.rows.names.push(value),
                "field_value" => form.rows.values.push(value),
                "quantity" => form.rows.quantities.push(value),
                "unit_price" => form.rows.unit_prices.push(value),
                RECORD_ID_FIELD => form.lead_id = Some(value),
                // the canonical name wins when both are posted
                RECORD_ID_ALIAS => {
                    form.lead_id.get_or_insert(value);
                }
                "client_name" => form.client_name = Some(value),
                "client_address" => form.client_address = Some(value),
                "client_email" => form.client_email = Some(value),
                "client_phone" => form.client_phone = Some(value),
                "expiration_date" => form.expiration_date = Some(value),
                "project_name" => form.project_name = Some(value),
                "project_description" => form.project_description = Some(value),
                "project_category" => form.project_category = Some(value),
                _ => {}
            }
        }
        form
    }

    pub fn validate(self) -> Result<RfqSubmission, ValidationError> {
        let target_record_id = RecordId::parse(RECORD_ID_FIELD, self.lead_id.as_deref())?;

        Ok(RfqSubmission {
            target_record_id,
            client: ClientDetails {
                name: trimmed(self.client_name),
                address: trimmed(self.client_address),
                email: trimmed(self.client_email),
                phone: trimmed(self.client_phone),
            },
            project: ProjectInfo {
                name: trimmed(self.project_name),
                description: trimmed(self.project_description),
                category: trimmed(self.project_category),
            },
            expiration_date: trimmed(self.expiration_date),
            rows: self.rows,
        })
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    non_blank(value.as_deref()).map(ToString::to_string)
}
