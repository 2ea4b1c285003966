use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::domain::client::ClientInfo;
use crate::domain::line_item::LineItem;

pub const QUOTATION_PREFIX: &str = "QT-";
pub const QUOTATION_SUFFIX_LEN: usize = 8;
pub const DISPLAY_DATE_FORMAT: &str = "%m/%d/%Y";

const SUFFIX_ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct QuotationNumber(String);

impl QuotationNumber {
    /// Fresh number from a random v4 token. Uniqueness is probabilistic only.
    pub fn generate() -> Self {
        Self::from_token(Uuid::new_v4())
    }

    /// Encodes the low base-36 digits of the token as `QT-XXXXXXXX`.
    pub fn from_token(token: Uuid) -> Self {
        let mut value = token.as_u128();
        let mut suffix = String::with_capacity(QUOTATION_SUFFIX_LEN);
        for _ in 0..QUOTATION_SUFFIX_LEN {
            suffix.push(char::from(SUFFIX_ALPHABET[(value % 36) as usize]));
            value /= 36;
        }
        Self(format!("{QUOTATION_PREFIX}{suffix}"))
    }

    pub fn is_well_formed(raw: &str) -> bool {
        raw.strip_prefix(QUOTATION_PREFIX).is_some_and(|suffix| {
            suffix.len() == QUOTATION_SUFFIX_LEN
                && suffix.bytes().all(|byte| byte.is_ascii_digit() || byte.is_ascii_uppercase())
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuotationNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ProjectInfo {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
}

/// Fully priced quotation, built once per submission by the assembler.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuotationDocument {
    pub(crate) quotation_number: QuotationNumber,
    #[serde(serialize_with = "serialize_display_date")]
    pub(crate) issue_date: NaiveDate,
    #[serde(serialize_with = "serialize_display_date")]
    pub(crate) expiration_date: NaiveDate,
    pub(crate) client: ClientInfo,
    pub(crate) project: ProjectInfo,
    pub(crate) line_items: Vec<LineItem>,
    pub(crate) subtotal: Decimal,
    pub(crate) tax: Decimal,
    pub(crate) total: Decimal,
}

impl QuotationDocument {
    pub fn quotation_number(&self) -> &QuotationNumber {
        &self.quotation_number
    }

    pub fn issue_date(&self) -> NaiveDate {
        self.issue_date
    }

    pub fn expiration_date(&self) -> NaiveDate {
        self.expiration_date
    }

    pub fn client(&self) -> &ClientInfo {
        &self.client
    }

    pub fn project(&self) -> &ProjectInfo {
        &self.project
    }

    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    pub fn subtotal(&self) -> Decimal {
        self.subtotal
    }

    pub fn tax(&self) -> Decimal {
        self.tax
    }

    pub fn total(&self) -> Decimal {
        self.total
    }
}

pub fn format_display_date(date: NaiveDate) -> String {
    date.format(DISPLAY_DATE_FORMAT).to_string()
}

fn serialize_display_date<S: Serializer>(
    date: &NaiveDate,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_display_date(*date))
}
