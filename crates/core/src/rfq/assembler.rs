use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;

use crate::config::QuotationConfig;
use crate::domain::client::ClientInfo;
use crate::domain::line_item::LineItem;
use crate::domain::quotation::{
    ProjectInfo, QuotationDocument, QuotationNumber, DISPLAY_DATE_FORMAT,
};

const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuotationPolicy {
    pub validity_days: u32,
    /// Fraction applied to the subtotal; zero means no tax line.
    pub tax_rate: Decimal,
}

impl Default for QuotationPolicy {
    fn default() -> Self {
        Self { validity_days: 15, tax_rate: Decimal::ZERO }
    }
}

impl From<&QuotationConfig> for QuotationPolicy {
    fn from(config: &QuotationConfig) -> Self {
        Self { validity_days: config.validity_days, tax_rate: config.tax_rate }
    }
}

pub trait QuotationNumberSource: Send + Sync {
    fn next_number(&self) -> QuotationNumber;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RandomQuotationNumbers;

impl QuotationNumberSource for RandomQuotationNumbers {
    fn next_number(&self) -> QuotationNumber {
        QuotationNumber::generate()
    }
}

#[derive(Clone, Debug)]
pub struct QuotationRequest {
    pub quotation_number: QuotationNumber,
    pub issue_date: NaiveDate,
    pub expiration_override: Option<NaiveDate>,
    pub client: ClientInfo,
    pub project: ProjectInfo,
    pub line_items: Vec<LineItem>,
}

/// Prices the line items and builds the document. Pure; performs no I/O.
pub fn assemble(request: QuotationRequest, policy: &QuotationPolicy) -> QuotationDocument {
    let subtotal = request
        .line_items
        .iter()
        .fold(Decimal::ZERO, |sum, item| sum.saturating_add(item.line_total()));
    let tax = subtotal.saturating_mul(policy.tax_rate);
    let total = subtotal.saturating_add(tax);

    let expiration_date = request
        .expiration_override
        .unwrap_or_else(|| default_expiration(request.issue_date, policy.validity_days));

    QuotationDocument {
        quotation_number: request.quotation_number,
        issue_date: request.issue_date,
        expiration_date,
        client: request.client,
        project: request.project,
        line_items: request.line_items,
        subtotal,
        tax,
        total,
    }
}

pub fn default_expiration(issue_date: NaiveDate, validity_days: u32) -> NaiveDate {
    issue_date.checked_add_days(Days::new(u64::from(validity_days))).unwrap_or(NaiveDate::MAX)
}

/// Accepts `MM/DD/YYYY` (the document format) or ISO `YYYY-MM-DD` (HTML date inputs).
pub fn parse_expiration_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, DISPLAY_DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(raw, ISO_DATE_FORMAT))
        .ok()
}
