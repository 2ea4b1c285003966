//! RFQ submission handling: form boundary, row normalization and quotation assembly.
//!
//! ```text
//! RfqForm --validate--> RfqSubmission --normalize--> [LineItem] --assemble--> QuotationDocument
//! ```

pub mod assembler;
pub mod form;
pub mod normalizer;

pub use assembler::{
    assemble, default_expiration, parse_expiration_date, QuotationNumberSource, QuotationPolicy,
    QuotationRequest, RandomQuotationNumbers,
};
pub use form::{RfqForm, RfqSubmission};
pub use normalizer::{normalize, NormalizedRows, RawLineItems};
