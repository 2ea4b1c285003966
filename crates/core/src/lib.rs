pub mod config;
pub mod domain;
pub mod errors;
pub mod rfq;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions};
pub use domain::client::{ClientDetails, ClientInfo};
pub use domain::lead::{LeadDraft, LeadFields};
pub use domain::line_item::LineItem;
pub use domain::quotation::{ProjectInfo, QuotationDocument, QuotationNumber};
pub use domain::record::RecordId;
pub use errors::{ApplicationError, InterfaceError, RenderError, ValidationError};
