//! CRM access for leadbridge.
//!
//! Everything talks to the CRM through [`CrmGateway`]. [`OdooClient`] is the JSON-RPC
//! implementation used in production and [`InMemoryCrm`] backs tests and local runs.
//! [`LeadRepository`] and [`AttachmentPublisher`] hold the model/field knowledge.

pub mod attachments;
pub mod gateway;
pub mod leads;
pub mod memory;
pub mod odoo;
pub mod query;

pub use attachments::{AnnotateError, AttachmentPublisher, AttachmentRef, PublishError};
pub use gateway::{ChatterMessage, CrmError, CrmGateway, RecordValues};
pub use leads::{LeadOutcome, LeadRepository, LeadSettings, ProjectRecord};
pub use memory::{CrmCall, CrmMethod, InMemoryCrm};
pub use odoo::{OdooClient, OdooSettings};
pub use query::{Condition, Operator, SearchDomain};
