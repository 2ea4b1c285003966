pub mod client;
pub mod lead;
pub mod line_item;
pub mod quotation;
pub mod record;
