//! Persistence layer — libSQL-backed document store and inquiry records.

pub mod inquiries;
pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use inquiries::{InquiryRecord, InquiryStore};
pub use libsql_backend::LibSqlBackend;
pub use traits::{
    ContainerProperties, DocumentStore, ItemReceipt, PartitionKeyDefinition, PartitionKind,
    Provisioned,
};
