//! Session-scoped medication inventory: record type, in-memory store, CSV export.

pub mod export;
pub mod store;
pub mod types;

pub use export::*;
pub use store::*;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum InventoryError {
    #[error("No medications to export for session '{0}'")]
    EmptySession(String),
}
