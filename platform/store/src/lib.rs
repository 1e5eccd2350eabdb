//! Lightweight storage primitives. Everything lives in process memory.

mod session;
mod table;

pub use session::{MemorySessionStore, SessionStore, load_json, save_json};
pub use table::MemoryTable;

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: Uuid },
    #[error("{kind} {id} was modified concurrently")]
    Conflict { kind: &'static str, id: Uuid },
    #[error("{kind} {id} already exists")]
    Duplicate { kind: &'static str, id: Uuid },
    #[error("stored value for `{key}` is not valid JSON: {reason}")]
    Codec { key: String, reason: String },
}

pub type StoreResult<T> = Result<T, StoreError>;
