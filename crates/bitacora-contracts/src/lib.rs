//! # bitacora-contracts
//!
//! Shared types, report model, and error taxonomy for the bitácora hash
//! chain.
//!
//! All crates in the workspace import from here. No hashing or storage logic
//! lives in this crate, only data definitions and error types.

pub mod chain;
pub mod entry;
pub mod error;
pub mod payload;
pub mod report;
pub mod validation;

pub use chain::{ChainId, Digest, EntryId};
pub use entry::{ChainSnapshot, LogEntry};
pub use error::{BitacoraError, BitacoraResult};
pub use payload::{Attachment, BitacoraRecord, EntryCategory, FieldValue, Payload};
pub use report::{BreakReason, IntegrityReport};
