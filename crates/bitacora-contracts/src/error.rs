//! Error types for the bitácora chain.
//!
//! Only infrastructure failures are errors. A chain that fails verification
//! is reported through `IntegrityReport`, never through `BitacoraError`, so
//! callers can tell "verification could not run" apart from "verification
//! ran and found tampering".

use thiserror::Error;

/// The unified error type for the bitácora crates.
#[derive(Debug, Error)]
pub enum BitacoraError {
    /// The canonical byte form of an entry could not be produced.
    ///
    /// Fatal and never retried.
    #[error("hash computation failed: {reason}")]
    HashComputation { reason: String },

    /// The store could not persist a new entry.
    ///
    /// The append is rejected as a whole. Retrying is only safe by running
    /// `append` again from the start, which re-reads the chain tail.
    #[error("persistence failed for chain '{chain_id}': {reason}")]
    Persistence { chain_id: String, reason: String },

    /// The store could not load the entries of a chain.
    #[error("failed to read chain '{chain_id}': {reason}")]
    StorageRead { chain_id: String, reason: String },

    /// The payload was rejected by the attached validator.
    #[error("invalid payload: {reason}")]
    InvalidPayload { reason: String },

    /// A correction entry referenced an entry that is not in the chain.
    #[error("entry '{entry_id}' referenced by a correction does not exist in chain '{chain_id}'")]
    UnknownCorrectionTarget { chain_id: String, entry_id: String },

    /// A chain identifier was empty, too long, or used forbidden characters.
    #[error("invalid chain id '{value}': {reason}")]
    InvalidChainId { value: String, reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// A snapshot or stored entry could not be (de)serialized.
    #[error("serialization error: {reason}")]
    Serialization { reason: String },
}

/// Convenience alias used throughout the bitácora crates.
pub type BitacoraResult<T> = Result<T, BitacoraError>;
