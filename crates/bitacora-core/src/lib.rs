//! # bitacora-core
//!
//! Tamper-evident chaining for the bitácora operational log.
//!
//! This crate provides:
//! - The collaborator traits (`DigestFunction`, `ChainStore`, `PayloadValidator`)
//! - `Sha256Digest`, the production digest adapter
//! - `canonicalize`, the frozen byte layout every hash commits to
//! - `ChainBuilder` (`append`) and `ChainVerifier` (`verify`), the only two
//!   operations on a chain
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use bitacora_core::{ChainBuilder, ChainVerifier};
//! use bitacora_store::InMemoryChainStore;
//!
//! let store = Arc::new(InMemoryChainStore::new());
//! let builder = ChainBuilder::new(store.clone());
//! builder.append_record(&chain_id, record)?;
//!
//! let report = ChainVerifier::new().verify_chain(store.as_ref(), &chain_id)?;
//! assert!(report.verified);
//! ```

pub mod builder;
pub mod canonical;
pub mod digest;
pub mod traits;
pub mod verifier;

pub use builder::ChainBuilder;
pub use canonical::{canonicalize, canonicalize_entry, CANONICAL_VERSION};
pub use digest::Sha256Digest;
pub use traits::{ChainStore, DigestFunction, PayloadValidator};
pub use verifier::{verify_chain, ChainVerifier};

// ── Tests ─────────────────────────────────────────────────────────────────────
