//! Wiring from configuration to a builder, verifier, and store.

use std::sync::Arc;

use tracing::{debug, warn};

use bitacora_config::{BitacoraConfig, StoreKind};
use bitacora_contracts::error::BitacoraResult;
use bitacora_core::{ChainBuilder, ChainStore, ChainVerifier};
use bitacora_schema::SchemaValidator;
use bitacora_store::{FileChainStore, InMemoryChainStore};

/// The components every command works with.
pub struct Runtime {
    pub store: Arc<dyn ChainStore>,
    pub builder: ChainBuilder,
    pub verifier: ChainVerifier,
}

impl Runtime {
    pub fn from_config(config: &BitacoraConfig) -> BitacoraResult<Self> {
        let store: Arc<dyn ChainStore> = match config.store.kind {
            StoreKind::File => {
                debug!(directory = %config.store.directory.display(), "opening file store");
                Arc::new(FileChainStore::open(config.store.directory.clone())?)
            }
            StoreKind::Memory => {
                warn!("memory store selected; entries are lost when the process exits");
                Arc::new(InMemoryChainStore::new())
            }
        };

        let mut builder = ChainBuilder::new(Arc::clone(&store));
        if let Some(schema) = config.payload_schema()? {
            debug!(schema_id = %schema.schema_id, "payload validation enabled");
            builder = builder.with_validator(Box::new(SchemaValidator::new(schema)?));
        }

        Ok(Self {
            store,
            builder,
            verifier: ChainVerifier::new(),
        })
    }
}
