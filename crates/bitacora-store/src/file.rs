//! File-backed implementation of `ChainStore`.
//!
//! One JSON-lines file per chain, `<dir>/<chain_id>.jsonl`, one `LogEntry`
//! per line in chain order.
//!
//! An append writes the current file contents plus the new line to
//! `<chain_id>.jsonl.tmp`, syncs it, and renames it over the chain file.
//! The rename is the commit point: if anything before it fails, the chain
//! file is untouched and the temp file is removed.
//!
//! Cost: every append reads, parses, and rewrites the whole chain file, and
//! `tail` / `contains_entry` use the trait defaults, which load the whole
//! chain. Each append is therefore O(n) in the chain length.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use bitacora_contracts::{
    chain::ChainId,
    entry::LogEntry,
    error::{BitacoraError, BitacoraResult},
};
use bitacora_core::traits::ChainStore;

use crate::tail::ensure_extends_tail;

const CHAIN_FILE_EXTENSION: &str = "jsonl";

/// A chain store rooted at a directory.
#[derive(Debug)]
pub struct FileChainStore {
    dir: PathBuf,
    /// Serializes writers within this process. Cross-process writers are
    /// not supported.
    write_lock: Mutex<()>,
}

impl FileChainStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> BitacoraResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| BitacoraError::ConfigError {
            reason: format!("cannot create store directory '{}': {e}", dir.display()),
        })?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn chain_path(&self, chain_id: &ChainId) -> PathBuf {
        self.dir
            .join(format!("{}.{}", chain_id.as_str(), CHAIN_FILE_EXTENSION))
    }

    fn temp_path(&self, chain_id: &ChainId) -> PathBuf {
        self.dir
            .join(format!("{}.{}.tmp", chain_id.as_str(), CHAIN_FILE_EXTENSION))
    }

    /// Raw bytes of the chain file; empty if the chain does not exist yet.
    fn read_raw(&self, chain_id: &ChainId) -> BitacoraResult<Vec<u8>> {
        match fs::read(self.chain_path(chain_id)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(BitacoraError::StorageRead {
                chain_id: chain_id.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn parse(chain_id: &ChainId, raw: &[u8]) -> BitacoraResult<Vec<LogEntry>> {
        let text = std::str::from_utf8(raw).map_err(|e| BitacoraError::StorageRead {
            chain_id: chain_id.to_string(),
            reason: format!("chain file is not UTF-8: {e}"),
        })?;

        text.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str(line).map_err(|e| BitacoraError::StorageRead {
                    chain_id: chain_id.to_string(),
                    reason: format!("line {}: {e}", n + 1),
                })
            })
            .collect()
    }

    /// Write `contents` to the temp file, sync, and rename over the chain file.
    fn commit(&self, chain_id: &ChainId, contents: &[u8]) -> io::Result<()> {
        let temp = self.temp_path(chain_id);
        let result = (|| {
            let mut file = File::create(&temp)?;
            file.write_all(contents)?;
            file.sync_all()?;
            fs::rename(&temp, self.chain_path(chain_id))
        })();

        if result.is_err() {
            // Best effort; a leftover temp file is never read.
            let _ = fs::remove_file(&temp);
        }
        result
    }
}

impl ChainStore for FileChainStore {
    fn load_chain(&self, chain_id: &ChainId) -> BitacoraResult<Vec<LogEntry>> {
        let raw = self.read_raw(chain_id)?;
        Self::parse(chain_id, &raw)
    }

    /// Append `entry`, refusing it unless it extends the stored tail.
    fn persist_entry(&self, chain_id: &ChainId, entry: &LogEntry) -> BitacoraResult<()> {
        let _guard = self.write_lock.lock().map_err(|e| BitacoraError::Persistence {
            chain_id: chain_id.to_string(),
            reason: format!("file store lock poisoned: {e}"),
        })?;

        let mut raw = self.read_raw(chain_id)?;
        let existing = Self::parse(chain_id, &raw)?;
        ensure_extends_tail(chain_id, existing.last(), entry)?;

        let line = serde_json::to_string(entry).map_err(|e| BitacoraError::Persistence {
            chain_id: chain_id.to_string(),
            reason: format!("cannot serialize entry: {e}"),
        })?;
        if !raw.is_empty() && !raw.ends_with(b"\n") {
            raw.push(b'\n');
        }
        raw.extend_from_slice(line.as_bytes());
        raw.push(b'\n');

        self.commit(chain_id, &raw).map_err(|e| {
            warn!(chain_id = %chain_id, error = %e, "chain file commit failed");
            BitacoraError::Persistence {
                chain_id: chain_id.to_string(),
                reason: e.to_string(),
            }
        })?;

        debug!(
            chain_id = %chain_id,
            sequence = entry.sequence_number,
            path = %self.chain_path(chain_id).display(),
            "entry stored on disk"
        );
        Ok(())
    }

    fn chain_ids(&self) -> BitacoraResult<Vec<ChainId>> {
        let read_err = |e: io::Error| BitacoraError::StorageRead {
            chain_id: "*".to_string(),
            reason: format!("cannot list '{}': {e}", self.dir.display()),
        };

        let mut ids = Vec::new();
        for dir_entry in fs::read_dir(&self.dir).map_err(read_err)? {
            let path = dir_entry.map_err(read_err)?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(CHAIN_FILE_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match ChainId::new(stem) {
                Ok(id) => ids.push(id),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping foreign file"),
            }
        }
        ids.sort();
        Ok(ids)
    }
}
