//! Subcommand implementations.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::Args;

use bitacora_contracts::{
    chain::{ChainId, EntryId},
    entry::LogEntry,
    error::{BitacoraError, BitacoraResult},
    payload::{Attachment, BitacoraRecord, EntryCategory, FieldValue},
    report::IntegrityReport,
};
use bitacora_core::ChainStore;
use bitacora_store::{export_snapshot, read_snapshot, verify_snapshot, write_snapshot};

use crate::runtime::Runtime;

/// How a command finished, mapped to the process exit code by `main`.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Verification ran and found a broken chain.
    Compromised,
}

// ── Arguments ─────────────────────────────────────────────────────────────────

#[derive(Args)]
pub struct AppendArgs {
    #[arg(long)]
    pub chain: ChainId,
    #[arg(long)]
    pub author: String,
    /// incident, progress, inspection, delivery, safety, or note.
    #[arg(long)]
    pub category: EntryCategory,
    #[arg(long)]
    pub description: String,
    /// RFC 3339 time of the event. Defaults to now.
    #[arg(long)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Attachment metadata as NAME:MEDIA_TYPE:SIZE_BYTES[:SHA256]. Repeatable.
    #[arg(long = "attachment", value_parser = parse_attachment)]
    pub attachments: Vec<Attachment>,
    /// Id of an earlier entry in the same chain that this entry corrects.
    #[arg(long)]
    pub corrects: Option<EntryId>,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct VerifyArgs {
    #[arg(long)]
    pub chain: Option<ChainId>,
    /// Verify a snapshot file written by `export` instead of the store.
    #[arg(long)]
    pub snapshot: Option<PathBuf>,
}

#[derive(Args)]
pub struct ShowArgs {
    #[arg(long)]
    pub chain: ChainId,
    /// Print entries as JSON lines instead of a table.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ExportArgs {
    #[arg(long)]
    pub chain: ChainId,
    #[arg(long)]
    pub output: PathBuf,
}

/// Parse `NAME:MEDIA_TYPE:SIZE_BYTES[:SHA256]`.
pub fn parse_attachment(s: &str) -> Result<Attachment, String> {
    let parts: Vec<&str> = s.split(':').collect();
    let (name, media_type, size, sha256) = match parts.as_slice() {
        [name, media, size] => (*name, *media, *size, None),
        [name, media, size, sha] => (*name, *media, *size, Some(sha.to_string())),
        _ => return Err(format!("expected NAME:MEDIA_TYPE:SIZE_BYTES[:SHA256], got '{s}'")),
    };
    if name.is_empty() {
        return Err("attachment name must not be empty".to_string());
    }
    let size_bytes = size
        .parse::<u64>()
        .map_err(|e| format!("invalid attachment size '{size}': {e}"))?;
    Ok(Attachment {
        name: name.to_string(),
        media_type: media_type.to_string(),
        size_bytes,
        sha256,
    })
}

// ── Commands ──────────────────────────────────────────────────────────────────

pub fn append(rt: &Runtime, args: AppendArgs) -> BitacoraResult<Outcome> {
    let record = BitacoraRecord {
        author: args.author,
        category: args.category,
        timestamp: args.timestamp.unwrap_or_else(Utc::now),
        description: args.description,
        attachments: args.attachments,
        corrects: args.corrects,
    };

    let entry = rt.builder.append_record(&args.chain, record)?;
    println!(
        "appended {} #{} to '{}'",
        entry.id, entry.sequence_number, args.chain
    );
    println!("  previous: {}", entry.previous_hash);
    println!("  hash:     {}", entry.hash);
    Ok(Outcome::Success)
}

pub fn verify(rt: &Runtime, args: VerifyArgs) -> BitacoraResult<Outcome> {
    let (label, report) = match (args.chain, args.snapshot) {
        (Some(chain), _) => {
            let report = rt.verifier.verify_chain(rt.store.as_ref(), &chain)?;
            (format!("chain '{chain}'"), report)
        }
        (None, Some(path)) => {
            let snapshot = read_snapshot(&path)?;
            let report = verify_snapshot(&rt.verifier, &snapshot);
            if !report.verified && rt.verifier.verify(&snapshot.entries).verified {
                println!(
                    "snapshot '{}' declares terminal hash {} but its entries end elsewhere",
                    path.display(),
                    snapshot
                        .terminal_hash
                        .map_or_else(|| "(none)".to_string(), |h| h.to_hex())
                );
            }
            (format!("snapshot '{}'", path.display()), report)
        }
        (None, None) => {
            return Err(BitacoraError::ConfigError {
                reason: "either --chain or --snapshot is required".to_string(),
            })
        }
    };

    print_report(&label, &report);
    Ok(if report.verified {
        Outcome::Success
    } else {
        Outcome::Compromised
    })
}

pub fn show(rt: &Runtime, args: ShowArgs) -> BitacoraResult<Outcome> {
    let entries = rt.store.load_chain(&args.chain)?;
    if args.json {
        for entry in &entries {
            let line = serde_json::to_string(entry).map_err(|e| BitacoraError::Serialization {
                reason: e.to_string(),
            })?;
            println!("{line}");
        }
        return Ok(Outcome::Success);
    }

    println!("chain '{}': {} entries", args.chain, entries.len());
    for entry in &entries {
        println!("{}", format_entry(entry));
    }
    Ok(Outcome::Success)
}

pub fn export(rt: &Runtime, args: ExportArgs) -> BitacoraResult<Outcome> {
    let snapshot = export_snapshot(rt.store.as_ref(), &args.chain)?;
    write_snapshot(&snapshot, &args.output)?;
    println!(
        "exported {} entries of '{}' to {}",
        snapshot.entries.len(),
        args.chain,
        args.output.display()
    );
    if let Some(hash) = snapshot.terminal_hash {
        println!("  terminal hash: {hash}");
    }
    Ok(Outcome::Success)
}

pub fn chains(rt: &Runtime) -> BitacoraResult<Outcome> {
    for id in rt.store.chain_ids()? {
        let len = rt.store.load_chain(&id)?.len();
        println!("{id}\t{len} entries");
    }
    Ok(Outcome::Success)
}

// ── Rendering ─────────────────────────────────────────────────────────────────

pub fn print_report(label: &str, report: &IntegrityReport) {
    println!("{label}: {report}");
    if let Some(hash) = report.terminal_hash {
        println!("  terminal hash: {hash}");
    }
    if let Some(id) = report.broken_entry_id {
        println!("  first broken entry: {id}");
    }
}

/// One line per entry: sequence, short hash, category, author, description.
pub fn format_entry(entry: &LogEntry) -> String {
    let text = |key: &str| {
        entry
            .payload
            .get(key)
            .and_then(FieldValue::as_text)
            .unwrap_or("-")
            .to_string()
    };
    let hash = entry.hash.to_hex();
    let mut line = format!(
        "#{:<4} {}  [{}] {}: {}",
        entry.sequence_number,
        &hash[..12],
        text(BitacoraRecord::FIELD_CATEGORY),
        text(BitacoraRecord::FIELD_AUTHOR),
        text(BitacoraRecord::FIELD_DESCRIPTION),
    );
    if let Ok(Some(target)) = entry.payload.corrects() {
        line.push_str(&format!("  (corrige {target})"));
    }
    line
}
