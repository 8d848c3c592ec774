//! In-memory walk-through used by `bitacora demo`.
//!
//! Builds a short site log for a fictional job, verifies it, then edits,
//! reorders, and corrects entries to show what the verifier reports in each
//! case. Nothing is written to disk.

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use bitacora_contracts::{
    chain::ChainId,
    entry::LogEntry,
    error::{BitacoraError, BitacoraResult},
    payload::{Attachment, BitacoraRecord, EntryCategory, FieldValue},
};
use bitacora_core::{ChainBuilder, ChainStore, ChainVerifier};
use bitacora_schema::{presets::site_log_schema, SchemaValidator};
use bitacora_store::InMemoryChainStore;

use crate::commands::{format_entry, print_report};

const DEMO_CHAIN: &str = "obra-demo-torre-norte";

// ── Mock site data ────────────────────────────────────────────────────────────

/// Three entries from the first days of a fictional foundation job.
fn site_records() -> Vec<BitacoraRecord> {
    let day = |d: u32, h: u32| Utc.with_ymd_and_hms(2026, 3, d, h, 0, 0).single();
    let mut records = vec![
        BitacoraRecord::new(
            "Ing. Salas",
            EntryCategory::Progress,
            "Excavación de zapatas eje A terminada",
        ),
        BitacoraRecord::new(
            "Arq. Méndez",
            EntryCategory::Inspection,
            "Revisión de armado en zapatas eje A sin observaciones",
        )
        .with_attachment(Attachment {
            name: "armado-eje-a.jpg".to_string(),
            media_type: "image/jpeg".to_string(),
            size_bytes: 482_113,
            sha256: None,
        }),
        BitacoraRecord::new(
            "Ing. Salas",
            EntryCategory::Delivery,
            "Recepción de 18 m3 de concreto f'c=250",
        ),
    ];
    for (i, record) in records.iter_mut().enumerate() {
        if let Some(ts) = day(2 + i as u32, 9) {
            record.timestamp = ts;
        }
    }
    records
}

// ── Scenario runner ───────────────────────────────────────────────────────────

pub fn run_scenario() -> BitacoraResult<()> {
    println!("=== Bitácora demo: {DEMO_CHAIN} ===");
    println!();

    let store: Arc<dyn ChainStore> = Arc::new(InMemoryChainStore::new());
    let builder = ChainBuilder::new(Arc::clone(&store))
        .with_validator(Box::new(SchemaValidator::new(site_log_schema())?));
    let verifier = ChainVerifier::new();
    let chain = ChainId::new(DEMO_CHAIN)?;

    // ── [1] Build and verify the chain ────────────────────────────────────────

    println!("[1] Appending site records");
    for record in site_records() {
        let entry = builder.append_record(&chain, record)?;
        println!("  {}", format_entry(&entry));
    }
    let entries = store.load_chain(&chain)?;
    print_report("  stored chain", &verifier.verify(&entries));
    println!();

    // ── [2] Invalid records never reach the chain ─────────────────────────────

    println!("[2] Appending a record with an empty author");
    match builder.append_record(
        &chain,
        BitacoraRecord::new("", EntryCategory::Note, "Entrada sin autor"),
    ) {
        Err(BitacoraError::InvalidPayload { reason }) => println!("  rejected: {reason}"),
        Err(e) => return Err(e),
        Ok(entry) => println!("  unexpectedly accepted as #{}", entry.sequence_number),
    }
    println!();

    // ── [3] Edit one character of a stored description ────────────────────────

    println!("[3] Removing the 'x' from \"Excavación\" in entry #0");
    let mut edited = entries.clone();
    tamper_description(&mut edited[0], |d| d.replacen('x', "", 1));
    print_report("  edited copy", &verifier.verify(&edited));
    println!();

    // ── [4] Swap two entries ──────────────────────────────────────────────────

    println!("[4] Swapping entries #1 and #2");
    let mut swapped = entries.clone();
    swapped.swap(1, 2);
    print_report("  reordered copy", &verifier.verify(&swapped));
    println!();

    // ── [5] Corrections are new entries ───────────────────────────────────────

    println!("[5] Correcting the delivery volume with a new entry");
    let fix = builder.append_record(
        &chain,
        BitacoraRecord::new(
            "Ing. Salas",
            EntryCategory::Delivery,
            "Recepción de 16 m3 de concreto f'c=250 (remisión 2291)",
        )
        .correcting(entries[2].id),
    )?;
    println!("  {}", format_entry(&fix));
    let entries = store.load_chain(&chain)?;
    let report = verifier.verify(&entries);
    print_report("  stored chain", &report);
    println!("  status: {}", report.status_label());
    println!();

    Ok(())
}

fn tamper_description(entry: &mut LogEntry, edit: impl Fn(&str) -> String) {
    if let Some(value) = entry.payload.get_mut(BitacoraRecord::FIELD_DESCRIPTION) {
        if let Some(text) = value.as_text().map(|t| edit(t)) {
            *value = FieldValue::Text(text);
        }
    }
}

#[cfg(test)]
mod tests {
    use bitacora_contracts::report::BreakReason;

    use super::*;

    #[test]
    fn scenario_runs_to_completion() {
        run_scenario().unwrap();
    }

    #[test]
    fn site_records_pass_the_site_log_schema() {
        let store: Arc<dyn ChainStore> = Arc::new(InMemoryChainStore::new());
        let builder = ChainBuilder::new(Arc::clone(&store))
            .with_validator(Box::new(SchemaValidator::new(site_log_schema()).unwrap()));
        let chain = ChainId::new(DEMO_CHAIN).unwrap();

        for record in site_records() {
            builder.append_record(&chain, record).unwrap();
        }
        assert!(ChainVerifier::new().verify(&store.load_chain(&chain).unwrap()).verified);
    }

    #[test]
    fn tampered_description_is_reported_at_its_position() {
        let store: Arc<dyn ChainStore> = Arc::new(InMemoryChainStore::new());
        let builder = ChainBuilder::new(Arc::clone(&store));
        let chain = ChainId::new(DEMO_CHAIN).unwrap();
        for record in site_records() {
            builder.append_record(&chain, record).unwrap();
        }

        let mut entries = store.load_chain(&chain).unwrap();
        tamper_description(&mut entries[0], |d| d.replacen('x', "", 1));
        assert_eq!(
            entries[0].payload.get(BitacoraRecord::FIELD_DESCRIPTION).and_then(FieldValue::as_text),
            Some("Ecavación de zapatas eje A terminada")
        );

        let report = ChainVerifier::new().verify(&entries);
        assert!(!report.verified);
        assert_eq!(report.broken_at_sequence, Some(0));
        assert_eq!(report.reason, Some(BreakReason::HashMismatch));
    }
}
