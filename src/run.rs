// Run Controller - one strictly ordered batch pass
//
// Every data row is reconciled before any organization is discovered, and
// discovery happens exactly once before any export is written. Exports
// therefore always reflect the fully reconciled state of the whole input
// batch, never a partial one. Reconciliation is sequential by construction:
// lookup-then-write against the store is not atomic, so rows are never
// processed concurrently.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::db::{ContactRecord, ContactStore};
use crate::export::Exporter;
use crate::ingest;
use crate::reconcile::{ReconcileTally, Reconciler};

/// Inputs of one batch run. All paths are injected; defaults live in the
/// CLI layer.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input: PathBuf,
    pub db_path: PathBuf,
    pub table_dir: PathBuf,
    pub card_book_dir: PathBuf,
}

/// One organization whose export did not complete. The rest of the run
/// continues; failures are reported, not fatal.
#[derive(Debug, Clone)]
pub struct ExportFailure {
    pub organization: String,
    pub reason: String,
}

/// Outcome of a completed run.
#[derive(Debug)]
pub struct RunReport {
    pub tally: ReconcileTally,
    /// Every distinct organization discovered after reconciliation.
    pub organizations: Vec<String>,
    /// Organizations exported successfully, with the record sets their
    /// documents were rendered from (also what the publisher consumes).
    pub exported: Vec<(String, Vec<ContactRecord>)>,
    pub export_failures: Vec<ExportFailure>,
}

/// Execute one batch: reconcile every row, then export every organization.
pub fn run(config: &RunConfig) -> Result<RunReport> {
    let rows = ingest::read_rows(&config.input)?;
    tracing::info!("read {} data rows from {}", rows.len(), config.input.display());

    let store = ContactStore::open(&config.db_path)
        .with_context(|| format!("failed to open contact store {}", config.db_path.display()))?;

    // Phase 1: reconcile all rows, in sheet order. A store error escaping
    // here is a logic defect (see db::StoreError) and aborts the run.
    let reconciler = Reconciler::new(&store);
    let mut tally = ReconcileTally::default();
    for (idx, cells) in rows.iter().enumerate() {
        let outcome = reconciler
            .reconcile(cells)
            .with_context(|| format!("failed to reconcile data row {}", idx + 1))?;
        tally.record(outcome);
    }

    // Phase 2: discover organizations, exactly once.
    let organizations = store.distinct_organizations()?;

    // Phase 3: export each organization, both documents, independently.
    let exporter = Exporter::new(config.table_dir.clone(), config.card_book_dir.clone());
    exporter.create_dirs()?;

    let mut exported = Vec::new();
    let mut export_failures = Vec::new();
    for organization in &organizations {
        let result = store
            .records_for(organization)
            .map_err(anyhow::Error::from)
            .and_then(|records| {
                exporter.export_organization(organization, &records)?;
                Ok(records)
            });

        match result {
            Ok(records) => exported.push((organization.clone(), records)),
            Err(e) => {
                tracing::warn!("export failed for {}: {:#}", organization, e);
                export_failures.push(ExportFailure {
                    organization: organization.clone(),
                    reason: format!("{:#}", e),
                });
            }
        }
    }

    Ok(RunReport {
        tally,
        organizations,
        exported,
        export_failures,
    })
}
