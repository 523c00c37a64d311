// Meishi Organizer - Core Library
// Exposes all modules for use in the CLI and tests

pub mod cell;
pub mod db;
pub mod export;
pub mod ingest;
pub mod normalize;
pub mod publish;
pub mod reconcile;
pub mod run;

// Re-export commonly used types
pub use cell::{CellValue, JP_DATE_FORMAT};
pub use db::{ContactRecord, ContactStore, StoreError};
pub use export::{sanitize_filename, Exporter, FIELD_LABELS};
pub use ingest::read_rows;
pub use normalize::{abbreviate_organization, normalize_row, ExchangeDate, NormalizedRow, FIELD_COUNT};
pub use publish::{IssuePublisher, PublishConfig};
pub use reconcile::{ReconcileOutcome, ReconcileTally, Reconciler};
pub use run::{run, ExportFailure, RunConfig, RunReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
