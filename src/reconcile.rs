// Reconciler - insert new / update if strictly newer / skip otherwise
//
// The core correctness property is an idempotent, monotonic-by-date
// upsert: replaying the same or an older-dated row is a no-op, only a
// strictly newer-dated row for an existing identity overwrites, and a
// previously-unseen identity always inserts regardless of date validity.

use chrono::NaiveDate;

use crate::cell::CellValue;
use crate::db::{ContactStore, StoreError};
use crate::normalize::{normalize_row, ExchangeDate, CANONICAL_DATE_FORMAT};

// ============================================================================
// OUTCOME
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The identity key was new and the record was inserted.
    Inserted,
    /// An existing record carried a strictly older date and was overwritten.
    Updated,
    /// No mutation: same date, older date, or a date that never parsed.
    Skipped,
}

/// Running tally of reconciliation outcomes for one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileTally {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
}

impl ReconcileTally {
    pub fn record(&mut self, outcome: ReconcileOutcome) {
        match outcome {
            ReconcileOutcome::Inserted => self.inserted += 1,
            ReconcileOutcome::Updated => self.updated += 1,
            ReconcileOutcome::Skipped => self.skipped += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.inserted + self.updated + self.skipped
    }
}

// ============================================================================
// RECONCILER
// ============================================================================

/// Decides, per row, whether the store gains a record, overwrites one, or
/// stays untouched. Holds no state of its own; the store is the state.
pub struct Reconciler<'a> {
    store: &'a ContactStore,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a ContactStore) -> Self {
        Reconciler { store }
    }

    /// Reconcile one raw sheet row against the store.
    pub fn reconcile(&self, cells: &[CellValue]) -> Result<ReconcileOutcome, StoreError> {
        let normalized = normalize_row(cells);
        let (organization, person_name, department) = normalized.record.identity();

        match self.store.lookup(organization, person_name, department)? {
            None => {
                self.store.insert(&normalized.record)?;
                Ok(ReconcileOutcome::Inserted)
            }
            Some(stored_date) => {
                if is_strictly_newer(&normalized.date, &stored_date) {
                    self.store.update(&normalized.record)?;
                    Ok(ReconcileOutcome::Updated)
                } else {
                    Ok(ReconcileOutcome::Skipped)
                }
            }
        }
    }
}

/// Calendar comparison of a candidate date against the stored text.
/// Never errors: a side that fails to parse compares as "not newer".
fn is_strictly_newer(candidate: &ExchangeDate, stored: &str) -> bool {
    let candidate_date = match candidate.as_date() {
        Some(d) => d,
        None => return false,
    };

    match NaiveDate::parse_from_str(stored, CANONICAL_DATE_FORMAT) {
        Ok(stored_date) => candidate_date > stored_date,
        Err(_) => false,
    }
}
