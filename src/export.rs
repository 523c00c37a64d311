// Export Generator - per-organization tabular and card-book documents
//
// Export is a pure read + render step: it consumes records fetched from
// the store and never writes back to it.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_xlsxwriter::{Format, Workbook};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cell::JP_DATE_FORMAT;
use crate::db::ContactRecord;
use crate::normalize::CANONICAL_DATE_FORMAT;

/// Display labels for the 13 fields, in fixed display order.
pub const FIELD_LABELS: [&str; 13] = [
    "会社名", "名前", "部署", "役職", "電子メール", "郵便番号", "会社住所",
    "会社電話", "会社FAX", "携帯電話", "名刺交換日", "グループ", "メモ",
];

/// Index of the person-name field within [`FIELD_LABELS`].
const NAME_FIELD: usize = 1;

const SHEET_NAME: &str = "Contacts";

// ============================================================================
// RENDERING HELPERS
// ============================================================================

/// Replace filesystem-hostile characters in an organization name.
/// Presentation only; the store keeps the unsanitized name as the key.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}

/// Re-render a stored exchange date for display. Best-effort: stored text
/// that is not a canonical date passes through unchanged.
fn display_date(stored: &str) -> String {
    match NaiveDate::parse_from_str(stored, CANONICAL_DATE_FORMAT) {
        Ok(d) => d.format(JP_DATE_FORMAT).to_string(),
        Err(_) => stored.to_string(),
    }
}

/// Field values of one record in display order, date re-rendered.
pub fn display_values(record: &ContactRecord) -> [String; 13] {
    [
        record.organization.clone(),
        record.person_name.clone(),
        record.department.clone(),
        record.position.clone(),
        record.email.clone(),
        record.postal_code.clone(),
        record.organization_address.clone(),
        record.organization_phone.clone(),
        record.organization_fax.clone(),
        record.mobile_phone.clone(),
        display_date(&record.exchange_date),
        record.group_tag.clone(),
        record.note.clone(),
    ]
}

// ============================================================================
// EXPORTER
// ============================================================================

/// Writes the two per-organization documents under their sibling output
/// directories.
pub struct Exporter {
    table_dir: PathBuf,
    card_book_dir: PathBuf,
}

impl Exporter {
    pub fn new(table_dir: PathBuf, card_book_dir: PathBuf) -> Self {
        Exporter { table_dir, card_book_dir }
    }

    /// Create both output directories if missing.
    pub fn create_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.table_dir)
            .with_context(|| format!("failed to create {}", self.table_dir.display()))?;
        fs::create_dir_all(&self.card_book_dir)
            .with_context(|| format!("failed to create {}", self.card_book_dir.display()))?;
        Ok(())
    }

    /// Write both documents for one organization.
    pub fn export_organization(&self, organization: &str, records: &[ContactRecord]) -> Result<()> {
        let file_name = format!("{}.xlsx", sanitize_filename(organization));

        write_table(records, &self.table_dir.join(&file_name))?;
        write_card_book(records, &self.card_book_dir.join(&file_name))?;

        Ok(())
    }
}

/// Tabular layout: one header row naming all 13 fields, then one row per
/// record in store order.
pub fn write_table(records: &[ContactRecord], path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME).context("invalid sheet name")?;

    for (col, label) in FIELD_LABELS.iter().enumerate() {
        sheet
            .write_string(0, col as u16, *label)
            .context("failed to write header cell")?;
        // Cosmetic widths; wide enough for addresses and dates.
        sheet.set_column_width(col as u16, 18).context("failed to set column width")?;
    }

    for (row_idx, record) in records.iter().enumerate() {
        let values = display_values(record);
        for (col, value) in values.iter().enumerate() {
            sheet
                .write_string(row_idx as u32 + 1, col as u16, value)
                .context("failed to write record cell")?;
        }
    }

    workbook
        .save(path)
        .with_context(|| format!("failed to save {}", path.display()))?;

    Ok(())
}

/// Card-book layout: 13 consecutive (label, value) rows per record, no
/// separator rows. Consumers segment the document by the fixed 13-row
/// stride, so nothing else may be appended per record.
pub fn write_card_book(records: &[ContactRecord], path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME).context("invalid sheet name")?;

    let bold = Format::new().set_bold();

    let mut row = 0u32;
    for record in records {
        let values = display_values(record);
        for (field, label) in FIELD_LABELS.iter().enumerate() {
            sheet
                .write_string(row, 0, *label)
                .context("failed to write card label")?;

            if field == NAME_FIELD {
                sheet
                    .write_string_with_format(row, 1, &values[field], &bold)
                    .context("failed to write card value")?;
            } else {
                sheet
                    .write_string(row, 1, &values[field])
                    .context("failed to write card value")?;
            }

            row += 1;
        }
    }

    sheet.set_column_width(0, 12).context("failed to set label column width")?;
    sheet.set_column_width(1, 80).context("failed to set value column width")?;

    workbook
        .save(path)
        .with_context(|| format!("failed to save {}", path.display()))?;

    Ok(())
}
