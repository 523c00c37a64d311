// Row Normalizer - raw sheet row to a candidate contact record
//
// Organization names get the corporate-suffix abbreviation applied before
// they ever reach the store, so two spellings differing only in suffix
// form collapse to one identity key and one export document.

use chrono::NaiveDate;

use crate::cell::{CellValue, JP_DATE_FORMAT};
use crate::db::ContactRecord;

/// Number of fields in a business-card row. Columns beyond this are ignored.
pub const FIELD_COUNT: usize = 13;

/// Canonical storage format for parseable exchange dates.
pub const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%d";

const CORPORATE_SUFFIX_FULL: &str = "株式会社";
const CORPORATE_SUFFIX_ABBREV: &str = "(株)";

// ============================================================================
// EXCHANGE DATE
// ============================================================================

/// Parse attempt for the card-exchange date cell.
///
/// A cell that does not parse against the Japanese display format is kept
/// verbatim instead of being silently dropped. An `Unparsed` date can never
/// win a "strictly newer" comparison, on either side of it, so a record
/// carrying one is insert-only.
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeDate {
    Parsed(NaiveDate),
    Unparsed(String),
}

impl ExchangeDate {
    /// Parse a date cell's text (e.g. "2024年01月10日").
    pub fn parse(text: &str) -> Self {
        match NaiveDate::parse_from_str(text, JP_DATE_FORMAT) {
            Ok(d) => ExchangeDate::Parsed(d),
            Err(_) => ExchangeDate::Unparsed(text.to_string()),
        }
    }

    /// Storage representation: canonical `YYYY-MM-DD` for a parsed date,
    /// the raw cell text verbatim otherwise.
    pub fn stored(&self) -> String {
        match self {
            ExchangeDate::Parsed(d) => d.format(CANONICAL_DATE_FORMAT).to_string(),
            ExchangeDate::Unparsed(raw) => raw.clone(),
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            ExchangeDate::Parsed(d) => Some(*d),
            ExchangeDate::Unparsed(_) => None,
        }
    }
}

// ============================================================================
// ROW NORMALIZATION
// ============================================================================

/// One normalized row: the candidate record plus its date parse attempt.
#[derive(Debug, Clone)]
pub struct NormalizedRow {
    pub record: ContactRecord,
    pub date: ExchangeDate,
}

/// Apply the corporate-suffix abbreviation to an organization name.
/// Exact substring replacement, no fuzzy matching.
pub fn abbreviate_organization(name: &str) -> String {
    name.replace(CORPORATE_SUFFIX_FULL, CORPORATE_SUFFIX_ABBREV)
}

/// Normalize one raw sheet row into a candidate record.
///
/// Rows shorter than [`FIELD_COUNT`] pad with empty cells; longer rows
/// ignore the tail. Never fails: malformed cells degrade to sentinel text.
pub fn normalize_row(cells: &[CellValue]) -> NormalizedRow {
    let mut fields: Vec<String> = (0..FIELD_COUNT)
        .map(|i| cells.get(i).map(CellValue::to_text).unwrap_or_default())
        .collect();

    fields[0] = abbreviate_organization(&fields[0]);

    let date = ExchangeDate::parse(&fields[10]);

    let record = ContactRecord {
        organization: fields[0].clone(),
        person_name: fields[1].clone(),
        department: fields[2].clone(),
        position: fields[3].clone(),
        email: fields[4].clone(),
        postal_code: fields[5].clone(),
        organization_address: fields[6].clone(),
        organization_phone: fields[7].clone(),
        organization_fax: fields[8].clone(),
        mobile_phone: fields[9].clone(),
        exchange_date: date.stored(),
        group_tag: fields[11].clone(),
        note: fields[12].clone(),
    };

    NormalizedRow { record, date }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_row(values: &[&str]) -> Vec<CellValue> {
        values.iter().map(|v| CellValue::Text(v.to_string())).collect()
    }

    fn full_row(org: &str, name: &str, dept: &str, date: &str) -> Vec<CellValue> {
        text_row(&[
            org, name, dept, "部長", "taro@example.co.jp", "100-0001", "東京都千代田区1-1",
            "03-1234-5678", "03-1234-5679", "090-1234-5678", date, "営業", "展示会で交換",
        ])
    }

    #[test]
    fn test_corporate_suffix_abbreviated() {
        assert_eq!(abbreviate_organization("Acme株式会社"), "Acme(株)");
        assert_eq!(abbreviate_organization("株式会社Acme"), "(株)Acme");
        assert_eq!(abbreviate_organization("Acme(株)"), "Acme(株)");
    }

    #[test]
    fn test_suffix_spellings_collapse_to_one_key() {
        let a = normalize_row(&full_row("Acme株式会社", "Taro", "Sales", "2024年01月10日"));
        let b = normalize_row(&full_row("Acme(株)", "Taro", "Sales", "2024年03月05日"));
        assert_eq!(a.record.identity(), b.record.identity());
        assert_eq!(a.record.organization, "Acme(株)");
    }

    #[test]
    fn test_parseable_date_stored_canonically() {
        let row = normalize_row(&full_row("Acme(株)", "Taro", "Sales", "2024年01月10日"));
        assert_eq!(row.date, ExchangeDate::Parsed(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()));
        assert_eq!(row.record.exchange_date, "2024-01-10");
    }

    #[test]
    fn test_unparseable_date_kept_verbatim() {
        let row = normalize_row(&full_row("Acme(株)", "Taro", "Sales", "去年の秋ごろ"));
        assert_eq!(row.date, ExchangeDate::Unparsed("去年の秋ごろ".to_string()));
        assert_eq!(row.record.exchange_date, "去年の秋ごろ");
        assert_eq!(row.date.as_date(), None);
    }

    #[test]
    fn test_short_row_pads_with_empty_fields() {
        let row = normalize_row(&text_row(&["Acme(株)", "Taro"]));
        assert_eq!(row.record.organization, "Acme(株)");
        assert_eq!(row.record.person_name, "Taro");
        assert_eq!(row.record.department, "");
        assert_eq!(row.record.note, "");
        assert_eq!(row.date, ExchangeDate::Unparsed(String::new()));
    }

    #[test]
    fn test_columns_beyond_field_count_ignored() {
        let mut cells = full_row("Acme(株)", "Taro", "Sales", "2024年01月10日");
        cells.push(CellValue::Text("spillover".to_string()));
        let row = normalize_row(&cells);
        assert_eq!(row.record.note, "展示会で交換");
    }

    #[test]
    fn test_cell_whitespace_trimmed_into_fields() {
        let row = normalize_row(&text_row(&[" Acme株式会社 ", " Taro "]));
        assert_eq!(row.record.organization, "Acme(株)");
        assert_eq!(row.record.person_name, "Taro");
    }
}
