// Cell model - one spreadsheet cell as handed to the row normalizer
//
// Conversion is a pure function: every call returns a fresh String, no
// shared row buffer is reused across cell types.

use calamine::Data;
use chrono::NaiveDate;

/// Display format for business-card exchange dates (e.g. "2024年01月10日").
/// Source sheets carry dates in this rendering and the exports re-emit it,
/// so the pattern must stay byte-identical on both sides.
pub const JP_DATE_FORMAT: &str = "%Y年%m月%d日";

/// One typed cell value from the input sheet.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Int(i64),
    Bool(bool),
    Date(NaiveDate),
    /// A formula cell carries its source expression, not the cached result.
    /// Downstream text conversion passes the expression through verbatim.
    Formula(String),
    Error,
    Empty,
}

impl CellValue {
    /// Build a cell from what calamine extracted, overlaying the formula
    /// source when the sheet stores one at the same position.
    pub fn from_sheet(data: &Data, formula: Option<&str>) -> Self {
        if let Some(src) = formula {
            if !src.is_empty() {
                return CellValue::Formula(src.to_string());
            }
        }

        match data {
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Float(n) => CellValue::Number(*n),
            Data::Int(n) => CellValue::Int(*n),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::DateTime(dt) => match dt.as_datetime() {
                Some(d) => CellValue::Date(d.date()),
                None => CellValue::Empty,
            },
            Data::DateTimeIso(s) => match s
                .get(..10)
                .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
            {
                Some(d) => CellValue::Date(d),
                None => CellValue::Text(s.clone()),
            },
            Data::DurationIso(s) => CellValue::Text(s.clone()),
            Data::Error(_) => CellValue::Error,
            Data::Empty => CellValue::Empty,
        }
    }

    /// Coerce the cell to text.
    ///
    /// - text trims surrounding whitespace
    /// - numbers format as an integer when there is no fractional part
    /// - booleans format as their literal word
    /// - dates render in the Japanese calendar display format
    /// - formulas pass their source expression through verbatim
    /// - error and empty cells reduce to ""
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            CellValue::Int(n) => n.to_string(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Date(d) => d.format(JP_DATE_FORMAT).to_string(),
            CellValue::Formula(src) => src.clone(),
            CellValue::Error | CellValue::Empty => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_is_trimmed() {
        assert_eq!(CellValue::Text("  Acme(株)  ".to_string()).to_text(), "Acme(株)");
    }

    #[test]
    fn test_fractionless_float_formats_as_integer() {
        assert_eq!(CellValue::Number(1050.0).to_text(), "1050");
        assert_eq!(CellValue::Number(-3.0).to_text(), "-3");
    }

    #[test]
    fn test_fractional_float_keeps_decimals() {
        assert_eq!(CellValue::Number(1.5).to_text(), "1.5");
    }

    #[test]
    fn test_bool_formats_as_literal_word() {
        assert_eq!(CellValue::Bool(true).to_text(), "true");
        assert_eq!(CellValue::Bool(false).to_text(), "false");
    }

    #[test]
    fn test_date_renders_japanese_format() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        assert_eq!(CellValue::Date(d).to_text(), "2024年01月10日");
    }

    #[test]
    fn test_formula_source_passes_through_verbatim() {
        let cell = CellValue::Formula("SUM(A1:A3) ".to_string());
        assert_eq!(cell.to_text(), "SUM(A1:A3) ");
    }

    #[test]
    fn test_error_and_empty_reduce_to_empty_string() {
        assert_eq!(CellValue::Error.to_text(), "");
        assert_eq!(CellValue::Empty.to_text(), "");
    }

    #[test]
    fn test_formula_overlay_wins_over_cached_value() {
        let cell = CellValue::from_sheet(&Data::Float(42.0), Some("A1+A2"));
        assert_eq!(cell, CellValue::Formula("A1+A2".to_string()));
    }

    #[test]
    fn test_empty_formula_falls_back_to_cached_value() {
        let cell = CellValue::from_sheet(&Data::Float(42.0), Some(""));
        assert_eq!(cell, CellValue::Number(42.0));
    }
}
