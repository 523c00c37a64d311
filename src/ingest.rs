// Workbook ingestion - first sheet, header skipped, 13 typed cells per row

use anyhow::{bail, Context, Result};
use calamine::{open_workbook_auto, Reader};
use std::collections::HashMap;
use std::path::Path;

use crate::cell::CellValue;
use crate::normalize::FIELD_COUNT;

/// Read every data row of the input workbook's first sheet.
///
/// The first sheet row is the header and is skipped. Each returned row has
/// exactly [`FIELD_COUNT`] cells; missing cells materialize as
/// `CellValue::Empty` and columns beyond the field list are ignored.
/// Formula cells carry their source expression, not the cached result.
pub fn read_rows(path: &Path) -> Result<Vec<Vec<CellValue>>> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("failed to open workbook: {}", path.display()))?;

    let sheet_names = workbook.sheet_names().to_vec();
    let first_sheet = match sheet_names.first() {
        Some(name) => name.clone(),
        None => bail!("workbook contains no sheets: {}", path.display()),
    };

    let range = workbook
        .worksheet_range(&first_sheet)
        .with_context(|| format!("failed to read sheet '{}'", first_sheet))?;

    // Formula source text, keyed by absolute cell position. The formula
    // range may start at a different offset than the data range.
    let mut formulas: HashMap<(u32, u32), String> = HashMap::new();
    if let Ok(formula_range) = workbook.worksheet_formula(&first_sheet) {
        let (start_row, start_col) = formula_range.start().unwrap_or((0, 0));
        for (row_idx, row) in formula_range.rows().enumerate() {
            for (col_idx, formula) in row.iter().enumerate() {
                if !formula.is_empty() {
                    let position = (start_row + row_idx as u32, start_col + col_idx as u32);
                    formulas.insert(position, formula.clone());
                }
            }
        }
    }

    let (data_start_row, _) = range.start().unwrap_or((0, 0));

    let mut rows = Vec::new();
    for (row_idx, _) in range.rows().enumerate() {
        let absolute_row = data_start_row + row_idx as u32;

        // Header row
        if absolute_row == 0 {
            continue;
        }

        let cells: Vec<CellValue> = (0..FIELD_COUNT as u32)
            .map(|col| {
                let data = range.get_value((absolute_row, col));
                let formula = formulas.get(&(absolute_row, col)).map(String::as_str);
                match data {
                    Some(d) => CellValue::from_sheet(d, formula),
                    None => match formula {
                        Some(src) => CellValue::Formula(src.to_string()),
                        None => CellValue::Empty,
                    },
                }
            })
            .collect();

        rows.push(cells);
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use tempfile::TempDir;

    #[test]
    fn test_read_rows_skips_header_and_pads_short_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cards.xlsx");

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "会社名").unwrap();
        sheet.write_string(0, 1, "名前").unwrap();
        sheet.write_string(1, 0, "Acme株式会社").unwrap();
        sheet.write_string(1, 1, "Taro").unwrap();
        sheet.write_string(1, 10, "2024年01月10日").unwrap();
        sheet.write_string(2, 0, "Beta(株)").unwrap();
        sheet.write_number(2, 5, 1000001.0).unwrap();
        workbook.save(&path).unwrap();

        let rows = read_rows(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), FIELD_COUNT);
        assert_eq!(rows[0][0], CellValue::Text("Acme株式会社".to_string()));
        assert_eq!(rows[0][10], CellValue::Text("2024年01月10日".to_string()));
        assert_eq!(rows[0][12], CellValue::Empty);
        assert_eq!(rows[1][5], CellValue::Number(1000001.0));
    }

    #[test]
    fn test_read_rows_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.xlsx");
        assert!(read_rows(&path).is_err());
    }

    #[test]
    fn test_columns_beyond_field_list_are_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wide.xlsx");

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "会社名").unwrap();
        sheet.write_string(1, 0, "Acme(株)").unwrap();
        sheet.write_string(1, 14, "spillover").unwrap();
        workbook.save(&path).unwrap();

        let rows = read_rows(&path).unwrap();
        assert_eq!(rows[0].len(), FIELD_COUNT);
    }
}
