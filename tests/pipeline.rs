//! End-to-end pipeline test: build an input workbook, run the full
//! import + export batch against a temp store, and replay it to confirm
//! the second pass makes no changes.

use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::Workbook;
use std::path::Path;
use tempfile::TempDir;

use meishi_organizer::run::{run, RunConfig};
use meishi_organizer::FIELD_LABELS;

fn card_row(org: &str, name: &str, dept: &str, position: &str, date: &str) -> [String; 13] {
    [
        org.to_string(),
        name.to_string(),
        dept.to_string(),
        position.to_string(),
        format!("{}@example.co.jp", name.to_lowercase()),
        "100-0001".to_string(),
        "東京都千代田区1-1".to_string(),
        "03-1234-5678".to_string(),
        "03-1234-5679".to_string(),
        "090-1234-5678".to_string(),
        date.to_string(),
        "営業".to_string(),
        "展示会で交換".to_string(),
    ]
}

fn write_input(path: &Path, rows: &[[String; 13]]) {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col, label) in FIELD_LABELS.iter().enumerate() {
        sheet.write_string(0, col as u16, *label).unwrap();
    }
    for (row_idx, row) in rows.iter().enumerate() {
        for (col, value) in row.iter().enumerate() {
            sheet.write_string(row_idx as u32 + 1, col as u16, value).unwrap();
        }
    }

    workbook.save(path).unwrap();
}

fn sheet_size(path: &Path) -> (usize, usize) {
    let mut workbook = open_workbook_auto(path).unwrap();
    let name = workbook.sheet_names().to_vec()[0].clone();
    workbook.worksheet_range(&name).unwrap().get_size()
}

fn cell_text(path: &Path, row: u32, col: u32) -> String {
    let mut workbook = open_workbook_auto(path).unwrap();
    let name = workbook.sheet_names().to_vec()[0].clone();
    let range = workbook.worksheet_range(&name).unwrap();
    match range.get_value((row, col)) {
        Some(Data::String(s)) => s.clone(),
        other => panic!("expected string cell at ({}, {}), got {:?}", row, col, other),
    }
}

#[test]
fn test_full_pipeline_and_idempotent_replay() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("cards.xlsx");

    write_input(
        &input,
        &[
            card_row("Acme株式会社", "Taro", "Sales", "部長", "2024年01月10日"),
            card_row("Acme(株)", "Taro", "Sales", "本部長", "2024年03月05日"),
            card_row("Beta株式会社", "Hanako", "総務", "主任", "2024年02月15日"),
            card_row("Net/Works株式会社", "Ken", "企画", "課長", "2024年04月01日"),
        ],
    );

    let config = RunConfig {
        input: input.clone(),
        db_path: dir.path().join("contacts.db"),
        table_dir: dir.path().join("output"),
        card_book_dir: dir.path().join("card_book"),
    };

    // First pass: two Acme rows collapse to one identity, the later date wins.
    let report = run(&config).unwrap();
    assert_eq!(report.tally.inserted, 3);
    assert_eq!(report.tally.updated, 1);
    assert_eq!(report.tally.skipped, 0);
    assert!(report.export_failures.is_empty());
    assert_eq!(
        report.organizations,
        vec!["Acme(株)", "Beta(株)", "Net/Works(株)"]
    );

    let acme = report
        .exported
        .iter()
        .find(|(name, _)| name == "Acme(株)")
        .map(|(_, records)| records)
        .unwrap();
    assert_eq!(acme.len(), 1);
    assert_eq!(acme[0].exchange_date, "2024-03-05");
    assert_eq!(acme[0].position, "本部長");

    // Tabular export: header plus one row per record, date re-rendered.
    let acme_table = dir.path().join("output/Acme(株).xlsx");
    assert_eq!(sheet_size(&acme_table), (2, 13));
    assert_eq!(cell_text(&acme_table, 0, 0), "会社名");
    assert_eq!(cell_text(&acme_table, 1, 10), "2024年03月05日");

    // Card book: thirteen rows per record, label and value columns.
    let beta_cards = dir.path().join("card_book/Beta(株).xlsx");
    assert_eq!(sheet_size(&beta_cards), (13, 2));
    assert_eq!(cell_text(&beta_cards, 1, 1), "Hanako");

    // Hostile filename characters are replaced, no extra directories appear.
    assert!(dir.path().join("output/Net_Works(株).xlsx").is_file());
    assert!(dir.path().join("card_book/Net_Works(株).xlsx").is_file());
    assert!(!dir.path().join("output/Net").exists());

    // Second pass over the same input: every row skips, nothing mutates.
    let replay = run(&config).unwrap();
    assert_eq!(replay.tally.inserted, 0);
    assert_eq!(replay.tally.updated, 0);
    assert_eq!(replay.tally.skipped, 4);
    assert_eq!(replay.organizations, report.organizations);

    let acme_replay = replay
        .exported
        .iter()
        .find(|(name, _)| name == "Acme(株)")
        .map(|(_, records)| records)
        .unwrap();
    assert_eq!(acme_replay, acme);
}

#[test]
fn test_older_row_after_newer_never_wins_across_runs() {
    let dir = TempDir::new().unwrap();

    let first = dir.path().join("first.xlsx");
    write_input(&first, &[card_row("Acme(株)", "Taro", "Sales", "本部長", "2024年03月05日")]);

    let second = dir.path().join("second.xlsx");
    write_input(&second, &[card_row("Acme(株)", "Taro", "Sales", "部長", "2024年01月10日")]);

    let base = RunConfig {
        input: first,
        db_path: dir.path().join("contacts.db"),
        table_dir: dir.path().join("output"),
        card_book_dir: dir.path().join("card_book"),
    };
    run(&base).unwrap();

    let mut older = base.clone();
    older.input = second;
    let report = run(&older).unwrap();

    assert_eq!(report.tally.skipped, 1);
    let acme = &report.exported[0].1;
    assert_eq!(acme[0].exchange_date, "2024-03-05");
    assert_eq!(acme[0].position, "本部長");
}

#[test]
fn test_unreadable_input_aborts_the_run() {
    let dir = TempDir::new().unwrap();
    let config = RunConfig {
        input: dir.path().join("missing.xlsx"),
        db_path: dir.path().join("contacts.db"),
        table_dir: dir.path().join("output"),
        card_book_dir: dir.path().join("card_book"),
    };

    assert!(run(&config).is_err());
}
