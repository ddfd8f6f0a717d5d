// ==========================================
// 报表集成测试
// ==========================================
// 测试目标: 管道落库后的数据库汇总 + 内存行集过滤/汇总
// ==========================================

mod test_helpers;

use chrono::NaiveDate;
use gastos_pipeline::domain::RowSet;
use gastos_pipeline::importer::{discover_files, FileProcessor, PipelineDriver};
use gastos_pipeline::repository::{GastosTable, ReportRepository, RepositoryError, SqliteConnector};
use gastos_pipeline::report::MovementAnalyzer;
use gastos_pipeline::PipelineConfig;
use rust_decimal::Decimal;
use std::str::FromStr;
use tempfile::{tempdir, TempDir};
use test_helpers::{create_test_db, february_lines, january_lines, write_bank_export};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {}, got {}",
        expected,
        actual
    );
}

fn source_dir() -> TempDir {
    let dir = tempdir().unwrap();
    write_bank_export(dir.path(), "2025_01.csv", &january_lines());
    write_bank_export(dir.path(), "2025_02.csv", &february_lines());
    dir
}

fn processor() -> FileProcessor {
    FileProcessor::from_config(&PipelineConfig::default()).unwrap()
}

#[test]
fn test_reports_after_pipeline_run() {
    let (_db_file, db_path) = create_test_db().unwrap();
    let dir = source_dir();
    let store = SqliteConnector::new(&db_path).unwrap();
    let table = GastosTable::canonical("gastos").unwrap();

    PipelineDriver::new(processor(), &store, table.clone())
        .run(dir.path())
        .unwrap();

    let repo = ReportRepository::new(&store, &table);

    // 月度概览
    let january = repo.monthly_overview(2025, 1).unwrap();
    assert_eq!(january.movements, 4);
    assert_close(january.total_amount, 1431.92);
    assert_eq!(january.busiest_day, Some(5));
    assert_eq!(january.busiest_day_movements, 2);
    assert_close(january.busiest_day_amount, -25.98);

    // 按月
    let months = repo.spend_by_month().unwrap();
    let labels: Vec<&str> = months.iter().map(|m| m.month.as_str()).collect();
    assert_eq!(labels, vec!["2025-01", "2025-02"]);
    assert_eq!(months[1].movements, 3);
    assert_close(months[1].total_amount, -55.98);

    // 按日（闭区间）
    let days = repo.spend_by_day(date(2025, 2, 1), date(2025, 2, 5)).unwrap();
    assert_eq!(days.len(), 2);
    assert_eq!(days[0].day, date(2025, 2, 1));
    assert_eq!(days[1].movements, 2);

    // 按摘要（总额降序）
    let concepts = repo
        .spend_by_concept(date(2025, 1, 1), date(2025, 2, 28))
        .unwrap();
    let names: Vec<&str> = concepts
        .iter()
        .map(|c| c.concept.as_deref().unwrap_or(""))
        .collect();
    assert_eq!(names, vec!["Nomina", "Spotify", "Netflix", "Mercadona"]);
    assert_eq!(concepts[3].movements, 2);
    assert_close(concepts[3].total_amount, -72.10);
    assert_close(concepts[3].min_amount, -42.10);

    // 明细
    let movements = repo.list_movements(date(2025, 2, 1), date(2025, 2, 28)).unwrap();
    assert_eq!(movements.len(), 3);
    assert_eq!(movements[0].concepto.as_deref(), Some("Mercadona"));
    assert_eq!(movements[2].referencia_1.as_deref(), Some("REC78"));
}

#[test]
fn test_report_on_empty_month() {
    let (_db_file, db_path) = create_test_db().unwrap();
    let store = SqliteConnector::new(&db_path).unwrap();
    let table = GastosTable::canonical("gastos").unwrap();
    table.ensure(&store).unwrap();

    let overview = ReportRepository::new(&store, &table)
        .monthly_overview(2025, 3)
        .unwrap();
    assert_eq!(overview.movements, 0);
    assert_eq!(overview.busiest_day, None);
}

#[test]
fn test_report_on_uninitialised_database() {
    let (_db_file, db_path) = create_test_db().unwrap();
    let store = SqliteConnector::new(&db_path).unwrap();
    let table = GastosTable::canonical("gastos").unwrap();

    assert!(matches!(
        table.verify(&store),
        Err(RepositoryError::TableNotFound(ref name)) if name == "gastos"
    ));
}

#[test]
fn test_in_memory_filters_and_summary() {
    let dir = source_dir();
    let processor = processor();

    let mut combined = RowSet::new(processor.schema().clone());
    for path in discover_files(dir.path()).unwrap() {
        let (rows, _) = processor.process(&path).unwrap();
        combined = combined.concat(rows).unwrap();
    }
    assert_eq!(combined.len(), 7);

    let analyzer = MovementAnalyzer::default();

    let summary = analyzer.summarize(&combined).unwrap();
    assert_eq!(summary.rows, 7);
    assert_eq!(summary.amount.sum, Decimal::from_str("1375.94").unwrap());
    assert_eq!(summary.concepts[0].concept, "Mercadona");
    assert_eq!(summary.concepts[3].concept, "Nomina");

    let february = analyzer
        .filter_by_date(combined.clone(), date(2025, 2, 1), date(2025, 2, 28))
        .unwrap();
    assert_eq!(february.len(), 3);

    let subscriptions = analyzer.filter_by_concept(combined.clone(), "flix").unwrap();
    assert_eq!(subscriptions.len(), 2);

    let small_expenses = analyzer
        .filter_by_amount(
            combined,
            Decimal::from_str("-20").unwrap(),
            Decimal::ZERO,
        )
        .unwrap();
    assert_eq!(small_expenses.len(), 4);

    let sorted = analyzer.sort_by_date(small_expenses).unwrap();
    let first = sorted.row(0).unwrap()[1].to_string();
    assert_eq!(first, "Netflix");
}
