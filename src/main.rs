// ==========================================
// 银行流水导入管道 - 命令行入口
// ==========================================
// 子命令: run / preview / report / init-db
// 退出码: 0 成功，1 失败（错误已写入日志与 stderr）
// ==========================================

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command, LogFormatArg, ReportArgs, ReportKind, RunArgs, SourceArgs};
use gastos_pipeline::{
    logging, FileProcessor, GastosTable, MovementAnalyzer, PipelineConfig, PipelineDriver,
    PipelineReport, ReportRepository, SqliteConnector,
};
use serde::Serialize;

fn main() {
    let cli = Cli::parse();

    match cli.log_format {
        LogFormatArg::Pretty => logging::init(),
        LogFormatArg::Json => logging::init_json(),
    }

    tracing::info!(version = gastos_pipeline::VERSION, "{} 启动", gastos_pipeline::APP_NAME);

    let exit_code = match run(cli) {
        Ok(()) => 0,
        Err(error) => {
            tracing::error!(error = %format!("{:#}", error), "执行失败");
            eprintln!("错误: {:#}", error);
            1
        }
    };

    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<()> {
    let mut config = PipelineConfig::load(cli.config.as_deref()).context("加载配置失败")?;
    if let Some(db) = cli.db {
        config.db_path = Some(db);
    }

    match cli.command {
        Command::Run(args) => run_pipeline(config, args),
        Command::Preview(args) => run_preview(config, args),
        Command::Report(args) => run_report(config, args),
        Command::InitDb => run_init_db(config),
    }
}

fn apply_source_args(config: &mut PipelineConfig, args: SourceArgs) {
    if let Some(source) = args.source {
        config.source_dir = Some(source);
    }
    if let Some(skip_rows) = args.skip_rows {
        config.skip_rows = skip_rows;
    }
    if let Some(delimiter) = args.delimiter {
        config.delimiter = delimiter;
    }
}

fn open_store(config: &PipelineConfig) -> Result<(SqliteConnector, GastosTable)> {
    let db_path = config.resolved_db_path();
    tracing::info!(db_path = %db_path, "使用数据库");

    let store = SqliteConnector::new(&db_path)
        .with_context(|| format!("打开数据库失败: {}", db_path))?;
    let schema = config.schema()?;
    let table = GastosTable::new(&config.table_name, &schema)?;
    Ok((store, table))
}

// ==========================================
// run
// ==========================================
fn run_pipeline(mut config: PipelineConfig, args: RunArgs) -> Result<()> {
    apply_source_args(&mut config, args.source);
    if let Some(table) = args.table {
        config.table_name = table;
    }
    config.dry_run = config.dry_run || args.dry_run;
    config.validate()?;

    let (store, table) = open_store(&config)?;
    let processor = FileProcessor::from_config(&config)?;
    let driver = PipelineDriver::new(processor, &store, table).with_dry_run(config.dry_run);

    let report = driver.run(config.source_dir()?)?;

    if args.json {
        print_json(&report)?;
    } else {
        print_run_report(&report);
    }
    Ok(())
}

fn print_run_report(report: &PipelineReport) {
    println!("运行编号: {}{}", report.run_id, if report.dry_run { " (dry-run)" } else { "" });
    println!(
        "{:<40} {:>8} {:>8} {:>8} {:>8} {:>8}",
        "文件", "读取", "去重1", "去重2", "清洗后", "写入"
    );
    for file in &report.files {
        println!(
            "{:<40} {:>8} {:>8} {:>8} {:>8} {:>8}",
            file.file,
            file.loaded,
            file.after_first_dedup,
            file.after_second_dedup,
            file.after_cleaning,
            file.inserted
        );
    }
    println!(
        "合计: {} 个文件，读取 {} 行，清洗后 {} 行，写入 {} 行",
        report.files.len(),
        report.total_loaded(),
        report.total_cleaned(),
        report.total_inserted()
    );
}

// ==========================================
// preview
// ==========================================
fn run_preview(mut config: PipelineConfig, args: SourceArgs) -> Result<()> {
    apply_source_args(&mut config, args);
    config.validate()?;

    let processor = FileProcessor::from_config(&config)?;
    let rows = processor.load_and_clean_all(config.source_dir()?)?;

    let schema = processor.schema();
    let mut labels = schema.labels();
    let date_label = labels.next().unwrap_or_default().to_string();
    let concept_label = labels.next().unwrap_or_default().to_string();
    let analyzer = MovementAnalyzer::new(date_label, concept_label, config.amount_column.as_str());

    let summary = analyzer.summarize(&rows)?;
    print_json(&summary)
}

// ==========================================
// report
// ==========================================
fn run_report(config: PipelineConfig, args: ReportArgs) -> Result<()> {
    let (store, table) = open_store(&config)?;
    table.verify(&store)?;
    let repo = ReportRepository::new(&store, &table);

    match args.kind {
        ReportKind::Overview { year, month } => {
            let overview = repo.monthly_overview(year, month)?;
            if args.json {
                return print_json(&overview);
            }
            println!("{}-{:02}: {} 笔，合计 {:.2}", overview.year, overview.month, overview.movements, overview.total_amount);
            match overview.busiest_day {
                Some(day) => println!(
                    "笔数最多: {} 日（{} 笔，合计 {:.2}）",
                    day, overview.busiest_day_movements, overview.busiest_day_amount
                ),
                None => println!("本月无流水"),
            }
        }
        ReportKind::ByDay(range) => {
            let days = repo.spend_by_day(range.from, range.to)?;
            if args.json {
                return print_json(&days);
            }
            println!("{:<12} {:>8} {:>14}", "日期", "笔数", "合计");
            for day in &days {
                println!("{:<12} {:>8} {:>14.2}", day.day, day.movements, day.total_amount);
            }
        }
        ReportKind::ByConcept(range) => {
            let concepts = repo.spend_by_concept(range.from, range.to)?;
            if args.json {
                return print_json(&concepts);
            }
            println!(
                "{:<40} {:>8} {:>14} {:>12} {:>12} {:>12}",
                "摘要", "笔数", "合计", "平均", "最小", "最大"
            );
            for row in &concepts {
                println!(
                    "{:<40} {:>8} {:>14.2} {:>12.2} {:>12.2} {:>12.2}",
                    row.concept.as_deref().unwrap_or("-"),
                    row.movements,
                    row.total_amount,
                    row.average_amount,
                    row.min_amount,
                    row.max_amount
                );
            }
        }
        ReportKind::ByMonth => {
            let months = repo.spend_by_month()?;
            if args.json {
                return print_json(&months);
            }
            println!("{:<8} {:>8} {:>14}", "月份", "笔数", "合计");
            for month in &months {
                println!("{:<8} {:>8} {:>14.2}", month.month, month.movements, month.total_amount);
            }
        }
        ReportKind::List(range) => {
            let movements = repo.list_movements(range.from, range.to)?;
            print_json(&movements)?;
        }
    }
    Ok(())
}

// ==========================================
// init-db
// ==========================================
fn run_init_db(config: PipelineConfig) -> Result<()> {
    let (store, table) = open_store(&config)?;
    table.ensure(&store)?;
    table.verify(&store)?;
    println!("目标表已就绪: {}", table.name());
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("JSON 序列化失败")?;
    println!("{}", text);
    Ok(())
}
