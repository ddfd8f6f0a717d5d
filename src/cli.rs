// ==========================================
// 银行流水导入管道 - 命令行参数定义
// ==========================================

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "gastos-pipeline",
    version,
    about = "银行流水导入管道 - 清洗/标准化/入库/报表",
    long_about = "读取银行导出文件（CSV/TXT/XLS/XLSX），去重、类型转换、清洗后写入 SQLite 目标表，\n\
                  并提供简单汇总报表。"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// JSON 配置文件路径
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// 数据库文件路径（覆盖配置与 GASTOS_DB_PATH）
    #[arg(long = "db", value_name = "PATH", global = true)]
    pub db: Option<String>,

    /// 日志输出格式
    #[arg(long = "log-format", value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormatArg,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// 处理源目录下全部文件并写入目标表
    Run(RunArgs),

    /// 读取并清洗源目录（不落库），打印行数与汇总
    Preview(SourceArgs),

    /// 目标表汇总报表
    Report(ReportArgs),

    /// 创建目标表（已存在时仅校验结构）
    InitDb,
}

#[derive(Args, Clone)]
pub struct SourceArgs {
    /// 源目录（覆盖配置与 GASTOS_SOURCE_DIR）
    #[arg(long = "source", value_name = "DIR")]
    pub source: Option<PathBuf>,

    /// 前导说明区行数
    #[arg(long = "skip-rows", value_name = "N")]
    pub skip_rows: Option<usize>,

    /// 分隔符（单字节字符）
    #[arg(long = "delimiter", value_name = "CHAR")]
    pub delimiter: Option<char>,
}

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// 目标表名
    #[arg(long = "table", value_name = "NAME")]
    pub table: Option<String>,

    /// 执行全部阶段但不落库
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// 以 JSON 输出运行统计
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Args)]
pub struct ReportArgs {
    #[command(subcommand)]
    pub kind: ReportKind,

    /// 以 JSON 输出
    #[arg(long = "json", global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum ReportKind {
    /// 月度概览：笔数、总额、笔数最多的日
    Overview {
        #[arg(long)]
        year: i32,
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: u32,
    },

    /// 按日汇总
    ByDay(DateRange),

    /// 按摘要汇总
    ByConcept(DateRange),

    /// 按月汇总
    ByMonth,

    /// 区间明细
    List(DateRange),
}

#[derive(Args)]
pub struct DateRange {
    /// 起始日期（YYYY-MM-DD，含）
    #[arg(long, value_parser = parse_date)]
    pub from: NaiveDate,

    /// 结束日期（YYYY-MM-DD，含）
    #[arg(long, value_parser = parse_date)]
    pub to: NaiveDate,
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| format!("日期格式应为 YYYY-MM-DD: {}", e))
}
