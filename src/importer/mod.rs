// ==========================================
// 银行流水导入管道 - 导入层
// ==========================================
// 职责: 银行导出文件 → 读取 / 转换 / 去重 / 清洗 → 目标表
// 支持: CSV / TXT / XLS / XLSX
// ==========================================

pub mod data_cleaner;
pub mod dedup;
pub mod error;
pub mod file_parser;
pub mod header_detector;
pub mod importer_trait;
pub mod pipeline;
pub mod type_coercer;

// 重导出核心类型
pub use data_cleaner::{is_lenient_numeric, RowSetCleaner};
pub use dedup::Deduplicator;
pub use error::{CleaningFailure, ImportError, ImportResult};
pub use file_parser::{
    CsvParser, ExcelParser, SourceFormat, UniversalFileParser, DEFAULT_DELIMITER,
    DEFAULT_SKIP_ROWS,
};
pub use header_detector::{HeaderNoiseDetector, KNOWN_HEADER_LABELS};
pub use importer_trait::{DataCleaner, FileParser};
pub use pipeline::{
    discover_files, FileProcessor, FileReport, PipelineDriver, PipelineError, PipelineReport,
};
pub use type_coercer::{parse_day_first_date, parse_day_first_timestamp, parse_decimal, TypeCoercer};
