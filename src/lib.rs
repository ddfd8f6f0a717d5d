// ==========================================
// 银行流水导入管道 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 银行导出文件清洗入库 + 简单汇总报表
// 流程: 读取 → 去重 → 类型转换 → 去重 → 清洗 → 落库
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 行集与类型
pub mod domain;

// 导入层 - 外部数据
pub mod importer;

// 数据仓储层 - 数据访问
pub mod repository;

// 报表层 - 过滤与汇总
pub mod report;

// 配置层 - 运行配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// SQL 性能统计
pub mod perf;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    ColumnRef, ColumnSchema, FieldType, FieldValue, RowSet, CANONICAL_COLUMNS,
    CANONICAL_FIELD_TYPES,
};

// 导入
pub use importer::{
    CleaningFailure, DataCleaner, FileProcessor, ImportError, PipelineDriver, PipelineError,
    PipelineReport, RowSetCleaner, TypeCoercer, UniversalFileParser,
};

// 仓储
pub use repository::{
    GastosTable, MovementStore, PersistenceError, ReportRepository, RepositoryError,
    SqliteConnector,
};

// 报表
pub use report::{MovementAnalyzer, MovementSummary, ReportError};

// 配置
pub use config::{ConfigError, PipelineConfig};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "gastos-pipeline";
