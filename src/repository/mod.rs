// ==========================================
// 银行流水导入管道 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供持久化协作者接口与 SQLite 实现，屏蔽数据库细节
// 约束: 所有值使用参数化,防止 SQL 注入
// ==========================================

pub mod error;
pub mod gastos_table;
pub mod movement_store;
pub mod report_repo;
pub mod sqlite_connector;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use gastos_table::{to_sql_value, GastosTable, DEFAULT_TABLE_NAME};
pub use movement_store::{validate_identifier, ColumnDef, MovementStore, QueryRow, TableColumn};
pub use report_repo::{
    ConceptSpend, DailySpend, MonthlyOverview, MonthlySpend, Movement, ReportRepository,
};
pub use sqlite_connector::SqliteConnector;

/// 持久化错误（对外名称）
pub type PersistenceError = RepositoryError;
