// ==========================================
// 银行流水导入管道 - 报表层
// ==========================================
// 职责: 内存行集的过滤 / 排序 / 汇总
// 数据库侧汇总查询见 repository::report_repo
// ==========================================

pub mod filters;
pub mod summary;

use crate::domain::RowSetError;
use crate::repository::RepositoryError;
use thiserror::Error;

pub use filters::MovementAnalyzer;
pub use summary::{AmountStats, ConceptCount, MovementSummary};

/// 报表层错误类型
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("列不存在: {0}")]
    ColumnNotFound(String),

    #[error("行集结构错误: {0}")]
    InvalidRowSet(#[from] RowSetError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Result 类型别名
pub type ReportResult<T> = Result<T, ReportError>;
