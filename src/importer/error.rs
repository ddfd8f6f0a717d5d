// ==========================================
// 银行流水导入管道 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 约定: 除 CleaningFailure 外，全部为致命错误（中止本次运行）
// ==========================================

use crate::domain::{FieldType, RowSetError};
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .csv/.txt/.xls/.xlsx）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("列数不匹配 ({file}): 期望 {expected} 列，实际 {actual} 列")]
    ColumnCountMismatch {
        file: String,
        expected: usize,
        actual: usize,
    },

    // ===== 类型转换错误 =====
    #[error("列不存在: {0}")]
    ColumnNotFound(String),

    #[error("类型转换失败 (列 {column}, 行 {row}): 无法将 '{value}' 转换为 {target}")]
    TypeCoercion {
        column: String,
        row: usize,
        value: String,
        target: FieldType,
    },

    #[error("行集结构错误: {0}")]
    InvalidRowSet(#[from] RowSetError),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

// ==========================================
// 清洗失败（可降级）
// ==========================================
// 由 RowSetCleaner::clean 显式返回；
// clean_or_original 记录后回退为原始行集
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CleaningFailure {
    #[error("金额列不存在: {0}")]
    AmountColumnMissing(String),
}
