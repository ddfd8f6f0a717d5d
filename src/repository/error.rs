// ==========================================
// 银行流水导入管道 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 约定: 仓储层错误对一次运行均为致命错误
// ==========================================

use thiserror::Error;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 数据库错误 =====
    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    #[error("唯一约束违反: {0}")]
    UniqueConstraintViolation(String),

    #[error("非空约束违反: {0}")]
    NotNullViolation(String),

    // ===== 结构错误 =====
    #[error("非法标识符: {0}")]
    InvalidIdentifier(String),

    #[error("目标表结构不一致 (table={table}): 期望 {expected:?}，实际 {actual:?}")]
    SchemaMismatch {
        table: String,
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("参数个数不匹配: 期望 {expected}，实际 {actual}")]
    ParameterCountMismatch { expected: usize, actual: usize },

    #[error("目标表未初始化: {0}（请先执行 init-db 或 run）")]
    TableNotFound(String),
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => {
                if msg.contains("UNIQUE") {
                    RepositoryError::UniqueConstraintViolation(msg)
                } else if msg.contains("NOT NULL") {
                    RepositoryError::NotNullViolation(msg)
                } else {
                    RepositoryError::DatabaseQueryError(msg)
                }
            }
            rusqlite::Error::InvalidParameterCount(actual, expected) => {
                RepositoryError::ParameterCountMismatch { expected, actual }
            }
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_not_null_violation_mapped() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (a TEXT NOT NULL)").unwrap();
        let err: RepositoryError = conn
            .execute("INSERT INTO t (a) VALUES (NULL)", [])
            .unwrap_err()
            .into();
        assert!(matches!(err, RepositoryError::NotNullViolation(_)));
    }

    #[test]
    fn test_syntax_error_mapped_to_query_error() {
        let conn = Connection::open_in_memory().unwrap();
        let err: RepositoryError = conn.execute("SELEC 1", []).unwrap_err().into();
        assert!(matches!(err, RepositoryError::DatabaseQueryError(_)));
    }
}
