// ==========================================
// 银行流水导入管道 - 持久化协作者接口
// ==========================================
// 红线: 仓储不含业务规则，只做表管理与 SQL 执行
// 约束: 所有值使用参数化绑定；表名/列名经标识符校验
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::types::Value;
use std::collections::BTreeMap;

/// 查询结果行（列名 → 值）
pub type QueryRow = BTreeMap<String, Value>;

/// 列定义（用于建表）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub sql_type: String,
    pub constraints: Option<String>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            constraints: None,
        }
    }

    pub fn with_constraints(mut self, constraints: impl Into<String>) -> Self {
        self.constraints = Some(constraints.into());
        self
    }

    /// DDL 片段: `name TYPE [CONSTRAINTS]`
    pub fn to_sql(&self) -> String {
        match &self.constraints {
            Some(c) => format!("{} {} {}", self.name, self.sql_type, c),
            None => format!("{} {}", self.name, self.sql_type),
        }
    }
}

/// 已存在表的列信息（来自 table_info）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableColumn {
    pub name: String,
    pub declared_type: String,
}

/// 校验 SQL 标识符（仅 ASCII 字母/数字/下划线，且不以数字开头）
pub fn validate_identifier(name: &str) -> RepositoryResult<&str> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if valid {
        Ok(name)
    } else {
        Err(RepositoryError::InvalidIdentifier(name.to_string()))
    }
}

// ==========================================
// MovementStore Trait
// ==========================================
pub trait MovementStore: Send + Sync {
    /// 表是否存在
    fn table_exists(&self, table_name: &str) -> RepositoryResult<bool>;

    /// 建表（已存在时不执行 DDL，记录警告并返回 true）
    fn create_table(&self, table_name: &str, columns: &[ColumnDef]) -> RepositoryResult<bool>;

    /// 删表（不存在时记录警告并返回 true）
    fn drop_table(&self, table_name: &str) -> RepositoryResult<bool>;

    /// 读取表的列信息（按列序）
    fn table_columns(&self, table_name: &str) -> RepositoryResult<Vec<TableColumn>>;

    /// 执行查询，返回行映射
    fn execute_query(&self, sql: &str, params: &[Value]) -> RepositoryResult<Vec<QueryRow>>;

    /// 执行单条命令，返回受影响行数
    fn execute_command(&self, sql: &str, params: &[Value]) -> RepositoryResult<usize>;

    /// 批量执行同一语句（单事务，全部成功或全部回滚）
    fn execute_bulk_insert(&self, sql: &str, rows: &[Vec<Value>]) -> RepositoryResult<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("gastos").is_ok());
        assert!(validate_identifier("_gastos_2025").is_ok());
        assert!(validate_identifier("2025_gastos").is_err());
        assert!(validate_identifier("gastos; DROP TABLE x").is_err());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("operación").is_err());
    }

    #[test]
    fn test_column_def_sql() {
        let def = ColumnDef::new("fecha_operacion", "TIMESTAMP").with_constraints("NOT NULL");
        assert_eq!(def.to_sql(), "fecha_operacion TIMESTAMP NOT NULL");
        assert_eq!(ColumnDef::new("concepto", "VARCHAR(255)").to_sql(), "concepto VARCHAR(255)");
    }
}
