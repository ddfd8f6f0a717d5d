// ==========================================
// 银行流水导入管道 - 目标表定义
// ==========================================
// 职责: 目标表 DDL / 结构校验 / 插入语句 / 字段值 → SQL 值
// 存储: 时间戳按 "%Y-%m-%d %H:%M:%S" 文本；金额保留 2 位小数
// ==========================================

use crate::domain::{ColumnSchema, FieldType, FieldValue, RowSet, CANONICAL_FIELD_TYPES, TIMESTAMP_FORMAT};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::movement_store::{validate_identifier, ColumnDef, MovementStore};
use rust_decimal::prelude::ToPrimitive;
use rusqlite::types::Value;
use tracing::info;

/// 默认目标表名
pub const DEFAULT_TABLE_NAME: &str = "gastos";

/// 自增主键列名
pub const ID_COLUMN: &str = "id";

/// 字段类型 → 列声明类型
pub fn sql_type_for(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::Timestamp => "TIMESTAMP",
        FieldType::Numeric => "DECIMAL(10,2)",
        FieldType::Text => "VARCHAR(255)",
        FieldType::Integer => "INTEGER",
    }
}

/// 字段值 → SQL 绑定值
pub fn to_sql_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Empty => Value::Null,
        FieldValue::Text(s) => Value::Text(s.clone()),
        FieldValue::Int(i) => Value::Integer(*i),
        FieldValue::Float(f) if f.is_finite() => Value::Real(*f),
        FieldValue::Float(_) => Value::Null,
        FieldValue::Bool(b) => Value::Integer(i64::from(*b)),
        FieldValue::Decimal(d) => d
            .round_dp(2)
            .to_f64()
            .map(Value::Real)
            .unwrap_or(Value::Null),
        FieldValue::Timestamp(ts) => Value::Text(ts.format(TIMESTAMP_FORMAT).to_string()),
    }
}

// ==========================================
// 目标表
// ==========================================
#[derive(Debug, Clone)]
pub struct GastosTable {
    name: String,
    columns: Vec<ColumnDef>,
}

impl GastosTable {
    /// 按列结构生成目标表定义
    ///
    /// 列类型按位置取自固定类型表；首列（操作日期）NOT NULL
    pub fn new(name: &str, schema: &ColumnSchema) -> RepositoryResult<Self> {
        validate_identifier(name)?;
        if schema.len() != CANONICAL_FIELD_TYPES.len() {
            return Err(RepositoryError::SchemaMismatch {
                table: name.to_string(),
                expected: CANONICAL_FIELD_TYPES.iter().map(|t| t.to_string()).collect(),
                actual: schema.store_names().map(String::from).collect(),
            });
        }

        let mut columns =
            vec![ColumnDef::new(ID_COLUMN, "INTEGER").with_constraints("PRIMARY KEY AUTOINCREMENT")];
        for (position, (store_name, field_type)) in
            schema.store_names().zip(CANONICAL_FIELD_TYPES).enumerate()
        {
            validate_identifier(store_name)?;
            let def = ColumnDef::new(store_name, sql_type_for(field_type));
            columns.push(if position == 0 {
                def.with_constraints("NOT NULL")
            } else {
                def
            });
        }

        Ok(Self {
            name: name.to_string(),
            columns,
        })
    }

    /// 标准 7 列目标表
    pub fn canonical(name: &str) -> RepositoryResult<Self> {
        Self::new(name, &ColumnSchema::canonical())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 全部列定义（含 id）
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// 数据列（不含 id）
    pub fn data_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| c.name != ID_COLUMN)
    }

    /// 参数化插入语句
    pub fn insert_sql(&self) -> String {
        let names: Vec<&str> = self.data_columns().map(|c| c.name.as_str()).collect();
        let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{}", i)).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.name,
            names.join(", "),
            placeholders.join(", ")
        )
    }

    /// 确保目标表存在（不存在则按 DDL 创建）
    pub fn ensure<S: MovementStore + ?Sized>(&self, store: &S) -> RepositoryResult<()> {
        store.create_table(&self.name, &self.columns)?;
        Ok(())
    }

    /// 校验已存在表的列序与声明类型
    ///
    /// # 返回
    /// - Ok(()): 与 DDL 一致
    /// - Err(TableNotFound): 目标表不存在
    /// - Err(SchemaMismatch): 不一致（在任何插入前报告）
    pub fn verify<S: MovementStore + ?Sized>(&self, store: &S) -> RepositoryResult<()> {
        if !store.table_exists(&self.name)? {
            return Err(RepositoryError::TableNotFound(self.name.clone()));
        }

        let actual: Vec<String> = store
            .table_columns(&self.name)?
            .into_iter()
            .map(|c| format!("{} {}", c.name.to_lowercase(), c.declared_type.to_uppercase()))
            .collect();
        let expected: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.sql_type.to_uppercase()))
            .collect();

        if actual != expected {
            return Err(RepositoryError::SchemaMismatch {
                table: self.name.clone(),
                expected,
                actual,
            });
        }

        info!(table = %self.name, "目标表结构校验通过");
        Ok(())
    }

    /// 行集 → 批量插入参数
    pub fn to_params(&self, rows: &RowSet) -> Vec<Vec<Value>> {
        rows.rows()
            .iter()
            .map(|row| row.iter().map(to_sql_value).collect())
            .collect()
    }

    /// 批量插入行集（单事务）
    pub fn insert_rows<S: MovementStore + ?Sized>(
        &self,
        store: &S,
        rows: &RowSet,
    ) -> RepositoryResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        store.execute_bulk_insert(&self.insert_sql(), &self.to_params(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::sqlite_connector::SqliteConnector;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use std::sync::Arc;

    #[test]
    fn test_canonical_ddl() {
        let table = GastosTable::canonical("gastos").unwrap();
        let ddl: Vec<String> = table.columns().iter().map(ColumnDef::to_sql).collect();
        assert_eq!(
            ddl,
            vec![
                "id INTEGER PRIMARY KEY AUTOINCREMENT",
                "fecha_operacion TIMESTAMP NOT NULL",
                "concepto VARCHAR(255)",
                "fecha_valor TIMESTAMP",
                "importe DECIMAL(10,2)",
                "saldo DECIMAL(10,2)",
                "referencia_1 VARCHAR(255)",
                "referencia_2 VARCHAR(255)",
            ]
        );
    }

    #[test]
    fn test_insert_sql() {
        let table = GastosTable::canonical("gastos").unwrap();
        assert_eq!(
            table.insert_sql(),
            "INSERT INTO gastos (fecha_operacion, concepto, fecha_valor, importe, saldo, referencia_1, referencia_2) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
        );
    }

    #[test]
    fn test_to_sql_value() {
        let ts = NaiveDate::from_ymd_opt(2024, 12, 31)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(
            to_sql_value(&FieldValue::Timestamp(ts)),
            Value::Text("2024-12-31 00:00:00".to_string())
        );
        match to_sql_value(&FieldValue::Decimal(Decimal::from_str("1234.567").unwrap())) {
            Value::Real(v) => assert!((v - 1234.57).abs() < 1e-9),
            other => panic!("unexpected value: {:?}", other),
        }
        assert_eq!(to_sql_value(&FieldValue::Empty), Value::Null);
        assert_eq!(to_sql_value(&FieldValue::Float(f64::NAN)), Value::Null);
    }

    #[test]
    fn test_ensure_and_verify() {
        let store = SqliteConnector::open_in_memory().unwrap();
        let table = GastosTable::canonical("gastos").unwrap();

        table.ensure(&store).unwrap();
        table.verify(&store).unwrap();
    }

    #[test]
    fn test_verify_missing_table() {
        let store = SqliteConnector::open_in_memory().unwrap();
        let table = GastosTable::canonical("gastos").unwrap();

        match table.verify(&store) {
            Err(RepositoryError::TableNotFound(name)) => assert_eq!(name, "gastos"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_verify_detects_mismatch() {
        let store = SqliteConnector::open_in_memory().unwrap();
        store
            .create_table(
                "gastos",
                &[
                    ColumnDef::new("id", "INTEGER").with_constraints("PRIMARY KEY"),
                    ColumnDef::new("concepto", "TEXT"),
                ],
            )
            .unwrap();

        let table = GastosTable::canonical("gastos").unwrap();
        // ensure 对已存在表无操作
        table.ensure(&store).unwrap();
        assert!(matches!(
            table.verify(&store),
            Err(RepositoryError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_insert_rows_null_date_fails() {
        let store = SqliteConnector::open_in_memory().unwrap();
        let table = GastosTable::canonical("gastos").unwrap();
        table.ensure(&store).unwrap();

        let schema = Arc::new(ColumnSchema::canonical());
        let mut rows = RowSet::new(schema);
        rows.push_row(vec![
            FieldValue::Empty,
            FieldValue::Text("Netflix".to_string()),
            FieldValue::Empty,
            FieldValue::Decimal(Decimal::from_str("-15.99").unwrap()),
            FieldValue::Empty,
            FieldValue::Empty,
            FieldValue::Empty,
        ])
        .unwrap();

        assert!(matches!(
            table.insert_rows(&store, &rows),
            Err(RepositoryError::NotNullViolation(_))
        ));
    }
}
