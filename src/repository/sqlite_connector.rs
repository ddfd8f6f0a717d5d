// ==========================================
// 银行流水导入管道 - SQLite 持久化实现
// ==========================================
// 职责: 实现 MovementStore（使用 rusqlite）
// 连接: 每个会话打开一次，Arc<Mutex<Connection>> 共享
// 事务: 批量插入一次一事务，不跨文件
// ==========================================

use crate::db::{open_sqlite_connection, open_sqlite_in_memory};
use crate::perf::install_sqlite_tracing;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::movement_store::{
    validate_identifier, ColumnDef, MovementStore, QueryRow, TableColumn,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

pub struct SqliteConnector {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteConnector {
    /// 打开数据库文件并创建连接器
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Ok(SqliteConnector)
    /// - Err: 数据库连接错误
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let mut conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(format!("{}: {}", db_path, e)))?;
        install_sqlite_tracing(&mut conn);
        info!(db_path = %db_path, "数据库连接已建立");
        Ok(Self::from_connection(Arc::new(Mutex::new(conn))))
    }

    /// 内存数据库（预览/测试）
    pub fn open_in_memory() -> RepositoryResult<Self> {
        let conn = open_sqlite_in_memory()
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Ok(Self::from_connection(Arc::new(Mutex::new(conn))))
    }

    /// 从已有连接创建实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 作用域内持有连接，闭包返回（含出错路径）即释放
    pub fn with_connection<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        F: FnOnce(&Connection) -> RepositoryResult<T>,
    {
        let conn = self.get_conn()?;
        f(&conn)
    }
}

impl MovementStore for SqliteConnector {
    fn table_exists(&self, table_name: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let exists = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1 LIMIT 1",
                params![table_name],
                |_row| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        Ok(exists)
    }

    fn create_table(&self, table_name: &str, columns: &[ColumnDef]) -> RepositoryResult<bool> {
        validate_identifier(table_name)?;
        for column in columns {
            validate_identifier(&column.name)?;
        }

        if self.table_exists(table_name)? {
            warn!(table = %table_name, "表已存在，跳过建表");
            return Ok(true);
        }

        let columns_def = columns
            .iter()
            .map(ColumnDef::to_sql)
            .collect::<Vec<_>>()
            .join(", ");
        let ddl = format!("CREATE TABLE {} ({})", table_name, columns_def);

        let conn = self.get_conn()?;
        conn.execute_batch(&ddl)?;
        info!(table = %table_name, "表创建成功");
        Ok(true)
    }

    fn drop_table(&self, table_name: &str) -> RepositoryResult<bool> {
        validate_identifier(table_name)?;

        if !self.table_exists(table_name)? {
            warn!(table = %table_name, "表不存在，跳过删除");
            return Ok(true);
        }

        let conn = self.get_conn()?;
        conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", table_name))?;
        info!(table = %table_name, "表删除成功");
        Ok(true)
    }

    fn table_columns(&self, table_name: &str) -> RepositoryResult<Vec<TableColumn>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")?;

        let columns = stmt
            .query_map(params![table_name], |row| {
                Ok(TableColumn {
                    name: row.get(0)?,
                    declared_type: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(columns)
    }

    fn execute_query(&self, sql: &str, params: &[Value]) -> RepositoryResult<Vec<QueryRow>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(sql)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let rows = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                let mut record = QueryRow::new();
                for (i, name) in names.iter().enumerate() {
                    record.insert(name.clone(), row.get::<_, Value>(i)?);
                }
                Ok(record)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        debug!(rows = rows.len(), "查询完成");
        Ok(rows)
    }

    fn execute_command(&self, sql: &str, params: &[Value]) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let affected = conn.execute(sql, params_from_iter(params.iter()))?;
        Ok(affected)
    }

    fn execute_bulk_insert(&self, sql: &str, rows: &[Vec<Value>]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let mut count = 0;
        {
            let mut stmt = tx.prepare(sql)?;
            for row in rows {
                count += stmt.execute(params_from_iter(row.iter()))?;
            }
        }

        // 出错时 tx 被 drop，自动回滚
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        info!(rows = count, "批量插入完成");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_columns() -> Vec<ColumnDef> {
        vec![
            ColumnDef::new("id", "INTEGER").with_constraints("PRIMARY KEY AUTOINCREMENT"),
            ColumnDef::new("concepto", "VARCHAR(255)").with_constraints("NOT NULL"),
            ColumnDef::new("importe", "DECIMAL(10,2)"),
        ]
    }

    #[test]
    fn test_create_and_drop_table() {
        let store = SqliteConnector::open_in_memory().unwrap();

        assert!(!store.table_exists("gastos").unwrap());
        assert!(store.create_table("gastos", &sample_columns()).unwrap());
        assert!(store.table_exists("gastos").unwrap());

        // 已存在: 返回 true 且不报错
        assert!(store.create_table("gastos", &sample_columns()).unwrap());

        assert!(store.drop_table("gastos").unwrap());
        assert!(!store.table_exists("gastos").unwrap());
        assert!(store.drop_table("gastos").unwrap());
    }

    #[test]
    fn test_create_table_rejects_bad_identifier() {
        let store = SqliteConnector::open_in_memory().unwrap();
        let result = store.create_table("gastos; --", &sample_columns());
        assert!(matches!(result, Err(RepositoryError::InvalidIdentifier(_))));
    }

    #[test]
    fn test_table_columns_in_order() {
        let store = SqliteConnector::open_in_memory().unwrap();
        store.create_table("gastos", &sample_columns()).unwrap();

        let columns = store.table_columns("gastos").unwrap();
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "concepto", "importe"]);
        assert_eq!(columns[2].declared_type, "DECIMAL(10,2)");
        assert!(store.table_columns("no_existe").unwrap().is_empty());
    }

    #[test]
    fn test_command_and_query() {
        let store = SqliteConnector::open_in_memory().unwrap();
        store.create_table("gastos", &sample_columns()).unwrap();

        let affected = store
            .execute_command(
                "INSERT INTO gastos (concepto, importe) VALUES (?1, ?2)",
                &[Value::Text("Netflix".to_string()), Value::Real(-15.99)],
            )
            .unwrap();
        assert_eq!(affected, 1);

        let rows = store
            .execute_query(
                "SELECT concepto, importe FROM gastos WHERE concepto = ?1",
                &[Value::Text("Netflix".to_string())],
            )
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["concepto"], Value::Text("Netflix".to_string()));
        assert_eq!(rows[0]["importe"], Value::Real(-15.99));
    }

    #[test]
    fn test_bulk_insert_commits_all() {
        let store = SqliteConnector::open_in_memory().unwrap();
        store.create_table("gastos", &sample_columns()).unwrap();

        let rows = vec![
            vec![Value::Text("Netflix".to_string()), Value::Real(-15.99)],
            vec![Value::Text("Spotify".to_string()), Value::Real(-9.99)],
        ];
        let inserted = store
            .execute_bulk_insert("INSERT INTO gastos (concepto, importe) VALUES (?1, ?2)", &rows)
            .unwrap();
        assert_eq!(inserted, 2);
    }

    #[test]
    fn test_bulk_insert_rolls_back_on_failure() {
        let store = SqliteConnector::open_in_memory().unwrap();
        store.create_table("gastos", &sample_columns()).unwrap();

        let rows = vec![
            vec![Value::Text("Netflix".to_string()), Value::Real(-15.99)],
            vec![Value::Null, Value::Real(-9.99)],
        ];
        let result =
            store.execute_bulk_insert("INSERT INTO gastos (concepto, importe) VALUES (?1, ?2)", &rows);
        assert!(matches!(result, Err(RepositoryError::NotNullViolation(_))));

        let count: i64 = store
            .with_connection(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM gastos", [], |row| row.get(0))?)
            })
            .unwrap();
        assert_eq!(count, 0);
    }
}
