// ==========================================
// 银行流水导入管道 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少外部工具同时读库时的偶发 busy 错误
// ==========================================

use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置（父目录不存在时先创建）
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            // 目录创建失败时记录原因，由 Connection::open 报错
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!(dir = %parent.display(), error = %e, "数据库目录创建失败");
            }
        }
    }

    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 打开内存数据库（预览/测试）
pub fn open_sqlite_in_memory() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_parent_dir() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("gastos.db");
        let conn = open_sqlite_connection(db_path.to_str().unwrap()).unwrap();

        let fk: i64 = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0)).unwrap();
        assert_eq!(fk, 1);
        assert!(db_path.exists());
    }

    #[test]
    fn test_open_fails_when_parent_is_a_file() {
        crate::logging::init_test();
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("ocupado");
        std::fs::write(&blocker, "no es un directorio").unwrap();

        let db_path = blocker.join("gastos.db");
        assert!(open_sqlite_connection(db_path.to_str().unwrap()).is_err());
        assert!(blocker.is_file());
    }
}
