// ==========================================
// 银行流水导入管道 - 运行配置
// ==========================================
// 覆写顺序: 默认值 → JSON 配置文件 → 环境变量 → 命令行参数
// 约束: 源目录与数据库路径只来自配置，不写死
// ==========================================

use crate::domain::{ColumnSchema, RowSetError, CANONICAL_COLUMNS, CANONICAL_FIELD_TYPES, DEFAULT_AMOUNT_COLUMN};
use crate::importer::file_parser::{DEFAULT_DELIMITER, DEFAULT_SKIP_ROWS};
use crate::repository::{validate_identifier, DEFAULT_TABLE_NAME};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

// ==========================================
// 环境变量
// ==========================================
pub mod env_keys {
    pub const SOURCE_DIR: &str = "GASTOS_SOURCE_DIR";
    pub const DB_PATH: &str = "GASTOS_DB_PATH";
    pub const TABLE_NAME: &str = "GASTOS_TABLE_NAME";
    pub const SKIP_ROWS: &str = "GASTOS_SKIP_ROWS";
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件读取失败 ({path}): {message}")]
    FileRead { path: String, message: String },

    #[error("配置文件解析失败: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("未配置源目录（--source / GASTOS_SOURCE_DIR / source_dir）")]
    MissingSourceDir,

    #[error("源目录不存在或不是目录: {0}")]
    SourceDirNotFound(String),

    #[error("配置项无效 ({key}): {message}")]
    InvalidValue { key: String, message: String },

    #[error("列结构无效: {0}")]
    InvalidSchema(#[from] RowSetError),
}

/// Result 类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}

// ==========================================
// PipelineConfig
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub source_dir: Option<PathBuf>,
    pub db_path: Option<String>,
    pub table_name: String,
    pub columns: Vec<String>,
    pub amount_column: String,
    pub skip_rows: usize,
    pub delimiter: char,
    pub dry_run: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_dir: None,
            db_path: None,
            table_name: DEFAULT_TABLE_NAME.to_string(),
            columns: CANONICAL_COLUMNS.iter().map(|c| c.to_string()).collect(),
            amount_column: DEFAULT_AMOUNT_COLUMN.to_string(),
            skip_rows: DEFAULT_SKIP_ROWS,
            delimiter: char::from(DEFAULT_DELIMITER),
            dry_run: false,
        }
    }
}

impl PipelineConfig {
    /// 加载配置：默认值 → 配置文件（可选） → 环境变量
    pub fn load(config_file: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match config_file {
            Some(path) => Self::from_json_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// 从 JSON 文件读取（缺省字段取默认值）
    pub fn from_json_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config: Self = serde_json::from_str(&content)?;
        debug!(path = %path.display(), "配置文件已加载");
        Ok(config)
    }

    /// 应用环境变量覆写
    ///
    /// # 参数
    /// - lookup: 环境变量读取函数（测试时可注入）
    pub fn apply_env<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(dir) = read(env_keys::SOURCE_DIR) {
            self.source_dir = Some(PathBuf::from(dir));
        }
        if let Some(path) = read(env_keys::DB_PATH) {
            self.db_path = Some(path);
        }
        if let Some(name) = read(env_keys::TABLE_NAME) {
            self.table_name = name;
        }
        if let Some(raw) = read(env_keys::SKIP_ROWS) {
            self.skip_rows = raw
                .parse::<usize>()
                .map_err(|e| invalid(env_keys::SKIP_ROWS, format!("'{}': {}", raw, e)))?;
        }
        Ok(())
    }

    /// 校验配置
    pub fn validate(&self) -> ConfigResult<()> {
        let source_dir = self.source_dir()?;
        if !source_dir.is_dir() {
            return Err(ConfigError::SourceDirNotFound(source_dir.display().to_string()));
        }

        let schema = self.schema()?;
        if schema.len() != CANONICAL_FIELD_TYPES.len() {
            return Err(invalid(
                "columns",
                format!("需要 {} 列，实际 {} 列", CANONICAL_FIELD_TYPES.len(), schema.len()),
            ));
        }
        if schema.position(&self.amount_column).is_none() {
            return Err(invalid("amount_column", format!("'{}' 不在列结构中", self.amount_column)));
        }

        self.delimiter_byte()?;
        validate_identifier(&self.table_name)
            .map_err(|e| invalid("table_name", e.to_string()))?;

        Ok(())
    }

    /// 源目录（必填）
    pub fn source_dir(&self) -> ConfigResult<&Path> {
        self.source_dir.as_deref().ok_or(ConfigError::MissingSourceDir)
    }

    /// 列结构
    pub fn schema(&self) -> ConfigResult<Arc<ColumnSchema>> {
        Ok(Arc::new(ColumnSchema::new(self.columns.iter().map(String::as_str))?))
    }

    /// 分隔符（必须为单字节 ASCII）
    pub fn delimiter_byte(&self) -> ConfigResult<u8> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(invalid("delimiter", format!("'{}' 不是单字节字符", self.delimiter)))
        }
    }

    /// 数据库路径（未配置时取默认路径）
    pub fn resolved_db_path(&self) -> String {
        match &self.db_path {
            Some(path) if !path.trim().is_empty() => path.trim().to_string(),
            _ => get_default_db_path(),
        }
    }
}

/// 获取默认数据库路径
///
/// 优先级: GASTOS_DB_PATH → 用户数据目录/gastos-pipeline/gastos.db → ./gastos.db
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(env_keys::DB_PATH) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    match dirs::data_dir() {
        Some(data_dir) => data_dir
            .join("gastos-pipeline")
            .join("gastos.db")
            .to_string_lossy()
            .to_string(),
        None => {
            warn!("无法获取用户数据目录，使用当前目录");
            "./gastos.db".to_string()
        }
    }
}
