// ==========================================
// 银行流水导入管道 - 领域模型层
// ==========================================
// 职责: 定义行集、列结构、字段值与字段类型
// 红线: 不含数据访问逻辑,不含清洗逻辑
// ==========================================

pub mod row_set;
pub mod types;

// 重导出核心类型
pub use row_set::{
    to_store_name, Column, ColumnRef, ColumnSchema, FieldValue, RowSet, RowSetError,
    RowSetResult, TIMESTAMP_FORMAT,
};
pub use types::{
    FieldType, CANONICAL_COLUMNS, CANONICAL_FIELD_TYPES, DEFAULT_AMOUNT_COLUMN,
    DEFAULT_CONCEPT_COLUMN, DEFAULT_DATE_COLUMN,
};
