// ==========================================
// 银行流水导入管道 - 领域类型定义
// ==========================================
// 职责: 字段语义类型 + 标准列布局（银行导出 7 列）
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 字段语义类型 (Field Type)
// ==========================================
// 严格: Numeric / Integer / Text（整列失败即中止）
// 宽松: Timestamp（单值失败置空，不中止）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    Timestamp, // 日期时间（日在月前）
    Numeric,   // 金额（定点小数）
    Text,      // 文本
    Integer,   // 整数
}

impl FieldType {
    /// 是否为严格转换（任一值失败即整列失败）
    pub fn is_strict(&self) -> bool {
        !matches!(self, FieldType::Timestamp)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Timestamp => write!(f, "TIMESTAMP"),
            FieldType::Numeric => write!(f, "NUMERIC"),
            FieldType::Text => write!(f, "TEXT"),
            FieldType::Integer => write!(f, "INTEGER"),
        }
    }
}

// ==========================================
// 标准列布局
// ==========================================
// 位置 → 列名 → 存储列名 → 类型
// 0 Fecha Operación → fecha_operacion → Timestamp
// 1 Concepto        → concepto        → Text
// 2 Fecha Valor     → fecha_valor     → Timestamp
// 3 Importe         → importe         → Numeric
// 4 Saldo           → saldo           → Numeric
// 5 Referencia 1    → referencia_1    → Text
// 6 Referencia 2    → referencia_2    → Text

/// 标准列名（导出文件的列标签）
pub const CANONICAL_COLUMNS: [&str; 7] = [
    "Fecha Operación",
    "Concepto",
    "Fecha Valor",
    "Importe",
    "Saldo",
    "Referencia 1",
    "Referencia 2",
];

/// 标准列类型（与 CANONICAL_COLUMNS 按位置对应）
pub const CANONICAL_FIELD_TYPES: [FieldType; 7] = [
    FieldType::Timestamp,
    FieldType::Text,
    FieldType::Timestamp,
    FieldType::Numeric,
    FieldType::Numeric,
    FieldType::Text,
    FieldType::Text,
];

/// 默认金额列（有效行过滤依据）
pub const DEFAULT_AMOUNT_COLUMN: &str = "Importe";

/// 默认日期列（报表/排序依据）
pub const DEFAULT_DATE_COLUMN: &str = "Fecha Operación";

/// 默认摘要列（按摘要汇总依据）
pub const DEFAULT_CONCEPT_COLUMN: &str = "Concepto";
