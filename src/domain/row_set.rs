// ==========================================
// 银行流水导入管道 - 行集（Row Set）
// ==========================================
// 职责: 字段值 / 列结构 / 行集容器
// 不变量: 每行字段数 == 列结构列数
// ==========================================

use crate::domain::types::CANONICAL_COLUMNS;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use thiserror::Error;

/// 时间戳的标准文本格式（入库 / 文本转换共用）
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 行集错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowSetError {
    #[error("列结构为空")]
    EmptySchema,

    #[error("列名重复: {0}")]
    DuplicateColumn(String),

    #[error("行宽度不一致 (行 {row}): 期望 {expected} 列，实际 {actual} 列")]
    RowWidthMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("列结构不一致，无法合并行集")]
    SchemaMismatch,
}

pub type RowSetResult<T> = Result<T, RowSetError>;

// ==========================================
// FieldValue - 单元格值
// ==========================================
// 转换前: Text / Int / Float / Bool / Timestamp（Excel 原生类型）
// 转换后: Timestamp / Decimal / Text / Empty
#[derive(Debug, Clone)]
pub enum FieldValue {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Decimal(Decimal),
    Timestamp(NaiveDateTime),
}

impl FieldValue {
    /// 由原始文本构造（TRIM，空串 → Empty）
    pub fn from_raw_text(raw: &str) -> Self {
        let trimmed = raw.trim_start_matches('\u{feff}').trim();
        if trimmed.is_empty() {
            FieldValue::Empty
        } else {
            FieldValue::Text(trimmed.to_string())
        }
    }

    /// 是否为空值（Empty 或纯空白文本）
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Empty => true,
            FieldValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            FieldValue::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    // 浮点比较键: -0.0 归并为 0.0，NaN 统一为同一位模式
    fn float_key(v: f64) -> u64 {
        if v == 0.0 {
            0
        } else if v.is_nan() {
            f64::NAN.to_bits()
        } else {
            v.to_bits()
        }
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldValue::Empty, FieldValue::Empty) => true,
            (FieldValue::Text(a), FieldValue::Text(b)) => a == b,
            (FieldValue::Int(a), FieldValue::Int(b)) => a == b,
            (FieldValue::Float(a), FieldValue::Float(b)) => {
                Self::float_key(*a) == Self::float_key(*b)
            }
            (FieldValue::Bool(a), FieldValue::Bool(b)) => a == b,
            (FieldValue::Decimal(a), FieldValue::Decimal(b)) => a == b,
            (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for FieldValue {}

impl Hash for FieldValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            FieldValue::Empty => {}
            FieldValue::Text(s) => s.hash(state),
            FieldValue::Int(i) => i.hash(state),
            FieldValue::Float(f) => Self::float_key(*f).hash(state),
            FieldValue::Bool(b) => b.hash(state),
            FieldValue::Decimal(d) => d.normalize().hash(state),
            FieldValue::Timestamp(ts) => ts.hash(state),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Empty => Ok(()),
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Decimal(d) => write!(f, "{}", d),
            FieldValue::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
        }
    }
}

// ==========================================
// ColumnRef - 列引用（按名 / 按位置）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRef {
    Name(String),
    Index(usize),
}

impl From<&str> for ColumnRef {
    fn from(name: &str) -> Self {
        ColumnRef::Name(name.to_string())
    }
}

impl From<String> for ColumnRef {
    fn from(name: String) -> Self {
        ColumnRef::Name(name)
    }
}

impl From<usize> for ColumnRef {
    fn from(index: usize) -> Self {
        ColumnRef::Index(index)
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRef::Name(name) => write!(f, "{}", name),
            ColumnRef::Index(idx) => write!(f, "#{}", idx),
        }
    }
}

// ==========================================
// ColumnSchema - 列结构
// ==========================================

/// 列名 → 存储列名（小写、去重音、非字母数字 → '_'）
///
/// 例: "Fecha Operación" → "fecha_operacion"，"Referencia 1" → "referencia_1"
pub fn to_store_name(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for ch in label.trim().chars().flat_map(char::to_lowercase) {
        let folded = match ch {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            'ç' => 'c',
            c => c,
        };
        if folded.is_ascii_alphanumeric() {
            out.push(folded);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    label: String,
    store_name: String,
}

impl Column {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn store_name(&self) -> &str {
        &self.store_name
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    columns: Vec<Column>,
}

impl ColumnSchema {
    /// 创建列结构（列名按存储名去重）
    pub fn new<I, S>(labels: I) -> RowSetResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut columns = Vec::new();
        for label in labels {
            let label = label.as_ref().trim().to_string();
            let store_name = to_store_name(&label);
            if store_name.is_empty() || !seen.insert(store_name.clone()) {
                return Err(RowSetError::DuplicateColumn(label));
            }
            columns.push(Column { label, store_name });
        }
        if columns.is_empty() {
            return Err(RowSetError::EmptySchema);
        }
        Ok(Self { columns })
    }

    /// 标准 7 列结构
    pub fn canonical() -> Self {
        let columns = CANONICAL_COLUMNS
            .iter()
            .map(|label| Column {
                label: label.to_string(),
                store_name: to_store_name(label),
            })
            .collect();
        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.label.as_str())
    }

    pub fn store_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.store_name.as_str())
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(|c| c.label.as_str())
    }

    /// 按列名查找位置（列标签忽略大小写，或存储名）
    pub fn position(&self, name: &str) -> Option<usize> {
        let wanted = name.trim().to_lowercase();
        self.columns
            .iter()
            .position(|c| c.label.to_lowercase() == wanted)
            .or_else(|| {
                let store = to_store_name(&wanted);
                self.columns.iter().position(|c| c.store_name == store)
            })
    }

    /// 解析列引用为位置
    pub fn resolve(&self, column: &ColumnRef) -> Option<usize> {
        match column {
            ColumnRef::Name(name) => self.position(name),
            ColumnRef::Index(idx) if *idx < self.columns.len() => Some(*idx),
            ColumnRef::Index(_) => None,
        }
    }
}

// ==========================================
// RowSet - 行集
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSet {
    schema: Arc<ColumnSchema>,
    rows: Vec<Vec<FieldValue>>,
}

impl RowSet {
    pub fn new(schema: Arc<ColumnSchema>) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    /// 由行数据构造（校验行宽）
    pub fn from_rows(schema: Arc<ColumnSchema>, rows: Vec<Vec<FieldValue>>) -> RowSetResult<Self> {
        let expected = schema.len();
        if let Some((row, bad)) = rows.iter().enumerate().find(|(_, r)| r.len() != expected) {
            return Err(RowSetError::RowWidthMismatch {
                row,
                expected,
                actual: bad.len(),
            });
        }
        Ok(Self { schema, rows })
    }

    pub fn push_row(&mut self, row: Vec<FieldValue>) -> RowSetResult<()> {
        if row.len() != self.schema.len() {
            return Err(RowSetError::RowWidthMismatch {
                row: self.rows.len(),
                expected: self.schema.len(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn schema(&self) -> &Arc<ColumnSchema> {
        &self.schema
    }

    pub fn rows(&self) -> &[Vec<FieldValue>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[FieldValue]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<Vec<FieldValue>> {
        self.rows
    }

    pub fn column_index(&self, column: &ColumnRef) -> Option<usize> {
        self.schema.resolve(column)
    }

    /// 某列的全部值
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &FieldValue> {
        self.rows.iter().filter_map(move |row| row.get(index))
    }

    /// 保留满足条件的行（保持相对顺序）
    pub fn retain<F>(mut self, mut keep: F) -> Self
    where
        F: FnMut(&[FieldValue]) -> bool,
    {
        self.rows.retain(|row| keep(row));
        self
    }

    /// 去掉首行（不存在时原样返回）
    pub fn without_first_row(mut self) -> Self {
        if !self.rows.is_empty() {
            self.rows.remove(0);
        }
        self
    }

    /// 逐值改写指定列；任一值失败则返回错误
    pub fn try_map_column<E, F>(mut self, index: usize, mut map: F) -> Result<Self, E>
    where
        F: FnMut(usize, &FieldValue) -> Result<FieldValue, E>,
    {
        for (row_idx, row) in self.rows.iter_mut().enumerate() {
            if let Some(cell) = row.get_mut(index) {
                *cell = map(row_idx, cell)?;
            }
        }
        Ok(self)
    }

    /// 追加另一行集（列结构必须一致）
    pub fn concat(mut self, other: RowSet) -> RowSetResult<Self> {
        if self.schema != other.schema {
            return Err(RowSetError::SchemaMismatch);
        }
        self.rows.extend(other.rows);
        Ok(self)
    }
}
