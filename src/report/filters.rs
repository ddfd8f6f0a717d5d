// ==========================================
// 银行流水导入管道 - 内存行集过滤与排序
// ==========================================
// 输入: 类型转换后的行集（日期为 Timestamp，金额为 Decimal）
// 规则: 目标列为空的行不参与匹配（被过滤掉）
// ==========================================

use crate::domain::{
    ColumnRef, FieldValue, RowSet, DEFAULT_AMOUNT_COLUMN, DEFAULT_CONCEPT_COLUMN,
    DEFAULT_DATE_COLUMN,
};
use crate::importer::type_coercer::parse_decimal;
use crate::report::{ReportError, ReportResult};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use tracing::info;

pub(crate) fn amount_of(value: &FieldValue) -> Option<Decimal> {
    match value {
        FieldValue::Decimal(d) => Some(*d),
        FieldValue::Int(i) => Some(Decimal::from(*i)),
        FieldValue::Float(f) if f.is_finite() => Decimal::try_from(*f).ok(),
        FieldValue::Text(s) => parse_decimal(s),
        _ => None,
    }
}

fn timestamp_of(value: &FieldValue) -> Option<NaiveDateTime> {
    value.as_timestamp()
}

// ==========================================
// MovementAnalyzer
// ==========================================
#[derive(Debug, Clone)]
pub struct MovementAnalyzer {
    pub(crate) date_column: ColumnRef,
    pub(crate) concept_column: ColumnRef,
    pub(crate) amount_column: ColumnRef,
}

impl Default for MovementAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_DATE_COLUMN, DEFAULT_CONCEPT_COLUMN, DEFAULT_AMOUNT_COLUMN)
    }
}

impl MovementAnalyzer {
    pub fn new(
        date_column: impl Into<ColumnRef>,
        concept_column: impl Into<ColumnRef>,
        amount_column: impl Into<ColumnRef>,
    ) -> Self {
        Self {
            date_column: date_column.into(),
            concept_column: concept_column.into(),
            amount_column: amount_column.into(),
        }
    }

    pub(crate) fn index(rows: &RowSet, column: &ColumnRef) -> ReportResult<usize> {
        rows.column_index(column)
            .ok_or_else(|| ReportError::ColumnNotFound(column.to_string()))
    }

    /// 按操作日期过滤（闭区间，按日比较）
    pub fn filter_by_date(&self, rows: RowSet, from: NaiveDate, to: NaiveDate) -> ReportResult<RowSet> {
        let idx = Self::index(&rows, &self.date_column)?;
        info!(from = %from, to = %to, "按日期过滤");

        let filtered = rows.retain(|row| {
            timestamp_of(&row[idx])
                .map(|ts| ts.date() >= from && ts.date() <= to)
                .unwrap_or(false)
        });
        info!(rows = filtered.len(), "按日期过滤完成");
        Ok(filtered)
    }

    /// 按摘要子串过滤（区分大小写）
    pub fn filter_by_concept(&self, rows: RowSet, needle: &str) -> ReportResult<RowSet> {
        let idx = Self::index(&rows, &self.concept_column)?;
        info!(concept = %needle, "按摘要过滤");

        let filtered = rows.retain(|row| match &row[idx] {
            FieldValue::Empty => false,
            other => other.to_string().contains(needle),
        });
        info!(rows = filtered.len(), "按摘要过滤完成");
        Ok(filtered)
    }

    /// 按金额过滤（闭区间，上下限同时生效）
    pub fn filter_by_amount(&self, rows: RowSet, min: Decimal, max: Decimal) -> ReportResult<RowSet> {
        let idx = Self::index(&rows, &self.amount_column)?;
        info!(min = %min, max = %max, "按金额过滤");

        let filtered = rows.retain(|row| {
            amount_of(&row[idx])
                .map(|amount| amount >= min && amount <= max)
                .unwrap_or(false)
        });
        info!(rows = filtered.len(), "按金额过滤完成");
        Ok(filtered)
    }

    /// 按操作日期升序排序（稳定；空日期排在最后）
    pub fn sort_by_date(&self, rows: RowSet) -> ReportResult<RowSet> {
        let idx = Self::index(&rows, &self.date_column)?;
        let schema = rows.schema().clone();

        let mut data = rows.into_rows();
        data.sort_by(|a, b| match (timestamp_of(&a[idx]), timestamp_of(&b[idx])) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });

        let sorted = RowSet::from_rows(schema, data)?;
        info!(rows = sorted.len(), "按日期排序完成");
        Ok(sorted)
    }
}
