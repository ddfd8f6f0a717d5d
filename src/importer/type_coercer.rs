// ==========================================
// 银行流水导入管道 - 字段类型转换器
// ==========================================
// 职责: 将单列转换为目标语义类型
// 策略: 金额/整数/文本严格（任一值失败整列失败）
//       日期宽松（单值失败置空，不中止）
// ==========================================

use crate::domain::{ColumnRef, FieldType, FieldValue, RowSet, TIMESTAMP_FORMAT};
use crate::importer::error::{ImportError, ImportResult};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::{info, warn};

/// ISO 日期格式（年在前）
const ISO_DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// 日在月前（四位年）
const DAY_FIRST_FORMATS: [&str; 3] = ["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];

/// 日在月前（两位年）
const DAY_FIRST_SHORT_FORMATS: [&str; 3] = ["%d/%m/%y", "%d-%m-%y", "%d.%m.%y"];

const TIME_FORMATS: [&str; 2] = ["%H:%M:%S%.f", "%H:%M"];

// ==========================================
// 解析工具
// ==========================================

/// 解析十进制数（支持科学计数法；不处理千分位）
pub fn parse_decimal(text: &str) -> Option<Decimal> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed)
        .ok()
        .or_else(|| Decimal::from_scientific(trimmed).ok())
}

/// 解析日期（日在月前；ISO 年在前亦可）
pub fn parse_day_first_date(text: &str) -> Option<NaiveDate> {
    let trimmed = text.trim();
    let year_first = trimmed
        .get(..4)
        .map_or(false, |prefix| prefix.bytes().all(|b| b.is_ascii_digit()));
    let year_len = trimmed
        .rsplit(|c: char| matches!(c, '/' | '-' | '.'))
        .next()
        .map(str::len)
        .unwrap_or(0);

    let formats: &[&str] = if year_first {
        &ISO_DATE_FORMATS
    } else if year_len == 2 {
        &DAY_FIRST_SHORT_FORMATS
    } else {
        &DAY_FIRST_FORMATS
    };

    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

/// 解析日期时间（日期部分日在月前，时间部分可选）
pub fn parse_day_first_timestamp(text: &str) -> Option<NaiveDateTime> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (date_part, time_part) = match trimmed.split_once(|c: char| c == ' ' || c == 'T') {
        Some((d, t)) => (d, Some(t.trim())),
        None => (trimmed, None),
    };

    let date = parse_day_first_date(date_part)?;
    let time = match time_part {
        None => NaiveTime::MIN,
        Some(t) => TIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveTime::parse_from_str(t, fmt).ok())?,
    };

    Some(date.and_time(time))
}

// ==========================================
// TypeCoercer - 类型转换器
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeCoercer;

impl TypeCoercer {
    /// 转换指定列到目标类型
    ///
    /// # 参数
    /// - rows: 行集
    /// - column: 列引用（列名或位置）
    /// - target: 目标类型
    ///
    /// # 返回
    /// - Ok(RowSet): 列值已改写，列名不变
    /// - Err(ColumnNotFound): 列不存在
    /// - Err(TypeCoercion): 严格转换失败（指明列与首个失败行）
    pub fn coerce(&self, rows: RowSet, column: &ColumnRef, target: FieldType) -> ImportResult<RowSet> {
        let index = rows
            .column_index(column)
            .ok_or_else(|| ImportError::ColumnNotFound(column.to_string()))?;
        let label = rows
            .schema()
            .label(index)
            .unwrap_or_default()
            .to_string();

        info!(column = %label, target = %target, "开始字段类型转换");

        let result = match target {
            FieldType::Timestamp => {
                let mut nulled = 0usize;
                let converted = rows.try_map_column(index, |_, value| {
                    let out = Self::to_timestamp(value);
                    if out == FieldValue::Empty && *value != FieldValue::Empty {
                        nulled += 1;
                    }
                    Ok::<_, ImportError>(out)
                })?;
                if nulled > 0 {
                    warn!(column = %label, nulled, "日期无法解析，已置空");
                }
                converted
            }
            FieldType::Numeric => rows.try_map_column(index, |row, value| {
                Self::to_decimal(value).ok_or_else(|| Self::failure(&label, row, value, target))
            })?,
            FieldType::Integer => rows.try_map_column(index, |row, value| {
                Self::to_integer(value).ok_or_else(|| Self::failure(&label, row, value, target))
            })?,
            FieldType::Text => rows.try_map_column(index, |_, value| {
                Ok::<_, ImportError>(Self::to_text(value))
            })?,
        };

        info!(column = %label, target = %target, "字段类型转换成功");
        Ok(result)
    }

    fn failure(label: &str, row: usize, value: &FieldValue, target: FieldType) -> ImportError {
        ImportError::TypeCoercion {
            column: label.to_string(),
            row,
            value: value.to_string(),
            target,
        }
    }

    // 金额: 字符串化 → 去千分位逗号 → 十进制
    fn to_decimal(value: &FieldValue) -> Option<FieldValue> {
        match value {
            FieldValue::Empty => Some(FieldValue::Empty),
            FieldValue::Decimal(d) => Some(FieldValue::Decimal(*d)),
            FieldValue::Int(i) => Some(FieldValue::Decimal(Decimal::from(*i))),
            FieldValue::Float(f) if f.is_nan() => Some(FieldValue::Empty),
            FieldValue::Float(f) if f.is_finite() => parse_decimal(&f.to_string()).map(FieldValue::Decimal),
            FieldValue::Text(s) => {
                let stripped = s.replace(',', "");
                if stripped.trim().eq_ignore_ascii_case("nan") {
                    return Some(FieldValue::Empty);
                }
                parse_decimal(&stripped).map(FieldValue::Decimal)
            }
            _ => None,
        }
    }

    fn to_integer(value: &FieldValue) -> Option<FieldValue> {
        match value {
            FieldValue::Empty => Some(FieldValue::Empty),
            FieldValue::Int(i) => Some(FieldValue::Int(*i)),
            FieldValue::Bool(b) => Some(FieldValue::Int(i64::from(*b))),
            FieldValue::Float(f) if f.is_finite() && f.fract() == 0.0 => {
                Some(FieldValue::Int(*f as i64))
            }
            FieldValue::Decimal(d) if d.fract().is_zero() => {
                d.to_i64().map(FieldValue::Int)
            }
            FieldValue::Text(s) => s.trim().parse::<i64>().ok().map(FieldValue::Int),
            _ => None,
        }
    }

    // 日期: 无法解析 → Empty（宽松）
    fn to_timestamp(value: &FieldValue) -> FieldValue {
        match value {
            FieldValue::Timestamp(ts) => FieldValue::Timestamp(*ts),
            FieldValue::Text(s) => parse_day_first_timestamp(s)
                .map(FieldValue::Timestamp)
                .unwrap_or(FieldValue::Empty),
            _ => FieldValue::Empty,
        }
    }

    fn to_text(value: &FieldValue) -> FieldValue {
        match value {
            FieldValue::Empty => FieldValue::Empty,
            FieldValue::Text(s) => FieldValue::Text(s.clone()),
            FieldValue::Timestamp(ts) => FieldValue::Text(ts.format(TIMESTAMP_FORMAT).to_string()),
            other => FieldValue::Text(other.to_string()),
        }
    }
}
