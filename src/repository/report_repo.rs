// ==========================================
// 银行流水导入管道 - 报表查询仓储
// ==========================================
// 职责: 目标表只读汇总查询（月度概览 / 按日 / 按摘要 / 按月 / 明细）
// 约束: 列名来自 GastosTable，日期区间参数化绑定
// 注意: DECIMAL 列为 NUMERIC 亲和，整额金额读回为 INTEGER
// ==========================================

use crate::domain::TIMESTAMP_FORMAT;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::gastos_table::GastosTable;
use crate::repository::movement_store::{MovementStore, QueryRow};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Value;
use serde::Serialize;

// ==========================================
// 报表行类型
// ==========================================

/// 月度概览
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyOverview {
    pub year: i32,
    pub month: u32,
    pub movements: i64,
    pub total_amount: f64,
    pub busiest_day: Option<u32>,           // 笔数最多的日（同笔数取较早日）
    pub busiest_day_movements: i64,
    pub busiest_day_amount: f64,
}

/// 按日汇总
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySpend {
    pub day: NaiveDate,
    pub movements: i64,
    pub total_amount: f64,
}

/// 按摘要汇总
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConceptSpend {
    pub concept: Option<String>,
    pub movements: i64,
    pub total_amount: f64,
    pub average_amount: f64,
    pub min_amount: f64,
    pub max_amount: f64,
}

/// 按月汇总
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySpend {
    pub month: String, // YYYY-MM
    pub movements: i64,
    pub total_amount: f64,
}

/// 流水明细
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Movement {
    pub id: i64,
    pub fecha_operacion: Option<NaiveDateTime>,
    pub concepto: Option<String>,
    pub fecha_valor: Option<NaiveDateTime>,
    pub importe: Option<f64>,
    pub saldo: Option<f64>,
    pub referencia_1: Option<String>,
    pub referencia_2: Option<String>,
}

// ==========================================
// 值提取
// ==========================================

fn value_as_f64(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Integer(i) => Some(*i as f64),
        Value::Real(f) => Some(*f),
        Value::Text(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn value_as_i64(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Integer(i) => Some(*i),
        Value::Real(f) => Some(*f as i64),
        Value::Text(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn value_as_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Text(s) => Some(s.clone()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(f) => Some(f.to_string()),
        _ => None,
    }
}

fn value_as_timestamp(value: Option<&Value>) -> Option<NaiveDateTime> {
    value_as_string(value).and_then(|s| NaiveDateTime::parse_from_str(&s, TIMESTAMP_FORMAT).ok())
}

fn required_i64(row: &QueryRow, key: &str) -> RepositoryResult<i64> {
    value_as_i64(row.get(key)).ok_or_else(|| {
        RepositoryError::DatabaseQueryError(format!("结果列缺失或类型错误: {}", key))
    })
}

fn date_param(date: NaiveDate) -> Value {
    Value::Text(date.format("%Y-%m-%d").to_string())
}

// ==========================================
// ReportRepository
// ==========================================
pub struct ReportRepository<'a, S: MovementStore + ?Sized> {
    store: &'a S,
    table: String,
    columns: Vec<String>, // 数据列存储名（不含 id），按列序
}

impl<'a, S: MovementStore + ?Sized> ReportRepository<'a, S> {
    pub fn new(store: &'a S, table: &GastosTable) -> Self {
        Self {
            store,
            table: table.name().to_string(),
            columns: table.data_columns().map(|c| c.name.clone()).collect(),
        }
    }

    // 位置: 0 操作日期 / 1 摘要 / 3 金额
    fn date_col(&self) -> &str {
        &self.columns[0]
    }

    fn concept_col(&self) -> &str {
        &self.columns[1]
    }

    fn amount_col(&self) -> &str {
        &self.columns[3]
    }

    /// 月度概览：笔数、总额、笔数最多的日及其金额
    pub fn monthly_overview(&self, year: i32, month: u32) -> RepositoryResult<MonthlyOverview> {
        let period = vec![Value::Text(format!("{:04}-{:02}", year, month))];

        let totals_sql = format!(
            "SELECT COUNT(*) AS movements, COALESCE(SUM({amount}), 0) AS total \
             FROM {table} WHERE strftime('%Y-%m', {date}) = ?1",
            amount = self.amount_col(),
            table = self.table,
            date = self.date_col(),
        );
        let totals = self.store.execute_query(&totals_sql, &period)?;
        let totals = totals.first();
        let movements = totals.and_then(|r| value_as_i64(r.get("movements"))).unwrap_or(0);
        let total_amount = totals.and_then(|r| value_as_f64(r.get("total"))).unwrap_or(0.0);

        let busiest_sql = format!(
            "SELECT CAST(strftime('%d', {date}) AS INTEGER) AS day, COUNT(*) AS movements, \
             COALESCE(SUM({amount}), 0) AS total \
             FROM {table} WHERE strftime('%Y-%m', {date}) = ?1 \
             GROUP BY day ORDER BY movements DESC, day ASC LIMIT 1",
            date = self.date_col(),
            amount = self.amount_col(),
            table = self.table,
        );
        let busiest = self.store.execute_query(&busiest_sql, &period)?;
        let busiest = busiest.first();

        Ok(MonthlyOverview {
            year,
            month,
            movements,
            total_amount,
            busiest_day: busiest
                .and_then(|r| value_as_i64(r.get("day")))
                .map(|d| d as u32),
            busiest_day_movements: busiest
                .and_then(|r| value_as_i64(r.get("movements")))
                .unwrap_or(0),
            busiest_day_amount: busiest
                .and_then(|r| value_as_f64(r.get("total")))
                .unwrap_or(0.0),
        })
    }

    /// 按日汇总（闭区间）
    pub fn spend_by_day(&self, from: NaiveDate, to: NaiveDate) -> RepositoryResult<Vec<DailySpend>> {
        let sql = format!(
            "SELECT date({date}) AS day, COUNT(*) AS movements, COALESCE(SUM({amount}), 0) AS total \
             FROM {table} WHERE date({date}) BETWEEN ?1 AND ?2 \
             GROUP BY day ORDER BY day ASC",
            date = self.date_col(),
            amount = self.amount_col(),
            table = self.table,
        );
        let rows = self
            .store
            .execute_query(&sql, &[date_param(from), date_param(to)])?;

        rows.iter()
            .map(|row| {
                let day = value_as_string(row.get("day"))
                    .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
                    .ok_or_else(|| RepositoryError::DatabaseQueryError("日期列无法解析".to_string()))?;
                Ok(DailySpend {
                    day,
                    movements: required_i64(row, "movements")?,
                    total_amount: value_as_f64(row.get("total")).unwrap_or(0.0),
                })
            })
            .collect()
    }

    /// 按摘要汇总（闭区间，按总额降序）
    pub fn spend_by_concept(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepositoryResult<Vec<ConceptSpend>> {
        let sql = format!(
            "SELECT {concept} AS concept, COUNT(*) AS movements, \
             COALESCE(SUM({amount}), 0) AS total, COALESCE(AVG({amount}), 0) AS average, \
             COALESCE(MIN({amount}), 0) AS min_amount, COALESCE(MAX({amount}), 0) AS max_amount \
             FROM {table} WHERE date({date}) BETWEEN ?1 AND ?2 \
             GROUP BY {concept} ORDER BY total DESC, concept ASC",
            concept = self.concept_col(),
            amount = self.amount_col(),
            table = self.table,
            date = self.date_col(),
        );
        let rows = self
            .store
            .execute_query(&sql, &[date_param(from), date_param(to)])?;

        rows.iter()
            .map(|row| {
                Ok(ConceptSpend {
                    concept: value_as_string(row.get("concept")),
                    movements: required_i64(row, "movements")?,
                    total_amount: value_as_f64(row.get("total")).unwrap_or(0.0),
                    average_amount: value_as_f64(row.get("average")).unwrap_or(0.0),
                    min_amount: value_as_f64(row.get("min_amount")).unwrap_or(0.0),
                    max_amount: value_as_f64(row.get("max_amount")).unwrap_or(0.0),
                })
            })
            .collect()
    }

    /// 按月汇总（全表）
    pub fn spend_by_month(&self) -> RepositoryResult<Vec<MonthlySpend>> {
        let sql = format!(
            "SELECT strftime('%Y-%m', {date}) AS month, COUNT(*) AS movements, \
             COALESCE(SUM({amount}), 0) AS total \
             FROM {table} GROUP BY month ORDER BY month ASC",
            date = self.date_col(),
            amount = self.amount_col(),
            table = self.table,
        );
        let rows = self.store.execute_query(&sql, &[])?;

        rows.iter()
            .map(|row| {
                Ok(MonthlySpend {
                    month: value_as_string(row.get("month")).unwrap_or_default(),
                    movements: required_i64(row, "movements")?,
                    total_amount: value_as_f64(row.get("total")).unwrap_or(0.0),
                })
            })
            .collect()
    }

    /// 区间明细（按操作日期升序）
    pub fn list_movements(&self, from: NaiveDate, to: NaiveDate) -> RepositoryResult<Vec<Movement>> {
        let sql = format!(
            "SELECT id, {cols} FROM {table} WHERE date({date}) BETWEEN ?1 AND ?2 \
             ORDER BY {date} ASC, id ASC",
            cols = self.columns.join(", "),
            table = self.table,
            date = self.date_col(),
        );
        let rows = self
            .store
            .execute_query(&sql, &[date_param(from), date_param(to)])?;

        let col = |row: &QueryRow, i: usize| row.get(self.columns[i].as_str()).cloned();
        rows.iter()
            .map(|row| {
                Ok(Movement {
                    id: required_i64(row, "id")?,
                    fecha_operacion: value_as_timestamp(col(row, 0).as_ref()),
                    concepto: value_as_string(col(row, 1).as_ref()),
                    fecha_valor: value_as_timestamp(col(row, 2).as_ref()),
                    importe: value_as_f64(col(row, 3).as_ref()),
                    saldo: value_as_f64(col(row, 4).as_ref()),
                    referencia_1: value_as_string(col(row, 5).as_ref()),
                    referencia_2: value_as_string(col(row, 6).as_ref()),
                })
            })
            .collect()
    }
}
