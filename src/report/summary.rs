// ==========================================
// 银行流水导入管道 - 行集汇总
// ==========================================
// 输出: 行数 / 金额统计 / 摘要频次表
// ==========================================

use crate::domain::{FieldValue, RowSet};
use crate::report::filters::{amount_of, MovementAnalyzer};
use crate::report::ReportResult;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

/// 金额统计（空金额不计入）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AmountStats {
    pub count: usize,
    pub sum: Decimal,
    pub mean: Option<Decimal>,
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConceptCount {
    pub concept: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovementSummary {
    pub rows: usize,
    pub amount: AmountStats,
    pub concepts: Vec<ConceptCount>, // 笔数降序，同笔数按摘要升序
}

impl MovementAnalyzer {
    /// 汇总行集
    pub fn summarize(&self, rows: &RowSet) -> ReportResult<MovementSummary> {
        let amount_idx = Self::index(rows, &self.amount_column)?;
        let concept_idx = Self::index(rows, &self.concept_column)?;

        let amounts: Vec<Decimal> = rows.column_values(amount_idx).filter_map(amount_of).collect();
        let sum: Decimal = amounts.iter().copied().sum();
        let amount = AmountStats {
            count: amounts.len(),
            sum,
            mean: (!amounts.is_empty()).then(|| (sum / Decimal::from(amounts.len())).round_dp(2)),
            min: amounts.iter().min().copied(),
            max: amounts.iter().max().copied(),
        };

        let mut counts: HashMap<String, usize> = HashMap::new();
        for value in rows.column_values(concept_idx) {
            if !matches!(value, FieldValue::Empty) {
                *counts.entry(value.to_string()).or_insert(0) += 1;
            }
        }
        let mut concepts: Vec<ConceptCount> = counts
            .into_iter()
            .map(|(concept, count)| ConceptCount { concept, count })
            .collect();
        concepts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.concept.cmp(&b.concept)));

        let summary = MovementSummary {
            rows: rows.len(),
            amount,
            concepts,
        };

        info!(
            rows = summary.rows,
            amount_count = summary.amount.count,
            amount_sum = %summary.amount.sum,
            concepts = summary.concepts.len(),
            "行集汇总完成"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ColumnSchema;
    use std::str::FromStr;
    use std::sync::Arc;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn rows(data: Vec<(&str, Option<&str>)>) -> RowSet {
        let schema = Arc::new(ColumnSchema::new(["Concepto", "Importe"]).unwrap());
        RowSet::from_rows(
            schema,
            data.into_iter()
                .map(|(concept, amount)| {
                    vec![
                        FieldValue::from_raw_text(concept),
                        amount.map(|a| FieldValue::Decimal(dec(a))).unwrap_or(FieldValue::Empty),
                    ]
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_summarize() {
        let input = rows(vec![
            ("Netflix", Some("-15.99")),
            ("Spotify", Some("-9.99")),
            ("Netflix", Some("-15.99")),
            ("Nomina", Some("1500.00")),
            ("Ajuste", None),
        ]);

        let summary = MovementAnalyzer::default().summarize(&input).unwrap();

        assert_eq!(summary.rows, 5);
        assert_eq!(summary.amount.count, 4);
        assert_eq!(summary.amount.sum, dec("1458.03"));
        assert_eq!(summary.amount.mean, Some(dec("364.51")));
        assert_eq!(summary.amount.min, Some(dec("-15.99")));
        assert_eq!(summary.amount.max, Some(dec("1500.00")));
        assert_eq!(
            summary.concepts[0],
            ConceptCount {
                concept: "Netflix".to_string(),
                count: 2
            }
        );
        assert_eq!(summary.concepts[1].concept, "Ajuste");
    }

    #[test]
    fn test_summarize_empty() {
        let summary = MovementAnalyzer::default().summarize(&rows(vec![])).unwrap();
        assert_eq!(summary.rows, 0);
        assert_eq!(summary.amount.mean, None);
        assert!(summary.concepts.is_empty());
    }
}
