// ==========================================
// 银行流水导入管道 - 重复行去除
// ==========================================
// 规则: 全字段相等视为重复；保留首次出现，保持相对顺序
// ==========================================

use crate::domain::RowSet;
use std::collections::HashSet;
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct Deduplicator;

impl Deduplicator {
    /// 去除完全重复的行
    pub fn dedupe(&self, rows: RowSet) -> RowSet {
        let before = rows.len();
        let mut seen = HashSet::with_capacity(before);
        let deduped = rows.retain(|row| seen.insert(row.to_vec()));
        info!(rows_before = before, rows_after = deduped.len(), "重复行已去除");
        deduped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ColumnSchema, FieldValue};
    use std::sync::Arc;

    fn rows(data: &[&[&str]]) -> RowSet {
        let schema = Arc::new(ColumnSchema::new(["Concepto", "Importe"]).unwrap());
        RowSet::from_rows(
            schema,
            data.iter()
                .map(|r| r.iter().map(|v| FieldValue::from_raw_text(v)).collect())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_keeps_first_occurrence_in_order() {
        let input = rows(&[
            &["Netflix", "15.99"],
            &["Spotify", "9.99"],
            &["Netflix", "15.99"],
            &["Mercadona", "42.10"],
            &["Spotify", "9.99"],
        ]);
        let out = Deduplicator.dedupe(input);

        let concepts: Vec<String> = out.column_values(0).map(|v| v.to_string()).collect();
        assert_eq!(concepts, vec!["Netflix", "Spotify", "Mercadona"]);
    }

    #[test]
    fn test_partial_match_is_not_duplicate() {
        let input = rows(&[&["Netflix", "15.99"], &["Netflix", "16.99"]]);
        assert_eq!(Deduplicator.dedupe(input).len(), 2);
    }

    #[test]
    fn test_idempotent() {
        let input = rows(&[
            &["Netflix", "15.99"],
            &["Netflix", "15.99"],
            &["", ""],
            &["", ""],
        ]);
        let once = Deduplicator.dedupe(input);
        let twice = Deduplicator.dedupe(once.clone());
        assert_eq!(once, twice);
        assert_eq!(once.len(), 2);
    }
}
