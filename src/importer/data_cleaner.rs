// ==========================================
// 银行流水导入管道 - 行集清洗器实现
// ==========================================
// 职责: 入库前清洗，三个阶段严格按序执行
//   1. 表头噪声（至多删除首行）
//   2. 有效行过滤（金额列非数值 → 丢弃）
//   3. 空行过滤（全字段为空 → 丢弃）
// 失败: 显式返回 CleaningFailure，输入不被改动
// ==========================================

use crate::domain::{ColumnRef, FieldValue, RowSet, DEFAULT_AMOUNT_COLUMN};
use crate::importer::error::CleaningFailure;
use crate::importer::header_detector::HeaderNoiseDetector;
use crate::importer::importer_trait::DataCleaner as DataCleanerTrait;
use crate::importer::type_coercer::parse_decimal;
use tracing::info;

/// 宽松数值判断（不去千分位；空值/NaN/非数字为无效）
pub fn is_lenient_numeric(value: &FieldValue) -> bool {
    match value {
        FieldValue::Decimal(_) | FieldValue::Int(_) => true,
        FieldValue::Float(f) => f.is_finite(),
        FieldValue::Text(s) => {
            parse_decimal(s).is_some()
                || s.trim().parse::<f64>().map(f64::is_finite).unwrap_or(false)
        }
        _ => false,
    }
}

pub struct RowSetCleaner {
    amount_column: ColumnRef,
    header_detector: HeaderNoiseDetector,
}

impl RowSetCleaner {
    /// 创建清洗器
    ///
    /// # 参数
    /// - amount_column: 有效行判断所依据的金额列
    pub fn new(amount_column: impl Into<ColumnRef>) -> Self {
        Self {
            amount_column: amount_column.into(),
            header_detector: HeaderNoiseDetector,
        }
    }

    pub fn amount_column(&self) -> &ColumnRef {
        &self.amount_column
    }
}

impl Default for RowSetCleaner {
    fn default() -> Self {
        Self::new(DEFAULT_AMOUNT_COLUMN)
    }
}

impl DataCleanerTrait for RowSetCleaner {
    fn clean(&self, rows: &RowSet) -> Result<RowSet, CleaningFailure> {
        // 先解析金额列，失败时不产生任何改动
        let amount_idx = rows
            .column_index(&self.amount_column)
            .ok_or_else(|| CleaningFailure::AmountColumnMissing(self.amount_column.to_string()))?;

        let initial = rows.len();
        info!(rows = initial, "开始清洗行集");

        // === 阶段 1: 表头噪声 ===
        let stage1 = self.header_detector.strip(rows.clone());
        info!(rows_before = initial, rows_after = stage1.len(), "表头噪声检测完成");

        // === 阶段 2: 有效行过滤 ===
        let before = stage1.len();
        let stage2 = stage1.retain(|row| row.get(amount_idx).map(is_lenient_numeric).unwrap_or(false));
        info!(rows_before = before, rows_after = stage2.len(), "无效金额行过滤完成");

        // === 阶段 3: 空行过滤 ===
        let before = stage2.len();
        let stage3 = stage2.retain(|row| !row.iter().all(FieldValue::is_blank));
        info!(rows_before = before, rows_after = stage3.len(), "空行过滤完成");

        info!(rows_before = initial, rows_after = stage3.len(), "行集清洗完成");
        Ok(stage3)
    }
}
