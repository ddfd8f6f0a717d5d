// ==========================================
// 银行流水导入管道 - 表头噪声检测
// ==========================================
// 职责: 识别混入数据区的表头行（多段导出时重复出现）
// 规则: 仅检查首行；任一单元格命中表头词典即整行丢弃
// 已知局限: 真实数据恰好等于表头词（如摘要 "Concepto"）会被误删
// ==========================================

use crate::domain::{FieldValue, RowSet};
use tracing::info;

/// 已知表头标签（小写；西/英两种导出变体）
///
/// 固定白名单，运行期不扩充、不裁剪
pub const KNOWN_HEADER_LABELS: &[&str] = &[
    // 操作日期
    "fecha operación",
    "fecha operacion",
    "fecha_operacion",
    "fecha_operación",
    "f. operación",
    "f. operacion",
    "fecha",
    "date",
    "operation date",
    // 起息日期
    "fecha valor",
    "fecha_valor",
    "f. valor",
    "value date",
    // 摘要
    "concepto",
    "descripción",
    "descripcion",
    "description",
    "concept",
    // 金额
    "importe",
    "monto",
    "amount",
    // 余额
    "saldo",
    "balance",
    // 参考号
    "referencia 1",
    "referencia_1",
    "referencia1",
    "ref1",
    "ref 1",
    "reference 1",
    "referencia 2",
    "referencia_2",
    "referencia2",
    "ref2",
    "ref 2",
    "reference 2",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderNoiseDetector;

impl HeaderNoiseDetector {
    /// 单元格是否为表头标签（TRIM + 小写后精确匹配）
    pub fn is_header_label(&self, value: &FieldValue) -> bool {
        let normalized = value.to_string().trim().to_lowercase();
        !normalized.is_empty() && KNOWN_HEADER_LABELS.contains(&normalized.as_str())
    }

    /// 首行是否为表头噪声
    pub fn first_row_is_header(&self, rows: &RowSet) -> bool {
        rows.row(0)
            .map(|first| first.iter().any(|cell| self.is_header_label(cell)))
            .unwrap_or(false)
    }

    /// 去除首行表头噪声（至多一行，且总在位置 0）
    pub fn strip(&self, rows: RowSet) -> RowSet {
        if self.first_row_is_header(&rows) {
            info!(rows_before = rows.len(), "检测到表头噪声行，已删除首行");
            rows.without_first_row()
        } else {
            rows
        }
    }
}
