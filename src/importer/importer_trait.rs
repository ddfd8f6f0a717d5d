// ==========================================
// 银行流水导入管道 - 导入组件 Trait
// ==========================================
// 职责: 定义文件解析 / 行集清洗接口（不包含实现）
// ==========================================

use crate::domain::{FieldValue, RowSet};
use crate::importer::error::{CleaningFailure, ImportResult};
use std::path::Path;
use tracing::error;

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件解析接口（阶段 1: 读取）
// 实现者: CsvParser, ExcelParser
pub trait FileParser: Send + Sync {
    /// 解析文件为原始行（按位置排列的单元格，不含表头）
    ///
    /// # 参数
    /// - file_path: 文件路径
    ///
    /// # 返回
    /// - Ok(Vec<Vec<FieldValue>>): 原始行，保持文件顺序
    /// - Err: 文件读取错误、格式错误
    fn parse_raw_rows(&self, file_path: &Path) -> ImportResult<Vec<Vec<FieldValue>>>;
}

// ==========================================
// DataCleaner Trait
// ==========================================
// 用途: 行集清洗接口（阶段 5: 表头噪声 / 无效行 / 空行）
// 实现者: RowSetCleaner
pub trait DataCleaner: Send + Sync {
    /// 清洗行集
    ///
    /// # 返回
    /// - Ok(RowSet): 清洗后的行集（行数 ≤ 输入行数）
    /// - Err(CleaningFailure): 清洗失败，输入不受影响
    fn clean(&self, rows: &RowSet) -> Result<RowSet, CleaningFailure>;

    /// 清洗行集，失败时记录错误并原样返回输入
    fn clean_or_original(&self, rows: RowSet) -> RowSet {
        match self.clean(&rows) {
            Ok(cleaned) => cleaned,
            Err(e) => {
                error!(error = %e, rows = rows.len(), "行集清洗失败，保留原始数据");
                rows
            }
        }
    }
}
