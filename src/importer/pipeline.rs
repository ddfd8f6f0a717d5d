// ==========================================
// 银行流水导入管道 - 管道驱动
// ==========================================
// 职责: 整合导入流程，从源目录到目标表
// 流程: 读取 → 去重 → 类型转换 → 去重 → 清洗 → 落库
// 约束: 文件按路径排序、顺序处理；任一文件出错即中止整个运行
// 事务: 每个文件一次批量插入（单事务），不跨文件
// ==========================================

use crate::config::{ConfigResult, PipelineConfig};
use crate::domain::{ColumnRef, ColumnSchema, FieldType, RowSet, CANONICAL_FIELD_TYPES};
use crate::importer::data_cleaner::RowSetCleaner;
use crate::importer::dedup::Deduplicator;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{SourceFormat, UniversalFileParser};
use crate::importer::importer_trait::DataCleaner;
use crate::importer::type_coercer::TypeCoercer;
use crate::perf::PerfGuard;
use crate::repository::{GastosTable, MovementStore, RepositoryError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, info_span};
use uuid::Uuid;

// ==========================================
// 错误类型
// ==========================================
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("源目录读取失败 ({dir}): {message}")]
    SourceDir { dir: String, message: String },

    #[error("文件处理失败 ({file}): {source}")]
    Import { file: String, source: ImportError },

    #[error("文件落库失败 ({file}): {source}")]
    Persistence { file: String, source: RepositoryError },

    #[error("目标表准备失败: {0}")]
    Setup(#[from] RepositoryError),
}

impl PipelineError {
    /// 出错文件（如有）
    pub fn file(&self) -> Option<&str> {
        match self {
            PipelineError::Import { file, .. } | PipelineError::Persistence { file, .. } => {
                Some(file.as_str())
            }
            _ => None,
        }
    }
}

// ==========================================
// 运行统计
// ==========================================

/// 单文件各阶段行数
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub file: String,
    pub loaded: usize,
    pub after_first_dedup: usize,
    pub after_second_dedup: usize,
    pub after_cleaning: usize,
    pub inserted: usize,
}

/// 一次运行的汇总
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    pub run_id: String,
    pub dry_run: bool,
    pub files: Vec<FileReport>,
}

impl PipelineReport {
    pub fn total_loaded(&self) -> usize {
        self.files.iter().map(|f| f.loaded).sum()
    }

    pub fn total_cleaned(&self) -> usize {
        self.files.iter().map(|f| f.after_cleaning).sum()
    }

    pub fn total_inserted(&self) -> usize {
        self.files.iter().map(|f| f.inserted).sum()
    }
}

/// 列出源目录中受支持的文件（不递归，按路径排序）
pub fn discover_files(source_dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let dir_error = |e: std::io::Error| PipelineError::SourceDir {
        dir: source_dir.display().to_string(),
        message: e.to_string(),
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(source_dir).map_err(dir_error)? {
        let path = entry.map_err(dir_error)?.path();
        if path.is_file() && SourceFormat::is_supported(&path) {
            files.push(path);
        } else {
            debug!(path = %path.display(), "跳过非数据文件");
        }
    }
    files.sort();

    info!(dir = %source_dir.display(), count = files.len(), "源目录扫描完成");
    Ok(files)
}

// ==========================================
// FileProcessor - 单文件处理（阶段 1-5，不落库）
// ==========================================
pub struct FileProcessor {
    parser: UniversalFileParser,
    coercer: TypeCoercer,
    deduplicator: Deduplicator,
    cleaner: Box<dyn DataCleaner>,
    coercion_plan: Vec<(ColumnRef, FieldType)>,
}

impl FileProcessor {
    /// 创建文件处理器
    ///
    /// # 参数
    /// - parser: 文件解析器（携带列结构）
    /// - cleaner: 行集清洗器
    ///
    /// 类型转换计划按列名生成，类型按位置取自固定类型表
    pub fn new(parser: UniversalFileParser, cleaner: Box<dyn DataCleaner>) -> Self {
        let coercion_plan = Self::coercion_plan(parser.schema());
        Self {
            parser,
            coercer: TypeCoercer,
            deduplicator: Deduplicator,
            cleaner,
            coercion_plan,
        }
    }

    /// 按配置创建
    pub fn from_config(config: &PipelineConfig) -> ConfigResult<Self> {
        let parser =
            UniversalFileParser::new(config.schema()?, config.skip_rows, config.delimiter_byte()?);
        let cleaner = RowSetCleaner::new(config.amount_column.as_str());
        Ok(Self::new(parser, Box::new(cleaner)))
    }

    fn coercion_plan(schema: &Arc<ColumnSchema>) -> Vec<(ColumnRef, FieldType)> {
        schema
            .labels()
            .zip(CANONICAL_FIELD_TYPES)
            .map(|(label, field_type)| (ColumnRef::from(label), field_type))
            .collect()
    }

    pub fn schema(&self) -> &Arc<ColumnSchema> {
        self.parser.schema()
    }

    /// 处理单个文件（读取 → 去重 → 转换 → 去重 → 清洗）
    ///
    /// # 返回
    /// - Ok((RowSet, FileReport)): 清洗后的行集与各阶段行数（inserted = 0）
    /// - Err: 读取 / 转换失败（致命）
    pub fn process(&self, path: &Path) -> ImportResult<(RowSet, FileReport)> {
        // === 步骤 1: 读取 ===
        let rows = self.parser.load(path)?;
        let loaded = rows.len();

        // === 步骤 2: 去重 ===
        let rows = self.deduplicator.dedupe(rows);
        let after_first_dedup = rows.len();

        // === 步骤 3: 类型转换 ===
        let mut rows = rows;
        for (column, field_type) in &self.coercion_plan {
            rows = self.coercer.coerce(rows, column, *field_type)?;
        }

        // === 步骤 4: 再次去重（转换后格式差异消失） ===
        let rows = self.deduplicator.dedupe(rows);
        let after_second_dedup = rows.len();

        // === 步骤 5: 清洗（失败时保留原数据） ===
        let rows = self.cleaner.clean_or_original(rows);
        let after_cleaning = rows.len();

        let report = FileReport {
            file: path.display().to_string(),
            loaded,
            after_first_dedup,
            after_second_dedup,
            after_cleaning,
            inserted: 0,
        };
        Ok((rows, report))
    }

    /// 读取并清洗单个文件（不做类型转换，供预览使用）
    pub fn load_and_clean(&self, path: &Path) -> ImportResult<RowSet> {
        let rows = self.parser.load(path)?;
        let rows = self.deduplicator.dedupe(rows);
        Ok(self.cleaner.clean_or_original(rows))
    }

    /// 读取并清洗目录下全部文件后合并（不落库，合并后再去重）
    pub fn load_and_clean_all(&self, source_dir: &Path) -> Result<RowSet, PipelineError> {
        let mut combined = RowSet::new(self.schema().clone());

        for path in discover_files(source_dir)? {
            let file = path.display().to_string();
            let rows = self.load_and_clean(&path).map_err(|source| PipelineError::Import {
                file: file.clone(),
                source,
            })?;
            combined = combined.concat(rows).map_err(|e| PipelineError::Import {
                file,
                source: e.into(),
            })?;
        }

        Ok(self.deduplicator.dedupe(combined))
    }
}

// ==========================================
// PipelineDriver - 管道驱动（阶段 1-6）
// ==========================================
pub struct PipelineDriver<'a, S>
where
    S: MovementStore + ?Sized,
{
    processor: FileProcessor,
    store: &'a S,
    table: GastosTable,
    dry_run: bool,
}

impl<'a, S> PipelineDriver<'a, S>
where
    S: MovementStore + ?Sized,
{
    pub fn new(processor: FileProcessor, store: &'a S, table: GastosTable) -> Self {
        Self {
            processor,
            store,
            table,
            dry_run: false,
        }
    }

    /// 试运行：执行全部阶段但不落库
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn table(&self) -> &GastosTable {
        &self.table
    }

    // 确保目标表存在并校验结构（试运行不建表）
    fn prepare_table(&self) -> Result<(), PipelineError> {
        if self.dry_run {
            if self.store.table_exists(self.table.name())? {
                self.table.verify(self.store)?;
            }
            return Ok(());
        }
        self.table.ensure(self.store)?;
        self.table.verify(self.store)?;
        Ok(())
    }

    /// 处理源目录下全部文件
    ///
    /// # 返回
    /// - Ok(PipelineReport): 各文件各阶段行数
    /// - Err(PipelineError): 首个出错文件（其后文件不再处理）
    pub fn run(&self, source_dir: &Path) -> Result<PipelineReport, PipelineError> {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("pipeline_run", run_id = %run_id);
        let _enter = span.enter();

        info!(
            source_dir = %source_dir.display(),
            table = %self.table.name(),
            dry_run = self.dry_run,
            "开始运行导入管道"
        );

        self.prepare_table()?;
        let files = discover_files(source_dir)?;

        let mut report = PipelineReport {
            run_id: run_id.clone(),
            dry_run: self.dry_run,
            files: Vec::with_capacity(files.len()),
        };

        for path in &files {
            let file_report = self.run_file(path).map_err(|e| {
                error!(error = %e, "管道运行中止");
                e
            })?;
            report.files.push(file_report);
        }

        info!(
            files = report.files.len(),
            loaded = report.total_loaded(),
            cleaned = report.total_cleaned(),
            inserted = report.total_inserted(),
            "导入管道运行完成"
        );
        Ok(report)
    }

    fn run_file(&self, path: &Path) -> Result<FileReport, PipelineError> {
        let file = path.display().to_string();
        let _perf = PerfGuard::new(format!("ingest:{}", file));
        info!(file = %file, "开始处理文件");

        let (rows, mut file_report) =
            self.processor
                .process(path)
                .map_err(|source| PipelineError::Import {
                    file: file.clone(),
                    source,
                })?;

        // === 步骤 6: 落库 ===
        if !self.dry_run {
            file_report.inserted =
                self.table
                    .insert_rows(self.store, &rows)
                    .map_err(|source| PipelineError::Persistence {
                        file: file.clone(),
                        source,
                    })?;
        }

        info!(
            file = %file,
            loaded = file_report.loaded,
            cleaned = file_report.after_cleaning,
            inserted = file_report.inserted,
            "文件处理完成"
        );
        Ok(file_report)
    }
}
