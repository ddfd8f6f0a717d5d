// ==========================================
// 银行流水导入管道 - 文件解析器实现
// ==========================================
// 支持: 分隔文本 (.csv/.txt) / Excel (.xlsx/.xls)
// 约定: 无表头，列结构按位置套用
// ==========================================

use crate::domain::{ColumnSchema, FieldValue, RowSet};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::importer_trait::FileParser;
use calamine::{open_workbook_auto, Data, DataType, Reader};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// 导出文件固定前导行数（银行导出的说明区）
pub const DEFAULT_SKIP_ROWS: usize = 9;

/// 默认分隔符
pub const DEFAULT_DELIMITER: u8 = b',';

// ==========================================
// 源文件格式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Delimited,   // .csv / .txt
    Spreadsheet, // .xls / .xlsx
}

impl SourceFormat {
    /// 根据扩展名推断格式（忽略大小写）
    pub fn from_path(path: &Path) -> ImportResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" | "txt" => Ok(SourceFormat::Delimited),
            "xlsx" | "xls" => Ok(SourceFormat::Spreadsheet),
            _ => Err(ImportError::UnsupportedFormat(path.display().to_string())),
        }
    }

    pub fn is_supported(path: &Path) -> bool {
        Self::from_path(path).is_ok()
    }
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser {
    skip_rows: usize,
    delimiter: u8,
}

impl CsvParser {
    pub fn new(skip_rows: usize, delimiter: u8) -> Self {
        Self {
            skip_rows,
            delimiter,
        }
    }
}

impl Default for CsvParser {
    fn default() -> Self {
        Self::new(DEFAULT_SKIP_ROWS, DEFAULT_DELIMITER)
    }
}

impl FileParser for CsvParser {
    fn parse_raw_rows(&self, file_path: &Path) -> ImportResult<Vec<Vec<FieldValue>>> {
        let file = File::open(file_path)?;
        let mut reader = BufReader::new(file);

        // 跳过前导说明区（按物理行）
        let mut line = Vec::new();
        for _ in 0..self.skip_rows {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }
        }

        let mut csv_reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 允许行长度不一致
            .delimiter(self.delimiter)
            .from_reader(reader);

        let mut rows = Vec::new();
        for result in csv_reader.byte_records() {
            let record = result?;

            // 跳过物理空行
            if record.len() <= 1 && record.iter().all(|f| f.is_empty()) {
                continue;
            }

            // 银行导出常见非 UTF-8 字节，按有损解码处理
            let row: Vec<FieldValue> = record
                .iter()
                .map(|raw| FieldValue::from_raw_text(&String::from_utf8_lossy(raw)))
                .collect();
            rows.push(row);
        }

        Ok(rows)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl ExcelParser {
    // 保留 Excel 原生类型，日期单元格转为时间戳
    fn cell_to_field(cell: &Data) -> FieldValue {
        match cell {
            Data::Empty | Data::Error(_) => FieldValue::Empty,
            Data::String(s) => FieldValue::from_raw_text(s),
            Data::Int(i) => FieldValue::Int(*i),
            Data::Float(f) => FieldValue::Float(*f),
            Data::Bool(b) => FieldValue::Bool(*b),
            other => other
                .as_datetime()
                .map(FieldValue::Timestamp)
                .unwrap_or_else(|| FieldValue::from_raw_text(&other.to_string())),
        }
    }
}

impl FileParser for ExcelParser {
    fn parse_raw_rows(&self, file_path: &Path) -> ImportResult<Vec<Vec<FieldValue>>> {
        let mut workbook = open_workbook_auto(file_path)?;

        // 读取第一个 sheet
        let sheet_names = workbook.sheet_names();
        let sheet_name = sheet_names
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;

        let range = workbook.worksheet_range(&sheet_name)?;
        debug!(sheet = %sheet_name, "读取工作表");

        let rows = range
            .rows()
            .map(|data_row| data_row.iter().map(Self::cell_to_field).collect())
            .collect();

        Ok(rows)
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser {
    schema: Arc<ColumnSchema>,
    csv_parser: CsvParser,
    excel_parser: ExcelParser,
}

impl UniversalFileParser {
    pub fn new(schema: Arc<ColumnSchema>, skip_rows: usize, delimiter: u8) -> Self {
        Self {
            schema,
            csv_parser: CsvParser::new(skip_rows, delimiter),
            excel_parser: ExcelParser,
        }
    }

    pub fn schema(&self) -> &Arc<ColumnSchema> {
        &self.schema
    }

    /// 读取文件为行集（列结构按位置套用）
    ///
    /// # 返回
    /// - Ok(RowSet): 保持原始行顺序
    /// - Err: 扩展名不支持 / 文件不存在 / 解析失败 / 列数不匹配
    pub fn load<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<RowSet> {
        let path = file_path.as_ref();
        let format = SourceFormat::from_path(path)?;

        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        info!(file = %path.display(), format = ?format, "开始读取文件");

        let raw_rows = match format {
            SourceFormat::Delimited => self.csv_parser.parse_raw_rows(path)?,
            SourceFormat::Spreadsheet => self.excel_parser.parse_raw_rows(path)?,
        };

        let rows = self.apply_schema(path, raw_rows)?;
        info!(file = %path.display(), rows = rows.len(), "文件读取完成");
        Ok(rows)
    }

    // 表宽 = 最宽行；短行补 Empty；表宽必须等于列数
    fn apply_schema(&self, path: &Path, raw_rows: Vec<Vec<FieldValue>>) -> ImportResult<RowSet> {
        let expected = self.schema.len();
        let width = raw_rows.iter().map(Vec::len).max().unwrap_or(expected);
        if width != expected {
            return Err(ImportError::ColumnCountMismatch {
                file: path.display().to_string(),
                expected,
                actual: width,
            });
        }

        let rows = raw_rows
            .into_iter()
            .map(|mut row| {
                row.resize(expected, FieldValue::Empty);
                row
            })
            .collect();

        Ok(RowSet::from_rows(self.schema.clone(), rows)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn preamble(file: &mut impl Write) {
        for i in 0..DEFAULT_SKIP_ROWS {
            writeln!(file, "Cabecera del extracto línea {}", i + 1).unwrap();
        }
    }

    fn csv_file(suffix: &str) -> tempfile::NamedTempFile {
        Builder::new().suffix(suffix).tempfile().unwrap()
    }

    #[test]
    fn test_source_format_from_extension() {
        assert_eq!(
            SourceFormat::from_path(Path::new("mayo.csv")).unwrap(),
            SourceFormat::Delimited
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("mayo.TXT")).unwrap(),
            SourceFormat::Delimited
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("mayo.xlsx")).unwrap(),
            SourceFormat::Spreadsheet
        );
        assert!(matches!(
            SourceFormat::from_path(Path::new("mayo.pdf")),
            Err(ImportError::UnsupportedFormat(_))
        ));
        assert!(!SourceFormat::is_supported(Path::new("sin_extension")));
    }

    #[test]
    fn test_csv_parser_skips_preamble() {
        let mut temp_file = csv_file(".csv");
        preamble(&mut temp_file);
        writeln!(temp_file, "20/01/2025,Netflix,20/01/2025,-15.99,1500.00,R1,R2").unwrap();
        writeln!(temp_file, "21/01/2025,Spotify,21/01/2025,-9.99,1490.01,R3,").unwrap();

        let rows = CsvParser::default().parse_raw_rows(temp_file.path()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][1], FieldValue::Text("Netflix".to_string()));
        assert_eq!(rows[1][6], FieldValue::Empty);
    }

    #[test]
    fn test_csv_parser_handles_quoted_thousands() {
        let mut temp_file = csv_file(".csv");
        writeln!(temp_file, "01/02/2025,\"Nómina, febrero\",01/02/2025,\"1,234.56\",\"3,000.00\",,").unwrap();

        let rows = CsvParser::new(0, b',').parse_raw_rows(temp_file.path()).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][1], FieldValue::Text("Nómina, febrero".to_string()));
        assert_eq!(rows[0][3], FieldValue::Text("1,234.56".to_string()));
    }

    #[test]
    fn test_load_applies_schema_positionally() {
        let mut temp_file = csv_file(".txt");
        preamble(&mut temp_file);
        writeln!(temp_file, "20/01/2025,Netflix,20/01/2025,-15.99,1500.00,R1,R2").unwrap();
        // 短行补齐
        writeln!(temp_file, "21/01/2025,Spotify,21/01/2025,-9.99,1490.01").unwrap();

        let parser = UniversalFileParser::new(
            Arc::new(ColumnSchema::canonical()),
            DEFAULT_SKIP_ROWS,
            DEFAULT_DELIMITER,
        );
        let rows = parser.load(temp_file.path()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows.schema().len(), 7);
        assert_eq!(rows.row(1).unwrap()[5], FieldValue::Empty);
        assert_eq!(rows.row(1).unwrap()[6], FieldValue::Empty);
    }

    #[test]
    fn test_load_rejects_wrong_width() {
        let mut temp_file = csv_file(".csv");
        writeln!(temp_file, "a,b,c,d,e,f,g,h").unwrap();

        let parser = UniversalFileParser::new(Arc::new(ColumnSchema::canonical()), 0, b',');
        let result = parser.load(temp_file.path());

        assert!(matches!(
            result,
            Err(ImportError::ColumnCountMismatch {
                expected: 7,
                actual: 8,
                ..
            })
        ));
    }

    #[test]
    fn test_load_missing_and_unsupported() {
        let parser = UniversalFileParser::new(Arc::new(ColumnSchema::canonical()), 9, b',');
        assert!(matches!(
            parser.load("no_existe.csv"),
            Err(ImportError::FileNotFound(_))
        ));
        assert!(matches!(
            parser.load("extracto.pdf"),
            Err(ImportError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_load_empty_file_yields_empty_row_set() {
        let temp_file = csv_file(".csv");
        let parser = UniversalFileParser::new(Arc::new(ColumnSchema::canonical()), 9, b',');
        let rows = parser.load(temp_file.path()).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_excel_cell_to_field_keeps_native_types() {
        use calamine::{CellErrorType, ExcelDateTime, ExcelDateTimeType};

        assert_eq!(ExcelParser::cell_to_field(&Data::Empty), FieldValue::Empty);
        assert_eq!(
            ExcelParser::cell_to_field(&Data::Error(CellErrorType::Div0)),
            FieldValue::Empty
        );
        assert_eq!(
            ExcelParser::cell_to_field(&Data::String("  Netflix ".to_string())),
            FieldValue::Text("Netflix".to_string())
        );
        assert_eq!(
            ExcelParser::cell_to_field(&Data::String("   ".to_string())),
            FieldValue::Empty
        );
        assert_eq!(
            ExcelParser::cell_to_field(&Data::Float(-15.99)),
            FieldValue::Float(-15.99)
        );
        assert_eq!(ExcelParser::cell_to_field(&Data::Int(3)), FieldValue::Int(3));
        assert_eq!(
            ExcelParser::cell_to_field(&Data::Bool(true)),
            FieldValue::Bool(true)
        );

        // 序列号 45658.5 = 2025-01-01 12:00
        let cell = Data::DateTime(ExcelDateTime::new(45658.5, ExcelDateTimeType::DateTime, false));
        let expected = chrono::NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(ExcelParser::cell_to_field(&cell), FieldValue::Timestamp(expected));
    }
}
