// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库、银行导出样例文件生成
// ==========================================

#![allow(dead_code)]

use std::error::Error;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// 残留表头行（标准 7 列）
pub const HEADER_LINE: &str =
    "Fecha Operación,Concepto,Fecha Valor,Importe,Saldo,Referencia 1,Referencia 2";

/// 创建临时测试数据库文件
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file
        .path()
        .to_str()
        .ok_or("临时文件路径不是 UTF-8")?
        .to_string();
    Ok((temp_file, db_path))
}

/// 写入一个银行导出文件：9 行说明区 + 给定数据行
pub fn write_bank_export(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "Banco de Ejemplo S.A.").unwrap();
    writeln!(file, "Extracto de movimientos").unwrap();
    writeln!(file, "Cuenta: ES00 0000 0000 0000 0000 0000").unwrap();
    writeln!(file, "Titular: Cliente de prueba").unwrap();
    for i in 4..9 {
        writeln!(file, "Linea informativa {}", i + 1).unwrap();
    }
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    path
}

/// 一月样例：4 条有效流水 + 1 条完全重复 + 1 条空金额
pub fn january_lines() -> Vec<&'static str> {
    vec![
        "02/01/2025,Nomina,02/01/2025,1500.00,2500.00,NOM01,",
        "03/01/2025,Mercadona,03/01/2025,-42.10,2457.90,,",
        "03/01/2025,Mercadona,03/01/2025,-42.10,2457.90,,",
        "05/01/2025,Netflix,05/01/2025,-15.99,2441.91,REC77,",
        "05/01/2025,Spotify,05/01/2025,-9.99,2431.92,REC78,",
        "07/01/2025,Comision mantenimiento,07/01/2025,,2431.92,,",
    ]
}

/// 二月样例：3 条有效流水
pub fn february_lines() -> Vec<&'static str> {
    vec![
        "01/02/2025,Mercadona,01/02/2025,-30.00,2401.92,,",
        "05/02/2025,Netflix,05/02/2025,-15.99,2385.93,REC77,",
        "05/02/2025,Spotify,05/02/2025,-9.99,2375.94,REC78,",
    ]
}
