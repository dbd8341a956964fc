//! # 一维数据文件解析器
//!
//! 解析积分/变换产出的两列文本数据 (.chi, .gr, .dat)。
//!
//! ## 格式说明
//! ```text
//! # key = value        <- 头部元数据（可选，多行）
//! # 任意注释
//! x0 y0
//! x1 y1
//! ...
//! ```
//!
//! ## 依赖关系
//! - 被 `commands/` 和 `modeling/` 使用
//! - 使用 `models/curve.rs`
//! - 使用 `regex` 提取元数据键值对

use crate::error::{PairdistError, Result};
use crate::models::Curve;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// 解析后的数据句柄：曲线 + 头部元数据
#[derive(Debug, Clone)]
pub struct ParsedData {
    /// 两行式曲线（r/g 或 Q/I）
    pub curve: Curve,
    /// 头部 `# key = value` 元数据
    pub meta: HashMap<String, String>,
}

impl ParsedData {
    /// 从内存数组直接构造（合成数据、测试用）
    pub fn from_arrays(x: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        Ok(ParsedData {
            curve: Curve::new(x, y)?,
            meta: HashMap::new(),
        })
    }

    /// 读取元数据键
    pub fn meta_value(&self, key: &str) -> Option<&str> {
        self.meta.get(key).map(|s| s.as_str())
    }
}

/// 解析数据文件
pub fn parse_data_file(path: &Path) -> Result<ParsedData> {
    let content = fs::read_to_string(path).map_err(|e| PairdistError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_data_content(&content).map_err(|e| match e {
        PairdistError::ParseError { reason, .. } => PairdistError::ParseError {
            format: "data".to_string(),
            path: path.display().to_string(),
            reason,
        },
        other => other,
    })
}

/// 从字符串内容解析两列数据
pub fn parse_data_content(content: &str) -> Result<ParsedData> {
    let meta_re = Regex::new(r"^#\s*([A-Za-z_][\w.]*)\s*=\s*(.+?)\s*$").unwrap();

    let mut meta = HashMap::new();
    let mut x = Vec::new();
    let mut y = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with('#') {
            if let Some(caps) = meta_re.captures(line) {
                meta.insert(caps[1].to_string(), caps[2].to_string());
            }
            continue;
        }

        let mut parts = line.split_whitespace();
        let (Some(xs), Some(ys)) = (parts.next(), parts.next()) else {
            return Err(data_error(&format!("short data line '{}'", line)));
        };
        x.push(
            xs.parse::<f64>()
                .map_err(|_| data_error(&format!("invalid number '{}'", xs)))?,
        );
        y.push(
            ys.parse::<f64>()
                .map_err(|_| data_error(&format!("invalid number '{}'", ys)))?,
        );
    }

    if x.is_empty() {
        return Err(data_error("no data rows found"));
    }

    Ok(ParsedData {
        curve: Curve::new(x, y)?,
        meta,
    })
}

fn data_error(reason: &str) -> PairdistError {
    PairdistError::ParseError {
        format: "data".to_string(),
        path: String::new(),
        reason: reason.to_string(),
    }
}

/// 写出两列数据文件；meta 作为 `# key = value` 头部（按键排序）
pub fn write_data_file(path: &Path, curve: &Curve, meta: &[(&str, String)]) -> Result<()> {
    let mut content = String::new();
    for (key, value) in meta {
        content.push_str(&format!("# {} = {}\n", key, value));
    }
    for (x, y) in curve.x.iter().zip(curve.y.iter()) {
        content.push_str(&format!("{:.6} {:.8e}\n", x, y));
    }
    fs::write(path, content).map_err(|e| PairdistError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_data_with_metadata() {
        let content = "# qmax = 24.0\n# composition = Ni\n# plain comment\n0.0 1.0\n0.5 2.0\n1.0 3.0\n";
        let parsed = parse_data_content(content).unwrap();

        assert_eq!(parsed.meta_value("qmax"), Some("24.0"));
        assert_eq!(parsed.meta_value("composition"), Some("Ni"));
        assert_eq!(parsed.curve.len(), 3);
        assert!((parsed.curve.y[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_parse_empty_fails() {
        assert!(parse_data_content("# only = header\n").is_err());
    }

    #[test]
    fn test_parse_bad_number_fails() {
        assert!(parse_data_content("0.0 abc\n").is_err());
    }

    #[test]
    fn test_from_arrays() {
        let d = ParsedData::from_arrays(vec![0.0, 1.0], vec![2.0, 3.0]).unwrap();
        assert!(d.meta.is_empty());
        assert_eq!(d.curve.len(), 2);
    }

    #[test]
    fn test_write_then_parse_roundtrip() {
        let dir = std::env::temp_dir().join(format!("pairdist-data-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("out.gr");

        let curve = Curve::new(vec![1.0, 2.0, 3.0], vec![0.5, -0.25, 0.125]).unwrap();
        write_data_file(&path, &curve, &[("qmax", "24.0".to_string())]).unwrap();

        let parsed = parse_data_file(&path).unwrap();
        assert_eq!(parsed.meta_value("qmax"), Some("24.0"));
        assert_eq!(parsed.curve.len(), 3);
        for (a, b) in parsed.curve.y.iter().zip(curve.y.iter()) {
            assert!((a - b).abs() < 1e-9);
        }

        let _ = std::fs::remove_dir_all(&dir);
    }
}
