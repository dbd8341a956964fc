//! # 扩展 XYZ 格式解析器
//!
//! 解析带晶格信息的扩展 XYZ 结构文件。
//!
//! ## 格式说明
//! ```text
//! N
//! Lattice="ax ay az bx by bz cx cy cz" [其他 key=value]
//! Element x y z
//! ...
//! ```
//! 坐标为笛卡尔坐标 (Å)，内部转换为分数坐标。注释行缺少
//! Lattice 键时报错，因为 PDF 计算需要周期性晶格。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `models/structure.rs`
//! - 使用 `regex` 提取 Lattice 键

use crate::error::{PairdistError, Result};
use crate::models::{Atom, Crystal, Lattice};
use crate::parsers::cif::parse_error;
use regex::Regex;
use std::fs;
use std::path::Path;

/// 解析 .xyz 文件
pub fn parse_xyz_file(path: &Path) -> Result<Crystal> {
    let content = fs::read_to_string(path).map_err(|e| PairdistError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_xyz_content(
        &content,
        path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown"),
    )
    .map_err(|e| match e {
        PairdistError::ParseError { reason, .. } => PairdistError::ParseError {
            format: "XYZ".to_string(),
            path: path.display().to_string(),
            reason,
        },
        other => other,
    })
}

/// 从字符串内容解析扩展 XYZ 格式
pub fn parse_xyz_content(content: &str, default_name: &str) -> Result<Crystal> {
    let mut lines = content.lines();

    let count_line = lines.next().ok_or_else(|| parse_error("empty file"))?;
    let natoms: usize = count_line
        .trim()
        .parse()
        .map_err(|_| parse_error(&format!("invalid atom count '{}'", count_line.trim())))?;

    let comment = lines.next().ok_or_else(|| parse_error("missing comment line"))?;
    let lattice = parse_lattice_key(comment)?;

    // 反解分数坐标需要晶格矩阵的逆
    let inv = invert3(&lattice.matrix)
        .ok_or_else(|| parse_error("lattice matrix is singular"))?;

    let mut atoms = Vec::with_capacity(natoms);
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 {
            return Err(parse_error(&format!("short atom line '{}'", line)));
        }
        let cart = [
            parse_f64(parts[1])?,
            parse_f64(parts[2])?,
            parse_f64(parts[3])?,
        ];
        // 行向量约定: frac = cart · M⁻¹
        let frac = [
            cart[0] * inv[0][0] + cart[1] * inv[1][0] + cart[2] * inv[2][0],
            cart[0] * inv[0][1] + cart[1] * inv[1][1] + cart[2] * inv[2][1],
            cart[0] * inv[0][2] + cart[1] * inv[1][2] + cart[2] * inv[2][2],
        ];
        atoms.push(Atom::new(parts[0], frac));
        if atoms.len() == natoms {
            break;
        }
    }

    if atoms.len() != natoms {
        return Err(parse_error(&format!(
            "expected {} atoms, found {}",
            natoms,
            atoms.len()
        )));
    }

    let mut crystal = Crystal::new(default_name, lattice, atoms);
    crystal.source_format = Some("xyz".to_string());
    Ok(crystal)
}

/// 从注释行提取 Lattice="..." 键
fn parse_lattice_key(comment: &str) -> Result<Lattice> {
    let re = Regex::new(r#"Lattice="([^"]+)""#).unwrap();
    let caps = re
        .captures(comment)
        .ok_or_else(|| parse_error("comment line lacks Lattice=\"...\" key"))?;

    let values: Vec<f64> = caps[1]
        .split_whitespace()
        .map(parse_f64)
        .collect::<Result<_>>()?;
    if values.len() != 9 {
        return Err(parse_error(&format!(
            "Lattice key has {} values, expected 9",
            values.len()
        )));
    }

    Ok(Lattice::from_vectors([
        [values[0], values[1], values[2]],
        [values[3], values[4], values[5]],
        [values[6], values[7], values[8]],
    ]))
}

fn parse_f64(s: &str) -> Result<f64> {
    s.parse::<f64>()
        .map_err(|_| parse_error(&format!("invalid number '{}'", s)))
}

/// 3x3 矩阵求逆
fn invert3(m: &[[f64; 3]; 3]) -> Option<[[f64; 3]; 3]> {
    let det = m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0]);
    if det.abs() < 1e-12 {
        return None;
    }
    let inv_det = 1.0 / det;
    Some([
        [
            (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * inv_det,
            (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det,
            (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det,
        ],
        [
            (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv_det,
            (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det,
            (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det,
        ],
        [
            (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * inv_det,
            (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det,
            (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det,
        ],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUBIC_XYZ: &str = r#"2
Lattice="4.0 0.0 0.0 0.0 4.0 0.0 0.0 0.0 4.0" Properties=species:S:1:pos:R:3
Na 0.0 0.0 0.0
Cl 2.0 2.0 2.0
"#;

    #[test]
    fn test_parse_cubic_xyz() {
        let crystal = parse_xyz_content(CUBIC_XYZ, "nacl").unwrap();
        assert_eq!(crystal.name, "nacl");
        assert_eq!(crystal.atoms.len(), 2);

        // (2,2,2) 笛卡尔 -> (0.5,0.5,0.5) 分数
        let frac = crystal.atoms[1].position;
        assert!((frac[0] - 0.5).abs() < 1e-9);
        assert!((frac[1] - 0.5).abs() < 1e-9);
        assert!((frac[2] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_missing_lattice_fails() {
        let content = "1\nno lattice here\nNa 0.0 0.0 0.0\n";
        assert!(parse_xyz_content(content, "x").is_err());
    }

    #[test]
    fn test_atom_count_mismatch_fails() {
        let content = "3\nLattice=\"4 0 0 0 4 0 0 0 4\"\nNa 0.0 0.0 0.0\n";
        assert!(parse_xyz_content(content, "x").is_err());
    }

    #[test]
    fn test_invert3_identity() {
        let m = [[2.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 2.0]];
        let inv = invert3(&m).unwrap();
        assert!((inv[0][0] - 0.5).abs() < 1e-12);
        assert!((inv[1][1] - 0.5).abs() < 1e-12);
    }
}
