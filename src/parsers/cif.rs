//! # CIF 格式解析器
//!
//! 解析晶体学信息文件 (CIF) 的常用子集。
//!
//! ## 支持的标签
//! ```text
//! _cell_length_a / _b / _c
//! _cell_angle_alpha / _beta / _gamma
//! _symmetry_space_group_name_H-M (可选)
//! loop_ 中的 _atom_site_label, _atom_site_type_symbol,
//! _atom_site_fract_x/y/z, _atom_site_occupancy,
//! _atom_site_U_iso_or_equiv / _atom_site_B_iso_or_equiv
//! ```
//! 对称操作展开不在支持范围内，CIF 需给出完整原子列表（P1 设置）。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `models/structure.rs`

use crate::error::{PairdistError, Result};
use crate::models::{Atom, Crystal, Lattice};
use std::f64::consts::PI;
use std::fs;
use std::path::Path;

/// 解析 .cif 文件
pub fn parse_cif_file(path: &Path) -> Result<Crystal> {
    let content = fs::read_to_string(path).map_err(|e| PairdistError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_cif_content(
        &content,
        path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown"),
    )
    .map_err(|e| match e {
        PairdistError::ParseError { reason, .. } => PairdistError::ParseError {
            format: "CIF".to_string(),
            path: path.display().to_string(),
            reason,
        },
        other => other,
    })
}

/// 从字符串内容解析 CIF 格式
pub fn parse_cif_content(content: &str, default_name: &str) -> Result<Crystal> {
    let mut name = default_name.to_string();
    let mut cell = [0.0_f64; 6];
    let mut have_cell = [false; 6];
    let mut space_group: Option<String> = None;
    let mut atoms: Vec<Atom> = Vec::new();

    let lines: Vec<&str> = content.lines().collect();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].trim();
        if line.is_empty() || line.starts_with('#') {
            i += 1;
            continue;
        }

        if let Some(stripped) = line.strip_prefix("data_") {
            if !stripped.is_empty() {
                name = stripped.to_string();
            }
            i += 1;
            continue;
        }

        // 晶胞参数标签
        if let Some((tag, value)) = split_tag_line(line) {
            let slot = match tag {
                "_cell_length_a" => Some(0),
                "_cell_length_b" => Some(1),
                "_cell_length_c" => Some(2),
                "_cell_angle_alpha" => Some(3),
                "_cell_angle_beta" => Some(4),
                "_cell_angle_gamma" => Some(5),
                _ => None,
            };
            if let Some(s) = slot {
                cell[s] = parse_cif_number(value)?;
                have_cell[s] = true;
                i += 1;
                continue;
            }
            if tag == "_symmetry_space_group_name_H-M"
                || tag == "_space_group_name_H-M_alt"
            {
                space_group = Some(value.trim_matches(['\'', '"']).to_string());
                i += 1;
                continue;
            }
            i += 1;
            continue;
        }

        // 原子位点 loop_
        if line.eq_ignore_ascii_case("loop_") {
            let (consumed, parsed) = parse_loop(&lines[i + 1..])?;
            if let Some(loop_atoms) = parsed {
                atoms = loop_atoms;
            }
            i += 1 + consumed;
            continue;
        }

        i += 1;
    }

    if !have_cell.iter().all(|&b| b) {
        return Err(parse_error("missing cell parameters"));
    }
    if atoms.is_empty() {
        return Err(parse_error("no atom sites found"));
    }

    let lattice = Lattice::from_parameters(cell[0], cell[1], cell[2], cell[3], cell[4], cell[5]);
    let mut crystal = Crystal::new(name, lattice, atoms);
    crystal.space_group = space_group;
    crystal.source_format = Some("cif".to_string());
    Ok(crystal)
}

/// 解析一个 loop_ 块；若不是原子位点 loop 则返回 (跳过的行数, None)
fn parse_loop(lines: &[&str]) -> Result<(usize, Option<Vec<Atom>>)> {
    // 收集列头
    let mut headers: Vec<String> = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i].trim();
        if line.starts_with('_') {
            headers.push(line.split_whitespace().next().unwrap_or("").to_string());
            i += 1;
        } else {
            break;
        }
    }

    let is_atom_loop = headers.iter().any(|h| h.starts_with("_atom_site_fract"));
    if !is_atom_loop {
        // 跳过该 loop 的数据行
        while i < lines.len() {
            let line = lines[i].trim();
            if line.is_empty() || line.starts_with('_') || line.eq_ignore_ascii_case("loop_") {
                break;
            }
            i += 1;
        }
        return Ok((i, None));
    }

    let col = |tag: &str| headers.iter().position(|h| h == tag);
    let col_label = col("_atom_site_label");
    let col_symbol = col("_atom_site_type_symbol");
    let col_x = col("_atom_site_fract_x").ok_or_else(|| parse_error("missing _atom_site_fract_x"))?;
    let col_y = col("_atom_site_fract_y").ok_or_else(|| parse_error("missing _atom_site_fract_y"))?;
    let col_z = col("_atom_site_fract_z").ok_or_else(|| parse_error("missing _atom_site_fract_z"))?;
    let col_occ = col("_atom_site_occupancy");
    let col_uiso = col("_atom_site_U_iso_or_equiv");
    let col_biso = col("_atom_site_B_iso_or_equiv");

    let mut atoms = Vec::new();
    while i < lines.len() {
        let line = lines[i].trim();
        if line.is_empty() || line.starts_with('_') || line.starts_with('#')
            || line.eq_ignore_ascii_case("loop_") || line.starts_with("data_")
        {
            break;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < headers.len() {
            return Err(parse_error(&format!(
                "atom site row has {} fields, expected {}",
                fields.len(),
                headers.len()
            )));
        }

        let element = match (col_symbol, col_label) {
            (Some(c), _) => strip_site_digits(fields[c]),
            (None, Some(c)) => strip_site_digits(fields[c]),
            (None, None) => return Err(parse_error("atom loop lacks both label and type_symbol")),
        };

        let mut atom = Atom::new(
            element,
            [
                parse_cif_number(fields[col_x])?,
                parse_cif_number(fields[col_y])?,
                parse_cif_number(fields[col_z])?,
            ],
        );
        if let Some(c) = col_occ {
            atom = atom.with_occupancy(parse_cif_number(fields[c])?);
        }
        if let Some(c) = col_uiso {
            atom = atom.with_uiso(parse_cif_number(fields[c])?);
        } else if let Some(c) = col_biso {
            // B = 8π² U
            atom = atom.with_uiso(parse_cif_number(fields[c])? / (8.0 * PI * PI));
        }
        if let Some(c) = col_label {
            atom = atom.with_label(fields[c]);
        }
        atoms.push(atom);
        i += 1;
    }

    Ok((i, Some(atoms)))
}

/// 拆分 "_tag value" 行；无值或非标签行返回 None
fn split_tag_line(line: &str) -> Option<(&str, &str)> {
    if !line.starts_with('_') {
        return None;
    }
    let mut parts = line.splitn(2, char::is_whitespace);
    let tag = parts.next()?;
    let value = parts.next()?.trim();
    if value.is_empty() {
        return None;
    }
    Some((tag, value))
}

/// 解析 CIF 数值，容忍 "3.524(2)" 形式的不确定度括号
fn parse_cif_number(field: &str) -> Result<f64> {
    let cleaned = match field.find('(') {
        Some(pos) => &field[..pos],
        None => field,
    };
    cleaned
        .parse::<f64>()
        .map_err(|_| parse_error(&format!("invalid number '{}'", field)))
}

/// 去掉位点名里的数字后缀: "Ni1" -> "Ni"
fn strip_site_digits(label: &str) -> String {
    label
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect()
}

pub(crate) fn parse_error(reason: &str) -> PairdistError {
    PairdistError::ParseError {
        format: "CIF".to_string(),
        path: String::new(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NI_CIF: &str = r#"
data_Ni
_cell_length_a 3.524
_cell_length_b 3.524
_cell_length_c 3.524
_cell_angle_alpha 90.0
_cell_angle_beta 90.0
_cell_angle_gamma 90.0
_symmetry_space_group_name_H-M 'F m -3 m'
loop_
_atom_site_label
_atom_site_type_symbol
_atom_site_fract_x
_atom_site_fract_y
_atom_site_fract_z
_atom_site_occupancy
_atom_site_U_iso_or_equiv
Ni1 Ni 0.0 0.0 0.0 1.0 0.005
Ni2 Ni 0.5 0.5 0.0 1.0 0.005
Ni3 Ni 0.5 0.0 0.5 1.0 0.005
Ni4 Ni 0.0 0.5 0.5 1.0 0.005
"#;

    #[test]
    fn test_parse_ni_cif() {
        let crystal = parse_cif_content(NI_CIF, "fallback").unwrap();
        assert_eq!(crystal.name, "Ni");
        assert_eq!(crystal.atoms.len(), 4);
        assert_eq!(crystal.space_group.as_deref(), Some("F m -3 m"));

        let (a, _, _, _, _, _) = crystal.lattice.parameters();
        assert!((a - 3.524).abs() < 1e-9);
        assert!((crystal.atoms[1].position[0] - 0.5).abs() < 1e-12);
        assert!((crystal.atoms[0].uiso - 0.005).abs() < 1e-12);
    }

    #[test]
    fn test_parse_number_with_esd() {
        assert!((parse_cif_number("3.524(2)").unwrap() - 3.524).abs() < 1e-12);
    }

    #[test]
    fn test_missing_cell_fails() {
        let content = "data_x\nloop_\n_atom_site_fract_x\n_atom_site_fract_y\n_atom_site_fract_z\n0 0 0\n";
        assert!(parse_cif_content(content, "x").is_err());
    }

    #[test]
    fn test_biso_converted_to_uiso() {
        let content = r#"
data_b
_cell_length_a 4.0
_cell_length_b 4.0
_cell_length_c 4.0
_cell_angle_alpha 90
_cell_angle_beta 90
_cell_angle_gamma 90
loop_
_atom_site_label
_atom_site_fract_x
_atom_site_fract_y
_atom_site_fract_z
_atom_site_B_iso_or_equiv
Fe1 0.0 0.0 0.0 0.5
"#;
        let crystal = parse_cif_content(content, "b").unwrap();
        let expected = 0.5 / (8.0 * std::f64::consts::PI * std::f64::consts::PI);
        assert!((crystal.atoms[0].uiso - expected).abs() < 1e-12);
        assert_eq!(crystal.atoms[0].element, "Fe");
    }
}
