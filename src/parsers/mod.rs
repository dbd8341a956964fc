//! # 解析器模块
//!
//! 提供晶体结构文件和一维数据文件的解析器。
//!
//! ## 依赖关系
//! - 被 `commands/` 和 `modeling/` 使用
//! - 使用 `models/` 数据模型
//! - 子模块: cif, xyz, data

pub mod cif;
pub mod data;
pub mod xyz;

use crate::error::{PairdistError, Result};
use crate::models::Crystal;
use std::path::Path;

pub use data::ParsedData;

/// 从文件路径推断格式并解析晶体结构
pub fn parse_structure_file(path: &Path) -> Result<Crystal> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "cif" => cif::parse_cif_file(path),
        "xyz" => xyz::parse_xyz_file(path),
        _ => Err(PairdistError::UnsupportedFormat(format!(
            "Cannot determine structure format for: {}",
            path.display()
        ))),
    }
}
