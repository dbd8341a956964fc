//! # 配方构建器
//!
//! 把调用方给出的结构、特征函数和方程一次性装配成
//! 单贡献、零变量的配方。
//!
//! ## 依赖关系
//! - 被 `commands/fit.rs` 使用
//! - 使用 `modeling/config.rs`, `modeling/recipe.rs`

use std::sync::Arc;

use crate::error::Result;
use crate::models::Crystal;
use crate::modeling::config::{Characteristic, ConConfig, FitRange, FunConfig, GenConfig};
use crate::modeling::recipe::{make_recipe, Recipe};
use crate::parsers::ParsedData;

/// 构建单贡献配方
///
/// - `name`: 贡献名，非空
/// - `data`: 数据源（r/g 曲线与元数据）
/// - `arange`: (rmin, rmax, rstep)
/// - `equation`: 贡献方程，符号引用 `functions` 与 `structures` 的键
/// - `functions`: 方程符号 -> 特征函数声明
/// - `structures`: 方程符号 -> 晶体结构
/// - `ncpu`: 生成器并行线程数提示，逐个传给每个 GenConfig
///
/// 返回的配方含恰好一个贡献、零个变量。配置不自洽（方程引用
/// 未定义符号、范围非法等）在进入装配之前报错。
pub fn create(
    name: &str,
    data: ParsedData,
    arange: FitRange,
    equation: &str,
    functions: Vec<(&str, Characteristic)>,
    structures: Vec<(&str, Arc<Crystal>)>,
    ncpu: Option<usize>,
) -> Result<Recipe> {
    let genconfigs = structures
        .into_iter()
        .map(|(symbol, structure)| GenConfig::new(symbol, structure, ncpu))
        .collect::<Result<Vec<_>>>()?;

    let funconfigs = functions
        .into_iter()
        .map(|(symbol, characteristic)| FunConfig::new(symbol, characteristic))
        .collect::<Result<Vec<_>>>()?;

    let conconfig = ConConfig::new(name, equation, data, arange, genconfigs, funconfigs)?;
    make_recipe(conconfig)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Atom, Lattice};
    use crate::modeling::shapes::sphere_cf;

    fn ni_structure() -> Arc<Crystal> {
        let a = 3.524;
        let lattice = Lattice::from_parameters(a, a, a, 90.0, 90.0, 90.0);
        Arc::new(Crystal::new(
            "Ni",
            lattice,
            vec![
                Atom::new("Ni", [0.0, 0.0, 0.0]),
                Atom::new("Ni", [0.5, 0.5, 0.0]),
                Atom::new("Ni", [0.5, 0.0, 0.5]),
                Atom::new("Ni", [0.0, 0.5, 0.5]),
            ],
        ))
    }

    fn synthetic_data() -> ParsedData {
        // 1800 点合成 r/g 数组
        let x: Vec<f64> = (0..1800).map(|i| 0.5 + i as f64 * 0.011).collect();
        let y: Vec<f64> = x.iter().map(|r| (r * 1.5).sin() / r.max(0.1)).collect();
        ParsedData::from_arrays(x, y).unwrap()
    }

    #[test]
    fn test_create_single_contribution_named_as_given() {
        let recipe = create(
            "nickel",
            synthetic_data(),
            (2.0, 20.0, 0.01),
            "ni",
            vec![],
            vec![("ni", ni_structure())],
            None,
        )
        .unwrap();

        assert_eq!(recipe.contributions().len(), 1);
        assert_eq!(recipe.contributions()[0].name, "nickel");
        assert!(recipe.variables().is_empty());
    }

    #[test]
    fn test_create_empty_maps_with_symbol_fails() {
        let result = create(
            "nickel",
            synthetic_data(),
            (2.0, 18.0, 0.01),
            "ni",
            vec![],
            vec![],
            None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_create_bad_range_rejected_before_assembly() {
        let result = create(
            "nickel",
            synthetic_data(),
            (18.0, 2.0, 0.01),
            "ni",
            vec![],
            vec![("ni", ni_structure())],
            None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_create_with_function_and_structure() {
        let recipe = create(
            "nano",
            synthetic_data(),
            (2.0, 15.0, 0.02),
            "sphere * ni",
            vec![("sphere", Characteristic::new(sphere_cf, &[("psize", 60.0)]))],
            vec![("ni", ni_structure())],
            Some(2),
        )
        .unwrap();

        let con = &recipe.contributions()[0];
        assert_eq!(con.name, "nano");
        assert_eq!(con.eq, "sphere * ni");
    }
}
