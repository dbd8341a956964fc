//! # 配方级拟合操作
//!
//! 多相组合、优化驱动与标样校准：每个操作都是对装配例程和
//! 求解器的薄层编排，入口处做输入校验。
//!
//! ## 依赖关系
//! - 被 `commands/fit.rs`, `commands/calib.rs` 使用
//! - 使用 `modeling/recipe.rs`, `modeling/solver.rs`, `modeling/adding.rs`

use std::sync::Arc;

use crate::error::{PairdistError, Result};
use crate::models::Crystal;
use crate::modeling::adding::add_gen_vars;
use crate::modeling::config::{ConConfig, FitRange, GenConfig};
use crate::modeling::recipe::{make_contribution, Recipe, VarSpec};
use crate::modeling::solver::{levenberg_marquardt, SolverOptions, SolverStatus};
use crate::parsers::ParsedData;

/// 一次优化的结果摘要
#[derive(Debug, Clone)]
pub struct FitResult {
    /// 求解器终止状态（原样上报）
    pub status: SolverStatus,
    /// 最终代价 0.5 Σ r²
    pub cost: f64,
    /// 加权剩余因子 Rw
    pub rw: f64,
    /// 迭代次数
    pub iterations: usize,
}

/// 把多份贡献配置组合成共享目标的多相配方
///
/// 贡献名冲突时报错；返回的配方不含任何变量。
pub fn multi_phase(configs: Vec<ConConfig>) -> Result<Recipe> {
    if configs.is_empty() {
        return Err(PairdistError::Configuration(
            "multi_phase needs at least one contribution config".to_string(),
        ));
    }
    for (i, a) in configs.iter().enumerate() {
        for b in configs.iter().skip(i + 1) {
            if a.name == b.name {
                return Err(PairdistError::Configuration(format!(
                    "contribution name '{}' is used twice",
                    a.name
                )));
            }
        }
    }

    let mut contributions = Vec::with_capacity(configs.len());
    for config in configs {
        contributions.push(make_contribution(config)?);
    }
    Ok(Recipe {
        contributions,
        variables: Vec::new(),
    })
}

/// 驱动求解器优化配方的自由变量
///
/// 原位更新变量值与不确定度；不收敛不重试，终止状态随结果返回。
pub fn optimize(recipe: &mut Recipe, options: &SolverOptions) -> Result<FitResult> {
    let free = recipe.free_variables();
    if free.is_empty() {
        return Err(PairdistError::Configuration(
            "recipe has no free variables to optimize".to_string(),
        ));
    }

    let p0: Vec<f64> = free.iter().map(|(_, v)| *v).collect();
    let bounds: Vec<(f64, f64)> = free
        .iter()
        .map(|(name, _)| {
            recipe
                .get_bounds(name)
                .unwrap_or((f64::NEG_INFINITY, f64::INFINITY))
        })
        .collect();

    let outcome = {
        let mut eval = |p: &[f64]| -> Result<Vec<f64>> {
            recipe.set_free_values(p);
            recipe.residuals()
        };
        levenberg_marquardt(&mut eval, &p0, &bounds, options)?
    };

    recipe.set_free_values(&outcome.params);

    // 不确定度写回自由变量
    let free_names: Vec<String> = free.into_iter().map(|(name, _)| name).collect();
    for (idx, name) in free_names.iter().enumerate() {
        if let Some(var) = recipe.variable_mut(name) {
            var.uncertainty = outcome
                .stderr
                .as_ref()
                .and_then(|s| s.get(idx).copied());
        }
    }

    let rw = weighted_residual(recipe)?;

    Ok(FitResult {
        status: outcome.status,
        cost: outcome.cost,
        rw,
        iterations: outcome.iterations,
    })
}

/// 仪器校准拟合：对标样结构精修 scale/lat/uiso/qdamp/qbroad
pub fn fit_calib(
    structure: Arc<Crystal>,
    data: ParsedData,
    arange: FitRange,
    ncpu: Option<usize>,
) -> Result<(Recipe, FitResult)> {
    let symbol = "calib";
    let gen = GenConfig::new(symbol, structure, ncpu)?;
    let config = ConConfig::new("calibration", symbol, data, arange, vec![gen], vec![])?;
    let mut recipe = Recipe {
        contributions: vec![make_contribution(config)?],
        variables: Vec::new(),
    };

    add_gen_vars(
        &mut recipe,
        "calibration",
        symbol,
        &[
            ("scale", VarSpec::Free),
            ("lat", VarSpec::Free),
            ("uiso", VarSpec::Free),
            ("qdamp", VarSpec::Free),
            ("qbroad", VarSpec::Free),
        ],
    )?;
    // qdamp/qbroad 从 0 出发梯度为零，给非零起点
    recipe.set_values(&[("qdamp", 0.04), ("qbroad", 0.01)])?;
    recipe.set_bounds("qdamp", 0.0, 0.5)?;
    recipe.set_bounds("qbroad", 0.0, 0.5)?;
    recipe.set_bounds("uiso", 1e-4, 0.1)?;

    let result = optimize(&mut recipe, &SolverOptions::default())?;
    Ok((recipe, result))
}

/// 加权剩余因子 Rw = sqrt(Σ(gcalc-gobs)² / Σ gobs²)
fn weighted_residual(recipe: &Recipe) -> Result<f64> {
    let mut num = 0.0;
    let mut den = 0.0;
    for con in recipe.contributions() {
        let res = con.residuals()?;
        num += res.iter().map(|v| v * v).sum::<f64>();
        den += con.observed().iter().map(|v| v * v).sum::<f64>();
    }
    if den <= 0.0 {
        return Ok(f64::NAN);
    }
    Ok((num / den).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Atom, Lattice};
    use crate::modeling::generator::PdfGenerator;

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

    /// 用生成器本身在给定 lat 下合成观测数据
    fn synthetic_data(lat: f64) -> ParsedData {
        let gen_config = GenConfig::new("ni", ni_structure(), None).unwrap();
        let generator = PdfGenerator::build(&gen_config, 12.0).unwrap();
        let r: Vec<f64> = (0..1100).map(|i| 0.5 + i as f64 * 0.01).collect();
        let mut values = generator.param_defaults();
        values[1] = lat;
        let g = generator.evaluate(&r, &values).unwrap();
        ParsedData::from_arrays(r, g).unwrap()
    }

    fn single_phase_config(data: ParsedData) -> ConConfig {
        let gen = GenConfig::new("ni", ni_structure(), None).unwrap();
        ConConfig::new("nickel", "ni", data, (2.0, 10.0, 0.02), vec![gen], vec![]).unwrap()
    }

    #[test]
    fn test_multi_phase_rejects_name_collision() {
        let configs = vec![
            single_phase_config(synthetic_data(1.0)),
            single_phase_config(synthetic_data(1.0)),
        ];
        assert!(multi_phase(configs).is_err());
    }

    #[test]
    fn test_multi_phase_two_contributions() {
        let a = single_phase_config(synthetic_data(1.0));
        let gen = GenConfig::new("ni", ni_structure(), None).unwrap();
        let b = ConConfig::new(
            "nickel2",
            "ni",
            synthetic_data(1.0),
            (2.0, 10.0, 0.02),
            vec![gen],
            vec![],
        )
        .unwrap();

        let recipe = multi_phase(vec![a, b]).unwrap();
        assert_eq!(recipe.contributions().len(), 2);
        assert!(recipe.variables().is_empty());
    }

    #[test]
    fn test_optimize_without_free_variables_fails() {
        let mut recipe = multi_phase(vec![single_phase_config(synthetic_data(1.0))]).unwrap();
        assert!(optimize(&mut recipe, &SolverOptions::default()).is_err());
    }

    #[test]
    fn test_optimize_recovers_lattice_expansion() {
        // 数据由 lat=1.01 合成；从 1.0 出发应把 lat 拉离初值并接近 1.01
        let mut recipe = multi_phase(vec![single_phase_config(synthetic_data(1.01))]).unwrap();
        add_gen_vars(&mut recipe, "nickel", "ni", &[("lat", VarSpec::Free)]).unwrap();

        let initial = recipe.variable("lat").unwrap().value;
        let result = optimize(&mut recipe, &SolverOptions::default()).unwrap();
        let fitted = recipe.variable("lat").unwrap().value;

        assert!((fitted - initial).abs() > 1e-4, "lat did not move");
        assert!((fitted - 1.01).abs() < 2e-3, "lat = {}", fitted);
        assert!(result.rw < 0.2);
    }

    #[test]
    fn test_optimize_updates_uncertainty() {
        let mut recipe = multi_phase(vec![single_phase_config(synthetic_data(1.005))]).unwrap();
        add_gen_vars(
            &mut recipe,
            "nickel",
            "ni",
            &[("lat", VarSpec::Free), ("scale", VarSpec::Free)],
        )
        .unwrap();

        optimize(&mut recipe, &SolverOptions::default()).unwrap();
        let var = recipe.variable("lat").unwrap();
        assert!(var.uncertainty.is_some());
    }

    #[test]
    fn test_fixed_variable_not_optimized() {
        let mut recipe = multi_phase(vec![single_phase_config(synthetic_data(1.01))]).unwrap();
        add_gen_vars(
            &mut recipe,
            "nickel",
            "ni",
            &[("lat", VarSpec::Free), ("uiso", VarSpec::Fixed(0.005))],
        )
        .unwrap();

        optimize(&mut recipe, &SolverOptions::default()).unwrap();
        assert!((recipe.variable("uiso").unwrap().value - 0.005).abs() < 1e-12);
    }
}
