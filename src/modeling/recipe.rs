//! # 配方对象与装配
//!
//! Recipe 是可变的拟合聚合体：持有若干贡献，每个贡献持有生成器与
//! 特征函数的当前参数；配方级变量注册表把自由/固定变量绑定到
//! (贡献, 参数) 目标上，同名变量跨贡献共享（约束）。
//!
//! `make_recipe` 把一份 ConConfig 装配成含一个贡献、零个变量的配方：
//! 解析方程、生成拟合网格、把观测数据插值到网格、构建 PDF 生成器。
//!
//! ## 依赖关系
//! - 被 `modeling/creating.rs`, `modeling/adding.rs`, `modeling/fitting.rs` 使用
//! - 使用 `modeling/config.rs`, `modeling/equation.rs`, `modeling/generator.rs`

use std::collections::HashMap;

use crate::error::{PairdistError, Result};
use crate::models::arange_inclusive;
use crate::modeling::config::{validate_fit_range, ConConfig, FitRange, FunConfig, GenConfig};
use crate::modeling::equation::Expr;
use crate::modeling::generator::{self, PdfGenerator};
use crate::parsers::ParsedData;

/// 变量绑定方式：自由（从当前参数值出发优化）或固定为给定值
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VarSpec {
    /// 自由变量，起始值取目标参数当前值
    Free,
    /// 固定常量
    Fixed(f64),
}

/// 参数目标定位：贡献内的一个可寻址参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ParamLoc {
    /// (生成器下标, 参数下标)
    Generator(usize, usize),
    /// (特征函数下标, 参数下标)
    Function(usize, usize),
}

/// 变量的一个绑定目标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ParamRef {
    pub con_idx: usize,
    pub loc: ParamLoc,
}

/// 配方级变量
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub value: f64,
    pub uncertainty: Option<f64>,
    pub free: bool,
    pub bounds: Option<(f64, f64)>,
    pub(crate) targets: Vec<ParamRef>,
}

/// 生成器槽位：配置 + 引擎 + 当前参数值
#[derive(Debug, Clone)]
pub(crate) struct GeneratorSlot {
    pub config: GenConfig,
    pub generator: PdfGenerator,
    pub values: Vec<f64>,
}

/// 特征函数槽位：带后缀参数名 + 当前参数值
#[derive(Debug, Clone)]
pub(crate) struct FunctionSlot {
    pub config: FunConfig,
    /// 带后缀参数名（不含自变量 r），与 values 对齐
    pub argnames: Vec<String>,
    pub values: Vec<f64>,
}

/// 一项贡献：方程 + 网格上的观测数据 + 生成器/函数槽位
#[derive(Debug, Clone)]
pub struct Contribution {
    pub name: String,
    pub eq: String,
    pub fit_range: FitRange,
    pub(crate) expr: Expr,
    pub(crate) grid: Vec<f64>,
    pub(crate) observed: Vec<f64>,
    pub(crate) parser: ParsedData,
    pub(crate) generators: Vec<GeneratorSlot>,
    pub(crate) functions: Vec<FunctionSlot>,
}

impl Contribution {
    /// 拟合网格
    pub fn grid(&self) -> &[f64] {
        &self.grid
    }

    /// 网格上的观测值
    pub fn observed(&self) -> &[f64] {
        &self.observed
    }

    /// 按当前参数计算贡献曲线
    pub fn calculate(&self) -> Result<Vec<f64>> {
        let mut symbols: HashMap<String, Vec<f64>> = HashMap::new();
        for slot in &self.generators {
            symbols.insert(
                slot.config.name.clone(),
                slot.generator.evaluate(&self.grid, &slot.values)?,
            );
        }
        for slot in &self.functions {
            symbols.insert(
                slot.config.name.clone(),
                (slot.config.characteristic.func)(&self.grid, &slot.values),
            );
        }
        self.expr.evaluate(&symbols, self.grid.len())
    }

    /// 残差 (计算值 - 观测值)
    pub fn residuals(&self) -> Result<Vec<f64>> {
        let calc = self.calculate()?;
        Ok(calc
            .iter()
            .zip(self.observed.iter())
            .map(|(c, o)| c - o)
            .collect())
    }

    /// 查找生成器级参数
    pub(crate) fn find_gen_param(&self, gen_name: &str, param: &str) -> Option<ParamLoc> {
        let gen_idx = self
            .generators
            .iter()
            .position(|slot| slot.config.name == gen_name)?;
        let param_idx = generator::PARAM_NAMES.iter().position(|&p| p == param)?;
        Some(ParamLoc::Generator(gen_idx, param_idx))
    }

    /// 查找贡献级参数（带后缀的特征函数参数）
    pub(crate) fn find_con_param(&self, param: &str) -> Option<ParamLoc> {
        for (fun_idx, slot) in self.functions.iter().enumerate() {
            if let Some(arg_idx) = slot.argnames.iter().position(|a| a == param) {
                return Some(ParamLoc::Function(fun_idx, arg_idx));
            }
        }
        None
    }

    pub(crate) fn param_value(&self, loc: ParamLoc) -> f64 {
        match loc {
            ParamLoc::Generator(g, p) => self.generators[g].values[p],
            ParamLoc::Function(f, p) => self.functions[f].values[p],
        }
    }

    pub(crate) fn set_param_value(&mut self, loc: ParamLoc, value: f64) {
        match loc {
            ParamLoc::Generator(g, p) => self.generators[g].values[p] = value,
            ParamLoc::Function(f, p) => self.functions[f].values[p] = value,
        }
    }
}

/// 可变拟合聚合体
#[derive(Debug, Clone)]
pub struct Recipe {
    pub(crate) contributions: Vec<Contribution>,
    pub(crate) variables: Vec<Variable>,
}

impl Recipe {
    /// 全部贡献
    pub fn contributions(&self) -> &[Contribution] {
        &self.contributions
    }

    /// 按名取贡献
    pub fn contribution(&self, name: &str) -> Option<&Contribution> {
        self.contributions.iter().find(|c| c.name == name)
    }

    pub(crate) fn contribution_index(&self, name: &str) -> Option<usize> {
        self.contributions.iter().position(|c| c.name == name)
    }

    /// 全部变量
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// 按名取变量
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub(crate) fn variable_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.variables.iter_mut().find(|v| v.name == name)
    }

    /// 自由变量的 (名, 当前值)，按注册顺序
    pub fn free_variables(&self) -> Vec<(String, f64)> {
        self.variables
            .iter()
            .filter(|v| v.free)
            .map(|v| (v.name.clone(), v.value))
            .collect()
    }

    /// 设定自由变量的值（按注册顺序），并同步到所有目标参数
    pub(crate) fn set_free_values(&mut self, values: &[f64]) {
        let mut it = values.iter();
        for var in self.variables.iter_mut() {
            if var.free {
                if let Some(&v) = it.next() {
                    var.value = v;
                }
            }
        }
        self.push_variable_values();
    }

    /// 把变量值推送到所有绑定目标
    pub(crate) fn push_variable_values(&mut self) {
        let assignments: Vec<(ParamRef, f64)> = self
            .variables
            .iter()
            .flat_map(|v| v.targets.iter().map(move |&t| (t, v.value)))
            .collect();
        for (target, value) in assignments {
            self.contributions[target.con_idx].set_param_value(target.loc, value);
        }
    }

    /// 全贡献残差拼接（优化目标）
    pub fn residuals(&self) -> Result<Vec<f64>> {
        let mut out = Vec::new();
        for con in &self.contributions {
            out.extend(con.residuals()?);
        }
        Ok(out)
    }

    // ─────────────────────────────────────────────────────────────
    // 设置辅助
    // ─────────────────────────────────────────────────────────────

    /// 按名批量设定变量值
    pub fn set_values(&mut self, values: &[(&str, f64)]) -> Result<&mut Recipe> {
        for (name, _) in values {
            if self.variable(name).is_none() {
                return Err(PairdistError::UnknownParameter {
                    target: "recipe".to_string(),
                    parameter: name.to_string(),
                });
            }
        }
        for &(name, value) in values {
            if let Some(var) = self.variable_mut(name) {
                var.value = value;
            }
        }
        self.push_variable_values();
        Ok(self)
    }

    /// 全部变量的 (名, 当前值)
    pub fn get_values(&self) -> Vec<(String, f64)> {
        self.variables
            .iter()
            .map(|v| (v.name.clone(), v.value))
            .collect()
    }

    /// 设定变量取值范围
    pub fn set_bounds(&mut self, name: &str, lo: f64, hi: f64) -> Result<&mut Recipe> {
        if !(lo < hi) {
            return Err(PairdistError::InvalidRange(format!(
                "bounds [{}, {}] for '{}' are empty",
                lo, hi, name
            )));
        }
        let var = self
            .variable_mut(name)
            .ok_or_else(|| PairdistError::UnknownParameter {
                target: "recipe".to_string(),
                parameter: name.to_string(),
            })?;
        var.bounds = Some((lo, hi));
        Ok(self)
    }

    /// 读取变量取值范围
    pub fn get_bounds(&self, name: &str) -> Option<(f64, f64)> {
        self.variable(name).and_then(|v| v.bounds)
    }

    /// 重设某贡献的拟合范围并重建网格与观测插值
    pub fn set_range(&mut self, con_name: &str, range: FitRange) -> Result<&mut Recipe> {
        validate_fit_range(range)?;
        let idx = self
            .contribution_index(con_name)
            .ok_or_else(|| PairdistError::Configuration(format!(
                "no contribution named '{}'",
                con_name
            )))?;

        let con = &self.contributions[idx];
        let grid = arange_inclusive(range.0, range.1, range.2);
        let observed = con.parser.curve.resample(&grid)?;

        // rmax 变大时重建生成器覆盖
        let mut new_generators = Vec::with_capacity(con.generators.len());
        for slot in &con.generators {
            let generator = PdfGenerator::build(&slot.config, range.1)?;
            new_generators.push(GeneratorSlot {
                config: slot.config.clone(),
                generator,
                values: slot.values.clone(),
            });
        }

        let con = &mut self.contributions[idx];
        con.fit_range = range;
        con.grid = grid;
        con.observed = observed;
        con.generators = new_generators;
        Ok(self)
    }
}

/// 配方装配：把一份贡献配置变成含一个贡献、零个变量的配方
pub fn make_recipe(config: ConConfig) -> Result<Recipe> {
    let contribution = make_contribution(config)?;
    Ok(Recipe {
        contributions: vec![contribution],
        variables: Vec::new(),
    })
}

/// 装配单个贡献
pub(crate) fn make_contribution(config: ConConfig) -> Result<Contribution> {
    config.validate()?;

    let (rmin, rmax, rstep) = config.fit_range;
    let grid = arange_inclusive(rmin, rmax, rstep);
    let observed = config.parser.curve.resample(&grid)?;
    let expr = Expr::parse(&config.eq)?;

    let mut generators = Vec::with_capacity(config.genconfigs.len());
    for gen_config in &config.genconfigs {
        let generator = PdfGenerator::build(gen_config, rmax)?;
        let values = generator.param_defaults();
        generators.push(GeneratorSlot {
            config: gen_config.clone(),
            generator,
            values,
        });
    }

    let mut functions = Vec::with_capacity(config.funconfigs.len());
    for fun_config in &config.funconfigs {
        let argnames: Vec<String> = fun_config.argnames[1..].to_vec();
        let values: Vec<f64> = fun_config
            .characteristic
            .params
            .iter()
            .map(|p| p.default)
            .collect();
        functions.push(FunctionSlot {
            config: fun_config.clone(),
            argnames,
            values,
        });
    }

    Ok(Contribution {
        name: config.name,
        eq: config.eq,
        fit_range: config.fit_range,
        expr,
        grid,
        observed,
        parser: config.parser,
        generators,
        functions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Atom, Crystal, Lattice};
    use crate::modeling::config::Characteristic;
    use crate::modeling::shapes::sphere_cf;
    use std::sync::Arc;

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

    fn flat_data() -> ParsedData {
        let x: Vec<f64> = (0..1000).map(|i| 0.5 + i as f64 * 0.01).collect();
        let y = vec![0.0; 1000];
        ParsedData::from_arrays(x, y).unwrap()
    }

    fn ni_conconfig() -> ConConfig {
        let gen = GenConfig::new("ni", ni_structure(), None).unwrap();
        ConConfig::new("nickel", "ni", flat_data(), (2.0, 8.0, 0.02), vec![gen], vec![]).unwrap()
    }

    #[test]
    fn test_make_recipe_single_contribution_no_variables() {
        let recipe = make_recipe(ni_conconfig()).unwrap();
        assert_eq!(recipe.contributions().len(), 1);
        assert_eq!(recipe.contributions()[0].name, "nickel");
        assert!(recipe.variables().is_empty());
    }

    #[test]
    fn test_grid_outside_data_range_fails() {
        let gen = GenConfig::new("ni", ni_structure(), None).unwrap();
        // 数据只到 10.49 Å，拟合到 20 Å 必须失败
        let config = ConConfig::new(
            "nickel",
            "ni",
            flat_data(),
            (2.0, 20.0, 0.02),
            vec![gen],
            vec![],
        )
        .unwrap();
        assert!(make_recipe(config).is_err());
    }

    #[test]
    fn test_calculate_matches_generator() {
        let recipe = make_recipe(ni_conconfig()).unwrap();
        let con = &recipe.contributions()[0];

        let calc = con.calculate().unwrap();
        let slot = &con.generators[0];
        let direct = slot.generator.evaluate(con.grid(), &slot.values).unwrap();
        for (a, b) in calc.iter().zip(direct.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_function_symbol_in_equation() {
        let gen = GenConfig::new("ni", ni_structure(), None).unwrap();
        let fun = crate::modeling::config::FunConfig::new(
            "sphere",
            Characteristic::new(sphere_cf, &[("psize", 30.0)]),
        )
        .unwrap();
        let config = ConConfig::new(
            "nano",
            "sphere * ni",
            flat_data(),
            (2.0, 8.0, 0.02),
            vec![gen],
            vec![fun],
        )
        .unwrap();
        let recipe = make_recipe(config).unwrap();
        let con = &recipe.contributions()[0];

        // 包络在小 r 处接近 1，贡献应与裸生成器接近
        let calc = con.calculate().unwrap();
        assert!(calc.iter().all(|v| v.is_finite()));
        assert_eq!(con.functions[0].argnames, vec!["psize_sphere".to_string()]);
    }

    #[test]
    fn test_set_values_unknown_name_fails() {
        let mut recipe = make_recipe(ni_conconfig()).unwrap();
        assert!(recipe.set_values(&[("nope", 1.0)]).is_err());
    }

    #[test]
    fn test_set_range_rebuilds_grid() {
        let mut recipe = make_recipe(ni_conconfig()).unwrap();
        recipe.set_range("nickel", (3.0, 9.0, 0.05)).unwrap();
        let con = recipe.contribution("nickel").unwrap();
        assert!((con.grid()[0] - 3.0).abs() < 1e-12);
        assert!((con.grid()[con.grid().len() - 1] - 9.0).abs() < 1e-9);
        assert_eq!(con.observed().len(), con.grid().len());
    }

    #[test]
    fn test_set_bounds() {
        let mut recipe = make_recipe(ni_conconfig()).unwrap();
        crate::modeling::adding::add_gen_vars(
            &mut recipe,
            "nickel",
            "ni",
            &[("lat", VarSpec::Free)],
        )
        .unwrap();
        recipe.set_bounds("lat", 0.9, 1.1).unwrap();
        assert_eq!(recipe.get_bounds("lat"), Some((0.9, 1.1)));
        assert!(recipe.set_bounds("lat", 1.2, 1.1).is_err());
    }
}
