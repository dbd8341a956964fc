//! # 变量绑定器
//!
//! 把生成器级和贡献级参数注册为配方变量。两个操作都原位修改并
//! 返回同一配方实例，便于链式调用。
//!
//! 前置条件：
//! - 参数必须存在于目标生成器/贡献中，否则报 UnknownParameter
//! - 同一 (贡献, 参数) 目标不可重复绑定，否则报 DuplicateVariable
//!
//! 校验在任何改动之前完成：失败的调用不改变配方。
//! 同名变量跨目标共享（约束），再次出现时追加绑定目标。
//!
//! ## 依赖关系
//! - 被 `modeling/fitting.rs` 和 `commands/fit.rs` 使用
//! - 使用 `modeling/recipe.rs`

use crate::error::{PairdistError, Result};
use crate::modeling::recipe::{ParamLoc, ParamRef, Recipe, VarSpec, Variable};

/// 把生成器级参数注册为配方变量
///
/// 变量名即参数名（如 "lat"）；同名变量跨贡献共享。
pub fn add_gen_vars<'a>(
    recipe: &'a mut Recipe,
    con_name: &str,
    gen_name: &str,
    specs: &[(&str, VarSpec)],
) -> Result<&'a mut Recipe> {
    let con_idx = recipe
        .contribution_index(con_name)
        .ok_or_else(|| PairdistError::Configuration(format!(
            "no contribution named '{}'",
            con_name
        )))?;

    let target = format!("{}.{}", con_name, gen_name);
    let con = &recipe.contributions()[con_idx];
    if !con
        .generators
        .iter()
        .any(|slot| slot.config.name == gen_name)
    {
        return Err(PairdistError::Configuration(format!(
            "no generator named '{}' in contribution '{}'",
            gen_name, con_name
        )));
    }

    let locate = |param: &str| con.find_gen_param(gen_name, param);
    let resolved = resolve_specs(recipe, con_idx, &target, specs, locate)?;
    bind(recipe, resolved);
    Ok(recipe)
}

/// 把贡献级参数（带后缀的特征函数参数）注册为配方变量
pub fn add_con_vars<'a>(
    recipe: &'a mut Recipe,
    con_name: &str,
    specs: &[(&str, VarSpec)],
) -> Result<&'a mut Recipe> {
    let con_idx = recipe
        .contribution_index(con_name)
        .ok_or_else(|| PairdistError::Configuration(format!(
            "no contribution named '{}'",
            con_name
        )))?;

    let con = &recipe.contributions()[con_idx];
    let locate = |param: &str| con.find_con_param(param);
    let resolved = resolve_specs(recipe, con_idx, con_name, specs, locate)?;
    bind(recipe, resolved);
    Ok(recipe)
}

/// 单个待绑定项：名字、目标、绑定方式、起始值
struct ResolvedSpec {
    name: String,
    target: ParamRef,
    spec: VarSpec,
    current: f64,
}

/// 先完成全部校验：定位目标、查重。任何失败都不触碰配方。
fn resolve_specs(
    recipe: &Recipe,
    con_idx: usize,
    target_desc: &str,
    specs: &[(&str, VarSpec)],
    locate: impl Fn(&str) -> Option<ParamLoc>,
) -> Result<Vec<ResolvedSpec>> {
    let con = &recipe.contributions()[con_idx];
    let mut resolved: Vec<ResolvedSpec> = Vec::with_capacity(specs.len());

    for &(param, spec) in specs {
        let loc = locate(param).ok_or_else(|| PairdistError::UnknownParameter {
            target: target_desc.to_string(),
            parameter: param.to_string(),
        })?;
        let target = ParamRef { con_idx, loc };

        let already_bound = recipe
            .variables()
            .iter()
            .any(|v| v.targets.contains(&target))
            || resolved.iter().any(|r| r.target == target);
        if already_bound {
            return Err(PairdistError::DuplicateVariable {
                target: target_desc.to_string(),
                parameter: param.to_string(),
            });
        }

        resolved.push(ResolvedSpec {
            name: param.to_string(),
            target,
            spec,
            current: con.param_value(loc),
        });
    }

    Ok(resolved)
}

/// 执行绑定；同名变量追加目标，新变量按绑定方式建值
fn bind(recipe: &mut Recipe, resolved: Vec<ResolvedSpec>) {
    for item in resolved {
        match recipe.variable_mut(&item.name) {
            Some(existing) => {
                existing.targets.push(item.target);
                if let VarSpec::Fixed(value) = item.spec {
                    existing.value = value;
                    existing.free = false;
                }
            }
            None => {
                let (value, free) = match item.spec {
                    VarSpec::Free => (item.current, true),
                    VarSpec::Fixed(value) => (value, false),
                };
                recipe.variables.push(Variable {
                    name: item.name,
                    value,
                    uncertainty: None,
                    free,
                    bounds: None,
                    targets: vec![item.target],
                });
            }
        }
    }
    recipe.push_variable_values();
}
