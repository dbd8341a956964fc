//! # fit 命令实现
//!
//! 用结构模型精修 G(r) 数据：构建配方、绑定变量、驱动优化、
//! 写出结果包与拟合图。
//!
//! ## 依赖关系
//! - 使用 `cli/fit.rs` 定义的参数
//! - 使用 `modeling/` 模块完成全部建模工作
//! - 使用 `parsers/` 读取数据与结构

use std::path::Path;
use std::sync::Arc;

use crate::cli::fit::{FitArgs, PlotFormat};
use crate::error::Result;
use crate::models::Crystal;
use crate::modeling::{
    add_con_vars, add_gen_vars, create, optimize, report, save, view_fits, Characteristic,
    SolverOptions, VarSpec,
};
use crate::modeling::shapes::sphere_cf;
use crate::parsers;
use crate::parsers::data::parse_data_file;
use crate::utils::{output, progress};

/// 执行 fit 命令
pub fn execute(args: FitArgs) -> Result<()> {
    output::print_header("PDF Structure Refinement");

    let data = parse_data_file(&args.data)?;
    output::print_info(&format!(
        "Data: '{}' ({} points)",
        args.data.display(),
        data.curve.len()
    ));

    // 每个结构文件一个生成器，符号名取自文件名
    let mut structures: Vec<(String, Arc<Crystal>)> = Vec::new();
    for path in &args.structure {
        let crystal = parsers::parse_structure_file(path)?;
        output::print_info(&format!(
            "Structure: {} ({}, {} atoms)",
            crystal.name,
            crystal.formula(),
            crystal.atoms.len()
        ));
        structures.push((symbol_from(path), Arc::new(crystal)));
    }

    let joined = structures
        .iter()
        .map(|(symbol, _)| symbol.as_str())
        .collect::<Vec<_>>()
        .join(" + ");
    let equation = match &args.eq {
        Some(eq) => eq.clone(),
        None if args.psize.is_some() => format!("sphere * ({})", joined),
        None => joined,
    };
    output::print_info(&format!("Equation: {}", equation));

    let functions = match args.psize {
        Some(psize) => vec![(
            "sphere",
            Characteristic::new(sphere_cf, &[("psize", psize)]),
        )],
        None => vec![],
    };

    let name = args
        .name
        .clone()
        .unwrap_or_else(|| stem_of(&args.data));
    let ncpu = if args.ncpu == 0 { None } else { Some(args.ncpu) };

    let mut recipe = create(
        &name,
        data,
        (args.rmin, args.rmax, args.rstep),
        &equation,
        functions,
        structures
            .iter()
            .map(|(symbol, crystal)| (symbol.as_str(), Arc::clone(crystal)))
            .collect(),
        ncpu,
    )?;

    // 同名参数跨生成器共享；需要独立权重时在方程里写显式系数
    for (symbol, _) in &structures {
        let mut specs: Vec<(&str, VarSpec)> = vec![
            ("scale", VarSpec::Free),
            ("lat", VarSpec::Free),
            ("uiso", VarSpec::Free),
        ];
        if args.fit_delta2 {
            specs.push(("delta2", VarSpec::Free));
        }
        if let Some(qdamp) = args.qdamp {
            specs.push(("qdamp", VarSpec::Fixed(qdamp)));
        }
        if let Some(qbroad) = args.qbroad {
            specs.push(("qbroad", VarSpec::Fixed(qbroad)));
        }
        add_gen_vars(&mut recipe, &name, symbol, &specs)?;
    }
    recipe.set_bounds("uiso", 1e-4, 0.1)?;
    if args.fit_delta2 {
        recipe.set_bounds("delta2", 0.0, 10.0)?;
    }

    if args.psize.is_some() {
        add_con_vars(&mut recipe, &name, &[("psize_sphere", VarSpec::Free)])?;
        recipe.set_bounds("psize_sphere", 1.0, 1e4)?;
    }

    output::print_info(&format!(
        "{} free variable(s) bound",
        recipe.free_variables().len()
    ));

    let spinner = progress::create_spinner("Optimizing");
    let options = SolverOptions {
        max_iter: args.max_iter,
        ..SolverOptions::default()
    };
    let result = optimize(&mut recipe, &options)?;
    spinner.finish_and_clear();

    output::print_info(&format!(
        "Solver {} after {} iteration(s), Rw = {:.4}",
        result.status, result.iterations, result.rw
    ));
    println!("{}", report(&recipe, Some(&result)));

    let bundle = save(&recipe, Some(&result), &args.output, &name)?;
    output::print_success(&format!("Results bundle: {}", bundle.display()));

    if !args.no_plot {
        let use_svg = matches!(args.plot_format, PlotFormat::Svg);
        let plots = view_fits(&recipe, &bundle, args.width, args.height, use_svg)?;
        for plot in &plots {
            output::print_info(&format!("Fit plot: {}", plot.display()));
        }
    }

    Ok(())
}

/// 从文件名派生方程符号：小写，非字母数字替换为下划线
fn symbol_from(path: &Path) -> String {
    let stem = stem_of(path).to_lowercase();
    let mut symbol: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if symbol
        .chars()
        .next()
        .map(|c| !c.is_ascii_alphabetic())
        .unwrap_or(true)
    {
        symbol.insert(0, 's');
    }
    symbol
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("fit")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_from_sanitizes() {
        assert_eq!(symbol_from(Path::new("Ni.cif")), "ni");
        assert_eq!(symbol_from(Path::new("CdSe-core.xyz")), "cdse_core");
        assert_eq!(symbol_from(Path::new("2theta.cif")), "s2theta");
    }
}
