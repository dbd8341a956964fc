//! # calib 命令实现
//!
//! 用标样数据精修仪器参数：构建标样配方，精修
//! scale/lat/uiso/qdamp/qbroad，报告可用于后续拟合的
//! Qdamp/Qbroad 值。
//!
//! ## 依赖关系
//! - 使用 `cli/calib.rs` 定义的参数
//! - 使用 `modeling/fitting.rs` 的 fit_calib
//! - 使用 `parsers/` 读取数据与结构

use std::sync::Arc;

use crate::cli::calib::CalibArgs;
use crate::error::Result;
use crate::modeling::{report, save, view_fits};
use crate::modeling::fitting::fit_calib;
use crate::parsers;
use crate::parsers::data::parse_data_file;
use crate::utils::{output, progress};

/// 执行 calib 命令
pub fn execute(args: CalibArgs) -> Result<()> {
    output::print_header("Instrument Calibration");

    let data = parse_data_file(&args.data)?;
    let crystal = parsers::parse_structure_file(&args.structure)?;
    output::print_info(&format!(
        "Calibrant: {} ({}, {} atoms)",
        crystal.name,
        crystal.formula(),
        crystal.atoms.len()
    ));
    output::print_info(&format!(
        "Data: '{}' ({} points)",
        args.data.display(),
        data.curve.len()
    ));

    let ncpu = if args.ncpu == 0 { None } else { Some(args.ncpu) };

    let spinner = progress::create_spinner("Refining calibration");
    let (recipe, result) = fit_calib(
        Arc::new(crystal),
        data,
        (args.rmin, args.rmax, args.rstep),
        ncpu,
    )?;
    spinner.finish_and_clear();

    output::print_info(&format!(
        "Solver {} after {} iteration(s), Rw = {:.4}",
        result.status, result.iterations, result.rw
    ));
    println!("{}", report(&recipe, Some(&result)));

    if let (Some(qdamp), Some(qbroad)) = (recipe.variable("qdamp"), recipe.variable("qbroad")) {
        output::print_info(&format!(
            "Pass --qdamp {:.4} --qbroad {:.4} to subsequent fits",
            qdamp.value, qbroad.value
        ));
    }

    let bundle = save(&recipe, Some(&result), &args.output, &args.name)?;
    output::print_success(&format!("Results bundle: {}", bundle.display()));

    if !args.no_plot {
        let plots = view_fits(&recipe, &bundle, 1200, 800, false)?;
        for plot in &plots {
            output::print_info(&format!("Fit plot: {}", plot.display()));
        }
    }

    Ok(())
}
