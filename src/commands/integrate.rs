//! # integrate 命令实现
//!
//! 把二维衍射图像积分成一维强度曲线。
//!
//! ## 功能
//! - 支持单文件和批量目录处理
//! - 可选背景扣除与自动掩模
//! - 输出 .chi 两列数据文件，可选曲线图
//!
//! ## 依赖关系
//! - 使用 `cli/integrate.rs` 定义的参数
//! - 使用 `integration/` 模块做积分
//! - 使用 `batch/` 模块进行批量处理
//! - 使用 `parsers/data.rs` 写出曲线

use std::fs;
use std::path::{Path, PathBuf};

use crate::batch::{BatchRunner, FileCollector, ProcessResult};
use crate::cli::integrate::IntegrateArgs;
use crate::error::{PairdistError, Result};
use crate::integration::{self, Geometry, Image, IntegSettings, MaskSettings};
use crate::parsers::data::write_data_file;
use crate::utils::output;

/// 执行 integrate 命令
pub fn execute(args: IntegrateArgs) -> Result<()> {
    output::print_header("Azimuthal Integration");

    let geometry = Geometry::new(
        args.wavelength,
        args.distance,
        (args.center_row, args.center_col),
        args.pixel_size,
    )?;

    // 背景图像提前读一次，批量时共享
    let bg = match &args.bg {
        Some(path) => Some(Image::from_csv(path)?),
        None => None,
    };

    if args.input.is_file() {
        execute_single_file(&args, &geometry, bg.as_ref())
    } else if args.input.is_dir() {
        execute_batch(&args, &geometry, bg.as_ref())
    } else {
        Err(PairdistError::FileNotFound {
            path: args.input.display().to_string(),
        })
    }
}

/// 单文件模式
fn execute_single_file(
    args: &IntegrateArgs,
    geometry: &Geometry,
    bg: Option<&Image>,
) -> Result<()> {
    output::print_info(&format!("Single file mode: '{}'", args.input.display()));

    fs::create_dir_all(&args.output).map_err(|e| PairdistError::FileWriteError {
        path: args.output.display().to_string(),
        source: e,
    })?;

    match process_image_file(&args.input, args, geometry, bg) {
        ProcessResult::Success(msg) => {
            output::print_success(&msg);
            Ok(())
        }
        ProcessResult::Skipped(msg) => {
            output::print_warning(&msg);
            Ok(())
        }
        ProcessResult::Failed(_, err) => Err(PairdistError::Other(err)),
    }
}

/// 批量处理模式
fn execute_batch(args: &IntegrateArgs, geometry: &Geometry, bg: Option<&Image>) -> Result<()> {
    output::print_info(&format!("Batch mode: directory '{}'", args.input.display()));

    let collector = FileCollector::new(args.input.clone())
        .with_pattern(&args.pattern)
        .recursive(args.recursive);
    let files = collector.collect();

    if files.is_empty() {
        output::print_warning(&format!(
            "No matching files found with pattern '{}'",
            args.pattern
        ));
        return Ok(());
    }
    output::print_info(&format!("Found {} image files", files.len()));

    fs::create_dir_all(&args.output).map_err(|e| PairdistError::FileWriteError {
        path: args.output.display().to_string(),
        source: e,
    })?;

    let runner = BatchRunner::new(args.jobs);
    let result = runner.run(files, |file| process_image_file(file, args, geometry, bg));

    output::print_separator();
    output::print_success(&format!(
        "Batch complete: {} success, {} skipped, {} failed",
        result.success, result.skipped, result.failed
    ));
    for (path, err) in result.failures.iter().take(10) {
        output::print_error(&format!("  {}: {}", path, err));
    }

    Ok(())
}

/// 处理单张图像：读取、扣背景、掩模、积分、写出
fn process_image_file(
    path: &Path,
    args: &IntegrateArgs,
    geometry: &Geometry,
    bg: Option<&Image>,
) -> ProcessResult {
    let chi_path = output_path(path, &args.output, "chi");
    if chi_path.exists() && !args.overwrite {
        return ProcessResult::Skipped(format!(
            "{} exists, use --overwrite to replace",
            chi_path.display()
        ));
    }

    match integrate_one(path, args, geometry, bg, &chi_path) {
        Ok(points) => ProcessResult::Success(format!(
            "{} -> {} ({} points)",
            path.display(),
            chi_path.display(),
            points
        )),
        Err(e) => ProcessResult::Failed(path.display().to_string(), e.to_string()),
    }
}

fn integrate_one(
    path: &Path,
    args: &IntegrateArgs,
    geometry: &Geometry,
    bg: Option<&Image>,
    chi_path: &Path,
) -> Result<usize> {
    let mut img = Image::from_csv(path)?;
    if let Some(bg) = bg {
        img = integration::bg_sub(&img, bg, Some(args.bg_scale))?;
    }

    let mask = if args.no_mask {
        None
    } else {
        let settings = MaskSettings::default()
            .with_alpha(args.alpha)
            .with_bins(args.mask_bins)
            .with_edge(args.edge);
        let (mask, _) = integration::auto_mask(&img, geometry, &settings)?;
        Some(mask)
    };

    let mut settings = IntegSettings::default().with_npt(args.npt);
    if let Some(qmin) = args.qmin {
        settings = settings.with_qmin(qmin);
    }
    if let Some(qmax) = args.qmax {
        settings = settings.with_qmax(qmax);
    }

    let (curve, effective) = integration::integrate(&img, geometry, mask.as_ref(), &settings)?;

    write_data_file(
        chi_path,
        &curve,
        &[
            ("wavelength", format!("{}", args.wavelength)),
            ("distance", format!("{}", args.distance)),
            ("npt", format!("{}", effective.npt)),
        ],
    )?;

    if args.plot {
        let plot_path = output_path(path, &args.output, "png");
        integration::vis_curve(
            &curve,
            &plot_path,
            &stem_of(path),
            "Q (Å⁻¹)",
            "I (a.u.)",
            1200,
            800,
        )?;
    }

    Ok(curve.len())
}

/// 输出路径: <output>/<stem>.<ext>
fn output_path(input: &Path, output_dir: &Path, ext: &str) -> PathBuf {
    output_dir.join(format!("{}.{}", stem_of(input), ext))
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output")
        .to_string()
}
