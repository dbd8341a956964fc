//! # transform 命令实现
//!
//! 把积分强度曲线 I(Q) 变换为约化对分布函数 G(r)。
//!
//! ## 功能
//! - 支持单文件和批量目录处理
//! - 输出 .gr 两列数据文件，可选中间量 S(Q)/F(Q) 与曲线图
//!
//! ## 依赖关系
//! - 使用 `cli/transform.rs` 定义的参数
//! - 使用 `transformation/` 模块做变换
//! - 使用 `batch/` 模块进行批量处理
//! - 使用 `parsers/data.rs` 读写曲线

use std::fs;
use std::path::{Path, PathBuf};

use crate::batch::{BatchRunner, FileCollector, ProcessResult};
use crate::cli::transform::TransformArgs;
use crate::error::{PairdistError, Result};
use crate::integration::vis_curve;
use crate::parsers::data::{parse_data_file, write_data_file};
use crate::transformation::{get_pdf, PdfConfig};
use crate::utils::output;

/// 执行 transform 命令
pub fn execute(args: TransformArgs) -> Result<()> {
    output::print_header("PDF Transformation");

    let config = PdfConfig {
        qmin: args.qmin,
        qmax: args.qmax,
        rmin: args.rmin,
        rmax: args.rmax,
        rstep: args.rstep,
        tail_fraction: args.tail,
    };

    if args.input.is_file() {
        execute_single_file(&args, &config)
    } else if args.input.is_dir() {
        execute_batch(&args, &config)
    } else {
        Err(PairdistError::FileNotFound {
            path: args.input.display().to_string(),
        })
    }
}

/// 单文件模式
fn execute_single_file(args: &TransformArgs, config: &PdfConfig) -> Result<()> {
    output::print_info(&format!("Single file mode: '{}'", args.input.display()));

    fs::create_dir_all(&args.output).map_err(|e| PairdistError::FileWriteError {
        path: args.output.display().to_string(),
        source: e,
    })?;

    match process_chi_file(&args.input, args, config) {
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
fn execute_batch(args: &TransformArgs, config: &PdfConfig) -> Result<()> {
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
    output::print_info(&format!("Found {} curve files", files.len()));

    fs::create_dir_all(&args.output).map_err(|e| PairdistError::FileWriteError {
        path: args.output.display().to_string(),
        source: e,
    })?;

    let runner = BatchRunner::new(args.jobs);
    let result = runner.run(files, |file| process_chi_file(file, args, config));

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

/// 处理一条曲线：读取、变换、写出
fn process_chi_file(path: &Path, args: &TransformArgs, config: &PdfConfig) -> ProcessResult {
    let gr_path = output_path(path, &args.output, "gr");
    if gr_path.exists() && !args.overwrite {
        return ProcessResult::Skipped(format!(
            "{} exists, use --overwrite to replace",
            gr_path.display()
        ));
    }

    match transform_one(path, args, config, &gr_path) {
        Ok(points) => ProcessResult::Success(format!(
            "{} -> {} ({} points)",
            path.display(),
            gr_path.display(),
            points
        )),
        Err(e) => ProcessResult::Failed(path.display().to_string(), e.to_string()),
    }
}

fn transform_one(
    path: &Path,
    args: &TransformArgs,
    config: &PdfConfig,
    gr_path: &Path,
) -> Result<usize> {
    let parsed = parse_data_file(path)?;
    let transformed = get_pdf(config, &parsed.curve)?;

    let meta = [
        ("qmin", format!("{}", config.qmin)),
        ("qmax", format!("{}", config.qmax)),
        ("rstep", format!("{}", config.rstep)),
    ];
    write_data_file(gr_path, &transformed.gr, &meta)?;

    if args.keep_stages {
        write_data_file(&output_path(path, &args.output, "sq"), &transformed.sq, &meta)?;
        write_data_file(&output_path(path, &args.output, "fq"), &transformed.fq, &meta)?;
    }

    if args.plot {
        let plot_path = output_path(path, &args.output, "png");
        vis_curve(
            &transformed.gr,
            &plot_path,
            &stem_of(path),
            "r (Å)",
            "G (Å⁻²)",
            1200,
            800,
        )?;
    }

    Ok(transformed.gr.len())
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
