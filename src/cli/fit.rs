//! # fit 子命令 CLI 定义
//!
//! 结构模型对 G(r) 数据的精修拟合。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/fit.rs`

use clap::{Args, ValueEnum};
use std::path::PathBuf;

/// 拟合图输出格式
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum PlotFormat {
    /// PNG image
    Png,
    /// SVG vector image
    Svg,
}

/// fit 子命令参数
#[derive(Args, Debug)]
pub struct FitArgs {
    /// PDF data file (.gr)
    pub data: PathBuf,

    /// Structure file(s) (.cif/.xyz), one generator per file
    #[arg(short, long, required = true, num_args = 1..)]
    pub structure: Vec<PathBuf>,

    /// Contribution equation; defaults to the sum of all structure symbols
    #[arg(short, long)]
    pub eq: Option<String>,

    /// Lower fit limit in Å
    #[arg(long, default_value_t = 1.5)]
    pub rmin: f64,

    /// Upper fit limit in Å
    #[arg(long, default_value_t = 20.0)]
    pub rmax: f64,

    /// Fit grid step in Å
    #[arg(long, default_value_t = 0.01)]
    pub rstep: f64,

    /// Spherical particle diameter in Å; registers the 'sphere' envelope
    #[arg(long)]
    pub psize: Option<f64>,

    /// Also refine the delta2 peak sharpening term
    #[arg(long, default_value_t = false)]
    pub fit_delta2: bool,

    /// Fixed instrument damping Qdamp (from calibration)
    #[arg(long)]
    pub qdamp: Option<f64>,

    /// Fixed instrument broadening Qbroad (from calibration)
    #[arg(long)]
    pub qbroad: Option<f64>,

    /// Maximum solver iterations
    #[arg(long, default_value_t = 100)]
    pub max_iter: usize,

    /// Threads for the PDF generator (0 = serial)
    #[arg(short, long, default_value_t = 0)]
    pub ncpu: usize,

    /// Output directory for the results bundle
    #[arg(short, long, default_value = "fits")]
    pub output: PathBuf,

    /// Name of the results bundle (defaults to the data file stem)
    #[arg(long)]
    pub name: Option<String>,

    /// Skip fit plot generation
    #[arg(long, default_value_t = false)]
    pub no_plot: bool,

    /// Fit plot format
    #[arg(long, value_enum, default_value = "png")]
    pub plot_format: PlotFormat,

    /// Figure width in pixels
    #[arg(long, default_value_t = 1200)]
    pub width: u32,

    /// Figure height in pixels
    #[arg(long, default_value_t = 800)]
    pub height: u32,
}
