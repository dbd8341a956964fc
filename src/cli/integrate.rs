//! # integrate 子命令 CLI 定义
//!
//! 二维衍射图像的背景扣除、自动掩模与方位角积分。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/integrate.rs`

use clap::Args;
use std::path::PathBuf;

/// integrate 子命令参数
#[derive(Args, Debug)]
pub struct IntegrateArgs {
    /// Input: image file (CSV) or directory containing image files
    pub input: PathBuf,

    /// Output directory for integrated curves
    #[arg(short, long, default_value = "integrated")]
    pub output: PathBuf,

    // ─────────────────────────────────────────────────────────────
    // 实验几何
    // ─────────────────────────────────────────────────────────────
    /// X-ray wavelength in Å
    #[arg(short, long)]
    pub wavelength: f64,

    /// Sample-detector distance in mm
    #[arg(short, long)]
    pub distance: f64,

    /// Beam center row in pixels
    #[arg(long)]
    pub center_row: f64,

    /// Beam center column in pixels
    #[arg(long)]
    pub center_col: f64,

    /// Pixel size in mm
    #[arg(long, default_value_t = 0.2)]
    pub pixel_size: f64,

    // ─────────────────────────────────────────────────────────────
    // 背景与掩模
    // ─────────────────────────────────────────────────────────────
    /// Background image file (CSV) to subtract
    #[arg(short, long)]
    pub bg: Option<PathBuf>,

    /// Scale factor applied to the background before subtraction
    #[arg(long, default_value_t = 1.0)]
    pub bg_scale: f64,

    /// Disable automatic outlier masking
    #[arg(long, default_value_t = false)]
    pub no_mask: bool,

    /// Outlier criterion: |I - bin mean| > alpha * bin std
    #[arg(long, default_value_t = 2.0)]
    pub alpha: f64,

    /// Number of Q bins used for mask statistics
    #[arg(long, default_value_t = 128)]
    pub mask_bins: usize,

    /// Detector edge trim width in pixels
    #[arg(long, default_value_t = 1)]
    pub edge: usize,

    // ─────────────────────────────────────────────────────────────
    // 积分
    // ─────────────────────────────────────────────────────────────
    /// Number of points in the integrated curve
    #[arg(short, long, default_value_t = 1480)]
    pub npt: usize,

    /// Lower Q limit in Å⁻¹ (defaults to image coverage)
    #[arg(long)]
    pub qmin: Option<f64>,

    /// Upper Q limit in Å⁻¹ (defaults to image coverage)
    #[arg(long)]
    pub qmax: Option<f64>,

    /// Also write a plot of each integrated curve
    #[arg(long, default_value_t = false)]
    pub plot: bool,

    // ─────────────────────────────────────────────────────────────
    // 批量处理参数
    // ─────────────────────────────────────────────────────────────
    /// Glob pattern for input files (batch mode)
    #[arg(short, long, default_value = "*.csv")]
    pub pattern: String,

    /// Number of parallel jobs (0 = auto, batch mode only)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// Recurse into subdirectories (batch mode)
    #[arg(long, default_value_t = false)]
    pub recursive: bool,

    /// Overwrite existing output files
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,
}
