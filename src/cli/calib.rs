//! # calib 子命令 CLI 定义
//!
//! 用标样数据精修仪器参数 (Qdamp/Qbroad)。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/calib.rs`

use clap::Args;
use std::path::PathBuf;

/// calib 子命令参数
#[derive(Args, Debug)]
pub struct CalibArgs {
    /// PDF data file of the calibration standard (.gr)
    pub data: PathBuf,

    /// Structure file of the calibration standard (.cif/.xyz)
    #[arg(short, long)]
    pub structure: PathBuf,

    /// Lower fit limit in Å
    #[arg(long, default_value_t = 1.5)]
    pub rmin: f64,

    /// Upper fit limit in Å
    #[arg(long, default_value_t = 20.0)]
    pub rmax: f64,

    /// Fit grid step in Å
    #[arg(long, default_value_t = 0.01)]
    pub rstep: f64,

    /// Threads for the PDF generator (0 = serial)
    #[arg(short, long, default_value_t = 0)]
    pub ncpu: usize,

    /// Output directory for the results bundle
    #[arg(short, long, default_value = "calib")]
    pub output: PathBuf,

    /// Name of the results bundle
    #[arg(long, default_value = "calibration")]
    pub name: String,

    /// Skip fit plot generation
    #[arg(long, default_value_t = false)]
    pub no_plot: bool,
}
