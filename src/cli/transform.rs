//! # transform 子命令 CLI 定义
//!
//! 把积分强度曲线 I(Q) 变换为约化对分布函数 G(r)。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/transform.rs`

use clap::Args;
use std::path::PathBuf;

/// transform 子命令参数
#[derive(Args, Debug)]
pub struct TransformArgs {
    /// Input: integrated curve file (.chi) or directory
    pub input: PathBuf,

    /// Output directory for G(r) files
    #[arg(short, long, default_value = "pdf")]
    pub output: PathBuf,

    /// Lower Q limit in Å⁻¹
    #[arg(long, default_value_t = 0.5)]
    pub qmin: f64,

    /// Upper Q limit in Å⁻¹
    #[arg(long, default_value_t = 24.0)]
    pub qmax: f64,

    /// Lower r limit in Å
    #[arg(long, default_value_t = 0.0)]
    pub rmin: f64,

    /// Upper r limit in Å
    #[arg(long, default_value_t = 30.0)]
    pub rmax: f64,

    /// r grid step in Å
    #[arg(long, default_value_t = 0.01)]
    pub rstep: f64,

    /// High-Q tail fraction used to normalize S(Q)
    #[arg(long, default_value_t = 0.1)]
    pub tail: f64,

    /// Also write the intermediate S(Q) and F(Q) curves
    #[arg(long, default_value_t = false)]
    pub keep_stages: bool,

    /// Also write a plot of each G(r) curve
    #[arg(long, default_value_t = false)]
    pub plot: bool,

    // ─────────────────────────────────────────────────────────────
    // 批量处理参数
    // ─────────────────────────────────────────────────────────────
    /// Glob pattern for input files (batch mode)
    #[arg(short, long, default_value = "*.chi")]
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
