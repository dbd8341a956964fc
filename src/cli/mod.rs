//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `integrate`: 二维衍射图像 -> 一维积分曲线
//! - `transform`: 积分曲线 -> 约化对分布函数 G(r)
//! - `fit`: 结构模型对 G(r) 数据的精修拟合
//! - `calib`: 标样数据的仪器参数校准
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: integrate, transform, fit, calib

pub mod calib;
pub mod fit;
pub mod integrate;
pub mod transform;

use clap::{Parser, Subcommand};

/// pairdist - X 射线全散射 PDF 分析工具箱
#[derive(Parser)]
#[command(name = "pairdist")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(about = "A pair distribution function analysis toolkit for X-ray total scattering", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Integrate 2D diffraction images into 1D intensity curves
    Integrate(integrate::IntegrateArgs),

    /// Transform integrated intensity I(Q) into the PDF G(r)
    Transform(transform::TransformArgs),

    /// Fit structure models against PDF data
    Fit(fit::FitArgs),

    /// Calibrate instrument parameters against a standard sample
    Calib(calib::CalibArgs),
}
