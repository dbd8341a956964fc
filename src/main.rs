//! # pairdist - X 射线全散射 PDF 分析工具箱
//!
//! 把同步辐射全散射实验的分析流程统一成单一可执行文件：
//! 二维图像积分、PDF 变换、结构模型精修与仪器校准。
//!
//! ## 子命令
//! - `integrate` - 二维衍射图像 -> 一维积分曲线
//! - `transform` - 积分曲线 I(Q) -> 约化对分布函数 G(r)
//! - `fit` - 结构模型对 G(r) 数据的精修拟合
//! - `calib` - 标样数据的仪器参数校准
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── integration/    (图像积分)
//!   │     ├── transformation/ (PDF 变换)
//!   │     ├── modeling/       (配方构建与精修)
//!   │     ├── parsers/        (格式解析器)
//!   │     └── models/         (数据模型)
//!   ├── batch/      (批量并行处理)
//!   ├── utils/      (工具函数)
//!   └── error.rs    (错误处理)
//! ```

mod batch;
mod cli;
mod commands;
mod error;
mod integration;
mod models;
mod modeling;
mod parsers;
mod transformation;
mod utils;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
