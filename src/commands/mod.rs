//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `parsers/`, `models/`, `integration/`, `transformation/`,
//!   `modeling/`, `batch/`, `utils/`
//! - 子模块: integrate, transform, fit, calib

pub mod calib;
pub mod fit;
pub mod integrate;
pub mod transform;

use crate::cli::Commands;
use crate::error::Result;

/// 执行命令
pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Integrate(args) => integrate::execute(args),
        Commands::Transform(args) => transform::execute(args),
        Commands::Fit(args) => fit::execute(args),
        Commands::Calib(args) => calib::execute(args),
    }
}
