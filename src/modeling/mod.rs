//! # 结构精修建模模块
//!
//! 把配置对象装配成拟合配方、绑定变量、驱动优化并持久化结果。
//!
//! ## 子模块
//! - `config`: GenConfig / FunConfig / ConConfig 配置对象
//! - `creating`: 配方构建器 create
//! - `recipe`: Recipe / Contribution 聚合体与装配
//! - `adding`: 变量绑定器 add_gen_vars / add_con_vars
//! - `equation`: 贡献方程解析求值
//! - `generator`: 结构 -> G(r) 的 PDF 生成器
//! - `scattering`: 散射权重数据库
//! - `shapes`: 内置特征函数
//! - `solver`: Levenberg-Marquardt 求解器
//! - `fitting`: multi_phase / optimize / fit_calib
//! - `report`: 文本报告
//! - `plot`: 拟合可视化
//! - `saving`: 结果包持久化
//!
//! ## 依赖关系
//! - 被 `commands/fit.rs`, `commands/calib.rs` 使用
//! - 使用 `models/`, `parsers/`

pub mod adding;
pub mod config;
pub mod creating;
pub mod equation;
pub mod fitting;
pub mod generator;
pub mod plot;
pub mod recipe;
pub mod report;
pub mod saving;
pub mod scattering;
pub mod shapes;
pub mod solver;

pub use adding::{add_con_vars, add_gen_vars};
pub use config::{Characteristic, ConConfig, FitRange, FunConfig, GenConfig};
pub use creating::create;
pub use fitting::{fit_calib, multi_phase, optimize, FitResult};
pub use plot::view_fits;
pub use recipe::{make_recipe, Contribution, Recipe, VarSpec, Variable};
pub use report::report;
pub use saving::{load_params, save};
pub use solver::{SolverOptions, SolverStatus};
