//! # 数据模型模块
//!
//! 定义统一的晶体结构和一维曲线数据模型。
//!
//! ## 依赖关系
//! - 被 `parsers/`, `integration/`, `transformation/`, `modeling/` 使用
//! - 子模块: structure, curve

pub mod curve;
pub mod structure;

pub use curve::{arange_inclusive, Curve};
pub use structure::{Atom, Crystal, Lattice};
