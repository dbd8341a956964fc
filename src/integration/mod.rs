//! # 图像积分模块
//!
//! 把二维衍射图像还原为一维积分强度曲线：背景扣除、自动掩模、
//! 方位角积分。
//!
//! ## 子模块
//! - `image`: 行主序二维图像与 CSV 读取
//! - `geometry`: 实验几何与逐像素 Q 映射
//! - `tools`: bg_sub / auto_mask / integrate 流水线
//! - `plot`: 单曲线可视化
//!
//! ## 依赖关系
//! - 被 `commands/integrate.rs`, `commands/transform.rs` 使用
//! - 使用 `models/curve.rs`

pub mod geometry;
pub mod image;
pub mod plot;
pub mod tools;

pub use geometry::Geometry;
pub use image::Image;
pub use plot::vis_curve;
pub use tools::{auto_mask, bg_sub, integrate, IntegSettings, Mask, MaskSettings};
