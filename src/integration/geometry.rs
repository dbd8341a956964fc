//! # 实验几何
//!
//! 平板探测器的实验几何：波长、样品-探测器距离、光束中心和
//! 像素尺寸。提供逐像素的散射矢量 Q 映射。
//!
//! ## 依赖关系
//! - 被 `integration/tools.rs` 使用
//! - 无外部模块依赖

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::{PairdistError, Result};

/// 平板探测器几何
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Geometry {
    /// X 射线波长 (Å)
    pub wavelength: f64,
    /// 样品-探测器距离 (mm)
    pub distance: f64,
    /// 光束中心 (行, 列)，像素坐标
    pub center: (f64, f64),
    /// 像素尺寸 (mm)
    pub pixel_size: f64,
}

impl Geometry {
    pub fn new(wavelength: f64, distance: f64, center: (f64, f64), pixel_size: f64) -> Result<Self> {
        if wavelength <= 0.0 {
            return Err(PairdistError::Configuration(format!(
                "wavelength {} must be positive",
                wavelength
            )));
        }
        if distance <= 0.0 || pixel_size <= 0.0 {
            return Err(PairdistError::Configuration(
                "distance and pixel size must be positive".to_string(),
            ));
        }
        Ok(Geometry {
            wavelength,
            distance,
            center,
            pixel_size,
        })
    }

    /// 单个像素的散射矢量模 Q = 4π sin(θ)/λ (Å⁻¹)
    pub fn q_at(&self, row: usize, col: usize) -> f64 {
        let dr = (row as f64 - self.center.0) * self.pixel_size;
        let dc = (col as f64 - self.center.1) * self.pixel_size;
        let radius = (dr * dr + dc * dc).sqrt();
        let theta = 0.5 * (radius / self.distance).atan();
        4.0 * PI * theta.sin() / self.wavelength
    }

    /// 整幅图像的逐像素 Q 映射（行主序）
    pub fn q_map(&self, rows: usize, cols: usize) -> Vec<f64> {
        let mut out = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                out.push(self.q_at(row, col));
            }
        }
        out
    }
}
