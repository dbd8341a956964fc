//! # 一维曲线数据模型
//!
//! 统一的两行式一维数据表示：第一行为自变量（Q 或 r），第二行为强度或 G 值。
//! 积分、变换和建模模块之间都以该类型传递曲线。
//!
//! ## 依赖关系
//! - 被 `integration/`, `transformation/`, `modeling/` 使用
//! - 无外部模块依赖

use serde::{Deserialize, Serialize};

use crate::error::{PairdistError, Result};

/// 两行式一维曲线
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Curve {
    /// 自变量（Q, 2θ 或 r），单调递增
    pub x: Vec<f64>,
    /// 因变量（强度或 G 值）
    pub y: Vec<f64>,
}

impl Curve {
    /// 从两列数据创建曲线，要求长度一致且 x 单调递增
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        if x.len() != y.len() {
            return Err(PairdistError::Other(format!(
                "Unmatched curve columns: {} x values, {} y values",
                x.len(),
                y.len()
            )));
        }
        if x.len() < 2 {
            return Err(PairdistError::Other(
                "Curve needs at least two points".to_string(),
            ));
        }
        if x.windows(2).any(|w| w[1] <= w[0]) {
            return Err(PairdistError::Other(
                "Curve x values must be strictly increasing".to_string(),
            ));
        }
        Ok(Curve { x, y })
    }

    /// 数据点数量
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// 自变量范围 (xmin, xmax)
    pub fn x_range(&self) -> (f64, f64) {
        (self.x[0], self.x[self.x.len() - 1])
    }

    /// 线性插值取值；x 超出范围时返回 None
    pub fn interpolate(&self, x: f64) -> Option<f64> {
        let (xmin, xmax) = self.x_range();
        if x < xmin || x > xmax {
            return None;
        }
        // 二分查找右邻点
        let idx = match self
            .x
            .binary_search_by(|v| v.partial_cmp(&x).unwrap_or(std::cmp::Ordering::Less))
        {
            Ok(i) => return Some(self.y[i]),
            Err(i) => i,
        };
        let (x0, x1) = (self.x[idx - 1], self.x[idx]);
        let (y0, y1) = (self.y[idx - 1], self.y[idx]);
        let t = (x - x0) / (x1 - x0);
        Some(y0 + t * (y1 - y0))
    }

    /// 在等间距网格上重采样；网格须落在数据范围内
    pub fn resample(&self, grid: &[f64]) -> Result<Vec<f64>> {
        grid.iter()
            .map(|&x| {
                self.interpolate(x).ok_or_else(|| {
                    let (xmin, xmax) = self.x_range();
                    PairdistError::InvalidRange(format!(
                        "{:.4} outside data range [{:.4}, {:.4}]",
                        x, xmin, xmax
                    ))
                })
            })
            .collect()
    }

    /// 截取 [xmin, xmax] 范围内的子曲线
    pub fn sliced(&self, xmin: f64, xmax: f64) -> Result<Curve> {
        let pairs: Vec<(f64, f64)> = self
            .x
            .iter()
            .zip(self.y.iter())
            .filter(|(&x, _)| x >= xmin && x <= xmax)
            .map(|(&x, &y)| (x, y))
            .collect();
        if pairs.len() < 2 {
            return Err(PairdistError::InvalidRange(format!(
                "[{:.4}, {:.4}] leaves fewer than two data points",
                xmin, xmax
            )));
        }
        Curve::new(
            pairs.iter().map(|(x, _)| *x).collect(),
            pairs.iter().map(|(_, y)| *y).collect(),
        )
    }
}

/// 生成等间距网格 [start, stop]，步长 step（含端点）
pub fn arange_inclusive(start: f64, stop: f64, step: f64) -> Vec<f64> {
    let n = ((stop - start) / step).round() as usize + 1;
    (0..n).map(|i| start + i as f64 * step).collect()
}
