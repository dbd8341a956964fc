//! # PDF 变换模块
//!
//! 把一维积分强度曲线 I(Q) 变换为约化对分布函数 G(r)：
//! 截取 [qmin, qmax]，用高 Q 尾部归一化得到 S(Q)，约化为
//! F(Q) = Q·(S-1)，再做正弦傅里叶变换得到 G(r)。
//!
//! ## 依赖关系
//! - 被 `commands/transform.rs` 使用
//! - 使用 `models/curve.rs`

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::{PairdistError, Result};
use crate::models::{arange_inclusive, Curve};

/// PDF 变换配置（不可变记录，`with_*` 覆盖）
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PdfConfig {
    /// Q 下限 (Å⁻¹)
    pub qmin: f64,
    /// Q 上限 (Å⁻¹)
    pub qmax: f64,
    /// r 网格下限 (Å)
    pub rmin: f64,
    /// r 网格上限 (Å)
    pub rmax: f64,
    /// r 网格步长 (Å)
    pub rstep: f64,
    /// 归一化尾部占比 (0, 1]
    pub tail_fraction: f64,
}

impl Default for PdfConfig {
    fn default() -> Self {
        PdfConfig {
            qmin: 0.5,
            qmax: 24.0,
            rmin: 0.0,
            rmax: 30.0,
            rstep: 0.01,
            tail_fraction: 0.1,
        }
    }
}

impl PdfConfig {
    pub fn with_qrange(mut self, qmin: f64, qmax: f64) -> Self {
        self.qmin = qmin;
        self.qmax = qmax;
        self
    }

    pub fn with_rrange(mut self, rmin: f64, rmax: f64, rstep: f64) -> Self {
        self.rmin = rmin;
        self.rmax = rmax;
        self.rstep = rstep;
        self
    }

    fn validate(&self) -> Result<()> {
        if !(self.qmin < self.qmax) {
            return Err(PairdistError::InvalidRange(format!(
                "qmin {:.4} must be less than qmax {:.4}",
                self.qmin, self.qmax
            )));
        }
        if !(self.rmin < self.rmax) || !(self.rstep > 0.0) {
            return Err(PairdistError::InvalidRange(format!(
                "bad r grid [{:.4}, {:.4}] step {:.4}",
                self.rmin, self.rmax, self.rstep
            )));
        }
        if !(self.tail_fraction > 0.0 && self.tail_fraction <= 1.0) {
            return Err(PairdistError::InvalidRange(format!(
                "tail fraction {:.4} must be in (0, 1]",
                self.tail_fraction
            )));
        }
        Ok(())
    }
}

/// 变换的三个阶段产物
#[derive(Debug, Clone)]
pub struct Transformed {
    /// 结构因子 S(Q)
    pub sq: Curve,
    /// 约化结构因子 F(Q) = Q·(S(Q)-1)
    pub fq: Curve,
    /// 约化对分布函数 G(r)
    pub gr: Curve,
}

/// 从 I(Q) 曲线计算 PDF
pub fn get_pdf(config: &PdfConfig, chi: &Curve) -> Result<Transformed> {
    config.validate()?;

    let windowed = chi.sliced(config.qmin, config.qmax)?;

    // 高 Q 尾部均值归一：S(Q) -> 1
    let n = windowed.len();
    let tail_len = ((n as f64 * config.tail_fraction).ceil() as usize).clamp(1, n);
    let tail_mean: f64 =
        windowed.y[n - tail_len..].iter().sum::<f64>() / tail_len as f64;
    if tail_mean.abs() < 1e-12 {
        return Err(PairdistError::Configuration(
            "high-Q tail averages to zero, cannot normalize".to_string(),
        ));
    }

    let sq_y: Vec<f64> = windowed.y.iter().map(|v| v / tail_mean).collect();
    let fq_y: Vec<f64> = windowed
        .x
        .iter()
        .zip(sq_y.iter())
        .map(|(&q, &s)| q * (s - 1.0))
        .collect();

    // 正弦变换: G(r) = (2/π) ∫ F(Q) sin(Qr) dQ，梯形积分
    let r_grid = arange_inclusive(config.rmin, config.rmax, config.rstep);
    let q = &windowed.x;
    let gr_y: Vec<f64> = r_grid
        .iter()
        .map(|&r| {
            let mut acc = 0.0;
            for i in 1..q.len() {
                let dq = q[i] - q[i - 1];
                let f0 = fq_y[i - 1] * (q[i - 1] * r).sin();
                let f1 = fq_y[i] * (q[i] * r).sin();
                acc += 0.5 * (f0 + f1) * dq;
            }
            2.0 / PI * acc
        })
        .collect();

    let sq = Curve::new(windowed.x.clone(), sq_y)?;
    let fq = Curve::new(windowed.x, fq_y)?;
    let gr = Curve::new(r_grid, gr_y)?;

    Ok(Transformed { sq, fq, gr })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 单一距离信号: I(Q) = 1 + sin(Q d)/Q，对应 G(r) 在 r = d 出峰
    fn synthetic_chi(d: f64) -> Curve {
        let q: Vec<f64> = (1..2400).map(|i| i as f64 * 0.01).collect();
        let y: Vec<f64> = q.iter().map(|&qi| 1.0 + (qi * d).sin() / qi).collect();
        Curve::new(q, y).unwrap()
    }

    #[test]
    fn test_sq_normalized_to_one() {
        let config = PdfConfig::default().with_qrange(1.0, 23.0);
        let out = get_pdf(&config, &synthetic_chi(2.5)).unwrap();

        let n = out.sq.len();
        let tail_mean: f64 = out.sq.y[n - 10..].iter().sum::<f64>() / 10.0;
        assert!((tail_mean - 1.0).abs() < 0.05);
    }

    #[test]
    fn test_gr_peak_at_expected_distance() {
        let d = 2.5;
        let config = PdfConfig::default()
            .with_qrange(1.0, 23.0)
            .with_rrange(1.0, 6.0, 0.01);
        let out = get_pdf(&config, &synthetic_chi(d)).unwrap();

        let (imax, _) = out
            .gr
            .y
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap();
        let peak_r = out.gr.x[imax];
        assert!((peak_r - d).abs() < 0.1, "peak at {}", peak_r);
    }

    #[test]
    fn test_bad_config_rejected() {
        let chi = synthetic_chi(2.5);
        assert!(get_pdf(&PdfConfig::default().with_qrange(5.0, 1.0), &chi).is_err());
        assert!(get_pdf(&PdfConfig::default().with_rrange(3.0, 1.0, 0.01), &chi).is_err());
    }

    #[test]
    fn test_qrange_outside_data_rejected() {
        let chi = synthetic_chi(2.5);
        // 数据只到 23.99 Å⁻¹
        let config = PdfConfig::default().with_qrange(30.0, 40.0);
        assert!(get_pdf(&config, &chi).is_err());
    }
}
