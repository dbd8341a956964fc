//! # PDF 生成器
//!
//! 从晶体结构计算约化对分布函数 G(r) 的核心引擎。
//!
//! ## 算法概述
//! 1. 按 rmax 确定超胞尺寸，枚举中心胞原子与全部镜像原子的对距离
//! 2. 按 Faber-Ziman 权重归并为距离壳层（预计算，lat=1）
//! 3. 求值时壳层距离按 lat 缩放，峰宽由 Uiso/delta2/qbroad 决定
//! 4. 高斯展宽叠加后除以 r，减去 -4πrρ0 基线，乘 qdamp 仪器包络
//!
//! ## 可寻址参数
//! scale, lat, uiso, delta2, qdamp, qbroad（见 PARAM_NAMES）
//!
//! ## 依赖关系
//! - 被 `modeling/recipe.rs` 调用
//! - 使用 `models/structure.rs` 的 Crystal, Lattice
//! - 使用 `modeling/scattering.rs` 获取散射权重
//! - 使用 `rayon` 按 ncpu 提示并行网格求值

use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::sync::Arc;

use rayon::prelude::*;

use crate::error::{PairdistError, Result};
use crate::models::Crystal;
use crate::modeling::config::GenConfig;
use crate::modeling::scattering;

/// 生成器可寻址参数名（与 param_defaults 顺序一致）
pub const PARAM_NAMES: &[&str] = &["scale", "lat", "uiso", "delta2", "qdamp", "qbroad"];

const SCALE: usize = 0;
const LAT: usize = 1;
const UISO: usize = 2;
const DELTA2: usize = 3;
const QDAMP: usize = 4;
const QBROAD: usize = 5;

/// 距离壳层合并容差 (Å)
const SHELL_TOL: f64 = 1e-4;

/// 预计算的距离壳层（lat = 1）
#[derive(Debug, Clone, Copy)]
struct Shell {
    distance: f64,
    weight: f64,
}

/// PDF 生成器：一个结构物相的 G(r) 计算器
#[derive(Debug, Clone)]
pub struct PdfGenerator {
    name: String,
    structure: Arc<Crystal>,
    ncpu: Option<usize>,
    shells: Vec<Shell>,
    rho0: f64,
    rmax: f64,
}

impl PdfGenerator {
    /// 由生成器配置构建；rmax 决定超胞覆盖范围
    pub fn build(config: &GenConfig, rmax: f64) -> Result<Self> {
        let structure = Arc::clone(&config.structure);
        if structure.atoms.is_empty() {
            return Err(PairdistError::Configuration(format!(
                "structure '{}' has no atoms",
                structure.name
            )));
        }

        // 先确认所有元素可查权重
        let amplitudes: Vec<f64> = structure
            .atoms
            .iter()
            .map(|atom| {
                scattering::amplitude(&atom.element).ok_or_else(|| {
                    PairdistError::Configuration(format!(
                        "no scattering amplitude for element '{}' in structure '{}'",
                        atom.element, structure.name
                    ))
                })
            })
            .collect::<Result<_>>()?;

        let shells = collect_shells(&structure, &amplitudes, rmax);
        let rho0 = structure.number_density();

        Ok(PdfGenerator {
            name: config.name.clone(),
            structure,
            ncpu: config.ncpu,
            shells,
            rho0,
            rmax,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn structure(&self) -> &Crystal {
        &self.structure
    }

    /// 参数默认值；uiso 取结构内原子的平均值
    pub fn param_defaults(&self) -> Vec<f64> {
        let mean_uiso = self.structure.atoms.iter().map(|a| a.uiso).sum::<f64>()
            / self.structure.atoms.len() as f64;
        vec![1.0, 1.0, mean_uiso, 0.0, 0.0, 0.0]
    }

    /// 在网格上计算 G(r)；values 按 PARAM_NAMES 顺序
    pub fn evaluate(&self, r: &[f64], values: &[f64]) -> Result<Vec<f64>> {
        if values.len() != PARAM_NAMES.len() {
            return Err(PairdistError::Configuration(format!(
                "generator '{}' expects {} parameter values, got {}",
                self.name,
                PARAM_NAMES.len(),
                values.len()
            )));
        }
        // 壳层枚举到 rmax + 1 Å，lat 缩放后仍需覆盖整个网格
        if let Some(&rlast) = r.last() {
            let coverage = (self.rmax + 1.0) * values[LAT];
            if rlast > coverage + 1e-9 {
                return Err(PairdistError::InvalidRange(format!(
                    "grid extends to {:.4} beyond generator coverage {:.4}",
                    rlast, coverage
                )));
            }
        }

        let scale = values[SCALE];
        let lat = values[LAT];
        let uiso = values[UISO].max(1e-5);
        let delta2 = values[DELTA2];
        let qdamp = values[QDAMP];
        let qbroad = values[QBROAD];

        // lat 缩放后的壳层与有效峰宽
        let peaks: Vec<(f64, f64, f64)> = self
            .shells
            .iter()
            .map(|shell| {
                let d = shell.distance * lat;
                let mut var = 2.0 * uiso;
                if delta2 != 0.0 && d > 0.0 {
                    var *= (1.0 - delta2 / (d * d)).max(0.05);
                }
                var += (qbroad * d) * (qbroad * d);
                (d, var.sqrt(), shell.weight)
            })
            .collect();

        // 密度随晶格膨胀变化
        let rho = self.rho0 / (lat * lat * lat);

        let eval_point = |&ri: &f64| -> f64 {
            let mut acc = 0.0;
            for &(d, sigma, weight) in &peaks {
                let dr = ri - d;
                if dr.abs() > 6.0 * sigma {
                    continue;
                }
                let gauss = (-dr * dr / (2.0 * sigma * sigma)).exp()
                    / (sigma * (2.0 * PI).sqrt());
                acc += weight * gauss;
            }
            let mut g = if ri > 1e-9 {
                acc / ri - 4.0 * PI * ri * rho
            } else {
                0.0
            };
            if qdamp > 0.0 {
                g *= (-(ri * qdamp) * (ri * qdamp) / 2.0).exp();
            }
            scale * g
        };

        // ncpu 提示：专用线程池并行网格求值
        let out = match self.ncpu {
            Some(n) if n > 1 => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| PairdistError::Other(e.to_string()))?;
                pool.install(|| r.par_iter().map(eval_point).collect())
            }
            _ => r.iter().map(eval_point).collect(),
        };

        Ok(out)
    }
}

/// 枚举超胞内的对距离并归并为壳层
fn collect_shells(crystal: &Crystal, amplitudes: &[f64], rmax: f64) -> Vec<Shell> {
    let reach = rmax + 1.0;
    let (a, b, c, _, _, _) = crystal.lattice.parameters();
    let na = (reach / a).ceil() as i32 + 1;
    let nb = (reach / b).ceil() as i32 + 1;
    let nc = (reach / c).ceil() as i32 + 1;

    let cart: Vec<[f64; 3]> = crystal
        .atoms
        .iter()
        .map(|atom| crystal.lattice.frac_to_cart(&atom.position))
        .collect();

    // 归一化因子: N <b>²，b 按占据率加权
    let n_atoms = crystal.atoms.len() as f64;
    let mean_b: f64 = amplitudes
        .iter()
        .zip(crystal.atoms.iter())
        .map(|(&b, atom)| b * atom.occupancy)
        .sum::<f64>()
        / n_atoms;
    let norm = n_atoms * mean_b * mean_b;

    // 镜像平移向量只枚举一次
    let mut shifts: Vec<[f64; 3]> = Vec::new();
    for ia in -na..=na {
        for ib in -nb..=nb {
            for ic in -nc..=nc {
                shifts.push(crystal.lattice.frac_to_cart(&[ia as f64, ib as f64, ic as f64]));
            }
        }
    }

    let mut bins: BTreeMap<i64, (f64, f64)> = BTreeMap::new();

    for (i, ri) in cart.iter().enumerate() {
        let bi = amplitudes[i] * crystal.atoms[i].occupancy;
        for (j, rj) in cart.iter().enumerate() {
            let bj = amplitudes[j] * crystal.atoms[j].occupancy;
            let w = bi * bj / norm;
            for shift in &shifts {
                let dx = rj[0] + shift[0] - ri[0];
                let dy = rj[1] + shift[1] - ri[1];
                let dz = rj[2] + shift[2] - ri[2];
                let d = (dx * dx + dy * dy + dz * dz).sqrt();
                if d < 1e-6 || d > reach {
                    continue;
                }
                let key = (d / SHELL_TOL).round() as i64;
                let entry = bins.entry(key).or_insert((0.0, 0.0));
                entry.0 += d * w;
                entry.1 += w;
            }
        }
    }

    bins.values()
        .map(|&(dw, w)| Shell {
            distance: dw / w,
            weight: w,
        })
        .collect()
}
