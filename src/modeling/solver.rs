//! # Levenberg-Marquardt 最小二乘求解器
//!
//! 对配方的自由变量做阻尼最小二乘优化。雅可比用前向差分数值估计，
//! 法方程用 SVD 求解以容忍病态；参数不确定度取协方差矩阵对角。
//!
//! 终止状态原样上报，不做重试：达到收敛判据返回 Converged，
//! 步长无法再改进返回 Stalled，超出迭代预算返回 MaxIterations。
//!
//! ## 依赖关系
//! - 被 `modeling/fitting.rs` 调用
//! - 使用 `nalgebra` 的 DMatrix/DVector 与 SVD

use nalgebra::{DMatrix, DVector};

use crate::error::{PairdistError, Result};

/// 求解器选项
#[derive(Debug, Clone)]
pub struct SolverOptions {
    /// 最大迭代次数
    pub max_iter: usize,
    /// 代价相对变化收敛判据
    pub ftol: f64,
    /// 步长收敛判据
    pub xtol: f64,
    /// 梯度收敛判据
    pub gtol: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            max_iter: 100,
            ftol: 1e-10,
            xtol: 1e-10,
            gtol: 1e-10,
        }
    }
}

/// 终止状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    /// 满足收敛判据
    Converged,
    /// 阻尼增至上限仍无改进
    Stalled,
    /// 迭代预算耗尽
    MaxIterations,
}

impl std::fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverStatus::Converged => write!(f, "converged"),
            SolverStatus::Stalled => write!(f, "stalled"),
            SolverStatus::MaxIterations => write!(f, "max-iterations"),
        }
    }
}

/// 求解结果
#[derive(Debug, Clone)]
pub struct SolverOutcome {
    /// 优化后的参数值
    pub params: Vec<f64>,
    /// 终止状态
    pub status: SolverStatus,
    /// 最终代价 0.5 Σ r²
    pub cost: f64,
    /// 参数标准差（m > n 时可用）
    pub stderr: Option<Vec<f64>>,
    /// 实际迭代次数
    pub iterations: usize,
}

/// 残差函数签名
pub type ResidualFn<'a> = dyn FnMut(&[f64]) -> Result<Vec<f64>> + 'a;

/// 阻尼最小二乘主循环
pub fn levenberg_marquardt(
    residual_fn: &mut ResidualFn,
    p0: &[f64],
    bounds: &[(f64, f64)],
    options: &SolverOptions,
) -> Result<SolverOutcome> {
    if p0.is_empty() {
        return Err(PairdistError::Solver("no parameters to optimize".to_string()));
    }
    if bounds.len() != p0.len() {
        return Err(PairdistError::Solver(format!(
            "{} bounds for {} parameters",
            bounds.len(),
            p0.len()
        )));
    }

    let n = p0.len();
    let mut p: Vec<f64> = p0
        .iter()
        .zip(bounds.iter())
        .map(|(&v, &(lo, hi))| v.clamp(lo, hi))
        .collect();

    let mut residuals = eval_residuals(residual_fn, &p)?;
    let m = residuals.len();
    if m < 2 {
        return Err(PairdistError::Solver(
            "residual vector is too short".to_string(),
        ));
    }
    let mut cost = half_ssq(&residuals);

    let mut lambda = 1e-3;
    let mut status = SolverStatus::MaxIterations;
    let mut iterations = 0;
    let mut jacobian = DMatrix::<f64>::zeros(m, n);

    for iter in 0..options.max_iter {
        iterations = iter + 1;

        // 前向差分雅可比
        for j in 0..n {
            let h = 1e-6 * p[j].abs().max(1e-4);
            let mut p_step = p.clone();
            p_step[j] += h;
            let r_step = eval_residuals(residual_fn, &p_step)?;
            if r_step.len() != m {
                return Err(PairdistError::Solver(
                    "residual length changed during iteration".to_string(),
                ));
            }
            for i in 0..m {
                jacobian[(i, j)] = (r_step[i] - residuals[i]) / h;
            }
        }

        let r_vec = DVector::from_column_slice(&residuals);
        let jtj = jacobian.transpose() * &jacobian;
        let jtr = jacobian.transpose() * &r_vec;

        // 梯度判据
        if jtr.amax() < options.gtol {
            status = SolverStatus::Converged;
            break;
        }

        // 内层：调整阻尼直到代价下降
        let mut improved = false;
        while lambda < 1e12 {
            let mut damped = jtj.clone();
            for j in 0..n {
                damped[(j, j)] += lambda * jtj[(j, j)].max(1e-12);
            }

            let Some(delta) = solve_normal_equations(&damped, &jtr) else {
                lambda *= 10.0;
                continue;
            };

            let p_trial: Vec<f64> = p
                .iter()
                .zip(delta.iter())
                .zip(bounds.iter())
                .map(|((&pi, &di), &(lo, hi))| (pi - di).clamp(lo, hi))
                .collect();

            let r_trial = eval_residuals(residual_fn, &p_trial)?;
            let cost_trial = half_ssq(&r_trial);

            if cost_trial < cost {
                let step_norm: f64 = p_trial
                    .iter()
                    .zip(p.iter())
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f64>()
                    .sqrt();
                let cost_drop = cost - cost_trial;

                p = p_trial;
                residuals = r_trial;
                cost = cost_trial;
                lambda = (lambda * 0.3).max(1e-12);
                improved = true;

                if cost_drop < options.ftol * cost.max(1e-12) || step_norm < options.xtol {
                    status = SolverStatus::Converged;
                }
                break;
            }
            lambda *= 10.0;
        }

        if !improved {
            status = SolverStatus::Stalled;
            break;
        }
        if status == SolverStatus::Converged {
            break;
        }
    }

    // 协方差对角 -> 标准差；自由度不足时不给出
    let stderr = if m > n {
        let jtj = jacobian.transpose() * &jacobian;
        let dof = (m - n) as f64;
        let s2 = 2.0 * cost / dof;
        jtj.pseudo_inverse(1e-12).ok().map(|cov| {
            (0..n)
                .map(|j| (cov[(j, j)] * s2).max(0.0).sqrt())
                .collect()
        })
    } else {
        None
    };

    Ok(SolverOutcome {
        params: p,
        status,
        cost,
        stderr,
        iterations,
    })
}

fn eval_residuals(residual_fn: &mut ResidualFn, p: &[f64]) -> Result<Vec<f64>> {
    let r = residual_fn(p)?;
    if r.iter().any(|v| !v.is_finite()) {
        return Err(PairdistError::Solver(
            "residuals are not finite".to_string(),
        ));
    }
    Ok(r)
}

fn half_ssq(r: &[f64]) -> f64 {
    0.5 * r.iter().map(|v| v * v).sum::<f64>()
}

/// SVD 求解法方程；逐级放宽容差以容忍近奇异
fn solve_normal_equations(a: &DMatrix<f64>, b: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = a.clone().svd(true, true);
    for &tol in &[1e-12, 1e-9, 1e-6] {
        if let Ok(x) = svd.solve(b, tol) {
            if x.iter().all(|v| v.is_finite()) {
                return Some(x);
            }
        }
    }
    None
}
