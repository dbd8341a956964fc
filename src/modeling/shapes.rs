//! # 纳米颗粒特征函数
//!
//! 提供可注册进贡献方程的内置形状包络函数。特征函数描述有限尺寸
//! 颗粒对 PDF 峰强的衰减，逐点作用在 r 网格上。
//!
//! ## 依赖关系
//! - 被 `modeling/config.rs` 注册、`commands/fit.rs` 引用
//! - 无外部模块依赖

/// 球形颗粒特征函数
///
/// `args[0]` 为颗粒直径 psize (Å)。r >= psize 时包络为 0。
pub fn sphere_cf(r: &[f64], args: &[f64]) -> Vec<f64> {
    let psize = args.first().copied().unwrap_or(0.0);
    r.iter()
        .map(|&ri| {
            if psize <= 0.0 || ri >= psize {
                0.0
            } else {
                let x = ri / psize;
                1.0 - 1.5 * x + 0.5 * x * x * x
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_cf_limits() {
        let r = vec![0.0, 25.0, 50.0, 60.0];
        let out = sphere_cf(&r, &[50.0]);

        // r=0 时包络为 1，r>=psize 时为 0
        assert!((out[0] - 1.0).abs() < 1e-12);
        assert!(out[1] > 0.0 && out[1] < 1.0);
        assert!(out[2].abs() < 1e-12);
        assert!(out[3].abs() < 1e-12);
    }

    #[test]
    fn test_sphere_cf_monotone_decreasing() {
        let r: Vec<f64> = (0..100).map(|i| i as f64 * 0.5).collect();
        let out = sphere_cf(&r, &[40.0]);
        for w in out.windows(2) {
            assert!(w[1] <= w[0] + 1e-12);
        }
    }

    #[test]
    fn test_sphere_cf_zero_size() {
        let out = sphere_cf(&[1.0, 2.0], &[0.0]);
        assert!(out.iter().all(|&v| v == 0.0));
    }
}
