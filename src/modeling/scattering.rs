//! # 散射权重数据库
//!
//! 提供 PDF 权重计算用的有效散射振幅。X 射线 PDF 的 Faber-Ziman
//! 权重 w_ij = f_i f_j / <f>² 在 Q→0 极限下用电子数近似 f(0) ≈ Z，
//! 对总散射数据这是常用且足够的近似。
//!
//! ## 依赖关系
//! - 被 `modeling/generator.rs` 调用计算对权重
//! - 纯静态数据，无外部依赖

use std::collections::HashMap;
use std::sync::LazyLock;

/// 元素 -> 有效散射振幅（电子数）
static AMPLITUDES: LazyLock<HashMap<&'static str, f64>> = LazyLock::new(|| {
    let entries: &[(&str, f64)] = &[
        ("H", 1.0),
        ("Li", 3.0),
        ("Be", 4.0),
        ("B", 5.0),
        ("C", 6.0),
        ("N", 7.0),
        ("O", 8.0),
        ("F", 9.0),
        ("Na", 11.0),
        ("Mg", 12.0),
        ("Al", 13.0),
        ("Si", 14.0),
        ("P", 15.0),
        ("S", 16.0),
        ("Cl", 17.0),
        ("K", 19.0),
        ("Ca", 20.0),
        ("Ti", 22.0),
        ("V", 23.0),
        ("Cr", 24.0),
        ("Mn", 25.0),
        ("Fe", 26.0),
        ("Co", 27.0),
        ("Ni", 28.0),
        ("Cu", 29.0),
        ("Zn", 30.0),
        ("Ga", 31.0),
        ("Ge", 32.0),
        ("Se", 34.0),
        ("Br", 35.0),
        ("Sr", 38.0),
        ("Y", 39.0),
        ("Zr", 40.0),
        ("Nb", 41.0),
        ("Mo", 42.0),
        ("Ru", 44.0),
        ("Rh", 45.0),
        ("Pd", 46.0),
        ("Ag", 47.0),
        ("Cd", 48.0),
        ("In", 49.0),
        ("Sn", 50.0),
        ("Sb", 51.0),
        ("Te", 52.0),
        ("I", 53.0),
        ("Cs", 55.0),
        ("Ba", 56.0),
        ("La", 57.0),
        ("Ce", 58.0),
        ("W", 74.0),
        ("Pt", 78.0),
        ("Au", 79.0),
        ("Pb", 82.0),
        ("Bi", 83.0),
    ];
    entries.iter().copied().collect()
});

/// 查询元素的有效散射振幅；未知元素返回 None
pub fn amplitude(element: &str) -> Option<f64> {
    AMPLITUDES.get(element).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_elements() {
        assert!((amplitude("Ni").unwrap() - 28.0).abs() < 1e-12);
        assert!((amplitude("O").unwrap() - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_element() {
        assert!(amplitude("Xx").is_none());
    }
}
