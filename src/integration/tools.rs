//! # 积分流水线工具
//!
//! 背景扣除、自动掩模与方位角积分。设置对象是不可变记录：
//! 每次调用从命名默认值出发，经 `with_*` 显式覆盖得到新配置，
//! 不存在共享可变默认字典。
//!
//! ## 依赖关系
//! - 被 `commands/integrate.rs` 使用
//! - 使用 `integration/image.rs`, `integration/geometry.rs`
//! - 使用 `models/curve.rs`

use crate::error::{PairdistError, Result};
use crate::integration::geometry::Geometry;
use crate::integration::image::Image;
use crate::models::Curve;

/// 自动掩模设置（不可变记录）
#[derive(Debug, Clone, Copy)]
pub struct MaskSettings {
    /// 离群判据：|I - 分组均值| > alpha * 分组标准差
    pub alpha: f64,
    /// 统计分组数
    pub bins: usize,
    /// 探测器边缘修剪宽度（像素）
    pub edge: usize,
}

impl Default for MaskSettings {
    fn default() -> Self {
        MaskSettings {
            alpha: 2.0,
            bins: 128,
            edge: 1,
        }
    }
}

impl MaskSettings {
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_bins(mut self, bins: usize) -> Self {
        self.bins = bins;
        self
    }

    pub fn with_edge(mut self, edge: usize) -> Self {
        self.edge = edge;
        self
    }
}

/// 积分设置（不可变记录）
#[derive(Debug, Clone, Copy)]
pub struct IntegSettings {
    /// 输出曲线的点数
    pub npt: usize,
    /// Q 下限；None 取图像覆盖的最小 Q
    pub qmin: Option<f64>,
    /// Q 上限；None 取图像覆盖的最大 Q
    pub qmax: Option<f64>,
}

impl Default for IntegSettings {
    fn default() -> Self {
        IntegSettings {
            npt: 1480,
            qmin: None,
            qmax: None,
        }
    }
}

impl IntegSettings {
    pub fn with_npt(mut self, npt: usize) -> Self {
        self.npt = npt;
        self
    }

    pub fn with_qmin(mut self, qmin: f64) -> Self {
        self.qmin = Some(qmin);
        self
    }

    pub fn with_qmax(mut self, qmax: f64) -> Self {
        self.qmax = Some(qmax);
        self
    }
}

/// 像素掩模：true 为好像素
pub type Mask = Vec<bool>;

/// 扣除缩放后的背景图像，返回新图像；形状不匹配报错
pub fn bg_sub(img: &Image, bg: &Image, bg_scale: Option<f64>) -> Result<Image> {
    if img.shape() != bg.shape() {
        return Err(PairdistError::Configuration(format!(
            "unmatched shape between bg and image: {:?}, {:?}",
            bg.shape(),
            img.shape()
        )));
    }
    let scale = bg_scale.unwrap_or(1.0);

    let data: Vec<f64> = img
        .pixels()
        .iter()
        .zip(bg.pixels().iter())
        .map(|(v, b)| v - scale * b)
        .collect();
    Image::new(data, img.rows(), img.cols())
}

/// 自动掩模：按 Q 分组统计，剔除离群像素和探测器边缘
///
/// 返回掩模与生效的完整设置。
pub fn auto_mask(
    img: &Image,
    geometry: &Geometry,
    settings: &MaskSettings,
) -> Result<(Mask, MaskSettings)> {
    let (rows, cols) = img.shape();
    let q_map = geometry.q_map(rows, cols);

    let q_max = q_map.iter().fold(0.0_f64, |m, &q| m.max(q));
    if q_max <= 0.0 {
        return Err(PairdistError::Configuration(
            "geometry yields zero Q coverage".to_string(),
        ));
    }
    let nbins = settings.bins.max(1);
    let bin_of = |q: f64| ((q / q_max * nbins as f64) as usize).min(nbins - 1);

    // 两遍统计：均值，再标准差
    let mut sums = vec![0.0; nbins];
    let mut counts = vec![0usize; nbins];
    for (pixel, &q) in img.pixels().iter().zip(q_map.iter()) {
        let b = bin_of(q);
        sums[b] += pixel;
        counts[b] += 1;
    }
    let means: Vec<f64> = sums
        .iter()
        .zip(counts.iter())
        .map(|(&s, &c)| if c > 0 { s / c as f64 } else { 0.0 })
        .collect();

    let mut sq_sums = vec![0.0; nbins];
    for (pixel, &q) in img.pixels().iter().zip(q_map.iter()) {
        let b = bin_of(q);
        let d = pixel - means[b];
        sq_sums[b] += d * d;
    }
    let stds: Vec<f64> = sq_sums
        .iter()
        .zip(counts.iter())
        .map(|(&s, &c)| if c > 1 { (s / c as f64).sqrt() } else { 0.0 })
        .collect();

    let mut mask = vec![true; rows * cols];
    for row in 0..rows {
        for col in 0..cols {
            let idx = row * cols + col;

            // 边缘修剪
            if row < settings.edge
                || col < settings.edge
                || row >= rows - settings.edge
                || col >= cols - settings.edge
            {
                mask[idx] = false;
                continue;
            }

            let b = bin_of(q_map[idx]);
            if stds[b] > 0.0 && (img.pixels()[idx] - means[b]).abs() > settings.alpha * stds[b] {
                mask[idx] = false;
            }
        }
    }

    Ok((mask, *settings))
}

/// 方位角积分：好像素按 Q 分箱求平均强度
///
/// 返回两行曲线（第一行为 Q 分箱中心，第二行为平均强度）与
/// 生效的完整设置。
pub fn integrate(
    img: &Image,
    geometry: &Geometry,
    mask: Option<&Mask>,
    settings: &IntegSettings,
) -> Result<(Curve, IntegSettings)> {
    let (rows, cols) = img.shape();
    if let Some(mask) = mask {
        if mask.len() != rows * cols {
            return Err(PairdistError::Configuration(format!(
                "mask length {} does not match image {}x{}",
                mask.len(),
                rows,
                cols
            )));
        }
    }
    if settings.npt < 2 {
        return Err(PairdistError::Configuration(
            "integration needs at least two output points".to_string(),
        ));
    }

    let q_map = geometry.q_map(rows, cols);
    let qmin = settings
        .qmin
        .unwrap_or_else(|| q_map.iter().fold(f64::INFINITY, |m, &q| m.min(q)));
    let qmax = settings
        .qmax
        .unwrap_or_else(|| q_map.iter().fold(0.0_f64, |m, &q| m.max(q)));
    if !(qmin < qmax) {
        return Err(PairdistError::InvalidRange(format!(
            "qmin {:.4} must be less than qmax {:.4}",
            qmin, qmax
        )));
    }

    let npt = settings.npt;
    let width = (qmax - qmin) / npt as f64;
    let mut sums = vec![0.0; npt];
    let mut counts = vec![0usize; npt];

    for (idx, (&q, pixel)) in q_map.iter().zip(img.pixels().iter()).enumerate() {
        if let Some(mask) = mask {
            if !mask[idx] {
                continue;
            }
        }
        if q < qmin || q > qmax {
            continue;
        }
        let b = (((q - qmin) / width) as usize).min(npt - 1);
        sums[b] += pixel;
        counts[b] += 1;
    }

    let x: Vec<f64> = (0..npt).map(|i| qmin + (i as f64 + 0.5) * width).collect();
    let y: Vec<f64> = sums
        .iter()
        .zip(counts.iter())
        .map(|(&s, &c)| if c > 0 { s / c as f64 } else { 0.0 })
        .collect();

    Ok((Curve::new(x, y)?, *settings))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_image(rows: usize, cols: usize, value: f64) -> Image {
        Image::new(vec![value; rows * cols], rows, cols).unwrap()
    }

    fn test_geometry() -> Geometry {
        Geometry::new(0.1854, 200.0, (32.0, 32.0), 0.5).unwrap()
    }

    #[test]
    fn test_bg_sub_shape_mismatch_fails() {
        let img = flat_image(4, 4, 10.0);
        let bg = flat_image(4, 5, 1.0);
        assert!(bg_sub(&img, &bg, None).is_err());
    }

    #[test]
    fn test_bg_sub_scaled() {
        let img = flat_image(4, 4, 10.0);
        let bg = flat_image(4, 4, 4.0);
        let out = bg_sub(&img, &bg, Some(0.5)).unwrap();
        assert!(out.pixels().iter().all(|&v| (v - 8.0).abs() < 1e-12));
    }

    #[test]
    fn test_auto_mask_flags_hot_pixel() {
        let mut img = flat_image(64, 64, 100.0);
        // 同一 Q 环上的其他像素都是 100，热点必然离群
        img.set(20, 20, 1e6);

        let (mask, settings) = auto_mask(&img, &test_geometry(), &MaskSettings::default()).unwrap();
        assert!(!mask[20 * 64 + 20]);
        assert!((settings.alpha - 2.0).abs() < 1e-12);

        // 普通像素保留
        assert!(mask[30 * 64 + 25]);
    }

    #[test]
    fn test_auto_mask_trims_edges() {
        let img = flat_image(16, 16, 1.0);
        let settings = MaskSettings::default().with_edge(2);
        let (mask, _) = auto_mask(&img, &test_geometry(), &settings).unwrap();
        assert!(!mask[0]);
        assert!(!mask[1 * 16 + 1]);
        assert!(mask[8 * 16 + 8]);
    }

    #[test]
    fn test_integrate_flat_image_is_flat() {
        let img = flat_image(64, 64, 5.0);
        let settings = IntegSettings::default().with_npt(32);
        let (curve, _) = integrate(&img, &test_geometry(), None, &settings).unwrap();

        assert_eq!(curve.len(), 32);
        for &v in &curve.y {
            // 空分箱为 0，有像素的分箱应为 5
            assert!(v == 0.0 || (v - 5.0).abs() < 1e-9);
        }
        assert!(curve.y.iter().filter(|&&v| v > 0.0).count() > 16);
    }

    #[test]
    fn test_integrate_respects_mask() {
        let mut img = flat_image(64, 64, 5.0);
        img.set(40, 40, 1e9);

        let (mask, _) = auto_mask(&img, &test_geometry(), &MaskSettings::default()).unwrap();
        let settings = IntegSettings::default().with_npt(32);
        let (curve, _) = integrate(&img, &test_geometry(), Some(&mask), &settings).unwrap();

        // 热点被掩掉后曲线仍然平坦
        for &v in &curve.y {
            assert!(v == 0.0 || (v - 5.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_settings_override_layering() {
        let base = IntegSettings::default();
        let custom = base.with_npt(256).with_qmax(20.0);

        // 原默认记录不被修改
        assert_eq!(base.npt, 1480);
        assert!(base.qmax.is_none());
        assert_eq!(custom.npt, 256);
        assert_eq!(custom.qmax, Some(20.0));
    }
}
