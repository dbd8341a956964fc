//! # 曲线图表生成
//!
//! 使用 `plotters` 为一维曲线（积分强度或 G(r)）生成单曲线图。
//!
//! ## 依赖关系
//! - 被 `commands/integrate.rs`, `commands/transform.rs` 调用
//! - 使用 `models/curve.rs` 的 Curve
//! - 使用 `plotters` 渲染图表

use plotters::prelude::*;
use std::path::Path;

use crate::error::{PairdistError, Result};
use crate::models::Curve;

/// 生成单曲线图；输出格式由扩展名决定 (.svg 为矢量，其余为 PNG)
pub fn vis_curve(
    curve: &Curve,
    output_path: &Path,
    title: &str,
    x_desc: &str,
    y_desc: &str,
    width: u32,
    height: u32,
) -> Result<()> {
    let use_svg = output_path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("svg"))
        .unwrap_or(false);

    if use_svg {
        let root = SVGBackend::new(output_path, (width, height)).into_drawing_area();
        draw_curve_chart(&root, curve, title, x_desc, y_desc)?;
        root.present()
            .map_err(|e| PairdistError::Other(e.to_string()))?;
    } else {
        let root = BitMapBackend::new(output_path, (width, height)).into_drawing_area();
        draw_curve_chart(&root, curve, title, x_desc, y_desc)?;
        root.present()
            .map_err(|e| PairdistError::Other(e.to_string()))?;
    }
    Ok(())
}

fn draw_curve_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    curve: &Curve,
    title: &str,
    x_desc: &str,
    y_desc: &str,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)
        .map_err(|e| PairdistError::Other(format!("{:?}", e)))?;

    let (x_min, x_max) = curve.x_range();
    let y_max = curve.y.iter().fold(f64::NEG_INFINITY, |m, &v| m.max(v));
    let y_min = curve.y.iter().fold(f64::INFINITY, |m, &v| m.min(v));
    let pad = (y_max - y_min).max(1e-6) * 0.05;

    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 28).into_font())
        .margin(30)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, (y_min - pad)..(y_max + pad))
        .map_err(|e| PairdistError::Other(format!("{:?}", e)))?;

    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .x_label_style(("sans-serif", 16))
        .y_label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .draw()
        .map_err(|e| PairdistError::Other(format!("{:?}", e)))?;

    chart
        .draw_series(LineSeries::new(
            curve.x.iter().zip(curve.y.iter()).map(|(&x, &y)| (x, y)),
            RGBColor(0, 102, 204).stroke_width(2),
        ))
        .map_err(|e| PairdistError::Other(format!("{:?}", e)))?;

    Ok(())
}
