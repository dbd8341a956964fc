//! # 拟合可视化
//!
//! 使用 `plotters` 为每个贡献生成观测/计算/残差对比图。
//! 对配方只读。
//!
//! ## 依赖关系
//! - 被 `commands/fit.rs` 调用
//! - 使用 `modeling/recipe.rs` 的 Recipe
//! - 使用 `plotters` 渲染图表

use plotters::prelude::*;
use std::path::{Path, PathBuf};

use crate::error::{PairdistError, Result};
use crate::modeling::recipe::Recipe;

/// 为每个贡献生成一张拟合对比图，返回输出文件路径
pub fn view_fits(
    recipe: &Recipe,
    out_dir: &Path,
    width: u32,
    height: u32,
    use_svg: bool,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir).map_err(|e| PairdistError::FileWriteError {
        path: out_dir.display().to_string(),
        source: e,
    })?;

    let mut outputs = Vec::new();
    for con in recipe.contributions() {
        let ext = if use_svg { "svg" } else { "png" };
        let path = out_dir.join(format!("{}_fit.{}", con.name, ext));

        let calc = con.calculate()?;
        if use_svg {
            let root = SVGBackend::new(&path, (width, height)).into_drawing_area();
            draw_fit_chart(&root, &con.name, con.grid(), con.observed(), &calc)?;
            root.present()
                .map_err(|e| PairdistError::Other(e.to_string()))?;
        } else {
            let root = BitMapBackend::new(&path, (width, height)).into_drawing_area();
            draw_fit_chart(&root, &con.name, con.grid(), con.observed(), &calc)?;
            root.present()
                .map_err(|e| PairdistError::Other(e.to_string()))?;
        }
        outputs.push(path);
    }

    Ok(outputs)
}

/// 绘制单个贡献的对比图：观测散点、计算曲线、下方偏移的差值曲线
fn draw_fit_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    title: &str,
    r: &[f64],
    observed: &[f64],
    calculated: &[f64],
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)
        .map_err(|e| PairdistError::Other(format!("{:?}", e)))?;

    let diff: Vec<f64> = observed
        .iter()
        .zip(calculated.iter())
        .map(|(o, c)| o - c)
        .collect();

    let y_max = observed
        .iter()
        .chain(calculated.iter())
        .fold(f64::NEG_INFINITY, |m, &v| m.max(v));
    let y_min = observed
        .iter()
        .chain(calculated.iter())
        .fold(f64::INFINITY, |m, &v| m.min(v));
    let spread = (y_max - y_min).max(1e-6);

    // 差值曲线压到主曲线下方
    let diff_offset = y_min - 0.3 * spread;
    let x_min = r.first().copied().unwrap_or(0.0);
    let x_max = r.last().copied().unwrap_or(1.0);

    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 28).into_font())
        .margin(30)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(
            x_min..x_max,
            (diff_offset - 0.2 * spread)..(y_max + 0.1 * spread),
        )
        .map_err(|e| PairdistError::Other(format!("{:?}", e)))?;

    chart
        .configure_mesh()
        .x_desc("r (Å)")
        .y_desc("G (Å⁻²)")
        .x_label_style(("sans-serif", 16))
        .y_label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .draw()
        .map_err(|e| PairdistError::Other(format!("{:?}", e)))?;

    // 观测：空心圆点
    let obs_color = RGBColor(60, 60, 60);
    chart
        .draw_series(
            r.iter()
                .zip(observed.iter())
                .map(|(&x, &y)| Circle::new((x, y), 2, obs_color.stroke_width(1))),
        )
        .map_err(|e| PairdistError::Other(format!("{:?}", e)))?
        .label("observed")
        .legend(move |(x, y)| Circle::new((x, y), 3, obs_color.stroke_width(1)));

    // 计算：实线
    let calc_color = RGBColor(204, 51, 51);
    chart
        .draw_series(LineSeries::new(
            r.iter().zip(calculated.iter()).map(|(&x, &y)| (x, y)),
            calc_color.stroke_width(2),
        ))
        .map_err(|e| PairdistError::Other(format!("{:?}", e)))?
        .label("calculated")
        .legend(move |(x, y)| {
            PathElement::new(vec![(x - 5, y), (x + 5, y)], calc_color.stroke_width(2))
        });

    // 差值：偏移实线
    let diff_color = RGBColor(0, 102, 204);
    chart
        .draw_series(LineSeries::new(
            r.iter().zip(diff.iter()).map(|(&x, &d)| (x, d + diff_offset)),
            diff_color.stroke_width(1),
        ))
        .map_err(|e| PairdistError::Other(format!("{:?}", e)))?
        .label("difference")
        .legend(move |(x, y)| {
            PathElement::new(vec![(x - 5, y), (x + 5, y)], diff_color.stroke_width(1))
        });

    chart
        .configure_series_labels()
        .border_style(BLACK)
        .background_style(WHITE.mix(0.8))
        .draw()
        .map_err(|e| PairdistError::Other(format!("{:?}", e)))?;

    Ok(())
}
