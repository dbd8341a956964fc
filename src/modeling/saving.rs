//! # 结果持久化
//!
//! 把拟合结果（变量值、不确定度、逐贡献拟合曲线、文本报告）
//! 写成一个结果包目录。
//!
//! 写入是全有或全无的：所有文件先写进临时目录，最后一次
//! rename 提交；中途任何失败都清理临时目录，目标位置不留半成品。
//!
//! ## 包内容
//! ```text
//! <name>/
//!   <name>.txt           文本报告
//!   <name>_params.csv    variable, value, uncertainty, state
//!   <name>_<con>.fgr     r, gobs, gcalc, gdiff（制表符分隔）
//! ```
//!
//! ## 依赖关系
//! - 被 `commands/fit.rs`, `commands/calib.rs` 使用
//! - 使用 `csv` 写参数表
//! - 使用 `modeling/report.rs` 生成报告文本

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{PairdistError, Result};
use crate::modeling::fitting::FitResult;
use crate::modeling::recipe::Recipe;
use crate::modeling::report::report;

/// 保存结果包；返回最终包目录路径
pub fn save(
    recipe: &Recipe,
    result: Option<&FitResult>,
    dest: &Path,
    name: &str,
) -> Result<PathBuf> {
    if name.is_empty() {
        return Err(PairdistError::Configuration(
            "bundle name must not be empty".to_string(),
        ));
    }

    fs::create_dir_all(dest).map_err(|e| PairdistError::FileWriteError {
        path: dest.display().to_string(),
        source: e,
    })?;

    let stage = dest.join(format!(".tmp-{}", name));
    let bundle = dest.join(name);

    // 残留的临时目录先清掉
    if stage.exists() {
        fs::remove_dir_all(&stage).map_err(|e| PairdistError::FileWriteError {
            path: stage.display().to_string(),
            source: e,
        })?;
    }
    fs::create_dir_all(&stage).map_err(|e| PairdistError::FileWriteError {
        path: stage.display().to_string(),
        source: e,
    })?;

    let written = write_bundle(recipe, result, &stage, name);
    if let Err(e) = written {
        let _ = fs::remove_dir_all(&stage);
        return Err(e);
    }

    // 提交：已有同名包先移除再原子替换
    if bundle.exists() {
        fs::remove_dir_all(&bundle).map_err(|e| PairdistError::FileWriteError {
            path: bundle.display().to_string(),
            source: e,
        })?;
    }
    fs::rename(&stage, &bundle).map_err(|e| PairdistError::FileWriteError {
        path: bundle.display().to_string(),
        source: e,
    })?;

    Ok(bundle)
}

/// 把全部文件写进临时目录
fn write_bundle(
    recipe: &Recipe,
    result: Option<&FitResult>,
    stage: &Path,
    name: &str,
) -> Result<()> {
    write_report(recipe, result, &stage.join(format!("{}.txt", name)))?;
    write_params(recipe, &stage.join(format!("{}_params.csv", name)))?;
    for con in recipe.contributions() {
        write_fgr(
            con.grid(),
            con.observed(),
            &con.calculate()?,
            &stage.join(format!("{}_{}.fgr", name, con.name)),
        )?;
    }
    Ok(())
}

fn write_report(recipe: &Recipe, result: Option<&FitResult>, path: &Path) -> Result<()> {
    fs::write(path, report(recipe, result)).map_err(|e| PairdistError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })
}

/// 参数表：variable, value, uncertainty, state
fn write_params(recipe: &Recipe, path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record(["variable", "value", "uncertainty", "state"])?;
    for var in recipe.variables() {
        wtr.write_record(&[
            var.name.clone(),
            format!("{:.12e}", var.value),
            var.uncertainty
                .map(|u| format!("{:.12e}", u))
                .unwrap_or_default(),
            if var.free { "free" } else { "fixed" }.to_string(),
        ])?;
    }

    wtr.flush().map_err(|e| PairdistError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(())
}

/// 拟合曲线：r, gobs, gcalc, gdiff
fn write_fgr(r: &[f64], observed: &[f64], calculated: &[f64], path: &Path) -> Result<()> {
    let mut file = fs::File::create(path).map_err(|e| PairdistError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })?;

    let mut write = |line: String| -> Result<()> {
        writeln!(file, "{}", line).map_err(|e| PairdistError::FileWriteError {
            path: path.display().to_string(),
            source: e,
        })
    };

    write("# Columns: r (A), gobs, gcalc, gdiff".to_string())?;
    for i in 0..r.len() {
        write(format!(
            "{:.6}\t{:.8e}\t{:.8e}\t{:.8e}",
            r[i],
            observed[i],
            calculated[i],
            observed[i] - calculated[i]
        ))?;
    }
    Ok(())
}

/// 读回参数表，用于核对保存结果
pub fn load_params(path: &Path) -> Result<Vec<(String, f64, Option<f64>)>> {
    let mut rdr = csv::Reader::from_path(path)?;
    let mut out = Vec::new();

    for record in rdr.records() {
        let record = record?;
        let name = record.get(0).unwrap_or_default().to_string();
        let value: f64 = record
            .get(1)
            .unwrap_or_default()
            .parse()
            .map_err(|_| PairdistError::ParseError {
                format: "params".to_string(),
                path: path.display().to_string(),
                reason: format!("invalid value for '{}'", name),
            })?;
        let uncertainty = record
            .get(2)
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse::<f64>().ok());
        out.push((name, value, uncertainty));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Atom, Crystal, Lattice};
    use crate::modeling::adding::add_gen_vars;
    use crate::modeling::config::{ConConfig, GenConfig};
    use crate::modeling::recipe::{make_recipe, VarSpec};
    use crate::parsers::ParsedData;
    use std::sync::Arc;

    fn build_recipe() -> Recipe {
        let a = 3.524;
        let lattice = Lattice::from_parameters(a, a, a, 90.0, 90.0, 90.0);
        let crystal = Arc::new(Crystal::new(
            "Ni",
            lattice,
            vec![
                Atom::new("Ni", [0.0, 0.0, 0.0]),
                Atom::new("Ni", [0.5, 0.5, 0.0]),
                Atom::new("Ni", [0.5, 0.0, 0.5]),
                Atom::new("Ni", [0.0, 0.5, 0.5]),
            ],
        ));
        let gen = GenConfig::new("ni", crystal, None).unwrap();
        let x: Vec<f64> = (0..900).map(|i| 0.5 + i as f64 * 0.01).collect();
        let data = ParsedData::from_arrays(x, vec![0.0; 900]).unwrap();
        let config =
            ConConfig::new("nickel", "ni", data, (2.0, 8.0, 0.05), vec![gen], vec![]).unwrap();
        let mut recipe = make_recipe(config).unwrap();
        add_gen_vars(
            &mut recipe,
            "nickel",
            "ni",
            &[("lat", VarSpec::Free), ("scale", VarSpec::Fixed(0.85))],
        )
        .unwrap();
        recipe
    }

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "pairdist-test-{}-{}",
            tag,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let recipe = build_recipe();
        let dest = temp_dir("roundtrip");

        let bundle = save(&recipe, None, &dest, "ni_fit").unwrap();
        assert!(bundle.join("ni_fit_params.csv").exists());
        assert!(bundle.join("ni_fit.txt").exists());
        assert!(bundle.join("ni_fit_nickel.fgr").exists());
        // 临时目录已清理
        assert!(!dest.join(".tmp-ni_fit").exists());

        let params = load_params(&bundle.join("ni_fit_params.csv")).unwrap();
        let expected = recipe.get_values();
        assert_eq!(params.len(), expected.len());
        for ((name, value, _), (exp_name, exp_value)) in params.iter().zip(expected.iter()) {
            assert_eq!(name, exp_name);
            assert!((value - exp_value).abs() < 1e-9);
        }

        let _ = fs::remove_dir_all(&dest);
    }

    #[test]
    fn test_save_overwrites_existing_bundle() {
        let recipe = build_recipe();
        let dest = temp_dir("overwrite");

        save(&recipe, None, &dest, "bundle").unwrap();
        let bundle = save(&recipe, None, &dest, "bundle").unwrap();
        assert!(bundle.join("bundle_params.csv").exists());

        let _ = fs::remove_dir_all(&dest);
    }

    #[test]
    fn test_save_unwritable_destination_fails() {
        let recipe = build_recipe();
        let dest = temp_dir("unwritable");
        fs::create_dir_all(&dest).unwrap();
        // 目标路径被一个普通文件占住
        let blocked = dest.join("blocked");
        fs::write(&blocked, b"x").unwrap();

        let result = save(&recipe, None, &blocked, "bundle");
        assert!(matches!(
            result,
            Err(PairdistError::FileWriteError { .. })
        ));

        let _ = fs::remove_dir_all(&dest);
    }

    #[test]
    fn test_save_rejects_empty_name() {
        let recipe = build_recipe();
        assert!(save(&recipe, None, &temp_dir("empty"), "").is_err());
    }
}
