//! # 拟合报告
//!
//! 生成变量名、拟合值与不确定度的文本摘要。只读操作。
//!
//! ## 依赖关系
//! - 被 `commands/fit.rs`, `modeling/saving.rs` 使用
//! - 使用 `tabled` 渲染表格

use tabled::{Table, Tabled};

use crate::modeling::fitting::FitResult;
use crate::modeling::recipe::Recipe;

#[derive(Tabled)]
struct VariableRow {
    #[tabled(rename = "variable")]
    name: String,
    #[tabled(rename = "value")]
    value: String,
    #[tabled(rename = "uncertainty")]
    uncertainty: String,
    #[tabled(rename = "state")]
    state: String,
}

/// 生成配方的文本报告
pub fn report(recipe: &Recipe, result: Option<&FitResult>) -> String {
    let mut out = String::new();

    out.push_str("Fit contributions:\n");
    for con in recipe.contributions() {
        let (rmin, rmax, rstep) = con.fit_range;
        out.push_str(&format!(
            "  {}: eq = '{}', range = [{:.3}, {:.3}] step {:.4}, {} points\n",
            con.name,
            con.eq,
            rmin,
            rmax,
            rstep,
            con.grid().len()
        ));
    }

    if let Some(result) = result {
        out.push_str(&format!(
            "\nStatus: {}  (iterations: {})\nCost: {:.6e}\nRw: {:.4}\n",
            result.status, result.iterations, result.cost, result.rw
        ));
    }

    let rows: Vec<VariableRow> = recipe
        .variables()
        .iter()
        .map(|var| VariableRow {
            name: var.name.clone(),
            value: format!("{:.6}", var.value),
            uncertainty: var
                .uncertainty
                .map(|u| format!("{:.6}", u))
                .unwrap_or_else(|| "-".to_string()),
            state: if var.free { "free" } else { "fixed" }.to_string(),
        })
        .collect();

    if rows.is_empty() {
        out.push_str("\nNo variables bound.\n");
    } else {
        out.push('\n');
        out.push_str(&Table::new(&rows).to_string());
        out.push('\n');
    }

    out
}
