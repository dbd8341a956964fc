//! # 配方配置对象
//!
//! 描述一次拟合所需的全部静态配置：结构生成器配置 (GenConfig)、
//! 特征函数配置 (FunConfig) 和贡献配置 (ConConfig)。
//! 配置对象构造后不可变，由配方构建器一次性消费。
//!
//! 特征函数的参数名与默认值在注册时显式声明，派生带后缀的
//! 方程参数名时不做任何运行时反射。
//!
//! ## 依赖关系
//! - 被 `modeling/creating.rs` 和 `modeling/recipe.rs` 使用
//! - 使用 `models/structure.rs`, `parsers/data.rs`, `modeling/equation.rs`

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{PairdistError, Result};
use crate::models::Crystal;
use crate::modeling::equation::Expr;
use crate::parsers::ParsedData;

/// 特征函数签名：第一个参数为自变量 r 网格，第二个为参数值
/// （按声明顺序，不含 r）
pub type CharFn = fn(&[f64], &[f64]) -> Vec<f64>;

/// 特征函数的单个声明参数
#[derive(Debug, Clone)]
pub struct CharParam {
    /// 参数名（未加后缀）
    pub name: String,
    /// 默认起始值
    pub default: f64,
}

/// 可注册的特征函数：函数指针 + 显式参数声明
#[derive(Debug, Clone)]
pub struct Characteristic {
    pub func: CharFn,
    pub params: Vec<CharParam>,
}

impl Characteristic {
    pub fn new(func: CharFn, params: &[(&str, f64)]) -> Self {
        Characteristic {
            func,
            params: params
                .iter()
                .map(|(name, default)| CharParam {
                    name: name.to_string(),
                    default: *default,
                })
                .collect(),
        }
    }
}

/// 拟合范围 (rmin, rmax, rstep)，单位 Å
pub type FitRange = (f64, f64, f64);

/// 校验拟合范围；违例在进入配方装配之前报 InvalidRange
pub fn validate_fit_range(range: FitRange) -> Result<()> {
    let (rmin, rmax, rstep) = range;
    if !(rmin < rmax) {
        return Err(PairdistError::InvalidRange(format!(
            "rmin {:.4} must be less than rmax {:.4}",
            rmin, rmax
        )));
    }
    if !(rstep > 0.0) {
        return Err(PairdistError::InvalidRange(format!(
            "rstep {:.4} must be positive",
            rstep
        )));
    }
    Ok(())
}

/// 结构生成器配置：一个物相
#[derive(Debug, Clone)]
pub struct GenConfig {
    /// 生成器名，即方程中的符号
    pub name: String,
    /// 晶体结构（引用共享，不复制）
    pub structure: Arc<Crystal>,
    /// 并行计算线程数提示；None 表示串行
    pub ncpu: Option<usize>,
}

impl GenConfig {
    pub fn new(name: impl Into<String>, structure: Arc<Crystal>, ncpu: Option<usize>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(PairdistError::Configuration(
                "generator name must not be empty".to_string(),
            ));
        }
        if ncpu == Some(0) {
            return Err(PairdistError::Configuration(format!(
                "ncpu for generator '{}' must be positive",
                name
            )));
        }
        Ok(GenConfig {
            name,
            structure,
            ncpu,
        })
    }
}

/// 特征函数配置：一个注册进方程的用户函数
#[derive(Debug, Clone)]
pub struct FunConfig {
    /// 函数名，即方程中的符号
    pub name: String,
    /// 函数本体与参数声明
    pub characteristic: Characteristic,
    /// 方程参数名：首项为自变量 "r"，其余带 `_<函数名>` 后缀
    pub argnames: Vec<String>,
}

impl FunConfig {
    /// 由特征函数声明构造，自动派生带后缀的参数名
    pub fn new(name: impl Into<String>, characteristic: Characteristic) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(PairdistError::Configuration(
                "function name must not be empty".to_string(),
            ));
        }
        let argnames = add_suffix(&characteristic.params, &name);
        let config = FunConfig {
            name,
            characteristic,
            argnames,
        };
        config.validate()?;
        Ok(config)
    }

    /// 不变量：argnames 长度 = 声明参数数 + 1（自变量）
    pub fn validate(&self) -> Result<()> {
        if self.argnames.len() != self.characteristic.params.len() + 1 {
            return Err(PairdistError::Configuration(format!(
                "function '{}' declares {} parameters but has {} argnames",
                self.name,
                self.characteristic.params.len(),
                self.argnames.len()
            )));
        }
        if self.argnames[0] != "r" {
            return Err(PairdistError::Configuration(format!(
                "function '{}' first argname must be the independent variable 'r'",
                self.name
            )));
        }
        Ok(())
    }
}

/// 给参数名追加函数名后缀；自变量 "r" 保持不变
pub fn add_suffix(params: &[CharParam], suffix: &str) -> Vec<String> {
    let mut argnames = vec!["r".to_string()];
    argnames.extend(params.iter().map(|p| format!("{}_{}", p.name, suffix)));
    argnames
}

/// 贡献配置：完整描述一项可拟合的贡献
#[derive(Debug, Clone)]
pub struct ConConfig {
    /// 贡献名
    pub name: String,
    /// 贡献方程（符号引用生成器与特征函数名）
    pub eq: String,
    /// 数据源
    pub parser: ParsedData,
    /// 拟合范围 (rmin, rmax, rstep)
    pub fit_range: FitRange,
    /// 生成器配置（名字在贡献内唯一）
    pub genconfigs: Vec<GenConfig>,
    /// 特征函数配置（名字在贡献内唯一）
    pub funconfigs: Vec<FunConfig>,
}

impl ConConfig {
    pub fn new(
        name: impl Into<String>,
        eq: impl Into<String>,
        parser: ParsedData,
        fit_range: FitRange,
        genconfigs: Vec<GenConfig>,
        funconfigs: Vec<FunConfig>,
    ) -> Result<Self> {
        let config = ConConfig {
            name: name.into(),
            eq: eq.into(),
            parser,
            fit_range,
            genconfigs,
            funconfigs,
        };
        config.validate()?;
        Ok(config)
    }

    /// 校验贡献配置的全部不变量
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(PairdistError::Configuration(
                "contribution name must not be empty".to_string(),
            ));
        }

        validate_fit_range(self.fit_range)?;

        let mut names: HashSet<&str> = HashSet::new();
        for gen in &self.genconfigs {
            if !names.insert(gen.name.as_str()) {
                return Err(PairdistError::Configuration(format!(
                    "duplicate symbol '{}' in contribution '{}'",
                    gen.name, self.name
                )));
            }
        }
        for fun in &self.funconfigs {
            fun.validate()?;
            if !names.insert(fun.name.as_str()) {
                return Err(PairdistError::Configuration(format!(
                    "duplicate symbol '{}' in contribution '{}'",
                    fun.name, self.name
                )));
            }
        }

        // 方程中的每个符号都必须解析到一个生成器或特征函数
        let expr = Expr::parse(&self.eq)?;
        for symbol in expr.symbols() {
            if !names.contains(symbol.as_str()) {
                return Err(PairdistError::Configuration(format!(
                    "equation '{}' references undefined symbol '{}'",
                    self.eq, symbol
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Atom, Lattice};
    use crate::modeling::shapes::sphere_cf;

    fn ni_structure() -> Arc<Crystal> {
        let a = 3.524;
        let lattice = Lattice::from_parameters(a, a, a, 90.0, 90.0, 90.0);
        Arc::new(Crystal::new(
            "Ni",
            lattice,
            vec![
                Atom::new("Ni", [0.0, 0.0, 0.0]),
                Atom::new("Ni", [0.5, 0.5, 0.0]),
                Atom::new("Ni", [0.5, 0.0, 0.5]),
                Atom::new("Ni", [0.0, 0.5, 0.5]),
            ],
        ))
    }

    fn synthetic_data() -> ParsedData {
        let x: Vec<f64> = (0..1800).map(|i| 0.01 + i as f64 * 0.012).collect();
        let y: Vec<f64> = x.iter().map(|r| (r * 2.0).sin()).collect();
        ParsedData::from_arrays(x, y).unwrap()
    }

    #[test]
    fn test_fit_range_validation() {
        assert!(validate_fit_range((2.0, 20.0, 0.01)).is_ok());
        assert!(validate_fit_range((20.0, 2.0, 0.01)).is_err());
        assert!(validate_fit_range((2.0, 2.0, 0.01)).is_err());
        assert!(validate_fit_range((2.0, 20.0, 0.0)).is_err());
        assert!(validate_fit_range((2.0, 20.0, -0.1)).is_err());
    }

    #[test]
    fn test_genconfig_rejects_zero_ncpu() {
        assert!(GenConfig::new("ni", ni_structure(), Some(0)).is_err());
        assert!(GenConfig::new("", ni_structure(), None).is_err());
        assert!(GenConfig::new("ni", ni_structure(), Some(4)).is_ok());
    }

    #[test]
    fn test_funconfig_argnames_suffixed() {
        let fun = FunConfig::new(
            "sphere",
            Characteristic::new(sphere_cf, &[("psize", 50.0)]),
        )
        .unwrap();

        assert_eq!(fun.argnames, vec!["r".to_string(), "psize_sphere".to_string()]);
        // 声明参数数 + 自变量
        assert_eq!(fun.argnames.len(), fun.characteristic.params.len() + 1);
    }

    #[test]
    fn test_conconfig_rejects_undefined_symbol() {
        let gen = GenConfig::new("ni", ni_structure(), None).unwrap();
        let result = ConConfig::new(
            "nickel",
            "ni * ghost",
            synthetic_data(),
            (2.0, 20.0, 0.01),
            vec![gen],
            vec![],
        );
        assert!(matches!(result, Err(PairdistError::Configuration(_))));
    }

    #[test]
    fn test_conconfig_rejects_duplicate_symbol() {
        let gen1 = GenConfig::new("ni", ni_structure(), None).unwrap();
        let gen2 = GenConfig::new("ni", ni_structure(), None).unwrap();
        let result = ConConfig::new(
            "nickel",
            "ni",
            synthetic_data(),
            (2.0, 20.0, 0.01),
            vec![gen1, gen2],
            vec![],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_conconfig_accepts_valid() {
        let gen = GenConfig::new("ni", ni_structure(), None).unwrap();
        let fun = FunConfig::new(
            "sphere",
            Characteristic::new(sphere_cf, &[("psize", 50.0)]),
        )
        .unwrap();
        let config = ConConfig::new(
            "nickel",
            "sphere * ni",
            synthetic_data(),
            (2.0, 20.0, 0.01),
            vec![gen],
            vec![fun],
        )
        .unwrap();
        assert_eq!(config.name, "nickel");
    }
}
