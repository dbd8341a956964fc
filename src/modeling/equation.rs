//! # 贡献方程解析与求值
//!
//! 把贡献方程字符串（如 `"0.8 * ni + sphere * ni2"`）解析成表达式树，
//! 并在拟合网格上逐点求值。符号名在配置校验阶段就必须解析为
//! 生成器或特征函数名。
//!
//! ## 支持的语法
//! - 标识符、数字字面量
//! - 二元运算 `+ - * /`，一元负号，括号
//!
//! ## 依赖关系
//! - 被 `modeling/config.rs` 和 `modeling/recipe.rs` 使用
//! - 无外部模块依赖

use std::collections::{BTreeSet, HashMap};

use crate::error::{PairdistError, Result};

/// 表达式树
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Symbol(String),
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// 解析方程字符串
    pub fn parse(input: &str) -> Result<Expr> {
        let tokens = tokenize(input)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.parse_expr()?;
        if parser.pos != parser.tokens.len() {
            return Err(eq_error(input, "trailing tokens"));
        }
        Ok(expr)
    }

    /// 收集方程中引用的全部符号名
    pub fn symbols(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Number(_) => {}
            Expr::Symbol(name) => {
                out.insert(name.clone());
            }
            Expr::Neg(inner) => inner.collect_symbols(out),
            Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) | Expr::Div(a, b) => {
                a.collect_symbols(out);
                b.collect_symbols(out);
            }
        }
    }

    /// 在网格上求值；`symbols` 为符号名到已算曲线的映射，长度均为 n
    pub fn evaluate(&self, symbols: &HashMap<String, Vec<f64>>, n: usize) -> Result<Vec<f64>> {
        match self {
            Expr::Number(v) => Ok(vec![*v; n]),
            Expr::Symbol(name) => symbols
                .get(name)
                .cloned()
                .ok_or_else(|| PairdistError::Configuration(format!(
                    "equation symbol '{}' has no bound value",
                    name
                ))),
            Expr::Neg(inner) => {
                let mut v = inner.evaluate(symbols, n)?;
                for x in v.iter_mut() {
                    *x = -*x;
                }
                Ok(v)
            }
            Expr::Add(a, b) => zip_with(a.evaluate(symbols, n)?, b.evaluate(symbols, n)?, |x, y| x + y),
            Expr::Sub(a, b) => zip_with(a.evaluate(symbols, n)?, b.evaluate(symbols, n)?, |x, y| x - y),
            Expr::Mul(a, b) => zip_with(a.evaluate(symbols, n)?, b.evaluate(symbols, n)?, |x, y| x * y),
            Expr::Div(a, b) => zip_with(a.evaluate(symbols, n)?, b.evaluate(symbols, n)?, |x, y| x / y),
        }
    }
}

fn zip_with(mut a: Vec<f64>, b: Vec<f64>, f: impl Fn(f64, f64) -> f64) -> Result<Vec<f64>> {
    for (x, y) in a.iter_mut().zip(b.into_iter()) {
        *x = f(*x, y);
    }
    Ok(a)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            _ if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_digit()
                        || chars[i] == '.'
                        || chars[i] == 'e'
                        || chars[i] == 'E'
                        || ((chars[i] == '+' || chars[i] == '-')
                            && matches!(chars[i - 1], 'e' | 'E')))
                {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| eq_error(input, &format!("invalid number '{}'", text)))?;
                tokens.push(Token::Number(value));
            }
            _ if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || chars[i] == '_')
                {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            _ => {
                return Err(eq_error(input, &format!("unexpected character '{}'", c)));
            }
        }
    }

    if tokens.is_empty() {
        return Err(eq_error(input, "empty equation"));
    }
    Ok(tokens)
}

/// 递归下降解析器: expr -> term (('+'|'-') term)*, term -> factor (('*'|'/') factor)*
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn parse_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_term()?;
        while let Some(tok) = self.peek() {
            match tok {
                Token::Plus => {
                    self.pos += 1;
                    lhs = Expr::Add(Box::new(lhs), Box::new(self.parse_term()?));
                }
                Token::Minus => {
                    self.pos += 1;
                    lhs = Expr::Sub(Box::new(lhs), Box::new(self.parse_term()?));
                }
                _ => break,
            }
        }
        Ok(lhs)
    }

    fn parse_term(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_factor()?;
        while let Some(tok) = self.peek() {
            match tok {
                Token::Star => {
                    self.pos += 1;
                    lhs = Expr::Mul(Box::new(lhs), Box::new(self.parse_factor()?));
                }
                Token::Slash => {
                    self.pos += 1;
                    lhs = Expr::Div(Box::new(lhs), Box::new(self.parse_factor()?));
                }
                _ => break,
            }
        }
        Ok(lhs)
    }

    fn parse_factor(&mut self) -> Result<Expr> {
        let tok = self
            .next()
            .ok_or_else(|| PairdistError::Configuration("unexpected end of equation".to_string()))?;
        match tok {
            Token::Number(v) => Ok(Expr::Number(v)),
            Token::Ident(name) => Ok(Expr::Symbol(name)),
            Token::Minus => Ok(Expr::Neg(Box::new(self.parse_factor()?))),
            Token::LParen => {
                let inner = self.parse_expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(PairdistError::Configuration(
                        "unbalanced parenthesis in equation".to_string(),
                    )),
                }
            }
            other => Err(PairdistError::Configuration(format!(
                "unexpected token {:?} in equation",
                other
            ))),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }
}

fn eq_error(input: &str, reason: &str) -> PairdistError {
    PairdistError::Configuration(format!("bad equation '{}': {}", input, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(eq: &str, symbols: &[(&str, Vec<f64>)], n: usize) -> Vec<f64> {
        let map: HashMap<String, Vec<f64>> = symbols
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        Expr::parse(eq).unwrap().evaluate(&map, n).unwrap()
    }

    #[test]
    fn test_single_symbol() {
        let out = eval("ni", &[("ni", vec![1.0, 2.0])], 2);
        assert_eq!(out, vec![1.0, 2.0]);
    }

    #[test]
    fn test_arithmetic_precedence() {
        let out = eval(
            "a + b * c",
            &[
                ("a", vec![1.0]),
                ("b", vec![2.0]),
                ("c", vec![3.0]),
            ],
            1,
        );
        assert!((out[0] - 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_parentheses_and_unary() {
        let out = eval("-(a + b) / 2.0", &[("a", vec![1.0]), ("b", vec![3.0])], 1);
        assert!((out[0] + 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_scientific_literal() {
        let out = eval("1e-2 * a", &[("a", vec![100.0])], 1);
        assert!((out[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_symbols_collected() {
        let expr = Expr::parse("0.5 * ni + sphere * cds").unwrap();
        let syms = expr.symbols();
        assert_eq!(
            syms.into_iter().collect::<Vec<_>>(),
            vec!["cds".to_string(), "ni".to_string(), "sphere".to_string()]
        );
    }

    #[test]
    fn test_syntax_errors() {
        assert!(Expr::parse("").is_err());
        assert!(Expr::parse("a +").is_err());
        assert!(Expr::parse("(a").is_err());
        assert!(Expr::parse("a $ b").is_err());
    }
}
