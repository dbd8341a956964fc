//! # 统一错误处理模块
//!
//! 定义 pairdist 的所有错误类型，使用 `thiserror` 派生。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// pairdist 统一错误类型
#[derive(Error, Debug)]
pub enum PairdistError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 解析错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to parse {format} file: {path}\nReason: {reason}")]
    ParseError {
        format: String,
        path: String,
        reason: String,
    },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    // ─────────────────────────────────────────────────────────────
    // 配置错误（配方构建阶段）
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    // ─────────────────────────────────────────────────────────────
    // 变量绑定错误
    // ─────────────────────────────────────────────────────────────
    #[error("Unknown parameter '{parameter}' in '{target}'")]
    UnknownParameter { target: String, parameter: String },

    #[error("Variable already bound for parameter '{parameter}' in '{target}'")]
    DuplicateVariable { target: String, parameter: String },

    // ─────────────────────────────────────────────────────────────
    // 求解器错误
    // ─────────────────────────────────────────────────────────────
    #[error("Solver failed: {0}")]
    Solver(String),

    // ─────────────────────────────────────────────────────────────
    // CSV 错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, PairdistError>;
