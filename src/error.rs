//! # 统一错误处理模块
//!
//! 定义 vasp-extract 的所有错误类型，使用 `thiserror` 派生。
//!
//! 只有 I/O 层面的失败、无法识别的文件格式以及绑定表构建错误会以
//! `Err` 形式向上传播；解析过程中的缺失、格式异常均降级为"字段未设置"。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// vasp-extract 统一错误类型
#[derive(Error, Debug)]
pub enum VaspError {
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

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("File is not valid UTF-8 text: {path}")]
    EncodingError { path: String },

    #[error("Unsupported compression '.{extension}': {path}")]
    UnsupportedCompression { path: String, extension: String },

    // ─────────────────────────────────────────────────────────────
    // 格式识别错误
    // ─────────────────────────────────────────────────────────────
    #[error("Unrecognized VASP output format: {path}")]
    UnrecognizedFormat { path: String },

    #[error("Unknown variant '{0}' (expected outcar, vasprun or vasprun-v2)")]
    UnknownVariant(String),

    // ─────────────────────────────────────────────────────────────
    // 规则与绑定构建错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid pattern for quantity '{name}'")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Unknown transform: {0}")]
    UnknownTransform(String),

    #[error("Transform '{transform}' expects {expected} input(s), got {got}")]
    TransformArity {
        transform: String,
        expected: String,
        got: usize,
    },

    #[error("Invalid keyword arguments for transform '{transform}': {reason}")]
    InvalidKwargs { transform: String, reason: String },

    #[error("Unknown unit: {0}")]
    UnknownUnit(String),

    // ─────────────────────────────────────────────────────────────
    // 参数错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ─────────────────────────────────────────────────────────────
    // 导出错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("No matching files found with pattern: {pattern}")]
    NoFilesFound { pattern: String },

    #[error("{0}")]
    Other(String),
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, VaspError>;
