//! # 日志初始化
//!
//! 二进制入口安装 `tracing-subscriber` 的 fmt 订阅器，输出到 stderr，
//! 以免与 stdout 上的 JSON 混在一起。
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用

use crate::error::{Result, VaspError};

use tracing::Level;

/// 解析日志级别名称
pub fn parse_level(level: &str) -> Result<Level> {
    level
        .trim()
        .parse::<Level>()
        .map_err(|_| VaspError::InvalidArgument(format!("Invalid log level '{}'", level)))
}

/// 安装全局订阅器；重复调用返回错误
pub fn init(level: &str) -> Result<()> {
    let level = parse_level(level)?;
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| VaspError::Other(format!("Failed to install logger: {}", e)))
}
