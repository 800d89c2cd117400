//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `parse`: 解析单个 OUTCAR / vasprun.xml，输出 JSON 归档
//! - `batch`: 批量解析目录，输出汇总表与 CSV
//! - `detect`: 报告文件会被识别为哪种布局
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: parse, batch, detect

pub mod batch;
pub mod detect;
pub mod parse;

use crate::config::{ParserConfig, ENV_LOG, ENV_VARIANT};
use crate::parsers::Variant;

use clap::{Args, Parser, Subcommand};

/// vasp-extract - VASP 输出结构化提取
#[derive(Parser)]
#[command(name = "vasp-extract")]
#[command(version)]
#[command(about = "Extract structured simulation data from VASP OUTCAR and vasprun.xml files", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log level written to stderr (error, warn, info, debug, trace)
    #[arg(long, global = true, env = ENV_LOG, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Parse one output file into a JSON archive
    Parse(parse::ParseArgs),

    /// Parse every matching file under a directory in parallel
    Batch(batch::BatchArgs),

    /// Report which layout a file would be parsed as
    Detect(detect::DetectArgs),
}

/// 解析相关的公共参数
#[derive(Args, Debug, Clone)]
pub struct ParserOptions {
    /// Force a layout instead of detecting it (outcar, vasprun, vasprun-v2)
    #[arg(long, env = ENV_VARIANT)]
    pub variant: Option<Variant>,

    /// Refuse gzip-compressed inputs instead of decompressing them
    #[arg(long, default_value_t = false)]
    pub no_decompress: bool,
}

impl ParserOptions {
    pub fn config(&self) -> ParserConfig {
        ParserConfig::default()
            .with_variant(self.variant)
            .with_decompress(!self.no_decompress)
    }
}
