//! # parse 子命令 CLI 定义
//!
//! 解析单个文件并输出 JSON 归档
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/parse.rs`

use super::ParserOptions;
use clap::Args;
use std::path::PathBuf;

/// parse 子命令参数
#[derive(Args, Debug)]
pub struct ParseArgs {
    /// OUTCAR or vasprun.xml file (optionally .gz)
    pub file: PathBuf,

    /// Write the archive JSON here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Emit compact single-line JSON
    #[arg(long, default_value_t = false)]
    pub compact: bool,

    #[command(flatten)]
    pub options: ParserOptions,
}
