//! # batch 子命令 CLI 定义
//!
//! 并行解析目录下的全部匹配文件
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/batch.rs`

use super::ParserOptions;
use crate::config::ENV_JOBS;
use clap::Args;
use std::path::PathBuf;

/// batch 子命令参数
#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Directory (or single file) to scan
    pub input: PathBuf,

    /// Comma-separated glob patterns for file names
    #[arg(short, long, default_value = "OUTCAR*,vasprun*.xml*")]
    pub pattern: String,

    /// Recurse into subdirectories
    #[arg(short, long, default_value_t = false)]
    pub recursive: bool,

    /// Number of parallel jobs (0 = auto)
    #[arg(short, long, default_value_t = 0, env = ENV_JOBS)]
    pub jobs: usize,

    /// Summary CSV file
    #[arg(long, default_value = "vasp_summary.csv")]
    pub output_csv: PathBuf,

    /// Also write one archive JSON per parsed file into this directory
    #[arg(long)]
    pub json_dir: Option<PathBuf>,

    #[command(flatten)]
    pub options: ParserOptions,
}
