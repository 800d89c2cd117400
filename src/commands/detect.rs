//! # detect 命令实现
//!
//! 报告文件会按哪种布局变体解析。
//!
//! ## 依赖关系
//! - 使用 `cli/detect.rs` 定义的参数
//! - 使用 `parsers/mod.rs` 的 `read_source`, `match_variant`

use crate::cli::detect::DetectArgs;
use crate::error::{Result, VaspError};
use crate::parsers::{match_variant, read_source};
use crate::utils::output;

/// 执行 detect 命令
pub fn execute(args: DetectArgs) -> Result<()> {
    let path = args.file.display().to_string();
    let content = read_source(&args.file)?;
    let variant =
        match_variant(&path, &content).ok_or(VaspError::UnrecognizedFormat { path: path.clone() })?;
    output::print_success(&format!("{}: {}", path, variant));
    Ok(())
}
