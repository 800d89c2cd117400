//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `pipeline.rs`, `batch/`, `utils/`
//! - 子模块: parse, batch, detect

pub mod batch;
pub mod detect;
pub mod parse;

use crate::cli::Commands;
use crate::error::Result;

/// 执行命令
pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Parse(args) => parse::execute(args),
        Commands::Batch(args) => batch::execute(args),
        Commands::Detect(args) => detect::execute(args),
    }
}
