//! # vasp-extract 命令行入口
//!
//! ## 子命令
//! - `parse`  - 解析单个文件并输出 JSON 归档
//! - `batch`  - 并行解析目录，输出汇总表与 CSV
//! - `detect` - 报告文件的布局变体

use clap::Parser;
use vasp_extract::cli::Cli;
use vasp_extract::{commands, utils};

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = utils::logging::init(&cli.log_level) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
