//! # parse 命令实现
//!
//! 解析单个文件，将归档序列化为 JSON。
//!
//! 未指定 `--output` 时 JSON 直接写到 stdout，不附带其他提示，便于管道使用。
//!
//! ## 依赖关系
//! - 使用 `cli/parse.rs` 定义的参数
//! - 使用 `pipeline.rs`
//! - 使用 `utils/output.rs`

use crate::cli::parse::ParseArgs;
use crate::error::{Result, VaspError};
use crate::models::Archive;
use crate::pipeline::VaspParser;
use crate::utils::output;

use std::fs;

/// 执行 parse 命令
pub fn execute(args: ParseArgs) -> Result<()> {
    if !args.file.exists() {
        return Err(VaspError::FileNotFound {
            path: args.file.display().to_string(),
        });
    }

    let parser = VaspParser::new()?.with_config(args.options.config());
    let archive = parser.parse_file(&args.file)?;
    let json = to_json(&archive, args.compact)?;

    match args.output {
        None => println!("{}", json),
        Some(path) => {
            fs::write(&path, json).map_err(|e| VaspError::FileWriteError {
                path: path.display().to_string(),
                source: e,
            })?;
            output::print_success(&format!(
                "Parsed '{}' as {} -> '{}'",
                args.file.display(),
                archive.metadata.variant,
                path.display()
            ));
            print_summary(&archive);
        }
    }

    Ok(())
}

/// 序列化归档
pub fn to_json(archive: &Archive, compact: bool) -> Result<String> {
    let json = if compact {
        serde_json::to_string(archive)?
    } else {
        serde_json::to_string_pretty(archive)?
    };
    Ok(json)
}

fn print_summary(archive: &Archive) {
    let Some(sim) = &archive.data else {
        output::print_warning("No data extracted");
        return;
    };
    output::print_info(&format!("Output steps: {}", sim.outputs.len()));
    if let Some(energy) = sim.final_total_energy() {
        output::print_info(&format!(
            "Final total energy: {:.6} {}",
            energy.magnitude,
            energy.unit.symbol()
        ));
    }
}
