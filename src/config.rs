//! # 解析配置
//!
//! 由命令行参数（含环境变量回退）构建，传给 `VaspParser`。
//!
//! ## 依赖关系
//! - 被 `pipeline.rs`, `commands/` 使用

use crate::parsers::Variant;

/// 环境变量：强制布局变体
pub const ENV_VARIANT: &str = "VASP_EXTRACT_VARIANT";
/// 环境变量：日志级别
pub const ENV_LOG: &str = "VASP_EXTRACT_LOG";
/// 环境变量：批处理线程数
pub const ENV_JOBS: &str = "VASP_EXTRACT_JOBS";

/// 单文件解析配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserConfig {
    /// 指定变体；`None` 时按文件名与内容选择
    pub variant: Option<Variant>,
    /// 是否透明解压 `.gz`
    pub decompress: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            variant: None,
            decompress: true,
        }
    }
}

impl ParserConfig {
    pub fn with_variant(mut self, variant: Option<Variant>) -> Self {
        self.variant = variant;
        self
    }

    pub fn with_decompress(mut self, decompress: bool) -> Self {
        self.decompress = decompress;
        self
    }
}
