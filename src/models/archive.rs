//! # 归档容器
//!
//! 外部提供的结果容器：解析结束时整体写入 `data`。
//!
//! ## 依赖关系
//! - 被 `pipeline.rs`, `commands/` 使用

use super::simulation::Simulation;
use crate::parsers::Variant;

use serde::Serialize;

/// 条目元数据
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryMetadata {
    pub mainfile: String,
    pub variant: Variant,
}

/// 单个文件的解析归档
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Archive {
    pub metadata: EntryMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Simulation>,
}

impl Archive {
    pub fn new(mainfile: impl Into<String>, variant: Variant) -> Self {
        Self {
            metadata: EntryMetadata {
                mainfile: mainfile.into(),
                variant,
            },
            data: None,
        }
    }
}
