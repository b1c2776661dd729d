use crate::expr::DEFAULT_MAX_DEPTH;
use crate::types::Position;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 引擎配置, 所有字段均有默认值
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub log: LogConfig,
    pub editor: EditorConfig,
    pub simulator: SimulatorConfig,
    pub store: StoreConfig,
}

impl EngineConfig {
    pub fn from_json_str(content: &str) -> anyhow::Result<Self> {
        serde_json::from_str(content).context("解析引擎配置失败")
    }

    /// 从 JSON 配置文件加载
    pub async fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("读取配置文件 {} 失败", path.display()))?;
        Self::from_json_str(&content).with_context(|| format!("配置文件 {}", path.display()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// 日志级别, 可被 `RUST_LOG` 覆盖
    pub level: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
    /// 未指定位置时新节点放置的坐标
    pub default_position: Position,
    /// 由模板复制的规则链名称后缀
    pub clone_name_suffix: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            default_position: Position::new(200.0, 200.0),
            clone_name_suffix: " - 副本".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulatorConfig {
    /// 可模拟的最大节点数
    pub max_nodes: usize,
    pub max_expression_depth: usize,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            max_nodes: 1024,
            max_expression_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Memory,
    File,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub kind: StoreKind,
    /// 文件存储的目录
    pub dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::Memory,
            dir: PathBuf::from("./chains"),
        }
    }
}
