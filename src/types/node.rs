use crate::components::{
    ActionConfig, EnrichmentConfig, ExternalConfig, FilterConfig, TransformConfig,
};
use crate::types::RuleError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 节点类型, 封闭集合
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Filter,
    Transform,
    Action,
    Enrichment,
    External,
}

impl NodeKind {
    pub const ALL: [NodeKind; 5] = [
        NodeKind::Filter,
        NodeKind::Transform,
        NodeKind::Action,
        NodeKind::Enrichment,
        NodeKind::External,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Filter => "filter",
            NodeKind::Transform => "transform",
            NodeKind::Action => "action",
            NodeKind::Enrichment => "enrichment",
            NodeKind::External => "external",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| RuleError::InvalidKind(s.to_string()))
    }
}

/// 节点在画布上的坐标.
///
/// 仅是布局信息, 对模拟执行和执行顺序没有任何影响.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// 坐标必须是有限值, NaN 和无穷大无法写入 JSON 文档
    pub fn validate(self) -> Result<Self, RuleError> {
        if self.x.is_finite() && self.y.is_finite() {
            Ok(self)
        } else {
            Err(RuleError::InvalidPosition { x: self.x, y: self.y })
        }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// 按节点类型区分的强类型配置
#[derive(Debug, Clone, PartialEq)]
pub enum NodeConfig {
    Filter(FilterConfig),
    Transform(TransformConfig),
    Action(ActionConfig),
    Enrichment(EnrichmentConfig),
    External(ExternalConfig),
}

impl NodeConfig {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeConfig::Filter(_) => NodeKind::Filter,
            NodeConfig::Transform(_) => NodeKind::Transform,
            NodeConfig::Action(_) => NodeKind::Action,
            NodeConfig::Enrichment(_) => NodeKind::Enrichment,
            NodeConfig::External(_) => NodeKind::External,
        }
    }

    pub fn default_for(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Filter => NodeConfig::Filter(FilterConfig::default()),
            NodeKind::Transform => NodeConfig::Transform(TransformConfig::default()),
            NodeKind::Action => NodeConfig::Action(ActionConfig::default()),
            NodeKind::Enrichment => NodeConfig::Enrichment(EnrichmentConfig::default()),
            NodeKind::External => NodeConfig::External(ExternalConfig::default()),
        }
    }

    /// 按节点类型解析配置文档, 文档必须是 JSON 对象
    pub fn from_value(kind: NodeKind, value: Value) -> Result<Self, RuleError> {
        if !value.is_object() {
            return Err(RuleError::MalformedConfiguration(format!(
                "{} 节点的配置必须是 JSON 对象",
                kind
            )));
        }

        let malformed = |e: serde_json::Error| {
            RuleError::MalformedConfiguration(format!("{} 节点配置无效: {}", kind, e))
        };

        Ok(match kind {
            NodeKind::Filter => NodeConfig::Filter(serde_json::from_value(value).map_err(malformed)?),
            NodeKind::Transform => {
                NodeConfig::Transform(serde_json::from_value(value).map_err(malformed)?)
            }
            NodeKind::Action => NodeConfig::Action(serde_json::from_value(value).map_err(malformed)?),
            NodeKind::Enrichment => {
                NodeConfig::Enrichment(serde_json::from_value(value).map_err(malformed)?)
            }
            NodeKind::External => {
                NodeConfig::External(serde_json::from_value(value).map_err(malformed)?)
            }
        })
    }

    /// 解析表单提交的 JSON 文本
    pub fn parse(kind: NodeKind, text: &str) -> Result<Self, RuleError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| RuleError::MalformedConfiguration(format!("JSON 解析失败: {}", e)))?;
        Self::from_value(kind, value)
    }

    pub fn to_value(&self) -> Value {
        let encoded = match self {
            NodeConfig::Filter(config) => serde_json::to_value(config),
            NodeConfig::Transform(config) => serde_json::to_value(config),
            NodeConfig::Action(config) => serde_json::to_value(config),
            NodeConfig::Enrichment(config) => serde_json::to_value(config),
            NodeConfig::External(config) => serde_json::to_value(config),
        };
        // 配置结构体只包含字符串键的映射, 编码不会失败
        encoded.unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
    }
}

/// 规则链中的一个处理节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NodeDocument", into = "NodeDocument")]
pub struct RuleNode {
    pub id: Uuid,
    pub name: String,
    pub config: NodeConfig,
    pub position: Position,
    pub description: Option<String>,
}

impl RuleNode {
    pub fn kind(&self) -> NodeKind {
        self.config.kind()
    }
}

/// 节点在持久化文档中的形态
#[derive(Debug, Clone, Serialize, Deserialize)]
struct NodeDocument {
    id: Uuid,
    name: String,
    #[serde(rename = "type")]
    kind: NodeKind,
    configuration: Value,
    position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl TryFrom<NodeDocument> for RuleNode {
    type Error = RuleError;

    fn try_from(doc: NodeDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: doc.id,
            name: doc.name,
            config: NodeConfig::from_value(doc.kind, doc.configuration)?,
            position: doc.position,
            description: doc.description,
        })
    }
}

impl From<RuleNode> for NodeDocument {
    fn from(node: RuleNode) -> Self {
        Self {
            id: node.id,
            kind: node.kind(),
            configuration: node.config.to_value(),
            name: node.name,
            position: node.position,
            description: node.description,
        }
    }
}

/// 模板中的节点, 标识只在模板内部有意义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub configuration: Value,
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TemplateNode {
    /// 以新的标识实例化为规则链节点
    pub fn instantiate(&self, id: Uuid) -> Result<RuleNode, RuleError> {
        let config = NodeConfig::from_value(self.kind, self.configuration.clone()).map_err(|e| {
            RuleError::InvalidTemplate(format!("模板节点 {} 配置无效: {}", self.id, e))
        })?;
        let position = self.position.validate().map_err(|e| {
            RuleError::InvalidTemplate(format!("模板节点 {}: {}", self.id, e))
        })?;
        Ok(RuleNode {
            id,
            name: self.name.clone(),
            config,
            position,
            description: self.description.clone(),
        })
    }
}
