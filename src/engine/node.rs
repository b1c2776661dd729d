use crate::components::{ActionNode, EnrichmentNode, ExternalNode, FilterNode, TransformNode};
use crate::types::{Message, NodeConfig, NodeContext, RuleError};
use serde_json::Value;

/// 节点处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum NodeOutcome {
    /// 消息继续流向下游节点
    Forward {
        msg: Message,
        note: String,
        detail: Option<Value>,
    },
    /// 条件不满足, 该分支在此终止
    Halt { msg: Message, note: String },
}

impl NodeOutcome {
    pub fn forward(msg: Message, note: impl Into<String>) -> Self {
        NodeOutcome::Forward {
            msg,
            note: note.into(),
            detail: None,
        }
    }

    pub fn message(&self) -> &Message {
        match self {
            NodeOutcome::Forward { msg, .. } | NodeOutcome::Halt { msg, .. } => msg,
        }
    }

    pub fn note(&self) -> &str {
        match self {
            NodeOutcome::Forward { note, .. } | NodeOutcome::Halt { note, .. } => note,
        }
    }
}

/// 节点处理器特征, 定义了节点在模拟执行中的行为.
///
/// 处理器只在内存中变换消息, 不允许产生任何外部副作用.
pub trait NodeHandler: Send + Sync + std::fmt::Debug {
    fn handle(&self, ctx: &NodeContext<'_>, msg: Message) -> Result<NodeOutcome, RuleError>;
}

/// 根据节点配置创建对应的处理器
pub fn create_handler(config: &NodeConfig) -> Box<dyn NodeHandler> {
    match config {
        NodeConfig::Filter(config) => Box::new(FilterNode::new(config.clone())),
        NodeConfig::Transform(config) => Box::new(TransformNode::new(config.clone())),
        NodeConfig::Action(config) => Box::new(ActionNode::new(config.clone())),
        NodeConfig::Enrichment(config) => Box::new(EnrichmentNode::new(config.clone())),
        NodeConfig::External(config) => Box::new(ExternalNode::new(config.clone())),
    }
}
