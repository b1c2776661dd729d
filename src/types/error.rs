use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("未知的节点类型: {0}")]
    InvalidKind(String),

    #[error("节点不存在: {0}")]
    NodeNotFound(Uuid),

    #[error("连接不存在: {0}")]
    ConnectionNotFound(Uuid),

    #[error("节点配置格式错误: {0}")]
    MalformedConfiguration(String),

    #[error("节点坐标无效: ({x}, {y})")]
    InvalidPosition { x: f64, y: f64 },

    #[error("节点不能连接到自身: {0}")]
    SelfConnection(Uuid),

    #[error("规则链没有入口节点")]
    NoEntryPoint,

    #[error("规则链存在循环依赖")]
    CyclicGraph,

    #[error("规则链节点数超过模拟上限 {0}")]
    SimulationLimit(usize),

    #[error("节点 {node_id} 模拟执行失败: {message}")]
    PerNodeSimulationError { node_id: Uuid, message: String },

    #[error("名称不能为空: {0}")]
    InvalidName(String),

    #[error("规则链未找到: {0}")]
    ChainNotFound(Uuid),

    #[error("模板未找到: {0}")]
    TemplateNotFound(String),

    #[error("模板内容无效: {0}")]
    InvalidTemplate(String),

    #[error("存储错误: {0}")]
    Store(String),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RuleError>;
