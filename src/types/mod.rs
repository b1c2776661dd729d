mod context;
mod descriptor;
mod error;
mod message;
mod node;
mod result;

pub use context::*;
pub use descriptor::*;
pub use error::*;
pub use message::*;
pub use node::*;
pub use result::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// 规则链状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainStatus {
    /// 草稿, 新建或由模板复制的规则链
    Draft,
    /// 已启用, 可被外部运行时执行
    Active,
    /// 已停用
    Inactive,
}

/// 节点之间的有向连接
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: Uuid,
    pub source_id: Uuid,
    pub target_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

impl Connection {
    pub fn touches(&self, node_id: Uuid) -> bool {
        self.source_id == node_id || self.target_id == node_id
    }
}

/// 规则链定义, 描述了一个完整的规则处理流程.
///
/// 节点与连接只能通过图编辑操作和生命周期操作修改, 以便集中维护以下不变量:
/// 节点标识在链内唯一; 每条连接的两端都指向链内现有节点;
/// `updated_at` 不早于 `created_at` 且单调不减.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ChainDocument")]
#[serde(rename_all = "camelCase")]
pub struct RuleChain {
    id: Uuid,
    name: String,
    description: String,
    status: ChainStatus,
    nodes: Vec<RuleNode>,
    connections: Vec<Connection>,
    debug_mode: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    /// 节点标识到 `nodes` 下标的索引
    #[serde(skip)]
    index: HashMap<Uuid, usize>,
}

/// 规则链在持久化层中的文档形态
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainDocument {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub status: ChainStatus,
    #[serde(default)]
    pub nodes: Vec<RuleNode>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub debug_mode: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ChainDocument> for RuleChain {
    type Error = RuleError;

    fn try_from(doc: ChainDocument) -> Result<Self> {
        let chain = RuleChain {
            id: doc.id,
            name: doc.name,
            description: doc.description,
            status: doc.status,
            index: HashMap::new(),
            nodes: doc.nodes,
            connections: doc.connections,
            debug_mode: doc.debug_mode,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
        .reindexed();
        chain.validate()?;
        Ok(chain)
    }
}

impl RuleChain {
    pub(crate) fn empty(id: Uuid, name: String, description: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            description,
            status: ChainStatus::Draft,
            nodes: Vec::new(),
            connections: Vec::new(),
            debug_mode: false,
            created_at: now,
            updated_at: now,
            index: HashMap::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> ChainStatus {
        self.status
    }

    pub fn debug_mode(&self) -> bool {
        self.debug_mode
    }

    pub fn nodes(&self) -> &[RuleNode] {
        &self.nodes
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn node(&self, id: Uuid) -> Option<&RuleNode> {
        self.index.get(&id).map(|&i| &self.nodes[i])
    }

    pub fn contains_node(&self, id: Uuid) -> bool {
        self.index.contains_key(&id)
    }

    pub fn connection(&self, id: Uuid) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == id)
    }

    /// 没有入边的节点, 按节点顺序返回
    pub fn roots(&self) -> Vec<&RuleNode> {
        let targets: HashSet<Uuid> = self.connections.iter().map(|c| c.target_id).collect();
        self.nodes
            .iter()
            .filter(|n| !targets.contains(&n.id))
            .collect()
    }

    pub fn outgoing(&self, node_id: Uuid) -> impl Iterator<Item = &Connection> {
        self.connections
            .iter()
            .filter(move |c| c.source_id == node_id)
    }

    pub fn incoming(&self, node_id: Uuid) -> impl Iterator<Item = &Connection> {
        self.connections
            .iter()
            .filter(move |c| c.target_id == node_id)
    }

    /// 序列化为持久化文档
    pub fn to_document(&self) -> ChainDocument {
        ChainDocument {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            status: self.status,
            nodes: self.nodes.clone(),
            connections: self.connections.clone(),
            debug_mode: self.debug_mode,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// 校验来自外部协作方的规则链文档
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(RuleError::InvalidName("规则链名称".to_string()));
        }

        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.id) {
                return Err(RuleError::MalformedConfiguration(format!(
                    "节点标识重复: {}",
                    node.id
                )));
            }
            if node.name.trim().is_empty() {
                return Err(RuleError::InvalidName(format!("节点 {}", node.id)));
            }
        }

        let mut connection_ids = HashSet::new();
        for conn in &self.connections {
            if !connection_ids.insert(conn.id) {
                return Err(RuleError::MalformedConfiguration(format!(
                    "连接标识重复: {}",
                    conn.id
                )));
            }
            for endpoint in [conn.source_id, conn.target_id] {
                if !seen.contains(&endpoint) {
                    return Err(RuleError::NodeNotFound(endpoint));
                }
            }
            if conn.source_id == conn.target_id {
                return Err(RuleError::SelfConnection(conn.source_id));
            }
        }

        if self.updated_at < self.created_at {
            return Err(RuleError::MalformedConfiguration(
                "更新时间早于创建时间".to_string(),
            ));
        }

        Ok(())
    }

    /// 刷新更新时间, 保证单调不减
    pub(crate) fn touch(&mut self) {
        let now = Utc::now();
        if now > self.updated_at {
            self.updated_at = now;
        }
    }

    pub(crate) fn set_info(&mut self, name: String, description: String, debug_mode: bool) {
        self.name = name;
        self.description = description;
        self.debug_mode = debug_mode;
        self.touch();
    }

    pub(crate) fn set_status(&mut self, status: ChainStatus) {
        self.status = status;
        self.touch();
    }

    pub(crate) fn push_node(&mut self, node: RuleNode) {
        self.index.insert(node.id, self.nodes.len());
        self.nodes.push(node);
    }

    pub(crate) fn node_mut(&mut self, id: Uuid) -> Option<&mut RuleNode> {
        match self.index.get(&id) {
            Some(&i) => self.nodes.get_mut(i),
            None => None,
        }
    }

    pub(crate) fn remove_node_cascade(&mut self, id: Uuid) -> Option<RuleNode> {
        let i = self.index.remove(&id)?;
        let node = self.nodes.remove(i);
        self.connections.retain(|c| !c.touches(id));
        self.rebuild_index();
        Some(node)
    }

    pub(crate) fn push_connection(&mut self, conn: Connection) {
        self.connections.push(conn);
    }

    pub(crate) fn remove_connection_by_id(&mut self, id: Uuid) -> Option<Connection> {
        let i = self.connections.iter().position(|c| c.id == id)?;
        Some(self.connections.remove(i))
    }

    fn reindexed(mut self) -> Self {
        self.rebuild_index();
        self
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id, i))
            .collect();
    }
}

/// 规则链模板中的连接
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateConnection {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

/// 只读的规则链模板, 仅供复制生成新的规则链
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleChainTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub nodes: Vec<TemplateNode>,
    #[serde(default)]
    pub connections: Vec<TemplateConnection>,
}
