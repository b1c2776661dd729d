use crate::types::{
    ChainStatus, Connection, Result, RuleChain, RuleChainTemplate, RuleError,
};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

impl ChainStatus {
    /// 切换后的状态, 草稿首次切换为启用
    pub fn toggled(self) -> Self {
        match self {
            ChainStatus::Draft | ChainStatus::Inactive => ChainStatus::Active,
            ChainStatus::Active => ChainStatus::Inactive,
        }
    }
}

impl RuleChain {
    /// 创建一个空的草稿规则链
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RuleError::InvalidName("规则链名称".to_string()));
        }
        Ok(Self::empty(Uuid::new_v4(), name, description.into()))
    }

    pub fn toggle_status(&mut self) -> ChainStatus {
        let next = self.status().toggled();
        self.transition(next);
        next
    }

    pub fn activate(&mut self) {
        self.transition(ChainStatus::Active);
    }

    pub fn deactivate(&mut self) {
        self.transition(ChainStatus::Inactive);
    }

    fn transition(&mut self, next: ChainStatus) {
        let prev = self.status();
        self.set_status(next);
        info!(chain_id = %self.id(), "规则链状态 {:?} -> {:?}", prev, next);
    }

    /// 由模板复制出新的草稿规则链.
    ///
    /// 规则链、节点和连接的标识全部重新生成, 同一模板多次复制不会产生标识冲突.
    pub fn from_template(template: &RuleChainTemplate, name_suffix: &str) -> Result<Self> {
        let mut chain = Self::new(
            format!("{}{}", template.name, name_suffix),
            template.description.clone(),
        )
        .map_err(|_| RuleError::InvalidTemplate(format!("模板 {} 缺少名称", template.id)))?;

        let mut ids: HashMap<&str, Uuid> = HashMap::with_capacity(template.nodes.len());
        for node in &template.nodes {
            let id = Uuid::new_v4();
            if ids.insert(node.id.as_str(), id).is_some() {
                return Err(RuleError::InvalidTemplate(format!(
                    "模板节点标识重复: {}",
                    node.id
                )));
            }
            chain.push_node(node.instantiate(id)?);
        }

        let resolve = |template_id: &str| {
            ids.get(template_id).copied().ok_or_else(|| {
                RuleError::InvalidTemplate(format!("模板连接指向不存在的节点: {}", template_id))
            })
        };
        for conn in &template.connections {
            let source_id = resolve(&conn.source_id)?;
            let target_id = resolve(&conn.target_id)?;
            if source_id == target_id {
                return Err(RuleError::InvalidTemplate(format!(
                    "模板连接 {} 首尾相同",
                    conn.id
                )));
            }
            chain.push_connection(Connection {
                id: Uuid::new_v4(),
                source_id,
                target_id,
                source_handle: conn.source_handle.clone(),
                target_handle: conn.target_handle.clone(),
            });
        }

        info!(chain_id = %chain.id(), template = %template.id, "由模板创建规则链");
        Ok(chain)
    }

    /// 复制为新的草稿规则链.
    ///
    /// 节点和连接重新生成标识, 连接按新标识重新指向; 调试模式和时间戳不继承.
    pub fn duplicate(&self, name_suffix: &str) -> Result<Self> {
        let mut copy = Self::new(
            format!("{}{}", self.name(), name_suffix),
            self.description(),
        )?;

        let mut ids: HashMap<Uuid, Uuid> = HashMap::with_capacity(self.nodes().len());
        for node in self.nodes() {
            let id = Uuid::new_v4();
            ids.insert(node.id, id);
            let mut node = node.clone();
            node.id = id;
            copy.push_node(node);
        }

        for conn in self.connections() {
            let (Some(&source_id), Some(&target_id)) =
                (ids.get(&conn.source_id), ids.get(&conn.target_id))
            else {
                return Err(RuleError::NodeNotFound(conn.source_id));
            };
            copy.push_connection(Connection {
                id: Uuid::new_v4(),
                source_id,
                target_id,
                source_handle: conn.source_handle.clone(),
                target_handle: conn.target_handle.clone(),
            });
        }

        Ok(copy)
    }
}
