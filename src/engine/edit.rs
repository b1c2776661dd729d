use crate::engine::NodeCatalog;
use crate::types::{Connection, NodeConfig, NodeKind, Position, Result, RuleChain, RuleError, RuleNode};
use tracing::debug;
use uuid::Uuid;

/// 图编辑操作.
///
/// 每个操作要么完整生效并刷新 `updated_at`, 要么返回错误且规则链保持不变.
impl RuleChain {
    /// 添加节点, 配置取节点目录中的默认配置
    pub fn add_node(
        &mut self,
        kind: NodeKind,
        position: Position,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Uuid> {
        let name = match name {
            Some(name) if name.trim().is_empty() => {
                return Err(RuleError::InvalidName("节点名称".to_string()))
            }
            Some(name) => name.to_string(),
            None => NodeCatalog::default_node_name(kind),
        };
        let position = position.validate()?;

        let id = Uuid::new_v4();
        self.push_node(RuleNode {
            id,
            name,
            config: NodeCatalog::default_configuration(kind),
            position,
            description: description.map(str::to_string),
        });
        self.touch();

        debug!(chain_id = %self.id(), node_id = %id, kind = %kind, "添加节点");
        Ok(id)
    }

    /// 按名称添加节点, 未知类型返回 `InvalidKind`
    pub fn add_node_of(
        &mut self,
        kind: &str,
        position: Position,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Uuid> {
        let kind: NodeKind = kind.parse()?;
        self.add_node(kind, position, name, description)
    }

    /// 移动节点, 拖拽时高频调用
    pub fn move_node(&mut self, node_id: Uuid, position: Position) -> Result<()> {
        let position = position.validate()?;
        let node = self
            .node_mut(node_id)
            .ok_or(RuleError::NodeNotFound(node_id))?;
        node.position = position;
        self.touch();
        Ok(())
    }

    /// 以表单提交的 JSON 文本更新节点.
    ///
    /// 配置按节点现有类型解析, 解析失败时节点保持原样.
    pub fn update_node(
        &mut self,
        node_id: Uuid,
        name: &str,
        description: Option<&str>,
        configuration: &str,
    ) -> Result<()> {
        let kind = self
            .node(node_id)
            .map(RuleNode::kind)
            .ok_or(RuleError::NodeNotFound(node_id))?;
        let config = NodeConfig::parse(kind, configuration)?;
        self.update_node_config(node_id, name, description, config)
    }

    pub fn update_node_config(
        &mut self,
        node_id: Uuid,
        name: &str,
        description: Option<&str>,
        config: NodeConfig,
    ) -> Result<()> {
        if name.trim().is_empty() {
            return Err(RuleError::InvalidName("节点名称".to_string()));
        }
        let node = self
            .node_mut(node_id)
            .ok_or(RuleError::NodeNotFound(node_id))?;
        if node.kind() != config.kind() {
            return Err(RuleError::MalformedConfiguration(format!(
                "{} 节点不能使用 {} 配置",
                node.kind(),
                config.kind()
            )));
        }

        node.name = name.to_string();
        node.description = description.map(str::to_string);
        node.config = config;
        self.touch();

        debug!(chain_id = %self.id(), node_id = %node_id, "更新节点配置");
        Ok(())
    }

    /// 删除节点, 同时删除所有与之相连的连接
    pub fn delete_node(&mut self, node_id: Uuid) -> Result<RuleNode> {
        let removed = self
            .remove_node_cascade(node_id)
            .ok_or(RuleError::NodeNotFound(node_id))?;
        self.touch();

        debug!(chain_id = %self.id(), node_id = %node_id, "删除节点");
        Ok(removed)
    }

    pub fn add_connection(&mut self, source_id: Uuid, target_id: Uuid) -> Result<Uuid> {
        self.add_connection_with_handles(source_id, target_id, None, None)
    }

    /// 添加带连接点的连接, 连接点只用于画布展示
    pub fn add_connection_with_handles(
        &mut self,
        source_id: Uuid,
        target_id: Uuid,
        source_handle: Option<String>,
        target_handle: Option<String>,
    ) -> Result<Uuid> {
        for endpoint in [source_id, target_id] {
            if !self.contains_node(endpoint) {
                return Err(RuleError::NodeNotFound(endpoint));
            }
        }
        if source_id == target_id {
            return Err(RuleError::SelfConnection(source_id));
        }

        let id = Uuid::new_v4();
        self.push_connection(Connection {
            id,
            source_id,
            target_id,
            source_handle,
            target_handle,
        });
        self.touch();

        debug!(chain_id = %self.id(), connection_id = %id, "添加连接 {} -> {}", source_id, target_id);
        Ok(id)
    }

    pub fn remove_connection(&mut self, connection_id: Uuid) -> Result<Connection> {
        let removed = self
            .remove_connection_by_id(connection_id)
            .ok_or(RuleError::ConnectionNotFound(connection_id))?;
        self.touch();
        Ok(removed)
    }

    /// 更新规则链名称、描述和调试模式
    pub fn update_info(&mut self, name: &str, description: &str, debug_mode: bool) -> Result<()> {
        if name.trim().is_empty() {
            return Err(RuleError::InvalidName("规则链名称".to_string()));
        }
        self.set_info(name.to_string(), description.to_string(), debug_mode);
        debug!(chain_id = %self.id(), "更新规则链信息");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::FilterConfig;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn chain() -> RuleChain {
        RuleChain::new("编辑测试", "").unwrap()
    }

    #[test]
    fn add_node_uses_catalog_defaults() {
        let mut chain = chain();
        let before = chain.updated_at();
        let id = chain
            .add_node(NodeKind::Filter, Position::new(10.0, 20.0), None, None)
            .unwrap();

        let node = chain.node(id).unwrap();
        assert_eq!(node.name, "新过滤器");
        assert_eq!(node.config.to_value(), json!({"condition": ""}));
        assert_eq!(node.position, Position::new(10.0, 20.0));
        assert!(chain.updated_at() >= before);
    }

    #[test]
    fn add_node_rejects_unknown_kind() {
        let mut chain = chain();
        let err = chain
            .add_node_of("switch", Position::default(), None, None)
            .unwrap_err();
        assert!(matches!(err, RuleError::InvalidKind(kind) if kind == "switch"));
        assert!(chain.nodes().is_empty());
    }

    #[test]
    fn move_node_is_idempotent() {
        let mut chain = chain();
        let id = chain
            .add_node(NodeKind::Action, Position::default(), None, None)
            .unwrap();
        chain.move_node(id, Position::new(5.0, 6.0)).unwrap();
        let once = chain.node(id).cloned();
        chain.move_node(id, Position::new(5.0, 6.0)).unwrap();
        assert_eq!(chain.node(id).cloned(), once);

        assert!(matches!(
            chain.move_node(Uuid::new_v4(), Position::default()),
            Err(RuleError::NodeNotFound(_))
        ));
    }

    #[test]
    fn non_finite_positions_are_rejected() {
        let mut chain = chain();
        let id = chain
            .add_node(NodeKind::Action, Position::new(1.0, 2.0), None, None)
            .unwrap();
        let before = chain.clone();

        for bad in [
            Position::new(f64::NAN, 0.0),
            Position::new(0.0, f64::INFINITY),
            Position::new(f64::NEG_INFINITY, f64::NAN),
        ] {
            assert!(matches!(
                chain.move_node(id, bad),
                Err(RuleError::InvalidPosition { .. })
            ));
            assert!(matches!(
                chain.add_node(NodeKind::Filter, bad, None, None),
                Err(RuleError::InvalidPosition { .. })
            ));
        }
        assert_eq!(chain, before);

        let json = serde_json::to_string(&chain).unwrap();
        let decoded: RuleChain = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, chain);
    }

    #[test]
    fn malformed_configuration_leaves_node_intact() {
        let mut chain = chain();
        let id = chain
            .add_node(NodeKind::Filter, Position::default(), Some("温度过滤"), None)
            .unwrap();
        let before = chain.clone();

        for bad in ["{not json", "[1, 2]", "\"text\"", r#"{"condition": 42}"#] {
            let err = chain.update_node(id, "改名", None, bad).unwrap_err();
            assert!(matches!(err, RuleError::MalformedConfiguration(_)), "{}", bad);
        }
        assert_eq!(chain, before);

        chain
            .update_node(id, "改名", Some("描述"), r#"{"condition": "temperature > 30"}"#)
            .unwrap();
        let node = chain.node(id).unwrap();
        assert_eq!(node.name, "改名");
        assert_eq!(node.description.as_deref(), Some("描述"));
        assert_eq!(
            node.config,
            NodeConfig::Filter(FilterConfig {
                condition: "temperature > 30".to_string()
            })
        );
    }

    #[test]
    fn typed_update_must_keep_kind() {
        let mut chain = chain();
        let id = chain
            .add_node(NodeKind::Action, Position::default(), None, None)
            .unwrap();
        let err = chain
            .update_node_config(id, "动作", None, NodeConfig::default_for(NodeKind::Filter))
            .unwrap_err();
        assert!(matches!(err, RuleError::MalformedConfiguration(_)));
        assert_eq!(chain.node(id).unwrap().kind(), NodeKind::Action);
    }

    #[test]
    fn delete_node_cascades_to_connections() {
        let mut chain = chain();
        let a = chain.add_node(NodeKind::Filter, Position::default(), None, None).unwrap();
        let b = chain.add_node(NodeKind::Transform, Position::default(), None, None).unwrap();
        let c = chain.add_node(NodeKind::Action, Position::default(), None, None).unwrap();
        chain.add_connection(a, b).unwrap();
        chain.add_connection(b, c).unwrap();
        let keep = chain.add_connection(a, c).unwrap();

        let removed = chain.delete_node(b).unwrap();
        assert_eq!(removed.id, b);
        assert_eq!(chain.connections().len(), 1);
        assert_eq!(chain.connections()[0].id, keep);
        assert!(chain.node(c).is_some());

        assert!(matches!(chain.delete_node(b), Err(RuleError::NodeNotFound(id)) if id == b));
    }

    #[test]
    fn connections_require_existing_distinct_endpoints() {
        let mut chain = chain();
        let a = chain.add_node(NodeKind::Filter, Position::default(), None, None).unwrap();
        let b = chain.add_node(NodeKind::Action, Position::default(), None, None).unwrap();

        assert!(matches!(
            chain.add_connection(a, Uuid::new_v4()),
            Err(RuleError::NodeNotFound(_))
        ));
        assert!(matches!(
            chain.add_connection(a, a),
            Err(RuleError::SelfConnection(id)) if id == a
        ));
        assert!(chain.connections().is_empty());

        let first = chain.add_connection(a, b).unwrap();
        let second = chain.add_connection(a, b).unwrap();
        assert_ne!(first, second);
        assert_eq!(chain.connections().len(), 2);

        chain.remove_connection(first).unwrap();
        assert!(matches!(
            chain.remove_connection(first),
            Err(RuleError::ConnectionNotFound(_))
        ));
        assert_eq!(chain.connections().len(), 1);
    }

    #[test]
    fn update_info_requires_name() {
        let mut chain = chain();
        assert!(matches!(
            chain.update_info("  ", "desc", true),
            Err(RuleError::InvalidName(_))
        ));
        chain.update_info("新名称", "desc", true).unwrap();
        assert_eq!(chain.name(), "新名称");
        assert!(chain.debug_mode());
    }

    #[test]
    fn chain_info_changes_only_through_update_info() {
        let mut chain = chain();
        let created = chain.updated_at();
        let before = chain.clone();

        assert!(matches!(
            chain.update_info("", "描述", true),
            Err(RuleError::InvalidName(_))
        ));
        assert_eq!(chain, before);

        std::thread::sleep(std::time::Duration::from_millis(2));
        chain.update_info("改名", "新描述", true).unwrap();
        assert_eq!(chain.name(), "改名");
        assert_eq!(chain.description(), "新描述");
        assert!(chain.debug_mode());
        assert!(chain.updated_at() > created);

        let decoded: RuleChain =
            serde_json::from_str(&serde_json::to_string(&chain).unwrap()).unwrap();
        assert_eq!(decoded, chain);
        assert_eq!(decoded.name(), "改名");
    }
}
