use crate::aop::LoggingInterceptor;
use crate::config::{EditorConfig, EngineConfig, StoreKind};
use crate::engine::Simulator;
use crate::store::{BuiltinTemplates, ChainStore, FileStore, MemoryStore, TemplateSource};
use crate::types::{
    ChainStatus, Message, NodeKind, Position, Result, RuleChain, RuleChainTemplate, RuleError,
    TestResult,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

type ChainSlot = Arc<RwLock<RuleChain>>;

/// 规则链管理器.
///
/// 持有多条规则链, 每条规则链有独立的读写锁, 同一规则链上的编辑串行执行.
/// 持久化失败不影响内存中的规则链.
#[derive(Debug, Clone)]
pub struct ChainManager {
    chains: Arc<RwLock<HashMap<Uuid, ChainSlot>>>,
    store: Arc<dyn ChainStore>,
    templates: Arc<dyn TemplateSource>,
    simulator: Arc<Simulator>,
    editor: EditorConfig,
}

impl ChainManager {
    pub fn new(
        store: Arc<dyn ChainStore>,
        templates: Arc<dyn TemplateSource>,
        simulator: Simulator,
        editor: EditorConfig,
    ) -> Self {
        Self {
            chains: Arc::new(RwLock::new(HashMap::new())),
            store,
            templates,
            simulator: Arc::new(simulator),
            editor,
        }
    }

    /// 按配置创建管理器, 使用内置模板
    pub fn from_config(config: &EngineConfig) -> Self {
        let store: Arc<dyn ChainStore> = match config.store.kind {
            StoreKind::Memory => Arc::new(MemoryStore::new()),
            StoreKind::File => Arc::new(FileStore::new(config.store.dir.clone())),
        };
        let simulator = Simulator::new(config.simulator.clone())
            .with_interceptor(Arc::new(LoggingInterceptor));
        Self::new(
            store,
            Arc::new(BuiltinTemplates),
            simulator,
            config.editor.clone(),
        )
    }

    pub fn editor_config(&self) -> &EditorConfig {
        &self.editor
    }

    async fn slot(&self, id: Uuid) -> Result<ChainSlot> {
        self.chains
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(RuleError::ChainNotFound(id))
    }

    async fn insert(&self, chain: RuleChain) -> Uuid {
        let id = chain.id();
        self.chains
            .write()
            .await
            .insert(id, Arc::new(RwLock::new(chain)));
        id
    }

    pub async fn create_chain(&self, name: &str, description: &str) -> Result<Uuid> {
        let chain = RuleChain::new(name, description)?;
        let id = self.insert(chain).await;
        info!(chain_id = %id, "创建规则链 {}", name);
        Ok(id)
    }

    /// 规则链快照
    pub async fn get_chain(&self, id: Uuid) -> Result<RuleChain> {
        let slot = self.slot(id).await?;
        let chain = slot.read().await;
        Ok(chain.clone())
    }

    /// 所有规则链快照, 按创建时间排序
    pub async fn list_chains(&self) -> Vec<RuleChain> {
        let slots: Vec<ChainSlot> = self.chains.read().await.values().cloned().collect();
        let mut chains = Vec::with_capacity(slots.len());
        for slot in slots {
            chains.push(slot.read().await.clone());
        }
        chains.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().cmp(&b.id()))
        });
        chains
    }

    /// 删除规则链.
    ///
    /// 先从存储中删除, 存储失败时规则链仍保留在内存中.
    pub async fn delete_chain(&self, id: Uuid) -> Result<()> {
        let slot = self.slot(id).await?;
        // 持有写锁, 删除期间不接受编辑
        let _chain = slot.write().await;

        if let Err(e) = self.store.delete(id).await {
            warn!(chain_id = %id, "从存储中删除规则链失败: {}", e);
            return Err(e);
        }
        self.chains.write().await.remove(&id);
        info!(chain_id = %id, "删除规则链");
        Ok(())
    }

    /// 在规则链的写锁内执行一次编辑.
    ///
    /// 编辑作用于副本, 只有成功时才提交, 失败的编辑不会留下部分修改.
    pub async fn edit<T, F>(&self, id: Uuid, f: F) -> Result<T>
    where
        F: FnOnce(&mut RuleChain) -> Result<T>,
    {
        let slot = self.slot(id).await?;
        let mut chain = slot.write().await;
        let mut draft = chain.clone();
        let value = f(&mut draft)?;
        *chain = draft;
        Ok(value)
    }

    /// 添加节点, 未指定位置时使用默认坐标
    pub async fn add_node(
        &self,
        id: Uuid,
        kind: NodeKind,
        position: Option<Position>,
        name: Option<&str>,
    ) -> Result<Uuid> {
        let position = position.unwrap_or(self.editor.default_position);
        self.edit(id, |chain| chain.add_node(kind, position, name, None))
            .await
    }

    /// 拖拽移动节点, 不经过副本直接写入
    pub async fn move_node(&self, id: Uuid, node_id: Uuid, position: Position) -> Result<()> {
        let slot = self.slot(id).await?;
        let mut chain = slot.write().await;
        chain.move_node(node_id, position)
    }

    pub async fn toggle_status(&self, id: Uuid) -> Result<ChainStatus> {
        self.edit(id, |chain| Ok(chain.toggle_status())).await
    }

    pub async fn activate(&self, id: Uuid) -> Result<()> {
        self.edit(id, |chain| {
            chain.activate();
            Ok(())
        })
        .await
    }

    pub async fn deactivate(&self, id: Uuid) -> Result<()> {
        self.edit(id, |chain| {
            chain.deactivate();
            Ok(())
        })
        .await
    }

    pub async fn update_info(
        &self,
        id: Uuid,
        name: &str,
        description: &str,
        debug_mode: bool,
    ) -> Result<()> {
        self.edit(id, |chain| chain.update_info(name, description, debug_mode))
            .await
    }

    pub async fn templates(&self) -> Result<Vec<RuleChainTemplate>> {
        self.templates.list().await
    }

    /// 由模板复制出新的草稿规则链
    pub async fn clone_from_template(&self, template_id: &str) -> Result<Uuid> {
        let template = self.templates.get(template_id).await?;
        let chain = RuleChain::from_template(&template, &self.editor.clone_name_suffix)?;
        Ok(self.insert(chain).await)
    }

    /// 复制现有规则链, 副本为草稿
    pub async fn duplicate_chain(&self, id: Uuid) -> Result<Uuid> {
        let source = self.get_chain(id).await?;
        let copy = source.duplicate(&self.editor.clone_name_suffix)?;
        let copy_id = self.insert(copy).await;
        info!(chain_id = %copy_id, source = %id, "复制规则链");
        Ok(copy_id)
    }

    /// 在规则链的读锁内做一次模拟执行
    pub async fn simulate(&self, id: Uuid, input: Message) -> Result<TestResult> {
        let slot = self.slot(id).await?;
        let chain = slot.read().await;
        Ok(self.simulator.simulate(&chain, input))
    }

    /// 将当前内存中的规则链交给存储
    pub async fn save(&self, id: Uuid) -> Result<()> {
        let snapshot = self.get_chain(id).await?;
        if let Err(e) = self.store.save(&snapshot).await {
            warn!(chain_id = %id, "保存规则链失败: {}", e);
            return Err(e);
        }
        info!(chain_id = %id, "规则链已保存");
        Ok(())
    }

    /// 从存储读取规则链并替换内存中的版本
    pub async fn load(&self, id: Uuid) -> Result<()> {
        let chain = self
            .store
            .load(id)
            .await?
            .ok_or(RuleError::ChainNotFound(id))?;
        chain.validate()?;

        let existing = self.chains.read().await.get(&id).cloned();
        match existing {
            Some(slot) => *slot.write().await = chain,
            None => {
                self.insert(chain).await;
            }
        }
        info!(chain_id = %id, "规则链已加载");
        Ok(())
    }

    /// 加载存储中的全部规则链, 返回加载数量
    pub async fn load_all(&self) -> Result<usize> {
        let ids = self.store.list().await?;
        for &id in &ids {
            self.load(id).await?;
        }
        Ok(ids.len())
    }
}

impl Default for ChainManager {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn failed_edit_leaves_chain_untouched() {
        let manager = ChainManager::default();
        let id = manager.create_chain("链", "").await.unwrap();
        let node = manager
            .add_node(id, NodeKind::Filter, None, None)
            .await
            .unwrap();
        let before = manager.get_chain(id).await.unwrap();

        let err = manager
            .edit(id, |chain| {
                chain.move_node(node, Position::new(1.0, 1.0))?;
                chain.add_connection(node, Uuid::new_v4())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RuleError::NodeNotFound(_)));
        assert_eq!(manager.get_chain(id).await.unwrap(), before);
        assert_eq!(
            before.node(node).unwrap().position,
            Position::new(200.0, 200.0)
        );
    }

    #[tokio::test]
    async fn duplicated_chains_do_not_share_ids() {
        let manager = ChainManager::default();
        let id = manager.clone_from_template("tpl-2").await.unwrap();
        manager.activate(id).await.unwrap();

        let first = manager.duplicate_chain(id).await.unwrap();
        let second = manager.duplicate_chain(id).await.unwrap();
        let source = manager.get_chain(id).await.unwrap();
        let first = manager.get_chain(first).await.unwrap();
        let second = manager.get_chain(second).await.unwrap();

        assert_eq!(first.name(), "设备状态模板 - 副本 - 副本");
        assert_eq!(first.status(), ChainStatus::Draft);
        assert_eq!(source.status(), ChainStatus::Active);
        assert_eq!(manager.list_chains().await.len(), 3);
        for copy in [&first, &second] {
            assert_ne!(copy.id(), source.id());
            for node in copy.nodes() {
                assert!(source.node(node.id).is_none());
            }
            copy.validate().unwrap();
        }
        for node in first.nodes() {
            assert!(second.node(node.id).is_none());
        }

        assert!(matches!(
            manager.duplicate_chain(Uuid::new_v4()).await,
            Err(RuleError::ChainNotFound(_))
        ));
    }

    #[tokio::test]
    async fn unknown_chain_is_reported() {
        let manager = ChainManager::default();
        let missing = Uuid::new_v4();
        assert!(matches!(
            manager.get_chain(missing).await,
            Err(RuleError::ChainNotFound(id)) if id == missing
        ));
        assert!(matches!(
            manager.simulate(missing, Message::new("test", json!({}))).await,
            Err(RuleError::ChainNotFound(_))
        ));
    }
}
