use pretty_assertions::assert_eq;
use rule_chain::config::{EngineConfig, StoreKind};
use rule_chain::{
    BuiltinTemplates, ChainManager, ChainStatus, ChainStore, FileStore, MemoryStore, Message,
    NodeKind, Position, RuleChain, RuleError, Simulator, TraceStatus,
};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// 总是失败的存储
#[derive(Debug)]
struct OfflineStore;

#[async_trait]
impl ChainStore for OfflineStore {
    async fn save(&self, _chain: &RuleChain) -> Result<(), RuleError> {
        Err(RuleError::Store("后端不可用".to_string()))
    }

    async fn load(&self, _id: Uuid) -> Result<Option<RuleChain>, RuleError> {
        Err(RuleError::Store("后端不可用".to_string()))
    }

    async fn delete(&self, _id: Uuid) -> Result<(), RuleError> {
        Err(RuleError::Store("后端不可用".to_string()))
    }

    async fn list(&self) -> Result<Vec<Uuid>, RuleError> {
        Ok(Vec::new())
    }
}

fn manager_with(store: Arc<dyn ChainStore>) -> ChainManager {
    let config = EngineConfig::default();
    ChainManager::new(
        store,
        Arc::new(BuiltinTemplates),
        Simulator::new(config.simulator),
        config.editor,
    )
}

#[test_log::test(tokio::test)]
async fn lifecycle_through_manager() {
    let manager = ChainManager::default();
    let id = manager.create_chain("温度监控", "车间温度").await.unwrap();
    assert_eq!(manager.get_chain(id).await.unwrap().status(), ChainStatus::Draft);

    assert_eq!(manager.toggle_status(id).await.unwrap(), ChainStatus::Active);
    assert_eq!(manager.toggle_status(id).await.unwrap(), ChainStatus::Inactive);
    manager.activate(id).await.unwrap();
    assert_eq!(manager.get_chain(id).await.unwrap().status(), ChainStatus::Active);

    manager.update_info(id, "温度监控 v2", "车间温度", true).await.unwrap();
    let chain = manager.get_chain(id).await.unwrap();
    assert_eq!(chain.name(), "温度监控 v2");
    assert!(chain.debug_mode());

    manager.delete_chain(id).await.unwrap();
    assert!(matches!(
        manager.get_chain(id).await,
        Err(RuleError::ChainNotFound(_))
    ));
    assert!(matches!(
        manager.delete_chain(id).await,
        Err(RuleError::ChainNotFound(_))
    ));
}

#[test_log::test(tokio::test)]
async fn template_clone_and_simulate() {
    let manager = ChainManager::default();
    assert_eq!(manager.templates().await.unwrap().len(), 2);

    let id = manager.clone_from_template("tpl-1").await.unwrap();
    let chain = manager.get_chain(id).await.unwrap();
    assert_eq!(chain.name(), "温度告警模板 - 副本");
    assert_eq!(chain.status(), ChainStatus::Draft);

    let result = manager
        .simulate(id, Message::new("test", json!({"temperature": 36})))
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(result.processed_node_count, 2);
    assert!(result.logs.iter().all(|e| e.status == TraceStatus::Success));
    assert_eq!(
        result.logs[1].detail,
        Some(json!({"type": "email", "recipients": ["admin@example.com"]}))
    );

    assert!(matches!(
        manager.clone_from_template("tpl-404").await,
        Err(RuleError::TemplateNotFound(_))
    ));
}

#[test_log::test(tokio::test)]
async fn list_is_sorted_by_creation() {
    let manager = ChainManager::default();
    let mut ids = Vec::new();
    for i in 0..4 {
        ids.push(manager.create_chain(&format!("链{}", i), "").await.unwrap());
    }
    let listed = manager.list_chains().await;
    assert!(listed
        .windows(2)
        .all(|w| (w[0].created_at(), w[0].id()) <= (w[1].created_at(), w[1].id())));
    let mut listed: Vec<Uuid> = listed.iter().map(|c| c.id()).collect();
    listed.sort();
    ids.sort();
    assert_eq!(listed, ids);
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 4))]
async fn concurrent_edits_are_serialised_per_chain() {
    let manager = ChainManager::default();
    let id = manager.create_chain("并发", "").await.unwrap();

    let mut handles = Vec::new();
    for i in 0..16 {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move {
            manager
                .add_node(id, NodeKind::Action, Some(Position::new(i as f64, 0.0)), None)
                .await
        }));
    }
    let mut node_ids = Vec::new();
    for handle in handles {
        node_ids.push(handle.await.unwrap().unwrap());
    }

    let chain = manager.get_chain(id).await.unwrap();
    assert_eq!(chain.nodes().len(), 16);
    for node_id in node_ids {
        assert!(chain.node(node_id).is_some());
    }
    chain.validate().unwrap();
}

#[test_log::test(tokio::test)]
async fn file_store_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = EngineConfig::default();
    config.store.kind = StoreKind::File;
    config.store.dir = dir.path().to_path_buf();

    let manager = ChainManager::from_config(&config);
    let id = manager.create_chain("持久化", "").await.unwrap();
    let filter = manager
        .add_node(id, NodeKind::Filter, None, Some("过滤"))
        .await
        .unwrap();
    let action = manager.add_node(id, NodeKind::Action, None, None).await.unwrap();
    manager
        .edit(id, |chain| chain.add_connection(filter, action))
        .await
        .unwrap();
    manager.save(id).await.unwrap();
    let saved = manager.get_chain(id).await.unwrap();

    // 内存中的修改在重新加载后被存储中的版本替换
    manager
        .edit(id, |chain| chain.delete_node(action))
        .await
        .unwrap();
    manager.load(id).await.unwrap();
    assert_eq!(manager.get_chain(id).await.unwrap(), saved);

    let other = ChainManager::from_config(&config);
    assert_eq!(other.load_all().await.unwrap(), 1);
    assert_eq!(other.get_chain(id).await.unwrap(), saved);

    let store = FileStore::new(dir.path());
    assert_eq!(store.list().await.unwrap(), vec![id]);
}

#[test_log::test(tokio::test)]
async fn store_failure_keeps_chain_editable() {
    let manager = manager_with(Arc::new(OfflineStore));
    let id = manager.create_chain("离线", "").await.unwrap();
    manager.add_node(id, NodeKind::Filter, None, None).await.unwrap();

    assert!(matches!(manager.save(id).await, Err(RuleError::Store(_))));
    assert!(matches!(manager.load(id).await, Err(RuleError::Store(_))));

    manager.add_node(id, NodeKind::Action, None, None).await.unwrap();
    assert_eq!(manager.get_chain(id).await.unwrap().nodes().len(), 2);
}

#[test_log::test(tokio::test)]
async fn failed_store_delete_keeps_chain() {
    let manager = manager_with(Arc::new(OfflineStore));
    let id = manager.create_chain("离线删除", "").await.unwrap();
    manager.add_node(id, NodeKind::Filter, None, None).await.unwrap();
    let before = manager.get_chain(id).await.unwrap();

    assert!(matches!(manager.delete_chain(id).await, Err(RuleError::Store(_))));
    assert_eq!(manager.get_chain(id).await.unwrap(), before);
    assert_eq!(manager.list_chains().await.len(), 1);

    manager.add_node(id, NodeKind::Action, None, None).await.unwrap();
    assert_eq!(manager.get_chain(id).await.unwrap().nodes().len(), 2);
}

#[test_log::test(tokio::test)]
async fn duplicate_chain_survives_save_and_reload() {
    let manager = manager_with(Arc::new(MemoryStore::new()));
    let id = manager.clone_from_template("tpl-1").await.unwrap();
    let copy = manager.duplicate_chain(id).await.unwrap();
    manager.save(copy).await.unwrap();
    let saved = manager.get_chain(copy).await.unwrap();

    manager.delete_chain(id).await.unwrap();
    manager.load(copy).await.unwrap();
    assert_eq!(manager.get_chain(copy).await.unwrap(), saved);
    assert_eq!(saved.name(), "温度告警模板 - 副本 - 副本");

    let result = manager
        .simulate(copy, Message::new("test", json!({"temperature": 36})))
        .await
        .unwrap();
    assert_eq!(result.processed_node_count, 2);
}

#[test_log::test(tokio::test)]
async fn load_of_unknown_id_is_not_found() {
    let manager = manager_with(Arc::new(MemoryStore::new()));
    assert!(matches!(
        manager.load(Uuid::new_v4()).await,
        Err(RuleError::ChainNotFound(_))
    ));
}
