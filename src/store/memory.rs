use super::ChainStore;
use crate::types::{RuleChain, RuleError};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// 内存存储, 保存序列化后的文档以保证与文件存储行为一致
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<Uuid, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChainStore for MemoryStore {
    async fn save(&self, chain: &RuleChain) -> Result<(), RuleError> {
        let content = serde_json::to_string(chain)?;
        self.documents.write().await.insert(chain.id(), content);
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<Option<RuleChain>, RuleError> {
        match self.documents.read().await.get(&id) {
            Some(content) => Ok(Some(serde_json::from_str(content)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), RuleError> {
        self.documents.write().await.remove(&id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Uuid>, RuleError> {
        let mut ids: Vec<Uuid> = self.documents.read().await.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }
}
