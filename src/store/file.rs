use super::ChainStore;
use crate::types::{RuleChain, RuleError};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// 文件存储, 每条规则链对应目录下的一个 `<id>.json` 文件
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }
}

#[async_trait]
impl ChainStore for FileStore {
    async fn save(&self, chain: &RuleChain) -> Result<(), RuleError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let content = serde_json::to_string_pretty(chain)?;

        // 先写临时文件再改名, 避免留下半截文档
        let path = self.path(chain.id());
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!(chain_id = %chain.id(), path = %path.display(), "规则链已写入文件");
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<Option<RuleChain>, RuleError> {
        let content = match tokio::fs::read_to_string(self.path(id)).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let chain: RuleChain = serde_json::from_str(&content)?;
        if chain.id() != id {
            return Err(RuleError::Store(format!(
                "文件 {}.json 中的规则链标识为 {}",
                id,
                chain.id()
            )));
        }
        Ok(Some(chain))
    }

    async fn delete(&self, id: Uuid) -> Result<(), RuleError> {
        match tokio::fs::remove_file(self.path(id)).await {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    async fn list(&self) -> Result<Vec<Uuid>, RuleError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(id) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| Uuid::parse_str(stem).ok())
            {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NodeKind, Position};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn round_trips_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("chains"));
        assert!(store.list().await.unwrap().is_empty());

        let mut chain = RuleChain::new("文件链", "描述").unwrap();
        let a = chain.add_node(NodeKind::Filter, Position::new(1.0, 2.0), None, None).unwrap();
        let b = chain.add_node(NodeKind::External, Position::new(3.0, 4.0), None, None).unwrap();
        chain.add_connection(a, b).unwrap();

        store.save(&chain).await.unwrap();
        assert_eq!(store.list().await.unwrap(), vec![chain.id()]);
        assert_eq!(store.load(chain.id()).await.unwrap(), Some(chain.clone()));

        store.delete(chain.id()).await.unwrap();
        store.delete(chain.id()).await.unwrap();
        assert_eq!(store.load(chain.id()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn rejects_invalid_documents() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let chain = RuleChain::new("链", "").unwrap();

        let mut doc = serde_json::to_value(&chain).unwrap();
        doc["connections"] = serde_json::json!([{
            "id": Uuid::new_v4(),
            "sourceId": Uuid::new_v4(),
            "targetId": Uuid::new_v4()
        }]);
        tokio::fs::write(
            dir.path().join(format!("{}.json", chain.id())),
            doc.to_string(),
        )
        .await
        .unwrap();

        assert!(matches!(
            store.load(chain.id()).await,
            Err(RuleError::Serialization(_))
        ));
    }
}
