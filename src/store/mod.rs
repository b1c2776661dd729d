mod file;
mod memory;
mod template;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use template::BuiltinTemplates;

use crate::types::{RuleChain, RuleChainTemplate, RuleError};
use async_trait::async_trait;
use uuid::Uuid;

/// 规则链持久化协作方.
///
/// 存储失败只作为普通的操作失败返回, 内存中的规则链不受影响.
#[async_trait]
pub trait ChainStore: Send + Sync + std::fmt::Debug {
    async fn save(&self, chain: &RuleChain) -> Result<(), RuleError>;

    /// 读取并校验规则链文档, 不存在时返回 `None`
    async fn load(&self, id: Uuid) -> Result<Option<RuleChain>, RuleError>;

    async fn delete(&self, id: Uuid) -> Result<(), RuleError>;

    async fn list(&self) -> Result<Vec<Uuid>, RuleError>;
}

/// 只读的模板协作方
#[async_trait]
pub trait TemplateSource: Send + Sync + std::fmt::Debug {
    async fn list(&self) -> Result<Vec<RuleChainTemplate>, RuleError>;

    async fn get(&self, id: &str) -> Result<RuleChainTemplate, RuleError> {
        self.list()
            .await?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| RuleError::TemplateNotFound(id.to_string()))
    }
}

#[async_trait]
impl TemplateSource for Vec<RuleChainTemplate> {
    async fn list(&self) -> Result<Vec<RuleChainTemplate>, RuleError> {
        Ok(self.clone())
    }
}
