use crate::engine::{NodeHandler, NodeOutcome};
use crate::types::{Message, NodeContext, RuleError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// 模拟增强结果写入消息的字段
pub const ENRICHMENT_FIELD: &str = "_enrichment";

/// 增强器节点配置, `type` 为数据来源 (device、asset 等)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    #[serde(rename = "type")]
    pub source: String,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            source: "device".to_string(),
            params: Map::new(),
        }
    }
}

#[derive(Debug)]
pub struct EnrichmentNode {
    config: EnrichmentConfig,
}

impl EnrichmentNode {
    pub fn new(config: EnrichmentConfig) -> Self {
        Self { config }
    }
}

impl NodeHandler for EnrichmentNode {
    fn handle(&self, ctx: &NodeContext<'_>, msg: Message) -> Result<NodeOutcome, RuleError> {
        if self.config.source.trim().is_empty() {
            return Err(ctx.fail("增强数据来源为空"));
        }

        // 非对象消息无法合并增强字段, 原样传递
        let data = match &msg.data {
            Value::Object(obj) => {
                let mut obj = obj.clone();
                let slot = obj
                    .entry(ENRICHMENT_FIELD)
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(sources) = slot {
                    sources.insert(
                        self.config.source.clone(),
                        json!({ "enriched": true, "params": self.config.params }),
                    );
                }
                Value::Object(obj)
            }
            other => other.clone(),
        };

        Ok(NodeOutcome::Forward {
            msg: msg.with_data(data),
            note: format!("模拟数据增强 {}", self.config.source),
            detail: Some(serde_json::to_value(&self.config)?),
        })
    }
}
