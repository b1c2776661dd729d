use crate::engine::{NodeHandler, NodeOutcome};
use crate::types::{Message, NodeContext, RuleError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 外部调用节点配置. 除地址与方法外的字段 (headers、body 等) 原样保留.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl Default for ExternalConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            method: default_method(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug)]
pub struct ExternalNode {
    config: ExternalConfig,
}

impl ExternalNode {
    pub fn new(config: ExternalConfig) -> Self {
        Self { config }
    }

    /// 替换 URL 中的 `${field}` 变量
    fn render_url(&self, msg: &Message) -> String {
        let mut url = self.config.url.clone();
        if url.contains("${") {
            if let Some(obj) = msg.data.as_object() {
                for (key, value) in obj {
                    let text = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    url = url.replace(&format!("${{{}}}", key), &text);
                }
            }
        }
        url
    }
}

impl NodeHandler for ExternalNode {
    fn handle(&self, ctx: &NodeContext<'_>, msg: Message) -> Result<NodeOutcome, RuleError> {
        if self.config.url.trim().is_empty() {
            return Err(ctx.fail("外部调用地址为空"));
        }

        let url = self.render_url(&msg);
        let note = format!(
            "模拟调用 {} {}，未发出网络请求",
            self.config.method.to_uppercase(),
            url
        );
        Ok(NodeOutcome::Forward {
            msg,
            note,
            detail: Some(serde_json::to_value(&self.config)?),
        })
    }
}
