use crate::engine::{NodeHandler, NodeOutcome};
use crate::types::{Message, NodeContext, RuleError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

/// 执行器节点配置, `type` 决定动作种类 (log、email、database 等),
/// 其余字段随动作种类变化, 原样保留.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionConfig {
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            action_type: "log".to_string(),
            params: Map::new(),
        }
    }
}

#[derive(Debug)]
pub struct ActionNode {
    config: ActionConfig,
}

impl ActionNode {
    pub fn new(config: ActionConfig) -> Self {
        Self { config }
    }

    /// 替换模板中的 `${msg.xxx}` 与 `${xxx}` 占位符
    fn format_message(template: &str, msg: &Message) -> String {
        let mut result = template.replace("${msg.id}", &msg.id.to_string());
        result = result.replace("${msg.type}", &msg.msg_type);

        if let Some(obj) = msg.data.as_object() {
            for (key, value) in obj {
                let text = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                result = result.replace(&format!("${{msg.{}}}", key), &text);
                result = result.replace(&format!("${{{}}}", key), &text);
            }
        }

        result
    }
}

impl NodeHandler for ActionNode {
    fn handle(&self, ctx: &NodeContext<'_>, msg: Message) -> Result<NodeOutcome, RuleError> {
        if self.config.action_type.trim().is_empty() {
            return Err(ctx.fail("执行器类型为空"));
        }

        let note = match (
            self.config.action_type.as_str(),
            self.config.params.get("template").and_then(Value::as_str),
        ) {
            ("log", Some(template)) => {
                let line = Self::format_message(template, &msg);
                info!(node_id = %ctx.node.id, "模拟日志输出: {}", line);
                format!("模拟执行 log: {}", line)
            }
            (action_type, _) => format!("模拟执行 {}，未产生外部调用", action_type),
        };

        Ok(NodeOutcome::Forward {
            msg,
            note,
            detail: Some(serde_json::to_value(&self.config)?),
        })
    }
}
