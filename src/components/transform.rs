use crate::engine::{NodeHandler, NodeOutcome};
use crate::expr;
use crate::types::{Message, NodeContext, RuleError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// 转换节点配置.
///
/// `mappings` 将目标字段映射到表达式, 所有表达式都以输入消息为上下文求值;
/// `remove` 列出映射完成后要删除的字段, 与映射组合即可实现字段重命名.
/// `script` 仅为兼容旧文档而保留, 模拟执行时不会运行.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransformConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub mappings: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remove: Vec<String>,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            script: Some("return msg;".to_string()),
            mappings: BTreeMap::new(),
            remove: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct TransformNode {
    pub(crate) config: TransformConfig,
}

impl TransformNode {
    pub fn new(config: TransformConfig) -> Self {
        Self { config }
    }

    fn apply_mappings(&self, ctx: &NodeContext, msg: &Message) -> Result<Value, RuleError> {
        let Value::Object(input) = &msg.data else {
            return Err(ctx.fail("消息数据不是对象, 无法进行字段映射"));
        };

        let mut output = input.clone();
        for (target, source) in &self.config.mappings {
            let mapping = expr::compile(source, ctx.max_expression_depth)
                .map_err(|e| ctx.fail(format!("字段 {} 的映射 `{}` 无效: {}", target, source, e)))?;
            let value = expr::evaluate(&mapping, &msg.data)
                .map_err(|e| ctx.fail(format!("字段 {} 映射求值失败: {}", target, e)))?;
            output.insert(target.clone(), value);
        }
        for field in &self.config.remove {
            output.remove(field);
        }

        Ok(Value::Object(output))
    }
}

impl NodeHandler for TransformNode {
    fn handle(&self, ctx: &NodeContext<'_>, msg: Message) -> Result<NodeOutcome, RuleError> {
        if self.config.mappings.is_empty() && self.config.remove.is_empty() {
            let note = if self.config.script.is_some() {
                "脚本不会在模拟中执行，消息原样传递"
            } else {
                "未配置映射，消息原样传递"
            };
            return Ok(NodeOutcome::forward(msg, note));
        }

        let data = self.apply_mappings(ctx, &msg)?;
        Ok(NodeOutcome::forward(msg.with_data(data), "数据转换完成"))
    }
}
