use crate::engine::{NodeHandler, NodeOutcome};
use crate::expr;
use crate::types::{Message, NodeContext, RuleError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    /// 条件表达式, 例如 `temperature > 30`
    #[serde(default)]
    pub condition: String,
}

#[derive(Debug)]
pub struct FilterNode {
    pub(crate) config: FilterConfig,
}

impl FilterNode {
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    fn eval_condition(&self, ctx: &NodeContext, msg: &Message) -> Result<bool, RuleError> {
        if self.config.condition.trim().is_empty() {
            return Err(ctx.fail("过滤条件为空"));
        }
        let condition = expr::compile(&self.config.condition, ctx.max_expression_depth)
            .map_err(|e| ctx.fail(format!("条件 `{}` 无效: {}", self.config.condition, e)))?;
        expr::evaluate_bool(&condition, &msg.data)
            .map_err(|e| ctx.fail(format!("条件 `{}` 求值失败: {}", self.config.condition, e)))
    }
}

impl NodeHandler for FilterNode {
    fn handle(&self, ctx: &NodeContext<'_>, msg: Message) -> Result<NodeOutcome, RuleError> {
        if self.eval_condition(ctx, &msg)? {
            Ok(NodeOutcome::forward(msg, "条件满足，继续执行"))
        } else {
            Ok(NodeOutcome::Halt {
                msg,
                note: format!("条件 `{}` 不满足，消息被过滤", self.config.condition),
            })
        }
    }
}
