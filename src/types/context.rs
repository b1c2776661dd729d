use super::*;

/// 单个节点执行时可见的上下文
#[derive(Debug, Clone)]
pub struct NodeContext<'a> {
    pub node: &'a RuleNode,
    pub chain_id: Uuid,
    pub debug_mode: bool,
    pub max_expression_depth: usize,
}

impl<'a> NodeContext<'a> {
    pub fn new(node: &'a RuleNode, ctx: &ExecutionContext) -> Self {
        Self {
            node,
            chain_id: ctx.chain_id,
            debug_mode: ctx.debug_mode,
            max_expression_depth: ctx.max_expression_depth,
        }
    }

    /// 构造当前节点的模拟执行错误
    pub fn fail(&self, message: impl Into<String>) -> RuleError {
        RuleError::PerNodeSimulationError {
            node_id: self.node.id,
            message: message.into(),
        }
    }
}

/// 一次模拟执行的共享上下文
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub chain_id: Uuid,
    pub debug_mode: bool,
    pub max_expression_depth: usize,
}

impl ExecutionContext {
    pub fn new(chain: &RuleChain, max_expression_depth: usize) -> Self {
        Self {
            chain_id: chain.id(),
            debug_mode: chain.debug_mode(),
            max_expression_depth,
        }
    }
}
