use crate::engine::NodeOutcome;
use crate::types::{Message, NodeContext, RuleError, TestResult};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 节点拦截器特征, 用于在模拟执行的不同阶段进行拦截处理
pub trait NodeInterceptor: Send + Sync + std::fmt::Debug {
    /// 节点执行前的拦截处理
    fn before(&self, ctx: &NodeContext<'_>, msg: &Message) -> Result<(), RuleError>;

    /// 节点执行后的拦截处理
    fn after(&self, ctx: &NodeContext<'_>, outcome: &NodeOutcome) -> Result<(), RuleError>;

    /// 节点执行出错时的拦截处理
    fn error(&self, ctx: &NodeContext<'_>, error: &RuleError) -> Result<(), RuleError>;

    /// 整个模拟执行结束后的回调
    fn finished(&self, _result: &TestResult) {}
}

/// 拦截器管理器, 用于管理和执行所有注册的拦截器
#[derive(Debug, Default, Clone)]
pub struct InterceptorManager {
    node_interceptors: Vec<Arc<dyn NodeInterceptor>>,
}

impl InterceptorManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册节点拦截器
    pub fn register_node_interceptor(&mut self, interceptor: Arc<dyn NodeInterceptor>) {
        self.node_interceptors.push(interceptor);
    }

    pub fn before_node(&self, ctx: &NodeContext<'_>, msg: &Message) -> Result<(), RuleError> {
        for interceptor in &self.node_interceptors {
            interceptor.before(ctx, msg)?;
        }
        Ok(())
    }

    pub fn after_node(
        &self,
        ctx: &NodeContext<'_>,
        outcome: &NodeOutcome,
    ) -> Result<(), RuleError> {
        for interceptor in &self.node_interceptors {
            interceptor.after(ctx, outcome)?;
        }
        Ok(())
    }

    /// 错误拦截器自身的失败只记录, 不覆盖原始错误
    pub fn node_error(&self, ctx: &NodeContext<'_>, error: &RuleError) {
        for interceptor in &self.node_interceptors {
            if let Err(e) = interceptor.error(ctx, error) {
                warn!(node_id = %ctx.node.id, "错误拦截器执行失败: {}", e);
            }
        }
    }

    pub fn finished(&self, result: &TestResult) {
        for interceptor in &self.node_interceptors {
            interceptor.finished(result);
        }
    }
}

/// 日志节点拦截器, 用于记录节点执行的关键信息
#[derive(Debug)]
pub struct LoggingInterceptor;

impl NodeInterceptor for LoggingInterceptor {
    fn before(&self, ctx: &NodeContext<'_>, msg: &Message) -> Result<(), RuleError> {
        if ctx.debug_mode {
            info!(
                chain_id = %ctx.chain_id,
                node_id = %ctx.node.id,
                kind = %ctx.node.kind(),
                "开始执行节点 [{}], 输入消息: {}",
                ctx.node.name,
                msg.data
            );
        } else {
            debug!(
                chain_id = %ctx.chain_id,
                node_id = %ctx.node.id,
                kind = %ctx.node.kind(),
                "开始执行节点 [{}]",
                ctx.node.name
            );
        }
        Ok(())
    }

    fn after(&self, ctx: &NodeContext<'_>, outcome: &NodeOutcome) -> Result<(), RuleError> {
        debug!(
            chain_id = %ctx.chain_id,
            node_id = %ctx.node.id,
            "节点 [{}] 执行完成: {}",
            ctx.node.name,
            outcome.note()
        );
        Ok(())
    }

    fn error(&self, ctx: &NodeContext<'_>, error: &RuleError) -> Result<(), RuleError> {
        warn!(
            chain_id = %ctx.chain_id,
            node_id = %ctx.node.id,
            "节点 [{}] 执行出错: {}",
            ctx.node.name,
            error
        );
        Ok(())
    }

    fn finished(&self, result: &TestResult) {
        info!(
            success = result.success,
            processed = result.processed_node_count,
            "模拟执行结束, 耗时 {:.3}ms",
            result.execution_time_ms
        );
    }
}
