use crate::aop::{InterceptorManager, NodeInterceptor};
use crate::config::SimulatorConfig;
use crate::engine::{create_handler, NodeOutcome};
use crate::types::{
    ExecutionContext, Message, NodeContext, RuleChain, RuleError, RuleNode, TestResult,
    TraceEntry, TraceStatus,
};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

/// 分支在某个节点处的状态
enum Branch {
    Live(Message),
    Dead,
}

/// 模拟执行器.
///
/// 对规则链做一次拓扑遍历, 每个节点只在内存中变换消息, 不产生任何外部调用.
/// 无入口、存在环或超过节点上限时整体中止, 单个节点的错误只终止所在分支.
#[derive(Debug, Clone, Default)]
pub struct Simulator {
    config: SimulatorConfig,
    interceptors: InterceptorManager,
}

impl Simulator {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            config,
            interceptors: InterceptorManager::new(),
        }
    }

    pub fn with_interceptor(mut self, interceptor: Arc<dyn NodeInterceptor>) -> Self {
        self.interceptors.register_node_interceptor(interceptor);
        self
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn simulate(&self, chain: &RuleChain, input: Message) -> TestResult {
        let started = Instant::now();
        let mut result = match self.traversal_order(chain) {
            Ok(order) => self.run(chain, &order, input),
            Err(e) => {
                warn!(chain_id = %chain.id(), "模拟执行中止: {}", e);
                aborted(chain, input, e)
            }
        };
        result.execution_time_ms = started.elapsed().as_secs_f64() * 1000.0;

        self.interceptors.finished(&result);
        result
    }

    /// Kahn 拓扑排序, 入口按节点顺序排列
    fn traversal_order<'a>(&self, chain: &'a RuleChain) -> Result<Vec<&'a RuleNode>, RuleError> {
        let nodes = chain.nodes();
        if nodes.len() > self.config.max_nodes {
            return Err(RuleError::SimulationLimit(self.config.max_nodes));
        }
        if nodes.is_empty() {
            return Err(RuleError::NoEntryPoint);
        }

        let mut in_degree: HashMap<Uuid, usize> = nodes.iter().map(|n| (n.id, 0)).collect();
        for conn in chain.connections() {
            if let Some(degree) = in_degree.get_mut(&conn.target_id) {
                *degree += 1;
            }
        }

        let mut queue: VecDeque<&RuleNode> = chain.roots().into_iter().collect();
        if queue.is_empty() {
            // 非空且没有入口, 每个节点都在环上
            return Err(RuleError::CyclicGraph);
        }

        let mut sorted = Vec::with_capacity(nodes.len());
        while let Some(node) = queue.pop_front() {
            sorted.push(node);
            for conn in chain.outgoing(node.id) {
                if let Some(degree) = in_degree.get_mut(&conn.target_id) {
                    *degree -= 1;
                    if *degree == 0 {
                        if let Some(next) = chain.node(conn.target_id) {
                            queue.push_back(next);
                        }
                    }
                }
            }
        }

        if sorted.len() != nodes.len() {
            return Err(RuleError::CyclicGraph);
        }
        Ok(sorted)
    }

    fn run(&self, chain: &RuleChain, order: &[&RuleNode], input: Message) -> TestResult {
        let exec = ExecutionContext::new(chain, self.config.max_expression_depth);
        let rank: HashMap<Uuid, usize> = order.iter().enumerate().map(|(i, n)| (n.id, i)).collect();

        let mut branches: HashMap<Uuid, Branch> = HashMap::with_capacity(order.len());
        let mut logs = Vec::with_capacity(order.len());
        let mut processed = 0;
        let mut failed = false;
        let mut output = input.data.clone();

        for &node in order {
            let msg = match self.node_input(chain, node, &rank, &branches, &input) {
                Some(msg) => msg,
                None => {
                    debug!(chain_id = %chain.id(), node_id = %node.id, "上游分支已终止, 跳过节点");
                    logs.push(TraceEntry {
                        node_id: Some(node.id),
                        node: node.name.clone(),
                        status: TraceStatus::Skipped,
                        message: "上游分支已终止，节点未执行".to_string(),
                        detail: None,
                    });
                    branches.insert(node.id, Branch::Dead);
                    continue;
                }
            };

            processed += 1;
            let ctx = NodeContext::new(node, &exec);
            match self.execute_node(&ctx, msg) {
                Ok(outcome) => {
                    output = outcome.message().data.clone();
                    let (branch, note, detail) = match outcome {
                        NodeOutcome::Forward { msg, note, detail } => (Branch::Live(msg), note, detail),
                        NodeOutcome::Halt { note, .. } => (Branch::Dead, note, None),
                    };
                    logs.push(TraceEntry {
                        node_id: Some(node.id),
                        node: node.name.clone(),
                        status: TraceStatus::Success,
                        message: note,
                        detail,
                    });
                    branches.insert(node.id, branch);
                }
                Err(e) => {
                    failed = true;
                    logs.push(TraceEntry {
                        node_id: Some(node.id),
                        node: node.name.clone(),
                        status: TraceStatus::Error,
                        message: e.to_string(),
                        detail: None,
                    });
                    branches.insert(node.id, Branch::Dead);
                }
            }
        }

        TestResult {
            success: !failed,
            execution_time_ms: 0.0,
            processed_node_count: processed,
            output,
            logs,
        }
    }

    /// 计算节点输入: 入口节点取原始消息, 其余节点合并所有存活上游的输出.
    /// 所有上游都已终止时返回 `None`.
    fn node_input(
        &self,
        chain: &RuleChain,
        node: &RuleNode,
        rank: &HashMap<Uuid, usize>,
        branches: &HashMap<Uuid, Branch>,
        input: &Message,
    ) -> Option<Message> {
        let mut parents: Vec<Uuid> = chain.incoming(node.id).map(|c| c.source_id).collect();
        if parents.is_empty() {
            return Some(input.clone());
        }
        parents.sort_by_key(|id| rank.get(id).copied().unwrap_or(usize::MAX));
        parents.dedup();

        let mut live = parents.iter().filter_map(|id| match branches.get(id) {
            Some(Branch::Live(msg)) => Some(msg),
            _ => None,
        });
        let first = live.next()?.clone();
        Some(live.fold(first, |merged, msg| {
            let data = merge(merged.data.clone(), &msg.data);
            let mut merged = merged.with_data(data);
            merged.metadata.extend(msg.metadata.clone());
            merged
        }))
    }

    fn execute_node(&self, ctx: &NodeContext<'_>, msg: Message) -> Result<NodeOutcome, RuleError> {
        let handler = create_handler(&ctx.node.config);
        let result = self
            .interceptors
            .before_node(ctx, &msg)
            .and_then(|_| handler.handle(ctx, msg))
            .and_then(|outcome| {
                self.interceptors.after_node(ctx, &outcome)?;
                Ok(outcome)
            });
        if let Err(e) = &result {
            self.interceptors.node_error(ctx, e);
        }
        result
    }
}

/// 后到的上游覆盖同名字段, 非对象数据整体替换
fn merge(base: Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                base.insert(key.clone(), value.clone());
            }
            Value::Object(base)
        }
        (_, overlay) => overlay.clone(),
    }
}

fn aborted(chain: &RuleChain, input: Message, error: RuleError) -> TestResult {
    TestResult {
        success: false,
        execution_time_ms: 0.0,
        processed_node_count: 0,
        output: input.data,
        logs: vec![TraceEntry {
            node_id: None,
            node: chain.name().to_string(),
            status: TraceStatus::Aborted,
            message: error.to_string(),
            detail: None,
        }],
    }
}
