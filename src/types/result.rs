use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// 单个节点在模拟执行中的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceStatus {
    Success,
    Skipped,
    Error,
    /// 整个模拟被中止 (无入口、存在环、超过节点上限)
    Aborted,
}

/// 执行轨迹中的一条记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<Uuid>,
    pub node: String,
    pub status: TraceStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

/// 一次模拟执行的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub success: bool,
    pub execution_time_ms: f64,
    pub processed_node_count: usize,
    pub output: Value,
    pub logs: Vec<TraceEntry>,
}

impl TestResult {
    /// 按节点标识查找轨迹记录
    pub fn entry(&self, node_id: Uuid) -> Option<&TraceEntry> {
        self.logs.iter().find(|e| e.node_id == Some(node_id))
    }
}
