use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// 模拟执行时在节点间传递的消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub msg_type: String,
    pub metadata: HashMap<String, String>,
    pub data: serde_json::Value,
    pub timestamp: i64,
}

impl Message {
    pub fn new(msg_type: &str, data: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            msg_type: msg_type.to_string(),
            metadata: HashMap::new(),
            data,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// 用新的数据替换消息体, 保留消息标识与元数据
    pub fn with_data(&self, data: serde_json::Value) -> Self {
        Self {
            id: self.id,
            msg_type: self.msg_type.clone(),
            metadata: self.metadata.clone(),
            data,
            timestamp: self.timestamp,
        }
    }
}
