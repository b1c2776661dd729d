use crate::types::NodeKind;
use serde::{Deserialize, Serialize};

/// 节点类型的展示信息, 供画布和组件面板使用
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct NodeDescriptor {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub name: String,
    pub description: String,
    pub color: String,
    pub icon: String,
}
