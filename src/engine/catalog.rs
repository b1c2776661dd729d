use crate::types::{NodeConfig, NodeDescriptor, NodeKind};
use lazy_static::lazy_static;
use serde_json::Value;
use std::collections::HashMap;

lazy_static! {
    static ref DESCRIPTORS: HashMap<NodeKind, NodeDescriptor> = {
        let entries = [
            (NodeKind::Filter, "过滤器", "根据条件过滤消息", "#1890ff", "filter"),
            (NodeKind::Transform, "转换器", "按字段映射转换消息", "#52c41a", "node-index"),
            (NodeKind::Action, "执行器", "执行告警、日志、入库等动作", "#faad14", "api"),
            (NodeKind::Enrichment, "增强器", "为消息补充设备或资产数据", "#722ed1", "database"),
            (NodeKind::External, "外部调用", "调用外部接口", "#13c2c2", "cloud"),
        ];
        entries
            .into_iter()
            .map(|(kind, name, description, color, icon)| {
                (
                    kind,
                    NodeDescriptor {
                        kind,
                        name: name.to_string(),
                        description: description.to_string(),
                        color: color.to_string(),
                        icon: icon.to_string(),
                    },
                )
            })
            .collect()
    };
}

/// 节点目录: 节点类型的默认配置与展示信息
pub struct NodeCatalog;

impl NodeCatalog {
    pub fn default_configuration(kind: NodeKind) -> NodeConfig {
        NodeConfig::default_for(kind)
    }

    /// 默认配置的 JSON 文档形态
    pub fn default_configuration_json(kind: NodeKind) -> Value {
        Self::default_configuration(kind).to_value()
    }

    pub fn display_name(kind: NodeKind) -> &'static str {
        match kind {
            NodeKind::Filter => "过滤器",
            NodeKind::Transform => "转换器",
            NodeKind::Action => "执行器",
            NodeKind::Enrichment => "增强器",
            NodeKind::External => "外部调用",
        }
    }

    /// 按类型名称取展示名, 未知类型返回空字符串
    pub fn display_name_of(value: &str) -> &'static str {
        value.parse().map(Self::display_name).unwrap_or("")
    }

    pub fn is_valid_kind(value: &str) -> bool {
        value.parse::<NodeKind>().is_ok()
    }

    /// 新建节点的默认名称
    pub fn default_node_name(kind: NodeKind) -> String {
        format!("新{}", Self::display_name(kind))
    }

    pub fn descriptor(kind: NodeKind) -> Option<&'static NodeDescriptor> {
        DESCRIPTORS.get(&kind)
    }

    /// 所有节点类型的描述信息, 按目录顺序排列
    pub fn descriptors() -> Vec<NodeDescriptor> {
        NodeKind::ALL
            .iter()
            .filter_map(|kind| DESCRIPTORS.get(kind).cloned())
            .collect()
    }
}
