use super::TemplateSource;
use crate::types::{
    NodeKind, Position, RuleChainTemplate, RuleError, TemplateConnection, TemplateNode,
};
use async_trait::async_trait;
use lazy_static::lazy_static;
use serde_json::{json, Value};

lazy_static! {
    static ref BUILTIN: Vec<RuleChainTemplate> = vec![
        two_step(
            "tpl-1",
            "温度告警模板",
            "监控温度并发送告警",
            "环境监控",
            ("温度过滤器", "过滤温度数据", json!({"condition": "temperature > 30"})),
            (
                "告警发送",
                "发送告警通知",
                json!({"type": "email", "recipients": ["admin@example.com"]}),
            ),
        ),
        two_step(
            "tpl-2",
            "设备状态模板",
            "监控设备状态变化",
            "设备管理",
            ("状态过滤器", "过滤设备状态", json!({"condition": "status !== \"online\""})),
            (
                "状态记录",
                "记录状态变化",
                json!({"type": "database", "table": "device_status_log"}),
            ),
        ),
    ];
}

/// 过滤器接执行器的两节点模板
fn two_step(
    id: &str,
    name: &str,
    description: &str,
    category: &str,
    filter: (&str, &str, Value),
    action: (&str, &str, Value),
) -> RuleChainTemplate {
    let node = |suffix: &str, kind: NodeKind, x: f64, (name, description, configuration): (&str, &str, Value)| {
        TemplateNode {
            id: format!("{}-{}", id, suffix),
            name: name.to_string(),
            kind,
            configuration,
            position: Position::new(x, 100.0),
            description: Some(description.to_string()),
        }
    };

    RuleChainTemplate {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        category: category.to_string(),
        nodes: vec![
            node("filter", NodeKind::Filter, 100.0, filter),
            node("action", NodeKind::Action, 300.0, action),
        ],
        connections: vec![TemplateConnection {
            id: format!("{}-conn", id),
            source_id: format!("{}-filter", id),
            target_id: format!("{}-action", id),
            source_handle: None,
            target_handle: None,
        }],
    }
}

/// 内置模板
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTemplates;

#[async_trait]
impl TemplateSource for BuiltinTemplates {
    async fn list(&self) -> Result<Vec<RuleChainTemplate>, RuleError> {
        Ok(BUILTIN.clone())
    }
}
