use rule_chain::{logging, ChainManager, EngineConfig, Message, NodeKind, Position};
use serde_json::json;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::from_file(path).await?,
        None => EngineConfig::default(),
    };
    logging::init(&config.log)?;

    let manager = ChainManager::from_config(&config);

    // 由温度告警模板复制一条规则链
    let chain_id = manager.clone_from_template("tpl-1").await?;
    let chain = manager.get_chain(chain_id).await?;
    info!("已创建规则链: {}", chain.name());

    // 在告警前补充设备数据
    let action = chain
        .nodes()
        .iter()
        .find(|n| n.kind() == NodeKind::Action)
        .map(|n| n.id)
        .ok_or_else(|| anyhow::anyhow!("模板缺少执行器节点"))?;
    let enrich = manager
        .add_node(chain_id, NodeKind::Enrichment, Some(Position::new(300.0, 250.0)), Some("设备信息"))
        .await?;
    manager
        .edit(chain_id, |chain| chain.add_connection(action, enrich))
        .await?;
    manager.update_info(chain_id, chain.name(), chain.description(), true).await?;

    for temperature in [35, 10] {
        let msg = Message::new("telemetry", json!({ "deviceId": "sensor-01", "temperature": temperature }));
        let result = manager.simulate(chain_id, msg).await?;
        info!(
            "温度 {}: success={}, 处理节点数={}, 耗时 {:.3}ms",
            temperature, result.success, result.processed_node_count, result.execution_time_ms
        );
        for entry in &result.logs {
            info!("  [{:?}] {}: {}", entry.status, entry.node, entry.message);
        }
        info!("  输出: {}", result.output);
    }

    manager.save(chain_id).await?;
    info!("规则链已保存");

    Ok(())
}
