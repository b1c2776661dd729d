use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rule_chain::{NodeConfig, NodeKind, Position, RuleChain, RuleError};
use std::collections::HashSet;
use uuid::Uuid;

fn assert_consistent(chain: &RuleChain) {
    let ids: HashSet<Uuid> = chain.nodes().iter().map(|n| n.id).collect();
    assert_eq!(ids.len(), chain.nodes().len(), "节点标识重复");
    for conn in chain.connections() {
        assert!(ids.contains(&conn.source_id), "悬空的起点 {}", conn.source_id);
        assert!(ids.contains(&conn.target_id), "悬空的终点 {}", conn.target_id);
        assert_ne!(conn.source_id, conn.target_id);
    }
    for node in chain.nodes() {
        assert_eq!(chain.node(node.id).map(|n| n.id), Some(node.id));
    }
    assert!(chain.updated_at() >= chain.created_at());
    chain.validate().unwrap();
}

const NAMES: [&str; 4] = ["", "  ", "节点", "改名"];

const CONFIGURATIONS: [&str; 8] = [
    "{not json",
    "[1]",
    "null",
    r#"{"condition": 42}"#,
    r#"{"condition": "temperature > 30"}"#,
    r#"{"script": "msg.x = 1"}"#,
    r#"{"type": "log"}"#,
    "{}",
];

/// 随机选一个现有节点, 偶尔返回不存在的标识
fn pick(rng: &mut StdRng, chain: &RuleChain) -> Uuid {
    if chain.nodes().is_empty() || rng.gen_bool(0.1) {
        return Uuid::new_v4();
    }
    chain.nodes()[rng.gen_range(0..chain.nodes().len())].id
}

#[test]
fn random_edit_sequences_never_leave_dangling_connections() {
    let (mut malformed, mut unnamed, mut off_canvas) = (0, 0, 0);
    for seed in 0..32u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut chain = RuleChain::new("随机链", "").unwrap();
        let mut last_updated = chain.updated_at();

        for _ in 0..200 {
            let before = chain.clone();
            let outcome = match rng.gen_range(0..10) {
                0 | 1 => {
                    let kind = NodeKind::ALL[rng.gen_range(0..NodeKind::ALL.len())];
                    chain
                        .add_node(kind, Position::new(rng.gen(), rng.gen()), None, None)
                        .map(|_| ())
                }
                2 => {
                    let (source, target) = (pick(&mut rng, &chain), pick(&mut rng, &chain));
                    chain.add_connection(source, target).map(|_| ())
                }
                3 => {
                    let id = pick(&mut rng, &chain);
                    chain.delete_node(id).map(|_| ())
                }
                4 => {
                    let id = match chain.connections().len() {
                        0 => Uuid::new_v4(),
                        n => chain.connections()[rng.gen_range(0..n)].id,
                    };
                    chain.remove_connection(id).map(|_| ())
                }
                5 => {
                    let id = pick(&mut rng, &chain);
                    let x = if rng.gen_bool(0.2) { f64::NAN } else { rng.gen() };
                    chain.move_node(id, Position::new(x, rng.gen()))
                }
                6 | 7 => {
                    let id = pick(&mut rng, &chain);
                    let name = NAMES[rng.gen_range(0..NAMES.len())];
                    let configuration = CONFIGURATIONS[rng.gen_range(0..CONFIGURATIONS.len())];
                    chain.update_node(id, name, Some("描述"), configuration)
                }
                8 => {
                    let id = pick(&mut rng, &chain);
                    let name = NAMES[rng.gen_range(0..NAMES.len())];
                    let kind = NodeKind::ALL[rng.gen_range(0..NodeKind::ALL.len())];
                    chain.update_node_config(id, name, None, NodeConfig::default_for(kind))
                }
                _ => {
                    let name = NAMES[rng.gen_range(0..NAMES.len())];
                    chain.update_info(name, "随机描述", rng.gen())
                }
            };

            if let Err(e) = &outcome {
                assert_eq!(chain, before, "失败的编辑修改了规则链 (seed {}): {}", seed, e);
                match e {
                    RuleError::MalformedConfiguration(_) => malformed += 1,
                    RuleError::InvalidName(_) => unnamed += 1,
                    RuleError::InvalidPosition { .. } => off_canvas += 1,
                    _ => {}
                }
            }
            assert!(chain.updated_at() >= last_updated);
            last_updated = chain.updated_at();
            assert_consistent(&chain);
        }

        let decoded: RuleChain = serde_json::from_str(&serde_json::to_string(&chain).unwrap()).unwrap();
        assert_eq!(decoded, chain, "seed {}", seed);
    }
    assert!(malformed > 0 && unnamed > 0 && off_canvas > 0);
}

#[test]
fn delete_removes_every_incident_connection() {
    let mut chain = RuleChain::new("星形", "").unwrap();
    let hub = chain.add_node(NodeKind::Transform, Position::default(), None, None).unwrap();
    let mut leaves = Vec::new();
    for i in 0..5 {
        let leaf = chain.add_node(NodeKind::Action, Position::default(), None, None).unwrap();
        if i % 2 == 0 {
            chain.add_connection(hub, leaf).unwrap();
        } else {
            chain.add_connection(leaf, hub).unwrap();
        }
        leaves.push(leaf);
    }
    chain.add_connection(leaves[0], leaves[1]).unwrap();

    chain.delete_node(hub).unwrap();
    assert_eq!(chain.connections().len(), 1);
    assert!(chain.connections().iter().all(|c| !c.touches(hub)));
    assert_consistent(&chain);
}

#[test]
fn move_node_twice_equals_move_once() {
    let mut chain = RuleChain::new("移动", "").unwrap();
    let id = chain.add_node(NodeKind::Filter, Position::default(), None, None).unwrap();
    let target = Position::new(42.0, -7.5);

    chain.move_node(id, target).unwrap();
    let once: Vec<_> = chain.nodes().to_vec();
    chain.move_node(id, target).unwrap();
    assert_eq!(chain.nodes(), once.as_slice());
}

#[test]
fn serialized_chain_round_trips() {
    let mut chain = RuleChain::new("往返", "描述").unwrap();
    let a = chain.add_node(NodeKind::Filter, Position::new(1.5, 2.5), None, Some("入口")).unwrap();
    let b = chain.add_node(NodeKind::Transform, Position::default(), None, None).unwrap();
    let c = chain.add_node(NodeKind::External, Position::default(), None, None).unwrap();
    chain
        .update_node(
            c,
            "查询",
            None,
            r#"{"url": "http://api.local/${id}", "method": "POST", "headers": {"x": "1"}}"#,
        )
        .unwrap();
    chain
        .add_connection_with_handles(a, b, Some("out".to_string()), Some("in".to_string()))
        .unwrap();
    chain.add_connection(b, c).unwrap();
    chain.activate();
    chain.update_info("往返", "描述", true).unwrap();

    let json = serde_json::to_string(&chain).unwrap();
    let decoded: RuleChain = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, chain);
    assert_eq!(serde_json::to_string(&decoded).unwrap(), json);

    let doc: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(doc["status"], "active");
    assert_eq!(doc["debugMode"], true);
    assert_eq!(doc["nodes"][0]["type"], "filter");
    assert_eq!(doc["nodes"][2]["configuration"]["headers"]["x"], "1");
    assert_eq!(doc["connections"][0]["sourceHandle"], "out");
}

#[test]
fn documents_with_invalid_graphs_are_rejected() {
    let chain = RuleChain::new("校验", "").unwrap();
    let mut doc = serde_json::to_value(&chain).unwrap();
    let id = Uuid::new_v4();
    doc["nodes"] = serde_json::json!([{
        "id": id,
        "name": "自环",
        "type": "action",
        "configuration": {"type": "log"},
        "position": {"x": 0.0, "y": 0.0}
    }]);
    doc["connections"] = serde_json::json!([{ "id": Uuid::new_v4(), "sourceId": id, "targetId": id }]);
    assert!(serde_json::from_value::<RuleChain>(doc.clone()).is_err());

    doc["connections"] = serde_json::json!([]);
    doc["nodes"][0]["type"] = serde_json::json!("delay");
    assert!(serde_json::from_value::<RuleChain>(doc.clone()).is_err());

    doc["nodes"][0]["type"] = serde_json::json!("action");
    let decoded: RuleChain = serde_json::from_value(doc).unwrap();
    assert!(matches!(
        decoded.clone().add_connection(id, id),
        Err(RuleError::SelfConnection(_))
    ));
}
