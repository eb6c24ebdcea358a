// tests/unit_view_test.rs

mod support;

use slotward::core::SlotwardError;
use slotward::core::client::RedisDialer;
use slotward::core::cluster::view::{ClusterView, DesiredShape};
use slotward::core::reconciler::source::Endpoint;
use std::sync::Arc;
use support::{FakeDialer, NodeState, master_handle, nodes_reply, replica_handle};

fn endpoint(name: &str, ip: &str) -> Endpoint {
    Endpoint {
        name: name.to_string(),
        ip: ip.to_string(),
        ready: true,
    }
}

#[tokio::test]
async fn test_view_partitions_masters_and_replicas() {
    let dialer = FakeDialer::new();
    let view = ClusterView {
        nodes: vec![
            master_handle(&dialer, "aaa", "10.0.0.1", 6379, Some(0), vec![0, 1, 2]),
            replica_handle(&dialer, "bbb", "10.0.0.2", 6379, Some(1), "aaa"),
            master_handle(&dialer, "ccc", "10.0.0.3", 6379, Some(2), vec![3, 4]),
        ],
        desired: DesiredShape {
            masters: 2,
            replicas_per_master: 1,
        },
    };

    let master_ids: Vec<&str> = view.masters().iter().map(|n| n.id()).collect();
    let replica_ids: Vec<&str> = view.replicas().iter().map(|n| n.id()).collect();
    assert_eq!(master_ids, vec!["aaa", "ccc"]);
    assert_eq!(replica_ids, vec!["bbb"]);
    assert_eq!(view.assigned_slots(), vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn test_view_missing_slots_are_the_sorted_complement() {
    let dialer = FakeDialer::new();
    let mut slots: Vec<u16> = (0..=10000).collect();
    slots.push(10005);
    slots.extend(10011..=16379);
    let view = ClusterView {
        nodes: vec![master_handle(&dialer, "aaa", "10.0.0.1", 6379, Some(0), slots)],
        desired: DesiredShape {
            masters: 1,
            replicas_per_master: 0,
        },
    };

    assert_eq!(
        view.missing_slots(),
        vec![
            10001, 10002, 10003, 10004, 10006, 10007, 10008, 10009, 10010, 16380, 16381, 16382,
            16383
        ]
    );
}

#[tokio::test]
async fn test_view_connect_binds_and_self_meets_every_ready_endpoint() {
    let dialer = FakeDialer::new();
    dialer.script(
        "10.20.30.40:6379",
        NodeState {
            cluster_nodes: vec![nodes_reply(&[
                "9fd8800b31d569538917c0aaeaa5588e2f9c6edf 10.20.30.40:6379@16379 myself,master - 0 1652373716000 0 connected",
            ])]
            .into(),
            ..Default::default()
        },
    );
    dialer.script(
        "10.20.30.41:6379",
        NodeState {
            cluster_nodes: vec![nodes_reply(&[
                "8a99a71a38d099de6862284f5aab9329d796c34f 10.20.30.41:6379@16379 myself,master - 0 1652373718026 1 connected",
            ])]
            .into(),
            ..Default::default()
        },
    );

    let endpoints = [
        endpoint("redis-test-0", "10.20.30.40"),
        endpoint("redis-test-1", "10.20.30.41"),
    ];
    let refs: Vec<&Endpoint> = endpoints.iter().collect();
    let generic: Arc<dyn RedisDialer> = dialer.clone();
    let view = ClusterView::connect(
        &generic,
        &refs,
        6379,
        DesiredShape {
            masters: 2,
            replicas_per_master: 0,
        },
    )
    .await
    .unwrap();

    assert_eq!(view.nodes.len(), 2);
    assert_eq!(view.nodes[0].id(), "9fd8800b31d569538917c0aaeaa5588e2f9c6edf");
    assert_eq!(view.nodes[0].ordinal, Some(0));
    assert_eq!(view.nodes[1].ordinal, Some(1));

    // Every freshly bound node is introduced to itself.
    assert_eq!(
        dialer.commands_on("10.20.30.40:6379"),
        vec![
            vec!["CLUSTER".to_string(), "NODES".to_string()],
            vec![
                "CLUSTER".to_string(),
                "MEET".to_string(),
                "10.20.30.40".to_string(),
                "6379".to_string()
            ],
        ]
    );
}

#[tokio::test]
async fn test_view_connect_skips_unreachable_endpoints() {
    let dialer = FakeDialer::new();
    dialer.script(
        "10.20.30.40:6379",
        NodeState {
            cluster_nodes: vec![nodes_reply(&[
                "9fd8800b31d569538917c0aaeaa5588e2f9c6edf 10.20.30.40:6379@16379 myself,master - 0 1652373716000 0 connected",
            ])]
            .into(),
            ..Default::default()
        },
    );
    dialer.kill("10.20.30.41:6379");

    let endpoints = [
        endpoint("redis-test-0", "10.20.30.40"),
        endpoint("redis-test-1", "10.20.30.41"),
    ];
    let refs: Vec<&Endpoint> = endpoints.iter().collect();
    let generic: Arc<dyn RedisDialer> = dialer.clone();
    let view = ClusterView::connect(
        &generic,
        &refs,
        6379,
        DesiredShape {
            masters: 2,
            replicas_per_master: 0,
        },
    )
    .await
    .unwrap();

    assert_eq!(view.nodes.len(), 1);
}

#[tokio::test]
async fn test_view_connect_rejects_ordinal_less_endpoint_names() {
    let dialer = FakeDialer::new();
    let endpoints = [endpoint("redis", "10.20.30.40")];
    let refs: Vec<&Endpoint> = endpoints.iter().collect();
    let generic: Arc<dyn RedisDialer> = dialer.clone();
    let err = ClusterView::connect(
        &generic,
        &refs,
        6379,
        DesiredShape {
            masters: 1,
            replicas_per_master: 0,
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, SlotwardError::InvalidEndpointName(_)));
    assert!(err.is_manifest_violation());
}

#[tokio::test]
async fn test_view_connect_rejects_reply_without_myself_line() {
    let dialer = FakeDialer::new();
    dialer.script(
        "10.20.30.40:6379",
        NodeState {
            cluster_nodes: vec![nodes_reply(&[
                "9fd8800b31d569538917c0aaeaa5588e2f9c6edf 10.20.30.40:6379@16379 master - 0 1652373716000 0 connected",
            ])]
            .into(),
            ..Default::default()
        },
    );

    let endpoints = [endpoint("redis-test-0", "10.20.30.40")];
    let refs: Vec<&Endpoint> = endpoints.iter().collect();
    let generic: Arc<dyn RedisDialer> = dialer.clone();
    let err = ClusterView::connect(
        &generic,
        &refs,
        6379,
        DesiredShape {
            masters: 1,
            replicas_per_master: 0,
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, SlotwardError::MissingMyself(_)));
}
