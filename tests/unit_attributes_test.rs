// tests/unit_attributes_test.rs

use slotward::core::SlotwardError;
use slotward::core::cluster::attributes::{NodeAttributes, NodeFlags, parse_cluster_nodes};

#[test]
fn test_parse_master_line_with_slot_ranges() {
    let line = "9fd8800b31d569538917c0aaeaa5588e2f9c6edf 10.244.0.218:6379@16379 myself,master - 0 1652373716000 0 connected 0-9 11-12 14 16-19";
    let attrs = NodeAttributes::parse_line(line).unwrap();

    assert_eq!(attrs.id, "9fd8800b31d569538917c0aaeaa5588e2f9c6edf");
    assert_eq!(attrs.host, "10.244.0.218");
    assert_eq!(attrs.port, 6379);
    assert!(attrs.is_myself());
    assert!(attrs.is_master());
    assert!(!attrs.is_replica());
    assert_eq!(attrs.replicates, None);
    assert_eq!(
        attrs.slots,
        vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 11, 12, 14, 16, 17, 18, 19]
    );
}

#[test]
fn test_parse_replica_line() {
    let line = "8a99a71a38d099de6862284f5aab9329d796c34f 10.244.0.160:6379@16379 slave 9fd8800b31d569538917c0aaeaa5588e2f9c6edf 0 1652373718026 1 connected";
    let attrs = NodeAttributes::parse_line(line).unwrap();

    assert!(attrs.is_replica());
    assert!(!attrs.is_master());
    assert_eq!(
        attrs.replicates.as_deref(),
        Some("9fd8800b31d569538917c0aaeaa5588e2f9c6edf")
    );
    assert!(attrs.slots.is_empty());
}

#[test]
fn test_parse_strips_gossip_port_suffix() {
    let line = "335e5ceff013eeebdbdb71bb65b4c1aeaf6a06f5 10.244.0.156:6379@16379 master - 0 1652373719041 2 connected";
    let attrs = NodeAttributes::parse_line(line).unwrap();
    assert_eq!(attrs.addr(), "10.244.0.156:6379");
}

#[test]
fn test_parse_accepts_empty_host() {
    // A freshly started node does not know its own IP until it has been met.
    let line = "335e5ceff013eeebdbdb71bb65b4c1aeaf6a06f5 :6379@16379 myself,master - 0 0 0 connected";
    let attrs = NodeAttributes::parse_line(line).unwrap();
    assert_eq!(attrs.host, "");
    assert_eq!(attrs.port, 6379);
}

#[test]
fn test_parse_failure_flags() {
    let line = "335e5ceff013eeebdbdb71bb65b4c1aeaf6a06f5 10.244.0.156:6379@16379 master,fail - 0 1652373719041 2 connected";
    let attrs = NodeAttributes::parse_line(line).unwrap();
    assert!(attrs.is_failed());

    let line = "335e5ceff013eeebdbdb71bb65b4c1aeaf6a06f5 10.244.0.156:6379@16379 master,fail? - 0 1652373719041 2 connected";
    let attrs = NodeAttributes::parse_line(line).unwrap();
    assert!(!attrs.is_failed());
    assert!(attrs.flags.contains(NodeFlags::PFAIL));
}

#[test]
fn test_parse_ignores_unknown_flags() {
    let line = "335e5ceff013eeebdbdb71bb65b4c1aeaf6a06f5 10.244.0.156:6379@16379 master,nofailover - 0 1652373719041 2 connected";
    let attrs = NodeAttributes::parse_line(line).unwrap();
    assert_eq!(attrs.flags, NodeFlags::MASTER);
}

#[test]
fn test_parse_ignores_migration_descriptors() {
    let line = "9fd8800b31d569538917c0aaeaa5588e2f9c6edf 10.244.0.218:6379@16379 myself,master - 0 1652373716000 0 connected 0-5 [7->-8a99a71a38d099de6862284f5aab9329d796c34f]";
    let attrs = NodeAttributes::parse_line(line).unwrap();
    assert_eq!(attrs.slots, vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn test_parse_rejects_short_line() {
    let line = "9fd8800b31d569538917c0aaeaa5588e2f9c6edf 10.244.0.218:6379@16379 myself,master -";
    let err = NodeAttributes::parse_line(line).unwrap_err();
    assert!(matches!(err, SlotwardError::MalformedNodeLine(_)));
}

#[test]
fn test_parse_rejects_out_of_range_slot() {
    let line = "9fd8800b31d569538917c0aaeaa5588e2f9c6edf 10.244.0.218:6379@16379 myself,master - 0 1652373716000 0 connected 16384";
    let err = NodeAttributes::parse_line(line).unwrap_err();
    assert!(matches!(err, SlotwardError::MalformedNodeLine(_)));
}

#[test]
fn test_parse_rejects_inverted_range() {
    let line = "9fd8800b31d569538917c0aaeaa5588e2f9c6edf 10.244.0.218:6379@16379 myself,master - 0 1652373716000 0 connected 9-0";
    let err = NodeAttributes::parse_line(line).unwrap_err();
    assert!(matches!(err, SlotwardError::MalformedNodeLine(_)));
}

#[test]
fn test_parse_whole_reply_skips_blank_lines() {
    let raw = "335e5ceff013eeebdbdb71bb65b4c1aeaf6a06f5 10.244.0.156:6379@16379 master - 0 1652373719041 2 connected\n9fd8800b31d569538917c0aaeaa5588e2f9c6edf 10.244.0.218:6379@16379 myself,master - 0 1652373716000 0 connected\n";
    let parsed = parse_cluster_nodes(raw).unwrap();
    assert_eq!(parsed.len(), 2);
    assert!(parsed[1].is_myself());
}

#[test]
fn test_parse_whole_reply_rejects_any_malformed_line() {
    let raw = "335e5ceff013eeebdbdb71bb65b4c1aeaf6a06f5 10.244.0.156:6379@16379 master - 0 1652373719041 2 connected\nbogus line\n";
    assert!(parse_cluster_nodes(raw).is_err());
}
