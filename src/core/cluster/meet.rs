// src/core/cluster/meet.rs

//! Full-mesh gossip introduction.
//!
//! Every node is told to meet every other node. Meets are idempotent on the
//! Redis side, so repeating the mesh on every pass is safe.

use crate::core::SlotwardError;
use crate::core::cluster::view::ClusterView;
use tracing::debug;

/// Issues `CLUSTER MEET` for every ordered pair of distinct nodes in the view.
pub async fn meet_all(view: &mut ClusterView) -> Result<(), SlotwardError> {
    let addrs: Vec<(String, u16)> = view
        .nodes
        .iter()
        .map(|n| (n.host().to_string(), n.port()))
        .collect();

    for i in 0..view.nodes.len() {
        for (j, (host, port)) in addrs.iter().enumerate() {
            if i == j {
                continue;
            }
            view.nodes[i].meet(host, *port).await?;
        }
    }
    debug!("introduced {} node(s) to each other", addrs.len());
    Ok(())
}
