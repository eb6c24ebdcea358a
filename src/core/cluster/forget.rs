// src/core/cluster/forget.rs

//! Detects peers the cluster has declared failed and removes them from every
//! live node's view.

use crate::core::SlotwardError;
use crate::core::cluster::view::ClusterView;
use tracing::{error, info, warn};

/// Scans for failed peers through the first reachable master and issues
/// `CLUSTER FORGET` on every live node in the view.
///
/// A node cannot forget itself, so the failed id's own handle is skipped if
/// it is still in the view. A failed forget aborts the pass; the next pass
/// retries from a fresh observation.
pub async fn forget_failed(view: &mut ClusterView) -> Result<(), SlotwardError> {
    let master_ids: Vec<String> = view
        .masters()
        .into_iter()
        .map(|n| n.id().to_string())
        .collect();

    // Pick the commanding node: the first master that answers a ping.
    let mut failed_ids: Option<Vec<String>> = None;
    for id in &master_ids {
        let Some(node) = view.node_mut(id) else {
            continue;
        };
        if node.ping().await.is_err() {
            warn!("master {id} not answering, trying the next one");
            continue;
        }
        node.refresh().await?;
        failed_ids = Some(
            node.friends()
                .iter()
                .filter(|friend| friend.attrs.is_failed())
                .map(|friend| friend.id().to_string())
                .collect(),
        );
        break;
    }

    let Some(failed_ids) = failed_ids else {
        warn!("no reachable master to scan for failed peers");
        return Ok(());
    };

    for failed_id in &failed_ids {
        info!("removing failed node {failed_id} from the cluster");
        for node in view.nodes.iter_mut() {
            if node.id() == failed_id {
                continue;
            }
            if let Err(e) = node.cluster_forget(failed_id).await {
                error!("could not forget {failed_id} on {}: {e}", node.addr());
                return Err(e);
            }
        }
    }
    Ok(())
}
