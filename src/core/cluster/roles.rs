// src/core/cluster/roles.rs

//! Decides which nodes change role to reach the desired master count, and
//! applies those decisions.
//!
//! Planning is pure: it reads the view and emits a [`RolePlan`]; a separate
//! apply step issues the commands. One pass, one observation.

use crate::core::SlotwardError;
use crate::core::cluster::view::ClusterView;
use tracing::info;

/// Demote one master to a replica of `master`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Demotion {
    pub node: String,
    pub master: String,
}

/// The role changes required to converge the view on the desired shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RolePlan {
    pub demotions: Vec<Demotion>,
    /// Node ids to soft-reset so they rejoin as standalone masters.
    pub promotions: Vec<String>,
}

impl RolePlan {
    pub fn is_empty(&self) -> bool {
        self.demotions.is_empty() && self.promotions.is_empty()
    }
}

/// Computes the role changes for this view.
///
/// With too many masters, the surplus becomes replicas: masters are sorted by
/// slot count descending so that the slot-heavy ones are kept, and each
/// surplus master replicates one of the kept masters round-robin. Only nodes
/// actually flagged `master` are demotion candidates. A demoted master that
/// still holds slots will make `CLUSTER REPLICATE` fail; the pass aborts and
/// the next pass observes the new topology.
///
/// With too few masters, replicas are soft-reset one by one; a reset node
/// rejoins as a standalone master on the next pass.
pub fn plan(view: &ClusterView) -> RolePlan {
    let mut masters = view.masters();
    let have = masters.len();
    let want = view.desired.masters;

    if have == want {
        return RolePlan::default();
    }

    if have > want {
        masters.sort_by(|a, b| b.attrs.slots.len().cmp(&a.attrs.slots.len()));
        let (keep, surplus) = masters.split_at(want);
        let demotions = surplus
            .iter()
            .enumerate()
            .map(|(k, node)| Demotion {
                node: node.id().to_string(),
                master: keep[k % want].id().to_string(),
            })
            .collect();
        return RolePlan {
            demotions,
            promotions: Vec::new(),
        };
    }

    let promotions = view
        .replicas()
        .into_iter()
        .take(want - have)
        .map(|node| node.id().to_string())
        .collect();
    RolePlan {
        demotions: Vec::new(),
        promotions,
    }
}

/// Issues the planned role changes. Any single command failure aborts the
/// pass; the next pass re-observes and continues from wherever Redis landed.
pub async fn apply(view: &mut ClusterView, plan: &RolePlan) -> Result<(), SlotwardError> {
    for demotion in &plan.demotions {
        info!("demoting {} to replica of {}", demotion.node, demotion.master);
        let node = view
            .node_mut(&demotion.node)
            .ok_or_else(|| SlotwardError::Internal(format!("node {} left the view", demotion.node)))?;
        node.cluster_replicate(&demotion.master).await?;
    }
    for id in &plan.promotions {
        info!("soft-resetting {} to free it up as a master", id);
        let node = view
            .node_mut(id)
            .ok_or_else(|| SlotwardError::Internal(format!("node {id} left the view")))?;
        node.cluster_reset_soft().await?;
    }
    Ok(())
}
