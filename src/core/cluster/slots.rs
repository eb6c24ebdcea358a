// src/core/cluster/slots.rs

//! Plans slot placement: filling unassigned slots after bootstrap, and moving
//! slots between masters when the distribution drifts from the target.

use crate::core::SlotwardError;
use crate::core::cluster::attributes::SLOT_COUNT;
use crate::core::cluster::view::ClusterView;
use tracing::info;

/// Assign `slots` to `node` via `CLUSTER ADDSLOTS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotAssignment {
    pub node: String,
    pub slots: Vec<u16>,
}

/// Move `slots` from `source` to `destination`, keys included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotMove {
    pub source: String,
    pub destination: String,
    pub slots: Vec<u16>,
}

/// Distributes the currently unassigned slots among the masters.
///
/// Each master is topped up to `16384 / m + 1` slots. The +1 absorbs the
/// division remainder: assignable slots run out before every master reaches
/// the quota, so a single walk over the missing slots terminates with nothing
/// left over and no post-check. Masters early in view order may end up one
/// slot ahead of later ones, matching the ordinal-takes-the-remainder rule
/// the rebalance planner applies.
pub fn plan_assignment(view: &ClusterView) -> Vec<SlotAssignment> {
    let masters = view.masters();
    if masters.is_empty() {
        return Vec::new();
    }
    let per_node = SLOT_COUNT / masters.len() + 1;

    let missing = view.missing_slots();
    let mut cursor = 0usize;
    let mut assignments = Vec::new();
    for node in masters {
        if cursor == missing.len() {
            break;
        }
        let held = node.attrs.slots.len();
        if held >= per_node {
            continue;
        }
        let take = (per_node - held).min(missing.len() - cursor);
        assignments.push(SlotAssignment {
            node: node.id().to_string(),
            slots: missing[cursor..cursor + take].to_vec(),
        });
        cursor += take;
    }
    assignments
}

/// Issues the planned `CLUSTER ADDSLOTS` commands.
pub async fn apply_assignment(
    view: &mut ClusterView,
    assignments: &[SlotAssignment],
) -> Result<(), SlotwardError> {
    for assignment in assignments {
        info!(
            "assigning {} slot(s) to {}",
            assignment.slots.len(),
            assignment.node
        );
        let node = view.node_mut(&assignment.node).ok_or_else(|| {
            SlotwardError::Internal(format!("node {} left the view", assignment.node))
        })?;
        node.cluster_addslots(&assignment.slots).await?;
    }
    Ok(())
}

/// The slot count a master should settle at, by its endpoint ordinal.
///
/// The division remainder goes to the lowest ordinals, one slot each, so the
/// target distribution is deterministic across passes.
pub fn target_slots(ordinal: u32, masters: usize) -> usize {
    let base = SLOT_COUNT / masters;
    let remainder = SLOT_COUNT % masters;
    base + usize::from((ordinal as usize) < remainder)
}

/// Computes the moves that bring every master to its target slot count.
///
/// Masters above target donate their highest-numbered surplus slots; masters
/// below target drain the donor buffers in turn, one [`SlotMove`] per donor
/// tapped. An empty result means the distribution already matches the target.
pub fn plan_rebalance(view: &ClusterView) -> Result<Vec<SlotMove>, SlotwardError> {
    let mut masters = view.masters();
    masters.sort_by(|a, b| b.attrs.slots.len().cmp(&a.attrs.slots.len()));

    struct Donor {
        id: String,
        surplus: Vec<u16>,
    }
    let mut donors: Vec<Donor> = Vec::new();
    let mut deficits: Vec<(String, usize)> = Vec::new();

    for node in masters {
        let ordinal = node.ordinal.ok_or_else(|| {
            SlotwardError::Internal(format!("master {} has no endpoint ordinal", node.id()))
        })?;
        let target = target_slots(ordinal, view.desired.masters);

        let mut held = node.attrs.slots.clone();
        held.sort_unstable();
        if held.len() > target {
            // The highest-numbered surplus slots leave this node.
            let surplus = held.split_off(target);
            donors.push(Donor {
                id: node.id().to_string(),
                surplus,
            });
        } else if held.len() < target {
            deficits.push((node.id().to_string(), target - held.len()));
        }
    }

    let mut moves = Vec::new();
    for (destination, mut deficit) in deficits {
        for donor in donors.iter_mut() {
            if deficit == 0 {
                break;
            }
            if donor.surplus.is_empty() {
                continue;
            }
            let take = deficit.min(donor.surplus.len());
            let slots: Vec<u16> = donor.surplus.drain(..take).collect();
            deficit -= take;
            moves.push(SlotMove {
                source: donor.id.clone(),
                destination: destination.clone(),
                slots,
            });
        }
    }
    Ok(moves)
}
