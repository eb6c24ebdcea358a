// src/core/cluster/migrate.rs

//! Moves slots between masters, keys included, following the Redis
//! `IMPORTING`/`MIGRATING` protocol.
//!
//! Command order per slot is load-bearing: the destination must be importing
//! before the source starts migrating, and ownership is only rewritten after
//! the last key has moved. The engine never rolls back; an aborted move
//! leaves an importing/migrating pair that the next pass observes and
//! finishes or clears.

use crate::core::SlotwardError;
use crate::core::cluster::node::SetSlotState;
use crate::core::cluster::slots::SlotMove;
use crate::core::cluster::view::ClusterView;
use tracing::{debug, info};

/// How many keys `CLUSTER GETKEYSINSLOT` enumerates per batch.
const KEY_BATCH: usize = 50;
/// Per-batch `MIGRATE` timeout in milliseconds.
const MIGRATE_TIMEOUT_MS: u64 = 5000;

/// Executes one [`SlotMove`], slot by slot. Any failure aborts the move and
/// bubbles to the driver.
pub async fn execute_move(view: &mut ClusterView, mv: &SlotMove) -> Result<(), SlotwardError> {
    let source_idx = view
        .index_of(&mv.source)
        .ok_or_else(|| SlotwardError::Internal(format!("source {} left the view", mv.source)))?;
    let dest_idx = view.index_of(&mv.destination).ok_or_else(|| {
        SlotwardError::Internal(format!("destination {} left the view", mv.destination))
    })?;
    let dest_host = view.nodes[dest_idx].host().to_string();
    let dest_port = view.nodes[dest_idx].port();

    info!(
        "moving {} slot(s) from {} to {}",
        mv.slots.len(),
        mv.source,
        mv.destination
    );

    for &slot in &mv.slots {
        view.nodes[dest_idx]
            .cluster_setslot(slot, SetSlotState::Importing(&mv.source))
            .await?;
        view.nodes[source_idx]
            .cluster_setslot(slot, SetSlotState::Migrating(&mv.destination))
            .await?;

        // Drain the slot's keys in batches until the source reports none left.
        loop {
            let keys = view.nodes[source_idx]
                .cluster_getkeysinslot(slot, KEY_BATCH)
                .await?;
            if keys.is_empty() {
                break;
            }
            debug!("migrating {} key(s) of slot {slot}", keys.len());
            view.nodes[source_idx]
                .migrate(&dest_host, dest_port, &keys, 0, MIGRATE_TIMEOUT_MS)
                .await?;
        }

        // Rewrite authoritative ownership: destination and source first, then
        // every other node, so clients are redirected promptly instead of
        // waiting for gossip to converge.
        view.nodes[dest_idx]
            .cluster_setslot(slot, SetSlotState::Node(&mv.destination))
            .await?;
        view.nodes[source_idx]
            .cluster_setslot(slot, SetSlotState::Node(&mv.destination))
            .await?;
        for idx in 0..view.nodes.len() {
            if idx == source_idx || idx == dest_idx {
                continue;
            }
            view.nodes[idx]
                .cluster_setslot(slot, SetSlotState::Node(&mv.destination))
                .await?;
        }
    }
    Ok(())
}
