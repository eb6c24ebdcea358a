// src/core/reconciler/worker.rs

//! The reconcile driver for a single cluster: observe, plan, act, reschedule.
//!
//! Each pass is self-contained. It re-reads the manifest, rebuilds the view
//! from live `CLUSTER NODES` observation and derives every plan from that
//! snapshot; nothing is carried over in-process between passes. Retrying is
//! therefore always a full fresh observation, which is what makes an
//! interrupted pass safe to repeat.

use crate::config::ReconcileTimings;
use crate::core::SlotwardError;
use crate::core::client::RedisDialer;
use crate::core::cluster::view::ClusterView;
use crate::core::cluster::{forget, meet, migrate, roles, slots};
use crate::core::reconciler::source::{ClusterManifest, Endpoint, ManifestSource};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// What a completed pass observed, deciding the requeue delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Fewer nodes than the shape needs came up; check back shortly.
    Bootstrapping { have: usize, need: usize },
    /// At least one plan produced work this pass.
    Progressed,
    /// Nothing to do; the cluster matches the declared shape.
    Steady,
}

/// Runs the reconcile loop for one named cluster.
pub struct ClusterWorker {
    name: String,
    source: Arc<dyn ManifestSource>,
    dialer: Arc<dyn RedisDialer>,
    timings: ReconcileTimings,
}

impl ClusterWorker {
    pub fn new(
        name: String,
        source: Arc<dyn ManifestSource>,
        dialer: Arc<dyn RedisDialer>,
        timings: ReconcileTimings,
    ) -> Self {
        Self {
            name,
            source,
            dialer,
            timings,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The main loop. Returns once the cluster's manifest is deleted.
    pub async fn run(self) {
        let mut rng = SmallRng::from_entropy();
        // A manifest that violated a precondition; passes are skipped until
        // its content changes.
        let mut invalid: Option<ClusterManifest> = None;

        loop {
            let manifest = match self.source.fetch(&self.name).await {
                Ok(Some(manifest)) => manifest,
                Ok(None) => {
                    info!("manifest for '{}' is gone, stopping its worker", self.name);
                    return;
                }
                Err(e) => {
                    error!("could not load manifest for '{}': {e}", self.name);
                    self.sleep(&mut rng, self.timings.error_requeue).await;
                    continue;
                }
            };

            if invalid.as_ref() == Some(&manifest) {
                self.sleep(&mut rng, self.timings.steady_requeue).await;
                continue;
            }
            invalid = None;

            let deadline = self.timings.pass_deadline;
            let delay = match tokio::time::timeout(deadline, self.reconcile_pass(&manifest)).await {
                Err(_) => {
                    warn!(
                        "pass for '{}' exceeded its {:?} deadline, rescheduling",
                        self.name, deadline
                    );
                    self.timings.error_requeue
                }
                Ok(Ok(PassOutcome::Bootstrapping { have, need })) => {
                    info!(
                        "cluster '{}' still bootstrapping: {have}/{need} node(s) up",
                        self.name
                    );
                    self.timings.bootstrap_requeue
                }
                Ok(Ok(PassOutcome::Progressed)) => {
                    info!("cluster '{}' progressed, checking back shortly", self.name);
                    self.timings.progress_requeue
                }
                Ok(Ok(PassOutcome::Steady)) => self.timings.steady_requeue,
                Ok(Err(e)) if e.is_manifest_violation() => {
                    error!(
                        "cluster '{}' has an invalid manifest, parking it until it changes: {e}",
                        self.name
                    );
                    invalid = Some(manifest);
                    self.timings.steady_requeue
                }
                Ok(Err(e)) => {
                    error!("pass for '{}' failed: {e}", self.name);
                    self.timings.error_requeue
                }
            };
            self.sleep(&mut rng, delay).await;
        }
    }

    /// One observe-plan-act pass against the given manifest.
    pub async fn reconcile_pass(
        &self,
        manifest: &ClusterManifest,
    ) -> Result<PassOutcome, SlotwardError> {
        let desired = manifest.desired()?;
        let ready: Vec<&Endpoint> = manifest.endpoints.iter().filter(|e| e.ready).collect();

        let mut view = ClusterView::connect(&self.dialer, &ready, manifest.port, desired).await?;
        let needed = desired.nodes_needed();
        if view.nodes.len() < needed {
            // Partial views never feed the planners.
            return Ok(PassOutcome::Bootstrapping {
                have: view.nodes.len(),
                need: needed,
            });
        }

        meet::meet_all(&mut view).await?;

        let role_plan = roles::plan(&view);
        let roles_settled = role_plan.is_empty();
        let mut progressed = false;
        if !roles_settled {
            roles::apply(&mut view, &role_plan).await?;
            progressed = true;
        }

        // Gossip needs a moment after the meets; reading CLUSTER NODES right
        // away can still show the pre-meet topology.
        tokio::time::sleep(self.timings.gossip_settle).await;
        view.refresh_all().await?;

        let assignments = slots::plan_assignment(&view);
        if !assignments.is_empty() {
            slots::apply_assignment(&mut view, &assignments).await?;
            progressed = true;
            view.refresh_all().await?;
        }

        forget::forget_failed(&mut view).await?;

        // Rebalance targets assume the desired master count; they only hold
        // once the roles have converged.
        if roles_settled {
            let moves = slots::plan_rebalance(&view)?;
            for mv in &moves {
                migrate::execute_move(&mut view, mv).await?;
                progressed = true;
            }
        }

        Ok(if progressed {
            PassOutcome::Progressed
        } else {
            PassOutcome::Steady
        })
    }

    /// Sleeps the given delay fuzzed by ±10%, so a fleet of workers does not
    /// fire in lockstep.
    async fn sleep(&self, rng: &mut SmallRng, delay: Duration) {
        tokio::time::sleep(delay.mul_f64(rng.gen_range(0.9..1.1))).await;
    }
}
