//! Background ticker: drains the run queue and scans for public maps due
//! for auto-regeneration.

use crate::orchestrator::Orchestrator;
use chrono::Utc;
use haven_core::EngineConfig;
use rand::Rng;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Run the ticker loop until `cancel` fires. Intended to be spawned once
/// per process alongside [`Orchestrator`].
pub async fn run(orchestrator: Arc<Orchestrator>, config: EngineConfig, cancel: CancellationToken) {
    let initial_delay = rand::thread_rng().gen_range(config.orchestrator_initial_delay_min..=config.orchestrator_initial_delay_max);
    tokio::select! {
        _ = tokio::time::sleep(initial_delay) => {}
        _ = cancel.cancelled() => return,
    }

    loop {
        tick(&orchestrator, &cancel).await;

        tokio::select! {
            _ = tokio::time::sleep(config.orchestrator_tick) => {}
            _ = cancel.cancelled() => return,
        }
    }
}

async fn tick(orchestrator: &Arc<Orchestrator>, cancel: &CancellationToken) {
    while let Some(result) = orchestrator.drain_one().await {
        if let Err(e) = result {
            tracing::warn!(error = %e, "queued generation run failed");
        }
        if cancel.is_cancelled() {
            return;
        }
    }

    if let Err(e) = scan_due_maps(orchestrator).await {
        tracing::warn!(error = %e, "auto-regeneration scan failed");
    }
}

async fn scan_due_maps(orchestrator: &Arc<Orchestrator>) -> haven_core::Result<()> {
    let now = Utc::now();
    for map in orchestrator.list_public_maps().await? {
        if map.is_due_for_regeneration(now) {
            orchestrator.enqueue(&map.id);
        }
    }
    Ok(())
}
