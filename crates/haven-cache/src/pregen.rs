//! Background pre-generator daemon: periodically fills in missing large
//! tiles for every tenant so viewer requests hit a warm cache.

use crate::engine::CacheEngine;
use haven_core::EngineConfig;
use rand::Rng;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const STATS_EVERY_N_CYCLES: u64 = 10;

/// Run the pre-generator loop until `cancel` fires. Intended to be spawned
/// once per process as a long-lived background task.
pub async fn run(engine: Arc<CacheEngine>, config: EngineConfig, cancel: CancellationToken) {
    let initial_delay = rand::thread_rng().gen_range(config.pregenerator_initial_delay_min..=config.pregenerator_initial_delay_max);
    tokio::select! {
        _ = tokio::time::sleep(initial_delay) => {}
        _ = cancel.cancelled() => return,
    }

    let mut cycle: u64 = 0;
    loop {
        cycle += 1;
        run_cycle(&engine, &cancel).await;

        if cycle % STATS_EVERY_N_CYCLES == 0 {
            tracing::info!(cycle, "pre-generator stats summary due");
        }

        tokio::select! {
            _ = tokio::time::sleep(config.pregenerator_tick) => {}
            _ = cancel.cancelled() => return,
        }
    }
}

async fn run_cycle(engine: &Arc<CacheEngine>, cancel: &CancellationToken) {
    let tenants = match engine.list_active_tenants().await {
        Ok(t) => t,
        Err(e) => {
            tracing::warn!(error = %e, "pre-generator failed to list tenants");
            return;
        }
    };

    for tenant in tenants {
        if cancel.is_cancelled() {
            return;
        }
        if let Err(e) = engine.generate_missing_tiles(&tenant).await {
            tracing::warn!(tenant = %tenant, error = %e, "pre-generation failed for tenant");
        }
    }
}
