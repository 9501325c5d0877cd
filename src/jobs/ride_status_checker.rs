// ═══════════════════════════════════════════════════════════════════
// RIDE STATUS CHECKER: background job que avança o ciclo de vida
// ═══════════════════════════════════════════════════════════════════
//
// active ──(1h após a partida)──▶ completed ──(3h)──▶ delete ──(12h)──▶ removida
//
// Configuração via env (ver config.rs):
//   RIDE_STATUS_CHECKER_ENABLED  (default: true)
//   RIDE_STATUS_INTERVAL_SECS    (default: 300, mínimo 5)
//

use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::config::StatusCheckerConfig;
use crate::services::RideService;

/// Inicia o verificador em background.
///
/// Roda uma passada imediatamente e depois a cada `interval_secs`.
/// Devolve `None` quando desabilitado; abortar o handle para o job.
pub fn start_ride_status_checker(
    rides: Arc<RideService>,
    config: &StatusCheckerConfig,
) -> Option<JoinHandle<()>> {
    if !config.enabled {
        log::info!("⏸️  Ride status checker DISABLED (RIDE_STATUS_CHECKER_ENABLED=false)");
        return None;
    }

    let interval_secs = config.interval_secs;
    log::info!("⏱️  Starting ride status checker (every {}s)", interval_secs);

    let handle = tokio::spawn(async move {
        let mut tick_interval = interval(Duration::from_secs(interval_secs));
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycle: u64 = 0;

        loop {
            // o primeiro tick é imediato
            tick_interval.tick().await;
            run_check_cycle(&rides, cycle).await;
            cycle += 1;
        }
    });

    Some(handle)
}

/// Executa uma passada do verificador
pub async fn run_check_cycle(rides: &RideService, cycle: u64) {
    let start = std::time::Instant::now();
    let now = Utc::now();

    rides.limiter().prune(now);

    match rides.sweep_statuses(now).await {
        Ok(summary) if summary.changed() => {
            log::info!(
                "⏱️  Ride status check #{}: {} rides, {} auto-completed, {} marked for delete, {} hard-deleted ({}ms)",
                cycle,
                summary.total,
                summary.auto_completed,
                summary.marked_for_delete,
                summary.hard_deleted,
                start.elapsed().as_millis()
            );
        }
        Ok(summary) => {
            log::debug!(
                "⏱️  Ride status check #{}: {} rides, nothing to update ({}ms)",
                cycle,
                summary.total,
                start.elapsed().as_millis()
            );
        }
        Err(e) => {
            log::error!("❌ Ride status check #{} failed: {}", cycle, e);
        }
    }
}
