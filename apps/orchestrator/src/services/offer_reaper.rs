// [apps/orchestrator/src/services/offer_reaper.rs]
/*!
 * =================================================================
 * APARATO: OFFER EXPIRY REAPER (V5.1 - WALL CLOCK SWEEP)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L4)
 * RESPONSABILIDAD: BARRIDO DE OFERTAS VENCIDAS Y RE-DESPACHO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. WALL CLOCK AUTHORITY: La expiración de ofertas es gobernada por
 *    reloj de pared, no por deadlines de operación; el barrido corre
 *    al menos cada 5 segundos.
 * 2. SAFE RACING: Un worker que acepta una oferta al borde del TTL
 *    compite sin riesgo: el claim atómico re-verifica el estado.
 * 3. ATOMICITY: La purga no interrumpe waves activas; solo muta
 *    ofertas ya muertas por reloj.
 * =================================================================
 */

use std::collections::HashSet;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};
use uuid::Uuid;
use veloz_infra_db::retry::with_backoff;

use crate::state::{AppState, DispatchCommand};

/// Lanza el daemon de barrido perpetuo en el runtime de Tokio.
pub fn spawn_offer_reaper(application_state: AppState) {
    let sweep_period = Duration::from_secs(application_state.tuning.sweep_interval_seconds.max(1));

    tokio::spawn(async move {
        let mut maintenance_ticker = interval(sweep_period);
        maintenance_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("💀 [REAPER_ACTIVE]: Offer expiry daemon initiated.");

        loop {
            maintenance_ticker.tick().await;

            // Fallos transitorios del Store se reintentan con backoff
            // antes de ceder el tick (curva contractual 50 ms → 2 s).
            let allocations = application_state.allocations.clone();
            let swept = match with_backoff("offer_sweep", || {
                let allocations = allocations.clone();
                async move { allocations.sweep_expired_offers(Utc::now()).await }
            })
            .await
            {
                Ok(swept) => swept,
                Err(fault) => {
                    error!("💀 [REAPER_FAULT]: Sweep collapsed: {}", fault);
                    continue;
                }
            };

            if swept.is_empty() {
                continue;
            }

            // Una tarea con varias ofertas muertas se re-encola UNA vez.
            let affected_tasks: HashSet<Uuid> =
                swept.iter().map(|(_, task_id)| *task_id).collect();

            info!(
                "💀 [REAPER_SWEEP]: {} offers expired across {} tasks.",
                swept.len(),
                affected_tasks.len()
            );

            for task_id in affected_tasks {
                if application_state
                    .dispatch_queue
                    .send(DispatchCommand::Reoffer { task_id })
                    .await
                    .is_err()
                {
                    error!("💀 [REAPER_FAULT]: Dispatch queue severed; daemon terminating.");
                    return;
                }
            }
        }
    });
}
