// [apps/orchestrator/src/services/payout_scheduler.rs]
/*!
 * =================================================================
 * APARATO: PAYOUT BATCH SCHEDULER (V5.3 - IDEMPOTENT DRAIN)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L4)
 * RESPONSABILIDAD: DRENAJE PERIÓDICO DE GANANCIAS NO-PAGADAS EN LOTES
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. LINKAGE IDEMPOTENCY: Las líneas enlazadas a un lote vivo jamás
 *    re-entran a la corrida; repetir la corrida del día es un no-op
 *    estructural. La corrida manual y la periódica comparten motor.
 * 2. LINK-THEN-SUBMIT: El lote nace 'pending' con sus líneas enlazadas
 *    en transacción; el envío al rail y el tránsito a 'processing'
 *    ocurren después, con reconciliación cerrando cualquier corte.
 * =================================================================
 */

use std::time::Duration;

use chrono::Utc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use veloz_domain_ledger::{plan_payout_batches, UnpaidLine};
use veloz_domain_models::Payout;
use veloz_infra_db::DbError;

use crate::state::AppState;

/**
 * Ejecuta una corrida de lotes para un tenant. Compartida por el
 * daemon periódico y por `POST /payouts/run` (idempotente por día).
 *
 * Retorna las instrucciones creadas en ESTA corrida (las colisiones
 * por referencia existente se omiten en silencio operativo).
 */
#[instrument(skip(state), fields(tenant_id = %tenant_id))]
pub async fn run_payout_cycle(state: &AppState, tenant_id: Uuid) -> Result<Vec<Payout>, DbError> {
    let unpaid_earnings = state.earnings.list_unpaid_unlinked(tenant_id).await?;
    if unpaid_earnings.is_empty() {
        return Ok(Vec::new());
    }

    let unpaid_lines: Vec<UnpaidLine> = unpaid_earnings
        .iter()
        .map(|earning| UnpaidLine {
            earning_id: earning.id,
            worker_id: earning.worker_id,
            amount: earning.amount,
            currency: earning.currency.clone(),
        })
        .collect();

    let batch_plans = plan_payout_batches(
        unpaid_lines,
        state.minimum_payout_amount,
        Utc::now().date_naive(),
    );

    let mut created_payouts = Vec::new();
    for plan in batch_plans {
        let worker = state.workers.fetch_worker(plan.worker_id).await?;

        let payout = match state
            .unit_of_work
            .create_payout_batch(
                tenant_id,
                &plan,
                worker.payout_method,
                worker.payout_target.clone(),
                Utc::now(),
            )
            .await
        {
            Ok(payout) => payout,
            Err(DbError::Duplicate(_)) => {
                // Corrida ya ejecutada hoy para este worker: no-op.
                continue;
            }
            Err(fault) => return Err(fault),
        };

        // Envío al rail con clave de idempotencia local.
        match state.rail_client.submit_instruction(&payout).await {
            Ok(acknowledgement) => {
                state
                    .payouts
                    .mark_processing(payout.id, &acknowledgement.provider_reference, payout.version)
                    .await?;
            }
            Err(fault) => {
                // El lote queda 'pending'; la próxima corrida lo re-envía
                // con la MISMA referencia (el rail de-duplica).
                warn!(
                    "🚄 [PAYOUT_CYCLE]: Rail submission deferred for {}: {}",
                    payout.reference, fault
                );
            }
        }

        created_payouts.push(payout);
    }

    if !created_payouts.is_empty() {
        info!(
            "💸 [PAYOUT_CYCLE]: {} batches created for tenant {}.",
            created_payouts.len(),
            tenant_id
        );
    }
    Ok(created_payouts)
}

/// Lanza el daemon de corridas periódicas por tenant.
pub fn spawn_payout_scheduler(application_state: AppState, run_interval_seconds: u64) {
    tokio::spawn(async move {
        let mut cycle_ticker = interval(Duration::from_secs(run_interval_seconds.max(60)));
        cycle_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("💸 [PAYOUT_SCHEDULER]: Periodic batch engine operational.");

        loop {
            cycle_ticker.tick().await;

            let tenants = match application_state.earnings.tenants_with_unpaid().await {
                Ok(tenants) => tenants,
                Err(fault) => {
                    error!("💸 [PAYOUT_SCHEDULER]: Tenant discovery collapsed: {}", fault);
                    continue;
                }
            };

            for tenant_id in tenants {
                if let Err(fault) = run_payout_cycle(&application_state, tenant_id).await {
                    error!(
                        "💸 [PAYOUT_SCHEDULER]: Cycle for tenant {} collapsed: {}",
                        tenant_id, fault
                    );
                }
            }
        }
    });
}
