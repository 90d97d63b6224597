// [apps/orchestrator/src/services/rail_reconciler.rs]
/*!
 * =================================================================
 * APARATO: RAIL RECONCILIATION DAEMON (V5.2 - LOOP CLOSER)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L4)
 * RESPONSABILIDAD: CIERRE DE LAZOS DE PAGO TRAS CORTES TRANSITORIOS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SUBMISSION REPAIR: Lotes 'pending' cuyo envío al rail falló se
 *    re-transmiten con la MISMA referencia local; el rail de-duplica.
 * 2. VERDICT POLLING: Lotes 'processing' se sondean y sus veredictos
 *    terminales se aplican con las mismas primitivas idempotentes que
 *    consume el callback HTTP.
 * 3. SANDBOX AWARENESS: En modo sandbox el sondeo reporta tránsito
 *    perpetuo; el veredicto llega exclusivamente por callback.
 * =================================================================
 */

use std::time::Duration;

use chrono::Utc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};
use veloz_domain_models::PayoutStatus;

use crate::state::AppState;

/// Tope de instrucciones examinadas por ciclo de reconciliación.
const RECONCILE_BATCH_CEILING: i64 = 128;

/// Lanza el daemon de reconciliación del rail.
pub fn spawn_rail_reconciler(application_state: AppState, poll_interval_seconds: u64) {
    tokio::spawn(async move {
        let mut reconcile_ticker = interval(Duration::from_secs(poll_interval_seconds.max(5)));
        reconcile_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("🔄 [RAIL_RECONCILER]: Loop-closure daemon operational.");

        loop {
            reconcile_ticker.tick().await;

            repair_stalled_submissions(&application_state).await;
            poll_processing_verdicts(&application_state).await;
        }
    });
}

/// Re-envía lotes 'pending' que no alcanzaron el rail (corte transitorio).
async fn repair_stalled_submissions(state: &AppState) {
    let stalled = match state
        .payouts
        .list_with_status_globally(PayoutStatus::Pending, RECONCILE_BATCH_CEILING)
        .await
    {
        Ok(stalled) => stalled,
        Err(fault) => {
            error!("🔄 [RAIL_RECONCILER]: Pending scan collapsed: {}", fault);
            return;
        }
    };

    for payout in stalled {
        match state.rail_client.submit_instruction(&payout).await {
            Ok(acknowledgement) => {
                if let Err(fault) = state
                    .payouts
                    .mark_processing(payout.id, &acknowledgement.provider_reference, payout.version)
                    .await
                {
                    warn!(
                        "🔄 [RAIL_RECONCILER]: Processing seal deferred for {}: {}",
                        payout.reference, fault
                    );
                }
            }
            Err(fault) => {
                warn!(
                    "🔄 [RAIL_RECONCILER]: Resubmission deferred for {}: {}",
                    payout.reference, fault
                );
            }
        }
    }
}

/// Sondea veredictos de lotes en tránsito y los aplica idempotentemente.
async fn poll_processing_verdicts(state: &AppState) {
    if state.rail_client.is_sandbox() {
        // Sandbox: los veredictos llegan únicamente por callback HTTP.
        return;
    }

    let in_flight = match state
        .payouts
        .list_with_status_globally(PayoutStatus::Processing, RECONCILE_BATCH_CEILING)
        .await
    {
        Ok(in_flight) => in_flight,
        Err(fault) => {
            error!("🔄 [RAIL_RECONCILER]: Processing scan collapsed: {}", fault);
            return;
        }
    };

    for payout in in_flight {
        let Some(provider_reference) = payout.provider_reference.clone() else {
            continue;
        };

        let verdict = match state.rail_client.fetch_status(&provider_reference).await {
            Ok(verdict) => verdict,
            Err(fault) => {
                warn!(
                    "🔄 [RAIL_RECONCILER]: Verdict poll deferred for {}: {}",
                    provider_reference, fault
                );
                continue;
            }
        };

        let applied = match verdict.status.as_str() {
            "completed" => state
                .unit_of_work
                .settle_payout(payout.id, &provider_reference, Utc::now())
                .await
                .map(|applied| applied.then_some(PayoutStatus::Completed)),
            "failed" => state
                .unit_of_work
                .fail_payout_and_release(
                    payout.id,
                    &provider_reference,
                    verdict.failure_reason.as_deref().unwrap_or("rail_failure"),
                    Utc::now(),
                )
                .await
                .map(|applied| applied.then_some(PayoutStatus::Failed)),
            _ => Ok(None),
        };

        match applied {
            Ok(Some(final_status)) => {
                state.event_bus.emit_payout_settled(payout.id, final_status);
            }
            Ok(None) => {}
            Err(fault) => {
                error!(
                    "🔄 [RAIL_RECONCILER]: Verdict application collapsed for {}: {}",
                    payout.id, fault
                );
            }
        }
    }
}
