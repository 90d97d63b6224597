// [apps/orchestrator/src/handlers/payouts.rs]
/*!
 * =================================================================
 * APARATO: PAYOUT STRATUM HANDLER (V5.2 - SETTLEMENT SURFACE)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: CORRIDA MANUAL DE LOTES Y CALLBACK DEL RAIL
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. DAILY IDEMPOTENCY: La corrida manual reutiliza las referencias
 *    deterministas del día; repetirla no duplica instrucción alguna.
 * 2. CALLBACK IDEMPOTENCY: El veredicto del rail re-entregado N veces
 *    deja el sistema exactamente como una entrega única.
 * =================================================================
 */

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::instrument;
use uuid::Uuid;
use veloz_domain_models::{Payout, PayoutStatus};

use crate::handlers::{require_operator, ApiError};
use crate::middleware::CallerIdentity;
use crate::services::payout_scheduler;
use crate::state::AppState;

/// Veredicto entrante del rail (`POST /rail/payouts/{id}/status`).
#[derive(Debug, Deserialize)]
pub struct RailVerdictPayload {
    /// Estado terminal o de tránsito reportado.
    pub status: String,
    /// Referencia del rail (clave de idempotencia del callback).
    pub provider_reference: String,
    /// Causa del fallo, si aplica.
    pub failure_reason: Option<String>,
}

pub struct PayoutHandler;

impl PayoutHandler {
    /// Endpoint: POST /api/v1/partner/payouts/run (idempotente por día)
    #[instrument(skip(state, identity))]
    pub async fn handle_run_payouts(
        State(state): State<AppState>,
        Extension(identity): Extension<CallerIdentity>,
    ) -> Result<Json<Vec<Payout>>, ApiError> {
        let tenant_id = require_operator(&identity)?;
        let created = payout_scheduler::run_payout_cycle(&state, tenant_id).await?;
        Ok(Json(created))
    }

    /// Endpoint: POST /api/v1/rail/payouts/{id}/status
    #[instrument(skip(state, payload))]
    pub async fn handle_rail_verdict(
        State(state): State<AppState>,
        Path(payout_id): Path<Uuid>,
        Json(payload): Json<RailVerdictPayload>,
    ) -> Result<Json<Value>, ApiError> {
        let applied = match payload.status.as_str() {
            "completed" => {
                let applied = state
                    .unit_of_work
                    .settle_payout(payout_id, &payload.provider_reference, Utc::now())
                    .await?;
                if applied {
                    state
                        .event_bus
                        .emit_payout_settled(payout_id, PayoutStatus::Completed);
                }
                applied
            }
            "failed" => {
                let applied = state
                    .unit_of_work
                    .fail_payout_and_release(
                        payout_id,
                        &payload.provider_reference,
                        payload.failure_reason.as_deref().unwrap_or("rail_failure"),
                        Utc::now(),
                    )
                    .await?;
                if applied {
                    state
                        .event_bus
                        .emit_payout_settled(payout_id, PayoutStatus::Failed);
                }
                applied
            }
            "processing" => {
                // Acuse de tránsito: el estado local ya lo refleja o lo hará
                // el reconciliador; el callback es informativo.
                false
            }
            other => {
                return Err(ApiError::malformed(format!(
                    "RAIL_STATUS_UNKNOWN: '{}'",
                    other
                )));
            }
        };

        Ok(Json(json!({ "ok": true, "applied": applied })))
    }
}
