// [apps/orchestrator/src/handlers/workers.rs]
/*!
 * =================================================================
 * APARATO: WORKER ADMINISTRATION HANDLER (V5.2 - FLEET SURFACE)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: GESTIÓN DE LA FLOTA Y SU LEDGER DESDE EL PARTNER
 * =================================================================
 */

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;
use veloz_domain_models::{
    present_amount, Availability, DomainError, Earning, EarningType, Worker, WorkerLifecycle,
    WorkerType,
};
use veloz_infra_db::repositories::WorkerListFilter;
use veloz_infra_db::DbError;

use crate::engine::registry::{self, RegisterWorkerDraft};
use crate::handlers::{require_operator, ApiError};
use crate::middleware::CallerIdentity;
use crate::state::AppState;

/// Filtros del listado administrativo de la flota.
#[derive(Debug, Deserialize)]
pub struct WorkerListQuery {
    /// Ciclo de vida exigido.
    pub status: Option<String>,
    /// Disponibilidad exigida.
    pub availability: Option<String>,
    /// Especialidad exigida.
    #[serde(rename = "type")]
    pub worker_type: Option<String>,
    /// Tope del listado.
    #[serde(default = "default_fleet_limit")]
    pub limit: i64,
}

fn default_fleet_limit() -> i64 {
    100
}

/// Mutación de ciclo de vida (`PATCH /workers/{id}/status`).
#[derive(Debug, Deserialize)]
pub struct LifecyclePatch {
    /// Estado administrativo destino.
    pub status: WorkerLifecycle,
}

/// Mutación de disponibilidad (`PATCH /workers/{id}/availability`).
#[derive(Debug, Deserialize)]
pub struct AvailabilityPatch {
    /// Destino voluntario: online u offline.
    pub availability: Availability,
}

/// Concesión manual de ajuste (`POST /workers/{id}/adjustments`).
#[derive(Debug, Deserialize)]
pub struct AdjustmentGrant {
    /// Magnitud con signo del ajuste.
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    /// Moneda ISO-4217.
    pub currency: String,
    /// Justificación operativa obligatoria.
    pub description: String,
}

/// Ventana del listado de ganancias.
#[derive(Debug, Deserialize)]
pub struct EarningsQuery {
    /// Inicio de la ventana.
    pub from: Option<DateTime<Utc>>,
    /// Fin de la ventana.
    pub to: Option<DateTime<Utc>>,
    /// Tipos separados por coma.
    #[serde(rename = "type")]
    pub entry_type: Option<String>,
    /// Tope del listado.
    #[serde(default = "default_fleet_limit")]
    pub limit: i64,
}

/// Línea del resumen de ganancias en su forma de transporte.
#[derive(Debug, Serialize)]
pub struct EarningSummaryWire {
    /// Origen agrupador.
    pub entry_type: EarningType,
    /// Cantidad de líneas.
    pub line_count: i64,
    /// Suma presentada con redondeo bancario.
    pub total_amount: String,
}

pub struct WorkerAdministrationHandler;

impl WorkerAdministrationHandler {
    /// Endpoint: POST /api/v1/partner/workers
    #[instrument(skip(state, identity, draft))]
    pub async fn handle_register_worker(
        State(state): State<AppState>,
        Extension(identity): Extension<CallerIdentity>,
        Json(draft): Json<RegisterWorkerDraft>,
    ) -> Result<(StatusCode, Json<Worker>), ApiError> {
        let tenant_id = require_operator(&identity)?;
        let worker = registry::register_worker(&state, tenant_id, draft).await?;
        Ok((StatusCode::CREATED, Json(worker)))
    }

    /// Endpoint: GET /api/v1/partner/workers
    #[instrument(skip(state, identity))]
    pub async fn handle_list_workers(
        State(state): State<AppState>,
        Extension(identity): Extension<CallerIdentity>,
        Query(query): Query<WorkerListQuery>,
    ) -> Result<Json<Vec<Worker>>, ApiError> {
        let tenant_id = require_operator(&identity)?;

        let filter = WorkerListFilter {
            lifecycle: query
                .status
                .as_deref()
                .map(WorkerLifecycle::parse)
                .transpose()
                .map_err(|fault| ApiError::malformed(fault.to_string()))?,
            availability: query
                .availability
                .as_deref()
                .map(Availability::parse)
                .transpose()
                .map_err(|fault| ApiError::malformed(fault.to_string()))?,
            worker_type: query
                .worker_type
                .as_deref()
                .map(WorkerType::parse)
                .transpose()
                .map_err(|fault| ApiError::malformed(fault.to_string()))?,
        };

        let workers = state
            .workers
            .list_for_tenant(tenant_id, &filter, query.limit.clamp(1, 500))
            .await?;
        Ok(Json(workers))
    }

    /// Endpoint: GET /api/v1/partner/workers/{id}
    #[instrument(skip(state, identity))]
    pub async fn handle_get_worker(
        State(state): State<AppState>,
        Extension(identity): Extension<CallerIdentity>,
        Path(worker_id): Path<Uuid>,
    ) -> Result<Json<Worker>, ApiError> {
        let tenant_id = require_operator(&identity)?;
        let worker = state.workers.fetch_worker(worker_id).await?;
        if worker.tenant_id != tenant_id {
            return Err(DbError::NotFound("worker").into());
        }
        Ok(Json(worker))
    }

    /// Endpoint: PATCH /api/v1/partner/workers/{id}/status
    #[instrument(skip(state, identity, patch))]
    pub async fn handle_patch_lifecycle(
        State(state): State<AppState>,
        Extension(identity): Extension<CallerIdentity>,
        Path(worker_id): Path<Uuid>,
        Json(patch): Json<LifecyclePatch>,
    ) -> Result<Json<Worker>, ApiError> {
        let tenant_id = require_operator(&identity)?;
        let worker = registry::change_lifecycle(&state, tenant_id, worker_id, patch.status).await?;
        Ok(Json(worker))
    }

    /// Endpoint: PATCH /api/v1/partner/workers/{id}/availability
    #[instrument(skip(state, identity, patch))]
    pub async fn handle_patch_availability(
        State(state): State<AppState>,
        Extension(identity): Extension<CallerIdentity>,
        Path(worker_id): Path<Uuid>,
        Json(patch): Json<AvailabilityPatch>,
    ) -> Result<Json<Worker>, ApiError> {
        let tenant_id = require_operator(&identity)?;

        let go_online = match patch.availability {
            Availability::Online => true,
            Availability::Offline => false,
            Availability::Busy => {
                // 'busy' pertenece a las primitivas del Store, jamás a la API.
                return Err(ApiError::malformed(
                    DomainError::InvalidTransition {
                        entity: "worker",
                        from: "api".into(),
                        to: "busy".into(),
                    }
                    .to_string(),
                ));
            }
        };

        let worker = registry::set_availability(&state, tenant_id, worker_id, go_online).await?;
        Ok(Json(worker))
    }

    /// Endpoint: POST /api/v1/partner/workers/{id}/adjustments
    #[instrument(skip(state, identity, grant))]
    pub async fn handle_grant_adjustment(
        State(state): State<AppState>,
        Extension(identity): Extension<CallerIdentity>,
        Path(worker_id): Path<Uuid>,
        Json(grant): Json<AdjustmentGrant>,
    ) -> Result<(StatusCode, Json<Earning>), ApiError> {
        let tenant_id = require_operator(&identity)?;

        let worker = state.workers.fetch_worker(worker_id).await?;
        if worker.tenant_id != tenant_id {
            return Err(DbError::NotFound("worker").into());
        }

        let earning = Earning {
            id: Uuid::new_v4(),
            tenant_id,
            worker_id,
            task_id: None,
            entry_type: EarningType::Adjustment,
            amount: grant.amount,
            currency: grant.currency,
            is_paid_out: false,
            payout_id: None,
            description: Some(grant.description),
            earned_at: Utc::now(),
        };
        state.earnings.insert_earning(&earning).await?;
        Ok((StatusCode::CREATED, Json(earning)))
    }

    /// Endpoint: GET /api/v1/partner/workers/{id}/earnings
    #[instrument(skip(state, identity))]
    pub async fn handle_list_earnings(
        State(state): State<AppState>,
        Extension(identity): Extension<CallerIdentity>,
        Path(worker_id): Path<Uuid>,
        Query(query): Query<EarningsQuery>,
    ) -> Result<Json<Vec<Earning>>, ApiError> {
        let tenant_id = require_operator(&identity)?;
        let worker = state.workers.fetch_worker(worker_id).await?;
        if worker.tenant_id != tenant_id {
            return Err(DbError::NotFound("worker").into());
        }

        let entry_types = parse_entry_types(query.entry_type.as_deref())?;
        let earnings = state
            .earnings
            .list_for_worker(
                worker_id,
                query.from,
                query.to,
                &entry_types,
                query.limit.clamp(1, 500),
            )
            .await?;
        Ok(Json(earnings))
    }

    /// Endpoint: GET /api/v1/partner/workers/{id}/earnings/summary
    #[instrument(skip(state, identity))]
    pub async fn handle_earnings_summary(
        State(state): State<AppState>,
        Extension(identity): Extension<CallerIdentity>,
        Path(worker_id): Path<Uuid>,
        Query(query): Query<EarningsQuery>,
    ) -> Result<Json<Vec<EarningSummaryWire>>, ApiError> {
        let tenant_id = require_operator(&identity)?;
        let worker = state.workers.fetch_worker(worker_id).await?;
        if worker.tenant_id != tenant_id {
            return Err(DbError::NotFound("worker").into());
        }

        let summary_lines = state
            .earnings
            .summarize_for_worker(worker_id, query.from, query.to)
            .await?;

        let wire: Vec<EarningSummaryWire> = summary_lines
            .into_iter()
            .map(|line| EarningSummaryWire {
                entry_type: line.entry_type,
                line_count: line.line_count,
                total_amount: present_amount(line.total_amount),
            })
            .collect();
        Ok(Json(wire))
    }
}

fn parse_entry_types(raw: Option<&str>) -> Result<Vec<EarningType>, ApiError> {
    match raw {
        None => Ok(Vec::new()),
        Some(joined) => joined
            .split(',')
            .map(str::trim)
            .filter(|piece| !piece.is_empty())
            .map(|piece| {
                EarningType::parse(piece).map_err(|fault| ApiError::malformed(fault.to_string()))
            })
            .collect(),
    }
}
