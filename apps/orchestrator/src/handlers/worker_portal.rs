// [apps/orchestrator/src/handlers/worker_portal.rs]
/*!
 * =================================================================
 * APARATO: WORKER PORTAL HANDLER (V5.3 - FIELD SURFACE)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: SUPERFICIE MÓVIL DE LA UNIDAD DE CAMPO (/me)
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SIGNAL-DRIVEN OFFERS: El long-poll de ofertas se despierta por el
 *    bus de señales; sin señal, retorna vacío al agotar la ventana.
 * 2. RACE HONESTY: La aceptación tardía responde 'too_late' como dato,
 *    no como alarma; el cliente móvil lo trata como no-fatal.
 * =================================================================
 */

use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::instrument;
use uuid::Uuid;
use veloz_domain_models::{Allocation, Earning, Route, RouteStopStatus, Task};

use crate::engine::{registry, route_builder, task_manager};
use crate::handlers::{require_worker, with_deadline, ApiError};
use crate::middleware::CallerIdentity;
use crate::services::event_bus::DispatchEvent;
use crate::state::AppState;

/// Ventana máxima del long-poll de ofertas.
const OFFER_LONG_POLL_WINDOW: Duration = Duration::from_secs(25);

/// Ping de ubicación (`POST /me/location`).
#[derive(Debug, Deserialize)]
pub struct LocationPing {
    /// Latitud reportada.
    pub lat: f64,
    /// Longitud reportada.
    pub lng: f64,
    /// Marca temporal del dispositivo (autoridad del orden).
    pub ts: DateTime<Utc>,
}

/// Rechazo de oferta (`POST /me/offers/{id}/reject`).
#[derive(Debug, Deserialize)]
pub struct RejectPayload {
    /// Motivo declarado por la unidad.
    pub reason: Option<String>,
}

/// Fallo de tarea (`POST /me/tasks/{id}/fail`).
#[derive(Debug, Deserialize)]
pub struct FailurePayload {
    /// Motivo del fallo terminal.
    pub reason: String,
}

/// Ventana del listado de ganancias del worker.
#[derive(Debug, Deserialize)]
pub struct MyEarningsQuery {
    /// Inicio de la ventana.
    pub from: Option<DateTime<Utc>>,
    /// Fin de la ventana.
    pub to: Option<DateTime<Utc>>,
}

pub struct WorkerPortalHandler;

impl WorkerPortalHandler {
    /// Endpoint: POST /api/v1/me/location
    #[instrument(skip(state, identity, ping))]
    pub async fn handle_report_location(
        State(state): State<AppState>,
        Extension(identity): Extension<CallerIdentity>,
        Json(ping): Json<LocationPing>,
    ) -> Result<Json<Value>, ApiError> {
        let worker_id = require_worker(&identity)?;
        let applied =
            registry::report_location(&state, worker_id, ping.lat, ping.lng, ping.ts).await?;
        Ok(Json(json!({ "applied": applied })))
    }

    /// Endpoint: GET /api/v1/me/offers (long-poll por señal)
    #[instrument(skip(state, identity))]
    pub async fn handle_poll_offers(
        State(state): State<AppState>,
        Extension(identity): Extension<CallerIdentity>,
    ) -> Result<Json<Vec<Allocation>>, ApiError> {
        let worker_id = require_worker(&identity)?;

        let open_offers = state
            .allocations
            .list_open_for_worker(worker_id, Utc::now())
            .await?;
        if !open_offers.is_empty() {
            return Ok(Json(open_offers));
        }

        // Espera por señal: la emisión de una oferta propia despierta el poll.
        let mut signal_receiver = state.event_bus.subscribe();
        let wake = tokio::time::timeout(OFFER_LONG_POLL_WINDOW, async {
            loop {
                match signal_receiver.recv().await {
                    Ok(DispatchEvent::OfferIssued { allocation })
                        if allocation.worker_id == worker_id =>
                    {
                        break true;
                    }
                    Ok(_) => continue,
                    Err(_) => break false,
                }
            }
        })
        .await;

        if matches!(wake, Ok(true)) {
            let refreshed = state
                .allocations
                .list_open_for_worker(worker_id, Utc::now())
                .await?;
            return Ok(Json(refreshed));
        }

        Ok(Json(Vec::new()))
    }

    /// Endpoint: POST /api/v1/me/offers/{id}/accept
    #[instrument(skip(state, identity))]
    pub async fn handle_accept_offer(
        State(state): State<AppState>,
        Extension(identity): Extension<CallerIdentity>,
        Path(allocation_id): Path<Uuid>,
    ) -> Result<Json<Task>, ApiError> {
        let worker_id = require_worker(&identity)?;
        let task = with_deadline("accept_offer", async {
            task_manager::accept_offer(&state, worker_id, allocation_id)
                .await
                .map_err(ApiError::from)
        })
        .await?;
        Ok(Json(task))
    }

    /// Endpoint: POST /api/v1/me/offers/{id}/reject
    #[instrument(skip(state, identity, payload))]
    pub async fn handle_reject_offer(
        State(state): State<AppState>,
        Extension(identity): Extension<CallerIdentity>,
        Path(allocation_id): Path<Uuid>,
        Json(payload): Json<RejectPayload>,
    ) -> Result<Json<Value>, ApiError> {
        let worker_id = require_worker(&identity)?;
        task_manager::reject_offer(&state, worker_id, allocation_id, payload.reason).await?;
        Ok(Json(json!({ "ok": true })))
    }

    /// Endpoint: POST /api/v1/me/tasks/{id}/start
    #[instrument(skip(state, identity))]
    pub async fn handle_start_task(
        State(state): State<AppState>,
        Extension(identity): Extension<CallerIdentity>,
        Path(task_id): Path<Uuid>,
    ) -> Result<Json<Task>, ApiError> {
        let worker_id = require_worker(&identity)?;
        let task = task_manager::start_task(&state, worker_id, task_id).await?;
        Ok(Json(task))
    }

    /// Endpoint: POST /api/v1/me/tasks/{id}/complete
    #[instrument(skip(state, identity, completion))]
    pub async fn handle_complete_task(
        State(state): State<AppState>,
        Extension(identity): Extension<CallerIdentity>,
        Path(task_id): Path<Uuid>,
        Json(completion): Json<task_manager::CompletionDraft>,
    ) -> Result<Json<Task>, ApiError> {
        let worker_id = require_worker(&identity)?;
        let task = with_deadline("complete_task", async {
            task_manager::complete_task(&state, worker_id, task_id, completion)
                .await
                .map_err(ApiError::from)
        })
        .await?;
        Ok(Json(task))
    }

    /// Endpoint: POST /api/v1/me/tasks/{id}/fail
    #[instrument(skip(state, identity, payload))]
    pub async fn handle_fail_task(
        State(state): State<AppState>,
        Extension(identity): Extension<CallerIdentity>,
        Path(task_id): Path<Uuid>,
        Json(payload): Json<FailurePayload>,
    ) -> Result<Json<Task>, ApiError> {
        let worker_id = require_worker(&identity)?;
        let task = task_manager::fail_task(&state, worker_id, task_id, &payload.reason).await?;
        Ok(Json(task))
    }

    /// Endpoint: GET /api/v1/me/route
    #[instrument(skip(state, identity))]
    pub async fn handle_current_route(
        State(state): State<AppState>,
        Extension(identity): Extension<CallerIdentity>,
    ) -> Result<Json<Option<Route>>, ApiError> {
        let worker_id = require_worker(&identity)?;
        let route =
            route_builder::current_or_build(&state, identity.tenant_id, worker_id).await?;
        Ok(Json(route))
    }

    /// Endpoint: POST /api/v1/me/route/stops/{seq}/arrive
    #[instrument(skip(state, identity))]
    pub async fn handle_stop_arrival(
        State(state): State<AppState>,
        Extension(identity): Extension<CallerIdentity>,
        Path(sequence): Path<i32>,
    ) -> Result<Json<Route>, ApiError> {
        let worker_id = require_worker(&identity)?;
        let route = route_builder::mark_stop_progress(
            &state,
            worker_id,
            sequence,
            RouteStopStatus::Arrived,
        )
        .await?;
        Ok(Json(route))
    }

    /// Endpoint: POST /api/v1/me/route/stops/{seq}/complete
    #[instrument(skip(state, identity))]
    pub async fn handle_stop_completion(
        State(state): State<AppState>,
        Extension(identity): Extension<CallerIdentity>,
        Path(sequence): Path<i32>,
    ) -> Result<Json<Route>, ApiError> {
        let worker_id = require_worker(&identity)?;
        let route = route_builder::mark_stop_progress(
            &state,
            worker_id,
            sequence,
            RouteStopStatus::Completed,
        )
        .await?;
        Ok(Json(route))
    }

    /// Endpoint: GET /api/v1/me/earnings
    #[instrument(skip(state, identity))]
    pub async fn handle_my_earnings(
        State(state): State<AppState>,
        Extension(identity): Extension<CallerIdentity>,
        Query(query): Query<MyEarningsQuery>,
    ) -> Result<Json<Vec<Earning>>, ApiError> {
        let worker_id = require_worker(&identity)?;
        let earnings = state
            .earnings
            .list_for_worker(worker_id, query.from, query.to, &[], 200)
            .await?;
        Ok(Json(earnings))
    }
}
