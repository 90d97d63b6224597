// [apps/orchestrator/src/handlers/tasks.rs]
/*!
 * =================================================================
 * APARATO: TASK STRATUM HANDLER (V5.2 - PARTNER SURFACE)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: EXPOSICIÓN DEL CICLO DE VIDA DE TAREAS AL PARTNER
 * =================================================================
 */

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;
use veloz_domain_models::{TaskDraft, TaskStatus, TaskType};
use veloz_infra_db::repositories::TaskListFilter;

use crate::engine::task_manager;
use crate::handlers::{require_operator, with_deadline, ApiError};
use crate::middleware::CallerIdentity;
use crate::state::AppState;

/// Filtros de `GET /tasks` en su forma de transporte.
#[derive(Debug, Deserialize)]
pub struct TaskListQuery {
    /// Estados separados por coma.
    pub status: Option<String>,
    /// Tipos separados por coma.
    #[serde(rename = "type")]
    pub task_type: Option<String>,
    /// Worker asignado exigido.
    pub worker_id: Option<Uuid>,
    /// Referencia de pedido upstream.
    pub order_id: Option<String>,
    /// Solo tareas escaladas.
    #[serde(default)]
    pub escalated: bool,
    /// Inicio de la ventana de programación.
    pub scheduled_from: Option<DateTime<Utc>>,
    /// Fin de la ventana de programación.
    pub scheduled_to: Option<DateTime<Utc>>,
    /// Página 0-based.
    #[serde(default)]
    pub page: i64,
    /// Tamaño de página (tope 200).
    #[serde(default = "default_page_size")]
    pub limit: i64,
}

fn default_page_size() -> i64 {
    50
}

pub struct TaskHandler;

impl TaskHandler {
    /// Endpoint: POST /api/v1/partner/tasks
    #[instrument(skip(state, identity, draft))]
    pub async fn handle_create_task(
        State(state): State<AppState>,
        Extension(identity): Extension<CallerIdentity>,
        Json(draft): Json<TaskDraft>,
    ) -> Result<(StatusCode, Json<veloz_domain_models::Task>), ApiError> {
        let tenant_id = require_operator(&identity)?;
        let task = with_deadline("create_task", async {
            task_manager::create_task(&state, tenant_id, draft)
                .await
                .map_err(ApiError::from)
        })
        .await?;
        Ok((StatusCode::CREATED, Json(task)))
    }

    /// Endpoint: GET /api/v1/partner/tasks
    #[instrument(skip(state, identity))]
    pub async fn handle_list_tasks(
        State(state): State<AppState>,
        Extension(identity): Extension<CallerIdentity>,
        Query(query): Query<TaskListQuery>,
    ) -> Result<Json<Vec<veloz_domain_models::Task>>, ApiError> {
        let tenant_id = require_operator(&identity)?;

        let statuses = parse_comma_list(query.status.as_deref(), |raw| {
            TaskStatus::parse(raw).map_err(|fault| ApiError::malformed(fault.to_string()))
        })?;
        let task_types = parse_comma_list(query.task_type.as_deref(), |raw| {
            TaskType::parse(raw).map_err(|fault| ApiError::malformed(fault.to_string()))
        })?;

        let scheduled_between = match (query.scheduled_from, query.scheduled_to) {
            (Some(from), Some(to)) => Some((from, to)),
            _ => None,
        };

        let filter = TaskListFilter {
            statuses,
            task_types,
            worker_id: query.worker_id,
            order_reference: query.order_id,
            escalated_only: query.escalated,
            scheduled_between,
        };

        let limit = query.limit.clamp(1, 200);
        let offset = query.page.max(0) * limit;
        let tasks = state
            .tasks
            .list_for_tenant(tenant_id, &filter, limit, offset)
            .await?;
        Ok(Json(tasks))
    }

    /// Endpoint: GET /api/v1/partner/tasks/{id}
    #[instrument(skip(state, identity))]
    pub async fn handle_get_task(
        State(state): State<AppState>,
        Extension(identity): Extension<CallerIdentity>,
        Path(task_id): Path<Uuid>,
    ) -> Result<Json<veloz_domain_models::Task>, ApiError> {
        let tenant_id = require_operator(&identity)?;
        let task = state.tasks.fetch_task(task_id).await?;
        if task.tenant_id != tenant_id {
            return Err(veloz_infra_db::DbError::NotFound("task").into());
        }
        Ok(Json(task))
    }

    /// Endpoint: POST /api/v1/partner/tasks/{id}/cancel
    #[instrument(skip(state, identity, payload))]
    pub async fn handle_cancel_task(
        State(state): State<AppState>,
        Extension(identity): Extension<CallerIdentity>,
        Path(task_id): Path<Uuid>,
        Json(payload): Json<CancelTaskPayload>,
    ) -> Result<Json<veloz_domain_models::Task>, ApiError> {
        let tenant_id = require_operator(&identity)?;
        let task = with_deadline("cancel_task", async {
            task_manager::cancel_task(
                &state,
                tenant_id,
                task_id,
                payload.reason.as_deref().unwrap_or("operator_cancelled"),
            )
            .await
            .map_err(ApiError::from)
        })
        .await?;
        Ok(Json(task))
    }
}

/// Carga de cancelación del partner.
#[derive(Debug, Deserialize)]
pub struct CancelTaskPayload {
    /// Motivo operativo declarado.
    pub reason: Option<String>,
}

fn parse_comma_list<T>(
    raw: Option<&str>,
    parse_one: impl Fn(&str) -> Result<T, ApiError>,
) -> Result<Vec<T>, ApiError> {
    match raw {
        None => Ok(Vec::new()),
        Some(joined) => joined
            .split(',')
            .map(str::trim)
            .filter(|piece| !piece.is_empty())
            .map(&parse_one)
            .collect(),
    }
}
