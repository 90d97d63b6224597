// [apps/orchestrator/src/handlers/analytics.rs]
/*!
 * =================================================================
 * APARATO: ANALYTICS STRATUM HANDLER (V5.1 - ROLLUP SURFACE)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: AGREGADOS OPERATIVOS DE TAREAS Y FLOTA
 * =================================================================
 */

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::handlers::{require_operator, ApiError};
use crate::middleware::CallerIdentity;
use crate::state::AppState;

/// Ventana temporal del rollup de tareas (defaults: últimos 30 días).
#[derive(Debug, Deserialize)]
pub struct AnalyticsWindowQuery {
    /// Inicio de la ventana.
    pub from: Option<DateTime<Utc>>,
    /// Fin de la ventana.
    pub to: Option<DateTime<Utc>>,
}

/// Rollup de tareas en forma de transporte.
#[derive(Debug, Serialize)]
pub struct TaskAnalyticsWire {
    /// Conteos por estado.
    pub counts_by_status: Vec<(String, i64)>,
    /// Total de tareas creadas en la ventana.
    pub total_tasks: i64,
    /// Fracción de cierres sobre el total.
    pub completion_rate: f64,
    /// Duración real promedio de los cierres (minutos).
    pub average_duration_minutes: Option<f64>,
    /// Distancia real promedio de los cierres (km).
    pub average_distance_km: Option<f64>,
}

/// Rollup de flota en forma de transporte.
#[derive(Debug, Serialize)]
pub struct FleetAnalyticsWire {
    /// Conteos por ciclo de vida.
    pub counts_by_lifecycle: Vec<(String, i64)>,
    /// Conteos por disponibilidad.
    pub counts_by_availability: Vec<(String, i64)>,
    /// Calificación media de las unidades activas.
    pub average_rating: Option<f64>,
    /// Total de unidades activas.
    pub active_count: i64,
}

pub struct AnalyticsHandler;

impl AnalyticsHandler {
    /// Endpoint: GET /api/v1/partner/analytics/tasks
    #[instrument(skip(state, identity))]
    pub async fn handle_task_analytics(
        State(state): State<AppState>,
        Extension(identity): Extension<CallerIdentity>,
        Query(window): Query<AnalyticsWindowQuery>,
    ) -> Result<Json<TaskAnalyticsWire>, ApiError> {
        let tenant_id = require_operator(&identity)?;

        let window_end = window.to.unwrap_or_else(Utc::now);
        let window_start = window
            .from
            .unwrap_or_else(|| window_end - ChronoDuration::days(30));

        let rollup = state
            .tasks
            .analytics_rollup(tenant_id, window_start, window_end)
            .await?;

        Ok(Json(TaskAnalyticsWire {
            counts_by_status: rollup.counts_by_status,
            total_tasks: rollup.total_tasks,
            completion_rate: rollup.completion_rate,
            average_duration_minutes: rollup.average_duration_minutes,
            average_distance_km: rollup.average_distance_km,
        }))
    }

    /// Endpoint: GET /api/v1/partner/analytics/workers
    #[instrument(skip(state, identity))]
    pub async fn handle_fleet_analytics(
        State(state): State<AppState>,
        Extension(identity): Extension<CallerIdentity>,
    ) -> Result<Json<FleetAnalyticsWire>, ApiError> {
        let tenant_id = require_operator(&identity)?;
        let rollup = state.workers.fleet_rollup(tenant_id).await?;

        Ok(Json(FleetAnalyticsWire {
            counts_by_lifecycle: rollup.counts_by_lifecycle,
            counts_by_availability: rollup.counts_by_availability,
            average_rating: rollup.average_rating,
            active_count: rollup.active_count,
        }))
    }
}
