// [apps/orchestrator/src/engine/route_builder.rs]
/*!
 * =================================================================
 * APARATO: ROUTE BUILDER ENGINE (V5.2 - READ-THROUGH COMPOSER)
 * CLASIFICACIÓN: APPLICATION ENGINE (ESTRATO L4)
 * RESPONSABILIDAD: COMPOSICIÓN Y PROGRESO DE RECORRIDOS MULTI-PARADA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. READ-THROUGH COMPOSITION: `GET /me/route` retorna el recorrido
 *    activo o lo compone al vuelo desde las tareas aceptadas; el índice
 *    único parcial garantiza a lo sumo uno activo por worker.
 * 2. BOUNDED OPTIMIZATION: Siembra greedy + 2-opt bajo presupuesto de
 *    50 ms; la llamada es síncrona (CPU pura) dentro del handler.
 * 3. SPEED-AWARE ETAS: Las duraciones por pierna usan la velocidad
 *    media del vehículo declarado de la unidad.
 * =================================================================
 */

use chrono::{Duration as ChronoDuration, Utc};
use tracing::{info, instrument};
use uuid::Uuid;
use veloz_core_geo::point::GeoPoint;
use veloz_core_routing::{plan_route, DEFAULT_OPTIMIZATION_BUDGET};
use veloz_domain_models::{
    Route, RouteStatus, RouteStop, RouteStopStatus, Task, TaskStatus,
};
use veloz_infra_db::repositories::TaskListFilter;
use veloz_infra_db::DbError;

use crate::state::AppState;

/**
 * Recupera el recorrido activo del worker o lo compone desde sus
 * tareas aceptadas. Sin tareas aceptadas ni recorrido: `None`.
 *
 * # Errors:
 * - `DbError::Duplicate("route")` (wire: route_already_active) si otra
 *   composición concurrente ganó la carrera del índice parcial.
 */
#[instrument(skip(state))]
pub async fn current_or_build(
    state: &AppState,
    tenant_id: Uuid,
    worker_id: Uuid,
) -> Result<Option<Route>, DbError> {
    if let Some(active_route) = state.routes.fetch_active_for_worker(worker_id).await? {
        return Ok(Some(active_route));
    }

    let worker = state.workers.fetch_worker(worker_id).await?;
    let Some(worker_point) = worker.location else {
        // Sin ubicación viva no hay punto de partida que ordenar.
        return Ok(None);
    };

    let accepted_filter = TaskListFilter {
        statuses: vec![TaskStatus::Accepted],
        worker_id: Some(worker_id),
        ..TaskListFilter::default()
    };
    let accepted_tasks = state
        .tasks
        .list_for_tenant(tenant_id, &accepted_filter, 64, 0)
        .await?;

    if accepted_tasks.is_empty() {
        return Ok(None);
    }

    let route = compose_route(&worker_point, worker.effective_speed_kmh(), tenant_id, worker_id, &accepted_tasks);
    state.routes.insert_route_with_stops(&route).await?;

    info!(
        "🗺️ [ROUTE_BUILDER]: Route {} composed for worker {} ({} stops, score {:.3}).",
        route.id,
        worker_id,
        route.stops.len(),
        route.optimization_score
    );
    Ok(Some(route))
}

/// Composición pura: ordenamiento, piernas, ETAs y score del plan.
fn compose_route(
    start_point: &GeoPoint,
    speed_kmh: f64,
    tenant_id: Uuid,
    worker_id: Uuid,
    accepted_tasks: &[Task],
) -> Route {
    // Pareo tarea-punto previo al plan: los índices del optimizador
    // refieren SIEMPRE a esta colección filtrada.
    let routable_tasks: Vec<(&Task, GeoPoint)> = accepted_tasks
        .iter()
        .filter_map(|task| task.dispatch_point().copied().map(|point| (task, point)))
        .collect();
    let stop_points: Vec<GeoPoint> = routable_tasks.iter().map(|(_, point)| *point).collect();

    let plan = plan_route(start_point, &stop_points, DEFAULT_OPTIMIZATION_BUDGET);

    let now = Utc::now();
    let route_id = Uuid::new_v4();
    let mut cumulative_minutes = 0.0;
    let mut total_duration_minutes = 0.0;

    let stops: Vec<RouteStop> = plan
        .visit_order
        .iter()
        .enumerate()
        .map(|(position, stop_index)| {
            let (task, stop_point) = &routable_tasks[*stop_index];
            let leg_distance_km = plan.leg_distances_km[position];
            let leg_duration_minutes = if speed_kmh > 0.0 {
                (leg_distance_km / speed_kmh) * 60.0
            } else {
                0.0
            };
            cumulative_minutes += leg_duration_minutes;
            total_duration_minutes += leg_duration_minutes;

            let site = task.pickup.clone().unwrap_or_else(|| {
                veloz_domain_models::SitePoint {
                    point: *stop_point,
                    address: String::new(),
                }
            });

            RouteStop {
                id: Uuid::new_v4(),
                route_id,
                task_id: task.id,
                sequence: (position + 1) as i32,
                status: RouteStopStatus::Pending,
                location: site,
                distance_from_prev_km: leg_distance_km,
                duration_from_prev_minutes: leg_duration_minutes,
                estimated_arrival: Some(
                    now + ChronoDuration::seconds((cumulative_minutes * 60.0) as i64),
                ),
                actual_arrival: None,
                completed_at: None,
            }
        })
        .collect();

    Route {
        id: route_id,
        tenant_id,
        worker_id,
        status: RouteStatus::Active,
        total_distance_km: plan.total_distance_km,
        total_duration_minutes,
        estimated_end_at: Some(now + ChronoDuration::seconds((total_duration_minutes * 60.0) as i64)),
        started_at: Some(now),
        completed_at: None,
        optimization_score: plan.optimization_score,
        stops,
        version: 1,
        created_at: now,
    }
}

/**
 * Progreso de parada del recorrido activo (`arrive` / `complete`).
 * El recorrido se cierra solo cuando toda parada alcanza estado final.
 *
 * # Errors:
 * - `DbError::NotFound("route")` sin recorrido activo.
 * - `DbError::NotFound("route_stop")` si la secuencia no es mutable.
 */
#[instrument(skip(state))]
pub async fn mark_stop_progress(
    state: &AppState,
    worker_id: Uuid,
    sequence: i32,
    target_status: RouteStopStatus,
) -> Result<Route, DbError> {
    let Some(active_route) = state.routes.fetch_active_for_worker(worker_id).await? else {
        return Err(DbError::NotFound("route"));
    };

    state
        .routes
        .update_stop_progress(active_route.id, sequence, target_status)
        .await?;

    if matches!(
        target_status,
        RouteStopStatus::Completed | RouteStopStatus::Skipped
    ) {
        state
            .routes
            .finalize_route_if_exhausted(active_route.id)
            .await?;
    }

    // Relectura: el llamador observa el recorrido con el progreso sellado.
    match state.routes.fetch_active_for_worker(worker_id).await? {
        Some(refreshed_route) => Ok(refreshed_route),
        None => {
            // El recorrido acaba de cerrarse; se retorna su instantánea final.
            let mut closed_route = active_route;
            closed_route.status = RouteStatus::Completed;
            Ok(closed_route)
        }
    }
}
