// [libs/infra/db-turso/src/repositories/route_repository.rs]
/*!
 * =================================================================
 * APARATO: ROUTE REPOSITORY (V5.1 - SINGLE ACTIVE SEALED)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA DE RECORRIDOS Y PARADAS ORDENADAS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SINGLE ACTIVE LAW: El índice único parcial (worker, active) sella
 *    a nivel de motor que un worker ejecuta a lo sumo un recorrido.
 * 2. COMPOSITE ATOMICITY: Recorrido y paradas nacen en una transacción
 *    única; jamás existe un recorrido sin sus paradas.
 * =================================================================
 */

use chrono::Utc;
use libsql::params;
use tracing::{debug, instrument};
use uuid::Uuid;
use veloz_domain_models::{Route, RouteStatus, RouteStopStatus};

use crate::errors::{is_unique_violation, DbError};
use crate::mapping::{fmt_ts, map_route_row, map_stop_row, ROUTE_COLUMNS, STOP_COLUMNS};
use crate::TursoClient;

/// Repositorio de autoridad única para los recorridos multi-parada.
pub struct RouteRepository {
    /// Cliente táctico para el enlace con el cluster de Turso (Motor A).
    database_client: TursoClient,
}

impl RouteRepository {
    /// Inicializa una nueva instancia del repositorio de recorridos.
    #[must_use]
    pub fn new(database_client: TursoClient) -> Self {
        Self { database_client }
    }

    /**
     * Materializa el recorrido completo (cabecera + paradas) en una
     * transacción única.
     *
     * # Errors:
     * - `DbError::Duplicate("route")`: el worker ya posee un recorrido
     *   activo (wire: route_already_active).
     */
    #[instrument(skip(self, route), fields(route_id = %route.id, stops = route.stops.len()))]
    pub async fn insert_route_with_stops(&self, route: &Route) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        let route_transaction = database_connection
            .transaction()
            .await
            .map_err(|_| DbError::TransactionError)?;

        let header_result = route_transaction
            .execute(
                r#"
                INSERT INTO routes (
                    id, tenant_id, worker_id, status, total_distance_km,
                    total_duration_minutes, estimated_end_at, started_at,
                    completed_at, optimization_score, version, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                "#,
                params![
                    route.id.to_string(),
                    route.tenant_id.to_string(),
                    route.worker_id.to_string(),
                    route.status.as_str(),
                    route.total_distance_km,
                    route.total_duration_minutes,
                    route.estimated_end_at.map(|instant| fmt_ts(&instant)),
                    route.started_at.map(|instant| fmt_ts(&instant)),
                    route.completed_at.map(|instant| fmt_ts(&instant)),
                    route.optimization_score,
                    route.version,
                    fmt_ts(&route.created_at)
                ],
            )
            .await;

        if let Err(fault) = header_result {
            let classified = if is_unique_violation(&fault) {
                DbError::Duplicate("route")
            } else {
                fault.into()
            };
            return Err(classified);
        }

        for stop in &route.stops {
            route_transaction
                .execute(
                    r#"
                    INSERT INTO route_stops (
                        id, route_id, task_id, sequence, status, latitude,
                        longitude, address, distance_from_prev_km,
                        duration_from_prev_minutes, estimated_arrival,
                        actual_arrival, completed_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                    "#,
                    params![
                        stop.id.to_string(),
                        stop.route_id.to_string(),
                        stop.task_id.to_string(),
                        stop.sequence as i64,
                        stop.status.as_str(),
                        stop.location.point.latitude,
                        stop.location.point.longitude,
                        stop.location.address.clone(),
                        stop.distance_from_prev_km,
                        stop.duration_from_prev_minutes,
                        stop.estimated_arrival.map(|instant| fmt_ts(&instant)),
                        stop.actual_arrival.map(|instant| fmt_ts(&instant)),
                        stop.completed_at.map(|instant| fmt_ts(&instant))
                    ],
                )
                .await?;
        }

        route_transaction
            .commit()
            .await
            .map_err(|_| DbError::TransactionError)?;

        debug!(
            "🗺️ [ROUTES]: Route {} sealed with {} stops.",
            route.id,
            route.stops.len()
        );
        Ok(())
    }

    /// Recorrido activo del worker con sus paradas, si existe.
    pub async fn fetch_active_for_worker(
        &self,
        worker_id: Uuid,
    ) -> Result<Option<Route>, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query(
                &format!(
                    "SELECT {} FROM routes WHERE worker_id = ?1 AND status = 'active'",
                    ROUTE_COLUMNS
                ),
                params![worker_id.to_string()],
            )
            .await?;

        let Some(data_row) = query_results.next().await? else {
            return Ok(None);
        };
        let mut route = map_route_row(&data_row)?;

        let mut stop_results = database_connection
            .query(
                &format!(
                    "SELECT {} FROM route_stops WHERE route_id = ?1 ORDER BY sequence ASC",
                    STOP_COLUMNS
                ),
                params![route.id.to_string()],
            )
            .await?;
        while let Some(stop_row) = stop_results.next().await? {
            route.stops.push(map_stop_row(&stop_row)?);
        }

        Ok(Some(route))
    }

    /**
     * Muta el estado de una parada del recorrido activo del worker.
     *
     * `arrived` sella `actual_arrival`; `completed` sella `completed_at`.
     *
     * # Errors:
     * - `DbError::NotFound("route_stop")` si la secuencia no existe.
     */
    #[instrument(skip(self))]
    pub async fn update_stop_progress(
        &self,
        route_id: Uuid,
        sequence: i32,
        target_status: RouteStopStatus,
    ) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        let now = fmt_ts(&Utc::now());

        let sql = match target_status {
            RouteStopStatus::Arrived => {
                "UPDATE route_stops SET status = 'arrived', actual_arrival = ?1
                 WHERE route_id = ?2 AND sequence = ?3 AND status = 'pending'"
            }
            RouteStopStatus::Completed => {
                "UPDATE route_stops SET status = 'completed', completed_at = ?1
                 WHERE route_id = ?2 AND sequence = ?3 AND status IN ('pending','arrived')"
            }
            RouteStopStatus::Skipped => {
                "UPDATE route_stops SET status = 'skipped', completed_at = ?1
                 WHERE route_id = ?2 AND sequence = ?3 AND status IN ('pending','arrived')"
            }
            RouteStopStatus::Pending => {
                return Err(DbError::Domain(
                    veloz_domain_models::DomainError::InvalidTransition {
                        entity: "route_stop",
                        from: "any".into(),
                        to: "pending".into(),
                    },
                ));
            }
        };

        let rows_affected = database_connection
            .execute(sql, params![now, route_id.to_string(), sequence as i64])
            .await?;

        if rows_affected == 0 {
            return Err(DbError::NotFound("route_stop"));
        }
        Ok(())
    }

    /// Cierra el recorrido cuando toda parada alcanzó un estado final.
    #[instrument(skip(self))]
    pub async fn finalize_route_if_exhausted(&self, route_id: Uuid) -> Result<bool, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut open_results = database_connection
            .query(
                "SELECT COUNT(*) FROM route_stops
                 WHERE route_id = ?1 AND status IN ('pending','arrived')",
                params![route_id.to_string()],
            )
            .await?;

        let open_count: i64 = match open_results.next().await? {
            Some(data_row) => data_row.get(0)?,
            None => 0,
        };
        if open_count > 0 {
            return Ok(false);
        }

        database_connection
            .execute(
                "UPDATE routes SET status = 'completed', completed_at = ?1,
                 version = version + 1
                 WHERE id = ?2 AND status = 'active'",
                params![fmt_ts(&Utc::now()), route_id.to_string()],
            )
            .await?;

        debug!("🏁 [ROUTES]: Route {} completed.", route_id);
        Ok(true)
    }

    /// Transición de cabecera del recorrido (pending → active, aborts).
    pub async fn transition_route(
        &self,
        route_id: Uuid,
        from_status: RouteStatus,
        to_status: RouteStatus,
        expected_version: i64,
    ) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        let now = fmt_ts(&Utc::now());

        let sql = if to_status == RouteStatus::Active {
            "UPDATE routes SET status = ?1, started_at = ?2, version = version + 1
             WHERE id = ?3 AND status = ?4 AND version = ?5"
        } else {
            "UPDATE routes SET status = ?1, completed_at = ?2, version = version + 1
             WHERE id = ?3 AND status = ?4 AND version = ?5"
        };

        let rows_affected = database_connection
            .execute(
                sql,
                params![
                    to_status.as_str(),
                    now,
                    route_id.to_string(),
                    from_status.as_str(),
                    expected_version
                ],
            )
            .await?;

        if rows_affected == 0 {
            return Err(DbError::StaleVersion);
        }
        Ok(())
    }
}
