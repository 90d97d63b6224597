// [libs/infra/db-turso/src/repositories/worker_repository.rs]
/*!
 * =================================================================
 * APARATO: WORKER AGGREGATE REPOSITORY (V5.3 - SWARM REGISTRY)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA DEL ENJAMBRE Y CONSULTA ESPACIAL
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. MONOTONIC LOCATION: La ingesta de ubicación descarta en SQL toda
 *    marca temporal no-posterior a la almacenada; la idempotencia es
 *    ley del motor, no cortesía del llamador.
 * 2. COMPANION SPATIAL READ: Pre-filtro por celdas de retícula (o caja
 *    delimitadora si la cobertura excede el umbral) + refinamiento
 *    Haversine exacto con orden ascendente por distancia.
 * 3. OPTIMISTIC DISCIPLINE: Toda mutación es WHERE id AND version.
 *
 * # Mathematical Proof (Read Freshness):
 * La celda se sella en la MISMA sentencia que la ubicación; cualquier
 * lectura posterior al commit observa la celda nueva. La cota de
 * reflejo de 2 segundos del contrato se satisface por construcción.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use libsql::params;
use tracing::{debug, instrument};
use uuid::Uuid;
use veloz_core_geo::bounds::BoundingBox;
use veloz_core_geo::grid::{cell_for_point, covering_cells};
use veloz_core_geo::point::{haversine_distance_km, GeoPoint};
use veloz_domain_models::{Availability, Worker, WorkerLifecycle, WorkerType};

use crate::errors::{is_unique_violation, DbError};
use crate::mapping::{fmt_ts, map_worker_row, WORKER_COLUMNS};
use crate::TursoClient;

/// Umbral de celdas por encima del cual la consulta degrada a caja plana.
const GRID_CELL_LIST_CEILING: usize = 256;

/// Estados de tarea que consumen capacidad del worker.
pub(crate) const CAPACITY_STATUSES_SQL: &str = "('assigned','accepted','in_progress')";

/// Candidato espacial hidratado con su distancia exacta y carga vigente.
#[derive(Debug, Clone)]
pub struct NearbyWorker {
    /// Entidad completa del worker.
    pub worker: Worker,
    /// Distancia exacta al centro de consulta (km, 3 decimales).
    pub distance_km: f64,
    /// Tareas no-terminales en curso al momento de la consulta.
    pub current_load: i64,
}

/// Filtros opcionales del listado administrativo de workers.
#[derive(Debug, Clone, Default)]
pub struct WorkerListFilter {
    /// Ciclo de vida exigido.
    pub lifecycle: Option<WorkerLifecycle>,
    /// Disponibilidad exigida.
    pub availability: Option<Availability>,
    /// Especialidad exigida.
    pub worker_type: Option<WorkerType>,
}

/// Rollup analítico de la flota para el Operator API.
#[derive(Debug, Clone)]
pub struct FleetAnalytics {
    /// Conteo de workers por ciclo de vida.
    pub counts_by_lifecycle: Vec<(String, i64)>,
    /// Conteo de workers por disponibilidad.
    pub counts_by_availability: Vec<(String, i64)>,
    /// Calificación media de las unidades activas.
    pub average_rating: Option<f64>,
    /// Total de unidades activas.
    pub active_count: i64,
}

/// Repositorio de autoridad única para el agregado Worker.
pub struct WorkerRepository {
    /// Cliente táctico para el enlace con el cluster de Turso (Motor A).
    database_client: TursoClient,
}

impl WorkerRepository {
    /// Inicializa una nueva instancia del repositorio del enjambre.
    #[must_use]
    pub fn new(database_client: TursoClient) -> Self {
        Self { database_client }
    }

    /**
     * Registra una nueva unidad de campo.
     *
     * # Errors:
     * - `DbError::Duplicate("worker")`: el par (tenant, user) ya existe.
     */
    #[instrument(skip(self, worker), fields(worker_id = %worker.id))]
    pub async fn insert_worker(&self, worker: &Worker) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        let geo_cell = worker.location.as_ref().map(cell_for_point);
        let vehicle_json = worker
            .vehicle
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|fault| DbError::MappingError(fault.to_string()))?;

        let insert_result = database_connection
            .execute(
                r#"
                INSERT INTO workers (
                    id, tenant_id, user_id, worker_type, lifecycle, availability,
                    contact_phone, latitude, longitude, geo_cell, last_location_at,
                    rating, total_tasks, completed_tasks, max_concurrent_tasks,
                    zones_json, skills_json, vehicle_json, payout_method,
                    payout_target, version, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                          ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23)
                "#,
                params![
                    worker.id.to_string(),
                    worker.tenant_id.to_string(),
                    worker.user_id.to_string(),
                    worker.worker_type.as_str(),
                    worker.lifecycle.as_str(),
                    worker.availability.as_str(),
                    worker.contact_phone.clone(),
                    worker.location.as_ref().map(|point| point.latitude),
                    worker.location.as_ref().map(|point| point.longitude),
                    geo_cell,
                    worker.last_location_at.map(|instant| fmt_ts(&instant)),
                    worker.rating,
                    worker.total_tasks,
                    worker.completed_tasks,
                    worker.max_concurrent_tasks,
                    serde_json::to_string(&worker.zones)
                        .map_err(|fault| DbError::MappingError(fault.to_string()))?,
                    serde_json::to_string(&worker.skills)
                        .map_err(|fault| DbError::MappingError(fault.to_string()))?,
                    vehicle_json,
                    worker.payout_method.as_str(),
                    worker.payout_target.clone(),
                    worker.version,
                    fmt_ts(&worker.created_at),
                    fmt_ts(&worker.updated_at)
                ],
            )
            .await;

        match insert_result {
            Ok(_) => {
                debug!("🧑‍🔧 [REGISTRY]: Worker {} enrolled.", worker.id);
                Ok(())
            }
            Err(fault) if is_unique_violation(&fault) => Err(DbError::Duplicate("worker")),
            Err(fault) => Err(fault.into()),
        }
    }

    /**
     * Recupera la entidad completa de un worker.
     *
     * # Errors:
     * - `DbError::NotFound("worker")` si el identificador no existe.
     */
    pub async fn fetch_worker(&self, worker_id: Uuid) -> Result<Worker, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query(
                &format!("SELECT {} FROM workers WHERE id = ?1", WORKER_COLUMNS),
                params![worker_id.to_string()],
            )
            .await?;

        match query_results.next().await? {
            Some(data_row) => map_worker_row(&data_row),
            None => Err(DbError::NotFound("worker")),
        }
    }

    /// Listado administrativo con filtros opcionales, acotado por tenant.
    pub async fn list_for_tenant(
        &self,
        tenant_id: Uuid,
        filter: &WorkerListFilter,
        limit: i64,
    ) -> Result<Vec<Worker>, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut sql = format!(
            "SELECT {} FROM workers WHERE tenant_id = ?1",
            WORKER_COLUMNS
        );
        if let Some(lifecycle) = filter.lifecycle {
            sql.push_str(&format!(" AND lifecycle = '{}'", lifecycle.as_str()));
        }
        if let Some(availability) = filter.availability {
            sql.push_str(&format!(" AND availability = '{}'", availability.as_str()));
        }
        if let Some(worker_type) = filter.worker_type {
            sql.push_str(&format!(" AND worker_type = '{}'", worker_type.as_str()));
        }
        sql.push_str(&format!(" ORDER BY created_at DESC LIMIT {}", limit.max(1)));

        let mut query_results = database_connection
            .query(&sql, params![tenant_id.to_string()])
            .await?;

        let mut workers = Vec::new();
        while let Some(data_row) = query_results.next().await? {
            workers.push(map_worker_row(&data_row)?);
        }
        Ok(workers)
    }

    /**
     * Muta el ciclo de vida bajo disciplina optimista.
     *
     * # Errors:
     * - `DbError::StaleVersion` si la versión esperada ya no es vigente.
     */
    #[instrument(skip(self))]
    pub async fn update_lifecycle(
        &self,
        worker_id: Uuid,
        lifecycle: WorkerLifecycle,
        expected_version: i64,
    ) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        let rows_affected = database_connection
            .execute(
                "UPDATE workers SET lifecycle = ?1, updated_at = ?2, version = version + 1
                 WHERE id = ?3 AND version = ?4",
                params![
                    lifecycle.as_str(),
                    fmt_ts(&Utc::now()),
                    worker_id.to_string(),
                    expected_version
                ],
            )
            .await?;

        self.interpret_optimistic_outcome(worker_id, rows_affected).await
    }

    /**
     * Muta la disponibilidad bajo disciplina optimista.
     *
     * # Errors:
     * - `DbError::StaleVersion` si la versión esperada ya no es vigente.
     */
    #[instrument(skip(self))]
    pub async fn update_availability(
        &self,
        worker_id: Uuid,
        availability: Availability,
        expected_version: i64,
    ) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        let rows_affected = database_connection
            .execute(
                "UPDATE workers SET availability = ?1, updated_at = ?2, version = version + 1
                 WHERE id = ?3 AND version = ?4",
                params![
                    availability.as_str(),
                    fmt_ts(&Utc::now()),
                    worker_id.to_string(),
                    expected_version
                ],
            )
            .await?;

        self.interpret_optimistic_outcome(worker_id, rows_affected).await
    }

    /**
     * Ingesta idempotente de ubicación con guardia monotónica en SQL.
     *
     * Retorna `true` si la ubicación fue aplicada, `false` si la marca
     * temporal no supera a la almacenada (no-op contractual).
     */
    #[instrument(skip(self, point))]
    pub async fn record_location(
        &self,
        worker_id: Uuid,
        point: GeoPoint,
        reported_at: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let rows_affected = database_connection
            .execute(
                "UPDATE workers
                 SET latitude = ?1, longitude = ?2, geo_cell = ?3,
                     last_location_at = ?4, updated_at = ?5, version = version + 1
                 WHERE id = ?6
                   AND (last_location_at IS NULL OR last_location_at < ?4)",
                params![
                    point.latitude,
                    point.longitude,
                    cell_for_point(&point),
                    fmt_ts(&reported_at),
                    fmt_ts(&Utc::now()),
                    worker_id.to_string()
                ],
            )
            .await?;

        if rows_affected > 0 {
            return Ok(true);
        }

        // Distinguir el no-op idempotente del worker inexistente.
        if self.worker_exists(&database_connection, worker_id).await? {
            debug!("📍 [LOCATION]: Stale ping for {} discarded.", worker_id);
            Ok(false)
        } else {
            Err(DbError::NotFound("worker"))
        }
    }

    /// Sella la calificación computada upstream (EWMA externa al motor).
    pub async fn store_rating(
        &self,
        worker_id: Uuid,
        rating: f64,
        expected_version: i64,
    ) -> Result<(), DbError> {
        Worker::validate_rating(rating)?;
        let database_connection = self.database_client.get_connection()?;

        let rows_affected = database_connection
            .execute(
                "UPDATE workers SET rating = ?1, updated_at = ?2, version = version + 1
                 WHERE id = ?3 AND version = ?4",
                params![
                    rating,
                    fmt_ts(&Utc::now()),
                    worker_id.to_string(),
                    expected_version
                ],
            )
            .await?;

        self.interpret_optimistic_outcome(worker_id, rows_affected).await
    }

    /// Carga no-terminal vigente del worker (tareas que consumen capacidad).
    pub async fn count_non_terminal_tasks(&self, worker_id: Uuid) -> Result<i64, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query(
                &format!(
                    "SELECT COUNT(*) FROM tasks
                     WHERE assigned_worker_id = ?1 AND status IN {}",
                    CAPACITY_STATUSES_SQL
                ),
                params![worker_id.to_string()],
            )
            .await?;

        match query_results.next().await? {
            Some(data_row) => Ok(data_row.get::<i64>(0)?),
            None => Ok(0),
        }
    }

    /**
     * Consulta espacial soberana: candidatos elegibles dentro del radio,
     * ordenados por distancia exacta ascendente.
     *
     * El pre-filtro usa celdas de retícula cuando la cobertura es
     * compacta y degrada a caja delimitadora plana cuando no lo es. El
     * veredicto final es siempre Haversine contra el radio solicitado.
     *
     * # Performance:
     * O(pre-filtro) en SQL indexado + O(n log n) por el refinamiento.
     */
    #[instrument(skip(self, center), fields(radius_km = radius_km))]
    pub async fn find_nearby_candidates(
        &self,
        tenant_id: Uuid,
        center: &GeoPoint,
        radius_km: f64,
        required_worker_type: WorkerType,
        limit: usize,
    ) -> Result<Vec<NearbyWorker>, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let envelope = BoundingBox::around(center, radius_km)
            .map_err(|fault| DbError::MappingError(fault.to_string()))?;
        let covering = covering_cells(center, radius_km)
            .map_err(|fault| DbError::MappingError(fault.to_string()))?;

        // Pre-filtro espacial: celdas indexadas o caja plana según cobertura.
        let spatial_clause = if covering.len() <= GRID_CELL_LIST_CEILING {
            let quoted_cells: Vec<String> =
                covering.iter().map(|cell| format!("'{}'", cell)).collect();
            format!("geo_cell IN ({})", quoted_cells.join(", "))
        } else {
            format!(
                "latitude BETWEEN {} AND {} AND longitude BETWEEN {} AND {}",
                envelope.min_latitude,
                envelope.max_latitude,
                envelope.min_longitude,
                envelope.max_longitude
            )
        };

        let candidate_sql = format!(
            r#"
            SELECT {columns}, COALESCE(live_load.active_count, 0) AS current_load
            FROM workers
            LEFT JOIN (
                SELECT assigned_worker_id AS load_worker_id, COUNT(*) AS active_count
                FROM tasks
                WHERE status IN {capacity_statuses}
                GROUP BY assigned_worker_id
            ) AS live_load ON live_load.load_worker_id = workers.id
            WHERE tenant_id = ?1
              AND lifecycle = 'active'
              AND availability IN ('online','busy')
              AND worker_type = ?2
              AND latitude IS NOT NULL
              AND {spatial_clause}
              AND COALESCE(live_load.active_count, 0) < max_concurrent_tasks
            "#,
            columns = WORKER_COLUMNS,
            capacity_statuses = CAPACITY_STATUSES_SQL,
            spatial_clause = spatial_clause,
        );

        let mut query_results = database_connection
            .query(
                &candidate_sql,
                params![tenant_id.to_string(), required_worker_type.as_str()],
            )
            .await?;

        let mut nearby = Vec::new();
        while let Some(data_row) = query_results.next().await? {
            let worker = map_worker_row(&data_row)?;
            let current_load: i64 = data_row.get(23)?;

            let Some(worker_point) = worker.location else {
                continue;
            };

            // Veredicto exacto: la caja y las celdas solo pre-filtran.
            let exact_distance_km = haversine_distance_km(center, &worker_point);
            if exact_distance_km <= radius_km {
                nearby.push(NearbyWorker {
                    worker,
                    distance_km: exact_distance_km,
                    current_load,
                });
            }
        }

        nearby.sort_by(|left, right| {
            left.distance_km
                .partial_cmp(&right.distance_km)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| left.worker.id.cmp(&right.worker.id))
        });
        nearby.truncate(limit.max(1));

        debug!(
            "🛰️ [GEO_INDEX]: {} candidates within {} km.",
            nearby.len(),
            radius_km
        );
        Ok(nearby)
    }

    /// Rollup de flota del tenant: conteos por ciclo de vida y
    /// disponibilidad, más la calificación media de las unidades activas.
    pub async fn fleet_rollup(&self, tenant_id: Uuid) -> Result<FleetAnalytics, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut lifecycle_results = database_connection
            .query(
                "SELECT lifecycle, COUNT(*) FROM workers
                 WHERE tenant_id = ?1 GROUP BY lifecycle",
                params![tenant_id.to_string()],
            )
            .await?;
        let mut counts_by_lifecycle: Vec<(String, i64)> = Vec::new();
        while let Some(data_row) = lifecycle_results.next().await? {
            counts_by_lifecycle.push((data_row.get(0)?, data_row.get(1)?));
        }

        let mut availability_results = database_connection
            .query(
                "SELECT availability, COUNT(*) FROM workers
                 WHERE tenant_id = ?1 GROUP BY availability",
                params![tenant_id.to_string()],
            )
            .await?;
        let mut counts_by_availability: Vec<(String, i64)> = Vec::new();
        while let Some(data_row) = availability_results.next().await? {
            counts_by_availability.push((data_row.get(0)?, data_row.get(1)?));
        }

        let mut rating_results = database_connection
            .query(
                "SELECT AVG(rating), COUNT(*) FROM workers
                 WHERE tenant_id = ?1 AND lifecycle = 'active'",
                params![tenant_id.to_string()],
            )
            .await?;
        let (average_rating, active_count) = match rating_results.next().await? {
            Some(data_row) => (
                data_row.get::<Option<f64>>(0)?,
                data_row.get::<i64>(1)?,
            ),
            None => (None, 0),
        };

        Ok(FleetAnalytics {
            counts_by_lifecycle,
            counts_by_availability,
            average_rating,
            active_count,
        })
    }

    // --- GUARDIAS INTERNAS ---

    async fn worker_exists(
        &self,
        database_connection: &libsql::Connection,
        worker_id: Uuid,
    ) -> Result<bool, DbError> {
        let mut query_results = database_connection
            .query(
                "SELECT 1 FROM workers WHERE id = ?1",
                params![worker_id.to_string()],
            )
            .await?;
        Ok(query_results.next().await?.is_some())
    }

    async fn interpret_optimistic_outcome(
        &self,
        worker_id: Uuid,
        rows_affected: u64,
    ) -> Result<(), DbError> {
        if rows_affected > 0 {
            return Ok(());
        }
        let database_connection = self.database_client.get_connection()?;
        if self.worker_exists(&database_connection, worker_id).await? {
            Err(DbError::StaleVersion)
        } else {
            Err(DbError::NotFound("worker"))
        }
    }
}
