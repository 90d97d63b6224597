// [libs/infra/db-turso/src/repositories/task_repository.rs]
/*!
 * =================================================================
 * APARATO: TASK AGGREGATE REPOSITORY (V5.4 - LIFECYCLE GUARD)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA DEL CICLO DE VIDA DE TAREAS DE CAMPO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SEMANTIC ERROR HANDLING: Las transiciones ilegales se rechazan en
 *    la puerta con el catálogo de dominio; jamás se reintentan.
 * 2. PROOF HYDRATION: Las evidencias viven en tabla propia append-only
 *    y se hidratan junto a la entidad en las lecturas completas.
 * 3. OPTIMISTIC DISCIPLINE: Toda mutación es WHERE id AND version.
 * =================================================================
 */

use chrono::Utc;
use libsql::params;
use tracing::{debug, instrument};
use uuid::Uuid;
use veloz_domain_models::{Task, TaskStatus, TaskType};

use crate::errors::DbError;
use crate::mapping::{fmt_ts, map_proof_row, map_task_row, PROOF_COLUMNS, TASK_COLUMNS};
use crate::TursoClient;

/// Filtros del listado de tareas del Operator API.
#[derive(Debug, Clone, Default)]
pub struct TaskListFilter {
    /// Estados admitidos (vacío = todos).
    pub statuses: Vec<TaskStatus>,
    /// Tipos admitidos (vacío = todos).
    pub task_types: Vec<TaskType>,
    /// Worker asignado exigido.
    pub worker_id: Option<Uuid>,
    /// Referencia de pedido upstream exigida.
    pub order_reference: Option<String>,
    /// Solo tareas escaladas tras agotar las waves.
    pub escalated_only: bool,
    /// Ventana de programación [desde, hasta].
    pub scheduled_between: Option<(chrono::DateTime<Utc>, chrono::DateTime<Utc>)>,
}

/// Rollup analítico de tareas para el Operator API.
#[derive(Debug, Clone)]
pub struct TaskAnalytics {
    /// Conteo de tareas por estado dentro de la ventana.
    pub counts_by_status: Vec<(String, i64)>,
    /// Total de tareas creadas en la ventana.
    pub total_tasks: i64,
    /// Fracción de tareas completadas sobre el total.
    pub completion_rate: f64,
    /// Promedio de duración real (minutos) de los cierres.
    pub average_duration_minutes: Option<f64>,
    /// Promedio de distancia real (km) de los cierres.
    pub average_distance_km: Option<f64>,
}

/// Repositorio de autoridad única para el agregado Task.
pub struct TaskRepository {
    /// Cliente táctico para el enlace con el cluster de Turso (Motor A).
    database_client: TursoClient,
}

impl TaskRepository {
    /// Inicializa una nueva instancia del repositorio de tareas.
    #[must_use]
    pub fn new(database_client: TursoClient) -> Self {
        Self { database_client }
    }

    /// Persiste una tarea recién validada con status 'pending'.
    #[instrument(skip(self, task), fields(task_id = %task.id))]
    pub async fn insert_task(&self, task: &Task) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        let required_proofs: Vec<&'static str> = task
            .required_proof_types
            .iter()
            .map(|proof_type| proof_type.as_str())
            .collect();

        database_connection
            .execute(
                r#"
                INSERT INTO tasks (
                    id, tenant_id, task_type, status, priority, assigned_worker_id,
                    required_worker_type, required_skills_json, zone_id,
                    pickup_latitude, pickup_longitude, pickup_address,
                    delivery_latitude, delivery_longitude, delivery_address,
                    scheduled_at, deadline_at, estimated_duration_minutes,
                    estimated_distance_km, base_pay, bonus_pay, tip_amount,
                    currency, required_proofs_json, order_reference, metadata_json,
                    version, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                          ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24,
                          ?25, ?26, ?27, ?28, ?29)
                "#,
                params![
                    task.id.to_string(),
                    task.tenant_id.to_string(),
                    task.task_type.as_str(),
                    task.status.as_str(),
                    task.priority as i64,
                    task.assigned_worker_id.map(|id| id.to_string()),
                    task.required_worker_type.as_str(),
                    serde_json::to_string(&task.required_skills)
                        .map_err(|fault| DbError::MappingError(fault.to_string()))?,
                    task.zone_id.clone(),
                    task.pickup.as_ref().map(|site| site.point.latitude),
                    task.pickup.as_ref().map(|site| site.point.longitude),
                    task.pickup.as_ref().map(|site| site.address.clone()),
                    task.delivery.as_ref().map(|site| site.point.latitude),
                    task.delivery.as_ref().map(|site| site.point.longitude),
                    task.delivery.as_ref().map(|site| site.address.clone()),
                    task.scheduled_at.map(|instant| fmt_ts(&instant)),
                    task.deadline_at.map(|instant| fmt_ts(&instant)),
                    task.estimated_duration_minutes,
                    task.estimated_distance_km,
                    task.base_pay.to_string(),
                    task.bonus_pay.to_string(),
                    task.tip_amount.to_string(),
                    task.currency.clone(),
                    serde_json::to_string(&required_proofs)
                        .map_err(|fault| DbError::MappingError(fault.to_string()))?,
                    task.order_reference.clone(),
                    serde_json::to_string(&task.metadata)
                        .map_err(|fault| DbError::MappingError(fault.to_string()))?,
                    task.version,
                    fmt_ts(&task.created_at),
                    fmt_ts(&task.updated_at)
                ],
            )
            .await?;

        debug!("📦 [TASKS]: Task {} persisted as pending.", task.id);
        Ok(())
    }

    /**
     * Recupera la tarea con sus evidencias hidratadas.
     *
     * # Errors:
     * - `DbError::NotFound("task")` si el identificador no existe.
     */
    pub async fn fetch_task(&self, task_id: Uuid) -> Result<Task, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query(
                &format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS),
                params![task_id.to_string()],
            )
            .await?;

        let Some(data_row) = query_results.next().await? else {
            return Err(DbError::NotFound("task"));
        };
        let mut task = map_task_row(&data_row)?;

        let mut proof_results = database_connection
            .query(
                &format!(
                    "SELECT {} FROM task_proofs WHERE task_id = ?1 ORDER BY attached_at ASC",
                    PROOF_COLUMNS
                ),
                params![task_id.to_string()],
            )
            .await?;
        while let Some(proof_row) = proof_results.next().await? {
            task.proofs.push(map_proof_row(&proof_row)?);
        }

        Ok(task)
    }

    /// Listado del Operator API con filtros compuestos, acotado por tenant.
    pub async fn list_for_tenant(
        &self,
        tenant_id: Uuid,
        filter: &TaskListFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Task>, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut sql = format!("SELECT {} FROM tasks WHERE tenant_id = ?1", TASK_COLUMNS);

        if !filter.statuses.is_empty() {
            let quoted: Vec<String> = filter
                .statuses
                .iter()
                .map(|status| format!("'{}'", status.as_str()))
                .collect();
            sql.push_str(&format!(" AND status IN ({})", quoted.join(", ")));
        }
        if !filter.task_types.is_empty() {
            let quoted: Vec<String> = filter
                .task_types
                .iter()
                .map(|task_type| format!("'{}'", task_type.as_str()))
                .collect();
            sql.push_str(&format!(" AND task_type IN ({})", quoted.join(", ")));
        }
        if let Some(worker_id) = filter.worker_id {
            sql.push_str(&format!(" AND assigned_worker_id = '{}'", worker_id));
        }
        if filter.order_reference.is_some() {
            // La referencia llega del partner: viaja como parámetro, no inline.
            sql.push_str(" AND order_reference = ?2");
        }
        if filter.escalated_only {
            sql.push_str(" AND escalated_at IS NOT NULL AND status = 'pending'");
        }
        if let Some((window_start, window_end)) = filter.scheduled_between {
            sql.push_str(&format!(
                " AND scheduled_at >= '{}' AND scheduled_at <= '{}'",
                fmt_ts(&window_start),
                fmt_ts(&window_end)
            ));
        }

        sql.push_str(&format!(
            " ORDER BY created_at DESC LIMIT {} OFFSET {}",
            limit.max(1),
            offset.max(0)
        ));

        let mut query_results = match &filter.order_reference {
            Some(order_reference) => {
                database_connection
                    .query(&sql, params![tenant_id.to_string(), order_reference.clone()])
                    .await?
            }
            None => {
                database_connection
                    .query(&sql, params![tenant_id.to_string()])
                    .await?
            }
        };

        let mut tasks = Vec::new();
        while let Some(data_row) = query_results.next().await? {
            tasks.push(map_task_row(&data_row)?);
        }
        Ok(tasks)
    }

    /**
     * Transición optimista de estado con validación de máquina legal.
     *
     * # Errors:
     * - `DomainError::InvalidTransition` si el salto no es legal.
     * - `DbError::StaleVersion` si la versión esperada caducó.
     */
    #[instrument(skip(self))]
    pub async fn transition_status(
        &self,
        task_id: Uuid,
        from_status: TaskStatus,
        to_status: TaskStatus,
        expected_version: i64,
    ) -> Result<(), DbError> {
        from_status.ensure_transition(to_status)?;

        let database_connection = self.database_client.get_connection()?;
        let now = fmt_ts(&Utc::now());

        // started_at se sella al entrar en ejecución.
        let sql = if to_status == TaskStatus::InProgress {
            "UPDATE tasks SET status = ?1, started_at = ?2, updated_at = ?2,
             version = version + 1
             WHERE id = ?3 AND status = ?4 AND version = ?5"
        } else {
            "UPDATE tasks SET status = ?1, updated_at = ?2, version = version + 1
             WHERE id = ?3 AND status = ?4 AND version = ?5"
        };

        let rows_affected = database_connection
            .execute(
                sql,
                params![
                    to_status.as_str(),
                    now,
                    task_id.to_string(),
                    from_status.as_str(),
                    expected_version
                ],
            )
            .await?;

        self.interpret_optimistic_outcome(task_id, rows_affected).await
    }

    /// Marca el escalamiento tras agotar las waves (status queda 'pending').
    pub async fn mark_escalated(&self, task_id: Uuid, waves_spent: i32) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        database_connection
            .execute(
                "UPDATE tasks SET escalated_at = ?1, dispatch_waves = ?2,
                 updated_at = ?1, version = version + 1
                 WHERE id = ?3 AND status = 'pending'",
                params![fmt_ts(&Utc::now()), waves_spent as i64, task_id.to_string()],
            )
            .await?;
        Ok(())
    }

    /// Sella el contador de waves gastadas por el Dispatcher.
    pub async fn record_dispatch_wave(&self, task_id: Uuid, wave: i32) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        database_connection
            .execute(
                "UPDATE tasks SET dispatch_waves = ?1, updated_at = ?2
                 WHERE id = ?3",
                params![wave as i64, fmt_ts(&Utc::now()), task_id.to_string()],
            )
            .await?;
        Ok(())
    }

    /**
     * Rollup analítico del tenant: conteos por estado, tasa de cierre y
     * promedios de duración y distancia reales sobre la ventana dada.
     */
    pub async fn analytics_rollup(
        &self,
        tenant_id: Uuid,
        window_start: chrono::DateTime<Utc>,
        window_end: chrono::DateTime<Utc>,
    ) -> Result<TaskAnalytics, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut count_results = database_connection
            .query(
                "SELECT status, COUNT(*) FROM tasks
                 WHERE tenant_id = ?1 AND created_at >= ?2 AND created_at <= ?3
                 GROUP BY status",
                params![
                    tenant_id.to_string(),
                    fmt_ts(&window_start),
                    fmt_ts(&window_end)
                ],
            )
            .await?;

        let mut counts_by_status: Vec<(String, i64)> = Vec::new();
        let mut total_tasks: i64 = 0;
        let mut completed_tasks: i64 = 0;
        while let Some(data_row) = count_results.next().await? {
            let status: String = data_row.get(0)?;
            let count: i64 = data_row.get(1)?;
            total_tasks += count;
            if status == "completed" {
                completed_tasks = count;
            }
            counts_by_status.push((status, count));
        }

        let mut average_results = database_connection
            .query(
                "SELECT AVG(actual_duration_minutes), AVG(actual_distance_km)
                 FROM tasks
                 WHERE tenant_id = ?1 AND status = 'completed'
                   AND completed_at >= ?2 AND completed_at <= ?3",
                params![
                    tenant_id.to_string(),
                    fmt_ts(&window_start),
                    fmt_ts(&window_end)
                ],
            )
            .await?;

        let (average_duration_minutes, average_distance_km) =
            match average_results.next().await? {
                Some(data_row) => (
                    data_row.get::<Option<f64>>(0)?,
                    data_row.get::<Option<f64>>(1)?,
                ),
                None => (None, None),
            };

        let completion_rate = if total_tasks > 0 {
            completed_tasks as f64 / total_tasks as f64
        } else {
            0.0
        };

        Ok(TaskAnalytics {
            counts_by_status,
            total_tasks,
            completion_rate,
            average_duration_minutes,
            average_distance_km,
        })
    }

    // --- GUARDIAS INTERNAS ---

    async fn interpret_optimistic_outcome(
        &self,
        task_id: Uuid,
        rows_affected: u64,
    ) -> Result<(), DbError> {
        if rows_affected > 0 {
            return Ok(());
        }

        let database_connection = self.database_client.get_connection()?;
        let mut query_results = database_connection
            .query(
                "SELECT 1 FROM tasks WHERE id = ?1",
                params![task_id.to_string()],
            )
            .await?;

        if query_results.next().await?.is_some() {
            Err(DbError::StaleVersion)
        } else {
            Err(DbError::NotFound("task"))
        }
    }
}
