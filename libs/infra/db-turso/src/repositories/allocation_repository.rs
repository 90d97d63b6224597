// [libs/infra/db-turso/src/repositories/allocation_repository.rs]
/*!
 * =================================================================
 * APARATO: ALLOCATION REPOSITORY (V5.2 - OFFER WAVE LEDGER)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA DE OFERTAS Y BARRIDO DE EXPIRACIÓN
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. WAVE ATOMICITY: La wave completa de ofertas se inserta en una
 *    transacción única; el worker jamás observa una wave a medias.
 * 2. SWEEP DISCIPLINE: El barrido expira por reloj de pared en una
 *    sola sentencia y retorna las tareas a re-despachar.
 * 3. SINGLE MUTATION: Una oferta muta a lo sumo una vez; los updates
 *    condicionan siempre sobre el estado 'offered'.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use libsql::params;
use tracing::{debug, info, instrument};
use uuid::Uuid;
use veloz_domain_models::{Allocation, ExpiryReason};

use crate::errors::DbError;
use crate::mapping::{fmt_ts, map_allocation_row, ALLOCATION_COLUMNS};
use crate::TursoClient;

/// Repositorio de autoridad única para los artefactos del scheduler.
pub struct AllocationRepository {
    /// Cliente táctico para el enlace con el cluster de Turso (Motor A).
    database_client: TursoClient,
}

impl AllocationRepository {
    /// Inicializa una nueva instancia del repositorio de ofertas.
    #[must_use]
    pub fn new(database_client: TursoClient) -> Self {
        Self { database_client }
    }

    /**
     * Inserta la wave completa de ofertas en una transacción única.
     *
     * # Errors:
     * - `DbError::TransactionError` si el sellado atómico colapsa.
     */
    #[instrument(skip(self, wave_allocations), fields(count = wave_allocations.len()))]
    pub async fn insert_offer_wave(&self, wave_allocations: &[Allocation]) -> Result<(), DbError> {
        if wave_allocations.is_empty() {
            return Ok(());
        }

        let database_connection = self.database_client.get_connection()?;
        let wave_transaction = database_connection
            .transaction()
            .await
            .map_err(|_| DbError::TransactionError)?;

        for allocation in wave_allocations {
            wave_transaction
                .execute(
                    r#"
                    INSERT INTO allocations (
                        id, task_id, worker_id, status, score, distance_km,
                        eta_minutes, wave, offered_at, expires_at, version
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                    "#,
                    params![
                        allocation.id.to_string(),
                        allocation.task_id.to_string(),
                        allocation.worker_id.to_string(),
                        allocation.status.as_str(),
                        allocation.score,
                        allocation.distance_km,
                        allocation.eta_minutes,
                        allocation.wave as i64,
                        fmt_ts(&allocation.offered_at),
                        fmt_ts(&allocation.expires_at),
                        allocation.version
                    ],
                )
                .await?;
        }

        wave_transaction
            .commit()
            .await
            .map_err(|_| DbError::TransactionError)?;

        debug!(
            "📣 [OFFER_WAVE]: {} parallel offers sealed.",
            wave_allocations.len()
        );
        Ok(())
    }

    /**
     * Recupera una oferta individual.
     *
     * # Errors:
     * - `DbError::NotFound("allocation")` si no existe.
     */
    pub async fn fetch_allocation(&self, allocation_id: Uuid) -> Result<Allocation, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query(
                &format!(
                    "SELECT {} FROM allocations WHERE id = ?1",
                    ALLOCATION_COLUMNS
                ),
                params![allocation_id.to_string()],
            )
            .await?;

        match query_results.next().await? {
            Some(data_row) => map_allocation_row(&data_row),
            None => Err(DbError::NotFound("allocation")),
        }
    }

    /// Ofertas vivas dirigidas a un worker (para `GET /me/offers`).
    pub async fn list_open_for_worker(
        &self,
        worker_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Allocation>, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query(
                &format!(
                    "SELECT {} FROM allocations
                     WHERE worker_id = ?1 AND status = 'offered' AND expires_at > ?2
                     ORDER BY offered_at ASC",
                    ALLOCATION_COLUMNS
                ),
                params![worker_id.to_string(), fmt_ts(&now)],
            )
            .await?;

        let mut allocations = Vec::new();
        while let Some(data_row) = query_results.next().await? {
            allocations.push(map_allocation_row(&data_row)?);
        }
        Ok(allocations)
    }

    /// Historial de ofertas de una tarea (diagnóstico del Dispatcher).
    pub async fn list_for_task(&self, task_id: Uuid) -> Result<Vec<Allocation>, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query(
                &format!(
                    "SELECT {} FROM allocations WHERE task_id = ?1 ORDER BY offered_at ASC",
                    ALLOCATION_COLUMNS
                ),
                params![task_id.to_string()],
            )
            .await?;

        let mut allocations = Vec::new();
        while let Some(data_row) = query_results.next().await? {
            allocations.push(map_allocation_row(&data_row)?);
        }
        Ok(allocations)
    }

    /**
     * Registra el rechazo explícito del worker sobre una oferta viva.
     *
     * Retorna `false` si la oferta ya no estaba viva (carrera con el
     * barrido o con el claim): el rechazo tardío es un no-op benigno.
     */
    #[instrument(skip(self))]
    pub async fn mark_rejected(&self, allocation_id: Uuid) -> Result<bool, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let rows_affected = database_connection
            .execute(
                "UPDATE allocations
                 SET status = 'rejected', reason = ?1, responded_at = ?2,
                     version = version + 1
                 WHERE id = ?3 AND status = 'offered'",
                params![
                    ExpiryReason::WorkerRejected.as_str(),
                    fmt_ts(&Utc::now()),
                    allocation_id.to_string()
                ],
            )
            .await?;

        Ok(rows_affected > 0)
    }

    /**
     * Barrido de expiración: toda oferta 'offered' con TTL vencido pasa
     * a 'expired' con razón 'offer_timeout'. Retorna los identificadores
     * de tarea afectados para su re-despacho.
     */
    #[instrument(skip(self))]
    pub async fn sweep_expired_offers(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<(Uuid, Uuid)>, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let sweep_transaction = database_connection
            .transaction()
            .await
            .map_err(|_| DbError::TransactionError)?;

        let mut stale_results = sweep_transaction
            .query(
                "SELECT id, task_id FROM allocations
                 WHERE status = 'offered' AND expires_at <= ?1",
                params![fmt_ts(&now)],
            )
            .await?;

        let mut swept: Vec<(Uuid, Uuid)> = Vec::new();
        while let Some(data_row) = stale_results.next().await? {
            let allocation_raw: String = data_row.get(0)?;
            let task_raw: String = data_row.get(1)?;
            let allocation_id = Uuid::parse_str(&allocation_raw)
                .map_err(|fault| DbError::MappingError(fault.to_string()))?;
            let task_id = Uuid::parse_str(&task_raw)
                .map_err(|fault| DbError::MappingError(fault.to_string()))?;
            swept.push((allocation_id, task_id));
        }

        if swept.is_empty() {
            sweep_transaction
                .commit()
                .await
                .map_err(|_| DbError::TransactionError)?;
            return Ok(swept);
        }

        sweep_transaction
            .execute(
                "UPDATE allocations
                 SET status = 'expired', reason = ?1, version = version + 1
                 WHERE status = 'offered' AND expires_at <= ?2",
                params![ExpiryReason::OfferTimeout.as_str(), fmt_ts(&now)],
            )
            .await?;

        sweep_transaction
            .commit()
            .await
            .map_err(|_| DbError::TransactionError)?;

        info!("⏱️ [SWEEPER]: {} offers expired by wall clock.", swept.len());
        Ok(swept)
    }

    /// Conteo de ofertas vivas de una tarea (decisión de re-despacho).
    pub async fn count_open_for_task(
        &self,
        task_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<i64, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query(
                "SELECT COUNT(*) FROM allocations
                 WHERE task_id = ?1 AND status = 'offered' AND expires_at > ?2",
                params![task_id.to_string(), fmt_ts(&now)],
            )
            .await?;

        match query_results.next().await? {
            Some(data_row) => Ok(data_row.get::<i64>(0)?),
            None => Ok(0),
        }
    }
}
