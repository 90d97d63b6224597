// [libs/infra/db-turso/src/unit_of_work.rs]
/*!
 * =================================================================
 * APARATO: UNIT OF WORK PRIMITIVES (V5.6 - ATOMIC SEMAPHORE)
 * CLASIFICACIÓN: INFRASTRUCTURE CORE (ESTRATO L3)
 * RESPONSABILIDAD: SECUENCIAS MULTI-TABLA COMO OPERACIONES NOMINALES
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. ATOMIC CLAIM: 'claim_task_for_worker' es el semáforo ACID del
 *    sistema entero; toda carrera de aceptación se resuelve aquí y en
 *    ningún otro estrato. 'accept_offer_and_confirm' compone claim y
 *    confirmación del worker en UNA transacción. El índice único
 *    parcial actúa de segunda línea de defensa a nivel de motor.
 * 2. SETTLEMENT ATOMICITY: El cierre de tarea y sus líneas de ganancia
 *    comparten transacción; un lector que observa 'completed' observa
 *    también sus ganancias.
 * 3. RELEASE SYMMETRY: Completar un payout sella sus líneas; fallarlo
 *    las libera. Ambos desenlaces son idempotentes por re-entrega.
 *
 * # Mathematical Proof (Transactional Exclusivity):
 * SQLite serializa escritores: dentro de la transacción del claim, la
 * relectura del estado 'pending' es veraz hasta el commit. Dos claims
 * concurrentes sobre la misma tarea observan secuencialmente; el
 * segundo encuentra 'assigned' y colapsa en TASK_ALREADY_ASSIGNED.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use libsql::params;
use rust_decimal::Decimal;
use tracing::{debug, info, instrument};
use uuid::Uuid;
use veloz_domain_ledger::{EarningDraft, PayoutBatchPlan};
use veloz_domain_models::{DomainError, Payout, PayoutMethod, PayoutStatus, TaskProof, TaskStatus};

use crate::errors::{is_unique_violation, DbError};
use crate::mapping::fmt_ts;
use crate::TursoClient;

/// Estados de tarea que consumen capacidad (forma SQL compartida).
const CAPACITY_STATUSES_SQL: &str = "('assigned','accepted','in_progress')";

/// Desenlace del claim atómico.
#[derive(Debug, Clone)]
pub struct ClaimOutcome {
    /// Tarea reclamada.
    pub task_id: Uuid,
    /// Worker ganador de la carrera.
    pub worker_id: Uuid,
    /// Carga no-terminal del worker DESPUÉS del claim.
    pub worker_load_after: i64,
    /// Tareas cuyas ofertas a este worker fueron preemptadas por tope
    /// de capacidad; el Dispatcher debe re-despacharlas.
    pub preempted_task_ids: Vec<Uuid>,
}

/// Fachada de operaciones transaccionales multi-agregado.
pub struct UnitOfWork {
    /// Cliente táctico para el enlace con el cluster de Turso (Motor A).
    database_client: TursoClient,
}

impl UnitOfWork {
    /// Inicializa la fachada transaccional.
    #[must_use]
    pub fn new(database_client: TursoClient) -> Self {
        Self { database_client }
    }

    /**
     * PRIMITIVA SUPREMA: reclamación atómica de una tarea para un worker.
     *
     * En una transacción única: verifica 'pending', verifica elegibilidad
     * y capacidad del worker, acepta la asignación elegida, expira a las
     * hermanas con razón 'lost_race', sella el tránsito de la tarea y
     * preempta (capacity_reached) las demás ofertas del worker si el
     * claim agotó su capacidad.
     *
     * # Errors:
     * - `DbError::TaskAlreadyAssigned` (wire: too_late) si la carrera ya
     *   fue ganada o la oferta ya no está viva.
     * - `DbError::CapacityReached` si el worker está al tope.
     * - `DbError::WorkerNotAvailable` si el worker no es elegible.
     */
    #[instrument(skip(self), fields(task_id = %task_id, worker_id = %worker_id))]
    pub async fn claim_task_for_worker(
        &self,
        task_id: Uuid,
        worker_id: Uuid,
        allocation_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ClaimOutcome, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let claim_transaction = database_connection
            .transaction()
            .await
            .map_err(|_| DbError::TransactionError)?;

        let outcome =
            execute_claim_phases(&claim_transaction, task_id, worker_id, allocation_id, now)
                .await?;

        claim_transaction
            .commit()
            .await
            .map_err(|_| DbError::TransactionError)?;

        info!(
            "🤝 [CLAIM]: Task {} sealed for worker {} (load {}).",
            task_id, worker_id, outcome.worker_load_after
        );
        Ok(outcome)
    }

    /**
     * Aceptación atómica del worker: el claim completo MÁS la
     * confirmación (assigned -> accepted) comparten UNA transacción.
     *
     * Es la vía del Worker API: un corte de enlace o un deadline vencido
     * entre reclamar y confirmar jamás deja la tarea varada en
     * 'assigned' sin transición legal hacia adelante.
     *
     * # Errors:
     * Las mismas clases del claim; cualquier colapso revierte también
     * la reclamación.
     */
    #[instrument(skip(self), fields(task_id = %task_id, worker_id = %worker_id))]
    pub async fn accept_offer_and_confirm(
        &self,
        task_id: Uuid,
        worker_id: Uuid,
        allocation_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ClaimOutcome, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let accept_transaction = database_connection
            .transaction()
            .await
            .map_err(|_| DbError::TransactionError)?;

        let outcome =
            execute_claim_phases(&accept_transaction, task_id, worker_id, allocation_id, now)
                .await?;

        // --- FASE FINAL: CONFIRMACIÓN DEL WORKER (assigned -> accepted) ---
        let confirmed_rows = accept_transaction
            .execute(
                "UPDATE tasks
                 SET status = 'accepted', updated_at = ?1, version = version + 1
                 WHERE id = ?2 AND status = 'assigned'",
                params![fmt_ts(&now), task_id.to_string()],
            )
            .await?;
        if confirmed_rows == 0 {
            return Err(DbError::TaskAlreadyAssigned);
        }

        accept_transaction
            .commit()
            .await
            .map_err(|_| DbError::TransactionError)?;

        info!(
            "🤝 [ACCEPT]: Task {} claimed and confirmed by worker {} (load {}).",
            task_id, worker_id, outcome.worker_load_after
        );
        Ok(outcome)
    }

    /**
     * Cierre transaccional de tarea con evidencias y líneas de ganancia.
     *
     * # Errors:
     * - `DomainError::InvalidTransition` si la tarea no está en curso.
     * - `DbError::NotFound("task")` si la tarea no pertenece al worker.
     */
    #[instrument(skip(self, proofs, earning_drafts), fields(task_id = %task_id))]
    pub async fn complete_task_with_earnings(
        &self,
        tenant_id: Uuid,
        task_id: Uuid,
        worker_id: Uuid,
        proofs: &[TaskProof],
        actual_duration_minutes: i64,
        actual_distance_km: f64,
        tip_amount: Decimal,
        earning_drafts: &[EarningDraft],
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        let settlement_transaction = database_connection
            .transaction()
            .await
            .map_err(|_| DbError::TransactionError)?;

        // --- FASE 1: RE-VERIFICACIÓN BAJO CERROJO ---
        let mut task_results = settlement_transaction
            .query(
                "SELECT status, assigned_worker_id FROM tasks WHERE id = ?1",
                params![task_id.to_string()],
            )
            .await?;
        let Some(task_row) = task_results.next().await? else {
            return Err(DbError::NotFound("task"));
        };
        let status_raw: String = task_row.get(0)?;
        let assigned_raw: Option<String> = task_row.get(1)?;

        if assigned_raw.as_deref() != Some(worker_id.to_string().as_str()) {
            return Err(DbError::NotFound("task"));
        }
        let observed_status = TaskStatus::parse(&status_raw)?;
        observed_status.ensure_transition(TaskStatus::Completed)?;

        // --- FASE 2: EVIDENCIAS (APPEND-ONLY) ---
        for proof in proofs {
            settlement_transaction
                .execute(
                    r#"
                    INSERT INTO task_proofs (
                        id, task_id, proof_type, url, latitude, longitude,
                        caption, attached_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    "#,
                    params![
                        proof.id.to_string(),
                        task_id.to_string(),
                        proof.proof_type.as_str(),
                        proof.url.clone(),
                        proof.captured_at_point.as_ref().map(|point| point.latitude),
                        proof.captured_at_point.as_ref().map(|point| point.longitude),
                        proof.caption.clone(),
                        fmt_ts(&proof.attached_at)
                    ],
                )
                .await?;
        }

        // --- FASE 3: SELLADO DEL CIERRE ---
        let sealed_rows = settlement_transaction
            .execute(
                "UPDATE tasks
                 SET status = 'completed', completed_at = ?1,
                     actual_duration_minutes = ?2, actual_distance_km = ?3,
                     tip_amount = ?4, updated_at = ?1, version = version + 1
                 WHERE id = ?5 AND status = 'in_progress'",
                params![
                    fmt_ts(&now),
                    actual_duration_minutes,
                    actual_distance_km,
                    tip_amount.to_string(),
                    task_id.to_string()
                ],
            )
            .await?;
        if sealed_rows == 0 {
            return Err(DbError::Domain(DomainError::InvalidTransition {
                entity: "task",
                from: status_raw,
                to: "completed".into(),
            }));
        }

        // --- FASE 4: LÍNEAS DEL LEDGER (MISMA TRANSACCIÓN) ---
        for draft in earning_drafts {
            settlement_transaction
                .execute(
                    r#"
                    INSERT INTO earnings (
                        id, tenant_id, worker_id, task_id, entry_type, amount,
                        currency, is_paid_out, payout_id, description, earned_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, NULL, ?8, ?9)
                    "#,
                    params![
                        Uuid::new_v4().to_string(),
                        tenant_id.to_string(),
                        worker_id.to_string(),
                        draft.task_id.map(|id| id.to_string()),
                        draft.entry_type.as_str(),
                        draft.amount.to_string(),
                        draft.currency.clone(),
                        draft.description.clone(),
                        fmt_ts(&now)
                    ],
                )
                .await?;
        }

        // --- FASE 5: CONTADORES Y SUBESTADO DEL WORKER ---
        let mut load_results = settlement_transaction
            .query(
                &format!(
                    "SELECT COUNT(*) FROM tasks
                     WHERE assigned_worker_id = ?1 AND status IN {}",
                    CAPACITY_STATUSES_SQL
                ),
                params![worker_id.to_string()],
            )
            .await?;
        let remaining_load: i64 = match load_results.next().await? {
            Some(load_row) => load_row.get(0)?,
            None => 0,
        };

        settlement_transaction
            .execute(
                "UPDATE workers
                 SET completed_tasks = completed_tasks + 1,
                     updated_at = ?1, version = version + 1
                 WHERE id = ?2",
                params![fmt_ts(&now), worker_id.to_string()],
            )
            .await?;

        if remaining_load == 0 {
            // Sin carga restante el worker vuelve a 'online'; el subestado
            // 'offline' elegido por el propio worker se respeta.
            settlement_transaction
                .execute(
                    "UPDATE workers SET availability = 'online'
                     WHERE id = ?1 AND availability = 'busy'",
                    params![worker_id.to_string()],
                )
                .await?;
        }

        settlement_transaction
            .commit()
            .await
            .map_err(|_| DbError::TransactionError)?;

        info!(
            "🏦 [SETTLEMENT]: Task {} completed; {} ledger lines sealed.",
            task_id,
            earning_drafts.len()
        );
        Ok(())
    }

    /**
     * Cancelación sincrónica: sella 'cancelled', expira toda oferta en
     * vuelo y libera al worker asignado si existía.
     *
     * # Errors:
     * - `DomainError::InvalidTransition` fuera de pending|assigned|accepted.
     */
    #[instrument(skip(self), fields(task_id = %task_id))]
    pub async fn cancel_task_and_release(
        &self,
        task_id: Uuid,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        let cancel_transaction = database_connection
            .transaction()
            .await
            .map_err(|_| DbError::TransactionError)?;

        let mut task_results = cancel_transaction
            .query(
                "SELECT status, assigned_worker_id FROM tasks WHERE id = ?1",
                params![task_id.to_string()],
            )
            .await?;
        let Some(task_row) = task_results.next().await? else {
            return Err(DbError::NotFound("task"));
        };
        let status_raw: String = task_row.get(0)?;
        let assigned_raw: Option<String> = task_row.get(1)?;

        let observed_status = TaskStatus::parse(&status_raw)?;
        observed_status.ensure_transition(TaskStatus::Cancelled)?;

        cancel_transaction
            .execute(
                "UPDATE tasks
                 SET status = 'cancelled', termination_reason = ?1,
                     assigned_worker_id = NULL, updated_at = ?2, version = version + 1
                 WHERE id = ?3",
                params![reason, fmt_ts(&now), task_id.to_string()],
            )
            .await?;

        cancel_transaction
            .execute(
                "UPDATE allocations
                 SET status = 'expired', reason = 'task_cancelled', version = version + 1
                 WHERE task_id = ?1 AND status IN ('pending','offered','accepted')",
                params![task_id.to_string()],
            )
            .await?;

        // Liberación del worker si la tarea consumía capacidad.
        if let Some(assigned_raw) = assigned_raw {
            let mut load_results = cancel_transaction
                .query(
                    &format!(
                        "SELECT COUNT(*) FROM tasks
                         WHERE assigned_worker_id = ?1 AND status IN {}",
                        CAPACITY_STATUSES_SQL
                    ),
                    params![assigned_raw.clone()],
                )
                .await?;
            let remaining_load: i64 = match load_results.next().await? {
                Some(load_row) => load_row.get(0)?,
                None => 0,
            };

            if remaining_load == 0 {
                cancel_transaction
                    .execute(
                        "UPDATE workers
                         SET availability = 'online', updated_at = ?1, version = version + 1
                         WHERE id = ?2 AND availability = 'busy'",
                        params![fmt_ts(&now), assigned_raw],
                    )
                    .await?;
            }
        }

        cancel_transaction
            .commit()
            .await
            .map_err(|_| DbError::TransactionError)?;

        info!("🛑 [CANCEL]: Task {} cancelled ({}).", task_id, reason);
        Ok(())
    }

    /**
     * Fallo terminal de tarea en ejecución: sella 'failed' sin generar
     * ganancias y libera la capacidad del worker.
     *
     * # Errors:
     * - `DomainError::InvalidTransition` si la tarea no está en curso.
     */
    #[instrument(skip(self), fields(task_id = %task_id))]
    pub async fn fail_task_and_release(
        &self,
        task_id: Uuid,
        worker_id: Uuid,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        let failure_transaction = database_connection
            .transaction()
            .await
            .map_err(|_| DbError::TransactionError)?;

        let mut task_results = failure_transaction
            .query(
                "SELECT status, assigned_worker_id FROM tasks WHERE id = ?1",
                params![task_id.to_string()],
            )
            .await?;
        let Some(task_row) = task_results.next().await? else {
            return Err(DbError::NotFound("task"));
        };
        let status_raw: String = task_row.get(0)?;
        let assigned_raw: Option<String> = task_row.get(1)?;

        if assigned_raw.as_deref() != Some(worker_id.to_string().as_str()) {
            return Err(DbError::NotFound("task"));
        }
        let observed_status = TaskStatus::parse(&status_raw)?;
        observed_status.ensure_transition(TaskStatus::Failed)?;

        failure_transaction
            .execute(
                "UPDATE tasks
                 SET status = 'failed', termination_reason = ?1,
                     updated_at = ?2, version = version + 1
                 WHERE id = ?3 AND status = 'in_progress'",
                params![reason, fmt_ts(&now), task_id.to_string()],
            )
            .await?;

        let mut load_results = failure_transaction
            .query(
                &format!(
                    "SELECT COUNT(*) FROM tasks
                     WHERE assigned_worker_id = ?1 AND status IN {}",
                    CAPACITY_STATUSES_SQL
                ),
                params![worker_id.to_string()],
            )
            .await?;
        let remaining_load: i64 = match load_results.next().await? {
            Some(load_row) => load_row.get(0)?,
            None => 0,
        };
        if remaining_load == 0 {
            failure_transaction
                .execute(
                    "UPDATE workers SET availability = 'online', updated_at = ?1,
                     version = version + 1
                     WHERE id = ?2 AND availability = 'busy'",
                    params![fmt_ts(&now), worker_id.to_string()],
                )
                .await?;
        }

        failure_transaction
            .commit()
            .await
            .map_err(|_| DbError::TransactionError)?;

        info!("⚠️ [FAILURE]: Task {} failed ({}).", task_id, reason);
        Ok(())
    }

    /**
     * Materializa un plan de lote: instrucción 'pending' + enlace de las
     * líneas incluidas, todo en una transacción.
     *
     * # Errors:
     * - `DbError::Duplicate("payout")`: la referencia del día ya existe
     *   (la corrida es idempotente; el llamador lo trata como no-op).
     * - `DbError::StaleVersion`: alguna línea ya fue enlazada por otra
     *   corrida concurrente; el lote completo se revierte.
     */
    #[instrument(skip(self, plan), fields(worker_id = %plan.worker_id))]
    pub async fn create_payout_batch(
        &self,
        tenant_id: Uuid,
        plan: &PayoutBatchPlan,
        method: PayoutMethod,
        target_account: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Payout, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let batch_transaction = database_connection
            .transaction()
            .await
            .map_err(|_| DbError::TransactionError)?;

        let payout_id = Uuid::new_v4();

        let insert_result = batch_transaction
            .execute(
                r#"
                INSERT INTO payouts (
                    id, tenant_id, worker_id, amount, currency, status, method,
                    target_account, reference, version, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6, ?7, ?8, 1, ?9)
                "#,
                params![
                    payout_id.to_string(),
                    tenant_id.to_string(),
                    plan.worker_id.to_string(),
                    plan.total_amount.to_string(),
                    plan.currency.clone(),
                    method.as_str(),
                    target_account.clone(),
                    plan.reference.clone(),
                    fmt_ts(&now)
                ],
            )
            .await;

        if let Err(fault) = insert_result {
            if is_unique_violation(&fault) {
                return Err(DbError::Duplicate("payout"));
            }
            return Err(fault.into());
        }

        // Enlace exclusivo de las líneas: jamás doble pertenencia.
        let quoted_ids: Vec<String> = plan
            .earning_ids
            .iter()
            .map(|earning_id| format!("'{}'", earning_id))
            .collect();
        let linked_rows = batch_transaction
            .execute(
                &format!(
                    "UPDATE earnings SET payout_id = ?1
                     WHERE id IN ({}) AND payout_id IS NULL AND is_paid_out = 0",
                    quoted_ids.join(", ")
                ),
                params![payout_id.to_string()],
            )
            .await?;

        if linked_rows as usize != plan.earning_ids.len() {
            return Err(DbError::StaleVersion);
        }

        batch_transaction
            .commit()
            .await
            .map_err(|_| DbError::TransactionError)?;

        info!(
            "💸 [PAYOUT_BATCH]: {} {} batched for worker {} ({} lines).",
            plan.total_amount,
            plan.currency,
            plan.worker_id,
            plan.earning_ids.len()
        );

        Ok(Payout {
            id: payout_id,
            tenant_id,
            worker_id: plan.worker_id,
            amount: plan.total_amount,
            currency: plan.currency.clone(),
            status: PayoutStatus::Pending,
            method,
            target_account,
            reference: plan.reference.clone(),
            provider_reference: None,
            failure_reason: None,
            processed_at: None,
            version: 1,
            created_at: now,
        })
    }

    /**
     * Veredicto terminal 'completed' del rail: sella las líneas.
     * Idempotente: la re-entrega del mismo veredicto retorna `false`.
     *
     * # Errors:
     * - `DomainError::InvalidTransition` si el payout ya falló.
     */
    #[instrument(skip(self))]
    pub async fn settle_payout(
        &self,
        payout_id: Uuid,
        provider_reference: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let settle_transaction = database_connection
            .transaction()
            .await
            .map_err(|_| DbError::TransactionError)?;

        let mut payout_results = settle_transaction
            .query(
                "SELECT status FROM payouts WHERE id = ?1",
                params![payout_id.to_string()],
            )
            .await?;
        let Some(payout_row) = payout_results.next().await? else {
            return Err(DbError::NotFound("payout"));
        };
        let status_raw: String = payout_row.get(0)?;

        match status_raw.as_str() {
            "completed" => return Ok(false),
            "failed" => {
                return Err(DbError::Domain(DomainError::InvalidTransition {
                    entity: "payout",
                    from: status_raw,
                    to: "completed".into(),
                }));
            }
            // El veredicto puede adelantarse al sellado local de envío:
            // pending transita por processing dentro de la misma transacción.
            "pending" => {
                settle_transaction
                    .execute(
                        "UPDATE payouts
                         SET status = 'processing', provider_reference = ?1,
                             version = version + 1
                         WHERE id = ?2 AND status = 'pending'",
                        params![provider_reference, payout_id.to_string()],
                    )
                    .await?;
            }
            _ => {}
        }

        settle_transaction
            .execute(
                "UPDATE payouts
                 SET status = 'completed', provider_reference = ?1,
                     processed_at = ?2, version = version + 1
                 WHERE id = ?3 AND status = 'processing'",
                params![provider_reference, fmt_ts(&now), payout_id.to_string()],
            )
            .await?;

        settle_transaction
            .execute(
                "UPDATE earnings SET is_paid_out = 1 WHERE payout_id = ?1",
                params![payout_id.to_string()],
            )
            .await?;

        settle_transaction
            .commit()
            .await
            .map_err(|_| DbError::TransactionError)?;

        info!("✅ [RAIL]: Payout {} completed; lines sealed.", payout_id);
        Ok(true)
    }

    /**
     * Veredicto terminal 'failed' del rail: libera las líneas para la
     * próxima corrida. Idempotente: la re-entrega retorna `false`.
     *
     * # Errors:
     * - `DomainError::InvalidTransition` si el payout ya completó.
     */
    #[instrument(skip(self))]
    pub async fn fail_payout_and_release(
        &self,
        payout_id: Uuid,
        provider_reference: &str,
        failure_reason: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let release_transaction = database_connection
            .transaction()
            .await
            .map_err(|_| DbError::TransactionError)?;

        let mut payout_results = release_transaction
            .query(
                "SELECT status FROM payouts WHERE id = ?1",
                params![payout_id.to_string()],
            )
            .await?;
        let Some(payout_row) = payout_results.next().await? else {
            return Err(DbError::NotFound("payout"));
        };
        let status_raw: String = payout_row.get(0)?;

        match status_raw.as_str() {
            "failed" => return Ok(false),
            "completed" => {
                return Err(DbError::Domain(DomainError::InvalidTransition {
                    entity: "payout",
                    from: status_raw,
                    to: "failed".into(),
                }));
            }
            _ => {}
        }

        release_transaction
            .execute(
                "UPDATE payouts
                 SET status = 'failed', provider_reference = ?1, failure_reason = ?2,
                     processed_at = ?3, version = version + 1
                 WHERE id = ?4 AND status IN ('pending','processing')",
                params![
                    provider_reference,
                    failure_reason,
                    fmt_ts(&now),
                    payout_id.to_string()
                ],
            )
            .await?;

        // Liberación: las líneas vuelven al mercado de lotes.
        release_transaction
            .execute(
                "UPDATE earnings SET payout_id = NULL, is_paid_out = 0
                 WHERE payout_id = ?1",
                params![payout_id.to_string()],
            )
            .await?;

        release_transaction
            .commit()
            .await
            .map_err(|_| DbError::TransactionError)?;

        debug!(
            "🧯 [RAIL]: Payout {} failed ({}); lines released.",
            payout_id, failure_reason
        );
        Ok(true)
    }
}

/**
 * Fases compartidas del semáforo atómico, ejecutadas SOBRE la
 * transacción del llamador y sin compromiso propio: el dueño de la
 * transacción decide confirmar o revertir. Toda salida temprana por
 * error provoca el rollback al soltarse la transacción.
 */
async fn execute_claim_phases(
    claim_transaction: &libsql::Transaction,
    task_id: Uuid,
    worker_id: Uuid,
    allocation_id: Uuid,
    now: DateTime<Utc>,
) -> Result<ClaimOutcome, DbError> {
    // --- FASE 1: RE-VERIFICACIÓN DEL ESTADO DE LA TAREA ---
    let mut task_results = claim_transaction
        .query(
            "SELECT status FROM tasks WHERE id = ?1",
            params![task_id.to_string()],
        )
        .await?;
    let Some(task_row) = task_results.next().await? else {
        return Err(DbError::NotFound("task"));
    };
    let task_status_raw: String = task_row.get(0)?;
    if task_status_raw != "pending" {
        return Err(DbError::TaskAlreadyAssigned);
    }

    // --- FASE 2: ELEGIBILIDAD Y CAPACIDAD DEL WORKER ---
    let mut worker_results = claim_transaction
        .query(
            "SELECT lifecycle, availability, max_concurrent_tasks
             FROM workers WHERE id = ?1",
            params![worker_id.to_string()],
        )
        .await?;
    let Some(worker_row) = worker_results.next().await? else {
        return Err(DbError::NotFound("worker"));
    };
    let lifecycle_raw: String = worker_row.get(0)?;
    let availability_raw: String = worker_row.get(1)?;
    let max_concurrent: i64 = worker_row.get(2)?;

    let worker_is_eligible =
        lifecycle_raw == "active" && (availability_raw == "online" || availability_raw == "busy");
    if !worker_is_eligible {
        return Err(DbError::WorkerNotAvailable);
    }

    let mut load_results = claim_transaction
        .query(
            &format!(
                "SELECT COUNT(*) FROM tasks
                 WHERE assigned_worker_id = ?1 AND status IN {}",
                CAPACITY_STATUSES_SQL
            ),
            params![worker_id.to_string()],
        )
        .await?;
    let current_load: i64 = match load_results.next().await? {
        Some(load_row) => load_row.get(0)?,
        None => 0,
    };
    if current_load >= max_concurrent {
        return Err(DbError::CapacityReached);
    }

    // --- FASE 3: ACEPTACIÓN DE LA ASIGNACIÓN ELEGIDA ---
    // El índice único parcial colapsa cualquier segunda aceptación.
    let accept_result = claim_transaction
        .execute(
            "UPDATE allocations
             SET status = 'accepted', responded_at = ?1, version = version + 1
             WHERE id = ?2 AND task_id = ?3 AND worker_id = ?4
               AND status = 'offered'",
            params![
                fmt_ts(&now),
                allocation_id.to_string(),
                task_id.to_string(),
                worker_id.to_string()
            ],
        )
        .await;

    let accepted_rows = match accept_result {
        Ok(rows) => rows,
        Err(fault) if is_unique_violation(&fault) => {
            return Err(DbError::TaskAlreadyAssigned);
        }
        Err(fault) => return Err(fault.into()),
    };
    if accepted_rows == 0 {
        return Err(DbError::TaskAlreadyAssigned);
    }

    // --- FASE 4: TRÁNSITO DE LA TAREA (pending -> assigned) ---
    let task_rows = claim_transaction
        .execute(
            "UPDATE tasks
             SET assigned_worker_id = ?1, status = 'assigned',
                 updated_at = ?2, version = version + 1
             WHERE id = ?3 AND status = 'pending'",
            params![worker_id.to_string(), fmt_ts(&now), task_id.to_string()],
        )
        .await?;
    if task_rows == 0 {
        return Err(DbError::TaskAlreadyAssigned);
    }

    // --- FASE 5: EXPIRACIÓN DE HERMANAS (lost_race) ---
    claim_transaction
        .execute(
            "UPDATE allocations
             SET status = 'expired', reason = 'lost_race', version = version + 1
             WHERE task_id = ?1 AND id != ?2 AND status IN ('pending','offered')",
            params![task_id.to_string(), allocation_id.to_string()],
        )
        .await?;

    // --- FASE 6: CONTADORES Y SUBESTADO DEL WORKER ---
    let worker_load_after = current_load + 1;
    claim_transaction
        .execute(
            "UPDATE workers
             SET availability = 'busy', total_tasks = total_tasks + 1,
                 updated_at = ?1, version = version + 1
             WHERE id = ?2",
            params![fmt_ts(&now), worker_id.to_string()],
        )
        .await?;

    // --- FASE 7: PREEMPCIÓN POR TOPE DE CAPACIDAD ---
    let mut preempted_task_ids = Vec::new();
    if worker_load_after >= max_concurrent {
        let mut open_offers = claim_transaction
            .query(
                "SELECT id, task_id FROM allocations
                 WHERE worker_id = ?1 AND status = 'offered' AND task_id != ?2",
                params![worker_id.to_string(), task_id.to_string()],
            )
            .await?;

        while let Some(offer_row) = open_offers.next().await? {
            let preempted_task_raw: String = offer_row.get(1)?;
            let preempted_task_id = Uuid::parse_str(&preempted_task_raw)
                .map_err(|fault| DbError::MappingError(fault.to_string()))?;
            preempted_task_ids.push(preempted_task_id);
        }

        if !preempted_task_ids.is_empty() {
            claim_transaction
                .execute(
                    "UPDATE allocations
                     SET status = 'expired', reason = 'capacity_reached',
                         version = version + 1
                     WHERE worker_id = ?1 AND status = 'offered' AND task_id != ?2",
                    params![worker_id.to_string(), task_id.to_string()],
                )
                .await?;
        }
    }

    Ok(ClaimOutcome {
        task_id,
        worker_id,
        worker_load_after,
        preempted_task_ids,
    })
}
