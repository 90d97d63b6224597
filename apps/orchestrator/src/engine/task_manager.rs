// [apps/orchestrator/src/engine/task_manager.rs]
/*!
 * =================================================================
 * APARATO: TASK MANAGER ENGINE (V5.3 - SETTLEMENT BOUND)
 * CLASIFICACIÓN: APPLICATION ENGINE (ESTRATO L4)
 * RESPONSABILIDAD: CICLO DE VIDA DE TAREAS Y SU LIQUIDACIÓN ATÓMICA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. CLAIM DELEGATION: La aceptación de ofertas delega TODA la
 *    exclusión mutua en 'claim_task_for_worker'; el perdedor recibe
 *    'too_late' y eso no es un fallo operativo.
 * 2. SETTLEMENT BOUND: El cierre sella evidencias, estado y líneas del
 *    Ledger en UNA transacción del Store.
 * 3. QUEUE AS SIGNAL: Toda tarea nueva o liberada entra por la cola
 *    acotada del Dispatcher; este motor jamás despacha inline.
 * =================================================================
 */

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;
use veloz_core_geo::point::GeoPoint;
use veloz_domain_ledger::build_completion_earnings;
use veloz_domain_models::{
    require_non_negative, ProofType, Task, TaskDraft, TaskProof, TaskStatus,
};
use veloz_infra_db::DbError;

use crate::state::{AppState, DispatchCommand};

/// Evidencia entrante del cierre (`POST /me/tasks/{id}/complete`).
#[derive(Debug, Clone, Deserialize)]
pub struct ProofDraft {
    /// Clase de evidencia.
    pub proof_type: ProofType,
    /// Localizador del recurso subido por el cliente móvil.
    pub url: String,
    /// Latitud de captura, si se reporta.
    pub latitude: Option<f64>,
    /// Longitud de captura, si se reporta.
    pub longitude: Option<f64>,
    /// Nota breve del worker.
    pub caption: Option<String>,
}

/// Carga completa del cierre de tarea.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionDraft {
    /// Evidencias del cierre.
    #[serde(default)]
    pub proofs: Vec<ProofDraft>,
    /// Duración real en minutos.
    pub actual_duration_minutes: i64,
    /// Distancia real en kilómetros.
    pub actual_distance_km: f64,
    /// Propina capturada, si existe.
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub tip_amount: Option<Decimal>,
}

/**
 * Crea la tarea con status 'pending' y la encola para su primera wave.
 *
 * # Errors:
 * - `DomainError::LocationRequired` / `NegativeAmount` en borradores
 *   incoherentes (integridad, jamás reintentable).
 */
#[instrument(skip(state, draft), fields(task_type = draft.task_type.as_str()))]
pub async fn create_task(
    state: &AppState,
    tenant_id: Uuid,
    draft: TaskDraft,
) -> Result<Task, DbError> {
    draft.validate()?;

    let now = Utc::now();
    let task = Task {
        id: Uuid::new_v4(),
        tenant_id,
        task_type: draft.task_type,
        status: TaskStatus::Pending,
        priority: draft.priority,
        assigned_worker_id: None,
        required_worker_type: draft.required_worker_type,
        required_skills: draft.required_skills,
        zone_id: draft.zone_id,
        pickup: draft.pickup,
        delivery: draft.delivery,
        scheduled_at: draft.scheduled_at,
        deadline_at: draft.deadline_at,
        estimated_duration_minutes: draft.estimated_duration_minutes,
        estimated_distance_km: draft.estimated_distance_km,
        actual_duration_minutes: None,
        actual_distance_km: None,
        base_pay: draft.base_pay,
        bonus_pay: draft.bonus_pay,
        tip_amount: Decimal::ZERO,
        currency: draft.currency,
        required_proof_types: draft.required_proof_types,
        proofs: Vec::new(),
        order_reference: draft.order_reference,
        metadata: draft.metadata,
        escalated_at: None,
        started_at: None,
        completed_at: None,
        termination_reason: None,
        version: 1,
        created_at: now,
        updated_at: now,
    };

    state.tasks.insert_task(&task).await?;

    // Backpressure contractual: el productor bloquea sobre cola llena.
    if state
        .dispatch_queue
        .send(DispatchCommand::FreshTask { task_id: task.id })
        .await
        .is_err()
    {
        return Err(DbError::ConnectionError("DISPATCH_QUEUE_SEVERED".into()));
    }

    info!("📦 [TASK_MANAGER]: Task {} created and enqueued.", task.id);
    Ok(task)
}

/**
 * Cancelación sincrónica del operador: al retornar éxito, todo intento
 * de aceptación posterior observa 'too_late'.
 */
#[instrument(skip(state))]
pub async fn cancel_task(
    state: &AppState,
    tenant_id: Uuid,
    task_id: Uuid,
    reason: &str,
) -> Result<Task, DbError> {
    let task = state.tasks.fetch_task(task_id).await?;
    if task.tenant_id != tenant_id {
        return Err(DbError::NotFound("task"));
    }

    state
        .unit_of_work
        .cancel_task_and_release(task_id, reason, Utc::now())
        .await?;
    state.tasks.fetch_task(task_id).await
}

/**
 * Aceptación de oferta: el semáforo atómico del Store resuelve la
 * carrera Y confirma (assigned → accepted) en una sola transacción;
 * ningún corte intermedio deja la tarea varada en 'assigned'.
 *
 * # Errors:
 * - `DbError::TaskAlreadyAssigned` (wire: too_late) para el perdedor.
 * - `DbError::CapacityReached` si el worker está al tope.
 */
#[instrument(skip(state))]
pub async fn accept_offer(
    state: &AppState,
    worker_id: Uuid,
    allocation_id: Uuid,
) -> Result<Task, DbError> {
    let allocation = state.allocations.fetch_allocation(allocation_id).await?;
    if allocation.worker_id != worker_id {
        return Err(DbError::NotFound("allocation"));
    }

    let claim_outcome = state
        .unit_of_work
        .accept_offer_and_confirm(allocation.task_id, worker_id, allocation_id, Utc::now())
        .await?;

    state
        .event_bus
        .emit_task_assigned(allocation.task_id, worker_id);

    // Las ofertas preemptadas por tope de capacidad vuelven al mercado.
    for preempted_task_id in claim_outcome.preempted_task_ids {
        let _ = state
            .dispatch_queue
            .send(DispatchCommand::Reoffer {
                task_id: preempted_task_id,
            })
            .await;
    }

    state.tasks.fetch_task(allocation.task_id).await
}

/**
 * Rechazo explícito de la oferta: la tarea vuelve al mercado sin
 * esperar el TTL si no quedan ofertas vivas.
 */
#[instrument(skip(state))]
pub async fn reject_offer(
    state: &AppState,
    worker_id: Uuid,
    allocation_id: Uuid,
    reason: Option<String>,
) -> Result<(), DbError> {
    let allocation = state.allocations.fetch_allocation(allocation_id).await?;
    if allocation.worker_id != worker_id {
        return Err(DbError::NotFound("allocation"));
    }

    let applied = state.allocations.mark_rejected(allocation_id).await?;
    if !applied {
        // Carrera benigna con el barrido o con el claim: no-op.
        return Ok(());
    }

    info!(
        "🙅 [TASK_MANAGER]: Offer {} rejected by {} ({}).",
        allocation_id,
        worker_id,
        reason.as_deref().unwrap_or("unspecified")
    );

    let open_offers = state
        .allocations
        .count_open_for_task(allocation.task_id, Utc::now())
        .await?;
    if open_offers == 0 {
        let _ = state
            .dispatch_queue
            .send(DispatchCommand::Reoffer {
                task_id: allocation.task_id,
            })
            .await;
    }
    Ok(())
}

/// Arranque de ejecución: accepted → in_progress con sellado de inicio.
#[instrument(skip(state))]
pub async fn start_task(
    state: &AppState,
    worker_id: Uuid,
    task_id: Uuid,
) -> Result<Task, DbError> {
    let task = state.tasks.fetch_task(task_id).await?;
    if task.assigned_worker_id != Some(worker_id) {
        return Err(DbError::NotFound("task"));
    }

    state
        .tasks
        .transition_status(task_id, task.status, TaskStatus::InProgress, task.version)
        .await?;
    state.tasks.fetch_task(task_id).await
}

/**
 * Cierre certificado: valida evidencias exigidas, compone las líneas
 * del Ledger y delega el sellado atómico al Store.
 *
 * # Errors:
 * - `DbError::ProofRequired` con las clases faltantes.
 * - `DomainError::NegativeAmount` en propinas negativas.
 */
#[instrument(skip(state, completion))]
pub async fn complete_task(
    state: &AppState,
    worker_id: Uuid,
    task_id: Uuid,
    completion: CompletionDraft,
) -> Result<Task, DbError> {
    let task = state.tasks.fetch_task(task_id).await?;
    if task.assigned_worker_id != Some(worker_id) {
        return Err(DbError::NotFound("task"));
    }

    let tip_amount = completion.tip_amount.unwrap_or(Decimal::ZERO);
    require_non_negative("tip_amount", tip_amount)?;

    let now = Utc::now();
    let mut proofs = Vec::with_capacity(completion.proofs.len());
    for draft in &completion.proofs {
        let captured_at_point = match (draft.latitude, draft.longitude) {
            (Some(latitude), Some(longitude)) => Some(
                GeoPoint::new(latitude, longitude)
                    .map_err(|fault| DbError::MappingError(fault.to_string()))?,
            ),
            _ => None,
        };
        proofs.push(TaskProof {
            id: Uuid::new_v4(),
            task_id,
            proof_type: draft.proof_type,
            url: draft.url.clone(),
            captured_at_point,
            caption: draft.caption.clone(),
            attached_at: now,
        });
    }

    let missing_proof_types = task.missing_proof_types(&proofs);
    if !missing_proof_types.is_empty() {
        let missing_labels: Vec<&'static str> = missing_proof_types
            .iter()
            .map(|proof_type| proof_type.as_str())
            .collect();
        return Err(DbError::ProofRequired(missing_labels.join(",")));
    }

    let earning_drafts = build_completion_earnings(
        task_id,
        task.base_pay,
        task.bonus_pay,
        tip_amount,
        &task.currency,
    );

    state
        .unit_of_work
        .complete_task_with_earnings(
            task.tenant_id,
            task_id,
            worker_id,
            &proofs,
            completion.actual_duration_minutes,
            completion.actual_distance_km,
            tip_amount,
            &earning_drafts,
            now,
        )
        .await?;

    state.event_bus.emit_task_completed(task_id, worker_id);
    state.tasks.fetch_task(task_id).await
}

/// Fallo terminal reportado por el worker: sin ganancias generadas.
#[instrument(skip(state))]
pub async fn fail_task(
    state: &AppState,
    worker_id: Uuid,
    task_id: Uuid,
    reason: &str,
) -> Result<Task, DbError> {
    state
        .unit_of_work
        .fail_task_and_release(task_id, worker_id, reason, Utc::now())
        .await?;
    state.tasks.fetch_task(task_id).await
}
