// [apps/orchestrator/src/engine/registry.rs]
/*!
 * =================================================================
 * APARATO: WORKER REGISTRY ENGINE (V5.2 - LIFECYCLE GATES)
 * CLASIFICACIÓN: APPLICATION ENGINE (ESTRATO L4)
 * RESPONSABILIDAD: CICLO DE VIDA, DISPONIBILIDAD Y TELEMETRÍA DEL ENJAMBRE
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SINGLE MUTATOR LAW: El subestado 'busy' pertenece a las primitivas
 *    transaccionales del Store; este motor solo alterna online/offline
 *    respetando la carga vigente.
 * 2. GATED LIFECYCLE: pending → active; active ↔ inactive; suspensión
 *    reversible solo hacia active. Toda otra transición es violación.
 * 3. MONOTONIC TELEMETRY: La ingesta de ubicación delega la guardia
 *    monotónica al SQL del repositorio.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;
use veloz_core_geo::point::GeoPoint;
use veloz_domain_models::{
    Availability, DomainError, PayoutMethod, VehicleProfile, Worker, WorkerLifecycle, WorkerType,
};
use veloz_infra_db::DbError;

use crate::state::AppState;

/// Borrador de registro recibido en `POST /workers`.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterWorkerDraft {
    /// Identidad de usuario upstream (KYC externo).
    pub user_id: Uuid,
    /// Especialidad operativa declarada.
    pub worker_type: WorkerType,
    /// Contacto operativo obligatorio.
    pub contact_phone: String,
    /// Tope de concurrencia declarado (>= 1).
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_tasks: i64,
    /// Zonas operativas habilitadas.
    #[serde(default)]
    pub zones: Vec<String>,
    /// Habilidades certificadas.
    #[serde(default)]
    pub skills: Vec<String>,
    /// Vehículo declarado, si aplica.
    pub vehicle: Option<VehicleProfile>,
    /// Rail de pago preferido.
    pub payout_method: PayoutMethod,
    /// Cuenta o billetera destino.
    pub payout_target: Option<String>,
}

fn default_max_concurrent() -> i64 {
    1
}

/**
 * Registra una nueva unidad con status 'pending'.
 *
 * # Errors:
 * - `DbError::Duplicate("worker")` si (tenant, user) ya posee worker.
 * - `DomainError::DegenerateCapacity` si el tope declarado es < 1.
 */
#[instrument(skip(state, draft), fields(user_id = %draft.user_id))]
pub async fn register_worker(
    state: &AppState,
    tenant_id: Uuid,
    draft: RegisterWorkerDraft,
) -> Result<Worker, DbError> {
    if draft.max_concurrent_tasks < 1 {
        return Err(DbError::Domain(DomainError::DegenerateCapacity(
            draft.max_concurrent_tasks,
        )));
    }

    let now = Utc::now();
    let worker = Worker {
        id: Uuid::new_v4(),
        tenant_id,
        user_id: draft.user_id,
        worker_type: draft.worker_type,
        lifecycle: WorkerLifecycle::Pending,
        availability: Availability::Offline,
        contact_phone: draft.contact_phone,
        location: None,
        last_location_at: None,
        rating: 5.0,
        total_tasks: 0,
        completed_tasks: 0,
        max_concurrent_tasks: draft.max_concurrent_tasks,
        zones: draft.zones,
        skills: draft.skills,
        vehicle: draft.vehicle,
        payout_method: draft.payout_method,
        payout_target: draft.payout_target,
        version: 1,
        created_at: now,
        updated_at: now,
    };

    state.workers.insert_worker(&worker).await?;
    info!("🧑‍🔧 [REGISTRY]: Worker {} registered as pending.", worker.id);
    Ok(worker)
}

/// Tabla soberana de transiciones administrativas legales.
fn ensure_lifecycle_transition(
    from: WorkerLifecycle,
    to: WorkerLifecycle,
) -> Result<(), DomainError> {
    let legal = matches!(
        (from, to),
        (WorkerLifecycle::Pending, WorkerLifecycle::Active)
            | (WorkerLifecycle::Active, WorkerLifecycle::Inactive)
            | (WorkerLifecycle::Active, WorkerLifecycle::Suspended)
            | (WorkerLifecycle::Inactive, WorkerLifecycle::Active)
            | (WorkerLifecycle::Suspended, WorkerLifecycle::Active)
    );
    if legal {
        Ok(())
    } else {
        Err(DomainError::InvalidTransition {
            entity: "worker",
            from: from.as_str().to_string(),
            to: to.as_str().to_string(),
        })
    }
}

/**
 * Transición administrativa de ciclo de vida (activar, suspender,
 * desactivar). La suspensión bloquea ofertas nuevas; las tareas ya
 * aceptadas prosiguen hasta su estado terminal.
 *
 * # Errors:
 * - `DomainError::InvalidTransition` fuera de la tabla legal.
 */
#[instrument(skip(state))]
pub async fn change_lifecycle(
    state: &AppState,
    tenant_id: Uuid,
    worker_id: Uuid,
    target: WorkerLifecycle,
) -> Result<Worker, DbError> {
    let worker = state.workers.fetch_worker(worker_id).await?;
    if worker.tenant_id != tenant_id {
        return Err(DbError::NotFound("worker"));
    }

    ensure_lifecycle_transition(worker.lifecycle, target)?;
    state
        .workers
        .update_lifecycle(worker_id, target, worker.version)
        .await?;

    info!(
        "🚦 [REGISTRY]: Worker {} lifecycle {} -> {}.",
        worker_id,
        worker.lifecycle.as_str(),
        target.as_str()
    );
    state.workers.fetch_worker(worker_id).await
}

/**
 * Alterna la disponibilidad voluntaria del worker.
 *
 * Conectarse con carga vigente aterriza directamente en 'busy';
 * desconectarse conserva las tareas aceptadas pero bloquea ofertas.
 *
 * # Errors:
 * - `DbError::WorkerNotAvailable` si la unidad no está activa.
 */
#[instrument(skip(state))]
pub async fn set_availability(
    state: &AppState,
    tenant_id: Uuid,
    worker_id: Uuid,
    go_online: bool,
) -> Result<Worker, DbError> {
    let worker = state.workers.fetch_worker(worker_id).await?;
    if worker.tenant_id != tenant_id {
        return Err(DbError::NotFound("worker"));
    }

    let target = if go_online {
        if worker.lifecycle != WorkerLifecycle::Active {
            return Err(DbError::WorkerNotAvailable);
        }
        let current_load = state.workers.count_non_terminal_tasks(worker_id).await?;
        if current_load > 0 {
            Availability::Busy
        } else {
            Availability::Online
        }
    } else {
        Availability::Offline
    };

    state
        .workers
        .update_availability(worker_id, target, worker.version)
        .await?;
    state.workers.fetch_worker(worker_id).await
}

/**
 * Ingesta idempotente de ubicación (`POST /me/location`).
 *
 * Retorna `false` cuando la marca temporal no supera a la almacenada.
 */
#[instrument(skip(state))]
pub async fn report_location(
    state: &AppState,
    worker_id: Uuid,
    latitude: f64,
    longitude: f64,
    reported_at: DateTime<Utc>,
) -> Result<bool, DbError> {
    let point = GeoPoint::new(latitude, longitude)
        .map_err(|fault| DbError::MappingError(fault.to_string()))?;
    state
        .workers
        .record_location(worker_id, point, reported_at)
        .await
}

/**
 * Sella la calificación computada upstream (el motor no calcula EWMA).
 *
 * # Errors:
 * - `DomainError::RatingOutOfRange` fuera de [0, 5].
 */
#[instrument(skip(state))]
pub async fn adjust_rating(
    state: &AppState,
    tenant_id: Uuid,
    worker_id: Uuid,
    rating: f64,
) -> Result<Worker, DbError> {
    let worker = state.workers.fetch_worker(worker_id).await?;
    if worker.tenant_id != tenant_id {
        return Err(DbError::NotFound("worker"));
    }
    state
        .workers
        .store_rating(worker_id, rating, worker.version)
        .await?;
    state.workers.fetch_worker(worker_id).await
}
