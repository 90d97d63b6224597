// [apps/orchestrator/src/engine/dispatcher.rs]
/*!
 * =================================================================
 * APARATO: DISPATCH WAVE ENGINE (V5.4 - EXPANSION SEALED)
 * CLASIFICACIÓN: APPLICATION ENGINE (ESTRATO L4)
 * RESPONSABILIDAD: EJECUCIÓN DE WAVES DE OFERTA Y ESCALAMIENTO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. STORE-ENFORCED CORRECTNESS: La wave no sostiene cerrojo alguno en
 *    memoria; el at-most-one vive en el claim atómico y en el índice
 *    único parcial. Waves de tareas distintas corren en paralelo.
 * 2. GEOMETRIC EXPANSION: La escalera 5→10→20→50 se recorre dentro de
 *    la selección de candidatos y entre waves sucesivas.
 * 3. BOUNDED CPU: La puntuación es O(n) y síncrona; el único punto de
 *    suspensión es el I/O del Store.
 *
 * # Mathematical Proof (Liveness):
 * Con >= 1 candidato elegible y fresco dentro del radio máximo, alguna
 * wave <= max_waves lo alcanza (la escalera es monótona creciente), y
 * la tarea alcanza 'assigned' dentro de max_waves × (TTL + backoff).
 * =================================================================
 */

use std::future::Future;
use std::pin::Pin;

use chrono::{Duration as ChronoDuration, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use veloz_domain_dispatch::{rank_candidates, CandidateSnapshot, ScoringContext};
use veloz_domain_models::{Allocation, AllocationStatus, Task, TaskStatus};
use veloz_infra_db::repositories::NearbyWorker;
use veloz_infra_db::DbError;

use crate::state::AppState;

/// Desenlace observable de una wave de despacho.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaveOutcome {
    /// Se emitieron N ofertas paralelas.
    Offered(usize),
    /// La tarea ya no es despachable (asignada, cancelada o escalada).
    Skipped,
    /// Sin candidatos; se programó la wave siguiente.
    Rescheduled,
    /// Waves agotadas; la tarea quedó escalada a intervención manual.
    Escalated,
}

/**
 * Ejecuta una wave de ofertas para la tarea dada.
 *
 * La selección expande la escalera de radios hasta reunir el mínimo de
 * candidatos o alcanzar el tope; la puntuación y el corte top-K son
 * CPU pura sobre las instantáneas hidratadas.
 */
#[instrument(skip(state), fields(task_id = %task_id, wave = wave_number))]
pub async fn execute_wave(
    state: &AppState,
    task_id: Uuid,
    wave_number: i32,
) -> Result<WaveOutcome, DbError> {
    execute_wave_boxed(state, task_id, wave_number).await
}

/// Igual que [`execute_wave`] pero con el future type-erased: rompe el
/// ciclo de inferencia de `Send` que surge de la recursión indirecta
/// vía `tokio::spawn` en `handle_empty_wave`/`evaluate_reoffer`.
fn execute_wave_boxed(
    state: &AppState,
    task_id: Uuid,
    wave_number: i32,
) -> Pin<Box<dyn Future<Output = Result<WaveOutcome, DbError>> + Send + '_>> {
    Box::pin(async move {
        let task = state.tasks.fetch_task(task_id).await?;

        if task.status != TaskStatus::Pending || task.escalated_at.is_some() {
            debug!("↩️ [DISPATCH]: Task {} no longer dispatchable.", task_id);
            return Ok(WaveOutcome::Skipped);
        }

        let Some(dispatch_point) = task.dispatch_point().copied() else {
            warn!("🗺️ [DISPATCH]: Task {} lacks a dispatch point.", task_id);
            return Ok(WaveOutcome::Skipped);
        };

        // --- FASE 1: SELECCIÓN CON EXPANSIÓN GEOMÉTRICA ---
        let ladder = &state.tuning.radius_ladder;
        let starting_rung =
            ((wave_number - 1).max(0) as usize).min(ladder.len().saturating_sub(1));

        let mut effective_radius_km = ladder.rung(starting_rung);
        let mut pool: Vec<NearbyWorker> = Vec::new();

        for rung_index in starting_rung..ladder.len() {
            effective_radius_km = ladder.rung(rung_index);
            let nearby = state
                .workers
                .find_nearby_candidates(
                    task.tenant_id,
                    &dispatch_point,
                    effective_radius_km,
                    task.required_worker_type,
                    64,
                )
                .await?;

            pool = filter_candidates(&task, nearby);
            if pool.len() >= state.tuning.min_candidates {
                break;
            }
        }

        if pool.is_empty() {
            return handle_empty_wave(state, &task, wave_number).await;
        }

        // --- FASE 2: PUNTUACIÓN Y CORTE TOP-K (CPU PURA) ---
        let now = Utc::now();
        let scoring_context = ScoringContext {
            radius_km: effective_radius_km,
            deadline_at: task.deadline_at,
            now,
            pressure_window_minutes: state.tuning.pressure_window_minutes,
            full_freshness_seconds: state.tuning.location_full_freshness_seconds,
            stale_freshness_seconds: state.tuning.location_freshness_seconds,
        };

        let snapshots: Vec<CandidateSnapshot> = pool
            .iter()
            .map(|candidate| CandidateSnapshot {
                worker_id: candidate.worker.id,
                distance_km: candidate.distance_km,
                rating: candidate.worker.rating,
                current_load: candidate.current_load,
                max_concurrent: candidate.worker.max_concurrent_tasks,
                location_age_seconds: candidate
                    .worker
                    .last_location_at
                    .map(|instant| (now - instant).num_seconds().max(0))
                    .unwrap_or(i64::MAX),
                speed_kmh: candidate.worker.effective_speed_kmh(),
            })
            .collect();

        let ranked = rank_candidates(
            snapshots,
            &scoring_context,
            &state.tuning.weights,
            state.tuning.wave_size,
        );

        // --- FASE 3: EMISIÓN ATÓMICA DE LA WAVE ---
        let expires_at = now + ChronoDuration::seconds(state.tuning.offer_ttl_seconds);
        let wave_allocations: Vec<Allocation> = ranked
            .iter()
            .map(|scored| Allocation {
                id: Uuid::new_v4(),
                task_id,
                worker_id: scored.snapshot.worker_id,
                status: AllocationStatus::Offered,
                score: scored.score,
                distance_km: scored.snapshot.distance_km,
                eta_minutes: scored.eta_minutes,
                wave: wave_number,
                offered_at: now,
                expires_at,
                responded_at: None,
                reason: None,
                version: 1,
            })
            .collect();

        state.allocations.insert_offer_wave(&wave_allocations).await?;
        state.tasks.record_dispatch_wave(task_id, wave_number).await?;

        for allocation in &wave_allocations {
            state.event_bus.emit_offer_issued(allocation.clone());
        }

        info!(
            "🌊 [DISPATCH]: Wave {} for task {} issued {} offers (radius {} km).",
            wave_number,
            task_id,
            wave_allocations.len(),
            effective_radius_km
        );
        Ok(WaveOutcome::Offered(wave_allocations.len()))
    })
}

/**
 * Re-evaluación tras muerte de ofertas (TTL, rechazo o preempción):
 * decide entre la wave siguiente con backoff o el escalamiento.
 */
#[instrument(skip(state), fields(task_id = %task_id))]
pub async fn evaluate_reoffer(state: &AppState, task_id: Uuid) -> Result<WaveOutcome, DbError> {
    let task = state.tasks.fetch_task(task_id).await?;
    if task.status != TaskStatus::Pending || task.escalated_at.is_some() {
        return Ok(WaveOutcome::Skipped);
    }

    // Con ofertas aún vivas no se re-despacha: la wave sigue en curso.
    let open_offers = state
        .allocations
        .count_open_for_task(task_id, Utc::now())
        .await?;
    if open_offers > 0 {
        return Ok(WaveOutcome::Skipped);
    }

    let spent_waves = last_wave_number(state, task_id).await?;
    if spent_waves >= state.tuning.max_waves {
        return escalate(state, &task, spent_waves).await;
    }

    // Backoff contractual entre waves, fuera del hilo de la cola.
    let backoff = std::time::Duration::from_secs(state.tuning.wave_backoff_seconds);
    let deferred_state = state.clone();
    let next_wave = spent_waves + 1;
    tokio::spawn(async move {
        tokio::time::sleep(backoff).await;
        if let Err(fault) = execute_wave_boxed(&deferred_state, task_id, next_wave).await {
            warn!(
                "🌊 [DISPATCH]: Deferred wave {} for {} collapsed: {}",
                next_wave, task_id, fault
            );
        }
    });

    Ok(WaveOutcome::Rescheduled)
}

// --- GUARDIAS INTERNAS ---

/// Filtros de candidatura no-espaciales: habilidades y zona.
fn filter_candidates(task: &Task, nearby: Vec<NearbyWorker>) -> Vec<NearbyWorker> {
    nearby
        .into_iter()
        .filter(|candidate| {
            let skills_satisfied = task
                .required_skills
                .iter()
                .all(|skill| candidate.worker.skills.contains(skill));
            let zone_satisfied = match &task.zone_id {
                Some(zone) => candidate.worker.zones.contains(zone),
                None => true,
            };
            skills_satisfied && zone_satisfied
        })
        .collect()
}

/// Última wave emitida según el rastro de asignaciones.
async fn last_wave_number(state: &AppState, task_id: Uuid) -> Result<i32, DbError> {
    let allocations = state.allocations.list_for_task(task_id).await?;
    Ok(allocations
        .iter()
        .map(|allocation| allocation.wave)
        .max()
        .unwrap_or(0))
}

async fn handle_empty_wave(
    state: &AppState,
    task: &Task,
    wave_number: i32,
) -> Result<WaveOutcome, DbError> {
    if wave_number >= state.tuning.max_waves {
        return escalate(state, task, wave_number).await;
    }

    let backoff = std::time::Duration::from_secs(state.tuning.wave_backoff_seconds);
    let deferred_state = state.clone();
    let task_id = task.id;
    let next_wave = wave_number + 1;
    tokio::spawn(async move {
        tokio::time::sleep(backoff).await;
        if let Err(fault) = execute_wave_boxed(&deferred_state, task_id, next_wave).await {
            warn!(
                "🌊 [DISPATCH]: Deferred wave {} for {} collapsed: {}",
                next_wave, task_id, fault
            );
        }
    });

    debug!(
        "🕳️ [DISPATCH]: Wave {} for task {} found no candidates; wave {} scheduled.",
        wave_number, task.id, next_wave
    );
    Ok(WaveOutcome::Rescheduled)
}

async fn escalate(state: &AppState, task: &Task, waves_spent: i32) -> Result<WaveOutcome, DbError> {
    state.tasks.mark_escalated(task.id, waves_spent).await?;
    state.event_bus.emit_task_escalated(task.id);
    warn!(
        "🚨 [DISPATCH]: Task {} escalated after {} waves.",
        task.id, waves_spent
    );
    Ok(WaveOutcome::Escalated)
}
