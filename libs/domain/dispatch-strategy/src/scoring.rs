// [libs/domain/dispatch-strategy/src/scoring.rs]
/*!
 * =================================================================
 * APARATO: CANDIDATE SCORING ENGINE (V5.2 - BLEND SEALED)
 * CLASIFICACIÓN: DOMAIN STRATEGY (ESTRATO L2)
 * RESPONSABILIDAD: PUNTUACIÓN DETERMINISTA DE CANDIDATOS DE WAVE
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. CONTRACTUAL BLEND: score = w_d·proximidad + w_r·calificación +
 *    w_l·holgura + w_f·frescura − w_p·presión de deadline, con pesos
 *    que suman 1 en la mezcla aditiva.
 * 2. FRESHNESS TIERS: 1.0 dentro de la ventana plena, 0.5 dentro de
 *    la ventana dura, 0 después; ambas ventanas llegan del tuning vía
 *    el contexto (5 y 15 minutos nominales). La ubicación rancia
 *    degrada el score sin descalificar al candidato.
 * 3. TOTAL ORDER: Desempate por distancia ascendente y luego por
 *    identificador ascendente; dos procesos ordenan idéntico.
 *
 * # Mathematical Proof (Score Bounds):
 * Cada término aditivo habita [0,1] y sus pesos suman 1; la presión
 * resta a lo sumo w_p. Por lo tanto score ∈ [−w_p, 1] y el orden es
 * una relación total sobre cualquier conjunto de candidatos.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pesos contractuales de la mezcla de puntuación.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScoringWeights {
    /// Peso de la proximidad geográfica (w_d).
    pub distance: f64,
    /// Peso de la calificación histórica (w_r).
    pub rating: f64,
    /// Peso de la holgura de capacidad (w_l).
    pub load: f64,
    /// Peso de la frescura de ubicación (w_f).
    pub freshness: f64,
    /// Peso de la presión de deadline (w_p, sustractivo).
    pub deadline_pressure: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            distance: 0.45,
            rating: 0.20,
            load: 0.15,
            freshness: 0.10,
            deadline_pressure: 0.10,
        }
    }
}

/// Instantánea de un candidato hidratada por el estrato de infraestructura.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSnapshot {
    /// Identificador del worker candidato.
    pub worker_id: Uuid,
    /// Distancia al punto de despacho (km, 3 decimales).
    pub distance_km: f64,
    /// Calificación vigente en [0, 5].
    pub rating: f64,
    /// Tareas no-terminales en curso.
    pub current_load: i64,
    /// Tope de concurrencia declarado (>= 1).
    pub max_concurrent: i64,
    /// Edad de la última ubicación aceptada, en segundos.
    pub location_age_seconds: i64,
    /// Velocidad media urbana (km/h) para la estimación de arribo.
    pub speed_kmh: f64,
}

/// Contexto de la tarea bajo despacho.
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext {
    /// Radio de la wave vigente (denominador de proximidad).
    pub radius_km: f64,
    /// Deadline contractual de la tarea, si existe.
    pub deadline_at: Option<DateTime<Utc>>,
    /// Reloj de la evaluación (inyectado para determinismo en tests).
    pub now: DateTime<Utc>,
    /// Ventana de presión previa al deadline, en minutos.
    pub pressure_window_minutes: i64,
    /// Ventana de frescura plena de ubicación, en segundos (5 min).
    pub full_freshness_seconds: i64,
    /// Ventana dura de frescura, en segundos (15 min); después, término 0.
    pub stale_freshness_seconds: i64,
}

/// Candidato ya puntuado y listo para el corte top-K de la wave.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    /// Instantánea original del candidato.
    pub snapshot: CandidateSnapshot,
    /// Puntuación final de la mezcla.
    pub score: f64,
    /// Estimación de arribo en minutos a velocidad nominal.
    pub eta_minutes: f64,
}

/// Nivel de frescura por tramos; las ventanas llegan del tuning.
#[must_use]
pub fn freshness_tier(
    location_age_seconds: i64,
    full_window_seconds: i64,
    stale_window_seconds: i64,
) -> f64 {
    if location_age_seconds < full_window_seconds {
        1.0
    } else if location_age_seconds < stale_window_seconds {
        0.5
    } else {
        0.0
    }
}

/// Presión de deadline en [0,1]: 0 lejos, 1 sobre la línea o vencida.
#[must_use]
pub fn deadline_pressure(context: &ScoringContext) -> f64 {
    let Some(deadline_at) = context.deadline_at else {
        return 0.0;
    };

    let remaining_minutes = (deadline_at - context.now).num_seconds() as f64 / 60.0;
    if remaining_minutes <= 0.0 {
        return 1.0;
    }

    let window_minutes = context.pressure_window_minutes.max(1) as f64;
    (1.0 - remaining_minutes / window_minutes).clamp(0.0, 1.0)
}

/// Puntúa un candidato individual contra el contexto de la tarea.
#[must_use]
pub fn score_candidate(
    snapshot: &CandidateSnapshot,
    context: &ScoringContext,
    weights: &ScoringWeights,
) -> f64 {
    let proximity_term = (1.0 - snapshot.distance_km / context.radius_km.max(0.001)).clamp(0.0, 1.0);
    let rating_term = (snapshot.rating / 5.0).clamp(0.0, 1.0);
    let slack_term = (1.0 - snapshot.current_load as f64 / snapshot.max_concurrent.max(1) as f64)
        .clamp(0.0, 1.0);
    let freshness_term = freshness_tier(
        snapshot.location_age_seconds,
        context.full_freshness_seconds,
        context.stale_freshness_seconds,
    );
    let pressure_term = deadline_pressure(context);

    weights.distance * proximity_term
        + weights.rating * rating_term
        + weights.load * slack_term
        + weights.freshness * freshness_term
        - weights.deadline_pressure * pressure_term
}

/**
 * Puntúa y ordena el conjunto de candidatos de una wave.
 *
 * Orden: puntuación descendente; empates por distancia ascendente y
 * luego por identificador ascendente. Retorna a lo sumo `wave_size`
 * candidatos.
 *
 * # Performance: O(n log n) por el ordenamiento; n acotado por la
 * consulta por radio del índice Geo. Sin puntos de suspensión.
 */
#[must_use]
pub fn rank_candidates(
    candidates: Vec<CandidateSnapshot>,
    context: &ScoringContext,
    weights: &ScoringWeights,
    wave_size: usize,
) -> Vec<ScoredCandidate> {
    let mut scored: Vec<ScoredCandidate> = candidates
        .into_iter()
        .map(|snapshot| {
            let score = score_candidate(&snapshot, context, weights);
            let eta_minutes = if snapshot.speed_kmh > 0.0 {
                (snapshot.distance_km / snapshot.speed_kmh) * 60.0
            } else {
                f64::INFINITY
            };
            ScoredCandidate {
                snapshot,
                score,
                eta_minutes,
            }
        })
        .collect();

    scored.sort_by(|left, right| {
        right
            .score
            .partial_cmp(&left.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                left.snapshot
                    .distance_km
                    .partial_cmp(&right.snapshot.distance_km)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| left.snapshot.worker_id.cmp(&right.snapshot.worker_id))
    });

    scored.truncate(wave_size);
    scored
}
