// [libs/domain/dispatch-strategy/src/policy.rs]
/*!
 * =================================================================
 * APARATO: WAVE POLICY & RADIUS LADDER (V5.0 - EXPANSION SEALED)
 * CLASIFICACIÓN: DOMAIN STRATEGY (ESTRATO L2)
 * RESPONSABILIDAD: PARÁMETROS CONTRACTUALES DEL SCHEDULER
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. GEOMETRIC EXPANSION: 5 → 10 → 20 → 50 km; la escalera se detiene
 *    en el primer radio que produce suficientes candidatos o en el tope.
 * 2. SINGLE TUNING SURFACE: Todos los defaults del Dispatcher viven en
 *    'DispatchTuning'; el bootstrap del orquestador los sobreescribe
 *    desde el entorno una sola vez.
 * =================================================================
 */

use serde::{Deserialize, Serialize};

use crate::scoring::ScoringWeights;

/// Escalera geométrica de radios de búsqueda, en kilómetros.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RadiusLadder {
    /// Peldaños ascendentes; el último es el tope duro de expansión.
    pub rungs_km: Vec<f64>,
}

impl Default for RadiusLadder {
    fn default() -> Self {
        Self {
            rungs_km: vec![5.0, 10.0, 20.0, 50.0],
        }
    }
}

impl RadiusLadder {
    /// Radio del peldaño para un índice de expansión, saturando en el tope.
    #[must_use]
    pub fn rung(&self, expansion_index: usize) -> f64 {
        let last_rung = self.rungs_km.last().copied().unwrap_or(50.0);
        self.rungs_km
            .get(expansion_index)
            .copied()
            .unwrap_or(last_rung)
    }

    /// Tope duro de la expansión (último peldaño).
    #[must_use]
    pub fn max_radius_km(&self) -> f64 {
        self.rungs_km.last().copied().unwrap_or(50.0)
    }

    /// Cantidad de peldaños disponibles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rungs_km.len()
    }

    /// La escalera vacía es un error de configuración, no un caso de uso.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rungs_km.is_empty()
    }
}

/**
 * Tuning contractual del Dispatcher (§Dispatcher del contrato maestro).
 *
 * Los defaults son los valores nominales del contrato; cada tenant
 * puede sobreescribirlos en el bootstrap del orquestador.
 */
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DispatchTuning {
    /// Escalera de radios de candidatura.
    pub radius_ladder: RadiusLadder,
    /// Mínimo de candidatos antes de expandir el radio.
    pub min_candidates: usize,
    /// Tamaño de la wave de ofertas paralelas (top-K).
    pub wave_size: usize,
    /// TTL de pared de cada oferta, en segundos.
    pub offer_ttl_seconds: i64,
    /// Pausa entre waves fallidas, en segundos.
    pub wave_backoff_seconds: u64,
    /// Waves máximas antes del escalamiento manual.
    pub max_waves: i32,
    /// Ventana de frescura plena de ubicación, en segundos (5 min):
    /// dentro de ella el término de frescura vale 1.0.
    pub location_full_freshness_seconds: i64,
    /// Ventana de frescura dura de ubicación, en segundos (15 min):
    /// entre la plena y esta el término vale 0.5; después, 0.
    pub location_freshness_seconds: i64,
    /// Ventana de presión previa al deadline, en minutos.
    pub pressure_window_minutes: i64,
    /// Intervalo del barrido de expiración de ofertas, en segundos.
    pub sweep_interval_seconds: u64,
    /// Capacidad de la cola acotada de despacho (backpressure = busy).
    pub queue_capacity: usize,
    /// Pesos de la mezcla de puntuación.
    pub weights: ScoringWeights,
}

impl Default for DispatchTuning {
    fn default() -> Self {
        Self {
            radius_ladder: RadiusLadder::default(),
            min_candidates: 3,
            wave_size: 3,
            offer_ttl_seconds: 45,
            wave_backoff_seconds: 2,
            max_waves: 5,
            location_full_freshness_seconds: 5 * 60,
            location_freshness_seconds: 15 * 60,
            pressure_window_minutes: 60,
            sweep_interval_seconds: 5,
            queue_capacity: 1024,
            weights: ScoringWeights::default(),
        }
    }
}
