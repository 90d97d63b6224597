// [libs/domain/dispatch-strategy/src/lib.rs]

#![deny(missing_docs)]

//! # APARATO: DISPATCH STRATEGY MASTER HUB (V5.2 - WAVE CERTIFIED)
//! CLASIFICACIÓN: DOMAIN STRATEGY (ESTRATO L2)
//! RESPONSABILIDAD: CEREBRO PURO DEL SCHEDULER DE DESPACHO
//!
//! ## Visión Holística 2026
//! Esta crate es deliberadamente síncrona y sin I/O: recibe instantáneas
//! de candidatos ya hidratadas por el estrato de infraestructura y
//! devuelve veredictos deterministas (puntuaciones, ordenamientos,
//! planes de wave). La atomicidad del claim vive en el Store; aquí vive
//! la política.
//!
//! ## Características de Élite
//! 1. **Deterministic Ranking:** Desempate total por distancia y luego
//!    por identificador, eliminando el no-determinismo entre waves.
//! 2. **Bounded CPU:** Puntuación O(n) en el conteo de candidatos.
//! 3. **Tunable Sovereignty:** Todos los parámetros del §Dispatcher
//!    habitan `DispatchTuning` con defaults contractuales.

/// Escalera de radios, parámetros de wave y tuning del Dispatcher.
pub mod policy;

/// Puntuación de candidatos y ordenamiento determinista.
pub mod scoring;

pub use crate::policy::{DispatchTuning, RadiusLadder};
pub use crate::scoring::{
    rank_candidates, CandidateSnapshot, ScoredCandidate, ScoringContext, ScoringWeights,
};
