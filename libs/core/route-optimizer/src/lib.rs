// [libs/core/route-optimizer/src/lib.rs]

#![deny(missing_docs)]

//! # APARATO: ROUTE OPTIMIZER MASTER HUB (V3.4 - BUDGET SEALED)
//! CLASIFICACIÓN: CORE ROUTING (ESTRATO L1)
//! RESPONSABILIDAD: ORDENAMIENTO DE PARADAS BAJO PRESUPUESTO DE PARED
//!
//! ## Visión Holística 2026
//! El optimizador es deliberadamente heurístico: vecino más cercano para
//! la siembra y pasadas 2-opt hasta que ningún intercambio reduzca la
//! distancia total o se agote el presupuesto duro de 50 ms. La latencia
//! acotada manda sobre la optimalidad global.
//!
//! ## Características de Élite
//! 1. **Synchronous by Design:** Cero puntos de suspensión; el estrato
//!    asíncrono invoca este motor como una llamada de CPU pura.
//! 2. **Score Transparency:** El plan reporta 1 − (final/greedy) acotado
//!    a [0,1] como medida de mejora de la fase 2-opt.
//! 3. **Index Stability:** El plan retorna índices sobre la colección de
//!    entrada; el llamador conserva la propiedad de sus artefactos.

/// Planificador de rutas: siembra greedy y refinamiento 2-opt.
pub mod planner;

pub use crate::planner::{plan_route, RoutePlan, DEFAULT_OPTIMIZATION_BUDGET};
