// [libs/core/geo-engine/src/lib.rs]

#![deny(missing_docs)]

//! # APARATO: GEO ENGINE MASTER HUB (V4.2 - SPHERE CERTIFIED)
//! CLASIFICACIÓN: CORE GEODESY (ESTRATO L1)
//! RESPONSABILIDAD: ORQUESTACIÓN DE PRIMITIVAS GEODÉSICAS WGS-84
//!
//! ## Visión Holística 2026
//! Actúa como la autoridad suprema de la geometría del despacho. Toda
//! distancia que influya en una oferta, una ruta o una tarifa nace en este
//! estrato y en ningún otro, garantizando que el enjambre de repartidores
//! sea medido con la misma vara bit-perfecta en cada wave.
//!
//! ## Características de Élite
//! 1. **Single Formula Authority:** Haversine sobre la esfera media WGS-84,
//!    redondeo estable a 3 decimales de kilómetro.
//! 2. **Companion Index Ready:** Celdas de retícula deterministas para el
//!    pre-filtrado espacial en el Ledger Táctico (libSQL carece de índice
//!    espacial nativo).
//! 3. **Nominal Symmetry:** Tipos sincronizados con los contratos del
//!    estrato de modelos (L2) sin dependencia inversa.
//! 4. **Higiene L1:** Cero advertencias del compilador y cero flotantes
//!    monetarios (este estrato solo mide geometría, jamás dinero).

/// Catálogo de fallos geodésicos para el triaje programático.
pub mod errors;

/// Punto geográfico soberano y distancia de gran círculo (Haversine).
pub mod point;

/// Cajas delimitadoras para el pre-filtrado de consultas por radio.
pub mod bounds;

/// Retícula determinista de celdas para el índice espacial de compañía.
pub mod grid;

pub use crate::bounds::BoundingBox;
pub use crate::errors::GeoError;
pub use crate::grid::{cell_for_point, covering_cells, GRID_CELL_DEGREES};
pub use crate::point::{haversine_distance_km, GeoPoint, EARTH_MEAN_RADIUS_KM};

/**
 * PRELUDIO GEODÉSICO
 *
 * Colección de tipos de alta frecuencia para inyección directa en los
 * estratos de estrategia (L2) e infraestructura (L3).
 */
pub mod prelude {
    pub use crate::bounds::BoundingBox;
    pub use crate::errors::GeoError;
    pub use crate::grid::{cell_for_point, covering_cells};
    pub use crate::point::{haversine_distance_km, GeoPoint};
}
