// [libs/core/geo-engine/src/errors.rs]
/*!
 * =================================================================
 * APARATO: GEODESY ERROR CATALOG (V1.1 - SOBERANO)
 * CLASIFICACIÓN: CORE GEODESY (ESTRATO L1)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS GEOMÉTRICOS
 * =================================================================
 */

use thiserror::Error;

/// Fallos que el motor geodésico puede reportar a los estratos superiores.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeoError {
    /// La latitud recibida escapa del intervalo físico [-90, 90].
    #[error("[L1_GEO_FAULT]: LATITUDE_OUT_OF_RANGE -> {0}")]
    LatitudeOutOfRange(f64),

    /// La longitud recibida escapa del intervalo físico [-180, 180].
    #[error("[L1_GEO_FAULT]: LONGITUDE_OUT_OF_RANGE -> {0}")]
    LongitudeOutOfRange(f64),

    /// El radio de consulta es negativo o no finito.
    #[error("[L1_GEO_FAULT]: RADIUS_DEGENERATE -> {0}")]
    DegenerateRadius(f64),
}
