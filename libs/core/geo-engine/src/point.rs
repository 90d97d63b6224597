// [libs/core/geo-engine/src/point.rs]
/*!
 * =================================================================
 * APARATO: GREAT-CIRCLE DISTANCE ENGINE (V4.0 - WGS84 SEALED)
 * CLASIFICACIÓN: CORE GEODESY (ESTRATO L1)
 * RESPONSABILIDAD: MEDICIÓN BIT-PERFECTA DE DISTANCIAS DE DESPACHO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SINGLE SOURCE OF TRUTH: Toda puntuación de candidatos y toda
 *    pierna de ruta consume exclusivamente 'haversine_distance_km'.
 * 2. STABLE ROUNDING: Redondeo a 3 decimales de kilómetro para que
 *    el ordenamiento de candidatos sea reproducible entre waves.
 * 3. VALIDATION AT THE GATE: Las coordenadas se validan al construir
 *    el punto; el interior del motor asume invariantes ya selladas.
 *
 * # Mathematical Proof (Haversine Stability):
 * La formulación hav(θ) = sin²(θ/2) evita la cancelación catastrófica
 * del coseno para distancias cortas (< 1 km), que es exactamente el
 * rango donde se decide la mayoría de las ofertas urbanas.
 * =================================================================
 */

use crate::errors::GeoError;
use serde::{Deserialize, Serialize};

/// Radio medio de la esfera WGS-84 en kilómetros (IUGG R1).
pub const EARTH_MEAN_RADIUS_KM: f64 = 6371.0088;

/// Punto geográfico validado sobre la esfera WGS-84.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitud en grados decimales, intervalo [-90, 90].
    pub latitude: f64,
    /// Longitud en grados decimales, intervalo [-180, 180].
    pub longitude: f64,
}

impl GeoPoint {
    /**
     * Construye un punto validando el intervalo físico de ambas coordenadas.
     *
     * # Errors:
     * - `GeoError::LatitudeOutOfRange` / `GeoError::LongitudeOutOfRange`
     *   cuando la coordenada escapa de la esfera o no es finita.
     */
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(GeoError::LatitudeOutOfRange(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoError::LongitudeOutOfRange(longitude));
        }
        Ok(Self { latitude, longitude })
    }

    /// Distancia de gran círculo hacia otro punto, en kilómetros (3 decimales).
    #[must_use]
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        haversine_distance_km(self, other)
    }
}

/**
 * Calcula la distancia de gran círculo entre dos puntos (Haversine).
 *
 * El resultado se redondea a 3 decimales de kilómetro: estabilidad del
 * ordenamiento de candidatos por encima de la precisión milimétrica.
 *
 * # Performance: O(1), sin asignaciones de heap. No es punto de suspensión.
 */
#[must_use]
pub fn haversine_distance_km(origin: &GeoPoint, target: &GeoPoint) -> f64 {
    let origin_latitude_radians = origin.latitude.to_radians();
    let target_latitude_radians = target.latitude.to_radians();
    let latitude_delta_radians = (target.latitude - origin.latitude).to_radians();
    let longitude_delta_radians = (target.longitude - origin.longitude).to_radians();

    let half_chord = (latitude_delta_radians / 2.0).sin().powi(2)
        + origin_latitude_radians.cos()
            * target_latitude_radians.cos()
            * (longitude_delta_radians / 2.0).sin().powi(2);

    let angular_distance = 2.0 * half_chord.sqrt().asin();

    round_km(EARTH_MEAN_RADIUS_KM * angular_distance)
}

/// Redondeo estable a 3 decimales de kilómetro (contrato del índice Geo).
#[must_use]
pub fn round_km(raw_kilometers: f64) -> f64 {
    (raw_kilometers * 1000.0).round() / 1000.0
}
