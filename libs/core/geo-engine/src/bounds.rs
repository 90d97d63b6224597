// [libs/core/geo-engine/src/bounds.rs]
/*!
 * =================================================================
 * APARATO: RADIUS BOUNDING ENGINE (V2.3 - PRE-FILTER SEALED)
 * CLASIFICACIÓN: CORE GEODESY (ESTRATO L1)
 * RESPONSABILIDAD: CAJAS DELIMITADORAS PARA CONSULTAS POR RADIO
 *
 * # Mathematical Proof (Superset Guarantee):
 * La caja se construye con los deltas angulares máximos del radio, por
 * lo que todo punto a distancia <= radio queda dentro de la caja. El
 * refinamiento Haversine posterior elimina los falsos positivos de las
 * esquinas; jamás se pierde un candidato legítimo.
 * =================================================================
 */

use crate::errors::GeoError;
use crate::point::GeoPoint;

/// Kilómetros por grado de latitud (constante sobre la esfera media).
const KM_PER_LATITUDE_DEGREE: f64 = 110.574;

/// Kilómetros por grado de longitud en el ecuador.
const KM_PER_LONGITUDE_DEGREE_EQUATOR: f64 = 111.320;

/// Caja delimitadora alineada a meridianos para pre-filtrado SQL.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Latitud mínima (sur).
    pub min_latitude: f64,
    /// Latitud máxima (norte).
    pub max_latitude: f64,
    /// Longitud mínima (oeste).
    pub min_longitude: f64,
    /// Longitud máxima (este).
    pub max_longitude: f64,
}

impl BoundingBox {
    /**
     * Construye la caja que envuelve un círculo de radio dado.
     *
     * # Errors:
     * - `GeoError::DegenerateRadius` si el radio es negativo o no finito.
     */
    pub fn around(center: &GeoPoint, radius_km: f64) -> Result<Self, GeoError> {
        if !radius_km.is_finite() || radius_km < 0.0 {
            return Err(GeoError::DegenerateRadius(radius_km));
        }

        let latitude_delta_degrees = radius_km / KM_PER_LATITUDE_DEGREE;

        // El coseno se acota para no degenerar cerca de los polos.
        let latitude_cosine = center.latitude.to_radians().cos().abs().max(0.01);
        let longitude_delta_degrees =
            radius_km / (KM_PER_LONGITUDE_DEGREE_EQUATOR * latitude_cosine);

        Ok(Self {
            min_latitude: (center.latitude - latitude_delta_degrees).max(-90.0),
            max_latitude: (center.latitude + latitude_delta_degrees).min(90.0),
            min_longitude: (center.longitude - longitude_delta_degrees).max(-180.0),
            max_longitude: (center.longitude + longitude_delta_degrees).min(180.0),
        })
    }

    /// Evalúa la pertenencia de un punto a la caja (pre-filtro, no veredicto).
    #[must_use]
    pub fn contains(&self, point: &GeoPoint) -> bool {
        point.latitude >= self.min_latitude
            && point.latitude <= self.max_latitude
            && point.longitude >= self.min_longitude
            && point.longitude <= self.max_longitude
    }
}
