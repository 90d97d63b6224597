// [libs/core/geo-engine/src/grid.rs]
/*!
 * =================================================================
 * APARATO: COMPANION GRID INDEX (V3.1 - DETERMINISTIC CELLS)
 * CLASIFICACIÓN: CORE GEODESY (ESTRATO L1)
 * RESPONSABILIDAD: PARTICIÓN DETERMINISTA DEL PLANO PARA EL LEDGER
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SPATIAL INDEX SURROGATE: libSQL no posee índice espacial nativo;
 *    cada escritura de ubicación sella su celda y cada consulta por
 *    radio enumera las celdas cobertoras para el pre-filtro indexado.
 * 2. WRITE-PATH COHERENCE: La celda se calcula en la misma transacción
 *    que la ubicación, cumpliendo la cota de reflejo de 2 segundos.
 * 3. DETERMINISM: La función celda(punto) es pura; dos procesos jamás
 *    discrepan sobre la partición del plano.
 *
 * # Mathematical Proof (Covering Completeness):
 * Las celdas cobertoras se enumeran sobre la caja delimitadora del
 * círculo de consulta. Caja ⊇ círculo y celdas ⊇ caja, por lo tanto
 * celdas ⊇ círculo: ningún worker dentro del radio escapa al pre-filtro.
 * =================================================================
 */

use crate::bounds::BoundingBox;
use crate::errors::GeoError;
use crate::point::GeoPoint;

/// Arista de celda en grados decimales (~5.5 km de latitud por celda).
pub const GRID_CELL_DEGREES: f64 = 0.05;

/// Sella el identificador de celda de retícula para un punto.
///
/// El identificador es estable y apto para columna TEXT indexada.
#[must_use]
pub fn cell_for_point(point: &GeoPoint) -> String {
    let latitude_cell_index = (point.latitude / GRID_CELL_DEGREES).floor() as i64;
    let longitude_cell_index = (point.longitude / GRID_CELL_DEGREES).floor() as i64;
    format!("g{}:{}", latitude_cell_index, longitude_cell_index)
}

/**
 * Enumera las celdas que cubren un círculo de consulta por radio.
 *
 * # Errors:
 * - `GeoError::DegenerateRadius` si el radio es negativo o no finito.
 *
 * # Performance:
 * O(celdas) en el área de la caja. Para el radio máximo de despacho
 * (50 km) el conteo queda acotado en unos cientos de celdas.
 */
pub fn covering_cells(center: &GeoPoint, radius_km: f64) -> Result<Vec<String>, GeoError> {
    let envelope = BoundingBox::around(center, radius_km)?;

    let min_latitude_index = (envelope.min_latitude / GRID_CELL_DEGREES).floor() as i64;
    let max_latitude_index = (envelope.max_latitude / GRID_CELL_DEGREES).floor() as i64;
    let min_longitude_index = (envelope.min_longitude / GRID_CELL_DEGREES).floor() as i64;
    let max_longitude_index = (envelope.max_longitude / GRID_CELL_DEGREES).floor() as i64;

    let mut covering_cell_identifiers = Vec::new();
    for latitude_index in min_latitude_index..=max_latitude_index {
        for longitude_index in min_longitude_index..=max_longitude_index {
            covering_cell_identifiers.push(format!("g{}:{}", latitude_index, longitude_index));
        }
    }

    Ok(covering_cell_identifiers)
}
