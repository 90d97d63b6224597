// [tests/mirror/libs/core/geo_engine/grid_cell_coverage.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE COBERTURA DE RETÍCULA (V3.0 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L1-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DEL ÍNDICE ESPACIAL DE COMPAÑÍA
 *
 * # Mathematical Proof (Covering Completeness):
 * celdas(caja) ⊇ caja ⊇ círculo; por lo tanto ningún punto dentro del
 * radio puede habitar una celda fuera de la cobertura enumerada.
 * =================================================================
 */

use proptest::prelude::*;
use veloz_core_geo::grid::{cell_for_point, covering_cells, GRID_CELL_DEGREES};
use veloz_core_geo::point::GeoPoint;

#[test]
fn certify_cell_determinism_across_boundaries() {
    let just_below = GeoPoint::new(GRID_CELL_DEGREES - 1e-9, 0.0).expect("valid point");
    let just_above = GeoPoint::new(GRID_CELL_DEGREES + 1e-9, 0.0).expect("valid point");
    assert_ne!(cell_for_point(&just_below), cell_for_point(&just_above));
}

#[test]
fn certify_negative_coordinates_have_own_cells() {
    let south_west = GeoPoint::new(-6.5244, -3.3792).expect("valid point");
    let north_east = GeoPoint::new(6.5244, 3.3792).expect("valid point");
    assert_ne!(cell_for_point(&south_west), cell_for_point(&north_east));
}

#[test]
fn certify_degenerate_radius_is_rejected() {
    let center = GeoPoint::new(6.5244, 3.3792).expect("valid point");
    assert!(covering_cells(&center, f64::NAN).is_err());
    assert!(covering_cells(&center, -5.0).is_err());
}

proptest! {
    /// Propiedad: todo punto dentro del radio habita una celda cubierta.
    #[test]
    fn covering_cells_capture_interior_points(
        center_lat in -60.0_f64..60.0,
        center_lng in -170.0_f64..170.0,
        bearing in 0.0_f64..std::f64::consts::TAU,
        fraction in 0.0_f64..0.95,
    ) {
        let radius_km = 10.0;
        let center = GeoPoint::new(center_lat, center_lng).expect("valid center");

        let probe_distance = radius_km * fraction;
        let delta_latitude = (probe_distance / 110.574) * bearing.cos();
        let latitude_cosine = center_lat.to_radians().cos().abs().max(0.01);
        let delta_longitude = (probe_distance / (111.320 * latitude_cosine)) * bearing.sin();

        let probe_latitude = (center_lat + delta_latitude).clamp(-90.0, 90.0);
        let probe_longitude = (center_lng + delta_longitude).clamp(-180.0, 180.0);
        let probe = GeoPoint::new(probe_latitude, probe_longitude).expect("valid probe");

        let cells = covering_cells(&center, radius_km).expect("valid covering");
        prop_assert!(cells.contains(&cell_for_point(&probe)));
    }
}
