// [tests/mirror/libs/core/geo_engine/haversine_integrity.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE INTEGRIDAD GEODÉSICA (V4.0 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L1-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DE LA FÓRMULA DE GRAN CÍRCULO WGS-84
 *
 * # Mathematical Proof (Formula Fidelity):
 * Las distancias de referencia provienen de pares de coordenadas
 * urbanas conocidas; la tolerancia refleja el redondeo contractual a
 * 3 decimales de kilómetro.
 * =================================================================
 */

use veloz_core_geo::bounds::BoundingBox;
use veloz_core_geo::point::{haversine_distance_km, GeoPoint};

fn point(latitude: f64, longitude: f64) -> GeoPoint {
    GeoPoint::new(latitude, longitude).expect("CRITICAL_FAULT: invalid reference coordinate")
}

#[test]
fn certify_known_urban_distances() {
    // Lagos Island -> Ikeja: ~17.1 km de gran círculo.
    let lagos_island = point(6.4541, 3.3947);
    let ikeja = point(6.6018, 3.3515);
    let measured = haversine_distance_km(&lagos_island, &ikeja);
    assert!(
        (measured - 17.1).abs() < 0.5,
        "distance out of reference band: {}",
        measured
    );

    // Simetría bit-perfecta.
    assert_eq!(measured, haversine_distance_km(&ikeja, &lagos_island));
}

#[test]
fn certify_three_decimal_rounding_stability() {
    let origin = point(6.5244, 3.3792);
    let target = point(6.5250, 3.3800);
    let measured = haversine_distance_km(&origin, &target);

    // El contrato exige exactamente 3 decimales estables.
    let rescaled = (measured * 1000.0).round() / 1000.0;
    assert_eq!(measured, rescaled);
    assert!(measured < 0.2, "sub-200m pair measured at {}", measured);
}

#[test]
fn certify_short_distance_precision() {
    // ~111 metros por 0.001 grados de latitud sobre el ecuador local.
    let base = point(0.0, 0.0);
    let north = point(0.001, 0.0);
    let measured = haversine_distance_km(&base, &north);
    assert!((measured - 0.111).abs() <= 0.001, "measured {}", measured);
}

#[test]
fn certify_bounding_box_never_excludes_radius() {
    let center = point(9.0765, 7.3986);
    let envelope = BoundingBox::around(&center, 20.0).expect("valid radius");

    // Muestreo de la circunferencia interior: todo punto a <= 20 km
    // debe caer dentro de la caja (la caja es superconjunto del círculo).
    for step in 0..12 {
        let bearing_radians = (step as f64) * std::f64::consts::TAU / 12.0;
        let delta_latitude = (19.0 / 110.574) * bearing_radians.cos();
        let delta_longitude =
            (19.0 / (111.320 * center.latitude.to_radians().cos())) * bearing_radians.sin();
        let rim_point = point(
            center.latitude + delta_latitude,
            center.longitude + delta_longitude,
        );
        assert!(
            envelope.contains(&rim_point),
            "rim point escaped the envelope at bearing step {}",
            step
        );
    }
}
