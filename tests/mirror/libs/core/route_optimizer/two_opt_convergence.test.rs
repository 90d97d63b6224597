// [tests/mirror/libs/core/route_optimizer/two_opt_convergence.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE CONVERGENCIA 2-OPT (V3.1 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L1-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DEL ORDENAMIENTO BAJO PRESUPUESTO
 *
 * # Mathematical Proof (Monotone Improvement):
 * Todo intercambio aceptado reduce la distancia; por inducción la
 * distancia final es <= a la greedy y el score habita [0,1].
 * =================================================================
 */

use std::time::{Duration, Instant};

use veloz_core_routing::{plan_route, DEFAULT_OPTIMIZATION_BUDGET};
use veloz_core_geo::point::GeoPoint;

fn point(latitude: f64, longitude: f64) -> GeoPoint {
    GeoPoint::new(latitude, longitude).expect("CRITICAL_FAULT: invalid stop coordinate")
}

#[test]
fn certify_crossing_route_is_untangled() {
    // Cuatro paradas dispuestas para que el orden ingenuo se cruce:
    // el plan final jamás empeora a la siembra greedy.
    let start = point(6.50, 3.30);
    let stops = vec![
        point(6.60, 3.40),
        point(6.50, 3.41),
        point(6.60, 3.30),
        point(6.51, 3.31),
    ];

    let plan = plan_route(&start, &stops, DEFAULT_OPTIMIZATION_BUDGET);

    assert_eq!(plan.visit_order.len(), stops.len());
    assert!(plan.total_distance_km <= plan.greedy_distance_km + 0.001);
    assert!((0.0..=1.0).contains(&plan.optimization_score));
}

#[test]
fn certify_permutation_integrity() {
    let start = point(9.0765, 7.3986);
    let stops: Vec<GeoPoint> = (0..8)
        .map(|index| point(9.05 + 0.01 * index as f64, 7.40 - 0.008 * index as f64))
        .collect();

    let plan = plan_route(&start, &stops, DEFAULT_OPTIMIZATION_BUDGET);

    // El orden de visita es una permutación exacta de los índices.
    let mut sorted_order = plan.visit_order.clone();
    sorted_order.sort_unstable();
    assert_eq!(sorted_order, (0..stops.len()).collect::<Vec<usize>>());

    // Las piernas acompañan al orden y suman la distancia total.
    assert_eq!(plan.leg_distances_km.len(), stops.len());
    let leg_sum: f64 = plan.leg_distances_km.iter().sum();
    assert!((leg_sum - plan.total_distance_km).abs() < 0.01);
}

#[test]
fn certify_wall_time_budget_is_honored() {
    // Colección adversarial amplia: el presupuesto corto debe cortar
    // el refinamiento sin degradar el plan por debajo del greedy.
    let start = point(6.45, 3.40);
    let stops: Vec<GeoPoint> = (0..40)
        .map(|index| {
            let angle = index as f64 * 0.37;
            point(6.45 + 0.05 * angle.sin(), 3.40 + 0.05 * angle.cos())
        })
        .collect();

    let clock_start = Instant::now();
    let plan = plan_route(&start, &stops, Duration::from_millis(50));
    let elapsed = clock_start.elapsed();

    assert!(
        elapsed < Duration::from_millis(500),
        "optimization escaped its budget: {:?}",
        elapsed
    );
    assert!(plan.total_distance_km <= plan.greedy_distance_km + 0.001);
}

#[test]
fn certify_empty_and_single_stop_degenerate_cases() {
    let start = point(6.50, 3.30);

    let empty_plan = plan_route(&start, &[], DEFAULT_OPTIMIZATION_BUDGET);
    assert!(empty_plan.visit_order.is_empty());
    assert_eq!(empty_plan.optimization_score, 0.0);

    let single_plan = plan_route(&start, &[point(6.51, 3.31)], DEFAULT_OPTIMIZATION_BUDGET);
    assert_eq!(single_plan.visit_order, vec![0]);
}
