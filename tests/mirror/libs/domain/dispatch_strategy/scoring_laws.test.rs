// [tests/mirror/libs/domain/dispatch_strategy/scoring_laws.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE LEYES DE PUNTUACIÓN (V5.0 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L2-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DE LA MEZCLA, COTAS Y DESEMPATE TOTAL
 *
 * # Mathematical Proof (Score Bounds):
 * Términos aditivos en [0,1] con pesos que suman 1 y presión que resta
 * a lo sumo w_p: el score habita [-w_p, 1] para toda instantánea.
 * =================================================================
 */

use chrono::{Duration, Utc};
use proptest::prelude::*;
use uuid::Uuid;
use veloz_domain_dispatch::scoring::{
    deadline_pressure, freshness_tier, rank_candidates, score_candidate, CandidateSnapshot,
    ScoringContext, ScoringWeights,
};

fn snapshot(distance_km: f64, rating: f64, load: i64, age_seconds: i64) -> CandidateSnapshot {
    CandidateSnapshot {
        worker_id: Uuid::new_v4(),
        distance_km,
        rating,
        current_load: load,
        max_concurrent: 3,
        location_age_seconds: age_seconds,
        speed_kmh: 25.0,
    }
}

fn context(radius_km: f64) -> ScoringContext {
    ScoringContext {
        radius_km,
        deadline_at: None,
        now: Utc::now(),
        pressure_window_minutes: 60,
        full_freshness_seconds: 5 * 60,
        stale_freshness_seconds: 15 * 60,
    }
}

#[test]
fn certify_default_weights_sum_to_unity() {
    let weights = ScoringWeights::default();
    let additive_sum = weights.distance + weights.rating + weights.load + weights.freshness;
    assert!((additive_sum + weights.deadline_pressure - 1.0).abs() < 1e-9);
    assert_eq!(weights.distance, 0.45);
    assert_eq!(weights.deadline_pressure, 0.10);
}

#[test]
fn certify_freshness_tiers_follow_tuning_windows() {
    assert_eq!(freshness_tier(0, 300, 900), 1.0);
    assert_eq!(freshness_tier(299, 300, 900), 1.0);
    assert_eq!(freshness_tier(300, 300, 900), 0.5);
    assert_eq!(freshness_tier(899, 300, 900), 0.5);
    assert_eq!(freshness_tier(900, 300, 900), 0.0);

    // Tenant con ventanas ensanchadas: los tramos acompañan al tuning.
    assert_eq!(freshness_tier(480, 600, 1800), 1.0);
    assert_eq!(freshness_tier(1200, 600, 1800), 0.5);
    assert_eq!(freshness_tier(1800, 600, 1800), 0.0);
}

#[test]
fn certify_deadline_pressure_saturation() {
    let mut ctx = context(5.0);
    assert_eq!(deadline_pressure(&ctx), 0.0);

    ctx.deadline_at = Some(ctx.now + Duration::minutes(120));
    assert_eq!(deadline_pressure(&ctx), 0.0);

    ctx.deadline_at = Some(ctx.now + Duration::minutes(30));
    let mid_pressure = deadline_pressure(&ctx);
    assert!(mid_pressure > 0.4 && mid_pressure < 0.6, "pressure {}", mid_pressure);

    ctx.deadline_at = Some(ctx.now - Duration::minutes(1));
    assert_eq!(deadline_pressure(&ctx), 1.0);
}

#[test]
fn certify_tie_break_is_total_and_deterministic() {
    // Perfiles idénticos: el desempate cae a distancia y luego a id.
    let near = snapshot(0.8, 4.5, 0, 60);
    let far = snapshot(3.0, 4.5, 0, 60);

    let ranked = rank_candidates(
        vec![far.clone(), near.clone()],
        &context(5.0),
        &ScoringWeights::default(),
        2,
    );
    assert_eq!(ranked[0].snapshot.worker_id, near.worker_id);

    // Misma distancia exacta: gana el identificador menor.
    let twin_a = snapshot(1.0, 4.0, 1, 60);
    let twin_b = snapshot(1.0, 4.0, 1, 60);
    let expected_first = twin_a.worker_id.min(twin_b.worker_id);

    let ranked_twins = rank_candidates(
        vec![twin_a, twin_b],
        &context(5.0),
        &ScoringWeights::default(),
        2,
    );
    assert_eq!(ranked_twins[0].snapshot.worker_id, expected_first);
}

#[test]
fn certify_wave_size_truncation() {
    let pool: Vec<CandidateSnapshot> = (0..10)
        .map(|index| snapshot(0.5 + index as f64 * 0.3, 4.0, 0, 60))
        .collect();
    let ranked = rank_candidates(pool, &context(5.0), &ScoringWeights::default(), 3);
    assert_eq!(ranked.len(), 3);
}

proptest! {
    /// Propiedad: el score habita [-w_p, 1] para toda instantánea válida.
    #[test]
    fn score_bounds_hold(
        distance in 0.0_f64..60.0,
        rating in 0.0_f64..5.0,
        load in 0_i64..10,
        age in 0_i64..7200,
        radius in 1.0_f64..50.0,
    ) {
        let weights = ScoringWeights::default();
        let mut candidate = snapshot(distance, rating, load, age);
        candidate.max_concurrent = 10;

        let mut ctx = context(radius);
        ctx.deadline_at = Some(ctx.now + Duration::minutes(5));

        let score = score_candidate(&candidate, &ctx, &weights);
        prop_assert!(score <= 1.0 + 1e-9);
        prop_assert!(score >= -weights.deadline_pressure - 1e-9);
    }

    /// Propiedad: acercar un candidato jamás reduce su score.
    #[test]
    fn proximity_monotonicity(
        base_distance in 1.0_f64..20.0,
        improvement in 0.1_f64..0.9,
    ) {
        let weights = ScoringWeights::default();
        let ctx = context(50.0);

        let far = snapshot(base_distance, 4.0, 1, 60);
        let mut near = far.clone();
        near.distance_km = base_distance * (1.0 - improvement);

        let far_score = score_candidate(&far, &ctx, &weights);
        let near_score = score_candidate(&near, &ctx, &weights);
        prop_assert!(near_score >= far_score - 1e-12);
    }
}
