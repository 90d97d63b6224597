// [libs/domain/models-rs/src/tests_serialization.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE PARIDAD DE SERIALIZACIÓN (V2.0 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L2-MODELS
 * RESPONSABILIDAD: AUDITORÍA DEL CONTRATO JSON DE LOS MODELOS
 *
 * # Mathematical Proof (Wire Stability):
 * Los enums viajan en snake_case y los importes como cadenas decimales.
 * Cualquier deriva en el contrato rompe a los clientes del Dashboard y
 * a los workers móviles; este certificador la detecta en la puerta.
 * =================================================================
 */

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;
use veloz_core_geo::point::GeoPoint;
use veloz_domain_models::*;

fn sample_draft() -> TaskDraft {
    TaskDraft {
        task_type: TaskType::Delivery,
        priority: 5,
        required_worker_type: WorkerType::Rider,
        required_skills: vec!["cold_chain".into()],
        zone_id: Some("lagos-mainland".into()),
        pickup: Some(SitePoint {
            point: GeoPoint::new(6.5250, 3.3800).expect("valid point"),
            address: "12 Broad Street, Lagos".into(),
        }),
        delivery: Some(SitePoint {
            point: GeoPoint::new(6.5300, 3.3900).expect("valid point"),
            address: "3 Marina Road, Lagos".into(),
        }),
        scheduled_at: None,
        deadline_at: None,
        estimated_duration_minutes: Some(25),
        estimated_distance_km: Some(1.4),
        base_pay: "1500.000000".parse::<Decimal>().expect("decimal"),
        bonus_pay: Decimal::ZERO,
        currency: "NGN".into(),
        required_proof_types: vec![ProofType::Photo],
        order_reference: Some("ORD-88412".into()),
        metadata: serde_json::json!({ "package_count": 2 }),
    }
}

#[test]
fn enums_travel_in_snake_case() {
    assert_eq!(
        serde_json::to_string(&TaskStatus::InProgress).expect("serialize"),
        "\"in_progress\""
    );
    assert_eq!(
        serde_json::to_string(&WorkerType::SalesRep).expect("serialize"),
        "\"sales_rep\""
    );
    assert_eq!(
        serde_json::to_string(&ExpiryReason::LostRace).expect("serialize"),
        "\"lost_race\""
    );
    assert_eq!(
        serde_json::to_string(&PayoutMethod::MobileMoney).expect("serialize"),
        "\"mobile_money\""
    );
}

#[test]
fn monetary_fields_travel_as_decimal_strings() {
    let draft = sample_draft();
    let encoded = serde_json::to_value(&draft).expect("serialize draft");
    assert_eq!(encoded["base_pay"], serde_json::json!("1500.000000"));

    let decoded: TaskDraft = serde_json::from_value(encoded).expect("decode draft");
    assert_eq!(decoded.base_pay, draft.base_pay);
}

#[test]
fn textual_forms_round_trip_through_parse() {
    for status in [
        TaskStatus::Pending,
        TaskStatus::Assigned,
        TaskStatus::Accepted,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Failed,
        TaskStatus::Cancelled,
    ] {
        assert_eq!(TaskStatus::parse(status.as_str()).expect("parse"), status);
    }

    for reason in [
        ExpiryReason::LostRace,
        ExpiryReason::CapacityReached,
        ExpiryReason::OfferTimeout,
        ExpiryReason::TaskCancelled,
        ExpiryReason::WorkerRejected,
    ] {
        assert_eq!(ExpiryReason::parse(reason.as_str()).expect("parse"), reason);
    }

    assert!(TaskStatus::parse("warp_speed").is_err());
}

#[test]
fn draft_validation_enforces_type_driven_locations() {
    let mut draft = sample_draft();
    draft.delivery = None;
    assert!(matches!(
        draft.validate(),
        Err(DomainError::LocationRequired("delivery"))
    ));

    draft.task_type = TaskType::SalesVisit;
    assert!(draft.validate().is_ok());

    draft.pickup = None;
    assert!(matches!(
        draft.validate(),
        Err(DomainError::LocationRequired("pickup"))
    ));
}

#[test]
fn allocation_liveness_respects_wall_clock() {
    let now = Utc::now();
    let allocation = Allocation {
        id: Uuid::new_v4(),
        task_id: Uuid::new_v4(),
        worker_id: Uuid::new_v4(),
        status: AllocationStatus::Offered,
        score: 0.82,
        distance_km: 0.8,
        eta_minutes: 2.0,
        wave: 1,
        offered_at: now,
        expires_at: now + chrono::Duration::seconds(45),
        responded_at: None,
        reason: None,
        version: 1,
    };

    assert!(allocation.is_open_at(now + chrono::Duration::seconds(44)));
    assert!(!allocation.is_open_at(now + chrono::Duration::seconds(46)));
}
