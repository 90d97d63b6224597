// [tests/mirror/libs/infra/rail_client/sandbox_idempotency.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DEL RAIL SANDBOX (V3.0 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DEL MODO SANDBOX Y SUS ACUSES
 * =================================================================
 */

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;
use veloz_domain_models::{Payout, PayoutMethod, PayoutStatus};
use veloz_infra_rail::RailClient;

fn forge_payout(reference: &str) -> Payout {
    Payout {
        id: Uuid::new_v4(),
        tenant_id: Uuid::new_v4(),
        worker_id: Uuid::new_v4(),
        amount: "42000.000000".parse::<Decimal>().expect("decimal"),
        currency: "NGN".into(),
        status: PayoutStatus::Pending,
        method: PayoutMethod::MobileMoney,
        target_account: Some("+2348000000007".into()),
        reference: reference.to_string(),
        provider_reference: None,
        failure_reason: None,
        processed_at: None,
        version: 1,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn certify_sandbox_acknowledgement_is_deterministic() {
    let rail = RailClient::new(None, None);
    assert!(rail.is_sandbox());

    let payout = forge_payout("PB-20260801-abcd1234-efgh5678");

    // La re-transmisión de la MISMA instrucción produce el MISMO acuse:
    // la clave de idempotencia es la referencia local.
    let first = rail
        .submit_instruction(&payout)
        .await
        .expect("sandbox acknowledgement");
    let second = rail
        .submit_instruction(&payout)
        .await
        .expect("sandbox re-acknowledgement");
    assert_eq!(first.provider_reference, second.provider_reference);
    assert_eq!(
        first.provider_reference,
        format!("SBX-{}", payout.reference)
    );
}

#[tokio::test]
async fn certify_sandbox_poll_reports_transit() {
    let rail = RailClient::new(None, None);

    // En sandbox el veredicto llega por callback; el sondeo reporta tránsito.
    let report = rail
        .fetch_status("SBX-PB-20260801-abcd1234-efgh5678")
        .await
        .expect("sandbox status");
    assert_eq!(report.status, "processing");
    assert!(report.failure_reason.is_none());
}

#[tokio::test]
async fn certify_distinct_references_yield_distinct_acknowledgements() {
    let rail = RailClient::new(None, None);

    let first = rail
        .submit_instruction(&forge_payout("PB-20260801-one"))
        .await
        .expect("first ack");
    let second = rail
        .submit_instruction(&forge_payout("PB-20260801-two"))
        .await
        .expect("second ack");
    assert_ne!(first.provider_reference, second.provider_reference);
}
