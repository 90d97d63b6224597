// [tests/mirror/libs/infra/db_turso/nearby_workers.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE CONSULTA ESPACIAL (V5.0 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DEL ÍNDICE GEO: ORDEN, RADIO Y FILTROS
 * =================================================================
 */

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;
use veloz_core_geo::point::GeoPoint;
use veloz_domain_models::{
    Availability, PayoutMethod, SitePoint, Task, TaskStatus, TaskType, Worker, WorkerLifecycle,
    WorkerType,
};
use veloz_infra_db::repositories::{TaskRepository, WorkerRepository};
use veloz_infra_db::TursoClient;

async fn forge_client(tag: &str) -> TursoClient {
    TursoClient::connect(&format!("file:{}?mode=memory&cache=shared", tag), None)
        .await
        .expect("CRITICAL_FAULT: failed to anchor in-memory tactical ledger")
}

fn forge_worker(
    tenant_id: Uuid,
    worker_type: WorkerType,
    lifecycle: WorkerLifecycle,
    availability: Availability,
    latitude: f64,
    longitude: f64,
) -> Worker {
    let now = Utc::now();
    Worker {
        id: Uuid::new_v4(),
        tenant_id,
        user_id: Uuid::new_v4(),
        worker_type,
        lifecycle,
        availability,
        contact_phone: "+2348000000006".into(),
        location: Some(GeoPoint::new(latitude, longitude).expect("valid point")),
        last_location_at: Some(now),
        rating: 4.0,
        total_tasks: 0,
        completed_tasks: 0,
        max_concurrent_tasks: 1,
        zones: Vec::new(),
        skills: Vec::new(),
        vehicle: None,
        payout_method: PayoutMethod::Wallet,
        payout_target: None,
        version: 1,
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn certify_radius_ordering_and_eligibility() {
    let client = forge_client("mem_nearby_v5").await;
    let workers = WorkerRepository::new(client.clone());

    let tenant_id = Uuid::new_v4();
    let center = GeoPoint::new(6.5244, 3.3792).expect("valid point");

    // ~1.2 km al norte, ~3.4 km al norte, ~12 km al norte.
    let near = forge_worker(
        tenant_id, WorkerType::Rider, WorkerLifecycle::Active, Availability::Online,
        6.5352, 3.3792,
    );
    let mid = forge_worker(
        tenant_id, WorkerType::Rider, WorkerLifecycle::Active, Availability::Busy,
        6.5550, 3.3792,
    );
    let far = forge_worker(
        tenant_id, WorkerType::Rider, WorkerLifecycle::Active, Availability::Online,
        6.6330, 3.3792,
    );
    // Ruido no-elegible: offline, suspendido, tipo equivocado, otro tenant.
    let offline = forge_worker(
        tenant_id, WorkerType::Rider, WorkerLifecycle::Active, Availability::Offline,
        6.5250, 3.3792,
    );
    let suspended = forge_worker(
        tenant_id, WorkerType::Rider, WorkerLifecycle::Suspended, Availability::Online,
        6.5250, 3.3795,
    );
    let wrong_type = forge_worker(
        tenant_id, WorkerType::Warehouse, WorkerLifecycle::Active, Availability::Online,
        6.5250, 3.3798,
    );
    let foreign = forge_worker(
        Uuid::new_v4(), WorkerType::Rider, WorkerLifecycle::Active, Availability::Online,
        6.5250, 3.3801,
    );

    for unit in [&near, &mid, &far, &offline, &suspended, &wrong_type, &foreign] {
        workers.insert_worker(unit).await.expect("enroll unit");
    }

    // Radio 5 km: near y mid entran; far queda fuera; el ruido jamás.
    let within_five = workers
        .find_nearby_candidates(tenant_id, &center, 5.0, WorkerType::Rider, 10)
        .await
        .expect("spatial read");
    let within_ids: Vec<Uuid> = within_five.iter().map(|hit| hit.worker.id).collect();
    assert_eq!(within_ids, vec![near.id, mid.id], "ascending by distance");
    assert!(within_five[0].distance_km < within_five[1].distance_km);

    // Radio 20 km: far aparece al final del ordenamiento.
    let within_twenty = workers
        .find_nearby_candidates(tenant_id, &center, 20.0, WorkerType::Rider, 10)
        .await
        .expect("spatial read");
    let wide_ids: Vec<Uuid> = within_twenty.iter().map(|hit| hit.worker.id).collect();
    assert_eq!(wide_ids, vec![near.id, mid.id, far.id]);
}

#[tokio::test]
async fn certify_capacity_saturated_workers_are_filtered() {
    let client = forge_client("mem_nearby_capacity_v5").await;
    let workers = WorkerRepository::new(client.clone());
    let tasks = TaskRepository::new(client.clone());

    let tenant_id = Uuid::new_v4();
    let center = GeoPoint::new(9.0765, 7.3986).expect("valid point");

    let saturated = forge_worker(
        tenant_id, WorkerType::Rider, WorkerLifecycle::Active, Availability::Busy,
        9.0800, 7.3986,
    );
    let free = forge_worker(
        tenant_id, WorkerType::Rider, WorkerLifecycle::Active, Availability::Online,
        9.0850, 7.3986,
    );
    workers.insert_worker(&saturated).await.expect("enroll saturated");
    workers.insert_worker(&free).await.expect("enroll free");

    // Una tarea asignada satura al worker de tope 1.
    let now = Utc::now();
    let holding_task = Task {
        id: Uuid::new_v4(),
        tenant_id,
        task_type: TaskType::Delivery,
        status: TaskStatus::Accepted,
        priority: 0,
        assigned_worker_id: Some(saturated.id),
        required_worker_type: WorkerType::Rider,
        required_skills: Vec::new(),
        zone_id: None,
        pickup: Some(SitePoint {
            point: center,
            address: "Holding origin".into(),
        }),
        delivery: Some(SitePoint {
            point: GeoPoint::new(9.0900, 7.4000).expect("valid point"),
            address: "Holding target".into(),
        }),
        scheduled_at: None,
        deadline_at: None,
        estimated_duration_minutes: None,
        estimated_distance_km: None,
        actual_duration_minutes: None,
        actual_distance_km: None,
        base_pay: Decimal::new(500_000_000, 6),
        bonus_pay: Decimal::ZERO,
        tip_amount: Decimal::ZERO,
        currency: "NGN".into(),
        required_proof_types: Vec::new(),
        proofs: Vec::new(),
        order_reference: None,
        metadata: serde_json::Value::Null,
        escalated_at: None,
        started_at: None,
        completed_at: None,
        termination_reason: None,
        version: 1,
        created_at: now,
        updated_at: now,
    };
    tasks.insert_task(&holding_task).await.expect("holding task");

    let candidates = workers
        .find_nearby_candidates(tenant_id, &center, 10.0, WorkerType::Rider, 10)
        .await
        .expect("spatial read");

    let candidate_ids: Vec<Uuid> = candidates.iter().map(|hit| hit.worker.id).collect();
    assert_eq!(candidate_ids, vec![free.id], "saturated unit must be excluded");
    assert_eq!(candidates[0].current_load, 0);
}
