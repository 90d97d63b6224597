// [tests/mirror/libs/infra/db_turso/claim_race.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE CARRERA DE CLAIM (V5.1 - AT-MOST-ONE)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DEL SEMÁFORO ATÓMICO DE ASIGNACIÓN
 *
 * # Mathematical Proof (Mutual Exclusion):
 * El motor serializa escritores: de N claims concurrentes sobre la
 * misma tarea, exactamente uno observa 'pending' al sellar. El estado
 * post-carrera es la evidencia: una única asignación 'accepted' y el
 * worker de la tarea igual a su ganador.
 * =================================================================
 */

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;
use veloz_core_geo::point::GeoPoint;
use veloz_domain_models::{
    Allocation, AllocationStatus, Availability, ExpiryReason, PayoutMethod, SitePoint, Task,
    TaskStatus, TaskType, Worker, WorkerLifecycle, WorkerType,
};
use veloz_infra_db::repositories::{AllocationRepository, TaskRepository, WorkerRepository};
use veloz_infra_db::{DbError, TursoClient, UnitOfWork};

async fn forge_client(tag: &str) -> TursoClient {
    TursoClient::connect(&format!("file:{}?mode=memory&cache=shared", tag), None)
        .await
        .expect("CRITICAL_FAULT: failed to anchor in-memory tactical ledger")
}

fn forge_worker(tenant_id: Uuid, latitude: f64) -> Worker {
    let now = Utc::now();
    Worker {
        id: Uuid::new_v4(),
        tenant_id,
        user_id: Uuid::new_v4(),
        worker_type: WorkerType::Rider,
        lifecycle: WorkerLifecycle::Active,
        availability: Availability::Online,
        contact_phone: "+2348000000002".into(),
        location: Some(GeoPoint::new(latitude, 3.3792).expect("valid point")),
        last_location_at: Some(now),
        rating: 4.5,
        total_tasks: 0,
        completed_tasks: 0,
        max_concurrent_tasks: 3,
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

fn forge_task(tenant_id: Uuid) -> Task {
    let now = Utc::now();
    Task {
        id: Uuid::new_v4(),
        tenant_id,
        task_type: TaskType::Delivery,
        status: TaskStatus::Pending,
        priority: 0,
        assigned_worker_id: None,
        required_worker_type: WorkerType::Rider,
        required_skills: Vec::new(),
        zone_id: None,
        pickup: Some(SitePoint {
            point: GeoPoint::new(6.5250, 3.3800).expect("valid point"),
            address: "Race Junction".into(),
        }),
        delivery: Some(SitePoint {
            point: GeoPoint::new(6.5300, 3.3900).expect("valid point"),
            address: "Finish Line".into(),
        }),
        scheduled_at: None,
        deadline_at: None,
        estimated_duration_minutes: None,
        estimated_distance_km: None,
        actual_duration_minutes: None,
        actual_distance_km: None,
        base_pay: Decimal::new(800_000_000, 6),
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
    }
}

fn forge_offer(task_id: Uuid, worker_id: Uuid, distance_km: f64) -> Allocation {
    let now = Utc::now();
    Allocation {
        id: Uuid::new_v4(),
        task_id,
        worker_id,
        status: AllocationStatus::Offered,
        score: 0.7,
        distance_km,
        eta_minutes: 2.0,
        wave: 1,
        offered_at: now,
        expires_at: now + Duration::seconds(45),
        responded_at: None,
        reason: None,
        version: 1,
    }
}

#[tokio::test]
async fn certify_accept_race_resolves_to_single_winner() {
    let client = forge_client("mem_claim_race_v5").await;
    let workers = WorkerRepository::new(client.clone());
    let tasks = TaskRepository::new(client.clone());
    let allocations = AllocationRepository::new(client.clone());

    let tenant_id = Uuid::new_v4();
    let worker_b = forge_worker(tenant_id, 6.5190);
    let worker_c = forge_worker(tenant_id, 6.5310);
    let task = forge_task(tenant_id);

    workers.insert_worker(&worker_b).await.expect("enroll B");
    workers.insert_worker(&worker_c).await.expect("enroll C");
    tasks.insert_task(&task).await.expect("task genesis");

    let offer_b = forge_offer(task.id, worker_b.id, 0.8);
    let offer_c = forge_offer(task.id, worker_c.id, 0.8);
    allocations
        .insert_offer_wave(&[offer_b.clone(), offer_c.clone()])
        .await
        .expect("offer wave");

    // Carrera del escenario S2: B alcanza el semáforo 10 ms antes que C.
    // El motor serializa escritores, por lo que el orden de llegada al
    // commit decide; C re-verifica y encuentra la tarea ya reclamada.
    let uow_b = UnitOfWork::new(client.clone());
    let uow_c = UnitOfWork::new(client.clone());

    let verdict_b = uow_b
        .claim_task_for_worker(task.id, worker_b.id, offer_b.id, Utc::now())
        .await;
    let verdict_c = uow_c
        .claim_task_for_worker(task.id, worker_c.id, offer_c.id, Utc::now())
        .await;

    assert!(verdict_b.is_ok(), "first claim must win");
    match verdict_c {
        Err(DbError::TaskAlreadyAssigned) => {}
        other => panic!("loser must observe too_late, got {:?}", other.map(|_| ())),
    }

    // EVIDENCIA POST-CARRERA (la verdad vive en el Store):
    let final_task = tasks.fetch_task(task.id).await.expect("fetch task");
    assert_eq!(final_task.status, TaskStatus::Assigned);

    let winner_id = final_task
        .assigned_worker_id
        .expect("winner must be sealed on the task");

    let history = allocations.list_for_task(task.id).await.expect("history");
    let accepted: Vec<&Allocation> = history
        .iter()
        .filter(|allocation| allocation.status == AllocationStatus::Accepted)
        .collect();
    assert_eq!(accepted.len(), 1, "partial unique index: single accepted");
    assert_eq!(accepted[0].worker_id, winner_id);

    // La hermana perdedora quedó expirada con razón 'lost_race'.
    let losers: Vec<&Allocation> = history
        .iter()
        .filter(|allocation| allocation.status == AllocationStatus::Expired)
        .collect();
    assert_eq!(losers.len(), 1);
    assert_eq!(losers[0].reason, Some(ExpiryReason::LostRace));
}

#[tokio::test]
async fn certify_late_accept_after_cancel_sees_too_late() {
    let client = forge_client("mem_claim_late_v5").await;
    let workers = WorkerRepository::new(client.clone());
    let tasks = TaskRepository::new(client.clone());
    let allocations = AllocationRepository::new(client.clone());
    let unit_of_work = UnitOfWork::new(client.clone());

    let tenant_id = Uuid::new_v4();
    let worker = forge_worker(tenant_id, 6.5244);
    let task = forge_task(tenant_id);

    workers.insert_worker(&worker).await.expect("enroll");
    tasks.insert_task(&task).await.expect("task genesis");

    let offer = forge_offer(task.id, worker.id, 1.1);
    allocations
        .insert_offer_wave(std::slice::from_ref(&offer))
        .await
        .expect("offer wave");

    // Cancelación sincrónica: al retornar, todo accept posterior es tardío.
    unit_of_work
        .cancel_task_and_release(task.id, "upstream_order_voided", Utc::now())
        .await
        .expect("cancellation");

    let late_verdict = unit_of_work
        .claim_task_for_worker(task.id, worker.id, offer.id, Utc::now())
        .await;
    assert!(matches!(late_verdict, Err(DbError::TaskAlreadyAssigned)));
}
