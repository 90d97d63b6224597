// [tests/mirror/integration/end_to_end_settlement.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR INTEGRAL DE DESPACHO Y LIQUIDACIÓN (V5.2)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO INTEGRAL
 * RESPONSABILIDAD: AUDITORÍA DEL CAMINO COMPLETO (ESCENARIO S1)
 *
 * # Mathematical Proof (End-To-End Conservation):
 * Desde el registro de la unidad hasta el veredicto del rail, cada
 * estrato preserva los invariantes: at-most-one en el claim, líneas
 * del Ledger atadas al cierre, y conservación tras la liquidación.
 * =================================================================
 */

use std::sync::{Arc, RwLock};

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use uuid::Uuid;
use veloz_core_geo::point::GeoPoint;
use veloz_domain_dispatch::DispatchTuning;
use veloz_domain_ledger::verify_conservation;
use veloz_domain_models::{
    Availability, PayoutMethod, PayoutStatus, ProofType, SitePoint, TaskDraft, TaskStatus,
    TaskType, WorkerLifecycle, WorkerType,
};
use veloz_infra_db::repositories::{
    AllocationRepository, EarningRepository, PayoutRepository, RouteRepository, TaskRepository,
    WorkerRepository,
};
use veloz_infra_db::{DbError, TursoClient, UnitOfWork};
use veloz_infra_rail::RailClient;
use veloz_orchestrator::engine::task_manager::{CompletionDraft, ProofDraft};
use veloz_orchestrator::engine::{dispatcher, registry, task_manager};
use veloz_orchestrator::services::event_bus::EventBus;
use veloz_orchestrator::services::payout_scheduler::run_payout_cycle;
use veloz_orchestrator::state::{AppState, AuthTokens, DispatchCommand, SystemMode};

fn dec(literal: &str) -> Decimal {
    literal.parse().expect("CRITICAL_FAULT: invalid decimal literal")
}

async fn forge_state(tag: &str) -> (AppState, mpsc::Receiver<DispatchCommand>) {
    let client = TursoClient::connect(&format!("file:{}?mode=memory&cache=shared", tag), None)
        .await
        .expect("CRITICAL_FAULT: failed to anchor in-memory tactical ledger");
    let (dispatch_sender, dispatch_receiver) = mpsc::channel(64);

    let state = AppState {
        database_client: client.clone(),
        workers: Arc::new(WorkerRepository::new(client.clone())),
        tasks: Arc::new(TaskRepository::new(client.clone())),
        allocations: Arc::new(AllocationRepository::new(client.clone())),
        earnings: Arc::new(EarningRepository::new(client.clone())),
        payouts: Arc::new(PayoutRepository::new(client.clone())),
        routes: Arc::new(RouteRepository::new(client.clone())),
        unit_of_work: Arc::new(UnitOfWork::new(client.clone())),
        rail_client: Arc::new(RailClient::new(None, None)),
        event_bus: Arc::new(EventBus::new()),
        dispatch_queue: dispatch_sender,
        tuning: Arc::new(DispatchTuning::default()),
        minimum_payout_amount: dec("1000.000000"),
        current_system_mode: Arc::new(RwLock::new(SystemMode::Operational)),
        authentication: Arc::new(AuthTokens {
            operator: "operator-token".into(),
            worker: "worker-token".into(),
        }),
    };
    (state, dispatch_receiver)
}

#[tokio::test]
async fn certify_happy_path_delivery_settles_end_to_end() {
    let (state, mut queue) = forge_state("mem_e2e_settlement_v5").await;
    let tenant_id = Uuid::new_v4();

    // 1. REGISTRO Y PUESTA EN LÍNEA DEL WORKER A (escenario S1).
    let enrollment = registry::RegisterWorkerDraft {
        user_id: Uuid::new_v4(),
        worker_type: WorkerType::Rider,
        contact_phone: "+2348000000014".into(),
        max_concurrent_tasks: 3,
        zones: Vec::new(),
        skills: Vec::new(),
        vehicle: Some(veloz_domain_models::VehicleProfile {
            kind: veloz_domain_models::VehicleKind::Motorcycle,
            registration_plate: Some("LAG-904-XA".into()),
        }),
        payout_method: PayoutMethod::MobileMoney,
        payout_target: Some("+2348000000014".into()),
    };
    let worker_a = registry::register_worker(&state, tenant_id, enrollment)
        .await
        .expect("enrollment");
    registry::change_lifecycle(&state, tenant_id, worker_a.id, WorkerLifecycle::Active)
        .await
        .expect("activation");
    registry::set_availability(&state, tenant_id, worker_a.id, true)
        .await
        .expect("online");
    registry::report_location(&state, worker_a.id, 6.5244, 3.3792, Utc::now())
        .await
        .expect("location ping");
    registry::adjust_rating(&state, tenant_id, worker_a.id, 4.8)
        .await
        .expect("rating seal");

    // 2. CREACIÓN DE LA TAREA DE ENTREGA.
    let draft = TaskDraft {
        task_type: TaskType::Delivery,
        priority: 5,
        required_worker_type: WorkerType::Rider,
        required_skills: Vec::new(),
        zone_id: None,
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
        base_pay: dec("1500.000000"),
        bonus_pay: Decimal::ZERO,
        currency: "NGN".into(),
        required_proof_types: vec![ProofType::Photo],
        order_reference: Some("ORD-88412".into()),
        metadata: serde_json::json!({ "package_count": 1 }),
    };
    let task = task_manager::create_task(&state, tenant_id, draft)
        .await
        .expect("task genesis");
    assert_eq!(task.status, TaskStatus::Pending);

    let queued = queue.recv().await.expect("dispatch command");
    assert!(matches!(queued, DispatchCommand::FreshTask { task_id } if task_id == task.id));

    // 3. WAVE DE DESPACHO: el único candidato recibe la oferta.
    dispatcher::execute_wave(&state, task.id, 1)
        .await
        .expect("wave");
    let offers = state
        .allocations
        .list_open_for_worker(worker_a.id, Utc::now())
        .await
        .expect("offers");
    assert_eq!(offers.len(), 1);

    // 4. ACEPTACIÓN: el claim atómico sella la carrera y confirma.
    let accepted_task = task_manager::accept_offer(&state, worker_a.id, offers[0].id)
        .await
        .expect("acceptance");
    assert_eq!(accepted_task.status, TaskStatus::Accepted);
    assert_eq!(accepted_task.assigned_worker_id, Some(worker_a.id));

    // Un cierre sin evidencia fotográfica exigida es rechazado.
    task_manager::start_task(&state, worker_a.id, task.id)
        .await
        .expect("start");
    let proofless = task_manager::complete_task(
        &state,
        worker_a.id,
        task.id,
        CompletionDraft {
            proofs: Vec::new(),
            actual_duration_minutes: 18,
            actual_distance_km: 1.2,
            tip_amount: None,
        },
    )
    .await;
    assert!(matches!(proofless, Err(DbError::ProofRequired(_))));

    // 5. CIERRE CERTIFICADO CON FOTO, DURACIÓN 18 Y DISTANCIA 1.2.
    let completed_task = task_manager::complete_task(
        &state,
        worker_a.id,
        task.id,
        CompletionDraft {
            proofs: vec![ProofDraft {
                proof_type: ProofType::Photo,
                url: "https://proofs.veloz.africa/p/88412.jpg".into(),
                latitude: Some(6.5300),
                longitude: Some(3.3900),
                caption: None,
            }],
            actual_duration_minutes: 18,
            actual_distance_km: 1.2,
            tip_amount: None,
        },
    )
    .await
    .expect("settlement");

    // Round-trip S1: la tarea reporta exactamente lo capturado.
    assert_eq!(completed_task.status, TaskStatus::Completed);
    assert_eq!(completed_task.actual_duration_minutes, Some(18));
    assert_eq!(completed_task.actual_distance_km, Some(1.2));
    assert_eq!(completed_task.proofs.len(), 1);
    assert_eq!(completed_task.order_reference.as_deref(), Some("ORD-88412"));

    // Bono y propina en cero: UNA sola línea de 1500.000000.
    let ledger = state
        .earnings
        .list_for_worker(worker_a.id, None, None, &[], 10)
        .await
        .expect("ledger");
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].amount, dec("1500.000000"));

    let seasoned_worker = state.workers.fetch_worker(worker_a.id).await.expect("fetch");
    assert_eq!(seasoned_worker.completed_tasks, 1);
    assert_eq!(seasoned_worker.availability, Availability::Online);

    // 6. CORRIDA DE LOTES Y VEREDICTO DEL RAIL.
    let created = run_payout_cycle(&state, tenant_id).await.expect("cycle");
    assert_eq!(created.len(), 1);
    let payout = &created[0];
    assert_eq!(payout.amount, dec("1500.000000"));

    let provider_reference = format!("SBX-{}", payout.reference);
    let applied = state
        .unit_of_work
        .settle_payout(payout.id, &provider_reference, Utc::now())
        .await
        .expect("rail verdict");
    assert!(applied);

    let settled = state.payouts.fetch_payout(payout.id).await.expect("fetch payout");
    assert_eq!(settled.status, PayoutStatus::Completed);

    // 7. CONSERVACIÓN FINAL DEL LEDGER (propiedad P4).
    let (earned, settled_total, unpaid, in_flight) = state
        .earnings
        .conservation_totals(worker_a.id)
        .await
        .expect("conservation");
    assert!(verify_conservation(earned, settled_total, unpaid, in_flight));
    assert_eq!(settled_total, dec("1500.000000"));
    assert_eq!(unpaid, Decimal::ZERO);
}
