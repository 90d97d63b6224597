// [tests/mirror/integration/radius_expansion.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE EXPANSIÓN DE RADIO (V5.1 - ESCENARIO S4)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO INTEGRAL
 * RESPONSABILIDAD: AUDITORÍA DE LA ESCALERA 5→10→20→50 EN VIVO
 *
 * # Mathematical Proof (Dispatch Liveness):
 * Con candidatos a 12 y 35 km y escalera monótona, alguna expansión
 * los alcanza; la proximidad domina la mezcla y el más cercano gana.
 * =================================================================
 */

use std::sync::{Arc, RwLock};

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use uuid::Uuid;
use veloz_core_geo::point::GeoPoint;
use veloz_domain_dispatch::DispatchTuning;
use veloz_domain_models::{
    PayoutMethod, SitePoint, TaskDraft, TaskStatus, TaskType, WorkerLifecycle, WorkerType,
};
use veloz_infra_db::repositories::{
    AllocationRepository, EarningRepository, PayoutRepository, RouteRepository, TaskRepository,
    WorkerRepository,
};
use veloz_infra_db::{TursoClient, UnitOfWork};
use veloz_infra_rail::RailClient;
use veloz_orchestrator::engine::{dispatcher, registry, task_manager};
use veloz_orchestrator::engine::dispatcher::WaveOutcome;
use veloz_orchestrator::services::event_bus::EventBus;
use veloz_orchestrator::state::{AppState, AuthTokens, DispatchCommand, SystemMode};

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
        minimum_payout_amount: "1000.000000".parse::<Decimal>().expect("decimal"),
        current_system_mode: Arc::new(RwLock::new(SystemMode::Operational)),
        authentication: Arc::new(AuthTokens {
            operator: "operator-token".into(),
            worker: "worker-token".into(),
        }),
    };
    (state, dispatch_receiver)
}

async fn forge_remote_rider(
    state: &AppState,
    tenant_id: Uuid,
    latitude: f64,
    longitude: f64,
) -> Uuid {
    let draft = registry::RegisterWorkerDraft {
        user_id: Uuid::new_v4(),
        worker_type: WorkerType::Rider,
        contact_phone: "+2348000000015".into(),
        max_concurrent_tasks: 2,
        zones: Vec::new(),
        skills: Vec::new(),
        vehicle: None,
        payout_method: PayoutMethod::Wallet,
        payout_target: None,
    };
    let worker = registry::register_worker(state, tenant_id, draft)
        .await
        .expect("enrollment");
    registry::change_lifecycle(state, tenant_id, worker.id, WorkerLifecycle::Active)
        .await
        .expect("activation");
    registry::set_availability(state, tenant_id, worker.id, true)
        .await
        .expect("online");
    registry::report_location(state, worker.id, latitude, longitude, Utc::now())
        .await
        .expect("location ping");
    worker.id
}

#[tokio::test]
async fn certify_scenario_s4_ladder_reaches_remote_candidates() {
    let (state, _queue) = forge_state("mem_expansion_s4_v5").await;
    let tenant_id = Uuid::new_v4();

    // Tarea en Abuja (9.0765, 7.3986); E a ~12 km, F a ~35 km al norte.
    let worker_e = forge_remote_rider(&state, tenant_id, 9.1850, 7.3986).await;
    let worker_f = forge_remote_rider(&state, tenant_id, 9.3930, 7.3986).await;

    let draft = TaskDraft {
        task_type: TaskType::Delivery,
        priority: 0,
        required_worker_type: WorkerType::Rider,
        required_skills: Vec::new(),
        zone_id: None,
        pickup: Some(SitePoint {
            point: GeoPoint::new(9.0765, 7.3986).expect("valid point"),
            address: "Central District, Abuja".into(),
        }),
        delivery: Some(SitePoint {
            point: GeoPoint::new(9.0900, 7.4100).expect("valid point"),
            address: "Wuse Market, Abuja".into(),
        }),
        scheduled_at: None,
        deadline_at: None,
        estimated_duration_minutes: None,
        estimated_distance_km: None,
        base_pay: "2500.000000".parse::<Decimal>().expect("decimal"),
        bonus_pay: Decimal::ZERO,
        currency: "NGN".into(),
        required_proof_types: Vec::new(),
        order_reference: None,
        metadata: serde_json::Value::Null,
    };
    let task = task_manager::create_task(&state, tenant_id, draft)
        .await
        .expect("task genesis");

    // La primera wave expande 5→10→20→50 dentro de la selección: ambos
    // candidatos remotos terminan alcanzados y ofertados.
    let outcome = dispatcher::execute_wave(&state, task.id, 1)
        .await
        .expect("wave");
    assert_eq!(outcome, WaveOutcome::Offered(2));

    let history = state.allocations.list_for_task(task.id).await.expect("history");
    assert_eq!(history.len(), 2);

    let offer_e = history
        .iter()
        .find(|allocation| allocation.worker_id == worker_e)
        .expect("offer for E");
    let offer_f = history
        .iter()
        .find(|allocation| allocation.worker_id == worker_f)
        .expect("offer for F");

    // Distancias exactas de la escalera: E ~12 km, F ~35 km.
    assert!((offer_e.distance_km - 12.0).abs() < 1.0, "E at {}", offer_e.distance_km);
    assert!((offer_f.distance_km - 35.0).abs() < 1.5, "F at {}", offer_f.distance_km);

    // La proximidad domina: E supera a F en la mezcla de puntuación.
    assert!(offer_e.score > offer_f.score);

    // El mejor puntuado acepta y la tarea alcanza asignación (liveness P8).
    let assigned = task_manager::accept_offer(&state, worker_e, offer_e.id)
        .await
        .expect("acceptance");
    assert_eq!(assigned.status, TaskStatus::Accepted);
    assert_eq!(assigned.assigned_worker_id, Some(worker_e));
}

#[tokio::test]
async fn certify_no_candidates_within_cap_reschedules() {
    let (state, _queue) = forge_state("mem_expansion_void_v5").await;
    let tenant_id = Uuid::new_v4();

    // Único worker a ~110 km: fuera incluso del tope de 50 km.
    let _far_away = forge_remote_rider(&state, tenant_id, 10.0710, 7.3986).await;

    let draft = TaskDraft {
        task_type: TaskType::Pickup,
        priority: 0,
        required_worker_type: WorkerType::Rider,
        required_skills: Vec::new(),
        zone_id: None,
        pickup: Some(SitePoint {
            point: GeoPoint::new(9.0765, 7.3986).expect("valid point"),
            address: "Central District, Abuja".into(),
        }),
        delivery: Some(SitePoint {
            point: GeoPoint::new(9.0800, 7.4000).expect("valid point"),
            address: "Garki, Abuja".into(),
        }),
        scheduled_at: None,
        deadline_at: None,
        estimated_duration_minutes: None,
        estimated_distance_km: None,
        base_pay: "1800.000000".parse::<Decimal>().expect("decimal"),
        bonus_pay: Decimal::ZERO,
        currency: "NGN".into(),
        required_proof_types: Vec::new(),
        order_reference: None,
        metadata: serde_json::Value::Null,
    };
    let task = task_manager::create_task(&state, tenant_id, draft)
        .await
        .expect("task genesis");

    let outcome = dispatcher::execute_wave(&state, task.id, 1)
        .await
        .expect("wave");
    assert_eq!(outcome, WaveOutcome::Rescheduled);

    let untouched = state.tasks.fetch_task(task.id).await.expect("fetch");
    assert_eq!(untouched.status, TaskStatus::Pending);
    assert!(untouched.escalated_at.is_none());
}
