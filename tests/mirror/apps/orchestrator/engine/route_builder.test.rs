// [tests/mirror/apps/orchestrator/engine/route_builder.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DEL COMPOSITOR DE RUTAS (V5.0 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L4-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DE COMPOSICIÓN, SECUENCIA Y PROGRESO
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
    Availability, PayoutMethod, RouteStatus, RouteStopStatus, SitePoint, Task, TaskStatus,
    TaskType, Worker, WorkerLifecycle, WorkerType,
};
use veloz_infra_db::repositories::{
    AllocationRepository, EarningRepository, PayoutRepository, RouteRepository, TaskRepository,
    WorkerRepository,
};
use veloz_infra_db::{TursoClient, UnitOfWork};
use veloz_infra_rail::RailClient;
use veloz_orchestrator::engine::route_builder;
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

fn forge_worker(tenant_id: Uuid) -> Worker {
    let now = Utc::now();
    Worker {
        id: Uuid::new_v4(),
        tenant_id,
        user_id: Uuid::new_v4(),
        worker_type: WorkerType::Rider,
        lifecycle: WorkerLifecycle::Active,
        availability: Availability::Busy,
        contact_phone: "+2348000000012".into(),
        location: Some(GeoPoint::new(6.5244, 3.3792).expect("valid point")),
        last_location_at: Some(now),
        rating: 4.7,
        total_tasks: 3,
        completed_tasks: 0,
        max_concurrent_tasks: 5,
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

fn forge_accepted_task(tenant_id: Uuid, worker_id: Uuid, latitude: f64, longitude: f64) -> Task {
    let now = Utc::now();
    Task {
        id: Uuid::new_v4(),
        tenant_id,
        task_type: TaskType::Delivery,
        status: TaskStatus::Accepted,
        priority: 0,
        assigned_worker_id: Some(worker_id),
        required_worker_type: WorkerType::Rider,
        required_skills: Vec::new(),
        zone_id: None,
        pickup: Some(SitePoint {
            point: GeoPoint::new(latitude, longitude).expect("valid point"),
            address: format!("Stop at {:.4},{:.4}", latitude, longitude),
        }),
        delivery: Some(SitePoint {
            point: GeoPoint::new(latitude + 0.01, longitude + 0.01).expect("valid point"),
            address: "Drop point".into(),
        }),
        scheduled_at: None,
        deadline_at: None,
        estimated_duration_minutes: None,
        estimated_distance_km: None,
        actual_duration_minutes: None,
        actual_distance_km: None,
        base_pay: Decimal::new(600_000_000, 6),
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

#[tokio::test]
async fn certify_route_composition_from_accepted_tasks() {
    let (state, _queue) = forge_state("mem_route_compose_v5").await;
    let tenant_id = Uuid::new_v4();

    let worker = forge_worker(tenant_id);
    state.workers.insert_worker(&worker).await.expect("enroll");

    for (latitude, longitude) in [(6.5352, 3.3792), (6.5300, 3.3900), (6.5550, 3.3850)] {
        let accepted = forge_accepted_task(tenant_id, worker.id, latitude, longitude);
        state.tasks.insert_task(&accepted).await.expect("accepted task");
    }

    let route = route_builder::current_or_build(&state, tenant_id, worker.id)
        .await
        .expect("composition")
        .expect("route must exist for accepted work");

    assert_eq!(route.status, RouteStatus::Active);
    assert_eq!(route.stops.len(), 3);

    // Secuencia 1-based contigua y total = Σ piernas.
    let sequences: Vec<i32> = route.stops.iter().map(|stop| stop.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3]);
    let leg_sum: f64 = route.stops.iter().map(|stop| stop.distance_from_prev_km).sum();
    assert!((leg_sum - route.total_distance_km).abs() < 0.01);
    assert!((0.0..=1.0).contains(&route.optimization_score));
    assert!(route.stops.iter().all(|stop| stop.estimated_arrival.is_some()));

    // Relectura: el recorrido activo es único y estable.
    let replay = route_builder::current_or_build(&state, tenant_id, worker.id)
        .await
        .expect("read-through")
        .expect("active route");
    assert_eq!(replay.id, route.id);
}

#[tokio::test]
async fn certify_stop_progress_and_finalization() {
    let (state, _queue) = forge_state("mem_route_progress_v5").await;
    let tenant_id = Uuid::new_v4();

    let worker = forge_worker(tenant_id);
    state.workers.insert_worker(&worker).await.expect("enroll");

    for (latitude, longitude) in [(6.5352, 3.3792), (6.5300, 3.3900)] {
        let accepted = forge_accepted_task(tenant_id, worker.id, latitude, longitude);
        state.tasks.insert_task(&accepted).await.expect("accepted task");
    }

    let route = route_builder::current_or_build(&state, tenant_id, worker.id)
        .await
        .expect("composition")
        .expect("route");
    assert_eq!(route.stops.len(), 2);

    // Arribo y cierre de la primera parada.
    let after_arrival =
        route_builder::mark_stop_progress(&state, worker.id, 1, RouteStopStatus::Arrived)
            .await
            .expect("arrival");
    let first_stop = after_arrival
        .stops
        .iter()
        .find(|stop| stop.sequence == 1)
        .expect("first stop");
    assert_eq!(first_stop.status, RouteStopStatus::Arrived);
    assert!(first_stop.actual_arrival.is_some());

    route_builder::mark_stop_progress(&state, worker.id, 1, RouteStopStatus::Completed)
        .await
        .expect("first completion");

    // El recorrido sigue activo con una parada pendiente.
    let still_active = state
        .routes
        .fetch_active_for_worker(worker.id)
        .await
        .expect("read");
    assert!(still_active.is_some());

    // Cerrar la última parada finaliza el recorrido completo.
    let final_view =
        route_builder::mark_stop_progress(&state, worker.id, 2, RouteStopStatus::Completed)
            .await
            .expect("final completion");
    assert_eq!(final_view.status, RouteStatus::Completed);

    let no_active = state
        .routes
        .fetch_active_for_worker(worker.id)
        .await
        .expect("read");
    assert!(no_active.is_none());
}

#[tokio::test]
async fn certify_no_accepted_work_yields_no_route() {
    let (state, _queue) = forge_state("mem_route_empty_v5").await;
    let tenant_id = Uuid::new_v4();

    let worker = forge_worker(tenant_id);
    state.workers.insert_worker(&worker).await.expect("enroll");

    let verdict = route_builder::current_or_build(&state, tenant_id, worker.id)
        .await
        .expect("read-through");
    assert!(verdict.is_none());
}
