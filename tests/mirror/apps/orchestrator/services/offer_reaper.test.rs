// [tests/mirror/apps/orchestrator/services/offer_reaper.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DEL BARRIDO DE EXPIRACIÓN (V5.0 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L4-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DEL RELOJ DE PARED Y EL RE-DESPACHO
 * =================================================================
 */

use std::sync::{Arc, RwLock};

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use uuid::Uuid;
use veloz_core_geo::point::GeoPoint;
use veloz_domain_dispatch::DispatchTuning;
use veloz_domain_models::{
    Allocation, AllocationStatus, ExpiryReason, SitePoint, TaskDraft, TaskType, WorkerType,
};
use veloz_infra_db::repositories::{
    AllocationRepository, EarningRepository, PayoutRepository, RouteRepository, TaskRepository,
    WorkerRepository,
};
use veloz_infra_db::{TursoClient, UnitOfWork};
use veloz_infra_rail::RailClient;
use veloz_orchestrator::engine::{dispatcher, task_manager};
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

fn forge_draft() -> TaskDraft {
    TaskDraft {
        task_type: TaskType::SalesVisit,
        priority: 0,
        required_worker_type: WorkerType::SalesRep,
        required_skills: Vec::new(),
        zone_id: None,
        pickup: Some(SitePoint {
            point: GeoPoint::new(6.5250, 3.3800).expect("valid point"),
            address: "Visit point".into(),
        }),
        delivery: None,
        scheduled_at: None,
        deadline_at: None,
        estimated_duration_minutes: None,
        estimated_distance_km: None,
        base_pay: "700.000000".parse::<Decimal>().expect("decimal"),
        bonus_pay: Decimal::ZERO,
        currency: "NGN".into(),
        required_proof_types: Vec::new(),
        order_reference: None,
        metadata: serde_json::Value::Null,
    }
}

fn forge_dead_offer(task_id: Uuid, wave: i32) -> Allocation {
    let now = Utc::now();
    Allocation {
        id: Uuid::new_v4(),
        task_id,
        worker_id: Uuid::new_v4(),
        status: AllocationStatus::Offered,
        score: 0.4,
        distance_km: 2.0,
        eta_minutes: 5.0,
        wave,
        offered_at: now - Duration::seconds(60),
        expires_at: now - Duration::seconds(10),
        responded_at: None,
        reason: None,
        version: 1,
    }
}

#[tokio::test]
async fn certify_sweep_expires_by_wall_clock_and_requeues() {
    let (state, _queue) = forge_state("mem_reaper_sweep_v5").await;
    let tenant_id = Uuid::new_v4();

    let task = task_manager::create_task(&state, tenant_id, forge_draft())
        .await
        .expect("task genesis");

    // Dos ofertas muertas por TTL y una viva de otra wave.
    let dead_one = forge_dead_offer(task.id, 1);
    let dead_two = forge_dead_offer(task.id, 1);
    state
        .allocations
        .insert_offer_wave(&[dead_one.clone(), dead_two.clone()])
        .await
        .expect("dead offers");

    let swept = state
        .allocations
        .sweep_expired_offers(Utc::now())
        .await
        .expect("sweep");
    assert_eq!(swept.len(), 2);
    assert!(swept.iter().all(|(_, task_id)| *task_id == task.id));

    for dead in [&dead_one, &dead_two] {
        let observed = state
            .allocations
            .fetch_allocation(dead.id)
            .await
            .expect("fetch swept offer");
        assert_eq!(observed.status, AllocationStatus::Expired);
        assert_eq!(observed.reason, Some(ExpiryReason::OfferTimeout));
    }

    // Re-evaluación tras el barrido: sin ofertas vivas y con waves
    // disponibles, la tarea se reprograma.
    let outcome = dispatcher::evaluate_reoffer(&state, task.id)
        .await
        .expect("reoffer evaluation");
    assert_eq!(outcome, WaveOutcome::Rescheduled);
}

#[tokio::test]
async fn certify_reoffer_with_live_offers_is_skipped() {
    let (state, _queue) = forge_state("mem_reaper_live_v5").await;
    let tenant_id = Uuid::new_v4();

    let task = task_manager::create_task(&state, tenant_id, forge_draft())
        .await
        .expect("task genesis");

    // Oferta viva: la wave sigue en curso y no se re-despacha.
    let mut live_offer = forge_dead_offer(task.id, 1);
    live_offer.offered_at = Utc::now();
    live_offer.expires_at = Utc::now() + Duration::seconds(45);
    state
        .allocations
        .insert_offer_wave(std::slice::from_ref(&live_offer))
        .await
        .expect("live offer");

    let outcome = dispatcher::evaluate_reoffer(&state, task.id)
        .await
        .expect("reoffer evaluation");
    assert_eq!(outcome, WaveOutcome::Skipped);
}

#[tokio::test]
async fn certify_reoffer_after_final_wave_escalates() {
    let (state, _queue) = forge_state("mem_reaper_final_v5").await;
    let tenant_id = Uuid::new_v4();

    let task = task_manager::create_task(&state, tenant_id, forge_draft())
        .await
        .expect("task genesis");

    // Rastro de la wave final ya muerta: el siguiente paso es escalar.
    let final_wave_offer = forge_dead_offer(task.id, state.tuning.max_waves);
    state
        .allocations
        .insert_offer_wave(std::slice::from_ref(&final_wave_offer))
        .await
        .expect("final wave offer");
    state
        .allocations
        .sweep_expired_offers(Utc::now())
        .await
        .expect("sweep");

    let outcome = dispatcher::evaluate_reoffer(&state, task.id)
        .await
        .expect("reoffer evaluation");
    assert_eq!(outcome, WaveOutcome::Escalated);

    let escalated = state.tasks.fetch_task(task.id).await.expect("fetch task");
    assert!(escalated.escalated_at.is_some());
}
