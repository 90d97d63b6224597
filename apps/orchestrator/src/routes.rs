// INICIO DEL ARCHIVO [apps/orchestrator/src/routes.rs]
/*!
 * =================================================================
 * APARATO: SOVEREIGN ROUTING MATRIX (V5.2 - DISPATCH TOPOLOGY)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: ORQUESTACIÓN DE ESTRATOS PARTNER, WORKER Y RAIL
 *
 * VISION HIPER-HOLÍSTICA:
 * La topología expone tres superficies:
 * 1. Partner API (tenant-scoped, ciudadanía operador).
 * 2. Worker API (/me, ciudadanía de unidad de campo).
 * 3. Rail callback (veredictos idempotentes de pago).
 * =================================================================
 */

use std::time::Duration;

use axum::{
    http::{header, Method},
    middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::handlers::{
    analytics::AnalyticsHandler, payouts::PayoutHandler, tasks::TaskHandler,
    worker_portal::WorkerPortalHandler, workers::WorkerAdministrationHandler,
};
use crate::middleware::{auth_guard, health_guard};
use crate::state::AppState;

/// Compone el router soberano del orquestador.
pub fn create_sovereign_router(application_shared_state: AppState) -> Router {
    // Escudo de red: CORS para el Dashboard y herramientas de Ops.
    let network_security_shield = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    // ESTRATO PARTNER: Operación del tenant (tareas, flota, liquidación).
    let partner_stratum = Router::new()
        .route(
            "/tasks",
            post(TaskHandler::handle_create_task).get(TaskHandler::handle_list_tasks),
        )
        .route("/tasks/:id", get(TaskHandler::handle_get_task))
        .route("/tasks/:id/cancel", post(TaskHandler::handle_cancel_task))
        .route(
            "/workers",
            post(WorkerAdministrationHandler::handle_register_worker)
                .get(WorkerAdministrationHandler::handle_list_workers),
        )
        .route(
            "/workers/:id",
            get(WorkerAdministrationHandler::handle_get_worker),
        )
        .route(
            "/workers/:id/status",
            patch(WorkerAdministrationHandler::handle_patch_lifecycle),
        )
        .route(
            "/workers/:id/availability",
            patch(WorkerAdministrationHandler::handle_patch_availability),
        )
        .route(
            "/workers/:id/adjustments",
            post(WorkerAdministrationHandler::handle_grant_adjustment),
        )
        .route(
            "/workers/:id/earnings",
            get(WorkerAdministrationHandler::handle_list_earnings),
        )
        .route(
            "/workers/:id/earnings/summary",
            get(WorkerAdministrationHandler::handle_earnings_summary),
        )
        .route("/payouts/run", post(PayoutHandler::handle_run_payouts))
        .route(
            "/analytics/tasks",
            get(AnalyticsHandler::handle_task_analytics),
        )
        .route(
            "/analytics/workers",
            get(AnalyticsHandler::handle_fleet_analytics),
        );

    // ESTRATO WORKER: Superficie móvil de la unidad de campo.
    let worker_stratum = Router::new()
        .route(
            "/location",
            post(WorkerPortalHandler::handle_report_location),
        )
        .route("/offers", get(WorkerPortalHandler::handle_poll_offers))
        .route(
            "/offers/:id/accept",
            post(WorkerPortalHandler::handle_accept_offer),
        )
        .route(
            "/offers/:id/reject",
            post(WorkerPortalHandler::handle_reject_offer),
        )
        .route(
            "/tasks/:id/start",
            post(WorkerPortalHandler::handle_start_task),
        )
        .route(
            "/tasks/:id/complete",
            post(WorkerPortalHandler::handle_complete_task),
        )
        .route("/tasks/:id/fail", post(WorkerPortalHandler::handle_fail_task))
        .route("/route", get(WorkerPortalHandler::handle_current_route))
        .route(
            "/route/stops/:seq/arrive",
            post(WorkerPortalHandler::handle_stop_arrival),
        )
        .route(
            "/route/stops/:seq/complete",
            post(WorkerPortalHandler::handle_stop_completion),
        )
        .route("/earnings", get(WorkerPortalHandler::handle_my_earnings));

    // ESTRATO RAIL: Veredictos idempotentes del rail de pagos.
    let rail_stratum = Router::new().route(
        "/payouts/:id/status",
        post(PayoutHandler::handle_rail_verdict),
    );

    // COMPOSICIÓN GLOBAL (Root Topology)
    Router::new()
        .route("/health", get(|| async { "STATUS_OK" }))
        .nest(
            "/api/v1",
            Router::new()
                .nest("/partner", partner_stratum)
                .nest("/me", worker_stratum)
                .nest("/rail", rail_stratum)
                // Middleware de salud y autenticación (escudo global).
                .layer(middleware::from_fn_with_state(
                    application_shared_state.clone(),
                    health_guard,
                ))
                .layer(middleware::from_fn_with_state(
                    application_shared_state.clone(),
                    auth_guard,
                )),
        )
        .layer(network_security_shield)
        .with_state(application_shared_state)
}
// FIN DEL ARCHIVO [apps/orchestrator/src/routes.rs]
