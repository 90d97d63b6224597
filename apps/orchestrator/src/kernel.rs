// [apps/orchestrator/src/kernel.rs]
/*!
 * =================================================================
 * APARATO: ORCHESTRATOR KERNEL (V5.3 - IGNITION SEQUENCE)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L1-APP)
 * RESPONSABILIDAD: COMPOSICIÓN DEL ESTADO Y ARRANQUE DE DAEMONS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. CRASH-ONLY IGNITION: El fallo del bootstrap del esquema niega el
 *    arranque del proceso; jamás se sirve tráfico sobre un Ledger a
 *    medio solidificar.
 * 2. DAEMON CHOREOGRAPHY: Consumidor de cola, barrido de ofertas,
 *    corridas de lote y reconciliación de rail arrancan ANTES de la
 *    apertura del socket TCP.
 * =================================================================
 */

use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::info;

use veloz_infra_db::repositories::{
    AllocationRepository, EarningRepository, PayoutRepository, RouteRepository, TaskRepository,
    WorkerRepository,
};
use veloz_infra_db::{TursoClient, UnitOfWork};
use veloz_infra_rail::RailClient;

use crate::bootstrap::KernelConfig;
use crate::routes::create_sovereign_router;
use crate::services::event_bus::EventBus;
use crate::services::{
    dispatch_daemon::spawn_dispatch_daemon, offer_reaper::spawn_offer_reaper,
    payout_scheduler::spawn_payout_scheduler, rail_reconciler::spawn_rail_reconciler,
};
use crate::state::{AppState, AuthTokens, SystemMode};

/// Núcleo del orquestador con su estado compuesto.
pub struct OrchestratorKernel {
    /// Estado compartido ya cableado con daemons activos.
    pub application_shared_state: AppState,
    /// Puerto de escucha sellado por la configuración.
    listening_network_port: u16,
}

impl OrchestratorKernel {
    /**
     * Secuencia de ignición: enlace con el Ledger, composición del
     * estado, arranque de daemons y construcción del router.
     *
     * # Errors:
     * Colapso del enlace de persistencia o del bootstrap del esquema.
     */
    pub async fn ignite(config: KernelConfig) -> Result<Self> {
        info!("🛰️ [KERNEL]: Global ignition sequence starting...");

        // 1. ENLACE TÁCTICO CON EL MOTOR A (crash-only)
        let database_client = TursoClient::connect(
            &config.database_connection_url,
            config.database_access_token.clone(),
        )
        .await
        .context("CRITICAL_FAULT: tactical ledger ignition collapsed")?;

        // 2. REPOSITORIOS POR AGREGADO Y PRIMITIVAS ATÓMICAS
        let workers = Arc::new(WorkerRepository::new(database_client.clone()));
        let tasks = Arc::new(TaskRepository::new(database_client.clone()));
        let allocations = Arc::new(AllocationRepository::new(database_client.clone()));
        let earnings = Arc::new(EarningRepository::new(database_client.clone()));
        let payouts = Arc::new(PayoutRepository::new(database_client.clone()));
        let routes = Arc::new(RouteRepository::new(database_client.clone()));
        let unit_of_work = Arc::new(UnitOfWork::new(database_client.clone()));

        // 3. CANAL ACOTADO DEL DISPATCHER (única superficie compartida)
        let (dispatch_sender, dispatch_receiver) =
            mpsc::channel(config.dispatch_tuning.queue_capacity);

        let rail_client = Arc::new(RailClient::new(
            config.rail_endpoint.clone(),
            config.rail_authentication_token.clone(),
        ));

        let application_shared_state = AppState {
            database_client,
            workers,
            tasks,
            allocations,
            earnings,
            payouts,
            routes,
            unit_of_work,
            rail_client,
            event_bus: Arc::new(EventBus::new()),
            dispatch_queue: dispatch_sender,
            tuning: Arc::new(config.dispatch_tuning.clone()),
            minimum_payout_amount: config.minimum_payout_amount,
            current_system_mode: Arc::new(RwLock::new(SystemMode::Operational)),
            authentication: Arc::new(AuthTokens {
                operator: config.operator_authentication_token.clone(),
                worker: config.worker_authentication_token.clone(),
            }),
        };

        // 4. COREOGRAFÍA DE DAEMONS (antes del socket TCP)
        spawn_dispatch_daemon(application_shared_state.clone(), dispatch_receiver);
        spawn_offer_reaper(application_shared_state.clone());
        spawn_payout_scheduler(
            application_shared_state.clone(),
            config.payout_run_interval_seconds,
        );
        spawn_rail_reconciler(
            application_shared_state.clone(),
            config.rail_reconcile_interval_seconds,
        );

        info!("✅ [KERNEL]: State composed; daemons operational.");

        Ok(Self {
            application_shared_state,
            listening_network_port: config.listening_network_port,
        })
    }

    /**
     * Abre el socket TCP y sirve la matriz de rutas hasta la señal de
     * apagado del proceso.
     */
    pub async fn serve(self) -> Result<()> {
        let router = create_sovereign_router(self.application_shared_state);

        let bind_address = format!("0.0.0.0:{}", self.listening_network_port);
        let tcp_listener = tokio::net::TcpListener::bind(&bind_address)
            .await
            .with_context(|| format!("CRITICAL_FAULT: cannot bind {}", bind_address))?;

        info!("🌐 [KERNEL]: Sovereign gateway listening on {}.", bind_address);

        axum::serve(tcp_listener, router)
            .await
            .context("CRITICAL_FAULT: gateway collapsed")?;
        Ok(())
    }
}
