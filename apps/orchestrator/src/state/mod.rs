// [apps/orchestrator/src/state/mod.rs]
/*!
 * =================================================================
 * APARATO: SOVEREIGN STATE ORCHESTRATOR (V5.2 - COMPOSITION ROOT)
 * CLASIFICACIÓN: APPLICATION STATE (ESTRATO L1-APP)
 * RESPONSABILIDAD: ORQUESTACIÓN DE REPOSITORIOS, MOTORES Y DAEMONS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. COMPOSITION ROOT: Centraliza el rastro de los repositorios por
 *    agregado, las primitivas atómicas, los motores de dominio y la
 *    cola acotada de despacho.
 * 2. BOUNDED QUEUE: La cola mpsc es la ÚNICA superficie compartida del
 *    Dispatcher; su saturación se reporta como 'busy' (backpressure).
 * 3. NOMINAL PURITY: Uso de 'Arc<T>' para inmutabilidad compartida.
 * =================================================================
 */

use std::sync::{Arc, RwLock};

use rust_decimal::Decimal;
use tokio::sync::mpsc;
use uuid::Uuid;
use veloz_domain_dispatch::DispatchTuning;
use veloz_infra_db::repositories::{
    AllocationRepository, EarningRepository, PayoutRepository, RouteRepository, TaskRepository,
    WorkerRepository,
};
use veloz_infra_db::{TursoClient, UnitOfWork};
use veloz_infra_rail::RailClient;

use crate::services::event_bus::EventBus;

/// Material simétrico de autenticación perimetral (decidido upstream).
#[derive(Debug)]
pub struct AuthTokens {
    /// Token del Operator/Partner API.
    pub operator: String,
    /// Token del Worker API.
    pub worker: String,
}

/// Modos de salud del sistema para la interceptación de middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemMode {
    /// El sistema despacha y liquida de forma nominal.
    Operational,
    /// El despacho está suspendido por mantenimiento o mando C2.
    Maintenance(String),
}

/// Comando de la cola acotada del Dispatcher.
#[derive(Debug, Clone)]
pub enum DispatchCommand {
    /// Tarea recién creada: ejecutar la primera wave.
    FreshTask {
        /// Tarea a despachar.
        task_id: Uuid,
    },
    /// Ofertas muertas (TTL, rechazo o preempción): evaluar re-despacho.
    Reoffer {
        /// Tarea a re-evaluar.
        task_id: Uuid,
    },
}

/**
 * Contenedor de estado compartido (thread-safe) del orquestador.
 * Actúa como la placa base donde se conectan todos los estratos.
 */
#[derive(Clone)]
pub struct AppState {
    /// Cliente táctico para el Motor A (Turso Cloud / libSQL).
    pub database_client: TursoClient,
    /// Repositorio del agregado Worker.
    pub workers: Arc<WorkerRepository>,
    /// Repositorio del agregado Task.
    pub tasks: Arc<TaskRepository>,
    /// Repositorio de los artefactos del scheduler.
    pub allocations: Arc<AllocationRepository>,
    /// Repositorio del Ledger de ganancias.
    pub earnings: Arc<EarningRepository>,
    /// Repositorio de instrucciones de pago.
    pub payouts: Arc<PayoutRepository>,
    /// Repositorio de recorridos multi-parada.
    pub routes: Arc<RouteRepository>,
    /// Primitivas transaccionales multi-agregado.
    pub unit_of_work: Arc<UnitOfWork>,
    /// Cliente del rail de pagos (sandbox sin endpoint).
    pub rail_client: Arc<RailClient>,
    /// Bus de señales de despacho y liquidación.
    pub event_bus: Arc<EventBus>,
    /// Productor de la cola acotada del Dispatcher.
    pub dispatch_queue: mpsc::Sender<DispatchCommand>,
    /// Tuning contractual del Dispatcher.
    pub tuning: Arc<DispatchTuning>,
    /// Umbral mínimo de lote de pago por worker.
    pub minimum_payout_amount: Decimal,
    /// Estado de liveness para guardias perimetrales de la API.
    pub current_system_mode: Arc<RwLock<SystemMode>>,
    /// Material simétrico de autenticación perimetral.
    pub authentication: Arc<AuthTokens>,
}

impl AppState {
    /// Evalúa la operatividad para la guardia de salud perimetral.
    pub fn is_operational(&self) -> Result<(), String> {
        match self
            .current_system_mode
            .read()
            .map(|guard| guard.clone())
        {
            Ok(SystemMode::Operational) => Ok(()),
            Ok(SystemMode::Maintenance(reason)) => Err(reason),
            Err(_) => Err("STATE_LOCK_POISONED".to_string()),
        }
    }
}
