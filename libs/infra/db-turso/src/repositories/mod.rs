// [libs/infra/db-turso/src/repositories/mod.rs]
/*!
 * =================================================================
 * APARATO: AGGREGATE REPOSITORY REGISTRY (V5.0 - NARROW SURFACES)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: EXPOSICIÓN NOMINAL DE LOS REPOSITORIOS POR AGREGADO
 * =================================================================
 */

pub mod allocation_repository;
pub mod earning_repository;
pub mod payout_repository;
pub mod route_repository;
pub mod task_repository;
pub mod worker_repository;

pub use allocation_repository::AllocationRepository;
pub use earning_repository::{EarningRepository, EarningSummaryLine};
pub use payout_repository::PayoutRepository;
pub use route_repository::RouteRepository;
pub use task_repository::{TaskAnalytics, TaskListFilter, TaskRepository};
pub use worker_repository::{FleetAnalytics, NearbyWorker, WorkerListFilter, WorkerRepository};
