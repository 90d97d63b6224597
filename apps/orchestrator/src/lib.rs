// [apps/orchestrator/src/lib.rs]

/*!
 * =================================================================
 * APARATO: ORCHESTRATOR LIBRARY ROOT (V5.0 - DISPATCH COMMAND)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L4)
 * RESPONSABILIDAD: EXPOSICIÓN NOMINAL DE LOS ESTRATOS DEL ORQUESTADOR
 * =================================================================
 */

pub mod bootstrap;
pub mod engine;
pub mod handlers;
pub mod kernel;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

/// Preludio del orquestador para el binario de ignición.
pub mod prelude {
    pub use crate::bootstrap::KernelConfig;
    pub use crate::kernel::OrchestratorKernel;
    pub use crate::state::AppState;
}
