// [apps/orchestrator/src/services/dispatch_daemon.rs]
/*!
 * =================================================================
 * APARATO: DISPATCH QUEUE DAEMON (V5.2 - BOUNDED CONSUMER)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L4)
 * RESPONSABILIDAD: CONSUMO DE LA COLA ACOTADA Y LANZAMIENTO DE WAVES
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. QUEUE AS ONLY SURFACE: El daemon es el único consumidor de la
 *    cola; las waves se lanzan como tareas del reactor y corren en
 *    paralelo para tareas distintas.
 * 2. FAULT CONTAINMENT: El colapso de una wave individual se registra
 *    y jamás derriba al consumidor.
 * =================================================================
 */

use tokio::sync::mpsc;
use tracing::{error, info};

use crate::engine::dispatcher;
use crate::state::{AppState, DispatchCommand};

/// Lanza el consumidor perpetuo de la cola de despacho.
pub fn spawn_dispatch_daemon(
    application_state: AppState,
    mut command_receiver: mpsc::Receiver<DispatchCommand>,
) {
    tokio::spawn(async move {
        info!("🚦 [DISPATCH_DAEMON]: Bounded queue consumer operational.");

        while let Some(command) = command_receiver.recv().await {
            let wave_state = application_state.clone();

            // Waves de tareas distintas proceden en paralelo; la
            // exclusión mutua vive en el claim atómico del Store.
            tokio::spawn(async move {
                let outcome = match command {
                    DispatchCommand::FreshTask { task_id } => {
                        dispatcher::execute_wave(&wave_state, task_id, 1).await
                    }
                    DispatchCommand::Reoffer { task_id } => {
                        dispatcher::evaluate_reoffer(&wave_state, task_id).await
                    }
                };

                if let Err(fault) = outcome {
                    error!("❌ [DISPATCH_DAEMON]: Wave execution collapsed: {}", fault);
                }
            });
        }

        info!("🚦 [DISPATCH_DAEMON]: Queue severed; consumer terminating.");
    });
}
