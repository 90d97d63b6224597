// [apps/orchestrator/src/main.rs]
/*!
 * =================================================================
 * APARATO: ORCHESTRATOR MAIN ENTRY POINT (V5.1 - GOLD MASTER)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L3)
 * RESPONSABILIDAD: BOOTSTRAP DE INFRAESTRUCTURA E IGNICIÓN SEGURA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SINGLE CAPTURE: El entorno se sella en 'KernelConfig' antes de
 *    cualquier otra operación; el runtime posterior es determinista.
 * 2. CRASH-ONLY STARTUP: Configuración o esquema inválidos niegan el
 *    arranque con código de salida distinto de cero.
 *
 * # Mathematical Proof (Deterministic Ignition):
 * La coreografía de daemons ocurre antes de la apertura del socket
 * TCP, previniendo estados de carrera donde un worker acepte ofertas
 * que ningún barrido vigila todavía.
 * =================================================================
 */

use dotenvy::dotenv;
use tracing::{error, info};
use veloz_orchestrator::prelude::*;
use veloz_shared_heimdall::init_tracing;

/// Punto de ignición supremo del binario del orquestador.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. CARGA DE ENTORNO SOBERANO
    dotenv().ok();

    // 2. INICIALIZACIÓN DE OBSERVABILIDAD NEURAL (HEIMDALL)
    init_tracing("veloz_orchestrator");

    // 3. RUNTIME SOBERANO MULTI-HILO
    let runtime_orchestrator = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime_orchestrator.block_on(async {
        info!("🛰️ [COMMAND_CENTER]: Veloz dispatch engine igniting...");

        // 4. CAPTURA ÚNICA DEL ENTORNO
        let kernel_config = match KernelConfig::from_env() {
            Ok(config) => config,
            Err(bootstrap_fault) => {
                error!("❌ [IGNITION_DENIED]: {}", bootstrap_fault);
                std::process::exit(1);
            }
        };

        // 5. IGNICIÓN DEL KERNEL (crash-only)
        let kernel_instance = match OrchestratorKernel::ignite(kernel_config).await {
            Ok(kernel) => kernel,
            Err(ignition_fault) => {
                error!("❌ [IGNITION_DENIED]: {}", ignition_fault);
                std::process::exit(1);
            }
        };

        // 6. SERVICIO PERPETUO
        if let Err(gateway_fault) = kernel_instance.serve().await {
            error!("❌ [GATEWAY_COLLAPSE]: {}", gateway_fault);
            std::process::exit(1);
        }
    });

    Ok(())
}
