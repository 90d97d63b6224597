// [apps/orchestrator/src/services/event_bus.rs]
/*!
 * =================================================================
 * APARATO: DISPATCH EVENT BUS (V5.0 - SIGNAL BROADCASTER)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: DIFUSIÓN DE SEÑALES DE DESPACHO Y LIQUIDACIÓN
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. LONG-POLL BACKBONE: El endpoint de ofertas del Worker API se
 *    despierta por señal, no por sondeo del Ledger.
 * 2. LOCK-FREE EMISSION: La pérdida de un suscriptor jamás afecta el
 *    determinismo del reactor principal.
 *
 * # Mathematical Proof (Signal Propagation):
 * El despacho es O(1) respecto del número de receptores; el canal
 * broadcast de Tokio enruta punteros, no copias de artefactos.
 * =================================================================
 */

use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;
use veloz_domain_models::{Allocation, PayoutStatus};

/// Capacidad del canal de difusión soberano.
const SOVEREIGN_CHANNEL_CAPACITY: usize = 4096;

/// Señal tipada del ciclo de despacho y liquidación.
#[derive(Debug, Clone)]
pub enum DispatchEvent {
    /// Una oferta fue emitida hacia un worker.
    OfferIssued {
        /// Artefacto completo de la oferta.
        allocation: Allocation,
    },
    /// Una tarea quedó sellada para un worker.
    TaskAssigned {
        /// Tarea reclamada.
        task_id: Uuid,
        /// Worker ganador.
        worker_id: Uuid,
    },
    /// Una tarea agotó sus waves y espera intervención manual.
    TaskEscalated {
        /// Tarea escalada.
        task_id: Uuid,
    },
    /// Una tarea cerró con sus líneas de ganancia selladas.
    TaskCompleted {
        /// Tarea completada.
        task_id: Uuid,
        /// Worker ejecutor.
        worker_id: Uuid,
    },
    /// Un payout alcanzó veredicto terminal.
    PayoutSettled {
        /// Instrucción de pago.
        payout_id: Uuid,
        /// Veredicto final.
        status: PayoutStatus,
    },
}

/// Orquestador central de señales en tiempo real.
#[derive(Debug)]
pub struct EventBus {
    /// Canal de transmisión central (multi-productor, multi-consumidor).
    internal_transmission_channel: broadcast::Sender<DispatchEvent>,
}

impl EventBus {
    /// Forja una nueva instancia del bus con buffer endurecido.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(SOVEREIGN_CHANNEL_CAPACITY);
        Self {
            internal_transmission_channel: sender,
        }
    }

    /// Genera un receptor para long-poll o streaming.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.internal_transmission_channel.subscribe()
    }

    /// Emite la señal de oferta hacia los túneles de worker.
    pub fn emit_offer_issued(&self, allocation: Allocation) {
        debug!(
            "📣 [EVENT_BUS]: Offer {} -> worker {}.",
            allocation.id, allocation.worker_id
        );
        let _ = self
            .internal_transmission_channel
            .send(DispatchEvent::OfferIssued { allocation });
    }

    /// Notifica la resolución de la carrera de asignación.
    pub fn emit_task_assigned(&self, task_id: Uuid, worker_id: Uuid) {
        info!("🤝 [EVENT_BUS]: Task {} assigned to {}.", task_id, worker_id);
        let _ = self
            .internal_transmission_channel
            .send(DispatchEvent::TaskAssigned { task_id, worker_id });
    }

    /// Notifica el escalamiento tras agotar las waves.
    pub fn emit_task_escalated(&self, task_id: Uuid) {
        info!("🚨 [EVENT_BUS]: Task {} escalated for manual intervention.", task_id);
        let _ = self
            .internal_transmission_channel
            .send(DispatchEvent::TaskEscalated { task_id });
    }

    /// Notifica el cierre certificado de una tarea.
    pub fn emit_task_completed(&self, task_id: Uuid, worker_id: Uuid) {
        let _ = self
            .internal_transmission_channel
            .send(DispatchEvent::TaskCompleted { task_id, worker_id });
    }

    /// Notifica el veredicto terminal de un payout.
    pub fn emit_payout_settled(&self, payout_id: Uuid, status: PayoutStatus) {
        let _ = self
            .internal_transmission_channel
            .send(DispatchEvent::PayoutSettled { payout_id, status });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
