// [apps/orchestrator/src/services/mod.rs]
/*!
 * =================================================================
 * APARATO: BACKGROUND SERVICE REGISTRY (V5.0 - DAEMON STRATA)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: DAEMONS PERPETUOS DEL MOTOR DE DESPACHO
 * =================================================================
 */

pub mod dispatch_daemon;
pub mod event_bus;
pub mod offer_reaper;
pub mod payout_scheduler;
pub mod rail_reconciler;
