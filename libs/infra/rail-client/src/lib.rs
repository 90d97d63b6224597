// [libs/infra/rail-client/src/lib.rs]

/*!
 * =================================================================
 * APARATO: PAYOUT RAIL UPLINK ROOT (V3.2 - IDEMPOTENT GOLD)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: EXPOSICIÓN DEL CLIENTE DE RAIL DE PAGOS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. OUT-OF-SCOPE RAILS: Este motor NO implementa transferencias; emite
 *    instrucciones idempotentes y reconcilia veredictos, nada más.
 * 2. LOCAL REFERENCE KEYING: Toda instrucción viaja con la referencia
 *    local como clave de idempotencia; el rail que la recibe dos veces
 *    debe responder el mismo acuse.
 * =================================================================
 */

pub mod client;
pub mod errors;

pub use client::{RailClient, RailStatusReport, SubmissionAck};
pub use errors::RailError;
