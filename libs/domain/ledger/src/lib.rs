// [libs/domain/ledger/src/lib.rs]

#![deny(missing_docs)]

//! # APARATO: EARNINGS LEDGER POLICY HUB (V3.1 - CONSERVATION GOLD)
//! CLASIFICACIÓN: DOMAIN FINANCE (ESTRATO L2)
//! RESPONSABILIDAD: POLÍTICA PURA DEL LEDGER DE GANANCIAS Y PAGOS
//!
//! ## Visión Holística 2026
//! La persistencia transaccional vive en el Store; aquí vive la política:
//! qué líneas nacen al cierre de una tarea, qué workers entran al lote
//! de pago, y la ley de conservación que todo instante debe satisfacer.
//!
//! ## Características de Élite
//! 1. **Float Prohibition:** Toda la aritmética es 'rust_decimal'.
//! 2. **Linkage Idempotency:** las líneas enlazadas a un lote vivo no
//!    re-entran a la corrida; repetirla es un no-op estructural.
//! 3. **Conservation Law:** Σ ganancias ≡ Σ pagos completados + no-pagado,
//!    verificable por cualquier auditor externo.

/// Loteo de pagos: agrupación por worker y moneda, umbral mínimo.
pub mod batching;

/// Composición de líneas del Ledger al cierre de una tarea.
pub mod composition;

pub use crate::batching::{batch_reference, plan_payout_batches, verify_conservation, PayoutBatchPlan, UnpaidLine};
pub use crate::composition::{build_completion_earnings, EarningDraft};
