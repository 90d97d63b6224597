// [libs/infra/db-turso/src/lib.rs]

/*!
 * =================================================================
 * APARATO: TACTICAL PERSISTENCE ROOT (V5.2 - SETTLEMENT GOLD)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: EXPOSICIÓN DE REPOSITORIOS Y PRIMITIVAS ATÓMICAS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. NARROW AGGREGATES: Un repositorio por agregado (workers, tasks,
 *    allocations, earnings, payouts, routes); ningún consumidor depende
 *    de una fachada polimórfica de cuarenta métodos.
 * 2. UNIT OF WORK: Las secuencias multi-tabla (claim, cierre con
 *    ganancias, cancelación, liquidación) son operaciones nominales de
 *    primera clase con transacción propia.
 * 3. OPTIMISTIC DISCIPLINE: Toda mutación es WHERE id AND version; el
 *    conflicto se reporta como señal 'stale' distinguida, jamás se
 *    reintenta a ciegas.
 * =================================================================
 */

pub mod client;
pub mod errors;
pub(crate) mod mapping;
pub mod repositories;
pub mod retry;
pub mod schema;
pub mod unit_of_work;

pub use client::TursoClient;
pub use errors::DbError;
pub use unit_of_work::{ClaimOutcome, UnitOfWork};
