// [libs/infra/db-turso/src/retry.rs]
/*!
 * =================================================================
 * APARATO: TRANSIENT RETRY ENGINE (V2.0 - JITTER SEALED)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: REINTENTO ACOTADO DE FALLOS TRANSITORIOS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. CLASS DISCIPLINE: SOLO los fallos clasificados como transitorios
 *    se reintentan; los conflictos optimistas ('stale') exigen relectura
 *    de la entidad y jamás pasan por este motor.
 * 2. CONTRACTUAL CURVE: Base 50 ms, tope 2 s, 5 intentos, jitter
 *    uniforme para descorrelacionar a los llamadores concurrentes.
 * =================================================================
 */

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::errors::DbError;

/// Base contractual de la curva exponencial.
const BACKOFF_BASE_MILLISECONDS: u64 = 50;

/// Tope duro de la espera entre intentos.
const BACKOFF_CAP_MILLISECONDS: u64 = 2_000;

/// Intentos máximos antes de rendirse (incluye el primero).
const MAXIMUM_ATTEMPTS: u32 = 5;

/**
 * Ejecuta la operación con reintento exponencial + jitter sobre fallos
 * transitorios. Cualquier fallo no-transitorio corta el ciclo de
 * inmediato y se propaga intacto.
 *
 * # Errors:
 * El último fallo transitorio tras agotar los intentos (el estrato API
 * lo presenta como 'busy'), o el primer fallo no-transitorio.
 */
pub async fn with_backoff<T, F, Fut>(operation_label: &str, mut operation: F) -> Result<T, DbError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbError>>,
{
    let mut attempt_index: u32 = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(fault) if fault.is_transient() && attempt_index + 1 < MAXIMUM_ATTEMPTS => {
                let exponential_milliseconds = BACKOFF_BASE_MILLISECONDS
                    .saturating_mul(1_u64 << attempt_index)
                    .min(BACKOFF_CAP_MILLISECONDS);
                let jitter_milliseconds =
                    rand::thread_rng().gen_range(0..=exponential_milliseconds / 2);

                warn!(
                    "🔁 [RETRY]: {} transient fault (attempt {}): {}",
                    operation_label,
                    attempt_index + 1,
                    fault
                );

                tokio::time::sleep(Duration::from_millis(
                    exponential_milliseconds + jitter_milliseconds,
                ))
                .await;
                attempt_index += 1;
            }
            Err(fault) => return Err(fault),
        }
    }
}
