// [libs/domain/ledger/src/batching.rs]
/*!
 * =================================================================
 * APARATO: PAYOUT BATCHING POLICY (V3.1 - IDEMPOTENT RUN)
 * CLASIFICACIÓN: DOMAIN FINANCE (ESTRATO L2)
 * RESPONSABILIDAD: AGRUPACIÓN DE LÍNEAS NO-PAGADAS EN LOTES DE PAGO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. GROUPING LAW: Un lote por (worker, moneda); jamás se mezclan
 *    monedas dentro de una instrucción de pago.
 * 2. THRESHOLD GATE: Un worker entra al lote solo si su total no-pagado
 *    alcanza el mínimo configurado del tenant; los ajustes negativos
 *    reducen el total y pueden posponer al worker hasta recuperarse.
 * 3. LINKAGE IDEMPOTENCY: La re-ejecución de la corrida es inocua
 *    porque las líneas ya enlazadas a un lote vivo no integran la
 *    colección de entrada; la referencia lleva fecha, worker y nonce
 *    (un lote fallido libera sus líneas y el re-lote del MISMO día
 *    exige una referencia nueva bajo la unicidad (tenant, reference)).
 *
 * # Mathematical Proof (No Double-Count):
 * Cada línea aparece en a lo sumo un plan porque la partición por
 * (worker, moneda) es disjunta y las líneas ya enlazadas a un payout
 * vivo no integran la colección de entrada.
 * =================================================================
 */

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Línea no-pagada mínima que la política necesita para lotear.
#[derive(Debug, Clone, PartialEq)]
pub struct UnpaidLine {
    /// Identificador de la línea del Ledger.
    pub earning_id: Uuid,
    /// Worker beneficiario.
    pub worker_id: Uuid,
    /// Magnitud con signo.
    pub amount: Decimal,
    /// Moneda ISO-4217.
    pub currency: String,
}

/// Plan de lote listo para su materialización transaccional.
#[derive(Debug, Clone, PartialEq)]
pub struct PayoutBatchPlan {
    /// Worker beneficiario del lote.
    pub worker_id: Uuid,
    /// Moneda del lote.
    pub currency: String,
    /// Suma exacta de las líneas incluidas.
    pub total_amount: Decimal,
    /// Líneas que el lote enlazará.
    pub earning_ids: Vec<Uuid>,
    /// Referencia única por tenant (fecha + worker + nonce).
    pub reference: String,
}

/// Referencia del lote: PB-{fecha}-{worker}-{nonce}, única por tenant.
#[must_use]
pub fn batch_reference(worker_id: Uuid, run_date: NaiveDate, batch_nonce: Uuid) -> String {
    let worker_compact = worker_id.simple().to_string();
    let nonce_compact = batch_nonce.simple().to_string();
    format!(
        "PB-{}-{}-{}",
        run_date.format("%Y%m%d"),
        &worker_compact[..8],
        &nonce_compact[..8]
    )
}

/**
 * Particiona las líneas no-pagadas en planes de lote por (worker, moneda).
 *
 * Solo los grupos cuyo total alcanza `min_payout_amount` producen plan.
 * El orden de los planes es determinista (worker, moneda ascendentes).
 */
#[must_use]
pub fn plan_payout_batches(
    unpaid_lines: Vec<UnpaidLine>,
    min_payout_amount: Decimal,
    run_date: NaiveDate,
) -> Vec<PayoutBatchPlan> {
    let mut groups: BTreeMap<(Uuid, String), (Decimal, Vec<Uuid>)> = BTreeMap::new();

    for line in unpaid_lines {
        let entry = groups
            .entry((line.worker_id, line.currency.clone()))
            .or_insert((Decimal::ZERO, Vec::new()));
        entry.0 += line.amount;
        entry.1.push(line.earning_id);
    }

    groups
        .into_iter()
        .filter(|(_, (total, _))| *total >= min_payout_amount && *total > Decimal::ZERO)
        .map(|((worker_id, currency), (total_amount, earning_ids))| PayoutBatchPlan {
            worker_id,
            currency,
            total_amount,
            earning_ids,
            reference: batch_reference(worker_id, run_date, Uuid::new_v4()),
        })
        .collect()
}

/**
 * Ley de conservación del Ledger para un worker:
 * Σ ganancias ≡ Σ pagos completados + total no-pagado, a menos de los
 * importes adscritos a pagos actualmente en vuelo.
 */
#[must_use]
pub fn verify_conservation(
    total_earned: Decimal,
    total_completed_payouts: Decimal,
    total_unpaid: Decimal,
    total_in_flight: Decimal,
) -> bool {
    total_earned == total_completed_payouts + total_unpaid + total_in_flight
}
