// [libs/domain/models-rs/src/money.rs]
/*!
 * =================================================================
 * APARATO: MONETARY SCALAR DISCIPLINE (V2.0 - DECIMAL SEALED)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: ARITMÉTICA FINANCIERA DE PUNTO FIJO (20,6)
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. FLOAT PROHIBITION: Ningún importe del Ledger toca jamás un f64;
 *    'rust_decimal' preserva los 6 dígitos fraccionarios contractuales
 *    a través de toda la aritmética.
 * 2. PRESENTATION-ONLY ROUNDING: El redondeo bancario (mitad al par)
 *    ocurre exclusivamente en la frontera de presentación.
 * 3. WIRE FORMAT: Los importes viajan como cadenas decimales en JSON.
 * =================================================================
 */

use rust_decimal::{Decimal, RoundingStrategy};

use crate::errors::DomainError;

/// Dígitos fraccionarios preservados por el Ledger (decimal 20,6).
pub const MONETARY_SCALE: u32 = 6;

/**
 * Sella un importe para la frontera de presentación.
 *
 * Aplica redondeo bancario (mitad al par) a la escala contractual y
 * retorna la cadena decimal canónica. Es la ÚNICA vía de redondeo
 * autorizada del sistema; el interior del Ledger opera sin redondear.
 */
#[must_use]
pub fn present_amount(amount: Decimal) -> String {
    amount
        .round_dp_with_strategy(MONETARY_SCALE, RoundingStrategy::MidpointNearestEven)
        .to_string()
}

/**
 * Valida la no-negatividad de un importe nominal (base, bono, propina).
 *
 * # Errors:
 * - `DomainError::NegativeAmount` con la etiqueta del campo ofensor.
 *   Los ajustes manuales NO pasan por esta guardia: su signo es libre.
 */
pub fn require_non_negative(field_label: &str, amount: Decimal) -> Result<(), DomainError> {
    if amount < Decimal::ZERO {
        return Err(DomainError::NegativeAmount(format!(
            "{} = {}",
            field_label, amount
        )));
    }
    Ok(())
}
