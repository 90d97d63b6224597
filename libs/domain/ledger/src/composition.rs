// [libs/domain/ledger/src/composition.rs]
/*!
 * =================================================================
 * APARATO: EARNING COMPOSITION ENGINE (V3.1 - APPEND-ONLY SEALED)
 * CLASIFICACIÓN: DOMAIN FINANCE (ESTRATO L2)
 * RESPONSABILIDAD: GÉNESIS DE LÍNEAS DEL LEDGER AL CIERRE DE TAREA
 *
 * # Mathematical Proof (Line Minimality):
 * El cierre genera exactamente una línea 'task_completion' más una
 * línea opcional por cada magnitud estrictamente positiva (bono,
 * propina). Jamás nacen líneas de importe cero: el Ledger no acumula
 * ruido y la suma por tarea es exactamente base + bono + propina.
 * =================================================================
 */

use rust_decimal::Decimal;
use uuid::Uuid;

use veloz_domain_models::earning::EarningType;

/// Borrador de línea listo para su inserción transaccional en el Store.
#[derive(Debug, Clone, PartialEq)]
pub struct EarningDraft {
    /// Origen tipificado de la línea.
    pub entry_type: EarningType,
    /// Magnitud con signo (positiva en todo origen salvo ajustes).
    pub amount: Decimal,
    /// Moneda ISO-4217 heredada de la tarea.
    pub currency: String,
    /// Tarea de origen.
    pub task_id: Option<Uuid>,
    /// Nota operativa.
    pub description: Option<String>,
}

/**
 * Compone las líneas que el cierre de una tarea debe insertar
 * dentro de la MISMA transacción que sella el estado 'completed'.
 *
 * Una base de cero produce igualmente su línea 'task_completion':
 * el rastro de que la tarea liquidó en cero es información, no ruido.
 */
#[must_use]
pub fn build_completion_earnings(
    task_id: Uuid,
    base_pay: Decimal,
    bonus_pay: Decimal,
    tip_amount: Decimal,
    currency: &str,
) -> Vec<EarningDraft> {
    let mut drafts = vec![EarningDraft {
        entry_type: EarningType::TaskCompletion,
        amount: base_pay,
        currency: currency.to_string(),
        task_id: Some(task_id),
        description: None,
    }];

    if bonus_pay > Decimal::ZERO {
        drafts.push(EarningDraft {
            entry_type: EarningType::Bonus,
            amount: bonus_pay,
            currency: currency.to_string(),
            task_id: Some(task_id),
            description: None,
        });
    }

    if tip_amount > Decimal::ZERO {
        drafts.push(EarningDraft {
            entry_type: EarningType::Tip,
            amount: tip_amount,
            currency: currency.to_string(),
            task_id: Some(task_id),
            description: None,
        });
    }

    drafts
}
