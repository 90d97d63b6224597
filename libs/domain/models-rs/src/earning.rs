// [libs/domain/models-rs/src/earning.rs]

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use typeshare::typeshare;
use uuid::Uuid;

use crate::errors::DomainError;

/// Origen tipificado de una línea del Ledger de ganancias.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EarningType {
    /// Pago base por tarea completada.
    TaskCompletion,
    /// Bono pactado de la tarea.
    Bonus,
    /// Propina capturada al cierre.
    Tip,
    /// Incentivo de campaña otorgado por el operador.
    Incentive,
    /// Corrección manual; único tipo con signo libre.
    Adjustment,
}

impl EarningType {
    /// Forma textual estable para el Ledger Táctico.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TaskCompletion => "task_completion",
            Self::Bonus => "bonus",
            Self::Tip => "tip",
            Self::Incentive => "incentive",
            Self::Adjustment => "adjustment",
        }
    }

    /// Rehidrata desde la forma textual del Ledger.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        match raw {
            "task_completion" => Ok(Self::TaskCompletion),
            "bonus" => Ok(Self::Bonus),
            "tip" => Ok(Self::Tip),
            "incentive" => Ok(Self::Incentive),
            "adjustment" => Ok(Self::Adjustment),
            other => Err(DomainError::UnknownEnumValue {
                kind: "earning_type",
                value: other.to_string(),
            }),
        }
    }

    /// Solo los ajustes admiten magnitud negativa.
    #[must_use]
    pub fn allows_negative_amount(&self) -> bool {
        matches!(self, Self::Adjustment)
    }
}

/**
 * Línea inmutable del Ledger de ganancias (append-only).
 *
 * Invariante: `is_paid_out` implica `payout_id` no-nulo y el payout
 * propietario en estado `completed`. El enlace a un payout solo existe
 * mientras ese payout habita un estado no-terminal o `completed`.
 */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Earning {
    /// Identificador opaco de la línea.
    pub id: Uuid,
    /// Tenant propietario.
    pub tenant_id: Uuid,
    /// Worker beneficiario.
    pub worker_id: Uuid,
    /// Tarea de origen, si la línea nace de una (ajustes pueden no tenerla).
    pub task_id: Option<Uuid>,
    /// Origen tipificado.
    pub entry_type: EarningType,
    /// Magnitud con signo (negativa solo en ajustes).
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    /// Moneda ISO-4217.
    pub currency: String,
    /// Sellada como pagada por un payout completado.
    pub is_paid_out: bool,
    /// Payout propietario del enlace vigente, si existe.
    pub payout_id: Option<Uuid>,
    /// Nota operativa (obligatoria en ajustes manuales).
    pub description: Option<String>,
    /// Instante de devengo.
    pub earned_at: DateTime<Utc>,
}
