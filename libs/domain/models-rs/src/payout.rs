// [libs/domain/models-rs/src/payout.rs]
/*!
 * =================================================================
 * APARATO: PAYOUT CONTRACTS (V3.3 - RAIL RECONCILED)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: INSTRUCCIÓN DE PAGO POR LOTES Y SU MÁQUINA DE ESTADOS
 *
 * # Mathematical Proof (Conservation Linkage):
 * El importe del payout es la suma exacta de las líneas que lo
 * referencian. Completar sella las líneas; fallar las libera. En ambos
 * desenlaces la suma de ganancias del worker permanece invariante.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use typeshare::typeshare;
use uuid::Uuid;

use crate::errors::DomainError;

/// Estado de la instrucción de pago frente al rail externo.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    /// Creada por el lote; aún no enviada al rail.
    Pending,
    /// Instrucción enviada; veredicto del rail en tránsito.
    Processing,
    /// Terminal: fondos liquidados; las líneas quedan selladas.
    Completed,
    /// Terminal: el rail rechazó; las líneas quedan liberadas.
    Failed,
}

impl PayoutStatus {
    /// Forma textual estable para el Ledger Táctico.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Rehidrata desde la forma textual del Ledger.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        match raw {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(DomainError::UnknownEnumValue {
                kind: "payout_status",
                value: other.to_string(),
            }),
        }
    }

    /// Estados que ya no admiten sucesor.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Máquina monotónica: pending → processing → completed | failed.
    #[must_use]
    pub fn can_transition_to(&self, target: PayoutStatus) -> bool {
        matches!(
            (self, target),
            (Self::Pending, PayoutStatus::Processing)
                | (Self::Pending, PayoutStatus::Failed)
                | (Self::Processing, PayoutStatus::Completed)
                | (Self::Processing, PayoutStatus::Failed)
        )
    }

    /**
     * Sella una transición o reporta la violación de integridad.
     *
     * # Errors:
     * - `DomainError::InvalidTransition` cuando el salto no es legal.
     */
    pub fn ensure_transition(&self, target: PayoutStatus) -> Result<(), DomainError> {
        if !self.can_transition_to(target) {
            return Err(DomainError::InvalidTransition {
                entity: "payout",
                from: self.as_str().to_string(),
                to: target.as_str().to_string(),
            });
        }
        Ok(())
    }
}

/// Rail de liquidación elegido por el worker.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PayoutMethod {
    /// Transferencia bancaria tradicional.
    BankTransfer,
    /// Dinero móvil (billeteras telefónicas).
    MobileMoney,
    /// Crédito en billetera interna de la plataforma.
    Wallet,
}

impl PayoutMethod {
    /// Forma textual estable para el Ledger Táctico.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BankTransfer => "bank_transfer",
            Self::MobileMoney => "mobile_money",
            Self::Wallet => "wallet",
        }
    }

    /// Rehidrata desde la forma textual del Ledger.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        match raw {
            "bank_transfer" => Ok(Self::BankTransfer),
            "mobile_money" => Ok(Self::MobileMoney),
            "wallet" => Ok(Self::Wallet),
            other => Err(DomainError::UnknownEnumValue {
                kind: "payout_method",
                value: other.to_string(),
            }),
        }
    }
}

/**
 * Instrucción de pago por lote hacia el rail externo.
 *
 * La referencia es única por tenant y determinista por (worker, día),
 * lo que vuelve idempotente la corrida diaria de lotes.
 */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payout {
    /// Identificador opaco de la instrucción.
    pub id: Uuid,
    /// Tenant propietario.
    pub tenant_id: Uuid,
    /// Worker beneficiario.
    pub worker_id: Uuid,
    /// Suma exacta de las líneas enlazadas.
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    /// Moneda ISO-4217.
    pub currency: String,
    /// Estado vigente.
    pub status: PayoutStatus,
    /// Rail de liquidación.
    pub method: PayoutMethod,
    /// Cuenta o billetera destino.
    pub target_account: Option<String>,
    /// Referencia local única por tenant (clave de idempotencia).
    pub reference: String,
    /// Referencia emitida por el rail, si ya respondió.
    pub provider_reference: Option<String>,
    /// Causa del fallo terminal, si aplica.
    pub failure_reason: Option<String>,
    /// Instante del veredicto terminal del rail.
    pub processed_at: Option<DateTime<Utc>>,
    /// Versión de concurrencia optimista.
    pub version: i64,
    /// Instante de creación del lote.
    pub created_at: DateTime<Utc>,
}
