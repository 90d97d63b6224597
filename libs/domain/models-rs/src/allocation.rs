// [libs/domain/models-rs/src/allocation.rs]
/*!
 * =================================================================
 * APARATO: ALLOCATION CONTRACTS (V4.0 - MUTUAL EXCLUSION READY)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: ARTEFACTO DE OFERTA DEL SCHEDULER
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SCHEDULER OWNERSHIP: La asignación referencia tarea y worker pero
 *    no pertenece a ninguno; es el artefacto propio del Dispatcher.
 * 2. SINGLE MUTATION: Tras su creación, una asignación muta a lo sumo
 *    una vez (respuesta del worker o barrido de expiración).
 * 3. RACE SEMANTICS: Perder la carrera del claim no es un error
 *    operacional; es un desenlace esperado con razón tipificada.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;
use uuid::Uuid;

use crate::errors::DomainError;

/// Estado de una oferta emitida por el Dispatcher.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStatus {
    /// Creada pero aún no notificada (ventana transitoria de wave).
    Pending,
    /// Oferta viva con TTL corriendo.
    Offered,
    /// Ganadora del claim atómico (a lo sumo una por tarea).
    Accepted,
    /// Rechazada explícitamente por el worker.
    Rejected,
    /// Expirada por TTL, carrera perdida o preempción de capacidad.
    Expired,
}

impl AllocationStatus {
    /// Forma textual estable para el Ledger Táctico.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Offered => "offered",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
        }
    }

    /// Rehidrata desde la forma textual del Ledger.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        match raw {
            "pending" => Ok(Self::Pending),
            "offered" => Ok(Self::Offered),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            "expired" => Ok(Self::Expired),
            other => Err(DomainError::UnknownEnumValue {
                kind: "allocation_status",
                value: other.to_string(),
            }),
        }
    }
}

/// Razón tipificada del cierre no-aceptado de una oferta.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryReason {
    /// Otra asignación ganó el claim atómico de la tarea.
    LostRace,
    /// El worker alcanzó su tope de tareas concurrentes.
    CapacityReached,
    /// El TTL de la oferta venció sin respuesta.
    OfferTimeout,
    /// La tarea fue cancelada con ofertas en vuelo.
    TaskCancelled,
    /// El worker declinó la oferta.
    WorkerRejected,
}

impl ExpiryReason {
    /// Forma textual estable para el Ledger Táctico.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LostRace => "lost_race",
            Self::CapacityReached => "capacity_reached",
            Self::OfferTimeout => "offer_timeout",
            Self::TaskCancelled => "task_cancelled",
            Self::WorkerRejected => "worker_rejected",
        }
    }

    /// Rehidrata desde la forma textual del Ledger.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        match raw {
            "lost_race" => Ok(Self::LostRace),
            "capacity_reached" => Ok(Self::CapacityReached),
            "offer_timeout" => Ok(Self::OfferTimeout),
            "task_cancelled" => Ok(Self::TaskCancelled),
            "worker_rejected" => Ok(Self::WorkerRejected),
            other => Err(DomainError::UnknownEnumValue {
                kind: "expiry_reason",
                value: other.to_string(),
            }),
        }
    }
}

/**
 * Oferta puntual de una tarea a un worker, con expiración de pared.
 *
 * Invariante del Store: exactamente cero o una asignación `accepted`
 * por tarea, sellada por índice único parcial.
 */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allocation {
    /// Identificador opaco de la oferta.
    pub id: Uuid,
    /// Tarea ofertada.
    pub task_id: Uuid,
    /// Worker destinatario.
    pub worker_id: Uuid,
    /// Estado vigente.
    pub status: AllocationStatus,
    /// Puntuación del candidato al momento de la wave.
    pub score: f64,
    /// Distancia al punto de despacho (km, 3 decimales).
    pub distance_km: f64,
    /// Estimación de arribo en minutos a velocidad nominal.
    pub eta_minutes: f64,
    /// Número de wave que emitió la oferta (1-based).
    pub wave: i32,
    /// Instante de emisión.
    pub offered_at: DateTime<Utc>,
    /// Vencimiento de pared de la oferta.
    pub expires_at: DateTime<Utc>,
    /// Instante de respuesta (solo accepted/rejected).
    pub responded_at: Option<DateTime<Utc>>,
    /// Razón del cierre no-aceptado, si aplica.
    pub reason: Option<ExpiryReason>,
    /// Versión de concurrencia optimista.
    pub version: i64,
}

impl Allocation {
    /// Evalúa si la oferta sigue viva frente al reloj de pared.
    #[must_use]
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.status == AllocationStatus::Offered && now < self.expires_at
    }
}
