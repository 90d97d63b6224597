// [libs/domain/models-rs/src/route.rs]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;
use uuid::Uuid;

use crate::errors::DomainError;
use crate::task::SitePoint;

/// Estado del recorrido multi-parada de un worker.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    /// Compuesta pero aún no iniciada.
    Pending,
    /// En ejecución (a lo sumo una activa por worker).
    Active,
    /// Terminal: todas las paradas cerradas.
    Completed,
    /// Terminal: abortada por el operador o el worker.
    Cancelled,
}

impl RouteStatus {
    /// Forma textual estable para el Ledger Táctico.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Rehidrata desde la forma textual del Ledger.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        match raw {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(DomainError::UnknownEnumValue {
                kind: "route_status",
                value: other.to_string(),
            }),
        }
    }
}

/// Estado de una parada individual dentro del recorrido.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RouteStopStatus {
    /// Aún no visitada.
    Pending,
    /// El worker reportó arribo físico.
    Arrived,
    /// Cerrada con la tarea subyacente resuelta.
    Completed,
    /// Saltada por decisión operativa.
    Skipped,
}

impl RouteStopStatus {
    /// Forma textual estable para el Ledger Táctico.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Arrived => "arrived",
            Self::Completed => "completed",
            Self::Skipped => "skipped",
        }
    }

    /// Rehidrata desde la forma textual del Ledger.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        match raw {
            "pending" => Ok(Self::Pending),
            "arrived" => Ok(Self::Arrived),
            "completed" => Ok(Self::Completed),
            "skipped" => Ok(Self::Skipped),
            other => Err(DomainError::UnknownEnumValue {
                kind: "route_stop_status",
                value: other.to_string(),
            }),
        }
    }
}

/**
 * Parada ordenada del recorrido.
 *
 * Invariantes: la tarea referenciada pertenece al worker del recorrido;
 * `completed` exige `completed_at`; `arrived` exige `actual_arrival`.
 */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteStop {
    /// Identificador opaco de la parada.
    pub id: Uuid,
    /// Recorrido propietario.
    pub route_id: Uuid,
    /// Tarea que se resuelve en esta parada.
    pub task_id: Uuid,
    /// Posición 1-based contigua dentro del recorrido.
    pub sequence: i32,
    /// Estado vigente de la parada.
    pub status: RouteStopStatus,
    /// Ubicación y dirección de la parada.
    pub location: SitePoint,
    /// Distancia desde la parada previa (km, 3 decimales).
    pub distance_from_prev_km: f64,
    /// Duración estimada desde la parada previa (minutos).
    pub duration_from_prev_minutes: f64,
    /// Arribo estimado desde el inicio del recorrido.
    pub estimated_arrival: Option<DateTime<Utc>>,
    /// Arribo físico reportado.
    pub actual_arrival: Option<DateTime<Utc>>,
    /// Cierre de la parada.
    pub completed_at: Option<DateTime<Utc>>,
}

/**
 * Recorrido multi-parada compuesto por el Route Builder.
 *
 * Invariantes: paradas ordenadas por `sequence` desde 1 y contiguas;
 * `total_distance_km` = Σ `distance_from_prev_km`.
 */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    /// Identificador opaco del recorrido.
    pub id: Uuid,
    /// Tenant propietario.
    pub tenant_id: Uuid,
    /// Worker ejecutor.
    pub worker_id: Uuid,
    /// Estado vigente.
    pub status: RouteStatus,
    /// Distancia total planificada (km).
    pub total_distance_km: f64,
    /// Duración total estimada (minutos).
    pub total_duration_minutes: f64,
    /// Fin estimado del recorrido.
    pub estimated_end_at: Option<DateTime<Utc>>,
    /// Inicio real.
    pub started_at: Option<DateTime<Utc>>,
    /// Cierre real.
    pub completed_at: Option<DateTime<Utc>>,
    /// 1 − (final/greedy) reportado por el optimizador, en [0,1].
    pub optimization_score: f64,
    /// Paradas ordenadas del recorrido.
    pub stops: Vec<RouteStop>,
    /// Versión de concurrencia optimista.
    pub version: i64,
    /// Instante de creación.
    pub created_at: DateTime<Utc>,
}
