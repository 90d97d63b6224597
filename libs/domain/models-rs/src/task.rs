// [libs/domain/models-rs/src/task.rs]
/*!
 * =================================================================
 * APARATO: TASK DOMAIN CONTRACTS (V5.1 - LIFECYCLE SEALED)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: DEFINICIÓN DE LA UNIDAD DE TRABAJO DE CAMPO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. CLOSED STATE MACHINE: La tabla de transiciones legales vive aquí
 *    y en ningún otro estrato; el Store solo ejecuta lo que esta tabla
 *    autoriza.
 * 2. TYPE-DRIVEN LOCATIONS: Cada tipo de tarea declara qué extremos
 *    geográficos exige; la validación ocurre al sellar el borrador.
 * 3. MONETARY SOVEREIGNTY: base/bono/propina como decimal de punto
 *    fijo; la no-negatividad se valida en la puerta.
 *
 * # Mathematical Proof (Monotone Lifecycle):
 * La relación de transición es acíclica sobre los estados no terminales
 * y ningún estado terminal posee sucesores: toda ejecución de tarea es
 * una cadena finita y monótona.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use typeshare::typeshare;
use uuid::Uuid;
use veloz_core_geo::point::GeoPoint;

use crate::errors::DomainError;
use crate::money::require_non_negative;
use crate::worker::WorkerType;

/// Naturaleza comercial de la tarea de campo.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Entrega de mercancía: exige origen y destino.
    Delivery,
    /// Recogida de mercancía: exige origen y destino.
    Pickup,
    /// Visita comercial: exige solo el punto de visita.
    SalesVisit,
    /// Cobranza en campo: exige solo el punto de visita.
    Collection,
    /// Reposición / exhibición en punto de venta.
    Merchandising,
}

impl TaskType {
    /// Forma textual estable para el Ledger Táctico.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivery => "delivery",
            Self::Pickup => "pickup",
            Self::SalesVisit => "sales_visit",
            Self::Collection => "collection",
            Self::Merchandising => "merchandising",
        }
    }

    /// Rehidrata desde la forma textual del Ledger.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        match raw {
            "delivery" => Ok(Self::Delivery),
            "pickup" => Ok(Self::Pickup),
            "sales_visit" => Ok(Self::SalesVisit),
            "collection" => Ok(Self::Collection),
            "merchandising" => Ok(Self::Merchandising),
            other => Err(DomainError::UnknownEnumValue {
                kind: "task_type",
                value: other.to_string(),
            }),
        }
    }

    /// Indica si el tipo exige un punto de entrega además del de origen.
    #[must_use]
    pub fn requires_delivery_point(&self) -> bool {
        matches!(self, Self::Delivery | Self::Pickup)
    }
}

/// Estado del ciclo de vida de la tarea.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Creada y en espera de despacho o re-despacho.
    Pending,
    /// Reclamada atómicamente por un worker (pre-confirmación).
    Assigned,
    /// Confirmada por el worker; consume capacidad.
    Accepted,
    /// En ejecución sobre el terreno.
    InProgress,
    /// Terminal: completada con evidencia.
    Completed,
    /// Terminal: fallida; sin ganancias salvo bonos pre-aprobados.
    Failed,
    /// Terminal: cancelada por el operador.
    Cancelled,
}

impl TaskStatus {
    /// Forma textual estable para el Ledger Táctico.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Assigned => "assigned",
            Self::Accepted => "accepted",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Rehidrata desde la forma textual del Ledger.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        match raw {
            "pending" => Ok(Self::Pending),
            "assigned" => Ok(Self::Assigned),
            "accepted" => Ok(Self::Accepted),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(DomainError::UnknownEnumValue {
                kind: "task_status",
                value: other.to_string(),
            }),
        }
    }

    /// Estados que ya no admiten sucesor alguno.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Estados que consumen capacidad del worker asignado.
    #[must_use]
    pub fn consumes_capacity(&self) -> bool {
        matches!(self, Self::Assigned | Self::Accepted | Self::InProgress)
    }

    /// Tabla soberana de transiciones legales de la máquina de estados.
    #[must_use]
    pub fn can_transition_to(&self, target: TaskStatus) -> bool {
        matches!(
            (self, target),
            (Self::Pending, TaskStatus::Assigned)
                | (Self::Pending, TaskStatus::Cancelled)
                | (Self::Assigned, TaskStatus::Accepted)
                | (Self::Assigned, TaskStatus::Cancelled)
                | (Self::Accepted, TaskStatus::InProgress)
                | (Self::Accepted, TaskStatus::Cancelled)
                | (Self::InProgress, TaskStatus::Completed)
                | (Self::InProgress, TaskStatus::Failed)
        )
    }

    /**
     * Sella una transición o reporta la violación de integridad.
     *
     * # Errors:
     * - `DomainError::InvalidTransition` cuando el salto no es legal.
     */
    pub fn ensure_transition(&self, target: TaskStatus) -> Result<(), DomainError> {
        if !self.can_transition_to(target) {
            return Err(DomainError::InvalidTransition {
                entity: "task",
                from: self.as_str().to_string(),
                to: target.as_str().to_string(),
            });
        }
        Ok(())
    }
}

/// Clase de evidencia admisible para la certificación de una tarea.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProofType {
    /// Fotografía del punto de entrega o exhibición.
    Photo,
    /// Firma del receptor.
    Signature,
    /// Escaneo de código de barras del paquete.
    Barcode,
    /// Documento adjunto (remito, factura).
    Document,
}

impl ProofType {
    /// Forma textual estable para el Ledger Táctico.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Signature => "signature",
            Self::Barcode => "barcode",
            Self::Document => "document",
        }
    }

    /// Rehidrata desde la forma textual del Ledger.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        match raw {
            "photo" => Ok(Self::Photo),
            "signature" => Ok(Self::Signature),
            "barcode" => Ok(Self::Barcode),
            "document" => Ok(Self::Document),
            other => Err(DomainError::UnknownEnumValue {
                kind: "proof_type",
                value: other.to_string(),
            }),
        }
    }
}

/// Evidencia inmutable adjunta durante la ejecución o el cierre.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskProof {
    /// Identificador opaco de la evidencia.
    #[typeshare(serialized_as = "String")]
    pub id: Uuid,
    /// Tarea propietaria.
    #[typeshare(serialized_as = "String")]
    pub task_id: Uuid,
    /// Clase de evidencia.
    pub proof_type: ProofType,
    /// Localizador del recurso (bucket upstream).
    pub url: String,
    /// Coordenada de captura, si el cliente la reporta.
    pub captured_at_point: Option<GeoPoint>,
    /// Nota breve del worker.
    pub caption: Option<String>,
    /// Instante de adjunción.
    #[typeshare(serialized_as = "String")]
    pub attached_at: DateTime<Utc>,
}

/// Punto geográfico con dirección humana (extremo de tarea o parada).
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SitePoint {
    /// Coordenada validada sobre la esfera.
    pub point: GeoPoint,
    /// Dirección postal o referencia humana.
    pub address: String,
}

/// Borrador de creación: lo que el partner envía a `POST /tasks`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDraft {
    /// Naturaleza comercial de la tarea.
    pub task_type: TaskType,
    /// Prioridad entera (mayor = más urgente).
    pub priority: i32,
    /// Especialidad exigida al worker.
    pub required_worker_type: WorkerType,
    /// Habilidades exigidas (subconjunto de las del candidato).
    pub required_skills: Vec<String>,
    /// Zona operativa exigida, si aplica.
    pub zone_id: Option<String>,
    /// Punto de origen o visita.
    pub pickup: Option<SitePoint>,
    /// Punto de entrega (exigido por delivery/pickup).
    pub delivery: Option<SitePoint>,
    /// Programación pactada.
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Fecha límite contractual.
    pub deadline_at: Option<DateTime<Utc>>,
    /// Duración estimada en minutos.
    pub estimated_duration_minutes: Option<i64>,
    /// Distancia estimada en kilómetros.
    pub estimated_distance_km: Option<f64>,
    /// Pago base.
    #[serde(with = "rust_decimal::serde::str")]
    pub base_pay: Decimal,
    /// Bono pactado.
    #[serde(with = "rust_decimal::serde::str")]
    pub bonus_pay: Decimal,
    /// Moneda ISO-4217.
    pub currency: String,
    /// Clases de evidencia exigidas al cierre.
    pub required_proof_types: Vec<ProofType>,
    /// Referencia del pedido upstream, si existe.
    pub order_reference: Option<String>,
    /// Bolsa opaca del partner (el motor no la interpreta).
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl TaskDraft {
    /**
     * Valida la coherencia interna del borrador para su tipo.
     *
     * # Errors:
     * - `DomainError::LocationRequired` si falta un extremo exigido.
     * - `DomainError::NegativeAmount` en importes nominales negativos.
     */
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.pickup.is_none() {
            return Err(DomainError::LocationRequired("pickup"));
        }
        if self.task_type.requires_delivery_point() && self.delivery.is_none() {
            return Err(DomainError::LocationRequired("delivery"));
        }
        require_non_negative("base_pay", self.base_pay)?;
        require_non_negative("bonus_pay", self.bonus_pay)?;
        Ok(())
    }
}

/**
 * Entidad soberana de la unidad de trabajo de campo.
 *
 * Invariantes selladas por el Store:
 * - `assigned_worker_id` es no-nulo ⇔ status ∉ {pending, cancelled};
 * - a lo sumo un worker en todo el ciclo de vida;
 * - `completed_at >= started_at >= created_at`.
 */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Identificador opaco de 128 bits.
    pub id: Uuid,
    /// Tenant propietario.
    pub tenant_id: Uuid,
    /// Naturaleza comercial.
    pub task_type: TaskType,
    /// Estado vigente del ciclo de vida.
    pub status: TaskStatus,
    /// Prioridad entera (mayor = más urgente).
    pub priority: i32,
    /// Worker asignado tras el claim atómico.
    pub assigned_worker_id: Option<Uuid>,
    /// Especialidad exigida.
    pub required_worker_type: WorkerType,
    /// Habilidades exigidas.
    pub required_skills: Vec<String>,
    /// Zona operativa exigida, si aplica.
    pub zone_id: Option<String>,
    /// Punto de origen o visita.
    pub pickup: Option<SitePoint>,
    /// Punto de entrega.
    pub delivery: Option<SitePoint>,
    /// Programación pactada.
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Fecha límite contractual.
    pub deadline_at: Option<DateTime<Utc>>,
    /// Duración estimada (minutos).
    pub estimated_duration_minutes: Option<i64>,
    /// Distancia estimada (km).
    pub estimated_distance_km: Option<f64>,
    /// Duración real capturada al cierre (minutos).
    pub actual_duration_minutes: Option<i64>,
    /// Distancia real capturada al cierre (km).
    pub actual_distance_km: Option<f64>,
    /// Pago base.
    #[serde(with = "rust_decimal::serde::str")]
    pub base_pay: Decimal,
    /// Bono pactado.
    #[serde(with = "rust_decimal::serde::str")]
    pub bonus_pay: Decimal,
    /// Propina capturada al cierre.
    #[serde(with = "rust_decimal::serde::str")]
    pub tip_amount: Decimal,
    /// Moneda ISO-4217.
    pub currency: String,
    /// Clases de evidencia exigidas al cierre.
    pub required_proof_types: Vec<ProofType>,
    /// Evidencias adjuntas (append-only).
    pub proofs: Vec<TaskProof>,
    /// Referencia del pedido upstream.
    pub order_reference: Option<String>,
    /// Bolsa opaca del partner.
    pub metadata: serde_json::Value,
    /// Marca de escalamiento tras agotar las waves de despacho.
    pub escalated_at: Option<DateTime<Utc>>,
    /// Instante de inicio de ejecución.
    pub started_at: Option<DateTime<Utc>>,
    /// Instante de cierre exitoso.
    pub completed_at: Option<DateTime<Utc>>,
    /// Motivo de cancelación o fallo, si aplica.
    pub termination_reason: Option<String>,
    /// Versión de concurrencia optimista.
    pub version: i64,
    /// Instante de creación.
    pub created_at: DateTime<Utc>,
    /// Instante de última mutación.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Punto que gobierna el despacho (origen o visita).
    #[must_use]
    pub fn dispatch_point(&self) -> Option<&GeoPoint> {
        self.pickup.as_ref().map(|site| &site.point)
    }

    /// Clases de evidencia aún no satisfechas por las pruebas adjuntas.
    #[must_use]
    pub fn missing_proof_types(&self, incoming: &[TaskProof]) -> Vec<ProofType> {
        self.required_proof_types
            .iter()
            .copied()
            .filter(|required| {
                !self.proofs.iter().any(|proof| proof.proof_type == *required)
                    && !incoming.iter().any(|proof| proof.proof_type == *required)
            })
            .collect()
    }
}
