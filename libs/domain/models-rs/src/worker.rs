// [libs/domain/models-rs/src/worker.rs]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;
use uuid::Uuid;
use veloz_core_geo::point::GeoPoint;

use crate::errors::DomainError;

/// Especialidad operativa de la unidad de campo.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkerType {
    /// Conductor de vehículo de cuatro ruedas (entregas voluminosas).
    Driver,
    /// Repartidor en motocicleta o bicicleta (última milla urbana).
    Rider,
    /// Representante de ventas en campo (visitas comerciales).
    SalesRep,
    /// Operario de almacén y preparación de pedidos.
    Warehouse,
    /// Promotor de punto de venta (exhibición y reposición).
    Merchandiser,
}

impl WorkerType {
    /// Forma textual estable para el Ledger Táctico.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Driver => "driver",
            Self::Rider => "rider",
            Self::SalesRep => "sales_rep",
            Self::Warehouse => "warehouse",
            Self::Merchandiser => "merchandiser",
        }
    }

    /// Rehidrata desde la forma textual del Ledger.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        match raw {
            "driver" => Ok(Self::Driver),
            "rider" => Ok(Self::Rider),
            "sales_rep" => Ok(Self::SalesRep),
            "warehouse" => Ok(Self::Warehouse),
            "merchandiser" => Ok(Self::Merchandiser),
            other => Err(DomainError::UnknownEnumValue {
                kind: "worker_type",
                value: other.to_string(),
            }),
        }
    }
}

/// Ciclo de vida administrativo del worker (gobernado por el Registry).
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkerLifecycle {
    /// Registrado pero aún no habilitado por el operador del tenant.
    Pending,
    /// Habilitado para recibir ofertas (sujeto a disponibilidad).
    Active,
    /// Desactivado; puede reactivarse.
    Inactive,
    /// Suspendido por el operador; las tareas aceptadas terminan su curso.
    Suspended,
}

impl WorkerLifecycle {
    /// Forma textual estable para el Ledger Táctico.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Suspended => "suspended",
        }
    }

    /// Rehidrata desde la forma textual del Ledger.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        match raw {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "suspended" => Ok(Self::Suspended),
            other => Err(DomainError::UnknownEnumValue {
                kind: "worker_lifecycle",
                value: other.to_string(),
            }),
        }
    }
}

/// Subestado de disponibilidad en tiempo real.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    /// Fuera de línea: invisible para el Dispatcher.
    Offline,
    /// En línea y sin carga no-terminal.
    Online,
    /// En línea con al menos una tarea no-terminal en curso.
    Busy,
}

impl Availability {
    /// Forma textual estable para el Ledger Táctico.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Online => "online",
            Self::Busy => "busy",
        }
    }

    /// Rehidrata desde la forma textual del Ledger.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        match raw {
            "offline" => Ok(Self::Offline),
            "online" => Ok(Self::Online),
            "busy" => Ok(Self::Busy),
            other => Err(DomainError::UnknownEnumValue {
                kind: "availability",
                value: other.to_string(),
            }),
        }
    }
}

/// Clase física del vehículo (gobierna la velocidad media urbana).
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VehicleKind {
    /// Motocicleta: 25 km/h urbanos nominales.
    Motorcycle,
    /// Automóvil: 30 km/h urbanos nominales.
    Car,
    /// Furgoneta: 22 km/h urbanos nominales.
    Van,
    /// Camión ligero: 22 km/h urbanos nominales.
    Truck,
    /// Bicicleta: 15 km/h urbanos nominales.
    Bicycle,
    /// A pie: 5 km/h nominales.
    OnFoot,
}

impl VehicleKind {
    /// Velocidad media urbana en km/h para la estimación de piernas de ruta.
    #[must_use]
    pub fn average_speed_kmh(&self) -> f64 {
        match self {
            Self::Motorcycle => 25.0,
            Self::Car => 30.0,
            Self::Van | Self::Truck => 22.0,
            Self::Bicycle => 15.0,
            Self::OnFoot => 5.0,
        }
    }

    /// Forma textual estable para el Ledger Táctico.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Motorcycle => "motorcycle",
            Self::Car => "car",
            Self::Van => "van",
            Self::Truck => "truck",
            Self::Bicycle => "bicycle",
            Self::OnFoot => "on_foot",
        }
    }

    /// Rehidrata desde la forma textual del Ledger.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        match raw {
            "motorcycle" => Ok(Self::Motorcycle),
            "car" => Ok(Self::Car),
            "van" => Ok(Self::Van),
            "truck" => Ok(Self::Truck),
            "bicycle" => Ok(Self::Bicycle),
            "on_foot" => Ok(Self::OnFoot),
            other => Err(DomainError::UnknownEnumValue {
                kind: "vehicle_kind",
                value: other.to_string(),
            }),
        }
    }
}

/// Metadatos del vehículo declarado por la unidad.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VehicleProfile {
    /// Clase física del vehículo.
    pub kind: VehicleKind,
    /// Matrícula o identificación del vehículo, si aplica.
    pub registration_plate: Option<String>,
}

/**
 * Entidad soberana del worker de campo.
 *
 * El par (tenant, user) es único: una identidad humana encarna a lo sumo
 * un worker por tenant. La entidad jamás se elimina físicamente.
 */
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Worker {
    /// Identificador opaco de 128 bits.
    pub id: Uuid,
    /// Tenant propietario de la unidad.
    pub tenant_id: Uuid,
    /// Identidad de usuario upstream (KYC externo a este motor).
    pub user_id: Uuid,
    /// Especialidad operativa.
    pub worker_type: WorkerType,
    /// Ciclo de vida administrativo.
    pub lifecycle: WorkerLifecycle,
    /// Subestado de disponibilidad (el Registry es su único mutador).
    pub availability: Availability,
    /// Contacto operativo requerido en el registro.
    pub contact_phone: String,
    /// Última ubicación aceptada, si existe.
    pub location: Option<GeoPoint>,
    /// Marca de tiempo monotónica de la última ubicación aceptada.
    pub last_location_at: Option<DateTime<Utc>>,
    /// Calificación vigente en [0, 5] (la EWMA se computa upstream).
    pub rating: f64,
    /// Total histórico de tareas que alcanzaron asignación.
    pub total_tasks: i64,
    /// Tareas completadas (invariante: <= total_tasks).
    pub completed_tasks: i64,
    /// Tope de tareas no-terminales concurrentes (>= 1).
    pub max_concurrent_tasks: i64,
    /// Zonas operativas habilitadas.
    pub zones: Vec<String>,
    /// Habilidades certificadas (matching por superconjunto).
    pub skills: Vec<String>,
    /// Vehículo declarado, si aplica a la especialidad.
    pub vehicle: Option<VehicleProfile>,
    /// Método de pago preferido del worker.
    pub payout_method: crate::payout::PayoutMethod,
    /// Cuenta o billetera destino de los pagos.
    pub payout_target: Option<String>,
    /// Versión de concurrencia optimista.
    pub version: i64,
    /// Instante de creación.
    pub created_at: DateTime<Utc>,
    /// Instante de última mutación.
    pub updated_at: DateTime<Utc>,
}

impl Worker {
    /// Evalúa la elegibilidad base para recibir ofertas del Dispatcher.
    #[must_use]
    pub fn is_offer_eligible(&self) -> bool {
        self.lifecycle == WorkerLifecycle::Active
            && matches!(self.availability, Availability::Online | Availability::Busy)
    }

    /// Velocidad media urbana efectiva de la unidad (km/h).
    #[must_use]
    pub fn effective_speed_kmh(&self) -> f64 {
        self.vehicle
            .as_ref()
            .map(|profile| profile.kind.average_speed_kmh())
            .unwrap_or_else(|| match self.worker_type {
                WorkerType::Driver => VehicleKind::Car.average_speed_kmh(),
                WorkerType::Rider => VehicleKind::Motorcycle.average_speed_kmh(),
                _ => VehicleKind::OnFoot.average_speed_kmh(),
            })
    }

    /**
     * Valida una calificación entrante antes de su sellado.
     *
     * # Errors:
     * - `DomainError::RatingOutOfRange` fuera del intervalo [0, 5].
     */
    pub fn validate_rating(candidate_rating: f64) -> Result<(), DomainError> {
        if !candidate_rating.is_finite() || !(0.0..=5.0).contains(&candidate_rating) {
            return Err(DomainError::RatingOutOfRange(candidate_rating));
        }
        Ok(())
    }
}
