// [libs/infra/db-turso/src/errors.rs]
/*!
 * =================================================================
 * APARATO: STORE ERROR CATALOG (V5.3 - SOBERANO)
 * CLASIFICACIÓN: INFRASTRUCTURE CORE (ESTRATO L3)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DE PERSISTENCIA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. CLASS-DRIVEN HANDLING: Cada variante pertenece a una clase de
 *    manejo (transitoria, conflicto optimista, violación de integridad
 *    o resolución de carrera); el estrato API decide por clase, no por
 *    origen.
 * 2. PANOPTICON COMPLIANCE: Mensajes con prefijo de estrato para su
 *    renderizado cromático en el Dashboard de operaciones.
 * 3. ZERO ABBREVIATIONS: Nomenclatura nominal absoluta.
 * =================================================================
 */

use thiserror::Error;
use veloz_domain_models::DomainError;

/// Catálogo soberano de fallos del Store.
#[derive(Error, Debug)]
pub enum DbError {
    /// Error de enlace físico o de red con el cluster de Turso.
    #[error("[L3_DB_NET_FAULT]: DATABASE_UPLINK_SEVERED -> {0}")]
    ConnectionError(String),

    /// Fallo en la configuración del entorno (variables vacías o malformadas).
    #[error("[L3_DB_CONFIG_FAULT]: STRATEGIC_ENV_VOID -> {0}")]
    ConfigurationError(String),

    /// Error de sintaxis o ejecución devuelto por el motor libSQL.
    #[error("[L3_DB_QUERY_FAULT]: SQL_QUERY_REJECTED -> {0}")]
    QueryError(#[from] libsql::Error),

    /// Fallo en la transformación de tipos entre SQLite y el Dominio Rust.
    #[error("[L3_DB_MAPPING_FAULT]: DATA_MAPPING_VIOLATION -> {0}")]
    MappingError(String),

    /// Error al comprometer cambios en una secuencia multi-tabla.
    #[error("[L3_DB_FAULT]: TRANSACTION_COLLAPSE")]
    TransactionError,

    /// La operación excedió el deadline inyectado por el llamador.
    #[error("[L3_DB_FAULT]: DEADLINE_EXCEEDED")]
    DeadlineExceeded,

    // --- ESTRATO DE CONFLICTO OPTIMISTA ---

    /// La versión almacenada difiere de la esperada: releer y reaplicar.
    #[error("[L3_STORE_FAULT]: STALE_VERSION")]
    StaleVersion,

    // --- ESTRATO DE ENTIDADES ---

    /// La entidad solicitada no existe en las tablas activas.
    #[error("[L3_STORE_FAULT]: {0}_NOT_FOUND")]
    NotFound(&'static str),

    /// Violación de unicidad en el registro (entidad ya existente).
    #[error("[L3_STORE_FAULT]: {0}_DUPLICATE")]
    Duplicate(&'static str),

    // --- ESTRATO DE RESOLUCIÓN DE CARRERAS (NO SON FALLOS OPERATIVOS) ---

    /// La tarea ya fue reclamada por otra asignación (wire: too_late).
    #[error("[L3_CLAIM_FAULT]: TASK_ALREADY_ASSIGNED")]
    TaskAlreadyAssigned,

    /// El worker alcanzó su tope de tareas concurrentes.
    #[error("[L3_CLAIM_FAULT]: CAPACITY_REACHED")]
    CapacityReached,

    /// El worker no está en un estado elegible para la operación.
    #[error("[L3_CLAIM_FAULT]: WORKER_NOT_AVAILABLE")]
    WorkerNotAvailable,

    // --- ESTRATO DE INTEGRIDAD DE NEGOCIO ---

    /// El cierre exige clases de evidencia que no fueron aportadas.
    #[error("[L3_TASK_FAULT]: PROOF_REQUIRED -> {0}")]
    ProofRequired(String),

    /// Violación de integridad detectada por el estrato de dominio.
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl DbError {
    /// Indica si el fallo es transitorio y apto para reintento con backoff.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ConnectionError(_) | Self::TransactionError | Self::DeadlineExceeded
        )
    }

    /// Código estable de la frontera API (§códigos de error del contrato).
    #[must_use]
    pub fn wire_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Duplicate(_) => "duplicate",
            Self::StaleVersion => "stale",
            Self::TaskAlreadyAssigned => "too_late",
            Self::CapacityReached => "capacity_reached",
            Self::WorkerNotAvailable => "worker_not_available",
            Self::ProofRequired(_) => "proof_required",
            Self::Domain(_) => "invalid_transition",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::ConnectionError(_) | Self::TransactionError => "busy",
            Self::ConfigurationError(_) | Self::QueryError(_) | Self::MappingError(_) => "busy",
        }
    }
}

/// Detecta la violación de unicidad reportada por el motor SQLite.
#[must_use]
pub fn is_unique_violation(error: &libsql::Error) -> bool {
    error.to_string().contains("UNIQUE constraint failed")
}
