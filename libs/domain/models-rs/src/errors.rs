// [libs/domain/models-rs/src/errors.rs]
/*!
 * =================================================================
 * APARATO: DOMAIN ERROR CATALOG (V3.2 - SOBERANO)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE VIOLACIONES DE INTEGRIDAD
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. INTEGRITY FIRST: Toda transición ilegal de estado es un fallo de
 *    integridad de cara al usuario, jamás un transitorio reintentable.
 * 2. PANOPTICON COMPLIANCE: Mensajes con prefijo de estrato para su
 *    renderizado cromático en el Dashboard de operaciones.
 * 3. ZERO ABBREVIATIONS: Nomenclatura nominal absoluta.
 * =================================================================
 */

use thiserror::Error;

/// Violaciones de integridad detectables en el propio estrato de dominio.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// La transición de estado solicitada no existe en la máquina legal.
    #[error("[L2_DOMAIN_FAULT]: INVALID_TRANSITION -> {entity} {from} -> {to}")]
    InvalidTransition {
        /// Entidad cuya máquina de estados rechazó el salto.
        entity: &'static str,
        /// Estado de origen observado.
        from: String,
        /// Estado de destino solicitado.
        to: String,
    },

    /// La calificación escapa del intervalo contractual [0, 5].
    #[error("[L2_DOMAIN_FAULT]: RATING_OUT_OF_RANGE -> {0}")]
    RatingOutOfRange(f64),

    /// El tipo de tarea exige una ubicación que el borrador no aporta.
    #[error("[L2_DOMAIN_FAULT]: LOCATION_REQUIRED -> {0}")]
    LocationRequired(&'static str),

    /// Magnitud monetaria negativa en un campo que exige no-negatividad.
    #[error("[L2_DOMAIN_FAULT]: NEGATIVE_AMOUNT -> {0}")]
    NegativeAmount(String),

    /// El tope de concurrencia del worker debe ser al menos 1.
    #[error("[L2_DOMAIN_FAULT]: CAPACITY_DEGENERATE -> {0}")]
    DegenerateCapacity(i64),

    /// Valor textual desconocido al rehidratar un enum desde el Ledger.
    #[error("[L2_DOMAIN_FAULT]: UNKNOWN_ENUM_VALUE -> {kind}: '{value}'")]
    UnknownEnumValue {
        /// Familia de enum afectada.
        kind: &'static str,
        /// Texto crudo rechazado.
        value: String,
    },
}
