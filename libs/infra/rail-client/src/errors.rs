// [libs/infra/rail-client/src/errors.rs]
/*!
 * =================================================================
 * APARATO: RAIL ERROR CATALOG (V2.0 - SOBERANO)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DEL RAIL
 * =================================================================
 */

use thiserror::Error;

/// Fallos del túnel con el rail de pagos externo.
#[derive(Error, Debug)]
pub enum RailError {
    /// Fallo físico de red o timeout del túnel.
    #[error("[L3_RAIL_NET_FAULT]: UPLINK_SEVERED -> {0}")]
    Network(String),

    /// El rail respondió con un estado no-exitoso (5xx = transitorio).
    #[error("[L3_RAIL_FAULT]: GATEWAY_REJECTION -> HTTP {0}")]
    GatewayRejection(u16),

    /// El cuerpo de respuesta no respeta el contrato JSON del rail.
    #[error("[L3_RAIL_FAULT]: ENVELOPE_MALFORMED -> {0}")]
    EnvelopeMalformed(String),

    /// Reintentos agotados sobre fallos transitorios consecutivos.
    #[error("[L3_RAIL_FAULT]: RETRIES_EXHAUSTED -> {0}")]
    RetriesExhausted(String),
}

impl RailError {
    /// Clasificación de reintento: red y 5xx son transitorios.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::GatewayRejection(500..=599)
        )
    }
}
