// [apps/orchestrator/src/handlers/mod.rs]
/*!
 * =================================================================
 * APARATO: API HANDLER REGISTRY & ERROR BOUNDARY (V5.2 - WIRE CODES)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: TRADUCCIÓN DE FALLOS DE DOMINIO A CÓDIGOS ESTABLES
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. CLASS-DRIVEN STATUS: Cada clase de fallo del catálogo del Store
 *    mapea a un estatus HTTP fijo; los códigos del contrato (not_found,
 *    duplicate, stale, too_late, capacity_reached, worker_not_available,
 *    proof_required, invalid_transition, deadline_exceeded, busy) son
 *    la ÚNICA superficie de error de la API.
 * 2. RACE AS INFO: 'too_late' y 'lost_race' se registran a nivel INFO;
 *    no son fallos operativos.
 * =================================================================
 */

pub mod analytics;
pub mod payouts;
pub mod tasks;
pub mod worker_portal;
pub mod workers;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;
use veloz_infra_db::DbError;

use crate::middleware::CallerIdentity;

/// Fallo de la frontera API con código estable del contrato.
#[derive(Debug)]
pub struct ApiError {
    /// Estatus HTTP de la clase de fallo.
    pub status: StatusCode,
    /// Código estable de la superficie de error.
    pub code: &'static str,
    /// Detalle técnico para el operador.
    pub detail: String,
}

impl ApiError {
    /// Fallo de saturación (backpressure o infraestructura transitoria).
    #[must_use]
    pub fn busy(detail: &str) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            code: "busy",
            detail: detail.to_string(),
        }
    }

    /// Fallo de autorización de ciudadanía.
    #[must_use]
    pub fn forbidden(detail: &str) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            code: "unauthorized",
            detail: detail.to_string(),
        }
    }

    /// Parámetros de consulta malformados.
    #[must_use]
    pub fn malformed(detail: String) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            code: "invalid_transition",
            detail,
        }
    }
}

impl From<DbError> for ApiError {
    fn from(fault: DbError) -> Self {
        // El recorrido activo duplicado posee código propio del contrato.
        if matches!(fault, DbError::Duplicate("route")) {
            return Self {
                status: StatusCode::CONFLICT,
                code: "route_already_active",
                detail: fault.to_string(),
            };
        }

        let code = fault.wire_code();
        let status = match code {
            "not_found" => StatusCode::NOT_FOUND,
            "duplicate" | "stale" | "too_late" | "capacity_reached" | "worker_not_available" => {
                StatusCode::CONFLICT
            }
            "proof_required" | "invalid_transition" => StatusCode::UNPROCESSABLE_ENTITY,
            "deadline_exceeded" => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::SERVICE_UNAVAILABLE,
        };

        // Resolución de carrera: rastro INFO, jamás alarma.
        match code {
            "too_late" | "capacity_reached" => {
                info!("🏁 [RACE_RESOLVED]: {} -> {}", code, fault);
            }
            "busy" => {
                warn!("⚠️ [API_FAULT]: {}", fault);
            }
            _ => {}
        }

        Self {
            status,
            code,
            detail: fault.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "error": self.code, "detail": self.detail })),
        )
            .into_response()
    }
}

/// Deadline de pared de toda operación de escritura disparada por la API.
const OPERATION_DEADLINE: std::time::Duration = std::time::Duration::from_secs(10);

/**
 * Frontera de deadline del contrato: la operación que excede su ventana
 * retorna 'deadline_exceeded' y el llamador la trata como transitoria.
 */
pub async fn with_deadline<T, F>(operation_label: &str, operation: F) -> Result<T, ApiError>
where
    F: std::future::Future<Output = Result<T, ApiError>>,
{
    match tokio::time::timeout(OPERATION_DEADLINE, operation).await {
        Ok(verdict) => verdict,
        Err(_) => {
            warn!("⏳ [DEADLINE]: {} exceeded its wall-clock window.", operation_label);
            Err(ApiError {
                status: StatusCode::GATEWAY_TIMEOUT,
                code: "deadline_exceeded",
                detail: format!("{} exceeded {}s", operation_label, OPERATION_DEADLINE.as_secs()),
            })
        }
    }
}

/// Exige ciudadanía de operador (Partner API).
pub fn require_operator(identity: &CallerIdentity) -> Result<Uuid, ApiError> {
    if identity.is_worker() {
        return Err(ApiError::forbidden("OPERATOR_CITIZENSHIP_REQUIRED"));
    }
    Ok(identity.tenant_id)
}

/// Exige ciudadanía de worker (Worker API).
pub fn require_worker(identity: &CallerIdentity) -> Result<Uuid, ApiError> {
    identity
        .worker_id
        .ok_or_else(|| ApiError::forbidden("WORKER_CITIZENSHIP_REQUIRED"))
}
