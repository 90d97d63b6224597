// [apps/orchestrator/src/middleware.rs]
/*!
 * =================================================================
 * APARATO: GALVANIC AUTHENTICATION GUARD (V5.1 - DUAL CITIZENSHIP)
 * CLASIFICACIÓN: SECURITY STRATUM (ESTRATO L4)
 * RESPONSABILIDAD: VALIDACIÓN DUAL DE TOKENS E INYECCIÓN DE IDENTIDAD
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. DUAL CITIZENSHIP: Soporta el token simétrico de operadores y el
 *    de unidades de campo; la identidad (tenant, worker) llega en
 *    cabeceras confiables selladas por el gateway upstream.
 * 2. UPSTREAM TRUST: KYC, onboarding y autorización se deciden fuera
 *    de este motor; la guardia solo verifica la clase de ciudadanía y
 *    materializa 'CallerIdentity' para los estratos inferiores.
 * 3. EXTENSION INJECTION: La identidad viaja como extensión del flujo
 *    asíncrono de la petición.
 * =================================================================
 */

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::state::AppState;

/// Cabecera confiable con el tenant del llamador.
const TENANT_HEADER: &str = "x-tenant-id";

/// Cabecera confiable con el worker del llamador (Worker API).
const WORKER_HEADER: &str = "x-worker-id";

/// Identidad soberana extraída del túnel de seguridad.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallerIdentity {
    /// Tenant del llamador.
    pub tenant_id: Uuid,
    /// Unidad de campo, solo para la ciudadanía worker.
    pub worker_id: Option<Uuid>,
}

impl CallerIdentity {
    /// Indica si el llamador es una unidad de campo.
    #[must_use]
    pub fn is_worker(&self) -> bool {
        self.worker_id.is_some()
    }
}

/**
 * Guardia de salud: bloquea el acceso si el sistema está en mantenimiento.
 */
pub async fn health_guard(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Err(reason) = state.is_operational() {
        warn!("⛔ [ACCESS_DENIED]: Sector under maintenance: {}", reason);
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "error": "busy",
                "detail": reason,
                "retry_after": 60
            })),
        )
            .into_response();
    }
    next.run(request).await
}

/**
 * Guardia de autenticación: el portero soberano del motor.
 *
 * # Logic:
 * 1. Token == OPERATOR_AUTH_TOKEN -> ciudadanía Operator (exige tenant).
 * 2. Token == WORKER_AUTH_TOKEN -> ciudadanía Worker (exige tenant + worker).
 * 3. Cualquier otro material -> 401 sin detalle.
 */
pub async fn auth_guard(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let bearer_token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string);

    let Some(bearer_token) = bearer_token else {
        return unauthorized("AUTHORIZATION_ABSENT");
    };

    let tenant_id = match parse_uuid_header(&request, TENANT_HEADER) {
        Ok(tenant_id) => tenant_id,
        Err(response) => return response,
    };

    let identity = if bearer_token == state.authentication.operator {
        CallerIdentity {
            tenant_id,
            worker_id: None,
        }
    } else if bearer_token == state.authentication.worker {
        let worker_id = match parse_uuid_header(&request, WORKER_HEADER) {
            Ok(worker_id) => worker_id,
            Err(response) => return response,
        };
        CallerIdentity {
            tenant_id,
            worker_id: Some(worker_id),
        }
    } else {
        return unauthorized("TOKEN_REJECTED");
    };

    debug!(
        "🔐 [AUTH]: {} citizenship granted for tenant {}.",
        if identity.is_worker() { "worker" } else { "operator" },
        identity.tenant_id
    );

    request.extensions_mut().insert(identity);
    next.run(request).await
}

fn parse_uuid_header(request: &Request, header_name: &str) -> Result<Uuid, Response> {
    request
        .headers()
        .get(header_name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value).ok())
        .ok_or_else(|| unauthorized("IDENTITY_HEADER_MALFORMED"))
}

fn unauthorized(detail: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "unauthorized", "detail": detail })),
    )
        .into_response()
}
