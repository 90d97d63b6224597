// [libs/infra/rail-client/src/client.rs]
/*!
 * =================================================================
 * APARATO: SOVEREIGN RAIL UPLINK (V3.2 - IDEMPOTENT GOLD)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: ENVÍO DE INSTRUCCIONES Y SONDEO DE VEREDICTOS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. IDEMPOTENCY HEADER: Toda instrucción viaja con la referencia local
 *    en 'Idempotency-Key'; el rail re-entrega el mismo acuse ante la
 *    re-transmisión tras un corte.
 * 2. SANDBOX MODE: Sin endpoint configurado, el cliente emite acuses
 *    deterministas locales; los entornos de desarrollo y el Proving
 *    Grounds no tocan la red.
 * 3. CONTRACTUAL BACKOFF: Base 50 ms, tope 2 s, 5 intentos con jitter
 *    uniforme, exclusivamente sobre fallos transitorios.
 * =================================================================
 */

use std::time::Duration;

use rand::Rng;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use veloz_domain_models::{present_amount, Payout};

use crate::errors::RailError;

/// Base contractual de la curva exponencial.
const BACKOFF_BASE_MILLISECONDS: u64 = 50;

/// Tope duro de la espera entre intentos.
const BACKOFF_CAP_MILLISECONDS: u64 = 2_000;

/// Intentos máximos (incluye el primero).
const MAXIMUM_ATTEMPTS: u32 = 5;

/// Acuse del rail tras aceptar una instrucción.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionAck {
    /// Referencia emitida por el rail para el seguimiento del veredicto.
    pub provider_reference: String,
}

/// Veredicto del rail sobre una instrucción en tránsito.
#[derive(Debug, Clone, Deserialize)]
pub struct RailStatusReport {
    /// Estado textual reportado por el rail (processing|completed|failed).
    pub status: String,
    /// Causa del fallo terminal, si aplica.
    pub failure_reason: Option<String>,
}

/// Instrucción serializada hacia el rail.
#[derive(Debug, Serialize)]
struct PayoutInstructionEnvelope {
    reference: String,
    worker_account: Option<String>,
    method: String,
    amount: String,
    currency: String,
}

/// Cliente del rail de pagos con idempotencia por referencia local.
pub struct RailClient {
    network_session_client: Client,
    rail_base_endpoint: Option<String>,
}

impl RailClient {
    /**
     * Inicializa el cliente. Un endpoint `None` activa el modo sandbox:
     * acuses deterministas sin red (desarrollo y Proving Grounds).
     */
    #[must_use]
    pub fn new(rail_base_endpoint: Option<String>, authorization_token: Option<String>) -> Self {
        let mut default_headers = reqwest::header::HeaderMap::new();
        if let Some(token) = authorization_token {
            if let Ok(header_value) =
                reqwest::header::HeaderValue::from_str(&format!("Bearer {}", token))
            {
                default_headers.insert(reqwest::header::AUTHORIZATION, header_value);
            }
        }

        let network_session_client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("Veloz-Rail-Uplink-V3")
            .default_headers(default_headers)
            .build()
            .unwrap_or_default();

        Self {
            network_session_client,
            rail_base_endpoint,
        }
    }

    /// Indica si el cliente opera en modo sandbox (sin red).
    #[must_use]
    pub fn is_sandbox(&self) -> bool {
        self.rail_base_endpoint.is_none()
    }

    /**
     * Envía la instrucción de pago con clave de idempotencia.
     *
     * # Errors:
     * - `RailError::RetriesExhausted` tras agotar la curva de backoff.
     * - `RailError::GatewayRejection` en rechazos no-transitorios (4xx).
     */
    #[instrument(skip(self, payout), fields(reference = %payout.reference))]
    pub async fn submit_instruction(&self, payout: &Payout) -> Result<SubmissionAck, RailError> {
        let Some(base_endpoint) = &self.rail_base_endpoint else {
            // Sandbox: acuse determinista derivado de la referencia local.
            let ack = SubmissionAck {
                provider_reference: format!("SBX-{}", payout.reference),
            };
            debug!("🏖️ [RAIL_SANDBOX]: Instruction {} acknowledged locally.", payout.reference);
            return Ok(ack);
        };

        let envelope = PayoutInstructionEnvelope {
            reference: payout.reference.clone(),
            worker_account: payout.target_account.clone(),
            method: payout.method.as_str().to_string(),
            amount: present_amount(payout.amount),
            currency: payout.currency.clone(),
        };

        let submission_url = format!("{}/instructions", base_endpoint.trim_end_matches('/'));

        self.with_backoff("submit_instruction", || async {
            let response = self
                .network_session_client
                .post(&submission_url)
                .header("Idempotency-Key", &payout.reference)
                .json(&envelope)
                .send()
                .await
                .map_err(|fault| RailError::Network(fault.to_string()))?;

            Self::decode_response::<SubmissionAck>(response).await
        })
        .await
        .map(|ack| {
            info!(
                "🚄 [RAIL]: Instruction {} accepted as {}.",
                payout.reference, ack.provider_reference
            );
            ack
        })
    }

    /**
     * Sondea el veredicto de una instrucción en tránsito.
     *
     * # Errors:
     * - `RailError::RetriesExhausted` tras agotar la curva de backoff.
     */
    #[instrument(skip(self))]
    pub async fn fetch_status(
        &self,
        provider_reference: &str,
    ) -> Result<RailStatusReport, RailError> {
        let Some(base_endpoint) = &self.rail_base_endpoint else {
            // Sandbox: el veredicto llega por callback; el sondeo reporta tránsito.
            return Ok(RailStatusReport {
                status: "processing".into(),
                failure_reason: None,
            });
        };

        let status_url = format!(
            "{}/instructions/{}/status",
            base_endpoint.trim_end_matches('/'),
            provider_reference
        );

        self.with_backoff("fetch_status", || async {
            let response = self
                .network_session_client
                .get(&status_url)
                .send()
                .await
                .map_err(|fault| RailError::Network(fault.to_string()))?;

            Self::decode_response::<RailStatusReport>(response).await
        })
        .await
    }

    // --- MOTOR DE RESILIENCIA ---

    async fn decode_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, RailError> {
        let http_status: StatusCode = response.status();
        if !http_status.is_success() {
            return Err(RailError::GatewayRejection(http_status.as_u16()));
        }
        response
            .json::<T>()
            .await
            .map_err(|fault| RailError::EnvelopeMalformed(fault.to_string()))
    }

    async fn with_backoff<T, F, Fut>(
        &self,
        operation_label: &str,
        mut operation: F,
    ) -> Result<T, RailError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, RailError>>,
    {
        let mut attempt_index: u32 = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(fault) if fault.is_transient() && attempt_index + 1 < MAXIMUM_ATTEMPTS => {
                    let exponential_milliseconds = BACKOFF_BASE_MILLISECONDS
                        .saturating_mul(1_u64 << attempt_index)
                        .min(BACKOFF_CAP_MILLISECONDS);
                    let jitter_milliseconds =
                        rand::thread_rng().gen_range(0..=exponential_milliseconds / 2);

                    warn!(
                        "🔁 [RAIL_RETRY]: {} transient fault (attempt {}): {}",
                        operation_label,
                        attempt_index + 1,
                        fault
                    );

                    tokio::time::sleep(Duration::from_millis(
                        exponential_milliseconds + jitter_milliseconds,
                    ))
                    .await;
                    attempt_index += 1;
                }
                Err(fault) if fault.is_transient() => {
                    return Err(RailError::RetriesExhausted(fault.to_string()));
                }
                Err(fault) => return Err(fault),
            }
        }
    }
}
