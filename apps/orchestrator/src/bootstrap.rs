// [apps/orchestrator/src/bootstrap.rs]
/*!
 * =================================================================
 * APARATO: ENVIRONMENT BOOTSTRAP (V5.1 - SINGLE CAPTURE)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L4)
 * RESPONSABILIDAD: CAPTURA ÚNICA Y TIPADA DEL ENTORNO DE PROCESO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SINGLE CAPTURE: El entorno se lee UNA vez en la ignición; ningún
 *    estrato posterior consulta variables ambientales.
 * 2. CRASH-ONLY STARTUP: La configuración malformada niega el arranque;
 *    jamás se degrada silenciosamente en runtime.
 * =================================================================
 */

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use veloz_domain_dispatch::DispatchTuning;

/// Configuración sellada del kernel del orquestador.
#[derive(Debug, Clone)]
pub struct KernelConfig {
    /// URL del sustrato de persistencia (Turso Cloud, archivo o RAM).
    pub database_connection_url: String,
    /// Token de acceso remoto de Turso, si aplica.
    pub database_access_token: Option<String>,
    /// Puerto TCP de escucha de la API.
    pub listening_network_port: u16,
    /// Token simétrico del Operator/Partner API.
    pub operator_authentication_token: String,
    /// Token simétrico del Worker API.
    pub worker_authentication_token: String,
    /// Endpoint del rail de pagos (None = modo sandbox).
    pub rail_endpoint: Option<String>,
    /// Token del rail de pagos, si aplica.
    pub rail_authentication_token: Option<String>,
    /// Umbral mínimo de lote de pago por worker (moneda del tenant).
    pub minimum_payout_amount: Decimal,
    /// Intervalo de la corrida periódica de lotes, en segundos.
    pub payout_run_interval_seconds: u64,
    /// Intervalo del sondeo de reconciliación del rail, en segundos.
    pub rail_reconcile_interval_seconds: u64,
    /// Tuning contractual del Dispatcher.
    pub dispatch_tuning: DispatchTuning,
}

impl KernelConfig {
    /**
     * Captura y valida el entorno del proceso.
     *
     * # Errors:
     * Variables obligatorias ausentes o malformadas (DATABASE_URL,
     * tokens de autenticación, umbral decimal inválido).
     */
    pub fn from_env() -> Result<Self> {
        let database_connection_url =
            std::env::var("DATABASE_URL").context("CRITICAL_FAULT: DATABASE_URL not defined")?;

        let database_access_token = std::env::var("TURSO_AUTH_TOKEN").ok();

        let listening_network_port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("CRITICAL_FAULT: PORT malformed")?;

        let operator_authentication_token = std::env::var("OPERATOR_AUTH_TOKEN")
            .context("CRITICAL_FAULT: OPERATOR_AUTH_TOKEN not defined")?;
        let worker_authentication_token = std::env::var("WORKER_AUTH_TOKEN")
            .context("CRITICAL_FAULT: WORKER_AUTH_TOKEN not defined")?;

        let rail_endpoint = std::env::var("RAIL_ENDPOINT").ok().filter(|url| !url.is_empty());
        let rail_authentication_token = std::env::var("RAIL_AUTH_TOKEN").ok();

        let minimum_payout_amount: Decimal = std::env::var("MIN_PAYOUT_AMOUNT")
            .unwrap_or_else(|_| "1000.000000".to_string())
            .parse()
            .context("CRITICAL_FAULT: MIN_PAYOUT_AMOUNT malformed")?;

        let payout_run_interval_seconds: u64 = std::env::var("PAYOUT_RUN_INTERVAL_SECONDS")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .context("CRITICAL_FAULT: PAYOUT_RUN_INTERVAL_SECONDS malformed")?;

        let rail_reconcile_interval_seconds: u64 =
            std::env::var("RAIL_RECONCILE_INTERVAL_SECONDS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("CRITICAL_FAULT: RAIL_RECONCILE_INTERVAL_SECONDS malformed")?;

        // Tuning contractual con sobreescrituras puntuales del entorno.
        let mut dispatch_tuning = DispatchTuning::default();
        if let Ok(raw) = std::env::var("OFFER_TTL_SECONDS") {
            dispatch_tuning.offer_ttl_seconds =
                raw.parse().context("CRITICAL_FAULT: OFFER_TTL_SECONDS malformed")?;
        }
        if let Ok(raw) = std::env::var("DISPATCH_MAX_WAVES") {
            dispatch_tuning.max_waves =
                raw.parse().context("CRITICAL_FAULT: DISPATCH_MAX_WAVES malformed")?;
        }
        if let Ok(raw) = std::env::var("DISPATCH_WAVE_SIZE") {
            dispatch_tuning.wave_size =
                raw.parse().context("CRITICAL_FAULT: DISPATCH_WAVE_SIZE malformed")?;
        }
        if let Ok(raw) = std::env::var("DISPATCH_QUEUE_CAPACITY") {
            dispatch_tuning.queue_capacity =
                raw.parse().context("CRITICAL_FAULT: DISPATCH_QUEUE_CAPACITY malformed")?;
        }

        Ok(Self {
            database_connection_url,
            database_access_token,
            listening_network_port,
            operator_authentication_token,
            worker_authentication_token,
            rail_endpoint,
            rail_authentication_token,
            minimum_payout_amount,
            payout_run_interval_seconds,
            rail_reconcile_interval_seconds,
            dispatch_tuning,
        })
    }
}
