// [libs/infra/db-turso/src/repositories/payout_repository.rs]
/*!
 * =================================================================
 * APARATO: PAYOUT REPOSITORY (V5.2 - RAIL LEDGER)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA DE INSTRUCCIONES DE PAGO POR LOTE
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. IDEMPOTENT RUN: La unicidad (tenant, reference) convierte la
 *    re-ejecución de la corrida diaria en colisión benigna.
 * 2. RECONCILIATION READY: Consultas por estado y por referencia del
 *    rail para los daemons de cierre de lazo.
 * =================================================================
 */

use chrono::Utc;
use libsql::params;
use tracing::{debug, instrument};
use uuid::Uuid;
use veloz_domain_models::{Payout, PayoutStatus};

use crate::errors::DbError;
use crate::mapping::{fmt_ts, map_payout_row, PAYOUT_COLUMNS};
use crate::TursoClient;

/// Repositorio de autoridad única para las instrucciones de pago.
pub struct PayoutRepository {
    /// Cliente táctico para el enlace con el cluster de Turso (Motor A).
    database_client: TursoClient,
}

impl PayoutRepository {
    /// Inicializa una nueva instancia del repositorio de pagos.
    #[must_use]
    pub fn new(database_client: TursoClient) -> Self {
        Self { database_client }
    }

    /**
     * Recupera la instrucción de pago.
     *
     * # Errors:
     * - `DbError::NotFound("payout")` si no existe.
     */
    pub async fn fetch_payout(&self, payout_id: Uuid) -> Result<Payout, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query(
                &format!("SELECT {} FROM payouts WHERE id = ?1", PAYOUT_COLUMNS),
                params![payout_id.to_string()],
            )
            .await?;

        match query_results.next().await? {
            Some(data_row) => map_payout_row(&data_row),
            None => Err(DbError::NotFound("payout")),
        }
    }

    /// Instrucciones de todo el sistema en el estado dado (reconciliación).
    pub async fn list_with_status_globally(
        &self,
        status: PayoutStatus,
        limit: i64,
    ) -> Result<Vec<Payout>, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query(
                &format!(
                    "SELECT {} FROM payouts WHERE status = '{}'
                     ORDER BY created_at ASC LIMIT {}",
                    PAYOUT_COLUMNS,
                    status.as_str(),
                    limit.max(1)
                ),
                (),
            )
            .await?;

        let mut payouts = Vec::new();
        while let Some(data_row) = query_results.next().await? {
            payouts.push(map_payout_row(&data_row)?);
        }
        Ok(payouts)
    }

    /**
     * Sella el tránsito pending → processing tras el envío al rail.
     *
     * # Errors:
     * - `DbError::StaleVersion` si la instrucción ya mutó bajo otra mano.
     */
    #[instrument(skip(self))]
    pub async fn mark_processing(
        &self,
        payout_id: Uuid,
        provider_reference: &str,
        expected_version: i64,
    ) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        let rows_affected = database_connection
            .execute(
                "UPDATE payouts
                 SET status = 'processing', provider_reference = ?1,
                     submitted_at = ?2, version = version + 1
                 WHERE id = ?3 AND status = 'pending' AND version = ?4",
                params![
                    provider_reference,
                    fmt_ts(&Utc::now()),
                    payout_id.to_string(),
                    expected_version
                ],
            )
            .await?;

        if rows_affected > 0 {
            debug!("🚄 [RAIL]: Payout {} now processing.", payout_id);
            Ok(())
        } else {
            Err(DbError::StaleVersion)
        }
    }

}
