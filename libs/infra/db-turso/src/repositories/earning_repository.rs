// [libs/infra/db-turso/src/repositories/earning_repository.rs]
/*!
 * =================================================================
 * APARATO: EARNINGS LEDGER REPOSITORY (V5.1 - APPEND-ONLY SEALED)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA DEL LEDGER DE GANANCIAS POR WORKER
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. APPEND-ONLY LAW: Las líneas jamás se reescriben; solo mutan sus
 *    banderas de liquidación bajo las primitivas del UnitOfWork.
 * 2. DECIMAL TRANSIT: Los importes entran y salen como texto decimal
 *    (20,6); la aritmética ocurre en rust_decimal, jamás en SQLite.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use libsql::params;
use rust_decimal::Decimal;
use tracing::instrument;
use uuid::Uuid;
use veloz_domain_models::{Earning, EarningType};

use crate::errors::DbError;
use crate::mapping::{fmt_ts, get_decimal, map_earning_row, EARNING_COLUMNS};
use crate::TursoClient;

/// Línea agregada del resumen de ganancias por tipo.
#[derive(Debug, Clone, PartialEq)]
pub struct EarningSummaryLine {
    /// Origen tipificado agrupador.
    pub entry_type: EarningType,
    /// Cantidad de líneas del grupo.
    pub line_count: i64,
    /// Suma exacta del grupo.
    pub total_amount: Decimal,
}

/// Repositorio de autoridad única para el Ledger de ganancias.
pub struct EarningRepository {
    /// Cliente táctico para el enlace con el cluster de Turso (Motor A).
    database_client: TursoClient,
}

impl EarningRepository {
    /// Inicializa una nueva instancia del repositorio del Ledger.
    #[must_use]
    pub fn new(database_client: TursoClient) -> Self {
        Self { database_client }
    }

    /// Inserta una línea suelta (ajustes manuales e incentivos).
    #[instrument(skip(self, earning), fields(earning_id = %earning.id))]
    pub async fn insert_earning(&self, earning: &Earning) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        database_connection
            .execute(
                r#"
                INSERT INTO earnings (
                    id, tenant_id, worker_id, task_id, entry_type, amount,
                    currency, is_paid_out, payout_id, description, earned_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                "#,
                params![
                    earning.id.to_string(),
                    earning.tenant_id.to_string(),
                    earning.worker_id.to_string(),
                    earning.task_id.map(|id| id.to_string()),
                    earning.entry_type.as_str(),
                    earning.amount.to_string(),
                    earning.currency.clone(),
                    earning.is_paid_out as i64,
                    earning.payout_id.map(|id| id.to_string()),
                    earning.description.clone(),
                    fmt_ts(&earning.earned_at)
                ],
            )
            .await?;
        Ok(())
    }

    /// Listado por worker con ventana temporal y filtro de tipos opcional.
    pub async fn list_for_worker(
        &self,
        worker_id: Uuid,
        window_start: Option<DateTime<Utc>>,
        window_end: Option<DateTime<Utc>>,
        entry_types: &[EarningType],
        limit: i64,
    ) -> Result<Vec<Earning>, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut sql = format!(
            "SELECT {} FROM earnings WHERE worker_id = ?1",
            EARNING_COLUMNS
        );
        if let Some(window_start) = window_start {
            sql.push_str(&format!(" AND earned_at >= '{}'", fmt_ts(&window_start)));
        }
        if let Some(window_end) = window_end {
            sql.push_str(&format!(" AND earned_at <= '{}'", fmt_ts(&window_end)));
        }
        if !entry_types.is_empty() {
            let quoted: Vec<String> = entry_types
                .iter()
                .map(|entry_type| format!("'{}'", entry_type.as_str()))
                .collect();
            sql.push_str(&format!(" AND entry_type IN ({})", quoted.join(", ")));
        }
        sql.push_str(&format!(" ORDER BY earned_at DESC LIMIT {}", limit.max(1)));

        let mut query_results = database_connection
            .query(&sql, params![worker_id.to_string()])
            .await?;

        let mut earnings = Vec::new();
        while let Some(data_row) = query_results.next().await? {
            earnings.push(map_earning_row(&data_row)?);
        }
        Ok(earnings)
    }

    /// Líneas no-pagadas y no-enlazadas de un tenant (entrada del loteo).
    pub async fn list_unpaid_unlinked(&self, tenant_id: Uuid) -> Result<Vec<Earning>, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query(
                &format!(
                    "SELECT {} FROM earnings
                     WHERE tenant_id = ?1 AND is_paid_out = 0 AND payout_id IS NULL
                     ORDER BY earned_at ASC",
                    EARNING_COLUMNS
                ),
                params![tenant_id.to_string()],
            )
            .await?;

        let mut earnings = Vec::new();
        while let Some(data_row) = query_results.next().await? {
            earnings.push(map_earning_row(&data_row)?);
        }
        Ok(earnings)
    }

    /// Tenants con líneas no-pagadas pendientes de loteo (corrida periódica).
    pub async fn tenants_with_unpaid(&self) -> Result<Vec<Uuid>, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query(
                "SELECT DISTINCT tenant_id FROM earnings
                 WHERE is_paid_out = 0 AND payout_id IS NULL",
                (),
            )
            .await?;

        let mut tenants = Vec::new();
        while let Some(data_row) = query_results.next().await? {
            let raw: String = data_row.get(0)?;
            tenants.push(
                Uuid::parse_str(&raw)
                    .map_err(|fault| DbError::MappingError(fault.to_string()))?,
            );
        }
        Ok(tenants)
    }

    /// Líneas enlazadas a un payout concreto (auditoría de conservación).
    pub async fn list_for_payout(&self, payout_id: Uuid) -> Result<Vec<Earning>, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query(
                &format!(
                    "SELECT {} FROM earnings WHERE payout_id = ?1 ORDER BY earned_at ASC",
                    EARNING_COLUMNS
                ),
                params![payout_id.to_string()],
            )
            .await?;

        let mut earnings = Vec::new();
        while let Some(data_row) = query_results.next().await? {
            earnings.push(map_earning_row(&data_row)?);
        }
        Ok(earnings)
    }

    /// Resumen agregado por tipo para la ventana dada.
    pub async fn summarize_for_worker(
        &self,
        worker_id: Uuid,
        window_start: Option<DateTime<Utc>>,
        window_end: Option<DateTime<Utc>>,
    ) -> Result<Vec<EarningSummaryLine>, DbError> {
        // La suma ocurre en Rust: SQLite no conoce el decimal de punto fijo.
        let earnings = self
            .list_for_worker(worker_id, window_start, window_end, &[], i64::MAX)
            .await?;

        let mut lines: Vec<EarningSummaryLine> = Vec::new();
        for earning in earnings {
            match lines
                .iter_mut()
                .find(|line| line.entry_type == earning.entry_type)
            {
                Some(line) => {
                    line.line_count += 1;
                    line.total_amount += earning.amount;
                }
                None => lines.push(EarningSummaryLine {
                    entry_type: earning.entry_type,
                    line_count: 1,
                    total_amount: earning.amount,
                }),
            }
        }
        Ok(lines)
    }

    /// Totales de conservación por worker: (devengado, liquidado, no-pagado, en vuelo).
    pub async fn conservation_totals(
        &self,
        worker_id: Uuid,
    ) -> Result<(Decimal, Decimal, Decimal, Decimal), DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query(
                "SELECT amount, is_paid_out, payout_id FROM earnings WHERE worker_id = ?1",
                params![worker_id.to_string()],
            )
            .await?;

        let mut total_earned = Decimal::ZERO;
        let mut total_settled = Decimal::ZERO;
        let mut total_unpaid = Decimal::ZERO;
        let mut total_in_flight = Decimal::ZERO;

        while let Some(data_row) = query_results.next().await? {
            let amount = get_decimal(&data_row, 0)?;
            let is_paid_out: i64 = data_row.get(1)?;
            let payout_id: Option<String> = data_row.get(2)?;

            total_earned += amount;
            if is_paid_out != 0 {
                total_settled += amount;
            } else if payout_id.is_some() {
                total_in_flight += amount;
            } else {
                total_unpaid += amount;
            }
        }

        Ok((total_earned, total_settled, total_unpaid, total_in_flight))
    }
}
