// [libs/infra/db-turso/src/schema.rs]
/**
 * =================================================================
 * APARATO: DISPATCH LEDGER SCHEMA (V5.2 - SETTLEMENT STRATA)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: GOBERNANZA ESTRUCTURAL E IDEMPOTENCIA TOTAL
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. SETTLEMENT STRATA: Tablas del ciclo completo de despacho y
 *    liquidación (workers, tasks, allocations, earnings, payouts,
 *    routes) con versionado optimista en toda entidad mutable.
 * 2. MUTUAL EXCLUSION: Índice único parcial sobre allocations que
 *    sella "a lo sumo una aceptada por tarea" a nivel de motor.
 * 3. COMPANION SPATIAL INDEX: Columnas lat/lng + celda de retícula
 *    indexada; libSQL carece de índice espacial nativo.
 * 4. IDEMPOTENCIA: Gestión de errores para migraciones en caliente.
 * =================================================================
 */

use anyhow::{Context, Result};
use libsql::Connection;
use tracing::{debug, info, instrument, warn};

/**
 * ESTRATO 1: SOLIDIFICACIÓN (Génesis de Tablas)
 * Define las entidades base del motor de despacho.
 * Los importes monetarios son TEXT decimal(20,6): SQLite no posee tipo
 * decimal y el texto preserva la exactitud de punto fijo.
 */
const TACTICAL_TABLES: &[(&str, &str)] = &[
    ("TABLE_WORKERS", r#"
        CREATE TABLE IF NOT EXISTS workers (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            worker_type TEXT NOT NULL,
            lifecycle TEXT NOT NULL DEFAULT 'pending',
            availability TEXT NOT NULL DEFAULT 'offline',
            contact_phone TEXT NOT NULL,
            latitude REAL,
            longitude REAL,
            geo_cell TEXT,
            last_location_at DATETIME,
            rating REAL NOT NULL DEFAULT 0.0,
            total_tasks INTEGER NOT NULL DEFAULT 0,
            completed_tasks INTEGER NOT NULL DEFAULT 0,
            max_concurrent_tasks INTEGER NOT NULL DEFAULT 1,
            zones_json TEXT NOT NULL DEFAULT '[]',
            skills_json TEXT NOT NULL DEFAULT '[]',
            vehicle_json TEXT,
            payout_method TEXT NOT NULL DEFAULT 'wallet',
            payout_target TEXT,
            version INTEGER NOT NULL DEFAULT 1,
            created_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL,
            UNIQUE(tenant_id, user_id)
        );
    "#),
    ("TABLE_TASKS", r#"
        CREATE TABLE IF NOT EXISTS tasks (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            task_type TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            priority INTEGER NOT NULL DEFAULT 0,
            assigned_worker_id TEXT,
            required_worker_type TEXT NOT NULL,
            required_skills_json TEXT NOT NULL DEFAULT '[]',
            zone_id TEXT,
            pickup_latitude REAL,
            pickup_longitude REAL,
            pickup_address TEXT,
            delivery_latitude REAL,
            delivery_longitude REAL,
            delivery_address TEXT,
            scheduled_at DATETIME,
            deadline_at DATETIME,
            estimated_duration_minutes INTEGER,
            estimated_distance_km REAL,
            actual_duration_minutes INTEGER,
            actual_distance_km REAL,
            base_pay TEXT NOT NULL,
            bonus_pay TEXT NOT NULL DEFAULT '0',
            tip_amount TEXT NOT NULL DEFAULT '0',
            currency TEXT NOT NULL,
            required_proofs_json TEXT NOT NULL DEFAULT '[]',
            order_reference TEXT,
            metadata_json TEXT NOT NULL DEFAULT 'null',
            escalated_at DATETIME,
            started_at DATETIME,
            completed_at DATETIME,
            termination_reason TEXT,
            version INTEGER NOT NULL DEFAULT 1,
            created_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL
        );
    "#),
    ("TABLE_TASK_PROOFS", r#"
        CREATE TABLE IF NOT EXISTS task_proofs (
            id TEXT PRIMARY KEY,
            task_id TEXT NOT NULL,
            proof_type TEXT NOT NULL,
            url TEXT NOT NULL,
            latitude REAL,
            longitude REAL,
            caption TEXT,
            attached_at DATETIME NOT NULL
        );
    "#),
    ("TABLE_ALLOCATIONS", r#"
        CREATE TABLE IF NOT EXISTS allocations (
            id TEXT PRIMARY KEY,
            task_id TEXT NOT NULL,
            worker_id TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            score REAL NOT NULL DEFAULT 0.0,
            distance_km REAL NOT NULL DEFAULT 0.0,
            eta_minutes REAL NOT NULL DEFAULT 0.0,
            wave INTEGER NOT NULL DEFAULT 1,
            offered_at DATETIME NOT NULL,
            expires_at DATETIME NOT NULL,
            responded_at DATETIME,
            reason TEXT,
            version INTEGER NOT NULL DEFAULT 1
        );
    "#),
    ("TABLE_EARNINGS", r#"
        CREATE TABLE IF NOT EXISTS earnings (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            worker_id TEXT NOT NULL,
            task_id TEXT,
            entry_type TEXT NOT NULL,
            amount TEXT NOT NULL,
            currency TEXT NOT NULL,
            is_paid_out INTEGER NOT NULL DEFAULT 0,
            payout_id TEXT,
            description TEXT,
            earned_at DATETIME NOT NULL
        );
    "#),
    ("TABLE_PAYOUTS", r#"
        CREATE TABLE IF NOT EXISTS payouts (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            worker_id TEXT NOT NULL,
            amount TEXT NOT NULL,
            currency TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            method TEXT NOT NULL,
            target_account TEXT,
            reference TEXT NOT NULL,
            provider_reference TEXT,
            failure_reason TEXT,
            processed_at DATETIME,
            version INTEGER NOT NULL DEFAULT 1,
            created_at DATETIME NOT NULL,
            UNIQUE(tenant_id, reference)
        );
    "#),
    ("TABLE_ROUTES", r#"
        CREATE TABLE IF NOT EXISTS routes (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            worker_id TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            total_distance_km REAL NOT NULL DEFAULT 0.0,
            total_duration_minutes REAL NOT NULL DEFAULT 0.0,
            estimated_end_at DATETIME,
            started_at DATETIME,
            completed_at DATETIME,
            optimization_score REAL NOT NULL DEFAULT 0.0,
            version INTEGER NOT NULL DEFAULT 1,
            created_at DATETIME NOT NULL
        );
    "#),
    ("TABLE_ROUTE_STOPS", r#"
        CREATE TABLE IF NOT EXISTS route_stops (
            id TEXT PRIMARY KEY,
            route_id TEXT NOT NULL,
            task_id TEXT NOT NULL,
            sequence INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            latitude REAL NOT NULL,
            longitude REAL NOT NULL,
            address TEXT NOT NULL,
            distance_from_prev_km REAL NOT NULL DEFAULT 0.0,
            duration_from_prev_minutes REAL NOT NULL DEFAULT 0.0,
            estimated_arrival DATETIME,
            actual_arrival DATETIME,
            completed_at DATETIME,
            UNIQUE(route_id, sequence)
        );
    "#),
];

/**
 * ESTRATO 2: EVOLUCIÓN (Mutaciones de Columna)
 * Asegura que las tablas existentes se adapten a las nuevas capacidades.
 */
const EVOLUTIONARY_STRATA: &[(&str, &str)] = &[
    // --- TELEMETRÍA DE LIQUIDACIÓN ---
    ("PAYOUT_SUBMITTED_AT", "ALTER TABLE payouts ADD COLUMN submitted_at DATETIME"),
    // --- RASTRO DE DESPACHO ---
    ("TASK_DISPATCH_WAVES", "ALTER TABLE tasks ADD COLUMN dispatch_waves INTEGER NOT NULL DEFAULT 0"),
];

/**
 * ESTRATO 3: ENDURECIMIENTO (Índices de Aceleración y Exclusión Mutua)
 * El índice parcial de allocations es la ley física del at-most-one.
 */
const ACCELERATION_INDEXES: &[(&str, &str)] = &[
    ("IDX_ALLOC_SINGLE_ACCEPT", "CREATE UNIQUE INDEX IF NOT EXISTS idx_allocations_single_accept ON allocations(task_id) WHERE status = 'accepted';"),
    ("IDX_ROUTE_SINGLE_ACTIVE", "CREATE UNIQUE INDEX IF NOT EXISTS idx_routes_single_active ON routes(worker_id) WHERE status = 'active';"),
    ("IDX_WORKERS_TENANT", "CREATE INDEX IF NOT EXISTS idx_workers_tenant ON workers(tenant_id, lifecycle, availability);"),
    ("IDX_WORKERS_GEO_CELL", "CREATE INDEX IF NOT EXISTS idx_workers_geo_cell ON workers(geo_cell);"),
    ("IDX_WORKERS_GEO_BOX", "CREATE INDEX IF NOT EXISTS idx_workers_geo_box ON workers(latitude, longitude);"),
    ("IDX_TASKS_STATUS", "CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(tenant_id, status);"),
    ("IDX_TASKS_WORKER_LOAD", "CREATE INDEX IF NOT EXISTS idx_tasks_worker_load ON tasks(assigned_worker_id, status);"),
    ("IDX_ALLOC_SWEEP", "CREATE INDEX IF NOT EXISTS idx_allocations_sweep ON allocations(status, expires_at);"),
    ("IDX_ALLOC_TASK", "CREATE INDEX IF NOT EXISTS idx_allocations_task ON allocations(task_id);"),
    ("IDX_ALLOC_WORKER", "CREATE INDEX IF NOT EXISTS idx_allocations_worker ON allocations(worker_id, status);"),
    ("IDX_EARNINGS_UNPAID", "CREATE INDEX IF NOT EXISTS idx_earnings_unpaid ON earnings(worker_id, is_paid_out);"),
    ("IDX_EARNINGS_PAYOUT", "CREATE INDEX IF NOT EXISTS idx_earnings_payout ON earnings(payout_id);"),
    ("IDX_PAYOUTS_STATUS", "CREATE INDEX IF NOT EXISTS idx_payouts_status ON payouts(tenant_id, status);"),
    ("IDX_PAYOUTS_PROVIDER", "CREATE INDEX IF NOT EXISTS idx_payouts_provider ON payouts(provider_reference);"),
    ("IDX_STOPS_ROUTE", "CREATE INDEX IF NOT EXISTS idx_route_stops_route ON route_stops(route_id, sequence);"),
];

/**
 * Ejecuta la secuencia maestra de sincronización del esquema estructural.
 *
 * # Errors:
 * Retorna error si alguna tabla base falla en solidificarse, indicando
 * un colapso en el enlace con Turso. El orquestador trata este fallo
 * como crash-only: el proceso se niega a arrancar.
 */
#[instrument(skip(database_connection))]
pub async fn apply_dispatch_schema(database_connection: &Connection) -> Result<()> {
    info!("🏗️ [SCHEMA_ENGINE]: Initiating structural synchronization V5.2...");

    solidify_base_strata(database_connection).await?;
    execute_evolutionary_repair(database_connection).await?;
    harden_access_layer(database_connection).await?;

    info!("✅ [SCHEMA_ENGINE]: Dispatch Ledger V5.2 level and certified.");
    Ok(())
}

async fn solidify_base_strata(db: &Connection) -> Result<()> {
    for (identifier, sql) in TACTICAL_TABLES {
        debug!("  ↳ Solidifying: {}", identifier);
        db.execute(*sql, ()).await
            .with_context(|| format!("CRITICAL_SOLIDIFICATION_FAULT: {}", identifier))?;
    }
    Ok(())
}

async fn execute_evolutionary_repair(db: &Connection) -> Result<()> {
    for (identifier, sql) in EVOLUTIONARY_STRATA {
        // Las columnas ya existentes reportan error benigno: idempotencia.
        if let Err(mutation_fault) = db.execute(*sql, ()).await {
            let fault_text = mutation_fault.to_string();
            if fault_text.contains("duplicate column name") {
                debug!("  ↳ Stratum already evolved: {}", identifier);
            } else {
                warn!("⚠️ [SCHEMA_EVOLUTION]: {} rejected: {}", identifier, fault_text);
            }
        }
    }
    Ok(())
}

async fn harden_access_layer(db: &Connection) -> Result<()> {
    for (identifier, sql) in ACCELERATION_INDEXES {
        debug!("  ↳ Hardening: {}", identifier);
        db.execute(*sql, ()).await
            .with_context(|| format!("INDEX_HARDENING_FAULT: {}", identifier))?;
    }
    Ok(())
}
