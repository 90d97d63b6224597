// [libs/infra/db-turso/src/mapping.rs]
/*!
 * =================================================================
 * APARATO: ROW HYDRATION ENGINE (V5.2 - TYPE SECURED)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: TRANSFORMACIÓN SQLITE -> DOMINIO SIN DERIVA DE TIPOS
 *
 * # Mathematical Proof (Column Order Authority):
 * Cada entidad posee UNA lista de columnas canónica consumida por todo
 * SELECT del crate. El mapeador y la consulta comparten la autoridad
 * del orden, eliminando la clase entera de errores por desalineación.
 * =================================================================
 */

use chrono::{DateTime, SecondsFormat, Utc};
use libsql::Row;
use rust_decimal::Decimal;
use uuid::Uuid;
use veloz_core_geo::point::GeoPoint;
use veloz_domain_models::{
    Allocation, AllocationStatus, Availability, Earning, EarningType, ExpiryReason, Payout,
    PayoutMethod, PayoutStatus, ProofType, Route, RouteStatus, RouteStop, RouteStopStatus,
    SitePoint, Task, TaskProof, TaskStatus, TaskType, VehicleProfile, Worker, WorkerLifecycle,
    WorkerType,
};

use crate::errors::DbError;

/// Lista canónica de columnas de la tabla workers.
pub(crate) const WORKER_COLUMNS: &str = "id, tenant_id, user_id, worker_type, lifecycle, availability, contact_phone, latitude, longitude, geo_cell, last_location_at, rating, total_tasks, completed_tasks, max_concurrent_tasks, zones_json, skills_json, vehicle_json, payout_method, payout_target, version, created_at, updated_at";

/// Lista canónica de columnas de la tabla tasks.
pub(crate) const TASK_COLUMNS: &str = "id, tenant_id, task_type, status, priority, assigned_worker_id, required_worker_type, required_skills_json, zone_id, pickup_latitude, pickup_longitude, pickup_address, delivery_latitude, delivery_longitude, delivery_address, scheduled_at, deadline_at, estimated_duration_minutes, estimated_distance_km, actual_duration_minutes, actual_distance_km, base_pay, bonus_pay, tip_amount, currency, required_proofs_json, order_reference, metadata_json, escalated_at, started_at, completed_at, termination_reason, version, created_at, updated_at";

/// Lista canónica de columnas de la tabla allocations.
pub(crate) const ALLOCATION_COLUMNS: &str = "id, task_id, worker_id, status, score, distance_km, eta_minutes, wave, offered_at, expires_at, responded_at, reason, version";

/// Lista canónica de columnas de la tabla earnings.
pub(crate) const EARNING_COLUMNS: &str = "id, tenant_id, worker_id, task_id, entry_type, amount, currency, is_paid_out, payout_id, description, earned_at";

/// Lista canónica de columnas de la tabla payouts.
pub(crate) const PAYOUT_COLUMNS: &str = "id, tenant_id, worker_id, amount, currency, status, method, target_account, reference, provider_reference, failure_reason, processed_at, version, created_at";

/// Lista canónica de columnas de la tabla routes.
pub(crate) const ROUTE_COLUMNS: &str = "id, tenant_id, worker_id, status, total_distance_km, total_duration_minutes, estimated_end_at, started_at, completed_at, optimization_score, version, created_at";

/// Lista canónica de columnas de la tabla route_stops.
pub(crate) const STOP_COLUMNS: &str = "id, route_id, task_id, sequence, status, latitude, longitude, address, distance_from_prev_km, duration_from_prev_minutes, estimated_arrival, actual_arrival, completed_at";

/// Lista canónica de columnas de la tabla task_proofs.
pub(crate) const PROOF_COLUMNS: &str = "id, task_id, proof_type, url, latitude, longitude, caption, attached_at";

/**
 * Forma canónica de instante para el Ledger: RFC-3339 UTC con fracción
 * de microsegundos de ancho fijo. El ancho fijo vuelve el orden
 * lexicográfico idéntico al cronológico, habilitando guardias
 * monotónicas directamente en SQL.
 */
pub(crate) fn fmt_ts(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Micros, true)
}

// --- ESCALARES ---

pub(crate) fn get_uuid(row: &Row, index: i32) -> Result<Uuid, DbError> {
    let raw: String = row.get(index)?;
    Uuid::parse_str(&raw).map_err(|fault| DbError::MappingError(format!("uuid[{}]: {}", index, fault)))
}

pub(crate) fn get_opt_uuid(row: &Row, index: i32) -> Result<Option<Uuid>, DbError> {
    let raw: Option<String> = row.get(index)?;
    raw.map(|value| {
        Uuid::parse_str(&value)
            .map_err(|fault| DbError::MappingError(format!("uuid[{}]: {}", index, fault)))
    })
    .transpose()
}

pub(crate) fn get_datetime(row: &Row, index: i32) -> Result<DateTime<Utc>, DbError> {
    let raw: String = row.get(index)?;
    parse_rfc3339(&raw, index)
}

pub(crate) fn get_opt_datetime(row: &Row, index: i32) -> Result<Option<DateTime<Utc>>, DbError> {
    let raw: Option<String> = row.get(index)?;
    raw.map(|value| parse_rfc3339(&value, index)).transpose()
}

fn parse_rfc3339(raw: &str, index: i32) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|fault| DbError::MappingError(format!("datetime[{}]: {}", index, fault)))
}

pub(crate) fn get_decimal(row: &Row, index: i32) -> Result<Decimal, DbError> {
    let raw: String = row.get(index)?;
    raw.parse::<Decimal>()
        .map_err(|fault| DbError::MappingError(format!("decimal[{}]: {}", index, fault)))
}

pub(crate) fn get_bool(row: &Row, index: i32) -> Result<bool, DbError> {
    let raw: i64 = row.get(index)?;
    Ok(raw != 0)
}

pub(crate) fn get_json<T: serde::de::DeserializeOwned>(row: &Row, index: i32) -> Result<T, DbError> {
    let raw: String = row.get(index)?;
    serde_json::from_str(&raw)
        .map_err(|fault| DbError::MappingError(format!("json[{}]: {}", index, fault)))
}

pub(crate) fn get_opt_point(
    row: &Row,
    latitude_index: i32,
    longitude_index: i32,
) -> Result<Option<GeoPoint>, DbError> {
    let latitude: Option<f64> = row.get(latitude_index)?;
    let longitude: Option<f64> = row.get(longitude_index)?;
    match (latitude, longitude) {
        (Some(lat), Some(lng)) => GeoPoint::new(lat, lng)
            .map(Some)
            .map_err(|fault| DbError::MappingError(fault.to_string())),
        _ => Ok(None),
    }
}

fn get_opt_site(
    row: &Row,
    latitude_index: i32,
    longitude_index: i32,
    address_index: i32,
) -> Result<Option<SitePoint>, DbError> {
    let point = get_opt_point(row, latitude_index, longitude_index)?;
    let address: Option<String> = row.get(address_index)?;
    Ok(match (point, address) {
        (Some(point), Some(address)) => Some(SitePoint { point, address }),
        _ => None,
    })
}

// --- HIDRATADORES DE ENTIDAD ---

pub(crate) fn map_worker_row(row: &Row) -> Result<Worker, DbError> {
    let worker_type_raw: String = row.get(3)?;
    let lifecycle_raw: String = row.get(4)?;
    let availability_raw: String = row.get(5)?;
    let vehicle_raw: Option<String> = row.get(17)?;
    let payout_method_raw: String = row.get(18)?;

    let vehicle: Option<VehicleProfile> = vehicle_raw
        .map(|raw| serde_json::from_str(&raw))
        .transpose()
        .map_err(|fault| DbError::MappingError(format!("vehicle_json: {}", fault)))?;

    Ok(Worker {
        id: get_uuid(row, 0)?,
        tenant_id: get_uuid(row, 1)?,
        user_id: get_uuid(row, 2)?,
        worker_type: WorkerType::parse(&worker_type_raw)?,
        lifecycle: WorkerLifecycle::parse(&lifecycle_raw)?,
        availability: Availability::parse(&availability_raw)?,
        contact_phone: row.get(6)?,
        location: get_opt_point(row, 7, 8)?,
        last_location_at: get_opt_datetime(row, 10)?,
        rating: row.get(11)?,
        total_tasks: row.get(12)?,
        completed_tasks: row.get(13)?,
        max_concurrent_tasks: row.get(14)?,
        zones: get_json(row, 15)?,
        skills: get_json(row, 16)?,
        vehicle,
        payout_method: PayoutMethod::parse(&payout_method_raw)?,
        payout_target: row.get(19)?,
        version: row.get(20)?,
        created_at: get_datetime(row, 21)?,
        updated_at: get_datetime(row, 22)?,
    })
}

pub(crate) fn map_task_row(row: &Row) -> Result<Task, DbError> {
    let task_type_raw: String = row.get(2)?;
    let status_raw: String = row.get(3)?;
    let required_type_raw: String = row.get(6)?;
    let priority: i64 = row.get(4)?;

    let required_proofs_raw: Vec<String> = get_json(row, 25)?;
    let required_proof_types = required_proofs_raw
        .iter()
        .map(|raw| ProofType::parse(raw).map_err(DbError::from))
        .collect::<Result<Vec<ProofType>, DbError>>()?;

    let metadata_raw: String = row.get(27)?;
    let metadata = serde_json::from_str(&metadata_raw)
        .map_err(|fault| DbError::MappingError(format!("metadata_json: {}", fault)))?;

    Ok(Task {
        id: get_uuid(row, 0)?,
        tenant_id: get_uuid(row, 1)?,
        task_type: TaskType::parse(&task_type_raw)?,
        status: TaskStatus::parse(&status_raw)?,
        priority: priority as i32,
        assigned_worker_id: get_opt_uuid(row, 5)?,
        required_worker_type: WorkerType::parse(&required_type_raw)?,
        required_skills: get_json(row, 7)?,
        zone_id: row.get(8)?,
        pickup: get_opt_site(row, 9, 10, 11)?,
        delivery: get_opt_site(row, 12, 13, 14)?,
        scheduled_at: get_opt_datetime(row, 15)?,
        deadline_at: get_opt_datetime(row, 16)?,
        estimated_duration_minutes: row.get(17)?,
        estimated_distance_km: row.get(18)?,
        actual_duration_minutes: row.get(19)?,
        actual_distance_km: row.get(20)?,
        base_pay: get_decimal(row, 21)?,
        bonus_pay: get_decimal(row, 22)?,
        tip_amount: get_decimal(row, 23)?,
        currency: row.get(24)?,
        required_proof_types,
        proofs: Vec::new(),
        order_reference: row.get(26)?,
        metadata,
        escalated_at: get_opt_datetime(row, 28)?,
        started_at: get_opt_datetime(row, 29)?,
        completed_at: get_opt_datetime(row, 30)?,
        termination_reason: row.get(31)?,
        version: row.get(32)?,
        created_at: get_datetime(row, 33)?,
        updated_at: get_datetime(row, 34)?,
    })
}

pub(crate) fn map_allocation_row(row: &Row) -> Result<Allocation, DbError> {
    let status_raw: String = row.get(3)?;
    let reason_raw: Option<String> = row.get(11)?;
    let wave: i64 = row.get(7)?;

    let reason = reason_raw
        .map(|raw| ExpiryReason::parse(&raw).map_err(DbError::from))
        .transpose()?;

    Ok(Allocation {
        id: get_uuid(row, 0)?,
        task_id: get_uuid(row, 1)?,
        worker_id: get_uuid(row, 2)?,
        status: AllocationStatus::parse(&status_raw)?,
        score: row.get(4)?,
        distance_km: row.get(5)?,
        eta_minutes: row.get(6)?,
        wave: wave as i32,
        offered_at: get_datetime(row, 8)?,
        expires_at: get_datetime(row, 9)?,
        responded_at: get_opt_datetime(row, 10)?,
        reason,
        version: row.get(12)?,
    })
}

pub(crate) fn map_earning_row(row: &Row) -> Result<Earning, DbError> {
    let entry_type_raw: String = row.get(4)?;

    Ok(Earning {
        id: get_uuid(row, 0)?,
        tenant_id: get_uuid(row, 1)?,
        worker_id: get_uuid(row, 2)?,
        task_id: get_opt_uuid(row, 3)?,
        entry_type: EarningType::parse(&entry_type_raw)?,
        amount: get_decimal(row, 5)?,
        currency: row.get(6)?,
        is_paid_out: get_bool(row, 7)?,
        payout_id: get_opt_uuid(row, 8)?,
        description: row.get(9)?,
        earned_at: get_datetime(row, 10)?,
    })
}

pub(crate) fn map_payout_row(row: &Row) -> Result<Payout, DbError> {
    let status_raw: String = row.get(5)?;
    let method_raw: String = row.get(6)?;

    Ok(Payout {
        id: get_uuid(row, 0)?,
        tenant_id: get_uuid(row, 1)?,
        worker_id: get_uuid(row, 2)?,
        amount: get_decimal(row, 3)?,
        currency: row.get(4)?,
        status: PayoutStatus::parse(&status_raw)?,
        method: PayoutMethod::parse(&method_raw)?,
        target_account: row.get(7)?,
        reference: row.get(8)?,
        provider_reference: row.get(9)?,
        failure_reason: row.get(10)?,
        processed_at: get_opt_datetime(row, 11)?,
        version: row.get(12)?,
        created_at: get_datetime(row, 13)?,
    })
}

pub(crate) fn map_route_row(row: &Row) -> Result<Route, DbError> {
    let status_raw: String = row.get(3)?;

    Ok(Route {
        id: get_uuid(row, 0)?,
        tenant_id: get_uuid(row, 1)?,
        worker_id: get_uuid(row, 2)?,
        status: RouteStatus::parse(&status_raw)?,
        total_distance_km: row.get(4)?,
        total_duration_minutes: row.get(5)?,
        estimated_end_at: get_opt_datetime(row, 6)?,
        started_at: get_opt_datetime(row, 7)?,
        completed_at: get_opt_datetime(row, 8)?,
        optimization_score: row.get(9)?,
        stops: Vec::new(),
        version: row.get(10)?,
        created_at: get_datetime(row, 11)?,
    })
}

pub(crate) fn map_stop_row(row: &Row) -> Result<RouteStop, DbError> {
    let status_raw: String = row.get(4)?;
    let sequence: i64 = row.get(3)?;
    let latitude: f64 = row.get(5)?;
    let longitude: f64 = row.get(6)?;
    let address: String = row.get(7)?;

    let point = GeoPoint::new(latitude, longitude)
        .map_err(|fault| DbError::MappingError(fault.to_string()))?;

    Ok(RouteStop {
        id: get_uuid(row, 0)?,
        route_id: get_uuid(row, 1)?,
        task_id: get_uuid(row, 2)?,
        sequence: sequence as i32,
        status: RouteStopStatus::parse(&status_raw)?,
        location: SitePoint { point, address },
        distance_from_prev_km: row.get(8)?,
        duration_from_prev_minutes: row.get(9)?,
        estimated_arrival: get_opt_datetime(row, 10)?,
        actual_arrival: get_opt_datetime(row, 11)?,
        completed_at: get_opt_datetime(row, 12)?,
    })
}

pub(crate) fn map_proof_row(row: &Row) -> Result<TaskProof, DbError> {
    let proof_type_raw: String = row.get(2)?;

    Ok(TaskProof {
        id: get_uuid(row, 0)?,
        task_id: get_uuid(row, 1)?,
        proof_type: ProofType::parse(&proof_type_raw)?,
        url: row.get(3)?,
        captured_at_point: get_opt_point(row, 4, 5)?,
        caption: row.get(6)?,
        attached_at: get_datetime(row, 7)?,
    })
}
