// [tests/mirror/libs/infra/db_turso/schema_bootstrap.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE BOOTSTRAP DE ESQUEMA (V5.0 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DE IDEMPOTENCIA Y EXCLUSIÓN MUTUA FÍSICA
 *
 * # Mathematical Proof (Engine-Level Mutual Exclusion):
 * El índice único parcial sobre allocations convierte la segunda
 * aceptación en violación de unicidad DEL MOTOR, independiente de
 * cualquier disciplina del código aplicativo.
 * =================================================================
 */

use libsql::params;
use veloz_infra_db::schema::apply_dispatch_schema;
use veloz_infra_db::TursoClient;

async fn forge_client(tag: &str) -> TursoClient {
    TursoClient::connect(&format!("file:{}?mode=memory&cache=shared", tag), None)
        .await
        .expect("CRITICAL_FAULT: failed to anchor in-memory tactical ledger")
}

#[tokio::test]
async fn certify_bootstrap_is_idempotent() {
    let client = forge_client("mem_schema_idem_v5").await;
    let connection = client.get_connection().expect("connection");

    // El connect ya aplicó el esquema; re-aplicarlo debe ser inocuo.
    apply_dispatch_schema(&connection)
        .await
        .expect("second bootstrap pass");
    apply_dispatch_schema(&connection)
        .await
        .expect("third bootstrap pass");
}

#[tokio::test]
async fn certify_partial_unique_index_enforces_single_accept() {
    let client = forge_client("mem_schema_partial_v5").await;
    let connection = client.get_connection().expect("connection");

    let seed_allocation = r#"
        INSERT INTO allocations (
            id, task_id, worker_id, status, score, distance_km, eta_minutes,
            wave, offered_at, expires_at, version
        ) VALUES (?1, 'task-racing', ?2, ?3, 0.5, 1.0, 2.0, 1,
                  '2026-08-01T12:00:00.000000Z', '2026-08-01T12:00:45.000000Z', 1)
    "#;

    connection
        .execute(seed_allocation, params!["alloc-1", "worker-1", "accepted"])
        .await
        .expect("first accepted row");

    // Segunda 'accepted' para la MISMA tarea: el motor la rechaza.
    let second_accept = connection
        .execute(seed_allocation, params!["alloc-2", "worker-2", "accepted"])
        .await;
    let fault = second_accept.expect_err("engine must reject the second accept");
    assert!(fault.to_string().contains("UNIQUE constraint failed"));

    // Estados no-aceptados conviven sin fricción para la misma tarea.
    connection
        .execute(seed_allocation, params!["alloc-3", "worker-3", "expired"])
        .await
        .expect("expired sibling is legal");
    connection
        .execute(seed_allocation, params!["alloc-4", "worker-4", "offered"])
        .await
        .expect("offered sibling is legal");
}

#[tokio::test]
async fn certify_single_active_route_index() {
    let client = forge_client("mem_schema_route_v5").await;
    let connection = client.get_connection().expect("connection");

    let seed_route = r#"
        INSERT INTO routes (
            id, tenant_id, worker_id, status, total_distance_km,
            total_duration_minutes, optimization_score, version, created_at
        ) VALUES (?1, 'tenant-1', 'worker-1', ?2, 10.0, 30.0, 0.2, 1,
                  '2026-08-01T08:00:00.000000Z')
    "#;

    connection
        .execute(seed_route, params!["route-1", "active"])
        .await
        .expect("first active route");

    let second_active = connection
        .execute(seed_route, params!["route-2", "active"])
        .await;
    assert!(second_active.is_err(), "one active route per worker");

    // Recorridos terminados no bloquean la unicidad del activo.
    connection
        .execute(seed_route, params!["route-3", "completed"])
        .await
        .expect("completed route coexists");
}
