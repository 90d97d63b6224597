// [tests/mirror/libs/shared/heimdall/heimdall_integrity.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE OBSERVABILIDAD (V3.0 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L4-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DE LA IGNICIÓN DEL NERVIO ÓPTICO
 * =================================================================
 */

use veloz_shared_heimdall::init_tracing;

#[test]
fn certify_tracing_ignition_and_panic_shield() {
    // La ignición instala el suscriptor global y el Phoenix Shield.
    init_tracing("veloz_heimdall_certifier");

    // El hook de pánico quedó instalado: capturamos un colapso
    // controlado en hilo secundario sin derribar al certificador.
    let probe = std::thread::spawn(|| {
        panic!("CONTROLLED_COLLAPSE_PROBE");
    });
    assert!(probe.join().is_err(), "the probe thread must have panicked");

    // El proceso sigue vivo y el rastro posterior fluye con normalidad.
    tracing::info!("🧪 [CERTIFIER]: Post-panic trace emitted.");
}
