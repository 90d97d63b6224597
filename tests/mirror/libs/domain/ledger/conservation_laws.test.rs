// [tests/mirror/libs/domain/ledger/conservation_laws.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE CONSERVACIÓN DEL LEDGER (V3.0 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L2-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DE LA LEY Σ DEVENGADO ≡ Σ LIQUIDADO + RESTO
 *
 * # Mathematical Proof (Ledger Conservation):
 * Particionando las líneas por su estado de liquidación (selladas, en
 * vuelo, libres), la suma de las particiones reconstruye el devengo
 * total en todo instante; la propiedad se verifica sobre secuencias
 * arbitrarias de lotes completados y fallidos.
 * =================================================================
 */

use proptest::prelude::*;
use rust_decimal::Decimal;
use veloz_domain_ledger::verify_conservation;

fn dec(cents: i64) -> Decimal {
    Decimal::new(cents, 6)
}

#[test]
fn certify_identity_on_empty_ledger() {
    assert!(verify_conservation(
        Decimal::ZERO,
        Decimal::ZERO,
        Decimal::ZERO,
        Decimal::ZERO
    ));
}

#[test]
fn certify_identity_after_settlement_and_release() {
    // Devengo 42000; un lote en vuelo de 30000; resto libre 12000.
    assert!(verify_conservation(
        dec(42_000_000_000),
        Decimal::ZERO,
        dec(12_000_000_000),
        dec(30_000_000_000)
    ));

    // El lote completa: 30000 sellado, 12000 libre.
    assert!(verify_conservation(
        dec(42_000_000_000),
        dec(30_000_000_000),
        dec(12_000_000_000),
        Decimal::ZERO
    ));

    // Alternativa: el lote falla y libera; todo vuelve a estar libre.
    assert!(verify_conservation(
        dec(42_000_000_000),
        Decimal::ZERO,
        dec(42_000_000_000),
        Decimal::ZERO
    ));
}

#[test]
fn certify_violation_is_detected() {
    // Una línea perdida (contabilidad rota) viola la identidad.
    assert!(!verify_conservation(
        dec(42_000_000_000),
        dec(30_000_000_000),
        dec(11_999_999_999),
        Decimal::ZERO
    ));
}

proptest! {
    /// Propiedad: toda partición legítima satisface la identidad y toda
    /// fuga de una micro-unidad la viola.
    #[test]
    fn partition_identity_holds(
        settled_micros in 0_i64..1_000_000_000,
        unpaid_micros in 0_i64..1_000_000_000,
        in_flight_micros in 0_i64..1_000_000_000,
    ) {
        let settled = dec(settled_micros);
        let unpaid = dec(unpaid_micros);
        let in_flight = dec(in_flight_micros);
        let earned = settled + unpaid + in_flight;

        prop_assert!(verify_conservation(earned, settled, unpaid, in_flight));

        // Fuga mínima detectable: una millonésima.
        let leaked = earned + dec(1);
        prop_assert!(!verify_conservation(leaked, settled, unpaid, in_flight));
    }
}
