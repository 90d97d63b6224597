// [tests/mirror/libs/domain/models_rs/monetary_scale.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE ESCALA MONETARIA (V2.1 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L2-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DEL PUNTO FIJO (20,6) Y SU PRESENTACIÓN
 * =================================================================
 */

use rust_decimal::Decimal;
use veloz_domain_models::{present_amount, require_non_negative, DomainError, MONETARY_SCALE};

fn dec(literal: &str) -> Decimal {
    literal.parse().expect("CRITICAL_FAULT: invalid decimal literal")
}

#[test]
fn certify_six_fractional_digits_survive_arithmetic() {
    let base = dec("1500.000001");
    let bonus = dec("0.000002");
    let sum = base + bonus;
    assert_eq!(sum, dec("1500.000003"));

    // Mil sumas de una millonésima: jamás deriva flotante.
    let mut accumulated = Decimal::ZERO;
    let micro = dec("0.000001");
    for _ in 0..1000 {
        accumulated += micro;
    }
    assert_eq!(accumulated, dec("0.001000"));
}

#[test]
fn certify_banker_rounding_at_presentation_only() {
    // Mitades equidistantes resuelven hacia el dígito par.
    assert_eq!(present_amount(dec("10.0000005")), "10.000000");
    assert_eq!(present_amount(dec("10.0000015")), "10.000002");
    assert_eq!(present_amount(dec("10.0000025")), "10.000002");

    // La presentación no muta el valor interno.
    let internal = dec("10.0000005");
    let _ = present_amount(internal);
    assert_eq!(internal, dec("10.0000005"));
}

#[test]
fn certify_scale_constant_matches_contract() {
    assert_eq!(MONETARY_SCALE, 6);
}

#[test]
fn certify_negative_guard_spares_adjustments() {
    assert!(require_non_negative("base_pay", dec("0")).is_ok());
    assert!(require_non_negative("base_pay", dec("1500.000000")).is_ok());

    let fault = require_non_negative("bonus_pay", dec("-0.000001")).unwrap_err();
    match fault {
        DomainError::NegativeAmount(detail) => assert!(detail.contains("bonus_pay")),
        other => panic!("unexpected fault class: {:?}", other),
    }
}

#[test]
fn certify_wire_strings_round_trip() {
    for literal in ["0.000000", "42000.000000", "1500.123456", "-500.000000"] {
        let value = dec(literal);
        let rendered = present_amount(value);
        assert_eq!(rendered.parse::<Decimal>().expect("round trip"), value);
    }
}
