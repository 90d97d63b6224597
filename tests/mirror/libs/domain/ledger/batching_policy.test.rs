// [tests/mirror/libs/domain/ledger/batching_policy.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE POLÍTICA DE LOTEO (V3.1 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L2-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DEL UMBRAL, AGRUPACIÓN Y REFERENCIAS
 * =================================================================
 */

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;
use veloz_domain_ledger::{batch_reference, plan_payout_batches, UnpaidLine};
use veloz_domain_models::EarningType;
use veloz_domain_ledger::build_completion_earnings;

fn dec(literal: &str) -> Decimal {
    literal.parse().expect("CRITICAL_FAULT: invalid decimal literal")
}

fn line(worker_id: Uuid, amount: &str) -> UnpaidLine {
    UnpaidLine {
        earning_id: Uuid::new_v4(),
        worker_id,
        amount: dec(amount),
        currency: "NGN".into(),
    }
}

fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 8, 1).expect("valid date")
}

#[test]
fn certify_completion_lines_minimality() {
    // Base sola: exactamente una línea task_completion.
    let only_base = build_completion_earnings(
        Uuid::new_v4(),
        dec("1500.000000"),
        Decimal::ZERO,
        Decimal::ZERO,
        "NGN",
    );
    assert_eq!(only_base.len(), 1);
    assert_eq!(only_base[0].entry_type, EarningType::TaskCompletion);

    // Base + bono + propina: tres líneas tipadas en orden.
    let full = build_completion_earnings(
        Uuid::new_v4(),
        dec("1000"),
        dec("200"),
        dec("50"),
        "NGN",
    );
    assert_eq!(full.len(), 3);
    assert_eq!(full[1].entry_type, EarningType::Bonus);
    assert_eq!(full[2].entry_type, EarningType::Tip);

    let total: Decimal = full.iter().map(|draft| draft.amount).sum();
    assert_eq!(total, dec("1250"));
}

#[test]
fn certify_threshold_gate() {
    let worker = Uuid::new_v4();

    let below = plan_payout_batches(
        vec![line(worker, "999.999999")],
        dec("1000.000000"),
        run_date(),
    );
    assert!(below.is_empty());

    let at_threshold = plan_payout_batches(
        vec![line(worker, "1000.000000")],
        dec("1000.000000"),
        run_date(),
    );
    assert_eq!(at_threshold.len(), 1);
    assert_eq!(at_threshold[0].total_amount, dec("1000.000000"));
}

#[test]
fn certify_no_line_belongs_to_two_plans() {
    let worker_a = Uuid::new_v4();
    let worker_b = Uuid::new_v4();

    let lines = vec![
        line(worker_a, "2000.000000"),
        line(worker_a, "3000.000000"),
        line(worker_b, "5000.000000"),
    ];
    let all_line_ids: Vec<Uuid> = lines.iter().map(|unpaid| unpaid.earning_id).collect();

    let plans = plan_payout_batches(lines, dec("100"), run_date());

    let mut seen: Vec<Uuid> = Vec::new();
    for plan in &plans {
        for earning_id in &plan.earning_ids {
            assert!(!seen.contains(earning_id), "line double-counted");
            seen.push(*earning_id);
        }
    }
    assert_eq!(seen.len(), all_line_ids.len());
}

#[test]
fn certify_batch_references_never_collide() {
    let worker = Uuid::new_v4();

    // Nonce distinto: un lote fallido puede re-lotearse el MISMO día
    // sin colisionar con la unicidad (tenant, reference).
    let first = batch_reference(worker, run_date(), Uuid::new_v4());
    let second = batch_reference(worker, run_date(), Uuid::new_v4());
    assert_ne!(first, second);

    // El prefijo de fecha y worker preserva el rastro auditable.
    assert!(first.starts_with("PB-20260801-"));
    let tomorrow = NaiveDate::from_ymd_opt(2026, 8, 2).expect("valid date");
    assert!(batch_reference(worker, tomorrow, Uuid::new_v4()).starts_with("PB-20260802-"));
}

#[test]
fn certify_zero_sum_groups_are_skipped() {
    let worker = Uuid::new_v4();

    // Un ajuste negativo que anula el devengo: el grupo no produce lote
    // ni siquiera con umbral cero.
    let plans = plan_payout_batches(
        vec![line(worker, "500.000000"), line(worker, "-500.000000")],
        Decimal::ZERO,
        run_date(),
    );
    assert!(plans.is_empty());
}
