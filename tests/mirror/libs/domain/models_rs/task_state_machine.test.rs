// [tests/mirror/libs/domain/models_rs/task_state_machine.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE MÁQUINA DE ESTADOS (V4.0 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L2-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DE MONOTONICIDAD DEL CICLO DE VIDA
 *
 * # Mathematical Proof (Monotone Lifecycle):
 * La relación legal es acíclica y los terminales carecen de sucesor;
 * ninguna secuencia de transiciones legales regresa a un estado previo.
 * =================================================================
 */

use veloz_domain_models::{DomainError, PayoutStatus, TaskStatus};

const ALL_TASK_STATES: [TaskStatus; 7] = [
    TaskStatus::Pending,
    TaskStatus::Assigned,
    TaskStatus::Accepted,
    TaskStatus::InProgress,
    TaskStatus::Completed,
    TaskStatus::Failed,
    TaskStatus::Cancelled,
];

#[test]
fn certify_happy_path_chain() {
    assert!(TaskStatus::Pending.can_transition_to(TaskStatus::Assigned));
    assert!(TaskStatus::Assigned.can_transition_to(TaskStatus::Accepted));
    assert!(TaskStatus::Accepted.can_transition_to(TaskStatus::InProgress));
    assert!(TaskStatus::InProgress.can_transition_to(TaskStatus::Completed));
    assert!(TaskStatus::InProgress.can_transition_to(TaskStatus::Failed));
}

#[test]
fn certify_cancellation_window() {
    // Cancelable: pending, assigned, accepted. Jamás en ejecución o terminal.
    assert!(TaskStatus::Pending.can_transition_to(TaskStatus::Cancelled));
    assert!(TaskStatus::Assigned.can_transition_to(TaskStatus::Cancelled));
    assert!(TaskStatus::Accepted.can_transition_to(TaskStatus::Cancelled));
    assert!(!TaskStatus::InProgress.can_transition_to(TaskStatus::Cancelled));
    assert!(!TaskStatus::Completed.can_transition_to(TaskStatus::Cancelled));
}

#[test]
fn certify_terminals_have_no_successors() {
    for terminal in [TaskStatus::Completed, TaskStatus::Failed, TaskStatus::Cancelled] {
        assert!(terminal.is_terminal());
        for target in ALL_TASK_STATES {
            assert!(
                !terminal.can_transition_to(target),
                "terminal {} found successor {}",
                terminal.as_str(),
                target.as_str()
            );
        }
    }
}

#[test]
fn certify_no_backward_transitions() {
    // Orden topológico del camino feliz: ningún salto retrocede.
    let forward_chain = [
        TaskStatus::Pending,
        TaskStatus::Assigned,
        TaskStatus::Accepted,
        TaskStatus::InProgress,
    ];
    for (position, state) in forward_chain.iter().enumerate() {
        for earlier in &forward_chain[..position] {
            assert!(
                !state.can_transition_to(*earlier),
                "{} regressed to {}",
                state.as_str(),
                earlier.as_str()
            );
        }
    }
}

#[test]
fn certify_ensure_transition_reports_domain_fault() {
    let fault = TaskStatus::Completed
        .ensure_transition(TaskStatus::Pending)
        .unwrap_err();
    assert!(matches!(fault, DomainError::InvalidTransition { .. }));
}

#[test]
fn certify_capacity_consuming_states() {
    assert!(TaskStatus::Assigned.consumes_capacity());
    assert!(TaskStatus::Accepted.consumes_capacity());
    assert!(TaskStatus::InProgress.consumes_capacity());
    assert!(!TaskStatus::Pending.consumes_capacity());
    assert!(!TaskStatus::Completed.consumes_capacity());
}

#[test]
fn certify_payout_machine_is_one_way_except_failed_release() {
    assert!(PayoutStatus::Pending.can_transition_to(PayoutStatus::Processing));
    assert!(PayoutStatus::Processing.can_transition_to(PayoutStatus::Completed));
    assert!(PayoutStatus::Processing.can_transition_to(PayoutStatus::Failed));

    // Terminales sellados: el 'failed' libera líneas, no regresa estados.
    assert!(!PayoutStatus::Completed.can_transition_to(PayoutStatus::Processing));
    assert!(!PayoutStatus::Failed.can_transition_to(PayoutStatus::Processing));
    assert!(!PayoutStatus::Completed.can_transition_to(PayoutStatus::Failed));
}
