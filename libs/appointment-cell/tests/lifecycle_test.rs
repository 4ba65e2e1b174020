use std::collections::HashSet;

use tokio_test::{assert_err, assert_ok};

use appointment_cell::models::*;

#[test]
fn test_extended_action_table() {
    let expected: Vec<(AppointmentStatus, Vec<AppointmentAction>)> = vec![
        (
            AppointmentStatus::PendingConfirmation,
            vec![AppointmentAction::AssignDoctor, AppointmentAction::Approve, AppointmentAction::Reject],
        ),
        (AppointmentStatus::Confirmed, vec![AppointmentAction::JoinVideoCall]),
        (AppointmentStatus::DoctorCompleted, vec![AppointmentAction::ConfirmCompletion]),
        (AppointmentStatus::Disputed, vec![AppointmentAction::ResolveDispute]),
        (AppointmentStatus::Completed, vec![]),
        (AppointmentStatus::Refunded, vec![]),
        (AppointmentStatus::Rejected, vec![]),
        (AppointmentStatus::Cancelled, vec![]),
    ];

    for (status, actions) in expected {
        assert_eq!(status.available_actions(), actions, "actions for {}", status);
    }
}

#[test]
fn test_basic_action_table() {
    assert_eq!(
        BasicAppointmentStatus::Pending.available_actions(),
        vec![AppointmentAction::AssignDoctor, AppointmentAction::Approve, AppointmentAction::Reject]
    );
    assert_eq!(
        BasicAppointmentStatus::Approved.available_actions(),
        vec![AppointmentAction::JoinVideoCall, AppointmentAction::Complete, AppointmentAction::Cancel]
    );

    for status in BasicAppointmentStatus::ALL {
        if status.is_terminal() {
            assert!(status.available_actions().is_empty());
            assert!(status.next_statuses().is_empty());
        }
    }
}

#[test]
fn test_every_action_comes_from_a_non_terminal_status() {
    for status in AppointmentStatus::ALL {
        let actions = status.available_actions();
        let unique: HashSet<_> = actions.iter().collect();
        assert_eq!(unique.len(), actions.len(), "duplicate action for {}", status);

        if !actions.is_empty() {
            assert!(!status.is_terminal());
        }
    }
}

#[test]
fn test_transitions_out_of_terminal_states_rejected() {
    for from in AppointmentStatus::ALL.into_iter().filter(|s| s.is_terminal()) {
        for to in AppointmentStatus::ALL {
            assert!(from.validate_transition(&to).is_err(), "{} -> {} accepted", from, to);
        }
    }
}

#[test]
fn test_pending_moves_to_confirmed_or_rejected_only() {
    let pending = AppointmentStatus::PendingConfirmation;
    assert_ok!(pending.validate_transition(&AppointmentStatus::Confirmed));
    assert_ok!(pending.validate_transition(&AppointmentStatus::Rejected));
    assert_err!(pending.validate_transition(&AppointmentStatus::Completed));
    assert_err!(pending.validate_transition(&AppointmentStatus::Cancelled));
}

#[test]
fn test_legacy_status_spellings_map_onto_canonical_model() {
    let pending: AppointmentStatus = serde_json::from_str("\"PENDING\"").unwrap();
    let approved: AppointmentStatus = serde_json::from_str("\"APPROVED\"").unwrap();

    assert_eq!(pending, AppointmentStatus::PendingConfirmation);
    assert_eq!(approved, AppointmentStatus::Confirmed);
    assert_eq!(AppointmentStatus::from(BasicAppointmentStatus::Approved), AppointmentStatus::Confirmed);
}

#[test]
fn test_confirm_action_alias() {
    let action: AppointmentAction = serde_json::from_str("\"confirm\"").unwrap();
    assert_eq!(action, AppointmentAction::Approve);
}
