use pretty_assertions::assert_eq;
use serde_json::json;
use server::roznama::entries_of;
use shared_types::{
    AddEntryRequest, AppErrorKind, CaseEventType, CaseStatus, CloseRequest, ClosureOutcome,
    FormStatus, FormType, PersonRole,
};
use std::sync::atomic::Ordering;

use crate::common::{
    create_test_case, create_test_form, create_test_person, create_test_station, test_entry,
    test_header, test_pipeline, OFFICER,
};

fn first_entry() -> AddEntryRequest {
    AddEntryRequest {
        entry: test_entry("2024-01-10", "X"),
        header: Some(test_header()),
        close: None,
    }
}

#[tokio::test]
async fn first_entry_without_header_fails() {
    let p = test_pipeline();
    let case_id = create_test_case(&p, "BR-40/2024", None);
    let request = AddEntryRequest {
        entry: test_entry("2024-01-10", "X"),
        header: None,
        close: None,
    };

    let err = p.roznama.add_entry(case_id, request, OFFICER).await.unwrap_err();

    assert_eq!(err.kind, AppErrorKind::ValidationError);
    assert_eq!(err.message, "Roznama header required for first entry");
    assert!(err.field_errors.contains_key("header"));
    assert!(p.store.roznama_forms(case_id).is_empty());
}

#[tokio::test]
async fn first_entry_creates_exactly_one_log() {
    let p = test_pipeline();
    let case_id = create_test_case(&p, "BR-41/2024", None);

    let first = p.roznama.add_entry(case_id, first_entry(), OFFICER).await.unwrap();
    assert!(first.created_roznama);
    assert_eq!(first.total_entries, 1);
    assert!(!first.case_closed);
    assert_eq!(first.closure, ClosureOutcome::NotRequested);

    // A header on a later entry is ignored, never a second log.
    let second = p.roznama.add_entry(case_id, first_entry(), OFFICER).await.unwrap();
    assert!(!second.created_roznama);
    assert_eq!(second.total_entries, 2);

    let third = AddEntryRequest {
        entry: test_entry("2024-03-01", "Z"),
        header: None,
        close: None,
    };
    let third = p.roznama.add_entry(case_id, third, OFFICER).await.unwrap();
    assert_eq!(third.total_entries, 3);

    let logs = p.store.roznama_forms(case_id);
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, FormStatus::Approved);
    let dates: Vec<String> = entries_of(&logs[0]).unwrap().into_iter().map(|e| e.date).collect();
    assert_eq!(dates, vec!["2024-01-10", "2024-01-10", "2024-03-01"]);
}

#[tokio::test]
async fn entry_is_trimmed_and_needs_proceedings() {
    let p = test_pipeline();
    let case_id = create_test_case(&p, "BR-42/2024", None);
    let request = AddEntryRequest {
        entry: test_entry("2024-01-10", "   "),
        header: Some(test_header()),
        close: None,
    };

    let err = p.roznama.add_entry(case_id, request, OFFICER).await.unwrap_err();

    assert_eq!(err.kind, AppErrorKind::ValidationError);
    assert!(err.field_errors.contains_key("proceedings"));
    assert!(p.store.roznama_forms(case_id).is_empty());
}

#[tokio::test]
async fn header_must_name_case_and_station() {
    let p = test_pipeline();
    let case_id = create_test_case(&p, "BR-43/2024", None);
    let mut header = test_header();
    header.police_station = String::new();
    let request = AddEntryRequest {
        entry: test_entry("2024-01-10", "X"),
        header: Some(header),
        close: None,
    };

    let err = p.roznama.add_entry(case_id, request, OFFICER).await.unwrap_err();

    assert_eq!(err.kind, AppErrorKind::ValidationError);
    assert!(err.field_errors.contains_key("police_station"));
}

#[tokio::test]
async fn concurrent_first_entry_appends_to_winner() {
    let p = test_pipeline();
    let case_id = create_test_case(&p, "BR-44/2024", None);
    p.roznama.add_entry(case_id, first_entry(), OFFICER).await.unwrap();

    // This caller does not see the winner's log and tries to create one.
    p.store.hide_roznama_once.store(true, Ordering::SeqCst);
    let outcome = p.roznama.add_entry(case_id, first_entry(), OFFICER).await.unwrap();

    assert!(!outcome.created_roznama);
    assert_eq!(outcome.total_entries, 2);
    assert_eq!(p.store.roznama_forms(case_id).len(), 1);
}

#[tokio::test]
async fn simultaneous_first_entries_never_create_two_logs() {
    let p = test_pipeline();
    let case_id = create_test_case(&p, "BR-45/2024", None);

    let (a, b) = tokio::join!(
        p.roznama.add_entry(case_id, first_entry(), "officer-a"),
        p.roznama.add_entry(case_id, first_entry(), "officer-b"),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(p.store.roznama_forms(case_id).len(), 1);
    assert!(a.created_roznama ^ b.created_roznama);
    let mut totals = vec![a.total_entries, b.total_entries];
    totals.sort();
    assert_eq!(totals, vec![1, 2]);
}

#[tokio::test]
async fn closed_case_rejects_entries() {
    let p = test_pipeline();
    let station = create_test_station(&p, "Kotwali");
    let case_id = create_test_case(&p, "BR-46/2024", Some(station));
    let mut request = first_entry();
    request.close = Some(CloseRequest::default());
    p.roznama.add_entry(case_id, request, OFFICER).await.unwrap();
    assert_eq!(p.store.case(case_id).status, CaseStatus::Closed);

    let err = p.roznama.add_entry(case_id, first_entry(), OFFICER).await.unwrap_err();

    assert_eq!(err.kind, AppErrorKind::InvalidState);
    assert_eq!(entries_of(&p.store.roznama_forms(case_id)[0]).unwrap().len(), 1);
}

#[tokio::test]
async fn closed_case_is_checked_before_the_entry() {
    let p = test_pipeline();
    let station = create_test_station(&p, "Kotwali");
    let case_id = create_test_case(&p, "BR-47/2024", Some(station));
    let mut request = first_entry();
    request.close = Some(CloseRequest::default());
    p.roznama.add_entry(case_id, request, OFFICER).await.unwrap();

    let blank = AddEntryRequest {
        entry: test_entry("", "X"),
        header: None,
        close: None,
    };
    let err = p.roznama.add_entry(case_id, blank, OFFICER).await.unwrap_err();

    assert_eq!(err.kind, AppErrorKind::InvalidState);
}

#[tokio::test]
async fn unknown_case_is_not_found_even_with_blank_entry() {
    let p = test_pipeline();
    let blank = AddEntryRequest {
        entry: test_entry("", ""),
        header: None,
        close: None,
    };

    let err = p
        .roznama
        .add_entry(uuid::Uuid::new_v4(), blank, OFFICER)
        .await
        .unwrap_err();

    assert_eq!(err.kind, AppErrorKind::NotFound);
}

#[tokio::test]
async fn closing_entry_issues_and_closes() {
    let p = test_pipeline();
    let station = create_test_station(&p, "Kotwali");
    let case_id = create_test_case(&p, "BR-12/2024", Some(station));
    let mut request = first_entry();
    request.close = Some(CloseRequest {
        case_file_number: None,
        remark: None,
    });

    let outcome = p.roznama.add_entry(case_id, request, OFFICER).await.unwrap();

    assert!(outcome.created_roznama);
    assert_eq!(outcome.total_entries, 1);
    assert!(outcome.case_closed);
    let case_file = match outcome.closure {
        ClosureOutcome::Closed { case_file } => case_file,
        other => panic!("expected Closed, got {other:?}"),
    };
    assert!(case_file.case_file_number.starts_with("CF-BR-12-2024-SDM-45-"));
    assert_eq!(case_file.pages[0].page_type, FormType::CaseRoznama);

    let case = p.store.case(case_id);
    assert_eq!(case.status, CaseStatus::Closed);
    assert_eq!(case.closing_remark.as_deref(), Some("Closed via final Roznama entry"));
    assert!(case.closed_at.is_some());

    let closed = p.store.events_of(case_id, CaseEventType::CaseClosed);
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].reference_id, Some(case_file.id));
}

#[tokio::test]
async fn closing_entry_uses_supplied_number_and_remark() {
    let p = test_pipeline();
    let station = create_test_station(&p, "Kotwali");
    let case_id = create_test_case(&p, "BR-47/2024", Some(station));
    let mut request = first_entry();
    request.close = Some(CloseRequest {
        case_file_number: Some("CF-47".into()),
        remark: Some("Bond executed, proceedings closed".into()),
    });

    let outcome = p.roznama.add_entry(case_id, request, OFFICER).await.unwrap();

    assert!(outcome.case_closed);
    assert_eq!(p.store.case_files()[0].case_file_number, "CF-47");
    assert_eq!(
        p.store.case(case_id).closing_remark.as_deref(),
        Some("Bond executed, proceedings closed")
    );
}

#[tokio::test]
async fn failed_issuance_keeps_entry_and_case_open() {
    let p = test_pipeline();
    // No police station: the Roznama page cannot be resolved.
    let case_id = create_test_case(&p, "BR-48/2024", None);
    let mut request = first_entry();
    request.close = Some(CloseRequest::default());

    let outcome = p.roznama.add_entry(case_id, request, OFFICER).await.unwrap();

    assert_eq!(outcome.total_entries, 1);
    assert!(!outcome.case_closed);
    match outcome.closure {
        ClosureOutcome::IssuanceFailed { error } => assert_eq!(error.kind, AppErrorKind::NotFound),
        other => panic!("expected IssuanceFailed, got {other:?}"),
    }
    assert_eq!(p.store.case(case_id).status, CaseStatus::Registered);
    assert!(p.store.case_files().is_empty());
}

#[tokio::test]
async fn status_failure_is_partial_success_and_retry_closes() {
    let p = test_pipeline();
    let station = create_test_station(&p, "Kotwali");
    let case_id = create_test_case(&p, "BR-49/2024", Some(station));
    let d1 = create_test_person(&p, case_id, PersonRole::Defendant, "D1", None);
    create_test_form(&p, case_id, FormType::Notice130, FormStatus::Approved, json!({ "personIds": [d1.to_string()] }));
    p.store.fail_case_status_updates.store(true, Ordering::SeqCst);

    let mut request = first_entry();
    request.close = Some(CloseRequest {
        case_file_number: Some("CF-49".into()),
        remark: None,
    });
    let outcome = p.roznama.add_entry(case_id, request, OFFICER).await.unwrap();

    assert!(!outcome.case_closed);
    let (case_file, error) = match outcome.closure {
        ClosureOutcome::PartialSuccess { case_file, error } => (case_file, error),
        other => panic!("expected PartialSuccess, got {other:?}"),
    };
    assert_eq!(error.kind, AppErrorKind::DatabaseError);
    assert_eq!(case_file.case_file_number, "CF-49");
    assert_eq!(p.store.case(case_id).status, CaseStatus::Registered);

    p.store.fail_case_status_updates.store(false, Ordering::SeqCst);
    let retried = p
        .roznama
        .retry_closure(case_id, "CF-49", None, OFFICER)
        .await
        .unwrap();

    assert!(matches!(retried, ClosureOutcome::Closed { .. }));
    assert_eq!(p.store.case(case_id).status, CaseStatus::Closed);
    assert_eq!(p.store.case_files().len(), 1);
    assert_eq!(p.renderer.issued_writes.load(Ordering::SeqCst), 1);

    // Retrying again is harmless.
    let again = p.roznama.retry_closure(case_id, "CF-49", None, OFFICER).await.unwrap();
    assert!(matches!(again, ClosureOutcome::Closed { .. }));
    assert_eq!(p.store.events_of(case_id, CaseEventType::CaseClosed).len(), 1);
}

#[tokio::test]
async fn retry_closure_for_unknown_file_not_found() {
    let p = test_pipeline();
    let case_id = create_test_case(&p, "BR-50/2024", None);

    let err = p
        .roznama
        .retry_closure(case_id, "CF-MISSING", None, OFFICER)
        .await
        .unwrap_err();

    assert_eq!(err.kind, AppErrorKind::NotFound);
}

#[tokio::test]
async fn entry_events_reference_the_log() {
    let p = test_pipeline();
    let case_id = create_test_case(&p, "BR-51/2024", None);
    p.roznama.add_entry(case_id, first_entry(), OFFICER).await.unwrap();

    let log = &p.store.roznama_forms(case_id)[0];
    let added = p.store.events_of(case_id, CaseEventType::RoznamaEntryAdded);
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].reference_id, Some(log.id));
    assert_eq!(p.store.events_of(case_id, CaseEventType::FormCreated).len(), 1);
}
