#![allow(clippy::unwrap_used, clippy::expect_used)]

use strata_core::errors::StrataError;
use strata_core::logging_facility::test_capture::init_test_capture;
use strata_core::{log_op_end, log_op_error, log_op_start};
use strata_core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};

#[test]
fn test_log_op_start_macro() {
    let capture = init_test_capture();
    let op_name = "test_log_op_start_unique_1";

    log_op_start!(op_name, table = "students");

    let start_events = capture.events_for(op_name, EVENT_START);
    assert_eq!(start_events.len(), 1, "Should have exactly one start event");
    assert_eq!(start_events[0].field("table"), Some("students"));
}

#[test]
fn test_log_op_end_macro() {
    let capture = init_test_capture();
    let op_name = "test_log_op_end_unique_2";

    log_op_end!(op_name, duration_ms = 42, applied_len = 3);

    let end_events = capture.events_for(op_name, EVENT_END);
    assert_eq!(end_events.len(), 1, "Should have exactly one end event");
    assert_eq!(end_events[0].field("duration_ms"), Some("42"));
    assert_eq!(end_events[0].field("applied_len"), Some("3"));
}

#[test]
fn test_log_op_error_includes_code() {
    let capture = init_test_capture();
    let op_name = "test_log_op_error_unique_3";

    log_op_error!(op_name, StrataError::NothingToRollBack, duration_ms = 10);

    let error_events = capture.events_for(op_name, EVENT_END_ERROR);
    assert_eq!(error_events.len(), 1, "Should have exactly one error event");
    assert_eq!(
        error_events[0].field("err.code"),
        Some("ERR_NOTHING_TO_ROLL_BACK")
    );
    assert_eq!(error_events[0].level, tracing::Level::ERROR);
}

#[test]
fn test_boundary_single_start_end() {
    let capture = init_test_capture();
    let op_name = "test_boundary_unique_4";

    log_op_start!(op_name);
    log_op_end!(op_name, duration_ms = 1);

    let count = capture.count_events(|e| e.op.as_deref() == Some(op_name));
    assert_eq!(count, 2, "Exactly one start and one end");
}
