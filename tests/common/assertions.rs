//! Custom assertion utilities for tests.
//!
//! Give better failure messages than bare `unwrap()` for the two failure
//! kinds of the binding layer: analysis failures and user-code failures.

use dofn_sandbox::{DoFn, DoFnReflector, ErrorCode, InvalidDoFn, Stage, UserCodeException};
use std::fmt;

/// Assert that a result is Ok and return the inner value.
///
/// # Panics
///
/// Panics with `context` and the error if the result is `Err`.
pub fn assert_ok<T, E: fmt::Debug>(result: Result<T, E>, context: &str) -> T {
    match result {
        Ok(v) => v,
        Err(e) => panic!("{} failed: {:?}", context, e),
    }
}

/// Assert that an error message contains expected text (case-insensitive).
pub fn assert_error_contains<E: fmt::Display>(error: E, expected_text: &str, context: &str) {
    let error_str = error.to_string().to_lowercase();
    let expected_lower = expected_text.to_lowercase();

    assert!(
        error_str.contains(&expected_lower),
        "{}: error message should contain '{}', got: {}",
        context,
        expected_text,
        error
    );
}

/// Assert that analysis of `F` fails with `code` and a message containing
/// every fragment.
///
/// Goes through the shared reflector cache, like production lookups.
pub fn assert_invalid<F: DoFn>(code: ErrorCode, fragments: &[&str]) -> InvalidDoFn {
    let err = match DoFnReflector::<F>::of() {
        Ok(_) => panic!(
            "{} should have failed analysis with {}",
            std::any::type_name::<F>(),
            code.code_string()
        ),
        Err(err) => err,
    };

    assert_eq!(err.code, code, "unexpected failure: {}", err);
    for fragment in fragments {
        assert!(
            err.message.contains(fragment),
            "message should contain '{}', got: {}",
            fragment,
            err.message
        );
    }
    err
}

/// Assert that a dispatch failed in user code at `stage` with `message`.
pub fn assert_user_failure(
    result: Result<(), UserCodeException>,
    stage: Stage,
    message: &str,
) -> UserCodeException {
    let err = match result {
        Ok(()) => panic!("{} dispatch should have failed", stage),
        Err(err) => err,
    };
    assert_eq!(err.stage(), stage, "failure attributed to wrong stage: {:?}", err);
    assert_eq!(err.message(), message);
    err
}
