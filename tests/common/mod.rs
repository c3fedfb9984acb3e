#![allow(unused_imports)]
#![allow(dead_code)]
//! Shared test utilities for integration tests.
//!
//! # Modules
//!
//! - `mocks`: engine-side doubles (contexts, window, extra-context factory)
//! - `fixtures`: ready-made DoFn types used by several test files
//! - `assertions`: assertion helpers for analysis and dispatch failures

pub mod assertions;
pub mod fixtures;
pub mod mocks;

pub use assertions::{assert_error_contains, assert_invalid, assert_ok, assert_user_failure};
pub use fixtures::{other_module, FailingFn, IdentityFn, Invocations, LifecycleFn};
pub use mocks::{FixedWindow, MockExtraFactory, RecordingContext};
