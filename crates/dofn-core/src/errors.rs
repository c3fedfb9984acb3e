//! Error codes and diagnostics for DoFn analysis.
//!
//! # Error Taxonomy
//!
//! Analysis of a DoFn type runs in two phases and fails with the first
//! violation found:
//!
//! | Phase | Purpose | Error Codes |
//! |-------|---------|-------------|
//! | Resolution | Find and select lifecycle methods | E101-E105 |
//! | TypeCheck | Validate selected signatures | E201-E204 |
//!
//! Every failure carries a human-readable message naming the offending type
//! and, where there is one, the offending method. Failures of user code at
//! dispatch time are a separate type, see [`crate::user_code`].

use dofn_types::Stage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of DoFn analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Phase 1: marker discovery, override selection, visibility
    Resolution,
    /// Phase 2: argument and return type validation
    TypeCheck,
}

impl Phase {
    /// Get the numeric prefix for this phase (1xx, 2xx)
    pub fn code_prefix(&self) -> u16 {
        match self {
            Phase::Resolution => 100,
            Phase::TypeCheck => 200,
        }
    }

    pub fn short_name(&self) -> &'static str {
        match self {
            Phase::Resolution => "resolution",
            Phase::TypeCheck => "typecheck",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

/// Specific error codes within each phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    // =========================================================================
    // Resolution Errors (1xx)
    // =========================================================================
    /// E101: No method marked ProcessElement anywhere in the type chain
    #[serde(rename = "E101")]
    MissingProcessElement,

    /// E102: More than one distinct method carries the same marker
    #[serde(rename = "E102")]
    DuplicateMethod,

    /// E103: Selected method is not public
    #[serde(rename = "E103")]
    NotPublic,

    /// E104: Selected method has no body anywhere in the chain
    #[serde(rename = "E104")]
    MissingImplementation,

    /// E105: Method body cannot be called for the stage it is marked with
    #[serde(rename = "E105")]
    BodyMismatch,

    // =========================================================================
    // Type Check Errors (2xx)
    // =========================================================================
    /// E201: Lifecycle method returns a value
    #[serde(rename = "E201")]
    BadReturnType,

    /// E202: First parameter is not the required context
    #[serde(rename = "E202")]
    BadFirstParameter,

    /// E203: Parameter is not an allowed extra context
    #[serde(rename = "E203")]
    BadContextParameter,

    /// E204: Extra context element type does not fit the DoFn's types
    #[serde(rename = "E204")]
    IncompatibleGenerics,
}

impl ErrorCode {
    pub fn numeric_code(&self) -> u16 {
        match self {
            // Resolution (1xx)
            ErrorCode::MissingProcessElement => 101,
            ErrorCode::DuplicateMethod => 102,
            ErrorCode::NotPublic => 103,
            ErrorCode::MissingImplementation => 104,
            ErrorCode::BodyMismatch => 105,
            // TypeCheck (2xx)
            ErrorCode::BadReturnType => 201,
            ErrorCode::BadFirstParameter => 202,
            ErrorCode::BadContextParameter => 203,
            ErrorCode::IncompatibleGenerics => 204,
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            ErrorCode::MissingProcessElement
            | ErrorCode::DuplicateMethod
            | ErrorCode::NotPublic
            | ErrorCode::MissingImplementation
            | ErrorCode::BodyMismatch => Phase::Resolution,
            ErrorCode::BadReturnType
            | ErrorCode::BadFirstParameter
            | ErrorCode::BadContextParameter
            | ErrorCode::IncompatibleGenerics => Phase::TypeCheck,
        }
    }

    /// Get a short description of this error
    pub fn description(&self) -> &'static str {
        match self {
            // Resolution
            ErrorCode::MissingProcessElement => "no ProcessElement method",
            ErrorCode::DuplicateMethod => "stage marker used more than once",
            ErrorCode::NotPublic => "lifecycle method is not public",
            ErrorCode::MissingImplementation => "lifecycle method has no implementation",
            ErrorCode::BodyMismatch => "method body does not fit its stage",
            // TypeCheck
            ErrorCode::BadReturnType => "lifecycle method must return unit",
            ErrorCode::BadFirstParameter => "first parameter is not the stage context",
            ErrorCode::BadContextParameter => "parameter is not an allowed extra context",
            ErrorCode::IncompatibleGenerics => "incompatible context generics",
        }
    }

    /// Get the string code (e.g., "E101", "E201")
    pub fn code_string(&self) -> String {
        format!("E{}", self.numeric_code())
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code_string(), self.description())
    }
}

/// A DoFn type failed analysis.
///
/// Raised by reflector construction and cached alongside successful results,
/// so every later lookup of the same type reports the same failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidDoFn {
    /// Which phase the failure occurred in
    pub phase: Phase,
    /// Specific error code
    pub code: ErrorCode,
    /// Human-readable message naming the type and method
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<FailureContext>,
}

/// Where in a DoFn type a failure was found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureContext {
    /// Fully qualified type that declares the offending method
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// `name(Params)` of the offending method
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    /// Parameter index (0-based)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param_index: Option<usize>,
}

impl FailureContext {
    pub fn for_type(type_name: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
            ..Default::default()
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn with_param(mut self, index: usize) -> Self {
        self.param_index = Some(index);
        self
    }
}

impl InvalidDoFn {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            phase: code.phase(),
            code,
            message: message.into(),
            context: None,
        }
    }

    pub fn with_context(code: ErrorCode, message: impl Into<String>, context: FailureContext) -> Self {
        Self {
            phase: code.phase(),
            code,
            message: message.into(),
            context: Some(context),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for InvalidDoFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.phase, self.code.code_string(), self.message)
    }
}

impl std::error::Error for InvalidDoFn {}
