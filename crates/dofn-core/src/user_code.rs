//! Failures raised by user code during dispatch.
//!
//! Every error returned by a lifecycle body, and every panic when
//! [`DispatchConfig::catch_panics`](crate::DispatchConfig) is set, surfaces
//! from the invoker as a [`UserCodeException`] naming the stage and method.
//! An error that already is a `UserCodeException` passes through unchanged.

use crate::resolver::MethodDescriptor;
use dofn_types::Stage;
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::debug;

/// What user code raised.
#[derive(Debug)]
pub enum Cause {
    Error(anyhow::Error),
    Panic(String),
}

/// A lifecycle method failed.
#[derive(Debug)]
pub struct UserCodeException {
    stage: Stage,
    method: String,
    message: String,
    cause: Cause,
}

impl UserCodeException {
    /// Wrap an error returned by the method `method` of stage `stage`.
    ///
    /// If `err` already wraps a `UserCodeException` it is returned as is.
    pub fn from_error(stage: Stage, method: impl Into<String>, err: anyhow::Error) -> Self {
        match err.downcast::<UserCodeException>() {
            Ok(inner) => inner,
            Err(err) => Self {
                stage,
                method: method.into(),
                message: err.to_string(),
                cause: Cause::Error(err),
            },
        }
    }

    /// Wrap a caught panic payload.
    pub fn from_panic(stage: Stage, method: impl Into<String>, payload: Box<dyn Any + Send>) -> Self {
        let message = panic_message(payload.as_ref());
        Self {
            stage,
            method: method.into(),
            message: message.clone(),
            cause: Cause::Panic(message),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Qualified name of the failing method, `Owner#name(Params)`.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Message of the original failure.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_panic(&self) -> bool {
        matches!(self.cause, Cause::Panic(_))
    }

    pub fn cause(&self) -> &Cause {
        &self.cause
    }

    /// The original error, if user code returned one.
    pub fn error(&self) -> Option<&anyhow::Error> {
        match &self.cause {
            Cause::Error(err) => Some(err),
            Cause::Panic(_) => None,
        }
    }

    pub fn into_cause(self) -> Cause {
        self.cause
    }
}

impl fmt::Display for UserCodeException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for UserCodeException {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.cause {
            Cause::Error(err) => Some(&**err),
            Cause::Panic(_) => None,
        }
    }
}

/// Run one user-code call on behalf of `method`, wrapping whatever it raises.
pub(crate) fn guard<T>(
    method: &MethodDescriptor,
    catch_panics: bool,
    call: impl FnOnce() -> anyhow::Result<T>,
) -> Result<T, UserCodeException> {
    let outcome = if catch_panics {
        match catch_unwind(AssertUnwindSafe(call)) {
            Ok(result) => result,
            Err(payload) => {
                let err = UserCodeException::from_panic(
                    method.stage,
                    method.qualified_name(),
                    payload,
                );
                debug!(method = %err.method, message = %err.message, "user code panicked");
                return Err(err);
            }
        }
    } else {
        call()
    };

    outcome.map_err(|err| {
        let err = UserCodeException::from_error(method.stage, method.qualified_name(), err);
        debug!(method = %err.method, message = %err.message, "user code failed");
        err
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
