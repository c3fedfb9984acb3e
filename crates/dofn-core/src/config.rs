//! Dispatch configuration for bound invokers.

use serde::{Deserialize, Serialize};

/// Configuration for how an invoker calls user code.
///
/// # Example
///
/// ```
/// use dofn_core::DispatchConfig;
///
/// let config = DispatchConfig::new().with_trace_dispatch(true);
/// assert!(config.catch_panics);
///
/// let strict = DispatchConfig::strict();
/// assert!(!strict.catch_panics);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Convert panics raised by user code into `UserCodeException`s
    /// (default: true). When false, panics unwind through the invoker.
    pub catch_panics: bool,

    /// Emit a trace event for every dispatched call (default: false).
    pub trace_dispatch: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            catch_panics: true,
            trace_dispatch: false,
        }
    }
}

impl DispatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let panics propagate; only returned errors are wrapped.
    pub fn strict() -> Self {
        Self {
            catch_panics: false,
            ..Self::default()
        }
    }

    pub fn with_catch_panics(mut self, catch_panics: bool) -> Self {
        self.catch_panics = catch_panics;
        self
    }

    pub fn with_trace_dispatch(mut self, trace_dispatch: bool) -> Self {
        self.trace_dispatch = trace_dispatch;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: DispatchConfig = serde_json::from_str(r#"{"trace_dispatch": true}"#).unwrap();
        assert!(config.catch_panics);
        assert!(config.trace_dispatch);
    }
}
