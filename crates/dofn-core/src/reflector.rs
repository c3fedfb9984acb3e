//! Per-type analysis results.
//!
//! A [`DoFnReflector`] is built once per DoFn type (see
//! [`ReflectorCache`](crate::cache::ReflectorCache)) and shared by every
//! invoker bound for that type.

use crate::cache::ReflectorCache;
use crate::config::DispatchConfig;
use crate::dofn::{DoFn, DoFnType};
use crate::errors::InvalidDoFn;
use crate::invoker::DoFnInvoker;
use crate::resolver::{MethodDescriptor, MethodResolver, ResolvedMethods};
use dofn_types::{ExtraContextKind, Stage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Validated lifecycle methods of one DoFn type.
pub struct DoFnReflector<F: DoFn> {
    type_name: String,
    methods: ResolvedMethods<F>,
    uses_single_window: bool,
}

/// Serializable view of a reflector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReflectorSummary {
    pub type_name: String,
    pub uses_single_window: bool,
    pub methods: Vec<MethodDescriptor>,
}

impl<F: DoFn> DoFnReflector<F> {
    /// Shared reflector for `F`, built on first use and cached process-wide.
    ///
    /// A type that fails analysis fails the same way on every call.
    pub fn of() -> Result<Arc<Self>, InvalidDoFn> {
        ReflectorCache::global().get_or_build::<F>()
    }

    /// Analyze `F` without consulting any cache.
    pub fn analyze() -> Result<Self, InvalidDoFn> {
        Self::from_type(F::describe())
    }

    /// Analyze an explicit description of `F`.
    pub fn from_type(ty: DoFnType<F>) -> Result<Self, InvalidDoFn> {
        let methods = match MethodResolver::new(&ty).resolve() {
            Ok(methods) => methods,
            Err(err) => {
                debug!(dofn = %ty.name, code = %err.code.code_string(), "DoFn analysis failed");
                return Err(err);
            }
        };

        let uses_single_window = methods
            .process_element
            .descriptor
            .declares(ExtraContextKind::Window);

        debug!(
            dofn = %ty.name,
            stages = Stage::ALL.iter().filter(|s| methods.descriptor(**s).is_some()).count(),
            uses_single_window,
            "built DoFn reflector"
        );

        Ok(Self {
            type_name: ty.name,
            methods,
            uses_single_window,
        })
    }

    /// Fully qualified name of the analyzed type.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Whether ProcessElement declares a window parameter, i.e. the runner
    /// must invoke it once per window.
    pub fn uses_single_window(&self) -> bool {
        self.uses_single_window
    }

    pub fn descriptor(&self, stage: Stage) -> Option<&MethodDescriptor> {
        self.methods.descriptor(stage)
    }

    pub fn has_stage(&self, stage: Stage) -> bool {
        self.descriptor(stage).is_some()
    }

    /// Extra-context kinds of ProcessElement, in parameter order.
    pub fn process_element_args(&self) -> &[ExtraContextKind] {
        &self.methods.process_element.descriptor.extra_kinds
    }

    pub fn summary(&self) -> ReflectorSummary {
        ReflectorSummary {
            type_name: self.type_name.clone(),
            uses_single_window: self.uses_single_window,
            methods: Stage::ALL
                .iter()
                .filter_map(|stage| self.descriptor(*stage).cloned())
                .collect(),
        }
    }

    /// Bind an instance with the default dispatch configuration.
    pub fn bind(self: &Arc<Self>, instance: F) -> DoFnInvoker<F> {
        self.bind_with_config(instance, DispatchConfig::default())
    }

    pub fn bind_with_config(self: &Arc<Self>, instance: F, config: DispatchConfig) -> DoFnInvoker<F> {
        DoFnInvoker::new(Arc::clone(self), instance, config)
    }

    pub(crate) fn methods(&self) -> &ResolvedMethods<F> {
        &self.methods
    }
}

impl<F: DoFn> fmt::Debug for DoFnReflector<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DoFnReflector")
            .field("type_name", &self.type_name)
            .field("uses_single_window", &self.uses_single_window)
            .field("process_element_args", &self.process_element_args())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dofn_types::{MethodSignature, ParamType, TypeRef};

    struct Windowed;

    impl DoFn for Windowed {
        type Input = String;
        type Output = String;

        fn describe() -> DoFnType<Self> {
            Self::builder()
                .named("tests::Windowed")
                .process_element(
                    MethodSignature::new("process")
                        .param(ParamType::process_context())
                        .param(ParamType::output_receiver(TypeRef::of::<String>()))
                        .param(ParamType::Window),
                    |_, _, _| Ok(()),
                )
                .teardown(MethodSignature::new("close"), |_| Ok(()))
                .build()
        }
    }

    #[test]
    fn test_analyze_records_window_usage() {
        let reflector = DoFnReflector::<Windowed>::analyze().unwrap();
        assert!(reflector.uses_single_window());
        assert_eq!(
            reflector.process_element_args(),
            &[ExtraContextKind::OutputReceiver, ExtraContextKind::Window]
        );
        assert!(reflector.has_stage(Stage::Teardown));
        assert!(!reflector.has_stage(Stage::Setup));
    }

    #[test]
    fn test_summary_lists_stages_in_lifecycle_order() {
        let summary = DoFnReflector::<Windowed>::analyze().unwrap().summary();
        let stages: Vec<_> = summary.methods.iter().map(|m| m.stage).collect();
        assert_eq!(stages, vec![Stage::ProcessElement, Stage::Teardown]);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["type_name"], "tests::Windowed");
        assert_eq!(json["methods"][0]["extra_kinds"][1], "window");
    }
}
