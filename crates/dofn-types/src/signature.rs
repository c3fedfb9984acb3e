//! Lifecycle stages, context parameters and method signatures.
//!
//! These types describe a lifecycle method the way it was declared, before any
//! validation. The binding layer in `dofn-core` checks them against the
//! protocol rules.

use crate::type_ref::TypeRef;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Stage
// =============================================================================

/// Lifecycle stage a method can be marked with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Called once per instance before any bundle.
    Setup,
    /// Called at the start of every bundle.
    StartBundle,
    /// Called once per element. Mandatory.
    ProcessElement,
    /// Called at the end of every bundle.
    FinishBundle,
    /// Called once per instance when it is discarded.
    Teardown,
}

impl Stage {
    /// All stages, in lifecycle order.
    pub const ALL: [Stage; 5] = [
        Stage::Setup,
        Stage::StartBundle,
        Stage::ProcessElement,
        Stage::FinishBundle,
        Stage::Teardown,
    ];

    /// Order in which stages are resolved and validated.
    pub const RESOLUTION_ORDER: [Stage; 5] = [
        Stage::StartBundle,
        Stage::ProcessElement,
        Stage::FinishBundle,
        Stage::Setup,
        Stage::Teardown,
    ];

    /// Marker name used in diagnostics, e.g. `@ProcessElement`.
    pub fn marker(&self) -> &'static str {
        match self {
            Stage::Setup => "@Setup",
            Stage::StartBundle => "@StartBundle",
            Stage::ProcessElement => "@ProcessElement",
            Stage::FinishBundle => "@FinishBundle",
            Stage::Teardown => "@Teardown",
        }
    }

    pub fn short_name(&self) -> &'static str {
        match self {
            Stage::Setup => "setup",
            Stage::StartBundle => "start_bundle",
            Stage::ProcessElement => "process_element",
            Stage::FinishBundle => "finish_bundle",
            Stage::Teardown => "teardown",
        }
    }

    /// Stages whose methods receive a context as first argument.
    pub fn takes_context(&self) -> bool {
        matches!(
            self,
            Stage::StartBundle | Stage::ProcessElement | Stage::FinishBundle
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.marker()[1..])
    }
}

// =============================================================================
// Extra context kinds
// =============================================================================

/// Additional argument kinds a ProcessElement method may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtraContextKind {
    Window,
    InputProvider,
    OutputReceiver,
}

impl ExtraContextKind {
    pub const ALL: [ExtraContextKind; 3] = [
        ExtraContextKind::Window,
        ExtraContextKind::InputProvider,
        ExtraContextKind::OutputReceiver,
    ];

    /// Name of the parameter type that carries this kind.
    pub fn carrier_name(&self) -> &'static str {
        match self {
            ExtraContextKind::Window => "BoundedWindow",
            ExtraContextKind::InputProvider => "InputProvider",
            ExtraContextKind::OutputReceiver => "OutputReceiver",
        }
    }
}

impl fmt::Display for ExtraContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.carrier_name())
    }
}

// =============================================================================
// Parameters
// =============================================================================

/// Input/output parameterization of a context parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextGenerics {
    /// Bound to the declaring DoFn's own input and output types.
    Inherited,
    /// Spelled out in the declaration.
    Explicit { input: TypeRef, output: TypeRef },
}

/// Declared type of one method parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    ProcessContext(ContextGenerics),
    Context(ContextGenerics),
    Window,
    InputProvider(TypeRef),
    OutputReceiver(TypeRef),
    /// Anything else; never valid in a lifecycle method.
    Other(TypeRef),
}

impl ParamType {
    /// `ProcessContext` bound to the DoFn's own types.
    pub fn process_context() -> Self {
        ParamType::ProcessContext(ContextGenerics::Inherited)
    }

    pub fn process_context_of(input: TypeRef, output: TypeRef) -> Self {
        ParamType::ProcessContext(ContextGenerics::Explicit { input, output })
    }

    /// `Context` bound to the DoFn's own types.
    pub fn context() -> Self {
        ParamType::Context(ContextGenerics::Inherited)
    }

    pub fn context_of(input: TypeRef, output: TypeRef) -> Self {
        ParamType::Context(ContextGenerics::Explicit { input, output })
    }

    pub fn input_provider(element: TypeRef) -> Self {
        ParamType::InputProvider(element)
    }

    pub fn output_receiver(element: TypeRef) -> Self {
        ParamType::OutputReceiver(element)
    }

    pub fn other(ty: TypeRef) -> Self {
        ParamType::Other(ty)
    }

    /// Parameter of the plain Rust type `T`.
    pub fn other_of<T: ?Sized + 'static>() -> Self {
        ParamType::Other(TypeRef::of::<T>())
    }

    /// Type name without generic arguments, as used in method renderings.
    pub fn raw_name(&self) -> String {
        match self {
            ParamType::ProcessContext(_) => "ProcessContext".to_string(),
            ParamType::Context(_) => "Context".to_string(),
            ParamType::Window => ExtraContextKind::Window.carrier_name().to_string(),
            ParamType::InputProvider(_) => ExtraContextKind::InputProvider.carrier_name().to_string(),
            ParamType::OutputReceiver(_) => {
                ExtraContextKind::OutputReceiver.carrier_name().to_string()
            }
            ParamType::Other(ty) => ty.to_string(),
        }
    }

    /// Identity used to decide whether two declarations override each other.
    pub fn erased_name(&self) -> String {
        match self {
            ParamType::Other(TypeRef::Named(path)) => path.clone(),
            other => other.raw_name(),
        }
    }

    /// Extra-context kind carried by this parameter, if any.
    pub fn extra_kind(&self) -> Option<ExtraContextKind> {
        match self {
            ParamType::Window => Some(ExtraContextKind::Window),
            ParamType::InputProvider(_) => Some(ExtraContextKind::InputProvider),
            ParamType::OutputReceiver(_) => Some(ExtraContextKind::OutputReceiver),
            _ => None,
        }
    }

    /// Element type argument of `InputProvider`/`OutputReceiver`.
    pub fn element_type(&self) -> Option<&TypeRef> {
        match self {
            ParamType::InputProvider(ty) | ParamType::OutputReceiver(ty) => Some(ty),
            _ => None,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::ProcessContext(ContextGenerics::Explicit { input, output })
            | ParamType::Context(ContextGenerics::Explicit { input, output }) => {
                write!(f, "{}<{}, {}>", self.raw_name(), input, output)
            }
            ParamType::InputProvider(ty) | ParamType::OutputReceiver(ty) => {
                write!(f, "{}<{}>", self.raw_name(), ty)
            }
            _ => write!(f, "{}", self.raw_name()),
        }
    }
}

// =============================================================================
// Method signature
// =============================================================================

/// Declared visibility of a lifecycle method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Crate,
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Public => write!(f, "pub"),
            Visibility::Crate => write!(f, "pub(crate)"),
            Visibility::Private => write!(f, "private"),
        }
    }
}

/// A lifecycle method as declared: name, visibility, return type, parameters.
///
/// Built with a small builder:
///
/// ```
/// use dofn_types::{MethodSignature, ParamType, TypeRef};
///
/// let sig = MethodSignature::new("process")
///     .param(ParamType::process_context())
///     .param(ParamType::output_receiver(TypeRef::of::<String>()));
/// assert_eq!(sig.display_name(), "process(ProcessContext, OutputReceiver)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodSignature {
    pub name: String,
    pub visibility: Visibility,
    /// `None` for the unit return type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returns: Option<TypeRef>,
    pub params: Vec<ParamType>,
}

impl MethodSignature {
    /// A public method returning unit with no parameters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visibility: Visibility::Public,
            returns: None,
            params: Vec::new(),
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn private(self) -> Self {
        self.with_visibility(Visibility::Private)
    }

    pub fn crate_visible(self) -> Self {
        self.with_visibility(Visibility::Crate)
    }

    pub fn returning(mut self, ty: TypeRef) -> Self {
        self.returns = Some(ty);
        self
    }

    pub fn param(mut self, param: ParamType) -> Self {
        self.params.push(param);
        self
    }

    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }

    /// Comma separated raw parameter type names.
    pub fn parameter_list(&self) -> String {
        self.params
            .iter()
            .map(ParamType::raw_name)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `name(P1, P2)`
    pub fn display_name(&self) -> String {
        format!("{}({})", self.name, self.parameter_list())
    }

    /// `owner#name(P1, P2)`, with `owner` kept fully qualified.
    pub fn qualified(&self, owner: &str) -> String {
        format!("{}#{}", owner, self.display_name())
    }

    /// Name plus erased parameter types; equal keys override each other.
    pub fn override_key(&self) -> (String, Vec<String>) {
        (
            self.name.clone(),
            self.params.iter().map(ParamType::erased_name).collect(),
        )
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
