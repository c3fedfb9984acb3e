//! DoFn binding layer.
//!
//! Given a user-supplied DoFn type, this crate discovers its lifecycle
//! methods, validates their signatures, caches the result per type, and binds
//! instances to invokers that dispatch lifecycle calls.
//!
//! ## Analysis
//!
//! - [`DoFn`] / [`DoFnType`] - how a type describes its methods and ancestry
//! - [`MethodResolver`] - override-aware selection of one method per stage
//! - [`SignatureValidator`] - return type, context and generics checks
//! - [`InvalidDoFn`] - first violation found, with [`ErrorCode`] and phase
//!
//! ## Dispatch
//!
//! - [`DoFnReflector`] - validated per-type result, obtained via [`DoFnReflector::of`]
//! - [`ReflectorCache`] - process-wide, build-once cache behind `of`
//! - [`DoFnInvoker`] - one bound instance; wraps user failures in [`UserCodeException`]

pub mod cache;
pub mod config;
pub mod context;
pub mod dofn;
pub mod errors;
pub mod invoker;
pub mod reflector;
pub mod resolver;
pub mod user_code;
pub mod validator;

pub use cache::{CacheMetrics, CacheStats, ReflectorCache};
pub use config::DispatchConfig;
pub use context::{
    BoundedWindow, Context, ExtraArg, ExtraArgs, ExtraContextFactory, InputProvider,
    OutputReceiver, ProcessContext,
};
pub use dofn::{
    BodyShape, DeclaredMethod, DoFn, DoFnType, DoFnTypeBuilder, MethodBody, TypeLayer, UserResult,
};
pub use errors::{ErrorCode, FailureContext, InvalidDoFn, Phase};
pub use invoker::DoFnInvoker;
pub use reflector::{DoFnReflector, ReflectorSummary};
pub use resolver::{MethodDescriptor, MethodResolver};
pub use user_code::{Cause, UserCodeException};
pub use validator::SignatureValidator;

pub use dofn_types::{
    ContextGenerics, ExtraContextKind, MethodSignature, ParamType, Stage, TypeRef, Visibility,
    WildcardBound,
};
