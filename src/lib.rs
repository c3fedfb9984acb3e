//! DoFn Reflection Sandbox
//!
//! Binding layer between user-supplied processing functions ("DoFns") and a
//! pipeline execution engine:
//!
//! - **Discovery**: select the method implementing each lifecycle stage across
//!   a type's composed ancestry
//! - **Validation**: check visibility, return type, context parameters and
//!   their generics, with diagnostics naming the offending method
//! - **Caching**: one validated reflector per DoFn type, shared process-wide
//! - **Dispatch**: per-instance invokers that wrap user failures uniformly
//!
//! The vocabulary types live in [`dofn_types`], the machinery in
//! [`dofn_core`]; both are re-exported here.

pub use dofn_core::*;
pub use dofn_types::{short_type_name, signature, type_ref};

/// Everything needed to declare and run a DoFn.
pub mod prelude {
    pub use dofn_core::{
        BoundedWindow, Context, DeclaredMethod, DoFn, DoFnInvoker, DoFnReflector, DoFnType,
        ExtraArgs, ExtraContextFactory, InputProvider, MethodBody, MethodSignature,
        OutputReceiver, ParamType, ProcessContext, Stage, TypeLayer, TypeRef, UserResult,
    };
}
