//! Shared types for the DoFn binding workspace.
//!
//! This crate holds the vocabulary used to describe a processing unit's
//! lifecycle methods before they are validated:
//!
//! - [`Stage`] - the five lifecycle stages
//! - [`ExtraContextKind`] - extra arguments a ProcessElement method may take
//! - [`TypeRef`] - possibly generic element types (`String`, `OutputT`, `? super String`)
//! - [`ParamType`] / [`MethodSignature`] - declared method shapes

pub mod signature;
pub mod type_ref;

pub use signature::{ContextGenerics, ExtraContextKind, MethodSignature, ParamType, Stage, Visibility};
pub use type_ref::{short_type_name, TypeRef, WildcardBound};
