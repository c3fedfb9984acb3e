//! The DoFn introspection surface.
//!
//! A DoFn type describes its lifecycle methods through [`DoFn::describe`]:
//! one [`TypeLayer`] per type in its ancestry (most derived first), each
//! listing the methods that layer declares. A declaration carries the
//! method's signature, an optional stage marker, and a body when the layer
//! implements it.
//!
//! ```
//! use dofn_core::{DoFn, DoFnType, MethodSignature, ParamType};
//!
//! struct Upper;
//!
//! impl DoFn for Upper {
//!     type Input = String;
//!     type Output = String;
//!
//!     fn describe() -> DoFnType<Self> {
//!         Self::builder()
//!             .process_element(
//!                 MethodSignature::new("process").param(ParamType::process_context()),
//!                 |_, ctx, _| {
//!                     let upper = ctx.element().to_uppercase();
//!                     ctx.output(upper);
//!                     Ok(())
//!                 },
//!             )
//!             .build()
//!     }
//! }
//! ```

use crate::context::{Context, ExtraArgs, ProcessContext};
use dofn_types::{MethodSignature, Stage, TypeRef};
use std::fmt;
use std::sync::Arc;

/// Result type of every lifecycle body.
pub type UserResult = anyhow::Result<()>;

/// A user-supplied element-processing function.
pub trait DoFn: Sized + Send + 'static {
    type Input: 'static;
    type Output: 'static;

    /// Declare the lifecycle methods of this type and its ancestors.
    fn describe() -> DoFnType<Self>;

    /// Builder for this type's description, with `Self` already fixed so
    /// body closures get their parameter types from it.
    fn builder() -> DoFnTypeBuilder<Self> {
        DoFnType::builder()
    }
}

pub type LifecycleFn<F> = Arc<dyn Fn(&mut F) -> UserResult + Send + Sync>;

pub type BundleFn<F> = Arc<
    dyn Fn(&mut F, &mut dyn Context<<F as DoFn>::Input, <F as DoFn>::Output>) -> UserResult
        + Send
        + Sync,
>;

pub type ProcessFn<F> = Arc<
    dyn for<'x> Fn(
            &mut F,
            &mut dyn ProcessContext<<F as DoFn>::Input, <F as DoFn>::Output>,
            &mut ExtraArgs<'x, <F as DoFn>::Input, <F as DoFn>::Output>,
        ) -> UserResult
        + Send
        + Sync,
>;

/// Callable shape of a method body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyShape {
    /// `fn(&mut self)`
    Lifecycle,
    /// `fn(&mut self, &mut dyn Context)`
    Bundle,
    /// `fn(&mut self, &mut dyn ProcessContext, &mut ExtraArgs)`
    Process,
}

impl BodyShape {
    pub fn for_stage(stage: Stage) -> Self {
        match stage {
            Stage::Setup | Stage::Teardown => BodyShape::Lifecycle,
            Stage::StartBundle | Stage::FinishBundle => BodyShape::Bundle,
            Stage::ProcessElement => BodyShape::Process,
        }
    }
}

impl fmt::Display for BodyShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyShape::Lifecycle => write!(f, "lifecycle"),
            BodyShape::Bundle => write!(f, "bundle"),
            BodyShape::Process => write!(f, "process"),
        }
    }
}

/// Implementation of a declared method.
pub enum MethodBody<F: DoFn> {
    Lifecycle(LifecycleFn<F>),
    Bundle(BundleFn<F>),
    Process(ProcessFn<F>),
}

impl<F: DoFn> Clone for MethodBody<F> {
    fn clone(&self) -> Self {
        match self {
            MethodBody::Lifecycle(body) => MethodBody::Lifecycle(Arc::clone(body)),
            MethodBody::Bundle(body) => MethodBody::Bundle(Arc::clone(body)),
            MethodBody::Process(body) => MethodBody::Process(Arc::clone(body)),
        }
    }
}

impl<F: DoFn> fmt::Debug for MethodBody<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodBody::{}", self.shape())
    }
}

impl<F: DoFn> MethodBody<F> {
    pub fn lifecycle(body: impl Fn(&mut F) -> UserResult + Send + Sync + 'static) -> Self {
        MethodBody::Lifecycle(Arc::new(body))
    }

    pub fn bundle(
        body: impl Fn(&mut F, &mut dyn Context<F::Input, F::Output>) -> UserResult
            + Send
            + Sync
            + 'static,
    ) -> Self {
        MethodBody::Bundle(Arc::new(body))
    }

    pub fn process(
        body: impl for<'x> Fn(
                &mut F,
                &mut dyn ProcessContext<F::Input, F::Output>,
                &mut ExtraArgs<'x, F::Input, F::Output>,
            ) -> UserResult
            + Send
            + Sync
            + 'static,
    ) -> Self {
        MethodBody::Process(Arc::new(body))
    }

    pub fn shape(&self) -> BodyShape {
        match self {
            MethodBody::Lifecycle(_) => BodyShape::Lifecycle,
            MethodBody::Bundle(_) => BodyShape::Bundle,
            MethodBody::Process(_) => BodyShape::Process,
        }
    }

    pub fn as_lifecycle(&self) -> Option<LifecycleFn<F>> {
        match self {
            MethodBody::Lifecycle(body) => Some(Arc::clone(body)),
            _ => None,
        }
    }

    pub fn as_bundle(&self) -> Option<BundleFn<F>> {
        match self {
            MethodBody::Bundle(body) => Some(Arc::clone(body)),
            _ => None,
        }
    }

    pub fn as_process(&self) -> Option<ProcessFn<F>> {
        match self {
            MethodBody::Process(body) => Some(Arc::clone(body)),
            _ => None,
        }
    }

    /// Re-target this body at a type `C` that embeds `F`.
    fn project<C>(self, lens: Lens<C, F>) -> MethodBody<C>
    where
        C: DoFn<Input = F::Input, Output = F::Output>,
    {
        match self {
            MethodBody::Lifecycle(body) => MethodBody::lifecycle(move |c| body(lens(c))),
            MethodBody::Bundle(body) => MethodBody::bundle(move |c, ctx| body(lens(c), ctx)),
            MethodBody::Process(body) => {
                MethodBody::process(move |c, ctx, extras| body(lens(c), ctx, extras))
            }
        }
    }
}

type Lens<C, P> = Arc<dyn Fn(&mut C) -> &mut P + Send + Sync>;

/// One method as a layer declares it.
pub struct DeclaredMethod<F: DoFn> {
    pub signature: MethodSignature,
    /// Stage marker placed on this declaration, if any.
    pub marker: Option<Stage>,
    /// `None` for an abstract declaration.
    pub body: Option<MethodBody<F>>,
}

impl<F: DoFn> Clone for DeclaredMethod<F> {
    fn clone(&self) -> Self {
        Self {
            signature: self.signature.clone(),
            marker: self.marker,
            body: self.body.clone(),
        }
    }
}

impl<F: DoFn> fmt::Debug for DeclaredMethod<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeclaredMethod")
            .field("signature", &self.signature.display_name())
            .field("marker", &self.marker)
            .field("body", &self.body)
            .finish()
    }
}

impl<F: DoFn> DeclaredMethod<F> {
    /// A method marked with `stage`.
    pub fn marked(stage: Stage, signature: MethodSignature, body: MethodBody<F>) -> Self {
        Self {
            signature,
            marker: Some(stage),
            body: Some(body),
        }
    }

    /// An unmarked method; overrides an ancestor declaration with the same
    /// name and parameter types and inherits its marker.
    pub fn unmarked(signature: MethodSignature, body: MethodBody<F>) -> Self {
        Self {
            signature,
            marker: None,
            body: Some(body),
        }
    }

    /// A declaration without a body.
    pub fn abstract_method(marker: Option<Stage>, signature: MethodSignature) -> Self {
        Self {
            signature,
            marker,
            body: None,
        }
    }

    pub fn setup(
        signature: MethodSignature,
        body: impl Fn(&mut F) -> UserResult + Send + Sync + 'static,
    ) -> Self {
        Self::marked(Stage::Setup, signature, MethodBody::lifecycle(body))
    }

    pub fn teardown(
        signature: MethodSignature,
        body: impl Fn(&mut F) -> UserResult + Send + Sync + 'static,
    ) -> Self {
        Self::marked(Stage::Teardown, signature, MethodBody::lifecycle(body))
    }

    pub fn start_bundle(
        signature: MethodSignature,
        body: impl Fn(&mut F, &mut dyn Context<F::Input, F::Output>) -> UserResult
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self::marked(Stage::StartBundle, signature, MethodBody::bundle(body))
    }

    pub fn finish_bundle(
        signature: MethodSignature,
        body: impl Fn(&mut F, &mut dyn Context<F::Input, F::Output>) -> UserResult
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self::marked(Stage::FinishBundle, signature, MethodBody::bundle(body))
    }

    pub fn process_element(
        signature: MethodSignature,
        body: impl for<'x> Fn(
                &mut F,
                &mut dyn ProcessContext<F::Input, F::Output>,
                &mut ExtraArgs<'x, F::Input, F::Output>,
            ) -> UserResult
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self::marked(Stage::ProcessElement, signature, MethodBody::process(body))
    }

    fn project<C>(self, lens: &Lens<C, F>) -> DeclaredMethod<C>
    where
        C: DoFn<Input = F::Input, Output = F::Output>,
    {
        DeclaredMethod {
            signature: self.signature,
            marker: self.marker,
            body: self.body.map(|body| body.project(Arc::clone(lens))),
        }
    }
}

/// Methods declared by one type in a DoFn's ancestry.
pub struct TypeLayer<F: DoFn> {
    /// Fully qualified name of the declaring type.
    pub name: String,
    pub methods: Vec<DeclaredMethod<F>>,
}

impl<F: DoFn> Clone for TypeLayer<F> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            methods: self.methods.clone(),
        }
    }
}

impl<F: DoFn> fmt::Debug for TypeLayer<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeLayer")
            .field("name", &self.name)
            .field("methods", &self.methods)
            .finish()
    }
}

impl<F: DoFn> TypeLayer<F> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
        }
    }

    /// An interface-like layer: typically marked declarations without bodies.
    pub fn interface(name: impl Into<String>, methods: Vec<DeclaredMethod<F>>) -> Self {
        Self {
            name: name.into(),
            methods,
        }
    }

    pub fn method(mut self, method: DeclaredMethod<F>) -> Self {
        self.methods.push(method);
        self
    }
}

/// Full description of a DoFn type.
pub struct DoFnType<F: DoFn> {
    /// Fully qualified name of the DoFn type.
    pub name: String,
    pub input: TypeRef,
    pub output: TypeRef,
    /// Most derived first; `layers[0]` is the DoFn type itself.
    pub layers: Vec<TypeLayer<F>>,
}

impl<F: DoFn> fmt::Debug for DoFnType<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DoFnType")
            .field("name", &self.name)
            .field("input", &self.input)
            .field("output", &self.output)
            .field("layers", &self.layers)
            .finish()
    }
}

impl<F: DoFn> DoFnType<F> {
    /// Start describing `F`. Name and element types default to those of the
    /// Rust type.
    pub fn builder() -> DoFnTypeBuilder<F> {
        DoFnTypeBuilder {
            name: std::any::type_name::<F>().to_string(),
            input: TypeRef::of::<F::Input>(),
            output: TypeRef::of::<F::Output>(),
            methods: Vec::new(),
            ancestors: Vec::new(),
        }
    }

    /// Iterate over `(declaring type, method)` pairs, most derived first.
    pub fn declarations(&self) -> impl Iterator<Item = (&str, &DeclaredMethod<F>)> {
        self.layers
            .iter()
            .flat_map(|layer| layer.methods.iter().map(move |m| (layer.name.as_str(), m)))
    }
}

/// Builder for [`DoFnType`].
pub struct DoFnTypeBuilder<F: DoFn> {
    name: String,
    input: TypeRef,
    output: TypeRef,
    methods: Vec<DeclaredMethod<F>>,
    ancestors: Vec<TypeLayer<F>>,
}

impl<F: DoFn> DoFnTypeBuilder<F> {
    /// Override the reported type name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Declare the input type as written, e.g. a type variable.
    pub fn input_type(mut self, input: TypeRef) -> Self {
        self.input = input;
        self
    }

    pub fn output_type(mut self, output: TypeRef) -> Self {
        self.output = output;
        self
    }

    pub fn method(mut self, method: DeclaredMethod<F>) -> Self {
        self.methods.push(method);
        self
    }

    pub fn setup(
        self,
        signature: MethodSignature,
        body: impl Fn(&mut F) -> UserResult + Send + Sync + 'static,
    ) -> Self {
        self.method(DeclaredMethod::setup(signature, body))
    }

    pub fn teardown(
        self,
        signature: MethodSignature,
        body: impl Fn(&mut F) -> UserResult + Send + Sync + 'static,
    ) -> Self {
        self.method(DeclaredMethod::teardown(signature, body))
    }

    pub fn start_bundle(
        self,
        signature: MethodSignature,
        body: impl Fn(&mut F, &mut dyn Context<F::Input, F::Output>) -> UserResult
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.method(DeclaredMethod::start_bundle(signature, body))
    }

    pub fn finish_bundle(
        self,
        signature: MethodSignature,
        body: impl Fn(&mut F, &mut dyn Context<F::Input, F::Output>) -> UserResult
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.method(DeclaredMethod::finish_bundle(signature, body))
    }

    pub fn process_element(
        self,
        signature: MethodSignature,
        body: impl for<'x> Fn(
                &mut F,
                &mut dyn ProcessContext<F::Input, F::Output>,
                &mut ExtraArgs<'x, F::Input, F::Output>,
            ) -> UserResult
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.method(DeclaredMethod::process_element(signature, body))
    }

    /// Inherit every layer of `parent`. `lens` locates the embedded parent
    /// value; parent bodies run against it.
    pub fn extends<P, L>(mut self, parent: DoFnType<P>, lens: L) -> Self
    where
        P: DoFn<Input = F::Input, Output = F::Output>,
        L: Fn(&mut F) -> &mut P + Send + Sync + 'static,
    {
        let lens: Lens<F, P> = Arc::new(lens);
        for layer in parent.layers {
            self.ancestors.push(TypeLayer {
                name: layer.name,
                methods: layer.methods.into_iter().map(|m| m.project(&lens)).collect(),
            });
        }
        self
    }

    /// Add an interface layer after the layers inherited so far.
    pub fn implements(mut self, layer: TypeLayer<F>) -> Self {
        self.ancestors.push(layer);
        self
    }

    pub fn build(self) -> DoFnType<F> {
        let mut layers = Vec::with_capacity(self.ancestors.len() + 1);
        layers.push(TypeLayer {
            name: self.name.clone(),
            methods: self.methods,
        });
        layers.extend(self.ancestors);
        DoFnType {
            name: self.name,
            input: self.input,
            output: self.output,
            layers,
        }
    }
}
