//! DoFnInvoker: dispatches lifecycle calls to one bound instance.

use crate::config::DispatchConfig;
use crate::context::{Context, ExtraArgs, ExtraContextFactory, ProcessContext};
use crate::dofn::{BundleFn, DoFn, LifecycleFn};
use crate::errors::InvalidDoFn;
use crate::reflector::DoFnReflector;
use crate::resolver::{MethodDescriptor, Resolved};
use crate::user_code::{self, UserCodeException};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// A DoFn instance bound to the reflector of its type.
///
/// Stages the type does not declare are no-ops. Every failure raised by user
/// code comes back as a [`UserCodeException`].
pub struct DoFnInvoker<F: DoFn> {
    reflector: Arc<DoFnReflector<F>>,
    instance: F,
    config: DispatchConfig,
}

impl<F: DoFn> DoFnInvoker<F> {
    pub(crate) fn new(reflector: Arc<DoFnReflector<F>>, instance: F, config: DispatchConfig) -> Self {
        Self {
            reflector,
            instance,
            config,
        }
    }

    /// Bind `instance` using the shared reflector for `F`.
    pub fn for_instance(instance: F) -> Result<Self, InvalidDoFn> {
        Ok(DoFnReflector::<F>::of()?.bind(instance))
    }

    pub fn invoke_setup(&mut self) -> Result<(), UserCodeException> {
        let method = self.reflector.methods().setup.as_ref();
        dispatch_lifecycle(method, &mut self.instance, &self.config)
    }

    pub fn invoke_teardown(&mut self) -> Result<(), UserCodeException> {
        let method = self.reflector.methods().teardown.as_ref();
        dispatch_lifecycle(method, &mut self.instance, &self.config)
    }

    /// Run StartBundle. `extra` is accepted for symmetry with ProcessElement;
    /// bundle methods take no extra context.
    pub fn invoke_start_bundle(
        &mut self,
        ctx: &mut dyn Context<F::Input, F::Output>,
        _extra: &dyn ExtraContextFactory<F::Input, F::Output>,
    ) -> Result<(), UserCodeException> {
        let method = self.reflector.methods().start_bundle.as_ref();
        dispatch_bundle(method, &mut self.instance, ctx, &self.config)
    }

    pub fn invoke_finish_bundle(
        &mut self,
        ctx: &mut dyn Context<F::Input, F::Output>,
        _extra: &dyn ExtraContextFactory<F::Input, F::Output>,
    ) -> Result<(), UserCodeException> {
        let method = self.reflector.methods().finish_bundle.as_ref();
        dispatch_bundle(method, &mut self.instance, ctx, &self.config)
    }

    /// Run ProcessElement for the current element.
    ///
    /// Requests one value from `extra` per extra parameter the method
    /// declares, in declaration order, then calls the method.
    pub fn invoke_process_element(
        &mut self,
        ctx: &mut dyn ProcessContext<F::Input, F::Output>,
        extra: &dyn ExtraContextFactory<F::Input, F::Output>,
    ) -> Result<(), UserCodeException> {
        let method = &self.reflector.methods().process_element;
        trace_dispatch(&self.config, &method.descriptor);

        let mut args = ExtraArgs::from_factory(&method.descriptor.extra_kinds, extra);
        let instance = &mut self.instance;
        user_code::guard(&method.descriptor, self.config.catch_panics, || {
            (method.body)(instance, ctx, &mut args)
        })
    }

    pub fn instance(&self) -> &F {
        &self.instance
    }

    pub fn instance_mut(&mut self) -> &mut F {
        &mut self.instance
    }

    pub fn into_inner(self) -> F {
        self.instance
    }

    pub fn reflector(&self) -> &Arc<DoFnReflector<F>> {
        &self.reflector
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }
}

impl<F: DoFn> fmt::Debug for DoFnInvoker<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DoFnInvoker")
            .field("dofn", &self.reflector.type_name())
            .field("config", &self.config)
            .finish()
    }
}

fn dispatch_lifecycle<F: DoFn>(
    method: Option<&Resolved<LifecycleFn<F>>>,
    instance: &mut F,
    config: &DispatchConfig,
) -> Result<(), UserCodeException> {
    let Some(method) = method else {
        return Ok(());
    };
    trace_dispatch(config, &method.descriptor);
    user_code::guard(&method.descriptor, config.catch_panics, || (method.body)(instance))
}

fn dispatch_bundle<F: DoFn>(
    method: Option<&Resolved<BundleFn<F>>>,
    instance: &mut F,
    ctx: &mut dyn Context<F::Input, F::Output>,
    config: &DispatchConfig,
) -> Result<(), UserCodeException> {
    let Some(method) = method else {
        return Ok(());
    };
    trace_dispatch(config, &method.descriptor);
    user_code::guard(&method.descriptor, config.catch_panics, || (method.body)(instance, ctx))
}

fn trace_dispatch(config: &DispatchConfig, method: &MethodDescriptor) {
    if config.trace_dispatch {
        trace!(method = %method.qualified_name(), stage = %method.stage, "dispatch");
    }
}
