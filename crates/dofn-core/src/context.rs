//! Engine-supplied context objects.
//!
//! The binding layer never constructs these; the execution engine passes them
//! to the invoker and the invoker hands them to user code unchanged.

use dofn_types::ExtraContextKind;
use std::fmt;
use std::sync::Arc;

/// Context available to bundle-level methods.
pub trait Context<I, O> {
    /// Emit a value to the main output.
    fn output(&mut self, value: O);
}

/// Context available to ProcessElement: a [`Context`] plus the current element.
pub trait ProcessContext<I, O>: Context<I, O> {
    fn element(&self) -> &I;
}

/// The window the current element belongs to.
pub trait BoundedWindow: Send + Sync + fmt::Debug {
    /// Largest timestamp (epoch millis) that falls inside the window.
    fn max_timestamp(&self) -> i64;
}

/// Supplies the current input element.
pub trait InputProvider<I> {
    fn get(&self) -> I;
}

/// Receives output elements.
pub trait OutputReceiver<O> {
    fn output(&mut self, value: O);
}

/// Produces extra-context arguments for the active element.
///
/// The invoker calls exactly one factory method per extra parameter declared by
/// the ProcessElement method, in declaration order.
pub trait ExtraContextFactory<I, O> {
    fn window(&self) -> Arc<dyn BoundedWindow>;

    fn input_provider(&self) -> Box<dyn InputProvider<I> + '_>;

    fn output_receiver(&self) -> Box<dyn OutputReceiver<O> + '_>;
}

/// One extra argument passed to a ProcessElement body.
pub enum ExtraArg<'a, I, O> {
    Window(Arc<dyn BoundedWindow>),
    InputProvider(Box<dyn InputProvider<I> + 'a>),
    OutputReceiver(Box<dyn OutputReceiver<O> + 'a>),
}

impl<I, O> ExtraArg<'_, I, O> {
    pub fn kind(&self) -> ExtraContextKind {
        match self {
            ExtraArg::Window(_) => ExtraContextKind::Window,
            ExtraArg::InputProvider(_) => ExtraContextKind::InputProvider,
            ExtraArg::OutputReceiver(_) => ExtraContextKind::OutputReceiver,
        }
    }
}

/// Extra arguments of one ProcessElement call, in declared parameter order.
pub struct ExtraArgs<'a, I, O> {
    args: Vec<ExtraArg<'a, I, O>>,
}

impl<'a, I, O> ExtraArgs<'a, I, O> {
    /// Request one argument per declared kind from `factory`.
    pub fn from_factory(
        kinds: &[ExtraContextKind],
        factory: &'a dyn ExtraContextFactory<I, O>,
    ) -> Self {
        let args = kinds
            .iter()
            .map(|kind| match kind {
                ExtraContextKind::Window => ExtraArg::Window(factory.window()),
                ExtraContextKind::InputProvider => ExtraArg::InputProvider(factory.input_provider()),
                ExtraContextKind::OutputReceiver => {
                    ExtraArg::OutputReceiver(factory.output_receiver())
                }
            })
            .collect();
        Self { args }
    }

    pub fn empty() -> Self {
        Self { args: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Argument at `index` (0 is the first parameter after the context).
    pub fn get(&self, index: usize) -> Option<&ExtraArg<'a, I, O>> {
        self.args.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut ExtraArg<'a, I, O>> {
        self.args.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExtraArg<'a, I, O>> {
        self.args.iter()
    }

    pub fn kinds(&self) -> Vec<ExtraContextKind> {
        self.args.iter().map(ExtraArg::kind).collect()
    }

    /// First declared window argument.
    pub fn window(&self) -> Option<&Arc<dyn BoundedWindow>> {
        self.args.iter().find_map(|arg| match arg {
            ExtraArg::Window(window) => Some(window),
            _ => None,
        })
    }

    /// First declared input provider.
    pub fn input_provider(&self) -> Option<&(dyn InputProvider<I> + 'a)> {
        self.args.iter().find_map(|arg| match arg {
            ExtraArg::InputProvider(provider) => Some(provider.as_ref()),
            _ => None,
        })
    }

    /// First declared output receiver.
    pub fn output_receiver(&mut self) -> Option<&mut (dyn OutputReceiver<O> + 'a)> {
        self.args.iter_mut().find_map(|arg| match arg {
            ExtraArg::OutputReceiver(receiver) => Some(receiver.as_mut()),
            _ => None,
        })
    }
}
