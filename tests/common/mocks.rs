//! Engine-side doubles.
//!
//! The binding layer never creates contexts itself; these stand in for the
//! execution engine in tests.

use dofn_sandbox::prelude::*;
use dofn_sandbox::ExtraContextKind;
use parking_lot::Mutex;
use std::sync::Arc;

/// Context that records everything emitted to the main output.
pub struct RecordingContext<I, O> {
    element: Option<I>,
    pub outputs: Vec<O>,
}

impl<I, O> RecordingContext<I, O> {
    /// Context for bundle methods; has no current element.
    pub fn bundle() -> Self {
        Self {
            element: None,
            outputs: Vec::new(),
        }
    }

    pub fn for_element(element: I) -> Self {
        Self {
            element: Some(element),
            outputs: Vec::new(),
        }
    }
}

impl<I, O> Context<I, O> for RecordingContext<I, O> {
    fn output(&mut self, value: O) {
        self.outputs.push(value);
    }
}

impl<I, O> ProcessContext<I, O> for RecordingContext<I, O> {
    fn element(&self) -> &I {
        self.element.as_ref().expect("bundle context has no current element")
    }
}

#[derive(Debug)]
pub struct FixedWindow {
    pub max_timestamp: i64,
}

impl BoundedWindow for FixedWindow {
    fn max_timestamp(&self) -> i64 {
        self.max_timestamp
    }
}

/// Factory that logs every request and collects receiver output.
pub struct MockExtraFactory<I, O> {
    element: I,
    window: Arc<FixedWindow>,
    calls: Mutex<Vec<ExtraContextKind>>,
    received: Mutex<Vec<O>>,
}

impl<I: Clone, O> MockExtraFactory<I, O> {
    pub fn new(element: I) -> Self {
        Self {
            element,
            window: Arc::new(FixedWindow { max_timestamp: 1_000 }),
            calls: Mutex::new(Vec::new()),
            received: Mutex::new(Vec::new()),
        }
    }

    /// Factory methods called so far, in call order.
    pub fn calls(&self) -> Vec<ExtraContextKind> {
        self.calls.lock().clone()
    }

    /// Values emitted through output receivers handed out by this factory.
    pub fn take_received(&self) -> Vec<O> {
        std::mem::take(&mut *self.received.lock())
    }

    pub fn window_handle(&self) -> Arc<FixedWindow> {
        Arc::clone(&self.window)
    }
}

impl<I: Clone, O> ExtraContextFactory<I, O> for MockExtraFactory<I, O> {
    fn window(&self) -> Arc<dyn BoundedWindow> {
        self.calls.lock().push(ExtraContextKind::Window);
        self.window.clone()
    }

    fn input_provider(&self) -> Box<dyn InputProvider<I> + '_> {
        self.calls.lock().push(ExtraContextKind::InputProvider);
        Box::new(FixedInput(self.element.clone()))
    }

    fn output_receiver(&self) -> Box<dyn OutputReceiver<O> + '_> {
        self.calls.lock().push(ExtraContextKind::OutputReceiver);
        Box::new(CollectingReceiver {
            sink: &self.received,
        })
    }
}

struct FixedInput<I>(I);

impl<I: Clone> InputProvider<I> for FixedInput<I> {
    fn get(&self) -> I {
        self.0.clone()
    }
}

struct CollectingReceiver<'a, O> {
    sink: &'a Mutex<Vec<O>>,
}

impl<O> OutputReceiver<O> for CollectingReceiver<'_, O> {
    fn output(&mut self, value: O) {
        self.sink.lock().push(value);
    }
}
