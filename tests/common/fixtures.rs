//! DoFn types shared by several test files.

use anyhow::bail;
use dofn_sandbox::prelude::*;

/// Log of lifecycle calls made on a DoFn instance.
#[derive(Debug, Default, Clone)]
pub struct Invocations {
    calls: Vec<&'static str>,
}

impl Invocations {
    pub fn record(&mut self, call: &'static str) {
        self.calls.push(call);
    }

    pub fn calls(&self) -> &[&'static str] {
        &self.calls
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }

    pub fn was_called(&self, call: &str) -> bool {
        self.count(call) > 0
    }
}

/// Emits every element unchanged.
#[derive(Debug, Default)]
pub struct IdentityFn {
    pub invocations: Invocations,
}

impl DoFn for IdentityFn {
    type Input = String;
    type Output = String;

    fn describe() -> DoFnType<Self> {
        Self::builder()
            .process_element(
                MethodSignature::new("process").param(ParamType::process_context()),
                |this, ctx, _| {
                    this.invocations.record("process");
                    let element = ctx.element().clone();
                    ctx.output(element);
                    Ok(())
                },
            )
            .build()
    }
}

/// Declares all five stages.
#[derive(Debug, Default)]
pub struct LifecycleFn {
    pub invocations: Invocations,
}

impl DoFn for LifecycleFn {
    type Input = String;
    type Output = String;

    fn describe() -> DoFnType<Self> {
        Self::builder()
            .setup(MethodSignature::new("setup"), |this| {
                this.invocations.record("setup");
                Ok(())
            })
            .start_bundle(
                MethodSignature::new("startBundle").param(ParamType::context()),
                |this, _| {
                    this.invocations.record("startBundle");
                    Ok(())
                },
            )
            .process_element(
                MethodSignature::new("processElement").param(ParamType::process_context()),
                |this, _, _| {
                    this.invocations.record("processElement");
                    Ok(())
                },
            )
            .finish_bundle(
                MethodSignature::new("finishBundle").param(ParamType::context()),
                |this, ctx| {
                    this.invocations.record("finishBundle");
                    ctx.output("flushed".to_string());
                    Ok(())
                },
            )
            .teardown(MethodSignature::new("teardown"), |this| {
                this.invocations.record("teardown");
                Ok(())
            })
            .build()
    }
}

/// Fails with "bogus" in one chosen stage, by error or by panic.
#[derive(Debug)]
pub struct FailingFn {
    pub fail_at: Stage,
    pub panic: bool,
}

impl FailingFn {
    pub fn erroring_at(stage: Stage) -> Self {
        Self {
            fail_at: stage,
            panic: false,
        }
    }

    pub fn panicking_at(stage: Stage) -> Self {
        Self {
            fail_at: stage,
            panic: true,
        }
    }

    fn run(&self, stage: Stage) -> UserResult {
        if self.fail_at != stage {
            return Ok(());
        }
        if self.panic {
            panic!("bogus");
        }
        bail!("bogus")
    }
}

impl DoFn for FailingFn {
    type Input = String;
    type Output = String;

    fn describe() -> DoFnType<Self> {
        Self::builder()
            .setup(MethodSignature::new("setup"), |this| this.run(Stage::Setup))
            .start_bundle(
                MethodSignature::new("startBundle").param(ParamType::context()),
                |this, _| this.run(Stage::StartBundle),
            )
            .process_element(
                MethodSignature::new("processElement").param(ParamType::process_context()),
                |this, _, _| this.run(Stage::ProcessElement),
            )
            .finish_bundle(
                MethodSignature::new("finishBundle").param(ParamType::context()),
                |this, _| this.run(Stage::FinishBundle),
            )
            .teardown(MethodSignature::new("teardown"), |this| this.run(Stage::Teardown))
            .build()
    }
}

/// DoFns declared in a module of their own, with private state.
pub mod other_module {
    use dofn_sandbox::prelude::*;

    #[derive(Debug, Default)]
    pub struct ForeignFn {
        seen: usize,
    }

    impl ForeignFn {
        pub fn seen(&self) -> usize {
            self.seen
        }
    }

    impl DoFn for ForeignFn {
        type Input = u64;
        type Output = u64;

        fn describe() -> DoFnType<Self> {
            Self::builder()
                .process_element(
                    MethodSignature::new("process")
                        .param(ParamType::process_context())
                        .param(ParamType::output_receiver(TypeRef::of::<u64>())),
                    |this, ctx, extras| {
                        this.seen += 1;
                        let doubled = ctx.element() * 2;
                        if let Some(receiver) = extras.output_receiver() {
                            receiver.output(doubled);
                        }
                        Ok(())
                    },
                )
                .build()
        }
    }

    /// Only visible inside the test crate.
    #[derive(Debug, Default)]
    pub(crate) struct HiddenFn;

    impl DoFn for HiddenFn {
        type Input = u64;
        type Output = u64;

        fn describe() -> DoFnType<Self> {
            Self::builder()
                .process_element(
                    MethodSignature::new("process").param(ParamType::process_context()),
                    |_, _, _| Ok(()),
                )
                .build()
        }
    }
}
