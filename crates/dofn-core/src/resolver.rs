//! MethodResolver: select one method per lifecycle stage.
//!
//! Resolution walks the layers of a [`DoFnType`] from most derived to least
//! derived and merges declarations that override each other (same name and
//! erased parameter types). The merged candidate takes:
//!
//! - signature and visibility from the most derived declaration
//! - the most derived marker found anywhere in the chain
//! - the most derived body found anywhere in the chain
//!
//! Analysis then runs in two phases over the stages in
//! [`Stage::RESOLUTION_ORDER`]:
//!
//! 1. Resolution: uniqueness, presence of ProcessElement, visibility,
//!    implementation and body shape for every stage
//! 2. TypeCheck: argument validation for every selected method
//!
//! The first violation aborts analysis.

use crate::dofn::{BodyShape, BundleFn, DoFn, DoFnType, LifecycleFn, MethodBody, ProcessFn};
use crate::errors::{ErrorCode, FailureContext, InvalidDoFn};
use crate::validator::SignatureValidator;
use dofn_types::{ExtraContextKind, MethodSignature, Stage};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Description of a selected lifecycle method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    pub stage: Stage,
    /// Fully qualified name of the type that declares the selected signature.
    pub owner: String,
    pub signature: MethodSignature,
    /// Extra-context kinds in parameter order; empty outside ProcessElement.
    pub extra_kinds: Vec<ExtraContextKind>,
}

impl MethodDescriptor {
    /// `Owner#name(Params)`
    pub fn qualified_name(&self) -> String {
        self.signature.qualified(&self.owner)
    }

    pub fn declares(&self, kind: ExtraContextKind) -> bool {
        self.extra_kinds.contains(&kind)
    }
}

/// A selected method together with its callable body.
pub struct Resolved<B> {
    pub descriptor: MethodDescriptor,
    pub body: B,
}

/// Selected methods of a DoFn type, one slot per stage.
pub struct ResolvedMethods<F: DoFn> {
    pub setup: Option<Resolved<LifecycleFn<F>>>,
    pub start_bundle: Option<Resolved<BundleFn<F>>>,
    pub process_element: Resolved<ProcessFn<F>>,
    pub finish_bundle: Option<Resolved<BundleFn<F>>>,
    pub teardown: Option<Resolved<LifecycleFn<F>>>,
}

impl<F: DoFn> ResolvedMethods<F> {
    pub fn descriptor(&self, stage: Stage) -> Option<&MethodDescriptor> {
        match stage {
            Stage::Setup => self.setup.as_ref().map(|m| &m.descriptor),
            Stage::StartBundle => self.start_bundle.as_ref().map(|m| &m.descriptor),
            Stage::ProcessElement => Some(&self.process_element.descriptor),
            Stage::FinishBundle => self.finish_bundle.as_ref().map(|m| &m.descriptor),
            Stage::Teardown => self.teardown.as_ref().map(|m| &m.descriptor),
        }
    }
}

/// Merged view of all declarations that override each other.
struct Candidate<'a, F: DoFn> {
    owner: &'a str,
    signature: &'a MethodSignature,
    marker: Option<Stage>,
    body: Option<&'a MethodBody<F>>,
}

/// Phase 1 result for one stage, with the body already typed for it.
struct Selected<'a, B> {
    stage: Stage,
    owner: &'a str,
    signature: &'a MethodSignature,
    body: B,
}

/// Resolves the lifecycle methods of one DoFn type.
pub struct MethodResolver<'a, F: DoFn> {
    ty: &'a DoFnType<F>,
}

impl<'a, F: DoFn> MethodResolver<'a, F> {
    pub fn new(ty: &'a DoFnType<F>) -> Self {
        Self { ty }
    }

    /// Run both analysis phases.
    pub fn resolve(&self) -> Result<ResolvedMethods<F>, InvalidDoFn> {
        debug!(dofn = %self.ty.name, layers = self.ty.layers.len(), "resolving DoFn methods");

        let candidates = self.candidates();

        // Phase 1: resolution, in Stage::RESOLUTION_ORDER
        let start_bundle = self.select(Stage::StartBundle, &candidates, MethodBody::as_bundle)?;
        let process_element = self
            .select(Stage::ProcessElement, &candidates, MethodBody::as_process)?
            .ok_or_else(|| self.missing_process_element())?;
        let finish_bundle = self.select(Stage::FinishBundle, &candidates, MethodBody::as_bundle)?;
        let setup = self.select(Stage::Setup, &candidates, MethodBody::as_lifecycle)?;
        let teardown = self.select(Stage::Teardown, &candidates, MethodBody::as_lifecycle)?;

        // Phase 2: type check, same order
        let start_bundle = start_bundle.map(|m| self.type_check(m)).transpose()?;
        let process_element = self.type_check(process_element)?;
        let finish_bundle = finish_bundle.map(|m| self.type_check(m)).transpose()?;
        let setup = setup.map(|m| self.type_check(m)).transpose()?;
        let teardown = teardown.map(|m| self.type_check(m)).transpose()?;

        Ok(ResolvedMethods {
            setup,
            start_bundle,
            process_element,
            finish_bundle,
            teardown,
        })
    }

    /// Merge override chains into one candidate each, most derived first.
    fn candidates(&self) -> Vec<Candidate<'a, F>> {
        let mut candidates: Vec<Candidate<'a, F>> = Vec::new();
        let mut keys = Vec::new();

        for (owner, method) in self.ty.declarations() {
            let key = method.signature.override_key();
            match keys.iter().position(|k| *k == key) {
                Some(index) => {
                    let existing = &mut candidates[index];
                    if existing.marker.is_none() {
                        existing.marker = method.marker;
                    }
                    if existing.body.is_none() {
                        existing.body = method.body.as_ref();
                    }
                }
                None => {
                    keys.push(key);
                    candidates.push(Candidate {
                        owner,
                        signature: &method.signature,
                        marker: method.marker,
                        body: method.body.as_ref(),
                    });
                }
            }
        }

        candidates
    }

    /// Pick the single candidate marked with `stage` and check that it is
    /// public and has a body of the shape `typed` extracts.
    fn select<B>(
        &self,
        stage: Stage,
        candidates: &[Candidate<'a, F>],
        typed: fn(&MethodBody<F>) -> Option<B>,
    ) -> Result<Option<Selected<'a, B>>, InvalidDoFn> {
        let marked: Vec<&Candidate<'a, F>> = candidates
            .iter()
            .filter(|c| c.marker == Some(stage))
            .collect();

        let candidate = match marked.as_slice() {
            [] => return Ok(None),
            [single] => *single,
            several => {
                let methods = several
                    .iter()
                    .map(|c| c.signature.qualified(c.owner))
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(InvalidDoFn::with_context(
                    ErrorCode::DuplicateMethod,
                    format!(
                        "Found multiple methods annotated with {} on {}: [{}]",
                        stage.marker(),
                        self.ty.name,
                        methods
                    ),
                    FailureContext::for_type(&self.ty.name).with_stage(stage),
                ));
            }
        };

        SignatureValidator::standalone(candidate.owner).verify_public(stage, candidate.signature)?;

        let qualified = candidate.signature.qualified(candidate.owner);
        let context = FailureContext::for_type(candidate.owner)
            .with_method(candidate.signature.display_name())
            .with_stage(stage);

        let declared = candidate.body.ok_or_else(|| {
            InvalidDoFn::with_context(
                ErrorCode::MissingImplementation,
                format!("{} has no implementation", qualified),
                context.clone(),
            )
        })?;
        let body = typed(declared)
            .ok_or_else(|| body_mismatch(stage, &qualified, declared.shape(), context))?;

        Ok(Some(Selected {
            stage,
            owner: candidate.owner,
            signature: candidate.signature,
            body,
        }))
    }

    fn type_check<B>(&self, method: Selected<'a, B>) -> Result<Resolved<B>, InvalidDoFn> {
        let validator = SignatureValidator::for_unit(method.owner, &self.ty.input, &self.ty.output);
        let extra_kinds = validator.verify_arguments(method.stage, method.signature)?;
        Ok(Resolved {
            descriptor: MethodDescriptor {
                stage: method.stage,
                owner: method.owner.to_string(),
                signature: method.signature.clone(),
                extra_kinds,
            },
            body: method.body,
        })
    }

    fn missing_process_element(&self) -> InvalidDoFn {
        InvalidDoFn::with_context(
            ErrorCode::MissingProcessElement,
            format!(
                "No method annotated with {} found on {}",
                Stage::ProcessElement.marker(),
                self.ty.name
            ),
            FailureContext::for_type(&self.ty.name).with_stage(Stage::ProcessElement),
        )
    }
}

fn body_mismatch(stage: Stage, qualified: &str, found: BodyShape, context: FailureContext) -> InvalidDoFn {
    InvalidDoFn::with_context(
        ErrorCode::BodyMismatch,
        format!(
            "{} cannot implement {}: expected a {} body, found a {} body",
            qualified,
            stage.marker(),
            BodyShape::for_stage(stage),
            found
        ),
        context,
    )
}
