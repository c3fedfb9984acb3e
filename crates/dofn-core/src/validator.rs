//! SignatureValidator: structural checks on lifecycle method signatures.
//!
//! Implements Phase 2 (TypeCheck) of DoFn analysis, plus the visibility check
//! the resolver runs during Phase 1. Checks run in a fixed order per method:
//! return type, first parameter, extra parameters, then generic
//! compatibility, and the first violation is reported.

use crate::errors::{ErrorCode, FailureContext, InvalidDoFn};
use dofn_types::{ContextGenerics, ExtraContextKind, MethodSignature, ParamType, Stage, TypeRef};

/// Validates method signatures declared on `owner`.
///
/// A validator built with [`SignatureValidator::for_unit`] knows the input
/// and output types of the DoFn being analyzed and checks context generics
/// against them. A [`standalone`](SignatureValidator::standalone) validator
/// only checks generics that the signature spells out itself.
pub struct SignatureValidator<'a> {
    owner: &'a str,
    unit: Option<(&'a TypeRef, &'a TypeRef)>,
}

impl<'a> SignatureValidator<'a> {
    pub fn standalone(owner: &'a str) -> Self {
        Self { owner, unit: None }
    }

    pub fn for_unit(owner: &'a str, input: &'a TypeRef, output: &'a TypeRef) -> Self {
        Self {
            owner,
            unit: Some((input, output)),
        }
    }

    /// Fail unless the method is public.
    pub fn verify_public(&self, stage: Stage, sig: &MethodSignature) -> Result<(), InvalidDoFn> {
        if sig.is_public() {
            return Ok(());
        }
        Err(InvalidDoFn::with_context(
            ErrorCode::NotPublic,
            format!("{} must be public", sig.qualified(self.owner)),
            self.context(stage, sig),
        ))
    }

    /// Validate a method for `stage`, returning the extra-context kinds it
    /// declares (always empty outside ProcessElement).
    pub fn verify_arguments(
        &self,
        stage: Stage,
        sig: &MethodSignature,
    ) -> Result<Vec<ExtraContextKind>, InvalidDoFn> {
        match stage {
            Stage::ProcessElement => self.verify_process_method_arguments(sig),
            Stage::StartBundle | Stage::FinishBundle => {
                self.verify_bundle_method_arguments(stage, sig)?;
                Ok(Vec::new())
            }
            Stage::Setup | Stage::Teardown => {
                self.verify_lifecycle_method_arguments(stage, sig)?;
                Ok(Vec::new())
            }
        }
    }

    /// Validate a ProcessElement signature.
    ///
    /// Checks:
    /// - Returns unit
    /// - First parameter is a ProcessContext compatible with the DoFn
    /// - Every further parameter is BoundedWindow, InputProvider or OutputReceiver
    /// - InputProvider/OutputReceiver element types accept the DoFn's types
    ///
    /// # Returns
    /// The extra-context kinds in declaration order, or the first violation.
    pub fn verify_process_method_arguments(
        &self,
        sig: &MethodSignature,
    ) -> Result<Vec<ExtraContextKind>, InvalidDoFn> {
        let stage = Stage::ProcessElement;
        self.verify_return_type(stage, sig)?;

        let expected = match sig.params.first() {
            Some(ParamType::ProcessContext(generics)) => self
                .context_types(generics)
                .ok_or_else(|| self.bad_first_parameter(stage, sig, "ProcessContext"))?,
            _ => return Err(self.bad_first_parameter(stage, sig, "ProcessContext")),
        };

        let mut kinds = Vec::with_capacity(sig.params.len().saturating_sub(1));
        for (index, param) in sig.params.iter().enumerate().skip(1) {
            let kind = param
                .extra_kind()
                .ok_or_else(|| self.bad_context_parameter(stage, sig, index, &ExtraContextKind::ALL))?;

            if let (Some(declared), Some((input, output))) = (param.element_type(), expected) {
                let required = match kind {
                    ExtraContextKind::InputProvider => Some(input),
                    ExtraContextKind::OutputReceiver => Some(output),
                    ExtraContextKind::Window => None,
                };
                if let Some(required) = required {
                    if !declared.accepts(required) {
                        return Err(InvalidDoFn::with_context(
                            ErrorCode::IncompatibleGenerics,
                            format!(
                                "Incompatible generics in context parameter {} for method {}. Should be {}<{}>",
                                param,
                                sig.qualified(self.owner),
                                kind.carrier_name(),
                                required
                            ),
                            self.context(stage, sig).with_param(index),
                        ));
                    }
                }
            }

            kinds.push(kind);
        }

        Ok(kinds)
    }

    /// Validate a StartBundle or FinishBundle signature: unit return and a
    /// single Context parameter.
    pub fn verify_bundle_method_arguments(
        &self,
        stage: Stage,
        sig: &MethodSignature,
    ) -> Result<(), InvalidDoFn> {
        self.verify_return_type(stage, sig)?;

        match sig.params.first() {
            Some(ParamType::Context(generics)) => {
                self.context_types(generics)
                    .ok_or_else(|| self.bad_first_parameter(stage, sig, "Context"))?;
            }
            _ => return Err(self.bad_first_parameter(stage, sig, "Context")),
        }

        match sig.params.len() {
            1 => Ok(()),
            _ => Err(self.bad_context_parameter(stage, sig, 1, &[])),
        }
    }

    /// Validate a Setup or Teardown signature: unit return, no parameters.
    pub fn verify_lifecycle_method_arguments(
        &self,
        stage: Stage,
        sig: &MethodSignature,
    ) -> Result<(), InvalidDoFn> {
        self.verify_return_type(stage, sig)?;
        if sig.params.is_empty() {
            Ok(())
        } else {
            Err(self.bad_context_parameter(stage, sig, 0, &[]))
        }
    }

    fn verify_return_type(&self, stage: Stage, sig: &MethodSignature) -> Result<(), InvalidDoFn> {
        match &sig.returns {
            None => Ok(()),
            Some(_) => Err(InvalidDoFn::with_context(
                ErrorCode::BadReturnType,
                format!("{} must have a void return type", sig.qualified(self.owner)),
                self.context(stage, sig),
            )),
        }
    }

    /// Input/output types a context parameter is bound to.
    ///
    /// `None` when explicit generics disagree with the unit's types. The inner
    /// `None` means nothing is known to check extra parameters against.
    #[allow(clippy::type_complexity)]
    fn context_types<'b>(
        &self,
        generics: &'b ContextGenerics,
    ) -> Option<Option<(&'b TypeRef, &'b TypeRef)>>
    where
        'a: 'b,
    {
        match (generics, self.unit) {
            (ContextGenerics::Inherited, unit) => Some(unit),
            (ContextGenerics::Explicit { input, output }, None) => Some(Some((input, output))),
            (ContextGenerics::Explicit { input, output }, Some((unit_in, unit_out))) => {
                (input == unit_in && output == unit_out).then_some(Some((unit_in, unit_out)))
            }
        }
    }

    fn bad_first_parameter(&self, stage: Stage, sig: &MethodSignature, expected: &str) -> InvalidDoFn {
        InvalidDoFn::with_context(
            ErrorCode::BadFirstParameter,
            format!(
                "{} must take a {} as its first argument",
                sig.qualified(self.owner),
                expected
            ),
            self.context(stage, sig).with_param(0),
        )
    }

    fn bad_context_parameter(
        &self,
        stage: Stage,
        sig: &MethodSignature,
        index: usize,
        allowed: &[ExtraContextKind],
    ) -> InvalidDoFn {
        let param = sig
            .params
            .get(index)
            .map(ToString::to_string)
            .unwrap_or_default();
        let allowed = allowed
            .iter()
            .map(ExtraContextKind::carrier_name)
            .collect::<Vec<_>>()
            .join(", ");
        InvalidDoFn::with_context(
            ErrorCode::BadContextParameter,
            format!(
                "{} is not a valid context parameter for method {}. Should be one of [{}]",
                param,
                sig.qualified(self.owner),
                allowed
            ),
            self.context(stage, sig).with_param(index),
        )
    }

    fn context(&self, stage: Stage, sig: &MethodSignature) -> FailureContext {
        FailureContext::for_type(self.owner)
            .with_method(sig.display_name())
            .with_stage(stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: &str = "tests::Owner";

    fn strings() -> (TypeRef, TypeRef) {
        (TypeRef::of::<String>(), TypeRef::of::<String>())
    }

    #[test]
    fn test_process_collects_extras_in_order() {
        let (input, output) = strings();
        let validator = SignatureValidator::for_unit(OWNER, &input, &output);
        let sig = MethodSignature::new("process")
            .param(ParamType::process_context())
            .param(ParamType::output_receiver(TypeRef::of::<String>()))
            .param(ParamType::Window)
            .param(ParamType::input_provider(TypeRef::wildcard()));

        let kinds = validator.verify_process_method_arguments(&sig).unwrap();
        assert_eq!(
            kinds,
            vec![
                ExtraContextKind::OutputReceiver,
                ExtraContextKind::Window,
                ExtraContextKind::InputProvider
            ]
        );
    }

    #[test]
    fn test_return_type_checked_before_parameters() {
        let validator = SignatureValidator::standalone(OWNER);
        let sig = MethodSignature::new("badReturnType").returning(TypeRef::of::<String>());

        let err = validator.verify_process_method_arguments(&sig).unwrap_err();
        assert_eq!(err.code, ErrorCode::BadReturnType);
        assert_eq!(
            err.message,
            "tests::Owner#badReturnType() must have a void return type"
        );
    }

    #[test]
    fn test_bad_extra_parameter_lists_allowed_kinds() {
        let validator = SignatureValidator::standalone(OWNER);
        let sig = MethodSignature::new("badExtraContext")
            .param(ParamType::process_context())
            .param(ParamType::other_of::<i32>());

        let err = validator.verify_process_method_arguments(&sig).unwrap_err();
        assert_eq!(err.code, ErrorCode::BadContextParameter);
        assert_eq!(
            err.message,
            "i32 is not a valid context parameter for method \
             tests::Owner#badExtraContext(ProcessContext, i32). \
             Should be one of [BoundedWindow, InputProvider, OutputReceiver]"
        );
        assert_eq!(err.context.unwrap().param_index, Some(1));
    }

    #[test]
    fn test_bundle_rejects_process_context_and_extras() {
        let validator = SignatureValidator::standalone(OWNER);

        let sig = MethodSignature::new("start").param(ParamType::process_context());
        let err = validator
            .verify_bundle_method_arguments(Stage::StartBundle, &sig)
            .unwrap_err();
        assert_eq!(err.message, "tests::Owner#start(ProcessContext) must take a Context as its first argument");

        let sig = MethodSignature::new("finish")
            .param(ParamType::context())
            .param(ParamType::Window);
        let err = validator
            .verify_bundle_method_arguments(Stage::FinishBundle, &sig)
            .unwrap_err();
        assert!(err.message.ends_with("Should be one of []"));
    }

    #[test]
    fn test_lifecycle_takes_no_parameters() {
        let validator = SignatureValidator::standalone(OWNER);
        assert!(validator
            .verify_lifecycle_method_arguments(Stage::Setup, &MethodSignature::new("setup"))
            .is_ok());

        let sig = MethodSignature::new("teardown").param(ParamType::context());
        let err = validator
            .verify_lifecycle_method_arguments(Stage::Teardown, &sig)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BadContextParameter);
    }

    #[test]
    fn test_explicit_context_generics_must_match_unit() {
        let (input, output) = strings();
        let validator = SignatureValidator::for_unit(OWNER, &input, &output);
        let sig = MethodSignature::new("process")
            .param(ParamType::process_context_of(TypeRef::of::<i32>(), TypeRef::of::<String>()));

        let err = validator.verify_process_method_arguments(&sig).unwrap_err();
        assert_eq!(err.code, ErrorCode::BadFirstParameter);
    }

    #[test]
    fn test_incompatible_output_receiver() {
        let (input, output) = strings();
        let validator = SignatureValidator::for_unit(OWNER, &input, &output);
        let sig = MethodSignature::new("process")
            .param(ParamType::process_context())
            .param(ParamType::output_receiver(TypeRef::super_of(TypeRef::of::<i32>())));

        let err = validator.verify_process_method_arguments(&sig).unwrap_err();
        assert_eq!(err.code, ErrorCode::IncompatibleGenerics);
        assert_eq!(
            err.message,
            "Incompatible generics in context parameter OutputReceiver<? super i32> for method \
             tests::Owner#process(ProcessContext, OutputReceiver). Should be OutputReceiver<String>"
        );
    }

    #[test]
    fn test_standalone_skips_inherited_generic_checks() {
        let validator = SignatureValidator::standalone(OWNER);
        let sig = MethodSignature::new("process")
            .param(ParamType::process_context())
            .param(ParamType::output_receiver(TypeRef::of::<i32>()));
        assert!(validator.verify_process_method_arguments(&sig).is_ok());

        let sig = MethodSignature::new("process")
            .param(ParamType::process_context_of(TypeRef::of::<String>(), TypeRef::of::<String>()))
            .param(ParamType::output_receiver(TypeRef::of::<i32>()));
        assert!(validator.verify_process_method_arguments(&sig).is_err());
    }

    #[test]
    fn test_private_method_rejected() {
        let validator = SignatureValidator::standalone(OWNER);
        let sig = MethodSignature::new("process").private();
        let err = validator.verify_public(Stage::ProcessElement, &sig).unwrap_err();
        assert_eq!(err.message, "tests::Owner#process() must be public");
    }
}
