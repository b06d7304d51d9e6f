/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is dual-licensed under either the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree or the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree. You may select, at your option, one of the
 * above-listed licenses.
 */

//! Classification of the errors produced by this crate.
//!
//! Every module keeps its own private error enum. Callers that need to branch
//! on the failure (rather than just report it) use [`select_error_kind`].

use allocative::Allocative;
use dupe::Dupe;

use crate::attrs::attr_type::CoercionError;
use crate::attrs::resolve::ConditionResolutionError;
use crate::attrs::selector::SelectorError;
use crate::attrs::selector_list::SelectorListError;
use crate::attrs::spec::AttributeSpecError;
use crate::mapper::AttributeMapperError;
use crate::mapper::computed::ComputationError;
use crate::target_label::TargetLabelError;

#[derive(
    Debug, Clone, Copy, Dupe, Eq, PartialEq, Hash, Allocative, derive_more::Display
)]
pub enum SelectErrorKind {
    /// A raw value could not be coerced to the attribute type.
    #[display("conversion")]
    Conversion,
    /// More than one select chained on a type that cannot be concatenated.
    #[display("unsupported concatenation")]
    UnsupportedConcatenation,
    /// A condition resolver picked a key that the select does not have.
    #[display("unknown condition key")]
    UnknownConditionKey,
    #[display("computation budget exceeded")]
    ComputationBudgetExceeded,
    /// A non-configurable mapper was asked for a configurable attribute.
    #[display("configurable attribute accessed unsafely")]
    ConfigurableAttributeAccessedUnsafely,
    #[display("duplicate condition key")]
    DuplicateConditionKey,
    #[display("no matching condition")]
    NoMatchingCondition,
    #[display("ambiguous condition")]
    AmbiguousCondition,
    #[display("unknown attribute")]
    UnknownAttribute,
    #[display("duplicate attribute")]
    DuplicateAttribute,
    #[display("computed default cycle")]
    ComputedDefaultCycle,
    /// The attribute has many possible values and the mapper cannot pick one.
    #[display("no single value")]
    NoSingleValue,
    #[display("internal error")]
    Internal,
}

/// Finds the first error produced by this crate in the error chain and returns its kind.
pub fn select_error_kind(error: &anyhow::Error) -> Option<SelectErrorKind> {
    for cause in error.chain() {
        if let Some(e) = cause.downcast_ref::<CoercionError>() {
            return Some(e.kind());
        }
        if let Some(e) = cause.downcast_ref::<TargetLabelError>() {
            return Some(e.kind());
        }
        if let Some(e) = cause.downcast_ref::<SelectorError>() {
            return Some(e.kind());
        }
        if let Some(e) = cause.downcast_ref::<SelectorListError>() {
            return Some(e.kind());
        }
        if let Some(e) = cause.downcast_ref::<ConditionResolutionError>() {
            return Some(e.kind());
        }
        if let Some(e) = cause.downcast_ref::<AttributeSpecError>() {
            return Some(e.kind());
        }
        if let Some(e) = cause.downcast_ref::<AttributeMapperError>() {
            return Some(e.kind());
        }
        if let Some(e) = cause.downcast_ref::<ComputationError>() {
            return Some(e.kind());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use anyhow::Context;

    use crate::error::SelectErrorKind;
    use crate::error::select_error_kind;
    use crate::target_label::TargetLabel;

    #[test]
    fn test_kind_through_context() {
        let err = TargetLabel::parse("nope", "root", "")
            .context("when coercing attribute `deps`")
            .unwrap_err();
        assert_eq!(Some(SelectErrorKind::Conversion), select_error_kind(&err));
    }

    #[test]
    fn test_foreign_error_has_no_kind() {
        let err = anyhow::anyhow!("something else");
        assert_eq!(None, select_error_kind(&err));
    }
}
