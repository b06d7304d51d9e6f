/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is dual-licensed under either the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree or the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree. You may select, at your option, one of the
 * above-listed licenses.
 */

//! Picking the active branch of a `select()`.
//!
//! Deciding which conditions hold is the job of the configuration layer; this
//! module only maps that decision onto the keys of a select.

use allocative::Allocative;
use dupe::Dupe;
use dupe::IterDupedExt;
use itertools::Itertools;
use starlark_map::small_set::SmallSet;

use crate::attrs::condition::ConditionKey;
use crate::attrs::selector::Selector;
use crate::error::SelectErrorKind;
use crate::target_label::TargetLabel;

#[derive(Debug, thiserror::Error)]
pub(crate) enum ConditionResolutionError {
    #[error("None of {} conditions matched configuration `{}` and no default was set:\n{}",
        .1.len(),
        .0,
        .1.iter().map(|s| format!("  {}", s)).join("\n"),
    )]
    MissingDefault(String, Vec<TargetLabel>),
    #[error(
        "Both select keys `{0}` and `{1}` match the configuration, but neither is more specific"
    )]
    TwoKeysMatch(String, String),
}

impl ConditionResolutionError {
    pub(crate) fn kind(&self) -> SelectErrorKind {
        match self {
            ConditionResolutionError::MissingDefault(..) => SelectErrorKind::NoMatchingCondition,
            ConditionResolutionError::TwoKeysMatch(..) => SelectErrorKind::AmbiguousCondition,
        }
    }
}

/// Chooses the active key of a select in some configuration.
///
/// The returned key must be one of the select's keys.
pub trait ConditionResolver {
    fn resolve(&self, selector: &Selector) -> anyhow::Result<ConditionKey>;
}

impl<F> ConditionResolver for F
where
    F: Fn(&Selector) -> anyhow::Result<ConditionKey>,
{
    fn resolve(&self, selector: &Selector) -> anyhow::Result<ConditionKey> {
        self(selector)
    }
}

/// A configuration described by the set of condition labels that hold in it.
#[derive(Debug, Clone, Allocative)]
pub struct MatchedConditionKeys {
    configuration: String,
    matched: SmallSet<TargetLabel>,
}

impl MatchedConditionKeys {
    pub fn new(configuration: &str, matched: impl IntoIterator<Item = TargetLabel>) -> Self {
        Self {
            configuration: configuration.to_owned(),
            matched: matched.into_iter().collect(),
        }
    }

    pub fn matches(&self, label: &TargetLabel) -> bool {
        self.matched.contains(label)
    }
}

impl ConditionResolver for MatchedConditionKeys {
    fn resolve(&self, selector: &Selector) -> anyhow::Result<ConditionKey> {
        let mut matching: Option<&TargetLabel> = None;
        for label in selector.condition_labels() {
            if !self.matches(label) {
                continue;
            }
            if let Some(prev) = matching {
                return Err(
                    ConditionResolutionError::TwoKeysMatch(prev.to_string(), label.to_string())
                        .into(),
                );
            }
            matching = Some(label);
        }
        match matching {
            Some(label) => Ok(ConditionKey::Label(label.dupe())),
            None if selector.has_default() => Ok(ConditionKey::Default),
            None => Err(ConditionResolutionError::MissingDefault(
                self.configuration.clone(),
                selector.condition_labels().duped().collect(),
            )
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::attrs::attr_type::AttrType;
    use crate::attrs::attr_value::AttrValue;
    use crate::attrs::condition::ConditionKey;
    use crate::attrs::resolve::ConditionResolver;
    use crate::attrs::resolve::MatchedConditionKeys;
    use crate::attrs::selector::Selector;
    use crate::error::SelectErrorKind;
    use crate::error::select_error_kind;
    use crate::target_label::TargetLabel;

    fn select(keys: &[&str]) -> Selector {
        Selector::new(
            &AttrType::int(),
            keys.iter()
                .enumerate()
                .map(|(i, k)| (ConditionKey::testing_parse(k), Some(AttrValue::Int(i as i64))))
                .collect(),
        )
        .unwrap()
    }

    fn linux() -> MatchedConditionKeys {
        MatchedConditionKeys::new(
            "linux-x86_64",
            [
                TargetLabel::testing_parse("//os:linux"),
                TargetLabel::testing_parse("//cpu:x86_64"),
            ],
        )
    }

    #[test]
    fn test_single_match() {
        assert_eq!(
            ConditionKey::testing_parse("//os:linux"),
            linux()
                .resolve(&select(&["//os:mac", "//os:linux", "DEFAULT"]))
                .unwrap()
        );
    }

    #[test]
    fn test_default_fallback() {
        assert_eq!(
            ConditionKey::Default,
            linux().resolve(&select(&["//os:mac", "DEFAULT"])).unwrap()
        );
    }

    #[test]
    fn test_no_match() {
        let err = linux()
            .resolve(&select(&["//os:mac", "//os:windows"]))
            .unwrap_err();
        assert_eq!(
            Some(SelectErrorKind::NoMatchingCondition),
            select_error_kind(&err)
        );
        assert_eq!(
            "None of 2 conditions matched configuration `linux-x86_64` and no default was set:\n  root//os:mac\n  root//os:windows",
            err.to_string()
        );
    }

    #[test]
    fn test_ambiguous() {
        let err = linux()
            .resolve(&select(&["//os:linux", "//cpu:x86_64"]))
            .unwrap_err();
        assert_eq!(
            Some(SelectErrorKind::AmbiguousCondition),
            select_error_kind(&err)
        );
    }

    #[test]
    fn test_closure_resolver() {
        let resolver = |_: &Selector| -> anyhow::Result<ConditionKey> { Ok(ConditionKey::Default) };
        assert_eq!(
            ConditionKey::Default,
            resolver.resolve(&select(&["DEFAULT"])).unwrap()
        );
    }
}
