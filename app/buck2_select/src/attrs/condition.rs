/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is dual-licensed under either the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree or the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree. You may select, at your option, one of the
 * above-listed licenses.
 */

use allocative::Allocative;
use dupe::Dupe;
use dupe::IterDupedExt;

use crate::target_label::TargetLabel;

/// Spelling of the default condition in `select()` dicts.
pub const DEFAULT_CONDITION_KEY: &str = "DEFAULT";

/// Key of a `select()` branch: either a configuration predicate or the default.
#[derive(
    Debug, Clone, Dupe, Eq, PartialEq, Hash, Ord, PartialOrd, Allocative, derive_more::Display
)]
pub enum ConditionKey {
    Label(TargetLabel),
    #[display("DEFAULT")]
    Default,
}

// Condition keys are stored in every select entry.
static_assertions::assert_eq_size!(ConditionKey, usize);

impl ConditionKey {
    pub fn is_default(&self) -> bool {
        matches!(self, ConditionKey::Default)
    }

    pub fn as_label(&self) -> Option<&TargetLabel> {
        match self {
            ConditionKey::Label(label) => Some(label),
            ConditionKey::Default => None,
        }
    }

    pub fn testing_parse(value: &str) -> ConditionKey {
        if value == DEFAULT_CONDITION_KEY {
            ConditionKey::Default
        } else {
            ConditionKey::Label(TargetLabel::testing_parse(value))
        }
    }
}

/// The complete set of keys of one `select()`, independent of entry order.
///
/// Two selects with equal key sets are governed by the same condition evaluation,
/// so they always take the same branch in any real configuration.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Allocative)]
pub struct SelectorKeySet(Box<[ConditionKey]>);

impl SelectorKeySet {
    pub(crate) fn new<'a>(keys: impl IntoIterator<Item = &'a ConditionKey>) -> SelectorKeySet {
        let mut keys: Vec<ConditionKey> = keys.into_iter().duped().collect();
        keys.sort();
        keys.dedup();
        SelectorKeySet(keys.into_boxed_slice())
    }

    pub fn keys(&self) -> &[ConditionKey] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::attrs::condition::ConditionKey;
    use crate::attrs::condition::SelectorKeySet;

    #[test]
    fn test_key_set_ignores_order() {
        let a = ConditionKey::testing_parse("root//:a");
        let b = ConditionKey::testing_parse("root//:b");
        assert_eq!(
            SelectorKeySet::new([&a, &b, &ConditionKey::Default]),
            SelectorKeySet::new([&ConditionKey::Default, &b, &a]),
        );
        assert_ne!(
            SelectorKeySet::new([&a, &b]),
            SelectorKeySet::new([&a, &ConditionKey::Default]),
        );
    }

    #[test]
    fn test_display() {
        assert_eq!("DEFAULT", ConditionKey::Default.to_string());
        assert_eq!(
            "root//conditions:linux",
            ConditionKey::testing_parse("//conditions:linux").to_string()
        );
    }
}
