/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is dual-licensed under either the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree or the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree. You may select, at your option, one of the
 * above-listed licenses.
 */

//! Detection of target references listed more than once in an attribute.

use dupe::Dupe;
use starlark_map::small_set::SmallSet;

use crate::attrs::attr_type::AttrType;
use crate::attrs::attr_value::AttrValue;
use crate::attrs::selector_list::SelectorList;
use crate::config::SelectConfig;
use crate::mapper::enumerate::enumerate_selector_list;
use crate::target_label::TargetLabel;

/// References that occur more than once inside one of `values`, in the order
/// the repeats are found. A reference present once in each of two values is
/// not a duplicate.
pub fn find_duplicate_references<'v>(
    ty: &AttrType,
    values: impl IntoIterator<Item = &'v AttrValue>,
) -> SmallSet<TargetLabel> {
    let mut duplicates = SmallSet::new();
    for value in values {
        let mut seen = SmallSet::new();
        ty.visit_references(value, &mut |label| {
            if !seen.insert(label) {
                duplicates.insert(label.dupe());
            }
        });
    }
    duplicates
}

/// Duplicate references of an explicit attribute.
///
/// With few selects every possible value is enumerated and checked exactly.
/// Beyond `exact_duplicate_check_max_selects` the product is never built; see
/// [`find_duplicates_across_selectors`].
pub(crate) fn find_duplicates_in_selector_list(
    attr: &str,
    list: &SelectorList,
    config: &SelectConfig,
) -> anyhow::Result<SmallSet<TargetLabel>> {
    if list.select_count() <= config.exact_duplicate_check_max_selects {
        let mut values = Vec::new();
        enumerate_selector_list(attr, list, &mut |value| {
            values.push(value);
            Ok(())
        })?;
        return Ok(find_duplicate_references(list.ty(), &values));
    }
    Ok(find_duplicates_across_selectors(list))
}

/// Checks each select on its own instead of each possible value.
///
/// A reference repeated inside one branch is reported exactly. A reference
/// that appears in two different items of the chain is reported too, even
/// when it only appears in branches that can never be active together. This
/// over-approximates: `select({A: [x], B: []}) + select({A: [], B: [x]})`
/// reports `x`, although both selects always take the same branch.
pub(crate) fn find_duplicates_across_selectors(list: &SelectorList) -> SmallSet<TargetLabel> {
    let ty = list.ty();
    let mut duplicates = SmallSet::new();
    let mut in_earlier_items: SmallSet<&TargetLabel> = SmallSet::new();
    for selector in list.selectors() {
        let mut in_item = SmallSet::new();
        for (_, value) in selector.entries() {
            let Some(value) = value else {
                continue;
            };
            let mut in_branch = SmallSet::new();
            ty.visit_references(value, &mut |label| {
                if !in_branch.insert(label) {
                    duplicates.insert(label.dupe());
                }
                in_item.insert(label);
            });
        }
        for label in in_item {
            if !in_earlier_items.insert(label) {
                duplicates.insert(label.dupe());
            }
        }
    }
    duplicates
}

#[cfg(test)]
mod tests {
    use crate::attrs::attr_type::AttrType;
    use crate::attrs::attr_value::AttrValue;
    use crate::attrs::selector_list::SelectorList;
    use crate::attrs::testing::testing_coercion_ctx;
    use crate::config::SelectConfig;
    use crate::mapper::duplicates::find_duplicate_references;
    use crate::mapper::duplicates::find_duplicates_in_selector_list;
    use crate::target_label::TargetLabel;

    fn deps(raw: serde_json::Value) -> SelectorList {
        SelectorList::coerce(
            &AttrType::list(AttrType::dep()),
            &testing_coercion_ctx(),
            &raw,
        )
        .unwrap()
    }

    fn labels(xs: &[&str]) -> Vec<TargetLabel> {
        xs.iter().map(|x| TargetLabel::testing_parse(x)).collect()
    }

    fn duplicates(list: &SelectorList, config: &SelectConfig) -> Vec<TargetLabel> {
        find_duplicates_in_selector_list("deps", list, config)
            .unwrap()
            .into_iter()
            .collect()
    }

    #[test]
    fn test_duplicates_within_one_value() {
        let ty = AttrType::list(AttrType::dep());
        let a = AttrValue::Label(TargetLabel::testing_parse("//:a"));
        let b = AttrValue::Label(TargetLabel::testing_parse("//:b"));
        let values = [
            AttrValue::List(vec![a.clone(), b.clone(), a.clone()]),
            AttrValue::List(vec![b.clone()]),
        ];
        assert_eq!(
            labels(&["//:a"]),
            find_duplicate_references(&ty, &values)
                .into_iter()
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_literal() {
        let list = deps(serde_json::json!(["//:a", "//:b", "//:a"]));
        assert_eq!(labels(&["//:a"]), duplicates(&list, &SelectConfig::default()));
    }

    #[test]
    fn test_single_select_is_exact() {
        let list = deps(serde_json::json!({
            "__type": "concat",
            "items": [
                ["//:a"],
                {"__type": "selector", "entries": {"//c:x": ["//:a"], "//c:y": ["//:b"]}},
            ],
        }));
        assert_eq!(labels(&["//:a"]), duplicates(&list, &SelectConfig::default()));
    }

    #[test]
    fn test_branches_of_one_select_are_not_duplicates() {
        let list = deps(serde_json::json!({
            "__type": "selector",
            "entries": {"//c:x": ["//:a"], "DEFAULT": ["//:a"]},
        }));
        assert!(duplicates(&list, &SelectConfig::default()).is_empty());
    }

    fn two_selects(first: serde_json::Value, second: serde_json::Value) -> SelectorList {
        deps(serde_json::json!({
            "__type": "concat",
            "items": [
                {"__type": "selector", "entries": first},
                {"__type": "selector", "entries": second},
            ],
        }))
    }

    fn exact() -> SelectConfig {
        SelectConfig {
            exact_duplicate_check_max_selects: 2,
            ..SelectConfig::default()
        }
    }

    #[test]
    fn test_cross_selector_over_approximation() {
        // Both selects branch on `x` and `y`, so `a` is listed once whichever holds.
        let list = two_selects(
            serde_json::json!({"//c:x": ["//:a"], "//c:y": []}),
            serde_json::json!({"//c:x": [], "//c:y": ["//:a"]}),
        );
        assert_eq!(labels(&["//:a"]), duplicates(&list, &SelectConfig::default()));
        assert!(duplicates(&list, &exact()).is_empty());
    }

    #[test]
    fn test_exact_when_configured_for_more_selects() {
        let list = two_selects(
            serde_json::json!({"//c:x": ["//:a"], "DEFAULT": []}),
            serde_json::json!({"//c:y": ["//:a"], "DEFAULT": []}),
        );
        // `x` and `y` can both hold, so exact enumeration finds the repeat too.
        assert_eq!(labels(&["//:a"]), duplicates(&list, &exact()));
    }

    #[test]
    fn test_exact_with_shared_key_set() {
        let list = deps(serde_json::json!({
            "__type": "concat",
            "items": [
                {"__type": "selector", "entries": {"//c:x": ["//:a"], "DEFAULT": []}},
                {"__type": "selector", "entries": {"//c:x": [], "DEFAULT": ["//:a"]}},
            ],
        }));
        let config = SelectConfig {
            exact_duplicate_check_max_selects: 2,
            ..SelectConfig::default()
        };
        assert!(duplicates(&list, &config).is_empty());
        assert_eq!(labels(&["//:a"]), duplicates(&list, &SelectConfig::default()));
    }
}
