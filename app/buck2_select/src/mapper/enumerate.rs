/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is dual-licensed under either the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree or the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree. You may select, at your option, one of the
 * above-listed licenses.
 */

//! Enumeration of every value a selector list can take.
//!
//! Selects are visited in chain order and their branches in insertion order,
//! so the output order is deterministic.
//!
//! Two selects with the same key set are governed by the same condition
//! evaluation, so they must take the same branch. Once a branch is picked for
//! a key set, later selects with that key set reuse it instead of branching.
//! The number of values produced is therefore the product of branch counts
//! taken once per distinct key set.

use starlark_map::small_map::SmallMap;
use starlark_map::small_set::SmallSet;

use crate::attrs::attr_type::AttrType;
use crate::attrs::attr_value::AttrValue;
use crate::attrs::condition::ConditionKey;
use crate::attrs::condition::SelectorKeySet;
use crate::attrs::selector::Selector;
use crate::attrs::selector_list::SelectorList;

/// Branches picked so far on the current enumeration path, by key set.
///
/// Lives for one enumeration call only.
#[derive(Debug, Default)]
pub(crate) struct BoundSelectorPaths<'a> {
    bound: SmallMap<&'a SelectorKeySet, &'a ConditionKey>,
}

impl<'a> BoundSelectorPaths<'a> {
    pub(crate) fn get(&self, keys: &SelectorKeySet) -> Option<&'a ConditionKey> {
        self.bound.get(keys).copied()
    }

    /// Bindings are strictly nested, so the binding to undo is always the last one.
    fn bind(&mut self, keys: &'a SelectorKeySet, key: &'a ConditionKey) {
        self.bound.insert(keys, key);
    }

    fn unbind(&mut self) {
        self.bound.pop();
    }
}

/// Visits every possible value of `list`. Lists without any `select()` take the
/// shortcut of resolving the single value directly.
pub(crate) fn enumerate_selector_list(
    attr: &str,
    list: &SelectorList,
    visitor: &mut dyn FnMut(AttrValue) -> anyhow::Result<()>,
) -> anyhow::Result<()> {
    if !list.is_configurable() {
        if let Some(value) = list.resolve(&mut |_| Ok(ConditionKey::Default))? {
            visitor(value)?;
        }
        return Ok(());
    }

    let mut produced = 0;
    let mut bound = BoundSelectorPaths::default();
    enumerate(
        list.ty(),
        list.selectors(),
        &mut bound,
        None,
        &mut |value| {
            produced += 1;
            visitor(value)
        },
    )?;

    tracing::debug!(
        "enumerated `{}`: {} selects, {} distinct key sets, {} values",
        attr,
        list.select_count(),
        list.selectors()
            .iter()
            .filter(|s| !s.is_unconditional())
            .map(|s| s.key_set())
            .collect::<SmallSet<_>>()
            .len(),
        produced
    );
    Ok(())
}

fn enumerate<'a>(
    ty: &AttrType,
    remaining: &'a [Selector],
    bound: &mut BoundSelectorPaths<'a>,
    accumulated: Option<AttrValue>,
    visitor: &mut dyn FnMut(AttrValue) -> anyhow::Result<()>,
) -> anyhow::Result<()> {
    let Some((selector, rest)) = remaining.split_first() else {
        // An unset value of a type without a default produces nothing.
        return match accumulated {
            Some(value) => visitor(value),
            None => Ok(()),
        };
    };

    if let Some(key) = bound.get(selector.key_set()) {
        let value = selector.value_for_key(key)?;
        let accumulated = append(ty, accumulated, value)?;
        return enumerate(ty, rest, bound, accumulated, visitor);
    }

    for (key, value) in selector.entries() {
        let next = append(ty, accumulated.clone(), value)?;
        bound.bind(selector.key_set(), key);
        let res = enumerate(ty, rest, bound, next, visitor);
        bound.unbind();
        res?;
    }
    Ok(())
}

fn append(
    ty: &AttrType,
    accumulated: Option<AttrValue>,
    value: Option<&AttrValue>,
) -> anyhow::Result<Option<AttrValue>> {
    match (accumulated, value) {
        (None, value) => Ok(value.cloned()),
        (accumulated, None) => Ok(accumulated),
        (Some(accumulated), Some(value)) => Ok(Some(ty.concat([accumulated, value.clone()])?)),
    }
}

#[cfg(test)]
mod tests {
    use crate::attrs::attr_type::AttrType;
    use crate::attrs::selector_list::SelectorList;
    use crate::attrs::testing::testing_coercion_ctx;
    use crate::mapper::enumerate::enumerate_selector_list;

    fn enumerate(ty: &AttrType, raw: serde_json::Value) -> Vec<String> {
        let list = SelectorList::coerce(ty, &testing_coercion_ctx(), &raw).unwrap();
        let mut res = Vec::new();
        enumerate_selector_list("test", &list, &mut |v| {
            res.push(v.to_string());
            Ok(())
        })
        .unwrap();
        res
    }

    fn select(entries: serde_json::Value) -> serde_json::Value {
        serde_json::json!({"__type": "selector", "entries": entries})
    }

    fn concat(items: Vec<serde_json::Value>) -> serde_json::Value {
        serde_json::json!({"__type": "concat", "items": items})
    }

    #[test]
    fn test_literal() {
        assert_eq!(
            vec![r#"["a"]"#],
            enumerate(&AttrType::list(AttrType::string()), serde_json::json!(["a"]))
        );
        assert_eq!(
            Vec::<String>::new(),
            enumerate(&AttrType::dep(), serde_json::Value::Null)
        );
    }

    #[test]
    fn test_independent_selects_multiply() {
        let ty = AttrType::list(AttrType::string());
        let raw = concat(vec![
            select(serde_json::json!({"//c:a": ["a"], "DEFAULT": ["d"]})),
            select(serde_json::json!({"//c:x": ["x"], "//c:y": ["y"], "DEFAULT": []})),
        ]);
        assert_eq!(
            vec![
                r#"["a", "x"]"#,
                r#"["a", "y"]"#,
                r#"["a"]"#,
                r#"["d", "x"]"#,
                r#"["d", "y"]"#,
                r#"["d"]"#,
            ],
            enumerate(&ty, raw)
        );
    }

    #[test]
    fn test_same_key_set_in_different_order_collapses() {
        let ty = AttrType::list(AttrType::string());
        let raw = concat(vec![
            select(serde_json::json!({"//c:a": ["a1"], "//c:b": ["b1"]})),
            serde_json::json!(["mid"]),
            select(serde_json::json!({"//c:b": ["b2"], "//c:a": ["a2"]})),
        ]);
        assert_eq!(
            vec![r#"["a1", "mid", "a2"]"#, r#"["b1", "mid", "b2"]"#],
            enumerate(&ty, raw)
        );
    }

    #[test]
    fn test_unset_branch_without_default_is_skipped() {
        let raw = select(serde_json::json!({"//c:a": "//x:y", "DEFAULT": null}));
        assert_eq!(
            vec![r#""root//x:y""#],
            enumerate(&AttrType::label(), raw)
        );
    }

    #[test]
    fn test_dict_later_wins() {
        let ty = AttrType::dict(AttrType::string(), AttrType::int());
        let raw = concat(vec![
            serde_json::json!({"k": 1}),
            select(serde_json::json!({"//c:a": {"k": 2}, "DEFAULT": {}})),
        ]);
        assert_eq!(vec![r#"{"k": 2}"#, r#"{"k": 1}"#], enumerate(&ty, raw));
    }

    #[test]
    fn test_values_are_not_deduplicated() {
        let raw = select(serde_json::json!({"//c:a": 1, "//c:b": 1, "DEFAULT": 2}));
        assert_eq!(vec!["1", "1", "2"], enumerate(&AttrType::int(), raw));
    }

    #[test]
    fn test_literal_chain_concatenated() {
        let ty = AttrType::list(AttrType::int());
        assert_eq!(
            vec!["[1, 2, 3]"],
            enumerate(
                &ty,
                concat(vec![serde_json::json!([1]), serde_json::json!([2, 3])])
            )
        );
    }
}
