/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is dual-licensed under either the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree or the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree. You may select, at your option, one of the
 * above-listed licenses.
 */

use std::sync::Arc;

use buck2_select::attrs::attr_type::AttrType;
use buck2_select::attrs::attr_value::AttrValue;
use buck2_select::attrs::spec::Attribute;
use buck2_select::attrs::spec::ComputedDefault;
use buck2_select::attrs::spec::RuleAttributes;
use buck2_select::config::SelectConfig;
use buck2_select::error::SelectErrorKind;
use buck2_select::error::select_error_kind;
use buck2_select::mapper::AttributeMapper;

use crate::util::attr;
use crate::util::concat;
use crate::util::rule_with;
use crate::util::select;
use crate::util::string_list;
use crate::util::strings;

fn aggregating(rule: Arc<RuleAttributes>) -> AttributeMapper {
    AttributeMapper::aggregating(rule, SelectConfig::default())
}

#[test]
fn visit_all_values_is_idempotent() -> anyhow::Result<()> {
    let raw = concat(vec![
        select(serde_json::json!({"//c:a": ["a"], "//c:b": ["b"], "DEFAULT": []})),
        serde_json::json!(["common"]),
        select(serde_json::json!({"//c:x": ["x"], "DEFAULT": ["y"]})),
    ]);
    let mapper = aggregating(rule_with("srcs", string_list(), raw)?);
    let first = mapper.all_values("srcs")?;
    let second = mapper.all_values("srcs")?;
    assert_eq!(6, first.len());
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn single_select_enumerates_branches_in_order() -> anyhow::Result<()> {
    let raw = select(serde_json::json!({"//c:a": "x", "//c:b": "y"}));
    let mapper = aggregating(rule_with("name", AttrType::string(), raw)?);
    assert_eq!(
        vec![AttrValue::string("x"), AttrValue::string("y")],
        mapper.all_values("name")?
    );
    Ok(())
}

/// Strings are scalars and cannot be concatenated, so `"p" + "1"` is written
/// with string lists: the values are `["p", "1"]` and `["q", "2"]`.
#[test]
fn selects_sharing_a_key_set_take_the_same_branch() -> anyhow::Result<()> {
    let raw = concat(vec![
        select(serde_json::json!({"//c:a": ["p"], "//c:b": ["q"]})),
        select(serde_json::json!({"//c:a": ["1"], "//c:b": ["2"]})),
    ]);
    let mapper = aggregating(rule_with("srcs", string_list(), raw)?);
    assert_eq!(
        vec![strings(&["p", "1"]), strings(&["q", "2"])],
        mapper.all_values("srcs")?
    );
    Ok(())
}

#[test]
fn cardinality_is_bounded_by_distinct_key_sets() -> anyhow::Result<()> {
    // Four selects but only two distinct key sets, with 3 and 2 branches.
    let three = || select(serde_json::json!({"//c:a": ["a"], "//c:b": ["b"], "DEFAULT": ["d"]}));
    let two = || select(serde_json::json!({"//c:x": ["x"], "DEFAULT": []}));
    let raw = concat(vec![three(), two(), three(), two()]);
    let mapper = aggregating(rule_with("srcs", string_list(), raw)?);
    let values = mapper.all_values("srcs")?;
    assert_eq!(6, values.len());
    assert_eq!(strings(&["a", "x", "a", "x"]), values[0]);
    assert_eq!(strings(&["d", "d"]), values[5]);
    Ok(())
}

#[test]
fn literal_needs_no_enumeration() -> anyhow::Result<()> {
    let mapper = aggregating(rule_with("srcs", string_list(), serde_json::json!(["a"]))?);
    assert!(!mapper.is_configurable("srcs")?);
    assert_eq!(vec![strings(&["a"])], mapper.all_values("srcs")?);
    assert_eq!(Some(strings(&["a"])), mapper.get_one("srcs")?);
    Ok(())
}

fn computed_rule() -> anyhow::Result<Arc<RuleAttributes>> {
    let joined = ComputedDefault::new(vec!["os".to_owned(), "cpu".to_owned()], |inputs| {
        let os = inputs.get("os")?.and_then(|v| v.unpack_str()).unwrap_or("");
        let cpu = inputs.get("cpu")?.and_then(|v| v.unpack_str()).unwrap_or("");
        Ok(AttrValue::string(&format!("{}-{}", os, cpu)))
    });
    let os_only = ComputedDefault::new(vec!["platform".to_owned()], |inputs| {
        let platform = inputs.get("platform")?.and_then(|v| v.unpack_str()).unwrap_or("");
        Ok(AttrValue::string(
            platform.split('-').next().unwrap_or_default(),
        ))
    });
    Ok(Arc::new(RuleAttributes::new(vec![
        attr(
            "os",
            AttrType::string(),
            select(serde_json::json!({"//os:linux": "linux", "//os:mac": "mac"})),
        )?,
        attr(
            "cpu",
            AttrType::string(),
            select(serde_json::json!({"//cpu:arm": "arm", "//cpu:x86": "x86", "DEFAULT": "any"})),
        )?,
        (
            "platform".to_owned(),
            Attribute::computed(AttrType::string(), joined),
        ),
        (
            "platform_os".to_owned(),
            Attribute::computed(AttrType::string(), os_only),
        ),
    ])?))
}

#[test]
fn computed_default_enumerates_cartesian_product() -> anyhow::Result<()> {
    let mapper = aggregating(computed_rule()?);
    let values = mapper.all_values("platform")?;
    assert_eq!(
        vec![
            "linux-arm",
            "linux-x86",
            "linux-any",
            "mac-arm",
            "mac-x86",
            "mac-any",
        ],
        values
            .iter()
            .filter_map(|v| v.unpack_str())
            .collect::<Vec<_>>()
    );
    Ok(())
}

#[test]
fn nested_computed_default_deduplicates_results() -> anyhow::Result<()> {
    let mapper = aggregating(computed_rule()?);
    assert_eq!(
        vec![AttrValue::string("linux"), AttrValue::string("mac")],
        mapper.all_values("platform_os")?
    );
    Ok(())
}

#[test]
fn computed_default_budget_is_shared_by_nested_defaults() -> anyhow::Result<()> {
    // `platform` alone needs 6 evaluations. `platform_os` needs those plus one
    // per value of `platform`.
    let config = SelectConfig {
        computed_default_limit: 6,
        ..SelectConfig::default()
    };
    let mapper = AttributeMapper::aggregating(computed_rule()?, config);
    assert_eq!(6, mapper.all_values("platform")?.len());
    let err = mapper.all_values("platform_os").unwrap_err();
    assert_eq!(
        Some(SelectErrorKind::ComputationBudgetExceeded),
        select_error_kind(&err)
    );
    Ok(())
}
