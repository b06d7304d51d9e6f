/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is dual-licensed under either the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree or the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree. You may select, at your option, one of the
 * above-listed licenses.
 */

use buck2_select::attrs::attr_type::AttrType;
use buck2_select::config::SelectConfig;
use buck2_select::mapper::AttributeMapper;

use crate::util::concat;
use crate::util::rule_with;
use crate::util::select;

fn duplicates(raw: serde_json::Value) -> anyhow::Result<Vec<String>> {
    let mapper = AttributeMapper::aggregating(
        rule_with("deps", AttrType::list(AttrType::dep()), raw)?,
        SelectConfig::default(),
    );
    Ok(mapper
        .find_duplicate_references("deps")?
        .into_iter()
        .map(|l| l.to_string())
        .collect())
}

#[test]
fn duplicate_within_one_branch_is_found() -> anyhow::Result<()> {
    let raw = select(serde_json::json!({"//c:a": ["//x:x", "//x:x"], "DEFAULT": ["//x:y"]}));
    assert_eq!(vec!["root//x:x"], duplicates(raw)?);
    Ok(())
}

#[test]
fn same_reference_in_two_branches_of_one_select_is_not_a_duplicate() -> anyhow::Result<()> {
    let raw = select(serde_json::json!({"//c:a": ["//x:x"], "DEFAULT": ["//x:x"]}));
    assert!(duplicates(raw)?.is_empty());
    Ok(())
}

#[test]
fn duplicate_within_one_branch_among_many_selects_is_found() -> anyhow::Result<()> {
    let raw = concat(vec![
        select(serde_json::json!({"//c:a": ["//x:x", "//x:x"], "DEFAULT": []})),
        select(serde_json::json!({"//c:b": ["//x:y"], "DEFAULT": []})),
    ]);
    assert_eq!(vec!["root//x:x"], duplicates(raw)?);
    Ok(())
}

fn exact_duplicates(raw: serde_json::Value) -> anyhow::Result<Vec<String>> {
    let mapper = AttributeMapper::aggregating(
        rule_with("deps", AttrType::list(AttrType::dep()), raw)?,
        SelectConfig {
            exact_duplicate_check_max_selects: 8,
            ..SelectConfig::default()
        },
    );
    Ok(mapper
        .find_duplicate_references("deps")?
        .into_iter()
        .map(|l| l.to_string())
        .collect())
}

/// With more than one select, a reference mentioned by two selects is reported
/// without checking whether their branches can be active together. Here both
/// selects branch on `a` and `b`, so `x` is listed once in every configuration,
/// yet the per-select check reports it.
#[test]
fn cross_selector_duplicates_are_over_approximated() -> anyhow::Result<()> {
    let raw = concat(vec![
        select(serde_json::json!({"//c:a": ["//x:x"], "//c:b": []})),
        select(serde_json::json!({"//c:a": [], "//c:b": ["//x:x"]})),
    ]);
    assert_eq!(vec!["root//x:x"], duplicates(raw.clone())?);
    assert!(exact_duplicates(raw)?.is_empty());
    Ok(())
}

#[test]
fn over_approximation_reports_references_that_never_meet() -> anyhow::Result<()> {
    // Same key set: the selects always take the same branch, so `x` can never
    // be listed twice, yet the per-select check still reports it.
    let raw = concat(vec![
        select(serde_json::json!({"//c:a": ["//x:x"], "DEFAULT": []})),
        select(serde_json::json!({"//c:a": [], "DEFAULT": ["//x:x"]})),
    ]);
    assert_eq!(vec!["root//x:x"], duplicates(raw.clone())?);
    assert!(exact_duplicates(raw)?.is_empty());
    Ok(())
}

#[test]
fn independent_selects_can_both_list_a_reference() -> anyhow::Result<()> {
    // `a` and `b` may hold together, so `x` really can appear twice.
    let raw = concat(vec![
        select(serde_json::json!({"//c:a": ["//x:x"], "DEFAULT": []})),
        select(serde_json::json!({"//c:b": ["//x:x"], "DEFAULT": []})),
    ]);
    assert_eq!(vec!["root//x:x"], duplicates(raw.clone())?);
    assert_eq!(vec!["root//x:x"], exact_duplicates(raw)?);
    Ok(())
}

#[test]
fn literal_and_select_duplicate() -> anyhow::Result<()> {
    let raw = concat(vec![
        serde_json::json!(["//x:x"]),
        select(serde_json::json!({"//c:a": ["//x:x"], "DEFAULT": ["//x:z"]})),
    ]);
    assert_eq!(vec!["root//x:x"], duplicates(raw)?);
    Ok(())
}
