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
use buck2_select::attrs::selector_list::SelectorList;
use buck2_select::attrs::testing::testing_coercion_ctx;
use buck2_select::error::SelectErrorKind;
use buck2_select::error::select_error_kind;

use crate::util::concat;
use crate::util::rule_with;
use crate::util::select;
use crate::util::string_list;

fn coerce_error(ty: AttrType, raw: serde_json::Value) -> Option<SelectErrorKind> {
    let err = rule_with("attr", ty, raw).unwrap_err();
    select_error_kind(&err)
}

#[test]
fn chaining_selects_on_scalar_fails_at_construction() {
    let raw = concat(vec![
        select(serde_json::json!({"//c:a": 1, "DEFAULT": 2})),
        select(serde_json::json!({"//c:b": 3, "DEFAULT": 4})),
    ]);
    assert_eq!(
        Some(SelectErrorKind::UnsupportedConcatenation),
        coerce_error(AttrType::int(), raw)
    );
}

#[test]
fn wrong_branch_shape_fails_at_construction() {
    let raw = select(serde_json::json!({"//c:a": ["a"], "DEFAULT": "b"}));
    assert_eq!(
        Some(SelectErrorKind::Conversion),
        coerce_error(string_list(), raw)
    );
}

#[test]
fn unparseable_reference_fails_at_construction() {
    let raw = serde_json::json!(["//ok:label", "not a label"]);
    assert_eq!(
        Some(SelectErrorKind::Conversion),
        coerce_error(AttrType::list(AttrType::dep()), raw)
    );
}

#[test]
fn duplicate_condition_fails_at_construction() {
    let raw = select(serde_json::json!({"//c:a": 1, "root//c:a": 2}));
    assert_eq!(
        Some(SelectErrorKind::DuplicateConditionKey),
        coerce_error(AttrType::int(), raw)
    );
}

#[test]
fn coerced_expression_round_trips_through_json() -> anyhow::Result<()> {
    let ctx = testing_coercion_ctx();
    let raw = concat(vec![
        serde_json::json!(["//a:b"]),
        select(serde_json::json!({"//c:a": [":x"], "DEFAULT": null})),
    ]);
    let ty = AttrType::list(AttrType::dep());
    let list = SelectorList::coerce(&ty, &ctx, &raw)?;
    let json = list.to_json()?;
    let again = SelectorList::coerce(&ty, &ctx, &json)?;
    assert_eq!(json, again.to_json()?);
    assert_eq!(list.to_string(), again.to_string());
    Ok(())
}
