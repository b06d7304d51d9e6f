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
use buck2_select::attrs::spec::RuleAttributes;
use buck2_select::attrs::testing::testing_coercion_ctx;

pub(crate) fn select(entries: serde_json::Value) -> serde_json::Value {
    serde_json::json!({"__type": "selector", "entries": entries})
}

pub(crate) fn concat(items: Vec<serde_json::Value>) -> serde_json::Value {
    serde_json::json!({"__type": "concat", "items": items})
}

pub(crate) fn attr(
    name: &str,
    ty: AttrType,
    raw: serde_json::Value,
) -> anyhow::Result<(String, Attribute)> {
    Ok((
        name.to_owned(),
        Attribute::coerce(name, &ty, &testing_coercion_ctx(), &raw)?,
    ))
}

/// A rule with a single explicit attribute.
pub(crate) fn rule_with(
    name: &str,
    ty: AttrType,
    raw: serde_json::Value,
) -> anyhow::Result<Arc<RuleAttributes>> {
    Ok(Arc::new(RuleAttributes::new(vec![attr(name, ty, raw)?])?))
}

pub(crate) fn strings(xs: &[&str]) -> AttrValue {
    AttrValue::List(xs.iter().map(|x| AttrValue::string(x)).collect())
}

pub(crate) fn string_list() -> AttrType {
    AttrType::list(AttrType::string())
}
