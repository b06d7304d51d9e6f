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
use buck2_select::attrs::attr_value::AttrValue;
use buck2_select::config::SelectConfig;
use buck2_select::mapper::AttributeMapper;
use buck2_select::mapper::flatten::flatten;

use crate::util::rule_with;
use crate::util::select;
use crate::util::string_list;
use crate::util::strings;

#[test]
fn flatten_list_concatenates_with_duplicates() -> anyhow::Result<()> {
    assert_eq!(
        Some(strings(&["a", "b", "b", "c"])),
        flatten(&string_list(), vec![strings(&["a", "b"]), strings(&["b", "c"])])?
    );
    Ok(())
}

#[test]
fn merged_value_of_select() -> anyhow::Result<()> {
    let raw = select(serde_json::json!({"//c:x": ["a", "b"], "DEFAULT": ["b", "c"]}));
    let mapper =
        AttributeMapper::aggregating(rule_with("srcs", string_list(), raw)?, SelectConfig::default());
    assert_eq!(
        Some(strings(&["a", "b", "b", "c"])),
        mapper.merged_value("srcs")?
    );
    Ok(())
}

#[test]
fn flatten_scalar_with_many_values_is_unknown() -> anyhow::Result<()> {
    let raw = select(serde_json::json!({"//c:x": true, "DEFAULT": false}));
    let mapper =
        AttributeMapper::aggregating(rule_with("b", AttrType::bool(), raw)?, SelectConfig::default());
    assert_eq!(None, mapper.merged_value("b")?);
    assert_eq!(
        Some(AttrValue::Bool(true)),
        flatten(&AttrType::bool(), vec![AttrValue::Bool(true)])?
    );
    Ok(())
}
