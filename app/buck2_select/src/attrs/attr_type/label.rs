/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is dual-licensed under either the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree or the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree. You may select, at your option, one of the
 * above-listed licenses.
 */

use std::fmt;

use allocative::Allocative;
use anyhow::Context;
use dupe::Dupe;

use crate::attrs::attr_type::CoercionError;
use crate::attrs::attr_value::AttrValue;
use crate::attrs::coercion_context::AttrCoercionContext;

/// A plain reference to another target.
#[derive(Debug, Clone, Copy, Dupe, Eq, PartialEq, Hash, Allocative)]
pub struct LabelAttrType;

/// A dependency on another target.
///
/// Coerces exactly like a label; kept separate so that tooling can tell
/// dependencies from other references when it prints the rule definition.
#[derive(Debug, Clone, Copy, Dupe, Eq, PartialEq, Hash, Allocative)]
pub struct DepAttrType;

fn coerce_label(
    value: &serde_json::Value,
    ctx: &dyn AttrCoercionContext,
) -> anyhow::Result<AttrValue> {
    let s = value
        .as_str()
        .ok_or_else(|| CoercionError::type_error("label", value))?;
    Ok(AttrValue::Label(
        ctx.coerce_target_label(s)
            .with_context(|| format!("when coercing label `{}`", s))?,
    ))
}

impl LabelAttrType {
    pub(crate) fn coerce_item(
        &self,
        value: &serde_json::Value,
        ctx: &dyn AttrCoercionContext,
    ) -> anyhow::Result<AttrValue> {
        coerce_label(value, ctx)
    }

    pub(crate) fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attrs.label()")
    }
}

impl DepAttrType {
    pub(crate) fn coerce_item(
        &self,
        value: &serde_json::Value,
        ctx: &dyn AttrCoercionContext,
    ) -> anyhow::Result<AttrValue> {
        coerce_label(value, ctx)
    }

    pub(crate) fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attrs.dep()")
    }
}
