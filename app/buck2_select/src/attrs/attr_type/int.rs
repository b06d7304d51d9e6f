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
use dupe::Dupe;

use crate::attrs::attr_type::CoercionError;
use crate::attrs::attr_value::AttrValue;

#[derive(Debug, Clone, Copy, Dupe, Eq, PartialEq, Hash, Allocative)]
pub struct IntAttrType;

impl IntAttrType {
    pub(crate) fn coerce_item(&self, value: &serde_json::Value) -> anyhow::Result<AttrValue> {
        match value {
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(AttrValue::Int(i)),
                // Floats and integers above `i64::MAX`.
                None => Err(CoercionError::IntOutOfRange(n.to_string()).into()),
            },
            _ => Err(CoercionError::type_error("int", value).into()),
        }
    }

    pub(crate) fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attrs.int()")
    }
}
