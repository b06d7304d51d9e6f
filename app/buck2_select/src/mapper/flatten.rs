/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is dual-licensed under either the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree or the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree. You may select, at your option, one of the
 * above-listed licenses.
 */

use crate::attrs::attr_type::AttrType;
use crate::attrs::attr_value::AttrValue;

/// Merges all possible values of an attribute into one approximate value, for
/// display and query output only.
///
/// A single value is returned as is. Lists are concatenated and dicts merged
/// left to right. Several values of a scalar type have no merge and give `None`.
pub fn flatten(ty: &AttrType, mut values: Vec<AttrValue>) -> anyhow::Result<Option<AttrValue>> {
    match values.len() {
        0 => Ok(None),
        1 => Ok(values.pop()),
        _ if !ty.supports_concat() => Ok(None),
        _ => Ok(Some(ty.concat(values)?)),
    }
}
