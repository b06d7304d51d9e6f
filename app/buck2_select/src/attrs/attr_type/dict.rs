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
use starlark_map::small_map::SmallMap;

use crate::attrs::attr_type::AttrType;
use crate::attrs::attr_type::CoercionError;
use crate::attrs::attr_value::AttrValue;
use crate::attrs::coercion_context::AttrCoercionContext;

#[derive(Debug, Eq, PartialEq, Hash, Allocative)]
pub struct DictAttrType {
    pub key: AttrType,
    pub value: AttrType,
}

impl DictAttrType {
    pub fn new(key: AttrType, value: AttrType) -> Self {
        Self { key, value }
    }

    pub(crate) fn coerce_item(
        &self,
        value: &serde_json::Value,
        ctx: &dyn AttrCoercionContext,
    ) -> anyhow::Result<AttrValue> {
        let map = value
            .as_object()
            .ok_or_else(|| CoercionError::type_error("dict", value))?;
        let mut res = Vec::with_capacity(map.len());
        for (k, v) in map {
            let k = self
                .key
                .convert(&serde_json::Value::String(k.clone()), ctx)?;
            let v = self.value.convert(v, ctx)?;
            res.push((k, v));
        }
        Ok(AttrValue::Dict(res))
    }

    /// Merges left to right. A key keeps its first position and takes its last value.
    pub(crate) fn concat(
        &self,
        ty: &AttrType,
        items: impl IntoIterator<Item = AttrValue>,
    ) -> anyhow::Result<AttrValue> {
        let mut res: SmallMap<AttrValue, AttrValue> = SmallMap::new();
        for item in items {
            match item {
                AttrValue::Dict(entries) => {
                    for (k, v) in entries {
                        res.insert(k, v);
                    }
                }
                item => {
                    return Err(CoercionError::ValueTypeMismatch(
                        item.to_string(),
                        ty.to_string(),
                    )
                    .into());
                }
            }
        }
        Ok(AttrValue::Dict(res.into_iter().collect()))
    }

    pub(crate) fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attrs.dict({}, {})", self.key, self.value)
    }
}
