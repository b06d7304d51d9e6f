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
use gazebo::prelude::SliceExt;

use crate::attrs::attr_type::AttrType;
use crate::attrs::attr_type::CoercionError;
use crate::attrs::attr_value::AttrValue;
use crate::attrs::coercion_context::AttrCoercionContext;

#[derive(Debug, Eq, PartialEq, Hash, Allocative)]
pub struct ListAttrType {
    pub inner: AttrType,
}

impl ListAttrType {
    pub fn new(inner: AttrType) -> Self {
        Self { inner }
    }

    pub(crate) fn coerce_item(
        &self,
        value: &serde_json::Value,
        ctx: &dyn AttrCoercionContext,
    ) -> anyhow::Result<AttrValue> {
        match value.as_array() {
            Some(items) => Ok(AttrValue::List(
                items.try_map(|v| self.inner.convert(v, ctx))?,
            )),
            None => Err(CoercionError::type_error("list", value).into()),
        }
    }

    /// Concatenation keeps the order and keeps duplicates.
    pub(crate) fn concat(
        &self,
        ty: &AttrType,
        items: impl IntoIterator<Item = AttrValue>,
    ) -> anyhow::Result<AttrValue> {
        let mut res = Vec::new();
        for item in items {
            match item {
                AttrValue::List(xs) => res.extend(xs),
                item => {
                    return Err(CoercionError::ValueTypeMismatch(
                        item.to_string(),
                        ty.to_string(),
                    )
                    .into());
                }
            }
        }
        Ok(AttrValue::List(res))
    }

    pub(crate) fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attrs.list({})", self.inner)
    }
}
