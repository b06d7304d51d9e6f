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
use std::fmt::Display;

use allocative::Allocative;
use anyhow::Context;
use dupe::Dupe;
use gazebo::prelude::*;

use crate::attrs::attr_type::AttrType;
use crate::attrs::attr_value::AttrValue;
use crate::attrs::coercion_context::AttrCoercionContext;
use crate::attrs::condition::ConditionKey;
use crate::attrs::resolve::ConditionResolver;
use crate::attrs::selector::Selector;
use crate::error::SelectErrorKind;
use crate::target_label::TargetLabel;

const TYPE_FIELD: &str = "__type";

#[derive(Debug, thiserror::Error)]
pub(crate) enum SelectorListError {
    #[error("`select()` cannot be added to attribute of type `{0}`, only lists and dicts support `+`")]
    UnsupportedConcatenation(String),
    #[error("selector list with no items (internal error)")]
    Empty,
    #[error("select of type `{0}` in attribute of type `{1}` (internal error)")]
    TypeMismatch(String, String),
    #[error("malformed `{0}` expression: {1}")]
    Malformed(&'static str, String),
}

impl SelectorListError {
    pub(crate) fn kind(&self) -> SelectErrorKind {
        match self {
            SelectorListError::UnsupportedConcatenation(..) => {
                SelectErrorKind::UnsupportedConcatenation
            }
            SelectorListError::Empty | SelectorListError::TypeMismatch(..) => {
                SelectErrorKind::Internal
            }
            SelectorListError::Malformed(..) => SelectErrorKind::Conversion,
        }
    }
}

/// The full expression of one attribute: `v1 + v2 + ... + vn`, where each item
/// is a `select()` or a plain value stored as an unconditional select.
///
/// The chain is kept unresolved; see [`SelectorList::resolve`].
#[derive(Debug, Clone, Allocative)]
pub struct SelectorList {
    ty: AttrType,
    selectors: Box<[Selector]>,
}

impl SelectorList {
    pub fn new(ty: &AttrType, selectors: Vec<Selector>) -> anyhow::Result<SelectorList> {
        if selectors.is_empty() {
            return Err(SelectorListError::Empty.into());
        }
        if selectors.len() > 1 && !ty.supports_concat() {
            return Err(SelectorListError::UnsupportedConcatenation(ty.to_string()).into());
        }
        for s in &selectors {
            if s.ty() != ty {
                return Err(
                    SelectorListError::TypeMismatch(s.ty().to_string(), ty.to_string()).into(),
                );
            }
        }
        Ok(SelectorList {
            ty: ty.dupe(),
            selectors: selectors.into_boxed_slice(),
        })
    }

    /// A plain value. `None` means the attribute is explicitly unset.
    pub fn literal(ty: &AttrType, value: Option<AttrValue>) -> anyhow::Result<SelectorList> {
        Self::new(ty, vec![Selector::unconditional(ty, value)?])
    }

    /// Coerces a raw attribute expression.
    ///
    /// A raw expression is a literal, a `{"__type": "selector", "entries": {..}}`
    /// object or a `{"__type": "concat", "items": [..]}` object. Nested concats
    /// are flattened. `null` is an explicitly unset value.
    pub fn coerce(
        ty: &AttrType,
        ctx: &dyn AttrCoercionContext,
        raw: &serde_json::Value,
    ) -> anyhow::Result<SelectorList> {
        let mut items = Vec::new();
        Self::collect_concat_items(raw, &mut items)?;
        // Checked before any item is converted so the error names the real problem.
        if items.len() > 1 && !ty.supports_concat() {
            return Err(SelectorListError::UnsupportedConcatenation(ty.to_string()).into());
        }
        let selectors = items.try_map(|item| Self::coerce_item(ty, ctx, item))?;
        Self::new(ty, selectors)
    }

    fn collect_concat_items<'v>(
        raw: &'v serde_json::Value,
        items: &mut Vec<&'v serde_json::Value>,
    ) -> anyhow::Result<()> {
        if Self::expression_type(raw) != Some("concat") {
            items.push(raw);
            return Ok(());
        }
        let Some(concat_items) = raw.get("items").and_then(|v| v.as_array()) else {
            return Err(SelectorListError::Malformed(
                "concat",
                "expected an `items` list".to_owned(),
            )
            .into());
        };
        if concat_items.is_empty() {
            return Err(
                SelectorListError::Malformed("concat", "`items` is empty".to_owned()).into(),
            );
        }
        for item in concat_items {
            Self::collect_concat_items(item, items)?;
        }
        Ok(())
    }

    fn expression_type(raw: &serde_json::Value) -> Option<&str> {
        raw.as_object()?.get(TYPE_FIELD)?.as_str()
    }

    fn coerce_item(
        ty: &AttrType,
        ctx: &dyn AttrCoercionContext,
        item: &serde_json::Value,
    ) -> anyhow::Result<Selector> {
        match Self::expression_type(item) {
            Some("selector") => {
                let Some(entries) = item.get("entries").and_then(|v| v.as_object()) else {
                    return Err(SelectorListError::Malformed(
                        "select",
                        "expected an `entries` dict".to_owned(),
                    )
                    .into());
                };
                Selector::coerce(ty, ctx, entries.iter().map(|(k, v)| (k.as_str(), v)))
            }
            Some(other) => Err(SelectorListError::Malformed(
                "select",
                format!("unknown expression type `{}`", other),
            )
            .into()),
            None if item.is_null() => Selector::unconditional(ty, None),
            None => Selector::unconditional(
                ty,
                Some(
                    ty.convert(item, ctx)
                        .with_context(|| format!("when coercing `{}`", item))?,
                ),
            ),
        }
    }

    pub fn ty(&self) -> &AttrType {
        &self.ty
    }

    pub fn selectors(&self) -> &[Selector] {
        &self.selectors
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    /// Whether any item in the chain is a real `select()`.
    pub fn is_configurable(&self) -> bool {
        self.selectors.iter().any(|s| !s.is_unconditional())
    }

    /// Number of real `select()`s in the chain.
    pub fn select_count(&self) -> usize {
        self.selectors
            .iter()
            .filter(|s| !s.is_unconditional())
            .count()
    }

    /// Resolves the chain to one value given the active branch of every select.
    ///
    /// `pick` is not called for plain values. A key returned by `pick` that the
    /// select does not have is an error.
    pub fn resolve(
        &self,
        pick: &mut dyn FnMut(&Selector) -> anyhow::Result<ConditionKey>,
    ) -> anyhow::Result<Option<AttrValue>> {
        if let [single] = &*self.selectors {
            if single.is_unconditional() {
                return Ok(single.default_value());
            }
        }

        let mut values = Vec::with_capacity(self.selectors.len());
        for selector in self.selectors.iter() {
            let key = if selector.is_unconditional() {
                ConditionKey::Default
            } else {
                pick(selector)?
            };
            if let Some(value) = selector.value_for_key(&key)? {
                values.push(value.clone());
            }
        }
        match values.len() {
            0 => Ok(None),
            1 => Ok(values.pop()),
            _ => Ok(Some(self.ty.concat(values)?)),
        }
    }

    pub fn resolve_with(&self, resolver: &dyn ConditionResolver) -> anyhow::Result<Option<AttrValue>> {
        self.resolve(&mut |selector| resolver.resolve(selector))
    }

    /// Condition labels of every select in the chain, in order, with repeats.
    pub fn condition_keys(&self) -> impl Iterator<Item = &TargetLabel> {
        self.selectors.iter().flat_map(|s| s.condition_labels())
    }

    fn item_to_json(selector: &Selector) -> anyhow::Result<serde_json::Value> {
        if selector.is_unconditional() {
            match selector.entries().next() {
                Some((_, Some(v))) if selector.is_value_set(&ConditionKey::Default) => v.to_json(),
                _ => Ok(serde_json::Value::Null),
            }
        } else {
            selector.to_json()
        }
    }

    /// The raw expression this list was coerced from, up to label normalization.
    pub fn to_json(&self) -> anyhow::Result<serde_json::Value> {
        if let [single] = &*self.selectors {
            return Self::item_to_json(single);
        }
        let items = self.selectors.try_map(Self::item_to_json)?;
        Ok(serde_json::Value::Object(serde_json::Map::from_iter([
            (
                TYPE_FIELD.to_owned(),
                serde_json::Value::String("concat".to_owned()),
            ),
            ("items".to_owned(), serde_json::Value::Array(items)),
        ])))
    }
}

impl Display for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, selector) in self.selectors.iter().enumerate() {
            if i != 0 {
                write!(f, " + ")?;
            }
            if selector.is_unconditional() {
                match selector.get(&ConditionKey::Default) {
                    Some(v) if selector.is_value_set(&ConditionKey::Default) => {
                        Display::fmt(v, f)?
                    }
                    _ => write!(f, "None")?,
                }
            } else {
                Display::fmt(selector, f)?;
            }
        }
        Ok(())
    }
}
