/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is dual-licensed under either the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree or the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree. You may select, at your option, one of the
 * above-listed licenses.
 */

use std::collections::HashSet;
use std::fmt;
use std::fmt::Display;

use allocative::Allocative;
use anyhow::Context;
use dupe::Dupe;
use starlark_map::StarlarkHasherBuilder;
use starlark_map::small_map::SmallMap;
use starlark_map::small_set::SmallSet;

use crate::attrs::attr_type::AttrType;
use crate::attrs::attr_value::AttrValue;
use crate::attrs::coercion_context::AttrCoercionContext;
use crate::attrs::condition::ConditionKey;
use crate::attrs::condition::SelectorKeySet;
use crate::error::SelectErrorKind;
use crate::target_label::TargetLabel;

#[derive(Debug, thiserror::Error)]
pub(crate) enum SelectorError {
    #[error("duplicate key `{0}` in `select()`")]
    DuplicateKey(String),
    #[error("`select()` must have at least one condition")]
    Empty,
    #[error("Condition `{0}` is not a key of `{1}` (internal error)")]
    UnknownConditionKey(String, String),
}

impl SelectorError {
    pub(crate) fn kind(&self) -> SelectErrorKind {
        match self {
            SelectorError::DuplicateKey(..) => SelectErrorKind::DuplicateConditionKey,
            SelectorError::Empty => SelectErrorKind::Conversion,
            SelectorError::UnknownConditionKey(..) => SelectErrorKind::UnknownConditionKey,
        }
    }
}

/// One `select({condition: value, ...})` expression.
///
/// Entries keep the order they were written in. A branch whose value was
/// explicitly unset holds the type default and is remembered in `unset_keys`.
#[derive(Debug, Clone, Allocative)]
pub struct Selector {
    ty: AttrType,
    entries: SmallMap<ConditionKey, Option<AttrValue>>,
    unset_keys: SmallSet<ConditionKey>,
    has_default: bool,
    key_set: SelectorKeySet,
}

impl Selector {
    /// Builds a select from already coerced values. `None` marks a branch as
    /// explicitly unset.
    pub fn new(
        ty: &AttrType,
        entries: Vec<(ConditionKey, Option<AttrValue>)>,
    ) -> anyhow::Result<Selector> {
        if entries.is_empty() {
            return Err(SelectorError::Empty.into());
        }
        Self::check_all_keys_unique(&entries)?;

        let mut map = SmallMap::with_capacity(entries.len());
        let mut unset_keys = SmallSet::new();
        let mut has_default = false;
        for (key, value) in entries {
            if key.is_default() {
                has_default = true;
            }
            let value = match value {
                Some(value) => {
                    ty.check(&value)
                        .with_context(|| format!("in `select()` branch `{}`", key))?;
                    Some(value)
                }
                None => {
                    unset_keys.insert(key.dupe());
                    ty.default_value()
                }
            };
            map.insert(key, value);
        }
        let key_set = SelectorKeySet::new(map.keys());
        Ok(Selector {
            ty: ty.dupe(),
            entries: map,
            unset_keys,
            has_default,
            key_set,
        })
    }

    /// A plain value, represented as a select with only the default branch.
    pub fn unconditional(ty: &AttrType, value: Option<AttrValue>) -> anyhow::Result<Selector> {
        Self::new(ty, vec![(ConditionKey::Default, value)])
    }

    /// Coerces raw `(condition, value)` pairs. A JSON `null` value marks the
    /// branch as explicitly unset.
    pub fn coerce<'v>(
        ty: &AttrType,
        ctx: &dyn AttrCoercionContext,
        entries: impl IntoIterator<Item = (&'v str, &'v serde_json::Value)>,
    ) -> anyhow::Result<Selector> {
        let mut coerced = Vec::new();
        for (key, value) in entries {
            let key = ctx.coerce_condition_key(key)?;
            let value = if value.is_null() {
                None
            } else {
                Some(
                    ty.convert(value, ctx)
                        .with_context(|| format!("in `select()` branch `{}`", key))?,
                )
            };
            coerced.push((key, value));
        }
        Self::new(ty, coerced)
    }

    fn check_all_keys_unique(entries: &[(ConditionKey, Option<AttrValue>)]) -> anyhow::Result<()> {
        // Keys can be different strings that resolve to the same label, e.g.
        // `cell//foo:bar` and `//foo:bar`.

        // Quadratic is cheaper than hashing for small `N`.
        if entries.len() <= 32 {
            for i in 0..entries.len() {
                for j in i + 1..entries.len() {
                    if entries[i].0 == entries[j].0 {
                        return Err(SelectorError::DuplicateKey(entries[i].0.to_string()).into());
                    }
                }
            }
        } else {
            let mut visited_keys: HashSet<&ConditionKey, _> =
                HashSet::with_capacity_and_hasher(entries.len(), StarlarkHasherBuilder);
            for (k, _) in entries {
                if !visited_keys.insert(k) {
                    return Err(SelectorError::DuplicateKey(k.to_string()).into());
                }
            }
        }
        Ok(())
    }

    pub fn ty(&self) -> &AttrType {
        &self.ty
    }

    /// Entries in the order they were written. The value is `None` only for an
    /// unset branch of a type without a default.
    pub fn entries(&self) -> impl Iterator<Item = (&ConditionKey, Option<&AttrValue>)> {
        self.entries.iter().map(|(k, v)| (k, v.as_ref()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &ConditionKey> {
        self.entries.keys()
    }

    /// Conditions other than the default, in order.
    pub fn condition_labels(&self) -> impl Iterator<Item = &TargetLabel> {
        self.entries.keys().filter_map(|k| k.as_label())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &ConditionKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &ConditionKey) -> Option<&AttrValue> {
        self.entries.get(key)?.as_ref()
    }

    /// The value of the branch chosen by a condition resolver.
    ///
    /// Picking a key the select does not have is a bug in the resolver, never
    /// silently replaced by the default.
    pub fn value_for_key(&self, key: &ConditionKey) -> anyhow::Result<Option<&AttrValue>> {
        match self.entries.get(key) {
            Some(v) => Ok(v.as_ref()),
            None => Err(
                SelectorError::UnknownConditionKey(key.to_string(), self.to_string()).into(),
            ),
        }
    }

    /// Whether the branch has a value written by the user (it exists and was not unset).
    pub fn is_value_set(&self, key: &ConditionKey) -> bool {
        self.entries.contains_key(key) && !self.unset_keys.contains(key)
    }

    pub fn unset_keys(&self) -> impl Iterator<Item = &ConditionKey> {
        self.unset_keys.iter()
    }

    pub fn has_default(&self) -> bool {
        self.has_default
    }

    /// True if the only branch is the default, i.e. this is a plain value.
    pub fn is_unconditional(&self) -> bool {
        self.entries.len() == 1 && self.has_default
    }

    /// The default branch value, or the type default if there is no default branch.
    pub fn default_value(&self) -> Option<AttrValue> {
        match self.entries.get(&ConditionKey::Default) {
            Some(v) => v.clone(),
            None => self.ty.default_value(),
        }
    }

    pub fn key_set(&self) -> &SelectorKeySet {
        &self.key_set
    }

    pub fn to_json(&self) -> anyhow::Result<serde_json::Value> {
        let mut map = serde_json::Map::with_capacity(self.entries.len());
        for (key, value) in self.entries.iter() {
            let value = match value {
                Some(v) if !self.unset_keys.contains(key) => v.to_json()?,
                _ => serde_json::Value::Null,
            };
            map.insert(key.to_string(), value);
        }
        Ok(serde_json::Value::Object(serde_json::Map::from_iter([
            (
                "__type".to_owned(),
                serde_json::Value::String("selector".to_owned()),
            ),
            ("entries".to_owned(), serde_json::Value::Object(map)),
        ])))
    }
}

impl Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "select(")?;
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            match value {
                Some(v) if !self.unset_keys.contains(key) => write!(f, "\"{}\"={}", key, v)?,
                _ => write!(f, "\"{}\"=None", key)?,
            }
        }
        write!(f, ")")
    }
}
