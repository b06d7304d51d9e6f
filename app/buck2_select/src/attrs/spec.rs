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
use std::fmt::Debug;
use std::sync::Arc;

use allocative::Allocative;
use anyhow::Context;
use dupe::Dupe;
use starlark_map::small_map;
use starlark_map::small_map::SmallMap;

use crate::attrs::attr_type::AttrType;
use crate::attrs::attr_value::AttrValue;
use crate::attrs::coercion_context::AttrCoercionContext;
use crate::attrs::selector_list::SelectorList;
use crate::error::SelectErrorKind;

#[derive(Debug, thiserror::Error)]
pub(crate) enum AttributeSpecError {
    #[error("Duplicate attribute `{0}`")]
    DuplicateAttribute(String),
    #[error("Rule definition has no attribute `{0}`")]
    UnknownAttribute(String),
    #[error("Computed default of `{0}` depends on unknown attribute `{1}`")]
    UnknownDependency(String, String),
    #[error("Computed default of `{0}` read `{1}` which it does not declare as a dependency")]
    UndeclaredInput(String, String),
    #[error("Computed defaults form a cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),
}

impl AttributeSpecError {
    pub(crate) fn kind(&self) -> SelectErrorKind {
        match self {
            AttributeSpecError::DuplicateAttribute(..) => SelectErrorKind::DuplicateAttribute,
            AttributeSpecError::UnknownAttribute(..)
            | AttributeSpecError::UnknownDependency(..)
            | AttributeSpecError::UndeclaredInput(..) => SelectErrorKind::UnknownAttribute,
            AttributeSpecError::Cycle(..) => SelectErrorKind::ComputedDefaultCycle,
        }
    }
}

type ComputeFn = dyn Fn(&ComputedDefaultInputs) -> anyhow::Result<AttrValue> + Send + Sync;

/// An attribute value derived from other attributes of the same rule.
///
/// The function is evaluated with one value per declared dependency. Those
/// dependencies may themselves be configurable, so evaluation can happen once
/// per combination of their possible values.
#[derive(Clone, Dupe, Allocative)]
pub struct ComputedDefault {
    deps: Arc<[String]>,
    #[allocative(skip)]
    compute: Arc<ComputeFn>,
}

impl Debug for ComputedDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputedDefault")
            .field("deps", &self.deps)
            .finish_non_exhaustive()
    }
}

impl ComputedDefault {
    pub fn new(
        deps: Vec<String>,
        compute: impl Fn(&ComputedDefaultInputs) -> anyhow::Result<AttrValue> + Send + Sync + 'static,
    ) -> Self {
        Self {
            deps: deps.into(),
            compute: Arc::new(compute),
        }
    }

    pub fn deps(&self) -> &[String] {
        &self.deps
    }

    /// Runs the function and checks that the result fits the attribute type.
    pub(crate) fn evaluate(
        &self,
        ty: &AttrType,
        inputs: &ComputedDefaultInputs,
    ) -> anyhow::Result<AttrValue> {
        let value = (self.compute)(inputs)
            .with_context(|| format!("when computing default of `{}`", inputs.attr))?;
        ty.check(&value)
            .with_context(|| format!("computed default of `{}`", inputs.attr))?;
        Ok(value)
    }
}

/// Values of the dependencies of one computed default evaluation.
#[derive(Debug)]
pub struct ComputedDefaultInputs {
    attr: String,
    values: SmallMap<String, Option<AttrValue>>,
}

impl ComputedDefaultInputs {
    pub(crate) fn new(attr: &str, values: SmallMap<String, Option<AttrValue>>) -> Self {
        Self {
            attr: attr.to_owned(),
            values,
        }
    }

    /// The value of a declared dependency; `None` if that attribute is unset.
    pub fn get(&self, name: &str) -> anyhow::Result<Option<&AttrValue>> {
        match self.values.get(name) {
            Some(v) => Ok(v.as_ref()),
            None => Err(
                AttributeSpecError::UndeclaredInput(self.attr.clone(), name.to_owned()).into(),
            ),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&AttrValue>)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }
}

#[derive(Debug, Clone, Allocative)]
pub enum AttrSource {
    Explicit(SelectorList),
    Computed(ComputedDefault),
}

/// One attribute of a rule: its type and where its value comes from.
#[derive(Debug, Clone, Allocative)]
pub struct Attribute {
    ty: AttrType,
    source: AttrSource,
}

impl Attribute {
    pub fn explicit(value: SelectorList) -> Self {
        Self {
            ty: value.ty().dupe(),
            source: AttrSource::Explicit(value),
        }
    }

    pub fn computed(ty: AttrType, computed: ComputedDefault) -> Self {
        Self {
            ty,
            source: AttrSource::Computed(computed),
        }
    }

    /// Coerces the raw expression of the attribute `name`.
    pub fn coerce(
        name: &str,
        ty: &AttrType,
        ctx: &dyn AttrCoercionContext,
        raw: &serde_json::Value,
    ) -> anyhow::Result<Self> {
        let value = SelectorList::coerce(ty, ctx, raw)
            .with_context(|| format!("when coercing attribute `{}`", name))?;
        Ok(Self::explicit(value))
    }

    pub fn ty(&self) -> &AttrType {
        &self.ty
    }

    pub fn source(&self) -> &AttrSource {
        &self.source
    }

    pub fn as_explicit(&self) -> Option<&SelectorList> {
        match &self.source {
            AttrSource::Explicit(v) => Some(v),
            AttrSource::Computed(_) => None,
        }
    }
}

/// The attribute table of one rule instance, in declaration order.
#[derive(Debug, Allocative)]
pub struct RuleAttributes {
    attributes: SmallMap<String, Attribute>,
}

impl RuleAttributes {
    pub fn new(attributes: Vec<(String, Attribute)>) -> anyhow::Result<Self> {
        let mut instances: SmallMap<String, Attribute> = SmallMap::with_capacity(attributes.len());
        for (name, attribute) in attributes {
            match instances.entry(name) {
                small_map::Entry::Vacant(e) => {
                    e.insert(attribute);
                }
                small_map::Entry::Occupied(e) => {
                    return Err(AttributeSpecError::DuplicateAttribute(e.key().to_owned()).into());
                }
            }
        }

        for (name, attribute) in instances.iter() {
            if let AttrSource::Computed(computed) = &attribute.source {
                for dep in computed.deps() {
                    if !instances.contains_key(dep) {
                        return Err(AttributeSpecError::UnknownDependency(
                            name.to_owned(),
                            dep.to_owned(),
                        )
                        .into());
                    }
                }
            }
        }

        let attributes = RuleAttributes {
            attributes: instances,
        };
        attributes.check_no_cycles()?;
        Ok(attributes)
    }

    fn check_no_cycles(&self) -> anyhow::Result<()> {
        let mut state = vec![VisitState::New; self.attributes.len()];
        let mut path = Vec::new();
        for index in 0..self.attributes.len() {
            self.visit_for_cycles(index, &mut state, &mut path)?;
        }
        Ok(())
    }

    fn visit_for_cycles(
        &self,
        index: usize,
        state: &mut [VisitState],
        path: &mut Vec<usize>,
    ) -> anyhow::Result<()> {
        match state[index] {
            VisitState::Done => return Ok(()),
            VisitState::InProgress => {
                let start = path.iter().position(|i| *i == index).unwrap_or(0);
                let cycle = path[start..]
                    .iter()
                    .chain([&index])
                    .filter_map(|i| self.attributes.get_index(*i))
                    .map(|(name, _)| name.clone())
                    .collect();
                return Err(AttributeSpecError::Cycle(cycle).into());
            }
            VisitState::New => {}
        }

        state[index] = VisitState::InProgress;
        path.push(index);
        if let Some((_, attribute)) = self.attributes.get_index(index) {
            if let AttrSource::Computed(computed) = &attribute.source {
                for dep in computed.deps() {
                    if let Some(dep_index) = self.attributes.get_index_of(dep.as_str()) {
                        self.visit_for_cycles(dep_index, state, path)?;
                    }
                }
            }
        }
        path.pop();
        state[index] = VisitState::Done;
        Ok(())
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    pub fn attribute(&self, name: &str) -> anyhow::Result<&Attribute> {
        self.get(name)
            .ok_or_else(|| AttributeSpecError::UnknownAttribute(name.to_owned()).into())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Attribute)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Whether the value of `name` can differ between configurations. A
    /// computed default is configurable if any of its inputs is.
    pub fn is_configurable(&self, name: &str) -> anyhow::Result<bool> {
        match &self.attribute(name)?.source {
            AttrSource::Explicit(value) => Ok(value.is_configurable()),
            AttrSource::Computed(computed) => {
                for dep in computed.deps() {
                    if self.is_configurable(dep)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    New,
    InProgress,
    Done,
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use crate::attrs::attr_type::AttrType;
    use crate::attrs::attr_value::AttrValue;
    use crate::attrs::spec::Attribute;
    use crate::attrs::spec::ComputedDefault;
    use crate::attrs::spec::RuleAttributes;
    use crate::attrs::testing::testing_coercion_ctx;
    use crate::error::SelectErrorKind;
    use crate::error::select_error_kind;

    fn literal(name: &str, value: i64) -> (String, Attribute) {
        (
            name.to_owned(),
            Attribute::coerce(
                name,
                &AttrType::int(),
                &testing_coercion_ctx(),
                &serde_json::json!(value),
            )
            .unwrap(),
        )
    }

    fn computed(name: &str, deps: &[&str]) -> (String, Attribute) {
        (
            name.to_owned(),
            Attribute::computed(
                AttrType::int(),
                ComputedDefault::new(deps.iter().map(|d| (*d).to_owned()).collect(), |_| {
                    Ok(AttrValue::Int(0))
                }),
            ),
        )
    }

    #[test]
    fn test_duplicate_attribute() {
        let err = RuleAttributes::new(vec![literal("a", 1), literal("a", 2)]).unwrap_err();
        assert_eq!(
            Some(SelectErrorKind::DuplicateAttribute),
            select_error_kind(&err)
        );
    }

    #[test]
    fn test_unknown_attribute() {
        let attrs = RuleAttributes::new(vec![literal("a", 1)]).unwrap();
        assert_eq!(1, attrs.len());
        assert!(attrs.attribute("a").is_ok());
        let err = attrs.attribute("b").unwrap_err();
        assert_eq!(Some(SelectErrorKind::UnknownAttribute), select_error_kind(&err));
    }

    #[test]
    fn test_unknown_dependency() {
        let err = RuleAttributes::new(vec![computed("c", &["missing"])]).unwrap_err();
        assert_eq!(Some(SelectErrorKind::UnknownAttribute), select_error_kind(&err));
    }

    #[test]
    fn test_cycle() {
        let err = RuleAttributes::new(vec![
            literal("a", 1),
            computed("b", &["a", "c"]),
            computed("c", &["d"]),
            computed("d", &["b"]),
        ])
        .unwrap_err();
        assert_matches!(
            select_error_kind(&err),
            Some(SelectErrorKind::ComputedDefaultCycle)
        );
        assert_eq!(
            "Computed defaults form a cycle: b -> c -> d -> b",
            err.to_string()
        );
    }

    #[test]
    fn test_self_cycle() {
        let err = RuleAttributes::new(vec![computed("a", &["a"])]).unwrap_err();
        assert_eq!("Computed defaults form a cycle: a -> a", err.to_string());
    }

    #[test]
    fn test_is_configurable_through_computed() {
        let ctx = testing_coercion_ctx();
        let select = serde_json::json!({
            "__type": "selector",
            "entries": {"//c:a": 1, "DEFAULT": 2},
        });
        let attrs = RuleAttributes::new(vec![
            (
                "s".to_owned(),
                Attribute::coerce("s", &AttrType::int(), &ctx, &select).unwrap(),
            ),
            literal("l", 1),
            computed("from_literal", &["l"]),
            computed("from_select", &["from_literal", "s"]),
        ])
        .unwrap();
        assert!(attrs.is_configurable("s").unwrap());
        assert!(!attrs.is_configurable("l").unwrap());
        assert!(!attrs.is_configurable("from_literal").unwrap());
        assert!(attrs.is_configurable("from_select").unwrap());
        assert_eq!(
            vec!["s", "l", "from_literal", "from_select"],
            attrs.names().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_coerce_error_names_attribute() {
        let err = Attribute::coerce(
            "srcs",
            &AttrType::list(AttrType::string()),
            &testing_coercion_ctx(),
            &serde_json::json!(1),
        )
        .unwrap_err();
        assert_eq!("when coercing attribute `srcs`", err.to_string());
        assert_eq!(Some(SelectErrorKind::Conversion), select_error_kind(&err));
    }
}
