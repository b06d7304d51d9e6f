/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is dual-licensed under either the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree or the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree. You may select, at your option, one of the
 * above-listed licenses.
 */

//! Reading attribute values of a rule.
//!
//! All mappers share one resolution and enumeration engine. A [`MapperKind`]
//! only decides how a single value is picked, whether configurable attributes
//! are rejected, and how many computed default evaluations are allowed.

use std::fmt;
use std::fmt::Debug;
use std::sync::Arc;

use anyhow::Context;
use dupe::Dupe;
use dupe::IterDupedExt;
use once_cell::sync::OnceCell;
use starlark_map::small_map::SmallMap;
use starlark_map::small_set::SmallSet;

use crate::attrs::attr_value::AttrValue;
use crate::attrs::resolve::ConditionResolver;
use crate::attrs::selector_list::SelectorList;
use crate::attrs::spec::AttrSource;
use crate::attrs::spec::ComputedDefaultInputs;
use crate::attrs::spec::RuleAttributes;
use crate::config::SelectConfig;
use crate::error::SelectErrorKind;
use crate::mapper::computed::ComputationBudget;
use crate::mapper::computed::ComputationLimiter;
use crate::mapper::computed::for_each_combination;
use crate::mapper::duplicates::find_duplicate_references;
use crate::mapper::duplicates::find_duplicates_in_selector_list;
use crate::mapper::enumerate::enumerate_selector_list;
use crate::mapper::flatten::flatten;
use crate::target_label::TargetLabel;

pub mod computed;
pub mod duplicates;
pub(crate) mod enumerate;
pub mod flatten;

#[derive(Debug, thiserror::Error)]
pub(crate) enum AttributeMapperError {
    #[error(
        "Attribute `{0}` is configurable (it uses `select()`) and cannot be read without a configuration"
    )]
    ConfigurableAttributeAccessedUnsafely(String),
    #[error(
        "Attribute `{0}` is configurable and has no single value, enumerate its values or resolve it in a configuration"
    )]
    NoSingleValue(String),
    #[error("Attribute `{0}` is a computed default and has no `select()` expression")]
    RawComputedDefault(String),
    #[error("`{0}` is only supported by the raw mapper, not by the {1} mapper (internal error)")]
    RawOnly(&'static str, &'static str),
}

impl AttributeMapperError {
    pub(crate) fn kind(&self) -> SelectErrorKind {
        match self {
            AttributeMapperError::ConfigurableAttributeAccessedUnsafely(..) => {
                SelectErrorKind::ConfigurableAttributeAccessedUnsafely
            }
            AttributeMapperError::NoSingleValue(..) => SelectErrorKind::NoSingleValue,
            AttributeMapperError::RawComputedDefault(..) | AttributeMapperError::RawOnly(..) => {
                SelectErrorKind::Internal
            }
        }
    }
}

/// Which behavior an [`AttributeMapper`] plugs into the shared engine.
#[derive(Clone, Dupe)]
pub enum MapperKind {
    /// Values are returned as written: every branch of every select, unresolved.
    Raw,
    /// Every value the attribute can take in any configuration.
    Aggregating,
    /// Like `Aggregating`, but fails on configurable attributes.
    NonConfigurable,
    /// Values in one configuration, picked by the resolver.
    Configured(Arc<dyn ConditionResolver + Send + Sync>),
    /// Answers overridden attributes from the table and defers the rest.
    Delegating(Arc<AttributeMapper>, Arc<SmallMap<String, Option<AttrValue>>>),
}

impl Debug for MapperKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapperKind::Delegating(inner, overrides) => f
                .debug_struct("Delegating")
                .field("inner", &inner.kind)
                .field("overrides", overrides)
                .finish(),
            kind => write!(f, "{}", kind.name()),
        }
    }
}

impl MapperKind {
    pub fn name(&self) -> &'static str {
        match self {
            MapperKind::Raw => "raw",
            MapperKind::Aggregating => "aggregating",
            MapperKind::NonConfigurable => "non-configurable",
            MapperKind::Configured(_) => "configured",
            MapperKind::Delegating(..) => "delegating",
        }
    }

    /// How a single value is picked for a configurable attribute, if at all.
    fn condition_resolver(&self) -> Option<&dyn ConditionResolver> {
        match self {
            MapperKind::Configured(resolver) => {
                let resolver: &dyn ConditionResolver = &**resolver;
                Some(resolver)
            }
            _ => None,
        }
    }

    fn rejects_configurable(&self) -> bool {
        matches!(self, MapperKind::NonConfigurable)
    }

    fn combination_limiter(&self, config: &SelectConfig) -> ComputationLimiter {
        match self {
            // One combination per computed default.
            MapperKind::Configured(_) => ComputationLimiter::unlimited(),
            _ => ComputationLimiter::new(config.computed_default_limit),
        }
    }
}

/// Read access to the attributes of one rule instance.
///
/// Immutable once built and safe to share between threads.
#[derive(Debug)]
pub struct AttributeMapper {
    rule: Arc<RuleAttributes>,
    kind: MapperKind,
    config: SelectConfig,
}

static_assertions::assert_impl_all!(AttributeMapper: Send, Sync);

impl AttributeMapper {
    pub fn new(rule: Arc<RuleAttributes>, kind: MapperKind, config: SelectConfig) -> Self {
        Self { rule, kind, config }
    }

    pub fn raw(rule: Arc<RuleAttributes>, config: SelectConfig) -> Self {
        Self::new(rule, MapperKind::Raw, config)
    }

    pub fn aggregating(rule: Arc<RuleAttributes>, config: SelectConfig) -> Self {
        Self::new(rule, MapperKind::Aggregating, config)
    }

    pub fn non_configurable(rule: Arc<RuleAttributes>, config: SelectConfig) -> Self {
        Self::new(rule, MapperKind::NonConfigurable, config)
    }

    pub fn configured(
        rule: Arc<RuleAttributes>,
        resolver: Arc<dyn ConditionResolver + Send + Sync>,
        config: SelectConfig,
    ) -> Self {
        Self::new(rule, MapperKind::Configured(resolver), config)
    }

    /// Wraps `inner`, answering the attributes in `overrides` from the table.
    /// Every override must name an attribute of the rule and fit its type.
    pub fn delegating(
        inner: Arc<AttributeMapper>,
        overrides: Vec<(String, Option<AttrValue>)>,
    ) -> anyhow::Result<Self> {
        let mut table = SmallMap::with_capacity(overrides.len());
        for (name, value) in overrides {
            let attribute = inner.rule.attribute(&name)?;
            if let Some(value) = &value {
                attribute
                    .ty()
                    .check(value)
                    .with_context(|| format!("when overriding attribute `{}`", name))?;
            }
            table.insert(name, value);
        }
        Ok(Self {
            rule: inner.rule.dupe(),
            config: inner.config,
            kind: MapperKind::Delegating(inner, Arc::new(table)),
        })
    }

    pub fn kind(&self) -> &MapperKind {
        &self.kind
    }

    pub fn rule(&self) -> &Arc<RuleAttributes> {
        &self.rule
    }

    /// The delegate and override of `name`, for a delegating mapper.
    fn delegation(&self, name: &str) -> Option<Delegation<'_>> {
        match &self.kind {
            MapperKind::Delegating(inner, overrides) => Some(match overrides.get(name) {
                Some(value) => Delegation::Override(value.as_ref()),
                None => Delegation::Inner(inner),
            }),
            _ => None,
        }
    }

    fn check_not_configurable(&self, name: &str) -> anyhow::Result<()> {
        if self.kind.rejects_configurable() && self.rule.is_configurable(name)? {
            return Err(
                AttributeMapperError::ConfigurableAttributeAccessedUnsafely(name.to_owned()).into(),
            );
        }
        Ok(())
    }

    fn budget(&self) -> ComputationBudget {
        self.kind.combination_limiter(&self.config).budget()
    }

    /// Whether the value of `name` can differ between configurations.
    pub fn is_configurable(&self, name: &str) -> anyhow::Result<bool> {
        match self.delegation(name) {
            Some(Delegation::Override(_)) => Ok(false),
            Some(Delegation::Inner(inner)) => inner.is_configurable(name),
            None => self.rule.is_configurable(name),
        }
    }

    /// The one value of `name`; `None` if it is unset and its type has no default.
    ///
    /// Only a configured mapper can answer for a configurable attribute.
    pub fn get_one(&self, name: &str) -> anyhow::Result<Option<AttrValue>> {
        match self.delegation(name) {
            Some(Delegation::Override(value)) => return Ok(value.cloned()),
            Some(Delegation::Inner(inner)) => return inner.get_one(name),
            None => {}
        }

        self.check_not_configurable(name)?;
        if let Some(resolver) = self.kind.condition_resolver() {
            return self.resolve_in_configuration(name, resolver);
        }
        if self.rule.is_configurable(name)? {
            return Err(AttributeMapperError::NoSingleValue(name.to_owned()).into());
        }
        let mut value = None;
        self.enumerate(name, &mut self.budget(), &mut |v| {
            value = Some(v);
            Ok(())
        })?;
        Ok(value)
    }

    /// Calls `visitor` with every value of `name` this mapper knows of, in a
    /// deterministic order.
    pub fn visit_all_values(
        &self,
        name: &str,
        visitor: &mut dyn FnMut(AttrValue) -> anyhow::Result<()>,
    ) -> anyhow::Result<()> {
        match self.delegation(name) {
            Some(Delegation::Override(value)) => {
                return match value {
                    Some(value) => visitor(value.clone()),
                    None => Ok(()),
                };
            }
            Some(Delegation::Inner(inner)) => return inner.visit_all_values(name, visitor),
            None => {}
        }

        if let MapperKind::Raw = &self.kind {
            return self.visit_raw_values(name, visitor);
        }
        self.check_not_configurable(name)?;
        if let Some(resolver) = self.kind.condition_resolver() {
            return match self.resolve_in_configuration(name, resolver)? {
                Some(value) => visitor(value),
                None => Ok(()),
            };
        }
        self.enumerate(name, &mut self.budget(), visitor)
    }

    pub fn all_values(&self, name: &str) -> anyhow::Result<Vec<AttrValue>> {
        let mut values = Vec::new();
        self.visit_all_values(name, &mut |v| {
            values.push(v);
            Ok(())
        })?;
        Ok(values)
    }

    /// Calls `visitor` with every target referenced by any value of `name`,
    /// in order and with repeats. With `include_condition_keys` the condition
    /// labels of its selects are visited too, before the branch values.
    ///
    /// Explicit attributes are walked branch by branch, so the cost is linear
    /// in the size of the expression even for many selects.
    pub fn visit_cross_references(
        &self,
        name: &str,
        include_condition_keys: bool,
        visitor: &mut dyn FnMut(&TargetLabel),
    ) -> anyhow::Result<()> {
        let ty = self.rule.attribute(name)?.ty();
        match self.delegation(name) {
            Some(Delegation::Override(value)) => {
                if let Some(value) = value {
                    ty.visit_references(value, &mut |l| visitor(l));
                }
                return Ok(());
            }
            Some(Delegation::Inner(inner)) => {
                return inner.visit_cross_references(name, include_condition_keys, visitor);
            }
            None => {}
        }

        self.check_not_configurable(name)?;
        if include_condition_keys {
            for label in self.configuration_labels(name)? {
                visitor(&label);
            }
        }

        if let Some(resolver) = self.kind.condition_resolver() {
            if let Some(value) = self.resolve_in_configuration(name, resolver)? {
                ty.visit_references(&value, &mut |l| visitor(l));
            }
            return Ok(());
        }
        match self.rule.attribute(name)?.source() {
            AttrSource::Explicit(list) => {
                for selector in list.selectors() {
                    for (_, value) in selector.entries() {
                        if let Some(value) = value {
                            ty.visit_references(value, &mut |l| visitor(l));
                        }
                    }
                }
            }
            AttrSource::Computed(_) => {
                self.enumerate(name, &mut self.budget(), &mut |value| {
                    ty.visit_references(&value, &mut |l| visitor(l));
                    Ok(())
                })?;
            }
        }
        Ok(())
    }

    /// References listed more than once in some value of `name`.
    ///
    /// Attributes with more selects than
    /// [`SelectConfig::exact_duplicate_check_max_selects`] are checked per
    /// select, which can report references that never meet in one configuration.
    pub fn find_duplicate_references(&self, name: &str) -> anyhow::Result<SmallSet<TargetLabel>> {
        let attribute = self.rule.attribute(name)?;
        match self.delegation(name) {
            Some(Delegation::Override(value)) => {
                return Ok(find_duplicate_references(attribute.ty(), value));
            }
            Some(Delegation::Inner(inner)) => return inner.find_duplicate_references(name),
            None => {}
        }

        self.check_not_configurable(name)?;
        if let Some(resolver) = self.kind.condition_resolver() {
            let value = self.resolve_in_configuration(name, resolver)?;
            return Ok(find_duplicate_references(attribute.ty(), &value));
        }
        match attribute.source() {
            AttrSource::Explicit(list) => {
                find_duplicates_in_selector_list(name, list, &self.config)
            }
            AttrSource::Computed(_) => {
                let mut values = Vec::new();
                self.enumerate(name, &mut self.budget(), &mut |v| {
                    values.push(v);
                    Ok(())
                })?;
                Ok(find_duplicate_references(attribute.ty(), &values))
            }
        }
    }

    /// All values of `name` merged into one, see [`flatten`].
    pub fn merged_value(&self, name: &str) -> anyhow::Result<Option<AttrValue>> {
        let ty = self.rule.attribute(name)?.ty();
        flatten(ty, self.all_values(name)?)
    }

    fn require_raw(&self, operation: &'static str) -> anyhow::Result<()> {
        match &self.kind {
            MapperKind::Raw => Ok(()),
            kind => Err(AttributeMapperError::RawOnly(operation, kind.name()).into()),
        }
    }

    /// The unresolved expression of an explicit attribute.
    pub fn get_raw(&self, name: &str) -> anyhow::Result<&SelectorList> {
        self.require_raw("get_raw")?;
        self.explicit(name)
    }

    /// Condition labels that can change the value of `name`, deduplicated.
    /// For a computed default these are the labels of its inputs.
    pub fn configurability_keys(&self, name: &str) -> anyhow::Result<SmallSet<TargetLabel>> {
        self.require_raw("configurability_keys")?;
        self.configuration_labels(name)
    }

    /// Every distinct value written anywhere in the expression of `name`, in
    /// first-seen order. List values contribute their elements instead.
    pub fn merged_values(&self, name: &str) -> anyhow::Result<Vec<AttrValue>> {
        self.require_raw("merged_values")?;
        let mut merged = SmallSet::new();
        self.visit_raw_values(name, &mut |value| {
            match value {
                AttrValue::List(items) => merged.extend(items),
                value => {
                    merged.insert(value);
                }
            }
            Ok(())
        })?;
        Ok(merged.into_iter().collect())
    }

    fn explicit(&self, name: &str) -> anyhow::Result<&SelectorList> {
        self.rule
            .attribute(name)?
            .as_explicit()
            .ok_or_else(|| AttributeMapperError::RawComputedDefault(name.to_owned()).into())
    }

    fn visit_raw_values(
        &self,
        name: &str,
        visitor: &mut dyn FnMut(AttrValue) -> anyhow::Result<()>,
    ) -> anyhow::Result<()> {
        for selector in self.explicit(name)?.selectors() {
            for (_, value) in selector.entries() {
                if let Some(value) = value {
                    visitor(value.clone())?;
                }
            }
        }
        Ok(())
    }

    fn configuration_labels(&self, name: &str) -> anyhow::Result<SmallSet<TargetLabel>> {
        match self.rule.attribute(name)?.source() {
            AttrSource::Explicit(list) => Ok(list.condition_keys().duped().collect()),
            AttrSource::Computed(computed) => {
                let mut labels = SmallSet::new();
                for dep in computed.deps() {
                    labels.extend(self.configuration_labels(dep)?);
                }
                Ok(labels)
            }
        }
    }

    /// Every possible value of `name`. Computed defaults are evaluated once per
    /// combination of their inputs' values, and repeated results are dropped.
    fn enumerate(
        &self,
        name: &str,
        budget: &mut ComputationBudget,
        visitor: &mut dyn FnMut(AttrValue) -> anyhow::Result<()>,
    ) -> anyhow::Result<()> {
        let attribute = self.rule.attribute(name)?;
        let computed = match attribute.source() {
            AttrSource::Explicit(list) => return enumerate_selector_list(name, list, visitor),
            AttrSource::Computed(computed) => computed,
        };

        let mut dep_values = Vec::with_capacity(computed.deps().len());
        for dep in computed.deps() {
            let mut values = Vec::new();
            self.enumerate(dep, budget, &mut |v| {
                values.push(Some(v));
                Ok(())
            })?;
            if values.is_empty() {
                // Unset without a default; the input is `None`.
                values.push(None);
            }
            dep_values.push(values);
        }

        let mut seen = SmallSet::new();
        for_each_combination(name, computed.deps(), &dep_values, budget, &mut |inputs| {
            let value = computed.evaluate(attribute.ty(), &inputs)?;
            if seen.insert(value.clone()) {
                visitor(value)?;
            }
            Ok(())
        })
    }

    fn resolve_in_configuration(
        &self,
        name: &str,
        resolver: &dyn ConditionResolver,
    ) -> anyhow::Result<Option<AttrValue>> {
        let attribute = self.rule.attribute(name)?;
        match attribute.source() {
            AttrSource::Explicit(list) => list
                .resolve_with(resolver)
                .with_context(|| format!("when resolving attribute `{}`", name)),
            AttrSource::Computed(computed) => {
                let mut values = SmallMap::with_capacity(computed.deps().len());
                for dep in computed.deps() {
                    values.insert(dep.clone(), self.resolve_in_configuration(dep, resolver)?);
                }
                let inputs = ComputedDefaultInputs::new(name, values);
                Ok(Some(computed.evaluate(attribute.ty(), &inputs)?))
            }
        }
    }
}

enum Delegation<'a> {
    Override(Option<&'a AttrValue>),
    Inner(&'a AttributeMapper),
}

/// The mappers of one rule, each built on first use.
#[derive(Debug)]
pub struct RuleMappers {
    rule: Arc<RuleAttributes>,
    config: SelectConfig,
    raw: OnceCell<Arc<AttributeMapper>>,
    aggregating: OnceCell<Arc<AttributeMapper>>,
    non_configurable: OnceCell<Arc<AttributeMapper>>,
}

impl RuleMappers {
    pub fn new(rule: Arc<RuleAttributes>, config: SelectConfig) -> Self {
        Self {
            rule,
            config,
            raw: OnceCell::new(),
            aggregating: OnceCell::new(),
            non_configurable: OnceCell::new(),
        }
    }

    pub fn rule(&self) -> &Arc<RuleAttributes> {
        &self.rule
    }

    pub fn raw(&self) -> &Arc<AttributeMapper> {
        self.raw
            .get_or_init(|| Arc::new(AttributeMapper::raw(self.rule.dupe(), self.config)))
    }

    pub fn aggregating(&self) -> &Arc<AttributeMapper> {
        self.aggregating
            .get_or_init(|| Arc::new(AttributeMapper::aggregating(self.rule.dupe(), self.config)))
    }

    pub fn non_configurable(&self) -> &Arc<AttributeMapper> {
        self.non_configurable.get_or_init(|| {
            Arc::new(AttributeMapper::non_configurable(
                self.rule.dupe(),
                self.config,
            ))
        })
    }

    /// A mapper for one configuration. Not cached: each resolver is a
    /// different configuration.
    pub fn configured(&self, resolver: Arc<dyn ConditionResolver + Send + Sync>) -> AttributeMapper {
        AttributeMapper::configured(self.rule.dupe(), resolver, self.config)
    }
}

static_assertions::assert_impl_all!(RuleMappers: Send, Sync);

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assert_matches::assert_matches;
    use dupe::Dupe;

    use crate::attrs::attr_type::AttrType;
    use crate::attrs::attr_value::AttrValue;
    use crate::attrs::resolve::MatchedConditionKeys;
    use crate::attrs::spec::Attribute;
    use crate::attrs::spec::ComputedDefault;
    use crate::attrs::spec::RuleAttributes;
    use crate::attrs::testing::testing_coercion_ctx;
    use crate::config::SelectConfig;
    use crate::error::SelectErrorKind;
    use crate::error::select_error_kind;
    use crate::mapper::AttributeMapper;
    use crate::mapper::MapperKind;
    use crate::mapper::RuleMappers;
    use crate::target_label::TargetLabel;

    fn attr(name: &str, ty: AttrType, raw: serde_json::Value) -> (String, Attribute) {
        (
            name.to_owned(),
            Attribute::coerce(name, &ty, &testing_coercion_ctx(), &raw).unwrap(),
        )
    }

    fn strings(xs: &[&str]) -> AttrValue {
        AttrValue::List(xs.iter().map(|x| AttrValue::string(x)).collect())
    }

    /// `suffix` is `select(linux: "l", mac: "m", DEFAULT: "d")`; `name` is a
    /// computed default of `base` + `suffix`.
    fn rule() -> Arc<RuleAttributes> {
        let name = ComputedDefault::new(vec!["base".to_owned(), "suffix".to_owned()], |inputs| {
            let base = inputs.get("base")?.and_then(|v| v.unpack_str()).unwrap_or("");
            let suffix = inputs.get("suffix")?.and_then(|v| v.unpack_str()).unwrap_or("");
            Ok(AttrValue::string(&format!("{}-{}", base, suffix)))
        });
        Arc::new(
            RuleAttributes::new(vec![
                attr("base", AttrType::string(), serde_json::json!("lib")),
                attr(
                    "suffix",
                    AttrType::string(),
                    serde_json::json!({
                        "__type": "selector",
                        "entries": {"//os:linux": "l", "//os:mac": "m", "DEFAULT": "d"},
                    }),
                ),
                attr(
                    "srcs",
                    AttrType::list(AttrType::string()),
                    serde_json::json!({
                        "__type": "concat",
                        "items": [
                            ["a.c"],
                            {
                                "__type": "selector",
                                "entries": {"//os:linux": ["b.c", "a.c"], "DEFAULT": null},
                            },
                        ],
                    }),
                ),
                attr(
                    "deps",
                    AttrType::list(AttrType::dep()),
                    serde_json::json!({
                        "__type": "selector",
                        "entries": {"//os:linux": [":x", ":x"], "DEFAULT": [":y"]},
                    }),
                ),
                attr("exported", AttrType::dep(), serde_json::Value::Null),
                (
                    "name".to_owned(),
                    Attribute::computed(AttrType::string(), name),
                ),
            ])
            .unwrap(),
        )
    }

    fn linux() -> Arc<MatchedConditionKeys> {
        Arc::new(MatchedConditionKeys::new(
            "linux",
            [TargetLabel::testing_parse("//os:linux")],
        ))
    }

    #[test]
    fn test_get_one_literal() {
        let mappers = RuleMappers::new(rule(), SelectConfig::default());
        for mapper in [
            mappers.raw(),
            mappers.aggregating(),
            mappers.non_configurable(),
        ] {
            assert_eq!(
                Some(AttrValue::string("lib")),
                mapper.get_one("base").unwrap()
            );
            assert_eq!(None, mapper.get_one("exported").unwrap());
        }
    }

    #[test]
    fn test_get_one_configurable() {
        let mappers = RuleMappers::new(rule(), SelectConfig::default());
        let err = mappers.non_configurable().get_one("suffix").unwrap_err();
        assert_eq!(
            Some(SelectErrorKind::ConfigurableAttributeAccessedUnsafely),
            select_error_kind(&err)
        );
        let err = mappers.aggregating().get_one("suffix").unwrap_err();
        assert_eq!(Some(SelectErrorKind::NoSingleValue), select_error_kind(&err));
        let configured = mappers.configured(linux());
        assert_eq!(
            Some(AttrValue::string("l")),
            configured.get_one("suffix").unwrap()
        );
        assert_eq!(
            Some(AttrValue::string("lib-l")),
            configured.get_one("name").unwrap()
        );
        assert_eq!(
            Some(strings(&["a.c", "b.c", "a.c"])),
            configured.get_one("srcs").unwrap()
        );
    }

    #[test]
    fn test_mappers_are_cached() {
        let mappers = RuleMappers::new(rule(), SelectConfig::default());
        assert!(Arc::ptr_eq(mappers.aggregating(), mappers.aggregating()));
        assert!(Arc::ptr_eq(mappers.raw(), mappers.raw()));
    }

    #[test]
    fn test_aggregating_values() {
        let mapper = AttributeMapper::aggregating(rule(), SelectConfig::default());
        assert_eq!(
            vec![strings(&["a.c", "b.c", "a.c"]), strings(&["a.c"])],
            mapper.all_values("srcs").unwrap()
        );
        assert_eq!(
            vec![
                AttrValue::string("lib-l"),
                AttrValue::string("lib-m"),
                AttrValue::string("lib-d"),
            ],
            mapper.all_values("name").unwrap()
        );
        assert!(mapper.is_configurable("name").unwrap());
        assert!(!mapper.is_configurable("base").unwrap());
    }

    #[test]
    fn test_non_configurable_rejects_computed_from_select() {
        let mapper = AttributeMapper::non_configurable(rule(), SelectConfig::default());
        let err = mapper.all_values("name").unwrap_err();
        assert_eq!(
            Some(SelectErrorKind::ConfigurableAttributeAccessedUnsafely),
            select_error_kind(&err)
        );
        assert_eq!(
            vec![AttrValue::string("lib")],
            mapper.all_values("base").unwrap()
        );
    }

    #[test]
    fn test_computed_default_budget() {
        let config = SelectConfig {
            computed_default_limit: 2,
            ..SelectConfig::default()
        };
        let mapper = AttributeMapper::aggregating(rule(), config);
        let err = mapper.all_values("name").unwrap_err();
        assert_eq!(
            Some(SelectErrorKind::ComputationBudgetExceeded),
            select_error_kind(&err)
        );
    }

    #[test]
    fn test_raw() {
        let mapper = AttributeMapper::raw(rule(), SelectConfig::default());
        assert_eq!(
            vec![strings(&["a.c"]), strings(&["b.c", "a.c"]), strings(&[])],
            mapper.all_values("srcs").unwrap()
        );
        assert_eq!(
            vec![AttrValue::string("a.c"), AttrValue::string("b.c")],
            mapper.merged_values("srcs").unwrap()
        );
        assert_eq!(2, mapper.get_raw("srcs").unwrap().len());
        assert_eq!(
            vec![
                TargetLabel::testing_parse("//os:linux"),
                TargetLabel::testing_parse("//os:mac"),
            ],
            mapper
                .configurability_keys("name")
                .unwrap()
                .into_iter()
                .collect::<Vec<_>>()
        );
        assert!(mapper.get_raw("name").is_err());
    }

    #[test]
    fn test_raw_only_operations() {
        let mapper = AttributeMapper::aggregating(rule(), SelectConfig::default());
        let err = mapper.get_raw("srcs").unwrap_err();
        assert_eq!(Some(SelectErrorKind::Internal), select_error_kind(&err));
    }

    #[test]
    fn test_cross_references() {
        let mapper = AttributeMapper::aggregating(rule(), SelectConfig::default());
        let mut refs = Vec::new();
        mapper
            .visit_cross_references("deps", true, &mut |l| refs.push(l.to_string()))
            .unwrap();
        assert_eq!(
            vec![
                "root//os:linux",
                "root//package/subdir:x",
                "root//package/subdir:x",
                "root//package/subdir:y",
            ],
            refs
        );

        let configured = AttributeMapper::configured(rule(), linux(), SelectConfig::default());
        let mut refs = Vec::new();
        configured
            .visit_cross_references("deps", false, &mut |l| refs.push(l.to_string()))
            .unwrap();
        assert_eq!(
            vec!["root//package/subdir:x", "root//package/subdir:x"],
            refs
        );
    }

    #[test]
    fn test_duplicates_and_merged_value() {
        let mapper = AttributeMapper::aggregating(rule(), SelectConfig::default());
        assert_eq!(
            vec![TargetLabel::testing_parse("//package/subdir:x")],
            mapper
                .find_duplicate_references("deps")
                .unwrap()
                .into_iter()
                .collect::<Vec<_>>()
        );
        assert_eq!(
            Some(strings(&["a.c", "b.c", "a.c", "a.c"])),
            mapper.merged_value("srcs").unwrap()
        );
        assert_eq!(None, mapper.merged_value("suffix").unwrap());
    }

    #[test]
    fn test_delegating() {
        let inner = Arc::new(AttributeMapper::non_configurable(
            rule(),
            SelectConfig::default(),
        ));
        let mapper = AttributeMapper::delegating(
            inner.dupe(),
            vec![("suffix".to_owned(), Some(AttrValue::string("x")))],
        )
        .unwrap();
        assert_matches!(mapper.kind(), MapperKind::Delegating(..));
        assert!(!mapper.is_configurable("suffix").unwrap());
        assert_eq!(
            Some(AttrValue::string("x")),
            mapper.get_one("suffix").unwrap()
        );
        assert_eq!(
            vec![AttrValue::string("x")],
            mapper.all_values("suffix").unwrap()
        );
        assert_eq!(
            Some(AttrValue::string("lib")),
            mapper.get_one("base").unwrap()
        );
        // Not overridden: the inner mapper still refuses.
        assert!(mapper.get_one("srcs").is_err());

        let err = AttributeMapper::delegating(
            inner.dupe(),
            vec![("suffix".to_owned(), Some(AttrValue::Int(1)))],
        )
        .unwrap_err();
        assert_eq!(Some(SelectErrorKind::Conversion), select_error_kind(&err));
        let err =
            AttributeMapper::delegating(inner, vec![("nope".to_owned(), None)]).unwrap_err();
        assert_eq!(Some(SelectErrorKind::UnknownAttribute), select_error_kind(&err));
    }
}
