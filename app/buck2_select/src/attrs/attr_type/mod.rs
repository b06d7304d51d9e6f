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
use std::sync::Arc;

use allocative::Allocative;
use dupe::Dupe;

use crate::attrs::attr_type::boolean::BoolAttrType;
use crate::attrs::attr_type::dict::DictAttrType;
use crate::attrs::attr_type::int::IntAttrType;
use crate::attrs::attr_type::label::DepAttrType;
use crate::attrs::attr_type::label::LabelAttrType;
use crate::attrs::attr_type::list::ListAttrType;
use crate::attrs::attr_type::string::StringAttrType;
use crate::attrs::attr_value::AttrValue;
use crate::attrs::coercion_context::AttrCoercionContext;
use crate::error::SelectErrorKind;
use crate::target_label::TargetLabel;

pub mod boolean;
pub mod dict;
pub mod int;
pub mod label;
pub mod list;
pub mod string;

#[derive(Debug, thiserror::Error)]
pub(crate) enum CoercionError {
    #[error("Expected value of type `{0}`, got `{1}`")]
    TypeError(&'static str, String),
    #[error("Integer `{0}` is not representable as a 64-bit signed integer")]
    IntOutOfRange(String),
    #[error("Value `{0}` does not match attribute type `{1}`")]
    ValueTypeMismatch(String, String),
    #[error("Addition not supported for attribute type `{0}`")]
    ConcatNotSupported(String),
    #[error("concat with no items (internal error)")]
    ConcatEmpty,
}

impl CoercionError {
    pub(crate) fn type_error(expected: &'static str, value: &serde_json::Value) -> CoercionError {
        CoercionError::TypeError(expected, value.to_string())
    }

    pub(crate) fn kind(&self) -> SelectErrorKind {
        match self {
            CoercionError::TypeError(..)
            | CoercionError::IntOutOfRange(..)
            | CoercionError::ValueTypeMismatch(..) => SelectErrorKind::Conversion,
            CoercionError::ConcatNotSupported(..) => SelectErrorKind::UnsupportedConcatenation,
            CoercionError::ConcatEmpty => SelectErrorKind::Internal,
        }
    }
}

/// The shape of values of one attribute.
///
/// Cheap to clone; a rule definition creates one per attribute and every
/// value of that attribute shares it.
#[derive(Debug, Clone, Dupe, Eq, PartialEq, Hash, Allocative)]
pub struct AttrType(Arc<AttrTypeInner>);

#[derive(Debug, Eq, PartialEq, Hash, Allocative)]
pub enum AttrTypeInner {
    Bool(BoolAttrType),
    Int(IntAttrType),
    String(StringAttrType),
    Label(LabelAttrType),
    Dep(DepAttrType),
    List(ListAttrType),
    Dict(DictAttrType),
}

#[derive(Debug, Clone, Copy, Dupe, Eq, PartialEq, Hash, Allocative)]
pub enum AttrTypeCategory {
    Scalar,
    List,
    Dict,
}

impl Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0 {
            AttrTypeInner::Bool(t) => t.fmt(f),
            AttrTypeInner::Int(t) => t.fmt(f),
            AttrTypeInner::String(t) => t.fmt(f),
            AttrTypeInner::Label(t) => t.fmt(f),
            AttrTypeInner::Dep(t) => t.fmt(f),
            AttrTypeInner::List(t) => t.fmt(f),
            AttrTypeInner::Dict(t) => t.fmt(f),
        }
    }
}

impl AttrType {
    fn new(inner: AttrTypeInner) -> Self {
        Self(Arc::new(inner))
    }

    pub fn bool() -> Self {
        Self::new(AttrTypeInner::Bool(BoolAttrType))
    }

    pub fn int() -> Self {
        Self::new(AttrTypeInner::Int(IntAttrType))
    }

    pub fn string() -> Self {
        Self::new(AttrTypeInner::String(StringAttrType))
    }

    pub fn label() -> Self {
        Self::new(AttrTypeInner::Label(LabelAttrType))
    }

    pub fn dep() -> Self {
        Self::new(AttrTypeInner::Dep(DepAttrType))
    }

    pub fn list(inner: AttrType) -> Self {
        Self::new(AttrTypeInner::List(ListAttrType::new(inner)))
    }

    pub fn dict(key: AttrType, value: AttrType) -> Self {
        Self::new(AttrTypeInner::Dict(DictAttrType::new(key, value)))
    }

    pub fn inner(&self) -> &AttrTypeInner {
        &self.0
    }

    pub fn category(&self) -> AttrTypeCategory {
        match &*self.0 {
            AttrTypeInner::Bool(_)
            | AttrTypeInner::Int(_)
            | AttrTypeInner::String(_)
            | AttrTypeInner::Label(_)
            | AttrTypeInner::Dep(_) => AttrTypeCategory::Scalar,
            AttrTypeInner::List(_) => AttrTypeCategory::List,
            AttrTypeInner::Dict(_) => AttrTypeCategory::Dict,
        }
    }

    /// Whether values of this type may be joined with `+`, i.e. whether a
    /// `select()` may be added to something. Scalars never can.
    pub fn supports_concat(&self) -> bool {
        self.category() != AttrTypeCategory::Scalar
    }

    /// The type of list elements, or of dict values.
    pub fn element_type(&self) -> Option<&AttrType> {
        match &*self.0 {
            AttrTypeInner::List(t) => Some(&t.inner),
            AttrTypeInner::Dict(t) => Some(&t.value),
            _ => None,
        }
    }

    /// The value an attribute takes when it is explicitly unset.
    ///
    /// References have no default, which is represented by `None`.
    pub fn default_value(&self) -> Option<AttrValue> {
        match &*self.0 {
            AttrTypeInner::Bool(_) => Some(AttrValue::Bool(false)),
            AttrTypeInner::Int(_) => Some(AttrValue::Int(0)),
            AttrTypeInner::String(_) => Some(AttrValue::String(String::new())),
            AttrTypeInner::Label(_) | AttrTypeInner::Dep(_) => None,
            AttrTypeInner::List(_) => Some(AttrValue::List(Vec::new())),
            AttrTypeInner::Dict(_) => Some(AttrValue::Dict(Vec::new())),
        }
    }

    /// Coerces a raw value to this type. This is the only place where the shape
    /// of a value is narrowed.
    pub fn convert(
        &self,
        value: &serde_json::Value,
        ctx: &dyn AttrCoercionContext,
    ) -> anyhow::Result<AttrValue> {
        match &*self.0 {
            AttrTypeInner::Bool(t) => t.coerce_item(value),
            AttrTypeInner::Int(t) => t.coerce_item(value),
            AttrTypeInner::String(t) => t.coerce_item(value),
            AttrTypeInner::Label(t) => t.coerce_item(value, ctx),
            AttrTypeInner::Dep(t) => t.coerce_item(value, ctx),
            AttrTypeInner::List(t) => t.coerce_item(value, ctx),
            AttrTypeInner::Dict(t) => t.coerce_item(value, ctx),
        }
    }

    /// Checks that an already coerced value has the shape of this type.
    pub fn check(&self, value: &AttrValue) -> anyhow::Result<()> {
        let ok = match (&*self.0, value) {
            (AttrTypeInner::Bool(_), AttrValue::Bool(_))
            | (AttrTypeInner::Int(_), AttrValue::Int(_))
            | (AttrTypeInner::String(_), AttrValue::String(_))
            | (AttrTypeInner::Label(_), AttrValue::Label(_))
            | (AttrTypeInner::Dep(_), AttrValue::Label(_)) => true,
            (AttrTypeInner::List(t), AttrValue::List(items)) => {
                for item in items {
                    t.inner.check(item)?;
                }
                true
            }
            (AttrTypeInner::Dict(t), AttrValue::Dict(entries)) => {
                for (k, v) in entries {
                    t.key.check(k)?;
                    t.value.check(v)?;
                }
                true
            }
            _ => false,
        };
        if ok {
            Ok(())
        } else {
            Err(CoercionError::ValueTypeMismatch(value.to_string(), self.to_string()).into())
        }
    }

    /// Joins values in order. Only valid for types that `supports_concat`.
    pub fn concat(&self, items: impl IntoIterator<Item = AttrValue>) -> anyhow::Result<AttrValue> {
        let mut items = items.into_iter().peekable();
        if items.peek().is_none() {
            return Err(CoercionError::ConcatEmpty.into());
        }
        match &*self.0 {
            AttrTypeInner::List(t) => t.concat(self, items),
            AttrTypeInner::Dict(t) => t.concat(self, items),
            _ => Err(CoercionError::ConcatNotSupported(self.to_string()).into()),
        }
    }

    /// Calls `visitor` for every target reference embedded in `value`, in order.
    ///
    /// Positions whose value does not have the expected shape are skipped.
    pub fn visit_references<'a>(
        &self,
        value: &'a AttrValue,
        visitor: &mut dyn FnMut(&'a TargetLabel),
    ) {
        match (&*self.0, value) {
            (AttrTypeInner::Label(_) | AttrTypeInner::Dep(_), AttrValue::Label(l)) => visitor(l),
            (AttrTypeInner::List(t), AttrValue::List(items)) => {
                for item in items {
                    t.inner.visit_references(item, visitor);
                }
            }
            (AttrTypeInner::Dict(t), AttrValue::Dict(entries)) => {
                for (k, v) in entries {
                    t.key.visit_references(k, visitor);
                    t.value.visit_references(v, visitor);
                }
            }
            _ => {}
        }
    }

    pub fn extract_references(&self, value: &AttrValue) -> Vec<TargetLabel> {
        let mut res = Vec::new();
        self.visit_references(value, &mut |l| res.push(l.dupe()));
        res
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use crate::attrs::attr_type::AttrType;
    use crate::attrs::attr_type::AttrTypeCategory;
    use crate::attrs::attr_value::AttrValue;
    use crate::attrs::testing::testing_coercion_ctx;
    use crate::error::SelectErrorKind;
    use crate::error::select_error_kind;
    use crate::target_label::TargetLabel;

    fn strings(xs: &[&str]) -> AttrValue {
        AttrValue::List(xs.iter().map(|x| AttrValue::string(x)).collect())
    }

    #[test]
    fn test_display() {
        assert_eq!(
            "attrs.dict(attrs.string(), attrs.list(attrs.dep()))",
            AttrType::dict(AttrType::string(), AttrType::list(AttrType::dep())).to_string()
        );
    }

    #[test]
    fn test_scalars_never_concat() {
        for ty in [
            AttrType::bool(),
            AttrType::int(),
            AttrType::string(),
            AttrType::label(),
            AttrType::dep(),
        ] {
            assert_eq!(AttrTypeCategory::Scalar, ty.category());
            assert!(!ty.supports_concat());
        }
        assert!(AttrType::list(AttrType::string()).supports_concat());
        assert!(AttrType::dict(AttrType::string(), AttrType::int()).supports_concat());
    }

    #[test]
    fn test_convert() {
        let ctx = testing_coercion_ctx();
        let ty = AttrType::list(AttrType::dep());
        let value = ty
            .convert(&serde_json::json!([":a", "//b:c", "cell1//d:e"]), &ctx)
            .unwrap();
        assert_eq!(
            r#"["root//package/subdir:a", "root//b:c", "cell1//d:e"]"#,
            value.to_string()
        );
    }

    #[test]
    fn test_convert_wrong_shape() {
        let ctx = testing_coercion_ctx();
        let err = AttrType::list(AttrType::string())
            .convert(&serde_json::json!(["a", 1]), &ctx)
            .unwrap_err();
        assert_eq!(Some(SelectErrorKind::Conversion), select_error_kind(&err));
        assert!(AttrType::int().convert(&serde_json::json!(1.5), &ctx).is_err());
        assert!(AttrType::bool().convert(&serde_json::json!("x"), &ctx).is_err());
    }

    #[test]
    fn test_convert_bad_reference() {
        let ctx = testing_coercion_ctx();
        let err = AttrType::dep()
            .convert(&serde_json::json!("not a label"), &ctx)
            .unwrap_err();
        assert_matches!(select_error_kind(&err), Some(SelectErrorKind::Conversion));
    }

    #[test]
    fn test_concat_list_keeps_duplicates() {
        let ty = AttrType::list(AttrType::string());
        assert_eq!(
            strings(&["a", "b", "b", "c"]),
            ty.concat([strings(&["a", "b"]), strings(&["b", "c"])])
                .unwrap()
        );
    }

    #[test]
    fn test_concat_dict_later_wins() {
        let ty = AttrType::dict(AttrType::string(), AttrType::int());
        let left = AttrValue::Dict(vec![
            (AttrValue::string("a"), AttrValue::Int(1)),
            (AttrValue::string("b"), AttrValue::Int(2)),
        ]);
        let right = AttrValue::Dict(vec![
            (AttrValue::string("c"), AttrValue::Int(3)),
            (AttrValue::string("a"), AttrValue::Int(4)),
        ]);
        assert_eq!(
            AttrValue::Dict(vec![
                (AttrValue::string("a"), AttrValue::Int(4)),
                (AttrValue::string("b"), AttrValue::Int(2)),
                (AttrValue::string("c"), AttrValue::Int(3)),
            ]),
            ty.concat([left, right]).unwrap()
        );
    }

    #[test]
    fn test_concat_scalar_fails() {
        let err = AttrType::string()
            .concat([AttrValue::string("a"), AttrValue::string("b")])
            .unwrap_err();
        assert_eq!(
            Some(SelectErrorKind::UnsupportedConcatenation),
            select_error_kind(&err)
        );
    }

    #[test]
    fn test_extract_references() {
        let ty = AttrType::dict(AttrType::label(), AttrType::list(AttrType::dep()));
        let a = TargetLabel::testing_parse("//:a");
        let b = TargetLabel::testing_parse("//:b");
        let value = AttrValue::Dict(vec![(
            AttrValue::Label(a.clone()),
            AttrValue::List(vec![AttrValue::Label(b.clone()), AttrValue::Label(a.clone())]),
        )]);
        assert_eq!(vec![a.clone(), b, a], ty.extract_references(&value));
        assert!(
            AttrType::list(AttrType::string())
                .extract_references(&strings(&["//:a"]))
                .is_empty()
        );
    }

    #[test]
    fn test_check() {
        let ty = AttrType::list(AttrType::string());
        assert!(ty.check(&strings(&["a"])).is_ok());
        assert!(ty.check(&AttrValue::List(vec![AttrValue::Int(1)])).is_err());
        assert!(ty.check(&AttrValue::Int(1)).is_err());
    }
}
