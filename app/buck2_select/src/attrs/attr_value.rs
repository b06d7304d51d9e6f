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
use display_container::fmt_container;
use display_container::fmt_keyed_container;
use gazebo::prelude::SliceExt;
use serde::Serialize;
use serde::Serializer;

use crate::target_label::TargetLabel;

#[derive(Debug, thiserror::Error)]
enum AttrValueError {
    #[error("Cannot serialize dict attr with key `{0}`, keys must be strings or labels")]
    NonStringDictKey(String),
}

/// A value of an attribute after coercion.
///
/// This is the only representation downstream code sees: the shape has already
/// been checked against an `AttrType` when the value was coerced.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Allocative)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    String(String),
    Label(TargetLabel),
    List(Vec<AttrValue>),
    Dict(Vec<(AttrValue, AttrValue)>),
}

/// Roughly the Starlark code that would produce this value, e.g. `["a", "b"]` or `{"k": 1}`.
impl Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Bool(true) => write!(f, "True"),
            AttrValue::Bool(false) => write!(f, "False"),
            AttrValue::Int(i) => write!(f, "{}", i),
            AttrValue::String(s) => write!(f, "\"{}\"", s),
            AttrValue::Label(l) => write!(f, "\"{}\"", l),
            AttrValue::List(items) => fmt_container(f, "[", "]", items),
            AttrValue::Dict(entries) => {
                fmt_keyed_container(f, "{", "}", ": ", entries.iter().map(|(k, v)| (k, v)))
            }
        }
    }
}

impl Serialize for AttrValue {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_json()
            .map_err(|e| serde::ser::Error::custom(format!("{}", e)))?
            .serialize(s)
    }
}

impl AttrValue {
    pub fn string(value: &str) -> AttrValue {
        AttrValue::String(value.to_owned())
    }

    pub fn unpack_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn unpack_label(&self) -> Option<&TargetLabel> {
        match self {
            AttrValue::Label(l) => Some(l),
            _ => None,
        }
    }

    pub fn unpack_list(&self) -> Option<&[AttrValue]> {
        match self {
            AttrValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn unpack_dict(&self) -> Option<&[(AttrValue, AttrValue)]> {
        match self {
            AttrValue::Dict(entries) => Some(entries),
            _ => None,
        }
    }

    /// Converts the value to JSON, the same shape it is accepted in by `AttrType::convert`.
    pub fn to_json(&self) -> anyhow::Result<serde_json::Value> {
        Ok(match self {
            AttrValue::Bool(b) => serde_json::Value::Bool(*b),
            AttrValue::Int(i) => serde_json::Value::from(*i),
            AttrValue::String(s) => serde_json::Value::String(s.clone()),
            AttrValue::Label(l) => serde_json::Value::String(l.to_string()),
            AttrValue::List(items) => serde_json::Value::Array(items.try_map(|v| v.to_json())?),
            AttrValue::Dict(entries) => {
                let mut map = serde_json::Map::with_capacity(entries.len());
                for (k, v) in entries {
                    let k = match k {
                        AttrValue::String(s) => s.clone(),
                        AttrValue::Label(l) => l.to_string(),
                        k => return Err(AttrValueError::NonStringDictKey(k.to_string()).into()),
                    };
                    map.insert(k, v.to_json()?);
                }
                serde_json::Value::Object(map)
            }
        })
    }
}
