/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is dual-licensed under either the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree or the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree. You may select, at your option, one of the
 * above-listed licenses.
 */

use crate::attrs::condition::ConditionKey;
use crate::attrs::condition::DEFAULT_CONDITION_KEY;
use crate::target_label::TargetLabel;

/// The context for attribute coercion. Mostly just contains information about
/// the current package (to support things like parsing targets from strings).
pub trait AttrCoercionContext {
    /// Attempt to convert a string into a label
    fn coerce_target_label(&self, value: &str) -> anyhow::Result<TargetLabel>;

    fn coerce_condition_key(&self, value: &str) -> anyhow::Result<ConditionKey> {
        if value == DEFAULT_CONDITION_KEY {
            Ok(ConditionKey::Default)
        } else {
            Ok(ConditionKey::Label(self.coerce_target_label(value)?))
        }
    }
}

/// Coerces labels relative to one package.
#[derive(Debug, Clone)]
pub struct PackageCoercionContext {
    cell: String,
    package: String,
}

impl PackageCoercionContext {
    pub fn new(cell: &str, package: &str) -> Self {
        Self {
            cell: cell.to_owned(),
            package: package.to_owned(),
        }
    }
}

impl AttrCoercionContext for PackageCoercionContext {
    fn coerce_target_label(&self, value: &str) -> anyhow::Result<TargetLabel> {
        TargetLabel::parse(value, &self.cell, &self.package)
    }
}
