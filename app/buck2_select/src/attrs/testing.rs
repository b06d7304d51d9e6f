/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is dual-licensed under either the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree or the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree. You may select, at your option, one of the
 * above-listed licenses.
 */

//! Utilities for tests, here and in downstream crates.

use crate::attrs::coercion_context::AttrCoercionContext;
use crate::attrs::coercion_context::PackageCoercionContext;

/// Coerces relative labels into `root//package/subdir`.
pub fn testing_coercion_ctx() -> impl AttrCoercionContext {
    PackageCoercionContext::new("root", "package/subdir")
}
