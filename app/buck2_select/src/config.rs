/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is dual-licensed under either the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree or the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree. You may select, at your option, one of the
 * above-listed licenses.
 */

use allocative::Allocative;
use dupe::Dupe;

use crate::env_helper::EnvHelper;
use crate::env_helper::parse_positive_usize;

static COMPUTED_DEFAULT_LIMIT: EnvHelper<usize> =
    EnvHelper::with_converter("BUCK2_SELECT_COMPUTED_DEFAULT_LIMIT", parse_positive_usize);
static DUPLICATE_CHECK_EXACT_MAX_SELECTS: EnvHelper<usize> = EnvHelper::with_converter(
    "BUCK2_SELECT_DUPLICATE_CHECK_EXACT_MAX_SELECTS",
    parse_positive_usize,
);

/// Tunables of attribute enumeration.
#[derive(Debug, Clone, Copy, Dupe, Eq, PartialEq, Allocative)]
pub struct SelectConfig {
    /// Maximum number of computed default evaluations in one enumeration.
    pub computed_default_limit: usize,
    /// Largest number of `select()`s in one attribute for which duplicate
    /// detection enumerates every value exactly. Above it, detection looks at
    /// each select separately and over-approximates.
    pub exact_duplicate_check_max_selects: usize,
}

impl SelectConfig {
    pub const DEFAULT_COMPUTED_DEFAULT_LIMIT: usize = 64;
    pub const DEFAULT_EXACT_DUPLICATE_CHECK_MAX_SELECTS: usize = 1;

    /// Defaults overridden by `$BUCK2_SELECT_COMPUTED_DEFAULT_LIMIT` and
    /// `$BUCK2_SELECT_DUPLICATE_CHECK_EXACT_MAX_SELECTS`.
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            computed_default_limit: COMPUTED_DEFAULT_LIMIT
                .get_copied_or(Self::DEFAULT_COMPUTED_DEFAULT_LIMIT)?,
            exact_duplicate_check_max_selects: DUPLICATE_CHECK_EXACT_MAX_SELECTS
                .get_copied_or(Self::DEFAULT_EXACT_DUPLICATE_CHECK_MAX_SELECTS)?,
        })
    }
}

impl Default for SelectConfig {
    fn default() -> Self {
        Self {
            computed_default_limit: Self::DEFAULT_COMPUTED_DEFAULT_LIMIT,
            exact_duplicate_check_max_selects: Self::DEFAULT_EXACT_DUPLICATE_CHECK_MAX_SELECTS,
        }
    }
}
