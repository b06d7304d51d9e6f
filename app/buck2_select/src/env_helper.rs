/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is dual-licensed under either the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree or the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree. You may select, at your option, one of the
 * above-listed licenses.
 */

//! Process-level knobs read from the environment.

use std::env;
use std::env::VarError;

use anyhow::Context;
use once_cell::sync::OnceCell;

/// A lazily read, cached environment variable.
///
/// Must live in a `static`: the value is parsed on first access and reused
/// for the rest of the process.
pub struct EnvHelper<T> {
    convert: fn(&str) -> anyhow::Result<T>,
    var: &'static str,
    cell: OnceCell<Option<T>>,
}

impl<T> EnvHelper<T> {
    pub const fn with_converter(var: &'static str, convert: fn(&str) -> anyhow::Result<T>) -> Self {
        Self {
            convert,
            var,
            cell: OnceCell::new(),
        }
    }

    pub fn var(&self) -> &'static str {
        self.var
    }

    pub fn get(&'static self) -> anyhow::Result<Option<&'static T>> {
        let var = self.var;
        let convert = self.convert;

        self.cell
            .get_or_try_init(move || match env::var(var) {
                Ok(v) => {
                    tracing::info!("Env override found: ${} = {}", var, v);
                    Ok(Some(convert(&v)?))
                }
                Err(VarError::NotPresent) => Ok(None),
                Err(VarError::NotUnicode(..)) => Err(anyhow::anyhow!("Variable is not unicode")),
            })
            .map(Option::as_ref)
            .with_context(|| format!("Invalid value for ${}", var))
    }

    /// The value of the variable, or `default` if it is not set.
    pub fn get_copied_or(&'static self, default: T) -> anyhow::Result<T>
    where
        T: Copy,
    {
        Ok(self.get()?.copied().unwrap_or(default))
    }
}

/// Parses a count that must be at least one.
pub(crate) fn parse_positive_usize(value: &str) -> anyhow::Result<usize> {
    let n: usize = value
        .trim()
        .parse()
        .with_context(|| format!("expected a positive integer, got `{}`", value))?;
    if n == 0 {
        return Err(anyhow::anyhow!("expected a positive integer, got `0`"));
    }
    Ok(n)
}
