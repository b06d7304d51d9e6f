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

use crate::error::SelectErrorKind;

#[derive(Debug, thiserror::Error)]
pub(crate) enum TargetLabelError {
    #[error("Invalid target label `{0}`: {1}")]
    Invalid(String, &'static str),
}

impl TargetLabelError {
    pub(crate) fn kind(&self) -> SelectErrorKind {
        match self {
            TargetLabelError::Invalid(..) => SelectErrorKind::Conversion,
        }
    }
}

#[derive(Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Allocative)]
struct TargetLabelData {
    cell: String,
    package: String,
    name: String,
}

/// A fully qualified reference to a target, `cell//package:name`.
///
/// Used both for cross-references embedded in attribute values (deps) and for
/// `select()` condition keys.
#[derive(Debug, Clone, Dupe, Eq, PartialEq, Hash, Ord, PartialOrd, Allocative)]
pub struct TargetLabel(Arc<TargetLabelData>);

impl Display for TargetLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}//{}:{}", self.0.cell, self.0.package, self.0.name)
    }
}

impl TargetLabel {
    pub fn new(cell: &str, package: &str, name: &str) -> anyhow::Result<TargetLabel> {
        let label = || format!("{}//{}:{}", cell, package, name);
        if cell.is_empty() {
            return Err(TargetLabelError::Invalid(label(), "empty cell name").into());
        }
        if name.is_empty() {
            return Err(TargetLabelError::Invalid(label(), "empty target name").into());
        }
        if name.contains(['/', ':']) {
            return Err(TargetLabelError::Invalid(label(), "target name contains `/` or `:`").into());
        }
        if package.starts_with('/') || package.ends_with('/') || package.contains("//") {
            return Err(TargetLabelError::Invalid(label(), "malformed package path").into());
        }
        for part in [cell, package, name] {
            if part.chars().any(|c| c.is_whitespace() || c.is_control()) {
                return Err(
                    TargetLabelError::Invalid(label(), "whitespace is not allowed").into(),
                );
            }
        }
        Ok(TargetLabel(Arc::new(TargetLabelData {
            cell: cell.to_owned(),
            package: package.to_owned(),
            name: name.to_owned(),
        })))
    }

    /// Parse a label relative to the package it appears in.
    ///
    /// Accepts `cell//pkg:name`, `//pkg:name` (current cell), `:name` (current
    /// package) and `//pkg/dir` (name defaults to the last package component).
    pub fn parse(value: &str, cell: &str, package: &str) -> anyhow::Result<TargetLabel> {
        if let Some(name) = value.strip_prefix(':') {
            return TargetLabel::new(cell, package, name);
        }

        let (label_cell, rest) = value.split_once("//").ok_or_else(|| {
            TargetLabelError::Invalid(value.to_owned(), "expected `//` or a leading `:`")
        })?;
        let label_cell = if label_cell.is_empty() {
            cell
        } else {
            label_cell
        };

        let (label_package, name) = match rest.split_once(':') {
            Some((p, n)) => (p, n),
            None => {
                let last = rest.rsplit('/').next().unwrap_or(rest);
                if last.is_empty() {
                    return Err(TargetLabelError::Invalid(
                        value.to_owned(),
                        "cannot infer target name",
                    )
                    .into());
                }
                (rest, last)
            }
        };
        TargetLabel::new(label_cell, label_package, name)
    }

    pub fn cell(&self) -> &str {
        &self.0.cell
    }

    pub fn package(&self) -> &str {
        &self.0.package
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn testing_parse(value: &str) -> TargetLabel {
        TargetLabel::parse(value, "root", "").unwrap()
    }
}
