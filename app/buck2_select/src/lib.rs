/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is dual-licensed under either the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree or the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree. You may select, at your option, one of the
 * above-listed licenses.
 */

//! Configurable attributes: `select()` expressions, their resolution in one
//! configuration, and the enumeration of every value they can take.
//!
//! Raw attribute expressions are coerced into [`attrs::selector_list::SelectorList`]s
//! and read through an [`mapper::AttributeMapper`].

pub mod attrs;
pub mod config;
pub mod env_helper;
pub mod error;
pub mod mapper;
pub mod target_label;
