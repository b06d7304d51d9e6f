/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is dual-licensed under either the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree or the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree. You may select, at your option, one of the
 * above-listed licenses.
 */

pub mod attr_type;
pub mod attr_value;
pub mod coercion_context;
pub mod condition;
pub mod resolve;
pub mod selector;
pub mod selector_list;
pub mod spec;
pub mod testing;
