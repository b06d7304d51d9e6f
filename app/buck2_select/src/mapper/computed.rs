/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is dual-licensed under either the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree or the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree. You may select, at your option, one of the
 * above-listed licenses.
 */

//! Evaluation of computed defaults over combinations of their inputs.

use allocative::Allocative;
use dupe::Dupe;
use itertools::Itertools;
use starlark_map::small_map::SmallMap;

use crate::attrs::attr_value::AttrValue;
use crate::attrs::spec::ComputedDefaultInputs;
use crate::error::SelectErrorKind;

#[derive(Debug, thiserror::Error)]
pub(crate) enum ComputationError {
    #[error(
        "Enumerating computed default `{attr}` needs more than {limit} evaluations (see $BUCK2_SELECT_COMPUTED_DEFAULT_LIMIT)"
    )]
    BudgetExceeded { attr: String, limit: usize },
}

impl ComputationError {
    pub(crate) fn kind(&self) -> SelectErrorKind {
        match self {
            ComputationError::BudgetExceeded { .. } => SelectErrorKind::ComputationBudgetExceeded,
        }
    }
}

/// Caps the number of computed default evaluations in one top level call.
#[derive(Debug, Clone, Copy, Dupe, Eq, PartialEq, Allocative)]
pub struct ComputationLimiter {
    limit: Option<usize>,
}

impl ComputationLimiter {
    pub fn new(limit: usize) -> Self {
        Self { limit: Some(limit) }
    }

    pub fn unlimited() -> Self {
        Self { limit: None }
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// A fresh counter for one top level call.
    pub fn budget(&self) -> ComputationBudget {
        ComputationBudget {
            limiter: *self,
            used: 0,
        }
    }
}

/// Evaluations spent so far. Threaded by `&mut` through one enumeration and
/// every computed default it reaches.
#[derive(Debug)]
pub struct ComputationBudget {
    limiter: ComputationLimiter,
    used: usize,
}

impl ComputationBudget {
    pub fn used(&self) -> usize {
        self.used
    }

    pub(crate) fn charge(&mut self, attr: &str) -> anyhow::Result<()> {
        self.used += 1;
        match self.limiter.limit {
            Some(limit) if self.used > limit => Err(ComputationError::BudgetExceeded {
                attr: attr.to_owned(),
                limit,
            }
            .into()),
            _ => Ok(()),
        }
    }
}

/// Calls `visitor` once for every element of the cartesian product of the
/// possible values of `deps`. `dep_values[i]` lists the values of `deps[i]`;
/// each list must be non-empty.
///
/// Every combination is charged to `budget` before it is visited.
pub(crate) fn for_each_combination(
    attr: &str,
    deps: &[String],
    dep_values: &[Vec<Option<AttrValue>>],
    budget: &mut ComputationBudget,
    visitor: &mut dyn FnMut(ComputedDefaultInputs) -> anyhow::Result<()>,
) -> anyhow::Result<()> {
    if deps.is_empty() {
        // `multi_cartesian_product` of nothing yields nothing, not one empty combination.
        budget.charge(attr)?;
        return visitor(ComputedDefaultInputs::new(attr, SmallMap::new()));
    }

    for combination in dep_values.iter().map(|v| v.iter()).multi_cartesian_product() {
        budget.charge(attr)?;
        tracing::trace!(
            "computed default `{}` combination {}: {}",
            attr,
            budget.used(),
            combination
                .iter()
                .map(|v| match v {
                    Some(v) => v.to_string(),
                    None => "None".to_owned(),
                })
                .join(", ")
        );
        let values = deps
            .iter()
            .cloned()
            .zip(combination.into_iter().cloned())
            .collect::<SmallMap<_, _>>();
        visitor(ComputedDefaultInputs::new(attr, values))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::attrs::attr_value::AttrValue;
    use crate::error::SelectErrorKind;
    use crate::error::select_error_kind;
    use crate::mapper::computed::ComputationLimiter;
    use crate::mapper::computed::for_each_combination;

    fn ints(xs: &[i64]) -> Vec<Option<AttrValue>> {
        xs.iter().map(|x| Some(AttrValue::Int(*x))).collect()
    }

    #[test]
    fn test_cartesian_product_order() {
        let deps = vec!["a".to_owned(), "b".to_owned()];
        let mut budget = ComputationLimiter::unlimited().budget();
        let mut seen = Vec::new();
        for_each_combination(
            "c",
            &deps,
            &[ints(&[1, 2]), ints(&[10, 20, 30])],
            &mut budget,
            &mut |inputs| {
                let a = inputs.get("a")?.cloned();
                let b = inputs.get("b")?.cloned();
                seen.push((a, b));
                Ok(())
            },
        )
        .unwrap();
        assert_eq!(6, budget.used());
        assert_eq!(
            vec![
                (Some(AttrValue::Int(1)), Some(AttrValue::Int(10))),
                (Some(AttrValue::Int(1)), Some(AttrValue::Int(20))),
                (Some(AttrValue::Int(1)), Some(AttrValue::Int(30))),
                (Some(AttrValue::Int(2)), Some(AttrValue::Int(10))),
                (Some(AttrValue::Int(2)), Some(AttrValue::Int(20))),
                (Some(AttrValue::Int(2)), Some(AttrValue::Int(30))),
            ],
            seen
        );
    }

    #[test]
    fn test_no_deps_is_one_combination() {
        let mut budget = ComputationLimiter::new(1).budget();
        let mut count = 0;
        for_each_combination("c", &[], &[], &mut budget, &mut |_| {
            count += 1;
            Ok(())
        })
        .unwrap();
        assert_eq!(1, count);
    }

    #[test]
    fn test_budget_exceeded() {
        let deps = vec!["a".to_owned(), "b".to_owned()];
        let mut budget = ComputationLimiter::new(3).budget();
        let mut count = 0;
        let err = for_each_combination(
            "c",
            &deps,
            &[ints(&[1, 2]), ints(&[1, 2])],
            &mut budget,
            &mut |_| {
                count += 1;
                Ok(())
            },
        )
        .unwrap_err();
        assert_eq!(3, count);
        assert_eq!(
            Some(SelectErrorKind::ComputationBudgetExceeded),
            select_error_kind(&err)
        );
    }

    #[test]
    fn test_undeclared_input() {
        let deps = vec!["a".to_owned()];
        let mut budget = ComputationLimiter::unlimited().budget();
        let err = for_each_combination("c", &deps, &[ints(&[1])], &mut budget, &mut |inputs| {
            inputs.get("b")?;
            Ok(())
        })
        .unwrap_err();
        assert_eq!(Some(SelectErrorKind::UnknownAttribute), select_error_kind(&err));
    }
}
