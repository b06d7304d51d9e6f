/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is dual-licensed under either the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree or the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree. You may select, at your option, one of the
 * above-listed licenses.
 */

use std::sync::Arc;
use std::thread;

use assert_matches::assert_matches;
use buck2_select::attrs::attr_type::AttrType;
use buck2_select::attrs::attr_value::AttrValue;
use buck2_select::attrs::resolve::MatchedConditionKeys;
use buck2_select::attrs::spec::RuleAttributes;
use buck2_select::config::SelectConfig;
use buck2_select::error::SelectErrorKind;
use buck2_select::error::select_error_kind;
use buck2_select::mapper::AttributeMapper;
use buck2_select::mapper::MapperKind;
use buck2_select::mapper::RuleMappers;
use buck2_select::target_label::TargetLabel;
use dupe::Dupe;

use crate::util::attr;
use crate::util::concat;
use crate::util::select;
use crate::util::string_list;
use crate::util::strings;

fn rule() -> anyhow::Result<Arc<RuleAttributes>> {
    Ok(Arc::new(RuleAttributes::new(vec![
        attr("name", AttrType::string(), serde_json::json!("lib"))?,
        attr(
            "srcs",
            string_list(),
            concat(vec![
                serde_json::json!(["main.c"]),
                select(serde_json::json!({"//os:linux": ["epoll.c"], "//os:mac": ["kqueue.c"]})),
            ]),
        )?,
        attr(
            "deps",
            AttrType::list(AttrType::dep()),
            select(serde_json::json!({"//os:linux": ["//third-party:uring"], "DEFAULT": []})),
        )?,
    ])?))
}

fn mac() -> Arc<MatchedConditionKeys> {
    Arc::new(MatchedConditionKeys::new(
        "mac",
        [TargetLabel::testing_parse("//os:mac")],
    ))
}

#[test]
fn non_configurable_mapper_rejects_select() -> anyhow::Result<()> {
    let mapper = AttributeMapper::non_configurable(rule()?, SelectConfig::default());
    let err = mapper.get_one("srcs").unwrap_err();
    assert_eq!(
        Some(SelectErrorKind::ConfigurableAttributeAccessedUnsafely),
        select_error_kind(&err)
    );
    assert!(err.to_string().contains("`srcs`"));
    assert_eq!(Some(AttrValue::string("lib")), mapper.get_one("name")?);
    Ok(())
}

#[test]
fn configured_mapper_resolves_one_value() -> anyhow::Result<()> {
    let mappers = RuleMappers::new(rule()?, SelectConfig::default());
    let mapper = mappers.configured(mac());
    assert_matches!(mapper.kind(), MapperKind::Configured(_));
    assert_eq!(Some(strings(&["main.c", "kqueue.c"])), mapper.get_one("srcs")?);
    assert_eq!(Some(AttrValue::List(Vec::new())), mapper.get_one("deps")?);
    assert_eq!(
        vec![strings(&["main.c", "kqueue.c"])],
        mapper.all_values("srcs")?
    );
    Ok(())
}

#[test]
fn configured_mapper_without_matching_condition() -> anyhow::Result<()> {
    let mapper = AttributeMapper::configured(
        rule()?,
        Arc::new(MatchedConditionKeys::new("windows", [])),
        SelectConfig::default(),
    );
    let err = mapper.get_one("srcs").unwrap_err();
    assert_eq!(
        Some(SelectErrorKind::NoMatchingCondition),
        select_error_kind(&err)
    );
    Ok(())
}

#[test]
fn delegating_mapper_overrides_configurable_attribute() -> anyhow::Result<()> {
    let mappers = RuleMappers::new(rule()?, SelectConfig::default());
    let mapper = AttributeMapper::delegating(
        mappers.non_configurable().dupe(),
        vec![("srcs".to_owned(), Some(strings(&["stub.c"])))],
    )?;
    assert_eq!(Some(strings(&["stub.c"])), mapper.get_one("srcs")?);
    assert_eq!(Some(AttrValue::string("lib")), mapper.get_one("name")?);
    let err = mapper.get_one("deps").unwrap_err();
    assert_eq!(
        Some(SelectErrorKind::ConfigurableAttributeAccessedUnsafely),
        select_error_kind(&err)
    );
    Ok(())
}

#[test]
fn mappers_are_shared_between_threads() -> anyhow::Result<()> {
    let mappers = RuleMappers::new(rule()?, SelectConfig::default());
    let expected = mappers.aggregating().all_values("srcs")?;
    assert_eq!(
        vec![
            strings(&["main.c", "epoll.c"]),
            strings(&["main.c", "kqueue.c"]),
        ],
        expected
    );
    thread::scope(|s| {
        let handles = (0..4)
            .map(|_| s.spawn(|| mappers.aggregating().all_values("srcs")))
            .collect::<Vec<_>>();
        for handle in handles {
            let values = handle.join().unwrap().unwrap();
            assert_eq!(expected, values);
        }
    });
    Ok(())
}

#[test]
fn cross_references_include_conditions() -> anyhow::Result<()> {
    let mapper = AttributeMapper::raw(rule()?, SelectConfig::default());
    let mut refs = Vec::new();
    mapper.visit_cross_references("deps", true, &mut |l| refs.push(l.to_string()))?;
    assert_eq!(vec!["root//os:linux", "root//third-party:uring"], refs);
    assert_eq!(
        vec![
            TargetLabel::testing_parse("//os:linux"),
            TargetLabel::testing_parse("//os:mac"),
        ],
        mapper
            .configurability_keys("srcs")?
            .into_iter()
            .collect::<Vec<_>>()
    );
    Ok(())
}
