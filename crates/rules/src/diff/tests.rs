//! Tests for namespace comparison.

use super::*;
use crate::canonical::canonicalize;
use crate::parser::parse;
use crate::schema::{AlertRule, PromDuration, RecordRule, Rule};

fn sample() -> RuleNamespace {
    RuleNamespace::new(vec![
        RuleGroup::new(
            "alerts",
            vec![
                AlertRule::new("Down", "up == 0")
                    .with_for(PromDuration::from_mins(3))
                    .with_label("team", "sre")
                    .into(),
                AlertRule::new("Slow", "latency > 1")
                    .with_annotation("summary", "slow")
                    .into(),
                AlertRule::new("Errors", "errors > 0").into(),
            ],
        ),
        RuleGroup::new("records", vec![RecordRule::new("job:up:sum", "sum by (job) (up)").into()]),
    ])
}

fn first_rule(ns: &mut RuleNamespace) -> &mut Rule {
    &mut ns.groups[0].rules[0]
}

/// Every ordering of `items`.
fn permutations<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut out = Vec::new();
    for i in 0..items.len() {
        let mut rest = items.to_vec();
        let head = rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, head.clone());
            out.push(tail);
        }
    }
    out
}

#[test]
fn every_permutation_is_equivalent() {
    let mut a = sample();
    a.groups[1]
        .rules
        .push(RecordRule::new("job:down:count", "count by (job) (up == 0)").into());
    let expected = canonicalize(&a);

    let mut checked = 0;
    for groups in permutations(&a.groups) {
        let per_group: Vec<Vec<Vec<Rule>>> = groups.iter().map(|g| permutations(&g.rules)).collect();
        for first in &per_group[0] {
            for second in &per_group[1] {
                let mut b = RuleNamespace::new(groups.clone());
                b.groups[0].rules = first.clone();
                b.groups[1].rules = second.clone();
                b.namespace = Some("elsewhere".to_string());

                assert!(equivalent(&a, &b), "not equivalent: {:?}", b);
                assert!(!compare(&a, &b).is_changed());
                assert_eq!(canonicalize(&b), expected);
                checked += 1;
            }
        }
    }
    // 2 group orders, 3! alert orders, 2! record orders.
    assert_eq!(checked, 24);
}

#[test]
fn expression_change_is_detected() {
    let a = sample();
    let mut b = a.clone();
    *first_rule(&mut b).expr_mut() = "up == 1".to_string();
    assert!(!equivalent(&a, &b));
}

#[test]
fn duration_change_is_detected() {
    let a = sample();
    let mut b = a.clone();
    if let Rule::Alert(rule) = first_rule(&mut b) {
        rule.for_duration = Some(PromDuration::from_mins(5));
    }
    assert!(!equivalent(&a, &b));
}

#[test]
fn label_change_is_detected() {
    let a = sample();

    let mut changed = a.clone();
    if let Rule::Alert(rule) = first_rule(&mut changed) {
        rule.labels.insert("team".to_string(), "ops".to_string());
    }
    assert!(!equivalent(&a, &changed));

    let mut added = a.clone();
    if let Rule::Alert(rule) = first_rule(&mut added) {
        rule.labels.insert("route".to_string(), "pager".to_string());
    }
    assert!(!equivalent(&a, &added));
}

#[test]
fn duplicated_rule_is_not_equivalent() {
    let a = sample();
    let mut b = a.clone();
    let extra = b.groups[0].rules[0].clone();
    b.groups[0].rules.push(extra);
    assert!(!equivalent(&a, &b));
}

#[test]
fn compare_reports_per_group_state() {
    let old = sample();
    let mut new = old.clone();
    new.groups.remove(1);
    *first_rule(&mut new).expr_mut() = "up < 1".to_string();
    new.groups.push(RuleGroup::new("fresh", vec![AlertRule::new("New", "x > 0").into()]));

    let change = compare(&old, &new);
    assert!(change.is_changed());
    assert_eq!(change.names(ChangeState::Updated), vec!["alerts"]);
    assert_eq!(change.names(ChangeState::Deleted), vec!["records"]);
    assert_eq!(change.names(ChangeState::Created), vec!["fresh"]);

    let same = compare(&old, &old);
    assert_eq!(same.state, ChangeState::Unchanged);
    assert!(same.groups.iter().all(|g| g.state == ChangeState::Unchanged));
}

#[test]
fn yaml_comparison_ignores_formatting() {
    let authored = "groups:\n  - name: g\n    rules:\n      - alert: B\n        expr: b > 0\n      - alert: A\n        expr: a > 0\n        labels: {team: sre}\n";
    let stored = canonicalize(&parse(authored).unwrap());
    assert!(equivalent_yaml(&stored, authored));
    assert!(equivalent_yaml(authored, &stored));
}

#[test]
fn yaml_comparison_accepts_bare_group_lists() {
    let stored = "- name: g\n  rules:\n    - alert: A\n      expr: a > 0\n";
    let config = "namespace: x\ngroups:\n  - name: g\n    rules:\n      - alert: A\n        expr: a > 0\n";
    assert!(equivalent_yaml(stored, config));
}

#[test]
fn unparseable_side_reports_a_change() {
    let good = "groups:\n  - name: g\n    rules: []\n";
    assert!(!equivalent_yaml("groups: [", good));
    assert!(!equivalent_yaml(good, "groups: ["));
    assert!(!equivalent_yaml("", ""));
}
