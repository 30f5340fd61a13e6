// Reified rules end to end: activation, initial scan, firing records,
// tombstones, diagnostics

use engine::{Pattern, Store};
use quad_model::{pattern_var, word, Atom, WC};
use rules::RuleActivator;

fn define_adult_rule(store: &mut Store, name: &str) {
    let rule = word(name);
    store
        .append(
            rule.clone(),
            word("TYPE"),
            word("RULE!"),
            Some(word("system")),
        )
        .unwrap();
    store
        .append(
            rule.clone(),
            word("matches"),
            Atom::from("?p age ?a *"),
            Some(rule.clone()),
        )
        .unwrap();
    store
        .append(
            rule.clone(),
            word("produces"),
            Atom::from("?p ADULT TRUE *"),
            Some(rule),
        )
        .unwrap();
}

fn activate(store: &mut Store, name: &str) {
    store
        .append(
            word(name),
            word("memberOf"),
            word("rule"),
            Some(word("system")),
        )
        .unwrap();
}

fn adults(store: &Store) -> Vec<String> {
    let mut out: Vec<String> = store
        .query(&Pattern::new(vec![[
            pattern_var("p"),
            word("ADULT"),
            word("TRUE"),
            WC,
        ]]))
        .unwrap()
        .into_iter()
        .map(|binding| binding.get_named("p").unwrap().to_string())
        .collect();
    out.sort();
    out.dedup();
    out
}

fn firings(store: &Store, rule: &str) -> usize {
    store
        .query(&Pattern::new(vec![[
            word(rule),
            word("FIRED"),
            pattern_var("f"),
            word("system"),
        ]]))
        .unwrap()
        .len()
}

#[test]
fn test_rule_fires_for_preexisting_data() {
    let mut store = Store::new();
    store
        .append(word("bob"), word("age"), Atom::from(25), None)
        .unwrap();
    store
        .append(word("carol"), word("age"), Atom::from(40), None)
        .unwrap();

    let _activator = RuleActivator::install(&mut store).unwrap();
    define_adult_rule(&mut store, "adults");
    activate(&mut store, "adults");

    assert_eq!(adults(&store), vec!["BOB", "CAROL"]);
    assert_eq!(firings(&store, "adults"), 2);
}

#[test]
fn test_rule_fires_for_later_data() {
    let mut store = Store::new();
    let _activator = RuleActivator::install(&mut store).unwrap();
    define_adult_rule(&mut store, "adults");
    activate(&mut store, "adults");

    store
        .append(word("dave"), word("age"), Atom::from(33), None)
        .unwrap();

    assert_eq!(adults(&store), vec!["DAVE"]);
}

#[test]
fn test_activation_is_order_independent() {
    let build = |data_first: bool| {
        let mut store = Store::new();
        let _activator = RuleActivator::install(&mut store).unwrap();
        define_adult_rule(&mut store, "adults");
        if data_first {
            store
                .append(word("bob"), word("age"), Atom::from(25), None)
                .unwrap();
            activate(&mut store, "adults");
        } else {
            activate(&mut store, "adults");
            store
                .append(word("bob"), word("age"), Atom::from(25), None)
                .unwrap();
        }
        (adults(&store), firings(&store, "adults"))
    };

    assert_eq!(build(true), build(false));
}

#[test]
fn test_each_firing_records_timestamp() {
    let mut store = Store::new();
    let _activator = RuleActivator::install(&mut store).unwrap();
    define_adult_rule(&mut store, "adults");
    activate(&mut store, "adults");
    store
        .append(word("bob"), word("age"), Atom::from(25), None)
        .unwrap();

    let fired = store
        .query(&Pattern::new(vec![[
            word("adults"),
            word("FIRED"),
            pattern_var("f"),
            word("system"),
        ]]))
        .unwrap();
    assert_eq!(fired.len(), 1);

    let firing = fired[0].get_named("f").unwrap().clone();
    let stamps = store
        .query(&Pattern::new(vec![[
            firing,
            word("TIMESTAMP"),
            pattern_var("t"),
            word("system"),
        ]]))
        .unwrap();
    assert_eq!(stamps.len(), 1);
    assert!(stamps[0].get_named("t").unwrap().is_number());
}

#[test]
fn test_firing_contexts_are_unique() {
    let mut store = Store::new();
    let _activator = RuleActivator::install(&mut store).unwrap();
    define_adult_rule(&mut store, "adults");
    activate(&mut store, "adults");

    for (name, age) in [("a", 20), ("b", 30), ("c", 40)] {
        store
            .append(word(name), word("age"), Atom::from(age), None)
            .unwrap();
    }

    let mut contexts: Vec<String> = store
        .query(&Pattern::new(vec![[
            pattern_var("p"),
            word("ADULT"),
            word("TRUE"),
            pattern_var("c"),
        ]]))
        .unwrap()
        .into_iter()
        .map(|binding| binding.get_named("c").unwrap().to_string())
        .collect();
    let total = contexts.len();
    contexts.sort();
    contexts.dedup();

    assert_eq!(total, 3);
    assert_eq!(contexts.len(), 3);
}

#[test]
fn test_rule_with_nac() {
    let mut store = Store::new();
    let _activator = RuleActivator::install(&mut store).unwrap();

    let rule = word("living-adults");
    store
        .append(
            rule.clone(),
            word("matches"),
            Atom::from("?p age ?a *"),
            Some(rule.clone()),
        )
        .unwrap();
    store
        .append(
            rule.clone(),
            word("produces"),
            Atom::from("?p ADULT TRUE *"),
            Some(rule.clone()),
        )
        .unwrap();
    store
        .append(
            rule.clone(),
            word("nac"),
            Atom::from("?p DELETED TRUE *"),
            Some(rule),
        )
        .unwrap();

    store
        .append(word("alice"), word("DELETED"), word("TRUE"), None)
        .unwrap();
    store
        .append(word("alice"), word("age"), Atom::from(30), None)
        .unwrap();
    store
        .append(word("bob"), word("age"), Atom::from(25), None)
        .unwrap();

    activate(&mut store, "living-adults");

    assert_eq!(adults(&store), vec!["BOB"]);
}

#[test]
fn test_tombstone_deactivates() {
    let mut store = Store::new();
    let activator = RuleActivator::install(&mut store).unwrap();
    define_adult_rule(&mut store, "adults");
    activate(&mut store, "adults");

    store
        .append(word("bob"), word("age"), Atom::from(25), None)
        .unwrap();
    assert_eq!(adults(&store).len(), 1);
    assert_eq!(activator.active_rules().len(), 1);

    store
        .append(
            word("adults"),
            word("memberOf"),
            word("rule"),
            Some(word("tombstone")),
        )
        .unwrap();
    assert!(activator.active_rules().is_empty());

    store
        .append(word("carol"), word("age"), Atom::from(40), None)
        .unwrap();
    assert_eq!(adults(&store).len(), 1);
}

#[test]
fn test_reactivation_is_noop() {
    // The membership quad dedups, and the registry ignores repeats; either
    // way the rule must not double-fire
    let mut store = Store::new();
    let _activator = RuleActivator::install(&mut store).unwrap();
    define_adult_rule(&mut store, "adults");
    activate(&mut store, "adults");
    activate(&mut store, "adults");

    store
        .append(word("bob"), word("age"), Atom::from(25), None)
        .unwrap();

    assert_eq!(firings(&store, "adults"), 1);
}

#[test]
fn test_malformed_template_writes_diagnostic() {
    let mut store = Store::new();
    let activator = RuleActivator::install(&mut store).unwrap();

    let rule = word("broken");
    store
        .append(
            rule.clone(),
            word("matches"),
            Atom::from("only two"),
            Some(rule.clone()),
        )
        .unwrap();
    store
        .append(
            rule.clone(),
            word("produces"),
            Atom::from("?p ADULT TRUE *"),
            Some(rule),
        )
        .unwrap();
    activate(&mut store, "broken");

    assert!(activator.active_rules().is_empty());
    let diagnostics = store
        .query(&Pattern::new(vec![[
            word("broken"),
            word("DIAGNOSTIC"),
            pattern_var("d"),
            word("system"),
        ]]))
        .unwrap();
    assert_eq!(diagnostics.len(), 1);
}

#[test]
fn test_unbound_produce_variable_rejected() {
    let mut store = Store::new();
    let activator = RuleActivator::install(&mut store).unwrap();

    let rule = word("loose");
    store
        .append(
            rule.clone(),
            word("matches"),
            Atom::from("?p age ?a *"),
            Some(rule.clone()),
        )
        .unwrap();
    store
        .append(
            rule.clone(),
            word("produces"),
            Atom::from("?q ADULT TRUE *"),
            Some(rule),
        )
        .unwrap();
    activate(&mut store, "loose");

    assert!(activator.active_rules().is_empty());
}

#[test]
fn test_membership_before_install_activates() {
    let mut store = Store::new();
    define_adult_rule(&mut store, "adults");
    activate(&mut store, "adults");
    store
        .append(word("bob"), word("age"), Atom::from(25), None)
        .unwrap();

    let activator = RuleActivator::install(&mut store).unwrap();

    assert_eq!(activator.active_rules().len(), 1);
    assert_eq!(adults(&store), vec!["BOB"]);
}

#[test]
fn test_rule_cascade_through_produced_quads() {
    // Rule A produces quads that rule B matches
    let mut store = Store::new();
    let _activator = RuleActivator::install(&mut store).unwrap();

    let a = word("promote");
    store
        .append(
            a.clone(),
            word("matches"),
            Atom::from("?p age ?a *"),
            Some(a.clone()),
        )
        .unwrap();
    store
        .append(
            a.clone(),
            word("produces"),
            Atom::from("?p ADULT TRUE *"),
            Some(a),
        )
        .unwrap();

    let b = word("enroll");
    store
        .append(
            b.clone(),
            word("matches"),
            Atom::from("?p ADULT TRUE *"),
            Some(b.clone()),
        )
        .unwrap();
    store
        .append(
            b.clone(),
            word("produces"),
            Atom::from("?p VOTER TRUE *"),
            Some(b),
        )
        .unwrap();

    activate(&mut store, "promote");
    activate(&mut store, "enroll");

    store
        .append(word("bob"), word("age"), Atom::from(25), None)
        .unwrap();

    let voters = store
        .query(&Pattern::new(vec![[
            pattern_var("p"),
            word("VOTER"),
            word("TRUE"),
            WC,
        ]]))
        .unwrap();
    assert_eq!(voters.len(), 1);
    assert_eq!(voters[0].get_named("p"), Some(&word("bob")));
}
