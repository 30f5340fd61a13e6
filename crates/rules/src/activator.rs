//! Reified-rule activation
//!
//! Watches `(?r, MEMBEROF, RULE, SYSTEM)`. On membership, the rule's
//! `MATCHES`/`PRODUCES`/`NAC` template quads are read, compiled into a
//! pattern, and a firing watcher is installed; an initial scan then fires
//! the rule for every pre-existing match, which makes activation order
//! independent of data order. `(?r, MEMBEROF, RULE, TOMBSTONE)` uninstalls.

use crate::template::parse_template;
use crate::{RuleError, RuleResult};
use engine::{EngineError, EngineResult, MatchEvent, Pattern, Store, Template, WatcherHandle};
use quad_model::{pattern_var, word, Atom, Binding, SystemVocab, WC};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

// Firing contexts are `<rule>:F<millis>:<nonce>`; the process-wide nonce
// keeps ids unique under rapid firing, where timestamps alone collide
static FIRING_NONCE: AtomicU64 = AtomicU64::new(0);

#[derive(Default)]
struct Registry {
    active: FxHashMap<Atom, WatcherHandle>,
}

/// Installed rule activator
///
/// Holds the membership and tombstone watchers plus the registry of active
/// rules. Dropping the value does not uninstall; use
/// [`RuleActivator::uninstall`].
pub struct RuleActivator {
    registry: Rc<RefCell<Registry>>,
    membership: WatcherHandle,
    tombstone: WatcherHandle,
}

impl RuleActivator {
    /// Install the activator into a store
    ///
    /// Writes the idempotent self-description quad, installs the membership
    /// and tombstone watchers, and activates any rule whose membership quad
    /// already exists (and is not tombstoned).
    pub fn install(store: &mut Store) -> RuleResult<Self> {
        store.append(
            word(SystemVocab::RULE_TYPE),
            word(SystemVocab::TYPE),
            word(SystemVocab::TYPE_TYPE),
            Some(word(SystemVocab::SYSTEM)),
        )?;

        let registry = Rc::new(RefCell::new(Registry::default()));

        let reg = Rc::clone(&registry);
        let membership = store.watch(
            Pattern::new(vec![[
                pattern_var("r"),
                word(SystemVocab::MEMBER_OF),
                word(SystemVocab::RULE),
                word(SystemVocab::SYSTEM),
            ]]),
            move |store, event| {
                let rule = required(event, "r")?;
                activate(store, &reg, rule)
            },
        )?;

        let reg = Rc::clone(&registry);
        let tombstone = store.watch(
            Pattern::new(vec![[
                pattern_var("r"),
                word(SystemVocab::MEMBER_OF),
                word(SystemVocab::RULE),
                word(SystemVocab::TOMBSTONE),
            ]]),
            move |store, event| {
                let rule = required(event, "r")?;
                let removed = reg.borrow_mut().active.remove(&rule);
                if let Some(handle) = removed {
                    store.unwatch(handle);
                    info!(rule = %rule, "rule deactivated");
                }
                Ok(())
            },
        )?;

        // Memberships recorded before install still count
        let existing = store.query(&Pattern::new(vec![[
            pattern_var("r"),
            word(SystemVocab::MEMBER_OF),
            word(SystemVocab::RULE),
            word(SystemVocab::SYSTEM),
        ]]))?;
        for binding in existing {
            if let Some(rule) = binding.get_named("r") {
                activate(store, &registry, rule.clone())?;
            }
        }

        Ok(Self {
            registry,
            membership,
            tombstone,
        })
    }

    /// Remove the activator and every watcher it installed
    pub fn uninstall(self, store: &mut Store) {
        store.unwatch(self.membership);
        store.unwatch(self.tombstone);
        for (_, handle) in self.registry.borrow_mut().active.drain() {
            store.unwatch(handle);
        }
    }

    /// Atoms of the currently active rules
    pub fn active_rules(&self) -> Vec<Atom> {
        self.registry.borrow().active.keys().cloned().collect()
    }
}

pub(crate) fn required(event: &MatchEvent, name: &str) -> EngineResult<Atom> {
    event
        .binding
        .get_named(name)
        .cloned()
        .ok_or_else(|| EngineError::Callback(format!("binding missing ?{}", name)))
}

struct Definition {
    matches: Vec<Template>,
    nacs: Vec<Template>,
    produces: Vec<Template>,
}

fn activate(store: &mut Store, registry: &Rc<RefCell<Registry>>, rule: Atom) -> EngineResult<()> {
    if registry.borrow().active.contains_key(&rule) {
        // Re-activation is a no-op
        return Ok(());
    }
    if store.contains(
        &rule,
        &word(SystemVocab::MEMBER_OF),
        &word(SystemVocab::RULE),
        &word(SystemVocab::TOMBSTONE),
    ) {
        // A tombstoned rule never comes back
        return Ok(());
    }

    let definition = match read_definition(store, &rule) {
        Ok(definition) => definition,
        Err(RuleError::Engine(err)) => return Err(err),
        Err(err) => {
            // The rule is not activated; leave a diagnostic in the store
            warn!(rule = %rule, error = %err, "rule rejected");
            store.append(
                rule.clone(),
                word(SystemVocab::DIAGNOSTIC),
                Atom::from(err.to_string()),
                Some(word(SystemVocab::SYSTEM)),
            )?;
            return Ok(());
        }
    };

    let pattern = Pattern::new(definition.matches).with_nacs(definition.nacs);
    let produces = Rc::new(definition.produces);

    let rule_in_cb = rule.clone();
    let produces_in_cb = Rc::clone(&produces);
    let handle = store.watch(pattern.clone(), move |store, event| {
        fire(store, &rule_in_cb, &produces_in_cb, &event.binding)
    })?;
    registry.borrow_mut().active.insert(rule.clone(), handle);
    info!(rule = %rule, "rule activated");

    // Initial scan: fire for data that predates activation
    for event in store.query_matches(&pattern)? {
        fire(store, &rule, &produces, &event.binding)?;
    }
    Ok(())
}

fn read_definition(store: &Store, rule: &Atom) -> RuleResult<Definition> {
    let matches = templates_for(store, rule, SystemVocab::MATCHES)?;
    let produces = templates_for(store, rule, SystemVocab::PRODUCES)?;
    let nacs = templates_for(store, rule, SystemVocab::NAC)?;

    if produces.is_empty() {
        return Err(RuleError::Definition(format!(
            "rule {} has no PRODUCES templates",
            rule
        )));
    }

    let mut bound = Vec::new();
    for template in &matches {
        for atom in template {
            if let Atom::Var(var) = atom {
                bound.push(var.symbol());
            }
        }
    }
    for template in &produces {
        for (position, atom) in template.iter().enumerate() {
            match atom {
                Atom::Var(var) if !bound.contains(&var.symbol()) => {
                    return Err(RuleError::Definition(format!(
                        "produce variable ?{} is not bound by any match template",
                        var.name()
                    )));
                }
                Atom::Wildcard if position != 3 => {
                    return Err(RuleError::Definition(
                        "wildcard in a produce template is only meaningful in the context \
                         position"
                            .into(),
                    ));
                }
                _ => {}
            }
        }
    }

    Ok(Definition {
        matches,
        nacs,
        produces,
    })
}

fn templates_for(store: &Store, rule: &Atom, attribute: &str) -> RuleResult<Vec<Template>> {
    let bindings = store.query(&Pattern::new(vec![[
        rule.clone(),
        word(attribute),
        pattern_var("q"),
        WC,
    ]]))?;

    let mut templates = Vec::with_capacity(bindings.len());
    for binding in bindings {
        let atom = binding
            .get_named("q")
            .ok_or_else(|| RuleError::Definition("template binding missing".into()))?;
        let text = atom.as_str().ok_or_else(|| {
            RuleError::Definition(format!(
                "{} template must be a string, found {}",
                attribute, atom
            ))
        })?;
        templates.push(parse_template(text)?);
    }
    Ok(templates)
}

/// Fire a rule: produced quads first, then the firing records, so watchers
/// triggered by the firing see complete data
fn fire(
    store: &mut Store,
    rule: &Atom,
    produces: &[Template],
    binding: &Binding,
) -> EngineResult<()> {
    let nonce = FIRING_NONCE.fetch_add(1, Ordering::Relaxed);
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64;
    let firing = word(&format!("{}:F{}:{}", rule_label(rule), now, nonce));

    for template in produces {
        let [source, attribute, target, context] = instantiate(template, binding, &firing)?;
        store.append(source, attribute, target, Some(context))?;
    }
    store.append(
        rule.clone(),
        word(SystemVocab::FIRED),
        firing.clone(),
        Some(word(SystemVocab::SYSTEM)),
    )?;
    store.append(
        firing,
        word(SystemVocab::TIMESTAMP),
        Atom::from(now),
        Some(word(SystemVocab::SYSTEM)),
    )?;
    Ok(())
}

fn instantiate(template: &Template, binding: &Binding, firing: &Atom) -> EngineResult<[Atom; 4]> {
    let mut out = [WC, WC, WC, WC];
    for (position, atom) in template.iter().enumerate() {
        out[position] = match atom {
            Atom::Var(var) => binding.get(var.symbol()).cloned().ok_or_else(|| {
                EngineError::Callback(format!("unbound ?{} in produce template", var.name()))
            })?,
            Atom::Wildcard if position == 3 => firing.clone(),
            Atom::Wildcard => {
                return Err(EngineError::Callback(
                    "wildcard outside the context position of a produce template".into(),
                ))
            }
            other => other.clone(),
        };
    }
    Ok(out)
}

fn rule_label(rule: &Atom) -> String {
    match rule {
        Atom::Word(w) => w.as_str().to_string(),
        Atom::Str(s) => s.to_string(),
        other => other.to_string(),
    }
}
