//! Reactive store facade
//!
//! Ties the log, the activation index and the per-watcher match state
//! together. Appends outside a batch propagate through a single-threaded
//! FIFO work queue: callbacks may re-enter `append`, which records the quad
//! and enqueues it; the outermost call drains the queue, so every quad's
//! callbacks run to completion before the next quad is dispatched.

use crate::activation::{ActivationIndex, WatcherId};
use crate::log::QuadLog;
use crate::matcher::{nac_blocked, MatchEvent, MatchState};
use crate::pattern::{CompiledPattern, Pattern};
use crate::{EngineError, EngineResult, StoreConfig};
use ahash::AHashSet;
use quad_model::{Atom, Binding, Quad, QuadId};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::{debug, trace};

/// Watcher callback: invoked once per newly completed, NAC-clear match
pub type WatchCallback = dyn FnMut(&mut Store, &MatchEvent) -> EngineResult<()>;

/// Handle returned by [`Store::watch`], used to uninstall
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct WatcherHandle(WatcherId);

struct WatcherEntry {
    pattern: Rc<CompiledPattern>,
    state: MatchState,
    /// Taken out for the duration of a call so the callback can borrow the
    /// store mutably
    callback: Option<Box<WatchCallback>>,
    /// Quads recorded before install are invisible to this watcher; raw
    /// watchers never fire retroactively
    min_quad: u64,
}

/// Store statistics
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    /// Visible quads
    pub quads: usize,
    /// Installed watchers
    pub watchers: usize,
    /// Matches delivered since construction
    pub completions: u64,
    /// Live partial matches across all watchers
    pub partials: usize,
}

/// The quad store
///
/// Single-threaded and re-entrant: one logical writer at a time, with
/// callbacks free to append, watch, unwatch and query.
pub struct Store {
    log: QuadLog,
    watchers: FxHashMap<WatcherId, WatcherEntry>,
    index: ActivationIndex,
    next_watcher: WatcherId,
    queue: VecDeque<QuadId>,
    propagating: bool,
    batch_depth: usize,
    completions: u64,
    config: StoreConfig,
}

impl Store {
    /// Create a store with default configuration
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Create a store with explicit configuration
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            log: QuadLog::with_capacity(config.expected_quads),
            watchers: FxHashMap::default(),
            index: ActivationIndex::new(),
            next_watcher: 0,
            queue: VecDeque::new(),
            propagating: false,
            batch_depth: 0,
            completions: 0,
            config,
        }
    }

    /// Append a quad, returning its context atom as handle
    ///
    /// Idempotent under quad identity: a duplicate returns the existing
    /// quad's context and fires nothing. With no context given, a fresh
    /// `EDGE:<id>` Word is synthesised (and later contextless appends of the
    /// same triple dedup against it). Outside a batch the quad is visible
    /// and propagated before this call returns; a callback fault surfaces
    /// here with the quad already recorded.
    pub fn append(
        &mut self,
        source: Atom,
        attribute: Atom,
        target: Atom,
        context: Option<Atom>,
    ) -> EngineResult<Atom> {
        let in_batch = self.batch_depth > 0;
        let appended = self
            .log
            .append(source, attribute, target, context, in_batch)?;
        let ctx = self.log.quad(appended.id).context.clone();
        if appended.fresh {
            trace!(quad = %self.log.quad(appended.id), in_batch, "quad recorded");
            if !in_batch {
                self.queue.push_back(appended.id);
                self.drain()?;
            }
        }
        Ok(ctx)
    }

    /// Run `body` as an atomic batch
    ///
    /// Appends inside the batch record quads but neither propagate nor touch
    /// pattern state. On success every batched quad becomes visible at once
    /// and is then propagated in id order. On failure the batch is
    /// discarded: the log, the id counter and all pattern state are exactly
    /// as before.
    pub fn batch<T>(
        &mut self,
        body: impl FnOnce(&mut Store) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let savepoint = self.log.savepoint();
        let first_pending = self.log.len();
        self.batch_depth += 1;
        let result = body(self);
        self.batch_depth -= 1;

        match result {
            Ok(value) => {
                if self.batch_depth == 0 {
                    self.log.commit();
                    for index in first_pending..self.log.len() {
                        self.queue.push_back(QuadId(index as u64));
                    }
                    self.drain()?;
                }
                Ok(value)
            }
            Err(err) => {
                self.log.rollback(savepoint);
                debug!(error = %err, "batch rolled back");
                Err(EngineError::BatchAborted(Box::new(err)))
            }
        }
    }

    /// Install a watcher
    ///
    /// The pattern is compiled and enrolled into the activation index. The
    /// callback fires once per newly completed match of quads appended from
    /// now on; existing quads are not replayed (the reified-rule activator
    /// layers retroactive scans on top of `query`).
    pub fn watch(
        &mut self,
        pattern: Pattern,
        callback: impl FnMut(&mut Store, &MatchEvent) -> EngineResult<()> + 'static,
    ) -> EngineResult<WatcherHandle> {
        let compiled = Rc::new(CompiledPattern::compile(pattern));
        let id = self.next_watcher;
        self.next_watcher += 1;
        self.index.enrol(id, &compiled);
        self.watchers.insert(
            id,
            WatcherEntry {
                pattern: compiled,
                state: MatchState::new(),
                callback: Some(Box::new(callback)),
                min_quad: self.log.len() as u64,
            },
        );
        debug!(watcher = id, "watcher installed");
        Ok(WatcherHandle(id))
    }

    /// Uninstall a watcher, dropping its partial-match state
    pub fn unwatch(&mut self, handle: WatcherHandle) {
        if let Some(entry) = self.watchers.remove(&handle.0) {
            self.index.remove(handle.0, &entry.pattern);
            debug!(watcher = handle.0, "watcher removed");
        }
    }

    /// Evaluate a pattern against the current store, returning bindings
    ///
    /// Equivalent to installing a watcher, replaying every visible quad in
    /// id order, collecting all completions and uninstalling. A pattern of
    /// zero templates yields one empty-binding completion when no NAC
    /// fires. An entirely-wildcard pattern degenerates to a scan.
    pub fn query(&self, pattern: &Pattern) -> EngineResult<Vec<Binding>> {
        Ok(self
            .query_matches(pattern)?
            .into_iter()
            .map(|event| event.binding)
            .collect())
    }

    /// Like [`Store::query`] but keeps the matched quads of each completion
    pub fn query_matches(&self, pattern: &Pattern) -> EngineResult<Vec<MatchEvent>> {
        let compiled = CompiledPattern::compile(pattern.clone());
        let mut out = Vec::new();

        if compiled.template_count() == 0 {
            if !nac_blocked(&self.log, &compiled, &Binding::new()) {
                out.push(MatchEvent {
                    binding: Binding::new(),
                    quads: Vec::new(),
                });
            }
            return Ok(out);
        }

        let mut state = MatchState::new();
        for position in 0..self.log.visible().len() {
            let quad = &self.log.visible()[position];
            for completion in state.advance(&compiled, quad) {
                if nac_blocked(&self.log, &compiled, &completion.binding) {
                    continue;
                }
                out.push(MatchEvent {
                    binding: completion.binding,
                    quads: self.resolve(&completion.quads),
                });
            }
        }
        Ok(out)
    }

    /// All visible quads recorded under a context
    pub fn edges_in_context(&self, context: &Atom) -> Vec<Quad> {
        self.log
            .visible()
            .iter()
            .filter(|quad| quad.context == *context)
            .cloned()
            .collect()
    }

    /// Distinct contexts in first-appearance order
    pub fn list_contexts(&self) -> Vec<Atom> {
        let mut seen = AHashSet::new();
        let mut out = Vec::new();
        for quad in self.log.visible() {
            if seen.insert(quad.context.clone()) {
                out.push(quad.context.clone());
            }
        }
        out
    }

    /// Whether a quad with these exact fields is visible
    pub fn contains(&self, source: &Atom, attribute: &Atom, target: &Atom, context: &Atom) -> bool {
        self.log.contains(&(
            source.clone(),
            attribute.clone(),
            target.clone(),
            context.clone(),
        ))
    }

    /// Number of visible quads
    pub fn len(&self) -> usize {
        self.log.visible().len()
    }

    /// Whether the store holds no visible quads
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over visible quads in id order
    pub fn quads(&self) -> impl Iterator<Item = &Quad> {
        self.log.visible().iter()
    }

    /// Statistics snapshot
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            quads: self.len(),
            watchers: self.watchers.len(),
            completions: self.completions,
            partials: self
                .watchers
                .values()
                .map(|entry| entry.state.partial_count())
                .sum(),
        }
    }

    /// Drain the propagation queue (outermost call only)
    fn drain(&mut self) -> EngineResult<()> {
        if self.propagating {
            return Ok(());
        }
        self.propagating = true;

        let mut propagated = 0usize;
        let result = loop {
            let Some(id) = self.queue.pop_front() else {
                break Ok(());
            };
            propagated += 1;
            if let Some(budget) = self.config.cascade_budget {
                if propagated > budget {
                    break Err(EngineError::ResourceLimit(format!(
                        "cascade exceeded {} quads",
                        budget
                    )));
                }
            }
            if let Err(err) = self.dispatch(id) {
                break Err(err);
            }
        };

        self.propagating = false;
        if result.is_err() {
            self.queue.clear();
        }
        result
    }

    /// Run one quad through every candidate watcher in install order
    fn dispatch(&mut self, id: QuadId) -> EngineResult<()> {
        let quad = self.log.quad(id).clone();
        let candidates = self.index.candidates(&quad);
        trace!(quad = %quad, candidates = candidates.len(), "dispatching");

        for watcher in candidates {
            // A callback earlier in this dispatch may have uninstalled it
            let Some(entry) = self.watchers.get_mut(&watcher) else {
                continue;
            };
            if id.0 < entry.min_quad {
                continue;
            }
            let pattern = entry.pattern.clone();
            let completions = entry.state.advance(&pattern, &quad);
            if completions.is_empty() {
                continue;
            }

            for completion in completions {
                if nac_blocked(&self.log, &pattern, &completion.binding) {
                    continue;
                }
                let event = MatchEvent {
                    binding: completion.binding,
                    quads: self.resolve(&completion.quads),
                };
                self.completions += 1;
                self.invoke(watcher, &event)?;
            }
        }
        Ok(())
    }

    /// Call a watcher's callback with its own slot taken out, so re-entrant
    /// store access is safe
    fn invoke(&mut self, watcher: WatcherId, event: &MatchEvent) -> EngineResult<()> {
        let Some(entry) = self.watchers.get_mut(&watcher) else {
            return Ok(());
        };
        let Some(mut callback) = entry.callback.take() else {
            return Ok(());
        };
        let result = callback(self, event);
        if let Some(entry) = self.watchers.get_mut(&watcher) {
            entry.callback = Some(callback);
        }
        result
    }

    fn resolve(&self, ids: &SmallVec<[QuadId; 4]>) -> Vec<Quad> {
        ids.iter().map(|id| self.log.quad(*id).clone()).collect()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
