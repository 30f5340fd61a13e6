//! Effect-operation protocol helper
//!
//! Convention: a caller writes inputs under a work context `W`, then appends
//! the request quad `(W, HANDLE, <op>, input)`. The installed watcher runs
//! the handler, appends its output quads under the `OUTPUT` context, and
//! appends the completion marker `(<op>, HANDLED, W, OUTPUT)` last. The
//! engine's ordering guarantee makes marker-last observable: any watcher on
//! the marker sees the outputs already in the store.

use crate::activator::required;
use engine::{EngineResult, Pattern, Store, WatcherHandle};
use quad_model::{pattern_var, word, Atom, SystemVocab};

/// Install a watcher handling requests for `operation`
///
/// The handler receives the work context and the request's input atom and
/// returns output triples, which are recorded under the `OUTPUT` context
/// before the completion marker.
pub fn install_operation(
    store: &mut Store,
    operation: Atom,
    mut handler: impl FnMut(&mut Store, &Atom, &Atom) -> EngineResult<Vec<[Atom; 3]>> + 'static,
) -> EngineResult<WatcherHandle> {
    let marker_op = operation.clone();
    store.watch(
        Pattern::new(vec![[
            pattern_var("w"),
            word(SystemVocab::HANDLE),
            operation,
            pattern_var("input"),
        ]]),
        move |store, event| {
            let work = required(event, "w")?;
            let input = required(event, "input")?;
            let outputs = handler(store, &work, &input)?;
            for [source, attribute, target] in outputs {
                store.append(source, attribute, target, Some(word(SystemVocab::OUTPUT)))?;
            }
            store.append(
                marker_op.clone(),
                word(SystemVocab::HANDLED),
                work,
                Some(word(SystemVocab::OUTPUT)),
            )?;
            Ok(())
        },
    )
}
