//! Signal-read tracking at composition granularity.
//!
//! While a composition pass runs, every `Signal::get`/`Signal::with` records
//! an edge from the signal to that composition. A later write marks the
//! composition dirty so the driver knows a recomposition is due. Edges are
//! rebuilt from scratch on every pass, so stale reads never keep a
//! composition subscribed.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

pub type SignalId = usize;
pub type CompositionId = usize;

thread_local! {
    static CURRENT_PASS: RefCell<Option<CompositionId>> = const { RefCell::new(None) };
    static TRACKER: RefCell<Tracker> = RefCell::new(Tracker::default());
}

#[derive(Default)]
struct Tracker {
    next_signal: SignalId,
    next_composition: CompositionId,
    // signal_id -> compositions that read it during their last pass
    edges: HashMap<SignalId, HashSet<CompositionId>>,
    // composition_id -> signals it read
    back: HashMap<CompositionId, HashSet<SignalId>>,
    dirty: HashSet<CompositionId>,
}

impl Tracker {
    fn remove_all_edges_for(&mut self, comp: CompositionId) {
        if let Some(signals) = self.back.remove(&comp) {
            for s in signals {
                if let Some(set) = self.edges.get_mut(&s) {
                    set.remove(&comp);
                }
            }
        }
    }
}

pub fn next_signal_id() -> SignalId {
    TRACKER.with(|t| {
        let mut t = t.borrow_mut();
        let id = t.next_signal;
        t.next_signal += 1;
        id
    })
}

pub(crate) fn new_composition() -> CompositionId {
    TRACKER.with(|t| {
        let mut t = t.borrow_mut();
        let id = t.next_composition;
        t.next_composition += 1;
        id
    })
}

pub(crate) fn retire_composition(comp: CompositionId) {
    TRACKER.with(|t| {
        let mut t = t.borrow_mut();
        t.remove_all_edges_for(comp);
        t.dirty.remove(&comp);
    });
}

pub fn register_signal_read(sig: SignalId) {
    CURRENT_PASS.with(|cp| {
        if let Some(comp) = *cp.borrow() {
            TRACKER.with(|t| {
                let mut t = t.borrow_mut();
                t.edges.entry(sig).or_default().insert(comp);
                t.back.entry(comp).or_default().insert(sig);
            });
        }
    });
}

pub fn signal_changed(sig: SignalId) {
    TRACKER.with(|t| {
        let mut t = t.borrow_mut();
        let readers: Vec<CompositionId> = t
            .edges
            .get(&sig)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        for comp in readers {
            t.dirty.insert(comp);
        }
    });
}

pub(crate) fn is_dirty(comp: CompositionId) -> bool {
    TRACKER.with(|t| t.borrow().dirty.contains(&comp))
}

/// Installs `comp` as the tracking target for the current pass.
/// Previous edges and the dirty flag are cleared; the prior target is
/// restored on drop (unwind safe).
pub(crate) struct PassGuard {
    prev: Option<CompositionId>,
}

impl PassGuard {
    pub(crate) fn begin(comp: CompositionId) -> Self {
        TRACKER.with(|t| {
            let mut t = t.borrow_mut();
            t.remove_all_edges_for(comp);
            t.dirty.remove(&comp);
        });
        let prev = CURRENT_PASS.with(|cp| cp.borrow_mut().replace(comp));
        PassGuard { prev }
    }
}

impl Drop for PassGuard {
    fn drop(&mut self) {
        CURRENT_PASS.with(|cp| {
            *cp.borrow_mut() = self.prev;
        });
    }
}
