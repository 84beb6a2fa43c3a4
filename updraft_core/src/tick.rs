// Copyright 2026 the Updraft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tick dispatch: draining scheduled roots into driver passes.
//!
//! A tick follows a take-drain-clear pattern:
//!
//! 1. The scheduled-root list, lifecycle lists, and counters are taken
//!    atomically; new invalidations accumulate for the *next* tick.
//! 2. For each root, the dirty path through its subtree is collected in
//!    depth-first pre-order (clean branches pruned) and handed to the
//!    driver as a [`PassChanges`].
//! 3. The visited dirty flags are cleared **only after** the driver pass
//!    succeeds. A failed pass stops the tick; the failed root and all roots
//!    not yet reached are rescheduled with their flags intact, so redraws
//!    are at-least-once and never silently dropped.
//!
//! [`PassChanges`] uses raw slot indices (`u32`) rather than
//! [`NodeId`](crate::node::NodeId) handles so that drivers can index
//! directly into the store's SoA arrays via the `*_at()` accessors without
//! paying for generation checks on every access.

use alloc::vec::Vec;
use core::mem;

use crate::driver::{DriverError, RenderDriver};
use crate::node::{INVALID, NodeStore};
use crate::trace::{PassBeginEvent, PassEndEvent, TickBeginEvent, TickEndEvent, Tracer};

/// The dirty region handed to one driver pass.
#[derive(Clone, Debug, Default)]
pub struct PassChanges {
    /// Raw slot index of the scheduled root.
    pub root: u32,
    /// Raw slot indices of the dirty nodes in the root's subtree, in
    /// depth-first pre-order. The root itself is first.
    pub nodes: Vec<u32>,
}

/// Counters accumulated between ticks.
///
/// Reset when a tick takes them; reported via [`TickReport::stats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Invalidation walks started (setters, structural mutations,
    /// [`request_render`](NodeStore::request_render)).
    pub invalidations: u32,
    /// Nodes newly marked dirty.
    pub marks: u32,
    /// Walks that stopped at an already-dirty node.
    pub short_circuits: u32,
    /// Redraw roots newly scheduled.
    pub scheduled: u32,
    /// Update sessions opened.
    pub sessions_opened: u32,
    /// Update sessions closed.
    pub sessions_closed: u32,
}

/// The outcome of a single [`NodeStore::tick`] call.
#[derive(Clone, Debug, Default)]
pub struct TickReport {
    /// Monotonically increasing tick counter.
    pub tick_index: u64,
    /// Driver passes that completed.
    pub passes_completed: u32,
    /// Roots rescheduled for the next tick after a driver failure.
    pub roots_deferred: u32,
    /// Total dirty nodes visited across completed passes.
    pub nodes_visited: u32,
    /// Slots created since the previous tick.
    pub added: Vec<u32>,
    /// Slots destroyed since the previous tick.
    pub removed: Vec<u32>,
    /// Counters accumulated since the previous tick.
    pub stats: TickStats,
    /// The driver failure that ended the tick early, if any.
    pub failure: Option<DriverError>,
}

impl NodeStore {
    /// Runs one tick: drains scheduled roots and dispatches a driver pass
    /// for each.
    pub fn tick(&mut self, driver: &mut dyn RenderDriver) -> TickReport {
        self.tick_traced(driver, &mut Tracer::none())
    }

    /// Like [`tick`](Self::tick), emitting trace events for each pass.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "root and node counts are bounded by the u32 slot space"
    )]
    pub fn tick_traced(&mut self, driver: &mut dyn RenderDriver, tracer: &mut Tracer<'_>) -> TickReport {
        let tick_index = self.tick_index;
        self.tick_index += 1;

        let pending = mem::take(&mut self.pending);
        let added = mem::take(&mut self.pending_added);
        let removed = mem::take(&mut self.pending_removed);
        let stats = mem::take(&mut self.stats);

        let mut report = TickReport {
            tick_index,
            added,
            removed,
            stats,
            ..TickReport::default()
        };

        tracer.tick_begin(&TickBeginEvent {
            tick_index,
            scheduled_roots: pending.len() as u32,
        });

        if !report.added.is_empty() || !report.removed.is_empty() {
            driver.apply_lifecycle(self, &report.added, &report.removed);
        }

        for (i, &root) in pending.iter().enumerate() {
            let mut nodes = Vec::new();
            self.collect_dirty(root, &mut nodes);
            let pass = PassChanges { root, nodes };

            tracer.pass_begin(&PassBeginEvent { tick_index, root });
            #[cfg(feature = "trace-rich")]
            tracer.nodes_visited(tick_index, &pass.nodes);

            match driver.render(self, &pass) {
                Ok(()) => {
                    for &n in &pass.nodes {
                        self.dirty[n as usize] = false;
                    }
                    report.passes_completed += 1;
                    report.nodes_visited += pass.nodes.len() as u32;
                    tracer.pass_end(&PassEndEvent {
                        tick_index,
                        root,
                        nodes_visited: pass.nodes.len() as u32,
                        ok: true,
                    });
                }
                Err(e) => {
                    // Reschedule this root and everything not yet reached;
                    // their dirty flags are untouched.
                    self.pending.extend_from_slice(&pending[i..]);
                    report.roots_deferred = (pending.len() - i) as u32;
                    tracer.pass_end(&PassEndEvent {
                        tick_index,
                        root,
                        nodes_visited: 0,
                        ok: false,
                    });
                    report.failure = Some(e);
                    break;
                }
            }
        }

        tracer.tick_end(&TickEndEvent {
            tick_index,
            passes_completed: report.passes_completed,
            roots_deferred: report.roots_deferred,
            nodes_visited: report.nodes_visited,
        });

        report
    }

    /// Collects the dirty path through the subtree at raw slot `idx`,
    /// depth-first pre-order. Clean nodes prune their whole branch: the
    /// upward marking invariant guarantees every mutated descendant is
    /// reachable through dirty-marked ancestors.
    fn collect_dirty(&self, idx: u32, out: &mut Vec<u32>) {
        if !self.dirty[idx as usize] {
            return;
        }
        out.push(idx);
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            self.collect_dirty(child, out);
            child = self.next_sibling[child as usize];
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use crate::driver::{DriverError, RenderDriver};
    use crate::node::{NodeId, NodeStore};
    use crate::props::{PropKey, PropValue};

    use super::PassChanges;

    /// Records every pass it is asked to perform; can be primed to fail.
    #[derive(Default)]
    struct RecordingDriver {
        passes: Vec<PassChanges>,
        lifecycle: Vec<(Vec<u32>, Vec<u32>)>,
        fail_next: bool,
    }

    impl RenderDriver for RecordingDriver {
        fn apply_lifecycle(&mut self, _store: &NodeStore, added: &[u32], removed: &[u32]) {
            self.lifecycle.push((added.to_vec(), removed.to_vec()));
        }

        fn render(&mut self, _store: &NodeStore, pass: &PassChanges) -> Result<(), DriverError> {
            if self.fail_next {
                self.fail_next = false;
                return Err(DriverError::new("primed failure"));
            }
            self.passes.push(pass.clone());
            Ok(())
        }
    }

    fn chain(store: &mut NodeStore) -> (NodeId, NodeId, NodeId) {
        let root = store.create_node("root");
        let child = store.create_node("child");
        let leaf = store.create_node("leaf");
        store.add_child(root, child);
        store.add_child(child, leaf);
        (root, child, leaf)
    }

    /// Consumes creation dirtiness so tests observe only their own work.
    fn settle(store: &mut NodeStore) {
        let mut driver = RecordingDriver::default();
        let _ = store.tick(&mut driver);
    }

    #[test]
    fn batched_session_produces_one_pass() {
        let mut store = NodeStore::new();
        let (root, child, leaf) = chain(&mut store);
        settle(&mut store);

        let token = store.begin_update(root);
        store.set_prop(leaf, PropKey::Opacity, PropValue::Float(0.5));
        store.set_prop(child, PropKey::Visible, PropValue::Bool(true));
        store.set_prop(leaf, PropKey::Fill, PropValue::Int(3));
        store.end_update(token);

        assert!(store.is_dirty(leaf));
        assert!(store.is_dirty(child));
        assert!(store.is_dirty(root));

        let mut driver = RecordingDriver::default();
        let report = store.tick(&mut driver);

        assert_eq!(report.passes_completed, 1);
        assert_eq!(driver.passes.len(), 1);
        assert_eq!(driver.passes[0].root, root.index());
        assert_eq!(
            driver.passes[0].nodes,
            vec![root.index(), child.index(), leaf.index()]
        );

        assert!(!store.is_dirty(leaf));
        assert!(!store.is_dirty(child));
        assert!(!store.is_dirty(root));
    }

    #[test]
    fn nested_sessions_still_one_pass_per_tick() {
        let mut store = NodeStore::new();
        let (root, _child, leaf) = chain(&mut store);
        settle(&mut store);

        for _ in 0..5 {
            let outer = store.begin_update(root);
            let inner = store.begin_update(root);
            store.set_prop(leaf, PropKey::Fill, PropValue::Int(9));
            store.end_update(inner);
            store.end_update(outer);
        }

        let mut driver = RecordingDriver::default();
        let report = store.tick(&mut driver);
        assert_eq!(report.passes_completed, 1);
    }

    #[test]
    fn sibling_sessions_coalesce_into_one_pass_visiting_both() {
        let mut store = NodeStore::new();
        let root = store.create_node("root");
        let a = store.create_node("a");
        let b = store.create_node("b");
        let c = store.create_node("c");
        store.add_child(root, a);
        store.add_child(root, b);
        store.add_child(root, c);
        settle(&mut store);

        let ta = store.begin_update(a);
        store.set_prop(a, PropKey::Fill, PropValue::Int(1));
        store.end_update(ta);

        let tc = store.begin_update(c);
        store.set_prop(c, PropKey::Fill, PropValue::Int(2));
        store.end_update(tc);

        let mut driver = RecordingDriver::default();
        let report = store.tick(&mut driver);

        assert_eq!(report.passes_completed, 1);
        let nodes = &driver.passes[0].nodes;
        assert!(nodes.contains(&a.index()));
        assert!(nodes.contains(&c.index()));
        assert!(
            !nodes.contains(&b.index()),
            "clean sibling must be pruned from the pass"
        );
    }

    #[test]
    fn quiet_tick_dispatches_nothing() {
        let mut store = NodeStore::new();
        let _ = chain(&mut store);
        settle(&mut store);

        let mut driver = RecordingDriver::default();
        let report = store.tick(&mut driver);
        assert_eq!(report.passes_completed, 0);
        assert!(driver.passes.is_empty());
        assert!(report.added.is_empty());
        assert!(report.removed.is_empty());
    }

    #[test]
    fn mutations_between_ticks_are_never_missed() {
        let mut store = NodeStore::new();
        let (root, _child, leaf) = chain(&mut store);
        settle(&mut store);

        store.set_prop(leaf, PropKey::Label, PropValue::Text("t1".into()));
        let mut driver = RecordingDriver::default();
        let report = store.tick(&mut driver);
        assert_eq!(report.passes_completed, 1);
        assert_eq!(driver.passes[0].root, root.index());

        // And again on a later tick.
        store.set_prop(leaf, PropKey::Label, PropValue::Text("t2".into()));
        let report = store.tick(&mut driver);
        assert_eq!(report.passes_completed, 1);
        assert_eq!(report.tick_index, 2);
    }

    #[test]
    fn separate_trees_get_separate_passes() {
        let mut store = NodeStore::new();
        let tree_a = store.create_node("a");
        let tree_b = store.create_node("b");
        settle(&mut store);

        store.request_render(tree_a);
        store.request_render(tree_b);

        let mut driver = RecordingDriver::default();
        let report = store.tick(&mut driver);
        assert_eq!(report.passes_completed, 2);
        assert_eq!(driver.passes[0].root, tree_a.index());
        assert_eq!(driver.passes[1].root, tree_b.index());
    }

    #[test]
    fn failed_pass_defers_and_retries_next_tick() {
        let mut store = NodeStore::new();
        let tree_a = store.create_node("a");
        let tree_b = store.create_node("b");
        settle(&mut store);

        store.request_render(tree_a);
        store.request_render(tree_b);

        let mut driver = RecordingDriver {
            fail_next: true,
            ..RecordingDriver::default()
        };
        let report = store.tick(&mut driver);

        assert_eq!(report.passes_completed, 0);
        assert_eq!(report.roots_deferred, 2, "failed root and unreached root");
        assert_eq!(
            report.failure,
            Some(DriverError::new("primed failure"))
        );
        assert!(store.is_dirty(tree_a), "flags survive a failed pass");
        assert!(store.is_dirty(tree_b));

        // Next tick retries both.
        let report = store.tick(&mut driver);
        assert_eq!(report.passes_completed, 2);
        assert!(report.failure.is_none());
        assert!(!store.is_dirty(tree_a));
        assert!(!store.is_dirty(tree_b));
    }

    #[test]
    fn partial_failure_keeps_completed_work_clean() {
        let mut store = NodeStore::new();
        let tree_a = store.create_node("a");
        let tree_b = store.create_node("b");
        let tree_c = store.create_node("c");
        settle(&mut store);

        store.request_render(tree_a);
        store.request_render(tree_b);
        store.request_render(tree_c);

        // First pass succeeds, second fails, third is never reached.
        struct FailSecond {
            calls: u32,
        }
        impl RenderDriver for FailSecond {
            fn render(
                &mut self,
                _store: &NodeStore,
                _pass: &PassChanges,
            ) -> Result<(), DriverError> {
                self.calls += 1;
                if self.calls == 2 {
                    Err(DriverError::new("second pass down"))
                } else {
                    Ok(())
                }
            }
        }

        let mut driver = FailSecond { calls: 0 };
        let report = store.tick(&mut driver);

        assert_eq!(report.passes_completed, 1);
        assert_eq!(report.roots_deferred, 2);
        assert!(!store.is_dirty(tree_a), "completed pass stays clean");
        assert!(store.is_dirty(tree_b));
        assert!(store.is_dirty(tree_c));
        assert_eq!(
            store.scheduled_roots(),
            &[tree_b.index(), tree_c.index()]
        );
    }

    #[test]
    fn lifecycle_changes_reach_the_driver_once() {
        let mut store = NodeStore::new();
        let root = store.create_node("root");
        let child = store.create_node("child");
        store.add_child(root, child);

        let mut driver = RecordingDriver::default();
        let report = store.tick(&mut driver);

        assert_eq!(driver.lifecycle.len(), 1);
        let (added, removed) = &driver.lifecycle[0];
        assert!(added.contains(&root.index()));
        assert!(added.contains(&child.index()));
        assert!(removed.is_empty());
        assert_eq!(report.added.len(), 2);

        store.destroy_node(child);
        let report = store.tick(&mut driver);
        assert_eq!(report.removed, vec![child.index()]);
        assert_eq!(driver.lifecycle.len(), 2);
    }

    #[test]
    fn report_carries_accumulated_stats() {
        let mut store = NodeStore::new();
        let (root, _child, leaf) = chain(&mut store);
        settle(&mut store);

        let token = store.begin_update(root);
        store.request_render(leaf);
        store.request_render(leaf);
        store.end_update(token);

        let mut driver = RecordingDriver::default();
        let report = store.tick(&mut driver);

        assert_eq!(report.stats.sessions_opened, 1);
        assert_eq!(report.stats.sessions_closed, 1);
        assert_eq!(report.stats.invalidations, 2);
        assert_eq!(report.stats.short_circuits, 1, "second request is a no-op");
        assert_eq!(report.stats.scheduled, 1);

        // Counters were taken; the next report starts fresh.
        let report = store.tick(&mut driver);
        assert_eq!(report.stats, super::TickStats::default());
    }
}
