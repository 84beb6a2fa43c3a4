// Copyright 2026 the Updraft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Invalidation and upward dirty propagation.
//!
//! Every mutation funnels through one walk: mark the mutated node dirty,
//! then climb the parent chain marking ancestors, stopping at the first
//! ancestor that is already dirty. An already-dirty ancestor is always
//! *covered* — either a scheduled redraw root lies above it, or an open
//! update session does and will schedule when it closes — so the walk never
//! needs to continue past one. This keeps the cost of a mutation at
//! O(depth to the first dirty ancestor), not O(tree height), in the common
//! case of many mutations under one region.
//!
//! # Scheduling
//!
//! A walk that reaches a tree root without crossing a node with an open
//! session schedules that root for the next [`tick`](crate::node::NodeStore::tick)
//! (idempotently — repeated schedules collapse to one entry). Crossing an
//! open session suppresses scheduling: the session's outermost close
//! re-propagates from the session node and schedules then. This is what
//! coalesces a whole batch of mutations into a single driver pass.
//!
//! # Invariant
//!
//! A node's dirty flag implies an unbroken dirty path up to either a
//! scheduled root or a node with an open session. [`tick`] clears flags
//! and drains the schedule together, so the implication holds across
//! ticks; the session module re-establishes it for deferred marks at
//! close time.
//!
//! [`tick`]: crate::node::NodeStore::tick

use crate::node::{INVALID, NodeId, NodeStore};

/// What a single invalidation walk did.
///
/// Returned by [`NodeStore::request_render`]; useful for instrumentation
/// (see [`InvalidateEvent`](crate::trace::InvalidateEvent)) and tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InvalidateOutcome {
    /// Number of nodes newly marked dirty by this walk.
    pub steps: u32,
    /// Whether the walk stopped at an already-dirty node.
    pub short_circuited: bool,
    /// Whether a redraw root was newly scheduled.
    pub scheduled: bool,
}

impl NodeStore {
    /// Requests a redraw of `node` without an update-session bracket.
    ///
    /// The direct entry point for single, atomic changes. Marks the node
    /// and its ancestors dirty and schedules the tree root, unless an open
    /// update session covers the node, in which case scheduling is
    /// deferred to that session's outermost close.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn request_render(&mut self, node: NodeId) -> InvalidateOutcome {
        self.validate(node);
        self.invalidate_idx(node.idx)
    }

    /// Returns the raw slot indices of currently scheduled redraw roots.
    #[must_use]
    pub fn scheduled_roots(&self) -> &[u32] {
        &self.pending
    }

    /// Upward-marking walk from raw slot `idx`.
    pub(crate) fn invalidate_idx(&mut self, idx: u32) -> InvalidateOutcome {
        self.stats.invalidations += 1;

        let mut outcome = InvalidateOutcome::default();
        if self.dirty[idx as usize] {
            // Already covered; nothing above can be unmarked.
            self.stats.short_circuits += 1;
            outcome.short_circuited = true;
            return outcome;
        }

        let mut cur = idx;
        loop {
            self.dirty[cur as usize] = true;
            self.stats.marks += 1;
            outcome.steps += 1;

            if self.update_depth[cur as usize] > 0 {
                // An open session here schedules at its outermost close.
                return outcome;
            }

            let p = self.parent[cur as usize];
            if p == INVALID {
                outcome.scheduled = self.schedule_root(cur);
                return outcome;
            }
            if self.dirty[p as usize] {
                self.stats.short_circuits += 1;
                outcome.short_circuited = true;
                return outcome;
            }
            cur = p;
        }
    }

    /// Unconditional propagation from raw slot `idx`: an outermost session
    /// close, or a subtree re-rooted by an attach.
    ///
    /// Unlike [`invalidate_idx`](Self::invalidate_idx), the starting node is
    /// marked and walked past even when already dirty — a close must
    /// propagate marks left inside the bracket, and an attached subtree
    /// needs coverage under its *new* ancestry.
    pub(crate) fn propagate_from(&mut self, idx: u32) {
        self.dirty[idx as usize] = true;
        self.stats.marks += 1;

        let mut cur = idx;
        loop {
            let p = self.parent[cur as usize];
            if p == INVALID {
                let _ = self.schedule_root(cur);
                return;
            }
            if self.dirty[p as usize] {
                // Covered by a scheduled root or an open session above.
                self.stats.short_circuits += 1;
                return;
            }
            self.dirty[p as usize] = true;
            self.stats.marks += 1;
            if self.update_depth[p as usize] > 0 {
                return;
            }
            cur = p;
        }
    }

    /// Schedules raw slot `idx` as a redraw root. Returns whether the entry
    /// was newly inserted.
    pub(crate) fn schedule_root(&mut self, idx: u32) -> bool {
        if self.pending.contains(&idx) {
            return false;
        }
        self.pending.push(idx);
        self.stats.scheduled += 1;
        true
    }

    #[cfg(test)]
    pub(crate) fn clear_all_dirty_for_test(&mut self) {
        for d in &mut self.dirty {
            *d = false;
        }
        self.pending.clear();
    }
}
