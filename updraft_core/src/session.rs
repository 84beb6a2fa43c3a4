// Copyright 2026 the Updraft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scoped update sessions.
//!
//! An update session brackets a batch of mutations on a subtree so the
//! whole batch produces at most one driver pass. Sessions nest: only the
//! outermost close on a node fires propagation, and closing a session while
//! a session is still open on an *ancestor* marks dirty state but defers
//! scheduling to the enclosing close.
//!
//! # Tokens
//!
//! [`begin_update`](NodeStore::begin_update) returns an [`UpdateToken`]
//! recording the depth it opened at. [`end_update`](NodeStore::end_update)
//! consumes the token and panics unless the node's current depth matches —
//! so a double close, or closes in non-LIFO order on one node, fail
//! immediately instead of silently desynchronizing the redraw machinery.
//! A close without a matching open is unrepresentable: tokens cannot be
//! constructed outside [`begin_update`].
//!
//! Each node tracks its own depth; there is no tree-wide suppression
//! bracket. [`end_update_silent`](NodeStore::end_update_silent) is the one
//! escape hatch for mutations that must not trigger a redraw of their own.

use crate::node::{NodeId, NodeStore};

/// Proof of an open update session, consumed by
/// [`end_update`](NodeStore::end_update).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use = "an unconsumed token leaves the session open and suppresses redraws forever"]
pub struct UpdateToken {
    node: NodeId,
    /// The node's session depth right after the matching begin.
    depth: u32,
}

impl UpdateToken {
    /// The node this session is open on.
    #[inline]
    pub const fn node(self) -> NodeId {
        self.node
    }

    /// Whether the matching begin was the outermost on its node
    /// (depth transitioned 0 → 1).
    #[inline]
    #[must_use]
    pub const fn was_outermost(self) -> bool {
        self.depth == 1
    }
}

impl NodeStore {
    /// Opens an update session on `node`.
    ///
    /// Mutations applied anywhere in the tree while a session covers them
    /// still mark dirty state, but driver scheduling is deferred until the
    /// outermost covering session closes.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn begin_update(&mut self, node: NodeId) -> UpdateToken {
        self.validate(node);
        let idx = node.idx;
        self.update_depth[idx as usize] += 1;
        self.stats.sessions_opened += 1;
        UpdateToken {
            node,
            depth: self.update_depth[idx as usize],
        }
    }

    /// Closes an update session.
    ///
    /// If this close is the outermost on its node, propagation fires: the
    /// node and its ancestors are marked dirty and the covering tree root
    /// is scheduled (unless a session is still open on an ancestor, which
    /// takes over the deferral).
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale, or if the node's session depth does
    /// not match the token (double close, or closes out of LIFO order).
    pub fn end_update(&mut self, token: UpdateToken) {
        self.close_session(token);
        if token.was_outermost() {
            self.propagate_from(token.node.idx);
        }
    }

    /// Closes an update session without firing propagation, even when
    /// outermost.
    ///
    /// Dirty flags set by mutations inside the bracket remain and are
    /// swept up by the next propagating close or direct invalidation that
    /// covers them; nothing is scheduled on behalf of this session.
    ///
    /// # Panics
    ///
    /// Same conditions as [`end_update`](Self::end_update).
    pub fn end_update_silent(&mut self, token: UpdateToken) {
        self.close_session(token);
    }

    /// Balance-checks and decrements the session depth.
    fn close_session(&mut self, token: UpdateToken) {
        self.validate(token.node);
        let idx = token.node.idx;
        assert!(
            self.update_depth[idx as usize] == token.depth,
            "unbalanced update session on {:?}: depth is {}, token expects {}",
            token.node,
            self.update_depth[idx as usize],
            token.depth
        );
        self.update_depth[idx as usize] -= 1;
        self.stats.sessions_closed += 1;
    }
}

#[cfg(test)]
mod tests {
    use crate::node::NodeStore;
    use crate::props::{PropKey, PropValue};

    #[test]
    fn outermost_close_fires_propagation_once() {
        let mut store = NodeStore::new();
        let root = store.create_node("root");
        store.clear_all_dirty_for_test();

        let outer = store.begin_update(root);
        let inner = store.begin_update(root);
        assert!(outer.was_outermost());
        assert!(!inner.was_outermost());

        store.set_prop(root, PropKey::Visible, PropValue::Bool(false));

        store.end_update(inner);
        assert!(
            store.scheduled_roots().is_empty(),
            "inner close must not schedule"
        );

        store.end_update(outer);
        assert_eq!(store.scheduled_roots(), &[root.index()]);
    }

    #[test]
    fn session_on_child_defers_to_open_ancestor_session() {
        let mut store = NodeStore::new();
        let root = store.create_node("root");
        let child = store.create_node("child");
        store.add_child(root, child);
        store.clear_all_dirty_for_test();

        let outer = store.begin_update(root);
        let inner = store.begin_update(child);
        store.set_prop(child, PropKey::Opacity, PropValue::Float(0.5));

        store.end_update(inner);
        assert!(
            store.scheduled_roots().is_empty(),
            "ancestor session still open"
        );

        store.end_update(outer);
        assert_eq!(store.scheduled_roots(), &[root.index()]);
    }

    #[test]
    fn sibling_sessions_each_propagate_but_coalesce() {
        let mut store = NodeStore::new();
        let root = store.create_node("root");
        let a = store.create_node("a");
        let b = store.create_node("b");
        store.add_child(root, a);
        store.add_child(root, b);
        store.clear_all_dirty_for_test();

        let ta = store.begin_update(a);
        store.set_prop(a, PropKey::Fill, PropValue::Int(1));
        store.end_update(ta);

        let tb = store.begin_update(b);
        store.set_prop(b, PropKey::Fill, PropValue::Int(2));
        store.end_update(tb);

        assert_eq!(store.scheduled_roots(), &[root.index()]);
    }

    #[test]
    fn empty_session_still_propagates() {
        let mut store = NodeStore::new();
        let root = store.create_node("root");
        store.clear_all_dirty_for_test();

        let token = store.begin_update(root);
        store.end_update(token);

        assert!(store.is_dirty(root));
        assert_eq!(store.scheduled_roots(), &[root.index()]);
    }

    #[test]
    fn silent_close_schedules_nothing() {
        let mut store = NodeStore::new();
        let root = store.create_node("root");
        let child = store.create_node("child");
        store.add_child(root, child);
        store.clear_all_dirty_for_test();

        let token = store.begin_update(root);
        store.set_prop(child, PropKey::Label, PropValue::Text("quiet".into()));
        store.end_update_silent(token);

        assert!(store.is_dirty(child), "marks survive a silent close");
        assert!(store.scheduled_roots().is_empty());
        assert!(!store.is_updating(root));
    }

    #[test]
    fn marks_left_by_silent_close_are_swept_by_next_invalidation() {
        let mut store = NodeStore::new();
        let root = store.create_node("root");
        let child = store.create_node("child");
        let leaf = store.create_node("leaf");
        store.add_child(root, child);
        store.add_child(child, leaf);
        store.clear_all_dirty_for_test();

        let token = store.begin_update(root);
        store.set_prop(leaf, PropKey::Fill, PropValue::Int(3));
        store.end_update_silent(token);

        // A later propagating close covers the leftover marks.
        let token = store.begin_update(root);
        store.end_update(token);
        assert_eq!(store.scheduled_roots(), &[root.index()]);
    }

    #[test]
    fn depth_queries_reflect_open_sessions() {
        let mut store = NodeStore::new();
        let root = store.create_node("root");

        assert!(!store.is_updating(root));
        let outer = store.begin_update(root);
        let inner = store.begin_update(root);
        assert_eq!(store.update_depth(root), 2);
        assert!(store.is_updating(root));

        store.end_update(inner);
        assert_eq!(store.update_depth(root), 1);
        store.end_update(outer);
        assert_eq!(store.update_depth(root), 0);
    }

    #[test]
    #[should_panic(expected = "unbalanced update session")]
    fn double_close_panics() {
        let mut store = NodeStore::new();
        let root = store.create_node("root");
        let token = store.begin_update(root);
        store.end_update(token);
        store.end_update(token);
    }

    #[test]
    #[should_panic(expected = "unbalanced update session")]
    fn non_lifo_close_panics() {
        let mut store = NodeStore::new();
        let root = store.create_node("root");
        let outer = store.begin_update(root);
        let _inner = store.begin_update(root);
        store.end_update(outer);
    }

    #[test]
    #[should_panic(expected = "unbalanced update session")]
    fn silent_close_is_balance_checked_too() {
        let mut store = NodeStore::new();
        let root = store.create_node("root");
        let token = store.begin_update(root);
        store.end_update_silent(token);
        store.end_update_silent(token);
    }
}
