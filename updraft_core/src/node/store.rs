// Copyright 2026 the Updraft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays node storage with allocation, topology, and property
//! management.

use alloc::string::String;
use alloc::vec::Vec;

use crate::props::{PropKey, PropValue};
use crate::tick::TickStats;

use super::id::{INVALID, NodeId, TypeTag};
use super::traverse::{Ancestors, Children};

/// Struct-of-arrays storage for all nodes.
///
/// Nodes are addressed by [`NodeId`] handles. Internally, each node occupies
/// a slot in parallel arrays. Destroyed nodes are recycled via a free list,
/// and generation counters prevent stale handle access.
///
/// Structural mutations and property setters invalidate the affected region
/// automatically; see the [`signal`](crate::signal) module for the
/// propagation rules and [`tick`](crate::tick) for how the accumulated
/// redraw work is drained.
#[derive(Debug, Default)]
pub struct NodeStore {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,

    // -- Identity and properties --
    pub(crate) name: Vec<String>,
    pub(crate) tag: Vec<Option<TypeTag>>,
    pub(crate) props: Vec<Vec<(PropKey, PropValue)>>,

    // -- Update state --
    pub(crate) update_depth: Vec<u32>,
    pub(crate) dirty: Vec<bool>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Scheduling --
    pub(crate) pending: Vec<u32>,

    // -- Lifecycle tracking --
    pub(crate) pending_added: Vec<u32>,
    pub(crate) pending_removed: Vec<u32>,

    // -- Tick bookkeeping --
    pub(crate) tick_index: u64,
    pub(crate) stats: TickStats,
}

impl NodeStore {
    /// Creates an empty node store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -- Allocation API --

    /// Creates a new node with the given name and returns its handle.
    ///
    /// The node starts detached (a root of its own tree), with no tag and no
    /// properties. It is immediately scheduled for a first driver pass.
    pub fn create_node(&mut self, name: &str) -> NodeId {
        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot.
            self.generation[idx as usize] += 1;
            self.parent[idx as usize] = INVALID;
            self.first_child[idx as usize] = INVALID;
            self.next_sibling[idx as usize] = INVALID;
            self.prev_sibling[idx as usize] = INVALID;
            self.name[idx as usize] = String::from(name);
            self.tag[idx as usize] = None;
            self.props[idx as usize].clear();
            self.update_depth[idx as usize] = 0;
            self.dirty[idx as usize] = false;
            idx
        } else {
            // Allocate a new slot.
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.name.push(String::from(name));
            self.tag.push(None);
            self.props.push(Vec::new());
            self.update_depth.push(0);
            self.dirty.push(false);
            self.generation.push(0);
            idx
        };

        self.pending_added.push(idx);
        self.invalidate_idx(idx);

        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Destroys a node and its entire subtree, freeing the slots for reuse.
    ///
    /// The former parent (if any) is invalidated so the vacated region is
    /// redrawn on the next tick. All destroyed slots are reported in the
    /// next tick's `removed` list.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale, or if any node in the subtree has an
    /// open update session.
    pub fn destroy_node(&mut self, id: NodeId) {
        self.validate(id);
        let idx = id.idx;
        let old_parent = self.parent[idx as usize];
        if old_parent != INVALID {
            self.unlink_from_parent(idx);
        }

        // Collect the subtree; an open session anywhere in it means the
        // caller is destroying nodes out from under an active batch.
        let mut stack = Vec::new();
        let mut subtree = Vec::new();
        stack.push(idx);
        while let Some(n) = stack.pop() {
            assert!(
                self.update_depth[n as usize] == 0,
                "cannot destroy a node with an open update session (slot {n})"
            );
            subtree.push(n);
            let mut child = self.first_child[n as usize];
            while child != INVALID {
                stack.push(child);
                child = self.next_sibling[child as usize];
            }
        }

        for &n in &subtree {
            // Bump generation so old handles immediately fail validation.
            self.generation[n as usize] += 1;
            self.parent[n as usize] = INVALID;
            self.first_child[n as usize] = INVALID;
            self.next_sibling[n as usize] = INVALID;
            self.prev_sibling[n as usize] = INVALID;
            self.name[n as usize].clear();
            self.tag[n as usize] = None;
            self.props[n as usize].clear();
            self.dirty[n as usize] = false;
            self.free_list.push(n);
            self.pending_removed.push(n);
        }

        // Scrub scheduled roots that no longer exist.
        self.pending.retain(|r| !subtree.contains(r));

        if old_parent != INVALID {
            self.invalidate_idx(old_parent);
        }
    }

    /// Returns whether the given handle refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        (id.idx < self.len)
            && self.generation[id.idx as usize] == id.generation
            && !self.free_list.contains(&id.idx)
    }

    // -- Topology API --

    /// Adds `child` as the last child of `parent`.
    ///
    /// The attached subtree is invalidated so it is drawn under its new
    /// ancestry on the next tick.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, if `child` already has a parent,
    /// if `parent` lies inside `child`'s subtree, or if `parent` already
    /// has a child with the same name.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        self.validate(parent);
        self.validate(child);
        let p = parent.idx;
        let c = child.idx;
        assert!(
            self.parent[c as usize] == INVALID,
            "child already has a parent"
        );
        self.assert_not_in_subtree(p, c);
        self.assert_sibling_name_free(p, c);

        self.link_last(p, c);
        self.reroot(c);
    }

    /// Removes `child` from its current parent, making it a root.
    ///
    /// Both the vacated region under the old parent and the now-detached
    /// subtree are invalidated.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the node has no parent.
    pub fn remove_from_parent(&mut self, child: NodeId) {
        self.validate(child);
        let c = child.idx;
        assert!(self.parent[c as usize] != INVALID, "node has no parent");

        let p = self.parent[c as usize];
        self.unlink_from_parent(c);

        self.invalidate_idx(p);
        // The detached subtree may have been covered through the old parent
        // chain; as a fresh root it needs its own schedule entry.
        self.propagate_from(c);
    }

    /// Moves `child` to be the last child of `new_parent`.
    ///
    /// If `child` already has a parent, it is removed first and the old
    /// parent's region invalidated.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, if `new_parent` lies inside
    /// `child`'s subtree, or if `new_parent` already has a child with the
    /// same name.
    pub fn reparent(&mut self, child: NodeId, new_parent: NodeId) {
        self.validate(child);
        self.validate(new_parent);
        let p = new_parent.idx;
        let c = child.idx;
        self.assert_not_in_subtree(p, c);
        self.assert_sibling_name_free(p, c);

        if self.parent[c as usize] != INVALID {
            let old_p = self.parent[c as usize];
            self.unlink_from_parent(c);
            self.invalidate_idx(old_p);
        }

        self.link_last(p, c);
        self.reroot(c);
    }

    /// Inserts `child` before `sibling` in the sibling list.
    ///
    /// `child` must not already have a parent. `sibling` must have a parent.
    ///
    /// # Panics
    ///
    /// Panics if handles are stale, `child` already has a parent, `sibling`
    /// has no parent, the insertion would create a cycle, or a sibling with
    /// the same name exists.
    pub fn insert_before(&mut self, child: NodeId, sibling: NodeId) {
        self.validate(child);
        self.validate(sibling);
        let c = child.idx;
        let s = sibling.idx;
        assert!(
            self.parent[c as usize] == INVALID,
            "child already has a parent"
        );
        let p = self.parent[s as usize];
        assert!(p != INVALID, "sibling has no parent");
        self.assert_not_in_subtree(p, c);
        self.assert_sibling_name_free(p, c);

        self.parent[c as usize] = p;
        self.next_sibling[c as usize] = s;
        self.prev_sibling[c as usize] = self.prev_sibling[s as usize];

        if self.prev_sibling[s as usize] != INVALID {
            self.next_sibling[self.prev_sibling[s as usize] as usize] = c;
        } else {
            // `sibling` was the first child.
            self.first_child[p as usize] = c;
        }
        self.prev_sibling[s as usize] = c;

        self.reroot(c);
    }

    /// Returns the parent of a node, if any.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        if p == INVALID {
            None
        } else {
            Some(NodeId {
                idx: p,
                generation: self.generation[p as usize],
            })
        }
    }

    /// Returns an iterator over the direct children of a node.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Children<'_> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    /// Returns an iterator over the ancestors of a node, nearest first.
    #[must_use]
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        self.validate(id);
        Ancestors::new(self, self.parent[id.idx as usize])
    }

    /// Returns the first direct child of `parent` with the given name.
    #[must_use]
    pub fn child_named(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.children(parent)
            .find(|&child| self.name[child.idx as usize] == name)
    }

    /// Returns the root nodes (those with no parent).
    ///
    /// Roots are nodes whose parent is [`INVALID`] and that are not in the
    /// free list. Detached subtrees count as roots until reattached.
    #[must_use]
    pub fn roots(&self) -> Vec<NodeId> {
        let mut roots = Vec::new();
        for idx in 0..self.len {
            if self.parent[idx as usize] == INVALID && !self.free_list.contains(&idx) {
                roots.push(NodeId {
                    idx,
                    generation: self.generation[idx as usize],
                });
            }
        }
        roots
    }

    // -- Identity API --

    /// Returns the name of a node.
    #[must_use]
    pub fn name(&self, id: NodeId) -> &str {
        self.validate(id);
        &self.name[id.idx as usize]
    }

    /// Renames a node.
    ///
    /// Renaming is identity metadata and does not invalidate the node.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or a sibling already has the new name.
    pub fn set_name(&mut self, id: NodeId, name: &str) {
        self.validate(id);
        let idx = id.idx;
        let p = self.parent[idx as usize];
        if p != INVALID {
            let mut sibling = self.first_child[p as usize];
            while sibling != INVALID {
                assert!(
                    sibling == idx || self.name[sibling as usize] != name,
                    "duplicate sibling name: {name:?}"
                );
                sibling = self.next_sibling[sibling as usize];
            }
        }
        self.name[idx as usize] = String::from(name);
    }

    /// Returns the type tag of a node, if set.
    #[must_use]
    pub fn tag(&self, id: NodeId) -> Option<TypeTag> {
        self.validate(id);
        self.tag[id.idx as usize]
    }

    /// Sets the type tag of a node.
    ///
    /// Tags are identity metadata and do not invalidate the node.
    pub fn set_tag(&mut self, id: NodeId, tag: Option<TypeTag>) {
        self.validate(id);
        self.tag[id.idx as usize] = tag;
    }

    // -- Property API (setters auto-invalidate) --

    /// Sets a property on a node, replacing any previous value for the key.
    ///
    /// Invalidates the node.
    pub fn set_prop(&mut self, id: NodeId, key: PropKey, value: PropValue) {
        self.validate(id);
        let idx = id.idx;
        let list = &mut self.props[idx as usize];
        if let Some(slot) = list.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            list.push((key, value));
        }
        self.invalidate_idx(idx);
    }

    /// Returns the value of a property, if set.
    #[must_use]
    pub fn prop(&self, id: NodeId, key: PropKey) -> Option<&PropValue> {
        self.validate(id);
        self.props[id.idx as usize]
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }

    /// Removes a property from a node, returning whether it was set.
    ///
    /// Invalidates the node when a value was actually removed.
    pub fn clear_prop(&mut self, id: NodeId, key: PropKey) -> bool {
        self.validate(id);
        let idx = id.idx;
        let list = &mut self.props[idx as usize];
        let before = list.len();
        list.retain(|(k, _)| *k != key);
        let removed = list.len() != before;
        if removed {
            self.invalidate_idx(idx);
        }
        removed
    }

    /// Returns all properties set on a node.
    #[must_use]
    pub fn props(&self, id: NodeId) -> &[(PropKey, PropValue)] {
        self.validate(id);
        &self.props[id.idx as usize]
    }

    // -- Update state queries --

    /// Returns whether the node is marked for redraw.
    #[must_use]
    pub fn is_dirty(&self, id: NodeId) -> bool {
        self.validate(id);
        self.dirty[id.idx as usize]
    }

    /// Returns the number of update sessions currently open on the node.
    #[must_use]
    pub fn update_depth(&self, id: NodeId) -> u32 {
        self.validate(id);
        self.update_depth[id.idx as usize]
    }

    /// Returns whether at least one update session is open on the node.
    #[must_use]
    pub fn is_updating(&self, id: NodeId) -> bool {
        self.update_depth(id) > 0
    }

    // -- Raw-index accessors for drivers --
    //
    // These accept raw slot indices (as found in `PassChanges`) rather than
    // `NodeId` handles, skipping generation validation. Only use with
    // indices that came from `PassChanges` or a `TickReport`.

    /// Returns the name at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn name_at(&self, idx: u32) -> &str {
        assert!(
            idx < self.len,
            "slot index {idx} out of range (len {})",
            self.len
        );
        &self.name[idx as usize]
    }

    /// Returns the type tag at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn tag_at(&self, idx: u32) -> Option<TypeTag> {
        assert!(
            idx < self.len,
            "slot index {idx} out of range (len {})",
            self.len
        );
        self.tag[idx as usize]
    }

    /// Returns the value of a property at raw slot `idx`, if set.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn prop_at(&self, idx: u32, key: PropKey) -> Option<&PropValue> {
        assert!(
            idx < self.len,
            "slot index {idx} out of range (len {})",
            self.len
        );
        self.props[idx as usize]
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }

    /// Returns the parent slot at raw slot `idx`, or [`INVALID`] for roots.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn parent_at(&self, idx: u32) -> u32 {
        assert!(
            idx < self.len,
            "slot index {idx} out of range (len {})",
            self.len
        );
        self.parent[idx as usize]
    }

    // -- Internal helpers --

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: NodeId) {
        assert!(
            id.idx < self.len && self.generation[id.idx as usize] == id.generation,
            "stale NodeId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    /// Appends `c` as the last child of `p` without invalidation.
    fn link_last(&mut self, p: u32, c: u32) {
        self.parent[c as usize] = p;
        self.prev_sibling[c as usize] = INVALID;
        self.next_sibling[c as usize] = INVALID;

        if self.first_child[p as usize] == INVALID {
            self.first_child[p as usize] = c;
        } else {
            // Walk to last child.
            let mut last = self.first_child[p as usize];
            while self.next_sibling[last as usize] != INVALID {
                last = self.next_sibling[last as usize];
            }
            self.next_sibling[last as usize] = c;
            self.prev_sibling[c as usize] = last;
        }
    }

    /// Removes `idx` from its parent's child list without invalidation.
    fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            // Was first child.
            self.first_child[p as usize] = next;
        }

        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
    }

    /// Panics if `p` lies inside the subtree rooted at `c`.
    ///
    /// The single-parent link discipline makes this the only way a cycle
    /// could form, so the tree stays acyclic by construction.
    fn assert_not_in_subtree(&self, p: u32, c: u32) {
        let mut cur = p;
        while cur != INVALID {
            assert!(
                cur != c,
                "cannot attach a node under its own descendant (slot {c})"
            );
            cur = self.parent[cur as usize];
        }
    }

    /// Re-establishes dirty coverage for a just-attached subtree: the child
    /// may have been scheduled as its own root while detached, but its
    /// covering root is now found through the new parent chain.
    fn reroot(&mut self, c: u32) {
        self.pending.retain(|&r| r != c);
        self.propagate_from(c);
    }

    /// Panics if `p` already has a child named like `c`.
    fn assert_sibling_name_free(&self, p: u32, c: u32) {
        let mut sibling = self.first_child[p as usize];
        while sibling != INVALID {
            assert!(
                self.name[sibling as usize] != self.name[c as usize],
                "duplicate sibling name: {:?}",
                self.name[c as usize]
            );
            sibling = self.next_sibling[sibling as usize];
        }
    }
}
