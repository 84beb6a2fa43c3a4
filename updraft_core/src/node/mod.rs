// Copyright 2026 the Updraft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node tree data model.
//!
//! A *node* is an element in a retained ownership tree. Each node has:
//!
//! - An identity ([`NodeId`]) — a generational handle that becomes stale when
//!   the node is destroyed, preventing use-after-free bugs at the API level —
//!   plus a name (unique among siblings) and an optional [`TypeTag`].
//! - Topology — parent, first-child, and sibling links forming an ordered
//!   tree. Destroying a node destroys its entire subtree.
//! - **Update state** maintained by the coordinator: the open-session count
//!   (see [`begin_update`](NodeStore::begin_update)) and the redraw flag
//!   maintained by [invalidation](crate::signal).
//! - A typed property list (see [`props`](crate::props)), mutated through
//!   setters that invalidate automatically.
//!
//! Nodes are stored in struct-of-arrays layout with index-based handles for
//! cache-friendly traversal.

mod id;
mod store;
mod traverse;

pub use id::{INVALID, NodeId, TypeTag};
pub use store::NodeStore;
pub use traverse::{Ancestors, Children};
