// Copyright 2026 the Updraft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cross-thread invalidation handoff.
//!
//! The node tree is owned and mutated by exactly one thread. Background
//! work (asset decodes, network fetches) that finishes off-thread must not
//! touch the tree; instead it posts the affected node through a
//! [`RemoteInvalidator`] and the owning thread drains the
//! [`InvalidationInbox`] at the top of its tick, turning each entry into an
//! ordinary [`request_render`](crate::node::NodeStore::request_render).
//!
//! The inbox is bounded with a drop-oldest overflow policy: invalidations
//! are idempotent, so under backpressure the newest requests are the ones
//! worth keeping. Dropped entries are counted for diagnostics.
//!
//! A posted handle can race with destruction of its node; stale entries are
//! skipped at drain time rather than treated as errors.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use crate::node::{NodeId, NodeStore};

#[derive(Debug)]
struct Shared {
    items: VecDeque<NodeId>,
    capacity: usize,
    dropped: u64,
}

/// Receiving end of the invalidation queue, owned by the tree's thread.
#[derive(Debug)]
pub struct InvalidationInbox {
    shared: Arc<Mutex<Shared>>,
}

impl InvalidationInbox {
    /// Creates an inbox holding at most `capacity` pending entries.
    ///
    /// A capacity of zero is promoted to one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            shared: Arc::new(Mutex::new(Shared {
                items: VecDeque::with_capacity(capacity),
                capacity,
                dropped: 0,
            })),
        }
    }

    /// Returns a handle for posting invalidations from other threads.
    ///
    /// Cloning is cheap (Arc bump).
    #[must_use]
    pub fn handle(&self) -> RemoteInvalidator {
        RemoteInvalidator {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Drains all pending entries into the store as
    /// [`request_render`](NodeStore::request_render) calls.
    ///
    /// Entries whose node has been destroyed since posting are skipped.
    /// Returns the number of invalidations applied.
    pub fn drain_into(&self, store: &mut NodeStore) -> usize {
        let drained: VecDeque<NodeId> = {
            let mut shared = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
            core::mem::take(&mut shared.items)
        };

        let mut applied = 0;
        for node in drained {
            if store.is_alive(node) {
                let _ = store.request_render(node);
                applied += 1;
            }
        }
        applied
    }

    /// Number of entries currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .items
            .len()
    }

    /// Returns whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total entries dropped to the overflow policy since creation.
    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .dropped
    }
}

/// A `Send + Sync` handle that posts node invalidations to the owning
/// thread's [`InvalidationInbox`].
#[derive(Clone, Debug)]
pub struct RemoteInvalidator {
    shared: Arc<Mutex<Shared>>,
}

impl RemoteInvalidator {
    /// Posts an invalidation request for `node`.
    ///
    /// Safe to call from any thread. If the inbox is full, the oldest
    /// pending entry is dropped to make room.
    pub fn post(&self, node: NodeId) {
        let mut shared = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
        if shared.items.len() == shared.capacity {
            let _ = shared.items.pop_front();
            shared.dropped += 1;
        }
        shared.items.push_back(node);
    }
}
