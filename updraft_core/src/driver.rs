// Copyright 2026 the Updraft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Driver contract for host integrations.
//!
//! Updraft owns the bookkeeping between mutations and redraws; the actual
//! layout/render/present work belongs to a *driver* supplied by the host.
//! A host provides the following pieces:
//!
//! - **Tick source** — Decides when [`tick`](crate::node::NodeStore::tick)
//!   runs (vsync callback, timer, or an explicit "render now" call). This
//!   is host-specific and not abstracted by a trait because setup and
//!   lifecycle differ fundamentally across platforms.
//!
//! - **Driver** — Implements [`RenderDriver`] to perform layout and
//!   rendering for each scheduled redraw root.
//!
//! - **Background handoff** — Work running off the owning thread posts
//!   invalidations through the [`queue`](crate::queue) inbox (with the
//!   `std` feature) instead of touching the tree directly.
//!
//! # Tick loop pseudocode
//!
//! A typical host tick wires the pieces together like this:
//!
//! ```rust,ignore
//! fn on_tick() {
//!     // Hand back results from background work first.
//!     inbox.drain_into(&mut store);
//!
//!     // Apply this tick's batched mutations.
//!     let token = store.begin_update(panel);
//!     store.set_prop(panel, PropKey::Opacity, PropValue::Float(0.8));
//!     store.end_update(token);
//!
//!     // Drain: one driver pass per scheduled root, dirty paths only.
//!     let report = store.tick(&mut driver);
//!     if report.failure.is_some() {
//!         // Deferred roots stay scheduled and retry on the next tick.
//!     }
//! }
//! ```

use alloc::string::String;
use core::fmt;

use crate::node::NodeStore;
use crate::tick::PassChanges;

/// Failure reported by a driver pass.
///
/// A failed pass leaves the affected roots scheduled and their dirty flags
/// set, so the work is retried on the next tick rather than dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DriverError {
    message: String,
}

impl DriverError {
    /// Creates an error with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "driver pass failed: {}", self.message)
    }
}

impl core::error::Error for DriverError {}

/// Performs redraw work for scheduled roots.
///
/// Implemented by platform presenters and test doubles alike. The store is
/// handed in immutably; drivers read current values via the `*_at()` raw
/// accessors using the slot indices in [`PassChanges`].
pub trait RenderDriver {
    /// Called once at the start of a tick when nodes were created or
    /// destroyed since the last one, before any render pass.
    ///
    /// `removed` slots are already recycled; only the indices are
    /// meaningful (e.g. as keys for retiring native resources).
    fn apply_lifecycle(&mut self, store: &NodeStore, added: &[u32], removed: &[u32]) {
        _ = (store, added, removed);
    }

    /// Performs layout/render work for one scheduled root.
    ///
    /// `pass.nodes` lists the dirty path through the root's subtree in
    /// depth-first pre-order; clean branches are pruned. Returning an error
    /// aborts the tick: this root and any not yet reached stay scheduled.
    fn render(&mut self, store: &NodeStore, pass: &PassChanges) -> Result<(), DriverError>;
}
