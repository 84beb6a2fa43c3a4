// Copyright 2026 the Updraft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node tree, update sessions, and dirty propagation for coalesced redraw
//! scheduling.
//!
//! `updraft_core` provides the bookkeeping between retained-tree mutations
//! and redraws: arbitrary batches of property and structural changes
//! collapse into the minimal set of driver passes, one per affected tree
//! root per tick. It is `no_std` compatible (with `alloc`) and uses
//! array-based struct-of-arrays storage with index handles for
//! cache-friendly traversal.
//!
//! # Architecture
//!
//! The crate is organized around an update loop that turns mutation batches
//! into coalesced driver passes:
//!
//! ```text
//!   begin_update ──► setters / structural mutations ──► end_update
//!                          │                                │
//!                          ▼                                ▼
//!                    upward dirty marking          schedule redraw root
//!                    (short-circuiting)               (idempotent)
//!                                                       │
//!   Host tick source ──► NodeStore::tick() ─────────────┘
//!                              │
//!                              ▼
//!                    PassChanges ──► RenderDriver::render()
//! ```
//!
//! **[`node`]** — Struct-of-arrays node tree with generational handles,
//! sibling-unique names, and typed properties. Setters and structural
//! mutations invalidate automatically.
//!
//! **[`session`]** — Nested per-node update sessions. Only the outermost
//! close on a node fires propagation; sessions open on ancestors defer
//! scheduling further.
//!
//! **[`signal`]** — The upward-marking walk: O(depth to the first dirty
//! ancestor) per mutation, with idempotent scheduling of redraw roots.
//!
//! **[`tick`]** — Drains scheduled roots, prunes clean branches, and
//! dispatches one driver pass per root with at-least-once retry semantics.
//!
//! **[`driver`]** — The [`RenderDriver`](driver::RenderDriver) trait that
//! hosts implement to perform layout and rendering work.
//!
//! **[`props`]** — Closed typed property set with an explicit
//! unknown-property error at the string-key boundary.
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) trait and event types
//! for update-loop instrumentation, with zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! **[`time`]** — Monotonic nanosecond stamps for instrumentation.
//!
//! **[`queue`]** (`std` only) — Bounded handoff for invalidations posted
//! from background threads.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables the cross-thread invalidation
//!   queue.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one
//!   branch per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-pass
//!   node-visit events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

pub mod driver;
pub mod node;
pub mod props;
#[cfg(feature = "std")]
pub mod queue;
pub mod session;
pub mod signal;
pub mod tick;
pub mod time;
pub mod trace;
