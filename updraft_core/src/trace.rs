// Copyright 2026 the Updraft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the update loop.
//!
//! This module provides a [`TraceSink`] trait with per-event methods. All
//! method bodies default to no-ops, so implementing only the events you care
//! about is fine. Session and invalidation events are emitted by the host
//! around its calls (the store hands back the data via
//! [`InvalidateOutcome`](crate::signal::InvalidateOutcome) and
//! [`TickReport`](crate::tick::TickReport)); tick and pass events are
//! emitted by [`tick_traced`](crate::node::NodeStore::tick_traced) itself.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace`
//! feature is **off**, every `Tracer` method compiles to nothing (zero
//! overhead). When **on**, each method performs a single `Option` branch
//! before dispatching.
//!
//! [`TickSummaryBuilder`] collects phase timestamps and report counters
//! during a tick and produces a [`TickSummary`] at the end.
//!
//! # Crate features
//!
//! - `trace` — enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`) — gates per-pass node-visit events.

use crate::tick::TickReport;
use crate::time::Stamp;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which phase of the update loop is being measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Host mutation work (sessions, setters, structural changes).
    Mutate,
    /// Draining scheduled roots and running driver passes.
    Tick,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when an update session is opened.
#[derive(Clone, Copy, Debug)]
pub struct SessionBeginEvent {
    /// Raw slot index of the session node.
    pub node_index: u32,
    /// Session depth after the open (1 = outermost).
    pub depth: u32,
    /// Host time of the open.
    pub at: Stamp,
}

/// Emitted when an update session is closed.
#[derive(Clone, Copy, Debug)]
pub struct SessionEndEvent {
    /// Raw slot index of the session node.
    pub node_index: u32,
    /// Session depth before the close.
    pub depth: u32,
    /// Whether this close fired propagation.
    pub propagated: bool,
    /// Host time of the close.
    pub at: Stamp,
}

/// Emitted for an invalidation walk.
#[derive(Clone, Copy, Debug)]
pub struct InvalidateEvent {
    /// Raw slot index of the invalidated node.
    pub node_index: u32,
    /// Nodes newly marked by the walk.
    pub steps: u32,
    /// Whether the walk stopped at an already-dirty node.
    pub short_circuited: bool,
    /// Whether a redraw root was newly scheduled.
    pub scheduled: bool,
    /// Host time of the walk.
    pub at: Stamp,
}

/// Marks the start of a tick.
#[derive(Clone, Copy, Debug)]
pub struct TickBeginEvent {
    /// Monotonic tick counter.
    pub tick_index: u64,
    /// Redraw roots scheduled at the start of the tick.
    pub scheduled_roots: u32,
}

/// Marks the start of one driver pass within a tick.
#[derive(Clone, Copy, Debug)]
pub struct PassBeginEvent {
    /// Tick counter.
    pub tick_index: u64,
    /// Raw slot index of the pass root.
    pub root: u32,
}

/// Marks the end of one driver pass within a tick.
#[derive(Clone, Copy, Debug)]
pub struct PassEndEvent {
    /// Tick counter.
    pub tick_index: u64,
    /// Raw slot index of the pass root.
    pub root: u32,
    /// Dirty nodes visited (0 for a failed pass).
    pub nodes_visited: u32,
    /// Whether the driver pass succeeded.
    pub ok: bool,
}

/// Marks the end of a tick.
#[derive(Clone, Copy, Debug)]
pub struct TickEndEvent {
    /// Tick counter.
    pub tick_index: u64,
    /// Driver passes that completed.
    pub passes_completed: u32,
    /// Roots rescheduled after a failure.
    pub roots_deferred: u32,
    /// Total dirty nodes visited.
    pub nodes_visited: u32,
}

/// Per-tick summary produced by [`TickSummaryBuilder`].
#[derive(Clone, Copy, Debug)]
pub struct TickSummary {
    /// Tick counter.
    pub tick_index: u64,
    /// Host time at the start of the tick.
    pub now: Stamp,
    /// Mutate phase duration in nanoseconds (0 if not measured).
    pub mutate_ns: u64,
    /// Tick (drain + render) phase duration in nanoseconds (0 if not
    /// measured).
    pub tick_ns: u64,
    /// Driver passes that completed.
    pub passes_completed: u32,
    /// Roots rescheduled after a failure.
    pub roots_deferred: u32,
    /// Total dirty nodes visited.
    pub nodes_visited: u32,
    /// Invalidation walks since the previous tick.
    pub invalidations: u32,
    /// Walks that short-circuited at a dirty node.
    pub short_circuits: u32,
    /// Update sessions closed since the previous tick.
    pub sessions_closed: u32,
    /// Whether the tick ended in a driver failure.
    pub failed: bool,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the update loop.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when an update session is opened.
    fn on_session_begin(&mut self, e: &SessionBeginEvent) {
        _ = e;
    }

    /// Called when an update session is closed.
    fn on_session_end(&mut self, e: &SessionEndEvent) {
        _ = e;
    }

    /// Called for an invalidation walk.
    fn on_invalidate(&mut self, e: &InvalidateEvent) {
        _ = e;
    }

    /// Called at the start of a tick.
    fn on_tick_begin(&mut self, e: &TickBeginEvent) {
        _ = e;
    }

    /// Called at the start of each driver pass.
    fn on_pass_begin(&mut self, e: &PassBeginEvent) {
        _ = e;
    }

    /// Called at the end of each driver pass.
    fn on_pass_end(&mut self, e: &PassEndEvent) {
        _ = e;
    }

    /// Called at the end of a tick.
    fn on_tick_end(&mut self, e: &TickEndEvent) {
        _ = e;
    }

    /// Called with a per-tick summary.
    fn on_tick_summary(&mut self, s: &TickSummary) {
        _ = s;
    }

    /// Called with the dirty nodes of each pass (requires `trace-rich`
    /// feature).
    #[cfg(feature = "trace-rich")]
    fn on_nodes_visited(&mut self, tick_index: u64, nodes: &[u32]) {
        _ = (tick_index, nodes);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing.
/// When **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`SessionBeginEvent`].
    #[inline]
    pub fn session_begin(&mut self, e: &SessionBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_session_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`SessionEndEvent`].
    #[inline]
    pub fn session_end(&mut self, e: &SessionEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_session_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`InvalidateEvent`].
    #[inline]
    pub fn invalidate(&mut self, e: &InvalidateEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_invalidate(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`TickBeginEvent`].
    #[inline]
    pub fn tick_begin(&mut self, e: &TickBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_tick_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PassBeginEvent`].
    #[inline]
    pub fn pass_begin(&mut self, e: &PassBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_pass_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PassEndEvent`].
    #[inline]
    pub fn pass_end(&mut self, e: &PassEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_pass_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`TickEndEvent`].
    #[inline]
    pub fn tick_end(&mut self, e: &TickEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_tick_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`TickSummary`].
    #[inline]
    pub fn tick_summary(&mut self, s: &TickSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_tick_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }

    /// Emits the dirty nodes of a pass (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn nodes_visited(&mut self, tick_index: u64, nodes: &[u32]) {
        if let Some(s) = &mut self.sink {
            s.on_nodes_visited(tick_index, nodes);
        }
    }
}

// ---------------------------------------------------------------------------
// TickSummaryBuilder
// ---------------------------------------------------------------------------

/// Collects phase timestamps and report counters during a tick and produces
/// a [`TickSummary`].
#[derive(Debug)]
pub struct TickSummaryBuilder {
    tick_index: u64,
    now: Stamp,
    phase_starts: [Option<Stamp>; 2],
    phase_ends: [Option<Stamp>; 2],
    passes_completed: u32,
    roots_deferred: u32,
    nodes_visited: u32,
    invalidations: u32,
    short_circuits: u32,
    sessions_closed: u32,
    failed: bool,
}

impl TickSummaryBuilder {
    /// Starts building a summary for the given tick.
    #[must_use]
    pub fn new(tick_index: u64, now: Stamp) -> Self {
        Self {
            tick_index,
            now,
            phase_starts: [None; 2],
            phase_ends: [None; 2],
            passes_completed: 0,
            roots_deferred: 0,
            nodes_visited: 0,
            invalidations: 0,
            short_circuits: 0,
            sessions_closed: 0,
            failed: false,
        }
    }

    /// Records the start of a phase.
    pub fn phase_begin(&mut self, phase: PhaseKind, t: Stamp) {
        self.phase_starts[phase_index(phase)] = Some(t);
    }

    /// Records the end of a phase.
    pub fn phase_end(&mut self, phase: PhaseKind, t: Stamp) {
        self.phase_ends[phase_index(phase)] = Some(t);
    }

    /// Copies the counters out of a [`TickReport`].
    pub fn record_report(&mut self, report: &TickReport) {
        self.passes_completed = report.passes_completed;
        self.roots_deferred = report.roots_deferred;
        self.nodes_visited = report.nodes_visited;
        self.invalidations = report.stats.invalidations;
        self.short_circuits = report.stats.short_circuits;
        self.sessions_closed = report.stats.sessions_closed;
        self.failed = report.failure.is_some();
    }

    /// Consumes the builder and produces the final [`TickSummary`].
    #[must_use]
    pub fn finish(self) -> TickSummary {
        TickSummary {
            tick_index: self.tick_index,
            now: self.now,
            mutate_ns: self.phase_duration(PhaseKind::Mutate),
            tick_ns: self.phase_duration(PhaseKind::Tick),
            passes_completed: self.passes_completed,
            roots_deferred: self.roots_deferred,
            nodes_visited: self.nodes_visited,
            invalidations: self.invalidations,
            short_circuits: self.short_circuits,
            sessions_closed: self.sessions_closed,
            failed: self.failed,
        }
    }

    fn phase_duration(&self, phase: PhaseKind) -> u64 {
        let idx = phase_index(phase);
        match (self.phase_starts[idx], self.phase_ends[idx]) {
            (Some(start), Some(end)) => end.saturating_span_since(start).nanos(),
            _ => 0,
        }
    }
}

/// Maps a [`PhaseKind`] to an array index.
const fn phase_index(phase: PhaseKind) -> usize {
    match phase {
        PhaseKind::Mutate => 0,
        PhaseKind::Tick => 1,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Stamp;

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_tick_begin(&TickBeginEvent {
            tick_index: 0,
            scheduled_roots: 1,
        });
        sink.on_tick_summary(&TickSummary {
            tick_index: 0,
            now: Stamp(0),
            mutate_ns: 0,
            tick_ns: 0,
            passes_completed: 0,
            roots_deferred: 0,
            nodes_visited: 0,
            invalidations: 0,
            short_circuits: 0,
            sessions_closed: 0,
            failed: false,
        });
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.tick_begin(&TickBeginEvent {
            tick_index: 7,
            scheduled_roots: 0,
        });
        tracer.invalidate(&InvalidateEvent {
            node_index: 0,
            steps: 1,
            short_circuited: false,
            scheduled: true,
            at: Stamp(0),
        });
    }

    #[test]
    fn summary_builder_computes_durations() {
        let mut builder = TickSummaryBuilder::new(42, Stamp(1_000_000));

        builder.phase_begin(PhaseKind::Mutate, Stamp(1_000_000));
        builder.phase_end(PhaseKind::Mutate, Stamp(1_000_400));
        builder.phase_begin(PhaseKind::Tick, Stamp(1_000_400));
        builder.phase_end(PhaseKind::Tick, Stamp(1_002_000));

        let summary = builder.finish();
        assert_eq!(summary.tick_index, 42);
        assert_eq!(summary.mutate_ns, 400);
        assert_eq!(summary.tick_ns, 1600);
    }

    #[test]
    fn summary_builder_missing_phases_are_zero() {
        let builder = TickSummaryBuilder::new(0, Stamp(0));
        let summary = builder.finish();
        assert_eq!(summary.mutate_ns, 0);
        assert_eq!(summary.tick_ns, 0);
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::vec::Vec;

        struct RecordingSink {
            ticks: Vec<u64>,
        }
        impl TraceSink for RecordingSink {
            fn on_tick_begin(&mut self, e: &TickBeginEvent) {
                self.ticks.push(e.tick_index);
            }
        }

        let mut sink = RecordingSink { ticks: Vec::new() };
        let mut tracer = Tracer::new(&mut sink);
        tracer.tick_begin(&TickBeginEvent {
            tick_index: 9,
            scheduled_roots: 2,
        });
        drop(tracer);
        assert_eq!(sink.ticks, &[9]);
    }
}
