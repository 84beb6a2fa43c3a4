// Copyright 2026 the Updraft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per
//! event to a [`Write`](std::io::Write) destination (default: stderr).
//! Durations are printed in microseconds.

use std::io::Write;

use updraft_core::trace::{
    InvalidateEvent, PassBeginEvent, PassEndEvent, SessionBeginEvent, SessionEndEvent,
    TickBeginEvent, TickEndEvent, TickSummary, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write)
/// destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }
}

fn ns_to_us(ns: u64) -> f64 {
    ns as f64 / 1000.0
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_session_begin(&mut self, e: &SessionBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[session+] t={:.1}µs node={} depth={}",
            ns_to_us(e.at.nanos()),
            e.node_index,
            e.depth
        );
    }

    fn on_session_end(&mut self, e: &SessionEndEvent) {
        let _ = writeln!(
            self.writer,
            "[session-] t={:.1}µs node={} depth={} propagated={}",
            ns_to_us(e.at.nanos()),
            e.node_index,
            e.depth,
            e.propagated
        );
    }

    fn on_invalidate(&mut self, e: &InvalidateEvent) {
        let _ = writeln!(
            self.writer,
            "[mark] t={:.1}µs node={} steps={} short_circuited={} scheduled={}",
            ns_to_us(e.at.nanos()),
            e.node_index,
            e.steps,
            e.short_circuited,
            e.scheduled
        );
    }

    fn on_tick_begin(&mut self, e: &TickBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[tick+] tick={} roots={}",
            e.tick_index, e.scheduled_roots
        );
    }

    fn on_pass_begin(&mut self, e: &PassBeginEvent) {
        let _ = writeln!(self.writer, "[pass+] tick={} root={}", e.tick_index, e.root);
    }

    fn on_pass_end(&mut self, e: &PassEndEvent) {
        let _ = writeln!(
            self.writer,
            "[pass-] tick={} root={} visited={} ok={}",
            e.tick_index, e.root, e.nodes_visited, e.ok
        );
    }

    fn on_tick_end(&mut self, e: &TickEndEvent) {
        let _ = writeln!(
            self.writer,
            "[tick-] tick={} passes={} deferred={} visited={}",
            e.tick_index, e.passes_completed, e.roots_deferred, e.nodes_visited
        );
    }

    fn on_tick_summary(&mut self, s: &TickSummary) {
        let _ = writeln!(
            self.writer,
            "[summary] tick={} mutate={:.1}µs tick={:.1}µs passes={} deferred={} visited={} marks={}/{} sessions={} failed={}",
            s.tick_index,
            ns_to_us(s.mutate_ns),
            ns_to_us(s.tick_ns),
            s.passes_completed,
            s.roots_deferred,
            s.nodes_visited,
            s.invalidations,
            s.short_circuits,
            s.sessions_closed,
            s.failed
        );
    }

    fn on_nodes_visited(&mut self, tick_index: u64, nodes: &[u32]) {
        let _ = writeln!(
            self.writer,
            "[visited] tick={} nodes={nodes:?}",
            tick_index
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_one_line_per_event() {
        let mut buf: Vec<u8> = Vec::new();
        {
            let mut sink = PrettyPrintSink::with_writer(&mut buf);
            sink.on_tick_begin(&TickBeginEvent {
                tick_index: 1,
                scheduled_roots: 2,
            });
            sink.on_pass_begin(&PassBeginEvent {
                tick_index: 1,
                root: 0,
            });
            sink.on_pass_end(&PassEndEvent {
                tick_index: 1,
                root: 0,
                nodes_visited: 3,
                ok: true,
            });
        }

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("[tick+]"));
        assert!(lines[1].starts_with("[pass+]"));
        assert!(lines[2].contains("visited=3"));
    }

    #[test]
    fn invalidate_line_carries_walk_outcome() {
        let mut buf: Vec<u8> = Vec::new();
        {
            let mut sink = PrettyPrintSink::with_writer(&mut buf);
            sink.on_invalidate(&InvalidateEvent {
                node_index: 9,
                steps: 2,
                short_circuited: true,
                scheduled: false,
                at: updraft_core::time::Stamp(1_500),
            });
        }

        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("node=9"));
        assert!(text.contains("short_circuited=true"));
    }
}
