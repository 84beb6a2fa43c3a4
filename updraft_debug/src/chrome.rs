// Copyright 2026 the Updraft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a
//! [`RecorderSink`](super::recorder::RecorderSink) and writes [Chrome Trace
//! Event Format][spec] JSON to the given writer, suitable for loading into
//! `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
//!
//! Session and invalidation events carry host stamps and are exported as
//! instant events at their real times. Each [`TickSummary`] becomes a pair
//! of complete ("X") events for the mutate and tick phases plus a counter
//! ("C") sample. Index-only events (tick/pass begin/end, node-visit counts)
//! carry no clock reading and are skipped here; use the pretty printer or
//! decoder for those.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects. Timestamps
/// are converted from nanoseconds to microseconds.
///
/// # Errors
///
/// Returns any I/O error from the writer.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::SessionBegin(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "SessionBegin",
                    "cat": "Session",
                    "ts": ns_to_us(e.at.nanos()),
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "node": e.node_index,
                        "depth": e.depth,
                    }
                }));
            }
            RecordedEvent::SessionEnd(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "SessionEnd",
                    "cat": "Session",
                    "ts": ns_to_us(e.at.nanos()),
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "node": e.node_index,
                        "depth": e.depth,
                        "propagated": e.propagated,
                    }
                }));
            }
            RecordedEvent::Invalidate(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Invalidate",
                    "cat": "Signal",
                    "ts": ns_to_us(e.at.nanos()),
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "node": e.node_index,
                        "steps": e.steps,
                        "short_circuited": e.short_circuited,
                        "scheduled": e.scheduled,
                    }
                }));
            }
            RecordedEvent::TickSummary(s) => {
                events.push(json!({
                    "ph": "X",
                    "name": "Mutate",
                    "cat": "Tick",
                    "ts": ns_to_us(s.now.nanos()),
                    "dur": ns_to_us(s.mutate_ns),
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "tick_index": s.tick_index,
                        "invalidations": s.invalidations,
                        "short_circuits": s.short_circuits,
                        "sessions_closed": s.sessions_closed,
                    }
                }));
                events.push(json!({
                    "ph": "X",
                    "name": "Tick",
                    "cat": "Tick",
                    "ts": ns_to_us(s.now.nanos() + s.mutate_ns),
                    "dur": ns_to_us(s.tick_ns),
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "tick_index": s.tick_index,
                        "passes": s.passes_completed,
                        "deferred": s.roots_deferred,
                        "failed": s.failed,
                    }
                }));
                events.push(json!({
                    "ph": "C",
                    "name": "coalescing",
                    "cat": "Tick",
                    "ts": ns_to_us(s.now.nanos()),
                    "pid": 0,
                    "args": {
                        "invalidations": s.invalidations,
                        "passes": s.passes_completed,
                        "nodes_visited": s.nodes_visited,
                    }
                }));
            }
            // Index-only events have no clock reading to place them with.
            RecordedEvent::TickBegin(_)
            | RecordedEvent::PassBegin(_)
            | RecordedEvent::PassEnd(_)
            | RecordedEvent::TickEnd(_)
            | RecordedEvent::NodesVisitedCount { .. } => {}
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn ns_to_us(ns: u64) -> f64 {
    ns as f64 / 1000.0
}
