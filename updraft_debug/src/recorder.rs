// Copyright 2026 the Updraft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records. [`decode`] reads them back
//! as an iterator of [`RecordedEvent`].
//!
//! The rich event ([`on_nodes_visited`](TraceSink::on_nodes_visited))
//! stores only the count.

use updraft_core::time::Stamp;
use updraft_core::trace::{
    InvalidateEvent, PassBeginEvent, PassEndEvent, SessionBeginEvent, SessionEndEvent,
    TickBeginEvent, TickEndEvent, TickSummary, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_SESSION_BEGIN: u8 = 1;
const TAG_SESSION_END: u8 = 2;
const TAG_INVALIDATE: u8 = 3;
const TAG_TICK_BEGIN: u8 = 4;
const TAG_PASS_BEGIN: u8 = 5;
const TAG_PASS_END: u8 = 6;
const TAG_TICK_END: u8 = 7;
const TAG_TICK_SUMMARY: u8 = 8;
const TAG_NODES_VISITED_COUNT: u8 = 9;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }
}

impl TraceSink for RecorderSink {
    fn on_session_begin(&mut self, e: &SessionBeginEvent) {
        self.write_u8(TAG_SESSION_BEGIN);
        self.write_u32(e.node_index);
        self.write_u32(e.depth);
        self.write_u64(e.at.nanos());
    }

    fn on_session_end(&mut self, e: &SessionEndEvent) {
        self.write_u8(TAG_SESSION_END);
        self.write_u32(e.node_index);
        self.write_u32(e.depth);
        self.write_bool(e.propagated);
        self.write_u64(e.at.nanos());
    }

    fn on_invalidate(&mut self, e: &InvalidateEvent) {
        self.write_u8(TAG_INVALIDATE);
        self.write_u32(e.node_index);
        self.write_u32(e.steps);
        self.write_bool(e.short_circuited);
        self.write_bool(e.scheduled);
        self.write_u64(e.at.nanos());
    }

    fn on_tick_begin(&mut self, e: &TickBeginEvent) {
        self.write_u8(TAG_TICK_BEGIN);
        self.write_u64(e.tick_index);
        self.write_u32(e.scheduled_roots);
    }

    fn on_pass_begin(&mut self, e: &PassBeginEvent) {
        self.write_u8(TAG_PASS_BEGIN);
        self.write_u64(e.tick_index);
        self.write_u32(e.root);
    }

    fn on_pass_end(&mut self, e: &PassEndEvent) {
        self.write_u8(TAG_PASS_END);
        self.write_u64(e.tick_index);
        self.write_u32(e.root);
        self.write_u32(e.nodes_visited);
        self.write_bool(e.ok);
    }

    fn on_tick_end(&mut self, e: &TickEndEvent) {
        self.write_u8(TAG_TICK_END);
        self.write_u64(e.tick_index);
        self.write_u32(e.passes_completed);
        self.write_u32(e.roots_deferred);
        self.write_u32(e.nodes_visited);
    }

    fn on_tick_summary(&mut self, s: &TickSummary) {
        self.write_u8(TAG_TICK_SUMMARY);
        self.write_u64(s.tick_index);
        self.write_u64(s.now.nanos());
        self.write_u64(s.mutate_ns);
        self.write_u64(s.tick_ns);
        self.write_u32(s.passes_completed);
        self.write_u32(s.roots_deferred);
        self.write_u32(s.nodes_visited);
        self.write_u32(s.invalidations);
        self.write_u32(s.short_circuits);
        self.write_u32(s.sessions_closed);
        self.write_bool(s.failed);
    }

    fn on_nodes_visited(&mut self, tick_index: u64, nodes: &[u32]) {
        self.write_u8(TAG_NODES_VISITED_COUNT);
        self.write_u64(tick_index);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "visit count capped at u32::MAX for recording"
        )]
        self.write_u32(nodes.len().min(u32::MAX as usize) as u32);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`SessionBeginEvent`].
    SessionBegin(SessionBeginEvent),
    /// A [`SessionEndEvent`].
    SessionEnd(SessionEndEvent),
    /// An [`InvalidateEvent`].
    Invalidate(InvalidateEvent),
    /// A [`TickBeginEvent`].
    TickBegin(TickBeginEvent),
    /// A [`PassBeginEvent`].
    PassBegin(PassBeginEvent),
    /// A [`PassEndEvent`].
    PassEnd(PassEndEvent),
    /// A [`TickEndEvent`].
    TickEnd(TickEndEvent),
    /// A [`TickSummary`].
    TickSummary(TickSummary),
    /// Node-visit count for a pass.
    NodesVisitedCount {
        /// Tick counter.
        tick_index: u64,
        /// Number of dirty nodes visited.
        count: u32,
    },
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_u8(&mut self) -> Option<u8> {
        if self.remaining() < 1 {
            return None;
        }
        let v = self.data[self.pos];
        self.pos += 1;
        Some(v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        if self.remaining() < 4 {
            return None;
        }
        let v = u32::from_le_bytes(self.data[self.pos..self.pos + 4].try_into().ok()?);
        self.pos += 4;
        Some(v)
    }

    fn read_u64(&mut self) -> Option<u64> {
        if self.remaining() < 8 {
            return None;
        }
        let v = u64::from_le_bytes(self.data[self.pos..self.pos + 8].try_into().ok()?);
        self.pos += 8;
        Some(v)
    }

    fn read_bool(&mut self) -> Option<bool> {
        Some(self.read_u8()? != 0)
    }

    fn decode_session_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::SessionBegin(SessionBeginEvent {
            node_index: self.read_u32()?,
            depth: self.read_u32()?,
            at: Stamp(self.read_u64()?),
        }))
    }

    fn decode_session_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::SessionEnd(SessionEndEvent {
            node_index: self.read_u32()?,
            depth: self.read_u32()?,
            propagated: self.read_bool()?,
            at: Stamp(self.read_u64()?),
        }))
    }

    fn decode_invalidate(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Invalidate(InvalidateEvent {
            node_index: self.read_u32()?,
            steps: self.read_u32()?,
            short_circuited: self.read_bool()?,
            scheduled: self.read_bool()?,
            at: Stamp(self.read_u64()?),
        }))
    }

    fn decode_tick_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::TickBegin(TickBeginEvent {
            tick_index: self.read_u64()?,
            scheduled_roots: self.read_u32()?,
        }))
    }

    fn decode_pass_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PassBegin(PassBeginEvent {
            tick_index: self.read_u64()?,
            root: self.read_u32()?,
        }))
    }

    fn decode_pass_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PassEnd(PassEndEvent {
            tick_index: self.read_u64()?,
            root: self.read_u32()?,
            nodes_visited: self.read_u32()?,
            ok: self.read_bool()?,
        }))
    }

    fn decode_tick_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::TickEnd(TickEndEvent {
            tick_index: self.read_u64()?,
            passes_completed: self.read_u32()?,
            roots_deferred: self.read_u32()?,
            nodes_visited: self.read_u32()?,
        }))
    }

    fn decode_tick_summary(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::TickSummary(TickSummary {
            tick_index: self.read_u64()?,
            now: Stamp(self.read_u64()?),
            mutate_ns: self.read_u64()?,
            tick_ns: self.read_u64()?,
            passes_completed: self.read_u32()?,
            roots_deferred: self.read_u32()?,
            nodes_visited: self.read_u32()?,
            invalidations: self.read_u32()?,
            short_circuits: self.read_u32()?,
            sessions_closed: self.read_u32()?,
            failed: self.read_bool()?,
        }))
    }

    fn decode_nodes_visited_count(&mut self) -> Option<RecordedEvent> {
        let tick_index = self.read_u64()?;
        let count = self.read_u32()?;
        Some(RecordedEvent::NodesVisitedCount { tick_index, count })
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_SESSION_BEGIN => self.decode_session_begin(),
            TAG_SESSION_END => self.decode_session_end(),
            TAG_INVALIDATE => self.decode_invalidate(),
            TAG_TICK_BEGIN => self.decode_tick_begin(),
            TAG_PASS_BEGIN => self.decode_pass_begin(),
            TAG_PASS_END => self.decode_pass_end(),
            TAG_TICK_END => self.decode_tick_end(),
            TAG_TICK_SUMMARY => self.decode_tick_summary(),
            TAG_NODES_VISITED_COUNT => self.decode_nodes_visited_count(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_summary() -> TickSummary {
        TickSummary {
            tick_index: 7,
            now: Stamp(1_000_000),
            mutate_ns: 400,
            tick_ns: 1600,
            passes_completed: 2,
            roots_deferred: 0,
            nodes_visited: 9,
            invalidations: 5,
            short_circuits: 3,
            sessions_closed: 1,
            failed: false,
        }
    }

    #[test]
    fn round_trip_session_events() {
        let mut rec = RecorderSink::new();
        rec.on_session_begin(&SessionBeginEvent {
            node_index: 4,
            depth: 1,
            at: Stamp(1_000),
        });
        rec.on_session_end(&SessionEndEvent {
            node_index: 4,
            depth: 1,
            propagated: true,
            at: Stamp(2_000),
        });

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 2);
        match &events[0] {
            RecordedEvent::SessionBegin(e) => {
                assert_eq!(e.node_index, 4);
                assert_eq!(e.depth, 1);
                assert_eq!(e.at, Stamp(1_000));
            }
            other => panic!("expected SessionBegin, got {other:?}"),
        }
        match &events[1] {
            RecordedEvent::SessionEnd(e) => {
                assert_eq!(e.node_index, 4);
                assert!(e.propagated);
            }
            other => panic!("expected SessionEnd, got {other:?}"),
        }
    }

    #[test]
    fn round_trip_invalidate() {
        let mut rec = RecorderSink::new();
        rec.on_invalidate(&InvalidateEvent {
            node_index: 11,
            steps: 3,
            short_circuited: false,
            scheduled: true,
            at: Stamp(1_500),
        });

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 1);
        match &events[0] {
            RecordedEvent::Invalidate(e) => {
                assert_eq!(e.node_index, 11);
                assert_eq!(e.steps, 3);
                assert!(!e.short_circuited);
                assert!(e.scheduled);
                assert_eq!(e.at, Stamp(1_500));
            }
            other => panic!("expected Invalidate, got {other:?}"),
        }
    }

    #[test]
    fn round_trip_tick_and_pass_events() {
        let mut rec = RecorderSink::new();
        rec.on_tick_begin(&TickBeginEvent {
            tick_index: 5,
            scheduled_roots: 2,
        });
        rec.on_pass_begin(&PassBeginEvent {
            tick_index: 5,
            root: 0,
        });
        rec.on_pass_end(&PassEndEvent {
            tick_index: 5,
            root: 0,
            nodes_visited: 4,
            ok: true,
        });
        rec.on_tick_end(&TickEndEvent {
            tick_index: 5,
            passes_completed: 1,
            roots_deferred: 0,
            nodes_visited: 4,
        });

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], RecordedEvent::TickBegin(_)));
        assert!(matches!(events[1], RecordedEvent::PassBegin(_)));
        match &events[2] {
            RecordedEvent::PassEnd(e) => {
                assert_eq!(e.nodes_visited, 4);
                assert!(e.ok);
            }
            other => panic!("expected PassEnd, got {other:?}"),
        }
        match &events[3] {
            RecordedEvent::TickEnd(e) => {
                assert_eq!(e.passes_completed, 1);
                assert_eq!(e.nodes_visited, 4);
            }
            other => panic!("expected TickEnd, got {other:?}"),
        }
    }

    #[test]
    fn round_trip_tick_summary() {
        let mut rec = RecorderSink::new();
        let orig = sample_summary();
        rec.on_tick_summary(&orig);

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 1);
        match &events[0] {
            RecordedEvent::TickSummary(s) => {
                assert_eq!(s.tick_index, orig.tick_index);
                assert_eq!(s.now, orig.now);
                assert_eq!(s.mutate_ns, orig.mutate_ns);
                assert_eq!(s.tick_ns, orig.tick_ns);
                assert_eq!(s.passes_completed, orig.passes_completed);
                assert_eq!(s.invalidations, orig.invalidations);
                assert_eq!(s.short_circuits, orig.short_circuits);
                assert_eq!(s.failed, orig.failed);
            }
            other => panic!("expected TickSummary, got {other:?}"),
        }
    }

    #[test]
    fn nodes_visited_stores_count_only() {
        let mut rec = RecorderSink::new();
        rec.on_nodes_visited(3, &[0, 1, 2, 5]);

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 1);
        match &events[0] {
            RecordedEvent::NodesVisitedCount { tick_index, count } => {
                assert_eq!(*tick_index, 3);
                assert_eq!(*count, 4);
            }
            other => panic!("expected NodesVisitedCount, got {other:?}"),
        }
    }

    #[test]
    fn empty_buffer_decodes_to_nothing() {
        let events: Vec<_> = decode(&[]).collect();
        assert!(events.is_empty());
    }

    #[test]
    fn truncated_record_stops_iteration() {
        let mut rec = RecorderSink::new();
        rec.on_tick_begin(&TickBeginEvent {
            tick_index: 1,
            scheduled_roots: 1,
        });
        let bytes = rec.as_bytes();
        let events: Vec<_> = decode(&bytes[..bytes.len() - 2]).collect();
        assert!(events.is_empty());
    }
}
