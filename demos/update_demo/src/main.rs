// Copyright 2026 the Updraft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simulated update loop that exercises the tracing and diagnostics
//! pipeline.
//!
//! Runs 60 synthetic ticks of mutations through the coordinator — steady
//! per-row animation churn, periodic bulk rebuilds, and one simulated
//! driver stall — recording events to both a
//! [`PrettyPrintSink`](updraft_debug::pretty::PrettyPrintSink) and a
//! [`RecorderSink`](updraft_debug::recorder::RecorderSink), feeding a
//! [`CoalesceTracker`](updraft_harness::CoalesceTracker), and finally
//! exporting a Chrome trace JSON file.

use std::fs::File;
use std::io::BufWriter;

use updraft_core::driver::{DriverError, RenderDriver};
use updraft_core::node::{NodeId, NodeStore};
use updraft_core::props::{PropKey, PropValue};
use updraft_core::tick::PassChanges;
use updraft_core::time::Stamp;
use updraft_core::trace::{
    InvalidateEvent, PhaseKind, SessionBeginEvent, SessionEndEvent, TickSummaryBuilder, TraceSink,
    Tracer,
};

use updraft_debug::pretty::PrettyPrintSink;
use updraft_debug::recorder::RecorderSink;
use updraft_harness::{CoalesceSample, CoalesceTracker, LoadProfile, PathologyToggles};

const TICK_COUNT: u64 = 60;
/// 16.6ms tick interval in nanoseconds (≈60 Hz).
const TICK_INTERVAL_NS: u64 = 16_666_667;
const ROW_COUNT: usize = 8;

/// Counts passes and can be primed to stall once.
struct SimDriver {
    stall_next: bool,
    passes: u64,
}

impl RenderDriver for SimDriver {
    fn render(&mut self, store: &NodeStore, pass: &PassChanges) -> Result<(), DriverError> {
        if self.stall_next {
            self.stall_next = false;
            return Err(DriverError::new("simulated GPU stall"));
        }
        // Touch the store the way a presenter would.
        for &idx in &pass.nodes {
            let _ = store.name_at(idx);
            let _ = store.prop_at(idx, PropKey::Opacity);
        }
        self.passes += 1;
        Ok(())
    }
}

fn main() {
    // -- sinks -------------------------------------------------------------
    let mut pretty = PrettyPrintSink::new(Box::new(std::io::stdout()));
    let mut recorder = RecorderSink::new();

    // -- scene -------------------------------------------------------------
    let mut store = NodeStore::new();
    let root = store.create_node("root");
    let header = store.create_node("header");
    let body = store.create_node("body");
    let footer = store.create_node("footer");
    store.add_child(root, header);
    store.add_child(root, body);
    store.add_child(root, footer);

    let mut rows: Vec<NodeId> = Vec::with_capacity(ROW_COUNT);
    for i in 0..ROW_COUNT {
        let row = store.create_node(&format!("row-{i}"));
        store.set_prop(row, PropKey::Label, PropValue::Text(format!("item {i}")));
        store.add_child(body, row);
        rows.push(row);
    }
    let mut next_row_id = ROW_COUNT;

    let toggles = PathologyToggles {
        flaky_driver: true,
        ..PathologyToggles::default()
    };

    let mut driver = SimDriver {
        stall_next: false,
        passes: 0,
    };
    let mut tracker = CoalesceTracker::<16>::new();

    // -- simulated loop ----------------------------------------------------
    let mut now_ns: u64 = 1_000_000_000; // start at 1s

    for tick_index in 0..TICK_COUNT {
        let mutate_start = Stamp(now_ns);

        let profile = if tick_index % 20 == 10 {
            LoadProfile::Bulk
        } else {
            LoadProfile::Animation
        };

        // 1. Mutate inside one session on the body subtree.
        let token = store.begin_update(body);
        emit_session_begin(
            &mut pretty,
            &mut recorder,
            body.index(),
            store.update_depth(body),
            mutate_start,
        );

        match profile {
            LoadProfile::Bulk => {
                // Replace every other row.
                for slot in (0..ROW_COUNT).step_by(2) {
                    store.destroy_node(rows[slot]);
                    let row = store.create_node(&format!("row-{next_row_id}"));
                    next_row_id += 1;
                    store.set_prop(
                        row,
                        PropKey::Label,
                        PropValue::Text(format!("item {next_row_id}")),
                    );
                    store.add_child(body, row);
                    rows[slot] = row;
                }
            }
            _ => {
                // Animate opacity across all rows.
                let phase = (tick_index % 60) as f64 / 60.0;
                for &row in &rows {
                    store.set_prop(row, PropKey::Opacity, PropValue::Float(phase));
                }
            }
        }

        // A direct invalidation outside the setter path, for the trace.
        let outcome = store.request_render(rows[0]);
        let invalidate_event = InvalidateEvent {
            node_index: rows[0].index(),
            steps: outcome.steps,
            short_circuited: outcome.short_circuited,
            scheduled: outcome.scheduled,
            at: Stamp(now_ns + 100_000),
        };
        pretty.on_invalidate(&invalidate_event);
        recorder.on_invalidate(&invalidate_event);

        let propagated = token.was_outermost();
        let session_depth = store.update_depth(body);
        store.end_update(token);
        let mutate_end = Stamp(now_ns + 300_000);
        emit_session_end(
            &mut pretty,
            &mut recorder,
            body.index(),
            session_depth,
            propagated,
            mutate_end,
        );

        // 2. Prime the simulated stall once, mid-run.
        if toggles.flaky_driver && tick_index == 30 {
            driver.stall_next = true;
        }

        // 3. Tick, tracing passes into the recorder.
        let report = store.tick_traced(&mut driver, &mut Tracer::new(&mut recorder));
        let tick_end = Stamp(mutate_end.nanos() + 1_200_000);

        // 4. Summary to both sinks.
        let mut builder = TickSummaryBuilder::new(report.tick_index, mutate_start);
        builder.phase_begin(PhaseKind::Mutate, mutate_start);
        builder.phase_end(PhaseKind::Mutate, mutate_end);
        builder.phase_begin(PhaseKind::Tick, mutate_end);
        builder.phase_end(PhaseKind::Tick, tick_end);
        builder.record_report(&report);
        let summary = builder.finish();
        pretty.on_tick_summary(&summary);
        recorder.on_tick_summary(&summary);

        // 5. Coalescing HUD.
        let coalesce = tracker.observe(CoalesceSample::from_report(profile, &report));
        if tick_index % 12 == 11 {
            println!(
                "[hud] grade={} ratio={:.1} deferrals={:.0}/1000 |{}|",
                coalesce.grade.as_str(),
                coalesce.ratio,
                coalesce.deferral_rate_per_1000,
                tracker.sparkline_ascii(0.0, 16.0)
            );
        }

        // Advance simulated time.
        now_ns += TICK_INTERVAL_NS;
    }

    println!("driver passes: {}", driver.passes);

    // -- export Chrome trace -----------------------------------------------
    let path = "trace.json";
    let file = File::create(path).expect("failed to create trace.json");
    let mut writer = BufWriter::new(file);
    updraft_debug::chrome::export(recorder.as_bytes(), &mut writer)
        .expect("failed to write Chrome trace");

    println!("Wrote {path} ({TICK_COUNT} ticks)");
}

fn emit_session_begin(
    pretty: &mut PrettyPrintSink,
    recorder: &mut RecorderSink,
    node_index: u32,
    depth: u32,
    at: Stamp,
) {
    let e = SessionBeginEvent {
        node_index,
        depth,
        at,
    };
    pretty.on_session_begin(&e);
    recorder.on_session_begin(&e);
}

fn emit_session_end(
    pretty: &mut PrettyPrintSink,
    recorder: &mut RecorderSink,
    node_index: u32,
    depth: u32,
    propagated: bool,
    at: Stamp,
) {
    let e = SessionEndEvent {
        node_index,
        depth,
        propagated,
        at,
    };
    pretty.on_session_end(&e);
    recorder.on_session_end(&e);
}
