// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Timestamps
//! are printed as raw clock ticks.

use std::io::Write;

use trellis_core::trace::{
    BlockFailureEvent, DrawableChange, DrawableEvent, FrameSummary, PhaseBeginEvent,
    PhaseEndEvent, PhaseKind, StitchEvent, SyncEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
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

    /// Consumes the sink and returns its destination.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn phase_name(phase: PhaseKind) -> &'static str {
    match phase {
        PhaseKind::Sync => "sync",
        PhaseKind::Resolve => "resolve",
        PhaseKind::Stitch => "stitch",
        PhaseKind::Paint => "paint",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:begin] frame={} {} at {}t",
            e.frame_index,
            phase_name(e.phase),
            e.timestamp,
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:end] frame={} {} at {}t",
            e.frame_index,
            phase_name(e.phase),
            e.timestamp,
        );
    }

    fn on_sync(&mut self, e: &SyncEvent) {
        let _ = writeln!(
            self.writer,
            "[sync] frame={} instances=+{}/-{} drawables=+{}/-{}",
            e.frame_index,
            e.instances_created,
            e.instances_disposed,
            e.drawables_created,
            e.drawables_disposed,
        );
    }

    fn on_stitch(&mut self, e: &StitchEvent) {
        let _ = writeln!(
            self.writer,
            "[stitch] frame={} policy={:?} intervals={} spans={} blocks=+{}/-{} moved={}",
            e.frame_index,
            e.policy,
            e.intervals_in,
            e.spans,
            e.blocks_created,
            e.blocks_disposed,
            e.drawables_moved,
        );
    }

    fn on_block_failure(&mut self, e: &BlockFailureEvent) {
        let _ = writeln!(
            self.writer,
            "[block:FAILED] frame={} {:?} renderer={:?}: {}",
            e.frame_index, e.block, e.renderer, e.error,
        );
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        let _ = writeln!(
            self.writer,
            "[summary] frame={} sync={}t resolve={}t stitch={}t paint={}t \
             instances={} drawables={} blocks={} painted={} failed={}",
            s.frame_index,
            s.sync_ticks,
            s.resolve_ticks,
            s.stitch_ticks,
            s.paint_ticks,
            s.instances,
            s.drawables,
            s.blocks,
            s.painted,
            s.failed_blocks,
        );
    }

    fn on_drawable_changes(&mut self, frame_index: u64, changes: &[DrawableChange]) {
        let count = |event: DrawableEvent| changes.iter().filter(|c| c.event == event).count();
        let _ = writeln!(
            self.writer,
            "[drawables] frame={frame_index} created={} disposed={} painted={}",
            count(DrawableEvent::Created),
            count(DrawableEvent::Disposed),
            count(DrawableEvent::Painted),
        );
    }
}
