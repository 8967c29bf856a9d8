// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for display updates.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that
//! [`Display::update_traced`](crate::display::Display::update_traced) calls
//! at each stage. All method bodies default to no-ops, so implementing only
//! the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! [`FrameSummaryBuilder`] collects phase timestamps during an update and
//! produces a [`FrameSummary`] at the end.
//!
//! Timestamps are opaque `u64` ticks from
//! [`DisplayConfig::clock`](crate::display::DisplayConfig::clock), or `0`
//! when no clock is configured.
//!
//! # Crate features
//!
//! - `trace` enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`) gates [`DrawableChange`] events and the
//!   corresponding `TraceSink` method.

use crate::backend::BackendError;
use crate::block::BlockId;
#[cfg(feature = "trace-rich")]
use crate::drawable::DrawableId;
#[cfg(feature = "trace-rich")]
use crate::instance::InstanceId;
use crate::renderer::Renderer;
use crate::stitch::StitchPolicy;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which phase of a display update is being measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Mirror sync and channel routing.
    Sync,
    /// Transform, opacity and visibility resolution.
    Resolve,
    /// Block reconciliation.
    Stitch,
    /// Backend block updates and releases.
    Paint,
}

/// What happened to a drawable.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DrawableEvent {
    /// Allocated for an instance.
    Created,
    /// Returned to the pool.
    Disposed,
    /// Written to the backend.
    Painted,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Marks the beginning of an update phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is starting.
    pub phase: PhaseKind,
    /// Clock ticks at the start of the phase.
    pub timestamp: u64,
}

/// Marks the end of an update phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is ending.
    pub phase: PhaseKind,
    /// Clock ticks at the end of the phase.
    pub timestamp: u64,
}

/// Emitted after the render mirror was synced.
#[derive(Clone, Copy, Debug)]
pub struct SyncEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Instances created.
    pub instances_created: usize,
    /// Instances disposed.
    pub instances_disposed: usize,
    /// Drawables allocated.
    pub drawables_created: usize,
    /// Drawables disposed.
    pub drawables_disposed: usize,
}

/// Emitted after stitching.
#[derive(Clone, Copy, Debug)]
pub struct StitchEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Policy used.
    pub policy: StitchPolicy,
    /// Pending intervals handed to the stitcher.
    pub intervals_in: usize,
    /// Disjoint spans after normalisation.
    pub spans: usize,
    /// Blocks created.
    pub blocks_created: usize,
    /// Blocks disposed.
    pub blocks_disposed: usize,
    /// Drawables that changed block.
    pub drawables_moved: usize,
}

/// Emitted when a block's backend update fails.
#[derive(Clone, Debug)]
pub struct BlockFailureEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// The failing block.
    pub block: BlockId,
    /// Its renderer.
    pub renderer: Renderer,
    /// The backend error.
    pub error: BackendError,
}

/// Per-update summary produced by [`FrameSummaryBuilder`].
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameSummary {
    /// Frame counter.
    pub frame_index: u64,
    /// Sync phase duration in ticks (0 if not measured).
    pub sync_ticks: u64,
    /// Resolve phase duration in ticks (0 if not measured).
    pub resolve_ticks: u64,
    /// Stitch phase duration in ticks (0 if not measured).
    pub stitch_ticks: u64,
    /// Paint phase duration in ticks (0 if not measured).
    pub paint_ticks: u64,
    /// Live instances after the update, including the root.
    pub instances: usize,
    /// Live drawables after the update.
    pub drawables: usize,
    /// Live blocks after the update.
    pub blocks: usize,
    /// Drawables written to the backend.
    pub painted: usize,
    /// Blocks whose update failed.
    pub failed_blocks: usize,
}

/// A per-update drawable record.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct DrawableChange {
    /// The drawable.
    pub drawable: DrawableId,
    /// Its instance at the time of the event.
    pub instance: Option<InstanceId>,
    /// Its renderer.
    pub renderer: Renderer,
    /// What happened.
    pub event: DrawableEvent,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from display updates.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called at the beginning of an update phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of an update phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called after the render mirror was synced.
    fn on_sync(&mut self, e: &SyncEvent) {
        _ = e;
    }

    /// Called after stitching.
    fn on_stitch(&mut self, e: &StitchEvent) {
        _ = e;
    }

    /// Called when a block's backend update fails.
    fn on_block_failure(&mut self, e: &BlockFailureEvent) {
        _ = e;
    }

    /// Called with a per-update summary.
    fn on_frame_summary(&mut self, s: &FrameSummary) {
        _ = s;
    }

    /// Called with per-update drawable changes (requires `trace-rich`).
    #[cfg(feature = "trace-rich")]
    fn on_drawable_changes(&mut self, frame_index: u64, changes: &[DrawableChange]) {
        _ = (frame_index, changes);
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
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
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

    /// Returns whether events reach a sink.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        #[cfg(feature = "trace")]
        {
            self.sink.is_some()
        }
        #[cfg(not(feature = "trace"))]
        {
            false
        }
    }

    /// Emits a [`PhaseBeginEvent`].
    #[inline]
    pub fn phase_begin(&mut self, e: &PhaseBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseEndEvent`].
    #[inline]
    pub fn phase_end(&mut self, e: &PhaseEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`SyncEvent`].
    #[inline]
    pub fn sync(&mut self, e: &SyncEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_sync(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`StitchEvent`].
    #[inline]
    pub fn stitch(&mut self, e: &StitchEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_stitch(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`BlockFailureEvent`].
    #[inline]
    pub fn block_failure(&mut self, e: &BlockFailureEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_block_failure(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FrameSummary`].
    #[inline]
    pub fn frame_summary(&mut self, s: &FrameSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_frame_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }

    /// Emits drawable changes (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn drawable_changes(&mut self, frame_index: u64, changes: &[DrawableChange]) {
        if let Some(s) = &mut self.sink {
            s.on_drawable_changes(frame_index, changes);
        }
    }
}

// ---------------------------------------------------------------------------
// FrameSummaryBuilder
// ---------------------------------------------------------------------------

/// Collects phase timestamps during an update and produces a
/// [`FrameSummary`].
#[derive(Debug)]
pub struct FrameSummaryBuilder {
    frame_index: u64,
    phase_starts: [Option<u64>; 4],
    phase_ends: [Option<u64>; 4],
}

impl FrameSummaryBuilder {
    /// Starts building a summary for `frame_index`.
    #[must_use]
    pub fn new(frame_index: u64) -> Self {
        Self {
            frame_index,
            phase_starts: [None; 4],
            phase_ends: [None; 4],
        }
    }

    /// Records the start of a phase.
    pub fn phase_begin(&mut self, phase: PhaseKind, t: u64) {
        self.phase_starts[phase_index(phase)] = Some(t);
    }

    /// Records the end of a phase.
    pub fn phase_end(&mut self, phase: PhaseKind, t: u64) {
        self.phase_ends[phase_index(phase)] = Some(t);
    }

    /// Consumes the builder; counts are filled in by the caller.
    #[must_use]
    pub fn finish(self) -> FrameSummary {
        FrameSummary {
            frame_index: self.frame_index,
            sync_ticks: self.phase_duration(PhaseKind::Sync),
            resolve_ticks: self.phase_duration(PhaseKind::Resolve),
            stitch_ticks: self.phase_duration(PhaseKind::Stitch),
            paint_ticks: self.phase_duration(PhaseKind::Paint),
            ..FrameSummary::default()
        }
    }

    fn phase_duration(&self, phase: PhaseKind) -> u64 {
        let idx = phase_index(phase);
        match (self.phase_starts[idx], self.phase_ends[idx]) {
            (Some(start), Some(end)) => end.saturating_sub(start),
            _ => 0,
        }
    }
}

/// Maps a [`PhaseKind`] to an array index.
const fn phase_index(phase: PhaseKind) -> usize {
    match phase {
        PhaseKind::Sync => 0,
        PhaseKind::Resolve => 1,
        PhaseKind::Stitch => 2,
        PhaseKind::Paint => 3,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_stitch() -> StitchEvent {
        StitchEvent {
            frame_index: 3,
            policy: StitchPolicy::Greedy,
            intervals_in: 4,
            spans: 2,
            blocks_created: 1,
            blocks_disposed: 0,
            drawables_moved: 5,
        }
    }

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_stitch(&sample_stitch());
        sink.on_frame_summary(&FrameSummary::default());
        sink.on_block_failure(&BlockFailureEvent {
            frame_index: 0,
            block: BlockId {
                idx: 0,
                generation: 0,
            },
            renderer: Renderer::Canvas,
            error: BackendError::Unsupported(Renderer::Canvas),
        });
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        assert!(!tracer.is_active(), "a tracer without sink is inactive");
        tracer.stitch(&sample_stitch());
        tracer.phase_begin(&PhaseBeginEvent {
            frame_index: 0,
            phase: PhaseKind::Sync,
            timestamp: 0,
        });
    }

    #[test]
    fn summary_builder_computes_durations() {
        let mut builder = FrameSummaryBuilder::new(42);
        builder.phase_begin(PhaseKind::Sync, 1_000);
        builder.phase_end(PhaseKind::Sync, 1_100);
        builder.phase_begin(PhaseKind::Resolve, 1_100);
        builder.phase_end(PhaseKind::Resolve, 1_150);
        builder.phase_begin(PhaseKind::Stitch, 1_150);
        builder.phase_end(PhaseKind::Stitch, 1_400);
        builder.phase_begin(PhaseKind::Paint, 1_400);
        builder.phase_end(PhaseKind::Paint, 2_900);

        let summary = builder.finish();
        assert_eq!(summary.sync_ticks, 100);
        assert_eq!(summary.resolve_ticks, 50);
        assert_eq!(summary.stitch_ticks, 250);
        assert_eq!(summary.paint_ticks, 1_500);
        assert_eq!(summary.frame_index, 42);
    }

    #[test]
    fn summary_builder_missing_phases_are_zero() {
        let summary = FrameSummaryBuilder::new(0).finish();
        assert_eq!(summary.sync_ticks, 0);
        assert_eq!(summary.resolve_ticks, 0);
        assert_eq!(summary.stitch_ticks, 0);
        assert_eq!(summary.paint_ticks, 0);
    }

    #[test]
    fn summary_builder_tolerates_clock_going_backwards() {
        let mut builder = FrameSummaryBuilder::new(1);
        builder.phase_begin(PhaseKind::Paint, 500);
        builder.phase_end(PhaseKind::Paint, 400);
        assert_eq!(builder.finish().paint_ticks, 0);
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::vec::Vec;

        struct RecordingSink {
            stitches: Vec<u64>,
        }
        impl TraceSink for RecordingSink {
            fn on_stitch(&mut self, e: &StitchEvent) {
                self.stitches.push(e.frame_index);
            }
        }

        let mut sink = RecordingSink {
            stitches: Vec::new(),
        };
        let mut tracer = Tracer::new(&mut sink);
        tracer.stitch(&sample_stitch());
        drop(tracer);
        assert_eq!(sink.stitches, &[3]);
    }
}
