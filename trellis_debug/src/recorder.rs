// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Binary recordings of display updates.
//!
//! A recording starts with the magic `TRLS` and a format version byte. The
//! rest is a stream of entries: an opcode byte followed by LEB128 varints.
//!
//! Entries are grouped by frame. A `FRAME` entry carries the frame index
//! once and every following entry belongs to that frame. Phase boundaries
//! pack the phase, begin or end, and the clock direction into the opcode,
//! and store the distance to the previous phase timestamp. Failures carry
//! the block slot, the renderer and the backend error text.
//!
//! Rich drawable events
//! ([`on_drawable_changes`](TraceSink::on_drawable_changes)) are reduced to
//! per-kind counts.

use trellis_core::renderer::Renderer;
use trellis_core::stitch::StitchPolicy;
use trellis_core::trace::{
    BlockFailureEvent, DrawableChange, DrawableEvent, FrameSummary, PhaseBeginEvent,
    PhaseEndEvent, PhaseKind, StitchEvent, SyncEvent, TraceSink,
};

const MAGIC: &[u8; 4] = b"TRLS";
const VERSION: u8 = 1;

const OP_FRAME: u8 = 0x01;
/// Phase opcodes span `0x10..=0x1f`: bit 0 marks an end, bits 1-2 hold the
/// phase and bit 3 a timestamp earlier than the previous one.
const OP_PHASE: u8 = 0x10;
const OP_PHASE_LAST: u8 = 0x1f;
const OP_SYNC: u8 = 0x20;
const OP_STITCH: u8 = 0x21;
const OP_BLOCK_FAILURE: u8 = 0x22;
const OP_FRAME_SUMMARY: u8 = 0x23;
const OP_DRAWABLE_COUNTS: u8 = 0x24;

const PHASE_END: u8 = 0b0001;
const PHASE_BACKWARDS: u8 = 0b1000;

const PHASES: [PhaseKind; 4] = [
    PhaseKind::Sync,
    PhaseKind::Resolve,
    PhaseKind::Stitch,
    PhaseKind::Paint,
];

fn phase_bits(phase: PhaseKind) -> u8 {
    match phase {
        PhaseKind::Sync => 0,
        PhaseKind::Resolve => 1,
        PhaseKind::Stitch => 2,
        PhaseKind::Paint => 3,
    }
}

/// Append-only entry encoder.
#[derive(Debug)]
struct Encoder(Vec<u8>);

impl Encoder {
    fn byte(&mut self, b: u8) {
        self.0.push(b);
    }

    fn varint(&mut self, mut v: u64) {
        loop {
            #[expect(clippy::cast_possible_truncation, reason = "masked to seven bits")]
            let low = (v & 0x7f) as u8;
            v >>= 7;
            if v == 0 {
                self.0.push(low);
                return;
            }
            self.0.push(low | 0x80);
        }
    }

    fn count(&mut self, v: usize) {
        self.varint(u64::try_from(v).unwrap_or(u64::MAX));
    }

    fn text(&mut self, s: &str) {
        self.count(s.len());
        self.0.extend_from_slice(s.as_bytes());
    }
}

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug)]
pub struct RecorderSink {
    out: Encoder,
    frame: Option<u64>,
    last_timestamp: u64,
}

impl Default for RecorderSink {
    fn default() -> Self {
        Self::new()
    }
}

impl RecorderSink {
    /// Creates a recorder holding only the recording header.
    #[must_use]
    pub fn new() -> Self {
        let mut header = Vec::with_capacity(256);
        header.extend_from_slice(MAGIC);
        header.push(VERSION);
        Self {
            out: Encoder(header),
            frame: None,
            last_timestamp: 0,
        }
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.out.0
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.out.0
    }

    /// Returns the encoder, opening `frame_index` first if another frame
    /// is current.
    fn frame(&mut self, frame_index: u64) -> &mut Encoder {
        if self.frame != Some(frame_index) {
            self.frame = Some(frame_index);
            self.out.byte(OP_FRAME);
            self.out.varint(frame_index);
        }
        &mut self.out
    }

    fn phase(&mut self, frame_index: u64, phase: PhaseKind, timestamp: u64, end: bool) {
        let mut op = OP_PHASE | (phase_bits(phase) << 1);
        if end {
            op |= PHASE_END;
        }
        if timestamp < self.last_timestamp {
            op |= PHASE_BACKWARDS;
        }
        let delta = timestamp.abs_diff(self.last_timestamp);
        self.last_timestamp = timestamp;
        let out = self.frame(frame_index);
        out.byte(op);
        out.varint(delta);
    }
}

impl TraceSink for RecorderSink {
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.phase(e.frame_index, e.phase, e.timestamp, false);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.phase(e.frame_index, e.phase, e.timestamp, true);
    }

    fn on_sync(&mut self, e: &SyncEvent) {
        let out = self.frame(e.frame_index);
        out.byte(OP_SYNC);
        for n in [
            e.instances_created,
            e.instances_disposed,
            e.drawables_created,
            e.drawables_disposed,
        ] {
            out.count(n);
        }
    }

    fn on_stitch(&mut self, e: &StitchEvent) {
        let out = self.frame(e.frame_index);
        out.byte(OP_STITCH);
        out.byte(match e.policy {
            StitchPolicy::Greedy => 0,
            StitchPolicy::Rebuild => 1,
        });
        for n in [
            e.intervals_in,
            e.spans,
            e.blocks_created,
            e.blocks_disposed,
            e.drawables_moved,
        ] {
            out.count(n);
        }
    }

    fn on_block_failure(&mut self, e: &BlockFailureEvent) {
        let message = e.error.to_string();
        let out = self.frame(e.frame_index);
        out.byte(OP_BLOCK_FAILURE);
        out.varint(u64::from(e.block.index()));
        out.byte(u8::try_from(e.renderer.index()).unwrap_or(u8::MAX));
        out.text(&message);
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        let out = self.frame(s.frame_index);
        out.byte(OP_FRAME_SUMMARY);
        for ticks in [s.sync_ticks, s.resolve_ticks, s.stitch_ticks, s.paint_ticks] {
            out.varint(ticks);
        }
        for n in [s.instances, s.drawables, s.blocks, s.painted, s.failed_blocks] {
            out.count(n);
        }
    }

    fn on_drawable_changes(&mut self, frame_index: u64, changes: &[DrawableChange]) {
        let mut counts = [0_usize; 3];
        for c in changes {
            counts[match c.event {
                DrawableEvent::Created => 0,
                DrawableEvent::Disposed => 1,
                DrawableEvent::Painted => 2,
            }] += 1;
        }
        let out = self.frame(frame_index);
        out.byte(OP_DRAWABLE_COUNTS);
        for n in counts {
            out.count(n);
        }
    }
}

/// A decoded event from a binary recording.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordedEvent {
    /// A [`PhaseBeginEvent`].
    PhaseBegin {
        /// Frame counter.
        frame_index: u64,
        /// Phase.
        phase: PhaseKind,
        /// Clock ticks.
        timestamp: u64,
    },
    /// A [`PhaseEndEvent`].
    PhaseEnd {
        /// Frame counter.
        frame_index: u64,
        /// Phase.
        phase: PhaseKind,
        /// Clock ticks.
        timestamp: u64,
    },
    /// A [`SyncEvent`].
    Sync {
        /// Frame counter.
        frame_index: u64,
        /// Instances created.
        instances_created: u32,
        /// Instances disposed.
        instances_disposed: u32,
        /// Drawables created.
        drawables_created: u32,
        /// Drawables disposed.
        drawables_disposed: u32,
    },
    /// A [`StitchEvent`].
    Stitch {
        /// Frame counter.
        frame_index: u64,
        /// Policy used.
        policy: StitchPolicy,
        /// Intervals handed in.
        intervals_in: u32,
        /// Spans after normalisation.
        spans: u32,
        /// Blocks created.
        blocks_created: u32,
        /// Blocks disposed.
        blocks_disposed: u32,
        /// Drawables moved.
        drawables_moved: u32,
    },
    /// A [`BlockFailureEvent`].
    BlockFailure {
        /// Frame counter.
        frame_index: u64,
        /// Slot index of the failing block.
        block_index: u32,
        /// Its renderer.
        renderer: Renderer,
        /// Display text of the backend error.
        message: String,
    },
    /// A [`FrameSummary`].
    FrameSummary(FrameSummaryRecord),
    /// Drawable event counts for a frame.
    DrawableCounts {
        /// Frame counter.
        frame_index: u64,
        /// Drawables created.
        created: u32,
        /// Drawables disposed.
        disposed: u32,
        /// Drawables painted.
        painted: u32,
    },
}

/// A decoded [`FrameSummary`], with counts narrowed to `u32`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameSummaryRecord {
    /// Frame counter.
    pub frame_index: u64,
    /// Sync phase duration in ticks.
    pub sync_ticks: u64,
    /// Resolve phase duration in ticks.
    pub resolve_ticks: u64,
    /// Stitch phase duration in ticks.
    pub stitch_ticks: u64,
    /// Paint phase duration in ticks.
    pub paint_ticks: u64,
    /// Live instances.
    pub instances: u32,
    /// Live drawables.
    pub drawables: u32,
    /// Live blocks.
    pub blocks: u32,
    /// Drawables painted.
    pub painted: u32,
    /// Blocks whose update failed.
    pub failed_blocks: u32,
}

/// Decodes bytes produced by [`RecorderSink`].
///
/// Yields nothing unless the bytes start with a recording header. Decoding
/// stops at the first unknown opcode or truncated entry.
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    let rest: &[u8] = match bytes.strip_prefix(MAGIC.as_slice()) {
        Some([VERSION, rest @ ..]) => rest,
        _ => &[],
    };
    DecodeIter {
        rest,
        frame: 0,
        last_timestamp: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    rest: &'a [u8],
    frame: u64,
    last_timestamp: u64,
}

impl DecodeIter<'_> {
    fn byte(&mut self) -> Option<u8> {
        let (&b, rest) = self.rest.split_first()?;
        self.rest = rest;
        Some(b)
    }

    fn varint(&mut self) -> Option<u64> {
        let mut v = 0_u64;
        for shift in (0..64).step_by(7) {
            let b = self.byte()?;
            v |= u64::from(b & 0x7f) << shift;
            if b & 0x80 == 0 {
                return Some(v);
            }
        }
        None
    }

    fn count(&mut self) -> Option<u32> {
        self.varint().map(|v| u32::try_from(v).unwrap_or(u32::MAX))
    }

    fn text(&mut self) -> Option<String> {
        let len = usize::try_from(self.varint()?).ok()?;
        if self.rest.len() < len {
            return None;
        }
        let (s, rest) = self.rest.split_at(len);
        self.rest = rest;
        Some(String::from_utf8_lossy(s).into_owned())
    }

    fn phase(&mut self, bits: u8) -> Option<RecordedEvent> {
        let delta = self.varint()?;
        let timestamp = if bits & PHASE_BACKWARDS != 0 {
            self.last_timestamp.wrapping_sub(delta)
        } else {
            self.last_timestamp.wrapping_add(delta)
        };
        self.last_timestamp = timestamp;
        let frame_index = self.frame;
        let phase = PHASES[usize::from((bits >> 1) & 0b11)];
        Some(if bits & PHASE_END != 0 {
            RecordedEvent::PhaseEnd {
                frame_index,
                phase,
                timestamp,
            }
        } else {
            RecordedEvent::PhaseBegin {
                frame_index,
                phase,
                timestamp,
            }
        })
    }

    fn entry(&mut self, op: u8) -> Option<RecordedEvent> {
        let frame_index = self.frame;
        Some(match op {
            OP_PHASE..=OP_PHASE_LAST => return self.phase(op - OP_PHASE),
            OP_SYNC => RecordedEvent::Sync {
                frame_index,
                instances_created: self.count()?,
                instances_disposed: self.count()?,
                drawables_created: self.count()?,
                drawables_disposed: self.count()?,
            },
            OP_STITCH => RecordedEvent::Stitch {
                frame_index,
                policy: match self.byte()? {
                    0 => StitchPolicy::Greedy,
                    _ => StitchPolicy::Rebuild,
                },
                intervals_in: self.count()?,
                spans: self.count()?,
                blocks_created: self.count()?,
                blocks_disposed: self.count()?,
                drawables_moved: self.count()?,
            },
            OP_BLOCK_FAILURE => RecordedEvent::BlockFailure {
                frame_index,
                block_index: self.count()?,
                renderer: Renderer::from_index(self.byte()?)?,
                message: self.text()?,
            },
            OP_FRAME_SUMMARY => RecordedEvent::FrameSummary(FrameSummaryRecord {
                frame_index,
                sync_ticks: self.varint()?,
                resolve_ticks: self.varint()?,
                stitch_ticks: self.varint()?,
                paint_ticks: self.varint()?,
                instances: self.count()?,
                drawables: self.count()?,
                blocks: self.count()?,
                painted: self.count()?,
                failed_blocks: self.count()?,
            }),
            OP_DRAWABLE_COUNTS => RecordedEvent::DrawableCounts {
                frame_index,
                created: self.count()?,
                disposed: self.count()?,
                painted: self.count()?,
            },
            _ => return None,
        })
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let op = self.byte()?;
            if op != OP_FRAME {
                return self.entry(op);
            }
            self.frame = self.varint()?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::backend::RecordingBackend;
    use trellis_core::display::{Display, DisplayConfig};
    use trellis_core::node::{NodeContent, NodeTree, TextContent};
    use trellis_core::trace::Tracer;

    fn ticking_clock() -> u64 {
        use std::sync::atomic::{AtomicU64, Ordering};
        static NOW: AtomicU64 = AtomicU64::new(0);
        NOW.fetch_add(10, Ordering::Relaxed)
    }

    /// Records two frames of a two-text scene, the second one failing.
    fn record() -> Vec<u8> {
        let mut tree = NodeTree::new();
        let root = tree.create_node();
        for _ in 0..2 {
            let n = tree.create_node();
            tree.set_content(n, Some(NodeContent::Text(TextContent::default())));
            tree.add_child(root, n);
        }
        let config = DisplayConfig {
            clock: Some(ticking_clock),
            ..DisplayConfig::default()
        };
        let mut display = Display::new(&mut tree, root, config);
        let mut backend = RecordingBackend::new();
        let mut rec = RecorderSink::new();

        let changes = tree.evaluate();
        display.update_traced(&mut tree, &changes, &mut backend, &mut Tracer::new(&mut rec));

        let surface = backend.live_surfaces()[0];
        backend.fail_surface(surface);
        let first = tree.children(root).next().unwrap();
        tree.set_fill(first, None);
        let changes = tree.evaluate();
        display.update_traced(&mut tree, &changes, &mut backend, &mut Tracer::new(&mut rec));
        rec.into_bytes()
    }

    #[test]
    fn recorded_update_decodes_in_order() {
        let events: Vec<_> = decode(&record()).collect();
        let frame0: Vec<_> = events
            .iter()
            .filter(|e| match e {
                RecordedEvent::PhaseBegin { frame_index, .. }
                | RecordedEvent::PhaseEnd { frame_index, .. }
                | RecordedEvent::Sync { frame_index, .. }
                | RecordedEvent::Stitch { frame_index, .. }
                | RecordedEvent::BlockFailure { frame_index, .. }
                | RecordedEvent::DrawableCounts { frame_index, .. } => *frame_index == 0,
                RecordedEvent::FrameSummary(s) => s.frame_index == 0,
            })
            .collect();
        assert!(
            matches!(
                frame0[0],
                RecordedEvent::PhaseBegin {
                    phase: PhaseKind::Sync,
                    ..
                }
            ),
            "frame starts with the sync phase: {frame0:?}"
        );
        assert!(
            frame0.iter().any(|e| matches!(
                e,
                RecordedEvent::Sync {
                    drawables_created: 2,
                    ..
                }
            )),
            "two drawables created: {frame0:?}"
        );
        assert!(
            frame0.iter().any(|e| matches!(
                e,
                RecordedEvent::Stitch {
                    policy: StitchPolicy::Greedy,
                    blocks_created: 1,
                    ..
                }
            )),
            "one block: {frame0:?}"
        );
        let summary = frame0.iter().find_map(|e| match e {
            RecordedEvent::FrameSummary(s) => Some(*s),
            _ => None,
        });
        let summary = summary.expect("frame summary recorded");
        assert_eq!(summary.drawables, 2, "two live drawables");
        assert_eq!(summary.painted, 2, "both painted");
        assert!(summary.sync_ticks > 0, "clock ticks recorded");
    }

    #[test]
    fn block_failure_round_trips_message() {
        let events: Vec<_> = decode(&record()).collect();
        let failure = events.iter().find_map(|e| match e {
            RecordedEvent::BlockFailure {
                frame_index,
                renderer,
                message,
                ..
            } => Some((*frame_index, *renderer, message.clone())),
            _ => None,
        });
        let (frame_index, renderer, message) = failure.expect("failure recorded");
        assert_eq!(frame_index, 1, "second frame fails");
        assert_eq!(renderer, Renderer::Svg, "preferred renderer");
        assert!(message.contains("invalid surface"), "got: {message}");
    }

    #[test]
    fn drawable_counts_are_recorded() {
        let events: Vec<_> = decode(&record()).collect();
        assert!(
            events.contains(&RecordedEvent::DrawableCounts {
                frame_index: 0,
                created: 2,
                disposed: 0,
                painted: 2,
            }),
            "first frame counts: {events:?}"
        );
    }

    #[test]
    fn truncated_recording_stops_cleanly() {
        let bytes = record();
        let all = decode(&bytes).count();
        let cut = decode(&bytes[..bytes.len() - 3]).count();
        assert_eq!(cut, all - 1, "the torn tail record is dropped");
    }

    #[test]
    fn timestamps_survive_a_clock_going_backwards() {
        let mut rec = RecorderSink::new();
        for (frame_index, timestamp) in [(0, 1_000), (0, 400), (1, 70_000)] {
            rec.on_phase_begin(&PhaseBeginEvent {
                frame_index,
                phase: PhaseKind::Resolve,
                timestamp,
            });
        }
        let stamps: Vec<_> = decode(rec.as_bytes())
            .map(|e| match e {
                RecordedEvent::PhaseBegin {
                    frame_index,
                    timestamp,
                    ..
                } => (frame_index, timestamp),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(stamps, vec![(0, 1_000), (0, 400), (1, 70_000)]);
    }

    #[test]
    fn frame_index_is_written_once_per_frame() {
        let mut rec = RecorderSink::new();
        let header = rec.as_bytes().len();
        for phase in [PhaseKind::Sync, PhaseKind::Paint] {
            rec.on_phase_end(&PhaseEndEvent {
                frame_index: 300,
                phase,
                timestamp: 0,
            });
        }
        // One frame entry (opcode and a two-byte varint), then two
        // single-byte phase entries with a zero delta.
        assert_eq!(rec.as_bytes().len() - header, 3 + 2 * 2);
        let frames: Vec<_> = decode(rec.as_bytes())
            .map(|e| match e {
                RecordedEvent::PhaseEnd { frame_index, .. } => frame_index,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(frames, vec![300, 300]);
    }

    #[test]
    fn bytes_without_header_decode_to_nothing() {
        let mut bytes = record();
        assert!(decode(&bytes).count() > 0);
        bytes[0] = b'X';
        assert_eq!(decode(&bytes).count(), 0, "magic mismatch");
        let mut bytes = record();
        bytes[4] = VERSION + 1;
        assert_eq!(decode(&bytes).count(), 0, "unknown version");
    }

    #[test]
    fn empty_buffer_decodes_to_nothing() {
        let events: Vec<_> = decode(&[]).collect();
        assert!(events.is_empty(), "no events in an empty buffer");
    }
}
