// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
///
/// Phase timestamps are clock ticks; `ticks_per_us` converts them to
/// microseconds. Events without a timestamp of their own are placed at the
/// most recent phase boundary.
pub fn export(bytes: &[u8], ticks_per_us: f64, writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    let to_us = |ticks: u64| {
        #[expect(
            clippy::cast_precision_loss,
            reason = "trace timestamps tolerate rounding"
        )]
        let ticks = ticks as f64;
        if ticks_per_us > 0.0 {
            ticks / ticks_per_us
        } else {
            ticks
        }
    };
    let mut last_ts = 0.0;

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::PhaseBegin {
                frame_index,
                phase,
                timestamp,
            } => {
                last_ts = to_us(timestamp);
                events.push(json!({
                    "ph": "B",
                    "name": format!("{phase:?}"),
                    "cat": "Frame",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "frame_index": frame_index,
                    }
                }));
            }
            RecordedEvent::PhaseEnd {
                frame_index,
                phase,
                timestamp,
            } => {
                last_ts = to_us(timestamp);
                events.push(json!({
                    "ph": "E",
                    "name": format!("{phase:?}"),
                    "cat": "Frame",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "frame_index": frame_index,
                    }
                }));
            }
            RecordedEvent::Sync {
                frame_index,
                instances_created,
                instances_disposed,
                drawables_created,
                drawables_disposed,
            } => {
                events.push(json!({
                    "ph": "i",
                    "name": "Sync",
                    "cat": "Mirror",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "frame_index": frame_index,
                        "instances_created": instances_created,
                        "instances_disposed": instances_disposed,
                        "drawables_created": drawables_created,
                        "drawables_disposed": drawables_disposed,
                    }
                }));
            }
            RecordedEvent::Stitch {
                frame_index,
                policy,
                intervals_in,
                spans,
                blocks_created,
                blocks_disposed,
                drawables_moved,
            } => {
                events.push(json!({
                    "ph": "i",
                    "name": "Stitch",
                    "cat": "Blocks",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "frame_index": frame_index,
                        "policy": format!("{policy:?}"),
                        "intervals_in": intervals_in,
                        "spans": spans,
                        "blocks_created": blocks_created,
                        "blocks_disposed": blocks_disposed,
                        "drawables_moved": drawables_moved,
                    }
                }));
            }
            RecordedEvent::BlockFailure {
                frame_index,
                block_index,
                renderer,
                message,
            } => {
                events.push(json!({
                    "ph": "i",
                    "name": "BlockFailure",
                    "cat": "Blocks",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "frame_index": frame_index,
                        "block": block_index,
                        "renderer": format!("{renderer:?}"),
                        "error": message,
                    }
                }));
            }
            RecordedEvent::FrameSummary(s) => {
                events.push(json!({
                    "ph": "i",
                    "name": "FrameSummary",
                    "cat": "Summary",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "frame_index": s.frame_index,
                        "sync_us": to_us(s.sync_ticks),
                        "resolve_us": to_us(s.resolve_ticks),
                        "stitch_us": to_us(s.stitch_ticks),
                        "paint_us": to_us(s.paint_ticks),
                        "instances": s.instances,
                        "drawables": s.drawables,
                        "blocks": s.blocks,
                        "painted": s.painted,
                        "failed_blocks": s.failed_blocks,
                    }
                }));
            }
            RecordedEvent::DrawableCounts {
                frame_index,
                created,
                disposed,
                painted,
            } => {
                events.push(json!({
                    "ph": "i",
                    "name": "DrawableChanges",
                    "cat": "Rich",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "frame_index": frame_index,
                        "created": created,
                        "disposed": disposed,
                        "painted": painted,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}
