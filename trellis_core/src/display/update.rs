// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-frame update pipeline.

use alloc::vec::Vec;

use super::{Display, FrameReport};
use crate::backend::SurfaceBackend;
use crate::block::BlockId;
use crate::drawable::DirtyAttrs;
use crate::node::{NodeTree, TreeChanges};
use crate::stitch::stitch;
use crate::trace::{
    BlockFailureEvent, FrameSummaryBuilder, PhaseBeginEvent, PhaseEndEvent, PhaseKind,
    StitchEvent, SyncEvent, Tracer,
};

impl Display {
    /// Brings the backend up to date with `changes`.
    ///
    /// `changes` must come from the [`NodeTree::evaluate`] call that
    /// immediately precedes this update. The first update builds the whole
    /// display and ignores `changes`.
    ///
    /// Backend failures never abort the frame: a failing block keeps its
    /// dirty state, is listed in [`FrameReport::failed_blocks`] and is
    /// retried on the next update.
    ///
    /// # Panics
    ///
    /// Panics if the display's root node was destroyed, or if audits are
    /// enabled and one fails.
    pub fn update(
        &mut self,
        tree: &mut NodeTree,
        changes: &TreeChanges,
        backend: &mut dyn SurfaceBackend,
    ) -> FrameReport {
        self.update_traced(tree, changes, backend, &mut Tracer::none())
    }

    /// Like [`update`](Self::update), emitting trace events to `tracer`.
    ///
    /// # Panics
    ///
    /// See [`update`](Self::update).
    pub fn update_traced(
        &mut self,
        tree: &mut NodeTree,
        changes: &TreeChanges,
        backend: &mut dyn SurfaceBackend,
        tracer: &mut Tracer<'_>,
    ) -> FrameReport {
        let frame_index = self.frame_index;
        let mut phases = Phases {
            frame_index,
            clock: self.config.clock,
            summary: FrameSummaryBuilder::new(frame_index),
        };
        let mut report = FrameReport {
            frame_index,
            ..FrameReport::default()
        };

        // 1. Mirror sync and channel routing.
        phases.begin(tracer, PhaseKind::Sync);
        self.painter.drawables_created = 0;
        self.painter.drawables_disposed = 0;
        let fresh_from = self.mirror.next_serial();
        let stats = self.mirror.sync(tree, changes, &mut self.painter);
        report.instances_created = stats.created;
        report.instances_disposed = stats.disposed;

        let painter = &mut self.painter;
        let mirror = &self.mirror;
        painter.replace_drawables(tree, mirror, &changes.kinds, fresh_from);
        for (nodes, attrs) in [
            (&changes.shapes, DirtyAttrs::SHAPE),
            (&changes.fills, DirtyAttrs::FILL),
            (&changes.strokes, DirtyAttrs::STROKE),
            (&changes.texts, DirtyAttrs::TEXT),
            (&changes.fonts, DirtyAttrs::FONT),
            (&changes.images, DirtyAttrs::IMAGE),
        ] {
            if !nodes.is_empty() {
                painter.route_paint(tree, mirror, nodes, attrs);
            }
        }
        report.drawables_created = painter.drawables_created;
        report.drawables_disposed = painter.drawables_disposed;
        tracer.sync(&SyncEvent {
            frame_index,
            instances_created: report.instances_created,
            instances_disposed: report.instances_disposed,
            drawables_created: report.drawables_created,
            drawables_disposed: report.drawables_disposed,
        });
        phases.end(tracer, PhaseKind::Sync);

        // 2. Transform, opacity and visibility resolution.
        phases.begin(tracer, PhaseKind::Resolve);
        painter.resolve_nodes(tree, mirror, &changes.transforms);
        painter.resolve_nodes(tree, mirror, &changes.opacities);
        phases.end(tracer, PhaseKind::Resolve);

        // 3. Stitching.
        phases.begin(tracer, PhaseKind::Stitch);
        let pending = core::mem::take(&mut painter.pending);
        let policy = self.config.stitch_policy;
        report.stitch = stitch(
            policy,
            &pending,
            &mut painter.pool,
            &mut painter.blocks,
            self.config.audit,
        );
        tracer.stitch(&StitchEvent {
            frame_index,
            policy,
            intervals_in: report.stitch.intervals_in,
            spans: report.stitch.spans,
            blocks_created: report.stitch.blocks_created,
            blocks_disposed: report.stitch.blocks_disposed,
            drawables_moved: report.stitch.drawables_moved,
        });
        phases.end(tracer, PhaseKind::Stitch);

        // 4. Block queue, surface order and releases.
        phases.begin(tracer, PhaseKind::Paint);
        let mut retry: Vec<BlockId> = Vec::new();
        let mut i = 0;
        while let Some(b) = painter.blocks.queued(i) {
            i += 1;
            if !painter.blocks.is_live(b) {
                continue;
            }
            painter.blocks.dequeue(b);
            match painter.update_block(tree, mirror, backend, b) {
                Ok(painted) => {
                    report.blocks_updated += 1;
                    report.painted += painted;
                }
                Err(error) => {
                    tracer.block_failure(&BlockFailureEvent {
                        frame_index,
                        block: b,
                        renderer: painter.blocks.get(b).renderer(),
                        error: error.clone(),
                    });
                    retry.push(b);
                    report.failed_blocks.push((b, error));
                }
            }
        }
        painter.blocks.finish_queue(&retry);

        if painter.blocks.take_order_dirty() {
            let order = painter.blocks.order();
            let surfaces: Vec<_> = order
                .iter()
                .filter_map(|&b| painter.blocks.get(b).surface())
                .collect();
            let complete = surfaces.len() == order.len();
            let ordered = backend.order_surfaces(&surfaces);
            if let Err(error) = ordered {
                report.backend_errors.push(error);
                painter.blocks.mark_order_dirty();
            } else if !complete {
                painter.blocks.mark_order_dirty();
            }
        }

        for element in painter.pool.take_released() {
            if let Err(error) = backend.release_element(element) {
                report.backend_errors.push(error);
            }
        }
        for surface in painter.blocks.take_released() {
            if let Err(error) = backend.destroy_surface(surface) {
                report.backend_errors.push(error);
            }
        }
        phases.end(tracer, PhaseKind::Paint);

        if self.config.audit {
            self.audit(tree);
        }

        if tracer.is_active() {
            let mut s = phases.summary.finish();
            s.instances = self.mirror.len();
            s.drawables = self.painter.pool.live();
            s.blocks = self.painter.blocks.live();
            s.painted = report.painted;
            s.failed_blocks = report.failed_blocks.len();
            tracer.frame_summary(&s);
        }
        #[cfg(feature = "trace-rich")]
        {
            let log = core::mem::take(&mut self.painter.log);
            if !log.is_empty() {
                tracer.drawable_changes(frame_index, &log);
            }
        }

        self.frame_index += 1;
        report
    }
}

/// Phase timestamps of one update.
struct Phases {
    frame_index: u64,
    clock: Option<fn() -> u64>,
    summary: FrameSummaryBuilder,
}

impl Phases {
    fn now(&self) -> u64 {
        self.clock.map_or(0, |c| c())
    }

    fn begin(&mut self, tracer: &mut Tracer<'_>, phase: PhaseKind) {
        let timestamp = self.now();
        self.summary.phase_begin(phase, timestamp);
        tracer.phase_begin(&PhaseBeginEvent {
            frame_index: self.frame_index,
            phase,
            timestamp,
        });
    }

    fn end(&mut self, tracer: &mut Tracer<'_>, phase: PhaseKind) {
        let timestamp = self.now();
        self.summary.phase_end(phase, timestamp);
        tracer.phase_end(&PhaseEndEvent {
            frame_index: self.frame_index,
            phase,
            timestamp,
        });
    }
}
