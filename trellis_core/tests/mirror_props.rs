// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property tests: random edit sequences against the render display and the
//! accessible mirror.
//!
//! After every frame:
//!
//! 1. The render mirror, drawables and blocks pass their audits (enabled in
//!    the display config, so a violation panics inside `update`).
//! 2. The accessible mirror passes its audit.
//! 3. The paint order equals that of a display built from scratch.
//! 4. A second update without edits writes nothing to the backend.

use kurbo::{Affine, Rect, Shape};
use peniko::Brush;
use proptest::prelude::*;
use trellis_core::a11y::AccessibleMirror;
use trellis_core::backend::RecordingBackend;
use trellis_core::display::{Display, DisplayConfig};
use trellis_core::node::{
    AccessibleContent, NodeContent, NodeFlags, NodeId, NodeTree, ShapeContent, TextContent,
};
use trellis_core::renderer::{Renderer, Renderers};
use trellis_core::stitch::StitchPolicy;

const NODES: usize = 7;

// ── Helpers ─────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
enum Edit {
    Link { parent: usize, child: usize, index: usize },
    Unlink { parent: usize, child: usize },
    Content { node: usize, kind: u8 },
    Renderers { node: usize, mask: u8 },
    Flags { node: usize, flags: u8 },
    Fill { node: usize },
    Move { node: usize, dx: i8 },
    Describe { node: usize, on: bool },
}

fn edit_strategy() -> impl Strategy<Value = Edit> {
    let node = 0..=NODES;
    prop_oneof![
        4 => (node.clone(), 1..=NODES, 0usize..4)
            .prop_map(|(parent, child, index)| Edit::Link { parent, child, index }),
        2 => (node.clone(), 1..=NODES).prop_map(|(parent, child)| Edit::Unlink { parent, child }),
        2 => (1..=NODES, 0u8..3).prop_map(|(node, kind)| Edit::Content { node, kind }),
        1 => (1..=NODES, 1u8..16).prop_map(|(node, mask)| Edit::Renderers { node, mask }),
        1 => (1..=NODES, 0u8..8).prop_map(|(node, flags)| Edit::Flags { node, flags }),
        1 => (1..=NODES).prop_map(|node| Edit::Fill { node }),
        1 => (node.clone(), any::<i8>()).prop_map(|(node, dx)| Edit::Move { node, dx }),
        1 => (1..=NODES, any::<bool>()).prop_map(|(node, on)| Edit::Describe { node, on }),
    ]
}

fn content(kind: u8) -> Option<NodeContent> {
    match kind {
        0 => None,
        1 => Some(NodeContent::Shape(ShapeContent {
            path: Rect::new(0.0, 0.0, 4.0, 4.0).to_path(0.1),
            fill: Some(Brush::default()),
            ..Default::default()
        })),
        _ => Some(NodeContent::Text(TextContent {
            text: "t".into(),
            ..Default::default()
        })),
    }
}

fn reaches(tree: &NodeTree, from: NodeId, to: NodeId) -> bool {
    let mut stack = vec![from];
    while let Some(n) = stack.pop() {
        if n == to {
            return true;
        }
        stack.extend(tree.children(n));
    }
    false
}

fn apply(tree: &mut NodeTree, nodes: &[NodeId], edit: &Edit) {
    match *edit {
        Edit::Link { parent, child, index } => {
            let (p, c) = (nodes[parent], nodes[child]);
            if tree.child_index(p, c).is_none() && !reaches(tree, c, p) {
                let index = index.min(tree.child_count(p));
                tree.insert_child(p, index, c);
            }
        }
        Edit::Unlink { parent, child } => {
            let (p, c) = (nodes[parent], nodes[child]);
            if tree.child_index(p, c).is_some() {
                tree.remove_child(p, c);
            }
        }
        Edit::Content { node, kind } => tree.set_content(nodes[node], content(kind)),
        Edit::Renderers { node, mask } => {
            tree.set_renderers(nodes[node], Renderers::from_bits_truncate(mask));
        }
        Edit::Flags { node, flags } => {
            let mut f = NodeFlags::empty();
            f.set(NodeFlags::HIDDEN, flags & 1 != 0);
            f.set(NodeFlags::LAYER_SPLIT, flags & 2 != 0);
            f.set(NodeFlags::ISOLATE, flags & 4 != 0);
            tree.set_flags(nodes[node], f);
        }
        Edit::Fill { node } => {
            if matches!(tree.content(nodes[node]), Some(NodeContent::Shape(_))) {
                tree.set_fill(nodes[node], None);
            }
        }
        Edit::Move { node, dx } => {
            tree.set_transform(nodes[node], Affine::translate((f64::from(dx), 0.0)));
        }
        Edit::Describe { node, on } => {
            let description = on.then(|| AccessibleContent {
                role: "group".into(),
                label: format!("node {node}"),
            });
            tree.set_accessible(nodes[node], description);
        }
    }
}

fn config(policy: StitchPolicy) -> DisplayConfig {
    DisplayConfig {
        stitch_policy: policy,
        audit: true,
        ..DisplayConfig::default()
    }
}

fn paint_order(display: &Display) -> Vec<(Option<NodeId>, Renderer)> {
    display
        .drawables()
        .paint_order()
        .map(|d| {
            let drawable = display.drawables().get(d);
            (drawable.node(), drawable.renderer())
        })
        .collect()
}

fn run(policy: StitchPolicy, edits: &[Vec<Edit>]) -> Result<(), TestCaseError> {
    let mut tree = NodeTree::new();
    let nodes: Vec<NodeId> = (0..=NODES).map(|_| tree.create_node()).collect();
    let root = nodes[0];
    let mut backend = RecordingBackend::new();
    let mut display = Display::new(&mut tree, root, config(policy));
    let mut accessible = AccessibleMirror::new(&mut tree, root);

    for batch in edits {
        for edit in batch {
            apply(&mut tree, &nodes, edit);
        }
        let changes = tree.evaluate();
        let report = display.update(&mut tree, &changes, &mut backend);
        prop_assert!(
            report.failed_blocks.is_empty(),
            "recording backend never fails: {:?}",
            report.failed_blocks
        );
        accessible.sync(&mut tree, &changes);
        accessible.audit(&tree);

        let mut fresh_backend = RecordingBackend::new();
        let mut fresh = Display::new(&mut tree, root, config(policy));
        fresh.update(&mut tree, &Default::default(), &mut fresh_backend);
        prop_assert_eq!(
            paint_order(&display),
            paint_order(&fresh),
            "incremental paint order differs from a fresh build"
        );

        backend.take_calls();
        let changes = tree.evaluate();
        let report = display.update(&mut tree, &changes, &mut backend);
        prop_assert_eq!(report.painted, 0, "idle update painted");
        prop_assert!(backend.take_calls().is_empty(), "idle update touched the backend");
    }
    Ok(())
}

// ═════════════════════════════════════════════════════════════════════════
// Greedy stitching
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(96))]

    #[test]
    fn greedy_display_matches_fresh_build(
        edits in prop::collection::vec(prop::collection::vec(edit_strategy(), 1..6), 1..8)
    ) {
        run(StitchPolicy::Greedy, &edits)?;
    }
}

// ═════════════════════════════════════════════════════════════════════════
// Rebuild stitching
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(96))]

    #[test]
    fn rebuild_display_matches_fresh_build(
        edits in prop::collection::vec(prop::collection::vec(edit_strategy(), 1..6), 1..8)
    ) {
        run(StitchPolicy::Rebuild, &edits)?;
    }
}
