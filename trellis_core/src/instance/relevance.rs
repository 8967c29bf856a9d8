// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Relevance predicates for instance mirrors.

use crate::node::{NodeFlags, NodeId, NodeTree, TreeChanges};

/// Decides which nodes yield an instance in a mirror.
///
/// Non-relevant nodes are transparent: their relevant descendants attach to
/// the nearest relevant ancestor instance.
pub trait Relevance {
    /// Returns whether `node` gets an instance.
    fn is_relevant(tree: &NodeTree, node: NodeId) -> bool;

    /// Returns the nodes whose subtree must be rebuilt at every trail
    /// because their relevance inputs changed.
    fn refreshed(changes: &TreeChanges) -> &[u32];
}

/// Relevance for rendering: nodes with paintable content, transform roots,
/// and filter roots.
#[derive(Clone, Copy, Debug, Default)]
pub struct RenderRelevance;

impl Relevance for RenderRelevance {
    fn is_relevant(tree: &NodeTree, node: NodeId) -> bool {
        tree.content(node).is_some()
            || tree
                .flags(node)
                .intersects(NodeFlags::LAYER_SPLIT | NodeFlags::ISOLATE)
    }

    fn refreshed(changes: &TreeChanges) -> &[u32] {
        &changes.relevance
    }
}

/// Relevance for accessibility: nodes carrying an accessible description.
#[derive(Clone, Copy, Debug, Default)]
pub struct AccessibleRelevance;

impl Relevance for AccessibleRelevance {
    fn is_relevant(tree: &NodeTree, node: NodeId) -> bool {
        tree.accessible(node).is_some()
    }

    fn refreshed(changes: &TreeChanges) -> &[u32] {
        &changes.accessible
    }
}
