// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Relevance mirrors of the node tree.
//!
//! An [`InstanceTree`] maintains, for a [`Relevance`] predicate, a tree of
//! instances whose shape is exactly the set of relevant trails reachable
//! from a root node, nested by relevant ancestry and ordered by paint order.
//! Rendering uses [`RenderRelevance`]; accessibility reuses the same
//! machinery with [`AccessibleRelevance`].
//!
//! The mirror is kept up to date by [`InstanceTree::sync`], which consumes a
//! drained [`TreeChanges`](crate::node::TreeChanges) and calls back into an
//! [`InstanceHooks`] implementation as instances come and go. The
//! [`audit`](InstanceTree::audit) family re-derives the expected shape from
//! the node tree and panics on any divergence.

mod audit;
mod id;
mod relevance;
mod sync;
mod tree;

pub use audit::ExpectedInstance;
pub use id::{InstanceId, InstanceState};
pub use relevance::{AccessibleRelevance, Relevance, RenderRelevance};
pub use sync::SyncStats;
pub use tree::{InstanceHooks, InstanceTree};
