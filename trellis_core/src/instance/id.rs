// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Instance identity types.

use core::fmt;

/// A handle to an instance in an [`InstanceTree`](super::InstanceTree).
///
/// Generational like [`NodeId`](crate::node::NodeId): disposing an instance
/// bumps its slot's generation so the old handle can no longer be used.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl InstanceId {
    /// Returns the raw slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstanceId({}@gen{})", self.idx, self.generation)
    }
}

/// Lifecycle state of an instance slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InstanceState {
    /// Part of the mirror.
    Active,
    /// Returned to the free list.
    Disposed,
}
