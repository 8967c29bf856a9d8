// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Element to surface attachment bookkeeping.
//!
//! A retained element is the child of at most one surface. Kept elements
//! can be reused by a drawable in another block, so the surface that lists
//! an element last takes it over and the previous surface forgets it.

use alloc::vec::Vec;

use trellis_core::backend::{ElementId, SurfaceId};

#[derive(Clone, Copy, Debug, Default)]
struct Slot {
    owner: Option<SurfaceId>,
    /// Pass of the last [`Attachments::order`] that listed the element.
    listed_in: u64,
}

/// Children of every surface and the owner of every element.
#[derive(Debug, Default)]
pub(crate) struct Attachments {
    elements: Vec<Slot>,
    children: Vec<Vec<ElementId>>,
    pass: u64,
}

impl Attachments {
    fn slot_mut(&mut self, element: ElementId) -> &mut Slot {
        let idx = element.0 as usize;
        if idx >= self.elements.len() {
            self.elements.resize(idx + 1, Slot::default());
        }
        &mut self.elements[idx]
    }

    fn children_mut(&mut self, surface: SurfaceId) -> &mut Vec<ElementId> {
        let idx = surface.0 as usize;
        if idx >= self.children.len() {
            self.children.resize_with(idx + 1, Vec::new);
        }
        &mut self.children[idx]
    }

    /// Returns the elements attached to `surface`, in order.
    pub(crate) fn children(&self, surface: SurfaceId) -> &[ElementId] {
        self.children
            .get(surface.0 as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns the surface `element` is attached to.
    pub(crate) fn owner(&self, element: ElementId) -> Option<SurfaceId> {
        self.elements.get(element.0 as usize).and_then(|s| s.owner)
    }

    /// Makes `elements` the children of `surface` and returns the former
    /// children that are no longer attached anywhere.
    ///
    /// Runs in time linear in the old and new child lists, plus the lists
    /// of surfaces an element is taken from.
    pub(crate) fn order(&mut self, surface: SurfaceId, elements: &[ElementId]) -> Vec<ElementId> {
        self.pass += 1;
        let pass = self.pass;

        let mut previous: Vec<SurfaceId> = Vec::new();
        for &e in elements {
            let slot = self.slot_mut(e);
            slot.listed_in = pass;
            if let Some(owner) = slot.owner.replace(surface) {
                if owner != surface && !previous.contains(&owner) {
                    previous.push(owner);
                }
            }
        }
        for owner in previous {
            let slots = &self.elements;
            if let Some(list) = self.children.get_mut(owner.0 as usize) {
                list.retain(|c| slots[c.0 as usize].listed_in != pass);
            }
        }

        let old = core::mem::replace(self.children_mut(surface), elements.to_vec());
        let mut detached = Vec::new();
        for e in old {
            let slot = self.slot_mut(e);
            if slot.listed_in != pass {
                slot.owner = None;
                detached.push(e);
            }
        }
        detached
    }

    /// Forgets a released element.
    pub(crate) fn release_element(&mut self, element: ElementId) {
        let Some(owner) = self.owner(element) else {
            return;
        };
        self.slot_mut(element).owner = None;
        self.children_mut(owner).retain(|&c| c != element);
    }

    /// Forgets a destroyed surface, leaving its children unattached.
    pub(crate) fn destroy_surface(&mut self, surface: SurfaceId) {
        let old = core::mem::take(self.children_mut(surface));
        for e in old {
            self.slot_mut(e).owner = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    const A: SurfaceId = SurfaceId(0);
    const B: SurfaceId = SurfaceId(1);

    fn e(n: u32) -> ElementId {
        ElementId(n)
    }

    #[test]
    fn reordering_detaches_dropped_children() {
        let mut att = Attachments::default();
        assert!(att.order(A, &[e(0), e(1), e(2)]).is_empty());
        assert_eq!(att.order(A, &[e(2), e(0)]), vec![e(1)]);
        assert_eq!(att.children(A), &[e(2), e(0)]);
        assert_eq!(att.owner(e(1)), None);
    }

    #[test]
    fn taken_element_stays_with_its_new_surface() {
        let mut att = Attachments::default();
        att.order(A, &[e(0), e(1)]);

        // The new owner orders before the old one.
        assert!(att.order(B, &[e(5), e(0)]).is_empty());
        assert_eq!(att.children(A), &[e(1)], "old surface forgets the element");
        assert!(
            att.order(A, &[e(1)]).is_empty(),
            "old surface must not detach a taken element"
        );
        assert_eq!(att.owner(e(0)), Some(B));
        assert_eq!(att.children(B), &[e(5), e(0)]);
    }

    #[test]
    fn old_surface_ordering_first_also_works() {
        let mut att = Attachments::default();
        att.order(A, &[e(0), e(1)]);
        assert_eq!(att.order(A, &[e(1)]), vec![e(0)]);
        assert!(att.order(B, &[e(0)]).is_empty());
        assert_eq!(att.owner(e(0)), Some(B));
    }

    #[test]
    fn release_and_destroy_forget_ownership() {
        let mut att = Attachments::default();
        att.order(A, &[e(0), e(1)]);
        att.release_element(e(0));
        assert_eq!(att.children(A), &[e(1)]);
        assert_eq!(att.owner(e(0)), None);
        att.destroy_surface(A);
        assert!(att.children(A).is_empty());
        assert_eq!(att.owner(e(1)), None);
    }

    #[test]
    fn large_reorder_is_exact() {
        let mut att = Attachments::default();
        let all: Vec<_> = (0..2_000).map(e).collect();
        att.order(A, &all);
        let evens: Vec<_> = all.iter().copied().filter(|x| x.0 % 2 == 0).collect();
        let detached = att.order(A, &evens);
        assert_eq!(detached.len(), 1_000);
        assert!(detached.iter().all(|x| x.0 % 2 == 1));
        assert_eq!(att.children(A), evens.as_slice());
    }
}
