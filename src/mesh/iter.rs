//! Element iterators.
//!
//! Containers hand out one iterator per element kind (`vertices()`, `halfedges()`, `edges()`,
//! `faces()`). The iterators walk the raw index range and skip tombstoned elements, but only
//! when the container actually has garbage, so the common fully-compacted case pays nothing for
//! the check.

use std::marker::PhantomData;

use crate::handle::{Handle, PropertyIndex};

/// Container view required by [`ElementIter`], implemented per element kind.
pub trait ElementSet<H: Handle> {
    /// Number of allocated elements of this kind, tombstones included.
    fn element_count(&self) -> usize;

    /// True if the element has been deleted but not yet collected.
    fn element_deleted(&self, h: H) -> bool;

    /// True if any element of the container is tombstoned.
    fn has_garbage(&self) -> bool;
}

/// A double-ended iterator over the live elements of one kind.
pub struct ElementIter<'a, C, H> {
    container: &'a C,
    front: PropertyIndex,
    back: PropertyIndex,
    handle: PhantomData<H>,
}

impl<'a, C: ElementSet<H>, H: Handle> ElementIter<'a, C, H> {
    pub(crate) fn new(container: &'a C) -> Self {
        ElementIter {
            container,
            front: 0,
            back: container.element_count() as PropertyIndex,
            handle: PhantomData,
        }
    }

    // Not named `skip`; the by-value `Iterator::skip` would win method resolution over it.
    #[inline]
    fn is_skipped(&self, h: H) -> bool {
        self.container.has_garbage() && self.container.element_deleted(h)
    }
}

impl<'a, C, H> Clone for ElementIter<'a, C, H> {
    fn clone(&self) -> Self {
        ElementIter {
            container: self.container,
            front: self.front,
            back: self.back,
            handle: PhantomData,
        }
    }
}

impl<'a, C: ElementSet<H>, H: Handle> Iterator for ElementIter<'a, C, H> {
    type Item = H;

    fn next(&mut self) -> Option<H> {
        while self.front < self.back {
            let h = H::from_index(self.front);
            self.front += 1;
            if !self.is_skipped(h) {
                return Some(h);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.back - self.front) as usize;
        if self.container.has_garbage() {
            (0, Some(remaining))
        } else {
            (remaining, Some(remaining))
        }
    }
}

impl<'a, C: ElementSet<H>, H: Handle> DoubleEndedIterator for ElementIter<'a, C, H> {
    fn next_back(&mut self) -> Option<H> {
        while self.front < self.back {
            self.back -= 1;
            let h = H::from_index(self.back);
            if !self.is_skipped(h) {
                return Some(h);
            }
        }
        None
    }
}
