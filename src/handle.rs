//! This module defines the element handle types used by all containers in this crate. A handle
//! is a `u32` index that can be invalid, with the maximum `u32` integer reserved as the invalid
//! sentinel. This allows collections of `u32` integers to be reinterpreted as collections of
//! handles.
//!
//! Handles are not generational: after a garbage collection pass, a stale handle may refer to a
//! different live element. See `garbage_collection` on the individual containers.

use std::fmt;

/// The raw index type backing every handle.
pub type PropertyIndex = u32;

/// The reserved invalid index.
pub const INVALID_INDEX: PropertyIndex = PropertyIndex::MAX;

/// Common interface of the element handle types.
///
/// This trait is the seam that lets iterators and circulators be written once for all element
/// kinds. All methods are also available inherently on each handle type.
pub trait Handle: Copy + PartialEq + fmt::Debug {
    /// Create a handle from a raw index without checking against the sentinel.
    fn from_index(idx: PropertyIndex) -> Self;

    /// The raw index of this handle.
    fn index(self) -> PropertyIndex;

    /// The raw index widened to `usize` for slice access.
    #[inline]
    fn idx(self) -> usize {
        self.index() as usize
    }

    /// True unless this handle is the invalid sentinel.
    #[inline]
    fn is_valid(self) -> bool {
        self.index() != INVALID_INDEX
    }
}

macro_rules! impl_handle_type {
    ($(#[$attr:meta])* $handle:ident, $disp:expr) => {
        $(#[$attr])*
        #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[repr(transparent)]
        pub struct $handle(PropertyIndex);

        // SAFETY: the handle is transparent over u32, which is Pod and Zeroable.
        unsafe impl bytemuck::Pod for $handle {}
        unsafe impl bytemuck::Zeroable for $handle {}

        impl $handle {
            /// Invalid handle instance.
            pub const INVALID: $handle = $handle(INVALID_INDEX);

            /// Create a handle from a raw index. The caller is responsible for staying below
            /// the invalid sentinel.
            #[inline]
            pub const fn new(idx: PropertyIndex) -> $handle {
                $handle(idx)
            }

            /// The raw index of this handle.
            #[inline]
            pub const fn index(self) -> PropertyIndex {
                self.0
            }

            /// The raw index widened to `usize` for slice access.
            #[inline]
            pub const fn idx(self) -> usize {
                self.0 as usize
            }

            /// True unless this handle is the invalid sentinel.
            #[inline]
            pub const fn is_valid(self) -> bool {
                self.0 != INVALID_INDEX
            }

            /// Make this handle invalid.
            #[inline]
            pub fn reset(&mut self) {
                self.0 = INVALID_INDEX;
            }

            /// Convert this handle into `Option<PropertyIndex>`.
            #[inline]
            pub fn into_option(self) -> Option<PropertyIndex> {
                if self.is_valid() {
                    Some(self.0)
                } else {
                    None
                }
            }
        }

        impl Handle for $handle {
            #[inline]
            fn from_index(idx: PropertyIndex) -> Self {
                $handle(idx)
            }

            #[inline]
            fn index(self) -> PropertyIndex {
                self.0
            }
        }

        impl Default for $handle {
            #[inline]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $handle {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, concat!($disp, "{}"), self.0)
            }
        }

    };
}

/// Implements slice indexing by handle for the given element types.
///
/// The orphan rules forbid a blanket `impl<T> Index<VertexHandle> for [T]`, so the element
/// types that get indexed by handles are enumerated here. The impls apply to slices only;
/// the `[]` operator on a `Vec` resolves to `Vec`'s own `Index` and never reaches them, so
/// index through `as_slice` when starting from a `Vec`.
macro_rules! impl_index_for {
    (@one $elem:ty, $handle:ident) => {
        impl ::std::ops::Index<$handle> for [$elem] {
            type Output = $elem;
            #[inline]
            fn index(&self, h: $handle) -> &$elem {
                &self[h.idx()]
            }
        }

        impl ::std::ops::IndexMut<$handle> for [$elem] {
            #[inline]
            fn index_mut(&mut self, h: $handle) -> &mut $elem {
                &mut self[h.idx()]
            }
        }
    };
    ($($elem:ty),* $(,)?) => {
        $(
            impl_index_for!(@one $elem, VertexHandle);
            impl_index_for!(@one $elem, HalfedgeHandle);
            impl_index_for!(@one $elem, EdgeHandle);
            impl_index_for!(@one $elem, FaceHandle);
        )*
    };
}

impl_handle_type! {
    /// A handle to a vertex in any of the containers.
    VertexHandle, "v"
}

impl_handle_type! {
    /// A handle to a halfedge. Halfedges are allocated in opposite pairs, so
    /// `HalfedgeHandle::new(2 * e + i)` addresses halfedge `i` of edge `e`.
    HalfedgeHandle, "h"
}

impl_handle_type! {
    /// A handle to an edge. Every edge owns the two halfedges `2 * e` and `2 * e + 1`.
    EdgeHandle, "e"
}

impl_handle_type! {
    /// A handle to a face of a `HalfedgeMesh`.
    FaceHandle, "f"
}

impl_index_for!(
    bool,
    u8,
    u32,
    usize,
    f32,
    f64,
    [f32; 3],
    [f64; 3],
    VertexHandle,
    HalfedgeHandle,
    EdgeHandle,
    FaceHandle,
);

impl HalfedgeHandle {
    /// The other halfedge of the same edge. The pairing is implicit in the index parity and
    /// never stored.
    #[inline]
    pub const fn opposite(self) -> HalfedgeHandle {
        HalfedgeHandle(self.0 ^ 1)
    }

    /// The edge this halfedge belongs to.
    #[inline]
    pub const fn edge(self) -> EdgeHandle {
        EdgeHandle(self.0 >> 1)
    }
}

impl EdgeHandle {
    /// Halfedge `i` (0 or 1) of this edge.
    #[inline]
    pub const fn halfedge(self, i: PropertyIndex) -> HalfedgeHandle {
        HalfedgeHandle((self.0 << 1) | i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_validity() {
        let v = VertexHandle::new(3);
        assert!(v.is_valid());
        assert_eq!(v.index(), 3);
        assert_eq!(v.into_option(), Some(3));

        let mut w = v;
        w.reset();
        assert!(!w.is_valid());
        assert_eq!(w, VertexHandle::INVALID);
        assert_eq!(w.into_option(), None);
        assert_eq!(VertexHandle::default(), VertexHandle::INVALID);
    }

    #[test]
    fn halfedge_parity() {
        for i in 0..8u32 {
            let h = HalfedgeHandle::new(i);
            assert_eq!(h.opposite().opposite(), h);
            assert_ne!(h.opposite(), h);
            assert_eq!(h.edge(), h.opposite().edge());
            assert_eq!(h.edge().halfedge(i & 1), h);
        }
        let e = EdgeHandle::new(5);
        assert_eq!(e.halfedge(0).index(), 10);
        assert_eq!(e.halfedge(1).index(), 11);
    }

    #[test]
    fn handle_display() {
        assert_eq!(VertexHandle::new(0).to_string(), "v0");
        assert_eq!(HalfedgeHandle::new(3).to_string(), "h3");
        assert_eq!(EdgeHandle::new(1).to_string(), "e1");
        assert_eq!(FaceHandle::new(2).to_string(), "f2");
    }

    #[test]
    fn slice_indexing() {
        let mut data = vec![10usize, 20, 30];
        assert_eq!(data.as_slice()[VertexHandle::new(1)], 20);
        data.as_mut_slice()[VertexHandle::new(2)] = 33;
        assert_eq!(data.as_slice()[VertexHandle::new(2)], 33);
    }
}
