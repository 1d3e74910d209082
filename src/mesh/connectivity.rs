//! Connectivity records stored as system property columns.
//!
//! These are plain data: all topological rules live in the containers that own them. Storing
//! connectivity in ordinary columns is what lets garbage collection move topology and user data
//! with the same broadcast swap.

use crate::handle::{FaceHandle, HalfedgeHandle, VertexHandle};

/// Per-vertex connectivity: one outgoing halfedge.
///
/// For boundary vertices this must be an outgoing *boundary* halfedge, so that boundary walks
/// start in constant time. `adjust_outgoing_halfedge` maintains this.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VertexConnectivity {
    /// An outgoing halfedge, invalid if the vertex is isolated.
    pub halfedge: HalfedgeHandle,
}

/// Per-halfedge connectivity.
///
/// The opposite halfedge is not stored; it is implicit in the index parity
/// (`HalfedgeHandle::opposite`).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HalfedgeConnectivity {
    /// The incident face, invalid if this halfedge is on the boundary.
    pub face: FaceHandle,
    /// The vertex this halfedge points to.
    pub vertex: VertexHandle,
    /// The next halfedge within the same face (or boundary) ring.
    pub next: HalfedgeHandle,
    /// The previous halfedge within the same face (or boundary) ring.
    pub prev: HalfedgeHandle,
}

/// Per-face connectivity: one perimeter halfedge.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FaceConnectivity {
    /// A halfedge on the face's perimeter.
    pub halfedge: HalfedgeHandle,
}

// Index the connectivity columns directly by the matching handle kind.
macro_rules! impl_connectivity_index {
    ($conn:ident, $handle:ident) => {
        impl ::std::ops::Index<$handle> for [$conn] {
            type Output = $conn;
            #[inline]
            fn index(&self, h: $handle) -> &$conn {
                &self[h.idx()]
            }
        }

        impl ::std::ops::IndexMut<$handle> for [$conn] {
            #[inline]
            fn index_mut(&mut self, h: $handle) -> &mut $conn {
                &mut self[h.idx()]
            }
        }
    };
}

impl_connectivity_index!(VertexConnectivity, VertexHandle);
impl_connectivity_index!(HalfedgeConnectivity, HalfedgeHandle);
impl_connectivity_index!(FaceConnectivity, FaceHandle);
