//!
//! Halfedge mesh module. An edge-based polygonal mesh kernel storing all per-element data,
//! including its own connectivity, in property columns. Deleting elements only tombstones
//! them; call [`HalfedgeMesh::garbage_collection`] to compact the arenas.
//!

use std::fmt;

use smallvec::{smallvec, SmallVec};

use crate::handle::{EdgeHandle, FaceHandle, HalfedgeHandle, VertexHandle, INVALID_INDEX};
use crate::props::{
    EdgeProperty, Error, FaceProperty, HalfedgeProperty, Property, PropertySet, PropertyValue,
    VertexProperty,
};
use crate::Real;

use super::circulators::{
    EdgeAroundVertexCirculator, FaceAroundVertexCirculator, FaceNavigation,
    HalfedgeAroundFaceCirculator, HalfedgeAroundVertexCirculator, HalfedgeNavigation,
    VertexAroundFaceCirculator, VertexAroundVertexCirculator,
};
use super::connectivity::{FaceConnectivity, HalfedgeConnectivity, VertexConnectivity};
use super::iter::{ElementIter, ElementSet};

/// Error raised by a topological operator whose precondition does not hold.
///
/// Operators guarded by a predicate (`is_flip_ok`, `is_collapse_ok`, …) return this instead of
/// mutating when the predicate is false, so a skipped check cannot corrupt connectivity.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TopologyError(pub &'static str);

impl fmt::Display for TopologyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "topological precondition violated: {}", self.0)
    }
}

impl std::error::Error for TopologyError {}

/// An edge-based polygonal mesh.
///
/// Vertices, halfedges, edges and faces each own a [`PropertySet`]; connectivity and positions
/// are ordinary columns in those sets (`"v:point"`, `"v:connectivity"`, `"h:connectivity"`,
/// `"f:connectivity"`, plus the `"…:deleted"` tombstone flags). Halfedges are allocated in
/// pairs and paired by index parity, see [`HalfedgeHandle::opposite`].
///
/// `Clone` is a deep copy: every column, user properties included.
#[derive(Clone, Debug)]
pub struct HalfedgeMesh<T: Real> {
    vprops: PropertySet,
    hprops: PropertySet,
    eprops: PropertySet,
    fprops: PropertySet,

    vertex_points: Property<[T; 3]>,
    vertex_connectivity: Property<VertexConnectivity>,
    halfedge_connectivity: Property<HalfedgeConnectivity>,
    face_connectivity: Property<FaceConnectivity>,

    vertex_deleted: Property<bool>,
    edge_deleted: Property<bool>,
    face_deleted: Property<bool>,

    deleted_vertices: usize,
    deleted_edges: usize,
    deleted_faces: usize,
    has_garbage: bool,
}

impl<T: Real> Default for HalfedgeMesh<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Real> HalfedgeMesh<T> {
    /// Construct an empty mesh.
    pub fn new() -> Self {
        let mut vprops = PropertySet::new();
        let mut hprops = PropertySet::new();
        let mut eprops = PropertySet::new();
        let mut fprops = PropertySet::new();

        // Fresh sets cannot collide on the reserved system names.
        let vertex_points = vprops.add("v:point", [T::zero(); 3]).expect("system column");
        let vertex_connectivity = vprops
            .add("v:connectivity", VertexConnectivity::default())
            .expect("system column");
        let halfedge_connectivity = hprops
            .add("h:connectivity", HalfedgeConnectivity::default())
            .expect("system column");
        let face_connectivity = fprops
            .add("f:connectivity", FaceConnectivity::default())
            .expect("system column");
        let vertex_deleted = vprops.add("v:deleted", false).expect("system column");
        let edge_deleted = eprops.add("e:deleted", false).expect("system column");
        let face_deleted = fprops.add("f:deleted", false).expect("system column");

        HalfedgeMesh {
            vprops,
            hprops,
            eprops,
            fprops,
            vertex_points,
            vertex_connectivity,
            halfedge_connectivity,
            face_connectivity,
            vertex_deleted,
            edge_deleted,
            face_deleted,
            deleted_vertices: 0,
            deleted_edges: 0,
            deleted_faces: 0,
            has_garbage: false,
        }
    }

    /// Remove all elements and all properties, including user properties.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Release unused capacity in all property columns.
    pub fn free_memory(&mut self) {
        self.vprops.shrink_to_fit();
        self.hprops.shrink_to_fit();
        self.eprops.shrink_to_fit();
        self.fprops.shrink_to_fit();
    }

    /// Reserve capacity for the given numbers of vertices, edges and faces.
    pub fn reserve(&mut self, nvertices: usize, nedges: usize, nfaces: usize) {
        self.vprops.reserve(nvertices);
        self.hprops.reserve(2 * nedges);
        self.eprops.reserve(nedges);
        self.fprops.reserve(nfaces);
    }

    // --- sizes and counts ---

    /// Number of allocated vertices, tombstones included.
    #[inline]
    pub fn vertices_size(&self) -> usize {
        self.vprops.len()
    }

    /// Number of allocated halfedges, tombstones included.
    #[inline]
    pub fn halfedges_size(&self) -> usize {
        self.hprops.len()
    }

    /// Number of allocated edges, tombstones included.
    #[inline]
    pub fn edges_size(&self) -> usize {
        self.eprops.len()
    }

    /// Number of allocated faces, tombstones included.
    #[inline]
    pub fn faces_size(&self) -> usize {
        self.fprops.len()
    }

    /// Number of live vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices_size() - self.deleted_vertices
    }

    /// Number of live halfedges.
    #[inline]
    pub fn halfedge_count(&self) -> usize {
        self.halfedges_size() - 2 * self.deleted_edges
    }

    /// Number of live edges.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges_size() - self.deleted_edges
    }

    /// Number of live faces.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces_size() - self.deleted_faces
    }

    /// True if the mesh has no live vertices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertex_count() == 0
    }

    /// True if any element is tombstoned.
    #[inline]
    pub fn has_garbage(&self) -> bool {
        self.has_garbage
    }

    // --- validity and tombstones ---

    /// True if `v` addresses an allocated vertex.
    #[inline]
    pub fn is_valid_vertex(&self, v: VertexHandle) -> bool {
        v.is_valid() && v.idx() < self.vertices_size()
    }

    /// True if `h` addresses an allocated halfedge.
    #[inline]
    pub fn is_valid_halfedge(&self, h: HalfedgeHandle) -> bool {
        h.is_valid() && h.idx() < self.halfedges_size()
    }

    /// True if `e` addresses an allocated edge.
    #[inline]
    pub fn is_valid_edge(&self, e: EdgeHandle) -> bool {
        e.is_valid() && e.idx() < self.edges_size()
    }

    /// True if `f` addresses an allocated face.
    #[inline]
    pub fn is_valid_face(&self, f: FaceHandle) -> bool {
        f.is_valid() && f.idx() < self.faces_size()
    }

    /// True if `v` is tombstoned.
    #[inline]
    pub fn is_deleted_vertex(&self, v: VertexHandle) -> bool {
        self.vprops.slice(&self.vertex_deleted)[v]
    }

    /// True if `e` is tombstoned.
    #[inline]
    pub fn is_deleted_edge(&self, e: EdgeHandle) -> bool {
        self.eprops.slice(&self.edge_deleted)[e]
    }

    /// True if `h` is tombstoned (tombstoning is tracked per edge).
    #[inline]
    pub fn is_deleted_halfedge(&self, h: HalfedgeHandle) -> bool {
        self.is_deleted_edge(h.edge())
    }

    /// True if `f` is tombstoned.
    #[inline]
    pub fn is_deleted_face(&self, f: FaceHandle) -> bool {
        self.fprops.slice(&self.face_deleted)[f]
    }

    // --- low-level connectivity ---

    #[inline]
    fn vconn(&self) -> &[VertexConnectivity] {
        self.vprops.slice(&self.vertex_connectivity)
    }

    #[inline]
    fn vconn_mut(&mut self) -> &mut [VertexConnectivity] {
        self.vprops.slice_mut(&self.vertex_connectivity)
    }

    #[inline]
    fn hconn(&self) -> &[HalfedgeConnectivity] {
        self.hprops.slice(&self.halfedge_connectivity)
    }

    #[inline]
    fn hconn_mut(&mut self) -> &mut [HalfedgeConnectivity] {
        self.hprops.slice_mut(&self.halfedge_connectivity)
    }

    #[inline]
    fn fconn(&self) -> &[FaceConnectivity] {
        self.fprops.slice(&self.face_connectivity)
    }

    #[inline]
    fn fconn_mut(&mut self) -> &mut [FaceConnectivity] {
        self.fprops.slice_mut(&self.face_connectivity)
    }

    /// The primed outgoing halfedge of `v`, invalid if `v` is isolated.
    #[inline]
    pub fn outgoing_halfedge(&self, v: VertexHandle) -> HalfedgeHandle {
        self.vconn()[v].halfedge
    }

    /// Prime `v` with the outgoing halfedge `h`.
    #[inline]
    pub fn set_outgoing_halfedge(&mut self, v: VertexHandle, h: HalfedgeHandle) {
        self.vconn_mut()[v].halfedge = h;
    }

    /// True if `v` has no incident edges.
    #[inline]
    pub fn is_isolated(&self, v: VertexHandle) -> bool {
        !self.outgoing_halfedge(v).is_valid()
    }

    /// The vertex `h` points to.
    #[inline]
    pub fn to_vertex(&self, h: HalfedgeHandle) -> VertexHandle {
        self.hconn()[h].vertex
    }

    /// The vertex `h` emanates from.
    #[inline]
    pub fn from_vertex(&self, h: HalfedgeHandle) -> VertexHandle {
        self.to_vertex(h.opposite())
    }

    #[inline]
    fn set_vertex(&mut self, h: HalfedgeHandle, v: VertexHandle) {
        self.hconn_mut()[h].vertex = v;
    }

    /// The face incident to `h`, invalid if `h` is on the boundary.
    #[inline]
    pub fn face(&self, h: HalfedgeHandle) -> FaceHandle {
        self.hconn()[h].face
    }

    #[inline]
    fn set_face(&mut self, h: HalfedgeHandle, f: FaceHandle) {
        self.hconn_mut()[h].face = f;
    }

    /// The next halfedge within the face (or boundary) ring of `h`.
    #[inline]
    pub fn next_halfedge(&self, h: HalfedgeHandle) -> HalfedgeHandle {
        self.hconn()[h].next
    }

    /// The previous halfedge within the face (or boundary) ring of `h`.
    #[inline]
    pub fn prev_halfedge(&self, h: HalfedgeHandle) -> HalfedgeHandle {
        self.hconn()[h].prev
    }

    /// Link `next` after `h`, fixing `next`'s back pointer as well.
    #[inline]
    fn set_next_halfedge(&mut self, h: HalfedgeHandle, next: HalfedgeHandle) {
        let hc = self.hconn_mut();
        hc[h].next = next;
        hc[next].prev = h;
    }

    /// The other halfedge of the same edge.
    #[inline]
    pub fn opposite_halfedge(&self, h: HalfedgeHandle) -> HalfedgeHandle {
        h.opposite()
    }

    /// The next outgoing halfedge of the same origin vertex, counter-clockwise.
    #[inline]
    pub fn ccw_rotated_halfedge(&self, h: HalfedgeHandle) -> HalfedgeHandle {
        self.prev_halfedge(h).opposite()
    }

    /// The next outgoing halfedge of the same origin vertex, clockwise.
    #[inline]
    pub fn cw_rotated_halfedge(&self, h: HalfedgeHandle) -> HalfedgeHandle {
        self.next_halfedge(h.opposite())
    }

    /// The edge `h` belongs to.
    #[inline]
    pub fn edge(&self, h: HalfedgeHandle) -> EdgeHandle {
        h.edge()
    }

    /// Halfedge `i` (0 or 1) of `e`.
    #[inline]
    pub fn edge_halfedge(&self, e: EdgeHandle, i: u32) -> HalfedgeHandle {
        debug_assert!(i <= 1);
        e.halfedge(i)
    }

    /// Endpoint `i` (0 or 1) of `e`.
    #[inline]
    pub fn edge_vertex(&self, e: EdgeHandle, i: u32) -> VertexHandle {
        self.to_vertex(self.edge_halfedge(e, i))
    }

    /// The face incident to halfedge `i` (0 or 1) of `e`, invalid on the boundary side.
    #[inline]
    pub fn edge_face(&self, e: EdgeHandle, i: u32) -> FaceHandle {
        self.face(self.edge_halfedge(e, i))
    }

    /// A perimeter halfedge of `f`.
    #[inline]
    pub fn face_halfedge(&self, f: FaceHandle) -> HalfedgeHandle {
        self.fconn()[f].halfedge
    }

    #[inline]
    fn set_face_halfedge(&mut self, f: FaceHandle, h: HalfedgeHandle) {
        self.fconn_mut()[f].halfedge = h;
    }

    // --- boundary predicates ---

    /// True if `v` lies on the boundary or is isolated.
    ///
    /// Relies on the outgoing-halfedge priming invariant: boundary vertices are primed with a
    /// boundary halfedge, so this is a constant-time check.
    #[inline]
    pub fn is_boundary_vertex(&self, v: VertexHandle) -> bool {
        let h = self.outgoing_halfedge(v);
        !(h.is_valid() && self.face(h).is_valid())
    }

    /// True if `h` has no incident face.
    #[inline]
    pub fn is_boundary_halfedge(&self, h: HalfedgeHandle) -> bool {
        !self.face(h).is_valid()
    }

    /// True if either halfedge of `e` is on the boundary.
    #[inline]
    pub fn is_boundary_edge(&self, e: EdgeHandle) -> bool {
        self.is_boundary_halfedge(e.halfedge(0)) || self.is_boundary_halfedge(e.halfedge(1))
    }

    /// True if any perimeter edge of `f` is on the boundary.
    pub fn is_boundary_face(&self, f: FaceHandle) -> bool {
        let start = self.face_halfedge(f);
        let mut h = start;
        loop {
            if self.is_boundary_halfedge(h.opposite()) {
                return true;
            }
            h = self.next_halfedge(h);
            if h == start {
                return false;
            }
        }
    }

    /// True if the one-ring of `v` contains at most one boundary gap.
    pub fn is_manifold(&self, v: VertexHandle) -> bool {
        let mut gaps = 0;
        for h in self.halfedges_around(v) {
            if self.is_boundary_halfedge(h) {
                gaps += 1;
            }
        }
        gaps < 2
    }

    // --- positions ---

    /// The position of `v`.
    #[inline]
    pub fn position(&self, v: VertexHandle) -> [T; 3] {
        self.vprops.slice(&self.vertex_points)[v.idx()]
    }

    /// Mutable access to the position of `v`.
    #[inline]
    pub fn position_mut(&mut self, v: VertexHandle) -> &mut [T; 3] {
        &mut self.vprops.slice_mut(&self.vertex_points)[v.idx()]
    }

    /// All vertex positions, one triplet per allocated vertex.
    #[inline]
    pub fn positions(&self) -> &[[T; 3]] {
        self.vprops.slice(&self.vertex_points)
    }

    /// Mutable access to all vertex positions.
    #[inline]
    pub fn positions_mut(&mut self) -> &mut [[T; 3]] {
        self.vprops.slice_mut(&self.vertex_points)
    }

    // --- iterators and circulators ---

    /// Iterate over all live vertices.
    pub fn vertices(&self) -> ElementIter<'_, Self, VertexHandle> {
        ElementIter::new(self)
    }

    /// Iterate over all live halfedges.
    pub fn halfedges(&self) -> ElementIter<'_, Self, HalfedgeHandle> {
        ElementIter::new(self)
    }

    /// Iterate over all live edges.
    pub fn edges(&self) -> ElementIter<'_, Self, EdgeHandle> {
        ElementIter::new(self)
    }

    /// Iterate over all live faces.
    pub fn faces(&self) -> ElementIter<'_, Self, FaceHandle> {
        ElementIter::new(self)
    }

    /// Circulate over the one-ring neighbor vertices of `v`.
    pub fn vertices_around(&self, v: VertexHandle) -> VertexAroundVertexCirculator<'_, Self> {
        VertexAroundVertexCirculator::new(self, v)
    }

    /// Circulate over the outgoing halfedges of `v`.
    pub fn halfedges_around(&self, v: VertexHandle) -> HalfedgeAroundVertexCirculator<'_, Self> {
        HalfedgeAroundVertexCirculator::new(self, v)
    }

    /// Circulate over the incident edges of `v`.
    pub fn edges_around(&self, v: VertexHandle) -> EdgeAroundVertexCirculator<'_, Self> {
        EdgeAroundVertexCirculator::new(self, v)
    }

    /// Circulate over the faces incident to `v`, skipping boundary gaps.
    pub fn faces_around(&self, v: VertexHandle) -> FaceAroundVertexCirculator<'_, Self> {
        FaceAroundVertexCirculator::new(self, v)
    }

    /// Circulate over the perimeter vertices of `f`.
    pub fn vertices_of(&self, f: FaceHandle) -> VertexAroundFaceCirculator<'_, Self> {
        VertexAroundFaceCirculator::new(self, f)
    }

    /// Circulate over the perimeter halfedges of `f`.
    pub fn halfedges_of(&self, f: FaceHandle) -> HalfedgeAroundFaceCirculator<'_, Self> {
        HalfedgeAroundFaceCirculator::new(self, f)
    }

    /// Number of one-ring neighbors of `v`.
    pub fn valence(&self, v: VertexHandle) -> usize {
        self.vertices_around(v).count()
    }

    /// Number of perimeter vertices of `f`.
    pub fn face_valence(&self, f: FaceHandle) -> usize {
        self.vertices_of(f).count()
    }

    // --- queries ---

    /// The halfedge from `start` to `end`, if the two vertices are connected.
    pub fn find_halfedge(&self, start: VertexHandle, end: VertexHandle) -> Option<HalfedgeHandle> {
        debug_assert!(self.is_valid_vertex(start) && self.is_valid_vertex(end));
        let h0 = self.outgoing_halfedge(start);
        if h0.is_valid() {
            let mut h = h0;
            loop {
                if self.to_vertex(h) == end {
                    return Some(h);
                }
                h = self.cw_rotated_halfedge(h);
                if h == h0 {
                    break;
                }
            }
        }
        None
    }

    /// The edge between `a` and `b`, if the two vertices are connected.
    pub fn find_edge(&self, a: VertexHandle, b: VertexHandle) -> Option<EdgeHandle> {
        self.find_halfedge(a, b).map(|h| h.edge())
    }

    /// True if every live face is a triangle.
    pub fn is_triangle_mesh(&self) -> bool {
        self.faces().all(|f| self.face_valence(f) == 3)
    }

    /// True if every live face is a quad.
    pub fn is_quad_mesh(&self) -> bool {
        self.faces().all(|f| self.face_valence(f) == 4)
    }

    /// Re-prime `v` with a boundary halfedge if it has one, restoring the priming invariant.
    fn adjust_outgoing_halfedge(&mut self, v: VertexHandle) {
        let start = self.outgoing_halfedge(v);
        if !start.is_valid() {
            return;
        }
        let mut h = start;
        loop {
            if self.is_boundary_halfedge(h) {
                self.set_outgoing_halfedge(v, h);
                return;
            }
            h = self.cw_rotated_halfedge(h);
            if h == start {
                return;
            }
        }
    }

    // --- allocation ---

    /// Allocate an unconnected vertex. Returns the invalid handle if the index space is
    /// exhausted.
    pub fn new_vertex(&mut self) -> VertexHandle {
        if self.vertices_size() >= INVALID_INDEX as usize {
            return VertexHandle::INVALID;
        }
        self.vprops.push();
        VertexHandle::new(self.vertices_size() as u32 - 1)
    }

    /// Allocate an edge from `start` to `end` with both halfedges unlinked. Returns halfedge
    /// `start -> end`, or the invalid handle if the index space is exhausted.
    pub fn new_edge(&mut self, start: VertexHandle, end: VertexHandle) -> HalfedgeHandle {
        debug_assert!(start != end);
        if self.halfedges_size() >= INVALID_INDEX as usize {
            return HalfedgeHandle::INVALID;
        }
        self.eprops.push();
        self.hprops.push();
        self.hprops.push();

        let h0 = HalfedgeHandle::new(self.halfedges_size() as u32 - 2);
        let h1 = HalfedgeHandle::new(self.halfedges_size() as u32 - 1);
        self.set_vertex(h0, end);
        self.set_vertex(h1, start);
        h0
    }

    /// Allocate an unconnected face. Returns the invalid handle if the index space is
    /// exhausted.
    pub fn new_face(&mut self) -> FaceHandle {
        if self.faces_size() >= INVALID_INDEX as usize {
            return FaceHandle::INVALID;
        }
        self.fprops.push();
        FaceHandle::new(self.faces_size() as u32 - 1)
    }

    /// Add an isolated vertex at position `p`.
    pub fn add_vertex(&mut self, p: [T; 3]) -> VertexHandle {
        let v = self.new_vertex();
        if v.is_valid() {
            self.vprops.slice_mut(&self.vertex_points)[v.idx()] = p;
        }
        v
    }

    /// Add a triangular face.
    pub fn add_triangle(
        &mut self,
        v0: VertexHandle,
        v1: VertexHandle,
        v2: VertexHandle,
    ) -> Option<FaceHandle> {
        self.add_face(&[v0, v1, v2])
    }

    /// Add a quadrilateral face.
    pub fn add_quad(
        &mut self,
        v0: VertexHandle,
        v1: VertexHandle,
        v2: VertexHandle,
        v3: VertexHandle,
    ) -> Option<FaceHandle> {
        self.add_face(&[v0, v1, v2, v3])
    }

    /// Add a face over the given vertex ring, counter-clockwise.
    ///
    /// Returns `None` if the face would make the mesh non-manifold: a non-boundary vertex, an
    /// existing halfedge that already carries a face, or a boundary patch that cannot be
    /// relinked. All checks run before the first mutation, so a rejected face leaves the mesh
    /// untouched.
    pub fn add_face(&mut self, vertices: &[VertexHandle]) -> Option<FaceHandle> {
        let n = vertices.len();
        assert!(n > 2, "faces need at least three vertices");

        let mut halfedges: SmallVec<[HalfedgeHandle; 8]> =
            smallvec![HalfedgeHandle::INVALID; n];
        let mut is_new: SmallVec<[bool; 8]> = smallvec![false; n];
        let mut needs_adjust: SmallVec<[bool; 8]> = smallvec![false; n];
        let mut next_cache: SmallVec<[(HalfedgeHandle, HalfedgeHandle); 24]> = SmallVec::new();

        for i in 0..n {
            let ii = (i + 1) % n;

            if !self.is_boundary_vertex(vertices[i]) {
                return None;
            }

            halfedges[i] = self
                .find_halfedge(vertices[i], vertices[ii])
                .unwrap_or(HalfedgeHandle::INVALID);
            is_new[i] = !halfedges[i].is_valid();

            if !is_new[i] && !self.is_boundary_halfedge(halfedges[i]) {
                return None;
            }
        }

        // Re-link boundary patches between consecutive old halfedges. Collected into
        // next_cache and applied only after validation succeeds.
        for i in 0..n {
            let ii = (i + 1) % n;
            if is_new[i] || is_new[ii] {
                continue;
            }
            let inner_prev = halfedges[i];
            let inner_next = halfedges[ii];
            if self.next_halfedge(inner_prev) == inner_next {
                continue;
            }

            let outer_prev = inner_next.opposite();
            let mut boundary_prev = outer_prev;
            loop {
                boundary_prev = self.next_halfedge(boundary_prev).opposite();
                if self.is_boundary_halfedge(boundary_prev) && boundary_prev != inner_prev {
                    break;
                }
            }
            let boundary_next = self.next_halfedge(boundary_prev);
            debug_assert!(self.is_boundary_halfedge(boundary_prev));
            debug_assert!(self.is_boundary_halfedge(boundary_next));

            if boundary_next == inner_next {
                return None;
            }

            let patch_start = self.next_halfedge(inner_prev);
            let patch_end = self.prev_halfedge(inner_next);

            next_cache.push((boundary_prev, patch_start));
            next_cache.push((patch_end, boundary_next));
            next_cache.push((inner_prev, inner_next));
        }

        // Validation passed; from here on the mesh is mutated.
        for i in 0..n {
            let ii = (i + 1) % n;
            if is_new[i] {
                halfedges[i] = self.new_edge(vertices[i], vertices[ii]);
            }
        }

        let f = self.new_face();
        self.set_face_halfedge(f, halfedges[n - 1]);

        for i in 0..n {
            let ii = (i + 1) % n;
            let v = vertices[ii];
            let inner_prev = halfedges[i];
            let inner_next = halfedges[ii];

            let id = (is_new[i] as u8) | ((is_new[ii] as u8) << 1);
            if id > 0 {
                let outer_prev = inner_next.opposite();
                let outer_next = inner_prev.opposite();

                match id {
                    // Only the previous halfedge is new.
                    1 => {
                        let boundary_prev = self.prev_halfedge(inner_next);
                        next_cache.push((boundary_prev, outer_next));
                        self.set_outgoing_halfedge(v, outer_next);
                    }
                    // Only the next halfedge is new.
                    2 => {
                        let boundary_next = self.next_halfedge(inner_prev);
                        next_cache.push((outer_prev, boundary_next));
                        self.set_outgoing_halfedge(v, boundary_next);
                    }
                    // Both are new.
                    _ => {
                        if !self.outgoing_halfedge(v).is_valid() {
                            self.set_outgoing_halfedge(v, outer_next);
                            next_cache.push((outer_prev, outer_next));
                        } else {
                            let boundary_next = self.outgoing_halfedge(v);
                            let boundary_prev = self.prev_halfedge(boundary_next);
                            next_cache.push((boundary_prev, outer_next));
                            next_cache.push((outer_prev, boundary_next));
                        }
                    }
                }

                next_cache.push((inner_prev, inner_next));
            } else {
                needs_adjust[ii] = self.outgoing_halfedge(v) == inner_next;
            }

            self.set_face(halfedges[i], f);
        }

        for &(a, b) in next_cache.iter() {
            self.set_next_halfedge(a, b);
        }

        for i in 0..n {
            if needs_adjust[i] {
                self.adjust_outgoing_halfedge(vertices[i]);
            }
        }

        Some(f)
    }

    // --- Euler operators ---

    /// Split the halfedge `h0` (and its opposite) by vertex `v`, preserving incident faces.
    /// Returns the new halfedge pointing to `v` on the opposite side.
    pub fn insert_vertex_on(&mut self, h0: HalfedgeHandle, v: VertexHandle) -> HalfedgeHandle {
        let h2 = self.next_halfedge(h0);
        let o0 = h0.opposite();
        let o2 = self.prev_halfedge(o0);
        let v2 = self.to_vertex(h0);
        let fh = self.face(h0);
        let fo = self.face(o0);

        let h1 = self.new_edge(v, v2);
        let o1 = h1.opposite();

        self.set_next_halfedge(h1, h2);
        self.set_next_halfedge(h0, h1);
        self.set_vertex(h0, v);
        self.set_vertex(h1, v2);
        self.set_face(h1, fh);

        self.set_next_halfedge(o1, o0);
        self.set_next_halfedge(o2, o1);
        self.set_vertex(o1, v);
        self.set_face(o1, fo);

        self.set_outgoing_halfedge(v2, o1);
        self.adjust_outgoing_halfedge(v2);
        self.set_outgoing_halfedge(v, h1);
        self.adjust_outgoing_halfedge(v);

        if fh.is_valid() {
            self.set_face_halfedge(fh, h0);
        }
        if fo.is_valid() {
            self.set_face_halfedge(fo, o1);
        }

        o1
    }

    /// Split edge `e` by vertex `v`, preserving incident faces.
    pub fn insert_vertex(&mut self, e: EdgeHandle, v: VertexHandle) -> HalfedgeHandle {
        self.insert_vertex_on(e.halfedge(0), v)
    }

    /// Split edge `e` by a new vertex at position `p`, preserving incident faces.
    pub fn insert_vertex_at(&mut self, e: EdgeHandle, p: [T; 3]) -> HalfedgeHandle {
        let v = self.add_vertex(p);
        self.insert_vertex_on(e.halfedge(0), v)
    }

    /// Fan-triangulate face `f` from vertex `v`, which becomes interior.
    pub fn split_face(&mut self, f: FaceHandle, v: VertexHandle) {
        let hend = self.face_halfedge(f);
        let mut h = self.next_halfedge(hend);

        let mut hold = self.new_edge(self.to_vertex(hend), v);

        self.set_next_halfedge(hend, hold);
        self.set_face(hold, f);

        hold = hold.opposite();

        while h != hend {
            let hnext = self.next_halfedge(h);

            let fnew = self.new_face();
            self.set_face_halfedge(fnew, h);

            let hnew = self.new_edge(self.to_vertex(h), v);

            self.set_next_halfedge(hnew, hold);
            self.set_next_halfedge(hold, h);
            self.set_next_halfedge(h, hnew);

            self.set_face(hnew, fnew);
            self.set_face(hold, fnew);
            self.set_face(h, fnew);

            hold = hnew.opposite();

            h = hnext;
        }

        self.set_next_halfedge(hold, hend);
        let hend_next = self.next_halfedge(hend);
        self.set_next_halfedge(hend_next, hold);

        self.set_face(hold, f);

        self.set_outgoing_halfedge(v, hold);
    }

    /// Fan-triangulate face `f` from a new vertex at position `p`.
    pub fn split_face_at(&mut self, f: FaceHandle, p: [T; 3]) -> VertexHandle {
        let v = self.add_vertex(p);
        self.split_face(f, v);
        v
    }

    /// Split edge `e` by vertex `v`, triangulating the incident faces. Returns the new
    /// halfedge pointing to `v` on the side of halfedge 1 of `e`.
    pub fn split_edge(&mut self, e: EdgeHandle, v: VertexHandle) -> HalfedgeHandle {
        let h0 = e.halfedge(0);
        let o0 = e.halfedge(1);

        let v2 = self.to_vertex(o0);

        let e1 = self.new_edge(v, v2);
        let t1 = e1.opposite();

        let f0 = self.face(h0);
        let f3 = self.face(o0);

        self.set_outgoing_halfedge(v, h0);
        self.set_vertex(o0, v);

        if !self.is_boundary_halfedge(h0) {
            let h1 = self.next_halfedge(h0);
            let h2 = self.next_halfedge(h1);

            let v1 = self.to_vertex(h1);

            let e0 = self.new_edge(v, v1);
            let t0 = e0.opposite();

            let f1 = self.new_face();
            self.set_face_halfedge(f0, h0);
            self.set_face_halfedge(f1, h2);

            self.set_face(h1, f0);
            self.set_face(t0, f0);
            self.set_face(h0, f0);

            self.set_face(h2, f1);
            self.set_face(t1, f1);
            self.set_face(e0, f1);

            self.set_next_halfedge(h0, h1);
            self.set_next_halfedge(h1, t0);
            self.set_next_halfedge(t0, h0);

            self.set_next_halfedge(e0, h2);
            self.set_next_halfedge(h2, t1);
            self.set_next_halfedge(t1, e0);
        } else {
            let h0_prev = self.prev_halfedge(h0);
            self.set_next_halfedge(h0_prev, t1);
            self.set_next_halfedge(t1, h0);
        }

        if !self.is_boundary_halfedge(o0) {
            let o1 = self.next_halfedge(o0);
            let o2 = self.next_halfedge(o1);

            let v3 = self.to_vertex(o1);

            let e2 = self.new_edge(v, v3);
            let t2 = e2.opposite();

            let f2 = self.new_face();
            self.set_face_halfedge(f2, o1);
            self.set_face_halfedge(f3, o0);

            self.set_face(o1, f2);
            self.set_face(t2, f2);
            self.set_face(e1, f2);

            self.set_face(o2, f3);
            self.set_face(o0, f3);
            self.set_face(e2, f3);

            self.set_next_halfedge(e1, o1);
            self.set_next_halfedge(o1, t2);
            self.set_next_halfedge(t2, e1);

            self.set_next_halfedge(o0, e2);
            self.set_next_halfedge(e2, o2);
            self.set_next_halfedge(o2, o0);
        } else {
            let o0_next = self.next_halfedge(o0);
            self.set_next_halfedge(e1, o0_next);
            self.set_next_halfedge(o0, e1);
            self.set_outgoing_halfedge(v, e1);
        }

        if self.outgoing_halfedge(v2) == h0 {
            self.set_outgoing_halfedge(v2, t1);
        }

        t1
    }

    /// Split edge `e` by a new vertex at position `p`, triangulating the incident faces.
    pub fn split_edge_at(&mut self, e: EdgeHandle, p: [T; 3]) -> HalfedgeHandle {
        let v = self.add_vertex(p);
        self.split_edge(e, v)
    }

    /// Connect the target vertices of `h0` and `h1` with a new edge, splitting their common
    /// face in two. Both halfedges must border the same valid face.
    pub fn insert_edge(
        &mut self,
        h0: HalfedgeHandle,
        h1: HalfedgeHandle,
    ) -> Result<HalfedgeHandle, TopologyError> {
        if !self.face(h0).is_valid() || self.face(h0) != self.face(h1) {
            return Err(TopologyError("halfedges must border the same face"));
        }
        if h0 == h1 || self.next_halfedge(h0) == h1 || self.next_halfedge(h1) == h0 {
            return Err(TopologyError("halfedges leave no room for a new edge"));
        }

        let v0 = self.to_vertex(h0);
        let v1 = self.to_vertex(h1);

        let h2 = self.next_halfedge(h0);
        let h3 = self.next_halfedge(h1);

        let h4 = self.new_edge(v0, v1);
        let h5 = h4.opposite();

        let f0 = self.face(h0);
        let f1 = self.new_face();

        self.set_face_halfedge(f0, h0);
        self.set_face_halfedge(f1, h1);

        self.set_next_halfedge(h0, h4);
        self.set_next_halfedge(h4, h3);
        self.set_face(h4, f0);

        self.set_next_halfedge(h1, h5);
        self.set_next_halfedge(h5, h2);
        let mut h = h2;
        loop {
            self.set_face(h, f1);
            h = self.next_halfedge(h);
            if h == h2 {
                break;
            }
        }

        Ok(h4)
    }

    /// True if edge `e` sits between two triangles and can be flipped without creating a
    /// duplicate edge.
    pub fn is_flip_ok(&self, e: EdgeHandle) -> bool {
        if self.is_boundary_edge(e) {
            return false;
        }

        let h0 = e.halfedge(0);
        let h1 = e.halfedge(1);

        let v0 = self.to_vertex(self.next_halfedge(h0));
        let v1 = self.to_vertex(self.next_halfedge(h1));

        if v0 == v1 {
            return false;
        }

        self.find_halfedge(v0, v1).is_none()
    }

    /// Rotate edge `e` inside its two incident triangles.
    pub fn flip(&mut self, e: EdgeHandle) -> Result<(), TopologyError> {
        if !self.is_flip_ok(e) {
            return Err(TopologyError("edge is not flippable"));
        }

        let a0 = e.halfedge(0);
        let b0 = e.halfedge(1);

        let a1 = self.next_halfedge(a0);
        let a2 = self.next_halfedge(a1);

        let b1 = self.next_halfedge(b0);
        let b2 = self.next_halfedge(b1);

        let va0 = self.to_vertex(a0);
        let va1 = self.to_vertex(a1);

        let vb0 = self.to_vertex(b0);
        let vb1 = self.to_vertex(b1);

        let fa = self.face(a0);
        let fb = self.face(b0);

        self.set_vertex(a0, va1);
        self.set_vertex(b0, vb1);

        self.set_next_halfedge(a0, a2);
        self.set_next_halfedge(a2, b1);
        self.set_next_halfedge(b1, a0);

        self.set_next_halfedge(b0, b2);
        self.set_next_halfedge(b2, a1);
        self.set_next_halfedge(a1, b0);

        self.set_face(a1, fb);
        self.set_face(b1, fa);

        self.set_face_halfedge(fa, a0);
        self.set_face_halfedge(fb, b0);

        if self.outgoing_halfedge(va0) == b0 {
            self.set_outgoing_halfedge(va0, a1);
        }
        if self.outgoing_halfedge(vb0) == a0 {
            self.set_outgoing_halfedge(vb0, b1);
        }

        Ok(())
    }

    /// True if collapsing halfedge `v0v1` (merging its origin into its target) preserves
    /// manifoldness. This is the one-ring link condition plus boundary checks.
    pub fn is_collapse_ok(&self, v0v1: HalfedgeHandle) -> bool {
        let v1v0 = v0v1.opposite();
        let v0 = self.to_vertex(v1v0);
        let v1 = self.to_vertex(v0v1);
        let mut vl = VertexHandle::INVALID;
        let mut vr = VertexHandle::INVALID;

        if !self.is_boundary_halfedge(v0v1) {
            let h1 = self.next_halfedge(v0v1);
            let h2 = self.next_halfedge(h1);
            vl = self.to_vertex(h1);
            if self.is_boundary_halfedge(h1.opposite()) && self.is_boundary_halfedge(h2.opposite())
            {
                return false;
            }
        }

        if !self.is_boundary_halfedge(v1v0) {
            let h1 = self.next_halfedge(v1v0);
            let h2 = self.next_halfedge(h1);
            vr = self.to_vertex(h1);
            if self.is_boundary_halfedge(h1.opposite()) && self.is_boundary_halfedge(h2.opposite())
            {
                return false;
            }
        }

        if vl == vr {
            return false;
        }

        // An interior edge between two boundary vertices would pinch the boundary together.
        if self.is_boundary_vertex(v0)
            && self.is_boundary_vertex(v1)
            && !self.is_boundary_halfedge(v0v1)
            && !self.is_boundary_halfedge(v1v0)
        {
            return false;
        }

        // Link condition: the one-rings of v0 and v1 may only share vl and vr.
        for vv in self.vertices_around(v0) {
            if vv != v1 && vv != vl && vv != vr && self.find_halfedge(vv, v1).is_some() {
                return false;
            }
        }

        true
    }

    /// Collapse halfedge `h`, merging its origin vertex into its target vertex. Degenerate
    /// two-edge faces left on either side are removed.
    pub fn collapse(&mut self, h: HalfedgeHandle) -> Result<(), TopologyError> {
        if !self.is_collapse_ok(h) {
            return Err(TopologyError("collapse would break manifoldness"));
        }

        let h0 = h;
        let h1 = self.prev_halfedge(h0);
        let o0 = h0.opposite();
        let o1 = self.next_halfedge(o0);

        self.remove_edge_helper(h0);

        if self.next_halfedge(self.next_halfedge(h1)) == h1 {
            self.remove_loop_helper(h1);
        }
        if self.next_halfedge(self.next_halfedge(o1)) == o1 {
            self.remove_loop_helper(o1);
        }

        Ok(())
    }

    /// Detach and tombstone the edge of `h`, rerouting the origin vertex's star to the target.
    fn remove_edge_helper(&mut self, h: HalfedgeHandle) {
        let hn = self.next_halfedge(h);
        let hp = self.prev_halfedge(h);

        let o = h.opposite();
        let on = self.next_halfedge(o);
        let op = self.prev_halfedge(o);

        let fh = self.face(h);
        let fo = self.face(o);

        let vh = self.to_vertex(h);
        let vo = self.to_vertex(o);

        let star: SmallVec<[HalfedgeHandle; 16]> = self.halfedges_around(vo).collect();
        for hc in star {
            self.set_vertex(hc.opposite(), vh);
        }

        self.set_next_halfedge(hp, hn);
        self.set_next_halfedge(op, on);

        if fh.is_valid() {
            self.set_face_halfedge(fh, hn);
        }
        if fo.is_valid() {
            self.set_face_halfedge(fo, on);
        }

        if self.outgoing_halfedge(vh) == o {
            self.set_outgoing_halfedge(vh, hn);
        }
        self.adjust_outgoing_halfedge(vh);
        self.set_outgoing_halfedge(vo, HalfedgeHandle::INVALID);

        self.vprops.slice_mut(&self.vertex_deleted)[vo] = true;
        self.deleted_vertices += 1;
        self.eprops.slice_mut(&self.edge_deleted)[h.edge()] = true;
        self.deleted_edges += 1;
        self.has_garbage = true;
    }

    /// Collapse the degenerate two-edge face ring containing `h` into a single edge.
    fn remove_loop_helper(&mut self, h: HalfedgeHandle) {
        let h0 = h;
        let h1 = self.next_halfedge(h0);

        let o0 = h0.opposite();
        let o1 = h1.opposite();

        let v0 = self.to_vertex(h0);
        let v1 = self.to_vertex(h1);

        let fh = self.face(h0);
        let fo = self.face(o0);

        debug_assert!(self.next_halfedge(h1) == h0 && h1 != o0);

        let o0_next = self.next_halfedge(o0);
        self.set_next_halfedge(h1, o0_next);
        let o0_prev = self.prev_halfedge(o0);
        self.set_next_halfedge(o0_prev, h1);

        self.set_face(h1, fo);

        self.set_outgoing_halfedge(v0, h1);
        self.adjust_outgoing_halfedge(v0);
        self.set_outgoing_halfedge(v1, o1);
        self.adjust_outgoing_halfedge(v1);

        if fo.is_valid() && self.face_halfedge(fo) == o0 {
            self.set_face_halfedge(fo, h1);
        }

        if fh.is_valid() {
            self.fprops.slice_mut(&self.face_deleted)[fh] = true;
            self.deleted_faces += 1;
        }
        self.eprops.slice_mut(&self.edge_deleted)[h.edge()] = true;
        self.deleted_edges += 1;
        self.has_garbage = true;
    }

    /// True if `e` separates two distinct faces that share no third vertex, so the faces can
    /// be merged.
    pub fn is_removal_ok(&self, e: EdgeHandle) -> bool {
        let h0 = e.halfedge(0);
        let h1 = e.halfedge(1);
        let v0 = self.to_vertex(h0);
        let v1 = self.to_vertex(h1);
        let f0 = self.face(h0);
        let f1 = self.face(h1);

        if !f0.is_valid() || !f1.is_valid() || f0 == f1 {
            return false;
        }

        // The faces may only touch along e; a shared third vertex would pinch the merged face.
        for v in self.vertices_of(f0) {
            if v != v0 && v != v1 && self.faces_around(v).any(|f| f == f1) {
                return false;
            }
        }

        true
    }

    /// Merge the two faces incident to `e` into one, removing `e`. Returns `false` and leaves
    /// the mesh untouched if [`HalfedgeMesh::is_removal_ok`] fails.
    pub fn remove_edge(&mut self, e: EdgeHandle) -> bool {
        if !self.is_removal_ok(e) {
            return false;
        }

        let h0 = e.halfedge(0);
        let h1 = e.halfedge(1);

        let v0 = self.to_vertex(h0);
        let v1 = self.to_vertex(h1);

        let f0 = self.face(h0);
        let f1 = self.face(h1);

        let h0_prev = self.prev_halfedge(h0);
        let h0_next = self.next_halfedge(h0);
        let h1_prev = self.prev_halfedge(h1);
        let h1_next = self.next_halfedge(h1);

        if self.outgoing_halfedge(v0) == h1 {
            self.set_outgoing_halfedge(v0, h0_next);
        }
        if self.outgoing_halfedge(v1) == h0 {
            self.set_outgoing_halfedge(v1, h1_next);
        }

        let perimeter: SmallVec<[HalfedgeHandle; 8]> = self.halfedges_of(f0).collect();
        for h in perimeter {
            self.set_face(h, f1);
        }

        self.set_next_halfedge(h1_prev, h0_next);
        self.set_next_halfedge(h0_prev, h1_next);

        if self.face_halfedge(f1) == h1 {
            self.set_face_halfedge(f1, h1_next);
        }

        self.fprops.slice_mut(&self.face_deleted)[f0] = true;
        self.deleted_faces += 1;
        self.eprops.slice_mut(&self.edge_deleted)[e] = true;
        self.deleted_edges += 1;
        self.has_garbage = true;

        true
    }

    // --- deletion ---

    /// Tombstone `v` and every face incident to it.
    pub fn delete_vertex(&mut self, v: VertexHandle) {
        if self.is_deleted_vertex(v) {
            return;
        }

        let incident: SmallVec<[FaceHandle; 8]> = self.faces_around(v).collect();
        for f in incident {
            self.delete_face(f);
        }

        if !self.is_deleted_vertex(v) {
            self.vprops.slice_mut(&self.vertex_deleted)[v] = true;
            self.deleted_vertices += 1;
            self.has_garbage = true;
        }
    }

    /// Tombstone `e` by deleting both incident faces.
    pub fn delete_edge(&mut self, e: EdgeHandle) {
        if self.is_deleted_edge(e) {
            return;
        }

        let f0 = self.face(e.halfedge(0));
        let f1 = self.face(e.halfedge(1));

        if f0.is_valid() {
            self.delete_face(f0);
        }
        if f1.is_valid() {
            self.delete_face(f1);
        }
    }

    /// Tombstone `f`, stitching the surrounding boundary and tombstoning edges and vertices
    /// left dangling.
    pub fn delete_face(&mut self, f: FaceHandle) {
        if self.is_deleted_face(f) {
            return;
        }

        self.fprops.slice_mut(&self.face_deleted)[f] = true;
        self.deleted_faces += 1;

        // Detach the perimeter; edges whose other side is already boundary die with the face.
        let mut dead_edges: SmallVec<[EdgeHandle; 8]> = SmallVec::new();
        let mut ring_vertices: SmallVec<[VertexHandle; 8]> = SmallVec::new();

        let perimeter: SmallVec<[HalfedgeHandle; 8]> = self.halfedges_of(f).collect();
        for hc in perimeter {
            self.set_face(hc, FaceHandle::INVALID);
            if self.is_boundary_halfedge(hc.opposite()) {
                dead_edges.push(hc.edge());
            }
            ring_vertices.push(self.to_vertex(hc));
        }

        for e in dead_edges {
            let h0 = e.halfedge(0);
            let v0 = self.to_vertex(h0);
            let next0 = self.next_halfedge(h0);
            let prev0 = self.prev_halfedge(h0);

            let h1 = e.halfedge(1);
            let v1 = self.to_vertex(h1);
            let next1 = self.next_halfedge(h1);
            let prev1 = self.prev_halfedge(h1);

            // Close the boundary gap left by the dead edge.
            self.set_next_halfedge(prev0, next1);
            self.set_next_halfedge(prev1, next0);

            if !self.is_deleted_edge(e) {
                self.eprops.slice_mut(&self.edge_deleted)[e] = true;
                self.deleted_edges += 1;
            }

            if self.outgoing_halfedge(v0) == h1 {
                if next0 == h1 {
                    // v0 lost its last edge.
                    if !self.is_deleted_vertex(v0) {
                        self.vprops.slice_mut(&self.vertex_deleted)[v0] = true;
                        self.deleted_vertices += 1;
                    }
                } else {
                    self.set_outgoing_halfedge(v0, next0);
                }
            }

            if self.outgoing_halfedge(v1) == h0 {
                if next1 == h0 {
                    if !self.is_deleted_vertex(v1) {
                        self.vprops.slice_mut(&self.vertex_deleted)[v1] = true;
                        self.deleted_vertices += 1;
                    }
                } else {
                    self.set_outgoing_halfedge(v1, next1);
                }
            }
        }

        for v in ring_vertices {
            self.adjust_outgoing_halfedge(v);
        }

        self.has_garbage = true;
    }

    // --- garbage collection ---

    /// Compact all arenas by removing tombstoned elements.
    ///
    /// Live elements are moved into the gaps left by tombstones, carrying every property
    /// column (user properties included) with them, and all stored connectivity handles are
    /// remapped. Handles are not generational: any handle held across this call may afterwards
    /// address a different live element. A call on a garbage-free mesh is a no-op.
    pub fn garbage_collection(&mut self) {
        if !self.has_garbage {
            return;
        }

        let mut nv = self.vertices_size();
        let mut ne = self.edges_size();
        let mut nh = self.halfedges_size();
        let mut nf = self.faces_size();

        // Temporary remap columns. Initialized to the identity, they ride along with the
        // partition swaps below, after which indexing one by an old handle yields the
        // element's new position.
        let vmap = self
            .vprops
            .add("v:garbage-collection", VertexHandle::INVALID)
            .expect("reserved name");
        let hmap = self
            .hprops
            .add("h:garbage-collection", HalfedgeHandle::INVALID)
            .expect("reserved name");
        let fmap = self
            .fprops
            .add("f:garbage-collection", FaceHandle::INVALID)
            .expect("reserved name");

        for (i, m) in self.vprops.slice_mut(&vmap).iter_mut().enumerate() {
            *m = VertexHandle::new(i as u32);
        }
        for (i, m) in self.hprops.slice_mut(&hmap).iter_mut().enumerate() {
            *m = HalfedgeHandle::new(i as u32);
        }
        for (i, m) in self.fprops.slice_mut(&fmap).iter_mut().enumerate() {
            *m = FaceHandle::new(i as u32);
        }

        // Two-pointer partition per kind: live elements to the front, tombstones to the back.
        if nv > 0 {
            let mut i0 = 0usize;
            let mut i1 = nv - 1;
            loop {
                {
                    let deleted = self.vprops.slice(&self.vertex_deleted);
                    while !deleted[i0] && i0 < i1 {
                        i0 += 1;
                    }
                    while deleted[i1] && i0 < i1 {
                        i1 -= 1;
                    }
                }
                if i0 >= i1 {
                    break;
                }
                self.vprops.swap_elements(i0, i1);
            }
            nv = if self.vprops.slice(&self.vertex_deleted)[i0] {
                i0
            } else {
                i0 + 1
            };
        }

        if ne > 0 {
            let mut i0 = 0usize;
            let mut i1 = ne - 1;
            loop {
                {
                    let deleted = self.eprops.slice(&self.edge_deleted);
                    while !deleted[i0] && i0 < i1 {
                        i0 += 1;
                    }
                    while deleted[i1] && i0 < i1 {
                        i1 -= 1;
                    }
                }
                if i0 >= i1 {
                    break;
                }
                // Edges move together with their halfedge pair.
                self.eprops.swap_elements(i0, i1);
                self.hprops.swap_elements(2 * i0, 2 * i1);
                self.hprops.swap_elements(2 * i0 + 1, 2 * i1 + 1);
            }
            ne = if self.eprops.slice(&self.edge_deleted)[i0] {
                i0
            } else {
                i0 + 1
            };
            nh = 2 * ne;
        }

        if nf > 0 {
            let mut i0 = 0usize;
            let mut i1 = nf - 1;
            loop {
                {
                    let deleted = self.fprops.slice(&self.face_deleted);
                    while !deleted[i0] && i0 < i1 {
                        i0 += 1;
                    }
                    while deleted[i1] && i0 < i1 {
                        i1 -= 1;
                    }
                }
                if i0 >= i1 {
                    break;
                }
                self.fprops.swap_elements(i0, i1);
            }
            nf = if self.fprops.slice(&self.face_deleted)[i0] {
                i0
            } else {
                i0 + 1
            };
        }

        // Remap stored handles of the surviving elements.
        for i in 0..nv {
            let v = VertexHandle::new(i as u32);
            if !self.is_isolated(v) {
                let h = self.outgoing_halfedge(v);
                let h = self.hprops.slice(&hmap)[h];
                self.set_outgoing_halfedge(v, h);
            }
        }

        for i in 0..nh {
            let h = HalfedgeHandle::new(i as u32);
            let v = self.vprops.slice(&vmap)[self.to_vertex(h)];
            self.set_vertex(h, v);
            let next = self.hprops.slice(&hmap)[self.next_halfedge(h)];
            self.set_next_halfedge(h, next);
            if !self.is_boundary_halfedge(h) {
                let f = self.fprops.slice(&fmap)[self.face(h)];
                self.set_face(h, f);
            }
        }

        for i in 0..nf {
            let f = FaceHandle::new(i as u32);
            let h = self.hprops.slice(&hmap)[self.face_halfedge(f)];
            self.set_face_halfedge(f, h);
        }

        self.vprops.remove(&vmap);
        self.hprops.remove(&hmap);
        self.fprops.remove(&fmap);

        self.vprops.resize(nv);
        self.vprops.shrink_to_fit();
        self.hprops.resize(nh);
        self.hprops.shrink_to_fit();
        self.eprops.resize(ne);
        self.eprops.shrink_to_fit();
        self.fprops.resize(nf);
        self.fprops.shrink_to_fit();

        self.deleted_vertices = 0;
        self.deleted_edges = 0;
        self.deleted_faces = 0;
        self.has_garbage = false;
    }

    // --- property API ---

    element_property_api!(
        "vertex",
        vprops,
        VertexProperty,
        add_vertex_property,
        get_vertex_property,
        vertex_property,
        remove_vertex_property,
        has_vertex_property,
        vertex_property_names,
        vertex_property_slice,
        vertex_property_slice_mut
    );

    element_property_api!(
        "halfedge",
        hprops,
        HalfedgeProperty,
        add_halfedge_property,
        get_halfedge_property,
        halfedge_property,
        remove_halfedge_property,
        has_halfedge_property,
        halfedge_property_names,
        halfedge_property_slice,
        halfedge_property_slice_mut
    );

    element_property_api!(
        "edge",
        eprops,
        EdgeProperty,
        add_edge_property,
        get_edge_property,
        edge_property,
        remove_edge_property,
        has_edge_property,
        edge_property_names,
        edge_property_slice,
        edge_property_slice_mut
    );

    element_property_api!(
        "face",
        fprops,
        FaceProperty,
        add_face_property,
        get_face_property,
        face_property,
        remove_face_property,
        has_face_property,
        face_property_names,
        face_property_slice,
        face_property_slice_mut
    );
}

impl<T: Real> ElementSet<VertexHandle> for HalfedgeMesh<T> {
    fn element_count(&self) -> usize {
        self.vertices_size()
    }
    fn element_deleted(&self, h: VertexHandle) -> bool {
        self.is_deleted_vertex(h)
    }
    fn has_garbage(&self) -> bool {
        self.has_garbage
    }
}

impl<T: Real> ElementSet<HalfedgeHandle> for HalfedgeMesh<T> {
    fn element_count(&self) -> usize {
        self.halfedges_size()
    }
    fn element_deleted(&self, h: HalfedgeHandle) -> bool {
        self.is_deleted_halfedge(h)
    }
    fn has_garbage(&self) -> bool {
        self.has_garbage
    }
}

impl<T: Real> ElementSet<EdgeHandle> for HalfedgeMesh<T> {
    fn element_count(&self) -> usize {
        self.edges_size()
    }
    fn element_deleted(&self, h: EdgeHandle) -> bool {
        self.is_deleted_edge(h)
    }
    fn has_garbage(&self) -> bool {
        self.has_garbage
    }
}

impl<T: Real> ElementSet<FaceHandle> for HalfedgeMesh<T> {
    fn element_count(&self) -> usize {
        self.faces_size()
    }
    fn element_deleted(&self, h: FaceHandle) -> bool {
        self.is_deleted_face(h)
    }
    fn has_garbage(&self) -> bool {
        self.has_garbage
    }
}

impl<T: Real> HalfedgeNavigation for HalfedgeMesh<T> {
    #[inline]
    fn outgoing_halfedge(&self, v: VertexHandle) -> HalfedgeHandle {
        HalfedgeMesh::outgoing_halfedge(self, v)
    }
    #[inline]
    fn to_vertex(&self, h: HalfedgeHandle) -> VertexHandle {
        HalfedgeMesh::to_vertex(self, h)
    }
    #[inline]
    fn next_halfedge(&self, h: HalfedgeHandle) -> HalfedgeHandle {
        HalfedgeMesh::next_halfedge(self, h)
    }
    #[inline]
    fn prev_halfedge(&self, h: HalfedgeHandle) -> HalfedgeHandle {
        HalfedgeMesh::prev_halfedge(self, h)
    }
}

impl<T: Real> FaceNavigation for HalfedgeMesh<T> {
    #[inline]
    fn halfedge_face(&self, h: HalfedgeHandle) -> FaceHandle {
        HalfedgeMesh::face(self, h)
    }
    #[inline]
    fn face_halfedge(&self, f: FaceHandle) -> HalfedgeHandle {
        HalfedgeMesh::face_halfedge(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Mesh = HalfedgeMesh<f64>;

    fn triangle() -> (Mesh, [VertexHandle; 3], FaceHandle) {
        let mut mesh = Mesh::new();
        let v0 = mesh.add_vertex([0.0, 0.0, 0.0]);
        let v1 = mesh.add_vertex([1.0, 0.0, 0.0]);
        let v2 = mesh.add_vertex([0.0, 1.0, 0.0]);
        let f = mesh.add_triangle(v0, v1, v2).unwrap();
        (mesh, [v0, v1, v2], f)
    }

    // Two triangles sharing the diagonal v0-v2 of a unit quad.
    fn two_triangles() -> (Mesh, [VertexHandle; 4]) {
        let mut mesh = Mesh::new();
        let v0 = mesh.add_vertex([0.0, 0.0, 0.0]);
        let v1 = mesh.add_vertex([1.0, 0.0, 0.0]);
        let v2 = mesh.add_vertex([1.0, 1.0, 0.0]);
        let v3 = mesh.add_vertex([0.0, 1.0, 0.0]);
        mesh.add_triangle(v0, v1, v2).unwrap();
        mesh.add_triangle(v0, v2, v3).unwrap();
        (mesh, [v0, v1, v2, v3])
    }

    #[test]
    fn triangle_counts_and_ring() {
        let (mesh, [v0, v1, v2], f) = triangle();

        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.edge_count(), 3);
        assert_eq!(mesh.halfedge_count(), 6);
        assert_eq!(mesh.face_count(), 1);
        assert!(mesh.is_triangle_mesh());

        // The inner ring closes in exactly three steps.
        let h0 = mesh.face_halfedge(f);
        let h1 = mesh.next_halfedge(h0);
        let h2 = mesh.next_halfedge(h1);
        assert_eq!(mesh.next_halfedge(h2), h0);
        assert_eq!(mesh.prev_halfedge(h0), h2);

        // All three vertices are on the boundary of a lone triangle.
        for v in [v0, v1, v2] {
            assert!(mesh.is_boundary_vertex(v));
            assert!(mesh.is_manifold(v));
            assert_eq!(mesh.valence(v), 2);
        }
        assert!(mesh.is_boundary_face(f));
        assert_eq!(mesh.face_valence(f), 3);
    }

    #[test]
    fn halfedge_pairing_invariants() {
        let (mesh, _) = two_triangles();
        for h in mesh.halfedges() {
            assert_eq!(h.opposite().opposite(), h);
            assert_eq!(h.edge(), h.opposite().edge());
            assert_eq!(mesh.from_vertex(h), mesh.to_vertex(h.opposite()));
            // prev and next are mutually inverse.
            assert_eq!(mesh.next_halfedge(mesh.prev_halfedge(h)), h);
            assert_eq!(mesh.prev_halfedge(mesh.next_halfedge(h)), h);
        }
    }

    #[test]
    fn boundary_priming() {
        let (mesh, ring) = two_triangles();
        for v in ring {
            let h = mesh.outgoing_halfedge(v);
            assert!(h.is_valid());
            assert!(mesh.is_boundary_halfedge(h));
        }
    }

    #[test]
    fn add_face_rejects_without_mutating() {
        let (mut mesh, [v0, v1, v2], _) = triangle();
        let nv = mesh.vertices_size();
        let ne = mesh.edges_size();
        let nf = mesh.faces_size();

        // The halfedge v0 -> v1 already carries a face.
        let v3 = mesh.add_vertex([0.0, 0.0, 1.0]);
        assert_eq!(mesh.add_triangle(v0, v1, v3), None);
        // Same ring twice is a complex-edge conflict too.
        assert_eq!(mesh.add_triangle(v0, v1, v2), None);

        assert_eq!(mesh.vertices_size(), nv + 1);
        assert_eq!(mesh.edges_size(), ne);
        assert_eq!(mesh.faces_size(), nf);
        assert!(!mesh.has_garbage());
    }

    #[test]
    fn add_face_rejects_complex_vertex() {
        let (mut mesh, [v0, v1, v2], _) = triangle();
        // Close a fan around v1 so it becomes interior, then try to attach another face to it.
        let v3 = mesh.add_vertex([2.0, 1.0, 0.0]);
        mesh.add_triangle(v2, v1, v3).unwrap();
        let v4 = mesh.add_vertex([2.0, -1.0, 0.0]);
        mesh.add_triangle(v1, v4, v3).unwrap();
        let v5 = mesh.add_vertex([0.0, -1.0, 0.0]);
        mesh.add_triangle(v0, v5, v1).unwrap();
        mesh.add_triangle(v1, v5, v4).unwrap();
        assert!(!mesh.is_boundary_vertex(v1));

        let v6 = mesh.add_vertex([5.0, 5.0, 5.0]);
        let v7 = mesh.add_vertex([6.0, 5.0, 5.0]);
        assert_eq!(mesh.add_triangle(v1, v6, v7), None);
    }

    #[test]
    fn find_halfedge_and_edge() {
        let (mesh, [v0, v1, v2], _) = triangle();
        let h = mesh.find_halfedge(v0, v1).unwrap();
        assert_eq!(mesh.from_vertex(h), v0);
        assert_eq!(mesh.to_vertex(h), v1);
        assert_eq!(mesh.find_halfedge(v1, v0).unwrap(), h.opposite());
        assert!(mesh.find_edge(v2, v0).is_some());

        let (mesh2, ring) = two_triangles();
        // v1 and v3 sit across the diagonal and are not connected.
        assert_eq!(mesh2.find_halfedge(ring[1], ring[3]), None);
    }

    #[test]
    fn vertex_circulators_cover_one_ring() {
        let (mesh, [v0, v1, v2, v3]) = two_triangles();

        let ring: Vec<_> = mesh.vertices_around(v0).collect();
        assert_eq!(ring.len(), 3);
        for v in [v1, v2, v3] {
            assert!(ring.contains(&v));
        }
        assert_eq!(mesh.edges_around(v0).count(), 3);
        assert_eq!(mesh.halfedges_around(v0).count(), 3);
        // v0 touches both triangles.
        assert_eq!(mesh.faces_around(v0).count(), 2);
        // v1 only touches the first.
        assert_eq!(mesh.faces_around(v1).count(), 1);
    }

    #[test]
    fn isolated_vertex_circulates_nothing() {
        let mut mesh = Mesh::new();
        let v = mesh.add_vertex([0.0; 3]);
        assert!(mesh.is_isolated(v));
        assert_eq!(mesh.vertices_around(v).count(), 0);
        assert_eq!(mesh.faces_around(v).count(), 0);
        assert_eq!(mesh.valence(v), 0);
    }

    #[test]
    fn face_circulators_walk_perimeter() {
        let (mesh, [v0, v1, v2, v3]) = two_triangles();
        let f = mesh.find_halfedge(v0, v1).map(|h| mesh.face(h)).unwrap();
        let verts: Vec<_> = mesh.vertices_of(f).collect();
        assert_eq!(verts.len(), 3);
        for v in [v0, v1, v2] {
            assert!(verts.contains(&v));
        }
        assert!(!verts.contains(&v3));
        assert_eq!(mesh.halfedges_of(f).count(), 3);
    }

    #[test]
    fn flip_swaps_diagonal() {
        let (mut mesh, [v0, v1, v2, v3]) = two_triangles();
        let e = mesh.find_edge(v0, v2).unwrap();

        assert!(mesh.is_flip_ok(e));
        mesh.flip(e).unwrap();

        assert!(mesh.find_edge(v0, v2).is_none());
        assert!(mesh.find_edge(v1, v3).is_some());
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.edge_count(), 5);
        assert!(mesh.is_triangle_mesh());

        // Flipping back restores the original diagonal.
        assert!(mesh.is_flip_ok(e));
        mesh.flip(e).unwrap();
        assert!(mesh.find_edge(v0, v2).is_some());
    }

    #[test]
    fn flip_rejects_boundary_edge() {
        let (mut mesh, [v0, v1, _], _) = triangle();
        let e = mesh.find_edge(v0, v1).unwrap();
        assert!(!mesh.is_flip_ok(e));
        assert!(mesh.flip(e).is_err());
    }

    #[test]
    fn collapse_rejected_on_lone_triangle() {
        let (mut mesh, [v0, v1, _], _) = triangle();
        let h = mesh.find_halfedge(v0, v1).unwrap();
        assert!(!mesh.is_collapse_ok(h));
        assert_eq!(
            mesh.collapse(h),
            Err(TopologyError("collapse would break manifoldness"))
        );
        // Nothing was tombstoned by the failed attempt.
        assert!(!mesh.has_garbage());
        assert_eq!(mesh.vertex_count(), 3);
    }

    #[test]
    fn collapse_in_triangle_strip() {
        // A 2x3 strip of triangles; collapsing an interior-ish halfedge keeps a valid mesh.
        let mut mesh = Mesh::new();
        let mut top = Vec::new();
        let mut bottom = Vec::new();
        for i in 0..4 {
            bottom.push(mesh.add_vertex([i as f64, 0.0, 0.0]));
            top.push(mesh.add_vertex([i as f64, 1.0, 0.0]));
        }
        for i in 0..3 {
            mesh.add_triangle(bottom[i], bottom[i + 1], top[i]).unwrap();
            mesh.add_triangle(bottom[i + 1], top[i + 1], top[i]).unwrap();
        }
        assert_eq!(mesh.face_count(), 6);

        let h = mesh.find_halfedge(bottom[1], bottom[2]).unwrap();
        assert!(mesh.is_collapse_ok(h));
        mesh.collapse(h).unwrap();

        assert!(mesh.has_garbage());
        assert_eq!(mesh.vertex_count(), 7);
        mesh.garbage_collection();
        assert_eq!(mesh.vertices_size(), 7);
        assert!(mesh.is_triangle_mesh());
        for v in mesh.vertices() {
            assert!(mesh.is_manifold(v));
        }
    }

    #[test]
    fn remove_edge_merges_faces() {
        let (mut mesh, [v0, v1, v2, v3]) = two_triangles();
        let diag = mesh.find_edge(v0, v2).unwrap();
        let outer = mesh.find_edge(v0, v1).unwrap();

        assert!(!mesh.is_removal_ok(outer));
        assert!(!mesh.remove_edge(outer));

        assert!(mesh.is_removal_ok(diag));
        assert!(mesh.remove_edge(diag));

        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.edge_count(), 4);
        let f = mesh.faces().next().unwrap();
        assert_eq!(mesh.face_valence(f), 4);
        assert!(mesh.is_quad_mesh());
        for v in [v0, v1, v2, v3] {
            assert_eq!(mesh.valence(v), 2);
        }
    }

    #[test]
    fn insert_vertex_turns_triangle_into_quad() {
        let (mut mesh, [v0, v1, _], f) = triangle();
        let e = mesh.find_edge(v0, v1).unwrap();
        let w = mesh.add_vertex([0.5, 0.0, 0.0]);
        mesh.insert_vertex(e, w);

        assert_eq!(mesh.face_valence(f), 4);
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.edge_count(), 4);
        assert_eq!(mesh.valence(w), 2);
        assert!(mesh.find_halfedge(v0, w).is_some());
        assert!(mesh.find_halfedge(w, v1).is_some());
        assert!(mesh.find_halfedge(v0, v1).is_none());
    }

    #[test]
    fn split_face_fans_from_center() {
        let (mut mesh, _, f) = triangle();
        let c = mesh.split_face_at(f, [0.3, 0.3, 0.0]);

        assert_eq!(mesh.face_count(), 3);
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.edge_count(), 6);
        assert!(mesh.is_triangle_mesh());
        assert!(!mesh.is_boundary_vertex(c));
        assert_eq!(mesh.valence(c), 3);
        assert_eq!(mesh.faces_around(c).count(), 3);
    }

    #[test]
    fn split_edge_triangulates_both_sides() {
        let (mut mesh, [v0, _, v2, _]) = two_triangles();
        let diag = mesh.find_edge(v0, v2).unwrap();
        mesh.split_edge_at(diag, [0.5, 0.5, 0.0]);

        assert_eq!(mesh.vertex_count(), 5);
        assert_eq!(mesh.face_count(), 4);
        assert_eq!(mesh.edge_count(), 8);
        assert!(mesh.is_triangle_mesh());
    }

    #[test]
    fn split_boundary_edge() {
        let (mut mesh, [v0, v1, _], _) = triangle();
        let e = mesh.find_edge(v0, v1).unwrap();
        mesh.split_edge_at(e, [0.5, 0.0, 0.0]);

        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.edge_count(), 5);
        assert!(mesh.is_triangle_mesh());
    }

    #[test]
    fn insert_edge_splits_face() {
        let (mut mesh, [v0, v1, v2, v3]) = two_triangles();
        let diag = mesh.find_edge(v0, v2).unwrap();
        assert!(mesh.remove_edge(diag));

        let h0 = mesh.find_halfedge(v0, v1).unwrap();
        let h1 = mesh.find_halfedge(v2, v3).unwrap();
        let h = mesh.insert_edge(h0, h1).unwrap();
        assert_eq!(mesh.from_vertex(h), v1);
        assert_eq!(mesh.to_vertex(h), v3);
        assert_eq!(mesh.face_count(), 2);
        assert!(mesh.is_triangle_mesh());

        // Halfedges on different faces are rejected.
        let g0 = mesh.find_halfedge(v0, v1).unwrap();
        let g1 = mesh.find_halfedge(v1, v2).unwrap();
        assert_ne!(mesh.face(g0), mesh.face(g1));
        assert!(mesh.insert_edge(g0, g1).is_err());
    }

    #[test]
    fn delete_face_leaves_boundary() {
        let (mut mesh, [v0, _, v2, _]) = two_triangles();
        let f = mesh
            .find_halfedge(v0, v2)
            .map(|h| mesh.face(h))
            .unwrap();
        mesh.delete_face(f);

        // The two edges shared only with the boundary die with the face, and v3 with them.
        assert!(mesh.has_garbage());
        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.edge_count(), 3);
        assert_eq!(mesh.vertex_count(), 3);
        for v in mesh.vertices() {
            assert!(mesh.is_boundary_vertex(v));
        }

        mesh.garbage_collection();
        assert_eq!(mesh.faces_size(), 1);
        assert_eq!(mesh.edges_size(), 3);
        assert_eq!(mesh.vertices_size(), 3);
        assert!(mesh.is_triangle_mesh());
    }

    #[test]
    fn delete_vertex_removes_star() {
        // v0 touches both triangles, so deleting it takes the whole mesh down: every other
        // vertex loses all of its edges in the process.
        let (mut mesh, [v0, ..]) = two_triangles();
        mesh.delete_vertex(v0);
        assert_eq!(mesh.face_count(), 0);
        assert_eq!(mesh.vertex_count(), 0);
        mesh.garbage_collection();
        assert!(mesh.is_empty());
        assert_eq!(mesh.edges_size(), 0);
        assert_eq!(mesh.halfedges_size(), 0);
    }

    #[test]
    fn garbage_collection_preserves_live_data() {
        let (mut mesh, [v0, v1, v2, v3]) = two_triangles();
        let id = mesh.add_vertex_property::<u32>("v:id", 0).unwrap();
        for (i, slot) in mesh
            .vertex_property_slice_mut(&id)
            .iter_mut()
            .enumerate()
        {
            *slot = 100 + i as u32;
        }
        let pos1 = mesh.position(v1);

        // Deleting the diagonal's faces tombstones v0 indirectly only if it loses all edges;
        // here we delete a vertex outright.
        mesh.delete_vertex(v3);
        assert!(mesh.has_garbage());
        let live_before = mesh.vertex_count();

        mesh.garbage_collection();
        assert!(!mesh.has_garbage());
        assert_eq!(mesh.vertices_size(), live_before);

        // Live vertices kept their user data and positions, wherever they moved.
        let ids: Vec<u32> = mesh.vertex_property_slice(&id).to_vec();
        for i in [v0, v1, v2].iter().map(|v| v.idx()) {
            assert!(ids.contains(&(100 + i as u32)));
        }
        let positions = mesh.positions();
        assert!(positions.iter().any(|&p| p == pos1));

        // Connectivity still holds up.
        for h in mesh.halfedges() {
            assert!(mesh.is_valid_vertex(mesh.to_vertex(h)));
            assert!(mesh.is_valid_halfedge(mesh.next_halfedge(h)));
        }

        // A second pass with no new deletions is a no-op.
        let before = mesh.vertices_size();
        mesh.garbage_collection();
        assert_eq!(mesh.vertices_size(), before);
    }

    #[test]
    fn garbage_collection_stress() {
        use rand::prelude::*;

        let mut rng = rand::rng();
        let mut mesh = Mesh::new();

        // A 6x6 vertex grid of triangles.
        let n = 6usize;
        let mut grid = Vec::new();
        for j in 0..n {
            for i in 0..n {
                grid.push(mesh.add_vertex([i as f64, j as f64, 0.0]));
            }
        }
        for j in 0..n - 1 {
            for i in 0..n - 1 {
                let a = grid[j * n + i];
                let b = grid[j * n + i + 1];
                let c = grid[(j + 1) * n + i + 1];
                let d = grid[(j + 1) * n + i];
                mesh.add_triangle(a, b, c).unwrap();
                mesh.add_triangle(a, c, d).unwrap();
            }
        }

        for _ in 0..10 {
            let nf = mesh.faces_size();
            let f = FaceHandle::new(rng.random_range(0..nf) as u32);
            if !mesh.is_deleted_face(f) {
                mesh.delete_face(f);
            }
        }

        let (vc, ec, fc) = (mesh.vertex_count(), mesh.edge_count(), mesh.face_count());
        mesh.garbage_collection();
        assert_eq!(mesh.vertices_size(), vc);
        assert_eq!(mesh.edges_size(), ec);
        assert_eq!(mesh.faces_size(), fc);
        assert_eq!(mesh.halfedges_size(), 2 * ec);

        for h in mesh.halfedges() {
            assert!(mesh.is_valid_vertex(mesh.to_vertex(h)));
            assert_eq!(mesh.next_halfedge(mesh.prev_halfedge(h)), h);
            let f = mesh.face(h);
            if f.is_valid() {
                assert!(mesh.is_valid_face(f));
            }
        }
        for f in mesh.faces() {
            assert_eq!(mesh.face(mesh.face_halfedge(f)), f);
        }
        for v in mesh.vertices() {
            if !mesh.is_isolated(v) {
                assert_eq!(mesh.from_vertex(mesh.outgoing_halfedge(v)), v);
            }
        }
    }

    #[test]
    fn clone_is_deep() {
        let (mut mesh, [v0, ..]) = two_triangles();
        let copy = mesh.clone();
        mesh.position_mut(v0)[0] = 42.0;
        assert_eq!(copy.position(v0)[0], 0.0);
        assert_eq!(copy.vertex_count(), 4);
        assert_eq!(copy.face_count(), 2);
    }

    #[test]
    fn clear_resets_everything() {
        let (mut mesh, _) = two_triangles();
        mesh.add_vertex_property::<u32>("v:id", 0).unwrap();
        mesh.clear();
        assert!(mesh.is_empty());
        assert_eq!(mesh.halfedges_size(), 0);
        assert!(!mesh.has_vertex_property("v:id"));
        // System columns are re-registered.
        assert!(mesh.has_vertex_property("v:point"));
        assert!(mesh.has_vertex_property("v:connectivity"));
        let v = mesh.add_vertex([1.0, 2.0, 3.0]);
        assert_eq!(mesh.position(v), [1.0, 2.0, 3.0]);
    }

    #[test]
    fn new_vertex_and_reserve() {
        let mut mesh = Mesh::new();
        mesh.reserve(16, 32, 16);
        let v = mesh.new_vertex();
        assert!(v.is_valid());
        assert_eq!(mesh.vertices_size(), 1);
        assert_eq!(mesh.position(v), [0.0; 3]);
        mesh.free_memory();
        assert_eq!(mesh.vertices_size(), 1);
    }
}
