//!
//! Wireframe graph module. A halfedge-based edge container without faces: vertices plus
//! oriented edge pairs whose `next`/`prev` links form closed walks. Unlike
//! [`HalfedgeMesh`](super::halfedge::HalfedgeMesh), vertices may have any number of incident
//! edges and duplicate edges are refused rather than represented.
//!

use smallvec::SmallVec;

use crate::handle::{EdgeHandle, HalfedgeHandle, VertexHandle, INVALID_INDEX};
use crate::props::{
    EdgeProperty, Error, HalfedgeProperty, Property, PropertySet, PropertyValue, VertexProperty,
};
use crate::Real;

use super::circulators::{
    EdgeAroundVertexCirculator, HalfedgeAroundVertexCirculator, HalfedgeNavigation,
    VertexAroundVertexCirculator,
};
use super::connectivity::{HalfedgeConnectivity, VertexConnectivity};
use super::halfedge::TopologyError;
use super::iter::{ElementIter, ElementSet};

/// A wireframe graph of vertices and edges.
///
/// Edges are stored as halfedge pairs just like in the mesh kernel, and the per-halfedge
/// connectivity type is shared, but the `face` field stays permanently invalid. Around each
/// vertex, `next(incoming)` is the following outgoing halfedge, so the vertex circulators work
/// unchanged.
#[derive(Clone, Debug)]
pub struct Graph<T: Real> {
    vprops: PropertySet,
    hprops: PropertySet,
    eprops: PropertySet,

    vertex_points: Property<[T; 3]>,
    vertex_connectivity: Property<VertexConnectivity>,
    halfedge_connectivity: Property<HalfedgeConnectivity>,

    vertex_deleted: Property<bool>,
    edge_deleted: Property<bool>,

    deleted_vertices: usize,
    deleted_edges: usize,
    has_garbage: bool,
}

impl<T: Real> Default for Graph<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Real> Graph<T> {
    /// Construct an empty graph.
    pub fn new() -> Self {
        let mut vprops = PropertySet::new();
        let mut hprops = PropertySet::new();
        let mut eprops = PropertySet::new();

        let vertex_points = vprops.add("v:point", [T::zero(); 3]).expect("system column");
        let vertex_connectivity = vprops
            .add("v:connectivity", VertexConnectivity::default())
            .expect("system column");
        let halfedge_connectivity = hprops
            .add("h:connectivity", HalfedgeConnectivity::default())
            .expect("system column");
        let vertex_deleted = vprops.add("v:deleted", false).expect("system column");
        let edge_deleted = eprops.add("e:deleted", false).expect("system column");

        Graph {
            vprops,
            hprops,
            eprops,
            vertex_points,
            vertex_connectivity,
            halfedge_connectivity,
            vertex_deleted,
            edge_deleted,
            deleted_vertices: 0,
            deleted_edges: 0,
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
    }

    /// Reserve capacity for the given numbers of vertices and edges.
    pub fn reserve(&mut self, nvertices: usize, nedges: usize) {
        self.vprops.reserve(nvertices);
        self.hprops.reserve(2 * nedges);
        self.eprops.reserve(nedges);
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

    /// True if the graph has no live vertices.
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

    /// True if the walk through `v`'s primed halfedge immediately turns around, that is the
    /// edge dead-ends right after `v`.
    #[inline]
    pub fn is_boundary_vertex(&self, v: VertexHandle) -> bool {
        let h = self.outgoing_halfedge(v);
        h.is_valid() && self.next_halfedge(h) == h.opposite()
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

    /// The next halfedge within the walk of `h`.
    #[inline]
    pub fn next_halfedge(&self, h: HalfedgeHandle) -> HalfedgeHandle {
        self.hconn()[h].next
    }

    /// The previous halfedge within the walk of `h`.
    #[inline]
    pub fn prev_halfedge(&self, h: HalfedgeHandle) -> HalfedgeHandle {
        self.hconn()[h].prev
    }

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

    /// Number of edges incident to `v`.
    pub fn valence(&self, v: VertexHandle) -> usize {
        self.vertices_around(v).count()
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

    /// Add an isolated vertex at position `p`.
    pub fn add_vertex(&mut self, p: [T; 3]) -> VertexHandle {
        let v = self.new_vertex();
        if v.is_valid() {
            self.vprops.slice_mut(&self.vertex_points)[v.idx()] = p;
        }
        v
    }

    /// Allocate an edge from `start` to `end` whose two halfedges form their own closed
    /// two-step walk. Returns halfedge `start -> end`, or the invalid handle if the index
    /// space is exhausted.
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
        self.set_next_halfedge(h0, h1);
        self.set_next_halfedge(h1, h0);
        h0
    }

    /// Connect `start` and `end` with an edge, splicing it into the walks at both endpoints.
    /// If the two vertices are already connected, the existing halfedge is returned instead.
    pub fn add_edge(&mut self, start: VertexHandle, end: VertexHandle) -> HalfedgeHandle {
        debug_assert!(start != end);

        if let Some(h) = self.find_halfedge(start, end) {
            return h;
        }

        let h = self.new_edge(start, end);
        if !h.is_valid() {
            return h;
        }
        let o = h.opposite();

        let start_out = self.outgoing_halfedge(start);
        if start_out.is_valid() {
            let in_0 = start_out.opposite();
            let out_next_0 = self.next_halfedge(in_0);
            self.set_next_halfedge(in_0, h);
            self.set_next_halfedge(o, out_next_0);
        }
        self.set_outgoing_halfedge(start, h);

        let out_1 = self.outgoing_halfedge(end);
        if out_1.is_valid() {
            let in_prev_1 = self.prev_halfedge(out_1);
            self.set_next_halfedge(h, out_1);
            self.set_next_halfedge(in_prev_1, o);
        }
        self.set_outgoing_halfedge(end, o);

        h
    }

    /// Split the halfedge `h0` (and its opposite) by vertex `v`. Returns the new halfedge
    /// from `v` to the original target.
    pub fn insert_vertex_on(&mut self, h0: HalfedgeHandle, v: VertexHandle) -> HalfedgeHandle {
        let h1 = h0.opposite();
        let end = self.to_vertex(h0);
        let h0_next = self.next_halfedge(h0);
        let h1_prev = self.prev_halfedge(h1);

        let h2 = self.new_edge(v, end);
        if !h2.is_valid() {
            return h2;
        }
        let h3 = h2.opposite();

        self.set_next_halfedge(h0, h2);
        self.set_next_halfedge(h3, h1);

        // At the far endpoint, h2 arrives where h0 used to and h3 leaves where h1 used to.
        // When the walk dead-ends there (next(h0) was h1), the two meet directly.
        if h0_next == h1 {
            self.set_next_halfedge(h2, h3);
        } else {
            self.set_next_halfedge(h2, h0_next);
            self.set_next_halfedge(h1_prev, h3);
        }

        self.set_vertex(h0, v);
        self.set_outgoing_halfedge(v, h2);

        h2
    }

    /// Split edge `e` by vertex `v`.
    pub fn insert_vertex(&mut self, e: EdgeHandle, v: VertexHandle) -> HalfedgeHandle {
        self.insert_vertex_on(e.halfedge(0), v)
    }

    /// Split edge `e` by a new vertex at position `p`.
    pub fn insert_vertex_at(&mut self, e: EdgeHandle, p: [T; 3]) -> HalfedgeHandle {
        let v = self.add_vertex(p);
        self.insert_vertex_on(e.halfedge(0), v)
    }

    // --- Euler operators ---

    /// True if collapsing `h` (merging its origin into its target) creates no duplicate edge.
    pub fn is_collapse_ok(&self, h: HalfedgeHandle) -> bool {
        if !self.is_valid_halfedge(h) || self.is_deleted_edge(h.edge()) {
            return false;
        }

        let o = h.opposite();
        let v0 = self.to_vertex(h);
        let v1 = self.to_vertex(o);

        // Merging two already connected neighborhoods would duplicate an edge.
        for neighbor in self.vertices_around(v1) {
            if neighbor != v0 && self.find_edge(v0, neighbor).is_some() {
                return false;
            }
        }

        true
    }

    /// Collapse halfedge `h`, merging its origin vertex into its target vertex.
    pub fn collapse(&mut self, h: HalfedgeHandle) -> Result<(), TopologyError> {
        if !self.is_collapse_ok(h) {
            return Err(TopologyError("collapse would create a duplicate edge"));
        }

        let o = h.opposite();
        let v0 = self.to_vertex(h);
        let v1 = self.to_vertex(o);

        // Reroute every edge incident to v1 to end at v0 instead.
        let star: SmallVec<[HalfedgeHandle; 8]> = self.halfedges_around(v1).collect();
        for hh in star {
            self.set_vertex(hh.opposite(), v0);
        }

        // Splice the dying pair out of the merged walk. With both endpoints folded into v0,
        // each predecessor continues with its own side's successor; when the walk turns
        // around through the pair, the two halfedges sit back to back and a single stitch
        // removes both.
        let h_prev = self.prev_halfedge(h);
        let h_next = self.next_halfedge(h);
        let o_prev = self.prev_halfedge(o);
        let o_next = self.next_halfedge(o);
        if h_next == o {
            self.set_next_halfedge(h_prev, o_next);
        } else if o_next == h {
            self.set_next_halfedge(o_prev, h_next);
        } else {
            self.set_next_halfedge(h_prev, h_next);
            self.set_next_halfedge(o_prev, o_next);
        }

        if self.outgoing_halfedge(v0) == o {
            // h_next can itself be o when the walk turned around at v0; fall back to the
            // continuation on the v1 side, or isolate v0 if the collapsed edge was its last.
            let replacement = if h_next != o { h_next } else { o_next };
            if replacement == h || replacement == o {
                self.set_outgoing_halfedge(v0, HalfedgeHandle::INVALID);
            } else {
                self.set_outgoing_halfedge(v0, replacement);
            }
        }

        self.set_outgoing_halfedge(v1, HalfedgeHandle::INVALID);
        self.vprops.slice_mut(&self.vertex_deleted)[v1] = true;
        self.deleted_vertices += 1;
        self.eprops.slice_mut(&self.edge_deleted)[h.edge()] = true;
        self.deleted_edges += 1;
        self.has_garbage = true;

        Ok(())
    }

    /// True if removing `e` leaves neither endpoint isolated.
    pub fn is_removal_ok(&self, e: EdgeHandle) -> bool {
        if !self.is_valid_edge(e) || self.is_deleted_edge(e) {
            return false;
        }

        let h = e.halfedge(0);
        !(self.is_boundary_vertex(self.from_vertex(h))
            || self.is_boundary_vertex(self.to_vertex(h)))
    }

    /// Remove edge `e`, splicing it out of the walks at both endpoints. Returns `false` and
    /// leaves the graph untouched if [`Graph::is_removal_ok`] fails.
    pub fn remove_edge(&mut self, e: EdgeHandle) -> bool {
        if !self.is_removal_ok(e) {
            return false;
        }

        let h = e.halfedge(0);
        let o = h.opposite();
        let start = self.to_vertex(h);
        let end = self.to_vertex(o);

        let h_next = self.next_halfedge(h);
        let h_prev = self.prev_halfedge(h);
        let o_next = self.next_halfedge(o);
        let o_prev = self.prev_halfedge(o);

        // Re-prime the endpoints off the dying pair before unlinking it.
        if self.outgoing_halfedge(start) == o {
            self.set_outgoing_halfedge(start, h_next);
        }
        if self.outgoing_halfedge(end) == h {
            self.set_outgoing_halfedge(end, o_next);
        }

        // h ends at start and o continues from it; o ends at end and h continues from it.
        self.set_next_halfedge(h_prev, o_next);
        self.set_next_halfedge(o_prev, h_next);

        self.eprops.slice_mut(&self.edge_deleted)[e] = true;
        self.deleted_edges += 1;
        self.has_garbage = true;

        true
    }

    /// Remove `v` along with every incident edge. Incident edges blocked by the isolation
    /// policy of [`Graph::remove_edge`] are left in place; the vertex is tombstoned either
    /// way. Returns `false` if `v` was already deleted.
    pub fn remove_vertex(&mut self, v: VertexHandle) -> bool {
        if self.is_deleted_vertex(v) {
            return false;
        }

        let incident: SmallVec<[EdgeHandle; 8]> =
            self.halfedges_around(v).map(|h| h.edge()).collect();
        for e in incident {
            if !self.is_deleted_edge(e) {
                self.remove_edge(e);
            }
        }

        self.set_outgoing_halfedge(v, HalfedgeHandle::INVALID);
        self.vprops.slice_mut(&self.vertex_deleted)[v] = true;
        self.deleted_vertices += 1;
        self.has_garbage = true;

        true
    }

    // --- deletion ---

    /// Tombstone `v` without touching its incident edges.
    pub fn delete_vertex(&mut self, v: VertexHandle) {
        if self.is_deleted_vertex(v) {
            return;
        }
        self.vprops.slice_mut(&self.vertex_deleted)[v] = true;
        self.deleted_vertices += 1;
        self.has_garbage = true;
    }

    /// Tombstone `e` without splicing it out of the walks.
    pub fn delete_edge(&mut self, e: EdgeHandle) {
        if self.is_deleted_edge(e) {
            return;
        }
        self.eprops.slice_mut(&self.edge_deleted)[e] = true;
        self.deleted_edges += 1;
        self.has_garbage = true;
    }

    // --- garbage collection ---

    /// Compact the vertex and edge arenas by removing tombstoned elements.
    ///
    /// Same contract as the mesh kernel's pass: live elements move into the gaps, every
    /// property column moves with them, stored handles are remapped, and handles held across
    /// the call may alias different elements afterwards.
    pub fn garbage_collection(&mut self) {
        if !self.has_garbage {
            return;
        }

        let mut nv = self.vertices_size();
        let mut ne = self.edges_size();
        let mut nh = self.halfedges_size();

        let vmap = self
            .vprops
            .add("v:garbage-collection", VertexHandle::INVALID)
            .expect("reserved name");
        let hmap = self
            .hprops
            .add("h:garbage-collection", HalfedgeHandle::INVALID)
            .expect("reserved name");

        for (i, m) in self.vprops.slice_mut(&vmap).iter_mut().enumerate() {
            *m = VertexHandle::new(i as u32);
        }
        for (i, m) in self.hprops.slice_mut(&hmap).iter_mut().enumerate() {
            *m = HalfedgeHandle::new(i as u32);
        }

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

        for i in 0..nv {
            let v = VertexHandle::new(i as u32);
            if !self.is_isolated(v) {
                let h = self.hprops.slice(&hmap)[self.outgoing_halfedge(v)];
                self.set_outgoing_halfedge(v, h);
            }
        }

        for i in 0..nh {
            let h = HalfedgeHandle::new(i as u32);
            let v = self.vprops.slice(&vmap)[self.to_vertex(h)];
            self.set_vertex(h, v);
            let next = self.hprops.slice(&hmap)[self.next_halfedge(h)];
            self.set_next_halfedge(h, next);
        }

        self.vprops.remove(&vmap);
        self.hprops.remove(&hmap);

        self.vprops.resize(nv);
        self.vprops.shrink_to_fit();
        self.hprops.resize(nh);
        self.hprops.shrink_to_fit();
        self.eprops.resize(ne);
        self.eprops.shrink_to_fit();

        self.deleted_vertices = 0;
        self.deleted_edges = 0;
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
}

impl<T: Real> ElementSet<VertexHandle> for Graph<T> {
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

impl<T: Real> ElementSet<HalfedgeHandle> for Graph<T> {
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

impl<T: Real> ElementSet<EdgeHandle> for Graph<T> {
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

impl<T: Real> HalfedgeNavigation for Graph<T> {
    #[inline]
    fn outgoing_halfedge(&self, v: VertexHandle) -> HalfedgeHandle {
        Graph::outgoing_halfedge(self, v)
    }
    #[inline]
    fn to_vertex(&self, h: HalfedgeHandle) -> VertexHandle {
        Graph::to_vertex(self, h)
    }
    #[inline]
    fn next_halfedge(&self, h: HalfedgeHandle) -> HalfedgeHandle {
        Graph::next_halfedge(self, h)
    }
    #[inline]
    fn prev_halfedge(&self, h: HalfedgeHandle) -> HalfedgeHandle {
        Graph::prev_halfedge(self, h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Wire = Graph<f64>;

    fn triangle_wire() -> (Wire, [VertexHandle; 3]) {
        let mut g = Wire::new();
        let a = g.add_vertex([0.0, 0.0, 0.0]);
        let b = g.add_vertex([1.0, 0.0, 0.0]);
        let c = g.add_vertex([0.0, 1.0, 0.0]);
        g.add_edge(a, b);
        g.add_edge(b, c);
        g.add_edge(c, a);
        (g, [a, b, c])
    }

    #[test]
    fn add_edge_and_valence() {
        let mut g = Wire::new();
        let center = g.add_vertex([0.0; 3]);
        let mut spokes = Vec::new();
        for i in 0..4 {
            let v = g.add_vertex([i as f64 + 1.0, 0.0, 0.0]);
            let h = g.add_edge(center, v);
            assert_eq!(g.from_vertex(h), center);
            assert_eq!(g.to_vertex(h), v);
            spokes.push(v);
        }

        assert_eq!(g.vertex_count(), 5);
        assert_eq!(g.edge_count(), 4);
        assert_eq!(g.valence(center), 4);
        let ring: Vec<_> = g.vertices_around(center).collect();
        for v in &spokes {
            assert!(ring.contains(v));
            assert_eq!(g.valence(*v), 1);
        }
    }

    #[test]
    fn add_edge_deduplicates() {
        let mut g = Wire::new();
        let a = g.add_vertex([0.0; 3]);
        let b = g.add_vertex([1.0, 0.0, 0.0]);
        let h = g.add_edge(a, b);
        assert_eq!(g.add_edge(a, b), h);
        // The reverse direction reuses the same edge through its opposite.
        assert_eq!(g.add_edge(b, a), h.opposite());
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn find_halfedge_and_edge() {
        let (g, [a, b, c]) = triangle_wire();
        let h = g.find_halfedge(a, b).unwrap();
        assert_eq!(g.to_vertex(h), b);
        assert_eq!(g.find_halfedge(b, a).unwrap(), h.opposite());
        assert!(g.find_edge(c, a).is_some());

        let mut g2 = Wire::new();
        let x = g2.add_vertex([0.0; 3]);
        let y = g2.add_vertex([1.0, 0.0, 0.0]);
        assert_eq!(g2.find_halfedge(x, y), None);
    }

    #[test]
    fn dangling_and_isolated_vertices() {
        let mut g = Wire::new();
        let lone = g.add_vertex([0.0; 3]);
        assert!(g.is_isolated(lone));
        assert!(!g.is_boundary_vertex(lone));
        assert_eq!(g.vertices_around(lone).count(), 0);

        let a = g.add_vertex([1.0, 0.0, 0.0]);
        let b = g.add_vertex([2.0, 0.0, 0.0]);
        g.add_edge(a, b);
        // Both endpoints of a lone edge dead-end immediately.
        assert!(g.is_boundary_vertex(a));
        assert!(g.is_boundary_vertex(b));

        let (tri, verts) = triangle_wire();
        for v in verts {
            assert!(!tri.is_boundary_vertex(v));
        }
    }

    #[test]
    fn walks_are_closed() {
        let (g, _) = triangle_wire();
        // Every halfedge lies on a closed walk that visits each live halfedge once.
        for h in g.halfedges() {
            let mut steps = 0;
            let mut cur = h;
            loop {
                let next = g.next_halfedge(cur);
                assert_eq!(g.from_vertex(next), g.to_vertex(cur));
                assert_eq!(g.prev_halfedge(next), cur);
                cur = next;
                steps += 1;
                assert!(steps <= g.halfedge_count());
                if cur == h {
                    break;
                }
            }
        }
    }

    #[test]
    fn insert_vertex_splits_edge() {
        let mut g = Wire::new();
        let a = g.add_vertex([0.0; 3]);
        let b = g.add_vertex([2.0, 0.0, 0.0]);
        let h = g.add_edge(a, b);
        let e = h.edge();

        let h2 = g.insert_vertex_at(e, [1.0, 0.0, 0.0]);
        assert!(h2.is_valid());
        let m = g.from_vertex(h2);

        assert_eq!(g.vertex_count(), 3);
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.valence(m), 2);
        assert!(g.find_halfedge(a, m).is_some());
        assert!(g.find_halfedge(m, b).is_some());
        assert!(g.find_halfedge(a, b).is_none());

        // The split of a dead-end edge leaves one consistent four-step walk.
        for h in g.halfedges() {
            assert_eq!(g.prev_halfedge(g.next_halfedge(h)), h);
            assert_eq!(g.from_vertex(g.next_halfedge(h)), g.to_vertex(h));
        }
    }

    #[test]
    fn collapse_merges_neighborhoods() {
        // Path a - b - c: collapsing b into a rewires the b-c edge to a-c.
        let mut g = Wire::new();
        let a = g.add_vertex([0.0; 3]);
        let b = g.add_vertex([1.0, 0.0, 0.0]);
        let c = g.add_vertex([2.0, 0.0, 0.0]);
        g.add_edge(a, b);
        g.add_edge(b, c);

        let h = g.find_halfedge(b, a).unwrap();
        assert!(g.is_collapse_ok(h));
        g.collapse(h).unwrap();

        assert_eq!(g.vertex_count(), 2);
        assert_eq!(g.edge_count(), 1);
        assert!(g.is_deleted_vertex(b));
        assert!(g.find_edge(a, c).is_some());
        assert_eq!(g.valence(a), 1);
        assert_eq!(g.valence(c), 1);
    }

    #[test]
    fn collapse_interior_vertex_merges_rings() {
        // Path x - a - b - y: collapsing b into a must merge the rings of a and b so that
        // a stays connected to x and picks up y.
        let mut g = Wire::new();
        let x = g.add_vertex([0.0; 3]);
        let a = g.add_vertex([1.0, 0.0, 0.0]);
        let b = g.add_vertex([2.0, 0.0, 0.0]);
        let y = g.add_vertex([3.0, 0.0, 0.0]);
        g.add_edge(x, a);
        g.add_edge(a, b);
        g.add_edge(b, y);

        let h = g.find_halfedge(b, a).unwrap();
        assert!(g.is_collapse_ok(h));
        g.collapse(h).unwrap();

        assert_eq!(g.vertex_count(), 3);
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.valence(a), 2);
        let ring: Vec<_> = g.vertices_around(a).collect();
        assert!(ring.contains(&x));
        assert!(ring.contains(&y));
        assert!(g.find_edge(a, y).is_some());
        assert_eq!(g.valence(x), 1);
        assert_eq!(g.valence(y), 1);

        // The surviving halfedges form one consistent walk.
        for h in g.halfedges() {
            assert_eq!(g.prev_halfedge(g.next_halfedge(h)), h);
            assert_eq!(g.from_vertex(g.next_halfedge(h)), g.to_vertex(h));
        }
    }

    #[test]
    fn collapse_rejects_duplicate_edges() {
        let (mut g, [a, b, _]) = triangle_wire();
        // Collapsing b into a would leave two a-c edges.
        let h = g.find_halfedge(b, a).unwrap();
        assert!(!g.is_collapse_ok(h));
        assert!(g.collapse(h).is_err());
        assert!(!g.has_garbage());
        assert_eq!(g.edge_count(), 3);
    }

    #[test]
    fn remove_edge_respects_isolation_policy() {
        let mut g = Wire::new();
        let a = g.add_vertex([0.0; 3]);
        let b = g.add_vertex([1.0, 0.0, 0.0]);
        let lone = g.add_edge(a, b).edge();
        // Removing the only edge of a dangling vertex is refused.
        assert!(!g.is_removal_ok(lone));
        assert!(!g.remove_edge(lone));
        assert_eq!(g.edge_count(), 1);

        let (mut tri, [x, y, z]) = triangle_wire();
        let e = tri.find_edge(x, y).unwrap();
        assert!(tri.remove_edge(e));
        assert_eq!(tri.edge_count(), 2);
        assert!(tri.find_edge(x, y).is_none());
        // Remaining edges still circulate.
        assert_eq!(tri.valence(z), 2);
        assert_eq!(tri.valence(x), 1);
        // A removed edge cannot be removed twice.
        assert!(!tri.remove_edge(e));
    }

    #[test]
    fn remove_vertex_drops_incident_edges() {
        let (mut g, [a, b, c]) = triangle_wire();
        assert!(g.remove_vertex(a));
        assert!(g.is_deleted_vertex(a));
        assert_eq!(g.vertex_count(), 2);
        // Dropping the first incident edge dead-ends the path at one neighbor, so the
        // isolation policy blocks the second; it stays behind with the tombstoned vertex.
        assert_eq!(g.edge_count(), 2);
        assert!(g.find_edge(b, c).is_some());
        assert_eq!(g.valence(b), 2);
        assert_eq!(g.valence(c), 1);
        assert!(!g.remove_vertex(a));
    }

    #[test]
    fn garbage_collection_compacts() {
        // The isolated vertex d sorts first in the arena once a is gone, which forces real
        // swaps during compaction.
        let mut g = Wire::new();
        let d = g.add_vertex([5.0, 5.0, 0.0]);
        let a = g.add_vertex([0.0, 0.0, 0.0]);
        let b = g.add_vertex([1.0, 0.0, 0.0]);
        let c = g.add_vertex([0.0, 1.0, 0.0]);
        g.add_edge(a, b);
        g.add_edge(b, c);
        g.add_edge(c, a);

        let id = g.add_vertex_property::<u32>("v:id", 0).unwrap();
        for (i, slot) in g.vertex_property_slice_mut(&id).iter_mut().enumerate() {
            *slot = 10 + i as u32;
        }

        g.delete_vertex(d);
        let dropped = g.find_edge(a, b).unwrap();
        assert!(g.remove_edge(dropped));
        assert!(g.has_garbage());

        g.garbage_collection();
        assert!(!g.has_garbage());
        assert_eq!(g.vertices_size(), 3);
        assert_eq!(g.edges_size(), 2);
        assert_eq!(g.halfedges_size(), 4);

        // Stored connectivity was remapped along with the moves.
        for h in g.halfedges() {
            assert!(g.is_valid_vertex(g.to_vertex(h)));
            assert_eq!(g.prev_halfedge(g.next_halfedge(h)), h);
        }
        for v in g.vertices() {
            if !g.is_isolated(v) {
                assert_eq!(g.from_vertex(g.outgoing_halfedge(v)), v);
            }
        }

        // Survivors kept their ids, d's id is gone.
        let ids = g.vertex_property_slice(&id);
        assert!(!ids.contains(&10));
        for want in [11, 12, 13] {
            assert!(ids.contains(&want));
        }
    }

    #[test]
    fn delete_marks_without_splicing() {
        let (mut g, [a, b, _]) = triangle_wire();
        let e = g.find_edge(a, b).unwrap();
        g.delete_edge(e);
        assert!(g.is_deleted_edge(e));
        assert_eq!(g.edge_count(), 2);
        assert!(g.edges().all(|live| live != e));

        g.delete_vertex(a);
        assert!(g.is_deleted_vertex(a));
        assert!(g.vertices().all(|live| live != a));
    }

    #[test]
    fn clear_and_reserve() {
        let (mut g, _) = triangle_wire();
        g.add_edge_property::<f32>("e:weight", 1.0).unwrap();
        g.clear();
        assert!(g.is_empty());
        assert_eq!(g.edges_size(), 0);
        assert!(!g.has_edge_property("e:weight"));
        assert!(g.has_vertex_property("v:point"));

        g.reserve(8, 8);
        let v = g.add_vertex([1.0, 2.0, 3.0]);
        assert_eq!(g.position(v), [1.0, 2.0, 3.0]);
    }
}
