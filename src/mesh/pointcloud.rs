//!
//! Point cloud module. The smallest of the containers: vertices with positions and user
//! properties, no connectivity. It shares the tombstone-and-compact lifecycle of the other
//! containers, which makes it a cheap staging area for data that later becomes a mesh.
//!

use crate::handle::{VertexHandle, INVALID_INDEX};
use crate::props::{Error, Property, PropertySet, PropertyValue, VertexProperty};
use crate::Real;

use super::iter::{ElementIter, ElementSet};

/// An unstructured set of points.
#[derive(Clone, Debug)]
pub struct PointCloud<T: Real> {
    vprops: PropertySet,

    vertex_points: Property<[T; 3]>,
    vertex_deleted: Property<bool>,

    deleted_vertices: usize,
    has_garbage: bool,
}

impl<T: Real> Default for PointCloud<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Real> PointCloud<T> {
    /// Construct an empty point cloud.
    pub fn new() -> Self {
        let mut vprops = PropertySet::new();
        let vertex_points = vprops.add("v:point", [T::zero(); 3]).expect("system column");
        let vertex_deleted = vprops.add("v:deleted", false).expect("system column");

        PointCloud {
            vprops,
            vertex_points,
            vertex_deleted,
            deleted_vertices: 0,
            has_garbage: false,
        }
    }

    /// Remove all vertices and all properties, including user properties.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Release unused capacity in all property columns.
    pub fn free_memory(&mut self) {
        self.vprops.shrink_to_fit();
    }

    /// Reserve capacity for `nvertices` vertices.
    pub fn reserve(&mut self, nvertices: usize) {
        self.vprops.reserve(nvertices);
    }

    /// Number of allocated vertices, tombstones included.
    #[inline]
    pub fn vertices_size(&self) -> usize {
        self.vprops.len()
    }

    /// Number of live vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices_size() - self.deleted_vertices
    }

    /// True if the cloud has no live vertices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertex_count() == 0
    }

    /// True if any vertex is tombstoned.
    #[inline]
    pub fn has_garbage(&self) -> bool {
        self.has_garbage
    }

    /// True if `v` addresses an allocated vertex.
    #[inline]
    pub fn is_valid_vertex(&self, v: VertexHandle) -> bool {
        v.is_valid() && v.idx() < self.vertices_size()
    }

    /// True if `v` is tombstoned.
    #[inline]
    pub fn is_deleted_vertex(&self, v: VertexHandle) -> bool {
        self.vprops.slice(&self.vertex_deleted)[v]
    }

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

    /// Iterate over all live vertices.
    pub fn vertices(&self) -> ElementIter<'_, Self, VertexHandle> {
        ElementIter::new(self)
    }

    /// Allocate a vertex. Returns the invalid handle if the index space is exhausted.
    pub fn new_vertex(&mut self) -> VertexHandle {
        if self.vertices_size() >= INVALID_INDEX as usize {
            return VertexHandle::INVALID;
        }
        self.vprops.push();
        VertexHandle::new(self.vertices_size() as u32 - 1)
    }

    /// Add a vertex at position `p`.
    pub fn add_vertex(&mut self, p: [T; 3]) -> VertexHandle {
        let v = self.new_vertex();
        if v.is_valid() {
            self.vprops.slice_mut(&self.vertex_points)[v.idx()] = p;
        }
        v
    }

    /// Tombstone `v`.
    pub fn delete_vertex(&mut self, v: VertexHandle) {
        if self.is_deleted_vertex(v) {
            return;
        }
        self.vprops.slice_mut(&self.vertex_deleted)[v] = true;
        self.deleted_vertices += 1;
        self.has_garbage = true;
    }

    /// Compact the vertex arena by removing tombstoned vertices.
    ///
    /// Handles held across this call may afterwards address different vertices.
    pub fn garbage_collection(&mut self) {
        if !self.has_garbage {
            return;
        }

        let mut nv = self.vertices_size();

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

        self.vprops.resize(nv);
        self.vprops.shrink_to_fit();

        self.deleted_vertices = 0;
        self.has_garbage = false;
    }

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
}

impl<T: Real> ElementSet<VertexHandle> for PointCloud<T> {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_iterate() {
        let mut cloud = PointCloud::<f64>::new();
        for i in 0..5 {
            cloud.add_vertex([i as f64, 0.0, 0.0]);
        }
        assert_eq!(cloud.vertex_count(), 5);

        let xs: Vec<f64> = cloud.vertices().map(|v| cloud.position(v)[0]).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn delete_and_collect() {
        let mut cloud = PointCloud::<f64>::new();
        let handles: Vec<_> = (0..6)
            .map(|i| cloud.add_vertex([i as f64, 0.0, 0.0]))
            .collect();

        cloud.delete_vertex(handles[1]);
        cloud.delete_vertex(handles[4]);
        // Deleting twice changes nothing.
        cloud.delete_vertex(handles[1]);

        assert!(cloud.has_garbage());
        assert_eq!(cloud.vertex_count(), 4);
        assert_eq!(cloud.vertices().count(), 4);

        // Tombstones are skipped from both ends of the iterator.
        let xs: Vec<f64> = cloud.vertices().map(|v| cloud.position(v)[0]).collect();
        assert_eq!(xs, vec![0.0, 2.0, 3.0, 5.0]);
        let rev: Vec<f64> = cloud
            .vertices()
            .rev()
            .map(|v| cloud.position(v)[0])
            .collect();
        assert_eq!(rev, vec![5.0, 3.0, 2.0, 0.0]);

        cloud.garbage_collection();
        assert!(!cloud.has_garbage());
        assert_eq!(cloud.vertices_size(), 4);

        let mut xs: Vec<f64> = cloud.positions().iter().map(|p| p[0]).collect();
        xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(xs, vec![0.0, 2.0, 3.0, 5.0]);
    }

    #[test]
    fn user_properties_move_with_vertices() {
        let mut cloud = PointCloud::<f32>::new();
        let handles: Vec<_> = (0..4)
            .map(|i| cloud.add_vertex([i as f32, 0.0, 0.0]))
            .collect();

        let weight = cloud.add_vertex_property::<f32>("v:weight", 0.0).unwrap();
        for (i, w) in cloud.vertex_property_slice_mut(&weight).iter_mut().enumerate() {
            *w = i as f32 * 10.0;
        }

        cloud.delete_vertex(handles[0]);
        cloud.garbage_collection();

        // Each surviving vertex still pairs its weight with its position.
        let positions = cloud.positions().to_vec();
        let weights = cloud.vertex_property_slice(&weight).to_vec();
        assert_eq!(positions.len(), 3);
        for (p, w) in positions.iter().zip(weights.iter()) {
            assert_eq!(p[0] * 10.0, *w);
        }
    }

    #[test]
    fn clear_drops_user_properties() {
        let mut cloud = PointCloud::<f64>::new();
        cloud.add_vertex([1.0; 3]);
        cloud.add_vertex_property::<u8>("v:flag", 0).unwrap();
        cloud.clear();
        assert!(cloud.is_empty());
        assert!(!cloud.has_vertex_property("v:flag"));
        assert!(cloud.has_vertex_property("v:point"));
    }
}
