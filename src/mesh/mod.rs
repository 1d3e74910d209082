//! Topological containers built on the property arena.
//!
//! [`HalfedgeMesh`](halfedge::HalfedgeMesh) is the full kernel: vertices, halfedges, edges and
//! faces with Euler operators. [`Graph`](graph::Graph) is the wireframe subset (no faces) and
//! [`PointCloud`](pointcloud::PointCloud) keeps vertices only. All three share the same
//! lifecycle: elements are tombstoned on deletion and physically removed by an explicit
//! `garbage_collection` pass that compacts every property column.

pub mod circulators;
pub mod connectivity;
pub mod iter;

/// Generates the per-element-kind property API of a container: add, get, get-or-add, remove,
/// existence check, name listing and typed slice access against one of its property sets.
macro_rules! element_property_api {
    ($kind:literal, $set:ident, $wrapper:ident,
     $add:ident, $get:ident, $get_or_add:ident, $remove:ident, $has:ident, $names:ident,
     $slice:ident, $slice_mut:ident) => {
        #[doc = concat!("Add a new ", $kind, " property with the given name and default value.")]
        pub fn $add<P: PropertyValue>(
            &mut self,
            name: impl Into<String>,
            default: P,
        ) -> Result<$wrapper<P>, Error> {
            self.$set.add(name, default).map($wrapper)
        }

        #[doc = concat!("Look up an existing ", $kind, " property by name.")]
        pub fn $get<P: PropertyValue>(&self, name: &str) -> Result<$wrapper<P>, Error> {
            self.$set.get(name).map($wrapper)
        }

        #[doc = concat!(
            "Look up a ",
            $kind,
            " property by name, adding it with the given default if missing."
        )]
        pub fn $get_or_add<P: PropertyValue>(
            &mut self,
            name: impl Into<String>,
            default: P,
        ) -> Result<$wrapper<P>, Error> {
            self.$set.get_or_add(name, default).map($wrapper)
        }

        #[doc = concat!("Remove the ", $kind, " property addressed by the given key.")]
        pub fn $remove<P: PropertyValue>(&mut self, prop: &$wrapper<P>) -> bool {
            self.$set.remove(&prop.0)
        }

        #[doc = concat!("True if a ", $kind, " property with the given name exists.")]
        pub fn $has(&self, name: &str) -> bool {
            self.$set.exists(name)
        }

        #[doc = concat!("The names of all ", $kind, " properties.")]
        pub fn $names(&self) -> Vec<String> {
            self.$set.names()
        }

        #[doc = concat!(
            "The values of the addressed ",
            $kind,
            " property, one entry per allocated element. Panics if the key is stale."
        )]
        pub fn $slice<P: PropertyValue>(&self, prop: &$wrapper<P>) -> &[P] {
            self.$set.slice(&prop.0)
        }

        #[doc = concat!(
            "Mutable values of the addressed ",
            $kind,
            " property. Panics if the key is stale."
        )]
        pub fn $slice_mut<P: PropertyValue>(&mut self, prop: &$wrapper<P>) -> &mut [P] {
            self.$set.slice_mut(&prop.0)
        }
    };
}

pub mod graph;
pub mod halfedge;
pub mod pointcloud;

pub use self::circulators::*;
pub use self::connectivity::*;
pub use self::graph::*;
pub use self::halfedge::*;
pub use self::iter::*;
pub use self::pointcloud::*;
