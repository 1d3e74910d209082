//! A halfedge-based topological geometry kernel with dynamic element properties.
//!
//! # Overview
//!
//! This library stores all per-element data of a mesh, connectivity included, in named,
//! type-erased property columns, so user attributes and topology move together through
//! deletion and compaction. On top of the property arena it provides three containers:
//! [`HalfedgeMesh`](mesh::HalfedgeMesh) with full Euler operators, the wireframe
//! [`Graph`](mesh::Graph), and the connectivity-free [`PointCloud`](mesh::PointCloud).

pub mod handle;
pub mod props;

pub mod mesh;

// public re-exports
pub use crate::handle::{EdgeHandle, FaceHandle, Handle, HalfedgeHandle, VertexHandle};
pub use crate::mesh::*;
pub use crate::props::{
    EdgeProperty, FaceProperty, HalfedgeProperty, Property, PropertySet, VertexProperty,
};

/// Plain old data trait. Types that implement this trait contain no references and can be copied
/// with `memcpy`. The additional `Any` trait lets us inspect the type more easily.
pub trait Pod: 'static + Copy + Sized + Send + Sync + std::any::Any {}
impl<T> Pod for T where T: 'static + Copy + Sized + Send + Sync + std::any::Any {}

pub trait Real: num_traits::Float + ::std::fmt::Debug + std::iter::Sum + Pod {}
impl<T> Real for T where T: num_traits::Float + ::std::fmt::Debug + std::iter::Sum + Pod {}
