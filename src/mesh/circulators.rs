//! Circulators: iterators over the one-ring of a vertex or the perimeter of a face.
//!
//! A circulator starts at an anchor halfedge and rotates until it returns to the anchor,
//! yielding the anchor's orbit exactly once. The tricky part is telling "back at the start"
//! apart from "not started yet"; this is handled with an explicit three-phase state machine, so
//! a full lap terminates and an isolated vertex yields nothing.
//!
//! Vertex-centric circulators rotate counter-clockwise via `opposite(prev(h))`; face-centric
//! ones walk the perimeter via `next(h)`. The vertex-centric ones are generic over
//! [`HalfedgeNavigation`] so that `Graph` shares them with `HalfedgeMesh`.

use crate::handle::{EdgeHandle, FaceHandle, HalfedgeHandle, VertexHandle};

/// The minimal halfedge-walking surface of a container.
pub trait HalfedgeNavigation {
    /// The primed outgoing halfedge of `v`, invalid if `v` is isolated.
    fn outgoing_halfedge(&self, v: VertexHandle) -> HalfedgeHandle;

    /// The vertex `h` points to.
    fn to_vertex(&self, h: HalfedgeHandle) -> VertexHandle;

    /// The next halfedge of `h` within its ring.
    fn next_halfedge(&self, h: HalfedgeHandle) -> HalfedgeHandle;

    /// The previous halfedge of `h` within its ring.
    fn prev_halfedge(&self, h: HalfedgeHandle) -> HalfedgeHandle;

    /// The next outgoing halfedge of the same origin vertex, counter-clockwise.
    #[inline]
    fn ccw_rotated_halfedge(&self, h: HalfedgeHandle) -> HalfedgeHandle {
        self.prev_halfedge(h).opposite()
    }

    /// The next outgoing halfedge of the same origin vertex, clockwise.
    #[inline]
    fn cw_rotated_halfedge(&self, h: HalfedgeHandle) -> HalfedgeHandle {
        self.next_halfedge(h.opposite())
    }
}

/// Face lookups on top of [`HalfedgeNavigation`]; only `HalfedgeMesh` has these.
pub trait FaceNavigation: HalfedgeNavigation {
    /// The face incident to `h`, invalid on the boundary.
    fn halfedge_face(&self, h: HalfedgeHandle) -> FaceHandle;

    /// A perimeter halfedge of `f`.
    fn face_halfedge(&self, f: FaceHandle) -> HalfedgeHandle;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum State {
    NotStarted,
    Iterating(HalfedgeHandle),
    Exhausted,
}

macro_rules! vertex_circulator {
    ($(#[$attr:meta])* $name:ident, $item:ty, |$nav:ident, $h:ident| $yield:expr) => {
        $(#[$attr])*
        #[derive(Clone)]
        pub struct $name<'a, C> {
            nav: &'a C,
            start: HalfedgeHandle,
            state: State,
        }

        impl<'a, C: HalfedgeNavigation> $name<'a, C> {
            pub(crate) fn new(nav: &'a C, v: VertexHandle) -> Self {
                $name {
                    nav,
                    start: nav.outgoing_halfedge(v),
                    state: State::NotStarted,
                }
            }
        }

        impl<'a, C: HalfedgeNavigation> Iterator for $name<'a, C> {
            type Item = $item;

            fn next(&mut self) -> Option<$item> {
                let current = match self.state {
                    State::NotStarted => {
                        if !self.start.is_valid() {
                            self.state = State::Exhausted;
                            return None;
                        }
                        self.start
                    }
                    State::Iterating(h) => {
                        let h = self.nav.ccw_rotated_halfedge(h);
                        if h == self.start {
                            self.state = State::Exhausted;
                            return None;
                        }
                        h
                    }
                    State::Exhausted => return None,
                };
                self.state = State::Iterating(current);
                let $nav = self.nav;
                let $h = current;
                Some($yield)
            }
        }
    };
}

vertex_circulator! {
    /// Yields the one-ring neighbor vertices of a vertex, counter-clockwise.
    VertexAroundVertexCirculator, VertexHandle, |nav, h| nav.to_vertex(h)
}

vertex_circulator! {
    /// Yields the outgoing halfedges of a vertex, counter-clockwise.
    HalfedgeAroundVertexCirculator, HalfedgeHandle, |_nav, h| h
}

vertex_circulator! {
    /// Yields the incident edges of a vertex, counter-clockwise.
    EdgeAroundVertexCirculator, EdgeHandle, |_nav, h| h.edge()
}

/// Yields the faces incident to a vertex, counter-clockwise, skipping boundary gaps.
///
/// A vertex with no incident face yields nothing.
#[derive(Clone)]
pub struct FaceAroundVertexCirculator<'a, C> {
    nav: &'a C,
    start: HalfedgeHandle,
    state: State,
}

impl<'a, C: FaceNavigation> FaceAroundVertexCirculator<'a, C> {
    pub(crate) fn new(nav: &'a C, v: VertexHandle) -> Self {
        // Anchor on an outgoing halfedge with a real face; a lap without finding one means
        // the vertex only touches boundary, so the circulator starts exhausted.
        let mut start = nav.outgoing_halfedge(v);
        if start.is_valid() && !nav.halfedge_face(start).is_valid() {
            let anchor = start;
            loop {
                start = nav.ccw_rotated_halfedge(start);
                if nav.halfedge_face(start).is_valid() {
                    break;
                }
                if start == anchor {
                    start = HalfedgeHandle::INVALID;
                    break;
                }
            }
        }
        FaceAroundVertexCirculator {
            nav,
            start,
            state: State::NotStarted,
        }
    }
}

impl<'a, C: FaceNavigation> Iterator for FaceAroundVertexCirculator<'a, C> {
    type Item = FaceHandle;

    fn next(&mut self) -> Option<FaceHandle> {
        let current = match self.state {
            State::NotStarted => {
                if !self.start.is_valid() {
                    self.state = State::Exhausted;
                    return None;
                }
                self.start
            }
            State::Iterating(h) => {
                // The rotation stops at the latest back at the anchor, which has a face.
                let mut h = self.nav.ccw_rotated_halfedge(h);
                while !self.nav.halfedge_face(h).is_valid() {
                    h = self.nav.ccw_rotated_halfedge(h);
                }
                if h == self.start {
                    self.state = State::Exhausted;
                    return None;
                }
                h
            }
            State::Exhausted => return None,
        };
        self.state = State::Iterating(current);
        Some(self.nav.halfedge_face(current))
    }
}

macro_rules! face_circulator {
    ($(#[$attr:meta])* $name:ident, $item:ty, |$nav:ident, $h:ident| $yield:expr) => {
        $(#[$attr])*
        #[derive(Clone)]
        pub struct $name<'a, C> {
            nav: &'a C,
            start: HalfedgeHandle,
            state: State,
        }

        impl<'a, C: FaceNavigation> $name<'a, C> {
            pub(crate) fn new(nav: &'a C, f: FaceHandle) -> Self {
                $name {
                    nav,
                    start: nav.face_halfedge(f),
                    state: State::NotStarted,
                }
            }
        }

        impl<'a, C: FaceNavigation> Iterator for $name<'a, C> {
            type Item = $item;

            fn next(&mut self) -> Option<$item> {
                let current = match self.state {
                    State::NotStarted => {
                        if !self.start.is_valid() {
                            self.state = State::Exhausted;
                            return None;
                        }
                        self.start
                    }
                    State::Iterating(h) => {
                        let h = self.nav.next_halfedge(h);
                        if h == self.start {
                            self.state = State::Exhausted;
                            return None;
                        }
                        h
                    }
                    State::Exhausted => return None,
                };
                self.state = State::Iterating(current);
                let $nav = self.nav;
                let $h = current;
                Some($yield)
            }
        }
    };
}

face_circulator! {
    /// Yields the perimeter vertices of a face in ring order.
    VertexAroundFaceCirculator, VertexHandle, |nav, h| nav.to_vertex(h)
}

face_circulator! {
    /// Yields the perimeter halfedges of a face in ring order.
    HalfedgeAroundFaceCirculator, HalfedgeHandle, |_nav, h| h
}
