use crate::{error::Error, iterator, mesh::PolyMesh, topol::Topology};
use std::fmt::{Debug, Display};

/// Index reserved for handles that don't refer to any element.
pub const INVALID_INDEX: u32 = u32::MAX;

/**
 * All elements of the mesh implement this trait. They are identified by their
 * index.
 *
 * A handle is only a lookup key. It does not own anything, and it is only
 * meaningful for the mesh it was obtained from. Structural edits such as
 * garbage collection move elements around, so any handle held across such an
 * edit must be discarded and looked up again.
 */
pub trait Handle: Copy + Eq + 'static {
    /**
     * The index of the element.
     */
    fn index(&self) -> u32;

    /// Check if this is the null handle, i.e. it doesn't point to any element.
    fn is_null(&self) -> bool {
        self.index() == INVALID_INDEX
    }
}

macro_rules! impl_handle {
    ($name:ident, $label:literal) => {
        impl $name {
            /// The null handle of this kind.
            pub const fn invalid() -> Self {
                $name { idx: INVALID_INDEX }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::invalid()
            }
        }

        impl Handle for $name {
            fn index(&self) -> u32 {
                self.idx
            }
        }

        impl From<u32> for $name {
            fn from(idx: u32) -> Self {
                $name { idx }
            }
        }

        impl From<&u32> for $name {
            fn from(idx: &u32) -> Self {
                $name { idx: *idx }
            }
        }

        impl From<usize> for $name {
            fn from(idx: usize) -> Self {
                $name {
                    idx: u32::try_from(idx).unwrap_or(INVALID_INDEX),
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                if self.is_null() {
                    write!(f, "{}(invalid)", $label)
                } else {
                    write!(f, "{}({})", $label, self.idx)
                }
            }
        }

        impl Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                Display::fmt(self, f)
            }
        }
    };
}

/**
 * Vertex handle.
 */
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VH {
    idx: u32,
}

/**
 * Halfedge handle.
 */
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HH {
    idx: u32,
}

/**
 * Edge handle.
 */
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EH {
    idx: u32,
}

/**
 * Face handle.
 */
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FH {
    idx: u32,
}

impl_handle!(VH, "VH");
impl_handle!(HH, "HH");
impl_handle!(EH, "EH");
impl_handle!(FH, "FH");

/// Handle of the mesh itself, used to address model properties. A mesh has
/// exactly one model element.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Hash)]
pub struct MH;

impl Handle for MH {
    fn index(&self) -> u32 {
        0
    }
}

pub trait HasTopology {
    fn topology(&self) -> &Topology;
}

impl VH {
    pub fn halfedge(self, mesh: &impl HasTopology) -> Option<HH> {
        mesh.topology().vertex_halfedge(self)
    }

    /// Check if this vertex is valid for the `mesh`.
    ///
    /// The index has to be less than the number of vertices in the mesh.
    pub fn is_valid(self, mesh: &impl HasTopology) -> bool {
        mesh.topology().is_valid_vertex(self)
    }

    /// Check if this vertex is manifold.
    ///
    /// A vertex is manifold if it has at most 1 outgoing boundary halfedge.
    /// ```text
    ///    .......|     .......|.......     ....\     /...
    ///    .......|     .......|.......     .....\   /....
    ///    .......|     .......|.......     ......\ /.....
    ///    -------v     -------v-------     -------v------
    ///    .......|     .......|.......     ....../ \.....
    ///    .......|     .......|.......     ...../   \....
    ///    .......|     .......|.......     ..../     \...
    ///    Manifold     Manifold            Not manifold
    /// ```
    pub fn is_manifold(self, mesh: &impl HasTopology) -> bool {
        mesh.topology().is_manifold_vertex(self)
    }

    /// Check if this vertex is on the boundary of the `mesh`. Isolated
    /// vertices count as boundary vertices.
    pub fn is_boundary(self, mesh: &impl HasTopology) -> bool {
        mesh.topology().is_boundary_vertex(self)
    }

    /// Check if no edge is incident on this vertex.
    pub fn is_isolated(self, mesh: &impl HasTopology) -> bool {
        mesh.topology().is_isolated_vertex(self)
    }

    /// The number of edges incident on this vertex.
    pub fn valence(self, mesh: &impl HasTopology) -> usize {
        iterator::HalfedgeAroundVertex::<true>::new(mesh.topology(), self).count()
    }
}

impl HH {
    /// The edge this halfedge belongs to.
    pub const fn edge(self) -> EH {
        EH { idx: self.idx >> 1 }
    }

    /// The other halfedge of the same edge.
    pub const fn opposite(self) -> HH {
        HH { idx: self.idx ^ 1 }
    }

    /// The vertex this halfedge points to. Fails with
    /// [`Error::InvalidHalfedge`] if the halfedge doesn't exist in `mesh`.
    pub fn head(self, mesh: &impl HasTopology) -> Result<VH, Error> {
        let topol = mesh.topology();
        Ok(topol.to_vertex(topol.validate_halfedge(self)?))
    }

    /// The vertex this halfedge starts from.
    pub fn tail(self, mesh: &impl HasTopology) -> Result<VH, Error> {
        let topol = mesh.topology();
        Ok(topol.from_vertex(topol.validate_halfedge(self)?))
    }

    pub fn prev(self, mesh: &impl HasTopology) -> Result<HH, Error> {
        let topol = mesh.topology();
        Ok(topol.prev_halfedge(topol.validate_halfedge(self)?))
    }

    pub fn next(self, mesh: &impl HasTopology) -> Result<HH, Error> {
        let topol = mesh.topology();
        Ok(topol.next_halfedge(topol.validate_halfedge(self)?))
    }

    /// The face this halfedge belongs to, `None` for boundary halfedges.
    pub fn face(self, mesh: &impl HasTopology) -> Result<Option<FH>, Error> {
        let topol = mesh.topology();
        Ok(topol.halfedge_face(topol.validate_halfedge(self)?))
    }

    /// Check if this halfedge is valid for the `mesh`.
    ///
    /// The index has to be less than the number of halfedges in the mesh.
    pub fn is_valid(self, mesh: &impl HasTopology) -> bool {
        mesh.topology().is_valid_halfedge(self)
    }

    /// Check if this halfedge is on the boundary of `mesh`.
    ///
    /// A halfedge is considered interior if it has a face incident on it.
    pub fn is_boundary(self, mesh: &impl HasTopology) -> bool {
        mesh.topology().is_boundary_halfedge(self)
    }
}

impl EH {
    pub const fn halfedges(self) -> (HH, HH) {
        let hi = self.idx << 1;
        (HH { idx: hi }, HH { idx: hi | 1 })
    }

    pub const fn halfedge(self, flag: bool) -> HH {
        HH {
            idx: (self.idx << 1) | if flag { 1 } else { 0 },
        }
    }

    /// Check if this edge is valid for the `mesh`.
    ///
    /// The index has to be less than the number of edges in the mesh.
    pub fn is_valid(self, mesh: &impl HasTopology) -> bool {
        mesh.topology().is_valid_edge(self)
    }

    /// Check if the edge is a boundary edge.
    ///
    /// An edge is considered interior if it has two faces incident on both of it's halfedges.
    pub fn is_boundary(self, mesh: &impl HasTopology) -> bool {
        let (h, oh) = self.halfedges();
        h.is_boundary(mesh) || oh.is_boundary(mesh)
    }
}

impl FH {
    /// One of the halfedges of this face. Fails with [`Error::InvalidFace`]
    /// if the face doesn't exist in `mesh`.
    pub fn halfedge(self, mesh: &impl HasTopology) -> Result<HH, Error> {
        let topol = mesh.topology();
        Ok(topol.face_halfedge(topol.validate_face(self)?))
    }

    /// Check if this face is valid for the `mesh`.
    ///
    /// The index has to be less than the number of faces in the mesh.
    pub fn is_valid(self, mesh: &impl HasTopology) -> bool {
        mesh.topology().is_valid_face(self)
    }

    /// Number of vertices of this face.
    pub fn valence(self, mesh: &impl HasTopology) -> usize {
        iterator::HalfedgeAroundFace::<true>::new(mesh.topology(), self).count()
    }
}

impl HasTopology for Topology {
    fn topology(&self) -> &Topology {
        self
    }
}

impl HasTopology for PolyMesh {
    fn topology(&self) -> &Topology {
        &self.topol
    }
}

#[derive(Debug, Copy, Clone, Default)]
pub(crate) struct Vertex {
    pub(crate) halfedge: Option<HH>,
}

#[derive(Debug, Copy, Clone)]
pub(crate) struct Halfedge {
    pub(crate) face: Option<FH>,
    pub(crate) vertex: VH,
    pub(crate) next: HH,
    pub(crate) prev: HH,
}

#[derive(Debug, Copy, Clone)]
pub(crate) struct Edge {
    pub(crate) halfedges: [Halfedge; 2],
}

#[derive(Debug, Copy, Clone)]
pub(crate) struct Face {
    pub(crate) halfedge: HH,
}
