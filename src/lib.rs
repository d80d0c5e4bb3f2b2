/*!
This is a halfedge based polygon mesh library, with named properties of any
type attached to the elements of the mesh, and a builder that repairs
non-manifold input.

# Overview

+ A halfedge datastructure is used to represent the topology of a mesh, i.e.
  the connectivity of vertices, edges and faces. The connectivity lives in
  flat arrays, and the elements are referred to with the index based handles
  [`VH`], [`HH`], [`EH`] and [`FH`].

+ Any number of properties can be added to vertices, halfedges, edges, faces
  and to the mesh itself. Properties are identified by name and type, and are
  kept in sync with the elements when elements are added, deleted and garbage
  collected. See [`Property`].

+ [`PolyMesh`] is the mesh type. It stores the positions of the vertices as
  [`glam::Vec3`] in the `"v:point"` vertex property.

+ Elements are deleted lazily. They are flagged in their [`Status`], and stay
  in the mesh until [`PolyMesh::garbage_collection`] removes them. Handles
  held across a garbage collection must be discarded.

+ [`PolyMesh::add_face`] rejects faces that would make the mesh non-manifold.
  [`ManifoldBuilder`] instead duplicates vertices to fit such faces in, and
  skips and counts faces that are malformed.

+ With the `obj` feature, which is enabled by default, meshes can be loaded
  from Wavefront OBJ files with [`PolyMesh::load_obj`].
*/

mod builder;
mod check;
mod edit;
mod element;
mod error;
mod garbage;
mod iterator;
mod macros;
mod mesh;
#[cfg(feature = "obj")]
mod obj;
mod property;
mod status;
mod topol;

pub use builder::{BuildReport, ManifoldBuilder};
pub use element::{Handle, HasTopology, EH, FH, HH, INVALID_INDEX, MH, VH};
pub use error::Error;
pub use iterator::{
    FaceAroundVertex, HalfedgeAroundFace, HalfedgeAroundVertex, VertexAroundFace,
    VertexAroundVertex,
};
pub use mesh::{PolyMesh, POINTS};
pub use property::{
    EPropBuf, EProperty, FPropBuf, FProperty, HPropBuf, HProperty, MProperty, PropBuf, Property,
    TPropData, VPropBuf, VProperty,
};
pub use status::Status;
pub use topol::Topology;
