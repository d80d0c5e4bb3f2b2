use crate::element::{EH, FH, HH, VH};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Properties.
    #[error("property is already borrowed")]
    BorrowedPropertyAccess,
    #[error("property `{0}` does not exist")]
    PropertyDoesNotExist(String),
    #[error("a property named `{0}` already exists with a different type")]
    DuplicateName(String),
    #[error("property `{name}` stores `{stored}`, requested `{requested}`")]
    PropertyTypeMismatch {
        name: String,
        stored: &'static str,
        requested: &'static str,
    },
    #[error("index {0} is out of bounds")]
    OutOfBoundsAccess(u32),
    // Handles.
    #[error("invalid vertex {0}")]
    InvalidVertex(VH),
    #[error("invalid halfedge {0}")]
    InvalidHalfedge(HH),
    #[error("invalid edge {0}")]
    InvalidEdge(EH),
    #[error("invalid face {0}")]
    InvalidFace(FH),
    // Topology.
    #[error("a face needs at least 3 vertices, got {0}")]
    TooFewVertices(usize),
    #[error("vertex {0} appears more than once in a face")]
    DuplicateVertex(VH),
    #[error("complex vertex {0}")]
    ComplexVertex(VH),
    #[error("complex halfedge {0}")]
    ComplexHalfedge(HH),
    #[error("patch re-linking failed")]
    PatchRelinkingFailed,
    #[error("vertex {0} is deleted")]
    DeletedVertex(VH),
    #[error("halfedge {0} is deleted")]
    DeletedHalfedge(HH),
    #[error("edge {0} is deleted")]
    DeletedEdge(EH),
    #[error("face {0} is deleted")]
    DeletedFace(FH),
    // Topology checks.
    #[error("outgoing halfedge of vertex {0} is not on the boundary")]
    OutgoingHalfedgeNotBoundary(VH),
    #[error("invalid outgoing halfedges around vertex {0}")]
    InvalidOutgoingHalfedges(VH),
    #[error("vertex {0} is not manifold")]
    NonManifoldVertex(VH),
    #[error("halfedge {0} starts and ends at the same vertex")]
    DegenerateHalfedge(HH),
    #[error("next / prev links of halfedge {0} are inconsistent")]
    InvalidHalfedgeLink(HH),
    #[error("halfedge {0} is missing from the circulators of its vertices")]
    InvalidHalfedgeVertexLink(HH),
    #[error("halfedge {0} belongs to an invalid loop")]
    InvalidLoopTopology(HH),
    #[error("halfedge {0} has a different face than the rest of its loop")]
    InconsistentFaceInLoop(HH),
    #[error("face {0} points to halfedge {1} which does not point back")]
    InvalidFaceHalfedgeLink(FH, HH),
    // Builder.
    #[error("begin() must be called before building")]
    BuilderNotStarted,
    #[error("begin() called twice without end()")]
    BuilderAlreadyStarted,
    // Obj.
    #[cfg(feature = "obj")]
    #[error("failed to load obj: {0}")]
    ObjLoadFailed(#[from] tobj::LoadError),
    #[error("expected a multiple of 3 coordinates, got {0}")]
    IncorrectNumberOfCoordinates(usize),
    #[error("vertex index {0} + {1} does not fit in 32 bits")]
    VertexIndexOverflow(u32, u32),
    // Other.
    #[error("mismatched array lengths {0} and {1}")]
    MismatchedArrayLengths(usize, usize),
    /// The mesh has deleted elements, which create problems for further
    /// operations. Garbage collection needs to be performed before proceeding.
    #[error("garbage collection required")]
    GarbageCollectionRequired,
}
