use crate::{
    element::{Handle, HH},
    error::Error,
    iterator::HalfedgeAroundFace,
    topol::Topology,
};

fn check_vertices(mesh: &Topology, hvisited: &mut [bool]) -> Result<(), Error> {
    hvisited.fill(false);
    for v in mesh.vertices() {
        if let Some(h) = mesh.vertex_halfedge(v) {
            // Invalid index, or deleted halfedge.
            if !mesh.is_valid_halfedge(h) {
                return Err(Error::InvalidHalfedge(h));
            }
            if mesh.is_deleted_halfedge(h) {
                return Err(Error::DeletedHalfedge(h));
            }
            // Outgoing halfedge must point back to this vertex.
            if mesh.from_vertex(h) != v {
                return Err(Error::InvalidOutgoingHalfedges(v));
            }
        }
        // Check ccw iterator. Visiting a halfedge twice means the one-ring
        // doesn't close back on the first halfedge.
        for h in mesh.voh_ccw_iter(v) {
            if std::mem::replace(&mut hvisited[h.index() as usize], true) {
                return Err(Error::InvalidOutgoingHalfedges(v));
            }
        }
        // Check cw iterator.
        for h in mesh.voh_cw_iter(v) {
            if !std::mem::replace(&mut hvisited[h.index() as usize], false) {
                return Err(Error::InvalidOutgoingHalfedges(v));
            }
        }
        // The outgoing halfedge must be a boundary halfedge, or none of the
        // halfedges are boundary.
        if !mesh.is_boundary_vertex(v) && mesh.voh_ccw_iter(v).any(|h| mesh.is_boundary_halfedge(h))
        {
            return Err(Error::OutgoingHalfedgeNotBoundary(v));
        }
    }
    Ok(())
}

fn check_edges(mesh: &Topology, hflags: &mut [bool]) -> Result<(), Error> {
    for h in mesh.halfedges() {
        let head = mesh.to_vertex(h);
        let tail = mesh.from_vertex(h);
        // Check if degenerate.
        if head == tail {
            return Err(Error::DegenerateHalfedge(h));
        }
        let prev = mesh.prev_halfedge(h);
        let next = mesh.next_halfedge(h);
        // Check for deleted.
        if mesh.is_deleted_halfedge(prev) {
            return Err(Error::DeletedHalfedge(prev));
        }
        if mesh.is_deleted_halfedge(next) {
            return Err(Error::DeletedHalfedge(next));
        }
        if mesh.is_deleted_vertex(head) {
            return Err(Error::DeletedVertex(head));
        }
        if let Some(f) = mesh.halfedge_face(h) {
            if !mesh.is_valid_face(f) {
                return Err(Error::InvalidFace(f));
            }
            if mesh.is_deleted_face(f) {
                return Err(Error::DeletedFace(f));
            }
        }
        // Check connctivity.
        if mesh.next_halfedge(prev) != h
            || mesh.prev_halfedge(next) != h
            || head != mesh.from_vertex(next)
            || tail != mesh.to_vertex(prev)
        {
            return Err(Error::InvalidHalfedgeLink(h));
        }
        // Halfedge must be found in the circulators around head and tail.
        if !mesh.voh_ccw_iter(tail).any(|hh| hh == h)
            || !mesh.voh_ccw_iter(head).any(|hh| hh == h.opposite())
        {
            return Err(Error::InvalidHalfedgeVertexLink(h));
        }
    }
    // Check all loops. Flag every halfedge in the first pass, and clear the
    // flags in the second pass. Any halfedge seen twice in either pass belongs
    // to a loop that doesn't close.
    for flag in [true, false] {
        for h in mesh.halfedges() {
            if hflags[h.index() as usize] == flag {
                continue;
            }
            let f = mesh.halfedge_face(h);
            let mut count = 0usize;
            for h in HalfedgeAroundFace::<true>::from_halfedge(mesh, h) {
                if std::mem::replace(&mut hflags[h.index() as usize], flag) == flag {
                    return Err(Error::InvalidLoopTopology(h));
                }
                if mesh.halfedge_face(h) != f {
                    return Err(Error::InconsistentFaceInLoop(h));
                }
                count += 1;
            }
            // Faces need at least three sides.
            if f.is_some() && count < 3 {
                return Err(Error::InvalidLoopTopology(h));
            }
        }
    }
    debug_assert!(hflags.iter().all(|f| !f));
    Ok(())
}

fn check_faces(mesh: &Topology) -> Result<(), Error> {
    for f in mesh.faces() {
        let h = mesh.face_halfedge(f);
        if !mesh.is_valid_halfedge(h) {
            return Err(Error::InvalidHalfedge(h));
        }
        if mesh.is_deleted_halfedge(h) {
            return Err(Error::DeletedHalfedge(h));
        }
        if mesh.halfedge_face(h) != Some(f) {
            return Err(Error::InvalidFaceHalfedgeLink(f, h));
        }
    }
    Ok(())
}

impl Topology {
    /// Check the connectivity of the mesh, and return the first problem found.
    ///
    /// This checks that the next and previous links of every halfedge agree,
    /// that the one-ring of every vertex is a single closed cycle, that every
    /// halfedge loop closes and has one face, and that no live element refers
    /// to a deleted element. Vertices with more than one gap in their one-ring
    /// are allowed, see [`Topology::check_manifold`].
    pub fn check(&self) -> Result<(), Error> {
        // To keep track of visited halfedges.
        let mut hvisited = vec![false; self.halfedges_size()].into_boxed_slice();
        check_vertices(self, &mut hvisited)?;
        check_edges(self, &mut hvisited)?;
        check_faces(self)?;
        Ok(())
    }

    /// Check that every vertex has at most one gap in its one-ring.
    pub fn check_manifold(&self) -> Result<(), Error> {
        match self.vertices().find(|v| !self.is_manifold_vertex(*v)) {
            Some(v) => Err(Error::NonManifoldVertex(v)),
            None => Ok(()),
        }
    }

    /// Halfedges whose opposite is on the same face. A face with such a
    /// halfedge folds onto itself.
    pub fn self_adjacent_halfedges(&self) -> impl Iterator<Item = HH> + use<'_> {
        self.halfedges().filter(|h| {
            let f = self.halfedge_face(*h);
            f.is_some() && f == self.halfedge_face(h.opposite())
        })
    }
}
