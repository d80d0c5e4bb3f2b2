use crate::{
    element::{Handle, EH, FH, HH, VH},
    error::Error,
    topol::Topology,
};

impl Topology {
    /// Delete a vertex, together with all faces incident on it. The edges of
    /// those faces that are left without any face are deleted as well.
    ///
    /// Deletion only flags the elements. They keep their slots until
    /// [`Topology::garbage_collection`] is called.
    pub fn delete_vertex(&mut self, v: VH) -> Result<(), Error> {
        if !self.is_valid_vertex(v) {
            return Err(Error::InvalidVertex(v));
        }
        if self.is_deleted_vertex(v) {
            return Ok(());
        }
        let faces: Vec<FH> = self.vf_ccw_iter(v).collect();
        for f in faces {
            self.delete_face(f)?;
        }
        // Deleting the faces might have already deleted the vertex.
        self.mark_vertex_deleted(v);
        self.garbage = true;
        Ok(())
    }

    /// Delete the faces on both sides of an edge. The edge itself ends up
    /// without faces and is deleted with them.
    pub fn delete_edge(&mut self, e: EH) -> Result<(), Error> {
        if !self.is_valid_edge(e) {
            return Err(Error::InvalidEdge(e));
        }
        if self.is_deleted_edge(e) {
            return Ok(());
        }
        let (h0, h1) = e.halfedges();
        let f0 = self.halfedge_face(h0);
        let f1 = self.halfedge_face(h1);
        for f in [f0, f1].into_iter().flatten() {
            self.delete_face(f)?;
        }
        Ok(())
    }

    /// Delete a face. Its halfedges become boundary halfedges. Edges that are
    /// left without any face, and vertices that are left without any edge are
    /// deleted too.
    pub fn delete_face(&mut self, f: FH) -> Result<(), Error> {
        if !self.is_valid_face(f) {
            return Err(Error::InvalidFace(f));
        }
        if self.is_deleted_face(f) {
            return Ok(());
        }
        self.fstatus[f.index() as usize].set_deleted(true);
        self.deleted_faces += 1;
        let loop_halfedges: Vec<HH> = self.fh_ccw_iter(f).collect();
        let mut dead_edges: Vec<EH> = Vec::with_capacity(loop_halfedges.len());
        let mut verts: Vec<VH> = Vec::with_capacity(loop_halfedges.len());
        for h in loop_halfedges {
            self.set_halfedge_face(h, None);
            if self.is_boundary_halfedge(h.opposite()) {
                dead_edges.push(h.edge());
            }
            verts.push(self.to_vertex(h));
        }
        for e in dead_edges {
            self.unlink_edge(e);
        }
        for v in verts {
            if !self.is_deleted_vertex(v) {
                self.adjust_outgoing_halfedge(v);
            }
        }
        self.garbage = true;
        Ok(())
    }

    /// Remove a boundary edge from the halfedge loops it is part of, and mark
    /// it deleted. Its vertices are deleted if this was their last edge.
    fn unlink_edge(&mut self, e: EH) {
        let (h0, h1) = e.halfedges();
        let v0 = self.to_vertex(h0);
        let next0 = self.next_halfedge(h0);
        let prev0 = self.prev_halfedge(h0);
        let v1 = self.to_vertex(h1);
        let next1 = self.next_halfedge(h1);
        let prev1 = self.prev_halfedge(h1);
        self.set_next_halfedge(prev0, next1);
        self.set_next_halfedge(prev1, next0);
        let status = &mut self.estatus[e.index() as usize];
        if !status.deleted() {
            status.set_deleted(true);
            self.deleted_edges += 1;
        }
        for (v, h, next) in [(v0, h1, next0), (v1, h0, next1)] {
            if self.vertex_halfedge(v) != Some(h) {
                continue;
            }
            if next == h {
                self.mark_vertex_deleted(v);
            } else {
                self.set_vertex_halfedge(v, next);
            }
        }
    }

    fn mark_vertex_deleted(&mut self, v: VH) {
        let status = &mut self.vstatus[v.index() as usize];
        if !status.deleted() {
            status.set_deleted(true);
            self.deleted_vertices += 1;
        }
        self.clear_vertex_halfedge(v);
    }
}

#[cfg(test)]
mod test {
    use crate::{element::Handle, error::Error, topol::test::quad_box};

    #[test]
    fn t_box_delete_face() {
        let mut qbox = quad_box();
        qbox.delete_face(0u32.into()).expect("Cannot delete face");
        assert!(qbox.has_garbage());
        assert!(qbox.is_deleted_face(0u32.into()));
        // The neighbors still hold on to every edge.
        assert_eq!(qbox.num_faces(), 5);
        assert_eq!(qbox.num_edges(), 12);
        assert_eq!(qbox.num_vertices(), 8);
        assert_eq!(qbox.faces_size(), 6);
        assert_eq!(
            qbox.halfedges()
                .filter(|h| qbox.is_boundary_halfedge(*h))
                .count(),
            4
        );
        for v in [0u32, 1, 2, 3] {
            assert!(qbox.is_boundary_vertex(v.into()));
        }
        // Now edge 0-1 is left with no faces.
        qbox.delete_face(1u32.into()).expect("Cannot delete face");
        assert_eq!(qbox.num_faces(), 4);
        assert_eq!(qbox.num_edges(), 11);
        assert!(qbox.find_halfedge(0u32.into(), 1u32.into()).is_none());
        qbox.check().expect("Topology check failed");
        // Deleting twice is a no-op.
        qbox.delete_face(1u32.into()).expect("Cannot delete face");
        assert_eq!(qbox.num_faces(), 4);
    }

    #[test]
    fn t_box_delete_vertex() {
        let mut qbox = quad_box();
        qbox.delete_vertex(0u32.into()).expect("Cannot delete vertex");
        assert_eq!(qbox.num_vertices(), 7);
        assert_eq!(qbox.num_edges(), 9);
        assert_eq!(qbox.num_faces(), 3);
        assert!(qbox.is_deleted_vertex(0u32.into()));
        for v in qbox.vertices() {
            assert!(qbox.is_manifold_vertex(v));
            assert!(qbox.vv_ccw_iter(v).all(|n| n.index() != 0));
        }
        qbox.check().expect("Topology check failed");
    }

    #[test]
    fn t_box_delete_edge() {
        let mut qbox = quad_box();
        let e = qbox
            .find_edge(0u32.into(), 1u32.into())
            .expect("Cannot find edge");
        qbox.delete_edge(e).expect("Cannot delete edge");
        assert!(qbox.is_deleted_edge(e));
        assert_eq!(qbox.num_faces(), 4);
        assert_eq!(qbox.num_edges(), 11);
        assert_eq!(qbox.num_vertices(), 8);
        qbox.check().expect("Topology check failed");
    }

    #[test]
    fn t_delete_everything() {
        let mut qbox = quad_box();
        for f in 0u32..6 {
            qbox.delete_face(f.into()).expect("Cannot delete face");
        }
        assert_eq!(qbox.num_faces(), 0);
        assert_eq!(qbox.num_edges(), 0);
        assert_eq!(qbox.num_vertices(), 0);
        assert_eq!(qbox.vertices().count(), 0);
    }

    #[test]
    fn t_delete_invalid() {
        let mut qbox = quad_box();
        assert!(matches!(
            qbox.delete_face(6u32.into()),
            Err(Error::InvalidFace(_))
        ));
        assert!(matches!(
            qbox.delete_vertex(crate::element::VH::invalid()),
            Err(Error::InvalidVertex(_))
        ));
        assert!(!qbox.has_garbage());
    }
}
