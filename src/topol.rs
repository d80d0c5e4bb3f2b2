use crate::{
    element::{Edge, Face, Halfedge, Handle, Vertex, EH, FH, HH, MH, VH},
    error::Error,
    macros::property_api,
    property::PropertyContainer,
    status::Status,
};

enum TentativeEdge {
    Old(HH),
    New {
        index: u32,
        from: VH,
        to: VH,
        prev: Option<HH>,
        next: Option<HH>,
        opp_prev: Option<HH>,
        opp_next: Option<HH>,
    },
}

/// Scratch buffers reused across calls to [`Topology::add_face`], to avoid
/// allocating for every face.
#[derive(Default)]
pub(crate) struct TopolCache {
    loop_halfedges: Vec<Option<HH>>,
    needs_adjust: Vec<bool>,
    next_cache: Vec<(HH, HH)>,
    tentative: Vec<TentativeEdge>,
    halfedges: Vec<HH>,
}

impl TopolCache {
    fn clear(&mut self) {
        self.loop_halfedges.clear();
        self.needs_adjust.clear();
        self.next_cache.clear();
        self.tentative.clear();
        self.halfedges.clear();
    }
}

/**
 * Connectivity of a polygon mesh, together with the property containers of
 * every kind of element.
 *
 * The connectivity records live in flat arrays indexed by the handles, and the
 * property containers are always kept the same length as these arrays. Edges
 * store both of their halfedges, so the halfedge `h` lives in edge `h / 2` and
 * its opposite is `h ^ 1`.
 *
 * Deletion is lazy. Deleted elements are flagged in their [`Status`] and keep
 * their slots until [`Topology::garbage_collection`] compacts the arrays.
 */
pub struct Topology {
    pub(crate) vertices: Vec<Vertex>,
    pub(crate) edges: Vec<Edge>,
    pub(crate) faces: Vec<Face>,
    pub(crate) vstatus: Vec<Status>,
    pub(crate) estatus: Vec<Status>,
    pub(crate) fstatus: Vec<Status>,
    pub(crate) vprops: PropertyContainer<VH>,
    pub(crate) hprops: PropertyContainer<HH>,
    pub(crate) eprops: PropertyContainer<EH>,
    pub(crate) fprops: PropertyContainer<FH>,
    pub(crate) mprops: PropertyContainer<MH>,
    pub(crate) deleted_vertices: usize,
    pub(crate) deleted_edges: usize,
    pub(crate) deleted_faces: usize,
    pub(crate) garbage: bool,
}

impl Topology {
    pub fn new() -> Self {
        Self::with_capacity(0, 0, 0)
    }

    pub fn with_capacity(nverts: usize, nedges: usize, nfaces: usize) -> Self {
        Topology {
            vertices: Vec::with_capacity(nverts),
            edges: Vec::with_capacity(nedges),
            faces: Vec::with_capacity(nfaces),
            vstatus: Vec::with_capacity(nverts),
            estatus: Vec::with_capacity(nedges),
            fstatus: Vec::with_capacity(nfaces),
            vprops: PropertyContainer::new(),
            hprops: PropertyContainer::new(),
            eprops: PropertyContainer::new(),
            fprops: PropertyContainer::new(),
            mprops: PropertyContainer::new_with_size(1),
            deleted_vertices: 0,
            deleted_edges: 0,
            deleted_faces: 0,
            garbage: false,
        }
    }

    /// Reserve memory for an additional `nverts` vertices, `nedges` edges and
    /// `nfaces` faces.
    pub fn reserve(&mut self, nverts: usize, nedges: usize, nfaces: usize) -> Result<(), Error> {
        self.vprops.reserve(nverts)?;
        self.hprops.reserve(nedges * 2)?;
        self.eprops.reserve(nedges)?;
        self.fprops.reserve(nfaces)?;
        self.vertices.reserve(nverts);
        self.vstatus.reserve(nverts);
        self.edges.reserve(nedges);
        self.estatus.reserve(nedges);
        self.faces.reserve(nfaces);
        self.fstatus.reserve(nfaces);
        Ok(())
    }

    /// Remove all elements. The properties are kept, but they will have no
    /// values.
    pub fn clear(&mut self) -> Result<(), Error> {
        self.vprops.check_borrows()?;
        self.hprops.check_borrows()?;
        self.eprops.check_borrows()?;
        self.fprops.check_borrows()?;
        self.vprops.resize(0)?;
        self.hprops.resize(0)?;
        self.eprops.resize(0)?;
        self.fprops.resize(0)?;
        self.vertices.clear();
        self.edges.clear();
        self.faces.clear();
        self.vstatus.clear();
        self.estatus.clear();
        self.fstatus.clear();
        self.deleted_vertices = 0;
        self.deleted_edges = 0;
        self.deleted_faces = 0;
        self.garbage = false;
        Ok(())
    }

    /// Clone the connectivity and every property. The clone shares no data
    /// with `self`, so fails if any property is currently borrowed mutably.
    pub fn try_clone(&self) -> Result<Self, Error> {
        Ok(Topology {
            vertices: self.vertices.clone(),
            edges: self.edges.clone(),
            faces: self.faces.clone(),
            vstatus: self.vstatus.clone(),
            estatus: self.estatus.clone(),
            fstatus: self.fstatus.clone(),
            vprops: self.vprops.deep_clone()?,
            hprops: self.hprops.deep_clone()?,
            eprops: self.eprops.deep_clone()?,
            fprops: self.fprops.deep_clone()?,
            mprops: self.mprops.deep_clone()?,
            deleted_vertices: self.deleted_vertices,
            deleted_edges: self.deleted_edges,
            deleted_faces: self.deleted_faces,
            garbage: self.garbage,
        })
    }

    property_api!(
        VH,
        "vertex",
        vprops,
        reserved: &[],
        add_vertex_property,
        get_vertex_property,
        remove_vertex_property,
        rename_vertex_property,
        vertex_property_names,
        vertex_property_type
    );

    property_api!(
        HH,
        "halfedge",
        hprops,
        reserved: &[],
        add_halfedge_property,
        get_halfedge_property,
        remove_halfedge_property,
        rename_halfedge_property,
        halfedge_property_names,
        halfedge_property_type
    );

    property_api!(
        EH,
        "edge",
        eprops,
        reserved: &[],
        add_edge_property,
        get_edge_property,
        remove_edge_property,
        rename_edge_property,
        edge_property_names,
        edge_property_type
    );

    property_api!(
        FH,
        "face",
        fprops,
        reserved: &[],
        add_face_property,
        get_face_property,
        remove_face_property,
        rename_face_property,
        face_property_names,
        face_property_type
    );

    property_api!(
        MH,
        "model",
        mprops,
        reserved: &[],
        add_model_property,
        get_model_property,
        remove_model_property,
        rename_model_property,
        model_property_names,
        model_property_type
    );

    fn halfedge(&self, h: HH) -> &Halfedge {
        &self.edges[(h.index() >> 1) as usize].halfedges[(h.index() & 1) as usize]
    }

    fn halfedge_mut(&mut self, h: HH) -> &mut Halfedge {
        &mut self.edges[(h.index() >> 1) as usize].halfedges[(h.index() & 1) as usize]
    }

    /// Outgoing halfedge of the vertex. `None` if the vertex is isolated or
    /// doesn't exist. For boundary vertices this is a boundary halfedge.
    pub fn vertex_halfedge(&self, v: VH) -> Option<HH> {
        self.vertices
            .get(v.index() as usize)
            .and_then(|v| v.halfedge)
    }

    /* The connectivity accessors below don't check their arguments, and
     * panic on handles that don't exist. The public, checked versions are the
     * methods on the handles, e.g. `HH::head`.
     */

    pub(crate) fn to_vertex(&self, h: HH) -> VH {
        self.halfedge(h).vertex
    }

    pub(crate) fn from_vertex(&self, h: HH) -> VH {
        self.halfedge(h.opposite()).vertex
    }

    pub(crate) fn prev_halfedge(&self, h: HH) -> HH {
        self.halfedge(h).prev
    }

    pub(crate) fn next_halfedge(&self, h: HH) -> HH {
        self.halfedge(h).next
    }

    pub(crate) fn halfedge_face(&self, h: HH) -> Option<FH> {
        self.halfedge(h).face
    }

    pub(crate) fn face_halfedge(&self, f: FH) -> HH {
        self.faces[f.index() as usize].halfedge
    }

    pub(crate) fn validate_halfedge(&self, h: HH) -> Result<HH, Error> {
        if self.is_valid_halfedge(h) {
            Ok(h)
        } else {
            Err(Error::InvalidHalfedge(h))
        }
    }

    pub(crate) fn validate_face(&self, f: FH) -> Result<FH, Error> {
        if self.is_valid_face(f) {
            Ok(f)
        } else {
            Err(Error::InvalidFace(f))
        }
    }

    pub fn is_valid_vertex(&self, v: VH) -> bool {
        (v.index() as usize) < self.vertices.len()
    }

    pub fn is_valid_halfedge(&self, h: HH) -> bool {
        ((h.index() >> 1) as usize) < self.edges.len() && !h.is_null()
    }

    pub fn is_valid_edge(&self, e: EH) -> bool {
        (e.index() as usize) < self.edges.len()
    }

    pub fn is_valid_face(&self, f: FH) -> bool {
        (f.index() as usize) < self.faces.len()
    }

    pub fn is_deleted_vertex(&self, v: VH) -> bool {
        self.vstatus
            .get(v.index() as usize)
            .is_some_and(|s| s.deleted())
    }

    pub fn is_deleted_edge(&self, e: EH) -> bool {
        self.estatus
            .get(e.index() as usize)
            .is_some_and(|s| s.deleted())
    }

    pub fn is_deleted_halfedge(&self, h: HH) -> bool {
        self.is_deleted_edge(h.edge())
    }

    pub fn is_deleted_face(&self, f: FH) -> bool {
        self.fstatus
            .get(f.index() as usize)
            .is_some_and(|s| s.deleted())
    }

    pub fn vertex_status(&self, v: VH) -> Result<Status, Error> {
        self.vstatus
            .get(v.index() as usize)
            .copied()
            .ok_or(Error::InvalidVertex(v))
    }

    pub fn vertex_status_mut(&mut self, v: VH) -> Result<&mut Status, Error> {
        self.vstatus
            .get_mut(v.index() as usize)
            .ok_or(Error::InvalidVertex(v))
    }

    pub fn edge_status(&self, e: EH) -> Result<Status, Error> {
        self.estatus
            .get(e.index() as usize)
            .copied()
            .ok_or(Error::InvalidEdge(e))
    }

    pub fn edge_status_mut(&mut self, e: EH) -> Result<&mut Status, Error> {
        self.estatus
            .get_mut(e.index() as usize)
            .ok_or(Error::InvalidEdge(e))
    }

    pub fn face_status(&self, f: FH) -> Result<Status, Error> {
        self.fstatus
            .get(f.index() as usize)
            .copied()
            .ok_or(Error::InvalidFace(f))
    }

    pub fn face_status_mut(&mut self, f: FH) -> Result<&mut Status, Error> {
        self.fstatus
            .get_mut(f.index() as usize)
            .ok_or(Error::InvalidFace(f))
    }

    /// `false` for halfedges that don't exist.
    pub fn is_boundary_halfedge(&self, h: HH) -> bool {
        self.edges
            .get((h.index() >> 1) as usize)
            .is_some_and(|e| e.halfedges[(h.index() & 1) as usize].face.is_none())
    }

    pub fn is_boundary_edge(&self, e: EH) -> bool {
        let (h, oh) = e.halfedges();
        self.is_boundary_halfedge(h) || self.is_boundary_halfedge(oh)
    }

    /// Isolated vertices are considered to be on the boundary. Vertices that
    /// don't exist are not.
    pub fn is_boundary_vertex(&self, v: VH) -> bool {
        match self.vertex_halfedge(v) {
            Some(h) => self.is_boundary_halfedge(h),
            None => self.is_valid_vertex(v),
        }
    }

    pub fn is_isolated_vertex(&self, v: VH) -> bool {
        self.is_valid_vertex(v) && self.vertex_halfedge(v).is_none()
    }

    pub fn is_boundary_face(&self, f: FH) -> bool {
        self.fh_ccw_iter(f)
            .any(|h| self.is_boundary_halfedge(h.opposite()))
    }

    pub fn is_manifold_vertex(&self, v: VH) -> bool {
        /* If just the first outgoing halfedge is on the boundary, it just means
         * the vertex is on the boundary. If the first outgoing halfedge is not
         * on the boundary, it implies the vertex is in the interior. In both
         * cases the vertex is manifold. If any outgoing halfedge apart from the
         * first is on the boundary, it implies there are more than one gaps
         * when circulating around the vertex, making it non-manifold. For this
         * reason, we skip the first halfedge and check the rest.
         */
        self.is_valid_vertex(v)
            && self
                .voh_ccw_iter(v)
                .skip(1)
                .all(|h| !self.is_boundary_halfedge(h))
    }

    /// Number of vertices that are not deleted.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len() - self.deleted_vertices
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len() - self.deleted_edges
    }

    pub fn num_halfedges(&self) -> usize {
        self.num_edges() * 2
    }

    pub fn num_faces(&self) -> usize {
        self.faces.len() - self.deleted_faces
    }

    /// Number of vertex slots, including deleted vertices.
    pub fn vertices_size(&self) -> usize {
        self.vertices.len()
    }

    pub fn edges_size(&self) -> usize {
        self.edges.len()
    }

    pub fn halfedges_size(&self) -> usize {
        self.edges.len() * 2
    }

    pub fn faces_size(&self) -> usize {
        self.faces.len()
    }

    pub fn has_garbage(&self) -> bool {
        self.garbage
    }

    /// Vertices that are not deleted.
    pub fn vertices(&self) -> impl Iterator<Item = VH> + use<'_> {
        (0..(self.vertices.len() as u32))
            .map(VH::from)
            .filter(|v| !self.vstatus[v.index() as usize].deleted())
    }

    pub fn halfedges(&self) -> impl Iterator<Item = HH> + use<'_> {
        (0..(self.halfedges_size() as u32))
            .map(HH::from)
            .filter(|h| !self.estatus[(h.index() >> 1) as usize].deleted())
    }

    pub fn edges(&self) -> impl Iterator<Item = EH> + use<'_> {
        (0..(self.edges.len() as u32))
            .map(EH::from)
            .filter(|e| !self.estatus[e.index() as usize].deleted())
    }

    pub fn faces(&self) -> impl Iterator<Item = FH> + use<'_> {
        (0..(self.faces.len() as u32))
            .map(FH::from)
            .filter(|f| !self.fstatus[f.index() as usize].deleted())
    }

    pub fn find_halfedge(&self, from: VH, to: VH) -> Option<HH> {
        self.voh_ccw_iter(from).find(|h| self.to_vertex(*h) == to)
    }

    pub fn find_edge(&self, a: VH, b: VH) -> Option<EH> {
        self.find_halfedge(a, b).map(|h| h.edge())
    }

    pub fn vertex_valence(&self, v: VH) -> usize {
        self.voh_ccw_iter(v).count()
    }

    pub fn face_valence(&self, f: FH) -> usize {
        self.fh_ccw_iter(f).count()
    }

    /// Make the outgoing halfedge of the vertex a boundary halfedge, if it has
    /// one. Boundary queries on vertices rely on this.
    pub(crate) fn adjust_outgoing_halfedge(&mut self, v: VH) {
        let h = self
            .voh_ccw_iter(v)
            .find(|h| self.is_boundary_halfedge(*h));
        if let Some(h) = h {
            self.set_vertex_halfedge(v, h)
        }
    }

    /// Look for a boundary gap at the vertex `inner_prev` points to, other
    /// than the one between `inner_prev` and `inner_next`, where the halfedges
    /// between the two can be moved to. Returns the boundary halfedges on both
    /// sides of that gap.
    pub(crate) fn find_free_gap(&self, inner_prev: HH, inner_next: HH) -> Result<(HH, HH), Error> {
        let mut boundprev = inner_next.opposite();
        let mut found = false;
        for _ in 0..self.halfedges_size() {
            boundprev = self.next_halfedge(boundprev).opposite();
            if self.is_boundary_halfedge(boundprev) && boundprev != inner_prev {
                found = true;
                break;
            }
        }
        let boundnext = self.next_halfedge(boundprev);
        if !found || boundnext == inner_next {
            return Err(Error::PatchRelinkingFailed);
        }
        debug_assert!(self.is_boundary_halfedge(boundnext));
        Ok((boundprev, boundnext))
    }

    pub fn add_vertex(&mut self) -> Result<VH, Error> {
        let vi = self.vertices.len() as u32;
        self.vprops.push_value()?;
        self.vertices.push(Vertex { halfedge: None });
        self.vstatus.push(Status::default());
        Ok(vi.into())
    }

    fn new_edge(
        &mut self,
        from: VH,
        to: VH,
        prev: HH,
        next: HH,
        opp_prev: HH,
        opp_next: HH,
    ) -> Result<u32, Error> {
        let ei = self.edges.len() as u32;
        self.eprops.push_value()?;
        self.hprops.push_values(2)?;
        self.edges.push(Edge {
            halfedges: [
                Halfedge {
                    face: None,
                    vertex: to,
                    next,
                    prev,
                },
                Halfedge {
                    face: None,
                    vertex: from,
                    next: opp_next,
                    prev: opp_prev,
                },
            ],
        });
        self.estatus.push(Status::default());
        Ok(ei)
    }

    fn new_face(&mut self, halfedge: HH) -> Result<FH, Error> {
        let fi = self.faces.len() as u32;
        self.fprops.push_value()?;
        self.faces.push(Face { halfedge });
        self.fstatus.push(Status::default());
        Ok(fi.into())
    }

    pub(crate) fn set_vertex_halfedge(&mut self, v: VH, h: HH) {
        self.vertices[v.index() as usize].halfedge = Some(h);
    }

    pub(crate) fn clear_vertex_halfedge(&mut self, v: VH) {
        self.vertices[v.index() as usize].halfedge = None;
    }

    pub(crate) fn set_next_halfedge(&mut self, hprev: HH, hnext: HH) {
        self.halfedge_mut(hprev).next = hnext;
        self.halfedge_mut(hnext).prev = hprev;
    }

    pub(crate) fn set_halfedge_vertex(&mut self, h: HH, v: VH) {
        self.halfedge_mut(h).vertex = v;
    }

    pub(crate) fn set_halfedge_face(&mut self, h: HH, f: Option<FH>) {
        self.halfedge_mut(h).face = f;
    }

    /// Check the vertex list of a new face for problems that don't depend on
    /// the existing topology.
    fn validate_face_vertices(&self, verts: &[VH]) -> Result<(), Error> {
        if verts.len() < 3 {
            return Err(Error::TooFewVertices(verts.len()));
        }
        for (i, v) in verts.iter().enumerate() {
            if !self.is_valid_vertex(*v) {
                return Err(Error::InvalidVertex(*v));
            }
            if self.is_deleted_vertex(*v) {
                return Err(Error::DeletedVertex(*v));
            }
            if verts[..i].contains(v) {
                return Err(Error::DuplicateVertex(*v));
            }
        }
        Ok(())
    }

    /**
     * Add a face with the given vertices.
     *
     * The face is rejected without modifying the mesh if it has less than 3
     * vertices, if a vertex is repeated, invalid or deleted, if a vertex is not
     * on the boundary, if one of the halfedges of the new face already has a
     * face, or if the existing faces around a vertex cannot be reordered to
     * make room for the new face. This function never creates a non-manifold
     * edge. It can create a vertex with more than one gap in its one-ring,
     * which [`Topology::is_manifold_vertex`] reports.
     */
    pub(crate) fn add_face(&mut self, verts: &[VH], cache: &mut TopolCache) -> Result<FH, Error> {
        self.validate_face_vertices(verts)?;
        // Nothing below may fail halfway because a property is borrowed.
        self.hprops.check_borrows()?;
        self.eprops.check_borrows()?;
        self.fprops.check_borrows()?;
        let nverts = verts.len();
        cache.clear();
        cache.loop_halfedges.reserve(nverts);
        cache.needs_adjust.reserve(nverts);
        cache.next_cache.reserve(nverts * 6);
        // Check for topological errors.
        for i in 0..nverts {
            if !self.is_boundary_vertex(verts[i]) {
                // Ensure vertex is manifold.
                return Err(Error::ComplexVertex(verts[i]));
            }
            // Ensure edge is manifold.
            let h = self.find_halfedge(verts[i], verts[(i + 1) % nverts]);
            match h {
                Some(h) if !self.is_boundary_halfedge(h) => return Err(Error::ComplexHalfedge(h)),
                _ => {} // Do nothing.
            }
            cache.loop_halfedges.push(h);
            cache.needs_adjust.push(false);
        }
        // If any vertex has more than two incident boundary edges, relinking might be necessary.
        for i in 0..nverts {
            let (prev, next) = match (
                cache.loop_halfedges[i],
                cache.loop_halfedges[(i + 1) % nverts],
            ) {
                (Some(prev), Some(next)) if self.next_halfedge(prev) != next => (prev, next),
                _ => continue,
            };
            // Relink the patch.
            let (boundprev, boundnext) = self.find_free_gap(prev, next)?;
            // other halfedges.
            let pstart = self.next_halfedge(prev);
            let pend = self.prev_halfedge(next);
            // relink.
            cache.next_cache.extend_from_slice(&[
                (boundprev, pstart),
                (pend, boundnext),
                (prev, next),
            ]);
        }
        // Create boundary loop. No more errors allowed from this point.
        cache.tentative.reserve(nverts);
        {
            let mut ei = self.edges.len() as u32;
            cache
                .tentative
                .extend((0..nverts).map(|i| match cache.loop_halfedges[i] {
                    Some(h) => TentativeEdge::Old(h),
                    None => TentativeEdge::New {
                        index: {
                            let current = ei;
                            ei += 1;
                            current << 1
                        },
                        from: verts[i],
                        to: verts[(i + 1) % nverts],
                        prev: None,
                        next: None,
                        opp_prev: None,
                        opp_next: None,
                    },
                }));
        }
        for (i, j) in (0..nverts).map(|i| (i, (i + 1) % nverts)) {
            let (e0, e1) = if j == 0 {
                let (right, left) = cache.tentative.split_at_mut(i);
                (&mut left[0], &mut right[0])
            } else {
                let (left, right) = cache.tentative.split_at_mut(j);
                (&mut left[left.len() - 1], &mut right[0])
            };
            let v = verts[j];
            match (e0, e1) {
                (TentativeEdge::Old(_), TentativeEdge::Old(innernext)) => {
                    cache.needs_adjust[j] = self.vertex_halfedge(v) == Some(*innernext);
                }
                (
                    TentativeEdge::New {
                        index: innerprev,
                        opp_prev,
                        next,
                        ..
                    },
                    TentativeEdge::Old(innernext),
                ) => {
                    let innernext = *innernext;
                    let innerprev = HH::from(*innerprev);
                    let outernext = innerprev.opposite();
                    let boundprev = self.prev_halfedge(innernext);
                    cache.next_cache.push((boundprev, outernext));
                    *opp_prev = Some(boundprev);
                    cache.next_cache.push((innerprev, innernext));
                    *next = Some(innernext);
                    self.set_vertex_halfedge(v, outernext);
                }
                (
                    TentativeEdge::Old(innerprev),
                    TentativeEdge::New {
                        index: innernext,
                        prev,
                        opp_next,
                        ..
                    },
                ) => {
                    let innerprev = *innerprev;
                    let innernext = HH::from(*innernext);
                    let outerprev = innernext.opposite();
                    let boundnext = self.next_halfedge(innerprev);
                    cache.next_cache.push((outerprev, boundnext));
                    *opp_next = Some(boundnext);
                    cache.next_cache.push((innerprev, innernext));
                    *prev = Some(innerprev);
                    self.set_vertex_halfedge(v, boundnext);
                }
                (
                    TentativeEdge::New {
                        index: innerprev,
                        next,
                        opp_prev,
                        ..
                    },
                    TentativeEdge::New {
                        index: innernext,
                        prev,
                        opp_next,
                        ..
                    },
                ) => {
                    let innerprev = HH::from(*innerprev);
                    let innernext = HH::from(*innernext);
                    let outernext = innerprev.opposite();
                    let outerprev = innernext.opposite();
                    if let Some(boundnext) = self.vertex_halfedge(v) {
                        let boundprev = self.prev_halfedge(boundnext);
                        cache
                            .next_cache
                            .extend(&[(boundprev, outernext), (outerprev, boundnext)]);
                        *next = Some(innernext);
                        *opp_prev = Some(boundprev);
                        *prev = Some(innerprev);
                        *opp_next = Some(boundnext);
                    } else {
                        self.set_vertex_halfedge(v, outernext);
                        *next = Some(innernext);
                        *opp_prev = Some(outerprev);
                        *prev = Some(innerprev);
                        *opp_next = Some(outernext);
                    }
                }
            };
        }
        // Convert tentative edges into real edges.
        cache.halfedges.reserve(cache.tentative.len());
        for tedge in &cache.tentative {
            let h = match tedge {
                TentativeEdge::Old(h) => *h,
                TentativeEdge::New {
                    index,
                    from,
                    to,
                    prev: Some(prev),
                    next: Some(next),
                    opp_prev: Some(opp_prev),
                    opp_next: Some(opp_next),
                } => {
                    let ei = self.new_edge(*from, *to, *prev, *next, *opp_prev, *opp_next)?;
                    debug_assert_eq!(*index >> 1, ei, "Failed to create an edge loop");
                    HH::from(*index)
                }
                TentativeEdge::New { .. } => return Err(Error::PatchRelinkingFailed),
            };
            cache.halfedges.push(h);
        }
        // Create the face.
        let fnew = self.new_face(cache.halfedges[nverts - 1])?;
        for h in &cache.halfedges {
            self.halfedge_mut(*h).face = Some(fnew);
        }
        // Process next halfedge cache.
        for (prev, next) in cache.next_cache.drain(..) {
            self.set_next_halfedge(prev, next);
        }
        // Adjust vertices' halfedge handles.
        for i in 0..nverts {
            if cache.needs_adjust[i] {
                self.adjust_outgoing_halfedge(verts[i]);
            }
        }
        Ok(fnew)
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::new()
    }
}
