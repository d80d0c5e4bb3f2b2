use glam::Vec3;

use crate::{
    element::{Edge, Face, Handle, Vertex, EH, FH, HH, MH, VH},
    error::Error,
    macros::property_api,
    property::VProperty,
    status::Status,
    topol::{TopolCache, Topology},
};

/// Name of the vertex property holding the positions of the vertices. Every
/// [`PolyMesh`] has it.
pub const POINTS: &str = "v:point";

/**
 * Polygon mesh with vertex positions.
 *
 * This wraps the connectivity ([`Topology`]) and keeps the positions of the
 * vertices in the `"v:point"` vertex property. Faces can be added directly
 * with [`PolyMesh::add_face`], which rejects faces that would break the
 * connectivity, or through a [`ManifoldBuilder`](crate::ManifoldBuilder),
 * which repairs such faces instead.
 *
 * ```rust
 * use halfmesh::PolyMesh;
 * use glam::vec3;
 *
 * let mut mesh = PolyMesh::new();
 * let v0 = mesh.add_vertex(vec3(0.0, 0.0, 0.0)).expect("Cannot add vertex");
 * let v1 = mesh.add_vertex(vec3(1.0, 0.0, 0.0)).expect("Cannot add vertex");
 * let v2 = mesh.add_vertex(vec3(1.0, 1.0, 0.0)).expect("Cannot add vertex");
 * let f = mesh.add_tri_face(v0, v1, v2).expect("Cannot add face");
 * assert_eq!(mesh.face_valence(f), 3);
 * assert_eq!(mesh.num_edges(), 3);
 * ```
 */
pub struct PolyMesh {
    pub(crate) topol: Topology,
    pub(crate) cache: TopolCache,
    points: VProperty<Vec3>,
}

impl Default for PolyMesh {
    fn default() -> Self {
        Self::new()
    }
}

impl PolyMesh {
    pub fn new() -> Self {
        Self::with_capacity(0, 0, 0)
    }

    pub fn with_capacity(nverts: usize, nedges: usize, nfaces: usize) -> Self {
        let mut topol = Topology::with_capacity(nverts, nedges, nfaces);
        let points = topol.vprops.create(POINTS, Vec3::ZERO);
        PolyMesh {
            topol,
            cache: TopolCache::default(),
            points,
        }
    }

    /// Deep copy of the mesh. No property is shared between the copy and the
    /// original.
    pub fn try_clone(&self) -> Result<Self, Error> {
        let topol = self.topol.try_clone()?;
        let points = topol
            .vprops
            .get::<Vec3>(POINTS)?
            .ok_or_else(|| Error::PropertyDoesNotExist(POINTS.to_string()))?;
        Ok(PolyMesh {
            topol,
            cache: TopolCache::default(),
            points,
        })
    }

    pub fn reserve(&mut self, nverts: usize, nedges: usize, nfaces: usize) -> Result<(), Error> {
        self.topol.reserve(nverts, nedges, nfaces)
    }

    /// Remove all elements. The properties stay, without any values.
    pub fn clear(&mut self) -> Result<(), Error> {
        self.topol.clear()
    }

    property_api!(
        VH,
        "vertex",
        topol.vprops,
        reserved: &[POINTS],
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
        topol.hprops,
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
        topol.eprops,
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
        topol.fprops,
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
        topol.mprops,
        reserved: &[],
        add_model_property,
        get_model_property,
        remove_model_property,
        rename_model_property,
        model_property_names,
        model_property_type
    );

    /// The positions of the vertices.
    pub fn points(&self) -> VProperty<Vec3> {
        self.points.clone()
    }

    pub fn point(&self, v: VH) -> Result<Vec3, Error> {
        self.points.get_cloned(v)
    }

    pub fn set_point(&mut self, v: VH, pos: Vec3) -> Result<(), Error> {
        self.points.set(v, pos)
    }

    pub fn add_vertex(&mut self, pos: Vec3) -> Result<VH, Error> {
        let v = self.topol.add_vertex()?;
        self.points.set(v, pos)?;
        Ok(v)
    }

    /// Add a face with the given vertices, in counter clockwise order.
    ///
    /// The face is rejected if it has less than 3 vertices, if a vertex is
    /// repeated, invalid or deleted, if a vertex is not on the boundary, if
    /// one of its halfedges already has a face, or if the faces around a
    /// vertex cannot be reordered to make room for it. A rejected face leaves
    /// the mesh unchanged.
    pub fn add_face(&mut self, verts: &[VH]) -> Result<FH, Error> {
        self.topol
            .add_face(verts, &mut self.cache)
            .inspect_err(|e| log::debug!("Face {:?} rejected: {}", verts, e))
    }

    pub fn add_tri_face(&mut self, v0: VH, v1: VH, v2: VH) -> Result<FH, Error> {
        self.add_face(&[v0, v1, v2])
    }

    pub fn add_quad_face(&mut self, v0: VH, v1: VH, v2: VH, v3: VH) -> Result<FH, Error> {
        self.add_face(&[v0, v1, v2, v3])
    }

    /// Number of vertices, not counting deleted vertices.
    pub fn num_vertices(&self) -> usize {
        self.topol.num_vertices()
    }

    pub fn num_edges(&self) -> usize {
        self.topol.num_edges()
    }

    pub fn num_halfedges(&self) -> usize {
        self.topol.num_halfedges()
    }

    pub fn num_faces(&self) -> usize {
        self.topol.num_faces()
    }

    /// Number of vertices, including deleted vertices.
    pub fn vertices_size(&self) -> usize {
        self.topol.vertices_size()
    }

    pub fn edges_size(&self) -> usize {
        self.topol.edges_size()
    }

    pub fn halfedges_size(&self) -> usize {
        self.topol.halfedges_size()
    }

    pub fn faces_size(&self) -> usize {
        self.topol.faces_size()
    }

    pub fn vertices(&self) -> impl Iterator<Item = VH> + use<'_> {
        self.topol.vertices()
    }

    pub fn halfedges(&self) -> impl Iterator<Item = HH> + use<'_> {
        self.topol.halfedges()
    }

    pub fn edges(&self) -> impl Iterator<Item = EH> + use<'_> {
        self.topol.edges()
    }

    pub fn faces(&self) -> impl Iterator<Item = FH> + use<'_> {
        self.topol.faces()
    }

    pub fn find_halfedge(&self, from: VH, to: VH) -> Option<HH> {
        self.topol.find_halfedge(from, to)
    }

    pub fn find_edge(&self, a: VH, b: VH) -> Option<EH> {
        self.topol.find_edge(a, b)
    }

    pub fn is_boundary_vertex(&self, v: VH) -> bool {
        self.topol.is_boundary_vertex(v)
    }

    pub fn is_boundary_halfedge(&self, h: HH) -> bool {
        self.topol.is_boundary_halfedge(h)
    }

    pub fn is_boundary_edge(&self, e: EH) -> bool {
        self.topol.is_boundary_edge(e)
    }

    pub fn is_boundary_face(&self, f: FH) -> bool {
        self.topol.is_boundary_face(f)
    }

    pub fn is_isolated_vertex(&self, v: VH) -> bool {
        self.topol.is_isolated_vertex(v)
    }

    pub fn is_manifold_vertex(&self, v: VH) -> bool {
        self.topol.is_manifold_vertex(v)
    }

    pub fn vertex_valence(&self, v: VH) -> usize {
        self.topol.vertex_valence(v)
    }

    pub fn face_valence(&self, f: FH) -> usize {
        self.topol.face_valence(f)
    }

    pub fn is_triangle_mesh(&self) -> bool {
        self.faces().all(|f| self.face_valence(f) == 3)
    }

    pub fn is_quad_mesh(&self) -> bool {
        self.faces().all(|f| self.face_valence(f) == 4)
    }

    pub fn has_garbage(&self) -> bool {
        self.topol.has_garbage()
    }

    pub fn is_deleted_vertex(&self, v: VH) -> bool {
        self.topol.is_deleted_vertex(v)
    }

    pub fn is_deleted_halfedge(&self, h: HH) -> bool {
        self.topol.is_deleted_halfedge(h)
    }

    pub fn is_deleted_edge(&self, e: EH) -> bool {
        self.topol.is_deleted_edge(e)
    }

    pub fn is_deleted_face(&self, f: FH) -> bool {
        self.topol.is_deleted_face(f)
    }

    pub fn vertex_status(&self, v: VH) -> Result<Status, Error> {
        self.topol.vertex_status(v)
    }

    pub fn edge_status(&self, e: EH) -> Result<Status, Error> {
        self.topol.edge_status(e)
    }

    pub fn face_status(&self, f: FH) -> Result<Status, Error> {
        self.topol.face_status(f)
    }

    pub fn delete_vertex(&mut self, v: VH) -> Result<(), Error> {
        self.topol.delete_vertex(v)
    }

    pub fn delete_edge(&mut self, e: EH) -> Result<(), Error> {
        self.topol.delete_edge(e)
    }

    pub fn delete_face(&mut self, f: FH) -> Result<(), Error> {
        self.topol.delete_face(f)
    }

    pub fn garbage_collection(&mut self) -> Result<(), Error> {
        self.topol.garbage_collection()
    }

    /// Check the topology of the mesh.
    ///
    /// This function will return an error if any errors are found in the topolgy.
    pub fn check_topology(&self) -> Result<(), Error> {
        self.topol.check()
    }

    /**
     * Append the elements of `other` to this mesh.
     *
     * The vertices, edges and faces of `other` are added after the existing
     * ones, with their properties. Properties that exist only in `other` are
     * added to this mesh, and get the default value on the existing elements.
     * Properties that exist only in this mesh get the default value on the
     * appended elements. Model properties are not touched.
     *
     * Neither mesh may have deleted elements that are not yet garbage
     * collected. A property with the same name but different types in the two
     * meshes fails with [`Error::DuplicateName`], and leaves this mesh
     * unchanged.
     */
    pub fn join(&mut self, other: &PolyMesh) -> Result<(), Error> {
        if self.has_garbage() || other.has_garbage() {
            return Err(Error::GarbageCollectionRequired);
        }
        let dst = &mut self.topol;
        let src = &other.topol;
        for result in [
            dst.vprops.check_borrows(),
            dst.hprops.check_borrows(),
            dst.eprops.check_borrows(),
            dst.fprops.check_borrows(),
            src.vprops.check_borrows(),
            src.hprops.check_borrows(),
            src.eprops.check_borrows(),
            src.fprops.check_borrows(),
            dst.vprops.check_compatible(&src.vprops),
            dst.hprops.check_compatible(&src.hprops),
            dst.eprops.check_compatible(&src.eprops),
            dst.fprops.check_compatible(&src.fprops),
        ] {
            result?;
        }
        let (nv, ne, nf) = (dst.vertices.len(), dst.edges.len(), dst.faces.len());
        let nh = ne * 2;
        dst.vprops.copy_properties(&src.vprops);
        dst.hprops.copy_properties(&src.hprops);
        dst.eprops.copy_properties(&src.eprops);
        dst.fprops.copy_properties(&src.fprops);
        dst.vprops.resize(nv + src.vertices.len())?;
        dst.hprops.resize(nh + src.halfedges_size())?;
        dst.eprops.resize(ne + src.edges.len())?;
        dst.fprops.resize(nf + src.faces.len())?;
        dst.vprops.transfer(&src.vprops)?;
        dst.hprops.transfer(&src.hprops)?;
        dst.eprops.transfer(&src.eprops)?;
        dst.fprops.transfer(&src.fprops)?;
        // Shift the connectivity of the appended elements.
        let vshift = |v: VH| VH::from(v.index() as usize + nv);
        let hshift = |h: HH| HH::from(h.index() as usize + nh);
        let fshift = |f: FH| FH::from(f.index() as usize + nf);
        dst.vertices.extend(src.vertices.iter().map(|v| Vertex {
            halfedge: v.halfedge.map(hshift),
        }));
        dst.edges.extend(src.edges.iter().map(|e| {
            let mut e: Edge = *e;
            for h in e.halfedges.iter_mut() {
                h.vertex = vshift(h.vertex);
                h.next = hshift(h.next);
                h.prev = hshift(h.prev);
                h.face = h.face.map(fshift);
            }
            e
        }));
        dst.faces.extend(src.faces.iter().map(|f| Face {
            halfedge: hshift(f.halfedge),
        }));
        dst.vstatus.extend_from_slice(&src.vstatus);
        dst.estatus.extend_from_slice(&src.estatus);
        dst.fstatus.extend_from_slice(&src.fstatus);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use glam::{vec3, Vec3};

    use super::{PolyMesh, POINTS};
    use crate::{element::Handle, error::Error};

    /// Unit square split into two triangles along the diagonal v0-v2.
    pub(crate) fn two_triangles() -> PolyMesh {
        let mut mesh = PolyMesh::new();
        let v: Vec<_> = [
            vec3(0.0, 0.0, 0.0),
            vec3(1.0, 0.0, 0.0),
            vec3(1.0, 1.0, 0.0),
            vec3(0.0, 1.0, 0.0),
        ]
        .into_iter()
        .map(|p| mesh.add_vertex(p).expect("Cannot add vertex"))
        .collect();
        mesh.add_tri_face(v[0], v[1], v[2])
            .expect("Cannot add face");
        mesh.add_tri_face(v[0], v[2], v[3])
            .expect("Cannot add face");
        mesh
    }

    #[test]
    fn t_points() {
        let mut mesh = two_triangles();
        assert_eq!(
            mesh.point(2u32.into()).expect("Cannot read point"),
            vec3(1.0, 1.0, 0.0)
        );
        mesh.set_point(2u32.into(), Vec3::ONE)
            .expect("Cannot set point");
        assert_eq!(mesh.point(2u32.into()).expect("Cannot read point"), Vec3::ONE);
        // The positions can't be removed or renamed.
        assert!(!mesh.remove_vertex_property(POINTS));
        assert!(!mesh.rename_vertex_property(POINTS, "v:pos").expect("Cannot rename"));
        assert!(matches!(
            mesh.add_vertex_property(POINTS, 0u8),
            Err(Error::DuplicateName(_))
        ));
        assert!(matches!(
            mesh.point(10u32.into()),
            Err(Error::OutOfBoundsAccess(10))
        ));
    }

    #[test]
    fn t_counts() {
        let mesh = two_triangles();
        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_edges(), 5);
        assert_eq!(mesh.num_halfedges(), 10);
        assert_eq!(mesh.num_faces(), 2);
        assert!(mesh.is_triangle_mesh());
        assert!(!mesh.is_quad_mesh());
        assert_eq!(mesh.edges().filter(|e| mesh.is_boundary_edge(*e)).count(), 4);
        mesh.check_topology().expect("Topology check failed");
    }

    #[test]
    fn t_default_propagation() {
        let mut mesh = two_triangles();
        let weights = mesh
            .add_vertex_property("v:weight", 0.5f32)
            .expect("Cannot add property");
        for v in mesh.vertices() {
            assert_eq!(weights.get_cloned(v).expect("Cannot read property"), 0.5);
        }
        let v = mesh.add_vertex(Vec3::ZERO).expect("Cannot add vertex");
        assert_eq!(weights.get_cloned(v).expect("Cannot read property"), 0.5);
        assert!(matches!(
            mesh.get_vertex_property::<f64>("v:weight"),
            Err(Error::PropertyTypeMismatch { .. })
        ));
        assert!(
            mesh.get_vertex_property::<Vec3>("v:normal")
                .expect("Lookup must not fail")
                .is_none()
        );
    }

    #[test]
    fn t_try_clone() {
        let mut mesh = two_triangles();
        let copy = mesh.try_clone().expect("Cannot clone mesh");
        mesh.set_point(0u32.into(), Vec3::ONE)
            .expect("Cannot set point");
        assert_eq!(copy.point(0u32.into()).expect("Cannot read point"), Vec3::ZERO);
        assert_eq!(copy.num_faces(), 2);
        copy.check_topology().expect("Topology check failed");
    }

    #[test]
    fn t_join() {
        let mut mesh = two_triangles();
        let mut ids = mesh
            .add_face_property("f:id", 0u32)
            .expect("Cannot add property");
        ids.set(1u32.into(), 7).expect("Cannot set property");
        let mut other = two_triangles();
        let mut tags = other
            .add_vertex_property("v:tag", 'a')
            .expect("Cannot add property");
        tags.set(3u32.into(), 'z').expect("Cannot set property");
        other
            .set_point(0u32.into(), vec3(5.0, 5.0, 5.0))
            .expect("Cannot set point");
        mesh.join(&other).expect("Cannot join meshes");
        assert_eq!(mesh.num_vertices(), 8);
        assert_eq!(mesh.num_edges(), 10);
        assert_eq!(mesh.num_faces(), 4);
        mesh.check_topology().expect("Topology check failed");
        assert_eq!(
            mesh.point(4u32.into()).expect("Cannot read point"),
            vec3(5.0, 5.0, 5.0)
        );
        // Properties only in this mesh get defaults on the appended faces.
        assert_eq!(
            &ids.try_borrow().expect("Cannot borrow").to_vec()[..],
            &[0, 7, 0, 0]
        );
        // Properties only in the other mesh get defaults on existing vertices.
        let tags = mesh
            .get_vertex_property::<char>("v:tag")
            .expect("Lookup failed")
            .expect("Property must exist");
        assert_eq!(
            &tags.try_borrow().expect("Cannot borrow").to_vec()[..],
            &['a', 'a', 'a', 'a', 'a', 'a', 'a', 'z']
        );
        for f in mesh.faces() {
            let verts: Vec<u32> = mesh.topol.fv_ccw_iter(f).map(|v| v.index()).collect();
            if f.index() >= 2 {
                assert!(verts.iter().all(|v| *v >= 4));
            } else {
                assert!(verts.iter().all(|v| *v < 4));
            }
        }
    }

    #[test]
    fn t_join_requires_garbage_collection() {
        let mut mesh = two_triangles();
        let mut other = two_triangles();
        other
            .delete_face(0u32.into())
            .expect("Cannot delete face");
        assert!(matches!(
            mesh.join(&other),
            Err(Error::GarbageCollectionRequired)
        ));
        other.garbage_collection().expect("Cannot garbage collect");
        mesh.join(&other).expect("Cannot join meshes");
        assert_eq!(mesh.num_faces(), 3);
        assert_eq!(mesh.num_vertices(), 7);
    }

    #[test]
    fn t_join_mismatched_property_types() {
        let mut mesh = two_triangles();
        mesh.add_edge_property("e:weight", 1.0f32)
            .expect("Cannot add property");
        let mut other = two_triangles();
        other
            .add_edge_property("e:weight", 2u8)
            .expect("Cannot add property");
        assert!(matches!(
            mesh.join(&other),
            Err(Error::DuplicateName(name)) if name == "e:weight"
        ));
        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_edges(), 5);
        assert_eq!(mesh.vertices_size(), 4);
        let weights = mesh
            .get_edge_property::<f32>("e:weight")
            .expect("Lookup failed")
            .expect("Property must exist");
        assert_eq!(weights.try_borrow().expect("Cannot borrow").len(), 5);
        mesh.check_topology().expect("Topology check failed");
    }
}
