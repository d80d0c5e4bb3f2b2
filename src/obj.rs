use std::{io::BufRead, path::Path};

use glam::Vec3;

use crate::{
    builder::ManifoldBuilder,
    element::{Handle, VH},
    error::Error,
    mesh::PolyMesh,
};

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        ignore_points: true,
        ignore_lines: true,
        ..Default::default()
    }
}

/// Vertex `i` of an object whose vertices start at `offset` in the merged mesh.
fn offset_vertex(i: u32, offset: u32) -> Result<VH, Error> {
    i.checked_add(offset)
        .map(VH::from)
        .ok_or(Error::VertexIndexOverflow(i, offset))
}

impl PolyMesh {
    /// Load a mesh from a Wavefront OBJ file. Only the positions and the faces
    /// are read. All the objects in the file are merged into one mesh. The
    /// faces are added with a [`ManifoldBuilder`], so the result is always
    /// manifold, and problems with the input are logged as warnings.
    pub fn load_obj(path: impl AsRef<Path>) -> Result<Self, Error> {
        let (models, _) = tobj::load_obj(path.as_ref(), &load_options())?;
        Self::from_obj_models(models)
    }

    /// Same as [`PolyMesh::load_obj`], reading from a buffer instead of a file.
    /// Material libraries are not loaded.
    pub fn read_obj(reader: &mut impl BufRead) -> Result<Self, Error> {
        let (models, _) = tobj::load_obj_buf(reader, &load_options(), |_| {
            Err(tobj::LoadError::GenericFailure)
        })?;
        Self::from_obj_models(models)
    }

    fn from_obj_models(models: Vec<tobj::Model>) -> Result<Self, Error> {
        let (nverts, nfaces) = models
            .iter()
            .fold((0usize, 0usize), |(nverts, nfaces), model| {
                let msh = &model.mesh;
                let nf = if msh.face_arities.is_empty() {
                    msh.indices.len() / 3
                } else {
                    msh.face_arities.len()
                };
                (nverts + (msh.positions.len() / 3), nfaces + nf)
            });
        let nedges = nfaces * 3 / 2; // Estimate.
        let mut outmesh = PolyMesh::with_capacity(nverts, nedges, nfaces);
        {
            let mut builder = ManifoldBuilder::new(&mut outmesh);
            builder.begin()?;
            let mut voffset = 0u32;
            let mut fvs: Vec<VH> = Vec::new();
            for model in models {
                let mesh = model.mesh;
                if mesh.positions.len() % 3 != 0 {
                    return Err(Error::IncorrectNumberOfCoordinates(mesh.positions.len()));
                }
                for triplet in mesh.positions.chunks(3) {
                    builder.add_vertex(Vec3::new(triplet[0], triplet[1], triplet[2]))?;
                }
                let mut start = 0usize;
                let mut add_face = |size: usize| -> Result<(), Error> {
                    let indices = mesh.indices.get(start..(start + size)).unwrap_or(&[]);
                    start += size;
                    fvs.clear();
                    for i in indices {
                        fvs.push(offset_vertex(*i, voffset)?);
                    }
                    builder.add_face(&fvs)?;
                    Ok(())
                };
                if mesh.face_arities.is_empty() {
                    for _ in 0..(mesh.indices.len() / 3) {
                        add_face(3)?;
                    }
                } else {
                    for size in mesh.face_arities.iter() {
                        add_face(*size as usize)?;
                    }
                }
                let nverts = u32::try_from(mesh.positions.len() / 3).unwrap_or(u32::MAX);
                voffset = offset_vertex(nverts, voffset)?.index();
            }
            let report = builder.end(true)?;
            log::debug!(
                "Loaded obj with {} vertices and {} faces",
                report.num_vertices,
                report.num_faces
            );
        }
        Ok(outmesh)
    }
}

#[cfg(test)]
mod test {
    use glam::vec3;

    use super::offset_vertex;
    use crate::{element::VH, error::Error, mesh::PolyMesh};

    #[test]
    fn t_read_triangles() {
        let src = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
f 1 2 3
f 1 3 4
";
        let mesh = PolyMesh::read_obj(&mut src.as_bytes()).expect("Cannot read obj");
        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_edges(), 5);
        assert_eq!(mesh.num_faces(), 2);
        assert!(mesh.is_triangle_mesh());
        assert_eq!(
            mesh.point(VH::from(2u32)).expect("Cannot read point"),
            vec3(1.0, 1.0, 0.0)
        );
        mesh.check_topology().expect("Topology check failed");
    }

    #[test]
    fn t_read_mixed_polygons() {
        let src = "\
o mixed
v 0 0 0
v 1 0 0
v 2 0 0
v 0 1 0
v 1 1 0
v 2 1 0
v 5 5 5
f 1 2 5 4
f 2 3 6
f 2 6 5
";
        let mesh = PolyMesh::read_obj(&mut src.as_bytes()).expect("Cannot read obj");
        // The unused vertex is dropped.
        assert_eq!(mesh.num_vertices(), 6);
        assert_eq!(mesh.num_faces(), 3);
        assert_eq!(mesh.num_edges(), 8);
        let valences: Vec<usize> = mesh.faces().map(|f| mesh.face_valence(f)).collect();
        assert_eq!(valences, &[4, 3, 3]);
        mesh.check_topology().expect("Topology check failed");
    }

    #[test]
    fn t_read_repairs_bowtie() {
        let src = "\
v 0 0 0
v 1 0 0
v 0 1 0
v -1 0 0
v 0 -1 0
f 1 2 3
f 1 4 5
";
        let mesh = PolyMesh::read_obj(&mut src.as_bytes()).expect("Cannot read obj");
        assert_eq!(mesh.num_vertices(), 6);
        assert_eq!(mesh.num_faces(), 2);
        assert!(mesh.vertices().all(|v| mesh.is_manifold_vertex(v)));
    }

    #[test]
    fn t_missing_file() {
        assert!(matches!(
            PolyMesh::load_obj("does/not/exist.obj"),
            Err(Error::ObjLoadFailed(_))
        ));
    }

    #[test]
    fn t_vertex_offset_overflow() {
        assert_eq!(
            offset_vertex(3, 7).expect("Cannot offset vertex"),
            VH::from(10u32)
        );
        assert!(matches!(
            offset_vertex(2, u32::MAX - 1),
            Err(Error::VertexIndexOverflow(2, _))
        ));
    }
}
