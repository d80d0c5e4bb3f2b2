/*!
Building manifold meshes from arbitrary polygon soups.

[`ManifoldBuilder`] adds faces to a [`PolyMesh`] one at a time, like
[`PolyMesh::add_face`], but instead of rejecting faces that would break the
connectivity, it duplicates the offending vertices so the face can be added.
Faces that are malformed on their own, i.e. with too few vertices, repeated
vertices or vertices that don't exist, are skipped and counted. When the
session ends, vertices shared by more than one fan of faces are split so that
every vertex of the resulting mesh is manifold.

```rust
use halfmesh::{ManifoldBuilder, PolyMesh};
use glam::vec3;

let mut mesh = PolyMesh::new();
let mut builder = ManifoldBuilder::new(&mut mesh);
builder.begin().expect("Cannot begin");
let verts: Vec<_> = [
    vec3(0.0, 0.0, 0.0),
    vec3(1.0, 0.0, 0.0),
    vec3(0.0, 1.0, 0.0),
    vec3(-1.0, 0.0, 0.0),
    vec3(0.0, -1.0, 0.0),
]
.into_iter()
.map(|p| builder.add_vertex(p).expect("Cannot add vertex"))
.collect();
// Two triangles touching at a single vertex.
builder.add_triangle(verts[0], verts[1], verts[2]).expect("Cannot add face");
builder.add_triangle(verts[0], verts[3], verts[4]).expect("Cannot add face");
let report = builder.end(false).expect("Cannot finish building");
drop(builder);
assert_eq!(report.non_manifold_vertices, 1);
assert_eq!(mesh.num_vertices(), 6);
assert_eq!(mesh.num_faces(), 2);
```
*/

use std::{
    collections::{btree_map::Entry, BTreeMap},
    fmt::Display,
};

use glam::Vec3;

use crate::{
    element::{FH, HH, Handle, VH},
    error::Error,
    mesh::PolyMesh,
    property::VProperty,
};

/// Temporary vertex property mapping every vertex to the vertex it was copied
/// from. Vertices that are not copies map to themselves.
const ORIGINAL_VERTEX: &str = "v:ManifoldBuilder:original_vertex";

/// Summary of the problems found and fixed while building a mesh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Faces skipped because they had less than 3 vertices.
    pub faces_too_few_vertices: usize,
    /// Faces skipped because a vertex appeared more than once.
    pub faces_duplicated_vertices: usize,
    /// Faces skipped because they referred to vertices that don't exist.
    pub faces_out_of_range_vertices: usize,
    /// Faces that couldn't be added even after duplicating vertices.
    pub faces_unknown_topology: usize,
    /// Input vertices that had to be copied.
    pub non_manifold_vertices: usize,
    /// Directed edges of the input used by more than one face.
    pub non_manifold_edges: usize,
    /// Vertices without any edge, removed from the mesh.
    pub isolated_vertices: usize,
    /// Number of copies made, over all copied vertices.
    pub copy_occurrences: usize,
    /// Input vertices copied because a face couldn't be linked into their
    /// one-ring.
    pub linking_vertices: usize,
    pub linking_occurrences: usize,
    pub num_vertices: usize,
    pub num_edges: usize,
    pub num_faces: usize,
}

impl BuildReport {
    pub fn has_issues(&self) -> bool {
        self.faces_too_few_vertices > 0
            || self.faces_duplicated_vertices > 0
            || self.faces_out_of_range_vertices > 0
            || self.faces_unknown_topology > 0
            || self.non_manifold_vertices > 0
            || self.non_manifold_edges > 0
            || self.isolated_vertices > 0
    }
}

impl Display for BuildReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "mesh has topological issues:")?;
        for (count, what) in [
            (
                self.faces_too_few_vertices,
                "faces with less than 3 vertices (ignored)",
            ),
            (
                self.faces_duplicated_vertices,
                "faces with duplicated vertices (ignored)",
            ),
            (
                self.faces_out_of_range_vertices,
                "faces with out-of-range vertices (ignored)",
            ),
            (
                self.faces_unknown_topology,
                "complex faces with unknown topology (ignored)",
            ),
            (self.non_manifold_vertices, "non-manifold vertices (fixed)"),
            (self.non_manifold_edges, "non-manifold edges (fixed)"),
            (self.isolated_vertices, "isolated vertices (removed)"),
        ] {
            if count > 0 {
                writeln!(f, "    {count} {what}")?;
            }
        }
        if self.copy_occurrences > 0 {
            write!(
                f,
                "    {} vertices copied ({} occurrences) to ensure manifoldness",
                self.non_manifold_vertices, self.copy_occurrences
            )?;
            if self.linking_vertices > 0 {
                write!(
                    f,
                    " (among which {} vertices with {} occurrences are for linking new faces)",
                    self.linking_vertices, self.linking_occurrences
                )?;
            }
            writeln!(f)?;
        }
        write!(
            f,
            "result: {} faces, {} vertices, {} edges",
            self.num_faces, self.num_vertices, self.num_edges
        )
    }
}

/// State of a build session, between `begin` and `end`.
struct Session {
    original: VProperty<VH>,
    /// Copies of each input vertex, in the order they were made.
    copies: BTreeMap<VH, Vec<VH>>,
    copies_for_linking: BTreeMap<VH, Vec<VH>>,
    /// Heads of the directed edges of the input faces, per tail vertex.
    outgoing: Vec<Vec<VH>>,
    faces_too_few_vertices: usize,
    faces_duplicated_vertices: usize,
    faces_out_of_range_vertices: usize,
    faces_unknown_topology: usize,
}

impl Session {
    fn new(mesh: &mut PolyMesh) -> Result<Self, Error> {
        let original = mesh
            .topol
            .vprops
            .add(ORIGINAL_VERTEX, VH::invalid())?;
        Ok(Session {
            original,
            copies: BTreeMap::new(),
            copies_for_linking: BTreeMap::new(),
            outgoing: Vec::new(),
            faces_too_few_vertices: 0,
            faces_duplicated_vertices: 0,
            faces_out_of_range_vertices: 0,
            faces_unknown_topology: 0,
        })
    }

    /// The input vertex `v` is a copy of, or `v` itself.
    fn original_of(&self, v: VH) -> Result<VH, Error> {
        let orig = self.original.get_cloned(v)?;
        Ok(if orig.is_null() { v } else { orig })
    }

    /// Check the vertices of a face, and count it if it must be skipped.
    fn vertices_valid(&mut self, mesh: &PolyMesh, verts: &[VH]) -> bool {
        if verts.len() < 3 {
            self.faces_too_few_vertices += 1;
            if self.faces_too_few_vertices == 1 {
                log::error!("Face has less than 3 vertices: {verts:?} (this is the first record)");
            }
            return false;
        }
        if verts
            .iter()
            .enumerate()
            .any(|(i, v)| verts[(i + 1)..].contains(v))
        {
            self.faces_duplicated_vertices += 1;
            if self.faces_duplicated_vertices == 1 {
                log::error!("Face has duplicated vertices: {verts:?} (this is the first record)");
            }
            return false;
        }
        if verts
            .iter()
            .any(|v| !mesh.topol.is_valid_vertex(*v) || mesh.is_deleted_vertex(*v))
        {
            self.faces_out_of_range_vertices += 1;
            if self.faces_out_of_range_vertices == 1 {
                log::error!(
                    "Face has out-of-range vertices: {verts:?} (number of vertices is {}) (this is the first record)",
                    mesh.vertices_size()
                );
            }
            return false;
        }
        true
    }

    /// Add a vertex with the same properties as the input vertex `v`.
    fn copy_vertex(&mut self, mesh: &mut PolyMesh, v: VH) -> Result<VH, Error> {
        let v = self.original_of(v)?;
        let nv = mesh.topol.add_vertex()?;
        mesh.topol.vprops.copy(v, nv)?;
        let mut status = mesh.topol.vertex_status(v)?;
        status.set_deleted(false);
        *mesh.topol.vertex_status_mut(nv)? = status;
        self.original.set(nv, v)?;
        self.copies.entry(v).or_default().push(nv);
        Ok(nv)
    }

    /// The vertex a new face should use in place of the input vertex `v`. This
    /// is `v` itself, or the copy with the lowest index, whichever is still on
    /// the boundary. If neither is, a new copy is made.
    fn get(&mut self, mesh: &mut PolyMesh, v: VH) -> Result<VH, Error> {
        let v = self.original_of(v)?;
        if mesh.is_boundary_vertex(v) {
            return Ok(v);
        }
        if let Some(c) = self
            .copies
            .get(&v)
            .and_then(|copies| copies.iter().find(|c| mesh.is_boundary_vertex(**c)))
        {
            return Ok(*c);
        }
        self.copy_vertex(mesh, v)
    }

    /// Move the incoming halfedges from `first` to `last`, walking counter
    /// clockwise around their head, to a new copy of their head vertex.
    fn move_sector_to_copy(
        &mut self,
        mesh: &mut PolyMesh,
        first: HH,
        last: HH,
    ) -> Result<VH, Error> {
        let topol = &mesh.topol;
        let old_v = topol.to_vertex(first);
        let outgoing = sector_outgoing_halfedge(mesh, first, last);
        let nv = self.copy_vertex(mesh, old_v)?;
        let topol = &mut mesh.topol;
        let mut h = first;
        for _ in 0..topol.halfedges_size() {
            topol.set_halfedge_vertex(h, nv);
            if h == last {
                break;
            }
            h = topol.prev_halfedge(h.opposite());
        }
        topol.set_vertex_halfedge(nv, outgoing);
        Ok(nv)
    }

    /// Resolve the vertex at the head of `h`, whose star containing `h` is
    /// either not the first star seen for the vertex, or has more than one
    /// gap. `record` holds the copies made for each vertex during this pass.
    fn resolve_non_manifold_vertex(
        &mut self,
        mesh: &mut PolyMesh,
        h: HH,
        record: &mut BTreeMap<VH, Vec<VH>>,
    ) -> Result<(), Error> {
        let old_v = mesh.topol.to_vertex(h);
        let star = incoming_star(mesh, h);
        let borders: Vec<HH> = star
            .iter()
            .copied()
            .filter(|ih| mesh.is_boundary_halfedge(*ih))
            .collect();
        if borders.len() < 2 {
            if let Entry::Vacant(entry) = record.entry(old_v) {
                // First time this vertex is seen, and the star is a single fan.
                entry.insert(Vec::new());
                let last = star.last().copied().unwrap_or(h);
                let outgoing = sector_outgoing_halfedge(mesh, h, last);
                mesh.topol.set_vertex_halfedge(old_v, outgoing);
            } else {
                // Another star of this vertex was seen before.
                let last = mesh.topol.next_halfedge(h).opposite();
                let nv = self.move_sector_to_copy(mesh, h, last)?;
                record.entry(old_v).or_default().push(nv);
            }
            return Ok(());
        }
        // More than one gap. Split every fan from the first one.
        let border = borders[borders.len() - 1];
        let mut sector_start = border;
        let mut is_main_sector = true;
        for _ in 0..borders.len() {
            let topol = &mesh.topol;
            let mut sector_last = sector_start;
            for _ in 0..star.len() {
                let next = topol.prev_halfedge(sector_last.opposite());
                if topol.is_boundary_halfedge(next) {
                    break;
                }
                sector_last = next;
            }
            let next_start = topol.prev_halfedge(sector_last.opposite());
            let must_copy = !is_main_sector || record.contains_key(&old_v);
            // Close the boundary of this fan on its own.
            mesh.topol
                .set_next_halfedge(sector_start, sector_last.opposite());
            if must_copy {
                let nv = self.move_sector_to_copy(mesh, sector_start, sector_last)?;
                record.entry(old_v).or_default().push(nv);
            } else {
                mesh.topol
                    .set_vertex_halfedge(old_v, sector_last.opposite());
            }
            is_main_sector = false;
            sector_start = next_start;
            if sector_start == border {
                break;
            }
        }
        record.entry(old_v).or_default();
        Ok(())
    }

    /// Find every vertex that is not manifold and split its extra fans onto
    /// new copies. Returns the number of copies made.
    fn resolve_non_manifold_vertices(&mut self, mesh: &mut PolyMesh) -> Result<usize, Error> {
        let mut known_non_manifold = vec![false; mesh.vertices_size()];
        let mut visited_vertices: Vec<Option<HH>> = vec![None; mesh.vertices_size()];
        let mut visited_halfedges = vec![false; mesh.halfedges_size()];
        let mut cones: Vec<HH> = Vec::new();
        let halfedges: Vec<HH> = mesh.halfedges().collect();
        for h in halfedges {
            if visited_halfedges[h.index() as usize] {
                continue;
            }
            let v = mesh.topol.to_vertex(h);
            let vi = v.index() as usize;
            let mut non_manifold = false;
            match visited_vertices[vi] {
                Some(first) => {
                    // Seen this vertex before, from a different star.
                    non_manifold = true;
                    if !known_non_manifold[vi] {
                        cones.push(first);
                    }
                }
                None => visited_vertices[vi] = Some(h),
            }
            let star = incoming_star(mesh, h);
            for ih in star.iter() {
                visited_halfedges[ih.index() as usize] = true;
            }
            if star
                .iter()
                .filter(|ih| mesh.is_boundary_halfedge(**ih))
                .count()
                > 1
            {
                non_manifold = true;
            }
            if non_manifold {
                cones.push(h);
                known_non_manifold[vi] = true;
            }
        }
        let mut record = BTreeMap::new();
        for h in cones {
            self.resolve_non_manifold_vertex(mesh, h, &mut record)?;
        }
        Ok(record.values().map(|copies: &Vec<VH>| copies.len()).sum())
    }
}

/// Incoming halfedges of the head of `h`, walking counter clockwise starting
/// at `h`.
fn incoming_star(mesh: &PolyMesh, h: HH) -> Vec<HH> {
    let topol = &mesh.topol;
    let mut star = vec![h];
    let mut ih = topol.prev_halfedge(h.opposite());
    while ih != h && star.len() <= topol.halfedges_size() {
        star.push(ih);
        ih = topol.prev_halfedge(ih.opposite());
    }
    star
}

/// An outgoing halfedge of the fan of incoming halfedges from `first` to
/// `last`. A boundary halfedge is preferred.
fn sector_outgoing_halfedge(mesh: &PolyMesh, first: HH, last: HH) -> HH {
    let topol = &mesh.topol;
    let mut h = first;
    for _ in 0..topol.halfedges_size() {
        if topol.is_boundary_halfedge(h.opposite()) {
            return h.opposite();
        }
        if h == last {
            break;
        }
        h = topol.prev_halfedge(h.opposite());
    }
    first.opposite()
}

/**
 * Adds polygons to a mesh, duplicating vertices where necessary to keep the
 * mesh manifold.
 *
 * A build session starts with [`ManifoldBuilder::begin`] and ends with
 * [`ManifoldBuilder::end`]. Vertices and faces can only be added in between.
 * Vertices should be added before the faces that use them.
 */
pub struct ManifoldBuilder<'a> {
    mesh: &'a mut PolyMesh,
    session: Option<Session>,
    face_vertices: Vec<VH>,
}

impl<'a> ManifoldBuilder<'a> {
    pub fn new(mesh: &'a mut PolyMesh) -> Self {
        ManifoldBuilder {
            mesh,
            session: None,
            face_vertices: Vec::new(),
        }
    }

    pub fn is_building(&self) -> bool {
        self.session.is_some()
    }

    pub fn begin(&mut self) -> Result<(), Error> {
        if self.session.is_some() {
            return Err(Error::BuilderAlreadyStarted);
        }
        self.face_vertices.clear();
        self.session = Some(Session::new(self.mesh)?);
        Ok(())
    }

    pub fn add_vertex(&mut self, pos: Vec3) -> Result<VH, Error> {
        let session = self.session.as_mut().ok_or(Error::BuilderNotStarted)?;
        if self.mesh.num_faces() > 0 {
            log::debug!("Vertices should be added before adding faces");
        }
        let v = self.mesh.add_vertex(pos)?;
        session.original.set(v, v)?;
        Ok(v)
    }

    /**
     * Add a face with the given vertices.
     *
     * Returns `Ok(None)` if the face is skipped, because it is malformed or
     * could not be added even after copying its vertices. Such faces are
     * counted in the [`BuildReport`]. Errors are only returned for misuse,
     * like calling this outside a session, or when a property of the mesh is
     * borrowed.
     *
     * The vertices the face was actually created with are available from
     * [`ManifoldBuilder::face_vertices`] until the next face is added.
     */
    pub fn add_face(&mut self, verts: &[VH]) -> Result<Option<FH>, Error> {
        let session = self.session.as_mut().ok_or(Error::BuilderNotStarted)?;
        let mesh = &mut *self.mesh;
        self.face_vertices.clear();
        if !session.vertices_valid(mesh, verts) {
            return Ok(None);
        }
        let n = verts.len();
        let fverts = &mut self.face_vertices;
        for v in verts {
            fverts.push(session.get(mesh, *v)?);
        }
        // Copy the head of any halfedge that already has a face.
        let mut halfedges: Vec<Option<HH>> = vec![None; n];
        for s in 0..n {
            let t = (s + 1) % n;
            let mut h = mesh.find_halfedge(fverts[s], fverts[t]);
            if h.is_some_and(|h| !mesh.is_boundary_halfedge(h)) {
                fverts[t] = session.copy_vertex(mesh, verts[t])?;
                h = None;
                if t == 0 {
                    halfedges[0] = None;
                }
            }
            halfedges[s] = h;
        }
        // Copy the corner vertex if there is no free gap to move the faces
        // between two existing halfedges.
        for s in 0..n {
            let t = (s + 1) % n;
            let (Some(inner_prev), Some(inner_next)) = (halfedges[s], halfedges[t]) else {
                continue;
            };
            if mesh.topol.next_halfedge(inner_prev) == inner_next
                || mesh.topol.find_free_gap(inner_prev, inner_next).is_ok()
            {
                continue;
            }
            let orig = session.original_of(verts[t])?;
            fverts[t] = session.copy_vertex(mesh, orig)?;
            session
                .copies_for_linking
                .entry(orig)
                .or_default()
                .push(fverts[t]);
            halfedges[s] = None;
            halfedges[t] = None;
        }
        match mesh.add_face(fverts) {
            Ok(f) => {
                let nverts = mesh.vertices_size();
                if session.outgoing.len() < nverts {
                    session.outgoing.resize(nverts, Vec::new());
                }
                for s in 0..n {
                    let from = session.original_of(verts[s])?;
                    let to = session.original_of(verts[(s + 1) % n])?;
                    session.outgoing[from.index() as usize].push(to);
                }
                Ok(Some(f))
            }
            Err(Error::BorrowedPropertyAccess) => Err(Error::BorrowedPropertyAccess),
            Err(e) => {
                session.faces_unknown_topology += 1;
                if session.faces_unknown_topology == 1 {
                    log::error!("Failed adding face {verts:?}: {e} (this is the first record)");
                }
                fverts.clear();
                Ok(None)
            }
        }
    }

    pub fn add_triangle(&mut self, v0: VH, v1: VH, v2: VH) -> Result<Option<FH>, Error> {
        self.add_face(&[v0, v1, v2])
    }

    pub fn add_quad(&mut self, v0: VH, v1: VH, v2: VH, v3: VH) -> Result<Option<FH>, Error> {
        self.add_face(&[v0, v1, v2, v3])
    }

    /// Vertices of the last face added, after substituting copies. Empty if
    /// the last face was skipped.
    pub fn face_vertices(&self) -> &[VH] {
        &self.face_vertices
    }

    /**
     * Finish the session.
     *
     * Vertices shared by more than one fan of faces are split, vertices left
     * without any face are removed, and the mesh is garbage collected. The
     * copies made to keep the mesh manifold are locked, see
     * [`Status::locked`](crate::Status::locked). If `log_issues` is true, the
     * report is logged as a warning when any issues were found.
     */
    pub fn end(&mut self, log_issues: bool) -> Result<BuildReport, Error> {
        let mut session = self.session.take().ok_or(Error::BuilderNotStarted)?;
        let mesh = &mut *self.mesh;
        session.resolve_non_manifold_vertices(mesh)?;
        mesh.topol.vprops.remove(ORIGINAL_VERTEX);
        let mut report = BuildReport {
            faces_too_few_vertices: session.faces_too_few_vertices,
            faces_duplicated_vertices: session.faces_duplicated_vertices,
            faces_out_of_range_vertices: session.faces_out_of_range_vertices,
            faces_unknown_topology: session.faces_unknown_topology,
            non_manifold_vertices: session.copies.len(),
            copy_occurrences: session.copies.values().map(Vec::len).sum(),
            linking_vertices: session.copies_for_linking.len(),
            linking_occurrences: session.copies_for_linking.values().map(Vec::len).sum(),
            ..Default::default()
        };
        for c in session.copies.values().flatten() {
            mesh.topol.vertex_status_mut(*c)?.set_locked(true);
        }
        for heads in session.outgoing.iter_mut() {
            let total = heads.len();
            heads.sort();
            heads.dedup();
            report.non_manifold_edges += total - heads.len();
        }
        let isolated: Vec<VH> = mesh
            .vertices()
            .filter(|v| mesh.is_isolated_vertex(*v))
            .collect();
        for v in isolated.iter() {
            mesh.delete_vertex(*v)?;
        }
        report.isolated_vertices = isolated.len();
        if !isolated.is_empty() {
            mesh.garbage_collection()?;
        }
        if let Err(e) = mesh.check_topology() {
            log::error!("Invalid topology after building the mesh: {e}");
        }
        let non_manifold: Vec<VH> = mesh
            .vertices()
            .filter(|v| !mesh.is_manifold_vertex(*v))
            .collect();
        if let Some(v) = non_manifold.first() {
            log::error!("Vertex {v} is not manifold (this is the first record)");
            log::error!("Mesh still has {} non-manifold vertices", non_manifold.len());
        }
        report.num_vertices = mesh.num_vertices();
        report.num_edges = mesh.num_edges();
        report.num_faces = mesh.num_faces();
        if log_issues && report.has_issues() {
            log::warn!("{report}");
        }
        Ok(report)
    }
}

impl Drop for ManifoldBuilder<'_> {
    fn drop(&mut self) {
        if self.session.take().is_some() {
            log::error!("ManifoldBuilder dropped without calling end()");
            self.mesh.topol.vprops.remove(ORIGINAL_VERTEX);
        }
    }
}

#[cfg(test)]
mod test {
    use arrayvec::ArrayVec;
    use glam::{vec3, Vec3};
    use proptest::prelude::*;

    use super::{BuildReport, ManifoldBuilder, ORIGINAL_VERTEX};
    use crate::{
        element::{Handle, VH},
        error::Error,
        mesh::PolyMesh,
    };

    fn add_vertices(builder: &mut ManifoldBuilder<'_>, n: usize) -> Vec<VH> {
        (0..n)
            .map(|i| {
                builder
                    .add_vertex(vec3(i as f32, (i * i) as f32, 0.0))
                    .expect("Cannot add vertex")
            })
            .collect()
    }

    fn assert_valid(mesh: &PolyMesh) {
        mesh.check_topology().expect("Topology check failed");
        mesh.topol.check_manifold().expect("Mesh must be manifold");
        for f in mesh.faces() {
            let mut verts: Vec<VH> = mesh.topol.fv_ccw_iter(f).collect();
            let valence = verts.len();
            verts.sort();
            verts.dedup();
            assert_eq!(verts.len(), valence);
        }
    }

    #[test]
    fn t_bowtie() {
        let mut mesh = PolyMesh::new();
        let mut ids = mesh
            .add_vertex_property("v:id", 0u32)
            .expect("Cannot add property");
        let mut builder = ManifoldBuilder::new(&mut mesh);
        builder.begin().expect("Cannot begin");
        let v = add_vertices(&mut builder, 5);
        for vi in v.iter() {
            ids.set(*vi, vi.index() + 100).expect("Cannot set property");
        }
        assert!(builder
            .add_triangle(v[0], v[1], v[2])
            .expect("Cannot add face")
            .is_some());
        assert!(builder
            .add_triangle(v[0], v[3], v[4])
            .expect("Cannot add face")
            .is_some());
        let report = builder.end(true).expect("Cannot end");
        drop(builder);
        assert_eq!(report.non_manifold_vertices, 1);
        assert_eq!(report.copy_occurrences, 1);
        assert_eq!(report.non_manifold_edges, 0);
        assert_eq!(report.num_vertices, 6);
        assert!(report.has_issues());
        assert_eq!(mesh.num_vertices(), 6);
        assert_eq!(mesh.num_faces(), 2);
        assert_eq!(mesh.num_edges(), 6);
        assert_valid(&mesh);
        // The copy has the same position and properties as vertex 0.
        let copy = VH::from(5u32);
        assert_eq!(
            mesh.point(copy).expect("Cannot read point"),
            mesh.point(v[0]).expect("Cannot read point")
        );
        assert_eq!(ids.get_cloned(copy).expect("Cannot read property"), 100);
        assert!(mesh.vertex_status(copy).expect("Invalid vertex").locked());
        assert!(!mesh.vertex_status(v[0]).expect("Invalid vertex").locked());
        // The temporary property is gone.
        assert!(!mesh.vertex_property_names().iter().any(|n| n == ORIGINAL_VERTEX));
    }

    #[test]
    fn t_conflicting_orientation() {
        let mut mesh = PolyMesh::new();
        let mut builder = ManifoldBuilder::new(&mut mesh);
        builder.begin().expect("Cannot begin");
        let v = add_vertices(&mut builder, 4);
        builder
            .add_triangle(v[0], v[1], v[2])
            .expect("Cannot add face")
            .expect("Face must be added");
        // Uses the halfedge v2 -> v0 again.
        builder
            .add_triangle(v[0], v[3], v[2])
            .expect("Cannot add face")
            .expect("Face must be added");
        assert_eq!(builder.face_vertices(), &[VH::from(4u32), v[3], v[2]]);
        let report = builder.end(false).expect("Cannot end");
        drop(builder);
        assert_eq!(report.non_manifold_edges, 1);
        assert_eq!(report.non_manifold_vertices, 2);
        assert_eq!(mesh.num_faces(), 2);
        assert_eq!(mesh.num_vertices(), 6);
        assert_eq!(mesh.num_edges(), 6);
        assert_valid(&mesh);
    }

    #[test]
    fn t_opposite_winding_closes_pillow() {
        let mut mesh = PolyMesh::new();
        let mut builder = ManifoldBuilder::new(&mut mesh);
        builder.begin().expect("Cannot begin");
        let v = add_vertices(&mut builder, 3);
        builder
            .add_triangle(v[0], v[1], v[2])
            .expect("Cannot add face");
        builder
            .add_triangle(v[0], v[2], v[1])
            .expect("Cannot add face");
        let report = builder.end(false).expect("Cannot end");
        drop(builder);
        assert!(!report.has_issues());
        assert_eq!(mesh.num_vertices(), 3);
        assert_eq!(mesh.num_edges(), 3);
        assert_eq!(mesh.num_faces(), 2);
        assert!(mesh.edges().all(|e| !mesh.is_boundary_edge(e)));
        assert_valid(&mesh);
    }

    #[test]
    fn t_two_triangles() {
        let mut mesh = PolyMesh::new();
        let mut builder = ManifoldBuilder::new(&mut mesh);
        builder.begin().expect("Cannot begin");
        let v: Vec<VH> = [
            vec3(0.0, 0.0, 0.0),
            vec3(1.0, 0.0, 0.0),
            vec3(1.0, 1.0, 0.0),
            vec3(0.0, 1.0, 0.0),
        ]
        .into_iter()
        .map(|p| builder.add_vertex(p).expect("Cannot add vertex"))
        .collect();
        builder
            .add_triangle(v[0], v[1], v[2])
            .expect("Cannot add face");
        builder
            .add_triangle(v[0], v[2], v[3])
            .expect("Cannot add face");
        assert_eq!(builder.face_vertices(), &[v[0], v[2], v[3]]);
        let report = builder.end(true).expect("Cannot end");
        drop(builder);
        assert_eq!(
            report,
            BuildReport {
                num_vertices: 4,
                num_edges: 5,
                num_faces: 2,
                ..Default::default()
            }
        );
        assert_eq!(mesh.num_halfedges(), 10);
        assert_eq!(
            mesh.edges().filter(|e| mesh.is_boundary_edge(*e)).count(),
            4
        );
        let diagonal = mesh.find_edge(v[0], v[2]).expect("Cannot find edge");
        assert!(!mesh.is_boundary_edge(diagonal));
        assert_valid(&mesh);
    }

    #[test]
    fn t_clean_input_matches_raw() {
        let faces: [[u32; 4]; 6] = [
            [0, 3, 2, 1],
            [0, 1, 5, 4],
            [1, 2, 6, 5],
            [2, 3, 7, 6],
            [3, 0, 4, 7],
            [4, 5, 6, 7],
        ];
        let mut raw = PolyMesh::new();
        for _ in 0..8 {
            raw.add_vertex(Vec3::ZERO).expect("Cannot add vertex");
        }
        for f in faces.iter() {
            raw.add_face(&f.map(VH::from)).expect("Cannot add face");
        }
        let mut mesh = PolyMesh::new();
        let mut builder = ManifoldBuilder::new(&mut mesh);
        builder.begin().expect("Cannot begin");
        add_vertices(&mut builder, 8);
        for f in faces.iter() {
            let verts: ArrayVec<VH, 4> = f.iter().map(VH::from).collect();
            builder.add_face(&verts).expect("Cannot add face");
            assert_eq!(builder.face_vertices(), verts.as_slice());
        }
        let report = builder.end(false).expect("Cannot end");
        drop(builder);
        assert!(!report.has_issues());
        assert_eq!(report.copy_occurrences, 0);
        assert_eq!(mesh.num_vertices(), raw.num_vertices());
        assert_eq!(mesh.num_edges(), raw.num_edges());
        assert_eq!(mesh.num_faces(), raw.num_faces());
        assert_valid(&mesh);
    }

    #[test]
    fn t_malformed_faces() {
        let mut mesh = PolyMesh::new();
        let mut builder = ManifoldBuilder::new(&mut mesh);
        builder.begin().expect("Cannot begin");
        let v = add_vertices(&mut builder, 5);
        let skipped = [
            vec![v[0], v[1]],
            vec![v[0], v[1], v[1]],
            vec![v[0], v[1], v[0], v[2]],
            vec![v[0], v[1], VH::from(42u32)],
            vec![v[0], VH::invalid(), v[1]],
        ];
        for verts in skipped.iter() {
            assert!(builder.add_face(verts).expect("Cannot add face").is_none());
            assert!(builder.face_vertices().is_empty());
        }
        builder
            .add_triangle(v[0], v[1], v[2])
            .expect("Cannot add face")
            .expect("Face must be added");
        let report = builder.end(true).expect("Cannot end");
        drop(builder);
        assert_eq!(report.faces_too_few_vertices, 1);
        assert_eq!(report.faces_duplicated_vertices, 2);
        assert_eq!(report.faces_out_of_range_vertices, 2);
        assert_eq!(report.faces_unknown_topology, 0);
        // Vertices 3 and 4 are not used by any face.
        assert_eq!(report.isolated_vertices, 2);
        assert_eq!(mesh.num_vertices(), 3);
        assert_eq!(mesh.vertices_size(), 3);
        assert_eq!(mesh.num_faces(), 1);
        assert_valid(&mesh);
    }

    #[test]
    fn t_copy_for_linking() {
        let mut mesh = PolyMesh::new();
        let mut builder = ManifoldBuilder::new(&mut mesh);
        builder.begin().expect("Cannot begin");
        let v = add_vertices(&mut builder, 6);
        // Fan from v1 to v3 around v0, and a separate triangle at v0.
        for [a, b, c] in [[0usize, 1, 2], [0, 2, 3], [0, 4, 5]] {
            builder
                .add_triangle(v[a], v[b], v[c])
                .expect("Cannot add face")
                .expect("Face must be added");
        }
        // Closing the fan leaves no room for the other triangle at v0.
        builder
            .add_triangle(v[0], v[3], v[1])
            .expect("Cannot add face")
            .expect("Face must be added");
        assert_eq!(builder.face_vertices(), &[VH::from(6u32), v[3], v[1]]);
        let report = builder.end(false).expect("Cannot end");
        drop(builder);
        assert_eq!(report.linking_vertices, 1);
        assert_eq!(report.linking_occurrences, 1);
        assert_eq!(report.faces_unknown_topology, 0);
        assert_eq!(mesh.num_faces(), 4);
        assert_eq!(mesh.num_vertices(), 10);
        assert_valid(&mesh);
    }

    #[test]
    fn t_misuse() {
        let mut mesh = PolyMesh::new();
        let mut builder = ManifoldBuilder::new(&mut mesh);
        assert!(matches!(
            builder.add_vertex(Vec3::ZERO),
            Err(Error::BuilderNotStarted)
        ));
        assert!(matches!(
            builder.add_face(&[0u32.into(), 1u32.into(), 2u32.into()]),
            Err(Error::BuilderNotStarted)
        ));
        assert!(matches!(builder.end(false), Err(Error::BuilderNotStarted)));
        builder.begin().expect("Cannot begin");
        assert!(builder.is_building());
        assert!(matches!(builder.begin(), Err(Error::BuilderAlreadyStarted)));
        builder.end(false).expect("Cannot end");
        assert!(!builder.is_building());
        // A builder can be reused after the session ends.
        builder.begin().expect("Cannot begin again");
        drop(builder);
        assert!(!mesh.vertex_property_names().iter().any(|n| n == ORIGINAL_VERTEX));
    }

    /// Rotate the loop so it starts at its smallest element.
    fn normalized_loop(mut ids: Vec<u32>) -> Vec<u32> {
        if let Some(imin) = (0..ids.len()).min_by_key(|i| ids[*i]) {
            ids.rotate_left(imin);
        }
        ids
    }

    proptest! {
        #[test]
        fn t_random_soup_builds_manifold_mesh(
            faces in proptest::collection::vec(proptest::collection::vec(0u32..10, 3..7), 1..25)
        ) {
            let mut mesh = PolyMesh::new();
            let mut ids = mesh
                .add_vertex_property("v:id", u32::MAX)
                .expect("Cannot add property");
            let mut builder = ManifoldBuilder::new(&mut mesh);
            builder.begin().expect("Cannot begin");
            let v = add_vertices(&mut builder, 10);
            for vi in v.iter() {
                ids.set(*vi, vi.index()).expect("Cannot set property");
            }
            let mut accepted: Vec<Vec<u32>> = Vec::new();
            let mut duplicated = 0usize;
            for f in faces.iter() {
                let verts: Vec<VH> = f.iter().map(VH::from).collect();
                let has_repeats = f.iter().enumerate().any(|(i, x)| f[(i + 1)..].contains(x));
                match builder.add_face(&verts).expect("Cannot add face") {
                    Some(_) => {
                        prop_assert!(!has_repeats);
                        let mapped: Vec<u32> = builder
                            .face_vertices()
                            .iter()
                            .map(|fv| ids.get_cloned(*fv).expect("Cannot read property"))
                            .collect();
                        prop_assert_eq!(&mapped, f);
                        accepted.push(normalized_loop(f.clone()));
                    }
                    None => {
                        prop_assert!(has_repeats);
                        duplicated += 1;
                    }
                }
            }
            let report = builder.end(false).expect("Cannot end");
            drop(builder);
            prop_assert_eq!(report.faces_unknown_topology, 0);
            prop_assert_eq!(report.faces_duplicated_vertices, duplicated);
            prop_assert_eq!(report.num_faces, accepted.len());
            prop_assert_eq!(mesh.num_faces(), accepted.len());
            prop_assert!(mesh.check_topology().is_ok());
            prop_assert!(mesh.vertices().all(|v| mesh.is_manifold_vertex(v)));
            prop_assert!(mesh.vertices().all(|v| !mesh.is_isolated_vertex(v)));
            let mut actual: Vec<Vec<u32>> = mesh
                .faces()
                .map(|f| {
                    normalized_loop(
                        mesh.topol
                            .fv_ccw_iter(f)
                            .map(|fv| ids.get_cloned(fv).expect("Cannot read property"))
                            .collect(),
                    )
                })
                .collect();
            actual.sort();
            accepted.sort();
            prop_assert_eq!(actual, accepted);
        }
    }
}
