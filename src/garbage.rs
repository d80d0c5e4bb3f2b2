use crate::{
    element::{Handle, FH, HH, VH},
    error::Error,
    status::Status,
    topol::Topology,
};

/// Move the live elements to the front with a two pointer scan, and return
/// the number of live elements. `swap` is called for every pair of slots
/// swapped, to swap everything else stored for these elements.
fn compact<F>(status: &mut [Status], mut swap: F) -> Result<usize, Error>
where
    F: FnMut(usize, usize) -> Result<(), Error>,
{
    if status.is_empty() {
        return Ok(0);
    }
    let (mut i0, mut i1) = (0usize, status.len() - 1);
    loop {
        // Find the first deleted and the last live element.
        while !status[i0].deleted() && i0 < i1 {
            i0 += 1;
        }
        while status[i1].deleted() && i0 < i1 {
            i1 -= 1;
        }
        if i0 >= i1 {
            break;
        }
        status.swap(i0, i1);
        swap(i0, i1)?;
    }
    Ok(if status[i0].deleted() { i0 } else { i0 + 1 })
}

impl Topology {
    /**
     * Remove the deleted elements for good.
     *
     * Live elements are moved into the slots of deleted elements, and all the
     * properties move with them. The relative order of the live elements is
     * not preserved. All connectivity is updated to the new indices, and all
     * handles obtained before this call must be discarded.
     *
     * Fails without changing anything if any property is currently borrowed.
     */
    pub fn garbage_collection(&mut self) -> Result<(), Error> {
        if !self.garbage {
            return Ok(());
        }
        self.vprops.check_borrows()?;
        self.hprops.check_borrows()?;
        self.eprops.check_borrows()?;
        self.fprops.check_borrows()?;
        // Each slot is swapped at most once, so these maps work both ways:
        // from old to new indices, and from new to old.
        let mut vmap: Vec<VH> = (0..self.vertices.len()).map(VH::from).collect();
        let mut hmap: Vec<HH> = (0..self.halfedges_size()).map(HH::from).collect();
        let mut fmap: Vec<FH> = (0..self.faces.len()).map(FH::from).collect();
        let nverts = compact(&mut self.vstatus, |i, j| {
            self.vertices.swap(i, j);
            vmap.swap(i, j);
            self.vprops.swap(i, j)
        })?;
        let nedges = compact(&mut self.estatus, |i, j| {
            self.edges.swap(i, j);
            hmap.swap(2 * i, 2 * j);
            hmap.swap(2 * i + 1, 2 * j + 1);
            self.eprops.swap(i, j)?;
            self.hprops.swap(2 * i, 2 * j)?;
            self.hprops.swap(2 * i + 1, 2 * j + 1)
        })?;
        let nfaces = compact(&mut self.fstatus, |i, j| {
            self.faces.swap(i, j);
            fmap.swap(i, j);
            self.fprops.swap(i, j)
        })?;
        // Drop the deleted elements.
        self.vertices.truncate(nverts);
        self.vstatus.truncate(nverts);
        self.edges.truncate(nedges);
        self.estatus.truncate(nedges);
        self.faces.truncate(nfaces);
        self.fstatus.truncate(nfaces);
        self.vprops.resize(nverts)?;
        self.hprops.resize(nedges * 2)?;
        self.eprops.resize(nedges)?;
        self.fprops.resize(nfaces)?;
        // Update the connectivity.
        for vertex in self.vertices.iter_mut() {
            if let Some(h) = vertex.halfedge {
                vertex.halfedge = Some(hmap[h.index() as usize]);
            }
        }
        for halfedge in self
            .edges
            .iter_mut()
            .flat_map(|edge| edge.halfedges.iter_mut())
        {
            halfedge.vertex = vmap[halfedge.vertex.index() as usize];
            halfedge.next = hmap[halfedge.next.index() as usize];
            halfedge.prev = hmap[halfedge.prev.index() as usize];
            if let Some(f) = halfedge.face {
                halfedge.face = Some(fmap[f.index() as usize]);
            }
        }
        for face in self.faces.iter_mut() {
            face.halfedge = hmap[face.halfedge.index() as usize];
        }
        self.vertices.shrink_to_fit();
        self.vstatus.shrink_to_fit();
        self.edges.shrink_to_fit();
        self.estatus.shrink_to_fit();
        self.faces.shrink_to_fit();
        self.fstatus.shrink_to_fit();
        self.vprops.shrink_to_fit()?;
        self.hprops.shrink_to_fit()?;
        self.eprops.shrink_to_fit()?;
        self.fprops.shrink_to_fit()?;
        self.deleted_vertices = 0;
        self.deleted_edges = 0;
        self.deleted_faces = 0;
        self.garbage = false;
        Ok(())
    }
}
