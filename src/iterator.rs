/*!
Circulators walking the one-ring of a vertex, or the loop of halfedges around
a face.

Every circulator remembers the halfedge it started from and stops right
before visiting it a second time, so a full cycle yields each element exactly
once. Circulators borrow the topology immutably, so the borrow checker rules
out structural edits while one is alive. All of them can be restarted with
`reset`.

The const parameter `CCW` selects the direction of rotation. Counter
clockwise is the default.
*/

use crate::{
    element::{FH, HH, VH},
    topol::Topology,
};

/// Outgoing halfedges of a vertex.
pub struct HalfedgeAroundVertex<'a, const CCW: bool = true> {
    topol: &'a Topology,
    hstart: Option<HH>,
    hcurrent: Option<HH>,
}

impl<'a, const CCW: bool> HalfedgeAroundVertex<'a, CCW> {
    pub fn new(topol: &'a Topology, v: VH) -> Self {
        let h = topol.vertex_halfedge(v);
        HalfedgeAroundVertex {
            topol,
            hstart: h,
            hcurrent: h,
        }
    }

    /// Start over from the first halfedge.
    pub fn reset(&mut self) {
        self.hcurrent = self.hstart;
    }

    fn advance(&mut self, next: HH) {
        self.hcurrent = match self.hstart {
            Some(start) if start != next => Some(next),
            _ => None,
        };
    }
}

impl Iterator for HalfedgeAroundVertex<'_, true> {
    type Item = HH;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.hcurrent?;
        self.advance(self.topol.prev_halfedge(current).opposite());
        Some(current)
    }
}

impl Iterator for HalfedgeAroundVertex<'_, false> {
    type Item = HH;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.hcurrent?;
        self.advance(self.topol.next_halfedge(current.opposite()));
        Some(current)
    }
}

/// Vertices adjacent to a vertex.
pub struct VertexAroundVertex<'a, const CCW: bool = true> {
    inner: HalfedgeAroundVertex<'a, CCW>,
}

impl<'a, const CCW: bool> VertexAroundVertex<'a, CCW> {
    pub fn new(topol: &'a Topology, v: VH) -> Self {
        VertexAroundVertex {
            inner: HalfedgeAroundVertex::new(topol, v),
        }
    }

    pub fn reset(&mut self) {
        self.inner.reset();
    }
}

impl<'a, const CCW: bool> Iterator for VertexAroundVertex<'a, CCW>
where
    HalfedgeAroundVertex<'a, CCW>: Iterator<Item = HH>,
{
    type Item = VH;

    fn next(&mut self) -> Option<Self::Item> {
        let h = self.inner.next()?;
        Some(self.inner.topol.to_vertex(h))
    }
}

/// Faces incident on a vertex. Gaps in the one-ring, i.e. boundary
/// halfedges, are skipped.
pub struct FaceAroundVertex<'a, const CCW: bool = true> {
    inner: HalfedgeAroundVertex<'a, CCW>,
}

impl<'a, const CCW: bool> FaceAroundVertex<'a, CCW> {
    pub fn new(topol: &'a Topology, v: VH) -> Self {
        FaceAroundVertex {
            inner: HalfedgeAroundVertex::new(topol, v),
        }
    }

    pub fn reset(&mut self) {
        self.inner.reset();
    }
}

impl<'a, const CCW: bool> Iterator for FaceAroundVertex<'a, CCW>
where
    HalfedgeAroundVertex<'a, CCW>: Iterator<Item = HH>,
{
    type Item = FH;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let h = self.inner.next()?;
            if let Some(f) = self.inner.topol.halfedge_face(h) {
                return Some(f);
            }
        }
    }
}

/// Halfedges of a face, or of any halfedge loop when created with
/// [`HalfedgeAroundFace::from_halfedge`].
pub struct HalfedgeAroundFace<'a, const CCW: bool = true> {
    topol: &'a Topology,
    hstart: Option<HH>,
    hcurrent: Option<HH>,
}

impl<'a, const CCW: bool> HalfedgeAroundFace<'a, CCW> {
    pub fn new(topol: &'a Topology, f: FH) -> Self {
        let h = topol.is_valid_face(f).then(|| topol.face_halfedge(f));
        HalfedgeAroundFace {
            topol,
            hstart: h,
            hcurrent: h,
        }
    }

    /// Walk the loop containing `h`. This works for boundary loops too.
    pub fn from_halfedge(topol: &'a Topology, h: HH) -> Self {
        let h = topol.is_valid_halfedge(h).then_some(h);
        HalfedgeAroundFace {
            topol,
            hstart: h,
            hcurrent: h,
        }
    }

    pub fn reset(&mut self) {
        self.hcurrent = self.hstart;
    }

    fn advance(&mut self, next: HH) {
        self.hcurrent = match self.hstart {
            Some(start) if start != next => Some(next),
            _ => None,
        };
    }
}

impl Iterator for HalfedgeAroundFace<'_, true> {
    type Item = HH;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.hcurrent?;
        self.advance(self.topol.next_halfedge(current));
        Some(current)
    }
}

impl Iterator for HalfedgeAroundFace<'_, false> {
    type Item = HH;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.hcurrent?;
        self.advance(self.topol.prev_halfedge(current));
        Some(current)
    }
}

/// Vertices of a face.
pub struct VertexAroundFace<'a, const CCW: bool = true> {
    inner: HalfedgeAroundFace<'a, CCW>,
}

impl<'a, const CCW: bool> VertexAroundFace<'a, CCW> {
    pub fn new(topol: &'a Topology, f: FH) -> Self {
        VertexAroundFace {
            inner: HalfedgeAroundFace::new(topol, f),
        }
    }

    pub fn reset(&mut self) {
        self.inner.reset();
    }
}

impl<'a, const CCW: bool> Iterator for VertexAroundFace<'a, CCW>
where
    HalfedgeAroundFace<'a, CCW>: Iterator<Item = HH>,
{
    type Item = VH;

    fn next(&mut self) -> Option<Self::Item> {
        let h = self.inner.next()?;
        Some(self.inner.topol.to_vertex(h))
    }
}

impl Topology {
    pub fn voh_ccw_iter(&self, v: VH) -> HalfedgeAroundVertex<'_, true> {
        HalfedgeAroundVertex::new(self, v)
    }

    pub fn voh_cw_iter(&self, v: VH) -> HalfedgeAroundVertex<'_, false> {
        HalfedgeAroundVertex::new(self, v)
    }

    pub fn vv_ccw_iter(&self, v: VH) -> VertexAroundVertex<'_, true> {
        VertexAroundVertex::new(self, v)
    }

    pub fn vv_cw_iter(&self, v: VH) -> VertexAroundVertex<'_, false> {
        VertexAroundVertex::new(self, v)
    }

    pub fn vf_ccw_iter(&self, v: VH) -> FaceAroundVertex<'_, true> {
        FaceAroundVertex::new(self, v)
    }

    pub fn vf_cw_iter(&self, v: VH) -> FaceAroundVertex<'_, false> {
        FaceAroundVertex::new(self, v)
    }

    pub fn fh_ccw_iter(&self, f: FH) -> HalfedgeAroundFace<'_, true> {
        HalfedgeAroundFace::new(self, f)
    }

    pub fn fh_cw_iter(&self, f: FH) -> HalfedgeAroundFace<'_, false> {
        HalfedgeAroundFace::new(self, f)
    }

    pub fn fv_ccw_iter(&self, f: FH) -> VertexAroundFace<'_, true> {
        VertexAroundFace::new(self, f)
    }

    pub fn fv_cw_iter(&self, f: FH) -> VertexAroundFace<'_, false> {
        VertexAroundFace::new(self, f)
    }
}
