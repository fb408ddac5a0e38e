use glam::Vec2;

/// A projected quad in NDC, corners in winding order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvexQuad {
    pub corners: [Vec2; 4],
}

impl ConvexQuad {
    pub fn new(corners: [Vec2; 4]) -> Self {
        Self { corners }
    }

    pub fn centroid(&self) -> Vec2 {
        self.corners.iter().copied().sum::<Vec2>() / 4.0
    }

    /// Twice the signed area (shoelace).
    pub fn double_area(&self) -> f32 {
        (0..4)
            .map(|i| self.corners[i].perp_dot(self.corners[(i + 1) % 4]))
            .sum()
    }

    /// Zero-area quads (seen edge-on, or collapsed corners) contain nothing.
    pub fn is_degenerate(&self) -> bool {
        self.double_area().abs() <= f32::EPSILON
    }

    /// Strict inside test: for every edge, `point` must lie on the same side
    /// as the centroid. Points on an edge are outside.
    pub fn contains(&self, point: Vec2) -> bool {
        if self.is_degenerate() {
            return false;
        }
        let centroid = self.centroid();
        for i in 0..4 {
            let start = self.corners[i];
            let edge = self.corners[(i + 1) % 4] - start;
            let side_point = edge.perp_dot(point - start);
            let side_centroid = edge.perp_dot(centroid - start);
            if side_point == 0.0 || side_centroid == 0.0 || side_point.signum() != side_centroid.signum() {
                return false;
            }
        }
        true
    }

    /// Solve `point - c0 = u (c1 - c0) + v (c3 - c0)`. `None` for a
    /// degenerate quad.
    pub fn local_coords(&self, point: Vec2) -> Option<Vec2> {
        let [c0, c1, _, c3] = self.corners;
        let a = c1 - c0;
        let b = c3 - c0;
        let det = a.perp_dot(b);
        if det.abs() <= f32::EPSILON {
            return None;
        }
        let d = point - c0;
        Some(Vec2::new(d.perp_dot(b) / det, a.perp_dot(d) / det))
    }
}
