//! Curve geometry behind the tracker.
//!
//! The tracker needs the same small capability surface from every curve
//! kind: arc length, uniformly spaced samples with tangents, and the
//! outward directions at the two open ends. Each kind is a tagged
//! variant chosen once at construction; the per-site loop never touches
//! geometry, so there is no dispatch on the hot path.

use nalgebra::Vector2;

/// Subdivisions per control span when flattening the spline.
const SPLINE_SUBDIV: usize = 8;

const MIN_SEGMENT: f32 = 1e-6;

/// A position on the curve with its unit tangent.
#[derive(Clone, Copy, Debug)]
pub struct CurveSample {
    pub pos: Vector2<f32>,
    pub tangent: Vector2<f32>,
}

/// Geometry of the tracked contour, rebuilt each frame from the valid
/// site positions.
#[derive(Clone, Debug)]
pub enum CurveBackend {
    /// Catmull-Rom interpolation through the points; follows curvature
    /// between sites. The free-form tracker's default.
    Spline { points: Vec<Vector2<f32>> },
    /// Piecewise-linear interpolation; exact for straight contours and
    /// cheaper where curvature does not matter.
    Polyline { points: Vec<Vector2<f32>> },
}

impl CurveBackend {
    pub fn spline(points: Vec<Vector2<f32>>) -> Self {
        CurveBackend::Spline { points }
    }

    pub fn polyline(points: Vec<Vector2<f32>>) -> Self {
        CurveBackend::Polyline { points }
    }

    pub fn points(&self) -> &[Vector2<f32>] {
        match self {
            CurveBackend::Spline { points } | CurveBackend::Polyline { points } => points,
        }
    }

    pub fn set_points(&mut self, new_points: Vec<Vector2<f32>>) {
        match self {
            CurveBackend::Spline { points } | CurveBackend::Polyline { points } => {
                *points = new_points
            }
        }
    }

    /// Dense polyline approximation used for arc-length queries.
    fn flatten(&self) -> Vec<Vector2<f32>> {
        match self {
            CurveBackend::Polyline { points } => points.clone(),
            CurveBackend::Spline { points } => {
                if points.len() < 3 {
                    return points.clone();
                }
                let n = points.len();
                let mut dense = Vec::with_capacity((n - 1) * SPLINE_SUBDIV + 1);
                for i in 0..n - 1 {
                    // clamp neighbors at the open ends
                    let p0 = points[i.saturating_sub(1)];
                    let p1 = points[i];
                    let p2 = points[i + 1];
                    let p3 = points[(i + 2).min(n - 1)];
                    for k in 0..SPLINE_SUBDIV {
                        let t = k as f32 / SPLINE_SUBDIV as f32;
                        dense.push(catmull_rom(p0, p1, p2, p3, t));
                    }
                }
                dense.push(points[n - 1]);
                dense
            }
        }
    }

    /// Total arc length of the flattened curve.
    pub fn length(&self) -> f32 {
        let dense = self.flatten();
        dense
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).norm())
            .sum()
    }

    /// Positions spaced `spacing` apart in arc length, starting at the
    /// first point. Tangents come from the local flattened segment.
    pub fn samples(&self, spacing: f32) -> Vec<CurveSample> {
        let dense = self.flatten();
        if dense.len() < 2 || spacing <= 0.0 {
            return Vec::new();
        }

        let mut out = Vec::new();
        let mut next_s = 0.0f32;
        let mut walked = 0.0f32;
        for pair in dense.windows(2) {
            let seg = pair[1] - pair[0];
            let seg_len = seg.norm();
            if seg_len < MIN_SEGMENT {
                continue;
            }
            let tangent = seg / seg_len;
            while next_s <= walked + seg_len + 1e-4 {
                let local = (next_s - walked).clamp(0.0, seg_len);
                out.push(CurveSample {
                    pos: pair[0] + tangent * local,
                    tangent,
                });
                next_s += spacing;
            }
            walked += seg_len;
        }
        out
    }

    /// Outward unit tangents at the two open ends: (start, end).
    pub fn end_directions(&self) -> Option<(Vector2<f32>, Vector2<f32>)> {
        let points = self.points();
        if points.len() < 2 {
            return None;
        }
        let start = points[0] - points[1];
        let end = points[points.len() - 1] - points[points.len() - 2];
        let sn = start.norm();
        let en = end.norm();
        if sn < MIN_SEGMENT || en < MIN_SEGMENT {
            return None;
        }
        Some((start / sn, end / en))
    }
}

fn catmull_rom(
    p0: Vector2<f32>,
    p1: Vector2<f32>,
    p2: Vector2<f32>,
    p3: Vector2<f32>,
    t: f32,
) -> Vector2<f32> {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * (2.0 * p1
        + (p2 - p0) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (3.0 * (p1 - p2) + p3 - p0) * t3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn straight(n: usize, spacing: f32) -> Vec<Vector2<f32>> {
        (0..n)
            .map(|k| Vector2::new(k as f32 * spacing, 100.0))
            .collect()
    }

    #[test]
    fn straight_line_length_is_exact() {
        let spline = CurveBackend::spline(straight(10, 10.0));
        assert_relative_eq!(spline.length(), 90.0, epsilon = 1e-3);
        let polyline = CurveBackend::polyline(straight(10, 10.0));
        assert_relative_eq!(polyline.length(), 90.0, epsilon = 1e-5);
    }

    #[test]
    fn samples_are_uniform_in_arc_length() {
        for backend in [
            CurveBackend::spline(straight(10, 10.0)),
            CurveBackend::polyline(straight(10, 10.0)),
        ] {
            let samples = backend.samples(5.0);
            assert_eq!(samples.len(), 19);
            for (k, s) in samples.iter().enumerate() {
                assert_relative_eq!(s.pos.x, 5.0 * k as f32, epsilon = 1e-3);
                assert_relative_eq!(s.pos.y, 100.0, epsilon = 1e-3);
                assert_relative_eq!(s.tangent.x, 1.0, epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn spline_passes_through_control_points() {
        let points = vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(10.0, 5.0),
            Vector2::new(20.0, 0.0),
            Vector2::new(30.0, -5.0),
        ];
        let spline = CurveBackend::spline(points.clone());
        let dense = spline.flatten();
        for p in &points {
            let closest = dense
                .iter()
                .map(|d| (d - p).norm())
                .fold(f32::INFINITY, f32::min);
            assert!(closest < 1e-3, "control point {p:?} missed by {closest}");
        }
    }

    #[test]
    fn end_directions_point_outward() {
        let backend = CurveBackend::polyline(straight(5, 10.0));
        let (front, back) = backend.end_directions().unwrap();
        assert_relative_eq!(front.x, -1.0, epsilon = 1e-5);
        assert_relative_eq!(back.x, 1.0, epsilon = 1e-5);
    }
}
