use nalgebra::{Matrix3, Vector2, Vector3};

/// Forward 2D rotation about `center` with unit scale, as a homogeneous matrix.
///
/// `angle_degrees` is positive counter-clockwise as seen on screen (image y
/// axis pointing down), which is the convention of OpenCV's
/// `getRotationMatrix2D`.
pub fn rotation_matrix(center: (f64, f64), angle_degrees: f64) -> Matrix3<f64> {
    let (cx, cy) = center;
    let theta = angle_degrees.to_radians();
    let (sin, cos) = theta.sin_cos();

    // Translate to origin, rotate, translate back
    let translate_to_origin = Matrix3::new(
        1.0, 0.0, -cx,
        0.0, 1.0, -cy,
        0.0, 0.0, 1.0,
    );

    let rotate = Matrix3::new(
        cos, sin, 0.0,
        -sin, cos, 0.0,
        0.0, 0.0, 1.0,
    );

    let translate_back = Matrix3::new(
        1.0, 0.0, cx,
        0.0, 1.0, cy,
        0.0, 0.0, 1.0,
    );

    translate_back * rotate * translate_to_origin
}

/// Transform a point using the affine matrix
pub fn transform_point(matrix: &Matrix3<f64>, x: f64, y: f64) -> (f64, f64) {
    let p = Vector3::new(x, y, 1.0);
    let result = matrix * p;
    (result.x / result.z, result.y / result.z)
}

/// Signed polygon area by the shoelace formula
pub fn signed_area(points: &[(f64, f64)]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let n = points.len();
    let twice: f64 = (0..n)
        .map(|i| {
            let (x1, y1) = points[i];
            let (x2, y2) = points[(i + 1) % n];
            x1 * y2 - x2 * y1
        })
        .sum();
    twice / 2.0
}

/// Smallest-area rectangle enclosing a point set.
///
/// `angle` is in degrees and always lies in `[-90, 0)`. `width` is the side
/// running along `angle`, `height` the side perpendicular to it. An
/// axis-aligned rectangle therefore reports `-90` with `width` equal to its
/// vertical extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinAreaRect {
    pub center: (f64, f64),
    pub width: f64,
    pub height: f64,
    pub angle: f64,
}

impl MinAreaRect {
    /// Build the canonical representation of a rectangle given one side
    /// direction (degrees, any range) and the side lengths along and across it.
    fn canonical(center: (f64, f64), edge_degrees: f64, along: f64, across: f64) -> Self {
        let mut direction = edge_degrees.rem_euclid(180.0);
        if direction >= 180.0 {
            direction -= 180.0;
        }

        if direction >= 90.0 {
            Self {
                center,
                width: along,
                height: across,
                angle: direction - 180.0,
            }
        } else {
            // The perpendicular side lands in [90, 180) and becomes the width
            Self {
                center,
                width: across,
                height: along,
                angle: direction - 90.0,
            }
        }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Corner points in order around the rectangle
    pub fn corners(&self) -> [(f64, f64); 4] {
        let theta = self.angle.to_radians();
        let along = Vector2::new(theta.cos(), theta.sin()) * (self.width / 2.0);
        let across = Vector2::new(-theta.sin(), theta.cos()) * (self.height / 2.0);
        let c = Vector2::new(self.center.0, self.center.1);

        [c - along - across, c + along - across, c + along + across, c - along + across]
            .map(|p| (p.x, p.y))
    }
}

/// Minimum-area rectangle of a convex polygon by rotating calipers.
///
/// The points are expected in hull order; every edge direction is tried as a
/// rectangle side. Returns `None` when the polygon has no area.
pub fn min_area_rect(hull: &[(f64, f64)]) -> Option<MinAreaRect> {
    if hull.len() < 3 || signed_area(hull).abs() <= f64::EPSILON {
        return None;
    }

    let n = hull.len();
    let mut best: Option<(f64, MinAreaRect)> = None;

    for i in 0..n {
        let origin = Vector2::new(hull[i].0, hull[i].1);
        let next = Vector2::new(hull[(i + 1) % n].0, hull[(i + 1) % n].1);
        let edge = next - origin;
        let length = edge.norm();

        // Skip degenerate edges
        if length < f64::EPSILON {
            continue;
        }

        let u = edge / length;
        let v = Vector2::new(-u.y, u.x);

        let mut min_u = f64::INFINITY;
        let mut max_u = f64::NEG_INFINITY;
        let mut min_v = f64::INFINITY;
        let mut max_v = f64::NEG_INFINITY;

        for &(x, y) in hull {
            let d = Vector2::new(x, y) - origin;
            let pu = d.dot(&u);
            let pv = d.dot(&v);
            min_u = min_u.min(pu);
            max_u = max_u.max(pu);
            min_v = min_v.min(pv);
            max_v = max_v.max(pv);
        }

        let along = max_u - min_u;
        let across = max_v - min_v;
        let area = along * across;

        if best.as_ref().map_or(true, |(a, _)| area < *a) {
            let center = origin + u * ((min_u + max_u) / 2.0) + v * ((min_v + max_v) / 2.0);
            let edge_degrees = u.y.atan2(u.x).to_degrees();
            let rect = MinAreaRect::canonical((center.x, center.y), edge_degrees, along, across);
            best = Some((area, rect));
        }
    }

    best.map(|(_, rect)| rect)
}

/// Angle in degrees to rotate an image by (counter-clockwise positive) so the
/// rectangle ends up axis-aligned.
///
/// Follows the legacy minimum-area-rectangle convention: the raw angle lies in
/// `[-90, 0)` and its width/height labels swap at 45°, so the correction has
/// three branches and is negated twice.
pub fn resolve_unrotate_angle(rect: &MinAreaRect) -> f64 {
    let theta = rect.angle;
    let raw = if theta < -45.0 {
        -(90.0 + theta)
    } else if rect.width > rect.height {
        -(90.0 + theta)
    } else {
        -theta
    };
    -raw
}
