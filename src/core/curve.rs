//! Monotone-in-x cubic interpolation (limited Hermite tangents). Turns the
//! sparse sample polylines into smooth strokes without overshooting between
//! knots.

use crate::anim::Point;

/// Per-knot dy/dx tangents for an x-increasing polyline, limited so the
/// interpolant never overshoots between adjacent knots. Each interior
/// tangent depends only on its two neighboring knots, so evaluating a
/// sub-span of the polyline yields the same curve as the whole.
pub fn monotone_tangents(points: &[Point]) -> Vec<f32> {
    let n = points.len();
    if n < 2 {
        return vec![0.0; n];
    }

    let secant = |i: usize| {
        let (a, b) = (points[i], points[i + 1]);
        (b.y - a.y) / (b.x - a.x)
    };

    if n == 2 {
        let d = secant(0);
        return vec![d, d];
    }

    let mut m = vec![0.0f32; n];
    for i in 1..n - 1 {
        let h0 = points[i].x - points[i - 1].x;
        let h1 = points[i + 1].x - points[i].x;
        let (s0, s1) = (secant(i - 1), secant(i));
        // Weighted average, capped to neither secant so local extrema in
        // the knots stay extrema in the curve.
        let w = (s0 * h1 + s1 * h0) / (h0 + h1);
        m[i] = if s0 * s1 <= 0.0 {
            0.0
        } else {
            s0.signum() * s0.abs().min(s1.abs()).min(0.5 * w.abs())
        };
    }
    m[0] = (3.0 * secant(0) - m[1]) / 2.0;
    m[n - 1] = (3.0 * secant(n - 2) - m[n - 2]) / 2.0;
    m
}

/// Cubic Hermite segment evaluated at `x` between `p0` and `p1`.
pub fn hermite_y(p0: Point, p1: Point, m0: f32, m1: f32, x: f32) -> f32 {
    let h = p1.x - p0.x;
    let t = (x - p0.x) / h;
    let t2 = t * t;
    let t3 = t2 * t;
    (2.0 * t3 - 3.0 * t2 + 1.0) * p0.y
        + (t3 - 2.0 * t2 + t) * h * m0
        + (-2.0 * t3 + 3.0 * t2) * p1.y
        + (t3 - t2) * h * m1
}

/// Densifies an x-increasing polyline so consecutive output points are at
/// most `max_dx` apart in x. Passes exactly through every input knot.
pub fn sample(points: &[Point], max_dx: f32) -> Vec<Point> {
    if points.len() < 2 {
        return points.to_vec();
    }

    let m = monotone_tangents(points);
    let mut out = Vec::new();
    for i in 0..points.len() - 1 {
        let (p0, p1) = (points[i], points[i + 1]);
        let steps = ((p1.x - p0.x) / max_dx).ceil().max(1.0) as usize;
        for s in 0..steps {
            let x = p0.x + (p1.x - p0.x) * (s as f32 / steps as f32);
            let y = if s == 0 {
                p0.y
            } else {
                hermite_y(p0, p1, m[i], m[i + 1], x)
            };
            out.push(Point::new(x, y));
        }
    }
    out.push(points[points.len() - 1]);
    out
}
