// Curve refinement: densify the smoothed polyline with local quadratic
// Bezier segments so the rendered overlay doesn't show row-anchor steps.

use crate::types::Point;

/// Insert three Bezier-sampled points between each consecutive pair covered
/// by a point triple. Endpoints of the input are preserved exactly; the
/// input order (ascending y) is kept. Short sequences pass through as-is.
pub fn refine_curve(points: &[Point]) -> Vec<Point> {
    if points.len() <= 3 {
        return points.to_vec();
    }

    let mut refined = Vec::with_capacity(points.len() * 4);

    for window in points.windows(3) {
        let [p0, p1, p2] = [window[0], window[1], window[2]];
        let control = centroid(p0, p1, p2);

        refined.push(p0);
        for step in 1..4 {
            refined.push(quadratic_bezier(p0, control, p1, step as f32 / 4.0));
        }
    }

    // The triple walk stops at points[n-3]; close out the tail verbatim.
    refined.push(points[points.len() - 2]);
    refined.push(points[points.len() - 1]);
    refined
}

fn centroid(a: Point, b: Point, c: Point) -> Point {
    Point::new((a.x + b.x + c.x) / 3.0, (a.y + b.y + c.y) / 3.0)
}

fn quadratic_bezier(p0: Point, control: Point, p1: Point, t: f32) -> Point {
    let u = 1.0 - t;
    Point::new(
        u * u * p0.x + 2.0 * u * t * control.x + t * t * p1.x,
        u * u * p0.y + 2.0 * u * t * control.y + t * t * p1.y,
    )
}
