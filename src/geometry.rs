//! Geometric helpers: the intersections needed by the elbow solver, line segments
//! for linear axis rails and the degree 3 curve built through path points.

use nalgebra::{Point3, Vector3};

use crate::error::KinematicsError;

/// Lengths below this are treated as zero (millimeters).
pub const LENGTH_TOLERANCE: f64 = 1e-9;

/// Intersections that miss by less than this are treated as touching (millimeters).
const TOUCH_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Point3<f64>,
    pub radius: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: Point3<f64>,
    /// Unit normal of the plane the circle lies in.
    pub normal: Vector3<f64>,
    pub radius: f64,
}

impl Sphere {
    pub fn new(center: Point3<f64>, radius: f64) -> Self {
        Sphere { center, radius }
    }

    /// Intersection of two sphere surfaces. Touching spheres return a circle of zero radius.
    pub fn intersect(&self, other: &Sphere) -> Result<Circle, KinematicsError> {
        let axis = other.center - self.center;
        let d = axis.norm();
        if d < LENGTH_TOLERANCE {
            return Err(KinematicsError::Unreachable(
                "concentric spheres have no isolated intersection".to_string(),
            ));
        }
        if d > self.radius + other.radius + TOUCH_TOLERANCE {
            return Err(KinematicsError::Unreachable(format!(
                "distance {:.3} exceeds the reach {:.3}",
                d,
                self.radius + other.radius
            )));
        }
        if d < (self.radius - other.radius).abs() - TOUCH_TOLERANCE {
            return Err(KinematicsError::Unreachable(format!(
                "distance {:.3} is below the minimal reach {:.3}",
                d,
                (self.radius - other.radius).abs()
            )));
        }
        let normal = axis / d;
        let a = (self.radius * self.radius - other.radius * other.radius + d * d) / (2.0 * d);
        let h_squared = self.radius * self.radius - a * a;
        Ok(Circle {
            center: self.center + normal * a,
            normal,
            radius: h_squared.max(0.0).sqrt(),
        })
    }
}

impl Circle {
    /// Intersection of the circle with the plane through `point` with the given normal.
    /// Returns both points; they coincide if the plane touches the circle.
    pub fn intersect_plane(
        &self,
        point: &Point3<f64>,
        plane_normal: &Vector3<f64>,
    ) -> Result<[Point3<f64>; 2], KinematicsError> {
        let plane_normal = plane_normal.normalize();
        let direction = self.normal.cross(&plane_normal);
        let direction_norm = direction.norm();
        if direction_norm < LENGTH_TOLERANCE {
            return Err(KinematicsError::Unreachable(
                "circle lies in a plane parallel to the elbow plane".to_string(),
            ));
        }
        let direction = direction / direction_norm;

        // Point on the line where the circle plane and the given plane meet, closest to the center.
        let towards = direction.cross(&self.normal);
        let t = plane_normal.dot(&(point - self.center)) / plane_normal.dot(&towards);
        let closest = self.center + towards * t;

        let s_squared = self.radius * self.radius - t * t;
        if s_squared < -TOUCH_TOLERANCE * self.radius.max(1.0) {
            return Err(KinematicsError::Unreachable(
                "elbow plane does not cut the elbow circle".to_string(),
            ));
        }
        let s = s_squared.max(0.0).sqrt();
        Ok([closest + direction * s, closest - direction * s])
    }
}

/// Straight segment, used for the rail of a linear external axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    pub start: Point3<f64>,
    pub end: Point3<f64>,
}

impl LineSegment {
    pub fn new(start: Point3<f64>, end: Point3<f64>) -> Self {
        LineSegment { start, end }
    }

    pub fn length(&self) -> f64 {
        (self.end - self.start).norm()
    }

    /// Normalized parameter (0 at start, 1 at end) of the closest point on the segment.
    pub fn closest_parameter(&self, point: &Point3<f64>) -> f64 {
        let direction = self.end - self.start;
        let length_squared = direction.norm_squared();
        if length_squared < LENGTH_TOLERANCE * LENGTH_TOLERANCE {
            return 0.0;
        }
        ((point - self.start).dot(&direction) / length_squared).clamp(0.0, 1.0)
    }

    pub fn point_at(&self, t: f64) -> Point3<f64> {
        self.start + (self.end - self.start) * t
    }

    pub fn closest_point(&self, point: &Point3<f64>) -> Point3<f64> {
        self.point_at(self.closest_parameter(point))
    }
}

/// Degree 3 curve passing through all given points (centripetal Catmull-Rom segments).
/// Consecutive duplicate points are dropped when the curve is built.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolatedCurve {
    points: Vec<Point3<f64>>,
}

impl InterpolatedCurve {
    /// Degree of the polynomial pieces.
    pub const DEGREE: usize = 3;

    /// Builds the curve, or returns None if fewer than two distinct points remain.
    pub fn through_points(points: &[Point3<f64>]) -> Option<Self> {
        let mut distinct: Vec<Point3<f64>> = Vec::with_capacity(points.len());
        for point in points {
            if distinct.last().is_none_or(|last| (last - point).norm() > TOUCH_TOLERANCE) {
                distinct.push(*point);
            }
        }
        if distinct.len() < 2 {
            return None;
        }
        Some(InterpolatedCurve { points: distinct })
    }

    /// Points the curve passes through.
    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    pub fn start(&self) -> Point3<f64> {
        self.points[0]
    }

    pub fn end(&self) -> Point3<f64> {
        self.points[self.points.len() - 1]
    }

    /// Point at normalized parameter `t` in [0, 1]; each span between two points takes
    /// an equal share of the parameter range.
    pub fn point_at(&self, t: f64) -> Point3<f64> {
        let spans = self.points.len() - 1;
        let t = t.clamp(0.0, 1.0) * spans as f64;
        let index = (t.floor() as usize).min(spans - 1);
        let local = t - index as f64;

        let p1 = self.points[index];
        let p2 = self.points[index + 1];
        // Phantom end points are reflections, making the end spans straight if there are no neighbours.
        let p0 = if index > 0 { self.points[index - 1] } else { p1 + (p1 - p2) };
        let p3 = if index + 2 <= spans { self.points[index + 2] } else { p2 + (p2 - p1) };
        centripetal_catmull_rom(&p0, &p1, &p2, &p3, local)
    }

    /// Length estimated from a polyline of `samples` points per span.
    pub fn length(&self, samples: usize) -> f64 {
        let count = (self.points.len() - 1) * samples.max(1);
        let mut length = 0.0;
        let mut previous = self.start();
        for i in 1..=count {
            let point = self.point_at(i as f64 / count as f64);
            length += (point - previous).norm();
            previous = point;
        }
        length
    }
}

fn centripetal_catmull_rom(
    p0: &Point3<f64>,
    p1: &Point3<f64>,
    p2: &Point3<f64>,
    p3: &Point3<f64>,
    u: f64,
) -> Point3<f64> {
    fn knot(t: f64, a: &Point3<f64>, b: &Point3<f64>) -> f64 {
        t + (b - a).norm().sqrt().max(LENGTH_TOLERANCE)
    }
    let t0 = 0.0;
    let t1 = knot(t0, p0, p1);
    let t2 = knot(t1, p1, p2);
    let t3 = knot(t2, p2, p3);
    let t = t1 + (t2 - t1) * u;

    let a1 = p0.coords * ((t1 - t) / (t1 - t0)) + p1.coords * ((t - t0) / (t1 - t0));
    let a2 = p1.coords * ((t2 - t) / (t2 - t1)) + p2.coords * ((t - t1) / (t2 - t1));
    let a3 = p2.coords * ((t3 - t) / (t3 - t2)) + p3.coords * ((t - t2) / (t3 - t2));
    let b1 = a1 * ((t2 - t) / (t2 - t0)) + a2 * ((t - t0) / (t2 - t0));
    let b2 = a2 * ((t3 - t) / (t3 - t1)) + a3 * ((t - t1) / (t3 - t1));
    Point3::from(b1 * ((t2 - t) / (t2 - t1)) + b2 * ((t - t1) / (t2 - t1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_intersection() {
        let a = Sphere::new(Point3::origin(), 5.0);
        let b = Sphere::new(Point3::new(8.0, 0.0, 0.0), 5.0);
        let circle = a.intersect(&b).expect("spheres overlap");
        assert!((circle.center - Point3::new(4.0, 0.0, 0.0)).norm() < 1e-12);
        assert!((circle.radius - 3.0).abs() < 1e-12);
        assert!((circle.normal - Vector3::x()).norm() < 1e-12);
    }

    #[test]
    fn test_sphere_intersection_out_of_reach() {
        let a = Sphere::new(Point3::origin(), 1.0);
        let b = Sphere::new(Point3::new(3.0, 0.0, 0.0), 1.0);
        assert!(matches!(a.intersect(&b), Err(KinematicsError::Unreachable(_))));

        let inner = Sphere::new(Point3::new(0.5, 0.0, 0.0), 0.2);
        let outer = Sphere::new(Point3::origin(), 5.0);
        assert!(matches!(outer.intersect(&inner), Err(KinematicsError::Unreachable(_))));
    }

    #[test]
    fn test_circle_plane_intersection() {
        let circle = Circle { center: Point3::new(4.0, 0.0, 0.0), normal: Vector3::x(), radius: 3.0 };
        let points = circle
            .intersect_plane(&Point3::origin(), &Vector3::y())
            .expect("plane contains the center");
        let mut z: Vec<f64> = points.iter().map(|p| p.z).collect();
        z.sort_by(|a, b| a.total_cmp(b));
        assert!((z[0] + 3.0).abs() < 1e-12);
        assert!((z[1] - 3.0).abs() < 1e-12);
        for p in points {
            assert!(p.y.abs() < 1e-12);
            assert!((p.x - 4.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_circle_plane_miss() {
        let circle = Circle { center: Point3::origin(), normal: Vector3::x(), radius: 1.0 };
        let result = circle.intersect_plane(&Point3::new(0.0, 2.0, 0.0), &Vector3::y());
        assert!(matches!(result, Err(KinematicsError::Unreachable(_))));
    }

    #[test]
    fn test_segment_closest() {
        let segment = LineSegment::new(Point3::origin(), Point3::new(1000.0, 0.0, 0.0));
        assert!((segment.closest_parameter(&Point3::new(250.0, 40.0, 0.0)) - 0.25).abs() < 1e-12);
        assert_eq!(segment.closest_parameter(&Point3::new(-50.0, 0.0, 0.0)), 0.0);
        assert_eq!(segment.closest_point(&Point3::new(1500.0, 3.0, 0.0)), Point3::new(1000.0, 0.0, 0.0));
    }

    #[test]
    fn test_curve_passes_through_points() {
        let points = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(100.0, 50.0, 0.0),
            Point3::new(200.0, 0.0, 10.0),
            Point3::new(300.0, -20.0, 0.0),
        ];
        let curve = InterpolatedCurve::through_points(&points).expect("distinct points");
        for (i, p) in points.iter().enumerate() {
            let at = curve.point_at(i as f64 / 3.0);
            assert!((at - p).norm() < 1e-9, "point {} not on curve", i);
        }
        assert!(curve.length(16) >= 300.0);
    }

    #[test]
    fn test_curve_needs_two_distinct_points() {
        let p = Point3::new(1.0, 2.0, 3.0);
        assert!(InterpolatedCurve::through_points(&[p, p, p]).is_none());
        assert!(InterpolatedCurve::through_points(&[]).is_none());

        let line = InterpolatedCurve::through_points(&[p, p, Point3::new(11.0, 2.0, 3.0)])
            .expect("two distinct points");
        assert_eq!(line.points().len(), 2);
        assert!((line.point_at(0.5) - Point3::new(6.0, 2.0, 3.0)).norm() < 1e-9);
    }
}
