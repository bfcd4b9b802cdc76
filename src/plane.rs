//! Oriented planes (frames) as used to describe axes, targets, tools and work objects.
//!
//! A plane is an origin with three orthonormal axes. It is interchangeable with a
//! [`Pose`]: the pose maps plane-local coordinates into the coordinates the plane is
//! expressed in. Planes are preferred in the public data model because targets and
//! axis definitions are naturally given as "origin, X direction, Y direction".

use nalgebra::{Matrix3, Point3, Rotation3, Translation3, Unit, UnitQuaternion, Vector3};

use crate::kinematic_traits::Pose;

/// Tolerance for checking the axes of a plane for unit length and orthogonality.
const ORTHONORMAL_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub origin: Point3<f64>,
    pub x_axis: Vector3<f64>,
    pub y_axis: Vector3<f64>,
    pub z_axis: Vector3<f64>,
}

impl Plane {
    /// Builds the plane from the origin and two directions. The X direction is kept,
    /// the Y direction is made orthogonal to it and Z completes the right handed frame.
    /// Zero or parallel directions produce a plane that is not [`valid`](Plane::is_valid).
    pub fn new(origin: Point3<f64>, x_direction: Vector3<f64>, y_direction: Vector3<f64>) -> Self {
        let x_axis = x_direction.normalize();
        let z_axis = x_axis.cross(&y_direction).normalize();
        let y_axis = z_axis.cross(&x_axis);
        Plane { origin, x_axis, y_axis, z_axis }
    }

    /// Plane through the origin of the world, axes aligned with world axes.
    pub fn world_xy() -> Self {
        Plane {
            origin: Point3::origin(),
            x_axis: Vector3::x(),
            y_axis: Vector3::y(),
            z_axis: Vector3::z(),
        }
    }

    /// Plane from origin and normal. Only the normal (Z axis) carries a meaning, the
    /// X axis is chosen deterministically perpendicular to it.
    pub fn from_normal(origin: Point3<f64>, normal: Vector3<f64>) -> Self {
        let z_axis = normal.normalize();
        let helper = if z_axis.z.abs() > 0.9 { Vector3::y() } else { Vector3::z() };
        let x_axis = helper.cross(&z_axis).normalize();
        let y_axis = z_axis.cross(&x_axis);
        Plane { origin, x_axis, y_axis, z_axis }
    }

    /// All components finite, axes unit length and mutually orthogonal, right handed.
    pub fn is_valid(&self) -> bool {
        let finite = self.origin.coords.iter().all(|c| c.is_finite())
            && [self.x_axis, self.y_axis, self.z_axis]
                .iter()
                .all(|axis| axis.iter().all(|c| c.is_finite()));
        if !finite {
            return false;
        }
        let unit = [self.x_axis, self.y_axis, self.z_axis]
            .iter()
            .all(|axis| (axis.norm() - 1.0).abs() < ORTHONORMAL_TOLERANCE);
        let orthogonal = self.x_axis.dot(&self.y_axis).abs() < ORTHONORMAL_TOLERANCE
            && self.x_axis.dot(&self.z_axis).abs() < ORTHONORMAL_TOLERANCE
            && self.y_axis.dot(&self.z_axis).abs() < ORTHONORMAL_TOLERANCE;
        let right_handed = (self.x_axis.cross(&self.y_axis) - self.z_axis).norm() < ORTHONORMAL_TOLERANCE;
        unit && orthogonal && right_handed
    }

    /// The pose that maps plane local coordinates into the parent coordinates.
    pub fn to_pose(&self) -> Pose {
        let matrix = Matrix3::from_columns(&[self.x_axis, self.y_axis, self.z_axis]);
        let rotation = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(matrix));
        Pose::from_parts(Translation3::from(self.origin.coords), rotation)
    }

    pub fn from_pose(pose: &Pose) -> Self {
        Plane {
            origin: Point3::from(pose.translation.vector),
            x_axis: pose.rotation * Vector3::x(),
            y_axis: pose.rotation * Vector3::y(),
            z_axis: pose.rotation * Vector3::z(),
        }
    }

    /// Applies the transform to the plane (origin and axes).
    pub fn transform(&self, transform: &Pose) -> Plane {
        Plane {
            origin: transform.transform_point(&self.origin),
            x_axis: transform.transform_vector(&self.x_axis),
            y_axis: transform.transform_vector(&self.y_axis),
            z_axis: transform.transform_vector(&self.z_axis),
        }
    }

    pub fn translate(&self, offset: &Vector3<f64>) -> Plane {
        Plane { origin: self.origin + offset, ..*self }
    }

    /// Rotates the plane by `angle` radians about the line through `center` along `axis`.
    pub fn rotate(&self, angle: f64, axis: &Unit<Vector3<f64>>, center: &Point3<f64>) -> Plane {
        self.transform(&rotation_about_line(angle, axis, center))
    }

    /// Expresses a plane given in the local coordinates of this plane in the parent
    /// coordinates of this plane.
    pub fn compose(&self, local: &Plane) -> Plane {
        local.transform(&self.to_pose())
    }

    /// Expresses this plane (given in parent coordinates) in the local coordinates of
    /// `frame`. Inverse of [`compose`](Plane::compose).
    pub fn relative_to(&self, frame: &Plane) -> Plane {
        self.transform(&frame.to_pose().inverse())
    }

    pub fn point_at(&self, u: f64, v: f64, w: f64) -> Point3<f64> {
        self.origin + self.x_axis * u + self.y_axis * v + self.z_axis * w
    }

    /// Interpolates origin and the raw X and Y axis vectors, then rebuilds the plane.
    /// The axes are not interpolated on the rotation manifold, the intermediate orientation
    /// is only approximately uniform for large rotations.
    pub fn lerp(&self, other: &Plane, t: f64) -> Plane {
        let origin = self.origin + (other.origin - self.origin) * t;
        let x_axis = self.x_axis.lerp(&other.x_axis, t);
        let y_axis = self.y_axis.lerp(&other.y_axis, t);
        Plane::new(origin, x_axis, y_axis)
    }

    /// Distance between the origins and rotation angle (radians) between the two planes.
    pub fn difference(&self, other: &Plane) -> (f64, f64) {
        let a = self.to_pose();
        let b = other.to_pose();
        let distance = (a.translation.vector - b.translation.vector).norm();
        (distance, a.rotation.angle_to(&b.rotation))
    }

    pub fn approx_eq(&self, other: &Plane, distance_tolerance: f64, angular_tolerance: f64) -> bool {
        let (distance, angle) = self.difference(other);
        distance <= distance_tolerance && angle <= angular_tolerance
    }
}

impl Default for Plane {
    fn default() -> Self {
        Plane::world_xy()
    }
}

/// Rotation by `angle` radians about the line through `center` along `axis`.
pub fn rotation_about_line(angle: f64, axis: &Unit<Vector3<f64>>, center: &Point3<f64>) -> Pose {
    let rotation = UnitQuaternion::from_axis_angle(axis, angle);
    let translation = center.coords - rotation * center.coords;
    Pose::from_parts(Translation3::from(translation), rotation)
}
