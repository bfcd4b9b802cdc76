//! External axes: linear tracks that carry the robot and rotational positioners
//! that move work objects.
//!
//! Both variants map a scalar axis value to the pose of their attachment plane.
//! [`pose`](ExternalAxis::pose) poses with the raw value and reports whether it is in
//! limits, [`pose_clamped`](ExternalAxis::pose_clamped) clamps to the nearest limit first.

use nalgebra::{Point3, Translation3, Unit, UnitQuaternion, Vector3};

use crate::constraints::AxisLimits;
use crate::error::KinematicsError;
use crate::geometry::LineSegment;
use crate::kinematic_traits::{EXTERNAL_AXIS_SLOTS, Pose};
use crate::plane::{Plane, rotation_about_line};

/// Linear axis (track). Moves the attachment plane along the Z axis of the axis plane.
/// Values are in millimeters.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalLinearAxis {
    name: String,
    axis_number: Option<usize>,
    attachment_plane: Plane,
    axis_plane: Plane,
    axis_limits: AxisLimits,
    // Derived, rebuilt by reinitialize()
    axis_curve: LineSegment,
}

impl ExternalLinearAxis {
    pub fn new(name: &str, attachment_plane: Plane, axis_plane: Plane, axis_limits: AxisLimits) -> Self {
        let mut axis = ExternalLinearAxis {
            name: name.to_string(),
            axis_number: None,
            attachment_plane,
            axis_plane,
            axis_limits,
            axis_curve: LineSegment::new(attachment_plane.origin, attachment_plane.origin),
        };
        axis.reinitialize();
        axis
    }

    /// Linear axis moving along `direction`, attachment and axis plane sharing the origin.
    pub fn along(name: &str, attachment_plane: Plane, direction: Vector3<f64>, axis_limits: AxisLimits) -> Self {
        let axis_plane = Plane::from_normal(attachment_plane.origin, direction);
        Self::new(name, attachment_plane, axis_plane, axis_limits)
    }

    fn reinitialize(&mut self) {
        let direction = self.direction();
        self.axis_curve = LineSegment::new(
            self.attachment_plane.origin + direction * self.axis_limits.min(),
            self.attachment_plane.origin + direction * self.axis_limits.max(),
        );
    }

    pub fn with_attachment_plane(&self, attachment_plane: Plane) -> Self {
        let mut axis = ExternalLinearAxis { attachment_plane, ..self.clone() };
        axis.reinitialize();
        axis
    }

    pub fn with_axis_plane(&self, axis_plane: Plane) -> Self {
        let mut axis = ExternalLinearAxis { axis_plane, ..self.clone() };
        axis.reinitialize();
        axis
    }

    pub fn with_axis_limits(&self, axis_limits: AxisLimits) -> Self {
        let mut axis = ExternalLinearAxis { axis_limits, ..self.clone() };
        axis.reinitialize();
        axis
    }

    pub fn with_axis_number(&self, axis_number: usize) -> Self {
        ExternalLinearAxis { axis_number: Some(axis_number), ..self.clone() }
    }

    pub fn attachment_plane(&self) -> &Plane {
        &self.attachment_plane
    }

    pub fn axis_plane(&self) -> &Plane {
        &self.axis_plane
    }

    /// Unit direction of motion.
    pub fn direction(&self) -> Vector3<f64> {
        self.axis_plane.z_axis.normalize()
    }

    /// The rail of the axis between its limits.
    pub fn axis_curve(&self) -> &LineSegment {
        &self.axis_curve
    }

    /// Unclamped axis value (signed distance from the attachment origin along the axis)
    /// of the projection of `point` onto the axis line.
    pub fn parameter_of(&self, point: &Point3<f64>) -> f64 {
        (point - self.attachment_plane.origin).dot(&self.direction())
    }

    /// Axis value of the point on the rail closest to `point`, inside the limits.
    pub fn closest_value(&self, point: &Point3<f64>) -> f64 {
        let closest = self.axis_curve.closest_point(point);
        self.parameter_of(&closest)
    }

    pub fn transform(&self, value: f64) -> Pose {
        Pose::from_parts(Translation3::from(self.direction() * value), UnitQuaternion::identity())
    }
}

/// Rotational axis (positioner). Rotates about the Z axis of the axis plane through its
/// origin. Values are in degrees. The attachment plane is the axis plane itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalRotationalAxis {
    name: String,
    axis_number: Option<usize>,
    axis_plane: Plane,
    axis_limits: AxisLimits,
}

impl ExternalRotationalAxis {
    pub fn new(name: &str, axis_plane: Plane, axis_limits: AxisLimits) -> Self {
        ExternalRotationalAxis {
            name: name.to_string(),
            axis_number: None,
            axis_plane,
            axis_limits,
        }
    }

    pub fn with_axis_plane(&self, axis_plane: Plane) -> Self {
        ExternalRotationalAxis { axis_plane, ..self.clone() }
    }

    pub fn with_axis_limits(&self, axis_limits: AxisLimits) -> Self {
        ExternalRotationalAxis { axis_limits, ..self.clone() }
    }

    pub fn with_axis_number(&self, axis_number: usize) -> Self {
        ExternalRotationalAxis { axis_number: Some(axis_number), ..self.clone() }
    }

    pub fn axis_plane(&self) -> &Plane {
        &self.axis_plane
    }

    /// Derived from the axis plane.
    pub fn attachment_plane(&self) -> &Plane {
        &self.axis_plane
    }

    pub fn transform(&self, value: f64) -> Pose {
        let axis = Unit::new_normalize(self.axis_plane.z_axis);
        rotation_about_line(value.to_radians(), &axis, &self.axis_plane.origin)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExternalAxis {
    Linear(ExternalLinearAxis),
    Rotational(ExternalRotationalAxis),
}

impl ExternalAxis {
    pub fn name(&self) -> &str {
        match self {
            ExternalAxis::Linear(axis) => &axis.name,
            ExternalAxis::Rotational(axis) => &axis.name,
        }
    }

    /// Logical axis number (0 for axis A up to 5 for axis F), if assigned explicitly.
    pub fn axis_number(&self) -> Option<usize> {
        match self {
            ExternalAxis::Linear(axis) => axis.axis_number,
            ExternalAxis::Rotational(axis) => axis.axis_number,
        }
    }

    pub fn with_axis_number(&self, axis_number: usize) -> Self {
        match self {
            ExternalAxis::Linear(axis) => ExternalAxis::Linear(axis.with_axis_number(axis_number)),
            ExternalAxis::Rotational(axis) => ExternalAxis::Rotational(axis.with_axis_number(axis_number)),
        }
    }

    pub fn axis_limits(&self) -> &AxisLimits {
        match self {
            ExternalAxis::Linear(axis) => &axis.axis_limits,
            ExternalAxis::Rotational(axis) => &axis.axis_limits,
        }
    }

    pub fn attachment_plane(&self) -> &Plane {
        match self {
            ExternalAxis::Linear(axis) => axis.attachment_plane(),
            ExternalAxis::Rotational(axis) => axis.attachment_plane(),
        }
    }

    pub fn axis_plane(&self) -> &Plane {
        match self {
            ExternalAxis::Linear(axis) => axis.axis_plane(),
            ExternalAxis::Rotational(axis) => axis.axis_plane(),
        }
    }

    pub fn is_linear(&self) -> bool {
        matches!(self, ExternalAxis::Linear(_))
    }

    /// Rigid motion the axis applies at `value`, unclamped.
    pub fn transform(&self, value: f64) -> Pose {
        match self {
            ExternalAxis::Linear(axis) => axis.transform(value),
            ExternalAxis::Rotational(axis) => axis.transform(value),
        }
    }

    /// Attachment plane posed at `value`, unclamped, with the flag telling if the value
    /// is within the axis limits.
    pub fn pose(&self, value: f64) -> (Plane, bool) {
        let plane = self.attachment_plane().transform(&self.transform(value));
        (plane, self.axis_limits().includes(value))
    }

    /// Attachment plane posed at `value` clamped to the nearest limit.
    pub fn pose_clamped(&self, value: f64) -> Plane {
        self.pose(self.axis_limits().clamp(value)).0
    }

    pub fn is_valid(&self) -> bool {
        let axis_number_ok = self.axis_number().is_none_or(|n| n < EXTERNAL_AXIS_SLOTS);
        let planes_ok = self.attachment_plane().is_valid() && self.axis_plane().is_valid();
        axis_number_ok && planes_ok && !self.name().is_empty()
    }

    pub(crate) fn validate(&self) -> Result<(), KinematicsError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(KinematicsError::InvalidInput(format!("external axis '{}' is not valid", self.name())))
        }
    }
}

impl From<ExternalLinearAxis> for ExternalAxis {
    fn from(axis: ExternalLinearAxis) -> Self {
        ExternalAxis::Linear(axis)
    }
}

impl From<ExternalRotationalAxis> for ExternalAxis {
    fn from(axis: ExternalRotationalAxis) -> Self {
        ExternalAxis::Rotational(axis)
    }
}
