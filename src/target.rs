//! Motion targets and the movements and actions built from them.

use crate::error::KinematicsError;
use crate::external_axis::ExternalAxis;
use crate::kinematic_traits::{EXTERNAL_AXIS_SLOTS, Joints, Pose, SOLUTION_COUNT};
use crate::plane::Plane;
use crate::tool::Tool;

/// External axis value meaning "not given, solve automatically".
pub const UNCONSTRAINED: f64 = 9e9;

pub fn is_unconstrained(value: f64) -> bool {
    !value.is_finite() || value.abs() >= UNCONSTRAINED
}

/// Coordinate system the targets are given in. The user frame is placed in the world and
/// the object frame in the user frame. A work object that is not fixed is moved by its
/// external axis (for instance, lies on a turntable).
#[derive(Debug, Clone, PartialEq)]
pub struct WorkObject {
    pub name: String,
    pub user_frame: Plane,
    pub object_frame: Plane,
    pub external_axis: Option<ExternalAxis>,
    /// The robot holds the work object (stationary tool setups). Carried as data.
    pub robot_hold: bool,
    pub fixed_frame: bool,
}

impl WorkObject {
    pub fn new(name: &str, user_frame: Plane, object_frame: Plane) -> Self {
        WorkObject {
            name: name.to_string(),
            user_frame,
            object_frame,
            external_axis: None,
            robot_hold: false,
            fixed_frame: true,
        }
    }

    /// The world itself (wobj0).
    pub fn default_work_object() -> Self {
        Self::new("wobj0", Plane::world_xy(), Plane::world_xy())
    }

    /// Binds the work object to an external axis that moves it.
    pub fn with_external_axis(&self, axis: ExternalAxis) -> Self {
        WorkObject { external_axis: Some(axis), fixed_frame: false, ..self.clone() }
    }

    pub fn with_robot_hold(&self, robot_hold: bool) -> Self {
        WorkObject { robot_hold, ..self.clone() }
    }

    /// Object frame in world coordinates, with the external axis at zero.
    pub fn global_plane(&self) -> Plane {
        self.user_frame.compose(&self.object_frame)
    }

    /// Transform from work object coordinates into world coordinates, with the external
    /// axis (if the work object is moved by one) at `axis_value`.
    pub fn global_transform(&self, axis_value: f64) -> Pose {
        let fixed = self.user_frame.to_pose() * self.object_frame.to_pose();
        match &self.external_axis {
            Some(axis) if !self.fixed_frame => axis.transform(axis_value) * fixed,
            _ => fixed,
        }
    }

    pub fn is_moving(&self) -> bool {
        !self.fixed_frame && self.external_axis.is_some()
    }

    pub fn is_valid(&self) -> bool {
        !self.name.is_empty()
            && self.user_frame.is_valid()
            && self.object_frame.is_valid()
            && self.external_axis.as_ref().is_none_or(|axis| axis.is_valid())
    }
}

impl Default for WorkObject {
    fn default() -> Self {
        Self::default_work_object()
    }
}

/// Cartesian target. The plane is the TCP in work object coordinates, the axis
/// configuration picks one of the eight inverse kinematics candidates.
#[derive(Debug, Clone, PartialEq)]
pub struct RobotTarget {
    pub name: String,
    pub plane: Plane,
    pub axis_config: usize,
    /// Values for the logical external axes A to F, [`UNCONSTRAINED`] if not given.
    pub external_axis_values: [f64; EXTERNAL_AXIS_SLOTS],
}

impl RobotTarget {
    pub fn new(name: &str, plane: Plane, axis_config: usize) -> Self {
        RobotTarget {
            name: name.to_string(),
            plane,
            axis_config,
            external_axis_values: [UNCONSTRAINED; EXTERNAL_AXIS_SLOTS],
        }
    }

    pub fn with_axis_config(&self, axis_config: usize) -> Self {
        RobotTarget { axis_config, ..self.clone() }
    }

    /// Sets the value of the logical external axis `slot` (0 for A).
    pub fn with_external_axis_value(&self, slot: usize, value: f64) -> Self {
        let mut target = self.clone();
        if let Some(v) = target.external_axis_values.get_mut(slot) {
            *v = value;
        }
        target
    }

    pub fn validate(&self) -> Result<(), KinematicsError> {
        if self.axis_config >= SOLUTION_COUNT {
            return Err(KinematicsError::InvalidInput(format!(
                "axis configuration {} of target '{}' is not in 0..{}",
                self.axis_config, self.name, SOLUTION_COUNT
            )));
        }
        if !self.plane.is_valid() {
            return Err(KinematicsError::InvalidInput(format!("plane of target '{}' is not valid", self.name)));
        }
        Ok(())
    }
}

/// Target given directly by the axis values, reached without inverse kinematics.
#[derive(Debug, Clone, PartialEq)]
pub struct JointTarget {
    pub name: String,
    pub internal_axis_values: Joints,
    /// Values for the logical external axes A to F, [`UNCONSTRAINED`] (taken as zero) if
    /// not given.
    pub external_axis_values: [f64; EXTERNAL_AXIS_SLOTS],
}

impl JointTarget {
    pub fn new(name: &str, internal_axis_values: Joints) -> Self {
        JointTarget {
            name: name.to_string(),
            internal_axis_values,
            external_axis_values: [UNCONSTRAINED; EXTERNAL_AXIS_SLOTS],
        }
    }

    pub fn with_external_axis_value(&self, slot: usize, value: f64) -> Self {
        let mut target = self.clone();
        if let Some(v) = target.external_axis_values.get_mut(slot) {
            *v = value;
        }
        target
    }

    pub fn validate(&self) -> Result<(), KinematicsError> {
        if self.internal_axis_values.iter().all(|q| q.is_finite()) {
            Ok(())
        } else {
            Err(KinematicsError::InvalidInput(format!("target '{}' has non-finite axis values", self.name)))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Robot(RobotTarget),
    Joint(JointTarget),
}

impl Target {
    pub fn name(&self) -> &str {
        match self {
            Target::Robot(target) => &target.name,
            Target::Joint(target) => &target.name,
        }
    }

    pub fn external_axis_values(&self) -> &[f64; EXTERNAL_AXIS_SLOTS] {
        match self {
            Target::Robot(target) => &target.external_axis_values,
            Target::Joint(target) => &target.external_axis_values,
        }
    }

    pub fn validate(&self) -> Result<(), KinematicsError> {
        match self {
            Target::Robot(target) => target.validate(),
            Target::Joint(target) => target.validate(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

impl From<RobotTarget> for Target {
    fn from(target: RobotTarget) -> Self {
        Target::Robot(target)
    }
}

impl From<JointTarget> for Target {
    fn from(target: JointTarget) -> Self {
        Target::Joint(target)
    }
}

/// How the path into a movement's target is interpolated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Joint,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotionType {
    #[default]
    Joint,
    Linear,
    /// Joint motion, passing the target within a fly-by zone.
    JointZone,
    /// Linear motion, passing the target within a fly-by zone.
    LinearZone,
}

impl MotionType {
    pub fn interpolation(&self) -> Interpolation {
        match self {
            MotionType::Joint | MotionType::JointZone => Interpolation::Joint,
            MotionType::Linear | MotionType::LinearZone => Interpolation::Linear,
        }
    }
}

/// A target with the work object it is given in, an optional tool override and the
/// motion type.
#[derive(Debug, Clone, PartialEq)]
pub struct Movement {
    pub target: Target,
    pub work_object: WorkObject,
    pub tool: Option<Tool>,
    pub motion_type: MotionType,
}

impl Movement {
    pub fn new(target: impl Into<Target>) -> Self {
        Movement {
            target: target.into(),
            work_object: WorkObject::default_work_object(),
            tool: None,
            motion_type: MotionType::Joint,
        }
    }

    pub fn with_work_object(&self, work_object: WorkObject) -> Self {
        Movement { work_object, ..self.clone() }
    }

    pub fn with_tool(&self, tool: Tool) -> Self {
        Movement { tool: Some(tool), ..self.clone() }
    }

    pub fn with_motion_type(&self, motion_type: MotionType) -> Self {
        Movement { motion_type, ..self.clone() }
    }

    /// The tool override, if given and valid.
    pub fn valid_tool(&self) -> Option<&Tool> {
        self.tool.as_ref().filter(|tool| tool.is_valid())
    }

    pub fn is_valid(&self) -> bool {
        self.target.is_valid() && self.work_object.is_valid()
    }
}

/// One step of a robot program, as far as paths are concerned.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Movement(Movement),
    /// Mounts another tool on the robot for the movements that follow.
    OverrideRobotTool(Tool),
}

impl From<Movement> for Action {
    fn from(movement: Movement) -> Self {
        Action::Movement(movement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::AxisLimits;
    use crate::external_axis::ExternalRotationalAxis;
    use nalgebra::{Point3, Vector3};

    #[test]
    fn test_global_plane_composes_frames() {
        let user = Plane::world_xy().translate(&Vector3::new(1000.0, 0.0, 0.0));
        let object = Plane::new(Point3::new(0.0, 200.0, 0.0), Vector3::y(), -Vector3::x());
        let work_object = WorkObject::new("table", user, object);
        let global = work_object.global_plane();
        assert!((global.origin - Point3::new(1000.0, 200.0, 0.0)).norm() < 1e-9);
        assert!((global.x_axis - Vector3::y()).norm() < 1e-9);

        // Fixed work objects ignore the axis value.
        let transform = work_object.global_transform(45.0);
        assert!(Plane::from_pose(&transform).approx_eq(&global, 1e-9, 1e-6));
    }

    #[test]
    fn test_moving_work_object() {
        let turntable = ExternalRotationalAxis::new(
            "turntable",
            Plane::world_xy().translate(&Vector3::new(1000.0, 0.0, 0.0)),
            AxisLimits::symmetric(180.0).expect("valid limits"),
        );
        let work_object = WorkObject::new("part", Plane::world_xy().translate(&Vector3::new(1100.0, 0.0, 500.0)), Plane::world_xy())
            .with_external_axis(turntable.into());
        assert!(work_object.is_moving());
        assert!(work_object.with_robot_hold(true).robot_hold);
        let moved = work_object.global_transform(90.0).transform_point(&Point3::origin());
        assert!((moved - Point3::new(1000.0, 100.0, 500.0)).norm() < 1e-9);
    }

    #[test]
    fn test_target_validation() {
        let target = RobotTarget::new("p10", Plane::world_xy(), 0);
        assert!(target.validate().is_ok());
        assert!(matches!(target.with_axis_config(8).validate(), Err(KinematicsError::InvalidInput(_))));
        assert!(is_unconstrained(target.external_axis_values[0]));
        let target = target.with_external_axis_value(2, 250.0).with_external_axis_value(9, 1.0);
        assert_eq!(target.external_axis_values[2], 250.0);
    }

    #[test]
    fn test_motion_interpolation() {
        assert_eq!(MotionType::Joint.interpolation(), Interpolation::Joint);
        assert_eq!(MotionType::JointZone.interpolation(), Interpolation::Joint);
        assert_eq!(MotionType::Linear.interpolation(), Interpolation::Linear);
        assert_eq!(MotionType::LinearZone.interpolation(), Interpolation::Linear);
    }

    #[test]
    fn test_invalid_tool_override_is_ignored() {
        let broken = Tool::new("broken", Plane::world_xy(), Plane::new(Point3::origin(), Vector3::zeros(), Vector3::y()));
        let movement = Movement::new(RobotTarget::new("p10", Plane::world_xy(), 0)).with_tool(broken);
        assert!(movement.valid_tool().is_none());
        let movement = movement.with_tool(Tool::default_tool());
        assert_eq!(movement.valid_tool().map(|t| t.name()), Some("tool0"));
    }
}
