//! Inverse kinematics of the complete robot: resolves the movement's target through its
//! work object and tool, places the base on the linear external axis and solves the arm.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{AxisKind, KinematicsError};
use crate::external_axis::ExternalLinearAxis;
use crate::forward_kinematics::{ForwardKinematics, posed_base_plane};
use crate::kinematic_traits::{EXTERNAL_AXIS_SLOTS, Joints, Kinematics, Solution, Solutions};
use crate::kinematics_impl::ArmKinematics;
use crate::plane::Plane;
use crate::robot::RobotModel;
use crate::target::{Movement, Target, WorkObject, is_unconstrained};
use crate::tool::{Base, MountedTool, Tool};

#[derive(Debug, Clone, PartialEq)]
pub struct InverseKinematicsResult {
    /// All eight candidates, index `4 * back + 2 * elbow + wrist_flip`.
    pub solutions: Solutions,
    /// The candidate picked by the target's axis configuration (or the joint target's own
    /// values), or why there is none.
    pub internal_axis_values: Solution,
    /// One value per external axis of the robot, in list order.
    pub external_axis_values: Vec<f64>,
    /// Target TCP in world coordinates.
    pub target_plane: Plane,
    /// Base plane after the linear external axis moved it.
    pub base_plane: Plane,
    /// The tool the target was solved for.
    pub tool: Tool,
    pub internal_axis_in_limits: [bool; 6],
    pub external_axis_in_limits: Vec<bool>,
    pub error_text: Vec<String>,
}

impl InverseKinematicsResult {
    pub fn solutions(&self) -> &Solutions {
        &self.solutions
    }

    pub fn joints(&self) -> Option<&Joints> {
        self.internal_axis_values.as_ref().ok()
    }

    /// A solution exists and all axes are within limits.
    pub fn is_valid(&self) -> bool {
        self.internal_axis_values.is_ok()
            && self.internal_axis_in_limits.iter().all(|&ok| ok)
            && self.external_axis_in_limits.iter().all(|&ok| ok)
    }
}

pub struct InverseKinematics<'a> {
    robot: &'a RobotModel,
    arm: Arc<ArmKinematics>,
}

impl<'a> InverseKinematics<'a> {
    pub fn new(robot: &'a RobotModel) -> Self {
        InverseKinematics { robot, arm: ArmKinematics::shared(robot) }
    }

    pub fn robot(&self) -> &RobotModel {
        self.robot
    }

    /// Forward kinematics for the same robot, sharing the arm.
    pub fn forward(&self) -> ForwardKinematics<'a> {
        ForwardKinematics::with_arm(self.robot, self.arm.clone())
    }

    /// Solves the movement with the robot's attached tool, unless the movement overrides it.
    pub fn calculate(&self, movement: &Movement) -> InverseKinematicsResult {
        self.calculate_with_tool(movement, &self.robot.tool)
    }

    /// Solves the movement with `mounted_tool` as the currently attached tool. A valid
    /// tool override of the movement still wins.
    pub fn calculate_with_tool(&self, movement: &Movement, mounted_tool: &Tool) -> InverseKinematicsResult {
        let robot = self.robot;
        let mut error_text = Vec::new();

        let tool = match (&movement.tool, movement.valid_tool()) {
            (_, Some(tool)) => tool.clone(),
            (Some(invalid), None) => {
                error_text.push(format!(
                    "Tool '{}' of target '{}' is not valid, using '{}'.",
                    invalid.name(),
                    movement.target.name(),
                    mounted_tool.name()
                ));
                mounted_tool.clone()
            }
            (None, None) => mounted_tool.clone(),
        };

        if let Err(error) = movement.target.validate() {
            return self.failed(error, tool, error_text);
        }
        if !movement.work_object.is_valid() {
            let error = KinematicsError::InvalidInput(format!(
                "work object '{}' is not valid", movement.work_object.name
            ));
            return self.failed(error, tool, error_text);
        }
        let linear_axis = match robot.linear_axis() {
            Ok(linear_axis) => linear_axis,
            Err(error) => return self.failed(error, tool, error_text),
        };

        let requested = movement.target.external_axis_values();
        let positioner = self.positioner_value(&movement.work_object, requested);

        let (target_plane, external_axis_values, base_plane, solutions, selected) = match &movement.target {
            Target::Robot(target) => {
                let target_plane = target.plane.transform(&movement.work_object.global_transform(positioner));
                let external = self.external_values(requested, linear_axis, Some(&target_plane));
                let base_plane = posed_base_plane(robot, &external, &mut Vec::new());
                let solutions = self.solve(&base_plane, &tool, &target_plane);
                let selected = solutions[target.axis_config].clone();
                (target_plane, external, base_plane, solutions, selected)
            }
            Target::Joint(target) => {
                let external = self.external_values(requested, linear_axis, None);
                let joints = target.internal_axis_values;
                let posed = self.forward().calculate_with_tool(&joints, &external, &tool);
                let solutions = self.solve(&posed.base_plane, &tool, &posed.tcp_plane);
                (posed.tcp_plane, external, posed.base_plane, solutions, Ok(joints))
            }
        };

        let internal_axis_in_limits = match &selected {
            Ok(joints) => {
                error_text.extend(robot.internal_axis_limits.violations(joints).iter().map(|e| e.to_string()));
                robot.internal_axis_limits.in_limits(joints)
            }
            Err(error) => {
                error_text.push(format!("Target '{}': {}", movement.target.name(), error));
                [false; 6]
            }
        };

        let external_axis_in_limits: Vec<bool> = robot
            .external_axes
            .iter()
            .zip(&external_axis_values)
            .map(|(axis, value)| axis.axis_limits().includes(*value))
            .collect();
        for (i, in_limits) in external_axis_in_limits.iter().enumerate() {
            if !in_limits {
                error_text.push(KinematicsError::limit_violation(AxisKind::External, i).to_string());
            }
        }

        if !error_text.is_empty() {
            warn!("Robot '{}': {}", robot.name, error_text.join(" "));
        }

        InverseKinematicsResult {
            solutions,
            internal_axis_values: selected,
            external_axis_values,
            target_plane,
            base_plane,
            tool,
            internal_axis_in_limits,
            external_axis_in_limits,
            error_text,
        }
    }

    fn solve(&self, base_plane: &Plane, tool: &Tool, target_plane: &Plane) -> Solutions {
        let mounted = MountedTool { robot: self.arm.clone(), tool: tool.transform() };
        let based = Base { robot: Arc::new(mounted), base: base_plane.to_pose() };
        based.inverse(&target_plane.to_pose())
    }

    /// Value of the external axis that moves the work object, zero if there is none or
    /// the target leaves it unconstrained.
    fn positioner_value(&self, work_object: &WorkObject, requested: &[f64; EXTERNAL_AXIS_SLOTS]) -> f64 {
        if !work_object.is_moving() {
            return 0.0;
        }
        work_object
            .external_axis
            .as_ref()
            .and_then(|axis| self.robot.slot_of(axis))
            .and_then(|slot| requested.get(slot).copied())
            .filter(|value| !is_unconstrained(*value))
            .unwrap_or(0.0)
    }

    /// Values of the robot's external axes. The linear axis, if unconstrained, places the
    /// base as close to the target as its limits allow; other unconstrained axes stay at
    /// zero.
    fn external_values(
        &self,
        requested: &[f64; EXTERNAL_AXIS_SLOTS],
        linear_axis: Option<(usize, &ExternalLinearAxis)>,
        target_plane: Option<&Plane>,
    ) -> Vec<f64> {
        (0..self.robot.external_axes.len())
            .map(|index| {
                let value = requested.get(self.robot.logical_slot(index)).copied().unwrap_or(0.0);
                if !is_unconstrained(value) {
                    return value;
                }
                match (linear_axis, target_plane) {
                    (Some((linear_index, axis)), Some(target)) if linear_index == index => {
                        let value = closest_base_value(axis, &self.robot.base_plane, target);
                        debug!("Linear axis '{}' placed at {:.3} for the target", self.robot.external_axes[index].name(), value);
                        value
                    }
                    _ => 0.0,
                }
            })
            .collect()
    }
}

/// Axis value that brings the base plane closest to the target origin, within limits.
fn closest_base_value(axis: &ExternalLinearAxis, base_plane: &Plane, target: &Plane) -> f64 {
    axis.closest_value(&target.origin) - axis.parameter_of(&base_plane.origin)
}

impl InverseKinematics<'_> {
    fn failed(&self, error: KinematicsError, tool: Tool, mut error_text: Vec<String>) -> InverseKinematicsResult {
        warn!("Robot '{}': {}", self.robot.name, error);
        error_text.push(error.to_string());
        let external = self.robot.external_axes.len();
        InverseKinematicsResult {
            solutions: std::array::from_fn(|_| Err(error.clone())),
            internal_axis_values: Err(error),
            external_axis_values: vec![0.0; external],
            target_plane: Plane::world_xy(),
            base_plane: self.robot.base_plane,
            tool,
            internal_axis_in_limits: [false; 6],
            external_axis_in_limits: vec![false; external],
            error_text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::AxisLimits;
    use crate::target::{JointTarget, RobotTarget};
    use crate::utils::assert_plane_eq;
    use nalgebra::{Point3, Vector3};

    fn down_facing(origin: Point3<f64>) -> Plane {
        // Tool Z pointing down, as usual for picking from a table.
        Plane::new(origin, Vector3::x(), -Vector3::y())
    }

    #[test]
    fn test_selected_candidate_reaches_target() {
        let robot = RobotModel::irb2600_12_165();
        let ik = InverseKinematics::new(&robot);
        let target = RobotTarget::new("p10", down_facing(Point3::new(900.0, 200.0, 500.0)), 0);
        let result = ik.calculate(&Movement::new(target.clone()));
        let joints = result.joints().expect("reachable");
        assert!(result.is_valid(), "{:?}", result.error_text);

        let fk = ik.forward().calculate(joints, &[]);
        assert_plane_eq(&fk.tcp_plane, &target.plane, 1e-6, 1e-6);
    }

    #[test]
    fn test_tool_override() {
        let robot = RobotModel::irb2600_12_165();
        let ik = InverseKinematics::new(&robot);
        let stick = Tool::new("stick", Plane::world_xy(), Plane::world_xy().translate(&Vector3::new(0.0, 0.0, 250.0)));
        let target = RobotTarget::new("p10", down_facing(Point3::new(900.0, 0.0, 300.0)), 0);
        let movement = Movement::new(target.clone()).with_tool(stick.clone());
        let result = ik.calculate(&movement);
        assert_eq!(result.tool.name(), "stick");

        let fk = ik.forward().calculate_with_tool(result.joints().expect("reachable"), &[], &stick);
        assert_plane_eq(&fk.tcp_plane, &target.plane, 1e-6, 1e-6);
    }

    #[test]
    fn test_joint_target_resolves_without_selection() {
        let robot = RobotModel::irb1600_6_145();
        let ik = InverseKinematics::new(&robot);
        let joints = [15.0, -10.0, 20.0, 5.0, 30.0, -45.0];
        let result = ik.calculate(&Movement::new(JointTarget::new("home", joints)));
        assert_eq!(result.joints(), Some(&joints));
        let expected = ik.forward().calculate(&joints, &[]).tcp_plane;
        assert_plane_eq(&result.target_plane, &expected, 1e-9, 1e-9);
        assert!(result.solutions().iter().all(|s| s.is_ok()));
    }

    #[test]
    fn test_unconstrained_linear_axis_follows_target() {
        let track = ExternalLinearAxis::along("track", Plane::world_xy(), Vector3::y(),
                                              AxisLimits::new(-500.0, 3000.0).expect("valid limits"));
        let robot = RobotModel::irb2600_12_165().with_external_axis(track.into());
        let ik = InverseKinematics::new(&robot);

        let target = RobotTarget::new("far", down_facing(Point3::new(900.0, 2000.0, 500.0)), 0);
        let result = ik.calculate(&Movement::new(target.clone()));
        assert!((result.external_axis_values[0] - 2000.0).abs() < 1e-9);
        assert!((result.base_plane.origin - Point3::new(0.0, 2000.0, 0.0)).norm() < 1e-9);

        let fk = ik.forward().calculate(result.joints().expect("reachable"), &result.external_axis_values);
        assert_plane_eq(&fk.tcp_plane, &target.plane, 1e-6, 1e-6);

        // Explicit value wins.
        let result = ik.calculate(&Movement::new(target.with_external_axis_value(0, 1800.0)));
        assert_eq!(result.external_axis_values, vec![1800.0]);
    }

    #[test]
    fn test_two_linear_axes_unsupported() {
        let limits = AxisLimits::new(0.0, 1000.0).expect("valid limits");
        let robot = RobotModel::irb2600_12_165()
            .with_external_axis(ExternalLinearAxis::along("x track", Plane::world_xy(), Vector3::x(), limits).into())
            .with_external_axis(ExternalLinearAxis::along("y track", Plane::world_xy(), Vector3::y(), limits).into());
        let result = InverseKinematics::new(&robot)
            .calculate(&Movement::new(RobotTarget::new("p", down_facing(Point3::new(900.0, 0.0, 500.0)), 0)));
        assert!(matches!(result.internal_axis_values, Err(KinematicsError::UnsupportedConfiguration(_))));
        assert_eq!(result.external_axis_values.len(), 2);
    }

    #[test]
    fn test_unreachable_target_reported() {
        let robot = RobotModel::irb1600_6_145();
        let target = RobotTarget::new("moon", down_facing(Point3::new(5000.0, 0.0, 500.0)), 3);
        let result = InverseKinematics::new(&robot).calculate(&Movement::new(target));
        assert!(matches!(result.internal_axis_values, Err(KinematicsError::Unreachable(_))));
        assert!(!result.is_valid());
        assert!(result.error_text.iter().any(|t| t.contains("moon")));
    }
}
