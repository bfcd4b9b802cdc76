//! Forward kinematics of the complete robot: external axes, base, arm and tool.

use std::sync::Arc;

use tracing::warn;

use crate::error::{AxisKind, KinematicsError};
use crate::external_axis::ExternalAxis;
use crate::kinematic_traits::{JointValues, Joints, Kinematics};
use crate::kinematics_impl::ArmKinematics;
use crate::plane::Plane;
use crate::robot::RobotModel;
use crate::tool::{Base, MountedTool, Tool};

/// Posed robot for one set of axis values. Axis values outside their limits are posed
/// anyway; the flags and messages tell which ones.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardKinematicsResult {
    pub internal_axis_values: JointValues,
    pub external_axis_values: Vec<f64>,
    /// Axis frames, world coordinates.
    pub posed_internal_axis_planes: [Plane; 6],
    /// Attachment planes of the external axes, world coordinates.
    pub posed_external_axis_planes: Vec<Plane>,
    /// Base plane after the linear external axis moved it.
    pub base_plane: Plane,
    pub tcp_plane: Plane,
    pub internal_axis_in_limits: [bool; 6],
    pub external_axis_in_limits: Vec<bool>,
    pub error_text: Vec<String>,
}

impl ForwardKinematicsResult {
    pub fn in_limits(&self) -> bool {
        self.internal_axis_in_limits.iter().all(|&ok| ok) && self.external_axis_in_limits.iter().all(|&ok| ok)
    }
}

pub struct ForwardKinematics<'a> {
    robot: &'a RobotModel,
    arm: Arc<ArmKinematics>,
}

impl<'a> ForwardKinematics<'a> {
    pub fn new(robot: &'a RobotModel) -> Self {
        ForwardKinematics { robot, arm: ArmKinematics::shared(robot) }
    }

    /// Shares the arm with an inverse kinematics object built for the same robot.
    pub(crate) fn with_arm(robot: &'a RobotModel, arm: Arc<ArmKinematics>) -> Self {
        ForwardKinematics { robot, arm }
    }

    pub fn robot(&self) -> &RobotModel {
        self.robot
    }

    /// Poses the robot with its attached tool. `external` holds one value per external
    /// axis of the robot, in list order; missing values are taken as zero.
    pub fn calculate(&self, internal: &Joints, external: &[f64]) -> ForwardKinematicsResult {
        self.calculate_with_tool(internal, external, &self.robot.tool)
    }

    pub fn calculate_with_tool(&self, internal: &Joints, external: &[f64], tool: &Tool) -> ForwardKinematicsResult {
        let robot = self.robot;
        let mut error_text = Vec::new();

        if external.len() != robot.external_axes.len() {
            error_text.push(
                KinematicsError::InvalidInput(format!(
                    "{} external axis values given for {} external axes",
                    external.len(),
                    robot.external_axes.len()
                ))
                .to_string(),
            );
        }
        let external_axis_values: Vec<f64> = (0..robot.external_axes.len())
            .map(|i| external.get(i).copied().unwrap_or(0.0))
            .collect();

        let mut posed_external_axis_planes = Vec::with_capacity(external_axis_values.len());
        let mut external_axis_in_limits = Vec::with_capacity(external_axis_values.len());
        for (i, (axis, value)) in robot.external_axes.iter().zip(&external_axis_values).enumerate() {
            let (plane, in_limits) = axis.pose(*value);
            posed_external_axis_planes.push(plane);
            external_axis_in_limits.push(in_limits);
            if !in_limits {
                error_text.push(KinematicsError::limit_violation(AxisKind::External, i).to_string());
            }
        }

        let base_plane = posed_base_plane(robot, &external_axis_values, &mut error_text);

        let internal_axis_values = JointValues::from_degrees(*internal);
        let internal_axis_in_limits = robot.internal_axis_limits.in_limits(internal);
        error_text.extend(robot.internal_axis_limits.violations(internal).iter().map(|e| e.to_string()));

        let based = Base { robot: self.arm.clone(), base: base_plane.to_pose() };
        let posed_internal_axis_planes = based.forward_with_joint_poses(internal).map(|pose| Plane::from_pose(&pose));
        let tcp = MountedTool { robot: Arc::new(based), tool: tool.transform() }.forward(internal);

        if !error_text.is_empty() {
            warn!("Robot '{}': {}", robot.name, error_text.join(" "));
        }

        ForwardKinematicsResult {
            internal_axis_values,
            external_axis_values,
            posed_internal_axis_planes,
            posed_external_axis_planes,
            base_plane,
            tcp_plane: Plane::from_pose(&tcp),
            internal_axis_in_limits,
            external_axis_in_limits,
            error_text,
        }
    }
}

/// Base plane moved by the linear external axis. Only the first linear axis moves the
/// base; rotational axes move work objects, never the robot.
pub(crate) fn posed_base_plane(robot: &RobotModel, external: &[f64], error_text: &mut Vec<String>) -> Plane {
    if let Err(error) = robot.linear_axis() {
        error_text.push(error.to_string());
    }
    robot
        .external_axes
        .iter()
        .zip(external)
        .find_map(|(axis, value)| match axis {
            ExternalAxis::Linear(linear) => Some(robot.base_plane.transform(&linear.transform(*value))),
            ExternalAxis::Rotational(_) => None,
        })
        .unwrap_or(robot.base_plane)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::AxisLimits;
    use crate::external_axis::ExternalLinearAxis;
    use nalgebra::{Point3, Vector3};

    #[test]
    fn test_in_limits_flags() {
        let robot = RobotModel::irb2600_12_165();
        let fk = ForwardKinematics::new(&robot);
        let result = fk.calculate(&[0.0, 10.0, -20.0, 30.0, 40.0, 50.0], &[]);
        assert!(result.in_limits());
        assert!(result.error_text.is_empty());

        let result = fk.calculate(&[0.0, 160.0, -20.0, 30.0, 40.0, 50.0], &[]);
        assert_eq!(result.internal_axis_in_limits, [true, false, true, true, true, true]);
        assert_eq!(result.error_text, vec!["Internal Axis Value 2 is not in Range.".to_string()]);
        assert!(result.tcp_plane.is_valid());
    }

    #[test]
    fn test_home_tcp() {
        let robot = RobotModel::irb1600_6_145();
        let result = ForwardKinematics::new(&robot).calculate(&[0.0; 6], &[]);
        assert!((result.tcp_plane.origin - Point3::new(815.0, 0.0, 1186.5)).norm() < 1e-9);
        assert!((result.tcp_plane.z_axis - Vector3::x()).norm() < 1e-9);
        assert!((result.posed_internal_axis_planes[4].origin - Point3::new(750.0, 0.0, 1186.5)).norm() < 1e-9);
    }

    #[test]
    fn test_linear_axis_moves_base() {
        let track = ExternalLinearAxis::along("track", Plane::world_xy(), Vector3::y(),
                                              AxisLimits::new(0.0, 1000.0).expect("valid limits"));
        let robot = RobotModel::irb2600_12_165().with_external_axis(track.into());
        let fk = ForwardKinematics::new(&robot);
        let at_zero = fk.calculate(&[0.0; 6], &[0.0]);
        let moved = fk.calculate(&[0.0; 6], &[1500.0]);

        assert_eq!(moved.external_axis_in_limits, vec![false]);
        assert_eq!(moved.error_text, vec!["External Axis Value 1 is not in Range.".to_string()]);
        assert!((moved.base_plane.origin - Point3::new(0.0, 1500.0, 0.0)).norm() < 1e-9);
        assert!((moved.tcp_plane.origin - at_zero.tcp_plane.origin - Vector3::new(0.0, 1500.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn test_missing_external_values() {
        let track = ExternalLinearAxis::along("track", Plane::world_xy(), Vector3::x(),
                                              AxisLimits::new(0.0, 1000.0).expect("valid limits"));
        let robot = RobotModel::irb2600_12_165().with_external_axis(track.into());
        let result = ForwardKinematics::new(&robot).calculate(&[0.0; 6], &[]);
        assert_eq!(result.external_axis_values, vec![0.0]);
        assert_eq!(result.error_text.len(), 1);
    }
}
