//! Provides the tool and the base for the robot.
//!
//! [`Tool`] describes the end effector: the plane that mates with the mounting flange of
//! the robot, the tool center point (TCP) plane and the load data. [`MountedTool`] and
//! [`Base`] take an arbitrary implementation of [`Kinematics`] and are such
//! implementations themselves, so they can be cascaded: a base, having the robot, that
//! robot having a tool.
//!
//! ```
//! use std::sync::Arc;
//! use nalgebra::{Point3, Vector3};
//! use robot_kinematics::kinematic_traits::{Joints, Kinematics, Pose};
//! use robot_kinematics::kinematics_impl::ArmKinematics;
//! use robot_kinematics::plane::Plane;
//! use robot_kinematics::robot::RobotModel;
//! use robot_kinematics::tool::{Base, MountedTool, Tool};
//!
//! let robot = RobotModel::irb2600_12_165();
//! let arm = ArmKinematics::new(&robot);
//!
//! // Half meter high pedestal
//! let robot_with_base = Base {
//!     robot: Arc::new(arm),
//!     base: Plane::world_xy().translate(&Vector3::new(0.0, 0.0, 500.0)).to_pose(),
//! };
//!
//! // Tool extends 200 mm along the flange normal
//! let tool = Tool::new("stick", Plane::world_xy(),
//!     Plane::new(Point3::new(0.0, 0.0, 200.0), Vector3::x(), Vector3::y()));
//! let robot_complete = MountedTool {
//!     robot: Arc::new(robot_with_base),
//!     tool: tool.transform(),
//! };
//!
//! let joints: Joints = [0.0, 10.0, 20.0, 30.0, 0.0, 50.0]; // degrees
//! let tcp_pose: Pose = robot_complete.forward(&joints);
//! println!("The stick tip is at: {:?}", tcp_pose.translation);
//! ```

extern crate nalgebra as na;

use std::sync::Arc;

use na::{Point3, UnitQuaternion, Vector3};

use crate::kinematic_traits::{Joints, Kinematics, Pose, Solutions};
use crate::plane::Plane;

/// Mass properties of the tool. Only carried for downstream consumers, the kinematics
/// does not use them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadData {
    /// Mass in kg.
    pub mass: f64,
    /// Center of gravity in the attachment plane, mm.
    pub center_of_gravity: Point3<f64>,
    /// Orientation of the principal axes of inertia.
    pub center_of_gravity_orientation: UnitQuaternion<f64>,
    /// Moments of inertia about the principal axes, kgm².
    pub moments_of_inertia: Vector3<f64>,
}

impl Default for LoadData {
    fn default() -> Self {
        LoadData {
            mass: 0.001,
            center_of_gravity: Point3::new(0.0, 0.0, 0.001),
            center_of_gravity_orientation: UnitQuaternion::identity(),
            moments_of_inertia: Vector3::zeros(),
        }
    }
}

/// End effector. The attachment plane mates with the mounting frame of the robot, the
/// tool plane is the TCP. Both are given in the same (tool design) coordinate system.
#[derive(Debug, Clone, PartialEq)]
pub struct Tool {
    name: String,
    attachment_plane: Plane,
    tool_plane: Plane,
    load: LoadData,
    // Derived, rebuilt by reinitialize()
    tcp_position: Vector3<f64>,
    tcp_orientation: UnitQuaternion<f64>,
}

impl Tool {
    pub fn new(name: &str, attachment_plane: Plane, tool_plane: Plane) -> Self {
        Self::with_load(name, attachment_plane, tool_plane, LoadData::default())
    }

    pub fn with_load(name: &str, attachment_plane: Plane, tool_plane: Plane, load: LoadData) -> Self {
        let mut tool = Tool {
            name: name.to_string(),
            attachment_plane,
            tool_plane,
            load,
            tcp_position: Vector3::zeros(),
            tcp_orientation: UnitQuaternion::identity(),
        };
        tool.reinitialize();
        tool
    }

    /// The flange itself (tool0): TCP at the mounting frame.
    pub fn default_tool() -> Self {
        Self::new("tool0", Plane::world_xy(), Plane::world_xy())
    }

    fn reinitialize(&mut self) {
        let offset = self.transform();
        self.tcp_position = offset.translation.vector;
        self.tcp_orientation = offset.rotation;
    }

    pub fn with_attachment_plane(&self, attachment_plane: Plane) -> Self {
        let mut tool = Tool { attachment_plane, ..self.clone() };
        tool.reinitialize();
        tool
    }

    pub fn with_tool_plane(&self, tool_plane: Plane) -> Self {
        let mut tool = Tool { tool_plane, ..self.clone() };
        tool.reinitialize();
        tool
    }

    pub fn with_name(&self, name: &str) -> Self {
        Tool { name: name.to_string(), ..self.clone() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attachment_plane(&self) -> &Plane {
        &self.attachment_plane
    }

    pub fn tool_plane(&self) -> &Plane {
        &self.tool_plane
    }

    pub fn load(&self) -> &LoadData {
        &self.load
    }

    /// TCP position relative to the attachment plane (mm).
    pub fn tcp_position(&self) -> &Vector3<f64> {
        &self.tcp_position
    }

    /// TCP orientation relative to the attachment plane.
    pub fn tcp_orientation(&self) -> &UnitQuaternion<f64> {
        &self.tcp_orientation
    }

    /// Transformation from the mounting frame to the TCP.
    pub fn transform(&self) -> Pose {
        self.attachment_plane.to_pose().inverse() * self.tool_plane.to_pose()
    }

    pub fn is_valid(&self) -> bool {
        !self.name.is_empty() && self.attachment_plane.is_valid() && self.tool_plane.is_valid()
    }
}

impl Default for Tool {
    fn default() -> Self {
        Self::default_tool()
    }
}

/// Defines the fixed tool that is attached to the mounting flange of the robot.
/// The tool moves with the robot, providing additional translation and, if needed,
/// rotation. The tool itself fully implements the Kinematics, providing both inverse
/// and forward kinematics for the robot with a tool ("pose" being the TCP).
#[derive(Clone)]
pub struct MountedTool {
    pub robot: Arc<dyn Kinematics>, // The robot

    /// Transformation from the mounting flange to the TCP.
    pub tool: Pose,
}

/// Defines the base that holds the robot: the transformation from the world to the robot
/// base. Base itself fully implements the Kinematics, providing both inverse and forward
/// kinematics for the robot on a base.
#[derive(Clone)]
pub struct Base {
    pub robot: Arc<dyn Kinematics>, // The robot

    /// Transformation from the world origin to the robots base.
    pub base: Pose,
}

impl Kinematics for MountedTool {
    fn inverse(&self, tcp: &Pose) -> Solutions {
        self.robot.inverse(&(tcp * self.tool.inverse()))
    }

    fn forward(&self, qs: &Joints) -> Pose {
        self.robot.forward(qs) * self.tool
    }

    fn forward_with_joint_poses(&self, qs: &Joints) -> [Pose; 6] {
        // The tool changes only the TCP, not the axis frames.
        self.robot.forward_with_joint_poses(qs)
    }
}

impl Kinematics for Base {
    fn inverse(&self, tcp: &Pose) -> Solutions {
        self.robot.inverse(&(self.base.inverse() * tcp))
    }

    fn forward(&self, qs: &Joints) -> Pose {
        self.base * self.robot.forward(qs)
    }

    fn forward_with_joint_poses(&self, qs: &Joints) -> [Pose; 6] {
        self.robot.forward_with_joint_poses(qs).map(|pose| self.base * pose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tool_is_identity() {
        let tool = Tool::default_tool();
        assert!(tool.is_valid());
        assert!(tool.tcp_position().norm() < 1e-12);
        assert!(tool.tcp_orientation().angle() < 1e-12);
    }

    #[test]
    fn test_tcp_is_derived_from_planes() {
        // Attachment plane of the tool is rotated and shifted in the tool design space.
        let attachment = Plane::new(Point3::new(10.0, 0.0, 0.0), Vector3::y(), -Vector3::x());
        let tcp = Plane::new(Point3::new(10.0, 0.0, 150.0), Vector3::y(), -Vector3::x());
        let tool = Tool::new("gripper", attachment, tcp);
        assert!((tool.tcp_position() - Vector3::new(0.0, 0.0, 150.0)).norm() < 1e-9);
        assert!(tool.tcp_orientation().angle() < 1e-6);

        // Changing the tool plane recomputes the derived TCP.
        let tilted = tool.with_tool_plane(Plane::new(Point3::new(10.0, 100.0, 150.0), Vector3::y(), -Vector3::x()));
        assert!((tilted.tcp_position() - Vector3::new(100.0, 0.0, 150.0)).norm() < 1e-9);

        // Changing the attachment plane does too.
        let moved = tool.with_attachment_plane(Plane::new(Point3::new(10.0, 0.0, 50.0), Vector3::y(), -Vector3::x()));
        assert!((moved.tcp_position() - Vector3::new(0.0, 0.0, 100.0)).norm() < 1e-9);
    }

    #[test]
    fn test_load_round_trips() {
        let load = LoadData {
            mass: 4.5,
            center_of_gravity: Point3::new(0.0, 10.0, 80.0),
            center_of_gravity_orientation: UnitQuaternion::from_euler_angles(0.1, 0.2, 0.3),
            moments_of_inertia: Vector3::new(0.01, 0.02, 0.03),
        };
        let tool = Tool::with_load("welder", Plane::world_xy(), Plane::world_xy(), load);
        let renamed = tool.with_tool_plane(Plane::world_xy().translate(&Vector3::z())).with_name("torch");
        assert_eq!(renamed.load(), &load);
        assert_eq!(renamed.name(), "torch");
    }

    #[test]
    fn test_invalid_tool() {
        let tool = Tool::new("broken", Plane::world_xy(), Plane::new(Point3::origin(), Vector3::zeros(), Vector3::y()));
        assert!(!tool.is_valid());
        assert!(!Tool::new("", Plane::world_xy(), Plane::world_xy()).is_valid());
    }
}
