//! Static description of the robot: the six internal axes, their limits, where the robot
//! stands, where the tool is mounted and which external axes come with it.

use tracing::warn;

use crate::constraints::JointLimits;
use crate::error::KinematicsError;
use crate::external_axis::{ExternalAxis, ExternalLinearAxis};
use crate::kinematic_traits::EXTERNAL_AXIS_SLOTS;
use crate::plane::Plane;
use crate::tool::Tool;

/// Robot description. Each internal axis plane gives the origin of the axis and, with its
/// Z axis, the positive rotation direction, in robot (base local) coordinates and in the
/// home position where all axis values are zero.
#[derive(Debug, Clone, PartialEq)]
pub struct RobotModel {
    pub name: String,

    /// Axis frames in the home position.
    pub internal_axis_planes: [Plane; 6],

    /// Limits of the internal axes, degrees.
    pub internal_axis_limits: JointLimits,

    /// Placement of the robot in the world.
    pub base_plane: Plane,

    /// Flange frame in the home position, robot coordinates. Its Z axis points out of the
    /// flange.
    pub mounting_frame: Plane,

    /// Currently attached tool.
    pub tool: Tool,

    /// External axes. Unless an axis carries an explicit axis number, its position in
    /// this list is its logical axis number.
    pub external_axes: Vec<ExternalAxis>,
}

impl RobotModel {
    pub fn new(
        name: &str,
        internal_axis_planes: [Plane; 6],
        internal_axis_limits: JointLimits,
        base_plane: Plane,
        mounting_frame: Plane,
        tool: Tool,
        external_axes: Vec<ExternalAxis>,
    ) -> Result<Self, KinematicsError> {
        let robot = RobotModel {
            name: name.to_string(),
            internal_axis_planes,
            internal_axis_limits,
            base_plane,
            mounting_frame,
            tool,
            external_axes,
        };
        robot.validate()?;
        Ok(robot)
    }

    pub fn with_tool(&self, tool: Tool) -> Self {
        RobotModel { tool, ..self.clone() }
    }

    pub fn with_base_plane(&self, base_plane: Plane) -> Self {
        RobotModel { base_plane, ..self.clone() }
    }

    pub fn with_internal_axis_limits(&self, internal_axis_limits: JointLimits) -> Self {
        RobotModel { internal_axis_limits, ..self.clone() }
    }

    pub fn with_external_axes(&self, external_axes: Vec<ExternalAxis>) -> Self {
        RobotModel { external_axes, ..self.clone() }
    }

    /// Adds one more external axis at the end of the list.
    pub fn with_external_axis(&self, axis: ExternalAxis) -> Self {
        let mut external_axes = self.external_axes.clone();
        external_axes.push(axis);
        self.with_external_axes(external_axes)
    }

    /// Logical axis number of the external axis at `index` in the list.
    pub fn logical_slot(&self, index: usize) -> usize {
        self.external_axes
            .get(index)
            .and_then(|axis| axis.axis_number())
            .unwrap_or(index)
    }

    /// For each logical axis slot (A to F), the index of the external axis occupying it.
    pub fn external_axis_slots(&self) -> [Option<usize>; EXTERNAL_AXIS_SLOTS] {
        let mut slots = [None; EXTERNAL_AXIS_SLOTS];
        for index in 0..self.external_axes.len() {
            let slot = self.logical_slot(index);
            if slot < EXTERNAL_AXIS_SLOTS && slots[slot].is_none() {
                slots[slot] = Some(index);
            }
        }
        slots
    }

    /// Logical slot of an external axis that is not necessarily owned by this robot (for
    /// instance, bound to a work object). Explicit axis number first, then the slot of the
    /// robot's axis with the same name.
    pub fn slot_of(&self, axis: &ExternalAxis) -> Option<usize> {
        axis.axis_number().or_else(|| {
            self.external_axes
                .iter()
                .position(|own| own.name() == axis.name())
                .map(|index| self.logical_slot(index))
        })
    }

    /// The linear external axis that carries the robot, with its index in the list.
    /// More than one linear axis is not supported.
    pub fn linear_axis(&self) -> Result<Option<(usize, &ExternalLinearAxis)>, KinematicsError> {
        let mut linear = self
            .external_axes
            .iter()
            .enumerate()
            .filter_map(|(index, axis)| match axis {
                ExternalAxis::Linear(linear) => Some((index, linear)),
                ExternalAxis::Rotational(_) => None,
            });
        let first = linear.next();
        if linear.next().is_some() {
            return Err(KinematicsError::UnsupportedConfiguration(format!(
                "robot '{}' has more than one linear external axis",
                self.name
            )));
        }
        Ok(first)
    }

    /// TCP of the attached tool in the home position, robot coordinates.
    pub fn tcp_plane(&self) -> Plane {
        Plane::from_pose(&(self.mounting_frame.to_pose() * self.tool.transform()))
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn validate(&self) -> Result<(), KinematicsError> {
        if self.name.is_empty() {
            return Err(KinematicsError::InvalidInput("robot name is empty".to_string()));
        }
        if let Some(i) = self.internal_axis_planes.iter().position(|plane| !plane.is_valid()) {
            return Err(KinematicsError::InvalidInput(format!(
                "internal axis plane {} of robot '{}' is not valid", i + 1, self.name
            )));
        }
        if !self.base_plane.is_valid() || !self.mounting_frame.is_valid() {
            return Err(KinematicsError::InvalidInput(format!(
                "base plane or mounting frame of robot '{}' is not valid", self.name
            )));
        }
        if !self.tool.is_valid() {
            return Err(KinematicsError::InvalidInput(format!("tool '{}' is not valid", self.tool.name())));
        }
        if self.external_axes.len() > EXTERNAL_AXIS_SLOTS {
            return Err(KinematicsError::InvalidInput(format!(
                "at most {} external axes are supported, {} given",
                EXTERNAL_AXIS_SLOTS,
                self.external_axes.len()
            )));
        }
        let mut taken = [false; EXTERNAL_AXIS_SLOTS];
        for (index, axis) in self.external_axes.iter().enumerate() {
            axis.validate()?;
            let slot = self.logical_slot(index);
            if slot >= EXTERNAL_AXIS_SLOTS || taken[slot] {
                warn!("External axis '{}' has a duplicate logical axis number {}", axis.name(), slot);
                return Err(KinematicsError::InvalidInput(format!(
                    "external axis '{}' uses logical axis number {} twice", axis.name(), slot
                )));
            }
            taken[slot] = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::AxisLimits;
    use crate::external_axis::ExternalRotationalAxis;
    use nalgebra::{Point3, Vector3};

    fn track(name: &str) -> ExternalAxis {
        let limits = AxisLimits::new(0.0, 3000.0).expect("valid limits");
        ExternalLinearAxis::along(name, Plane::world_xy(), Vector3::y(), limits).into()
    }

    fn positioner(name: &str) -> ExternalAxis {
        let limits = AxisLimits::symmetric(360.0).expect("valid limits");
        ExternalRotationalAxis::new(name, Plane::world_xy().translate(&(Vector3::x() * 1200.0)), limits).into()
    }

    #[test]
    fn test_presets_are_valid() {
        for robot in [
            RobotModel::irb1600_6_145(),
            RobotModel::irb2400_10(),
            RobotModel::irb2600_12_165(),
            RobotModel::irb4600_60_205(),
        ] {
            assert!(robot.is_valid(), "{} is not valid", robot.name);
            assert!(robot.external_axes.is_empty());
        }
    }

    #[test]
    fn test_slots_follow_axis_numbers() {
        let robot = RobotModel::irb2600_12_165()
            .with_external_axis(positioner("turntable").with_axis_number(3))
            .with_external_axis(track("track"));
        assert!(robot.is_valid());
        assert_eq!(robot.logical_slot(0), 3);
        assert_eq!(robot.logical_slot(1), 1);
        assert_eq!(robot.external_axis_slots(), [None, Some(1), None, Some(0), None, None]);
        assert_eq!(robot.slot_of(&positioner("turntable")), Some(3));
        assert_eq!(robot.slot_of(&positioner("unknown")), None);
    }

    #[test]
    fn test_duplicate_slots_rejected() {
        let robot = RobotModel::irb2600_12_165()
            .with_external_axis(track("track"))
            .with_external_axis(positioner("turntable").with_axis_number(0));
        assert!(matches!(robot.validate(), Err(KinematicsError::InvalidInput(_))));
    }

    #[test]
    fn test_single_linear_axis() {
        let robot = RobotModel::irb1600_6_145();
        assert!(matches!(robot.linear_axis(), Ok(None)));

        let robot = robot.with_external_axis(positioner("turntable")).with_external_axis(track("track"));
        let (index, axis) = robot.linear_axis().expect("one linear axis").expect("present");
        assert_eq!(index, 1);
        assert_eq!(axis.direction(), Vector3::y());

        let robot = robot.with_external_axis(track("second track").with_axis_number(4));
        assert!(matches!(robot.linear_axis(), Err(KinematicsError::UnsupportedConfiguration(_))));
    }

    #[test]
    fn test_tcp_plane_follows_tool() {
        let robot = RobotModel::irb2600_12_165();
        let flange = robot.tcp_plane();
        assert!(flange.approx_eq(&robot.mounting_frame, 1e-9, 1e-6));

        let tool = Tool::new("stick", Plane::world_xy(), Plane::world_xy().translate(&Vector3::new(0.0, 0.0, 200.0)));
        let tcp = robot.with_tool(tool).tcp_plane();
        let expected = robot.mounting_frame.origin + robot.mounting_frame.z_axis * 200.0;
        assert!((tcp.origin - expected).norm() < 1e-9);
        assert!((tcp.origin - Point3::new(150.0 + 795.0 + 85.0 + 200.0, 0.0, 445.0 + 700.0 + 115.0)).norm() < 1e-9);
    }
}
