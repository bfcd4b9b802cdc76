//! Hardcoded models of a few ABB robots, with the axis limits from the product data sheets.

use nalgebra::{Point3, Vector3};

use crate::constraints::JointLimits;
use crate::plane::Plane;
use crate::robot::RobotModel;
use crate::tool::Tool;

/// Dimensions of an ortho-parallel arm with a spherical wrist, millimeters. Same meaning
/// as the OPW parameters, with the height of the forearm above the elbow split out.
#[derive(Debug, Clone, Copy)]
struct ArmDimensions {
    /// Axis 2 forward of axis 1.
    a1: f64,
    /// Axis 2 above the base.
    c1: f64,
    /// Lower arm, axis 2 to axis 3.
    c2: f64,
    /// Forearm raise, axis 3 to the axis 4 line.
    raise: f64,
    /// Forearm, axis 3 to the wrist center.
    c3: f64,
    /// Wrist center to the flange.
    c4: f64,
}

impl ArmDimensions {
    fn robot(&self, name: &str, limits: [(f64, f64); 6]) -> RobotModel {
        let wrist_z = self.c1 + self.c2 + self.raise;
        let wrist_x = self.a1 + self.c3;
        let flange = Point3::new(wrist_x + self.c4, 0.0, wrist_z);
        RobotModel {
            name: name.to_string(),
            internal_axis_planes: [
                Plane::from_normal(Point3::origin(), Vector3::z()),
                Plane::from_normal(Point3::new(self.a1, 0.0, self.c1), Vector3::y()),
                Plane::from_normal(Point3::new(self.a1, 0.0, self.c1 + self.c2), Vector3::y()),
                Plane::from_normal(Point3::new(self.a1 + self.c3 / 2.0, 0.0, wrist_z), Vector3::x()),
                Plane::from_normal(Point3::new(wrist_x, 0.0, wrist_z), Vector3::y()),
                Plane::from_normal(flange, Vector3::x()),
            ],
            internal_axis_limits: JointLimits::from_ordered(limits),
            base_plane: Plane::world_xy(),
            // Tool Z out of the flange, tool X pointing down in the home position.
            mounting_frame: Plane::new(flange, -Vector3::z(), Vector3::y()),
            tool: Tool::default_tool(),
            external_axes: Vec::new(),
        }
    }
}

impl RobotModel {
    pub fn irb1600_6_145() -> Self {
        ArmDimensions { a1: 150.0, c1: 486.5, c2: 700.0, raise: 0.0, c3: 600.0, c4: 65.0 }.robot(
            "IRB1600-6/1.45",
            [(-180.0, 180.0), (-90.0, 150.0), (-245.0, 65.0), (-200.0, 200.0), (-115.0, 115.0), (-400.0, 400.0)],
        )
    }

    pub fn irb2400_10() -> Self {
        ArmDimensions { a1: 100.0, c1: 615.0, c2: 705.0, raise: 135.0, c3: 755.0, c4: 85.0 }.robot(
            "IRB2400-10",
            [(-180.0, 180.0), (-100.0, 110.0), (-60.0, 65.0), (-200.0, 200.0), (-120.0, 120.0), (-400.0, 400.0)],
        )
    }

    pub fn irb2600_12_165() -> Self {
        ArmDimensions { a1: 150.0, c1: 445.0, c2: 700.0, raise: 115.0, c3: 795.0, c4: 85.0 }.robot(
            "IRB2600-12/1.65",
            [(-180.0, 180.0), (-95.0, 155.0), (-180.0, 75.0), (-400.0, 400.0), (-120.0, 120.0), (-400.0, 400.0)],
        )
    }

    pub fn irb4600_60_205() -> Self {
        ArmDimensions { a1: 175.0, c1: 495.0, c2: 900.0, raise: 175.0, c3: 960.0, c4: 135.0 }.robot(
            "IRB4600-60/2.05",
            [(-180.0, 180.0), (-90.0, 150.0), (-180.0, 75.0), (-400.0, 400.0), (-125.0, 120.0), (-400.0, 400.0)],
        )
    }
}
