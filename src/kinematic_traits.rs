//! Defines the Kinematics trait and the basic types shared by all solvers.

extern crate nalgebra as na;

use na::Isometry3;

use crate::error::KinematicsError;

/// Pose is used as a pose of the robot flange or tcp. It contains both Cartesian position
/// (millimeters) and rotation quaternion.
/// ```
/// extern crate nalgebra as na;
/// use na::{Isometry3, Translation3, UnitQuaternion, Vector3};
///
/// type Pose = Isometry3<f64>;
///
/// let translation = Translation3::new(500.0, 0.0, 700.0);
/// // The quaternion should be normalized to represent a valid rotation.
/// let rotation = UnitQuaternion::from_quaternion(na::Quaternion::new(1.0, 0.0, 0.0, 1.0).normalize());
/// let transform = Pose::from_parts(translation, rotation);
/// ```
pub type Pose = Isometry3<f64>;

/// Values of the six internal axes, in degrees, in the controller sign convention.
pub type Joints = [f64; 6];

/// Single candidate of the inverse kinematics. Candidates that do not exist for the given
/// pose (outside reach) carry the reason instead of NaN values.
pub type Solution = Result<Joints, KinematicsError>;

/// The eight closed-form candidates, indexed by axis configuration:
/// `index = 4 * back + 2 * elbow + wrist_flip`.
pub type Solutions = [Solution; 8];

/// Number of closed-form inverse kinematics candidates.
pub const SOLUTION_COUNT: usize = 8;

/// Maximal number of external axes (logical axes A to F of the controller).
pub const EXTERNAL_AXIS_SLOTS: usize = 6;

/// All axes at zero (home position).
pub const JOINTS_AT_ZERO: Joints = [0.0; 6];

pub trait Kinematics: Send + Sync {
    /// Find the eight candidate joint positions for the given pose.
    fn inverse(&self, pose: &Pose) -> Solutions;

    /// Pose for the given joint positions (degrees).
    fn forward(&self, qs: &Joints) -> Pose;

    /// Posed frames of all six axes, each frame having its Z axis along the rotation axis.
    fn forward_with_joint_poses(&self, qs: &Joints) -> [Pose; 6];
}

/// Internal axis values with the degrees authoritative and radians derived.
/// Both representations are updated together on every mutation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointValues {
    degrees: Joints,
    radians: Joints,
}

impl JointValues {
    pub fn from_degrees(degrees: Joints) -> Self {
        JointValues {
            degrees,
            radians: degrees.map(f64::to_radians),
        }
    }

    pub fn from_radians(radians: Joints) -> Self {
        Self::from_degrees(radians.map(f64::to_degrees))
    }

    pub fn degrees(&self) -> &Joints {
        &self.degrees
    }

    pub fn radians(&self) -> &Joints {
        &self.radians
    }

    /// Sets the value of one axis, in degrees.
    pub fn set_degrees(&mut self, index: usize, value: f64) {
        self.degrees[index] = value;
        self.radians[index] = value.to_radians();
    }

    pub fn set_all_degrees(&mut self, degrees: Joints) {
        *self = Self::from_degrees(degrees);
    }
}

impl Default for JointValues {
    fn default() -> Self {
        Self::from_degrees(JOINTS_AT_ZERO)
    }
}
