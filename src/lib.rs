//! Forward and inverse kinematics for six axis industrial robots with a spherical wrist, mounted
//! on an optional linear track and working on objects held by optional rotational positioners.
//!
//! The robot is described by the frames of its six axes in the home position (all axis values
//! zero), in the way robot controllers of the ABB family describe their robots. From this
//! description the solver derives the arm geometry and solves the inverse kinematics in
//! closed form, returning all eight arm configurations.
//!
//! # Features
//!
//! - Forward kinematics of the complete cell: linear track, robot base, arm, flange and tool.
//! - Closed form inverse kinematics with eight candidate configurations, numbered the way the
//!   controller numbers them (shoulder, elbow and wrist flags).
//! - External axes: a linear axis moving the robot and rotational axes moving work objects.
//!   Unconstrained linear axis values are derived from the target.
//! - Targets in work object coordinates, either Cartesian (robot targets) or as axis values
//!   (joint targets).
//! - Path generation between targets with joint or linear interpolation, with annotated steps.
//! - Robot descriptions can be read from YAML files (feature `allow_filesystem`).
//!
//! # Conventions
//!
//! Lengths are in millimeters and axis values in degrees. Planes are right handed frames given
//! by origin, X and Y axis.
//!
//! ```
//! use robot_kinematics::forward_kinematics::ForwardKinematics;
//! use robot_kinematics::inverse_kinematics::InverseKinematics;
//! use robot_kinematics::robot::RobotModel;
//! use robot_kinematics::target::{Movement, RobotTarget};
//!
//! let robot = RobotModel::irb2600_12_165();
//! let posed = ForwardKinematics::new(&robot).calculate(&[10.0, 20.0, -10.0, 0.0, 30.0, 0.0], &[]);
//!
//! let target = RobotTarget::new("p10", posed.tcp_plane, 0);
//! let solved = InverseKinematics::new(&robot).calculate(&Movement::new(target));
//! assert!(solved.is_valid());
//! ```

pub mod error;
pub mod kinematic_traits;
pub mod plane;
pub mod geometry;
pub mod constraints;

#[path = "utils/utils.rs"]
pub mod utils;

pub mod tool;
pub mod external_axis;
pub mod robot;
pub mod robots;
pub mod target;

pub mod kinematics_impl;
pub mod forward_kinematics;
pub mod inverse_kinematics;

pub mod annotations;
pub mod path_generator;

#[cfg(feature = "allow_filesystem")]
pub mod parameter_error;

#[cfg(feature = "allow_filesystem")]
pub mod robot_from_file;
