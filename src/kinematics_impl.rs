//! Kinematics of the bare arm: robot coordinates, flange pose, no base and no tool.
//!
//! Forward kinematics is the product of rotations about the home axis lines,
//! `flange = R1(q1)·R2(q2)·…·R6(q6)·mounting`. The inverse is closed-form for arms with
//! an ortho-parallel shoulder and a spherical wrist, see [`ArmGeometry`].

use std::f64::consts::PI;
use std::sync::Arc;

use nalgebra::{Matrix3, Point3, Unit, UnitQuaternion, Vector3};
use tracing::{trace, warn};

use crate::error::KinematicsError;
use crate::geometry::{LENGTH_TOLERANCE, Sphere};
use crate::kinematic_traits::{Joints, Kinematics, Pose, Solution, Solutions};
use crate::plane::{Plane, rotation_about_line};
use crate::robot::RobotModel;
use crate::utils::{is_valid, wrap_angle, wrap_degrees};

/// Max deviation of the axis direction cosine from ±1 to count as parallel.
const PARALLEL_TOLERANCE: f64 = 1e-6;

/// Max offset (mm) of axis origins from the lines and planes the layout requires.
const LAYOUT_TOLERANCE: f64 = 1e-6;

/// Below this value of sin(q5) the wrist is treated as singular.
const WRIST_SINGULARITY: f64 = 1e-10;

/// Elbow points closer in height than this (mm) are ordered by reach instead.
const ELBOW_TIE: f64 = 1e-9;

/// Constants of the closed-form solver, derived once from the home axis planes.
///
/// Supported layout, in robot coordinates: axis 1 vertical through the origin, axes 2, 3
/// and 5 parallel to Y, axes 4 and 6 parallel to X through the wrist center (the origin
/// of axis 5), origins of axes 2 to 5 in the XZ plane. Each axis may point either way
/// along its direction, the signs are kept.
#[derive(Debug, Clone, PartialEq)]
pub struct ArmGeometry {
    shoulder: Point3<f64>,
    lower_arm_length: f64,
    upper_arm_length: f64,
    /// Angle of the lower arm in the arm plane at home, measured from Z towards X.
    shoulder_home_angle: f64,
    /// Angle of the elbow to wrist center vector in the arm plane at home.
    axis4_offset_angle: f64,
    /// Wrist center in the mounting frame.
    wrist_offset: Point3<f64>,
    mounting_rotation: UnitQuaternion<f64>,
    signs: [f64; 6],
}

fn unsupported(message: String) -> KinematicsError {
    KinematicsError::UnsupportedConfiguration(message)
}

/// Angle of a vector in the arm (XZ) plane, measured from Z towards X. Rotation about +Y
/// increases it.
fn arm_angle(v: &Vector3<f64>) -> f64 {
    v.x.atan2(v.z)
}

impl ArmGeometry {
    pub fn from_planes(axis_planes: &[Plane; 6], mounting_frame: &Plane) -> Result<Self, KinematicsError> {
        let axes = axis_planes.map(|plane| plane.z_axis.normalize());
        let origins = axis_planes.map(|plane| plane.origin);

        let sign = |i: usize, reference: Vector3<f64>, name: &str| -> Result<f64, KinematicsError> {
            let cosine = axes[i].dot(&reference);
            if (cosine.abs() - 1.0).abs() < PARALLEL_TOLERANCE {
                Ok(cosine.signum())
            } else {
                Err(unsupported(format!("axis {} must be parallel to {}", i + 1, name)))
            }
        };
        let signs = [
            sign(0, Vector3::z(), "Z")?,
            sign(1, Vector3::y(), "Y")?,
            sign(2, Vector3::y(), "Y")?,
            sign(3, Vector3::x(), "X")?,
            sign(4, Vector3::y(), "Y")?,
            sign(5, Vector3::x(), "X")?,
        ];

        if origins[0].x.abs() > LAYOUT_TOLERANCE || origins[0].y.abs() > LAYOUT_TOLERANCE {
            return Err(unsupported("axis 1 must pass through the origin".to_string()));
        }
        if let Some(i) = (1..5).find(|&i| origins[i].y.abs() > LAYOUT_TOLERANCE) {
            return Err(unsupported(format!("origin of axis {} must lie in the XZ plane", i + 1)));
        }

        let wrist = origins[4];
        for i in [3, 5] {
            if (origins[i].y - wrist.y).abs() > LAYOUT_TOLERANCE || (origins[i].z - wrist.z).abs() > LAYOUT_TOLERANCE {
                return Err(unsupported(format!("axis {} must pass through the wrist center", i + 1)));
            }
        }

        let shoulder = origins[1];
        let elbow = origins[2];
        let lower_arm = elbow - shoulder;
        let upper_arm = wrist - elbow;
        if lower_arm.norm() < LENGTH_TOLERANCE || upper_arm.norm() < LENGTH_TOLERANCE {
            return Err(unsupported("lower and upper arm must have non-zero length".to_string()));
        }

        let mounting = mounting_frame.to_pose();
        Ok(ArmGeometry {
            shoulder,
            lower_arm_length: lower_arm.norm(),
            upper_arm_length: upper_arm.norm(),
            shoulder_home_angle: arm_angle(&lower_arm),
            axis4_offset_angle: arm_angle(&upper_arm),
            wrist_offset: mounting.inverse_transform_point(&wrist),
            mounting_rotation: mounting.rotation,
            signs,
        })
    }

    pub fn lower_arm_length(&self) -> f64 {
        self.lower_arm_length
    }

    pub fn upper_arm_length(&self) -> f64 {
        self.upper_arm_length
    }

    pub fn axis4_offset_angle(&self) -> f64 {
        self.axis4_offset_angle
    }

    pub fn wrist_offset(&self) -> &Point3<f64> {
        &self.wrist_offset
    }

    /// +1 or -1 per axis, telling if the axis points along or against its reference direction.
    pub fn signs(&self) -> &[f64; 6] {
        &self.signs
    }

    /// The two elbow positions for the wrist center given in the arm plane, higher one first.
    fn elbow_points(&self, wrist: &Point3<f64>) -> Result<[Point3<f64>; 2], KinematicsError> {
        let circle = Sphere::new(self.shoulder, self.lower_arm_length)
            .intersect(&Sphere::new(*wrist, self.upper_arm_length))?;
        let [a, b] = circle.intersect_plane(&self.shoulder, &Vector3::y())?;
        let a_first = a.z > b.z + ELBOW_TIE || ((a.z - b.z).abs() <= ELBOW_TIE && a.x >= b.x);
        Ok(if a_first { [a, b] } else { [b, a] })
    }

    /// All eight candidates for the flange pose in robot coordinates. Index is
    /// `4 * back + 2 * elbow + wrist_flip`.
    pub fn solve(&self, flange: &Pose) -> Solutions {
        let wrist = flange.transform_point(&self.wrist_offset);
        let flange_rotation = flange.rotation * self.mounting_rotation.inverse();
        let [s1, s2, s3, s4, s5, s6] = self.signs;

        let mut solutions: Solutions = std::array::from_fn(|_| {
            Err(KinematicsError::Unreachable("not computed".to_string()))
        });

        let heading_front = wrist.y.atan2(wrist.x);
        for back in 0..2 {
            let heading = wrap_angle(heading_front + back as f64 * PI);
            let wrist_in_arm = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), -heading) * wrist;

            let elbows = match self.elbow_points(&wrist_in_arm) {
                Ok(elbows) => elbows,
                Err(error) => {
                    trace!("{} branch: {}", if back == 0 { "Front" } else { "Back" }, error);
                    for slot in &mut solutions[4 * back..4 * back + 4] {
                        *slot = Err(error.clone());
                    }
                    continue;
                }
            };

            for (elbow_index, elbow) in elbows.iter().enumerate() {
                let lower_rotation = wrap_angle(arm_angle(&(elbow - self.shoulder)) - self.shoulder_home_angle);
                let arm_rotation = arm_angle(&(wrist_in_arm - elbow)) - self.axis4_offset_angle;
                let upper_rotation = wrap_angle(arm_rotation - lower_rotation);

                let r03 = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), heading)
                    * UnitQuaternion::from_axis_angle(&Vector3::y_axis(), arm_rotation);
                let wrist_rotation = (r03.inverse() * flange_rotation).to_rotation_matrix();

                for (flip, (q4, q5, q6)) in decompose_wrist(wrist_rotation.matrix()).into_iter().enumerate() {
                    let angles = [
                        s1 * heading,
                        s2 * lower_rotation,
                        s3 * upper_rotation,
                        s4 * q4,
                        s5 * q5,
                        s6 * q6,
                    ]
                    .map(wrap_angle);
                    solutions[4 * back + 2 * elbow_index + flip] = checked(controller_degrees(&angles));
                }
            }
        }
        solutions
    }
}

fn checked(joints: Joints) -> Solution {
    if is_valid(&joints) {
        Ok(joints)
    } else {
        Err(KinematicsError::Unreachable("solver produced non-finite axis values".to_string()))
    }
}

/// Splits the wrist rotation `Rx(a)·Ry(b)·Rx(c)` into the regular and the flipped
/// (a + π, -b, c + π) angle triplet. At the singularity (b near 0 or π) axis 4 is kept
/// at zero and the whole rotation goes to axis 6.
fn decompose_wrist(r: &Matrix3<f64>) -> [(f64, f64, f64); 2] {
    let sin_b = (r[(1, 0)] * r[(1, 0)] + r[(2, 0)] * r[(2, 0)]).sqrt();
    let (a, b, c) = if sin_b < WRIST_SINGULARITY {
        if r[(0, 0)] > 0.0 {
            (0.0, 0.0, r[(2, 1)].atan2(r[(1, 1)]))
        } else {
            (0.0, PI, (-r[(2, 1)]).atan2(r[(1, 1)]))
        }
    } else {
        (
            r[(1, 0)].atan2(-r[(2, 0)]),
            sin_b.atan2(r[(0, 0)]),
            r[(0, 1)].atan2(r[(0, 2)]),
        )
    };
    [(a, b, c), (a + PI, -b, c + PI)]
}

/// Solver angles (radians, wrapped) to degrees in the ranges the controller reports.
/// The solver already works in controller signs and zero positions, only the ranges
/// change: axis 2 in (-90, 270], axis 3 in (-270, 90], axes 4 and 6 in [-180, 180).
fn controller_degrees(angles: &[f64; 6]) -> Joints {
    let degrees = angles.map(f64::to_degrees);
    [
        degrees[0],
        wrap_degrees(degrees[1] - 90.0) + 90.0,
        wrap_degrees(degrees[2] + 90.0) - 90.0,
        -wrap_degrees(-degrees[3]),
        degrees[4],
        -wrap_degrees(-degrees[5]),
    ]
}

/// The bare arm. Forward kinematics works for any axis layout; the inverse needs the
/// layout [`ArmGeometry`] supports and otherwise returns the layout error for every
/// candidate.
#[derive(Debug, Clone)]
pub struct ArmKinematics {
    axis_planes: [Plane; 6],
    mounting: Pose,
    geometry: Result<ArmGeometry, KinematicsError>,
}

impl ArmKinematics {
    pub fn new(robot: &RobotModel) -> Self {
        Self::from_planes(&robot.internal_axis_planes, &robot.mounting_frame)
    }

    pub fn from_planes(axis_planes: &[Plane; 6], mounting_frame: &Plane) -> Self {
        let geometry = ArmGeometry::from_planes(axis_planes, mounting_frame);
        if let Err(error) = &geometry {
            warn!("Closed-form inverse kinematics is not available: {}", error);
        }
        ArmKinematics {
            axis_planes: *axis_planes,
            mounting: mounting_frame.to_pose(),
            geometry,
        }
    }

    pub fn shared(robot: &RobotModel) -> Arc<Self> {
        Arc::new(Self::new(robot))
    }

    pub fn geometry(&self) -> Result<&ArmGeometry, KinematicsError> {
        self.geometry.as_ref().map_err(Clone::clone)
    }

    /// Rotations about the home axis lines, accumulated: element i is `R1·…·R(i+1)`.
    fn accumulated_rotations(&self, qs: &Joints) -> [Pose; 6] {
        let mut accumulated = Pose::identity();
        std::array::from_fn(|i| {
            let plane = &self.axis_planes[i];
            let axis = Unit::new_normalize(plane.z_axis);
            accumulated *= rotation_about_line(qs[i].to_radians(), &axis, &plane.origin);
            accumulated
        })
    }
}

impl Kinematics for ArmKinematics {
    fn inverse(&self, pose: &Pose) -> Solutions {
        match &self.geometry {
            Ok(geometry) => geometry.solve(pose),
            Err(error) => std::array::from_fn(|_| Err(error.clone())),
        }
    }

    fn forward(&self, qs: &Joints) -> Pose {
        self.accumulated_rotations(qs)[5] * self.mounting
    }

    /// Axis i is posed by the rotations of the axes before it, so its Z axis stays the
    /// rotation axis.
    fn forward_with_joint_poses(&self, qs: &Joints) -> [Pose; 6] {
        let accumulated = self.accumulated_rotations(qs);
        std::array::from_fn(|i| {
            let prior = if i == 0 { Pose::identity() } else { accumulated[i - 1] };
            prior * self.axis_planes[i].to_pose()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematic_traits::JOINTS_AT_ZERO;
    use crate::utils::{assert_pose_eq, transition_costs};

    fn arm() -> ArmKinematics {
        ArmKinematics::new(&RobotModel::irb2600_12_165())
    }

    #[test]
    fn test_home_is_mounting_frame() {
        let robot = RobotModel::irb2600_12_165();
        let arm = ArmKinematics::new(&robot);
        assert_pose_eq(&arm.forward(&JOINTS_AT_ZERO), &robot.mounting_frame.to_pose(), 1e-9, 1e-9);
    }

    #[test]
    fn test_geometry_constants() {
        let geometry = ArmGeometry::from_planes(
            &RobotModel::irb2600_12_165().internal_axis_planes,
            &RobotModel::irb2600_12_165().mounting_frame,
        )
        .expect("supported layout");
        assert!((geometry.lower_arm_length() - 700.0).abs() < 1e-9);
        assert!((geometry.upper_arm_length() - (795.0_f64.powi(2) + 115.0_f64.powi(2)).sqrt()).abs() < 1e-9);
        assert!((geometry.axis4_offset_angle() - 795.0_f64.atan2(115.0)).abs() < 1e-12);
        // Wrist center is 85 mm behind the flange, along the flange Z axis.
        assert!((geometry.wrist_offset() - Point3::new(0.0, 0.0, -85.0)).norm() < 1e-9);
        assert_eq!(geometry.signs(), &[1.0; 6]);
    }

    #[test]
    fn test_controller_ranges() {
        let degrees = controller_degrees(&[-PI / 2.0, -PI * 0.75, PI * 0.75, PI, 0.5, PI]);
        let expected = [-90.0, 225.0, -225.0, -180.0, 0.5_f64.to_degrees(), -180.0];
        for (i, (got, want)) in degrees.iter().zip(expected).enumerate() {
            assert!((got - want).abs() < 1e-9, "axis {} at {}", i + 1, got);
        }
        assert_eq!(controller_degrees(&[0.0; 6]), [0.0; 6]);
    }

    #[test]
    fn test_home_solution() {
        let arm = arm();
        let solutions = arm.inverse(&arm.forward(&JOINTS_AT_ZERO));
        let home = solutions[0].as_ref().expect("home is reachable");
        for (i, q) in home.iter().enumerate() {
            assert!(q.abs() < 1e-9, "axis {} at {}", i + 1, q);
        }
    }

    #[test]
    fn test_forward_inverse_round_trip() {
        let arm = arm();
        let joints: Joints = [10.0, 20.0, 30.0, 40.0, 50.0, 60.0];
        let pose = arm.forward(&joints);
        let solutions = arm.inverse(&pose);

        let mut found = false;
        for solution in solutions.iter() {
            let candidate = solution.as_ref().expect("all eight candidates exist");
            assert_pose_eq(&arm.forward(candidate), &pose, 1e-6, 1e-6);
            if transition_costs(candidate, &joints, &[1.0; 6]) < 1e-6 {
                found = true;
            }
        }
        assert!(found, "original joints are not among the solutions");
    }

    #[test]
    fn test_wrist_flip_pairs() {
        let arm = arm();
        let solutions = arm.inverse(&arm.forward(&[-30.0, 10.0, 15.0, 20.0, 35.0, -40.0]));
        for pair in [0, 2, 4, 6] {
            let a = solutions[pair].as_ref().expect("exists");
            let b = solutions[pair + 1].as_ref().expect("exists");
            // Same arm, wrist flipped: axis 5 mirrored.
            assert_eq!(&a[0..3], &b[0..3]);
            assert!((a[4] + b[4]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_unreachable_is_error() {
        let arm = arm();
        let far = Pose::translation(5000.0, 0.0, 1000.0);
        let solutions = arm.inverse(&far);
        for solution in solutions.iter() {
            assert!(matches!(solution, Err(KinematicsError::Unreachable(_))));
        }
    }

    #[test]
    fn test_unsupported_layout() {
        let mut robot = RobotModel::irb2600_12_165();
        robot.internal_axis_planes[1] = Plane::from_normal(robot.internal_axis_planes[1].origin, Vector3::x());
        let arm = ArmKinematics::new(&robot);
        assert!(matches!(arm.geometry(), Err(KinematicsError::UnsupportedConfiguration(_))));
        let solutions = arm.inverse(&Pose::identity());
        assert!(solutions.iter().all(|s| matches!(s, Err(KinematicsError::UnsupportedConfiguration(_)))));
        // Forward kinematics still works.
        assert!(arm.forward(&JOINTS_AT_ZERO).translation.vector.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn test_joint_poses_follow_prior_axes() {
        let arm = arm();
        let poses = arm.forward_with_joint_poses(&[90.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        // Axis 1 itself is not moved, axis 2 is turned to face along -X.
        assert!((poses[0].translation.vector).norm() < 1e-9);
        let axis2 = poses[1].transform_point(&Point3::origin());
        assert!((axis2 - Point3::new(0.0, 150.0, 445.0)).norm() < 1e-9);
        let z2 = poses[1].rotation * Vector3::z();
        assert!((z2 + Vector3::x()).norm() < 1e-9);
    }
}
