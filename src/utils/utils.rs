//! Helper functions

use std::f64::consts::PI;

use nalgebra::{Isometry3, UnitQuaternion};

use crate::kinematic_traits::{Joints, Solutions};
use crate::plane::Plane;

/// Checks if all elements in the array are finite
pub fn is_valid(qs: &Joints) -> bool {
    qs.iter().all(|&q| q.is_finite())
}

/// Wraps the angle (radians) into (-π, π].
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(2.0 * PI);
    if wrapped > PI { wrapped - 2.0 * PI } else { wrapped }
}

/// Wraps the angle (degrees) into (-180, 180].
pub fn wrap_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    if wrapped > 180.0 { wrapped - 360.0 } else { wrapped }
}

/// Print joint values for all solutions, in degrees. Candidates that do not exist are
/// printed with the reason.
pub fn dump_solutions(solutions: &Solutions) {
    for (index, solution) in solutions.iter().enumerate() {
        match solution {
            Ok(joints) => {
                let row_str: Vec<String> = joints.iter().map(|q| format!("{:7.2}", q)).collect();
                println!("{}: [{}]", index, row_str.join(" "));
            }
            Err(error) => println!("{}: {}", index, error),
        }
    }
}

/// Print joint values, degrees.
pub fn dump_joints(joints: &Joints) {
    let row_str: Vec<String> = joints.iter().map(|q| format!("{:5.2}", q)).collect();
    println!("[{}]", row_str.join(" "));
}

pub fn dump_pose(isometry: &Isometry3<f64>) {
    let translation = isometry.translation.vector;
    let rotation: UnitQuaternion<f64> = isometry.rotation;
    println!(
        "x: {:.5}, y: {:.5}, z: {:.5},  quat: {:.5},{:.5},{:.5},{:.5}",
        translation.x, translation.y, translation.z, rotation.i, rotation.j, rotation.k, rotation.w
    );
}

pub fn dump_plane(plane: &Plane) {
    println!(
        "origin: ({:.3}, {:.3}, {:.3}) x: ({:.4}, {:.4}, {:.4}) y: ({:.4}, {:.4}, {:.4})",
        plane.origin.x, plane.origin.y, plane.origin.z,
        plane.x_axis.x, plane.x_axis.y, plane.x_axis.z,
        plane.y_axis.x, plane.y_axis.y, plane.y_axis.z
    );
}

/// Largest rotation (degrees) any axis needs to move between the two joint positions,
/// weighted by the given coefficients. Angles are compared modulo full turns.
pub fn transition_costs(from: &Joints, to: &Joints, coefficients: &Joints) -> f64 {
    (0..6)
        .map(|i| wrap_degrees(from[i] - to[i]).abs() * coefficients[i])
        .fold(0.0, f64::max)
}

pub fn assert_pose_eq(ta: &Isometry3<f64>, tb: &Isometry3<f64>,
                      distance_tolerance: f64, angular_tolerance: f64) -> bool {
    fn bad(ta: &Isometry3<f64>, tb: &Isometry3<f64>) {
        dump_pose(ta);
        dump_pose(tb);
    }

    let translation_distance = (ta.translation.vector - tb.translation.vector).norm();
    let angular_distance = ta.rotation.angle_to(&tb.rotation);

    if translation_distance.abs() > distance_tolerance {
        bad(ta, tb);
        panic!("Poses have too different translations: {}", translation_distance);
    }

    if angular_distance.abs() > angular_tolerance {
        bad(ta, tb);
        panic!("Poses have too different angles: {}", angular_distance);
    }
    true
}

pub fn assert_plane_eq(a: &Plane, b: &Plane, distance_tolerance: f64, angular_tolerance: f64) -> bool {
    assert_pose_eq(&a.to_pose(), &b.to_pose(), distance_tolerance, angular_tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_with_all_finite() {
        let qs = [0.0, 1.0, -1.0, 0.5, -0.5, PI];
        assert!(is_valid(&qs));
    }

    #[test]
    fn test_is_valid_with_nan() {
        let qs = [0.0, f64::NAN, 1.0, -1.0, 0.5, -0.5];
        assert!(!is_valid(&qs));
    }

    #[test]
    fn test_is_valid_with_infinity() {
        let qs = [0.0, f64::INFINITY, 1.0, -1.0, 0.5, -0.5];
        assert!(!is_valid(&qs));
    }

    #[test]
    fn test_wrap_angle() {
        assert_eq!(wrap_angle(PI), PI);
        assert!((wrap_angle(-PI) - PI).abs() < 1e-12);
        assert!((wrap_angle(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-12);
        assert!((wrap_degrees(190.0) + 170.0).abs() < 1e-12);
        assert_eq!(wrap_degrees(-180.0), 180.0);
    }

    #[test]
    fn test_transition_costs() {
        let from = [0.0, 10.0, 20.0, 170.0, 0.0, 0.0];
        let to = [5.0, 10.0, 20.0, -170.0, 0.0, 0.0];
        assert!((transition_costs(&from, &to, &[1.0; 6]) - 20.0).abs() < 1e-12);
        assert!((transition_costs(&from, &to, &[10.0, 1.0, 1.0, 1.0, 1.0, 1.0]) - 50.0).abs() < 1e-12);
    }
}
