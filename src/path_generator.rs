//! Builds the path through a sequence of movements: for each pair of consecutive
//! movements the robot state is interpolated in axis space (joint movements) or in
//! Cartesian space (linear movements), and a smooth curve is laid through the TCP
//! positions of every segment.
//!
//! Problems are collected as messages; a step or movement that cannot be resolved is
//! skipped and generation continues with the next one.

use tracing::{debug, warn};

use crate::annotations::{PathFlags, PathStep};
use crate::forward_kinematics::ForwardKinematics;
use crate::geometry::InterpolatedCurve;
use crate::inverse_kinematics::{InverseKinematics, InverseKinematicsResult};
use crate::kinematic_traits::{EXTERNAL_AXIS_SLOTS, Joints, Solutions};
use crate::plane::Plane;
use crate::robot::RobotModel;
use crate::target::{Action, Interpolation, Movement, RobotTarget, Target, UNCONSTRAINED, WorkObject};
use crate::utils::transition_costs;

/// Path between two consecutive movements. Steps run from the start (t = 0) to the
/// destination (t = 1), both included.
#[derive(Debug, Clone, PartialEq)]
pub struct PathSegment {
    pub from: String,
    pub to: String,
    pub interpolation: Interpolation,
    pub steps: Vec<PathStep>,
    /// Degree 3 curve through the TCP positions, None if they are not at least two
    /// distinct points.
    pub curve: Option<InterpolatedCurve>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Path {
    pub segments: Vec<PathSegment>,
    /// All steps of the path: the first target, then each segment without its first
    /// step (which repeats the last step of the segment before).
    pub planes: Vec<Plane>,
    pub internal_axis_values: Vec<Joints>,
    pub external_axis_values: Vec<Vec<f64>>,
    pub flags: Vec<PathFlags>,
    /// Curves of the segments that have one.
    pub curves: Vec<InterpolatedCurve>,
    pub error_text: Vec<String>,
}

impl Path {
    fn push_step(&mut self, step: &PathStep) {
        self.planes.push(step.plane);
        self.internal_axis_values.push(step.internal_axis_values);
        self.external_axis_values.push(step.external_axis_values.clone());
        self.flags.push(step.flags);
    }

    pub fn len(&self) -> usize {
        self.planes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }
}

/// A movement that inverse kinematics could resolve.
struct Waypoint {
    movement: Movement,
    result: InverseKinematicsResult,
    joints: Joints,
}

impl Waypoint {
    fn step(&self, flags: PathFlags) -> PathStep {
        PathStep {
            plane: self.result.target_plane,
            internal_axis_values: self.joints,
            external_axis_values: self.result.external_axis_values.clone(),
            flags: self.flags_with_limits(flags),
        }
    }

    fn flags_with_limits(&self, flags: PathFlags) -> PathFlags {
        if self.result.is_valid() { flags } else { flags | PathFlags::LIMITS }
    }
}

pub struct PathGenerator<'a> {
    robot: &'a RobotModel,
    inverse: InverseKinematics<'a>,
    forward: ForwardKinematics<'a>,
}

impl<'a> PathGenerator<'a> {
    pub fn new(robot: &'a RobotModel) -> Self {
        let inverse = InverseKinematics::new(robot);
        let forward = inverse.forward();
        PathGenerator { robot, inverse, forward }
    }

    /// Generates the path through all movements of `actions`, with `interpolations`
    /// sub-steps per segment (zero is taken as one).
    pub fn calculate(&self, actions: &[Action], interpolations: usize) -> Path {
        let steps = interpolations.max(1);
        let mut path = Path::default();
        let mut tool = self.robot.tool.clone();
        let mut tool_changed = false;
        let mut previous: Option<Waypoint> = None;

        for action in actions {
            let movement = match action {
                Action::OverrideRobotTool(new_tool) => {
                    if new_tool.is_valid() {
                        debug!("Tool '{}' mounted", new_tool.name());
                        tool = new_tool.clone();
                        tool_changed = true;
                    } else {
                        path.error_text.push(format!("Tool '{}' is not valid and is not mounted.", new_tool.name()));
                    }
                    continue;
                }
                Action::Movement(movement) => movement,
            };

            let result = self.inverse.calculate_with_tool(movement, &tool);
            path.error_text.extend(result.error_text.iter().cloned());
            let Some(joints) = result.joints().copied() else {
                warn!("Movement to '{}' skipped", movement.target.name());
                continue;
            };
            let waypoint = Waypoint { movement: movement.clone(), result, joints };

            let changed = if tool_changed { PathFlags::TOOL_CHANGED } else { PathFlags::NONE };
            tool_changed = false;
            match &previous {
                None => {
                    path.push_step(&waypoint.step(PathFlags::START | PathFlags::TARGET | changed));
                }
                Some(start) => {
                    let mut segment = match movement.motion_type.interpolation() {
                        Interpolation::Joint => self.joint_segment(start, &waypoint, steps),
                        Interpolation::Linear => self.linear_segment(start, &waypoint, steps, &mut path.error_text),
                    };
                    if let Some(last) = segment.steps.last_mut() {
                        last.flags |= changed;
                    }
                    for step in segment.steps.iter().skip(1) {
                        path.push_step(step);
                    }
                    let points: Vec<_> = segment.steps.iter().map(|step| step.plane.origin).collect();
                    segment.curve = InterpolatedCurve::through_points(&points);
                    if let Some(curve) = &segment.curve {
                        path.curves.push(curve.clone());
                    }
                    path.segments.push(segment);
                }
            }
            previous = Some(waypoint);
        }
        path
    }

    /// Axis values interpolated linearly, TCP from forward kinematics with the tool of
    /// the destination.
    fn joint_segment(&self, start: &Waypoint, end: &Waypoint, steps: usize) -> PathSegment {
        debug!("Joint segment '{}' -> '{}'", start.movement.target.name(), end.movement.target.name());
        let mut segment_steps = Vec::with_capacity(steps + 1);
        segment_steps.push(start.step(PathFlags::TARGET));
        for i in 1..steps {
            let t = i as f64 / steps as f64;
            let joints = lerp_joints(&start.joints, &end.joints, t);
            let external = lerp_values(&start.result.external_axis_values, &end.result.external_axis_values, t);
            let posed = self.forward.calculate_with_tool(&joints, &external, &end.result.tool);
            let flags = if posed.in_limits() { PathFlags::JOINT_INTERP } else { PathFlags::JOINT_INTERP | PathFlags::LIMITS };
            segment_steps.push(PathStep {
                plane: posed.tcp_plane,
                internal_axis_values: joints,
                external_axis_values: external,
                flags,
            });
        }
        segment_steps.push(end.step(PathFlags::TARGET | PathFlags::JOINT_INTERP));
        self.segment(start, end, Interpolation::Joint, segment_steps)
    }

    /// TCP plane interpolated in the coordinates of the destination work object, axis
    /// values from inverse kinematics for every step. The start plane is where the
    /// destination tool is at the start axis values.
    fn linear_segment(&self, start: &Waypoint, end: &Waypoint, steps: usize, error_text: &mut Vec<String>) -> PathSegment {
        debug!("Linear segment '{}' -> '{}'", start.movement.target.name(), end.movement.target.name());
        let tool = &end.result.tool;
        let work_object = &end.movement.work_object;
        let start_external = &start.result.external_axis_values;
        let end_external = &end.result.external_axis_values;

        let start_global = self.forward.calculate_with_tool(&start.joints, start_external, tool).tcp_plane;
        let start_local = start_global
            .transform(&work_object.global_transform(self.positioner_value(work_object, start_external)).inverse());
        let end_local = match &end.movement.target {
            Target::Robot(target) => target.plane,
            Target::Joint(_) => end.result.target_plane.transform(
                &work_object.global_transform(self.positioner_value(work_object, end_external)).inverse(),
            ),
        };
        let axis_config = match &end.movement.target {
            Target::Robot(target) => target.axis_config,
            Target::Joint(target) => nearest_configuration(&end.result.solutions, &target.internal_axis_values),
        };

        let mut segment_steps = Vec::with_capacity(steps + 1);
        segment_steps.push(PathStep {
            plane: start_global,
            internal_axis_values: start.joints,
            external_axis_values: start_external.clone(),
            flags: start.flags_with_limits(PathFlags::TARGET),
        });
        for i in 1..steps {
            let t = i as f64 / steps as f64;
            let external = lerp_values(start_external, end_external, t);
            let target = RobotTarget {
                name: format!("{}_{}", end.movement.target.name(), i),
                plane: start_local.lerp(&end_local, t),
                axis_config,
                external_axis_values: self.slot_values(&external),
            };
            let movement = Movement::new(target)
                .with_work_object(work_object.clone())
                .with_tool(tool.clone())
                .with_motion_type(end.movement.motion_type);
            let result = self.inverse.calculate_with_tool(&movement, tool);
            match result.joints() {
                Some(joints) => {
                    let flags = if result.is_valid() { PathFlags::LIN_INTERP } else { PathFlags::LIN_INTERP | PathFlags::LIMITS };
                    segment_steps.push(PathStep {
                        plane: result.target_plane,
                        internal_axis_values: *joints,
                        external_axis_values: result.external_axis_values.clone(),
                        flags,
                    });
                }
                None => {
                    let message = format!(
                        "Step {} of {} towards '{}' is skipped: {}",
                        i,
                        steps,
                        end.movement.target.name(),
                        result.error_text.join(" ")
                    );
                    warn!("{}", message);
                    error_text.push(message);
                }
            }
        }
        segment_steps.push(end.step(PathFlags::TARGET | PathFlags::LIN_INTERP));
        self.segment(start, end, Interpolation::Linear, segment_steps)
    }

    fn segment(&self, start: &Waypoint, end: &Waypoint, interpolation: Interpolation, steps: Vec<PathStep>) -> PathSegment {
        PathSegment {
            from: start.movement.target.name().to_string(),
            to: end.movement.target.name().to_string(),
            interpolation,
            steps,
            curve: None,
        }
    }

    /// Value of the external axis that moves the work object, taken from values given in
    /// robot axis order.
    fn positioner_value(&self, work_object: &WorkObject, external: &[f64]) -> f64 {
        if !work_object.is_moving() {
            return 0.0;
        }
        let slots = self.robot.external_axis_slots();
        work_object
            .external_axis
            .as_ref()
            .and_then(|axis| self.robot.slot_of(axis))
            .and_then(|slot| slots[slot])
            .and_then(|index| external.get(index).copied())
            .unwrap_or(0.0)
    }

    /// Values in robot axis order placed into their logical slots.
    fn slot_values(&self, external: &[f64]) -> [f64; EXTERNAL_AXIS_SLOTS] {
        let mut slots = [UNCONSTRAINED; EXTERNAL_AXIS_SLOTS];
        for (index, value) in external.iter().enumerate() {
            if let Some(slot) = slots.get_mut(self.robot.logical_slot(index)) {
                *slot = *value;
            }
        }
        slots
    }
}

/// Index of the existing candidate closest to `joints`, 0 if none exists.
fn nearest_configuration(solutions: &Solutions, joints: &Joints) -> usize {
    solutions
        .iter()
        .enumerate()
        .filter_map(|(index, solution)| {
            solution.as_ref().ok().map(|candidate| (index, transition_costs(candidate, joints, &[1.0; 6])))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(index, _)| index)
        .unwrap_or(0)
}

fn lerp_joints(from: &Joints, to: &Joints, t: f64) -> Joints {
    std::array::from_fn(|i| from[i] + (to[i] - from[i]) * t)
}

fn lerp_values(from: &[f64], to: &[f64], t: f64) -> Vec<f64> {
    from.iter().zip(to).map(|(a, b)| a + (b - a) * t).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{JointTarget, MotionType};
    use crate::tool::Tool;
    use nalgebra::{Point3, Vector3};

    fn down_facing(origin: Point3<f64>) -> Plane {
        Plane::new(origin, Vector3::x(), -Vector3::y())
    }

    fn linear_to(name: &str, origin: Point3<f64>) -> Action {
        Movement::new(RobotTarget::new(name, down_facing(origin), 0))
            .with_motion_type(MotionType::Linear)
            .into()
    }

    #[test]
    fn test_single_movement() {
        let robot = RobotModel::irb2600_12_165();
        let path = PathGenerator::new(&robot).calculate(&[linear_to("p10", Point3::new(900.0, 0.0, 500.0))], 10);
        assert_eq!(path.len(), 1);
        assert!(path.segments.is_empty());
        assert_eq!(path.flags[0], PathFlags::START | PathFlags::TARGET);
    }

    #[test]
    fn test_linear_segment_is_straight() {
        let robot = RobotModel::irb2600_12_165();
        let actions = [
            linear_to("p10", Point3::new(900.0, -200.0, 500.0)),
            linear_to("p20", Point3::new(900.0, 200.0, 500.0)),
        ];
        let path = PathGenerator::new(&robot).calculate(&actions, 8);
        assert!(path.error_text.is_empty(), "{:?}", path.error_text);
        assert_eq!(path.len(), 9);
        assert_eq!(path.segments.len(), 1);
        assert_eq!(path.segments[0].steps.len(), 9);
        for (i, plane) in path.planes.iter().enumerate() {
            let expected = Point3::new(900.0, -200.0 + 50.0 * i as f64, 500.0);
            assert!((plane.origin - expected).norm() < 1e-6, "step {} at {:?}", i, plane.origin);
        }
        assert_eq!(path.curves.len(), 1);
    }

    #[test]
    fn test_joint_segment_interpolates_axes() {
        let robot = RobotModel::irb2600_12_165();
        let actions: Vec<Action> = vec![
            Movement::new(JointTarget::new("home", [0.0, 0.0, 0.0, 0.0, 30.0, 0.0])).into(),
            Movement::new(JointTarget::new("side", [40.0, 10.0, 10.0, 0.0, 30.0, 20.0])).into(),
        ];
        let path = PathGenerator::new(&robot).calculate(&actions, 4);
        assert_eq!(path.internal_axis_values.len(), 5);
        assert_eq!(path.internal_axis_values[2], [20.0, 5.0, 5.0, 0.0, 30.0, 10.0]);
        assert!(path.flags[4].contains(PathFlags::TARGET | PathFlags::JOINT_INTERP));
    }

    #[test]
    fn test_unreachable_movement_is_skipped() {
        let robot = RobotModel::irb2600_12_165();
        let actions = [
            linear_to("p10", Point3::new(900.0, 0.0, 500.0)),
            linear_to("moon", Point3::new(9000.0, 0.0, 500.0)),
            linear_to("p20", Point3::new(900.0, 100.0, 500.0)),
        ];
        let path = PathGenerator::new(&robot).calculate(&actions, 2);
        assert_eq!(path.segments.len(), 1);
        assert_eq!(path.segments[0].to, "p20");
        assert!(!path.error_text.is_empty());
    }

    #[test]
    fn test_zero_interpolations() {
        let robot = RobotModel::irb2600_12_165();
        let actions = [
            linear_to("p10", Point3::new(900.0, 0.0, 500.0)),
            linear_to("p20", Point3::new(900.0, 100.0, 500.0)),
        ];
        let path = PathGenerator::new(&robot).calculate(&actions, 0);
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn test_tool_override_action() {
        let robot = RobotModel::irb2600_12_165();
        let stick = Tool::new("stick", Plane::world_xy(), Plane::world_xy().translate(&Vector3::new(0.0, 0.0, 200.0)));
        let actions = [
            linear_to("p10", Point3::new(900.0, 0.0, 500.0)),
            Action::OverrideRobotTool(stick),
            linear_to("p20", Point3::new(900.0, 100.0, 400.0)),
        ];
        let path = PathGenerator::new(&robot).calculate(&actions, 4);
        assert!(path.flags[4].contains(PathFlags::TOOL_CHANGED));
        // The stick tip reaches the target.
        assert!((path.planes[4].origin - Point3::new(900.0, 100.0, 400.0)).norm() < 1e-6);
        let fk = ForwardKinematics::new(&robot).calculate(&path.internal_axis_values[4], &[]);
        // Without the stick, the flange stays 200 mm above.
        assert!((fk.tcp_plane.origin - Point3::new(900.0, 100.0, 600.0)).norm() < 1e-6);
    }
}
