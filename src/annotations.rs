use crate::kinematic_traits::Joints;
use crate::plane::Plane;
use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Flags that can be set on path steps in the output
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct PathFlags: u32 {
        const NONE = 0b0000_0000;

        /// First step of the whole path.
        const START =               0b0000_0001;

        /// Step is the resolved target of one of the movements given in the input.
        const TARGET =              0b0000_0010;

        /// The movement INTO this step interpolates axis values; the TCP between targets
        /// follows whatever curve the axes produce.
        const JOINT_INTERP =        0b0000_0100;

        /// The movement INTO this step interpolates the TCP plane linearly (Cartesian stroke).
        const LIN_INTERP =          0b0000_1000;

        /// Some internal or external axis is outside its limits at this step.
        const LIMITS =              0b0001_0000;

        /// The tool was changed by an action before the movement into this step.
        const TOOL_CHANGED =        0b0010_0000;
    }
}

/// One step of a generated path, specifying if it is reached by joint or Cartesian move
/// (to this step, not from).
#[derive(Debug, Clone, PartialEq)]
pub struct PathStep {
    /// TCP plane, world coordinates.
    pub plane: Plane,
    pub internal_axis_values: Joints,
    pub external_axis_values: Vec<f64>,
    pub flags: PathFlags,
}

fn flag_representation(flags: &PathFlags) -> String {
    const FLAG_MAP: &[(PathFlags, &str)] = &[
        (PathFlags::START, "START"),
        (PathFlags::TARGET, "TARGET"),
        // Interpolation flags
        (PathFlags::JOINT_INTERP, "JOINT_INTERP"),
        (PathFlags::LIN_INTERP, "LIN_INTERP"),
        (PathFlags::LIMITS, "LIMITS"),
        (PathFlags::TOOL_CHANGED, "TOOL_CHANGED"),
    ];

    FLAG_MAP
        .iter()
        .filter(|(flag, _)| flags.contains(*flag))
        .map(|(_, name)| *name)
        .collect::<Vec<_>>()
        .join(" | ")
}

impl fmt::Debug for PathFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag_string = flag_representation(self);
        write!(f, "{}", flag_string)
    }
}

impl fmt::Display for PathStep {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let origin = self.plane.origin;
        let joints: Vec<String> = self.internal_axis_values.iter().map(|q| format!("{:.2}", q)).collect();
        write!(
            formatter,
            "{{ tcp: [{:.3}, {:.3}, {:.3}], axes: [{}], external: {:?}, flags: {:?} }}",
            origin.x,
            origin.y,
            origin.z,
            joints.join(", "),
            self.external_axis_values,
            self.flags
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_representation() {
        assert_eq!(format!("{:?}", PathFlags::TARGET | PathFlags::LIN_INTERP), "TARGET | LIN_INTERP");
        assert_eq!(format!("{:?}", PathFlags::NONE), "");
    }
}
