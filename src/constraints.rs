//! Axis limits: closed intervals for single axes and the set of limits for the six
//! internal axes of the robot.

use crate::error::{AxisKind, KinematicsError};
use crate::kinematic_traits::Joints;

/// Closed interval [min, max], degrees for rotational and millimeters for linear axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisLimits {
    min: f64,
    max: f64,
}

impl AxisLimits {
    pub fn new(min: f64, max: f64) -> Result<Self, KinematicsError> {
        if !(min.is_finite() && max.is_finite()) {
            return Err(KinematicsError::InvalidInput(format!(
                "axis limits must be finite, got [{}, {}]", min, max
            )));
        }
        if min > max {
            return Err(KinematicsError::InvalidInput(format!(
                "lower axis limit {} exceeds upper limit {}", min, max
            )));
        }
        Ok(AxisLimits { min, max })
    }

    /// Symmetric limits [-value, value].
    pub fn symmetric(value: f64) -> Result<Self, KinematicsError> {
        Self::new(-value.abs(), value.abs())
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn length(&self) -> f64 {
        self.max - self.min
    }

    pub fn includes(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// The value itself if inside, otherwise the nearest bound.
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// Limits of the six internal axes, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointLimits {
    pub limits: [AxisLimits; 6],
}

impl JointLimits {
    pub fn new(limits: [AxisLimits; 6]) -> Self {
        JointLimits { limits }
    }

    /// Builds the limits from (min, max) pairs in degrees.
    pub fn from_degrees(pairs: [(f64, f64); 6]) -> Result<Self, KinematicsError> {
        let mut limits = [AxisLimits { min: 0.0, max: 0.0 }; 6];
        for (i, (min, max)) in pairs.iter().enumerate() {
            limits[i] = AxisLimits::new(*min, *max)?;
        }
        Ok(JointLimits { limits })
    }

    /// Limits for built-in presets. Pairs are ordered here, so this cannot fail.
    pub(crate) fn from_ordered(pairs: [(f64, f64); 6]) -> Self {
        JointLimits {
            limits: pairs.map(|(a, b)| AxisLimits { min: a.min(b), max: a.max(b) }),
        }
    }

    /// Per axis check, true where the value is inside its limits.
    pub fn in_limits(&self, joints: &Joints) -> [bool; 6] {
        std::array::from_fn(|i| self.limits[i].includes(joints[i]))
    }

    pub fn compliant(&self, joints: &Joints) -> bool {
        self.in_limits(joints).iter().all(|&ok| ok)
    }

    /// One violation for each axis outside its limits.
    pub fn violations(&self, joints: &Joints) -> Vec<KinematicsError> {
        self.in_limits(joints)
            .iter()
            .enumerate()
            .filter(|(_, ok)| !**ok)
            .map(|(i, _)| KinematicsError::limit_violation(AxisKind::Internal, i))
            .collect()
    }

    pub fn filter(&self, angles: &[Joints]) -> Vec<Joints> {
        angles
            .iter()
            .filter(|joints| self.compliant(joints))
            .cloned()
            .collect()
    }
}
