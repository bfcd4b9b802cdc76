//! Supports reading the robot description from YAML file (optional)

use std::path::Path;

use nalgebra::{Point3, Quaternion, UnitQuaternion, Vector3};
use serde::Deserialize;

use crate::constraints::{AxisLimits, JointLimits};
use crate::external_axis::{ExternalAxis, ExternalLinearAxis, ExternalRotationalAxis};
use crate::parameter_error::ParameterError;
use crate::plane::Plane;
use crate::robot::RobotModel;
use crate::tool::{LoadData, Tool};

#[derive(Deserialize)]
struct PlaneRecord {
    origin: Vec<f64>,
    #[serde(default = "default_x_axis")]
    x_axis: Vec<f64>,
    #[serde(default = "default_y_axis")]
    y_axis: Vec<f64>,
}

fn default_x_axis() -> Vec<f64> { vec![1.0, 0.0, 0.0] }
fn default_y_axis() -> Vec<f64> { vec![0.0, 1.0, 0.0] }

#[derive(Deserialize)]
struct AxisRecord {
    origin: Vec<f64>,
    /// Rotation axis, positive direction by the right hand rule.
    axis: Vec<f64>,
    /// [min, max], degrees.
    limits: Vec<f64>,
}

#[derive(Deserialize)]
struct LoadRecord {
    mass: f64,
    #[serde(default)]
    center_of_gravity: Option<Vec<f64>>,
    /// Quaternion [w, x, y, z] of the principal axes of inertia.
    #[serde(default)]
    center_of_gravity_orientation: Option<Vec<f64>>,
    #[serde(default)]
    moments_of_inertia: Option<Vec<f64>>,
}

#[derive(Deserialize)]
struct ToolRecord {
    name: String,
    attachment_plane: PlaneRecord,
    tool_plane: PlaneRecord,
    #[serde(default)]
    load: Option<LoadRecord>,
}

#[derive(Deserialize, Clone, Copy, PartialEq, Debug)]
#[serde(rename_all = "lowercase")]
enum ExternalAxisKind {
    Linear,
    Rotational,
}

#[derive(Deserialize)]
struct ExternalAxisRecord {
    kind: ExternalAxisKind,
    name: String,
    #[serde(default)]
    axis_number: Option<usize>,
    /// Linear axes only, defaults to the axis plane.
    #[serde(default)]
    attachment_plane: Option<PlaneRecord>,
    axis_plane: PlaneRecord,
    limits: Vec<f64>,
}

#[derive(Deserialize)]
struct Root {
    name: String,
    #[serde(default)]
    base_plane: Option<PlaneRecord>,
    mounting_frame: PlaneRecord,
    axes: Vec<AxisRecord>,
    #[serde(default)]
    tool: Option<ToolRecord>,
    #[serde(default)]
    external_axes: Vec<ExternalAxisRecord>,
}

impl RobotModel {
    /// Read the robot description from YAML file. YAML file like this is supported:
    /// ```yaml
    /// name: IRB2600-12/1.65
    /// base_plane: { origin: [0, 0, 0] }
    /// mounting_frame: { origin: [1030, 0, 1260], x_axis: [0, 0, -1], y_axis: [0, 1, 0] }
    /// axes:
    ///   - { origin: [0, 0, 0], axis: [0, 0, 1], limits: [-180, 180] }
    ///   - { origin: [150, 0, 445], axis: [0, 1, 0], limits: [-95, 155] }
    ///   - { origin: [150, 0, 1145], axis: [0, 1, 0], limits: [-180, 75] }
    ///   - { origin: [547.5, 0, 1260], axis: [1, 0, 0], limits: [-400, 400] }
    ///   - { origin: [945, 0, 1260], axis: [0, 1, 0], limits: [-120, 120] }
    ///   - { origin: [1030, 0, 1260], axis: [1, 0, 0], limits: [-400, 400] }
    /// tool:
    ///   name: gripper
    ///   attachment_plane: { origin: [0, 0, 0] }
    ///   tool_plane: { origin: [0, 0, 200] }
    ///   load: { mass: 2.5, center_of_gravity: [0, 0, 80] }
    /// external_axes:
    ///   - kind: linear
    ///     name: track
    ///     axis_plane: { origin: [0, 0, 0], x_axis: [0, 1, 0], y_axis: [0, 0, 1] }
    ///     limits: [0, 3000]
    /// ```
    /// Plane axes default to the world X and Y directions; base plane, tool and external
    /// axes are optional.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ParameterError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ParameterError> {
        let root: Root =
            serde_saphyr::from_str(contents).map_err(|e| ParameterError::ParseError(format!("{}", e)))?;

        if root.axes.len() != 6 {
            return Err(ParameterError::InvalidLength {
                field: "axes".to_string(),
                expected: 6,
                found: root.axes.len(),
            });
        }

        let mut planes = [Plane::world_xy(); 6];
        let mut limits = Vec::with_capacity(6);
        for (i, axis) in root.axes.iter().enumerate() {
            let origin = point(&axis.origin, &format!("axes[{}].origin", i))?;
            let direction = vector(&axis.axis, &format!("axes[{}].axis", i))?;
            if direction.norm() == 0.0 {
                return Err(ParameterError::ParseError(format!("axes[{}].axis must not be zero", i)));
            }
            planes[i] = Plane::from_normal(origin, direction);
            limits.push(axis_limits(&axis.limits, &format!("axes[{}].limits", i))?);
        }
        let limits: [AxisLimits; 6] = std::array::from_fn(|i| limits[i]);

        let base_plane = match &root.base_plane {
            Some(record) => plane(record, "base_plane")?,
            None => Plane::world_xy(),
        };
        let mounting_frame = plane(&root.mounting_frame, "mounting_frame")?;

        let tool = match &root.tool {
            Some(record) => tool(record)?,
            None => Tool::default_tool(),
        };

        let external_axes = root
            .external_axes
            .iter()
            .enumerate()
            .map(|(i, record)| external_axis(record, i))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RobotModel::new(
            &root.name,
            planes,
            JointLimits::new(limits),
            base_plane,
            mounting_frame,
            tool,
            external_axes,
        )?)
    }

    /// Serializes the description into the YAML format read by
    /// [`from_yaml_str`](RobotModel::from_yaml_str).
    pub fn to_yaml(&self) -> String {
        let mut yaml = format!(
            "name: {}\n\
            base_plane: {}\n\
            mounting_frame: {}\n\
            axes:\n",
            quoted(&self.name),
            plane_yaml(&self.base_plane),
            plane_yaml(&self.mounting_frame)
        );
        for (plane, limits) in self.internal_axis_planes.iter().zip(&self.internal_axis_limits.limits) {
            yaml += &format!(
                "  - {{ origin: {}, axis: {}, limits: [{}, {}] }}\n",
                list(plane.origin.coords.iter()),
                list(plane.z_axis.iter()),
                limits.min(),
                limits.max()
            );
        }
        let load = self.tool.load();
        yaml += &format!(
            "tool:\n  \
              name: {}\n  \
              attachment_plane: {}\n  \
              tool_plane: {}\n  \
              load: {{ mass: {}, center_of_gravity: {}, center_of_gravity_orientation: {}, moments_of_inertia: {} }}\n",
            quoted(self.tool.name()),
            plane_yaml(self.tool.attachment_plane()),
            plane_yaml(self.tool.tool_plane()),
            load.mass,
            list(load.center_of_gravity.coords.iter()),
            list(quaternion_wxyz(&load.center_of_gravity_orientation).iter()),
            list(load.moments_of_inertia.iter())
        );
        if !self.external_axes.is_empty() {
            yaml += "external_axes:\n";
        }
        for axis in &self.external_axes {
            let kind = if axis.is_linear() { "linear" } else { "rotational" };
            yaml += &format!("  - kind: {}\n    name: {}\n", kind, quoted(axis.name()));
            if let Some(number) = axis.axis_number() {
                yaml += &format!("    axis_number: {}\n", number);
            }
            if axis.is_linear() {
                yaml += &format!("    attachment_plane: {}\n", plane_yaml(axis.attachment_plane()));
            }
            yaml += &format!(
                "    axis_plane: {}\n    limits: [{}, {}]\n",
                plane_yaml(axis.axis_plane()),
                axis.axis_limits().min(),
                axis.axis_limits().max()
            );
        }
        yaml
    }
}

fn external_axis(record: &ExternalAxisRecord, index: usize) -> Result<ExternalAxis, ParameterError> {
    let label = format!("external_axes[{}]", index);
    let axis_plane = plane(&record.axis_plane, &format!("{}.axis_plane", label))?;
    let limits = axis_limits(&record.limits, &format!("{}.limits", label))?;
    let axis: ExternalAxis = match record.kind {
        ExternalAxisKind::Linear => {
            let attachment_plane = match &record.attachment_plane {
                Some(attachment) => plane(attachment, &format!("{}.attachment_plane", label))?,
                None => axis_plane,
            };
            ExternalLinearAxis::new(&record.name, attachment_plane, axis_plane, limits).into()
        }
        ExternalAxisKind::Rotational => {
            if record.attachment_plane.is_some() {
                return Err(ParameterError::ParseError(format!(
                    "{}: rotational axis '{}' is attached at its axis plane, attachment_plane is not accepted",
                    label, record.name
                )));
            }
            ExternalRotationalAxis::new(&record.name, axis_plane, limits).into()
        }
    };
    Ok(match record.axis_number {
        Some(number) => axis.with_axis_number(number),
        None => axis,
    })
}

fn tool(record: &ToolRecord) -> Result<Tool, ParameterError> {
    let attachment_plane = plane(&record.attachment_plane, "tool.attachment_plane")?;
    let tool_plane = plane(&record.tool_plane, "tool.tool_plane")?;
    let load = match &record.load {
        Some(load) => {
            if !(load.mass.is_finite() && load.mass > 0.0) {
                return Err(ParameterError::ParseError(format!(
                    "tool.load.mass must be positive (got {})", load.mass
                )));
            }
            let defaults = LoadData::default();
            let center_of_gravity = match &load.center_of_gravity {
                Some(cog) => point(cog, "tool.load.center_of_gravity")?,
                None => defaults.center_of_gravity,
            };
            let center_of_gravity_orientation = match &load.center_of_gravity_orientation {
                Some(q) => orientation(q, "tool.load.center_of_gravity_orientation")?,
                None => defaults.center_of_gravity_orientation,
            };
            let moments_of_inertia = match &load.moments_of_inertia {
                Some(moments) => vector(moments, "tool.load.moments_of_inertia")?,
                None => defaults.moments_of_inertia,
            };
            LoadData { mass: load.mass, center_of_gravity, center_of_gravity_orientation, moments_of_inertia }
        }
        None => LoadData::default(),
    };
    Ok(Tool::with_load(&record.name, attachment_plane, tool_plane, load))
}

fn plane(record: &PlaneRecord, label: &str) -> Result<Plane, ParameterError> {
    let plane = Plane::new(
        point(&record.origin, &format!("{}.origin", label))?,
        vector(&record.x_axis, &format!("{}.x_axis", label))?,
        vector(&record.y_axis, &format!("{}.y_axis", label))?,
    );
    if !plane.is_valid() {
        return Err(ParameterError::ParseError(format!(
            "{}: x_axis and y_axis must be non zero and not parallel", label
        )));
    }
    Ok(plane)
}

fn axis_limits(values: &[f64], label: &str) -> Result<AxisLimits, ParameterError> {
    let [min, max] = finite::<2>(values, label)?;
    Ok(AxisLimits::new(min, max)?)
}

fn point(values: &[f64], label: &str) -> Result<Point3<f64>, ParameterError> {
    Ok(Point3::from(vector(values, label)?))
}

fn vector(values: &[f64], label: &str) -> Result<Vector3<f64>, ParameterError> {
    let [x, y, z] = finite::<3>(values, label)?;
    Ok(Vector3::new(x, y, z))
}

fn orientation(values: &[f64], label: &str) -> Result<UnitQuaternion<f64>, ParameterError> {
    let [w, x, y, z] = finite::<4>(values, label)?;
    let q = Quaternion::new(w, x, y, z);
    let norm = q.norm();
    if norm == 0.0 {
        return Err(ParameterError::ParseError(format!("{} must not be zero", label)));
    }
    // Written quaternions are already unit, keep them bit exact.
    if (norm - 1.0).abs() < 1e-12 {
        Ok(UnitQuaternion::new_unchecked(q))
    } else {
        Ok(UnitQuaternion::from_quaternion(q))
    }
}

/// Checks the length and that all values are finite.
fn finite<const N: usize>(values: &[f64], label: &str) -> Result<[f64; N], ParameterError> {
    let array: [f64; N] = values.try_into().map_err(|_| ParameterError::InvalidLength {
        field: label.to_string(),
        expected: N,
        found: values.len(),
    })?;
    if let Some(value) = array.iter().find(|v| !v.is_finite()) {
        return Err(ParameterError::ParseError(format!("{} must be finite (got {})", label, value)));
    }
    Ok(array)
}

fn list<'a>(values: impl Iterator<Item = &'a f64>) -> String {
    format!("[{}]", values.map(|v| v.to_string()).collect::<Vec<_>>().join(", "))
}

fn quaternion_wxyz(q: &UnitQuaternion<f64>) -> [f64; 4] {
    [q.w, q.i, q.j, q.k]
}

/// Double quoted YAML scalar.
fn quoted(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn plane_yaml(plane: &Plane) -> String {
    format!(
        "{{ origin: {}, x_axis: {}, y_axis: {} }}",
        list(plane.origin.coords.iter()),
        list(plane.x_axis.iter()),
        list(plane.y_axis.iter())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROBOT_FILE: &str = "src/tests/data/irb2600_on_track.yaml";

    #[test]
    fn test_robot_from_yaml_file() {
        let robot = RobotModel::from_yaml_file(ROBOT_FILE).expect("Failed to load robot from file");
        assert_eq!(robot.name, "IRB2600-12/1.65 on track");
        assert_eq!(robot.tool.name(), "gripper");
        assert!((robot.tool.load().mass - 2.5).abs() < 1e-12);
        assert_eq!(robot.external_axes.len(), 1);
        assert!(robot.external_axes[0].is_linear());
        assert_eq!(robot.internal_axis_limits.limits[1].min(), -95.0);

        let preset = RobotModel::irb2600_12_165();
        for (loaded, expected) in robot.internal_axis_planes.iter().zip(&preset.internal_axis_planes) {
            assert!((loaded.origin - expected.origin).norm() < 1e-9);
            assert!((loaded.z_axis - expected.z_axis).norm() < 1e-9);
        }
        assert!(robot.mounting_frame.approx_eq(&preset.mounting_frame, 1e-9, 1e-9));
    }

    #[test]
    fn test_yaml_round_trip_through_to_yaml() {
        let robot = RobotModel::from_yaml_file(ROBOT_FILE).expect("Failed to load robot from file");
        let reloaded = RobotModel::from_yaml_str(&robot.to_yaml()).expect("Failed to parse written yaml");
        assert_eq!(reloaded.name, robot.name);
        assert_eq!(reloaded.external_axes.len(), robot.external_axes.len());
        assert!(reloaded.tcp_plane().approx_eq(&robot.tcp_plane(), 1e-9, 1e-9));
    }

    #[test]
    fn test_tool_load_survives_to_yaml() {
        let load = LoadData {
            mass: 4.2,
            center_of_gravity: Point3::new(10.0, -5.0, 120.0),
            center_of_gravity_orientation: UnitQuaternion::from_euler_angles(0.1, 0.2, 0.3),
            moments_of_inertia: Vector3::new(0.01, 0.02, 0.03),
        };
        let tool = Tool::with_load(
            "welder",
            Plane::world_xy(),
            Plane::world_xy().translate(&Vector3::new(0.0, 50.0, 300.0)),
            load,
        );
        let robot = RobotModel::irb2600_12_165().with_tool(tool);
        let reloaded = RobotModel::from_yaml_str(&robot.to_yaml()).expect("Failed to parse written yaml");
        assert_eq!(reloaded.tool.load(), robot.tool.load());
        assert!(reloaded.tcp_plane().approx_eq(&robot.tcp_plane(), 1e-9, 1e-9));
    }

    #[test]
    fn test_names_are_quoted_in_yaml() {
        let robot = RobotModel::from_yaml_file(ROBOT_FILE).expect("Failed to load robot from file");
        let mut named = robot.with_tool(Tool::new("tool \"A\" #2", Plane::world_xy(), Plane::world_xy()));
        named.name = "cell: A #1".to_string();

        let reloaded = RobotModel::from_yaml_str(&named.to_yaml()).expect("Failed to parse written yaml");
        assert_eq!(reloaded.name, "cell: A #1");
        assert_eq!(reloaded.tool.name(), "tool \"A\" #2");
        assert_eq!(reloaded.external_axes[0].name(), robot.external_axes[0].name());
    }

    #[test]
    fn test_wrong_axis_count() {
        let yaml = "name: short\n\
            mounting_frame: { origin: [0, 0, 0] }\n\
            axes:\n  - { origin: [0, 0, 0], axis: [0, 0, 1], limits: [-180, 180] }\n";
        match RobotModel::from_yaml_str(yaml) {
            Err(ParameterError::InvalidLength { field, expected, found }) => {
                assert_eq!(field, "axes");
                assert_eq!(expected, 6);
                assert_eq!(found, 1);
            }
            other => panic!("Expected InvalidLength, got {:?}", other.map(|r| r.name)),
        }
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            RobotModel::from_yaml_file("src/tests/data/no_such_robot.yaml"),
            Err(ParameterError::IoError(_))
        ));
    }

    #[test]
    fn test_malformed_yaml() {
        assert!(matches!(
            RobotModel::from_yaml_str("name: [unclosed"),
            Err(ParameterError::ParseError(_))
        ));
    }
}
