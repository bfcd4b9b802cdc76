//! Command line front end: poses a robot, solves targets and generates paths between axis
//! positions, for one of the built in robots or a robot described in a YAML file.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use nalgebra::{Point3, Vector3};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use robot_kinematics::forward_kinematics::ForwardKinematics;
use robot_kinematics::inverse_kinematics::InverseKinematics;
use robot_kinematics::kinematic_traits::Joints;
use robot_kinematics::path_generator::PathGenerator;
use robot_kinematics::plane::Plane;
use robot_kinematics::robot::RobotModel;
use robot_kinematics::target::{Action, JointTarget, MotionType, Movement, RobotTarget};
use robot_kinematics::utils::{dump_joints, dump_plane};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Built in robot (irb1600, irb2400, irb2600, irb4600) or path to a robot YAML file.
    #[arg(short, long, default_value = "irb2600")]
    robot: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pose the robot for the given axis values and print the TCP.
    Fk {
        /// Internal axis values, degrees.
        #[arg(short, long, value_delimiter = ',', allow_hyphen_values = true)]
        joints: Vec<f64>,

        /// External axis values, one per external axis of the robot.
        #[arg(short, long, value_delimiter = ',', allow_hyphen_values = true)]
        external: Vec<f64>,
    },

    /// Solve a TCP plane given in world coordinates and print all configurations.
    Ik {
        /// TCP origin, millimeters.
        #[arg(short, long, value_delimiter = ',', allow_hyphen_values = true)]
        origin: Vec<f64>,

        /// TCP X axis direction.
        #[arg(short, long, value_delimiter = ',', allow_hyphen_values = true, default_value = "0,0,-1")]
        x_axis: Vec<f64>,

        /// TCP Y axis direction.
        #[arg(short, long, value_delimiter = ',', allow_hyphen_values = true, default_value = "0,1,0")]
        y_axis: Vec<f64>,

        /// Selected axis configuration, 0 to 7.
        #[arg(short, long, default_value_t = 0)]
        config: usize,
    },

    /// Generate a path between two axis positions.
    Path {
        #[arg(short, long, value_delimiter = ',', allow_hyphen_values = true)]
        from: Vec<f64>,

        #[arg(short, long, value_delimiter = ',', allow_hyphen_values = true)]
        to: Vec<f64>,

        /// Move the TCP along a straight line instead of interpolating axis values.
        #[arg(short, long)]
        linear: bool,

        /// Interpolation steps per movement.
        #[arg(short, long, default_value_t = 10)]
        steps: usize,
    },

    /// Print the robot description as YAML.
    Show,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let robot = load_robot(&cli.robot)?;
    info!("Robot '{}' with {} external axes", robot.name, robot.external_axes.len());

    match cli.command {
        Commands::Fk { joints, external } => {
            let joints = joints_of(&joints, "joints")?;
            let posed = ForwardKinematics::new(&robot).calculate(&joints, &external);
            for (i, plane) in posed.posed_internal_axis_planes.iter().enumerate() {
                debug!("Axis {}: {:?}", i + 1, plane.origin);
            }
            println!("TCP:");
            dump_plane(&posed.tcp_plane);
            for message in &posed.error_text {
                println!("{}", message);
            }
        }
        Commands::Ik { origin, x_axis, y_axis, config } => {
            if config > 7 {
                bail!("axis configuration must be 0 to 7, got {}", config);
            }
            let plane = Plane::new(
                Point3::from(vector_of(&origin, "origin")?),
                vector_of(&x_axis, "x-axis")?,
                vector_of(&y_axis, "y-axis")?,
            );
            if !plane.is_valid() {
                bail!("x-axis and y-axis must be non zero and not parallel");
            }
            let movement = Movement::new(RobotTarget::new("target", plane, config));
            let solved = InverseKinematics::new(&robot).calculate(&movement);
            for (i, solution) in solved.solutions().iter().enumerate() {
                match solution {
                    Ok(joints) => {
                        print!("[{}] ", i);
                        dump_joints(joints);
                    }
                    Err(error) => println!("[{}] {}", i, error),
                }
            }
            for message in &solved.error_text {
                println!("{}", message);
            }
        }
        Commands::Path { from, to, linear, steps } => {
            let motion_type = if linear { MotionType::Linear } else { MotionType::Joint };
            let actions: Vec<Action> = vec![
                Movement::new(JointTarget::new("from", joints_of(&from, "from")?)).into(),
                Movement::new(JointTarget::new("to", joints_of(&to, "to")?))
                    .with_motion_type(motion_type)
                    .into(),
            ];
            let path = PathGenerator::new(&robot).calculate(&actions, steps);
            for step in path.segments.iter().flat_map(|segment| &segment.steps) {
                println!("{}", step);
            }
            for message in &path.error_text {
                println!("{}", message);
            }
        }
        Commands::Show => print!("{}", robot.to_yaml()),
    }
    Ok(())
}

fn load_robot(name: &str) -> Result<RobotModel> {
    Ok(match name {
        "irb1600" => RobotModel::irb1600_6_145(),
        "irb2400" => RobotModel::irb2400_10(),
        "irb2600" => RobotModel::irb2600_12_165(),
        "irb4600" => RobotModel::irb4600_60_205(),
        path => RobotModel::from_yaml_file(path).with_context(|| format!("Failed to load robot from '{}'", path))?,
    })
}

fn joints_of(values: &[f64], label: &str) -> Result<Joints> {
    values
        .try_into()
        .with_context(|| format!("{} needs 6 values, got {}", label, values.len()))
}

fn vector_of(values: &[f64], label: &str) -> Result<Vector3<f64>> {
    match values {
        [x, y, z] => Ok(Vector3::new(*x, *y, *z)),
        _ => bail!("{} needs 3 values, got {}", label, values.len()),
    }
}
