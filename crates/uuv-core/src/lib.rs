pub mod controller;
pub mod error;
pub mod hal;
pub mod hal_sim;
pub mod interpolation;
pub mod motor;
pub mod pid;
pub mod sensors;
pub mod simulator;
pub mod timebase;
pub mod transform;
pub mod vehicle;

/// Three-vector in whichever frame the context names.
pub type Vec3 = nalgebra::Vector3<f64>;
/// Unit quaternion mapping body-frame vectors into the world frame.
pub type Quat = nalgebra::UnitQuaternion<f64>;

/// Standard gravity [m/s²].
pub const GRAVITY: f64 = 9.81;

pub use controller::{
    ControllerGains, MixerConfig, MotionController, MotorMix, RotationAxis, TranslationAxis,
    VehicleState,
};
pub use error::ConfigError;
pub use hal::{BodyId, Frame, PhysicsBackend, Pose, Twist};
pub use hal_sim::{BodyConfig, SimulatedWorld, WorldConfig};
pub use motor::{Motor, MotorLimits};
pub use pid::{Pid, PidGains};
pub use sensors::{Sensor, SensorSample};
pub use simulator::{SimulationStats, Simulator};
pub use timebase::{SimulationClock, SimulationTime};
pub use vehicle::{MotorConfig, Vehicle, VehicleConfig};
