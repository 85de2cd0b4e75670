pub mod config;
pub mod constants;

pub use config::{AnalysisConfig, CutConfig, FlattenConfig, InputConfig, PairingPolicy, PhysicsConfig};
