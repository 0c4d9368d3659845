//! Multi-agent traffic-signal control exposed as a step-wise RL environment.
//!
//! Each controlled intersection is observed as
//! `[phase_id, duration_bucket, ns_occupancy_bucket, ew_occupancy_bucket]`,
//! packed into a single state id with a mixed-radix codec, and rewarded by
//! the drop in its average queue of halted vehicles.

pub mod config;
pub mod discretizer;
pub mod environment;
pub mod observation;
pub mod radix;
pub mod scripted;
pub mod simulator;
pub mod traffic_signal;

pub use config::{ConfigError, EnvConfig};
pub use environment::{
    Action, Actions, EnvError, Environment, EpisodeState, Observations, Rewards, StepInfo,
    StepResult,
};
pub use observation::{Observation, ObservationSpace, StateId};
pub use radix::{RadixCodec, RadixError};
pub use scripted::{Frame, Script, ScriptedSimulator};
pub use simulator::{IntersectionId, SimError, Simulator};
pub use traffic_signal::{DirectionCounts, GreenLimits, StoppedCounts, TrafficSignal};
