// simulator.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable key the simulator uses for one signalised intersection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntersectionId(pub String);

impl IntersectionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IntersectionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IntersectionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for IntersectionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Failures reported by the simulator connection.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("failed to start scenario '{scenario}': {reason}")]
    Start { scenario: String, reason: String },
    #[error("unknown intersection {0}")]
    UnknownIntersection(IntersectionId),
    #[error("simulator connection failed: {0}")]
    Connection(String),
    #[error("simulator is not running")]
    Closed,
}

/// Control channel to an external microscopic traffic simulator.
///
/// Calls are synchronous and may be slow. The environment owns exactly one
/// implementation for the lifetime of an episode and never retries a failed
/// call. Directional readings are ordered `(north-south, east-west)`.
pub trait Simulator {
    /// Loads `scenario` and starts the run, visible when `render` is set.
    fn start(&mut self, scenario: &str, render: bool) -> Result<(), SimError>;

    fn traffic_light_ids(&self) -> Result<Vec<IntersectionId>, SimError>;

    /// Advances simulated time by one tick.
    fn simulation_step(&mut self) -> Result<(), SimError>;

    /// Simulated seconds since the run started.
    fn current_time(&self) -> Result<f64, SimError>;

    /// Seconds of simulated time covered by one tick.
    fn tick_length(&self) -> f64 {
        1.0
    }

    /// Raw phase index of the signal program. Steady phases use even indices.
    fn phase(&self, id: &IntersectionId) -> Result<u32, SimError>;

    fn occupancy(&self, id: &IntersectionId) -> Result<(f64, f64), SimError>;

    fn halted_vehicles(&self, id: &IntersectionId) -> Result<(u32, u32), SimError>;

    /// Holds the current phase for at least `seconds` more.
    fn keep_phase(&mut self, id: &IntersectionId, seconds: f64) -> Result<(), SimError>;

    /// Moves the signal on to the next phase of its cycle.
    fn change_phase(&mut self, id: &IntersectionId) -> Result<(), SimError>;

    fn close(&mut self) -> Result<(), SimError>;
}

impl<S: Simulator + ?Sized> Simulator for Box<S> {
    fn start(&mut self, scenario: &str, render: bool) -> Result<(), SimError> {
        (**self).start(scenario, render)
    }

    fn traffic_light_ids(&self) -> Result<Vec<IntersectionId>, SimError> {
        (**self).traffic_light_ids()
    }

    fn simulation_step(&mut self) -> Result<(), SimError> {
        (**self).simulation_step()
    }

    fn current_time(&self) -> Result<f64, SimError> {
        (**self).current_time()
    }

    fn tick_length(&self) -> f64 {
        (**self).tick_length()
    }

    fn phase(&self, id: &IntersectionId) -> Result<u32, SimError> {
        (**self).phase(id)
    }

    fn occupancy(&self, id: &IntersectionId) -> Result<(f64, f64), SimError> {
        (**self).occupancy(id)
    }

    fn halted_vehicles(&self, id: &IntersectionId) -> Result<(u32, u32), SimError> {
        (**self).halted_vehicles(id)
    }

    fn keep_phase(&mut self, id: &IntersectionId, seconds: f64) -> Result<(), SimError> {
        (**self).keep_phase(id, seconds)
    }

    fn change_phase(&mut self, id: &IntersectionId) -> Result<(), SimError> {
        (**self).change_phase(id)
    }

    fn close(&mut self) -> Result<(), SimError> {
        (**self).close()
    }
}
