// observation.rs
use serde::{Deserialize, Serialize};

use crate::discretizer::{DURATION_BUCKETS, OCCUPANCY_BUCKETS};

/// Number of components in one intersection observation.
pub const OBSERVATION_DIMS: usize = 4;

/// Number of logical signal phases an observation distinguishes (NS or EW green).
pub const PHASE_COUNT: u32 = 2;

/// Radix-encoded observation handed to the agent.
pub type StateId = u64;

/// Discretized view of one intersection:
/// `[phase_id, duration_bucket, ns_occupancy_bucket, ew_occupancy_bucket]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Observation(pub [u32; OBSERVATION_DIMS]);

impl Observation {
    pub fn new(phase_id: u32, duration: u32, ns_occupancy: u32, ew_occupancy: u32) -> Self {
        Self([phase_id, duration, ns_occupancy, ew_occupancy])
    }

    pub fn phase_id(&self) -> u32 {
        self.0[0]
    }

    pub fn duration_bucket(&self) -> u32 {
        self.0[1]
    }

    pub fn ns_occupancy_bucket(&self) -> u32 {
        self.0[2]
    }

    pub fn ew_occupancy_bucket(&self) -> u32 {
        self.0[3]
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }
}

/// Tuple of discrete spaces an observation lives in. The sizes double as the
/// radix factors of the state id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationSpace {
    sizes: [u32; OBSERVATION_DIMS],
}

impl Default for ObservationSpace {
    fn default() -> Self {
        Self {
            sizes: [PHASE_COUNT, DURATION_BUCKETS, OCCUPANCY_BUCKETS, OCCUPANCY_BUCKETS],
        }
    }
}

impl ObservationSpace {
    pub fn radix_factors(&self) -> [u32; OBSERVATION_DIMS] {
        self.sizes
    }

    /// Total number of distinct state ids.
    pub fn n_states(&self) -> u64 {
        self.sizes.iter().map(|&n| u64::from(n)).product()
    }

    pub fn contains(&self, observation: &Observation) -> bool {
        observation
            .0
            .iter()
            .zip(&self.sizes)
            .all(|(value, size)| value < size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_space_matches_signal_radices() {
        let space = ObservationSpace::default();
        assert_eq!(space.radix_factors(), [2, 9, 10, 10]);
        assert_eq!(space.n_states(), 1800);
    }

    #[test]
    fn contains_checks_every_component() {
        let space = ObservationSpace::default();
        assert!(space.contains(&Observation::new(1, 8, 9, 9)));
        assert!(!space.contains(&Observation::new(2, 0, 0, 0)));
        assert!(!space.contains(&Observation::new(0, 9, 0, 0)));
        assert!(!space.contains(&Observation::new(0, 0, 0, 10)));
    }

    #[test]
    fn named_accessors_follow_component_order() {
        let obs = Observation::new(1, 1, 0, 9);
        assert_eq!(obs.phase_id(), 1);
        assert_eq!(obs.duration_bucket(), 1);
        assert_eq!(obs.ns_occupancy_bucket(), 0);
        assert_eq!(obs.ew_occupancy_bucket(), 9);
        assert_eq!(obs.as_slice(), &[1, 1, 0, 9]);
    }
}
