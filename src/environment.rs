// environment.rs
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::config::{ConfigError, EnvConfig};
use crate::discretizer::{bucket_duration, bucket_occupancy};
use crate::observation::{Observation, ObservationSpace, StateId, PHASE_COUNT};
use crate::radix::{RadixCodec, RadixError};
use crate::simulator::{IntersectionId, SimError, Simulator};
use crate::traffic_signal::TrafficSignal;

/// Per-intersection state ids.
pub type Observations = BTreeMap<IntersectionId, StateId>;
/// Per-intersection rewards.
pub type Rewards = BTreeMap<IntersectionId, f64>;
/// Per-intersection commands for one step.
pub type Actions = BTreeMap<IntersectionId, Action>;

#[derive(Debug, Error)]
pub enum EnvError {
    #[error("environment has not been reset")]
    NotReset,
    #[error("invalid action {value} for intersection {id}")]
    InvalidAction { id: IntersectionId, value: u8 },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Radix(#[from] RadixError),
    #[error(transparent)]
    Simulator(#[from] SimError),
}

/// Agent command for one intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Action {
    Keep = 0,
    Change = 1,
}

impl TryFrom<u8> for Action {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Action::Keep),
            1 => Ok(Action::Change),
            other => Err(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeState {
    Uninitialized,
    Running,
    Done,
}

/// Diagnostics returned with every step. Not used by the reward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    /// Simulated seconds elapsed.
    pub step: f64,
    /// Halted vehicles summed over every intersection and direction.
    pub total_stopped: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub observations: Observations,
    pub rewards: Rewards,
    pub done: bool,
    pub info: StepInfo,
}

/// Multi-agent traffic-signal environment over one owned simulator connection.
pub struct Environment<S: Simulator> {
    simulator: S,
    config: EnvConfig,
    observation_space: ObservationSpace,
    codec: RadixCodec,
    traffic_signals: BTreeMap<IntersectionId, TrafficSignal>,
    state: EpisodeState,
}

impl<S: Simulator> Environment<S> {
    /// Validates `config` and fixes the radix factors from the observation space.
    pub fn new(simulator: S, config: EnvConfig) -> Result<Self, EnvError> {
        config.validate()?;
        let observation_space = ObservationSpace::default();
        let codec = RadixCodec::new(observation_space.radix_factors().to_vec())?;
        Ok(Self {
            simulator,
            config,
            observation_space,
            codec,
            traffic_signals: BTreeMap::new(),
            state: EpisodeState::Uninitialized,
        })
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn observation_space(&self) -> ObservationSpace {
        self.observation_space
    }

    /// Keep or change.
    pub fn action_space_size(&self) -> usize {
        2
    }

    pub fn codec(&self) -> &RadixCodec {
        &self.codec
    }

    pub fn state(&self) -> EpisodeState {
        self.state
    }

    pub fn simulator(&self) -> &S {
        &self.simulator
    }

    pub fn intersection_ids(&self) -> impl Iterator<Item = &IntersectionId> {
        self.traffic_signals.keys()
    }

    pub fn traffic_signal(&self, id: &IntersectionId) -> Option<&TrafficSignal> {
        self.traffic_signals.get(id)
    }

    /// Simulated seconds elapsed in the current episode.
    pub fn sim_time(&self) -> Result<f64, EnvError> {
        self.ensure_started()?;
        Ok(self.simulator.current_time()?)
    }

    /// Starts a fresh episode and returns the first observation of every
    /// intersection. A live episode is closed first.
    pub fn reset(&mut self) -> Result<Observations, EnvError> {
        self.close()?;
        match self.start_episode() {
            Ok(observations) => {
                self.state = EpisodeState::Running;
                Ok(observations)
            }
            Err(e) => {
                self.traffic_signals.clear();
                if let Err(close_err) = self.simulator.close() {
                    warn!("Failed to close simulator after aborted reset: {}", close_err);
                }
                Err(e)
            }
        }
    }

    fn start_episode(&mut self) -> Result<Observations, EnvError> {
        info!(
            "Starting scenario '{}' (render: {})",
            self.config.scenario, self.config.render
        );
        self.simulator
            .start(&self.config.scenario, self.config.render)?;

        let delta_time = f64::from(self.config.step_chunk) * self.simulator.tick_length();
        let limits = self.config.green_limits();
        self.traffic_signals = self
            .simulator
            .traffic_light_ids()?
            .into_iter()
            .map(|id| (id.clone(), TrafficSignal::new(id, delta_time, limits)))
            .collect();
        info!("Controlling {} traffic signals", self.traffic_signals.len());

        if self.config.warm_up_ticks > 0 {
            debug!("Warming up for {} ticks", self.config.warm_up_ticks);
        }
        for _ in 0..self.config.warm_up_ticks {
            self.simulator.simulation_step()?;
        }

        // Queue memory starts empty: the first reward is measured against zero.
        self.compute_observations()
    }

    /// Applies `actions`, advances one step chunk and reports the outcome.
    ///
    /// Intersections missing from `actions` receive no command. Ids that are
    /// not controlled by this environment are ignored.
    pub fn step(&mut self, actions: &Actions) -> Result<StepResult, EnvError> {
        self.ensure_started()?;
        self.apply_actions(actions)?;

        for _ in 0..self.config.step_chunk {
            self.simulator.simulation_step()?;
        }

        let observations = self.compute_observations()?;
        let rewards = self.compute_rewards()?;
        let sim_time = self.simulator.current_time()?;
        let done = sim_time > self.config.episode_length;
        if done && self.state == EpisodeState::Running {
            info!(
                "Episode finished at {:.1}s (limit {:.1}s)",
                sim_time, self.config.episode_length
            );
            self.state = EpisodeState::Done;
        }

        let total_stopped = self
            .traffic_signals
            .values()
            .map(|signal| signal.last_stopped().current.total())
            .sum();

        Ok(StepResult {
            observations,
            rewards,
            done,
            info: StepInfo {
                step: sim_time,
                total_stopped,
            },
        })
    }

    /// Untyped entry point: `0` keeps, `1` changes. Every value is checked
    /// before any command reaches the simulator.
    pub fn step_raw(
        &mut self,
        actions: &BTreeMap<IntersectionId, u8>,
    ) -> Result<StepResult, EnvError> {
        let actions = actions
            .iter()
            .map(|(id, &value)| {
                Action::try_from(value)
                    .map(|action| (id.clone(), action))
                    .map_err(|value| EnvError::InvalidAction {
                        id: id.clone(),
                        value,
                    })
            })
            .collect::<Result<Actions, _>>()?;
        self.step(&actions)
    }

    /// Releases the simulator connection. Closing twice, or before any
    /// reset, is a no-op. A failed close leaves the episode open so the
    /// next call retries.
    pub fn close(&mut self) -> Result<(), EnvError> {
        if self.state == EpisodeState::Uninitialized {
            return Ok(());
        }
        self.simulator.close()?;
        self.state = EpisodeState::Uninitialized;
        self.traffic_signals.clear();
        info!("Simulation closed");
        Ok(())
    }

    /// Decodes a state id back into its observation components.
    pub fn decode_state(&self, state: StateId) -> Result<Observation, EnvError> {
        let digits = self.codec.try_decode(state)?;
        let mut components = [0; 4];
        components.copy_from_slice(&digits);
        Ok(Observation(components))
    }

    pub fn encode_observation(&self, observation: &Observation) -> StateId {
        self.codec.encode(observation.as_slice())
    }

    fn ensure_started(&self) -> Result<(), EnvError> {
        match self.state {
            EpisodeState::Uninitialized => Err(EnvError::NotReset),
            EpisodeState::Running | EpisodeState::Done => Ok(()),
        }
    }

    fn apply_actions(&mut self, actions: &Actions) -> Result<(), EnvError> {
        for (id, action) in actions {
            let Some(signal) = self.traffic_signals.get_mut(id) else {
                warn!("Ignoring action for unknown intersection {}", id);
                continue;
            };
            match action {
                Action::Keep => signal.keep(&mut self.simulator)?,
                Action::Change => signal.change(&mut self.simulator)?,
            }
        }
        Ok(())
    }

    fn observe(&self, signal: &TrafficSignal) -> Result<Observation, EnvError> {
        let raw_phase = signal.phase(&self.simulator)?;
        let mut phase_id = raw_phase / 2;
        if phase_id >= PHASE_COUNT {
            warn!(
                "Signal {} reported phase {} outside the two-phase cycle, treating it as phase {}",
                signal.id,
                raw_phase,
                PHASE_COUNT - 1
            );
            phase_id = PHASE_COUNT - 1;
        }
        let duration = bucket_duration(signal.time_on_phase());
        let (ns_occupancy, ew_occupancy) = signal.occupancy(&self.simulator)?;
        Ok(Observation::new(
            phase_id,
            duration,
            bucket_occupancy(ns_occupancy),
            bucket_occupancy(ew_occupancy),
        ))
    }

    fn compute_observations(&self) -> Result<Observations, EnvError> {
        let mut observations = Observations::new();
        for (id, signal) in &self.traffic_signals {
            let observation = self.observe(signal)?;
            observations.insert(id.clone(), self.encode_observation(&observation));
        }
        Ok(observations)
    }

    fn compute_rewards(&mut self) -> Result<Rewards, EnvError> {
        let mut rewards = Rewards::new();
        for (id, signal) in self.traffic_signals.iter_mut() {
            let counts = signal.stopped_vehicle_counts(&self.simulator)?;
            rewards.insert(id.clone(), counts.queue_reduction());
        }
        Ok(rewards)
    }
}
