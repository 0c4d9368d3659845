// scripted.rs
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::config::ConfigError;
use crate::simulator::{IntersectionId, SimError, Simulator};

/// Measurements one intersection reports at a given tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(default)]
    pub phase: u32,
    /// `(ns, ew)` occupancy fractions.
    #[serde(default)]
    pub occupancy: (f64, f64),
    /// `(ns, ew)` halted vehicle counts.
    #[serde(default)]
    pub halted: (u32, u32),
}

impl Frame {
    pub fn new(phase: u32, occupancy: (f64, f64), halted: (u32, u32)) -> Self {
        Self {
            phase,
            occupancy,
            halted,
        }
    }

    pub fn halted(ns: u32, ew: u32) -> Self {
        Self {
            halted: (ns, ew),
            ..Self::default()
        }
    }
}

/// Fixed measurement feed for [`ScriptedSimulator`].
///
/// Frame `n` of an intersection is served after `n` ticks; once the frames
/// run out the last one repeats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub intersections: BTreeMap<IntersectionId, Vec<Frame>>,
    #[serde(default = "default_tick_length")]
    pub tick_length: f64,
    /// When set, every change command advances the served phase by 2 (mod 4).
    #[serde(default)]
    pub follow_commands: bool,
    /// Start fails with this reason.
    #[serde(default)]
    pub fail_on_start: Option<String>,
    /// The tick after this many ticks fails with a connection error.
    #[serde(default)]
    pub fail_after_ticks: Option<u64>,
    /// Number of closes per run that fail before one succeeds.
    #[serde(default)]
    pub failing_closes: u32,
}

fn default_tick_length() -> f64 {
    1.0
}

impl Default for Script {
    fn default() -> Self {
        Self {
            intersections: BTreeMap::new(),
            tick_length: default_tick_length(),
            follow_commands: false,
            fail_on_start: None,
            fail_after_ticks: None,
            failing_closes: 0,
        }
    }
}

impl Script {
    pub fn single(id: impl Into<IntersectionId>, frames: Vec<Frame>) -> Self {
        Self::default().with_intersection(id, frames)
    }

    pub fn with_intersection(mut self, id: impl Into<IntersectionId>, frames: Vec<Frame>) -> Self {
        self.intersections.insert(id.into(), frames);
        self
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let script: Self = serde_json::from_str(&raw)?;
        if !script.tick_length.is_finite() || script.tick_length <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "tick_length must be positive, got {}",
                script.tick_length
            )));
        }
        Ok(script)
    }
}

/// Command received by the scripted simulator.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Keep { id: IntersectionId, seconds: f64 },
    Change { id: IntersectionId },
}

/// In-memory [`Simulator`] that serves scripted measurements and records
/// every command it receives. It models no traffic at all.
#[derive(Debug, Clone)]
pub struct ScriptedSimulator {
    script: Script,
    running: bool,
    ticks: u64,
    phase_shift: BTreeMap<IntersectionId, u32>,
    commands: Vec<Command>,
    starts: usize,
    closes: usize,
    failed_closes: u32,
}

impl ScriptedSimulator {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            running: false,
            ticks: 0,
            phase_shift: BTreeMap::new(),
            commands: Vec::new(),
            starts: 0,
            closes: 0,
            failed_closes: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Ticks advanced since the last start.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Commands received since the last start, in order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn start_count(&self) -> usize {
        self.starts
    }

    /// Number of closes that actually released a running simulation.
    pub fn close_count(&self) -> usize {
        self.closes
    }

    fn ensure_running(&self) -> Result<(), SimError> {
        if self.running {
            Ok(())
        } else {
            Err(SimError::Closed)
        }
    }

    fn frame(&self, id: &IntersectionId) -> Result<Frame, SimError> {
        self.ensure_running()?;
        let frames = self
            .script
            .intersections
            .get(id)
            .ok_or_else(|| SimError::UnknownIntersection(id.clone()))?;
        let index = usize::try_from(self.ticks).unwrap_or(usize::MAX);
        Ok(frames
            .get(index)
            .or_else(|| frames.last())
            .cloned()
            .unwrap_or_default())
    }

    fn ensure_known(&self, id: &IntersectionId) -> Result<(), SimError> {
        self.ensure_running()?;
        if self.script.intersections.contains_key(id) {
            Ok(())
        } else {
            Err(SimError::UnknownIntersection(id.clone()))
        }
    }
}

impl Simulator for ScriptedSimulator {
    fn start(&mut self, scenario: &str, render: bool) -> Result<(), SimError> {
        if self.running {
            return Err(SimError::Connection("simulation already started".into()));
        }
        if let Some(reason) = &self.script.fail_on_start {
            return Err(SimError::Start {
                scenario: scenario.to_string(),
                reason: reason.clone(),
            });
        }
        debug!("Scripted simulator starting '{}' (render: {})", scenario, render);
        self.running = true;
        self.ticks = 0;
        self.phase_shift.clear();
        self.commands.clear();
        self.failed_closes = 0;
        self.starts += 1;
        Ok(())
    }

    fn traffic_light_ids(&self) -> Result<Vec<IntersectionId>, SimError> {
        self.ensure_running()?;
        Ok(self.script.intersections.keys().cloned().collect())
    }

    fn simulation_step(&mut self) -> Result<(), SimError> {
        self.ensure_running()?;
        if let Some(limit) = self.script.fail_after_ticks {
            if self.ticks >= limit {
                return Err(SimError::Connection(format!(
                    "connection lost after {} ticks",
                    limit
                )));
            }
        }
        self.ticks += 1;
        Ok(())
    }

    fn current_time(&self) -> Result<f64, SimError> {
        self.ensure_running()?;
        Ok(self.ticks as f64 * self.script.tick_length)
    }

    fn tick_length(&self) -> f64 {
        self.script.tick_length
    }

    fn phase(&self, id: &IntersectionId) -> Result<u32, SimError> {
        let frame = self.frame(id)?;
        if !self.script.follow_commands {
            return Ok(frame.phase);
        }
        let shift = self.phase_shift.get(id).copied().unwrap_or(0);
        Ok((frame.phase + shift) % 4)
    }

    fn occupancy(&self, id: &IntersectionId) -> Result<(f64, f64), SimError> {
        Ok(self.frame(id)?.occupancy)
    }

    fn halted_vehicles(&self, id: &IntersectionId) -> Result<(u32, u32), SimError> {
        Ok(self.frame(id)?.halted)
    }

    fn keep_phase(&mut self, id: &IntersectionId, seconds: f64) -> Result<(), SimError> {
        self.ensure_known(id)?;
        self.commands.push(Command::Keep {
            id: id.clone(),
            seconds,
        });
        Ok(())
    }

    fn change_phase(&mut self, id: &IntersectionId) -> Result<(), SimError> {
        self.ensure_known(id)?;
        if self.script.follow_commands {
            let shift = self.phase_shift.entry(id.clone()).or_insert(0);
            *shift = (*shift + 2) % 4;
        }
        self.commands.push(Command::Change { id: id.clone() });
        Ok(())
    }

    fn close(&mut self) -> Result<(), SimError> {
        if self.running && self.failed_closes < self.script.failing_closes {
            self.failed_closes += 1;
            return Err(SimError::Connection("close request timed out".into()));
        }
        if self.running {
            self.running = false;
            self.closes += 1;
        }
        Ok(())
    }
}
