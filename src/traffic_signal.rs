// traffic_signal.rs
use log::debug;
use serde::{Deserialize, Serialize};

use crate::simulator::{IntersectionId, SimError, Simulator};

/// Halted vehicles on the two tracked approaches of an intersection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionCounts {
    pub ns: u32,
    pub ew: u32,
}

impl DirectionCounts {
    pub fn total(&self) -> u32 {
        self.ns + self.ew
    }

    /// Average queue length over both approaches.
    pub fn average(&self) -> f64 {
        f64::from(self.ns + self.ew) / 2.0
    }
}

/// Halted counts as of the latest read, paired with the read before it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoppedCounts {
    pub current: DirectionCounts,
    pub previous: DirectionCounts,
}

impl StoppedCounts {
    /// Drop in the average queue between the two reads. Positive when
    /// congestion went down.
    pub fn queue_reduction(&self) -> f64 {
        self.previous.average() - self.current.average()
    }
}

/// Optional green-time guards applied to agent commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GreenLimits {
    /// A change requested before this many seconds on phase is turned into a keep.
    pub min_green: Option<f64>,
    /// A keep requested at or past this many seconds on phase is turned into a change.
    pub max_green: Option<f64>,
}

/// Per-intersection proxy over the simulator.
///
/// The proxy never holds on to the simulator: every read or command borrows
/// it for the duration of the call, so the environment stays the single owner
/// of the connection.
#[derive(Debug, Clone)]
pub struct TrafficSignal {
    /// Intersection this proxy controls.
    pub id: IntersectionId,
    /// Simulated seconds covered by one environment step.
    delta_time: f64,
    /// Seconds since this proxy last switched phase.
    time_on_phase: f64,
    limits: GreenLimits,
    stopped: StoppedCounts,
}

impl TrafficSignal {
    pub fn new(id: IntersectionId, delta_time: f64, limits: GreenLimits) -> Self {
        Self {
            id,
            delta_time,
            time_on_phase: 0.0,
            limits,
            stopped: StoppedCounts::default(),
        }
    }

    pub fn phase<S: Simulator + ?Sized>(&self, sim: &S) -> Result<u32, SimError> {
        sim.phase(&self.id)
    }

    pub fn time_on_phase(&self) -> f64 {
        self.time_on_phase
    }

    /// `(ns, ew)` occupancy fractions. Values may overshoot 1.0 transiently.
    pub fn occupancy<S: Simulator + ?Sized>(&self, sim: &S) -> Result<(f64, f64), SimError> {
        sim.occupancy(&self.id)
    }

    /// Reads the current halted counts and shifts the last read into `previous`.
    pub fn stopped_vehicle_counts<S: Simulator + ?Sized>(
        &mut self,
        sim: &S,
    ) -> Result<StoppedCounts, SimError> {
        let (ns, ew) = sim.halted_vehicles(&self.id)?;
        self.stopped = StoppedCounts {
            current: DirectionCounts { ns, ew },
            previous: self.stopped.current,
        };
        Ok(self.stopped)
    }

    /// Counts as of the most recent read, without touching the simulator.
    pub fn last_stopped(&self) -> StoppedCounts {
        self.stopped
    }

    /// Holds the current phase for the next step.
    pub fn keep<S: Simulator + ?Sized>(&mut self, sim: &mut S) -> Result<(), SimError> {
        if let Some(max_green) = self.limits.max_green {
            if self.time_on_phase >= max_green {
                debug!(
                    "Signal {}: keep after {:.1}s reached max green {:.1}s, changing phase",
                    self.id, self.time_on_phase, max_green
                );
                return self.switch(sim);
            }
        }
        self.hold(sim)
    }

    /// Moves on to the next phase of the cycle.
    pub fn change<S: Simulator + ?Sized>(&mut self, sim: &mut S) -> Result<(), SimError> {
        if let Some(min_green) = self.limits.min_green {
            if self.time_on_phase < min_green {
                debug!(
                    "Signal {}: change after {:.1}s is below min green {:.1}s, keeping phase",
                    self.id, self.time_on_phase, min_green
                );
                return self.hold(sim);
            }
        }
        self.switch(sim)
    }

    fn hold<S: Simulator + ?Sized>(&mut self, sim: &mut S) -> Result<(), SimError> {
        sim.keep_phase(&self.id, self.delta_time)?;
        self.time_on_phase += self.delta_time;
        Ok(())
    }

    // The new phase will have run one full step by the next observation.
    fn switch<S: Simulator + ?Sized>(&mut self, sim: &mut S) -> Result<(), SimError> {
        sim.change_phase(&self.id)?;
        self.time_on_phase = self.delta_time;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::{Command, Frame, Script, ScriptedSimulator};

    fn running_sim(frames: Vec<Frame>) -> ScriptedSimulator {
        let mut sim = ScriptedSimulator::new(Script::single("A", frames));
        sim.start("scripted", false).unwrap();
        sim
    }

    #[test]
    fn keep_accumulates_time_on_phase() {
        let mut sim = running_sim(vec![Frame::default()]);
        let mut signal = TrafficSignal::new("A".into(), 5.0, GreenLimits::default());
        signal.keep(&mut sim).unwrap();
        signal.keep(&mut sim).unwrap();
        assert_eq!(signal.time_on_phase(), 10.0);
        assert_eq!(
            sim.commands(),
            &[
                Command::Keep { id: "A".into(), seconds: 5.0 },
                Command::Keep { id: "A".into(), seconds: 5.0 },
            ]
        );
    }

    #[test]
    fn change_restarts_time_on_phase() {
        let mut sim = running_sim(vec![Frame::default()]);
        let mut signal = TrafficSignal::new("A".into(), 5.0, GreenLimits::default());
        signal.keep(&mut sim).unwrap();
        signal.keep(&mut sim).unwrap();
        signal.change(&mut sim).unwrap();
        assert_eq!(signal.time_on_phase(), 5.0);
        assert_eq!(sim.commands().last(), Some(&Command::Change { id: "A".into() }));
    }

    #[test]
    fn stopped_counts_remember_previous_read() {
        let frames = vec![Frame::halted(4, 6), Frame::halted(1, 1)];
        let mut sim = running_sim(frames);
        let mut signal = TrafficSignal::new("A".into(), 1.0, GreenLimits::default());

        let first = signal.stopped_vehicle_counts(&sim).unwrap();
        assert_eq!(first.current, DirectionCounts { ns: 4, ew: 6 });
        assert_eq!(first.previous, DirectionCounts::default());

        sim.simulation_step().unwrap();
        let second = signal.stopped_vehicle_counts(&sim).unwrap();
        assert_eq!(second.previous, DirectionCounts { ns: 4, ew: 6 });
        assert_eq!(second.current, DirectionCounts { ns: 1, ew: 1 });
        assert_eq!(second.queue_reduction(), 4.0);
        assert_eq!(signal.last_stopped(), second);
    }

    #[test]
    fn min_green_turns_early_change_into_keep() {
        let mut sim = running_sim(vec![Frame::default()]);
        let limits = GreenLimits { min_green: Some(10.0), max_green: None };
        let mut signal = TrafficSignal::new("A".into(), 5.0, limits);

        signal.change(&mut sim).unwrap();
        assert_eq!(signal.time_on_phase(), 5.0);
        assert_eq!(sim.commands(), &[Command::Keep { id: "A".into(), seconds: 5.0 }]);

        signal.change(&mut sim).unwrap();
        assert_eq!(signal.time_on_phase(), 10.0);
        signal.change(&mut sim).unwrap();
        assert_eq!(signal.time_on_phase(), 5.0);
        assert_eq!(sim.commands().last(), Some(&Command::Change { id: "A".into() }));
    }

    #[test]
    fn max_green_turns_late_keep_into_change() {
        let mut sim = running_sim(vec![Frame::default()]);
        let limits = GreenLimits { min_green: None, max_green: Some(10.0) };
        let mut signal = TrafficSignal::new("A".into(), 5.0, limits);

        signal.keep(&mut sim).unwrap();
        signal.keep(&mut sim).unwrap();
        assert_eq!(signal.time_on_phase(), 10.0);
        signal.keep(&mut sim).unwrap();
        assert_eq!(signal.time_on_phase(), 5.0);
        assert_eq!(sim.commands().last(), Some(&Command::Change { id: "A".into() }));
    }

    #[test]
    fn unchanged_queue_gives_zero_reduction() {
        let counts = StoppedCounts {
            current: DirectionCounts { ns: 3, ew: 5 },
            previous: DirectionCounts { ns: 5, ew: 3 },
        };
        assert_eq!(counts.queue_reduction(), 0.0);
    }
}
