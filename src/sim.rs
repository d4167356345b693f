//! A cosmetic race simulation. Runners advance along a track by a fixed base speed, a periodic
//! oscillation and (optionally) a bounded random jitter. Nothing here predicts a result: the base
//! speeds are synthetic, biased only by public favouritism or handicap points.
//!
//! The simulation is advanced by the caller, one [tick](RaceSimulation::tick) per frame, and moves
//! through the phases `Idle → Running ⇄ Paused → Finished`, with a reset from `Paused` or
//! `Finished` back to `Idle`.

use std::ops::Range;

use anyhow::bail;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};
use thiserror::Error;
use tinyrand::Rand;
use tracing::{debug, trace};

use crate::data::Runner;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Range from which each runner's random base speed is drawn, in track units per tick.
    pub base_speed: Range<f64>,
    /// Bonus for a runner with 100% public favouritism.
    pub favoritism_weight: f64,
    /// Bonus for a runner with 100 (or more) handicap points.
    pub handicap_weight: f64,
    pub oscillation_amplitude: f64,
    /// Angular frequency of the oscillation, in radians per unit of simulated time.
    pub oscillation_frequency: f64,
    /// Phase offset between consecutive runners, in radians.
    pub oscillation_phase: f64,
    /// Per-tick random perturbation is drawn from `±jitter`.
    pub jitter: f64,
    /// Floor on the per-tick advance; guarantees forward progress.
    pub min_advance: f64,
    pub finish_line: f64,
    /// Simulated time elapsed per tick.
    pub tick_interval: f64,
    /// Minimum simulated time between live ranking updates.
    pub ranking_interval: f64,
}
impl SimConfig {
    /// A normalised track finishing at 1.0, with random jitter.
    pub fn planar() -> Self {
        Self {
            base_speed: 0.0015..0.0025,
            favoritism_weight: 0.001,
            handicap_weight: 0.0008,
            oscillation_amplitude: 0.0003,
            oscillation_frequency: 2.0,
            oscillation_phase: 0.7,
            jitter: 0.0004,
            min_advance: 0.0001,
            finish_line: 1.0,
            tick_interval: 1.0 / 60.0,
            ranking_interval: 0.5,
        }
    }

    /// An absolute track of 100 units with smooth, jitter-free motion.
    pub fn track() -> Self {
        Self {
            base_speed: 0.12..0.18,
            favoritism_weight: 0.08,
            handicap_weight: 0.06,
            oscillation_amplitude: 0.02,
            oscillation_frequency: 1.5,
            oscillation_phase: 0.9,
            jitter: 0.0,
            min_advance: 0.01,
            finish_line: 100.0,
            tick_interval: 1.0 / 60.0,
            ranking_interval: 0.5,
        }
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !(self.base_speed.start >= 0.0 && self.base_speed.start <= self.base_speed.end) {
            bail!("base speed range {:?} must be non-negative and ordered", self.base_speed);
        }
        for (name, value) in [
            ("favoritism weight", self.favoritism_weight),
            ("handicap weight", self.handicap_weight),
            ("oscillation amplitude", self.oscillation_amplitude),
            ("jitter", self.jitter),
            ("ranking interval", self.ranking_interval),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                bail!("{name} must be a finite non-negative number, got {value}");
            }
        }
        for (name, value) in [
            ("minimum advance", self.min_advance),
            ("finish line", self.finish_line),
            ("tick interval", self.tick_interval),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                bail!("{name} must be a finite positive number, got {value}");
            }
        }
        Ok(())
    }

    /// The speed a runner starts a race with, before oscillation and jitter.
    ///
    /// Favouritism takes precedence over the handicap; a value that doesn't parse counts as
    /// absent.
    pub fn base_speed(&self, runner: &Runner, rand: &mut impl Rand) -> f64 {
        let Range { start, end } = self.base_speed;
        let random = start + random_f64(rand) * (end - start);
        let bonus = match (runner.favoritism(), runner.handicap_points()) {
            (Some(favoritism), _) => favoritism / 100.0 * self.favoritism_weight,
            (None, Some(handicap)) => f64::min(handicap, 100.0) / 100.0 * self.handicap_weight,
            (None, None) => 0.0,
        };
        random + bonus
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::planar()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    Idle,
    Running,
    Paused,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Action {
    Start,
    Pause,
    Reset,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SimulationError {
    #[error("cannot {action} a race that is {phase}")]
    InvalidTransition { action: Action, phase: Phase },

    #[error("race has no runners")]
    EmptyField,
}

/// The outcome of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Not running; nothing moved.
    Idle,
    Advanced,
    /// The runner at this index crossed the finish line.
    Finished(usize),
}

/// An owned view of the simulation, keyed by runner ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    pub positions: FxHashMap<String, f64>,
    pub base_speeds: FxHashMap<String, f64>,
    pub is_running: bool,
    pub has_finished: bool,
    pub winner: Option<Runner>,
    pub live_ranking: Vec<Runner>,
}

pub struct RaceSimulation<R: Rand> {
    config: SimConfig,
    runners: Vec<Runner>,
    positions: Vec<f64>,
    base_speeds: Vec<f64>,
    phase: Phase,
    winner: Option<usize>,
    ranking: Vec<usize>,
    elapsed: f64,
    ranked_at: f64,
    rand: R,
}
impl<R: Rand> RaceSimulation<R> {
    pub fn new(config: SimConfig, runners: Vec<Runner>, rand: R) -> Result<Self, anyhow::Error> {
        config.validate()?;
        let num_runners = runners.len();
        let mut sim = Self {
            config,
            runners,
            positions: vec![0.0; num_runners],
            base_speeds: vec![0.0; num_runners],
            phase: Phase::Idle,
            winner: None,
            ranking: (0..num_runners).collect(),
            elapsed: 0.0,
            ranked_at: 0.0,
            rand,
        };
        sim.initialise();
        Ok(sim)
    }

    fn initialise(&mut self) {
        for (index, runner) in self.runners.iter().enumerate() {
            self.base_speeds[index] = self.config.base_speed(runner, &mut self.rand);
            self.positions[index] = 0.0;
        }
        self.ranking = (0..self.runners.len()).collect();
        self.winner = None;
        self.elapsed = 0.0;
        self.ranked_at = 0.0;
        self.phase = Phase::Idle;
        debug!("initialised {} runners, base speeds: {:?}", self.runners.len(), self.base_speeds);
    }

    /// Starts the race, or resumes it after a pause.
    pub fn start(&mut self) -> Result<(), SimulationError> {
        self.transition(Action::Start, &[Phase::Idle, Phase::Paused], Phase::Running)
    }

    pub fn pause(&mut self) -> Result<(), SimulationError> {
        self.transition(Action::Pause, &[Phase::Running], Phase::Paused)
    }

    /// Returns a paused or finished race to the start line. Base speeds are drawn afresh.
    pub fn reset(&mut self) -> Result<(), SimulationError> {
        self.check(Action::Reset, &[Phase::Paused, Phase::Finished])?;
        self.initialise();
        Ok(())
    }

    /// Running to completion needs at least one runner; an empty field ticks forever.
    pub fn check_field(&self) -> Result<(), SimulationError> {
        if self.runners.is_empty() {
            Err(SimulationError::EmptyField)
        } else {
            Ok(())
        }
    }

    fn transition(
        &mut self,
        action: Action,
        from: &[Phase],
        to: Phase,
    ) -> Result<(), SimulationError> {
        self.check(action, from)?;
        debug!("{action}: {} -> {to}", self.phase);
        self.phase = to;
        Ok(())
    }

    fn check(&self, action: Action, from: &[Phase]) -> Result<(), SimulationError> {
        if from.contains(&self.phase) {
            Ok(())
        } else {
            Err(SimulationError::InvalidTransition {
                action,
                phase: self.phase,
            })
        }
    }

    /// Advances every runner by one tick. The first runner, in list order, to reach the finish
    /// line wins, and the remaining runners are not advanced on that tick.
    pub fn tick(&mut self) -> Tick {
        if self.phase != Phase::Running {
            return Tick::Idle;
        }

        let config = &self.config;
        let time = self.elapsed;
        self.elapsed += config.tick_interval;
        for index in 0..self.runners.len() {
            let angle =
                time * config.oscillation_frequency + index as f64 * config.oscillation_phase;
            let oscillation = config.oscillation_amplitude * f64::sin(angle);
            let jitter = if config.jitter > 0.0 {
                (random_f64(&mut self.rand) * 2.0 - 1.0) * config.jitter
            } else {
                0.0
            };
            let speed = self.base_speeds[index] + oscillation + jitter;
            self.positions[index] += f64::max(config.min_advance, speed);

            if self.positions[index] >= config.finish_line {
                self.phase = Phase::Finished;
                self.winner = Some(index);
                self.rank();
                debug!(
                    "{} ({}) won after {:.3} time units",
                    self.runners[index].name, self.runners[index].number, self.elapsed
                );
                return Tick::Finished(index);
            }
        }

        if self.elapsed - self.ranked_at >= self.config.ranking_interval {
            self.rank();
        }
        Tick::Advanced
    }

    fn rank(&mut self) {
        let positions = &self.positions;
        self.ranking
            .sort_by(|&a, &b| positions[b].total_cmp(&positions[a]).then(a.cmp(&b)));
        self.ranked_at = self.elapsed;
        trace!("ranking at {:.3}: {:?}", self.elapsed, self.ranking);
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn has_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    pub fn runners(&self) -> &[Runner] {
        &self.runners
    }

    /// Simulated time since the race started.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn winner(&self) -> Option<&Runner> {
        self.winner.map(|index| &self.runners[index])
    }

    /// Runners in their most recently ranked order, leader first.
    pub fn ranking(&self) -> impl Iterator<Item = &Runner> {
        self.ranking.iter().map(|&index| &self.runners[index])
    }

    pub fn position(&self, runner_id: &str) -> Option<f64> {
        self.index_of(runner_id).map(|index| self.positions[index])
    }

    /// Position as a fraction of the finish line.
    pub fn progress(&self, runner_id: &str) -> Option<f64> {
        self.position(runner_id)
            .map(|position| position / self.config.finish_line)
    }

    pub fn base_speed(&self, runner_id: &str) -> Option<f64> {
        self.index_of(runner_id).map(|index| self.base_speeds[index])
    }

    fn index_of(&self, runner_id: &str) -> Option<usize> {
        self.runners.iter().position(|runner| runner.id == runner_id)
    }

    pub fn snapshot(&self) -> SimulationState {
        let keyed = |values: &[f64]| {
            self.runners
                .iter()
                .zip(values)
                .map(|(runner, &value)| (runner.id.clone(), value))
                .collect()
        };
        SimulationState {
            positions: keyed(self.positions.as_slice()),
            base_speeds: keyed(self.base_speeds.as_slice()),
            is_running: self.is_running(),
            has_finished: self.has_finished(),
            winner: self.winner().cloned(),
            live_ranking: self.ranking().cloned().collect(),
        }
    }
}

#[inline]
fn random_f64(rand: &mut impl Rand) -> f64 {
    rand.next_u64() as f64 / u64::MAX as f64
}
