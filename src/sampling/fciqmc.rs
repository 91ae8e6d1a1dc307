//! Full configuration interaction quantum Monte Carlo (FCIQMC).
//!
//! A signed walker population lives on determinants. Each generation every
//! populated determinant dies or clones in place through its diagonal element
//! and spawns onto connected determinants through sampled excitations;
//! spawned walkers are then merged (annihilated) into the population. Once the
//! population reaches its target the shift is steered to hold it there, and
//! both the shift and the projected energy estimate the ground-state energy.
//!
//! Reference: Booth, Thom, Alavi, J. Chem. Phys. 131, 054106 (2009);
//! initiator approximation: Cleland, Booth, Alavi, J. Chem. Phys. 132, 041103 (2010).

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::BuildHasherDefault;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Bernoulli, Distribution, Uniform};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::stats::{equilibration_cut, Estimate, Statistics};
use crate::basis::Determinant;
use crate::error::FciqmcError;
use crate::hamiltonian::HamiltonianEvaluator;

/// Parameters of an FCIQMC run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FciqmcParams {
    /// Walkers placed on the reference determinant at start
    pub initial_walkers: f64,
    /// Population at which the shift starts to vary
    pub target_walker_number: f64,
    /// Imaginary time step Δτ
    pub d_tau: f64,
    /// Generations between shift updates (A)
    #[serde(alias = "A")]
    pub report_interval: usize,
    /// Damping of the population-ratio term
    pub xi: f64,
    /// Restoring strength towards the target population
    pub zeta: f64,
    /// Generations after the warm-up
    pub steps: usize,
    /// Walkers above this magnitude may populate new determinants
    pub initiator_threshold: f64,
    /// Probability of proposing a single rather than a double excitation
    pub onebody_probability: f64,
    #[serde(default = "default_floor")]
    pub min_spawn_num: f64,
    #[serde(default = "default_floor")]
    pub min_walker_num: f64,
    #[serde(default = "default_use_initiator")]
    pub use_initiator: bool,
    #[serde(default = "default_max_warmup_steps")]
    pub max_warmup_steps: usize,
    /// Starting shift; the reference energy when unset
    #[serde(default)]
    pub initial_shift: Option<f64>,
}

fn default_floor() -> f64 {
    0.01
}

fn default_use_initiator() -> bool {
    true
}

fn default_max_warmup_steps() -> usize {
    10_000
}

impl Default for FciqmcParams {
    fn default() -> Self {
        Self {
            initial_walkers: 10.0,
            target_walker_number: 1000.0,
            d_tau: 1e-2,
            report_interval: 10,
            xi: 0.1,
            zeta: 0.01,
            steps: 3000,
            initiator_threshold: 1.0,
            onebody_probability: 0.5,
            min_spawn_num: default_floor(),
            min_walker_num: default_floor(),
            use_initiator: default_use_initiator(),
            max_warmup_steps: default_max_warmup_steps(),
            initial_shift: None,
        }
    }
}

impl FciqmcParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initial_walkers(mut self, n: f64) -> Self {
        self.initial_walkers = n;
        self
    }

    pub fn with_target_walker_number(mut self, n: f64) -> Self {
        self.target_walker_number = n;
        self
    }

    pub fn with_d_tau(mut self, d_tau: f64) -> Self {
        self.d_tau = d_tau;
        self
    }

    pub fn with_report_interval(mut self, a: usize) -> Self {
        self.report_interval = a;
        self
    }

    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_max_warmup_steps(mut self, steps: usize) -> Self {
        self.max_warmup_steps = steps;
        self
    }

    pub fn with_initial_shift(mut self, shift: f64) -> Self {
        self.initial_shift = Some(shift);
        self
    }

    pub fn with_initiator(mut self, enabled: bool) -> Self {
        self.use_initiator = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), FciqmcError> {
        let invalid = |name: &'static str, reason: &str| {
            Err(FciqmcError::InvalidParameter { name, reason: reason.to_string() })
        };
        if !(self.initial_walkers > 0.0) {
            return invalid("initial_walkers", "must be positive");
        }
        if !(self.target_walker_number > 0.0) {
            return invalid("target_walker_number", "must be positive");
        }
        if !(self.d_tau > 0.0 && self.d_tau.is_finite()) {
            return invalid("d_tau", "must be positive and finite");
        }
        if self.report_interval == 0 {
            return invalid("report_interval", "must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.onebody_probability) {
            return invalid("onebody_probability", "must lie in [0, 1]");
        }
        if !(self.min_spawn_num >= 0.0) || !(self.min_walker_num >= 0.0) {
            return invalid("min_spawn_num", "floors must be non-negative");
        }
        if !(self.initiator_threshold >= 0.0) {
            return invalid("initiator_threshold", "must be non-negative");
        }
        Ok(())
    }
}

/// Signed walker weight on one determinant, with its cached diagonal element.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Walker {
    pub weight: f64,
    pub diagonal: f64,
}

/// Walker amplitude spawned during a generation, awaiting annihilation.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SpawnEvent {
    pub target: Determinant,
    pub initiator: bool,
    pub amplitude: f64,
}

/// Population-control state of the engine.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Shift held fixed while the population grows towards its target
    Warming,
    /// Shift updated every report interval
    Running,
}

/// One entry of the recorded time series.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraceSample {
    pub tau: f64,
    pub shift: f64,
    pub energy: f64,
    pub population: f64,
}

/// Population keyed by determinant bit pattern. The fixed-key hasher keeps
/// iteration order a function of the insertion history alone.
type WalkerMap = HashMap<u128, Walker, BuildHasherDefault<DefaultHasher>>;

/// FCIQMC population engine.
///
/// Every stochastic decision draws from the single generator `rng`, so a
/// fixed seed reproduces a trajectory exactly.
pub struct PopulationEngine<'h, R: Rng = StdRng> {
    hamiltonian: &'h HamiltonianEvaluator,
    params: FciqmcParams,
    rng: R,
    unit: Uniform<f64>,
    branch: Bernoulli,
    reference: Determinant,
    reference_energy: f64,
    shift: f64,
    walkers: WalkerMap,
    spawned: Vec<SpawnEvent>,
    phase: Phase,
    generations: usize,
    trace: Vec<TraceSample>,
}

impl<'h> PopulationEngine<'h, StdRng> {
    /// Engine driven by a `StdRng` seeded from `seed`.
    pub fn with_seed(
        hamiltonian: &'h HamiltonianEvaluator,
        params: FciqmcParams,
        seed: u64,
    ) -> Result<Self, FciqmcError> {
        Self::new(hamiltonian, params, StdRng::seed_from_u64(seed))
    }
}

impl<'h, R: Rng> PopulationEngine<'h, R> {
    pub fn new(
        hamiltonian: &'h HamiltonianEvaluator,
        params: FciqmcParams,
        rng: R,
    ) -> Result<Self, FciqmcError> {
        params.validate()?;
        let branch = Bernoulli::new(params.onebody_probability).map_err(|e| {
            FciqmcError::InvalidParameter { name: "onebody_probability", reason: e.to_string() }
        })?;

        let reference = hamiltonian.basis().minimum_det();
        let reference_energy = hamiltonian.hmat0(&reference);
        debug!(%reference, reference_energy, "population engine created");

        let mut engine = Self {
            hamiltonian,
            params,
            rng,
            unit: Uniform::new(0.0, 1.0),
            branch,
            reference,
            reference_energy,
            shift: reference_energy,
            walkers: WalkerMap::default(),
            spawned: Vec::new(),
            phase: Phase::Warming,
            generations: 0,
            trace: Vec::new(),
        };
        engine.reset();
        Ok(engine)
    }

    /// Restore the single-reference starting population and clear all history.
    pub fn reset(&mut self) {
        self.walkers.clear();
        self.walkers.insert(
            self.reference.bits(),
            Walker { weight: self.params.initial_walkers, diagonal: self.reference_energy },
        );
        self.spawned.clear();
        self.shift = self.params.initial_shift.unwrap_or(self.reference_energy);
        self.phase = Phase::Warming;
        self.generations = 0;
        self.trace.clear();
    }

    pub fn params(&self) -> &FciqmcParams {
        &self.params
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn shift(&self) -> f64 {
        self.shift
    }

    pub fn reference(&self) -> &Determinant {
        &self.reference
    }

    /// ⟨D0|H|D0⟩
    pub fn reference_energy(&self) -> f64 {
        self.reference_energy
    }

    /// Generations advanced since the last reset.
    pub fn generations(&self) -> usize {
        self.generations
    }

    pub fn trace(&self) -> &[TraceSample] {
        &self.trace
    }

    /// Number of determinants carrying walkers.
    pub fn occupied_determinants(&self) -> usize {
        self.walkers.len()
    }

    pub fn weight(&self, det: &Determinant) -> Option<f64> {
        self.walkers.get(&det.bits()).map(|w| w.weight)
    }

    /// Total walker number Nw = Σ |c_i|.
    pub fn population(&self) -> f64 {
        self.walkers.values().map(|w| w.weight.abs()).sum()
    }

    fn reference_weight(&self) -> Result<f64, FciqmcError> {
        let walker = self
            .walkers
            .get(&self.reference.bits())
            .ok_or_else(|| FciqmcError::ReferenceMissing(self.reference.to_string()))?;
        if walker.weight == 0.0 {
            return Err(FciqmcError::ReferenceEmpty);
        }
        Ok(walker.weight)
    }

    /// E = Σ_i c_i ⟨D0|H|Di⟩ / c_0
    pub fn projected_energy(&self) -> Result<f64, FciqmcError> {
        self.energy_and_population().map(|(energy, _)| energy)
    }

    /// Projected energy and total walker number in one pass.
    pub fn energy_and_population(&self) -> Result<(f64, f64), FciqmcError> {
        let n0 = self.reference_weight()?;
        let nmo = self.reference.nmo();
        let mut energy = 0.0;
        let mut population = 0.0;
        for (&key, walker) in self.walkers.iter() {
            population += walker.weight.abs();
            let h0i = if key == self.reference.bits() {
                walker.diagonal
            } else {
                self.hamiltonian.hmat(&self.reference, &Determinant::from_bits(key, nmo))
            };
            energy += walker.weight * h0i;
        }
        Ok((energy / n0, population))
    }

    /// Round `value` stochastically to `0` or `±floor` when smaller than
    /// `floor` in magnitude; the expectation is preserved.
    fn round_to_floor(&mut self, value: f64, floor: f64) -> f64 {
        let magnitude = value.abs();
        if magnitude >= floor {
            return value;
        }
        if self.unit.sample(&mut self.rng) * floor < magnitude {
            floor.copysign(value)
        } else {
            0.0
        }
    }

    /// Death/cloning and spawning for every determinant populated at the
    /// start of the generation.
    ///
    /// Determinants are visited in ascending bit order from a snapshot; their
    /// new weights are written back after the scan. Spawned walkers go to
    /// the pending buffer untouched until [`annihilate`](Self::annihilate).
    pub fn step(&mut self) {
        let hamiltonian = self.hamiltonian;
        let basis = hamiltonian.basis();
        let nmo = basis.nmo();
        let d_tau = self.params.d_tau;
        let p_single = self.params.onebody_probability;
        let p_double = 1.0 - p_single;

        let mut snapshot: Vec<(u128, Walker)> =
            self.walkers.iter().map(|(&key, &walker)| (key, walker)).collect();
        snapshot.sort_unstable_by_key(|&(key, _)| key);

        let mut updates: Vec<(u128, f64)> = Vec::with_capacity(snapshot.len());
        for (key, walker) in snapshot {
            let rounded = self.round_to_floor(walker.weight, self.params.min_walker_num);
            if rounded == 0.0 {
                updates.push((key, 0.0));
                continue;
            }
            let attempts = (rounded + self.unit.sample(&mut self.rng)).floor();
            updates.push((key, walker.weight - d_tau * (walker.diagonal - self.shift) * attempts));
            if attempts == 0.0 {
                continue;
            }

            let initiator =
                self.params.use_initiator && walker.weight.abs() > self.params.initiator_threshold;
            let sign = attempts.signum();
            let source = Determinant::from_bits(key, nmo);

            for _ in 0..attempts.abs() as u64 {
                let (target, coupling, inverse_probability) = if self.branch.sample(&mut self.rng)
                {
                    let Some(ex) = basis.single_excite(&source, &mut self.rng) else {
                        continue;
                    };
                    let mut target = source;
                    target.clear(ex.hole);
                    let coupling = hamiltonian.hmat1(&target, ex.hole, ex.particle);
                    target.set(ex.particle);
                    (target, coupling, ex.inverse_probability as f64 / p_single)
                } else {
                    let Some(ex) = basis.double_excite(&source, &mut self.rng) else {
                        continue;
                    };
                    let (a, b) = ex.holes;
                    let (c, d) = ex.particles;
                    let mut target = source;
                    target.clear(a);
                    target.clear(b);
                    let coupling = hamiltonian.hmat2(&target, a, b, c, d);
                    target.set(c);
                    target.set(d);
                    (target, coupling, ex.inverse_probability as f64 / p_double)
                };

                let amplitude = self.round_to_floor(
                    -sign * d_tau * coupling * inverse_probability,
                    self.params.min_spawn_num,
                );
                if amplitude != 0.0 {
                    self.spawned.push(SpawnEvent { target, initiator, amplitude });
                }
            }
        }

        for (key, weight) in updates {
            if weight == 0.0 {
                self.walkers.remove(&key);
            } else if let Some(walker) = self.walkers.get_mut(&key) {
                walker.weight = weight;
            }
        }
    }

    /// Merge the pending spawns into the population.
    ///
    /// Spawns onto unpopulated determinants survive only when they come from
    /// an initiator. Entries whose weight cancels to zero are removed.
    pub fn annihilate(&mut self) {
        let hamiltonian = self.hamiltonian;
        for event in self.spawned.drain(..) {
            let key = event.target.bits();
            if let Some(walker) = self.walkers.get_mut(&key) {
                walker.weight += event.amplitude;
                if walker.weight == 0.0 {
                    self.walkers.remove(&key);
                }
            } else if event.initiator {
                self.walkers.insert(
                    key,
                    Walker { weight: event.amplitude, diagonal: hamiltonian.hmat0(&event.target) },
                );
            }
        }
    }

    /// One full generation: [`step`](Self::step) then
    /// [`annihilate`](Self::annihilate).
    pub fn advance(&mut self) {
        self.step();
        self.annihilate();
        self.generations += 1;
    }

    /// Grow the population at fixed shift until it reaches the target, then
    /// switch to [`Phase::Running`]. Returns the number of generations taken.
    pub fn warm_up(&mut self) -> Result<usize, FciqmcError> {
        let interval = self.params.report_interval;
        let mut count = 0;
        let mut population = self.population();
        while population < self.params.target_walker_number {
            if count >= self.params.max_warmup_steps {
                return Err(FciqmcError::WarmupExhausted { steps: count });
            }
            self.advance();
            count += 1;
            let (energy, current) = self.energy_and_population()?;
            population = current;
            if count % interval == 0 {
                info!(generation = count, population, energy, "warming up");
            }
        }
        self.phase = Phase::Running;
        info!(generations = count, population, "warm-up finished");
        Ok(count)
    }

    /// S ← S - ξ/(AΔτ) ln(N(g)/N(g-A)) - ζ/(AΔτ) ln(N(g)/N_target)
    fn update_shift(&mut self, previous: f64, current: f64) {
        let rate = 1.0 / (self.params.report_interval as f64 * self.params.d_tau);
        self.shift -= self.params.xi * rate * (current / previous).ln()
            + self.params.zeta * rate * (current / self.params.target_walker_number).ln();
    }

    /// Warm up if needed, then advance `steps` generations with shift
    /// control, recording a trace sample every report interval.
    pub fn run(&mut self) -> Result<&[TraceSample], FciqmcError> {
        if self.phase == Phase::Warming {
            self.warm_up()?;
        }

        let interval = self.params.report_interval;
        let d_tau = self.params.d_tau;
        let (_, mut population) = self.energy_and_population()?;
        for generation in 0..self.params.steps {
            self.advance();
            if generation % interval != 0 {
                continue;
            }
            let previous = population;
            let (energy, current) = self.energy_and_population()?;
            population = current;
            self.update_shift(previous, current);
            self.trace.push(TraceSample {
                tau: generation as f64 * d_tau,
                shift: self.shift,
                energy,
                population,
            });
            info!(generation, shift = self.shift, energy, population, "shift updated");
        }
        info!(samples = self.trace.len(), shift = self.shift, "evolution finished");
        Ok(&self.trace)
    }

    /// Mean and spread of shift, projected energy and population after
    /// discarding the leading fraction `pos` of the trace.
    pub fn statistics(&self, pos: f64) -> Result<Statistics, FciqmcError> {
        let start = equilibration_cut(self.trace.len(), pos)?;
        let kept = &self.trace[start..];
        let column = |f: fn(&TraceSample) -> f64| kept.iter().map(f).collect::<Vec<f64>>();
        Ok(Statistics {
            shift: Estimate::from_samples(&column(|s| s.shift)),
            energy: Estimate::from_samples(&column(|s| s.energy)),
            population: Estimate::from_samples(&column(|s| s.population)),
            samples: kept.len(),
        })
    }

    /// Scan Δτ over 100 log-spaced values in [1e-9, 1e-1] and adopt the first
    /// one whose warm-up reaches the target within `max_warmup_steps`.
    ///
    /// On success the engine is left warmed up at the chosen time step.
    pub fn search_time_step(&mut self) -> Result<f64, FciqmcError> {
        const CANDIDATES: usize = 100;
        let original = self.params.d_tau;
        for i in 0..CANDIDATES {
            let d_tau = 10f64.powf(-9.0 + 8.0 * i as f64 / (CANDIDATES - 1) as f64);
            self.params.d_tau = d_tau;
            self.reset();
            match self.warm_up() {
                Ok(generations) => {
                    info!(d_tau, generations, "time step accepted");
                    return Ok(d_tau);
                }
                Err(
                    FciqmcError::WarmupExhausted { .. }
                    | FciqmcError::ReferenceMissing(_)
                    | FciqmcError::ReferenceEmpty,
                ) => debug!(d_tau, "time step rejected"),
                Err(other) => return Err(other),
            }
        }
        self.params.d_tau = original;
        self.reset();
        Err(FciqmcError::TimeStepSearchFailed)
    }
}
