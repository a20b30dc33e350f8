use crate::core::clock::Clock;
use crate::core::horse::Horse;
use crate::core::position::HorsePosition;
use crate::pre::race_pars::SpeedPars;
use helpers::general::{argsort_desc_with_tolerance, lin_interp};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::collections::HashMap;

pub const DEFAULT_UPDATE_INTERVAL_MS: f64 = 50.0;

/// Distances closer than this are considered tied when ranking.
pub const DISTANCE_TOLERANCE: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq)]
struct SimulationConfig {
    distance: f64,
    update_interval_ms: f64,
}

/// RaceSimulation moves the horses of one round towards the finish line. It is driven from the
/// outside: every delivered frame calls `on_frame`, which applies a tick once the update interval
/// has elapsed and keeps requesting frames until the round is paused, stopped or finished.
#[derive(Debug)]
pub struct RaceSimulation<C: Clock> {
    clock: C,
    rng: StdRng,
    speed_pars: SpeedPars,
    momentum_step: Option<Normal<f64>>,
    positions: Vec<HorsePosition>,
    momentum: HashMap<u32, f64>,
    config: Option<SimulationConfig>,
    is_running: bool,
    is_finished: bool,
    frame_requested: bool,
    last_update_ms: f64,
}

impl<C: Clock> RaceSimulation<C> {
    pub fn new(clock: C, speed_pars: SpeedPars) -> RaceSimulation<C> {
        let momentum_step = Normal::new(0.0, speed_pars.momentum_step_sd).ok();

        RaceSimulation {
            clock,
            rng: StdRng::from_entropy(),
            speed_pars,
            momentum_step,
            positions: Vec::new(),
            momentum: HashMap::new(),
            config: None,
            is_running: false,
            is_finished: false,
            frame_requested: false,
            last_update_ms: 0.0,
        }
    }

    // ---------------------------------------------------------------------------------------------
    // LIFECYCLE -----------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// start puts `horses` on the start line of a race over `distance` meters and requests the
    /// first frame. A simulation that is still active is superseded.
    pub fn start(&mut self, distance: f64, horses: &[Horse], update_interval_ms: f64) {
        self.frame_requested = false;
        self.momentum.clear();

        self.positions = horses
            .iter()
            .enumerate()
            .map(|(idx, horse)| HorsePosition::new(horse.to_owned(), idx as u32 + 1))
            .collect();
        for horse in horses.iter() {
            self.momentum.insert(horse.id, 1.0);
        }

        self.config = Some(SimulationConfig {
            distance,
            update_interval_ms,
        });
        self.is_running = true;
        self.last_update_ms = self.clock.now_ms();

        // an empty field has nobody left to run
        self.is_finished = self.positions.is_empty();
        self.frame_requested = !self.is_finished;
    }

    /// pause halts the frame loop but keeps positions and momentum for `resume`.
    pub fn pause(&mut self) {
        self.is_running = false;
        self.frame_requested = false;
    }

    /// resume continues a paused simulation. The time base is moved to "now", so the paused
    /// duration is never applied as one large step.
    pub fn resume(&mut self) {
        if self.is_finished || self.config.is_none() {
            return;
        }
        self.is_running = true;
        self.last_update_ms = self.clock.now_ms();
        self.frame_requested = true;
    }

    /// stop ends the simulation and discards all round state.
    pub fn stop(&mut self) {
        self.is_running = false;
        self.is_finished = false;
        self.frame_requested = false;
        self.config = None;
        self.momentum.clear();
        self.positions.clear();
    }

    /// on_frame is the frame callback. It returns true if a tick was applied.
    pub fn on_frame(&mut self) -> bool {
        if !self.frame_requested {
            return false;
        }
        if !self.is_running {
            self.frame_requested = false;
            return false;
        }
        let config = match self.config {
            Some(config) => config,
            None => {
                self.frame_requested = false;
                return false;
            }
        };

        let now_ms = self.clock.now_ms();
        let delta_ms = now_ms - self.last_update_ms;
        if delta_ms < config.update_interval_ms {
            return false;
        }

        self.update_positions(delta_ms, config.distance);
        self.last_update_ms = now_ms;

        if self.is_finished {
            self.frame_requested = false;
        }
        true
    }

    // ---------------------------------------------------------------------------------------------
    // STATE ---------------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    pub fn positions(&self) -> &[HorsePosition] {
        &self.positions
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn is_finished(&self) -> bool {
        self.is_finished
    }

    /// is_frame_requested tells the frame loop whether the simulation wants another frame.
    pub fn is_frame_requested(&self) -> bool {
        self.frame_requested
    }

    pub fn total_distance(&self) -> Option<f64> {
        self.config.map(|config| config.distance)
    }

    /// live_results returns the horses ordered by current standing, leader first.
    pub fn live_results(&self) -> Vec<Horse> {
        let distances: Vec<f64> = self.positions.iter().map(|pos| pos.distance).collect();
        let progresses: Vec<f64> = self.positions.iter().map(|pos| pos.progress).collect();

        argsort_desc_with_tolerance(&distances, &progresses, DISTANCE_TOLERANCE)
            .into_iter()
            .map(|idx| self.positions[idx].horse.to_owned())
            .collect()
    }

    // ---------------------------------------------------------------------------------------------
    // SIMULATION PARTS ----------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// update_positions advances every running horse by the distance covered in `delta_ms` and
    /// re-ranks the field.
    fn update_positions(&mut self, delta_ms: f64, total_distance: f64) {
        if self.is_finished {
            return;
        }

        for pos in self.positions.iter_mut() {
            if pos.has_finished(total_distance) {
                pos.finish(total_distance);
                continue;
            }

            let momentum = self.momentum.entry(pos.horse.id).or_insert(1.0);
            let speed = calc_horse_speed(
                pos.horse.condition,
                momentum,
                &self.speed_pars,
                self.momentum_step.as_ref(),
                &mut self.rng,
            );
            pos.advance(speed * delta_ms / 1000.0, total_distance);
        }

        self.positions.sort_by(|a, b| b.distance.total_cmp(&a.distance));
        for (idx, pos) in self.positions.iter_mut().enumerate() {
            pos.position = idx as u32 + 1;
        }

        if self
            .positions
            .iter()
            .all(|pos| pos.has_finished(total_distance))
        {
            self.is_finished = true;
        }
    }
}

/// calc_horse_speed returns the current speed of a horse in m/s. The base speed grows linearly
/// with the condition; a slowly drifting momentum and a per-tick jitter make the outcome only
/// loosely dependent on it.
fn calc_horse_speed<R: Rng + ?Sized>(
    condition: u8,
    momentum: &mut f64,
    speed_pars: &SpeedPars,
    momentum_step: Option<&Normal<f64>>,
    rng: &mut R,
) -> f64 {
    let base_speed = lin_interp(
        condition as f64,
        &[0.0, 100.0],
        &[speed_pars.base_speed_min, speed_pars.base_speed_max],
    );

    if let Some(step) = momentum_step {
        if rng.gen::<f64>() < speed_pars.momentum_change_prob {
            *momentum = (*momentum + step.sample(rng))
                .clamp(speed_pars.momentum_min, speed_pars.momentum_max);
        }
    }

    let jitter = if speed_pars.jitter > 0.0 {
        rng.gen_range(1.0 - speed_pars.jitter..=1.0 + speed_pars.jitter)
    } else {
        1.0
    };

    base_speed * speed_pars.pace_scale * *momentum * jitter
}
