use crate::core::clock::Clock;
use crate::core::horse::{generate_horses, Horse};
use crate::core::position::HorsePosition;
use crate::core::program::{build_program, Round};
use crate::core::simulation::RaceSimulation;
use crate::core::timer::BreakTimer;
use crate::interfaces::race_event::RaceEvent;
use crate::pre::race_pars::RacePars;
use flume::{Receiver, Sender};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RaceStatus {
    Idle,
    Racing,
    Paused,
}

impl Default for RaceStatus {
    fn default() -> Self {
        RaceStatus::Idle
    }
}

/// RaceOrchestrator owns one race session: the horse roster, the program and the simulation of
/// the current round. Every transition is an explicit method call; frames are delivered through
/// `on_frame`.
///
/// Round advancement: once the simulation of the current round has finished and the race is not
/// paused, the live results are persisted into the round (only the first time) and the break
/// timer is armed. When it fires while still racing, the next round is started or, after the last
/// round, the race is finished. Resuming a paused race whose current round already finished skips
/// the break and advances immediately.
#[derive(Debug)]
pub struct RaceOrchestrator<C: Clock + Clone> {
    race_pars: RacePars,
    clock: C,
    rng: StdRng,
    horses: Vec<Horse>,
    race_program: Vec<Round>,
    status: RaceStatus,
    current_round_index: Option<usize>,
    simulation: RaceSimulation<C>,
    break_timer: BreakTimer,
    subscribers: Vec<Sender<RaceEvent>>,
}

impl<C: Clock + Clone> RaceOrchestrator<C> {
    pub fn new(race_pars: RacePars, clock: C) -> RaceOrchestrator<C> {
        let simulation = RaceSimulation::new(clock.clone(), race_pars.speed_pars.to_owned());

        RaceOrchestrator {
            race_pars,
            clock,
            rng: StdRng::from_entropy(),
            horses: Vec::new(),
            race_program: Vec::new(),
            status: RaceStatus::Idle,
            current_round_index: None,
            simulation,
            break_timer: BreakTimer::new(),
            subscribers: Vec::new(),
        }
    }

    // ---------------------------------------------------------------------------------------------
    // STATE ---------------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    pub fn race_pars(&self) -> &RacePars {
        &self.race_pars
    }

    pub fn horses(&self) -> &[Horse] {
        &self.horses
    }

    pub fn race_program(&self) -> &[Round] {
        &self.race_program
    }

    pub fn has_program(&self) -> bool {
        !self.race_program.is_empty()
    }

    pub fn status(&self) -> RaceStatus {
        self.status
    }

    pub fn is_racing(&self) -> bool {
        matches!(self.status, RaceStatus::Racing | RaceStatus::Paused)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.status, RaceStatus::Paused)
    }

    pub fn current_round_index(&self) -> Option<usize> {
        self.current_round_index
    }

    pub fn current_round(&self) -> Option<&Round> {
        self.current_round_index.and_then(|idx| self.race_program.get(idx))
    }

    /// active_positions returns the live positions of the current round, leader first.
    pub fn active_positions(&self) -> &[HorsePosition] {
        self.simulation.positions()
    }

    pub fn live_results(&self) -> Vec<Horse> {
        self.simulation.live_results()
    }

    pub fn is_break_pending(&self) -> bool {
        self.break_timer.is_pending()
    }

    /// subscribe returns a receiver for all race events emitted from now on.
    pub fn subscribe(&mut self) -> Receiver<RaceEvent> {
        let (tx, rx) = flume::unbounded();
        self.subscribers.push(tx);
        rx
    }

    // ---------------------------------------------------------------------------------------------
    // COMMANDS ------------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// init prepares a fresh roster. A new orchestrator starts without horses.
    pub fn init(&mut self) {
        self.generate_horses();
    }

    /// cleanup halts the simulation and drops a pending break before the session is torn down.
    pub fn cleanup(&mut self) {
        self.simulation.stop();
        self.break_timer.cancel();
    }

    pub fn generate_horses(&mut self) {
        self.horses = generate_horses(self.race_pars.horse_count, &mut self.rng);
        log::debug!("Generated a roster of {} horses", self.horses.len());
    }

    /// generate_program (re)builds the race program, overwriting an existing one. A roster is
    /// generated first if there is none.
    pub fn generate_program(&mut self) {
        if self.horses.is_empty() {
            self.generate_horses();
        }

        self.race_program = build_program(&self.horses, &self.race_pars, &mut self.rng);
        log::info!("Generated a program of {} rounds", self.race_program.len());
        self.emit(RaceEvent::ProgramGenerated {
            rounds: self.race_program.len(),
        });
    }

    /// start_race runs the program from its first round. Without a program nothing happens.
    pub fn start_race(&mut self) {
        if !self.has_program() {
            log::debug!("Ignoring start request, no program generated");
            return;
        }

        self.simulation.stop();
        self.break_timer.cancel();

        self.status = RaceStatus::Racing;
        self.current_round_index = Some(0);
        self.start_current_round();
    }

    pub fn pause_race(&mut self) {
        if self.status != RaceStatus::Racing {
            return;
        }

        self.status = RaceStatus::Paused;
        self.break_timer.cancel();
        self.simulation.pause();
        log::info!("Race paused");
    }

    /// resume_race continues a paused race. If the current round finished in the meantime its
    /// results are saved and the race advances without waiting for the break.
    pub fn resume_race(&mut self) {
        if self.status != RaceStatus::Paused {
            return;
        }

        self.status = RaceStatus::Racing;
        log::info!("Race resumed");

        if self.simulation.is_finished() && self.current_round().is_some() {
            self.persist_results();
            self.advance_round();
        } else {
            self.simulation.resume();
        }
    }

    /// stop_race aborts the race but keeps roster and program.
    pub fn stop_race(&mut self) {
        self.status = RaceStatus::Idle;
        self.current_round_index = None;
        self.break_timer.cancel();
        self.simulation.stop();
    }

    /// restart_race returns the session to its initial state with a new roster.
    pub fn restart_race(&mut self) {
        self.stop_race();
        self.race_program.clear();
        self.simulation.stop();
        self.generate_horses();
        log::info!("Race restarted");
    }

    /// finish_race ends the race after its last round and notifies subscribers. Outside of a race
    /// nothing happens.
    pub fn finish_race(&mut self) {
        if !self.is_racing() {
            return;
        }

        self.stop_race();
        log::info!("Race finished after {} rounds", self.race_program.len());
        self.emit(RaceEvent::RaceFinished {
            rounds: self.race_program.len(),
        });
    }

    // ---------------------------------------------------------------------------------------------
    // FRAME LOOP ----------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// on_frame delivers one animation frame: the simulation may tick, a finished round is
    /// recorded and the break timer is checked. Returns true if the simulation ticked.
    pub fn on_frame(&mut self) -> bool {
        if !self.is_racing() {
            return false;
        }

        let ticked = self.simulation.on_frame();

        if self.status == RaceStatus::Racing && self.simulation.is_finished() {
            self.on_round_finished();
        }

        if self.break_timer.poll(self.clock.now_ms()) {
            self.on_break_elapsed();
        }

        ticked
    }

    fn on_round_finished(&mut self) {
        if self.persist_results() {
            self.break_timer.schedule(self.clock.now_ms(), self.race_pars.break_delay_ms);
        }
    }

    fn on_break_elapsed(&mut self) {
        // the timer is cancelled on pause and stop, this only guards against stale fires
        if self.status != RaceStatus::Racing {
            log::debug!("Discarding break timer, race is {:?}", self.status);
            return;
        }
        self.advance_round();
    }

    /// persist_results writes the live results into the current round. Returns false if the
    /// round already has results, which are never overwritten.
    fn persist_results(&mut self) -> bool {
        let idx = match self.current_round_index {
            Some(idx) => idx,
            None => return false,
        };
        let results = self.simulation.live_results();

        let round_number = match self.race_program.get_mut(idx) {
            Some(round) if !round.is_complete() => {
                round.results = Some(results.to_owned());
                round.round_number
            }
            _ => return false,
        };

        log::info!(
            "Round {} finished, winner: {}",
            round_number,
            results
                .first()
                .map(|horse| horse.name.as_str())
                .unwrap_or("-")
        );
        self.emit(RaceEvent::RoundFinished {
            round_number,
            results,
        });
        true
    }

    fn advance_round(&mut self) {
        self.break_timer.cancel();

        let idx = match self.current_round_index {
            Some(idx) => idx,
            None => return,
        };

        if idx + 1 < self.race_program.len() {
            self.current_round_index = Some(idx + 1);
            self.start_current_round();
        } else {
            self.finish_race();
        }
    }

    fn start_current_round(&mut self) {
        let (round_number, distance, horses) = match self.current_round() {
            Some(round) => (round.round_number, round.distance, round.horses.to_owned()),
            None => return,
        };

        self.simulation.stop();
        self.simulation.start(distance, &horses, self.race_pars.update_interval_ms);

        log::info!(
            "Round {} started: {} horses over {:.0}m",
            round_number,
            horses.len(),
            distance
        );
        self.emit(RaceEvent::RoundStarted {
            round_number,
            distance,
        });
    }

    fn emit(&mut self, event: RaceEvent) {
        self.subscribers.retain(|tx| tx.send(event.to_owned()).is_ok());
    }

    #[cfg(test)]
    pub(crate) fn simulation_mut(&mut self) -> &mut RaceSimulation<C> {
        &mut self.simulation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;

    const FRAME_MS: u64 = 16;

    fn short_pars() -> RacePars {
        RacePars {
            horses_per_round: 4,
            round_distances: vec![300.0, 400.0],
            ..RacePars::default()
        }
    }

    fn new_orchestrator(race_pars: RacePars) -> (ManualClock, RaceOrchestrator<ManualClock>) {
        let clock = ManualClock::new();
        let orchestrator = RaceOrchestrator::new(race_pars, clock.clone());
        (clock, orchestrator)
    }

    /// Delivers frames until `done` holds. Panics if that takes unreasonably long.
    fn run_until<F>(
        clock: &ManualClock,
        orchestrator: &mut RaceOrchestrator<ManualClock>,
        done: F,
    ) where
        F: Fn(&RaceOrchestrator<ManualClock>) -> bool,
    {
        for _ in 0..100_000 {
            if done(&*orchestrator) {
                return;
            }
            clock.advance_ms(FRAME_MS);
            orchestrator.on_frame();
        }
        panic!("Condition not reached within the frame budget!");
    }

    fn run_for(clock: &ManualClock, orchestrator: &mut RaceOrchestrator<ManualClock>, ms: u64) {
        for _ in 0..ms / FRAME_MS {
            clock.advance_ms(FRAME_MS);
            orchestrator.on_frame();
        }
    }

    fn is_permutation(results: &[Horse], horses: &[Horse]) -> bool {
        let mut a: Vec<u32> = results.iter().map(|h| h.id).collect();
        let mut b: Vec<u32> = horses.iter().map(|h| h.id).collect();
        a.sort_unstable();
        b.sort_unstable();
        a == b
    }

    #[test]
    fn init_prepares_roster_without_program() {
        let (_clock, mut orchestrator) = new_orchestrator(RacePars::default());
        assert!(orchestrator.horses().is_empty());

        orchestrator.init();
        assert_eq!(orchestrator.horses().len(), 20);
        assert!(!orchestrator.has_program());
        assert_eq!(orchestrator.status(), RaceStatus::Idle);
        assert!(orchestrator.current_round().is_none());
    }

    #[test]
    fn start_without_program_is_ignored() {
        let (_clock, mut orchestrator) = new_orchestrator(RacePars::default());
        orchestrator.start_race();

        assert!(!orchestrator.is_racing());
        assert_eq!(orchestrator.current_round_index(), None);
    }

    #[test]
    fn pause_and_resume_outside_racing_are_ignored() {
        let (_clock, mut orchestrator) = new_orchestrator(RacePars::default());
        orchestrator.generate_program();

        orchestrator.pause_race();
        assert_eq!(orchestrator.status(), RaceStatus::Idle);
        orchestrator.resume_race();
        assert_eq!(orchestrator.status(), RaceStatus::Idle);

        orchestrator.start_race();
        orchestrator.resume_race();
        assert_eq!(orchestrator.status(), RaceStatus::Racing);
    }

    #[test]
    fn generate_program_creates_roster_if_missing() {
        let (_clock, mut orchestrator) = new_orchestrator(RacePars::default());

        orchestrator.generate_program();
        assert_eq!(orchestrator.horses().len(), 20);
        assert_eq!(orchestrator.race_program().len(), 6);

        let first = orchestrator.race_program().to_vec();
        orchestrator.generate_program();
        assert_eq!(orchestrator.race_program().len(), 6);
        assert!(orchestrator.race_program().iter().all(|r| r.results.is_none()));
        assert_eq!(first.len(), orchestrator.race_program().len());
    }

    #[test]
    fn start_race_runs_first_round() {
        let (_clock, mut orchestrator) = new_orchestrator(RacePars::default());
        orchestrator.generate_program();
        orchestrator.start_race();

        assert_eq!(orchestrator.status(), RaceStatus::Racing);
        assert_eq!(orchestrator.current_round_index(), Some(0));
        assert_eq!(orchestrator.active_positions().len(), 10);
        let lane_ids: Vec<u32> =
            orchestrator.active_positions().iter().map(|p| p.horse.id).collect();
        let round_ids: Vec<u32> =
            orchestrator.race_program()[0].horses.iter().map(|h| h.id).collect();
        assert_eq!(lane_ids, round_ids);
    }

    #[test]
    fn full_program_advances_and_finishes() {
        let (clock, mut orchestrator) = new_orchestrator(short_pars());
        let events = orchestrator.subscribe();
        orchestrator.generate_program();
        orchestrator.start_race();

        run_until(&clock, &mut orchestrator, |o| o.race_program()[0].is_complete());
        assert_eq!(orchestrator.current_round_index(), Some(0));
        assert!(orchestrator.is_break_pending());

        run_until(&clock, &mut orchestrator, |o| o.current_round_index() == Some(1));
        assert!(orchestrator.is_racing());
        assert!(orchestrator.simulation.is_running());

        run_until(&clock, &mut orchestrator, |o| o.race_program()[1].is_complete());
        assert!(orchestrator.is_racing());

        run_until(&clock, &mut orchestrator, |o| !o.is_racing());
        assert_eq!(orchestrator.current_round_index(), None);
        assert!(orchestrator.active_positions().is_empty());

        for round in orchestrator.race_program() {
            let results = round.results.as_ref().unwrap();
            assert!(is_permutation(results, &round.horses));
        }

        let received: Vec<RaceEvent> = events.try_iter().collect();
        assert_eq!(received.len(), 6);
        assert!(matches!(received[0], RaceEvent::ProgramGenerated { rounds: 2 }));
        assert!(matches!(received[1], RaceEvent::RoundStarted { round_number: 1, .. }));
        assert!(matches!(received[2], RaceEvent::RoundFinished { round_number: 1, .. }));
        assert!(matches!(received[3], RaceEvent::RoundStarted { round_number: 2, .. }));
        assert!(matches!(received[4], RaceEvent::RoundFinished { round_number: 2, .. }));
        assert_eq!(received[5], RaceEvent::RaceFinished { rounds: 2 });
    }

    #[test]
    fn break_waits_for_configured_delay() {
        let (clock, mut orchestrator) = new_orchestrator(short_pars());
        orchestrator.generate_program();
        orchestrator.start_race();

        run_until(&clock, &mut orchestrator, |o| o.race_program()[0].is_complete());
        run_for(&clock, &mut orchestrator, 1900);
        assert_eq!(orchestrator.current_round_index(), Some(0));

        run_for(&clock, &mut orchestrator, 200);
        assert_eq!(orchestrator.current_round_index(), Some(1));
    }

    #[test]
    fn resume_saves_unobserved_results_once_and_advances() {
        let race_pars = RacePars {
            round_distances: vec![300.0, 2200.0, 2200.0],
            ..short_pars()
        };
        let (clock, mut orchestrator) = new_orchestrator(race_pars);
        let events = orchestrator.subscribe();
        orchestrator.generate_program();
        orchestrator.start_race();

        // the simulation finishes before the orchestrator observes it
        while !orchestrator.simulation_mut().is_finished() {
            clock.advance_ms(FRAME_MS);
            orchestrator.simulation_mut().on_frame();
        }
        assert!(orchestrator.race_program()[0].results.is_none());

        orchestrator.pause_race();
        orchestrator.resume_race();

        let saved = orchestrator.race_program()[0].results.to_owned();
        assert!(saved.is_some());
        assert_eq!(orchestrator.current_round_index(), Some(1));
        assert!(!orchestrator.is_break_pending());

        run_for(&clock, &mut orchestrator, 3000);
        assert_eq!(orchestrator.current_round_index(), Some(1));
        assert_eq!(orchestrator.race_program()[0].results, saved);

        let finished = events
            .try_iter()
            .filter(|event| matches!(event, RaceEvent::RoundFinished { round_number: 1, .. }))
            .count();
        assert_eq!(finished, 1);
    }

    #[test]
    fn break_expiring_while_paused_is_discarded() {
        let (clock, mut orchestrator) = new_orchestrator(short_pars());
        orchestrator.generate_program();
        orchestrator.start_race();

        run_until(&clock, &mut orchestrator, |o| o.race_program()[0].is_complete());
        let saved = orchestrator.race_program()[0].results.to_owned();

        orchestrator.pause_race();
        assert!(!orchestrator.is_break_pending());
        run_for(&clock, &mut orchestrator, 5000);
        assert_eq!(orchestrator.current_round_index(), Some(0));
        assert!(orchestrator.is_paused());

        orchestrator.resume_race();
        assert_eq!(orchestrator.current_round_index(), Some(1));
        assert_eq!(orchestrator.race_program()[0].results, saved);
        assert!(!orchestrator.is_break_pending());
    }

    #[test]
    fn stale_break_timer_does_not_advance_paused_race() {
        let (clock, mut orchestrator) = new_orchestrator(short_pars());
        orchestrator.generate_program();
        orchestrator.start_race();
        run_until(&clock, &mut orchestrator, |o| o.race_program()[0].is_complete());

        // simulate a cancellation race: paused with the timer still armed
        orchestrator.status = RaceStatus::Paused;
        run_for(&clock, &mut orchestrator, 3000);
        assert_eq!(orchestrator.current_round_index(), Some(0));
        assert!(!orchestrator.is_break_pending());
    }

    #[test]
    fn pausing_mid_round_freezes_positions() {
        let race_pars = RacePars {
            round_distances: vec![2200.0],
            ..short_pars()
        };
        let (clock, mut orchestrator) = new_orchestrator(race_pars);
        orchestrator.generate_program();
        orchestrator.start_race();
        run_for(&clock, &mut orchestrator, 1000);

        orchestrator.pause_race();
        let frozen = orchestrator.active_positions().to_vec();
        run_for(&clock, &mut orchestrator, 1000);
        assert_eq!(orchestrator.active_positions(), frozen.as_slice());

        orchestrator.resume_race();
        run_for(&clock, &mut orchestrator, 100);
        let moved = orchestrator.active_positions().iter().all(|pos| {
            frozen
                .iter()
                .any(|f| f.horse.id == pos.horse.id && pos.distance > f.distance)
        });
        assert!(moved);
    }

    #[test]
    fn stop_keeps_program_and_roster() {
        let (clock, mut orchestrator) = new_orchestrator(short_pars());
        orchestrator.generate_program();
        orchestrator.start_race();
        run_for(&clock, &mut orchestrator, 500);

        orchestrator.stop_race();
        assert!(!orchestrator.is_racing());
        assert_eq!(orchestrator.current_round_index(), None);
        assert!(orchestrator.has_program());
        assert_eq!(orchestrator.horses().len(), 20);
        assert!(orchestrator.active_positions().is_empty());

        run_for(&clock, &mut orchestrator, 5000);
        assert!(!orchestrator.is_racing());
    }

    #[test]
    fn restart_returns_to_fresh_state() {
        let (clock, mut orchestrator) = new_orchestrator(short_pars());
        orchestrator.generate_program();
        orchestrator.start_race();
        run_until(&clock, &mut orchestrator, |o| o.race_program()[0].is_complete());

        orchestrator.restart_race();
        assert!(orchestrator.race_program().is_empty());
        assert_eq!(orchestrator.current_round_index(), None);
        assert!(!orchestrator.is_racing());
        assert!(orchestrator.active_positions().is_empty());
        assert_eq!(orchestrator.horses().len(), 20);
        assert!(!orchestrator.is_break_pending());
    }

    #[test]
    fn rounds_without_horses_finish_trivially() {
        let race_pars = RacePars {
            horses_per_round: 0,
            ..short_pars()
        };
        let (clock, mut orchestrator) = new_orchestrator(race_pars);
        orchestrator.generate_program();
        orchestrator.start_race();

        run_until(&clock, &mut orchestrator, |o| !o.is_racing());
        for round in orchestrator.race_program() {
            assert_eq!(round.results, Some(Vec::new()));
        }
    }

    #[test]
    fn finish_outside_race_is_ignored() {
        let (_clock, mut orchestrator) = new_orchestrator(short_pars());
        let events = orchestrator.subscribe();
        orchestrator.finish_race();
        assert_eq!(events.try_iter().count(), 0);

        orchestrator.generate_program();
        orchestrator.start_race();
        orchestrator.stop_race();
        orchestrator.finish_race();

        let finished = events
            .try_iter()
            .filter(|event| matches!(event, RaceEvent::RaceFinished { .. }))
            .count();
        assert_eq!(finished, 0);
    }

    #[test]
    fn finish_during_race_notifies_once() {
        let (_clock, mut orchestrator) = new_orchestrator(short_pars());
        orchestrator.generate_program();
        orchestrator.start_race();
        let events = orchestrator.subscribe();

        orchestrator.finish_race();
        orchestrator.finish_race();
        assert!(!orchestrator.is_racing());

        let received: Vec<RaceEvent> = events.try_iter().collect();
        assert_eq!(received, vec![RaceEvent::RaceFinished { rounds: 2 }]);
    }

    #[test]
    fn cleanup_halts_simulation() {
        let (clock, mut orchestrator) = new_orchestrator(short_pars());
        orchestrator.generate_program();
        orchestrator.start_race();
        run_for(&clock, &mut orchestrator, 200);

        orchestrator.cleanup();
        assert!(orchestrator.active_positions().is_empty());
        assert!(!orchestrator.is_break_pending());
    }
}
