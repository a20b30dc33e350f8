use crate::core::clock::{Clock, ManualClock, SystemClock};
use crate::core::orchestrator::RaceOrchestrator;
use crate::interfaces::race_event::RaceCommand;
use crate::interfaces::race_state::{RaceState, MAX_VIEW_UPDATE_FREQUENCY};
use crate::post::race_result::ProgramResult;
use crate::pre::race_pars::RacePars;
use crate::pre::sim_opts::check_realtime_factor;
use anyhow::Context;
use flume::{Receiver, Sender};
use std::thread::sleep;
use std::time::{Duration, Instant};

/// (ms) Period of the animation frames delivered to the orchestrator.
pub const FRAME_MS: u64 = 16;

const MAX_HEADLESS_FRAMES: u64 = 10_000_000;

/// handle_race generates a program, races all of its rounds and returns the results for
/// post-processing. Without a sender the session runs headless on a manual clock as fast as
/// possible; with a sender it runs in real time and streams snapshots to the view, optionally
/// taking commands from `cmd_rx`.
pub fn handle_race(
    race_pars: &RacePars,
    tx: Option<&Sender<RaceState>>,
    cmd_rx: Option<&Receiver<RaceCommand>>,
    realtime_factor: f64,
) -> anyhow::Result<ProgramResult> {
    match tx {
        None => simulate_headless(race_pars),
        Some(tx) => simulate_realtime(race_pars, tx, cmd_rx, realtime_factor),
    }
}

/// apply_command forwards a view command to the orchestrator.
pub fn apply_command<C: Clock + Clone>(orchestrator: &mut RaceOrchestrator<C>, cmd: RaceCommand) {
    log::debug!("Received command {:?}", cmd);
    match cmd {
        RaceCommand::Pause => orchestrator.pause_race(),
        RaceCommand::Resume => orchestrator.resume_race(),
        RaceCommand::Stop => orchestrator.stop_race(),
        RaceCommand::Restart => {
            orchestrator.restart_race();
            orchestrator.generate_program();
            orchestrator.start_race();
        }
    }
}

fn simulate_headless(race_pars: &RacePars) -> anyhow::Result<ProgramResult> {
    let clock = ManualClock::new();
    let mut orchestrator = RaceOrchestrator::new(race_pars.to_owned(), clock.clone());
    orchestrator.init();
    orchestrator.generate_program();
    orchestrator.start_race();

    let mut no_frames = 0u64;
    while orchestrator.is_racing() {
        if no_frames >= MAX_HEADLESS_FRAMES {
            anyhow::bail!("Race did not finish within {} frames!", MAX_HEADLESS_FRAMES);
        }
        clock.advance_ms(FRAME_MS);
        orchestrator.on_frame();
        no_frames += 1;
    }
    log::debug!(
        "Headless session finished after {} frames ({:.1}s simulated)",
        no_frames,
        clock.now_ms() / 1000.0
    );

    let result = ProgramResult::from_program(orchestrator.race_program());
    orchestrator.cleanup();
    Ok(result)
}

fn simulate_realtime(
    race_pars: &RacePars,
    tx: &Sender<RaceState>,
    cmd_rx: Option<&Receiver<RaceCommand>>,
    realtime_factor: f64,
) -> anyhow::Result<ProgramResult> {
    check_realtime_factor(realtime_factor)?;

    let mut orchestrator =
        RaceOrchestrator::new(race_pars.to_owned(), SystemClock::with_time_scale(realtime_factor));
    orchestrator.init();
    orchestrator.generate_program();
    orchestrator.start_race();

    let view_period = Duration::from_secs_f64(1.0 / MAX_VIEW_UPDATE_FREQUENCY);
    let mut t_view_update: Option<Instant> = None;

    while orchestrator.is_racing() {
        let t_start = Instant::now();

        if let Some(cmd_rx) = cmd_rx {
            for cmd in cmd_rx.try_iter() {
                apply_command(&mut orchestrator, cmd);
            }
        }

        orchestrator.on_frame();

        if t_view_update.map_or(true, |t| t.elapsed() >= view_period) {
            tx.send(RaceState::from_orchestrator(&orchestrator)?)
                .context("Failed to send race state to the view!")?;
            t_view_update = Some(Instant::now());
        }

        // sleep until the frame is over in real-time as well
        let t_sleep = FRAME_MS as i64 - t_start.elapsed().as_millis() as i64;
        if t_sleep > 0 {
            sleep(Duration::from_millis(t_sleep as u64));
        } else {
            log::warn!("Could not keep up with real-time!")
        }
    }

    // after the real-time loop finishes, send the final result once
    let result = ProgramResult::from_program(orchestrator.race_program());
    let mut final_msg = RaceState::from_orchestrator(&orchestrator)?;
    final_msg.final_result = Some(result.to_owned());
    tx.send(final_msg).context("Failed to send final race result to the view!")?;

    orchestrator.cleanup();
    Ok(result)
}
