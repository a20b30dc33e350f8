use clap::Parser;
use horserace::core::handle_race::handle_race;
use horserace::interfaces::race_event::RaceCommand;
use horserace::post::race_result::ProgramResult;
use horserace::pre::race_pars::{read_race_pars, RacePars};
use horserace::pre::sim_opts::SimOpts;
use rayon::prelude::*;
use std::io::BufRead;
use std::thread;
use std::time::Instant;

/// spawn_command_reader forwards keyboard commands from stdin to the session thread. The reader
/// thread is detached, it ends with the process.
fn spawn_command_reader(cmd_tx: flume::Sender<RaceCommand>) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(_) => break,
            };
            match RaceCommand::from_key(&line) {
                Some(cmd) => {
                    if cmd_tx.send(cmd).is_err() {
                        break;
                    }
                }
                None => log::warn!("Unknown command '{}', use p, r, s, n or q", line.trim()),
            }
        }
    });
}

fn finish(result: &ProgramResult, sim_opts: &SimOpts) -> anyhow::Result<()> {
    result.print_results()?;

    if let Some(output_path) = &sim_opts.output_path {
        let path = result.write_results_to_csv(Some(output_path))?;
        log::info!("Results written to {}", path);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    // PRE-PROCESSING ------------------------------------------------------------------------------
    // get simulation options from the command line arguments
    let sim_opts: SimOpts = SimOpts::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if sim_opts.debug { "debug" } else { "info" }),
    )
    .init();

    // get race parameters
    let race_pars = if let Some(parfile_path) = &sim_opts.parfile_path {
        log::info!("Reading race parameters from {:?}", parfile_path);
        read_race_pars(parfile_path)?
    } else {
        RacePars::default()
    };
    race_pars.validate()?;
    sim_opts.validate()?;

    log::info!(
        "Racing {} rounds with {} of {} horses each, tick interval {:.0}ms",
        race_pars.rounds_count(),
        race_pars.horses_per_round,
        race_pars.horse_count,
        race_pars.update_interval_ms
    );

    // EXECUTION -----------------------------------------------------------------------------------
    if !sim_opts.live {
        // HEADLESS CASE - sessions are independent and run in parallel
        let t_start = Instant::now();

        let results: Vec<ProgramResult> = (0..sim_opts.no_sim_runs.max(1))
            .into_par_iter()
            .map(|_| handle_race(&race_pars, None, None, 1.0))
            .collect::<anyhow::Result<Vec<ProgramResult>>>()?;

        log::info!(
            "Execution time for {} session(s): {}ms",
            results.len(),
            t_start.elapsed().as_millis()
        );

        let no_rounds: usize = results.iter().map(|r| r.rounds.len()).sum();
        let no_upsets: usize = results.iter().map(|r| r.count_upsets()).sum();
        if results.len() > 1 {
            println!(
                "RESULT: {} of {} rounds over {} sessions won by an outsider",
                no_upsets,
                no_rounds,
                results.len()
            );
        }

        if let Some(last) = results.last() {
            finish(last, &sim_opts)?;
        }
    } else {
        // LIVE CASE - real-time session with standings printed by the main thread
        log::info!("Starting live session, commands: p = pause, r = resume, s = stop, n = restart");

        let (tx, rx) = flume::unbounded();
        let (cmd_tx, cmd_rx) = flume::unbounded();

        let race_pars_thread = race_pars.clone();
        let realtime_factor = sim_opts.realtime_factor;
        let session = thread::spawn(move || {
            handle_race(&race_pars_thread, Some(&tx), Some(&cmd_rx), realtime_factor)
        });

        spawn_command_reader(cmd_tx);

        let mut last_line = String::new();
        for race_state in rx.iter() {
            if race_state.final_result.is_some() {
                break;
            }
            let line = race_state.standings_line();
            if line != last_line {
                println!("{}", line);
                last_line = line;
            }
        }

        let result = session
            .join()
            .map_err(|_| anyhow::anyhow!("Race session thread panicked!"))??;
        finish(&result, &sim_opts)?;
    }

    Ok(())
}
