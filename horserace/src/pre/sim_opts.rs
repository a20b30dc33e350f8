use clap::Parser;
use helpers::general::InputValueError;
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[clap(
    version = "0.1.0",
    author = "Alexander Heilmeier <alexander.heilmeier@tum.de>",
    name = "HORSERACE",
    about = "A frame-driven multi-round horse race simulator written in Rust"
)]
pub struct SimOpts {
    // FLAGS ---------------------------------------------------------------------------------------
    /// Activate debug logging
    #[clap(short, long)]
    pub debug: bool,

    /// Race in real-time with live standings, commands are read from stdin (p, r, s, n, q)
    #[clap(short, long)]
    pub live: bool,

    // OPTIONS -------------------------------------------------------------------------------------
    /// Set number of race sessions (only for non-live mode, ignored in live mode)
    #[clap(short, long, default_value = "1")]
    pub no_sim_runs: u32,

    /// Set path to the race parameter file (OPTIONAL: if not set, uses the default program)
    #[clap(short, long)]
    pub parfile_path: Option<PathBuf>,

    /// Set real-time factor (only relevant in live mode)
    #[clap(short, long, default_value = "1.0")]
    pub realtime_factor: f64,

    /// Set path of the CSV file the results of the last session are written to
    #[clap(short, long)]
    pub output_path: Option<PathBuf>,
}

impl SimOpts {
    /// validate checks the options that clap cannot check on its own.
    pub fn validate(&self) -> Result<(), InputValueError> {
        check_realtime_factor(self.realtime_factor)
    }
}

/// check_realtime_factor rejects factors that would stop (or reverse) the simulated time.
pub fn check_realtime_factor(realtime_factor: f64) -> Result<(), InputValueError> {
    if !(realtime_factor > 0.0) {
        return Err(InputValueError::NotPositive {
            name: "realtime_factor",
            value: realtime_factor,
        });
    }
    Ok(())
}
