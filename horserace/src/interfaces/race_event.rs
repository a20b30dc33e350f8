use crate::core::horse::Horse;
use serde::Serialize;

/// RaceEvent notifies the presentation layer about lifecycle transitions of a race session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RaceEvent {
    ProgramGenerated { rounds: usize },
    RoundStarted { round_number: u32, distance: f64 },
    RoundFinished { round_number: u32, results: Vec<Horse> },
    RaceFinished { rounds: usize },
}

/// RaceCommand is sent by the presentation layer to a running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceCommand {
    Pause,
    Resume,
    Stop,
    Restart,
}

impl RaceCommand {
    /// from_key maps the single-key commands of the live mode.
    pub fn from_key(key: &str) -> Option<RaceCommand> {
        match key.trim().to_lowercase().as_str() {
            "p" | "pause" => Some(RaceCommand::Pause),
            "r" | "resume" => Some(RaceCommand::Resume),
            "s" | "stop" | "q" | "quit" => Some(RaceCommand::Stop),
            "n" | "restart" => Some(RaceCommand::Restart),
            _ => None,
        }
    }
}
