use crate::core::clock::Clock;
use crate::core::orchestrator::{RaceOrchestrator, RaceStatus};
use crate::post::race_result::ProgramResult;
use anyhow::Context;

pub const MAX_VIEW_UPDATE_FREQUENCY: f64 = 20.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HorseState {
    pub horse_id: u32,
    pub name: String,
    pub color: RgbColor,
    pub position: u32,
    pub lane: u32,
    pub progress: f64,
    pub distance: f64,
}

/// RaceState is the snapshot of a session handed to the view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RaceState {
    pub status: RaceStatus,
    pub round_number: Option<u32>,
    pub round_count: usize,
    pub round_distance: Option<f64>,
    pub horse_states: Vec<HorseState>,

    // final results payload (sent once when the session ends)
    pub final_result: Option<ProgramResult>,
}

impl RaceState {
    pub fn from_orchestrator<C: Clock + Clone>(
        orchestrator: &RaceOrchestrator<C>,
    ) -> anyhow::Result<RaceState> {
        let current_round = orchestrator.current_round();
        let mut race_state = RaceState {
            status: orchestrator.status(),
            round_number: current_round.map(|round| round.round_number),
            round_count: orchestrator.race_program().len(),
            round_distance: current_round.map(|round| round.distance),
            horse_states: Vec::with_capacity(orchestrator.active_positions().len()),
            final_result: None,
        };

        for pos in orchestrator.active_positions().iter() {
            let tmp_color = pos
                .horse
                .color
                .parse::<css_color_parser::Color>()
                .context("Could not parse hex color!")?;

            race_state.horse_states.push(HorseState {
                horse_id: pos.horse.id,
                name: pos.horse.name.to_owned(),
                color: RgbColor {
                    r: tmp_color.r,
                    g: tmp_color.g,
                    b: tmp_color.b,
                },
                position: pos.position,
                lane: pos.lane,
                progress: pos.progress,
                distance: pos.distance,
            });
        }

        Ok(race_state)
    }

    /// standings_line renders the current standings as a single line of text.
    pub fn standings_line(&self) -> String {
        let round = match (self.round_number, self.round_distance) {
            (Some(number), Some(distance)) => {
                format!("Round {}/{} ({:.0}m)", number, self.round_count, distance)
            }
            _ => "No round".to_owned(),
        };
        let leaders: Vec<String> = self
            .horse_states
            .iter()
            .take(3)
            .map(|hs| format!("{}. {} {:5.1}%", hs.position, hs.name, hs.progress))
            .collect();

        format!("[{:?}] {} | {}", self.status, round, leaders.join(" | "))
    }
}
