use crate::core::program::Round;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::Path;

/// Placing stores one finishing position of a round for post-processing the results.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Placing {
    pub rank: u32,
    pub horse_id: u32,
    pub name: String,
    pub condition: u8,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RoundResult {
    pub round_number: u32,
    pub distance: f64,
    pub placings: Vec<Placing>,
}

impl RoundResult {
    /// is_upset is true if the winner was not (one of) the fittest horses of the field.
    pub fn is_upset(&self) -> bool {
        let best_condition = self.placings.iter().map(|p| p.condition).max();
        match (self.placings.first(), best_condition) {
            (Some(winner), Some(best)) => winner.condition < best,
            _ => false,
        }
    }
}

/// ProgramResult contains the results of all rounds of a program that have been run.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ProgramResult {
    pub rounds: Vec<RoundResult>,
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    round: u32,
    distance: f64,
    rank: u32,
    horse_id: u32,
    name: &'a str,
    condition: u8,
}

impl ProgramResult {
    /// from_program collects the results of all rounds that have been run, skipping the rest.
    pub fn from_program(program: &[Round]) -> ProgramResult {
        let rounds = program
            .iter()
            .filter_map(|round| {
                round.results.as_ref().map(|results| RoundResult {
                    round_number: round.round_number,
                    distance: round.distance,
                    placings: results
                        .iter()
                        .enumerate()
                        .map(|(idx, horse)| Placing {
                            rank: idx as u32 + 1,
                            horse_id: horse.id,
                            name: horse.name.to_owned(),
                            condition: horse.condition,
                        })
                        .collect(),
                })
            })
            .collect();

        ProgramResult { rounds }
    }

    pub fn count_upsets(&self) -> usize {
        self.rounds.iter().filter(|round| round.is_upset()).count()
    }

    /// format_results returns a printable table of all placings.
    pub fn format_results(&self) -> anyhow::Result<String> {
        let mut content = String::new();

        for round in self.rounds.iter() {
            writeln!(
                &mut content,
                "RESULT: Round {} ({:.0}m)",
                round.round_number, round.distance
            )?;
            for placing in round.placings.iter() {
                writeln!(
                    &mut content,
                    "{:3}. {:12} (#{:2}, condition {:3})",
                    placing.rank, placing.name, placing.horse_id, placing.condition
                )?;
            }
        }
        writeln!(
            &mut content,
            "RESULT: {} of {} rounds won by an outsider",
            self.count_upsets(),
            self.rounds.len()
        )?;

        Ok(content)
    }

    /// print_results prints the placings of all rounds to the console output.
    pub fn print_results(&self) -> anyhow::Result<()> {
        print!("{}", self.format_results()?);
        Ok(())
    }

    /// write_results_to_csv writes one row per placing to a CSV file, by default
    /// output/last_run.csv. Returns the path to the written file.
    pub fn write_results_to_csv(&self, path: Option<&Path>) -> anyhow::Result<String> {
        let out_path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let out_dir = Path::new("output");
                std::fs::create_dir_all(out_dir)?;
                out_dir.join("last_run.csv")
            }
        };

        let mut writer = csv::Writer::from_path(&out_path).context(format!(
            "Failed to create result file {}!",
            out_path.display()
        ))?;
        for round in self.rounds.iter() {
            for placing in round.placings.iter() {
                writer.serialize(CsvRow {
                    round: round.round_number,
                    distance: round.distance,
                    rank: placing.rank,
                    horse_id: placing.horse_id,
                    name: &placing.name,
                    condition: placing.condition,
                })?;
            }
        }
        writer.flush()?;

        Ok(out_path.to_string_lossy().into_owned())
    }
}
