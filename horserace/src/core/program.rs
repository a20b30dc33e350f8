use crate::core::horse::{select_horses, Horse};
use crate::pre::race_pars::RacePars;
use rand::Rng;
use serde::Serialize;

/// * `id` - Round id, equal to the round number
/// * `round_number` - 1-based position of the round in the program
/// * `distance` - (m) Race distance of the round
/// * `horses` - Horses starting in the round, in lane order
/// * `results` - Horses ordered by finishing rank, set once the round has been run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Round {
    pub id: u32,
    pub round_number: u32,
    pub distance: f64,
    pub horses: Vec<Horse>,
    pub results: Option<Vec<Horse>>,
}

impl Round {
    pub fn is_complete(&self) -> bool {
        self.results.is_some()
    }
}

/// build_program creates one round per configured distance. Each round gets a random subset of
/// `horses`; an empty roster yields rounds without horses.
pub fn build_program<R: Rng + ?Sized>(
    horses: &[Horse],
    race_pars: &RacePars,
    rng: &mut R,
) -> Vec<Round> {
    race_pars
        .round_distances
        .iter()
        .enumerate()
        .map(|(idx, &distance)| Round {
            id: idx as u32 + 1,
            round_number: idx as u32 + 1,
            distance,
            horses: select_horses(race_pars.horses_per_round, horses, rng),
            results: None,
        })
        .collect()
}
