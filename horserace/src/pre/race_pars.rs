use anyhow::Context;
use helpers::general::InputValueError;
use serde::Deserialize;
use std::fs::OpenOptions;
use std::path::Path;

/// * `base_speed_min` - (m/s) Base speed of a horse with condition 0
/// * `base_speed_max` - (m/s) Base speed of a horse with condition 100
/// * `pace_scale` - (-) Scales base speeds to the displayed race pace
/// * `momentum_min` - (-) Lower bound of the per-horse momentum multiplier
/// * `momentum_max` - (-) Upper bound of the per-horse momentum multiplier
/// * `momentum_change_prob` - (-) Probability per tick that a horse's momentum drifts
/// * `momentum_step_sd` - (-) Standard deviation of a single momentum drift step
/// * `jitter` - (-) Half-width of the uniform per-tick speed jitter around 1.0
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SpeedPars {
    pub base_speed_min: f64,
    pub base_speed_max: f64,
    pub pace_scale: f64,
    pub momentum_min: f64,
    pub momentum_max: f64,
    pub momentum_change_prob: f64,
    pub momentum_step_sd: f64,
    pub jitter: f64,
}

impl Default for SpeedPars {
    fn default() -> Self {
        SpeedPars {
            base_speed_min: 8.0,
            base_speed_max: 12.0,
            pace_scale: 10.0,
            momentum_min: 0.85,
            momentum_max: 1.15,
            momentum_change_prob: 0.1,
            momentum_step_sd: 0.05,
            jitter: 0.05,
        }
    }
}

impl SpeedPars {
    /// Highest speed the model can produce in m/s.
    pub fn max_speed(&self) -> f64 {
        self.base_speed_max * self.pace_scale * self.momentum_max * (1.0 + self.jitter)
    }

    /// Lowest speed the model can produce in m/s.
    pub fn min_speed(&self) -> f64 {
        self.base_speed_min * self.pace_scale * self.momentum_min * (1.0 - self.jitter)
    }
}

/// * `horse_count` - Number of horses in the roster
/// * `horses_per_round` - Number of horses starting in each round
/// * `round_distances` - (m) Distance of each round, the number of entries is the number of rounds
/// * `break_delay_ms` - (ms) Break between the end of a round and the start of the next one
/// * `update_interval_ms` - (ms) Minimum time between two simulation ticks
/// * `speed_pars` - Parameters of the horse speed model
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RacePars {
    pub horse_count: usize,
    pub horses_per_round: usize,
    pub round_distances: Vec<f64>,
    pub break_delay_ms: f64,
    pub update_interval_ms: f64,
    pub speed_pars: SpeedPars,
}

impl Default for RacePars {
    fn default() -> Self {
        RacePars {
            horse_count: 20,
            horses_per_round: 10,
            round_distances: vec![1200.0, 1400.0, 1600.0, 1800.0, 2000.0, 2200.0],
            break_delay_ms: 2000.0,
            update_interval_ms: 50.0,
            speed_pars: SpeedPars::default(),
        }
    }
}

impl RacePars {
    pub fn rounds_count(&self) -> usize {
        self.round_distances.len()
    }

    /// validate checks the parameters against the requirements of the simulator.
    pub fn validate(&self) -> Result<(), InputValueError> {
        if self.horse_count == 0 {
            return Err(InputValueError::NotPositive {
                name: "horse_count",
                value: 0.0,
            });
        }
        if self.round_distances.is_empty() {
            return Err(InputValueError::Empty("round_distances"));
        }
        for &distance in self.round_distances.iter() {
            if !(distance > 0.0) {
                return Err(InputValueError::NotPositive {
                    name: "round distance",
                    value: distance,
                });
            }
        }
        if self.break_delay_ms < 0.0 {
            return Err(InputValueError::OutOfRange {
                name: "break_delay_ms",
                value: self.break_delay_ms,
                min: 0.0,
                max: f64::INFINITY,
            });
        }
        if !(self.update_interval_ms > 0.0) {
            return Err(InputValueError::NotPositive {
                name: "update_interval_ms",
                value: self.update_interval_ms,
            });
        }

        let sp = &self.speed_pars;
        if !(sp.base_speed_min > 0.0) {
            return Err(InputValueError::NotPositive {
                name: "base_speed_min",
                value: sp.base_speed_min,
            });
        }
        if sp.base_speed_max < sp.base_speed_min {
            return Err(InputValueError::OutOfRange {
                name: "base_speed_max",
                value: sp.base_speed_max,
                min: sp.base_speed_min,
                max: f64::INFINITY,
            });
        }
        if !(sp.pace_scale > 0.0) {
            return Err(InputValueError::NotPositive {
                name: "pace_scale",
                value: sp.pace_scale,
            });
        }
        if !(sp.momentum_min > 0.0) || sp.momentum_max < sp.momentum_min {
            return Err(InputValueError::OutOfRange {
                name: "momentum_min",
                value: sp.momentum_min,
                min: 0.0,
                max: sp.momentum_max,
            });
        }
        if !(0.0..=1.0).contains(&sp.momentum_change_prob) {
            return Err(InputValueError::OutOfRange {
                name: "momentum_change_prob",
                value: sp.momentum_change_prob,
                min: 0.0,
                max: 1.0,
            });
        }
        if sp.momentum_step_sd < 0.0 {
            return Err(InputValueError::OutOfRange {
                name: "momentum_step_sd",
                value: sp.momentum_step_sd,
                min: 0.0,
                max: f64::INFINITY,
            });
        }
        if !(0.0..1.0).contains(&sp.jitter) {
            return Err(InputValueError::OutOfRange {
                name: "jitter",
                value: sp.jitter,
                min: 0.0,
                max: 1.0,
            });
        }

        Ok(())
    }
}

/// read_race_pars reads the JSON file and decodes the JSON string into the race parameters
/// struct. Fields missing in the file keep their default values.
pub fn read_race_pars(filepath: &Path) -> anyhow::Result<RacePars> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!(
            "Failed to open parameter file {}!",
            filepath.display()
        ))?;
    let pars: RacePars = serde_json::from_reader(&fh).context(format!(
        "Failed to parse parameter file {}!",
        filepath.display()
    ))?;
    pars.validate()
        .context(format!("Invalid parameter file {}!", filepath.display()))?;
    Ok(pars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_pars_are_valid() {
        let pars = RacePars::default();
        assert!(pars.validate().is_ok());
        assert_eq!(pars.rounds_count(), 6);
        assert!(pars.speed_pars.min_speed() > 0.0);
    }

    #[test]
    fn omitted_fields_fall_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "round_distances": [1000.0, 1500.0], "speed_pars": {{ "jitter": 0.1 }} }}"#
        )
        .unwrap();

        let pars = read_race_pars(file.path()).unwrap();
        assert_eq!(pars.round_distances, vec![1000.0, 1500.0]);
        assert_eq!(pars.horse_count, 20);
        assert_eq!(pars.speed_pars.jitter, 0.1);
        assert_eq!(pars.speed_pars.pace_scale, 10.0);
    }

    #[test]
    fn non_positive_distance_is_rejected() {
        let pars = RacePars {
            round_distances: vec![1200.0, 0.0],
            ..RacePars::default()
        };
        assert_eq!(
            pars.validate(),
            Err(InputValueError::NotPositive {
                name: "round distance",
                value: 0.0
            })
        );
    }

    #[test]
    fn empty_program_is_rejected() {
        let pars = RacePars {
            round_distances: Vec::new(),
            ..RacePars::default()
        };
        assert_eq!(
            pars.validate(),
            Err(InputValueError::Empty("round_distances"))
        );
    }

    #[test]
    fn invalid_file_reports_context() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "update_interval_ms": 0.0 }}"#).unwrap();

        let err = read_race_pars(file.path()).unwrap_err();
        assert!(err.to_string().starts_with("Invalid parameter file"));
    }

    #[test]
    fn missing_file_reports_context() {
        let err = read_race_pars(Path::new("does/not/exist.json")).unwrap_err();
        assert!(err.to_string().starts_with("Failed to open parameter file"));
    }
}
