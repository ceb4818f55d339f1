//! Configuration for a simulation run.

use crate::common::error::ConfigError;
use crate::eig::{Bit, Variant};

pub const DEFAULT_LIE_PROB: u8 = 50;
pub const DEFAULT_SEED: u64 = 12345;

/// Inputs of one simulation run.
#[derive(Clone, Debug)]
pub struct SimulationConfig {
    /// Number of participants, `n`.
    pub process_count: usize,

    /// Number of Byzantine participants, `f`. Whether `n > 3f` holds is
    /// left to the caller.
    pub byzantine_count: usize,

    /// One value per participant. Random bits when absent.
    pub initial_values: Option<Vec<Bit>>,

    /// Percent chance that a Byzantine participant corrupts a content item.
    pub lie_prob: u8,

    /// Number of rounds. `f + 1` when absent.
    pub rounds: Option<usize>,

    pub variant: Variant,

    /// Seed for every random choice of the run.
    pub seed: u64,

    /// Drive participants on the rayon pool within each round.
    pub parallel: bool,
}

impl SimulationConfig {
    pub fn new(process_count: usize, byzantine_count: usize) -> Self {
        Self {
            process_count,
            byzantine_count,
            initial_values: None,
            lie_prob: DEFAULT_LIE_PROB,
            rounds: None,
            variant: Variant::Plain,
            seed: DEFAULT_SEED,
            parallel: true,
        }
    }

    pub fn with_initial_values(mut self, values: Vec<Bit>) -> Self {
        self.initial_values = Some(values);
        self
    }

    pub fn with_lie_prob(mut self, lie_prob: u8) -> Self {
        self.lie_prob = lie_prob;
        self
    }

    pub fn with_rounds(mut self, rounds: usize) -> Self {
        self.rounds = Some(rounds);
        self
    }

    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variant = variant;
        self
    }

    pub fn authenticated(self) -> Self {
        self.with_variant(Variant::Authenticated)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn round_count(&self) -> usize {
        self.rounds.unwrap_or(self.byzantine_count + 1)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.process_count == 0 {
            return Err(ConfigError::NoProcesses);
        }
        if self.byzantine_count > self.process_count {
            return Err(ConfigError::TooManyByzantine {
                byzantine: self.byzantine_count,
                processes: self.process_count,
            });
        }
        if let Some(values) = &self.initial_values {
            if values.len() != self.process_count {
                return Err(ConfigError::InitialValueCount {
                    expected: self.process_count,
                    got: values.len(),
                });
            }
        }
        if self.lie_prob > 100 {
            return Err(ConfigError::LieProbability(self.lie_prob));
        }
        let rounds = self.round_count();
        if rounds == 0 || rounds > self.process_count {
            return Err(ConfigError::RoundCount {
                rounds,
                processes: self.process_count,
            });
        }
        Ok(())
    }
}
