use std::fmt;
use std::sync::Arc;

use rand::{seq::index, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, info};

use super::config::SimulationConfig;
use super::report::Report;
use crate::common::error::ConfigError;
use crate::eig::{Bit, Decision, Message, Participant, ProcessId, PublicKeyRegistry, Variant};

/// Where a simulation stands. Runs move strictly forward:
/// `Setup -> Round(1..=R) -> Decide -> Evaluate`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SimulationPhase {
    Setup,
    Round(usize),
    Decide,
    Evaluate,
}

impl fmt::Display for SimulationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationPhase::Setup => write!(f, "setup"),
            SimulationPhase::Round(r) => write!(f, "round {}", r),
            SimulationPhase::Decide => write!(f, "decide"),
            SimulationPhase::Evaluate => write!(f, "evaluate"),
        }
    }
}

/// Lock-step driver for one EIG run.
///
/// Setup draws the initial values, the Byzantine set and every
/// participant's private random source from the configured seed, so a
/// seed fully determines the run whether rounds execute in parallel or not.
pub struct Simulation {
    config: SimulationConfig,
    rounds: usize,
    processes: Vec<Participant>,
    byzantine: Vec<ProcessId>,
    initial_values: Vec<Bit>,
    public_keys: Arc<PublicKeyRegistry>,
    phase: SimulationPhase,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let n = config.process_count;
        let rounds = config.round_count();
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

        let initial_values = match &config.initial_values {
            Some(values) => values.clone(),
            None => (0..n).map(|_| Bit::random(&mut rng)).collect(),
        };

        let mut byzantine: Vec<ProcessId> = index::sample(&mut rng, n, config.byzantine_count)
            .into_iter()
            .map(|i| i as ProcessId + 1)
            .collect();
        byzantine.sort_unstable();

        let mut processes: Vec<Participant> = (1..=n as ProcessId)
            .map(|id| {
                let participant = Participant::new(
                    id,
                    n,
                    initial_values[id as usize - 1],
                    rounds,
                    config.variant,
                    ChaCha8Rng::seed_from_u64(rng.gen()),
                );
                if byzantine.contains(&id) {
                    participant.with_byzantine(config.lie_prob)
                } else {
                    participant
                }
            })
            .collect();

        let public_keys = Arc::new(PublicKeyRegistry::new(
            processes.iter().map(|p| p.pubkey()).collect(),
        ));
        if config.variant == Variant::Authenticated {
            for p in processes.iter_mut() {
                p.set_public_keys(Arc::clone(&public_keys))?;
            }
        }

        info!(
            processes = n,
            byzantine = ?byzantine,
            rounds,
            variant = %config.variant,
            seed = config.seed,
            "Simulation set up"
        );

        Ok(Simulation {
            config,
            rounds,
            processes,
            byzantine,
            initial_values,
            public_keys,
            phase: SimulationPhase::Setup,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn rounds(&self) -> usize {
        self.rounds
    }

    pub fn phase(&self) -> SimulationPhase {
        self.phase
    }

    pub fn processes(&self) -> &[Participant] {
        &self.processes
    }

    pub fn process(&self, id: ProcessId) -> Option<&Participant> {
        self.processes.get((id as usize).checked_sub(1)?)
    }

    pub fn byzantine(&self) -> &[ProcessId] {
        &self.byzantine
    }

    pub fn initial_values(&self) -> &[Bit] {
        &self.initial_values
    }

    pub fn public_keys(&self) -> &PublicKeyRegistry {
        &self.public_keys
    }

    pub fn final_decisions(&self) -> Vec<Decision> {
        self.processes.iter().map(|p| p.decision()).collect()
    }

    fn completed_rounds(&self) -> usize {
        match self.phase {
            SimulationPhase::Setup => 0,
            SimulationPhase::Round(r) => r,
            SimulationPhase::Decide | SimulationPhase::Evaluate => self.rounds,
        }
    }

    /// One synchronous round: every participant builds one message per
    /// recipient, all messages are delivered, then every participant grows
    /// its tree and applies what it received.
    pub fn run_round(&mut self) -> Result<(), ConfigError> {
        match self.phase {
            SimulationPhase::Setup | SimulationPhase::Round(_) => {}
            phase => {
                return Err(ConfigError::Phase {
                    action: "run a round",
                    phase: phase.to_string(),
                })
            }
        }
        let completed = self.completed_rounds();
        if completed >= self.rounds {
            return Err(ConfigError::TreeComplete { height: completed });
        }
        let round = completed + 1;

        let recipients: Vec<ProcessId> = self.processes.iter().map(|p| p.id()).collect();
        let outboxes: Vec<Vec<Message>> = if self.config.parallel {
            self.processes
                .par_iter_mut()
                .map(|p| p.generate_msgs(&recipients))
                .collect()
        } else {
            self.processes
                .iter_mut()
                .map(|p| p.generate_msgs(&recipients))
                .collect()
        };

        let mut inboxes: Vec<Vec<Message>> = recipients
            .iter()
            .map(|_| Vec::with_capacity(recipients.len()))
            .collect();
        for outbox in outboxes {
            for (inbox, message) in inboxes.iter_mut().zip(outbox) {
                inbox.push(message);
            }
        }
        for (p, inbox) in self.processes.iter_mut().zip(inboxes) {
            p.receive_msgs(inbox);
        }

        if self.config.parallel {
            self.processes.par_iter_mut().try_for_each(advance)?;
        } else {
            self.processes.iter_mut().try_for_each(advance)?;
        }

        self.phase = SimulationPhase::Round(round);
        debug!(round, "Round complete");
        Ok(())
    }

    /// Every participant runs the decision rule on its own tree.
    pub fn decide(&mut self) -> Result<Vec<Decision>, ConfigError> {
        if self.phase != SimulationPhase::Round(self.rounds) {
            return Err(ConfigError::Phase {
                action: "decide",
                phase: self.phase.to_string(),
            });
        }
        for p in self.processes.iter_mut() {
            p.decide();
        }
        self.phase = SimulationPhase::Decide;
        Ok(self.final_decisions())
    }

    pub fn evaluate(&mut self) -> Result<Report, ConfigError> {
        match self.phase {
            SimulationPhase::Decide | SimulationPhase::Evaluate => {}
            phase => {
                return Err(ConfigError::Phase {
                    action: "evaluate",
                    phase: phase.to_string(),
                })
            }
        }
        let report = Report::evaluate(&self.processes);
        self.phase = SimulationPhase::Evaluate;

        info!(
            agreement = report.agreement,
            validity = report.validity,
            termination = report.termination,
            "Simulation evaluated"
        );
        Ok(report)
    }

    /// Runs every remaining round, decides and evaluates.
    pub fn run(&mut self) -> Result<Report, ConfigError> {
        while self.completed_rounds() < self.rounds {
            self.run_round()?;
        }
        self.decide()?;
        self.evaluate()
    }
}

fn advance(p: &mut Participant) -> Result<(), ConfigError> {
    p.add_tree_level()?;
    p.apply_msgs()
}
