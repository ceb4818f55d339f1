//! Error types shared by the tree, the participants and the simulation.

use thiserror::Error;

use crate::eig::ProcessId;

/// Fatal setup and sequencing errors. Any of these aborts the run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A simulation needs at least one participant.
    #[error("process count must be at least 1")]
    NoProcesses,

    #[error("byzantine count {byzantine} exceeds process count {processes}")]
    TooManyByzantine { byzantine: usize, processes: usize },

    #[error("got {got} initial values for {expected} processes")]
    InitialValueCount { expected: usize, got: usize },

    #[error("lie probability {0} is not a percentage")]
    LieProbability(u8),

    /// Paths cannot be longer than the number of distinct ids.
    #[error("round count {rounds} must be within 1..={processes}")]
    RoundCount { rounds: usize, processes: usize },

    #[error("public keys len {got} is not the same as process count {expected}")]
    RegistrySize { expected: usize, got: usize },

    #[error("process {0} has a different public key in the public key registry")]
    OwnKeyMismatch(ProcessId),

    #[error("process {0} runs the authenticated variant without public keys")]
    MissingPublicKeys(ProcessId),

    #[error("tree has been completed with height: {height}")]
    TreeComplete { height: usize },

    #[error("cannot {action} during {phase}")]
    Phase { action: &'static str, phase: String },
}

/// Reasons a relayed content item is rejected by the signature chain
/// verifier. These never abort a run; the item is dropped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("content value is unset")]
    UnsetValue,

    #[error("content carries no signature chain")]
    MissingChain,

    #[error("chain has {links} links for a relay path of {hops} hops")]
    ChainLength { links: usize, hops: usize },

    #[error("no public key registered for process {0}")]
    UnknownSigner(ProcessId),

    #[error("signature of process {0} does not verify")]
    BadSignature(ProcessId),

    #[error("chained value does not match the declared value")]
    ValueMismatch,
}
