/*
    Exponential Information Gathering (EIG) solves Byzantine agreement on a
    single bit among n processes, at most f of which are faulty, in f + 1
    synchronous rounds.

    Every process keeps a tree whose nodes are labelled by relay paths of
    distinct process ids. In round r each process tells every process what
    it stored at the leaves of its tree, and the receiver files each value
    under the leaf's path extended by the sender. After f + 1 rounds every
    process resolves its tree bottom-up by majority, and the root's value is
    the decision. With n > 3f all correct processes decide the same value,
    and if they all started with the same value they decide that value.

    In the authenticated variant every value carries a chain of signatures,
    one per hop. A relay that changes a value breaks the chain and the
    receiver discards it, and majorities only count values that verified.
*/

pub mod common;
pub mod eig;
pub mod simulation;

pub use common::error::{ConfigError, VerificationError};
pub use eig::{Bit, Decision, EigTree, Participant, ProcessId, Variant};
pub use simulation::{Report, Simulation, SimulationConfig};
