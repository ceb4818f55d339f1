use clap::Parser;
use tracing_subscriber::EnvFilter;

use eig_sim::simulation::{DEFAULT_LIE_PROB, DEFAULT_SEED};
use eig_sim::{Bit, Simulation, SimulationConfig, Variant};

/// Run one EIG Byzantine agreement simulation and report the outcome.
#[derive(Parser, Debug)]
#[command(name = "eig-sim", version, about)]
struct Args {
    /// Number of processes.
    #[arg(short = 'n', long, default_value_t = 4)]
    processes: usize,

    /// Number of Byzantine processes.
    #[arg(short = 'f', long, default_value_t = 1)]
    byzantine: usize,

    /// Initial values, one 0 or 1 per process. Random when omitted.
    #[arg(long, value_delimiter = ',', value_parser = parse_bit)]
    values: Option<Vec<Bit>>,

    /// Percent chance that a Byzantine process corrupts a relayed value.
    #[arg(long, default_value_t = DEFAULT_LIE_PROB)]
    lie_prob: u8,

    /// Number of rounds. Defaults to byzantine + 1.
    #[arg(long)]
    rounds: Option<usize>,

    /// Sign every relayed value and discard broken chains.
    #[arg(long)]
    authenticated: bool,

    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Drive processes one at a time instead of on the thread pool.
    #[arg(long)]
    sequential: bool,

    /// Print every process's tree after deciding.
    #[arg(long)]
    dump_trees: bool,
}

fn parse_bit(s: &str) -> Result<Bit, String> {
    let v: u8 = s.trim().parse().map_err(|e| format!("{}: {}", s, e))?;
    Bit::try_from(v).map_err(|v| format!("{} is not a bit", v))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = SimulationConfig::new(args.processes, args.byzantine)
        .with_lie_prob(args.lie_prob)
        .with_seed(args.seed)
        .with_parallel(!args.sequential);
    if let Some(values) = args.values {
        config = config.with_initial_values(values);
    }
    if let Some(rounds) = args.rounds {
        config = config.with_rounds(rounds);
    }
    if args.authenticated {
        config = config.with_variant(Variant::Authenticated);
    }

    let mut sim = Simulation::new(config)?;
    let report = sim.run()?;

    if args.dump_trees {
        for p in sim.processes() {
            println!("process {}:\n{}\n", p.id(), p.tree());
        }
    }

    let initial: Vec<String> = sim.initial_values().iter().map(|v| v.to_string()).collect();
    println!("initial values: [{}]", initial.join(", "));
    println!("byzantine: {:?}", sim.byzantine());
    for (id, decision) in &report.decisions {
        println!("process {}: {}", id, decision);
    }
    println!("failed requirements: {}", report);

    Ok(())
}
