use std::error::Error;
use std::fs::File;
use std::io::BufWriter;

use clap::Parser;
use tracing::info;

use pairing_fciqmc::{read_config, write_trace, FullCi, PopulationEngine};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "fciqmc.yml")]
    config: String,

    /// Overrides the seed from the config file
    #[arg(short, long)]
    seed: Option<u64>,

    /// Scan for a time step before the run
    #[arg(long)]
    search_time_step: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut config = read_config(&args.config)?;
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    config.search_time_step |= args.search_time_step;

    let hamiltonian = config.system.build_hamiltonian()?;
    info!(
        nmo = hamiltonian.basis().nmo(),
        particles = hamiltonian.basis().particle_number(),
        strength = hamiltonian.strength(),
        "pairing model built"
    );

    let exact = if config.skip_fci {
        None
    } else {
        Some(FullCi::new(&hamiltonian)?.ground_energy())
    };

    let seed = config.seed.unwrap_or_else(rand::random);
    let mut engine = PopulationEngine::with_seed(&hamiltonian, config.fciqmc.clone(), seed)?;
    if config.search_time_step {
        engine.search_time_step()?;
    }
    engine.run()?;
    let stats = engine.statistics(config.equilibration)?;

    if let Some(path) = &config.trace_file {
        write_trace(BufWriter::new(File::create(path)?), engine.trace())?;
    }

    println!("FCIQMC Results for the Pairing Model");
    println!("------------------------------------");
    println!("Seed: {}", seed);
    println!("Time step: {}", engine.params().d_tau);
    println!("Reference energy: {:.6}", engine.reference_energy());
    println!(
        "Projected energy: {:.6} ± {:.6} (std. dev. {:.6})",
        stats.energy.mean, stats.energy.error, stats.energy.std_dev
    );
    println!(
        "Shift: {:.6} ± {:.6} (std. dev. {:.6})",
        stats.shift.mean, stats.shift.error, stats.shift.std_dev
    );
    println!("Walkers: {:.1} ± {:.1}", stats.population.mean, stats.population.std_dev);
    println!("Samples: {}", stats.samples);
    if let Some(e) = exact {
        println!("Full CI energy: {:.6}", e);
        println!("Correlation energy: {:.6}", e - engine.reference_energy());
    }
    Ok(())
}
