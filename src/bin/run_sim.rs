use clap::Parser;
use log::info;
use membrane_transport::{
    checkpoint::{self, CheckpointWriter},
    config::{run::RunConfig, setup::SetupConfig},
    dynamics::run,
};

#[derive(Debug, clap::Parser)]
#[command(
    name = "run_sim",
    about = "Run a membrane transport scenario headlessly..."
)]
pub struct RunCli {
    /// Scenario YAML file.
    #[arg(short = 's', long = "setup")]
    pub setup: std::path::PathBuf,

    #[arg(short = 't')]
    pub t_max: f64,

    /// Seconds of simulated time between checkpoints.
    #[arg(short = 'd', long = "dt-checkpoint", default_value_t = 1.0)]
    pub dt_checkpoint: f64,

    /// Checkpoint output file (JSON lines). No checkpoints if omitted.
    #[arg(short = 'o', long = "out")]
    pub out: Option<std::path::PathBuf>,

    /// Resume from the latest checkpoint in this file instead of the
    /// scenario's initial state.
    #[arg(long = "resume")]
    pub resume: Option<std::path::PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = RunCli::parse();

    let setup_config = SetupConfig::parse(&args.setup)?;
    setup_config.print();

    let mut state = match &args.resume {
        Some(path) => {
            let state = checkpoint::read_latest(path)?;
            info!("Resuming from step {}, t = {:.2} s", state.step, state.t);
            state
        }
        None => setup_config.build_state(),
    };

    let run_config = RunConfig {
        t_max: args.t_max,
        dstep_checkpoint: setup_config.parameters.to_steps(args.dt_checkpoint).max(1),
    };

    let mut writer = match &args.out {
        Some(path) => Some(CheckpointWriter::create(path)?),
        None => None,
    };
    run(
        &setup_config.parameters,
        &mut state,
        &run_config,
        writer.as_mut(),
    )?;
    println!("Done!");
    Ok(())
}
