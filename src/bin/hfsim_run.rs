use hfsim::prelude::*;
use hfsim::StrError;
use structopt::StructOpt;

/// Command line options
#[derive(StructOpt, Debug)]
#[structopt(name = "hfsim_run", about = "Runs a hydraulic fracture simulation described by a JSON file")]
struct Options {
    /// Simulation input (JSON)
    input: String,

    /// Writes the final state to this JSON file
    #[structopt(short, long)]
    output: Option<String>,

    /// Disables the convergence table
    #[structopt(short, long)]
    quiet: bool,
}

fn main() -> Result<(), StrError> {
    // parse options
    let options = Options::from_args();

    // load data
    let mut input = SimulationInput::read_json(&options.input)?;
    if options.quiet {
        input.config.set_verbose(false, false)?;
    }

    // run
    let mut controller = Controller::new(&input)?;
    let center = input.injection.source;
    let res = controller.run_with(|state, at_checkpoint| {
        if at_checkpoint {
            println!(
                "checkpoint: t = {:e}, mean radius = {:e}, max opening = {:e}",
                state.t,
                state.mean_radius(center),
                state.max_opening()
            );
        }
        true
    });

    // message
    let state = controller.state();
    let thin_line = format!("{:─^1$}", "", 60);
    println!("\n{}", thin_line);
    println!("status            = {:?}", controller.status());
    println!("time              = {:e}", state.t);
    println!("time steps        = {}", state.n_timestep);
    println!("fracture volume   = {:e}", state.fracture_volume());
    println!("efficiency        = {:.4}", state.efficiency());
    println!("active elements   = {}", state.regions.active.len());
    println!("{}\n", thin_line);
    if let Some(path) = &options.output {
        state.write_json(path)?;
    }
    res
}
