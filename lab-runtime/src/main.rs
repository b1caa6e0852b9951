use anyhow::{anyhow, Result};
use clap::{arg, ArgAction, Command};
use lab_solver::{Solver, Surrogate};
use lab_structs::{
    config::Config,
    core::{Progress, Sample},
};
use lab_utils::{assess, generate, jsonify, load_json, load_obj, parse_seed, store_obj};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_SAMPLES: usize = 1000;

fn cli() -> Command {
    Command::new("lab-runtime")
        .about("Builds and assesses surrogates of the transient temperature of a system")
        .arg_required_else_help(true)
        .arg(
            arg!(-v --verbose "Log debug messages")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("solve")
                .about("Constructs a surrogate")
                .arg(
                    arg!(<CONFIG> "Config json string or path to json file")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(--workers [WORKERS] "Number of simulation threads")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--output [OUTPUT_FILE] "If set, the surrogate will be saved to this file path (default json)")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--compress [COMPRESS] "If output file is set, the surrogate will be compressed as zlib")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("predict")
                .about("Evaluates a surrogate at random points")
                .arg(
                    arg!(<CONFIG> "Config json string or path to json file")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(<SURROGATE> "Path to a surrogate file")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--samples [SAMPLES] "Number of points")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--seed [SEED] "Integer seed or a string used in seed generation")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(--output [OUTPUT_FILE] "If set, the sample will be saved to this file path (default json)")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--compress [COMPRESS] "If output file is set, the sample will be compressed as zlib")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("observe")
                .about("Simulates the system at random points")
                .arg(
                    arg!(<CONFIG> "Config json string or path to json file")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(--samples [SAMPLES] "Number of points")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--seed [SEED] "Integer seed or a string used in seed generation")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(--workers [WORKERS] "Number of simulation threads")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--output [OUTPUT_FILE] "If set, the sample will be saved to this file path (default json)")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--compress [COMPRESS] "If output file is set, the sample will be compressed as zlib")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("compare")
                .about("Assesses an approximation against a reference")
                .arg(
                    arg!(<REFERENCE> "Path to the sample of the simulation")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(<APPROXIMATION> "Path to the sample of the surrogate")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
}

fn main() {
    let matches = cli().get_matches();
    init_logging(matches.get_flag("verbose"));

    if let Err(e) = match matches.subcommand() {
        Some(("solve", sub_m)) => solve(
            sub_m.get_one::<String>("CONFIG").unwrap().clone(),
            sub_m.get_one::<usize>("workers").cloned(),
            sub_m.get_one::<PathBuf>("output").cloned(),
            sub_m.get_flag("compress"),
        ),
        Some(("predict", sub_m)) => predict(
            sub_m.get_one::<String>("CONFIG").unwrap().clone(),
            sub_m.get_one::<PathBuf>("SURROGATE").unwrap().clone(),
            sub_m.get_one::<usize>("samples").cloned(),
            sub_m.get_one::<String>("seed").cloned(),
            sub_m.get_one::<PathBuf>("output").cloned(),
            sub_m.get_flag("compress"),
        ),
        Some(("observe", sub_m)) => observe(
            sub_m.get_one::<String>("CONFIG").unwrap().clone(),
            sub_m.get_one::<usize>("samples").cloned(),
            sub_m.get_one::<String>("seed").cloned(),
            sub_m.get_one::<usize>("workers").cloned(),
            sub_m.get_one::<PathBuf>("output").cloned(),
            sub_m.get_flag("compress"),
        ),
        Some(("compare", sub_m)) => compare(
            sub_m.get_one::<PathBuf>("REFERENCE").unwrap().clone(),
            sub_m.get_one::<PathBuf>("APPROXIMATION").unwrap().clone(),
        ),
        _ => Err(anyhow!("Invalid subcommand")),
    } {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(config: &str, workers: Option<usize>) -> Result<Config> {
    let mut config: Config = load_json(config)?;
    if let Some(workers) = workers {
        let mut solver = config.solver_config();
        solver.workers = Some(workers);
        config.solver = Some(solver);
    }
    config.validate()?;
    Ok(config)
}

/// Sample size and seed, from the arguments or else the config.
fn sampling(config: &Config, samples: Option<usize>, seed: Option<String>) -> (usize, u64) {
    let assessment = config.assessment();
    let samples = samples
        .or(assessment.map(|a| a.samples))
        .unwrap_or(DEFAULT_SAMPLES);
    let seed = match seed {
        Some(seed) => parse_seed(&seed),
        None => assessment.map_or(0, |a| a.seed),
    };
    (samples, seed)
}

fn emit<T: Serialize>(obj: &T, output_file: Option<PathBuf>, compress: bool) -> Result<()> {
    match output_file {
        Some(path) => {
            store_obj(&path, obj, compress)?;
            info!("Saved to {}", path.display());
        }
        None => println!("{}", jsonify(obj)?),
    }
    Ok(())
}

pub fn solve(
    config: String,
    workers: Option<usize>,
    output_file: Option<PathBuf>,
    compress: bool,
) -> Result<()> {
    let config = load_config(&config, workers)?;
    let (uncertainty, system) = lab_system::build(&config)?;
    let mut solver = Solver::new(
        uncertainty,
        system,
        &config.interpolation,
        &config.solver_config(),
    )?;
    let mut last: Option<Progress> = None;
    let surrogate = solver.solve(|progress| last = Some(progress.clone()))?;
    if let Some(progress) = last {
        info!(
            "Done in {} rounds: {} nodes, {} simulations ({:.2}%)",
            progress.round,
            progress.total_requested,
            progress.total_misses,
            progress.total_miss_rate()
        );
    }
    emit(&surrogate, output_file, compress)
}

pub fn predict(
    config: String,
    surrogate_path: PathBuf,
    samples: Option<usize>,
    seed: Option<String>,
    output_file: Option<PathBuf>,
    compress: bool,
) -> Result<()> {
    let config = load_config(&config, None)?;
    let surrogate: Surrogate = load_obj(&surrogate_path)?;
    surrogate
        .validate()
        .map_err(|e| anyhow!("'{}' is not a valid surrogate: {}", surrogate_path.display(), e))?;
    let (uncertainty, system) = lab_system::build(&config)?;
    let solver = Solver::new(
        uncertainty,
        system,
        &config.interpolation,
        &config.solver_config(),
    )?;
    let (samples, seed) = sampling(&config, samples, seed);
    let points = generate(solver.inputs(), samples, seed);
    let values = solver.evaluate(&surrogate, &points)?;
    info!("Evaluated the surrogate at {} points", samples);
    emit(
        &Sample {
            inputs: surrogate.inputs,
            outputs: surrogate.outputs,
            points,
            values,
        },
        output_file,
        compress,
    )
}

pub fn observe(
    config: String,
    samples: Option<usize>,
    seed: Option<String>,
    workers: Option<usize>,
    output_file: Option<PathBuf>,
    compress: bool,
) -> Result<()> {
    let config = load_config(&config, workers)?;
    let (uncertainty, system) = lab_system::build(&config)?;
    let mut solver = Solver::new(
        uncertainty,
        system,
        &config.interpolation,
        &config.solver_config(),
    )?;
    let (samples, seed) = sampling(&config, samples, seed);
    let points = generate(solver.inputs(), samples, seed);
    let (values, stats) = solver.compute(&points)?;
    info!("Simulated the system at {} points", stats.requested);
    emit(
        &Sample {
            inputs: solver.inputs(),
            outputs: solver.outputs(),
            points,
            values,
        },
        output_file,
        compress,
    )
}

pub fn compare(reference_path: PathBuf, approximation_path: PathBuf) -> Result<()> {
    let reference: Sample = load_obj(&reference_path)?;
    let approximation: Sample = load_obj(&approximation_path)?;
    if reference.outputs != approximation.outputs || reference.points != approximation.points {
        return Err(anyhow!(
            "'{}' and '{}' are not samples at the same points",
            reference_path.display(),
            approximation_path.display()
        ));
    }
    let mut result = Map::new();
    for output in 0..reference.outputs {
        let assessment = assess(&reference.output(output), &approximation.output(output));
        result.insert(output.to_string(), serde_json::to_value(assessment)?);
    }
    println!("{}", jsonify(&Value::Object(result))?);
    Ok(())
}
