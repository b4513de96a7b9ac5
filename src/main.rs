use std::{io, process};

use anyhow::Result;
use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use subword2vec::{Args, Trainer};

fn configure_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_target(false)
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .finish();

    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("error installing logger: {err}");
    }
}

fn run(args: Args) -> Result<()> {
    let save_model = args.save_model;
    let trainer = Trainer::train(args)?;
    trainer.save_vectors()?;
    if save_model {
        trainer.save_model()?;
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    configure_logging(args.verbose);

    if let Err(err) = run(args) {
        eprintln!("{err:#}");
        process::exit(1);
    }
}
