//! convert: streaming transcoder between raw, RLE and Huffman encodings.
//!
//! Reads a file (or a generated sample) in chunks, pushes the chunks
//! through a filter chain built from the input and output formats, and
//! writes the result as it is produced.

mod config;
mod input_gen;
mod run;

use clap::Parser;
use config::{Args, Config};
use tracing::error;

fn main() -> anyhow::Result<()> {
    let config = Config::from_args(Args::parse())?;

    if let Some(level) = config.log_level {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    if config.print_config {
        config.print();
    }

    let metrics = match run::run(&config) {
        Ok(metrics) => metrics,
        Err(err) => {
            error!("{:#}", err);
            std::process::exit(1);
        }
    };

    if config.print_metrics {
        metrics.print_summary();
    }

    if metrics.verified == Some(false) {
        error!("verification failed: output does not decode back to the input");
        std::process::exit(1);
    }

    Ok(())
}
