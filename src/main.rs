//! Chassis
//!
//! Loads layered configuration files, applies `-D key=value` overrides and
//! prints the resolved keys or the value of one path.

use anyhow::Result;
use chassis_config::cli::inspect::Inspector;
use chassis_config::cli::Cli;
use chassis_config::config::{ConfigBuilder, Overrides};
use chassis_config::lifecycle::Configurator;
use clap::Parser;
use std::fs::OpenOptions;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on --log option
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    match cli.log.as_str() {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    let overrides = Overrides::from_definitions(&cli.define)?;
    let builder = ConfigBuilder::new().files(cli.config).overrides(overrides);
    let configurator = Configurator::new(builder);

    let mut inspector = Inspector::new(cli.command.unwrap_or_default());
    configurator.run(&mut inspector)
}
