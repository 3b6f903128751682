//! ata CLI — assemble parallel test forms from an IRT item bank.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ata", version, about = "Automated test assembly with 3PL information targets")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble parallel forms from an item bank
    Assemble {
        /// Item bank (.csv or .toml)
        #[arg(long)]
        items: PathBuf,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the number of forms
        #[arg(long)]
        forms: Option<usize>,

        /// Override the number of items per form
        #[arg(long)]
        items_per_form: Option<usize>,

        /// Output directory
        #[arg(long, default_value = "./ata-results")]
        output: PathBuf,

        /// Output format: table, json, all
        #[arg(long, default_value = "table")]
        format: String,

        /// Also write the model in lp_solve LP format
        #[arg(long)]
        lp: Option<PathBuf>,
    },

    /// Validate an item bank against a configuration
    Validate {
        /// Item bank (.csv or .toml)
        #[arg(long)]
        items: PathBuf,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print item information at every ability level
    Info {
        /// Item bank (.csv or .toml)
        #[arg(long)]
        items: PathBuf,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Write the assembly model in LP format without solving it
    Export {
        /// Item bank (.csv or .toml)
        #[arg(long)]
        items: PathBuf,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Destination .lp file
        #[arg(long)]
        output: PathBuf,
    },

    /// Create a starter config and example item bank
    Init,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ata=info".parse().unwrap())
                .add_directive("ata_core=info".parse().unwrap())
                .add_directive("ata_solver=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Assemble {
            items,
            config,
            forms,
            items_per_form,
            output,
            format,
            lp,
        } => commands::assemble::execute(items, config, forms, items_per_form, output, format, lp),
        Commands::Validate { items, config } => commands::validate::execute(items, config),
        Commands::Info { items, config } => commands::info::execute(items, config),
        Commands::Export {
            items,
            config,
            output,
        } => commands::export::execute(items, config, output),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
