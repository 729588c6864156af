mod batch;
mod classifier;
mod cli;
mod error;
mod extract;
mod fmt;
mod formats;
mod merger;
mod models;
mod parser;
mod processed_log;
mod settings;
mod workbook;

use clap::Parser;

use cli::convert::ConvertArgs;
use cli::merge::MergeArgs;
use cli::{Cli, Commands};

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stmerge=info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Convert {
            issuer,
            in_dir,
            out_dir,
            password,
            ask_password,
            csv,
            keep_text,
        } => cli::convert::run(ConvertArgs {
            issuer,
            in_dir,
            out_dir,
            password,
            ask_password,
            csv,
            keep_text,
        }),
        Commands::Merge {
            banks,
            sbi_password,
            hdfc_password,
            icici_password,
            data_dir,
        } => cli::merge::run(MergeArgs {
            banks,
            sbi_password,
            hdfc_password,
            icici_password,
            data_dir,
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
