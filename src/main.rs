//! TreeCopy CLI - mirror a directory tree into another directory

use clap::Parser;
use treecopy::config::{CliArgs, CopyConfig, OutputFormat};
use treecopy::error::{Result, TreeCopyError};
use tracing_subscriber::EnvFilter;

fn main() {
    let args = CliArgs::parse();

    // RUST_LOG wins over the verbosity flags
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(CopyConfig::log_directive(args.verbose, args.quiet)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &CliArgs) -> Result<()> {
    let config = CopyConfig::from_cli(args);
    tracing::debug!("Configuration: {:?}", config);

    let result = treecopy::copy_with_config(&config)?;

    if args.quiet {
        return Ok(());
    }
    match config.output_format {
        OutputFormat::Text => result.print_summary(),
        OutputFormat::Json => {
            let json = result
                .to_json()
                .map_err(|e| TreeCopyError::config(format!("Cannot render summary: {}", e)))?;
            println!("{}", json);
        }
    }
    Ok(())
}
