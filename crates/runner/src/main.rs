use blotter_runner::{BlotterConfig, BlotterSession};

fn print_help() {
    eprintln!(
        r#"Blotter - live filtered, sorted and paged trade blotter

USAGE:
    blotter [OPTIONS]

OPTIONS:
    --config <PATH>     Load configuration from JSON file
    --help              Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG            Log level filter (default: info)

EXAMPLES:
    # Run with defaults until Ctrl-C
    blotter

    # Run a scripted session
    blotter --config blotter.json

    # Show every page update
    RUST_LOG=debug blotter
"#
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--config" | "-c" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
                config_path = Some(args[i].clone());
            }
            arg => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let config = if let Some(path) = config_path {
        log::info!("Loading configuration from: {}", path);
        let config = BlotterConfig::from_file(&path)?;
        log::info!("Customers: {}", config.generator.customers.len());
        log::info!("Currency pairs: {}", config.generator.currency_pairs.len());
        log::info!("Script steps: {}", config.script.len());
        config
    } else {
        log::info!("Using default configuration");
        BlotterConfig::default()
    };

    let session = BlotterSession::start(config)?;
    let summary = session.run().await?;

    log::info!(
        "Projections: {} acquired, {} released, {} leaked",
        summary.projections_acquired,
        summary.projections_released,
        summary.projections_live
    );
    Ok(())
}
