use clap::Parser;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use arti_get::cli::Cli;
use arti_get::error::GetError;

const EXIT_EXECUTION_FAILURE: i32 = 1;
const EXIT_CONFIGURATION_FAILURE: i32 = 2;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = cli.run().await {
        let exit_code = match e.downcast_ref::<GetError>() {
            Some(get_error) => {
                eprintln!("{}", get_error);
                eprintln!("{}", get_error.long_message());
                if get_error.is_configuration_failure() { EXIT_CONFIGURATION_FAILURE } else { EXIT_EXECUTION_FAILURE }
            }
            None => {
                // settings or project that could not be loaded
                eprintln!("{:#}", e);
                EXIT_CONFIGURATION_FAILURE
            }
        };
        std::process::exit(exit_code);
    }
}
