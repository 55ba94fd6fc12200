// Entrypoint for the smoke test.
// - Keeps `main` small: resolve config, build the client, run the steps.
// - Exit status comes from the outcome (0 ok, 1 upload failed, 2 no API key).

use std::process::ExitCode;

use clap::Parser;
use mockup_smoke::api::ApiClient;
use mockup_smoke::config::{Args, RunConfig};
use mockup_smoke::steps;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

fn main() -> ExitCode {
    let args = Args::parse();

    let log_level = if args.verbose { Level::DEBUG } else { Level::WARN };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let config = match RunConfig::from_args(args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("ERROR: {err}");
            return ExitCode::from(err.exit_code());
        }
    };

    let api = match ApiClient::new(&config.base_url, &config.api_key, config.timeout) {
        Ok(api) => api,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    match steps::run(&api, &config) {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
