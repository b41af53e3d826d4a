use clap::Parser;
use parts_catalog::app::App;
use parts_catalog::cli::Args;
use parts_catalog::config::Config;
use parts_catalog::logging::setup_logging;
use std::process::ExitCode;
use tracing::info;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config before logging so a bad config is still reported.
    let config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };
    setup_logging(&config, args.tracing);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("GIT_COMMIT_SHORT"),
        environment = if cfg!(debug_assertions) {
            "development"
        } else {
            "production"
        },
        "starting parts-catalog"
    );

    let app = match App::new(config) {
        Ok(app) => app,
        Err(e) => {
            tracing::error!(error = ?e, "failed to initialize");
            return ExitCode::FAILURE;
        }
    };
    app.run(args.command).await
}
