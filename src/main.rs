use git_deploy_hook::config::DeployConfig;
use git_deploy_hook::error::DeployError;
use git_deploy_hook::{AppState, api, logging};
use std::sync::Arc;
use tracing::{error, info, warn};

const DEFAULT_CONFIG_PATH: &str = "deploy_config.toml";

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let config_path =
        std::env::var("DEPLOY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let config = match DeployConfig::load(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let _log_guard = match logging::setup_logging(config.log_dir.clone()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Logging setup failed: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config, &config_path).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(config: DeployConfig, config_path: &str) -> Result<(), DeployError> {
    for warning in config.validate() {
        warn!("{}", warning);
    }

    let state = Arc::new(AppState::from_config(&config));
    let app = api::router(state);

    info!("Using config at {:?}", config_path);
    info!(
        "Deploying {} ({}) into {}",
        config.remote_url,
        config.target().branch_ref(),
        config.repo_path.display()
    );

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("Listening on {}", config.bind_address);
    axum::serve(listener, app).await?;
    Ok(())
}
