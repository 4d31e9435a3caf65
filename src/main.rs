use tokio::signal;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use relaycrab::{AppState, Config, ConfigError, gateway, router};

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

const APP_NAME: &str = "🦀 relaycrab";

// -----------------------------------------------------------------------------
// ----- Main ------------------------------------------------------------------

#[tokio::main]
async fn main() -> std::io::Result<()> {
    setup();
    run_forever().await
}

// -----------------------------------------------------------------------------
// ----- Setup -----------------------------------------------------------------

fn setup() {
    // This has to be the first thing we do; nothing starts without a credential
    if let Err(e) = Config::init() {
        match e {
            ConfigError::Args(err) => err.exit(),
            other => {
                eprintln!("{other}");
                std::process::exit(1);
            }
        }
    }

    init_tracing();
}

fn init_tracing() {
    let config = Config::snapshot();
    let filter = EnvFilter::try_new(config.log_level.filter_directive())
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

// -----------------------------------------------------------------------------
// ----- Run -------------------------------------------------------------------

async fn run_forever() -> std::io::Result<()> {
    let config = Config::snapshot();

    let listener = gateway::bind(&config.host, config.port).await?;
    let local = listener.local_addr()?;
    let app = router(&config, AppState::from_config(&config, local.port()));

    info!(
        "{} ready on http://{}:{} (listening on {})",
        APP_NAME,
        config.host,
        local.port(),
        local
    );

    gateway::run_until(listener, app, async {
        let _ = signal::ctrl_c().await;
    })
    .await
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
