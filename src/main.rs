use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use upvote::{app, session, AppState, Config, Store};

#[derive(Parser)]
#[command(name = "upvote")]
#[command(about = "Link sharing board with comments and upvotes", long_about = None)]
struct Cli {
    #[arg(short, long, help = "Path to the TOML configuration file")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "Port to listen on, overrides the configuration")]
    port: Option<u16>,
}

fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.server.workers.max(1))
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "failed to start the async runtime");
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run(config)) {
        error!(error = %e, "server stopped");
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<Config, upvote::config::ConfigError> {
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load_default()?,
    };
    let mut config = config.apply_env()?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    Ok(config)
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    info!(workers = config.server.workers, "starting upvote");

    let store = Store::connect(&config.database).await?;
    if config.database.sync {
        store.sync_schema().await?;
    }

    let address = config.bind_address();
    let listener = TcpListener::bind(&address).await?;
    info!(%address, "listening");

    let sweeper = {
        let store = store.clone();
        let period = Duration::from_secs(config.session.prune_interval_secs.max(1));
        tokio::spawn(async move {
            let mut ticks = tokio::time::interval(period);
            loop {
                ticks.tick().await;
                if let Err(e) = session::prune_expired(store.conn()).await {
                    warn!(error = %e, "failed to prune expired sessions");
                }
            }
        })
    };

    let state = AppState::new(store.clone(), config);
    let served = app(state)
        .serve(listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await;

    sweeper.abort();
    served?;
    store.close().await?;
    info!("bye");
    Ok(())
}
