use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    sync::Arc,
};

use anyhow::Context as _;
use axum::{extract::FromRef, routing::get, Router};
use clap::Parser;
use clap_verbosity_flag::{log::LevelFilter, InfoLevel, Verbosity};
use figment::{providers::Format as _, Figment};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use super::community::Engine;
use super::config::AppConfig;
use super::db::establish_pool;
pub use super::error::Error;
use super::store::Store;

/// The application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;
/// The engine as shared between request handlers.
pub type SharedCommunity = Arc<Engine>;

#[derive(Parser, Debug, Clone)]
/// Command line arguments.
pub struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "default.toml")]
    pub config: PathBuf,
    /// The verbosity level.
    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,
}

#[derive(Clone, FromRef)]
/// The application state, shared across all routes.
pub struct AppState {
    /// The application configuration.
    pub(crate) config: AppConfig,
    /// The community engine.
    pub community: SharedCommunity,
}

impl AppState {
    /// Opens the database named by `config` and builds the engine over it.
    pub async fn open(config: AppConfig) -> anyhow::Result<Self> {
        let pool = establish_pool(&config.db)
            .await
            .context("failed to establish database connection pool")?;

        let community = Engine::sqlite(
            Store::new(pool),
            config.feed.clone(),
            config.notify.clone(),
        );

        Ok(Self {
            config,
            community: Arc::new(community),
        })
    }
}

/// The full HTTP surface over `state`.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(super::index))
        .nest("/api", super::endpoints::routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The main application entry point.
pub async fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    // Set up trace logging to console and account for the user-provided verbosity flag.
    if args.verbosity.log_level_filter() != LevelFilter::Off {
        let lvl = match args.verbosity.log_level_filter() {
            LevelFilter::Error => tracing::Level::ERROR,
            LevelFilter::Warn => tracing::Level::WARN,
            LevelFilter::Info | LevelFilter::Off => tracing::Level::INFO,
            LevelFilter::Debug => tracing::Level::DEBUG,
            LevelFilter::Trace => tracing::Level::TRACE,
        };
        tracing_subscriber::fmt().with_max_level(lvl).init();
    }

    if !args.config.exists() {
        // Throw up a warning if the config file does not exist.
        //
        // This is not fatal because users can specify all configuration settings via
        // the environment, but the most likely scenario here is that a user accidentally
        // omitted the config file for some reason (e.g. forgot to mount it into Docker).
        warn!(
            "configuration file {} does not exist",
            args.config.display()
        );
    }

    // Read and parse the user-provided configuration.
    let config: AppConfig = Figment::new()
        .admerge(figment::providers::Toml::file(args.config))
        .admerge(figment::providers::Env::prefixed("COHORT_"))
        .extract()
        .context("failed to load configuration")?;

    if config.test {
        warn!("cohort starting up in TEST mode.");
        warn!(
            "If you want to turn this off, either set `test` to false in the config or define `COHORT_TEST = false`"
        );
    }

    // Initialize metrics reporting.
    super::metrics::setup(config.metrics.as_ref()).context("failed to set up metrics exporter")?;

    let addr = config
        .listen_address
        .unwrap_or(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8000));

    let state = AppState::open(config).await?;
    let app = app(state);

    info!("listening on {addr}");
    info!("connect to: http://127.0.0.1:{}", addr.port());

    let listener = TcpListener::bind(&addr)
        .await
        .context("failed to bind address")?;

    axum::serve(listener, app.into_make_service())
        .await
        .context("failed to serve app")
}
