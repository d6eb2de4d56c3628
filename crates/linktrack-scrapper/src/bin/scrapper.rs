//! scrapper binary.
//!
//! Reads `scrapper.toml` (or the path given with `--config`) layered under
//! the process environment, opens the SQLite store, serves the subscription
//! API and runs the periodic link scan until Ctrl-C.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use linktrack_bus::{KafkaProducer, kafka};
use linktrack_core::store::SubscriptionStore;
use linktrack_scrapper::{
  AppState, Notifier, ScrapperConfig, Scrapper, Sources,
  config::{AccessType, UpdatesTransport},
  transport::{BusTransport, HttpTransport, Transport},
};
use linktrack_sources::{GithubSource, Source, StackOverflowSource, http_client};
use linktrack_store_sqlite::{Builder, RawSql, SqliteStore};
use tokio::{net::TcpListener, sync::watch};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Link tracker scrapper")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "scrapper.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::default())
    .build()
    .context("failed to read configuration")?;

  let cfg: ScrapperConfig = settings
    .try_deserialize()
    .context("failed to deserialise ScrapperConfig")?;

  let client = http_client().context("failed to build http client")?;
  let sources: Sources = Arc::new([
    Arc::new(
      GithubSource::new(client.clone(), cfg.git_key.clone()).with_api(&cfg.github_api),
    ) as Arc<dyn Source>,
    Arc::new(StackOverflowSource::new(client.clone()).with_api(&cfg.stackoverflow_api))
      as Arc<dyn Source>,
  ]);

  let transport: Arc<dyn Transport> = match cfg.updates_transport {
    UpdatesTransport::Http => Arc::new(HttpTransport::new(client, cfg.updates_url())),
    UpdatesTransport::Bus => {
      let kafka = kafka::connect(&cfg.brokers_addr)
        .await
        .with_context(|| format!("failed to connect to brokers {}", cfg.brokers_addr))?;
      let producer = KafkaProducer::new(&kafka, &cfg.update_topic, cfg.kafka_partitions)
        .await
        .with_context(|| format!("failed to open topic {}", cfg.update_topic))?;
      Arc::new(BusTransport::new(producer))
    }
  };
  tracing::info!(transport = ?cfg.updates_transport, "update transport ready");

  match cfg.access_type {
    AccessType::Sql => {
      let store = SqliteStore::<RawSql>::open(&cfg.db_name, cfg.batch_size)
        .await
        .with_context(|| format!("failed to open store at {:?}", cfg.db_name))?;
      serve(cfg, store, sources, transport).await
    }
    AccessType::Orm => {
      let store = SqliteStore::<Builder>::open(&cfg.db_name, cfg.batch_size)
        .await
        .with_context(|| format!("failed to open store at {:?}", cfg.db_name))?;
      serve(cfg, store, sources, transport).await
    }
  }
}

async fn serve<S>(
  cfg: ScrapperConfig,
  store: S,
  sources: Sources,
  transport: Arc<dyn Transport>,
) -> anyhow::Result<()>
where
  S: SubscriptionStore + 'static,
{
  let store = Arc::new(store);
  let (shutdown_tx, shutdown_rx) = watch::channel(());

  let scrapper = Scrapper::new(
    store.clone(),
    sources.clone(),
    Notifier::new(store.clone(), transport),
  );
  let scheduler = tokio::spawn(scrapper.run(cfg.check_interval(), shutdown_rx.clone()));

  tokio::spawn(async move {
    match tokio::signal::ctrl_c().await {
      Ok(()) => {
        tracing::info!("shutdown requested");
        let _ = shutdown_tx.send(());
      }
      Err(e) => {
        // Dropping the sender would read as a shutdown; keep it alive.
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
        drop(shutdown_tx);
      }
    }
  });

  let app = linktrack_scrapper::router(AppState::new(store, sources));
  let address = cfg.listen_addr();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  let mut server_shutdown = shutdown_rx;
  axum::serve(listener, app)
    .with_graceful_shutdown(async move {
      let _ = server_shutdown.changed().await;
    })
    .await
    .context("server error")?;

  scheduler.await.context("scheduler task panicked")?;
  Ok(())
}
