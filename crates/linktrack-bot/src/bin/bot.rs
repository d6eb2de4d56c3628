//! bot binary.
//!
//! Reads `bot.toml` (or the path given with `--config`) layered under the
//! process environment, registers the command menu, long-polls the chat
//! platform and receives link updates over HTTP or the message bus until
//! Ctrl-C.

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use clap::Parser;
use linktrack_bot::{
  Bot, BotConfig, ChatClient, Poller, ScrapperClient, TelegramClient, UpdateConsumer,
  config::UpdatesTransport, dialog, updates,
};
use linktrack_bus::{KafkaConsumer, KafkaProducer, StartOffset, kafka};
use tokio::{net::TcpListener, sync::watch};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(author, version, about = "Link tracker chat bot")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "bot.toml")]
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

  let cfg: BotConfig = settings
    .try_deserialize()
    .context("failed to deserialise BotConfig")?;
  if cfg.redis_addr.is_some() {
    tracing::info!("redis_addr is ignored; the link cache is in process");
  }

  let client = reqwest::Client::builder()
    .timeout(REQUEST_TIMEOUT)
    .user_agent(concat!("linktrack/", env!("CARGO_PKG_VERSION")))
    .build()
    .context("failed to build http client")?;

  let chat = Arc::new(TelegramClient::new(client.clone(), &cfg.telegram_api, &cfg.bot_token));
  if let Err(e) = chat.set_my_commands(&dialog::COMMANDS).await {
    tracing::warn!(error = %e, "failed to register bot commands");
  }

  let subscriptions = ScrapperClient::new(client, cfg.scrapper_url());
  let bot = Arc::new(Bot::new(subscriptions, cfg.link_cache));

  let (shutdown_tx, shutdown_rx) = watch::channel(());
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

  let poller = Poller::new(chat.clone(), bot, cfg.poll_limit);
  let polling = tokio::spawn(poller.run(cfg.poll_interval(), shutdown_rx.clone()));

  let chat: Arc<dyn ChatClient> = chat;
  match cfg.updates_transport {
    UpdatesTransport::Http => {
      let address = cfg.listen_addr();
      tracing::info!("Listening on http://{address}");
      let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;

      let mut server_shutdown = shutdown_rx;
      axum::serve(listener, updates::router(chat))
        .with_graceful_shutdown(async move {
          let _ = server_shutdown.changed().await;
        })
        .await
        .context("server error")?;
    }
    UpdatesTransport::Bus => {
      let kafka = kafka::connect(&cfg.brokers_addr)
        .await
        .with_context(|| format!("failed to connect to brokers {}", cfg.brokers_addr))?;
      let consumer = KafkaConsumer::new(
        &kafka,
        &cfg.update_topic,
        cfg.kafka_partitions,
        StartOffset::Latest,
        cfg.kafka_batch_size,
      )
      .await
      .with_context(|| format!("failed to open topic {}", cfg.update_topic))?;
      let dead_letter_topic = cfg.dead_letter_topic();
      let dead_letter = KafkaProducer::new(&kafka, &dead_letter_topic, 1)
        .await
        .with_context(|| format!("failed to open topic {dead_letter_topic}"))?;

      tracing::info!(topic = %cfg.update_topic, dead_letter = %dead_letter_topic, "consuming updates");
      UpdateConsumer::new(consumer, dead_letter, chat).run(shutdown_rx).await;
    }
  }

  polling.await.context("poller task panicked")?;
  Ok(())
}
