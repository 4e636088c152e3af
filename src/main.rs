use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use harmony::clock::{Clock, SystemClock};
use harmony::config::Config;
use harmony::datasource::{CacheDatabase, NetworkDataSource, SqliteDataSource};
use harmony::network::{Method, NetworkQuery, ReqwestTransport};
use harmony::response::{CachedResponse, ResponseBody, ResponseStamper};
use harmony::validation::TimestampValidationStrategy;
use harmony::{CacheRepository, GetRepositoryExt, Operation, RepositoryMapper, Scope};

#[derive(Parser, Debug)]
#[command(name = "harmony")]
#[command(about = "Fetch API resources through a validating local cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/harmony/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// GET a path relative to the configured base URL and print the body
  Fetch {
    path: String,

    /// Url parameter, repeatable
    #[arg(short, long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    params: Vec<(String, String)>,

    /// default, main, main-sync, cache or cache-sync
    #[arg(short, long, default_value = "default", value_parser = parse_operation)]
    operation: Operation,
  },
  /// Empty the local cache
  Clear,
}

fn parse_param(raw: &str) -> std::result::Result<(String, String), String> {
  match raw.split_once('=') {
    Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
    _ => Err(format!("expected KEY=VALUE, got {}", raw)),
  }
}

fn parse_operation(raw: &str) -> std::result::Result<Operation, String> {
  Operation::from_name(raw).ok_or_else(|| format!("unknown operation {}", raw))
}

/// Log to `<data dir>/harmony/harmony.log`, filtered by `HARMONY_LOG`.
fn init_logging() -> Result<WorkerGuard> {
  let log_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?
    .join("harmony");
  std::fs::create_dir_all(&log_dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", log_dir.display(), e))?;

  let (writer, guard) =
    tracing_appender::non_blocking(tracing_appender::rolling::never(&log_dir, "harmony.log"));
  let filter = EnvFilter::try_from_env("HARMONY_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  Ok(guard)
}

fn open_database(config: &Config) -> Result<CacheDatabase> {
  let db = match &config.cache.path {
    Some(path) => CacheDatabase::open_at(path)?,
    None => CacheDatabase::open()?,
  };
  Ok(db)
}

async fn fetch(
  config: &Config,
  path: String,
  params: Vec<(String, String)>,
  operation: Operation,
) -> Result<()> {
  let clock: Arc<dyn Clock> = Arc::new(SystemClock);

  let transport = Arc::new(ReqwestTransport::new()?);
  let headers = config.global_headers(Config::get_api_token().as_deref());
  let network =
    Arc::new(NetworkDataSource::new(transport, config.network.base_url.clone()).with_headers(headers));
  let main = Arc::new(RepositoryMapper::<String, CachedResponse>::from_repository(
    network,
    ResponseStamper::new(clock.clone(), config.cache.expire_in),
    ResponseBody,
  ));

  let db = Arc::new(open_database(config)?);
  let cache: Arc<SqliteDataSource<CachedResponse>> = Arc::new(SqliteDataSource::new(db, "response"));

  let repository = Arc::new(
    CacheRepository::<CachedResponse>::new(
      main,
      cache,
      Arc::new(TimestampValidationStrategy::with_clock(clock)),
    )
    .with_offline_fallback(config.cache.offline_fallback),
  );

  let query = params
    .into_iter()
    .fold(NetworkQuery::new(Method::Get, path), |query, (key, value)| {
      query.with_param(key, value)
    });
  info!(path = %query.path, ?operation, "fetch");

  let get = repository.to_get_interactor(Scope::current().named("cli"));
  let response = get.invoke(query.into(), operation).await?;
  println!("{}", response.body);

  Ok(())
}

fn clear(config: &Config) -> Result<()> {
  let removed = open_database(config)?.clear()?;
  info!(removed, "cache cleared");
  println!("Removed {} cached entries", removed);
  Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = init_logging()?;

  // Load configuration
  let config = Config::load(args.config.as_deref())?;

  match args.command {
    Command::Fetch {
      path,
      params,
      operation,
    } => fetch(&config, path, params, operation).await,
    Command::Clear => clear(&config),
  }
}
