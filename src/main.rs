//! userdesk: administration console for the users API.
//!
//! Entry point and error handling boundary. Uses `anyhow` for
//! ergonomic error propagation and user-facing messages.

mod cli;

use std::net::SocketAddr;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use userdesk::cache::QueryCache;
use userdesk::client::{ApiError, MAX_READ_RETRIES, RetryPolicy, UserClient};
use userdesk::config::{Config, MockConfig};
use userdesk::constants;
use userdesk::env::Env;
use userdesk::mock::{MockBackend, MockTransport, server};
use userdesk::output::OutputRenderer;
use userdesk::search::Location;
use userdesk::transport::Transport;
use userdesk::transport::http::HttpTransport;
use userdesk::view::{self, LoadOutcome, SettingsView, UsersRoute};

use cli::args::{Cli, Command, ServeMockArgs, UsersAction};

/// A failure already rendered to stdout.
#[derive(Debug)]
struct Reported;

impl std::fmt::Display for Reported {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("request failed")
    }
}

impl std::error::Error for Reported {}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        if !err.is::<Reported>() {
            eprintln!("Error: {err:#}");
        }
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let cwd = std::env::current_dir().context("failed to determine working directory")?;
    let mut config =
        Config::load(Some(&cwd), &Env::real()).context("failed to load configuration")?;
    if let Some(ref url) = cli.api_url {
        config.api.base_url = url.clone();
    }
    if cli.mock {
        config.mock.enabled = true;
    }
    if cli.no_cache {
        config.cache.enabled = false;
    }
    init_logging(&config.logging.level);

    let renderer = cli.format.renderer();

    match cli.command {
        Command::Users { action } => run_users(action, &config, renderer.as_ref()).await,
        Command::Dashboard => run_dashboard(&config, renderer.as_ref()).await,
        Command::Settings => {
            let view = SettingsView::new(&config, Config::sources(Some(&cwd)));
            print!("{}", renderer.settings(&view));
            Ok(())
        }
        Command::ServeMock(args) => run_serve_mock(args, &config.mock).await,
        Command::Version => {
            println!("{} {}", constants::APP_NAME, constants::VERSION);
            Ok(())
        }
    }
}

/// Install the stderr log subscriber. `level` is an `EnvFilter` directive.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| {
        eprintln!("Warning: ignoring invalid log filter: {level}");
        EnvFilter::new("warn")
    });
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}

/// Build the client: mock or HTTP transport, shared cache, retry policy.
fn build_client(config: &Config) -> Result<Arc<UserClient>> {
    let transport: Arc<dyn Transport> = if config.mock.enabled {
        tracing::info!("answering requests from the built-in mock backend");
        Arc::new(mock_transport(config))
    } else {
        Arc::new(
            HttpTransport::new(&config.api.base_url, config.api.timeout())
                .context("failed to build HTTP client")?,
        )
    };

    let cache = if config.cache.enabled {
        QueryCache::new(
            Duration::from_secs(config.cache.stale_secs),
            Duration::from_secs(config.cache.gc_secs),
        )
    } else {
        QueryCache::disabled()
    };

    let client = UserClient::new(transport, Arc::new(cache)).with_retry(RetryPolicy {
        max_retries: MAX_READ_RETRIES,
        delay: config.api.retry_delay(),
    });
    Ok(Arc::new(client))
}

fn mock_transport(config: &Config) -> MockTransport {
    let mock = &config.mock;
    let mut transport = MockTransport::new(Arc::new(MockBackend::new()))
        .with_latency(Duration::from_millis(mock.latency_ms))
        .with_unhandled(mock.unhandled)
        .with_timeout_policy(mock.on_timeout);
    if mock.handler_timeout_ms > 0 {
        transport = transport.with_handler_timeout(Duration::from_millis(mock.handler_timeout_ms));
    }
    match HttpTransport::new(&config.api.base_url, config.api.timeout()) {
        Ok(passthrough) => transport.with_passthrough(Arc::new(passthrough)),
        Err(e) => {
            tracing::warn!(error = %e, "mock passthrough unavailable");
            transport
        }
    }
}

/// Render an API failure and signal a non-zero exit.
fn report(renderer: &dyn OutputRenderer, err: &ApiError) -> anyhow::Error {
    print!("{}", renderer.failure(err));
    anyhow::Error::new(Reported)
}

async fn run_users(
    action: UsersAction,
    config: &Config,
    renderer: &dyn OutputRenderer,
) -> Result<()> {
    let client = build_client(config)?;

    match action {
        UsersAction::List(args) => {
            let mut location = Location::parse(&args.location)?;
            location.normalize();
            let route = UsersRoute::new(Arc::clone(&client), location);
            if let Some(patch) = args.patch() {
                route.update_search(&patch);
            }
            if let Some(page) = args.page {
                route.update_page(page);
            }
            tracing::debug!(location = %route.href(), "loading users");

            match route.load().await {
                LoadOutcome::Ready(page) => print!("{}", renderer.users(&page)),
                LoadOutcome::Superseded => bail!("location changed while loading"),
                LoadOutcome::Failed(err) => return Err(report(renderer, &err)),
            }
        }
        UsersAction::Get { id } => match client.get(&id).await {
            Ok(user) => print!("{}", renderer.user(&user)),
            Err(err) => return Err(report(renderer, &err)),
        },
        UsersAction::Create(args) => match client.create(&args.into()).await {
            Ok(user) => print!("{}", renderer.user(&user)),
            Err(err) => return Err(report(renderer, &err)),
        },
        UsersAction::Update(args) => {
            let patch = args.patch();
            if patch.is_empty() {
                bail!("nothing to update: pass at least one of --name, --email, --role, --status, --avatar");
            }
            match client.update(&args.id, &patch).await {
                Ok(user) => print!("{}", renderer.user(&user)),
                Err(err) => return Err(report(renderer, &err)),
            }
        }
        UsersAction::Delete { id } => match client.delete(&id).await {
            Ok(()) => print!("{}", renderer.deleted(&id)),
            Err(err) => return Err(report(renderer, &err)),
        },
    }
    tracing::debug!(stats = ?client.cache().stats(), "request cache");
    Ok(())
}

async fn run_dashboard(config: &Config, renderer: &dyn OutputRenderer) -> Result<()> {
    let client = build_client(config)?;
    let summary = view::summarize(&client).await;
    print!("{}", renderer.dashboard(&summary));
    Ok(())
}

async fn run_serve_mock(args: ServeMockArgs, config: &MockConfig) -> Result<()> {
    let host = args.host.unwrap_or_else(|| config.host.clone());
    let port = args.port.unwrap_or(config.port);
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid listen address {host}:{port}"))?;

    eprintln!("Mock backend on http://{addr} (Ctrl+C to stop)");
    server::serve(Arc::new(MockBackend::new()), addr, async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutting down mock backend");
    })
    .await
    .with_context(|| format!("mock backend on {addr} failed"))
}
