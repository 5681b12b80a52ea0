//! SimpleFlow server binary.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bot::{build_router, AppState, EventOrchestrator};
use config::{Config, FunctionsConfig, InvokerConfig};
use functions::{names, DirectInvoker, GatewayInvoker, RemoteFunction, RetryPolicy};
use scm::GitHubClient;
use store::HttpBucketStore;

/// SimpleFlow - GitHub webhook bot orchestrating AI-backed functions.
#[derive(Parser)]
#[command(name = "simpleflow-server")]
#[command(about = "GitHub webhook bot orchestrating AI-backed remote functions")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Override the configured server port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env().context("Invalid configuration")?;

    let filter = if cli.verbose || config.verbose {
        EnvFilter::new("bot=debug,functions=debug,scm=debug,store=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let invoker = build_invoker(&config.functions).context("Failed to build invoker")?;

    let store = HttpBucketStore::new(
        &config.bucket.base_url,
        &config.bucket.name,
        config.bucket.token.clone(),
    )
    .context("Failed to build content store")?;

    let github = GitHubClient::with_base_url(&config.github_token, &config.github_api_url)
        .context("Failed to build GitHub client")?;

    let retry = RetryPolicy::new(
        config.retry.max_attempts,
        Duration::from_millis(config.retry.base_delay_ms),
    );

    let orchestrator = EventOrchestrator::new(
        github,
        Arc::new(store),
        invoker,
        retry,
        config.trigger.clone(),
    );

    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        webhook_secret: config.webhook_secret.clone(),
    };
    let router = build_router(state);

    let port = cli.port.unwrap_or(config.port);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!(port, "SimpleFlow server listening");
    axum::serve(listener, router)
        .await
        .context("Server error")?;

    Ok(())
}

/// Construct the configured invoker variant.
fn build_invoker(functions: &FunctionsConfig) -> Result<Arc<dyn RemoteFunction>> {
    let timeout = Duration::from_millis(functions.timeout_ms);

    match &functions.invoker {
        InvokerConfig::Gateway(gateway) => {
            let invoker = GatewayInvoker::new(
                &gateway.base_url,
                gateway.api_key.clone(),
                timeout,
                &names::ALL,
            )?;
            Ok(Arc::new(invoker))
        }
        InvokerConfig::Direct(direct) => {
            let invoker = DirectInvoker::new(direct.token.clone())?
                .with_endpoint(names::ANALYZE, &direct.analyze, timeout)?
                .with_endpoint(names::SUMMARIZE, &direct.summarize, timeout)?
                .with_endpoint(names::DOCUMENT, &direct.document, timeout)?
                .with_endpoint(names::ISSUE_CREATE, &direct.issue_create, timeout)?
                .with_endpoint(names::ISSUE_UPDATE, &direct.issue_update, timeout)?;
            Ok(Arc::new(invoker))
        }
    }
}
