#![doc = include_str!("../README.md")]

mod server;

use anyhow::Context;
use clap::Parser;
use hashgate_core::{Coalescer, CoalescerConfig};
use server::{
    broker::{AmqpPublisher, BrokerFlush},
    config::{CliArgs, ServerConfig},
    dispatch::SubmissionQueue,
    lookup::PgLookup,
    service::{handler::HashService, routes::router},
    telemetry::init_telemetry,
};
use std::sync::Arc;
use tokio::{net::TcpListener, signal, time::timeout};
use tokio_util::sync::CancellationToken;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    let providers = init_telemetry(config.verbose)?;
    let result = run(config).await;
    if let Err(e) = &result {
        tracing::error!("{e:#}");
    }
    providers.shutdown();
    result
}

async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let lookup = PgLookup::connect(&config.sql)
        .await
        .context("failed to connect to the lookup store")?;
    let publisher = Arc::new(
        AmqpPublisher::connect(&config.amqp)
            .await
            .context("failed to connect to the AMQP broker")?,
    );

    let fatal = CancellationToken::new();
    let flush = BrokerFlush::new(publisher.clone(), config.publish_policy, fatal.clone());
    let coalescer = Coalescer::new(
        CoalescerConfig::new(config.batch_window).with_submit_buffer(config.submission_buffer_size),
        flush,
    );
    let submissions = SubmissionQueue::new(coalescer, config.submission_buffer_size);
    let service = HashService::new(Arc::new(lookup.clone()), submissions);

    let listener = TcpListener::bind(&config.server_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server_addr))?;
    log_startup_info(&config);

    axum::serve(listener, router(service.clone()))
        .with_graceful_shutdown(shutdown_signal(service.clone(), fatal.clone()))
        .await
        .context("server error")?;

    match timeout(config.shutdown_timeout, service.shutdown()).await {
        Ok(Ok(())) => tracing::debug!("Pending batches drained"),
        Ok(Err(e)) => tracing::error!("Error during service shutdown: {e}"),
        Err(_) => tracing::warn!(
            "Graceful drain timed out after {:?}",
            config.shutdown_timeout
        ),
    }

    publisher.close().await;
    lookup.close().await;

    if fatal.is_cancelled() {
        anyhow::bail!("terminated after a batch could not be published");
    }

    tracing::info!("Service shut down successfully");
    Ok(())
}

fn log_startup_info(config: &ServerConfig) {
    if cfg!(debug_assertions) {
        tracing::info!(
            "Starting hash service on {} with full config: {:#?}",
            config.server_addr,
            config
        );
    } else {
        tracing::info!(
            "Starting hash service on {} with a {:?} batch window",
            config.server_addr,
            config.batch_window
        );
    }
}

/// Resolves on Ctrl+C, SIGTERM or a fatal publish failure, after flipping the
/// service to not serving. In-flight requests are then drained by axum.
async fn shutdown_signal(service: HashService, fatal: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                core::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = core::future::pending::<()>();

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            core::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
        () = fatal.cancelled() => tracing::error!("Publishing failed, shutting down"),
    }

    tracing::info!("Shutdown signal received, terminating gracefully...");
    service.begin_shutdown();
}
