use anyhow::Context;
use clap::Parser;
use coderoom_server::ServerContext;
use tokio::{
    net::TcpListener,
    signal::unix::{signal, SignalKind},
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "coderoom-server", about = "Shared code rooms with presence and a signaling relay")]
struct Args {
    /// Port to listen on.
    #[arg(short, long, env = "PORT", default_value_t = 5000)]
    port: u16,

    /// Address to bind to.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// How many undelivered events a single connection may have before new ones are dropped.
    #[arg(long, env = "OUTBOX_CAPACITY", default_value_t = 256)]
    outbox_capacity: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "coderoom_server=info".into()),
        )
        .init();

    let args = Args::parse();

    let mut interrupt =
        signal(SignalKind::interrupt()).context("failed to create interrupt signal stream")?;
    let mut terminate =
        signal(SignalKind::terminate()).context("failed to create terminate signal stream")?;

    let listener = TcpListener::bind((args.host.as_str(), args.port))
        .await
        .with_context(|| format!("could not bind to {}:{}", args.host, args.port))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    let shutdown = async move {
        tokio::select! {
            _ = interrupt.recv() => {}
            _ = terminate.recv() => {}
        }
    };

    coderoom_server::serve(listener, ServerContext::new(args.outbox_capacity), shutdown).await;

    Ok(())
}
