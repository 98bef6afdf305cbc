//! Room coordination server: presence tracking, a shared code text per room,
//! and a relay for peer connection negotiation messages.

use std::{future::Future, sync::Arc, time::Duration};

use tokio::{
    net::TcpListener,
    sync::broadcast,
    task::{JoinError, JoinSet},
};

use crate::{registry::ChannelRegistry, relay::SignalingRelay, room::RoomCoordinator};

pub mod registry;
pub mod relay;
pub mod room;
pub mod session;

const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Everything a connection needs to take part in rooms, shared by every session
#[derive(Clone)]
pub struct ServerContext {
    pub registry: Arc<ChannelRegistry>,
    pub coordinator: Arc<RoomCoordinator<ChannelRegistry>>,
    pub relay: Arc<SignalingRelay<ChannelRegistry>>,
}

impl ServerContext {
    pub fn new(outbox_capacity: usize) -> Self {
        let registry = Arc::new(ChannelRegistry::new(outbox_capacity));

        ServerContext {
            coordinator: Arc::new(RoomCoordinator::new(registry.clone())),
            relay: Arc::new(SignalingRelay::new(registry.clone())),
            registry,
        }
    }
}

/// Accept connections until `shutdown` resolves, then tell every session to stop and wait for them
pub async fn serve<F>(listener: TcpListener, context: ServerContext, shutdown: F)
where
    F: Future<Output = ()>,
{
    let mut join_set: JoinSet<anyhow::Result<()>> = JoinSet::new();
    let (quit_tx, quit_rx) = broadcast::channel::<()>(1);

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("server interrupted, gracefully shutting down");
                // nobody may be listening, that is fine
                let _ = quit_tx.send(());
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((socket, _)) => {
                    join_set.spawn(session::handle_connection(context.clone(), quit_rx.resubscribe(), socket));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "could not accept connection");
                    // errors such as running out of file descriptors persist for a while
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                }
            },
            // reap finished sessions so the set does not grow with the server's uptime
            Some(joined) = join_set.join_next(), if !join_set.is_empty() => {
                log_session_outcome(joined);
            }
        }
    }

    while let Some(joined) = join_set.join_next().await {
        log_session_outcome(joined);
    }
    tracing::info!("server shut down");
}

fn log_session_outcome(joined: Result<anyhow::Result<()>, JoinError>) {
    match joined {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "session ended with an error"),
        Err(e) => tracing::error!(error = %e, "session task failed"),
    }
}
