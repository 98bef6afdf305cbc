use comms::transport;
use nanoid::nanoid;
use tokio::{net::TcpStream, sync::broadcast};

use crate::ServerContext;

use self::connection_session::ConnectionSession;

mod connection_session;

/// Given a tcp stream and the shared server context, handles the connection
/// until the client leaves, or the tcp stream is closed for some reason, or the server shuts down
pub async fn handle_connection(
    context: ServerContext,
    mut quit_rx: broadcast::Receiver<()>,
    stream: TcpStream,
) -> anyhow::Result<()> {
    let connection_id = nanoid!();
    let peer = stream.peer_addr().ok();
    // Split the tcp stream into a command stream and an event writer with better ergonomics
    let (mut commands, mut event_writer) = transport::server::split_tcp_stream(stream);

    let mut session = ConnectionSession::new(&connection_id, context);
    tracing::info!(connection = %session.connection_id(), peer = ?peer, "connection accepted");

    let result = session
        .run(&mut commands, &mut event_writer, &mut quit_rx)
        .await;

    // Whatever ended the session, the other members of the room need to learn about the departure
    session.close().await;
    let _ = event_writer.shutdown().await;

    match result.as_ref() {
        Ok(()) => tracing::info!(connection = %connection_id, "connection closed"),
        Err(e) => tracing::info!(connection = %connection_id, error = %e, "connection lost"),
    }

    result
}
