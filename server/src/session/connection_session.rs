use comms::{
    command::UserCommand,
    event::{ConnectedReplyEvent, Event},
    transport::server::{CommandStream, EventWriter},
};
use tokio::sync::{broadcast, mpsc};
use tokio_stream::StreamExt;

use crate::ServerContext;

/// Whether the session keeps going after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Leave,
}

/// [ConnectionSession] ties a single connection to the room coordinator and the signaling relay.
///
/// The session is consumed by [ConnectionSession::close], hence the teardown of a connection
/// runs exactly once no matter why the connection ended.
pub(super) struct ConnectionSession {
    connection_id: String,
    context: ServerContext,
    outbox_rx: mpsc::Receiver<Event>,
}

impl ConnectionSession {
    pub fn new(connection_id: &str, context: ServerContext) -> Self {
        let outbox_rx = context.registry.connect(connection_id);

        ConnectionSession {
            connection_id: String::from(connection_id),
            context,
            outbox_rx,
        }
    }

    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    /// Pump commands from the client and events to the client until the client leaves,
    /// the connection is lost or the server shuts down
    pub async fn run(
        &mut self,
        commands: &mut CommandStream,
        event_writer: &mut EventWriter,
        quit_rx: &mut broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        // let the client know who it is before anything else
        event_writer
            .write(&Event::Connected(ConnectedReplyEvent {
                connection_id: self.connection_id.clone(),
            }))
            .await?;

        loop {
            tokio::select! {
                cmd = commands.next() => match cmd {
                    // the client closed the stream, or it could not be read anymore
                    None => break,
                    Some(Ok(cmd)) => {
                        if self.handle_user_command(cmd).await == Flow::Leave {
                            break;
                        }
                    }
                    // there is no channel to report errors back, the line is skipped
                    Some(Err(e)) => {
                        tracing::warn!(connection = %self.connection_id, error = %e, "ignoring malformed command");
                    }
                },
                // events addressed to this connection, either directly or through its room
                Some(event) = self.outbox_rx.recv() => {
                    event_writer.write(&event).await?;
                }
                Ok(_) = quit_rx.recv() => {
                    tracing::debug!(connection = %self.connection_id, "server is shutting down");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Handle a single user command such as; join, code change, signaling
    async fn handle_user_command(&self, cmd: UserCommand) -> Flow {
        let connection_id = self.connection_id.as_str();

        match cmd {
            UserCommand::Join(cmd) => {
                self.context
                    .coordinator
                    .join(connection_id, &cmd.room_id, &cmd.display_name)
                    .await;
            }
            UserCommand::CodeChange(cmd) => {
                self.context
                    .coordinator
                    .update_code(connection_id, &cmd.room_id, cmd.code)
                    .await;
            }
            UserCommand::Offer(message) => self.context.relay.relay_offer(connection_id, message),
            UserCommand::Answer(message) => self.context.relay.relay_answer(connection_id, message),
            UserCommand::IceCandidate(message) => {
                self.context.relay.relay_candidate(connection_id, message)
            }
            UserCommand::Leave(_) => return Flow::Leave,
        }

        Flow::Continue
    }

    /// Remove the connection from its room, notifying the remaining members, and forget its outbox
    pub async fn close(self) {
        self.context.coordinator.disconnect(&self.connection_id).await;
        self.context.registry.disconnect(&self.connection_id);
    }
}
