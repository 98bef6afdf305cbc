use tokio::net::TcpStream;

use crate::{command, event};

use super::common::{json_lines, BoxedStream, JsonLineWriter};

/// [EventStream] is a stream of [crate::event::Event]s sent by the server
///
/// # Cancel Safety
///
/// This stream is cancel-safe, meaning that it can be used in [tokio::select]
/// without the risk of missing events.
pub type EventStream = BoxedStream<anyhow::Result<event::Event>>;

/// [CommandWriter] writes [crate::command::UserCommand]s to the server
pub type CommandWriter = JsonLineWriter<command::UserCommand>;

/// Splits a TCP stream into a stream of events and a command writer.
///
/// # Arguments
///
/// - `stream` - A [TcpStream] to split
pub fn split_tcp_stream(stream: TcpStream) -> (EventStream, CommandWriter) {
    let (reader, writer) = stream.into_split();

    (json_lines(reader, "server"), CommandWriter::new(writer))
}
