use std::{marker::PhantomData, pin::Pin};

use anyhow::Context;
use serde::{de::DeserializeOwned, Serialize};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::tcp::{OwnedReadHalf, OwnedWriteHalf},
};
use tokio_stream::{wrappers::SplitStream, Stream, StreamExt};

pub const NEW_LINE: &[u8; 2] = b"\r\n";

pub type BoxedStream<Item> = Pin<Box<dyn Stream<Item = Item> + Send>>;

/// [JsonLineWriter] is a wrapper around the write half of a [tokio::net::TcpStream]
/// which writes every value as a single JSON line
pub struct JsonLineWriter<T> {
    writer: OwnedWriteHalf,
    _marker: PhantomData<fn(&T)>,
}

impl<T: Serialize> JsonLineWriter<T> {
    pub fn new(writer: OwnedWriteHalf) -> Self {
        Self {
            writer,
            _marker: PhantomData,
        }
    }

    /// Send a value to the backing [tokio::net::TcpStream]
    ///
    /// # Cancel Safety
    ///
    /// This method is not cancellation safe. If it is used as the event
    /// in a [tokio::select!] statement and some other
    /// branch completes first, then the provided value may have been
    /// partially written, but future calls to `write` will start over
    /// from the beginning of the buffer. Causing undefined behaviour.
    pub async fn write(&mut self, value: &T) -> anyhow::Result<()> {
        let mut serialized_bytes = serde_json::to_vec(value)?;
        serialized_bytes.extend_from_slice(NEW_LINE);

        self.writer
            .write_all(serialized_bytes.as_slice())
            .await
            .context("could not write to the tcp stream")?;

        Ok(())
    }

    /// Close the write direction of the stream, the peer sees an end of stream
    pub async fn shutdown(&mut self) -> anyhow::Result<()> {
        self.writer
            .shutdown()
            .await
            .context("could not shutdown the tcp stream")
    }
}

/// Turns the read half of a [tokio::net::TcpStream] into a stream of deserialized JSON lines.
///
/// Blank lines are skipped. A line which can not be deserialized, invalid UTF-8 included, yields an error
/// but does not end the stream. A read failure ends the stream the same way a closed connection does.
pub fn json_lines<T>(reader: OwnedReadHalf, origin: &'static str) -> BoxedStream<anyhow::Result<T>>
where
    T: DeserializeOwned + Send + 'static,
{
    Box::pin(
        SplitStream::new(BufReader::new(reader).split(b'\n'))
            .take_while(|line| line.is_ok())
            .filter_map(|line| line.ok())
            .filter(|line| !line.iter().all(u8::is_ascii_whitespace))
            .map(move |line| {
                serde_json::from_slice::<T>(&line)
                    .with_context(|| format!("failed to deserialize line from the {}", origin))
            }),
    )
}
