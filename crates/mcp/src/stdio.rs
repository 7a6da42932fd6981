// Newline-delimited JSON-RPC over stdin/stdout

use crate::protocol::{JsonRpcError, JsonRpcResponse};
use crate::server::McpServer;
use anyhow::{Context, Result};
use bytes::BytesMut;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::io::ErrorKind;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Decoder, FramedRead, FramedWrite, LinesCodec, LinesCodecError};

/// Upper bound for a single inbound message
const MAX_FRAME_LENGTH: usize = 16 * 1024 * 1024;

/// One inbound line, or a line that could not be decoded as text
enum Inbound {
    Line(String),
    Malformed(LinesCodecError),
}

/// `LinesCodec` that reports undecodable lines as items instead of ending the stream
struct MessageCodec(LinesCodec);

impl MessageCodec {
    fn new(max_length: usize) -> Self {
        Self(LinesCodec::new_with_max_length(max_length))
    }

    fn classify(
        result: Result<Option<String>, LinesCodecError>,
    ) -> Result<Option<Inbound>, LinesCodecError> {
        match result {
            Ok(line) => Ok(line.map(Inbound::Line)),
            Err(e @ LinesCodecError::MaxLineLengthExceeded) => Ok(Some(Inbound::Malformed(e))),
            Err(LinesCodecError::Io(e)) if e.kind() == ErrorKind::InvalidData => {
                Ok(Some(Inbound::Malformed(LinesCodecError::Io(e))))
            }
            Err(e) => Err(e),
        }
    }
}

impl Decoder for MessageCodec {
    type Item = Inbound;
    type Error = LinesCodecError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Inbound>, LinesCodecError> {
        Self::classify(self.0.decode(buf))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Inbound>, LinesCodecError> {
        Self::classify(self.0.decode_eof(buf))
    }
}

/// Serve on the process's stdin/stdout until stdin closes
pub async fn serve_stdio(server: &McpServer) -> Result<()> {
    tracing::info!("Server running on STDIO");
    serve(server, tokio::io::stdin(), tokio::io::stdout()).await
}

/// Serve over any reader/writer pair, one JSON message per line
pub async fn serve<R, W>(server: &McpServer, reader: R, writer: W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    serve_with_max_length(server, reader, writer, MAX_FRAME_LENGTH).await
}

async fn serve_with_max_length<R, W>(
    server: &McpServer,
    reader: R,
    writer: W,
    max_length: usize,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut frames = FramedRead::new(reader, MessageCodec::new(max_length));
    let mut out = FramedWrite::new(writer, LinesCodec::new());

    while let Some(frame) = frames.next().await {
        let response = match frame.context("Failed to read message from input")? {
            Inbound::Line(line) if line.trim().is_empty() => continue,
            Inbound::Line(line) => server.handle_line(&line).await,
            Inbound::Malformed(e) => {
                tracing::warn!("Discarding undecodable input line: {}", e);
                Some(JsonRpcResponse::error(Value::Null, JsonRpcError::parse_error()))
            }
        };

        if let Some(response) = response {
            let encoded = serde_json::to_string(&response)?;
            out.send(encoded)
                .await
                .context("Failed to write response")?;
        }
    }

    tracing::info!("Input closed, shutting down");
    Ok(())
}
