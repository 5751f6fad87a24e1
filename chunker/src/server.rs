//! Line-oriented TCP annotation service.
//!
//! A request is a sequence of text lines terminated by a line holding [`END_OF_DOCUMENT`] or by
//! the end of the stream. The server replies with the annotated text and closes its side.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{lookup_host, TcpListener, TcpStream};

use crate::annotate::Annotator;
use crate::errors::{ChunkerError, Result};

/// Line terminating a request.
pub const END_OF_DOCUMENT: &str = "<ENDOFDOCUMENT>";

async fn read_request<R>(rdr: R) -> Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(rdr).lines();
    let mut text = String::new();
    while let Some(line) = lines.next_line().await? {
        if line.trim_end() == END_OF_DOCUMENT {
            break;
        }
        text.push_str(&line);
        text.push('\n');
    }
    Ok(text)
}

async fn handle<S>(stream: S, annotator: Arc<Annotator>) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (rdr, mut wtr) = tokio::io::split(stream);
    let text = read_request(rdr).await?;
    let response = tokio::task::spawn_blocking(move || annotator.annotate_text(&text))
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))??;
    wtr.write_all(response.as_bytes()).await?;
    wtr.shutdown().await?;
    Ok(())
}

/// Accepts connections forever, serving each one on its own task.
///
/// A failing request is logged and its connection closed; the server keeps running.
pub async fn serve(listener: TcpListener, annotator: Arc<Annotator>) -> Result<()> {
    tracing::info!(addr = %listener.local_addr()?, "chunk server listening");
    loop {
        let (stream, peer) = listener.accept().await?;
        let annotator = Arc::clone(&annotator);
        tokio::spawn(async move {
            tracing::debug!(%peer, "connection accepted");
            if let Err(e) = handle(stream, annotator).await {
                tracing::warn!(%peer, "request failed: {e}");
            }
        });
    }
}

/// Sends `text` to a chunk server and returns its reply.
///
/// # Errors
///
/// [`ChunkerError::UnknownHost`] if `host` cannot be resolved.
pub async fn request(host: &str, port: u16, text: &str) -> Result<String> {
    let addr = lookup_host((host, port))
        .await
        .ok()
        .and_then(|mut addrs| addrs.next())
        .ok_or_else(|| ChunkerError::UnknownHost(host.to_string()))?;
    let mut stream = TcpStream::connect(addr).await?;
    stream.write_all(text.as_bytes()).await?;
    if !text.is_empty() && !text.ends_with('\n') {
        stream.write_all(b"\n").await?;
    }
    stream.write_all(END_OF_DOCUMENT.as_bytes()).await?;
    stream.write_all(b"\n").await?;
    stream.flush().await?;
    let mut response = String::new();
    stream.read_to_string(&mut response).await?;
    Ok(response)
}
