use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, lookup_host};
use tokio::time::timeout;
use tokio_native_tls::TlsStream;
use tracing::{debug, trace};

use crate::core::message;
use crate::data::HandshakeConfig;
use crate::error::{Error, Result};

/// Largest chunk a single receive hands back.
const BUFFER_SIZE: usize = 1024 * 1024;

/// One handshake stream. The socket lives exactly as long as this value.
pub struct Session<S> {
    stream:          S,
    receive_timeout: Duration,
    buf:             Box<[u8]>,
}

impl Session<TlsStream<TcpStream>> {
    /// Connect to the handshake server and open the stream.
    ///
    /// Certificates are verified, host names are not: the server presents a
    /// certificate that does not carry its own name.
    pub async fn open(config: &HandshakeConfig) -> Result<Self> {
        let tcp = connect(&config.host, config.port, config.receive_timeout).await?;

        let connector = native_tls::TlsConnector::builder().danger_accept_invalid_hostnames(true).build()?;
        let connector = tokio_native_tls::TlsConnector::from(connector);
        let tls = timeout(config.receive_timeout, connector.connect(&config.host, tcp))
            .await
            .map_err(|_| Error::Timeout(config.receive_timeout))??;

        debug!(host = %config.host, port = config.port, "handshake connection established");
        Self::start(tls, &config.domain, config.receive_timeout).await
    }
}

/// Resolve and connect, each step bounded by `limit`.
///
/// The system resolver runs on a blocking thread that cannot be cancelled. A
/// timed out or aborted lookup returns at once, but that thread lingers until
/// the resolver gives up on its own.
async fn connect(host: &str, port: u16, limit: Duration) -> Result<TcpStream> {
    let addrs: Vec<SocketAddr> = timeout(limit, lookup_host((host, port)))
        .await
        .map_err(|_| Error::Timeout(limit))??
        .collect();

    let mut last = io::Error::new(io::ErrorKind::NotFound, format!("no address for {host}"));
    for addr in addrs {
        match timeout(limit, TcpStream::connect(addr)).await {
            Ok(Ok(tcp)) => return Ok(tcp),
            Ok(Err(err)) => {
                debug!(%addr, error = %err, "connect failed");
                last = err;
            }
            Err(_) => return Err(Error::Timeout(limit)),
        }
    }
    Err(last.into())
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an already connected stream and send the opening stream tag.
    pub async fn start(stream: S, domain: &str, receive_timeout: Duration) -> Result<Self> {
        let mut session = Self { stream, receive_timeout, buf: vec![0; BUFFER_SIZE].into_boxed_slice() };
        session.send(&message::stream_open(domain)).await?;
        Ok(session)
    }

    pub async fn send(&mut self, stanza: &str) -> Result<()> {
        trace!(stanza, "send");
        self.stream.write_all(stanza.as_bytes()).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Next chunk from the server. Empty when the peer closed the stream.
    pub async fn receive(&mut self) -> Result<String> {
        let n = timeout(self.receive_timeout, self.stream.read(&mut self.buf))
            .await
            .map_err(|_| Error::Timeout(self.receive_timeout))??;
        let chunk = String::from_utf8_lossy(&self.buf[..n]).into_owned();
        trace!(chunk = %chunk, "receive");
        Ok(chunk)
    }

    /// Orderly shutdown of the stream.
    pub async fn close(mut self) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }
}
