//! The four request→reply transports. Each call owns its socket and
//! releases it on every exit path; there is no pooling.

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tracing::debug;

const DNS_MESSAGE_CONTENT_TYPE: &str = "application/dns-message";

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("TLS authentication failed: {0}")]
    TlsAuth(String),
    #[error("HTTP status {0}")]
    HttpStatus(u16),
    #[error("unexpected Content-Type {0:?}")]
    HttpContentType(String),
    #[error("invalid nameserver address {0:?}")]
    BadAddress(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Udp,
    Tcp,
    Tls,
    Https,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Udp => write!(f, "UDP"),
            Self::Tcp => write!(f, "TCP"),
            Self::Tls => write!(f, "TLS"),
            Self::Https => write!(f, "HTTPS"),
        }
    }
}

/// Send one encoded DNS message and await the raw reply.
pub async fn exchange(
    kind: TransportKind,
    nameserver: &str,
    request: &[u8],
    deadline: Duration,
) -> Result<Vec<u8>, TransportError> {
    debug!("{} exchange with {} ({} octets)", kind, nameserver, request.len());
    match kind {
        TransportKind::Udp => udp_exchange(nameserver, request, deadline).await,
        TransportKind::Tcp => tcp_exchange(nameserver, request, deadline).await,
        TransportKind::Tls => tls_exchange(nameserver, request, deadline).await,
        TransportKind::Https => https_exchange(nameserver, request, deadline).await,
    }
}

async fn udp_exchange(
    nameserver: &str,
    request: &[u8],
    deadline: Duration,
) -> Result<Vec<u8>, TransportError> {
    let (host, port) = host_and_port(nameserver, 53)?;

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.send_to(request, (host.as_str(), port)).await?;

    let mut buf = vec![0u8; 4096];
    let (len, src) = timeout(deadline, socket.recv_from(&mut buf))
        .await
        .map_err(|_| TransportError::Timeout)??;
    buf.truncate(len);

    // The reply must come from the server we queried (RFC 5452)
    if let Ok(expected) = host.parse::<IpAddr>() {
        if src.ip() != expected {
            return Err(TransportError::Other(format!(
                "response from unexpected source {} (expected {})",
                src.ip(),
                expected
            )));
        }
    }

    Ok(buf)
}

async fn tcp_exchange(
    nameserver: &str,
    request: &[u8],
    deadline: Duration,
) -> Result<Vec<u8>, TransportError> {
    let (host, port) = host_and_port(nameserver, 53)?;
    let stream = timeout(deadline, TcpStream::connect((host.as_str(), port)))
        .await
        .map_err(|_| TransportError::Timeout)??;
    framed_exchange(stream, request, deadline).await
}

async fn tls_exchange(
    nameserver: &str,
    request: &[u8],
    deadline: Duration,
) -> Result<Vec<u8>, TransportError> {
    let (host, port) = host_and_port(nameserver, 853)?;

    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    let connector = TlsConnector::from(Arc::new(config));

    let server_name = rustls::pki_types::ServerName::try_from(host.clone())
        .map_err(|_| TransportError::BadAddress(nameserver.to_string()))?;

    let tcp = timeout(deadline, TcpStream::connect((host.as_str(), port)))
        .await
        .map_err(|_| TransportError::Timeout)??;
    let stream = timeout(deadline, connector.connect(server_name, tcp))
        .await
        .map_err(|_| TransportError::Timeout)?
        .map_err(map_tls_error)?;

    framed_exchange(stream, request, deadline).await
}

async fn https_exchange(
    nameserver: &str,
    request: &[u8],
    deadline: Duration,
) -> Result<Vec<u8>, TransportError> {
    let url = doh_url(nameserver);

    let client = reqwest::Client::builder()
        .timeout(deadline)
        .build()
        .map_err(|e| TransportError::Other(e.to_string()))?;

    let response = client
        .post(&url)
        .header("Content-Type", DNS_MESSAGE_CONTENT_TYPE)
        .header("Accept", DNS_MESSAGE_CONTENT_TYPE)
        .body(request.to_vec())
        .send()
        .await
        .map_err(map_reqwest_error)?;

    let status = response.status().as_u16();
    if status != 200 {
        return Err(TransportError::HttpStatus(status));
    }

    let content_type = response
        .headers()
        .get("Content-Type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    if content_type.split(';').next().map(str::trim) != Some(DNS_MESSAGE_CONTENT_TYPE) {
        return Err(TransportError::HttpContentType(content_type));
    }

    let body = response.bytes().await.map_err(map_reqwest_error)?;
    Ok(body.to_vec())
}

/// TCP-style framing: 2-octet big-endian length prefix on both directions,
/// stripped from the returned message.
async fn framed_exchange<S>(
    mut stream: S,
    request: &[u8],
    deadline: Duration,
) -> Result<Vec<u8>, TransportError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let prefix = (request.len() as u16).to_be_bytes();
    timeout(deadline, async {
        stream.write_all(&prefix).await?;
        stream.write_all(request).await
    })
    .await
    .map_err(|_| TransportError::Timeout)??;

    let mut len_buf = [0u8; 2];
    timeout(deadline, stream.read_exact(&mut len_buf))
        .await
        .map_err(|_| TransportError::Timeout)??;
    let response_len = u16::from_be_bytes(len_buf) as usize;

    let mut response = vec![0u8; response_len];
    timeout(deadline, stream.read_exact(&mut response))
        .await
        .map_err(|_| TransportError::Timeout)??;

    Ok(response)
}

/// RFC 8484: a full URL is used verbatim, a bare host queries /dns-query.
fn doh_url(nameserver: &str) -> String {
    if nameserver.starts_with("https://") {
        nameserver.to_string()
    } else {
        format!("https://{}/dns-query", nameserver)
    }
}

fn host_and_port(nameserver: &str, default_port: u16) -> Result<(String, u16), TransportError> {
    match nameserver.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse()
                .map_err(|_| TransportError::BadAddress(nameserver.to_string()))?;
            Ok((host.to_string(), port))
        }
        None => Ok((nameserver.to_string(), default_port)),
    }
}

fn map_tls_error(err: std::io::Error) -> TransportError {
    match err
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<rustls::Error>())
    {
        Some(rustls::Error::InvalidCertificate(reason)) => {
            TransportError::TlsAuth(format!("{:?}", reason))
        }
        _ => TransportError::Io(err),
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Other(err.to_string())
    }
}
