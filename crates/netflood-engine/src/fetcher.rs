//! IP-pinned fetcher.
//!
//! Each task names a URL and the IP that must serve it. Every connection the
//! task's client makes, redirect hops included, goes to that IP while the
//! Host header and TLS server name still come from the URL. The body is read
//! through a fixed buffer, counted and dropped.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::TryStreamExt;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::header::HOST;
use reqwest::redirect::Policy;
use reqwest::{Client, StatusCode};
use tokio::io::AsyncReadExt;
use tokio_util::io::StreamReader;
use url::{Host, Url};

use netflood_core::DownloadTask;

use crate::counter::ByteCounter;

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
pub const TCP_KEEPALIVE: Duration = Duration::from_secs(30);
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(90);
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const READ_BUFFER_SIZE: usize = 64 * 1024;
const MAX_IDLE_PER_HOST: usize = 100;
const MAX_REDIRECTS: usize = 10;

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid url {0:?}: {1}")]
    InvalidUrl(String, url::ParseError),
    #[error("url {0:?} has no host")]
    MissingHost(String),
    #[error("invalid target ip {0:?}")]
    InvalidIp(String),
    #[error("failed to build http client: {0}")]
    Client(reqwest::Error),
    #[error("request failed: {0}")]
    Request(reqwest::Error),
    #[error("unexpected http status {0}")]
    Status(StatusCode),
    #[error("failed to read response body: {0}")]
    Body(std::io::Error),
}

// ── Connector ─────────────────────────────────────────────────────────────────

/// Where a task's connection really goes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Connector {
    /// Host as written in the URL; kept for Host and SNI.
    pub host: String,
    /// URL host was an IP literal, so there is no name for the resolver to pin.
    pub host_is_literal: bool,
    pub target_ip: IpAddr,
    pub target_port: u16,
}

impl Connector {
    /// Build the connector for a task and return it with the parsed URL.
    /// Port: explicit URL port, else 443 for https and 80 for anything else.
    pub fn for_task(task: &DownloadTask) -> Result<(Self, Url), FetchError> {
        let url = Url::parse(&task.url).map_err(|e| FetchError::InvalidUrl(task.url.clone(), e))?;
        let target_ip: IpAddr = task
            .ip
            .parse()
            .map_err(|_| FetchError::InvalidIp(task.ip.clone()))?;

        let (host, host_is_literal) = match url.host() {
            Some(Host::Domain(domain)) => (domain.to_string(), false),
            Some(Host::Ipv4(ip)) => (ip.to_string(), true),
            Some(Host::Ipv6(ip)) => (format!("[{ip}]"), true),
            None => return Err(FetchError::MissingHost(task.url.clone())),
        };

        let target_port = url
            .port()
            .unwrap_or(if url.scheme() == "https" { 443 } else { 80 });

        Ok((
            Self {
                host,
                host_is_literal,
                target_ip,
                target_port,
            },
            url,
        ))
    }

    pub fn target(&self) -> SocketAddr {
        SocketAddr::new(self.target_ip, self.target_port)
    }

    fn build_client(&self) -> Result<Client, FetchError> {
        Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .tcp_keepalive(TCP_KEEPALIVE)
            .pool_idle_timeout(IDLE_TIMEOUT)
            .pool_max_idle_per_host(MAX_IDLE_PER_HOST)
            .timeout(REQUEST_TIMEOUT)
            .dns_resolver(Arc::new(PinnedResolver(self.target_ip)))
            .redirect(pinned_redirects(self.target_ip))
            .build()
            .map_err(FetchError::Client)
    }
}

/// Answers every name lookup with one IP. The connector fills in the port
/// from the URL being dialed.
struct PinnedResolver(IpAddr);

impl Resolve for PinnedResolver {
    fn resolve(&self, _name: Name) -> Resolving {
        let addr = SocketAddr::new(self.0, 0);
        Box::pin(async move {
            let addrs: Addrs = Box::new(std::iter::once(addr));
            Ok::<_, Box<dyn std::error::Error + Send + Sync>>(addrs)
        })
    }
}

/// Follow redirects to any host name, since the resolver pins those. An IP
/// literal other than `target_ip` is never resolved, so the redirect stops
/// there and its 3xx is the response.
fn pinned_redirects(target_ip: IpAddr) -> Policy {
    Policy::custom(move |attempt| {
        if attempt.previous().len() > MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }
        let leaves_target = match attempt.url().host() {
            Some(Host::Ipv4(ip)) => IpAddr::V4(ip) != target_ip,
            Some(Host::Ipv6(ip)) => IpAddr::V6(ip) != target_ip,
            _ => false,
        };
        if leaves_target {
            attempt.stop()
        } else {
            attempt.follow()
        }
    })
}

// ── Fetcher ───────────────────────────────────────────────────────────────────

/// Performs fetches and feeds the byte counter. Cheap to clone; clients are
/// cached per connector so repeated tasks reuse pooled connections.
#[derive(Clone)]
pub struct Fetcher {
    counter: ByteCounter,
    clients: Arc<DashMap<Connector, Client>>,
}

impl Fetcher {
    pub fn new(counter: ByteCounter) -> Self {
        Self {
            counter,
            clients: Arc::new(DashMap::new()),
        }
    }

    pub fn counter(&self) -> &ByteCounter {
        &self.counter
    }

    fn client_for(&self, connector: &Connector) -> Result<Client, FetchError> {
        if let Some(client) = self.clients.get(connector) {
            return Ok(client.clone());
        }
        let client = connector.build_client()?;
        Ok(self
            .clients
            .entry(connector.clone())
            .or_insert(client)
            .clone())
    }

    /// Fetch one task to completion. Returns the body length on HTTP 200.
    /// Bytes are counted as they arrive, so a body cut short by a read error
    /// still contributes what was received.
    pub async fn fetch(&self, task: &DownloadTask) -> Result<u64, FetchError> {
        let (connector, url) = Connector::for_task(task)?;
        let client = self.client_for(&connector)?;

        let request = if connector.host_is_literal {
            // No name to re-resolve: dial the target directly, keep the Host.
            let authority = match url.port() {
                Some(port) => format!("{}:{}", connector.host, port),
                None => connector.host.clone(),
            };
            let mut direct = url.clone();
            // set_ip_host/set_port only fail for cannot-be-a-base URLs, which
            // already failed the host check above.
            let _ = direct.set_ip_host(connector.target_ip);
            let _ = direct.set_port(Some(connector.target_port));
            client.get(direct).header(HOST, authority)
        } else {
            client.get(url)
        };

        let response = request.send().await.map_err(FetchError::Request)?;
        if response.status() != StatusCode::OK {
            return Err(FetchError::Status(response.status()));
        }

        let stream = response.bytes_stream().map_err(std::io::Error::other);
        let reader = StreamReader::new(stream);
        tokio::pin!(reader);
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        let mut total = 0u64;
        loop {
            let n = reader.read(&mut buf).await.map_err(FetchError::Body)?;
            if n == 0 {
                return Ok(total);
            }
            self.counter.add(n as u64);
            total += n as u64;
        }
    }
}
