use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Context;
use bytes::Bytes;
use reqwest::{header, StatusCode, Url};
use fleet_source_core::*;

#[derive(Clone, Debug)]
pub struct HttpConfig {
    pub url: String,            // e.g. "http://127.0.0.1:8000/map_viewer/state.json"
    pub timeout: Option<Duration>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { url: "http://127.0.0.1:8000/map_viewer/state.json".into(), timeout: None }
    }
}

pub struct HttpSource {
    cfg: HttpConfig,
    url: Url,
    client: reqwest::Client,
    last_bust: AtomicU64,
}

impl HttpSource {
    pub fn new(cfg: HttpConfig) -> Result<Self, SourceError> {
        let url = Url::parse(&cfg.url).with_context(|| format!("parse url {}", cfg.url))?;
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = cfg.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("build http client")?;
        Ok(Self { cfg, url, client, last_bust: AtomicU64::new(0) })
    }

    /// Request URL with a `t=<unix millis>` cache-buster. The value is
    /// strictly increasing across calls even within one millisecond.
    fn busted_url(&self) -> Url {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        let prev = self
            .last_bust
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |last| Some(now.max(last + 1)))
            .unwrap_or_else(|last| last);
        let stamp = now.max(prev + 1);

        let mut url = self.url.clone();
        url.query_pairs_mut().append_pair("t", &stamp.to_string());
        url
    }
}

#[async_trait::async_trait]
impl SnapshotSource for HttpSource {
    async fn fetch(&self) -> Result<Bytes, SourceError> {
        let url = self.busted_url();
        tracing::trace!(%url, "fetching snapshot");
        let res = self.client
            .get(url)
            .header(header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .with_context(|| format!("GET {}", self.cfg.url))?;

        let status = res.status();
        match status {
            StatusCode::NOT_FOUND => Err(SourceError::NotFound),
            s if !s.is_success() => Err(SourceError::Status(s.as_u16())),
            _ => Ok(res.bytes().await.context("read snapshot body")?),
        }
    }

    fn describe(&self) -> String {
        self.cfg.url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve `responses` one connection each and hand back the request heads.
    async fn serve(responses: Vec<(&'static str, &'static str)>) -> (String, tokio::task::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let mut seen = Vec::new();
            for (status, body) in responses {
                let (mut sock, _) = listener.accept().await.unwrap();
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = sock.read(&mut chunk).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                }
                seen.push(String::from_utf8_lossy(&buf).to_string());
                let reply = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                sock.write_all(reply.as_bytes()).await.unwrap();
                sock.shutdown().await.ok();
            }
            seen
        });
        (format!("http://{addr}/map_viewer/state.json"), handle)
    }

    #[tokio::test]
    async fn fetch_busts_cache_on_every_call() {
        let (url, server) = serve(vec![("200 OK", r#"{"ts":1}"#), ("200 OK", r#"{"ts":2}"#)]).await;
        let src = HttpSource::new(HttpConfig { url, timeout: None }).unwrap();

        let first = src.fetch().await.unwrap();
        let second = src.fetch().await.unwrap();
        assert_eq!(&first[..], br#"{"ts":1}"#);
        assert_eq!(&second[..], br#"{"ts":2}"#);

        let heads = server.await.unwrap();
        assert_eq!(heads.len(), 2);
        let lines: Vec<&str> = heads.iter().map(|h| h.lines().next().unwrap_or_default()).collect();
        assert!(lines[0].starts_with("GET /map_viewer/state.json?t="), "{}", lines[0]);
        assert_ne!(lines[0], lines[1]);
    }

    #[tokio::test]
    async fn sends_no_cache_header() {
        let (url, server) = serve(vec![("200 OK", "{}")]).await;
        let src = HttpSource::new(HttpConfig { url, timeout: None }).unwrap();
        src.fetch().await.unwrap();

        let heads = server.await.unwrap();
        let has_header = heads[0]
            .lines()
            .any(|l| l.eq_ignore_ascii_case("cache-control: no-cache"));
        assert!(has_header, "{}", heads[0]);
    }

    #[tokio::test]
    async fn configured_timeout_cuts_off_a_silent_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // accept and never answer
        let server = tokio::spawn(async move {
            let (sock, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(sock);
        });

        let src = HttpSource::new(HttpConfig {
            url: format!("http://{addr}/state.json"),
            timeout: Some(Duration::from_millis(200)),
        })
        .unwrap();
        let started = std::time::Instant::now();
        assert!(matches!(src.fetch().await, Err(SourceError::Other(_))));
        assert!(started.elapsed() < Duration::from_secs(5));
        server.abort();
    }

    #[tokio::test]
    async fn not_found_and_server_errors() {
        let (url, server) = serve(vec![("404 Not Found", ""), ("503 Service Unavailable", "")]).await;
        let src = HttpSource::new(HttpConfig { url, timeout: None }).unwrap();

        assert!(matches!(src.fetch().await, Err(SourceError::NotFound)));
        assert!(matches!(src.fetch().await, Err(SourceError::Status(503))));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn connection_refused_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let src = HttpSource::new(HttpConfig { url: format!("http://{addr}/state.json"), timeout: None }).unwrap();
        assert!(matches!(src.fetch().await, Err(SourceError::Other(_))));
    }

    #[tokio::test]
    async fn existing_query_is_kept() {
        let src = HttpSource::new(HttpConfig { url: "http://host/state.json?view=zadar".into(), timeout: None }).unwrap();
        let a = src.busted_url();
        let b = src.busted_url();
        assert!(a.as_str().starts_with("http://host/state.json?view=zadar&t="));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn bad_url_is_rejected() {
        assert!(HttpSource::new(HttpConfig { url: "not a url".into(), timeout: None }).is_err());
    }
}
