use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use teresita_core::config::HttpConfig;
use teresita_core::error::ContentError;
use teresita_core::source::ContentSource;
use tracing::debug;
use url::Url;

/// Content source that fetches site paths from a web server.
///
/// Paths such as `/content/blog/en/manifest.json` are resolved against the
/// base URL, so a site deployed under a sub-path (`https://example.org/site/`)
/// works as well as one at the root. No retry happens here; the loader owns
/// the retry policy.
///
/// # Examples
///
/// ```no_run
/// use teresita_client::HttpSource;
/// use teresita_core::source::ContentSource;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let source = HttpSource::new("https://lacasadeteresita.pe")?;
/// let manifest = source.fetch_text("/content/blog/es/manifest.json").await?;
/// println!("{}", manifest);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct HttpSource {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpSource {
    /// Creates a source for `base_url_str` with the default client settings.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::InvalidUrl` if the URL is malformed or cannot
    /// serve as a base (e.g. `mailto:`).
    /// Returns `ContentError::ClientError` if the HTTP client cannot be built.
    pub fn new(base_url_str: &str) -> Result<Self, ContentError> {
        Self::with_config(&HttpConfig::new(base_url_str))
    }

    pub fn with_config(config: &HttpConfig) -> Result<Self, ContentError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ContentError::ClientError(e.to_string()))?;

        Self::with_client(client, config)
    }

    /// Uses a preconfigured client; `config.timeout` is only reported in
    /// timeout errors.
    pub fn with_client(client: Client, config: &HttpConfig) -> Result<Self, ContentError> {
        let mut base_url = Url::parse(&config.base_url)
            .map_err(|_| ContentError::InvalidUrl(config.base_url.clone()))?;

        if base_url.cannot_be_a_base() {
            return Err(ContentError::InvalidUrl(config.base_url.clone()));
        }

        // Url::join replaces the last segment unless the path ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            client,
            base_url,
            timeout: config.timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves a site path against the base URL.
    pub fn resolve(&self, path: &str) -> Result<Url, ContentError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ContentError::InvalidUrl(format!("{}: {}", path, e)))
    }
}

#[async_trait]
impl ContentSource for HttpSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch_text(&self, path: &str) -> Result<String, ContentError> {
        let url = self.resolve(path)?;
        debug!("GET {}", url);

        let resp = match self.client.get(url.clone()).send().await {
            Ok(resp) => resp,
            Err(e) if e.is_timeout() => return Err(ContentError::Timeout(self.timeout)),
            Err(e) if e.is_connect() => {
                return Err(ContentError::NetworkError(format!("Connection failed: {}", e)))
            }
            Err(e) => return Err(ContentError::ClientError(e.to_string())),
        };

        let status = resp.status();
        if !status.is_success() {
            return Err(ContentError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        resp.text()
            .await
            .map_err(|e| ContentError::ClientError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves one canned HTTP response and returns the request line it got.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            request.lines().next().unwrap_or_default().to_string()
        });

        (format!("http://{}", addr), handle)
    }

    fn local_source(base: &str) -> HttpSource {
        let client = Client::builder().no_proxy().build().unwrap();
        HttpSource::with_client(client, &HttpConfig::new(base)).unwrap()
    }

    #[test]
    fn test_new_with_valid_url() {
        let source = HttpSource::new("https://lacasadeteresita.pe").unwrap();
        assert_eq!(source.base_url().as_str(), "https://lacasadeteresita.pe/");
    }

    #[test]
    fn test_new_with_invalid_url() {
        let result = HttpSource::new("not-a-valid-url");
        assert!(matches!(result, Err(ContentError::InvalidUrl(_))));

        let result = HttpSource::new("mailto:teresita@example.org");
        assert!(matches!(result, Err(ContentError::InvalidUrl(_))));
    }

    #[test]
    fn test_resolve_keeps_sub_path() {
        let source = HttpSource::new("https://example.org/site").unwrap();
        assert_eq!(source.base_url().as_str(), "https://example.org/site/");

        let url = source.resolve("/content/blog/en/manifest.json").unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.org/site/content/blog/en/manifest.json"
        );
    }

    #[test]
    fn test_with_config_uses_user_agent_timeout() {
        let mut config = HttpConfig::new("http://localhost:4321/");
        config.timeout = Duration::from_secs(5);
        let source = HttpSource::with_config(&config).unwrap();
        assert_eq!(source.timeout, Duration::from_secs(5));
        assert_eq!(source.name(), "http");
    }

    #[tokio::test]
    async fn test_fetch_text_success() {
        let (base, server) = serve_once("200 OK", "---\ntitle: Hola\n---\n").await;
        let source = local_source(&base);

        let text = source.fetch_text("/content/blog/es/hola.md").await.unwrap();

        assert_eq!(text, "---\ntitle: Hola\n---\n");
        assert_eq!(
            server.await.unwrap(),
            "GET /content/blog/es/hola.md HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn test_fetch_text_maps_status() {
        let (base, _server) = serve_once("404 Not Found", "<html>Not Found</html>").await;
        let source = local_source(&base);

        match source.fetch_text("/content/museum/en/missing.md").await {
            Err(ContentError::HttpStatus { status, url }) => {
                assert_eq!(status, 404);
                assert!(url.ends_with("/content/museum/en/missing.md"));
            }
            other => panic!("Expected HttpStatus, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_text_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let source = local_source(&format!("http://{}", addr));
        let err = source
            .fetch_text("/content/blog/en/manifest.json")
            .await
            .unwrap_err();

        assert!(err.is_transport(), "unexpected error: {:?}", err);
    }
}
