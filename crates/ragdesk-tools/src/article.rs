use std::time::Duration;

use url::Url;

use crate::config::ArticleConfig;
use crate::executor::ToolError;

/// Fetches a web page and keeps the opening paragraphs as plain text.
#[derive(Debug, Clone)]
pub struct ArticleFetcher {
    client: reqwest::Client,
    timeout_secs: u64,
    max_body_bytes: usize,
    max_paragraphs: usize,
    max_chars: usize,
    allow_private_hosts: bool,
}

impl ArticleFetcher {
    #[must_use]
    pub fn new(config: &ArticleConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .redirect(reqwest::redirect::Policy::limited(3))
            .build()
            .unwrap_or_default();

        Self {
            client,
            timeout_secs: config.timeout,
            max_body_bytes: config.max_body_bytes,
            max_paragraphs: config.max_paragraphs,
            max_chars: config.max_chars,
            allow_private_hosts: false,
        }
    }

    #[cfg(test)]
    pub(crate) fn allowing_private_hosts(mut self) -> Self {
        self.allow_private_hosts = true;
        self
    }

    /// Fetch `url` and return the text of its first paragraphs.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Blocked`] for non-http(s) schemes and private hosts,
    /// or an HTTP/size error from the fetch itself.
    pub async fn fetch(&self, url: &str) -> Result<String, ToolError> {
        validate_url(url, self.allow_private_hosts)?;
        let html = self.fetch_html(url).await?;
        let max_paragraphs = self.max_paragraphs;
        let max_chars = self.max_chars;
        tokio::task::spawn_blocking(move || extract_paragraphs(&html, max_paragraphs, max_chars))
            .await
            .map_err(|e| ToolError::InvalidResponse(e.to_string()))?
    }

    async fn fetch_html(&self, url: &str) -> Result<String, ToolError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ToolError::from_reqwest(&e, self.timeout_secs))?;

        if !resp.status().is_success() {
            return Err(ToolError::Http(format!("HTTP {}", resp.status())));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ToolError::from_reqwest(&e, self.timeout_secs))?;

        if bytes.len() > self.max_body_bytes {
            return Err(ToolError::TooLarge {
                size: bytes.len(),
                max: self.max_body_bytes,
            });
        }

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn validate_url(raw: &str, allow_private_hosts: bool) -> Result<(), ToolError> {
    let parsed = Url::parse(raw).map_err(|_| ToolError::Blocked {
        reason: format!("invalid URL: {raw}"),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ToolError::Blocked {
            reason: format!("scheme not allowed: {}", parsed.scheme()),
        });
    }

    if !allow_private_hosts
        && let Some(host) = parsed.host()
        && is_private_host(&host)
    {
        return Err(ToolError::Blocked {
            reason: format!(
                "private/local host blocked: {}",
                parsed.host_str().unwrap_or("")
            ),
        });
    }

    Ok(())
}

fn is_private_v4(v4: std::net::Ipv4Addr) -> bool {
    v4.is_loopback() || v4.is_private() || v4.is_link_local() || v4.is_unspecified() || v4.is_broadcast()
}

fn is_private_host(host: &url::Host<&str>) -> bool {
    match host {
        url::Host::Domain(d) => *d == "localhost" || d.ends_with(".localhost"),
        url::Host::Ipv4(v4) => is_private_v4(*v4),
        url::Host::Ipv6(v6) => {
            if v6.is_loopback() || v6.is_unspecified() {
                return true;
            }
            let seg = v6.segments();
            // fe80::/10 link-local
            if seg[0] & 0xffc0 == 0xfe80 {
                return true;
            }
            // fc00::/7 unique local
            if seg[0] & 0xfe00 == 0xfc00 {
                return true;
            }
            v6.to_ipv4_mapped().is_some_and(is_private_v4)
        }
    }
}

fn extract_paragraphs(
    html: &str,
    max_paragraphs: usize,
    max_chars: usize,
) -> Result<String, ToolError> {
    let soup = scrape_core::Soup::parse(html);
    let tags = soup
        .find_all("p")
        .map_err(|e| ToolError::InvalidResponse(format!("invalid selector: {e}")))?;

    let text = tags
        .into_iter()
        .take(max_paragraphs)
        .map(|tag| tag.text().trim().to_owned())
        .collect::<Vec<_>>()
        .join(" ");

    Ok(truncate_chars(&text, max_chars))
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_owned(),
        None => text.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const PAGE: &str = "<html><body><h1>Title</h1>\
        <p> First paragraph. </p><p>Second.</p><div>skip</div>\
        <p>Third.</p><p>Fourth is dropped.</p></body></html>";

    #[test]
    fn extracts_first_three_paragraphs() {
        let text = extract_paragraphs(PAGE, 3, 1000).unwrap();
        assert_eq!(text, "First paragraph. Second. Third.");
    }

    #[test]
    fn truncates_to_max_chars() {
        let text = extract_paragraphs(PAGE, 3, 5).unwrap();
        assert_eq!(text, "First");
    }

    #[test]
    fn no_paragraphs_is_empty() {
        assert_eq!(extract_paragraphs("<div>none</div>", 3, 1000).unwrap(), "");
    }

    #[test]
    fn truncate_is_char_safe() {
        assert_eq!(truncate_chars("héllo wörld", 7), "héllo w");
        assert_eq!(truncate_chars("short", 100), "short");
    }

    #[test]
    fn validate_url_rules() {
        assert!(validate_url("https://example.com/a", false).is_ok());
        assert!(validate_url("http://example.com/a", false).is_ok());
        assert!(validate_url("ftp://example.com", false).is_err());
        assert!(validate_url("file:///etc/passwd", false).is_err());
        assert!(validate_url("not a url", false).is_err());
        assert!(validate_url("http://localhost:8080", false).is_err());
        assert!(validate_url("http://127.0.0.1/", false).is_err());
        assert!(validate_url("http://10.0.0.5/", false).is_err());
        assert!(validate_url("http://192.168.1.1/", false).is_err());
        assert!(validate_url("http://169.254.169.254/", false).is_err());
        assert!(validate_url("http://[::1]/", false).is_err());
        assert!(validate_url("http://[fd00::1]/", false).is_err());
        assert!(validate_url("http://[::ffff:127.0.0.1]/", false).is_err());
        assert!(validate_url("http://127.0.0.1/", true).is_ok());
    }

    #[tokio::test]
    async fn fetch_blocks_loopback_by_default() {
        let fetcher = ArticleFetcher::new(&ArticleConfig::default());
        let err = fetcher.fetch("http://127.0.0.1:1/page").await.unwrap_err();
        assert!(matches!(err, ToolError::Blocked { .. }));
    }

    #[tokio::test]
    async fn fetch_returns_paragraph_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/article"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;

        let fetcher = ArticleFetcher::new(&ArticleConfig::default()).allowing_private_hosts();
        let text = fetcher
            .fetch(&format!("{}/article", server.uri()))
            .await
            .unwrap();
        assert_eq!(text, "First paragraph. Second. Third.");
    }

    #[tokio::test]
    async fn fetch_non_success_status_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = ArticleFetcher::new(&ArticleConfig::default()).allowing_private_hosts();
        let err = fetcher.fetch(&server.uri()).await.unwrap_err();
        assert!(matches!(err, ToolError::Http(_)));
    }

    #[tokio::test]
    async fn fetch_rejects_oversized_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(64)))
            .mount(&server)
            .await;

        let config = ArticleConfig {
            max_body_bytes: 16,
            ..ArticleConfig::default()
        };
        let fetcher = ArticleFetcher::new(&config).allowing_private_hosts();
        let err = fetcher.fetch(&server.uri()).await.unwrap_err();
        assert!(matches!(err, ToolError::TooLarge { size: 64, max: 16 }));
    }
}
